// crates/vnet-harness-runner/src/lib.rs
// ============================================================================
// Module: VNet Harness Runner
// Description: Multi-tenant execution of module integration tests.
// Purpose: Run isolated per-tenant units with guaranteed teardown.
// Dependencies: tokio, tracing, tracing-subscriber, serde_jcs, time
// ============================================================================

//! ## Overview
//! Test suites hand a body to [`MultiTenantTestRunner::run`]; the runner
//! executes it once per tenant with a fresh [`TenantScope`], drains the
//! unit's [`CleanupStack`] whatever happened, and returns a [`RunReport`].
//!
//! ```no_run
//! use vnet_harness_runner::HarnessError;
//! use vnet_harness_runner::MultiTenantTestRunner;
//!
//! # async fn demo() -> Result<(), HarnessError> {
//! let runner = MultiTenantTestRunner::from_global()?;
//! runner
//!     .run("basic_plan", |scope| async move {
//!         let options = scope.module_options("examples/basic").plan_only(true).build()?;
//!         let plan = scope.plan(options).await?;
//!         vnet_harness_core::require_planned_resource(&plan, "azurerm_virtual_network.main")?;
//!         Ok(())
//!     })
//!     .await
//!     .into_result()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backend;
pub mod cleanup;
pub mod error;
pub mod logging;
pub mod report;
pub mod runner;
pub mod scope;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backend::AzureBackend;
pub use backend::Backend;
pub use cleanup::CleanupStack;
pub use error::CleanupFailure;
pub use error::HarnessError;
pub use logging::LogConfig;
pub use logging::LogFormat;
pub use logging::init_logging;
pub use logging::init_test_logging;
pub use report::RunReport;
pub use report::UnitOutcome;
pub use report::UnitReport;
pub use runner::MultiTenantTestRunner;
pub use scope::TAG_CREATED_AT;
pub use scope::TAG_TENANT;
pub use scope::TAG_TEST;
pub use scope::TAG_UNIQUE_ID;
pub use scope::TenantScope;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod report_tests;
