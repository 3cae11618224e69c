// crates/vnet-harness-terraform/src/lib.rs
// ============================================================================
// Module: VNet Harness Terraform
// Description: Module invoker for the provisioning tool.
// Purpose: Run init/plan/apply/destroy in isolated per-run working areas.
// Dependencies: async-trait, tempfile, thiserror, tokio, tracing
// ============================================================================

//! ## Overview
//! The invoker turns a [`vnet_harness_core::ModuleOptions`] record into tool
//! invocations. Each lifecycle gets a [`ModuleRun`] whose temporary directory
//! holds the state, saved plan, data directory, and variable file, so many
//! units may target the same module directory concurrently.
//!
//! [`ProvisioningTool`] is the seam the runner depends on; [`Terraform`] is
//! the binary-backed implementation.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod invoker;
pub mod workspace;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::TerraformError;
pub use invoker::DEFAULT_BINARY;
pub use invoker::ProvisioningTool;
pub use invoker::Terraform;
pub use workspace::ModuleRun;

// ============================================================================
// SECTION: Tests
// ============================================================================
