// crates/vnet-harness-runner/src/error.rs
// ============================================================================
// Module: Harness Errors
// Description: Unified error type for tenant test units.
// Purpose: Let test bodies propagate every crate's failures with `?`.
// Dependencies: serde, thiserror, vnet-harness-*
// ============================================================================

//! ## Overview
//! [`HarnessError`] wraps the per-crate error enums so a test body can use
//! `?` across configuration, invocation, cloud, and assertion calls.
//! [`CleanupFailure`] is recorded next to a unit's outcome and never
//! replaces it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;
use vnet_harness_azure::AzureError;
use vnet_harness_config::ConfigError;
use vnet_harness_core::AssertionError;
use vnet_harness_core::ModuleOptionsError;
use vnet_harness_terraform::TerraformError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors surfaced by the runner and by test bodies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    /// Configuration could not be loaded or resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Module options are invalid.
    #[error(transparent)]
    Options(#[from] ModuleOptionsError),
    /// The provisioning tool failed.
    #[error(transparent)]
    Terraform(#[from] TerraformError),
    /// A cloud call failed.
    #[error(transparent)]
    Azure(#[from] AzureError),
    /// An assertion did not hold.
    #[error(transparent)]
    Assertion(#[from] AssertionError),
    /// A resource group still exists after cleanup.
    #[error("resource group {0} still exists after cleanup")]
    ResourceGroupLeaked(String),
    /// Run artifacts could not be written.
    #[error("artifact error ({context}): {message}")]
    Artifact {
        /// Operation that failed.
        context: &'static str,
        /// Underlying error.
        message: String,
    },
    /// At least one tenant unit failed.
    #[error("{test}: {failed} of {total} tenant units failed\n{summary}")]
    RunFailed {
        /// Test name.
        test: String,
        /// Failed units.
        failed: usize,
        /// Total units.
        total: usize,
        /// One line per failed unit.
        summary: String,
    },
}

/// One cleanup step that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupFailure {
    /// Step label, e.g. `destroy examples/basic`.
    pub step: String,
    /// Failure detail.
    pub error: String,
}

impl std::fmt::Display for CleanupFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cleanup `{}` failed: {}", self.step, self.error)
    }
}
