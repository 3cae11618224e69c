// crates/vnet-harness-terraform/src/error.rs
// ============================================================================
// Module: Terraform Errors
// Description: Failures raised while driving the provisioning tool.
// Purpose: Distinguish configuration, transient, and permanent tool failures.
// Dependencies: thiserror, vnet-harness-core
// ============================================================================

//! ## Overview
//! [`TerraformError::RetriesExhausted`] is only produced for output that
//! matched the retry allowlist on every attempt; any other non-zero exit is
//! [`TerraformError::CommandFailed`] on the first attempt.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use vnet_harness_core::ModuleOptionsError;
use vnet_harness_core::PlanParseError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the module invoker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerraformError {
    /// Module options are invalid.
    #[error(transparent)]
    Options(#[from] ModuleOptionsError),
    /// Apply was requested for plan-only options.
    #[error("apply refused: module options are plan-only")]
    PlanOnly,
    /// The isolated working area could not be prepared.
    #[error("workspace error ({context}): {message}")]
    Workspace {
        /// Operation that failed.
        context: &'static str,
        /// Underlying error.
        message: String,
    },
    /// The tool binary could not be started.
    #[error("failed to spawn `{program}`: {message}")]
    Spawn {
        /// Program path.
        program: String,
        /// Underlying error.
        message: String,
    },
    /// A command failed with a non-retryable error.
    #[error("terraform {command} failed (exit {status}): {output}")]
    CommandFailed {
        /// Subcommand.
        command: &'static str,
        /// Exit status (`-1` when killed by a signal).
        status: i32,
        /// Tail of the combined output.
        output: String,
    },
    /// A command kept failing with retryable errors.
    #[error("terraform {command} failed after {attempts} attempts ({reason}): {output}")]
    RetriesExhausted {
        /// Subcommand.
        command: &'static str,
        /// Attempts made.
        attempts: u32,
        /// Reason of the last retryable match.
        reason: String,
        /// Tail of the last combined output.
        output: String,
    },
    /// Plan or output JSON could not be parsed.
    #[error(transparent)]
    Parse(#[from] PlanParseError),
}
