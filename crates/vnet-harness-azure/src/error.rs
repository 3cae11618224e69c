// crates/vnet-harness-azure/src/error.rs
// ============================================================================
// Module: Azure Errors
// Description: Failures raised by the cloud query boundary.
// Purpose: Separate credential, transport, and ARM-reported failures.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! ARM failures carry the HTTP method, URL, status, and the `code: message`
//! pair extracted from the ARM error envelope. Tokens and secrets never
//! appear in error text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by ARM clients and token providers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AzureError {
    /// An access token could not be acquired.
    #[error("token acquisition failed ({source_kind}): {message}")]
    Token {
        /// Token provider kind.
        source_kind: &'static str,
        /// Failure detail.
        message: String,
    },
    /// The HTTP client could not be built.
    #[error("http client setup failed: {0}")]
    Client(String),
    /// The HTTP request could not be sent or read.
    #[error("{method} {url}: {message}")]
    Transport {
        /// HTTP method.
        method: &'static str,
        /// Request URL.
        url: String,
        /// Failure detail.
        message: String,
    },
    /// ARM answered with an unexpected status.
    #[error("{method} {url}: status {status}: {message}")]
    Status {
        /// HTTP method.
        method: &'static str,
        /// Request URL.
        url: String,
        /// HTTP status.
        status: u16,
        /// ARM error `code: message`.
        message: String,
    },
    /// A response body did not have the expected shape.
    #[error("unexpected response from {url}: {message}")]
    Decode {
        /// Request URL.
        url: String,
        /// Failure detail.
        message: String,
    },
    /// A long-running operation ended in `Failed` or `Canceled`.
    #[error("ARM operation {status} at {url}: {message}")]
    OperationFailed {
        /// Polled operation URL.
        url: String,
        /// Terminal status.
        status: String,
        /// ARM error `code: message`.
        message: String,
    },
    /// A long-running operation did not finish within the poll budget.
    #[error("ARM operation at {url} still running after {polls} polls")]
    OperationTimedOut {
        /// Polled operation URL.
        url: String,
        /// Polls made.
        polls: usize,
    },
    /// A resource name cannot be placed in an ARM path.
    #[error("invalid resource name `{0}`")]
    InvalidName(String),
}
