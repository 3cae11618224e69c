// crates/vnet-harness-runner/src/logging.rs
// ============================================================================
// Module: Logging
// Description: tracing subscriber setup for harness runs.
// Purpose: Structured per-unit logs, filterable through the environment.
// Dependencies: thiserror, tracing-subscriber, vnet-harness-config
// ============================================================================

//! ## Overview
//! Units log inside a `tenant_unit` span carrying `test`, `tenant`, and
//! `unique_id`. [`init_logging`] installs a registry with an `EnvFilter`
//! read from `VNET_HARNESS_LOG` (default `info`) and a pretty or JSON
//! formatter writing to stderr. Test binaries call [`init_test_logging`],
//! which writes through the test harness capture and tolerates repeated
//! initialization.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use vnet_harness_config::HarnessEnv;
use vnet_harness_config::env::read_env_nonempty;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Output format.
    pub format: LogFormat,
    /// Filter directives, e.g. `info,vnet_harness_terraform=debug`.
    pub filter: String,
    /// Route output through the test harness capture.
    pub test_writer: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: DEFAULT_LOG_FILTER.to_string(),
            test_writer: false,
        }
    }
}

impl LogConfig {
    /// Reads the filter from `VNET_HARNESS_LOG`.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Env`] when the variable is set but empty or not
    /// UTF-8.
    pub fn from_env() -> Result<Self, LogError> {
        let filter = read_env_nonempty(HarnessEnv::Log.as_str())
            .map_err(|err| LogError::Env(err.to_string()))?
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        Ok(Self {
            filter,
            ..Self::default()
        })
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Logging initialization errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// The filter variable could not be read.
    #[error("invalid log environment: {0}")]
    Env(String),
    /// The filter directives do not parse.
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),
    /// A global subscriber is already installed.
    #[error("subscriber already initialized")]
    AlreadyInitialized,
}

// ============================================================================
// SECTION: Initialization
// ============================================================================

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`LogError`] when the filter is invalid or a subscriber is
/// already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    let filter =
        EnvFilter::try_new(&config.filter).map_err(|err| LogError::InvalidFilter(err.to_string()))?;
    let registry = tracing_subscriber::registry().with(filter);
    let result = match (config.format, config.test_writer) {
        (LogFormat::Json, false) => {
            registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()
        }
        (LogFormat::Json, true) => registry.with(fmt::layer().json().with_test_writer()).try_init(),
        (LogFormat::Pretty, false) => {
            registry.with(fmt::layer().pretty().with_writer(std::io::stderr)).try_init()
        }
        (LogFormat::Pretty, true) => registry.with(fmt::layer().with_test_writer()).try_init(),
    };
    result.map_err(|_| LogError::AlreadyInitialized)
}

/// Installs a test-captured subscriber from `VNET_HARNESS_LOG`, once.
///
/// Later calls and an invalid environment fall back silently.
pub fn init_test_logging() {
    let mut config = LogConfig::from_env().unwrap_or_default();
    config.test_writer = true;
    if init_logging(&config).is_err() {
        let _ = init_logging(&LogConfig {
            test_writer: true,
            ..LogConfig::default()
        });
    }
}
