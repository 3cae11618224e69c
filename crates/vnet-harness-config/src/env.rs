// crates/vnet-harness-config/src/env.rs
// ============================================================================
// Module: Harness Environment
// Description: Environment-backed overrides for harness configuration.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Invalid UTF-8, empty values, and malformed numbers fail
//! closed with a [`ConfigError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use crate::config::ConfigError;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys read by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    /// Config file path override.
    ConfigPath,
    /// Per-unit timeout override in seconds (positive integer).
    TimeoutSeconds,
    /// Run root for reports and artifacts.
    RunRoot,
    /// Comma-separated tenant name filter.
    Tenants,
    /// Maximum number of concurrently running units.
    MaxParallel,
    /// Provisioning tool binary.
    TerraformBin,
    /// Log filter directive.
    Log,
    /// Region for the single-tenant fallback.
    Region,
    /// Subscription id for the single-tenant fallback.
    SubscriptionId,
    /// Directory tenant id for the single-tenant fallback.
    TenantId,
    /// Service principal client id for the single-tenant fallback.
    ClientId,
    /// Service principal secret for the single-tenant fallback.
    ClientSecret,
}

impl HarnessEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigPath => "VNET_HARNESS_CONFIG",
            Self::TimeoutSeconds => "VNET_HARNESS_TIMEOUT_SEC",
            Self::RunRoot => "VNET_HARNESS_RUN_ROOT",
            Self::Tenants => "VNET_HARNESS_TENANTS",
            Self::MaxParallel => "VNET_HARNESS_MAX_PARALLEL",
            Self::TerraformBin => "VNET_HARNESS_TERRAFORM_BIN",
            Self::Log => "VNET_HARNESS_LOG",
            Self::Region => "VNET_HARNESS_REGION",
            Self::SubscriptionId => "ARM_SUBSCRIPTION_ID",
            Self::TenantId => "ARM_TENANT_ID",
            Self::ClientId => "ARM_CLIENT_ID",
            Self::ClientSecret => "ARM_CLIENT_SECRET",
        }
    }
}

// ============================================================================
// SECTION: Overrides
// ============================================================================

/// Runner overrides read from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvOverrides {
    /// Per-unit timeout.
    pub timeout: Option<Duration>,
    /// Run root.
    pub run_root: Option<PathBuf>,
    /// Tenant name filter.
    pub tenants: Option<Vec<String>>,
    /// Parallelism cap.
    pub max_parallel: Option<usize>,
    /// Provisioning tool binary.
    pub terraform_bin: Option<String>,
}

impl EnvOverrides {
    /// Loads overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is not valid UTF-8, is
    /// empty, or fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let timeout = read_env_nonempty(HarnessEnv::TimeoutSeconds.as_str())?
            .map(|value| parse_timeout_seconds(HarnessEnv::TimeoutSeconds.as_str(), &value))
            .transpose()?;
        let run_root = read_env_nonempty(HarnessEnv::RunRoot.as_str())?.map(PathBuf::from);
        let tenants = read_env_nonempty(HarnessEnv::Tenants.as_str())?
            .map(|value| parse_name_list(HarnessEnv::Tenants.as_str(), &value))
            .transpose()?;
        let max_parallel = read_env_nonempty(HarnessEnv::MaxParallel.as_str())?
            .map(|value| parse_positive_usize(HarnessEnv::MaxParallel.as_str(), &value))
            .transpose()?;
        let terraform_bin = read_env_nonempty(HarnessEnv::TerraformBin.as_str())?;
        Ok(Self {
            timeout,
            run_root,
            tenants,
            max_parallel,
            terraform_bin,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, ConfigError> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{name} must be valid UTF-8")))
    })
}

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the variable is set but empty or
/// whitespace.
pub fn read_env_nonempty(name: &str) -> Result<Option<String>, ConfigError> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => {
            Err(ConfigError::Invalid(format!("{name} must not be empty")))
        }
        Some(value) => Ok(Some(value.trim().to_string())),
        None => Ok(None),
    }
}

/// Parses a positive timeout value in seconds.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the value is non-numeric or zero.
pub(crate) fn parse_timeout_seconds(name: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = raw.trim().parse().map_err(|_| {
        ConfigError::Invalid(format!("{name} must be a positive integer number of seconds"))
    })?;
    if secs == 0 {
        return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
    }
    Ok(Duration::from_secs(secs))
}

/// Parses a positive integer.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the value is non-numeric or zero.
pub(crate) fn parse_positive_usize(name: &str, raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(ConfigError::Invalid(format!("{name} must be a positive integer"))),
        Ok(value) => Ok(value),
    }
}

/// Parses a comma-separated list of names.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when any entry is empty.
pub(crate) fn parse_name_list(name: &str, raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(|entry| {
            let trimmed = entry.trim();
            if trimmed.is_empty() {
                Err(ConfigError::Invalid(format!("{name} contains an empty entry")))
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}
