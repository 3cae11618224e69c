// system-tests/src/config/env.rs
// ============================================================================
// Module: System Test Environment
// Description: Environment-backed locations of the modules under test.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: vnet-harness-config
// ============================================================================

//! ## Overview
//! Module suites locate the Terraform code through environment variables so
//! the same binaries run against any checkout of the module repository.
//! Invalid UTF-8 and empty values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use vnet_harness_config::ConfigError;
use vnet_harness_config::env::read_env_nonempty;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys for system test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTestEnv {
    /// Root of the module repository (contains `examples/`).
    ModuleRoot,
    /// Directory of the full virtual network module.
    VnetModuleDir,
    /// Skip suites that apply real infrastructure (`true`/`false` or `1`/`0`).
    SkipApply,
}

impl SystemTestEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ModuleRoot => "VNET_HARNESS_MODULE_ROOT",
            Self::VnetModuleDir => "VNET_HARNESS_VNET_MODULE_DIR",
            Self::SkipApply => "VNET_HARNESS_SKIP_APPLY",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Typed system test configuration derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemTestConfig {
    /// Module repository root.
    pub module_root: PathBuf,
    /// Full virtual network module directory.
    pub vnet_module_dir: PathBuf,
    /// Skip apply suites.
    pub skip_apply: bool,
}

impl SystemTestConfig {
    /// Loads configuration from environment variables.
    ///
    /// `module_root` defaults to the working directory and
    /// `vnet_module_dir` to `module_root`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is not valid UTF-8, is
    /// empty, or is not a recognized boolean.
    pub fn load() -> Result<Self, ConfigError> {
        let module_root = read_env_nonempty(SystemTestEnv::ModuleRoot.as_str())?
            .map_or_else(|| PathBuf::from("."), PathBuf::from);
        let vnet_module_dir = read_env_nonempty(SystemTestEnv::VnetModuleDir.as_str())?
            .map_or_else(|| module_root.clone(), PathBuf::from);
        let skip_apply = parse_bool_env(
            SystemTestEnv::SkipApply.as_str(),
            read_env_nonempty(SystemTestEnv::SkipApply.as_str())?,
        )?;
        Ok(Self {
            module_root,
            vnet_module_dir,
            skip_apply,
        })
    }

    /// Returns `{module_root}/examples/{name}`.
    #[must_use]
    pub fn example_dir(&self, name: &str) -> PathBuf {
        self.module_root.join("examples").join(name)
    }

    /// Returns the full module directory.
    #[must_use]
    pub fn vnet_module_dir(&self) -> &Path {
        &self.vnet_module_dir
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a boolean environment variable; unset means false.
///
/// # Errors
///
/// Returns an error when the value is not a recognized boolean literal.
fn parse_bool_env(name: &str, raw: Option<String>) -> Result<bool, ConfigError> {
    let Some(value) = raw else {
        return Ok(false);
    };
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        return Ok(true);
    }
    if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        return Ok(false);
    }
    Err(ConfigError::Invalid(format!("{name} must be 1, 0, true, or false")))
}
