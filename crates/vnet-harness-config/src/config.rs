// crates/vnet-harness-config/src/config.rs
// ============================================================================
// Module: Harness Configuration
// Description: Tenant definitions and runner settings loading and validation.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, vnet-harness-core
// ============================================================================

//! ## Overview
//! Tenant definitions are loaded from a TOML file (`vnet-harness.toml`, or
//! the path in `VNET_HARNESS_CONFIG`) with strict size and path limits. When
//! no file exists a single `default` tenant is read from the standard
//! `ARM_*` variables. Environment overrides for the runner are layered on
//! top, then the whole document is validated once.
//!
//! ```toml
//! [defaults]
//! region = "westeurope"
//! resource_group = "rg-vnet-test"
//!
//! [runner]
//! timeout_seconds = 5400
//! max_parallel = 4
//!
//! [[tenants]]
//! name = "primary"
//! subscription_id = "00000000-0000-0000-0000-000000000001"
//! tenant_id = "00000000-0000-0000-0000-0000000000aa"
//! auth = "service_principal"
//! client_id = "11111111-1111-1111-1111-111111111111"
//! client_secret_env = "PRIMARY_CLIENT_SECRET"
//! ```
//!
//! Secrets are never read from the file; `client_secret_env` names the
//! environment variable holding them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use vnet_harness_core::Secret;

use crate::env::EnvOverrides;
use crate::env::HarnessEnv;
use crate::env::read_env_nonempty;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "vnet-harness.toml";
/// Name of the tenant synthesized from `ARM_*` variables.
pub const FALLBACK_TENANT_NAME: &str = "default";
/// Default resource group name prefix.
pub const DEFAULT_RESOURCE_GROUP: &str = "rg-vnet-test";
/// Default provisioning tool binary.
pub const DEFAULT_TERRAFORM_BIN: &str = "terraform";
/// Default per-unit timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 90 * 60;
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of tenant definitions.
pub(crate) const MAX_TENANTS: usize = 64;
/// Maximum tenant name length.
pub(crate) const MAX_TENANT_NAME_LENGTH: usize = 64;
/// Maximum resource group prefix length. Resource group names are capped at
/// 90 characters and the suffix is `-` plus a unique id of at most 32.
pub(crate) const MAX_RESOURCE_GROUP_PREFIX_LENGTH: usize = 57;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// A tenant lacks a required cloud identity field.
    #[error("tenant `{tenant}` is missing {field}")]
    MissingField {
        /// Tenant name.
        tenant: String,
        /// Missing field name.
        field: &'static str,
    },
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Authentication mode of a tenant definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Ambient Azure CLI login.
    #[default]
    AzureCli,
    /// Service principal with a client secret.
    ServicePrincipal,
}

/// Values applied to tenants that leave them unset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantDefaults {
    /// Default region.
    #[serde(default)]
    pub region: Option<String>,
    /// Default resource group prefix.
    #[serde(default)]
    pub resource_group: Option<String>,
    /// Default authentication mode.
    #[serde(default)]
    pub auth: Option<AuthMode>,
}

/// One tenant definition from the process-wide list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantDefinition {
    /// Tenant name; identifies the unit in reports.
    pub name: String,
    /// Azure subscription id.
    #[serde(default)]
    pub subscription_id: Option<String>,
    /// Azure AD tenant id.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Region for created resources.
    #[serde(default)]
    pub region: Option<String>,
    /// Resource group name prefix.
    #[serde(default)]
    pub resource_group: Option<String>,
    /// Authentication mode.
    #[serde(default)]
    pub auth: Option<AuthMode>,
    /// Service principal client id.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Environment variable holding the service principal secret.
    #[serde(default)]
    pub client_secret_env: Option<String>,
    /// Secret read from `client_secret_env` at load time.
    #[serde(skip)]
    pub client_secret: Option<Secret>,
}

impl TenantDefinition {
    /// Fills unset fields from `defaults`.
    fn apply_defaults(&mut self, defaults: &TenantDefaults) {
        if self.region.is_none() {
            self.region.clone_from(&defaults.region);
        }
        if self.resource_group.is_none() {
            self.resource_group.clone_from(&defaults.resource_group);
        }
        if self.auth.is_none() {
            self.auth = defaults.auth;
        }
    }

    /// Returns the effective authentication mode.
    #[must_use]
    pub fn auth_mode(&self) -> AuthMode {
        self.auth.unwrap_or_default()
    }

    /// Returns the effective resource group prefix.
    #[must_use]
    pub fn resource_group_prefix(&self) -> &str {
        self.resource_group.as_deref().unwrap_or(DEFAULT_RESOURCE_GROUP)
    }

    /// Reads the service principal secret named by `client_secret_env`.
    fn read_secret(&mut self) -> Result<(), ConfigError> {
        if self.auth_mode() != AuthMode::ServicePrincipal || self.client_secret.is_some() {
            return Ok(());
        }
        let Some(var) = self.client_secret_env.as_deref() else {
            return Ok(());
        };
        self.client_secret = read_env_nonempty(var)?.map(Secret::new);
        Ok(())
    }

    /// Validates a definition after defaults are applied.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_tenant_name(&self.name)?;
        require_field(&self.name, "subscription_id", self.subscription_id.as_deref())?;
        require_field(&self.name, "tenant_id", self.tenant_id.as_deref())?;
        require_field(&self.name, "region", self.region.as_deref())?;
        validate_resource_group_prefix(&self.name, self.resource_group_prefix())?;
        if self.auth_mode() == AuthMode::ServicePrincipal {
            require_field(&self.name, "client_id", self.client_id.as_deref())?;
            if self.client_secret.is_none() {
                let source = self.client_secret_env.as_deref().unwrap_or("client_secret_env");
                return Err(ConfigError::Invalid(format!(
                    "tenant `{}` uses service_principal but {source} is not set",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Runner settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerSettings {
    /// Per-unit timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Maximum concurrently running units (unbounded when unset).
    #[serde(default)]
    pub max_parallel: Option<usize>,
    /// Directory for run reports.
    #[serde(default)]
    pub run_root: Option<PathBuf>,
    /// Provisioning tool binary.
    #[serde(default = "default_terraform_bin")]
    pub terraform_bin: String,
    /// Tenant names to run (all when empty).
    #[serde(default)]
    pub tenant_filter: Vec<String>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_parallel: None,
            run_root: None,
            terraform_bin: DEFAULT_TERRAFORM_BIN.to_string(),
            tenant_filter: Vec::new(),
        }
    }
}

impl RunnerSettings {
    /// Returns the per-unit timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Validates runner limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_seconds == 0 {
            return Err(ConfigError::Invalid("runner.timeout_seconds must be positive".to_string()));
        }
        if self.max_parallel == Some(0) {
            return Err(ConfigError::Invalid("runner.max_parallel must be positive".to_string()));
        }
        if self.terraform_bin.trim().is_empty() {
            return Err(ConfigError::Invalid("runner.terraform_bin must be non-empty".to_string()));
        }
        if let Some(run_root) = &self.run_root {
            validate_path(run_root)?;
        }
        Ok(())
    }
}

/// Default timeout for serde.
const fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

/// Default tool binary for serde.
fn default_terraform_bin() -> String {
    DEFAULT_TERRAFORM_BIN.to_string()
}

/// Full harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Tenant defaults.
    #[serde(default)]
    pub defaults: TenantDefaults,
    /// Runner settings.
    #[serde(default)]
    pub runner: RunnerSettings,
    /// Tenant definitions.
    #[serde(default)]
    pub tenants: Vec<TenantDefinition>,
}

/// Where a configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfigSource {
    /// TOML file.
    File(PathBuf),
    /// `ARM_*` environment variables.
    Environment,
}

impl HarnessConfig {
    /// Loads configuration using the default resolution rules, reads
    /// tenant secrets, applies environment overrides, and validates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let overrides = EnvOverrides::load()?;
        let mut config = match resolve_source(path)? {
            ConfigSource::File(resolved) => Self::from_file(&resolved)?,
            ConfigSource::Environment => Self::from_environment()?,
        };
        for tenant in &mut config.tenants {
            tenant.apply_defaults(&config.defaults);
            tenant.read_secret()?;
        }
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a configuration file without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, is too large,
    /// is not UTF-8, or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses a TOML document without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document is not valid TOML or
    /// contains unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Builds the single-tenant fallback from `ARM_*` variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is not valid UTF-8 or
    /// is set but empty.
    pub fn from_environment() -> Result<Self, ConfigError> {
        let client_id = read_env_nonempty(HarnessEnv::ClientId.as_str())?;
        let auth = if client_id.is_some() { AuthMode::ServicePrincipal } else { AuthMode::AzureCli };
        let tenant = TenantDefinition {
            name: FALLBACK_TENANT_NAME.to_string(),
            subscription_id: read_env_nonempty(HarnessEnv::SubscriptionId.as_str())?,
            tenant_id: read_env_nonempty(HarnessEnv::TenantId.as_str())?,
            region: read_env_nonempty(HarnessEnv::Region.as_str())?,
            resource_group: None,
            auth: Some(auth),
            client_id,
            client_secret_env: Some(HarnessEnv::ClientSecret.as_str().to_string()),
            client_secret: None,
        };
        Ok(Self {
            defaults: TenantDefaults::default(),
            runner: RunnerSettings::default(),
            tenants: vec![tenant],
        })
    }

    /// Layers environment overrides onto the runner settings.
    pub fn apply_overrides(&mut self, overrides: EnvOverrides) {
        if let Some(timeout) = overrides.timeout {
            self.runner.timeout_seconds = timeout.as_secs();
        }
        if overrides.run_root.is_some() {
            self.runner.run_root = overrides.run_root;
        }
        if let Some(tenants) = overrides.tenants {
            self.runner.tenant_filter = tenants;
        }
        if overrides.max_parallel.is_some() {
            self.runner.max_parallel = overrides.max_parallel;
        }
        if let Some(bin) = overrides.terraform_bin {
            self.runner.terraform_bin = bin;
        }
    }

    /// Applies defaults and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.tenants.is_empty() {
            return Err(ConfigError::Invalid("at least one tenant must be defined".to_string()));
        }
        if self.tenants.len() > MAX_TENANTS {
            return Err(ConfigError::Invalid(format!(
                "too many tenants ({} > {MAX_TENANTS})",
                self.tenants.len()
            )));
        }
        let mut names = BTreeSet::new();
        for tenant in &mut self.tenants {
            tenant.apply_defaults(&self.defaults);
            tenant.validate()?;
            if !names.insert(tenant.name.clone()) {
                return Err(ConfigError::Invalid(format!("duplicate tenant name `{}`", tenant.name)));
            }
        }
        if let Some(unknown) = self.runner.tenant_filter.iter().find(|name| !names.contains(*name)) {
            return Err(ConfigError::Invalid(format!("tenant filter names unknown tenant `{unknown}`")));
        }
        self.runner.validate()
    }

    /// Returns the tenants selected by the runner filter, in file order.
    #[must_use]
    pub fn selected_tenants(&self) -> Vec<&TenantDefinition> {
        self.tenants
            .iter()
            .filter(|tenant| {
                self.runner.tenant_filter.is_empty()
                    || self.runner.tenant_filter.iter().any(|name| name == &tenant.name)
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Process-Wide Definitions
// ============================================================================

/// Process-wide configuration, loaded once.
static GLOBAL_CONFIG: OnceLock<Result<HarnessConfig, ConfigError>> = OnceLock::new();

/// Returns the process-wide configuration, loading it on first use.
///
/// The result of the first load (success or failure) is cached for the
/// lifetime of the process; the configuration is read-only thereafter.
///
/// # Errors
///
/// Returns the [`ConfigError`] from the first load.
pub fn global_config() -> Result<&'static HarnessConfig, ConfigError> {
    GLOBAL_CONFIG.get_or_init(|| HarnessConfig::load(None)).as_ref().map_err(Clone::clone)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config source from an explicit path, the environment, the
/// default file, or the `ARM_*` fallback.
fn resolve_source(path: Option<&Path>) -> Result<ConfigSource, ConfigError> {
    if let Some(path) = path {
        return Ok(ConfigSource::File(path.to_path_buf()));
    }
    if let Some(env_path) = read_env_nonempty(HarnessEnv::ConfigPath.as_str())? {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(ConfigSource::File(PathBuf::from(env_path)));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_NAME);
    if default.is_file() {
        return Ok(ConfigSource::File(default));
    }
    Ok(ConfigSource::Environment)
}

/// Validates a path against length limits.
pub(crate) fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid("path must be non-empty".to_string()));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a tenant name.
fn validate_tenant_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() || name.len() > MAX_TENANT_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "tenant name must be 1-{MAX_TENANT_NAME_LENGTH} characters, got `{name}`"
        )));
    }
    if !name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_') {
        return Err(ConfigError::Invalid(format!(
            "tenant name `{name}` may only contain letters, digits, `-` and `_`"
        )));
    }
    Ok(())
}

/// Requires an optional field to be present and non-blank.
fn require_field(
    tenant: &str,
    field: &'static str,
    value: Option<&str>,
) -> Result<(), ConfigError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::MissingField {
            tenant: tenant.to_string(),
            field,
        }),
    }
}

/// Validates a resource group prefix.
fn validate_resource_group_prefix(tenant: &str, prefix: &str) -> Result<(), ConfigError> {
    let valid_chars = prefix
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '(' | ')'));
    if prefix.is_empty() || prefix.len() > MAX_RESOURCE_GROUP_PREFIX_LENGTH || !valid_chars {
        return Err(ConfigError::Invalid(format!(
            "tenant `{tenant}` resource_group `{prefix}` must be 1-{MAX_RESOURCE_GROUP_PREFIX_LENGTH} \
             characters of letters, digits, `-_.()`"
        )));
    }
    Ok(())
}
