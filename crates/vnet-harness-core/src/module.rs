// crates/vnet-harness-core/src/module.rs
// ============================================================================
// Module: Module Options
// Description: Invocation record for one module-under-test lifecycle.
// Purpose: Validate module path, input variables, and environment overrides.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`ModuleOptions`] is built once per test with [`ModuleOptionsBuilder`] and
//! consumed by exactly one plan-only or apply+destroy lifecycle. Validation
//! happens at build time so a malformed variable schema is reported as a
//! configuration error before the provisioning tool is ever spawned.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::retry::RetryPolicy;
use crate::tenant::TenantConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of an input variable name.
const MAX_VAR_NAME_LENGTH: usize = 128;
/// Maximum serialized size of the variable file in bytes.
const MAX_VAR_FILE_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors raised while building module options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleOptionsError {
    /// Module directory is empty.
    #[error("module directory must not be empty")]
    EmptyDirectory,
    /// Variable name does not match the provisioning tool's identifier rules.
    #[error("invalid input variable name `{0}`")]
    InvalidVarName(String),
    /// A bulk variable value was not a mapping.
    #[error("input variables must be a mapping, got {0}")]
    VarsNotObject(&'static str),
    /// Environment key is empty or contains `=` / NUL.
    #[error("invalid environment key `{0}`")]
    InvalidEnvKey(String),
    /// Variable file exceeds the size limit.
    #[error("input variables exceed {limit} bytes ({actual})")]
    VarsTooLarge {
        /// Size limit.
        limit: usize,
        /// Actual serialized size.
        actual: usize,
    },
    /// Variables could not be serialized.
    #[error("input variables could not be serialized: {0}")]
    Serialize(String),
}

// ============================================================================
// SECTION: Module Options
// ============================================================================

/// Invocation record for a module under test.
///
/// # Invariants
/// - Variable names are valid identifiers.
/// - Environment keys are non-empty and contain neither `=` nor NUL.
#[derive(Debug, Clone)]
pub struct ModuleOptions {
    /// Path to the module directory under test.
    pub terraform_dir: PathBuf,
    /// Input variables keyed by name; values mirror the module schema.
    pub vars: BTreeMap<String, Value>,
    /// Environment overrides applied to every tool invocation.
    pub env_vars: BTreeMap<String, String>,
    /// When set, the lifecycle never mutates real infrastructure.
    pub plan_only: bool,
    /// Retry policy for transient tool errors.
    pub retry_policy: RetryPolicy,
}

impl ModuleOptions {
    /// Starts a builder for the module at `terraform_dir`.
    #[must_use]
    pub fn builder(terraform_dir: impl Into<PathBuf>) -> ModuleOptionsBuilder {
        ModuleOptionsBuilder::new(terraform_dir.into())
    }

    /// Returns the module directory.
    #[must_use]
    pub fn terraform_dir(&self) -> &Path {
        &self.terraform_dir
    }

    /// Serializes the input variables as a JSON variable file.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleOptionsError`] when serialization fails or the file
    /// would exceed the size limit.
    pub fn var_file_json(&self) -> Result<Vec<u8>, ModuleOptionsError> {
        let object: Map<String, Value> =
            self.vars.iter().map(|(key, value)| (key.clone(), value.clone())).collect();
        let bytes = serde_json::to_vec_pretty(&Value::Object(object))
            .map_err(|err| ModuleOptionsError::Serialize(err.to_string()))?;
        if bytes.len() > MAX_VAR_FILE_BYTES {
            return Err(ModuleOptionsError::VarsTooLarge {
                limit: MAX_VAR_FILE_BYTES,
                actual: bytes.len(),
            });
        }
        Ok(bytes)
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for [`ModuleOptions`].
///
/// The builder starts with [`RetryPolicy::default_terraform`], matching the
/// usual expectation that every module test tolerates transient cloud errors.
#[derive(Debug, Clone)]
pub struct ModuleOptionsBuilder {
    /// Module directory.
    terraform_dir: PathBuf,
    /// Collected variables.
    vars: BTreeMap<String, Value>,
    /// Collected environment overrides.
    env_vars: BTreeMap<String, String>,
    /// Plan-only flag.
    plan_only: bool,
    /// Retry policy.
    retry_policy: RetryPolicy,
    /// Kind of a non-object value passed to [`Self::vars`].
    rejected: Option<&'static str>,
}

impl ModuleOptionsBuilder {
    /// Creates a builder with defaults.
    fn new(terraform_dir: PathBuf) -> Self {
        Self {
            terraform_dir,
            vars: BTreeMap::new(),
            env_vars: BTreeMap::new(),
            plan_only: false,
            retry_policy: RetryPolicy::default_terraform(),
            rejected: None,
        }
    }

    /// Sets one input variable.
    #[must_use]
    pub fn var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Merges every key of a JSON object into the input variables.
    ///
    /// The top level of a variable file is always a mapping; any other value
    /// makes [`Self::build`] fail.
    #[must_use]
    pub fn vars(mut self, vars: Value) -> Self {
        match vars {
            Value::Object(map) => self.vars.extend(map),
            other => self.rejected = Some(json_kind(&other)),
        }
        self
    }

    /// Sets one environment override.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Adds the tenant's provider environment (`ARM_*`).
    #[must_use]
    pub fn tenant_env(mut self, config: &TenantConfig) -> Self {
        self.env_vars.extend(config.provider_env());
        self
    }

    /// Marks the lifecycle as plan-only.
    #[must_use]
    pub fn plan_only(mut self, plan_only: bool) -> Self {
        self.plan_only = plan_only;
        self
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Validates and builds the options.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleOptionsError`] when the directory is empty, a variable
    /// name is invalid, or an environment key is malformed.
    pub fn build(self) -> Result<ModuleOptions, ModuleOptionsError> {
        if self.terraform_dir.as_os_str().is_empty() {
            return Err(ModuleOptionsError::EmptyDirectory);
        }
        if let Some(kind) = self.rejected {
            return Err(ModuleOptionsError::VarsNotObject(kind));
        }
        if let Some(name) = self.vars.keys().find(|name| !is_valid_var_name(name)) {
            return Err(ModuleOptionsError::InvalidVarName(name.clone()));
        }
        if let Some(key) = self.env_vars.keys().find(|key| !is_valid_env_key(key)) {
            return Err(ModuleOptionsError::InvalidEnvKey(key.clone()));
        }
        let options = ModuleOptions {
            terraform_dir: self.terraform_dir,
            vars: self.vars,
            env_vars: self.env_vars,
            plan_only: self.plan_only,
            retry_policy: self.retry_policy,
        };
        options.var_file_json()?;
        Ok(options)
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Returns true when `name` is a valid input variable identifier.
fn is_valid_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_VAR_NAME_LENGTH
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

/// Returns a short label for the JSON value kind.
pub(crate) const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns true when `key` can be passed to a child process environment.
fn is_valid_env_key(key: &str) -> bool {
    !key.is_empty() && !key.contains('=') && !key.contains('\0')
}
