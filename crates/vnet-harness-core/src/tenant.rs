// crates/vnet-harness-core/src/tenant.rs
// ============================================================================
// Module: Tenant Configuration
// Description: Resolved per-unit tenant identity and credentials.
// Purpose: Give each parallel test unit its own immutable cloud context.
// Dependencies: rand, serde, thiserror
// ============================================================================

//! ## Overview
//! A [`TenantConfig`] is produced once per tenant test unit and never shared
//! across units. Every resource a unit creates is named from its
//! [`UniqueId`], which is what makes the absence of ordering between parallel
//! units safe.
//!
//! Credentials are carried as [`Secret`] values whose `Debug` output is
//! redacted, so configs can be logged without leaking service principal
//! secrets.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Length of generated unique identifiers.
pub const UNIQUE_ID_LEN: usize = 8;

/// Alphabet for unique identifiers. Lowercase alphanumerics are accepted by
/// every Azure resource type the harness names (including storage accounts).
const UNIQUE_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Provider environment key for the subscription.
pub const ENV_ARM_SUBSCRIPTION_ID: &str = "ARM_SUBSCRIPTION_ID";
/// Provider environment key for the directory tenant.
pub const ENV_ARM_TENANT_ID: &str = "ARM_TENANT_ID";
/// Provider environment key for a service principal client id.
pub const ENV_ARM_CLIENT_ID: &str = "ARM_CLIENT_ID";
/// Provider environment key for a service principal secret.
pub const ENV_ARM_CLIENT_SECRET: &str = "ARM_CLIENT_SECRET";
/// Provider environment key enabling Azure CLI authentication.
pub const ENV_ARM_USE_CLI: &str = "ARM_USE_CLI";

/// Provider identity and authentication keys that a child process must never
/// inherit from the harness process. Each tenant sets its own explicitly.
pub const PROVIDER_AUTH_ENV: &[&str] = &[
    ENV_ARM_SUBSCRIPTION_ID,
    ENV_ARM_TENANT_ID,
    ENV_ARM_CLIENT_ID,
    "ARM_CLIENT_ID_FILE_PATH",
    ENV_ARM_CLIENT_SECRET,
    "ARM_CLIENT_SECRET_FILE_PATH",
    "ARM_CLIENT_CERTIFICATE",
    "ARM_CLIENT_CERTIFICATE_PATH",
    "ARM_CLIENT_CERTIFICATE_PASSWORD",
    "ARM_USE_MSI",
    "ARM_MSI_ENDPOINT",
    "ARM_USE_OIDC",
    "ARM_OIDC_TOKEN",
    "ARM_OIDC_TOKEN_FILE_PATH",
    "ARM_OIDC_REQUEST_TOKEN",
    "ARM_OIDC_REQUEST_URL",
    "ARM_USE_AKS_WORKLOAD_IDENTITY",
    ENV_ARM_USE_CLI,
];

// ============================================================================
// SECTION: Unique Identifiers
// ============================================================================

/// Errors raised when parsing a unique identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UniqueIdError {
    /// Identifier length is outside the accepted bounds.
    #[error("unique id must be between 4 and 32 characters, got {0}")]
    Length(usize),
    /// Identifier contains a character outside `[a-z0-9]`.
    #[error("unique id contains invalid character `{0}`")]
    InvalidChar(char),
}

/// Identifier unique to one test invocation of one tenant unit.
///
/// # Invariants
/// - Contains only `[a-z0-9]`.
/// - Generated identifiers are [`UNIQUE_ID_LEN`] characters drawn from a
///   cryptographically seeded RNG.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UniqueId(String);

impl UniqueId {
    /// Generates a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0 .. UNIQUE_ID_LEN)
            .map(|_| {
                let index = rng.gen_range(0 .. UNIQUE_ID_ALPHABET.len());
                char::from(UNIQUE_ID_ALPHABET[index])
            })
            .collect();
        Self(id)
    }

    /// Parses an externally supplied identifier.
    ///
    /// # Errors
    ///
    /// Returns [`UniqueIdError`] when the value is too short, too long, or
    /// contains characters outside `[a-z0-9]`.
    pub fn parse(raw: &str) -> Result<Self, UniqueIdError> {
        let len = raw.chars().count();
        if !(4 ..= 32).contains(&len) {
            return Err(UniqueIdError::Length(len));
        }
        if let Some(bad) = raw.chars().find(|ch| !(ch.is_ascii_lowercase() || ch.is_ascii_digit()))
        {
            return Err(UniqueIdError::InvalidChar(bad));
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SECTION: Credentials
// ============================================================================

/// String wrapper that never prints its contents.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret value.
    #[must_use]
    pub const fn new(value: String) -> Self {
        Self(value)
    }

    /// Returns the secret value for handing to a child process or token
    /// request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// How a tenant unit authenticates to the cloud and the provisioning tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Ambient Azure CLI login (`az login`) scoped to the tenant.
    AzureCli,
    /// Service principal client-credentials flow.
    ServicePrincipal {
        /// Application (client) id.
        client_id: String,
        /// Client secret.
        client_secret: Secret,
    },
}

impl Credentials {
    /// Returns a stable label for logs and reports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AzureCli => "azure_cli",
            Self::ServicePrincipal {
                ..
            } => "service_principal",
        }
    }
}

// ============================================================================
// SECTION: Tenant Config
// ============================================================================

/// Immutable configuration for one tenant test unit.
///
/// # Invariants
/// - One instance per concurrent unit; never shared across units.
/// - `subscription_id`, `tenant_id` and `region` are non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantConfig {
    /// Tenant definition name (used for subtest identity).
    pub tenant_name: String,
    /// Identifier unique to this invocation.
    pub unique_id: UniqueId,
    /// Azure subscription id.
    pub subscription_id: String,
    /// Azure AD tenant id.
    pub tenant_id: String,
    /// Azure region for created resources.
    pub region: String,
    /// Resource group name prefix.
    pub resource_group: String,
    /// Credentials for the cloud API and provisioning tool.
    pub credentials: Credentials,
}

impl TenantConfig {
    /// Returns the resource group name owned by this unit:
    /// `{resource_group}-{unique_id}`.
    #[must_use]
    pub fn resource_group_name(&self) -> String {
        self.qualified_name(&self.resource_group)
    }

    /// Suffixes a base name with this unit's unique id.
    #[must_use]
    pub fn qualified_name(&self, base: &str) -> String {
        format!("{base}-{}", self.unique_id)
    }

    /// Returns the environment overrides the provisioning tool needs to act
    /// as this tenant.
    ///
    /// Credentials never travel through the harness process environment;
    /// each child process receives them explicitly.
    #[must_use]
    pub fn provider_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert(ENV_ARM_SUBSCRIPTION_ID.to_string(), self.subscription_id.clone());
        env.insert(ENV_ARM_TENANT_ID.to_string(), self.tenant_id.clone());
        match &self.credentials {
            Credentials::AzureCli => {
                env.insert(ENV_ARM_USE_CLI.to_string(), "true".to_string());
            }
            Credentials::ServicePrincipal {
                client_id,
                client_secret,
            } => {
                env.insert(ENV_ARM_CLIENT_ID.to_string(), client_id.clone());
                env.insert(ENV_ARM_CLIENT_SECRET.to_string(), client_secret.expose().to_string());
            }
        }
        env
    }

    /// Returns a display label `{tenant_name}/{unique_id}`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}/{}", self.tenant_name, self.unique_id)
    }
}
