// crates/vnet-harness-config/src/resolver.rs
// ============================================================================
// Module: Tenant Resolver
// Description: Turns a tenant definition into an immutable TenantConfig.
// Purpose: Give every unit a fresh identity without silent identity defaults.
// Dependencies: vnet-harness-core
// ============================================================================

//! ## Overview
//! Resolution is pure apart from drawing a fresh [`UniqueId`]. Cloud
//! identity (subscription, directory tenant, region) never falls back to a
//! default: a definition missing any of them fails with
//! [`ConfigError::MissingField`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use vnet_harness_core::Credentials;
use vnet_harness_core::TenantConfig;
use vnet_harness_core::UniqueId;

use crate::config::AuthMode;
use crate::config::ConfigError;
use crate::config::TenantDefinition;

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves a definition with a freshly generated unique id.
///
/// # Errors
///
/// Returns [`ConfigError::MissingField`] when a required identity field or
/// service principal credential is absent or blank.
pub fn resolve(definition: &TenantDefinition) -> Result<TenantConfig, ConfigError> {
    resolve_with_id(definition, UniqueId::generate())
}

/// Resolves a definition with a caller-supplied unique id.
///
/// # Errors
///
/// Returns [`ConfigError::MissingField`] when a required identity field or
/// service principal credential is absent or blank.
pub fn resolve_with_id(
    definition: &TenantDefinition,
    unique_id: UniqueId,
) -> Result<TenantConfig, ConfigError> {
    let tenant = definition.name.as_str();
    let subscription_id = required(tenant, "subscription_id", definition.subscription_id.as_ref())?;
    let tenant_id = required(tenant, "tenant_id", definition.tenant_id.as_ref())?;
    let region = required(tenant, "region", definition.region.as_ref())?;
    let credentials = match definition.auth_mode() {
        AuthMode::AzureCli => Credentials::AzureCli,
        AuthMode::ServicePrincipal => Credentials::ServicePrincipal {
            client_id: required(tenant, "client_id", definition.client_id.as_ref())?,
            client_secret: definition.client_secret.clone().ok_or_else(|| {
                ConfigError::MissingField {
                    tenant: tenant.to_string(),
                    field: "client_secret",
                }
            })?,
        },
    };
    Ok(TenantConfig {
        tenant_name: definition.name.clone(),
        unique_id,
        subscription_id,
        tenant_id,
        region,
        resource_group: definition.resource_group_prefix().to_string(),
        credentials,
    })
}

/// Returns a trimmed required value.
fn required(
    tenant: &str,
    field: &'static str,
    value: Option<&String>,
) -> Result<String, ConfigError> {
    value.map(|value| value.trim()).filter(|value| !value.is_empty()).map(str::to_string).ok_or_else(
        || ConfigError::MissingField {
            tenant: tenant.to_string(),
            field,
        },
    )
}
