// crates/vnet-harness-azure/src/token.rs
// ============================================================================
// Module: Token Providers
// Description: Access token acquisition for ARM requests.
// Purpose: Map tenant credentials to bearer tokens without leaking secrets.
// Dependencies: async-trait, reqwest, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! Two credential modes are supported, matching
//! [`vnet_harness_core::Credentials`]:
//! - service principal client credentials against the tenant's token
//!   endpoint, cached until one minute before expiry;
//! - the ambient Azure CLI login via `az account get-access-token`.
//!
//! [`StaticToken`] serves fixed tokens to mock servers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;
use vnet_harness_core::Credentials;
use vnet_harness_core::Secret;
use vnet_harness_core::TenantConfig;

use crate::error::AzureError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Public cloud token endpoint base.
pub const DEFAULT_LOGIN_BASE: &str = "https://login.microsoftonline.com";
/// Resource audience of ARM tokens.
const ARM_RESOURCE: &str = "https://management.azure.com";
/// Client credentials scope for ARM.
const ARM_SCOPE: &str = "https://management.azure.com/.default";
/// Assumed lifetime when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);
/// Safety margin subtracted from the token lifetime.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

// ============================================================================
// SECTION: Token Provider
// ============================================================================

/// Source of ARM bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a valid bearer token.
    async fn token(&self) -> Result<String, AzureError>;
}

/// Builds the provider matching a tenant's credentials.
#[must_use]
pub fn token_provider_for(
    config: &TenantConfig,
    http: &reqwest::Client,
    login_base: &str,
) -> Arc<dyn TokenProvider> {
    match &config.credentials {
        Credentials::AzureCli => Arc::new(AzureCliTokenProvider::new(&config.tenant_id)),
        Credentials::ServicePrincipal {
            client_id,
            client_secret,
        } => Arc::new(ServicePrincipalTokenProvider::new(
            http.clone(),
            login_base,
            &config.tenant_id,
            client_id,
            client_secret.clone(),
        )),
    }
}

// ============================================================================
// SECTION: Service Principal
// ============================================================================

/// Client credentials flow against the tenant's token endpoint.
pub struct ServicePrincipalTokenProvider {
    /// Shared HTTP client.
    http: reqwest::Client,
    /// Token endpoint URL.
    token_url: String,
    /// Application (client) id.
    client_id: String,
    /// Client secret.
    client_secret: Secret,
    /// Cached token and its refresh deadline.
    cache: Mutex<Option<(String, Instant)>>,
}

impl ServicePrincipalTokenProvider {
    /// Creates a provider for `tenant_id`.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        login_base: &str,
        tenant_id: &str,
        client_id: &str,
        client_secret: Secret,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}/{tenant_id}/oauth2/v2.0/token", login_base.trim_end_matches('/')),
            client_id: client_id.to_string(),
            client_secret,
            cache: Mutex::new(None),
        }
    }

    /// Requests a fresh token.
    async fn fetch(&self) -> Result<(String, Duration), AzureError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose()),
            ("scope", ARM_SCOPE),
        ];
        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|err| sp_error(format!("token request: {err}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|err| sp_error(format!("token response decode: {err}")))?;
        if !status.is_success() {
            let description =
                body.get("error_description").and_then(Value::as_str).unwrap_or("no description");
            return Err(sp_error(format!("status {}: {description}", status.as_u16())));
        }
        let token = body
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| sp_error("no access_token in response".to_string()))?
            .to_string();
        let lifetime = body
            .get("expires_in")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_TOKEN_LIFETIME, Duration::from_secs);
        Ok((token, lifetime))
    }
}

#[async_trait]
impl TokenProvider for ServicePrincipalTokenProvider {
    async fn token(&self) -> Result<String, AzureError> {
        let mut cache = self.cache.lock().await;
        if let Some((token, deadline)) = cache.as_ref()
            && Instant::now() < *deadline
        {
            return Ok(token.clone());
        }
        let (token, lifetime) = self.fetch().await?;
        debug!(client_id = %self.client_id, "service principal token acquired");
        let deadline = Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cache = Some((token.clone(), deadline));
        Ok(token)
    }
}

/// Builds a service principal token error.
const fn sp_error(message: String) -> AzureError {
    AzureError::Token {
        source_kind: "service_principal",
        message,
    }
}

// ============================================================================
// SECTION: Azure CLI
// ============================================================================

/// Tokens from the ambient `az login` session.
#[derive(Debug, Clone)]
pub struct AzureCliTokenProvider {
    /// Directory (tenant) id passed to `--tenant`.
    tenant_id: String,
    /// CLI binary.
    program: String,
}

impl AzureCliTokenProvider {
    /// Creates a provider for `tenant_id` using `az` from `PATH`.
    #[must_use]
    pub fn new(tenant_id: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            program: "az".to_string(),
        }
    }

    /// Overrides the CLI binary.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl TokenProvider for AzureCliTokenProvider {
    async fn token(&self) -> Result<String, AzureError> {
        let output = Command::new(&self.program)
            .args(["account", "get-access-token", "--resource", ARM_RESOURCE])
            .args(["--tenant", self.tenant_id.as_str(), "--output", "json"])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| cli_error(format!("{} not runnable: {err}", self.program)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(cli_error(format!(
                "az account get-access-token failed: {}; run `az login` first",
                stderr.trim()
            )));
        }
        let body: Value = serde_json::from_slice(&output.stdout)
            .map_err(|err| cli_error(format!("output parse: {err}")))?;
        body.get("accessToken")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| cli_error("no accessToken in output".to_string()))
    }
}

/// Builds an Azure CLI token error.
const fn cli_error(message: String) -> AzureError {
    AzureError::Token {
        source_kind: "azure_cli",
        message,
    }
}

// ============================================================================
// SECTION: Static
// ============================================================================

/// Fixed token, for mock servers.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, AzureError> {
        Ok(self.0.clone())
    }
}
