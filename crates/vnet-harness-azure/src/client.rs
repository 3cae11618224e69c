// crates/vnet-harness-azure/src/client.rs
// ============================================================================
// Module: ARM Client
// Description: Resource group lifecycle and network queries over ARM REST.
// Purpose: Provide the cloud query boundary used by tenant test units.
// Dependencies: async-trait, reqwest, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! [`CloudClient`] is the seam the runner depends on; [`ArmClient`] is the
//! ARM REST implementation scoped to one subscription.
//!
//! Long-running operations answer `202 Accepted` with an
//! `Azure-AsyncOperation` or `Location` header. The client polls that URL
//! with the delays `[1, 2, 4, 8, 16, 30]` seconds (cycled, at most 120
//! polls) until the operation reports `Succeeded`, or fails on `Failed` or
//! `Canceled`.
//!
//! Deleting a resource group that does not exist is success, so cleanup
//! can be registered before the create request is sent. A delete accepted
//! without an operation header is confirmed by polling the group with the
//! same schedule until it is gone.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Response;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::json;
use tracing::debug;
use tracing::info;
use vnet_harness_core::NetworkSecurityGroup;
use vnet_harness_core::TenantConfig;
use vnet_harness_core::VirtualNetworkProperties;

use crate::error::AzureError;
use crate::resources::ArmSecurityGroup;
use crate::resources::ArmVirtualNetwork;
use crate::resources::Page;
use crate::resources::ResourceGroupSummary;
use crate::token::DEFAULT_LOGIN_BASE;
use crate::token::TokenProvider;
use crate::token::token_provider_for;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Public cloud management endpoint.
pub const DEFAULT_MANAGEMENT_BASE: &str = "https://management.azure.com";
/// API version for resource group calls.
pub const RESOURCE_GROUP_API_VERSION: &str = "2021-04-01";
/// API version for network resource calls.
pub const NETWORK_API_VERSION: &str = "2023-11-01";
/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Delays between operation polls, in seconds, cycled.
const DEFAULT_POLL_DELAYS: [u64; 6] = [1, 2, 4, 8, 16, 30];
/// Maximum number of operation polls.
const DEFAULT_MAX_POLLS: usize = 120;
/// Maximum resource group name length accepted by ARM.
const MAX_RESOURCE_GROUP_NAME_LENGTH: usize = 90;
/// Maximum list pages followed through `nextLink`.
const MAX_LIST_PAGES: usize = 100;

// ============================================================================
// SECTION: Cloud Client
// ============================================================================

/// Cloud operations a tenant unit needs.
#[async_trait]
pub trait CloudClient: Send + Sync {
    /// Creates (or updates) a resource group.
    async fn create_resource_group(
        &self,
        name: &str,
        location: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), AzureError>;

    /// Deletes a resource group and waits for completion. Missing groups
    /// are success.
    async fn delete_resource_group(&self, name: &str) -> Result<(), AzureError>;

    /// Returns true when the resource group exists.
    async fn resource_group_exists(&self, name: &str) -> Result<bool, AzureError>;

    /// Fetches live virtual network properties.
    async fn get_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<VirtualNetworkProperties, AzureError>;

    /// Lists network security groups in a resource group.
    async fn list_network_security_groups(
        &self,
        resource_group: &str,
    ) -> Result<Vec<NetworkSecurityGroup>, AzureError>;

    /// Lists resource groups in the subscription.
    async fn list_resource_groups(&self) -> Result<Vec<ResourceGroupSummary>, AzureError>;
}

// ============================================================================
// SECTION: Endpoints
// ============================================================================

/// Base URLs for management and login endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Management endpoint base.
    pub management: String,
    /// Token endpoint base.
    pub login: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            management: DEFAULT_MANAGEMENT_BASE.to_string(),
            login: DEFAULT_LOGIN_BASE.to_string(),
        }
    }
}

// ============================================================================
// SECTION: ARM Client
// ============================================================================

/// ARM REST client scoped to one subscription.
#[derive(Clone)]
pub struct ArmClient {
    /// Shared HTTP client.
    http: reqwest::Client,
    /// Bearer token source.
    token: Arc<dyn TokenProvider>,
    /// Management base URL without trailing slash.
    management: String,
    /// Target subscription.
    subscription_id: String,
    /// Poll delays, cycled.
    poll_delays: Vec<Duration>,
    /// Poll budget.
    max_polls: usize,
}

impl std::fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmClient")
            .field("management", &self.management)
            .field("subscription_id", &self.subscription_id)
            .finish_non_exhaustive()
    }
}

impl ArmClient {
    /// Builds a client for a resolved tenant using its credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AzureError::Client`] when the HTTP client cannot be built.
    pub fn for_tenant(config: &TenantConfig, endpoints: &Endpoints) -> Result<Self, AzureError> {
        let http = build_http()?;
        let token = token_provider_for(config, &http, &endpoints.login);
        Ok(Self::from_parts(http, token, &endpoints.management, &config.subscription_id))
    }

    /// Builds a client with an explicit token provider.
    ///
    /// # Errors
    ///
    /// Returns [`AzureError::Client`] when the HTTP client cannot be built.
    pub fn with_token(
        subscription_id: &str,
        token: Arc<dyn TokenProvider>,
        management: &str,
    ) -> Result<Self, AzureError> {
        Ok(Self::from_parts(build_http()?, token, management, subscription_id))
    }

    /// Overrides the operation poll schedule.
    #[must_use]
    pub fn with_poll_schedule(mut self, delays: Vec<Duration>, max_polls: usize) -> Self {
        self.poll_delays = delays;
        self.max_polls = max_polls;
        self
    }

    /// Returns the target subscription.
    #[must_use]
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Assembles a client.
    fn from_parts(
        http: reqwest::Client,
        token: Arc<dyn TokenProvider>,
        management: &str,
        subscription_id: &str,
    ) -> Self {
        Self {
            http,
            token,
            management: management.trim_end_matches('/').to_string(),
            subscription_id: subscription_id.to_string(),
            poll_delays: DEFAULT_POLL_DELAYS.iter().copied().map(Duration::from_secs).collect(),
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    // ------------------------------------------------------------------------
    // URLs
    // ------------------------------------------------------------------------

    /// Returns the resource group collection URL.
    fn resource_groups_url(&self) -> String {
        format!(
            "{}/subscriptions/{}/resourcegroups?api-version={RESOURCE_GROUP_API_VERSION}",
            self.management, self.subscription_id
        )
    }

    /// Returns the URL of one resource group.
    fn resource_group_url(&self, name: &str) -> Result<String, AzureError> {
        validate_segment(name)?;
        Ok(format!(
            "{}/subscriptions/{}/resourcegroups/{name}?api-version={RESOURCE_GROUP_API_VERSION}",
            self.management, self.subscription_id
        ))
    }

    /// Returns a network provider URL under a resource group.
    fn network_url(&self, resource_group: &str, path: &str) -> Result<String, AzureError> {
        validate_segment(resource_group)?;
        Ok(format!(
            "{}/subscriptions/{}/resourceGroups/{resource_group}/providers/Microsoft.Network/{path}?api-version={NETWORK_API_VERSION}",
            self.management, self.subscription_id
        ))
    }

    // ------------------------------------------------------------------------
    // HTTP verbs
    // ------------------------------------------------------------------------

    /// Sends a request with the bearer token.
    async fn send(
        &self,
        method: &'static str,
        url: &str,
        body: Option<&Value>,
    ) -> Result<ArmResponse, AzureError> {
        let token = self.token.token().await?;
        debug!(method, url, "ARM request");
        let builder = match method {
            "PUT" => self.http.put(url),
            "DELETE" => self.http.delete(url),
            "HEAD" => self.http.head(url),
            _ => self.http.get(url),
        };
        let builder = builder.bearer_auth(token);
        let builder = match body {
            Some(body) => builder.json(body),
            None => builder,
        };
        let response = builder.send().await.map_err(|err| AzureError::Transport {
            method,
            url: url.to_string(),
            message: err.to_string(),
        })?;
        ArmResponse::read(method, url, response).await
    }

    /// Sends a GET and decodes a successful body.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, AzureError> {
        let response = self.send("GET", url, None).await?;
        if response.status != StatusCode::OK {
            return Err(response.into_status_error("GET", url));
        }
        serde_json::from_value(response.body).map_err(|err| AzureError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        })
    }

    /// Collects every page of a list response.
    async fn list_all<T: DeserializeOwned>(&self, url: String) -> Result<Vec<T>, AzureError> {
        let mut items = Vec::new();
        let mut next = Some(url);
        let mut pages = 0;
        while let Some(url) = next {
            pages += 1;
            if pages > MAX_LIST_PAGES {
                return Err(AzureError::Decode {
                    url,
                    message: format!("more than {MAX_LIST_PAGES} pages"),
                });
            }
            let page: Page<T> = self.get_json(&url).await?;
            items.extend(page.value);
            next = page.next_link;
        }
        Ok(items)
    }

    /// Polls a long-running operation until it reaches a terminal state.
    async fn wait_for_operation(&self, url: &str) -> Result<(), AzureError> {
        let delays = self.poll_delays.iter().copied().cycle().take(self.max_polls);
        for (index, delay) in delays.enumerate() {
            let response = self.send("GET", url, None).await?;
            if response.status == StatusCode::ACCEPTED {
                debug!(poll = index + 1, url, "ARM operation pending");
                tokio::time::sleep(delay).await;
                continue;
            }
            if !response.status.is_success() {
                return Err(response.into_status_error("GET", url));
            }
            match response.body.get("status").and_then(Value::as_str) {
                None | Some("Succeeded") => return Ok(()),
                Some(status @ ("Failed" | "Canceled")) => {
                    return Err(AzureError::OperationFailed {
                        url: url.to_string(),
                        status: status.to_string(),
                        message: arm_error_message(&response.body),
                    });
                }
                Some(status) => {
                    let poll = index + 1;
                    if poll % 10 == 0 {
                        info!(poll, url, status, "still waiting for ARM operation");
                    } else {
                        debug!(poll, url, status, "ARM operation pending");
                    }
                    tokio::time::sleep(delay).await;
                }
            }
        }
        Err(AzureError::OperationTimedOut {
            url: url.to_string(),
            polls: self.max_polls,
        })
    }

    /// Polls a resource group until it no longer exists.
    async fn wait_for_absence(&self, name: &str, url: &str) -> Result<(), AzureError> {
        let delays = self.poll_delays.iter().copied().cycle().take(self.max_polls);
        for (index, delay) in delays.enumerate() {
            if !self.resource_group_exists(name).await? {
                return Ok(());
            }
            debug!(poll = index + 1, resource_group = name, "resource group deletion pending");
            tokio::time::sleep(delay).await;
        }
        Err(AzureError::OperationTimedOut {
            url: url.to_string(),
            polls: self.max_polls,
        })
    }
}

#[async_trait]
impl CloudClient for ArmClient {
    async fn create_resource_group(
        &self,
        name: &str,
        location: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), AzureError> {
        let url = self.resource_group_url(name)?;
        let body = json!({ "location": location, "tags": tags });
        let response = self.send("PUT", &url, Some(&body)).await?;
        match response.status {
            StatusCode::OK | StatusCode::CREATED => {}
            StatusCode::ACCEPTED => {
                match response.operation {
                    Some(operation) => self.wait_for_operation(&operation).await?,
                    None => self.wait_for_absence(name, &url).await?,
                }
            }
            _ => return Err(response.into_status_error("PUT", &url)),
        }
        info!(resource_group = name, location, "resource group created");
        Ok(())
    }

    async fn delete_resource_group(&self, name: &str) -> Result<(), AzureError> {
        let url = self.resource_group_url(name)?;
        let response = self.send("DELETE", &url, None).await?;
        match response.status {
            StatusCode::NOT_FOUND => {
                debug!(resource_group = name, "resource group already absent");
                Ok(())
            }
            StatusCode::ACCEPTED => {
                if let Some(operation) = response.operation {
                    self.wait_for_operation(&operation).await?;
                }
                info!(resource_group = name, "resource group deleted");
                Ok(())
            }
            status if status.is_success() => {
                info!(resource_group = name, "resource group deleted");
                Ok(())
            }
            _ => Err(response.into_status_error("DELETE", &url)),
        }
    }

    async fn resource_group_exists(&self, name: &str) -> Result<bool, AzureError> {
        let url = self.resource_group_url(name)?;
        let response = self.send("HEAD", &url, None).await?;
        match response.status {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(response.into_status_error("HEAD", &url)),
        }
    }

    async fn get_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<VirtualNetworkProperties, AzureError> {
        validate_segment(name)?;
        let url = self.network_url(resource_group, &format!("virtualNetworks/{name}"))?;
        let raw: ArmVirtualNetwork = self.get_json(&url).await?;
        Ok(raw.into())
    }

    async fn list_network_security_groups(
        &self,
        resource_group: &str,
    ) -> Result<Vec<NetworkSecurityGroup>, AzureError> {
        let url = self.network_url(resource_group, "networkSecurityGroups")?;
        let raw: Vec<ArmSecurityGroup> = self.list_all(url).await?;
        Ok(raw.into_iter().map(NetworkSecurityGroup::from).collect())
    }

    async fn list_resource_groups(&self) -> Result<Vec<ResourceGroupSummary>, AzureError> {
        self.list_all(self.resource_groups_url()).await
    }
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Status, body, and operation header of one response.
struct ArmResponse {
    /// HTTP status.
    status: StatusCode,
    /// Parsed body (`Null` when empty or not JSON).
    body: Value,
    /// `Azure-AsyncOperation` or `Location` header.
    operation: Option<String>,
}

impl ArmResponse {
    /// Reads a response fully.
    async fn read(method: &'static str, url: &str, response: Response) -> Result<Self, AzureError> {
        let status = response.status();
        let operation = response
            .headers()
            .get("Azure-AsyncOperation")
            .or_else(|| response.headers().get("Location"))
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let text = response.text().await.map_err(|err| AzureError::Transport {
            method,
            url: url.to_string(),
            message: err.to_string(),
        })?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::Null)
        };
        Ok(Self {
            status,
            body,
            operation,
        })
    }

    /// Converts an unexpected status into an error.
    fn into_status_error(self, method: &'static str, url: &str) -> AzureError {
        AzureError::Status {
            method,
            url: url.to_string(),
            status: self.status.as_u16(),
            message: arm_error_message(&self.body),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the shared HTTP client.
fn build_http() -> Result<reqwest::Client, AzureError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|err| AzureError::Client(err.to_string()))
}

/// Extracts `code: message` from an ARM error envelope.
pub(crate) fn arm_error_message(body: &Value) -> String {
    let error = body.get("error").or_else(|| body.get("Error")).unwrap_or(body);
    let code = error.get("code").and_then(Value::as_str).unwrap_or("Unknown");
    let message = error.get("message").and_then(Value::as_str).unwrap_or("unknown error");
    format!("{code}: {message}")
}

/// Rejects names that cannot be placed verbatim in an ARM path.
fn validate_segment(name: &str) -> Result<(), AzureError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_RESOURCE_GROUP_NAME_LENGTH
        && !name.ends_with('.')
        && name.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '(' | ')'));
    if valid { Ok(()) } else { Err(AzureError::InvalidName(name.to_string())) }
}
