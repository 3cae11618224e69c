// crates/vnet-harness-runner/src/scope.rs
// ============================================================================
// Module: Tenant Scope
// Description: Per-unit handle given to test bodies.
// Purpose: Tie resource acquisition to cleanup registration.
// Dependencies: tracing, vnet-harness-*
// ============================================================================

//! ## Overview
//! A [`TenantScope`] exposes the unit's resolved [`TenantConfig`] and the
//! operations with side effects. Each acquiring operation registers its
//! release on the unit's [`CleanupStack`] before the acquiring call:
//! - [`TenantScope::create_resource_group`] registers deletion first;
//! - [`TenantScope::apply`] registers destroy first.
//!
//! Destroy is registered after the resource group, so it runs first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;
use vnet_harness_azure::CloudClient;
use vnet_harness_core::ModuleOptions;
use vnet_harness_core::ModuleOptionsBuilder;
use vnet_harness_core::NetworkSecurityGroup;
use vnet_harness_core::Outputs;
use vnet_harness_core::PlanResult;
use vnet_harness_core::TenantConfig;
use vnet_harness_core::VirtualNetworkProperties;
use vnet_harness_terraform::ModuleRun;
use vnet_harness_terraform::ProvisioningTool;

use crate::cleanup::CleanupStack;
use crate::error::HarnessError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tag carrying the test name.
pub const TAG_TEST: &str = "harness-test";
/// Tag carrying the tenant name.
pub const TAG_TENANT: &str = "harness-tenant";
/// Tag carrying the unit's unique id.
pub const TAG_UNIQUE_ID: &str = "harness-unique-id";
/// Tag carrying the RFC 3339 creation time.
pub const TAG_CREATED_AT: &str = "harness-created-at";

// ============================================================================
// SECTION: Tenant Scope
// ============================================================================

/// Handle to one tenant unit.
pub struct TenantScope {
    /// Test name.
    test_name: String,
    /// Resolved tenant configuration.
    config: TenantConfig,
    /// Tenant-scoped cloud client.
    cloud: Arc<dyn CloudClient>,
    /// Provisioning tool.
    tool: Arc<dyn ProvisioningTool>,
    /// Unit cleanup stack.
    cleanup: CleanupStack,
    /// Set once resource group creation has been requested.
    resource_group_requested: AtomicBool,
}

impl TenantScope {
    /// Creates a scope for one unit.
    #[must_use]
    pub fn new(
        test_name: &str,
        config: TenantConfig,
        cloud: Arc<dyn CloudClient>,
        tool: Arc<dyn ProvisioningTool>,
        cleanup: CleanupStack,
    ) -> Self {
        Self {
            test_name: test_name.to_string(),
            config,
            cloud,
            tool,
            cleanup,
            resource_group_requested: AtomicBool::new(false),
        }
    }

    /// Returns the test name.
    #[must_use]
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// Returns the resolved tenant configuration.
    #[must_use]
    pub const fn config(&self) -> &TenantConfig {
        &self.config
    }

    /// Returns the unit's resource group name.
    #[must_use]
    pub fn resource_group_name(&self) -> String {
        self.config.resource_group_name()
    }

    /// Returns `{base}-{unique_id}`.
    #[must_use]
    pub fn qualified_name(&self, base: &str) -> String {
        self.config.qualified_name(base)
    }

    /// Returns the tenant-scoped cloud client.
    #[must_use]
    pub fn cloud(&self) -> &dyn CloudClient {
        self.cloud.as_ref()
    }

    /// Returns true once resource group creation has been requested.
    #[must_use]
    pub fn resource_group_requested(&self) -> bool {
        self.resource_group_requested.load(Ordering::SeqCst)
    }

    /// Starts module options for `terraform_dir` with the tenant's provider
    /// environment and the `resource_group_name` and `location` variables.
    #[must_use]
    pub fn module_options(&self, terraform_dir: impl AsRef<Path>) -> ModuleOptionsBuilder {
        ModuleOptions::builder(terraform_dir.as_ref())
            .tenant_env(&self.config)
            .var("resource_group_name", self.resource_group_name())
            .var("location", self.config.region.clone())
    }

    /// Registers a custom release action.
    pub fn defer<F>(&self, label: impl Into<String>, release: F)
    where
        F: Future<Output = Result<(), HarnessError>> + Send + 'static,
    {
        self.cleanup.defer(label, release);
    }

    // ------------------------------------------------------------------------
    // Resource group lifecycle
    // ------------------------------------------------------------------------

    /// Creates the unit's resource group in the tenant region.
    ///
    /// Deletion is registered before the create request is sent.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Azure`] when creation fails.
    pub async fn create_resource_group(&self) -> Result<String, HarnessError> {
        let name = self.resource_group_name();
        let cloud = Arc::clone(&self.cloud);
        let release_name = name.clone();
        self.cleanup.defer(format!("delete resource group {name}"), async move {
            cloud.delete_resource_group(&release_name).await.map_err(HarnessError::from)
        });
        self.resource_group_requested.store(true, Ordering::SeqCst);
        self.cloud.create_resource_group(&name, &self.config.region, &self.tags()).await?;
        info!(resource_group = %name, region = %self.config.region, "resource group ready");
        Ok(name)
    }

    /// Fails when the unit's resource group still exists.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::ResourceGroupLeaked`] when the group exists,
    /// or [`HarnessError::Azure`] when the check fails.
    pub async fn verify_deleted(&self) -> Result<(), HarnessError> {
        let name = self.resource_group_name();
        if self.cloud.resource_group_exists(&name).await? {
            return Err(HarnessError::ResourceGroupLeaked(name));
        }
        Ok(())
    }

    /// Returns the tags applied to the resource group.
    fn tags(&self) -> BTreeMap<String, String> {
        let created_at =
            OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| String::from("unknown"));
        BTreeMap::from([
            (TAG_TEST.to_string(), self.test_name.clone()),
            (TAG_TENANT.to_string(), self.config.tenant_name.clone()),
            (TAG_UNIQUE_ID.to_string(), self.config.unique_id.to_string()),
            (TAG_CREATED_AT.to_string(), created_at),
        ])
    }

    // ------------------------------------------------------------------------
    // Module lifecycle
    // ------------------------------------------------------------------------

    /// Runs init + plan in an isolated working area.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Terraform`] when the tool fails.
    pub async fn plan(&self, options: ModuleOptions) -> Result<PlanResult, HarnessError> {
        let run = ModuleRun::new(options)?;
        Ok(self.tool.plan(&run).await?)
    }

    /// Runs init + apply and returns the outputs.
    ///
    /// Destroy is registered before apply starts; the working area lives
    /// until cleanup has run.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Terraform`] when the tool fails or the options
    /// are plan-only.
    pub async fn apply(&self, options: ModuleOptions) -> Result<Outputs, HarnessError> {
        let label = format!("destroy {}", options.terraform_dir().display());
        let run = Arc::new(ModuleRun::new(options)?);
        let tool = Arc::clone(&self.tool);
        let release_run = Arc::clone(&run);
        self.cleanup.defer(label, async move {
            tool.destroy(&release_run).await.map_err(HarnessError::from)
        });
        Ok(self.tool.apply(&run).await?)
    }

    // ------------------------------------------------------------------------
    // Live queries
    // ------------------------------------------------------------------------

    /// Fetches a virtual network in the unit's resource group.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Azure`] when the query fails.
    pub async fn virtual_network(
        &self,
        name: &str,
    ) -> Result<VirtualNetworkProperties, HarnessError> {
        Ok(self.cloud.get_virtual_network(&self.resource_group_name(), name).await?)
    }

    /// Lists network security groups in the unit's resource group.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Azure`] when the query fails.
    pub async fn security_groups(&self) -> Result<Vec<NetworkSecurityGroup>, HarnessError> {
        Ok(self.cloud.list_network_security_groups(&self.resource_group_name()).await?)
    }
}
