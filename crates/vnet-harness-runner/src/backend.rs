// crates/vnet-harness-runner/src/backend.rs
// ============================================================================
// Module: Unit Backend
// Description: Factory for the cloud client and provisioning tool of a unit.
// Purpose: Let the runner drive real Azure or in-process fakes uniformly.
// Dependencies: vnet-harness-azure, vnet-harness-terraform
// ============================================================================

//! ## Overview
//! The runner asks a [`Backend`] for a tenant-scoped [`CloudClient`] (auth
//! setup) and a [`ProvisioningTool`] once per unit. [`AzureBackend`] builds
//! an ARM client from the tenant's credentials and a binary-backed
//! [`Terraform`] invoker.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use vnet_harness_azure::ArmClient;
use vnet_harness_azure::CloudClient;
use vnet_harness_azure::Endpoints;
use vnet_harness_core::TenantConfig;
use vnet_harness_terraform::ProvisioningTool;
use vnet_harness_terraform::Terraform;

use crate::error::HarnessError;

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Builds per-unit collaborators.
pub trait Backend: Send + Sync {
    /// Returns a cloud client authenticated as the tenant.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the client cannot be built.
    fn cloud(&self, config: &TenantConfig) -> Result<Arc<dyn CloudClient>, HarnessError>;

    /// Returns the provisioning tool for the tenant.
    fn tool(&self, config: &TenantConfig) -> Arc<dyn ProvisioningTool>;
}

/// ARM + terraform backend.
#[derive(Debug, Clone, Default)]
pub struct AzureBackend {
    /// ARM and login endpoints.
    endpoints: Endpoints,
    /// Shared invoker.
    terraform: Terraform,
}

impl AzureBackend {
    /// Creates a backend using `terraform_bin` against the public cloud.
    #[must_use]
    pub fn new(terraform_bin: &str) -> Self {
        Self {
            endpoints: Endpoints::default(),
            terraform: Terraform::new(terraform_bin),
        }
    }

    /// Overrides the ARM and login endpoints.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

impl Backend for AzureBackend {
    fn cloud(&self, config: &TenantConfig) -> Result<Arc<dyn CloudClient>, HarnessError> {
        Ok(Arc::new(ArmClient::for_tenant(config, &self.endpoints)?))
    }

    fn tool(&self, _config: &TenantConfig) -> Arc<dyn ProvisioningTool> {
        Arc::new(self.terraform.clone())
    }
}
