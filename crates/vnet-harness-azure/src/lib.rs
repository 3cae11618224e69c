// crates/vnet-harness-azure/src/lib.rs
// ============================================================================
// Module: VNet Harness Azure
// Description: Cloud query boundary for tenant test units.
// Purpose: Manage resource groups and fetch live network properties.
// Dependencies: async-trait, reqwest, serde, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! The harness touches the cloud directly for two things only: the
//! per-unit resource group lifecycle and read-only queries of provisioned
//! network resources. Everything else is done by the provisioning tool.
//! Security posture: secrets are held in [`vnet_harness_core::Secret`] and
//! never logged; resource names are validated before they reach a URL.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod error;
pub mod resources;
pub mod token;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::ArmClient;
pub use client::CloudClient;
pub use client::Endpoints;
pub use error::AzureError;
pub use resources::ResourceGroupSummary;
pub use token::AzureCliTokenProvider;
pub use token::ServicePrincipalTokenProvider;
pub use token::StaticToken;
pub use token::TokenProvider;
pub use token::token_provider_for;

// ============================================================================
// SECTION: Tests
// ============================================================================
