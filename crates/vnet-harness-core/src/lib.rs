// crates/vnet-harness-core/src/lib.rs
// ============================================================================
// Module: VNet Harness Core
// Description: Data model and assertion layer for module integration tests.
// Purpose: Share tenant, module, plan, and network types across harness crates.
// Dependencies: serde, serde_json, regex, rand, thiserror
// ============================================================================

//! ## Overview
//! `vnet-harness-core` defines the records that flow through a tenant test
//! unit: the resolved [`TenantConfig`], the [`ModuleOptions`] handed to the
//! provisioning tool, the parsed [`PlanResult`] and [`Outputs`], and the
//! network property bags returned by the cloud query boundary. It also hosts
//! the four assertion families and the retry classification used by the
//! module invoker.
//!
//! Everything in this crate is pure: no process spawning, no network calls.
//! Assertions operate on already-fetched data and return typed
//! [`AssertionError`] values carrying expected/actual values and the resource
//! address involved.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod assertions;
pub mod compliance;
pub mod module;
pub mod network;
pub mod outputs;
pub mod plan;
pub mod retry;
pub mod tenant;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use assertions::AssertionError;
pub use assertions::VirtualNetworkExpectation;
pub use assertions::require_contains_all;
pub use assertions::require_count;
pub use assertions::require_equal;
pub use assertions::require_output_keys;
pub use assertions::require_planned_resource;
pub use assertions::require_resource_name_contains;
pub use assertions::require_virtual_network;
pub use compliance::ComplianceViolation;
pub use compliance::ViolationKind;
pub use compliance::evaluate_security_groups;
pub use compliance::evaluate_subnet_protection;
pub use compliance::require_no_permissive_inbound;
pub use compliance::require_security_compliance;
pub use compliance::require_subnets_protected;
pub use module::ModuleOptions;
pub use module::ModuleOptionsBuilder;
pub use module::ModuleOptionsError;
pub use network::Access;
pub use network::Direction;
pub use network::NetworkSecurityGroup;
pub use network::SecurityRule;
pub use network::SubnetProperties;
pub use network::VirtualNetworkProperties;
pub use network::security_groups_from_plan;
pub use outputs::OutputValue;
pub use outputs::Outputs;
pub use plan::Change;
pub use plan::ChangeAction;
pub use plan::PlanParseError;
pub use plan::PlanResult;
pub use plan::PlannedResource;
pub use plan::ResourceChange;
pub use retry::RetryPolicy;
pub use retry::RetryablePattern;
pub use tenant::Credentials;
pub use tenant::PROVIDER_AUTH_ENV;
pub use tenant::Secret;
pub use tenant::TenantConfig;
pub use tenant::UniqueId;
pub use tenant::UniqueIdError;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod compliance_tests;
#[cfg(test)]
mod retry_tests;
