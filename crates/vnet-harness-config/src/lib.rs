// crates/vnet-harness-config/src/lib.rs
// ============================================================================
// Module: VNet Harness Config
// Description: Tenant definitions, runner settings, and tenant resolution.
// Purpose: Load process-wide configuration once and resolve per-unit tenants.
// Dependencies: serde, toml, thiserror, vnet-harness-core
// ============================================================================

//! ## Overview
//! The tenant definition list is the only state shared between parallel test
//! units. It is loaded once per process ([`global_config`]) and read-only
//! thereafter; each unit turns its definition into an owned
//! [`vnet_harness_core::TenantConfig`] with [`resolve`].
//! Security posture: configuration and environment inputs are untrusted and
//! fail closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;
pub mod resolver;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuthMode;
pub use config::ConfigError;
pub use config::HarnessConfig;
pub use config::RunnerSettings;
pub use config::TenantDefaults;
pub use config::TenantDefinition;
pub use config::global_config;
pub use env::EnvOverrides;
pub use env::HarnessEnv;
pub use env::read_env_strict;
pub use resolver::resolve;
pub use resolver::resolve_with_id;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod env_tests;
