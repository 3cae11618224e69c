// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared setup for module suites.
// Purpose: Build runners and common module inputs.
// Dependencies: system-tests, vnet-harness-runner, serde_json
// ============================================================================

//! ## Overview
//! Helpers shared by the plan and apply suites.

use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use system_tests::config::SystemTestConfig;
use vnet_harness_runner::HarnessError;
use vnet_harness_runner::MultiTenantTestRunner;
use vnet_harness_runner::init_test_logging;

/// Address space used by every scenario.
pub const ADDRESS_SPACE: &str = "10.0.0.0/16";

/// Installs test logging and builds a runner from the harness configuration.
pub fn runner() -> Result<MultiTenantTestRunner, HarnessError> {
    init_test_logging();
    MultiTenantTestRunner::from_global()
}

/// Loads the module locations.
pub fn modules() -> Result<SystemTestConfig, HarnessError> {
    Ok(SystemTestConfig::load()?)
}

/// Builds a `subnets` variable from `(name, prefix)` pairs.
pub fn subnets(entries: &[(&str, &str)]) -> Value {
    let map: Map<String, Value> = entries
        .iter()
        .map(|(name, prefix)| ((*name).to_string(), json!({ "address_prefixes": [prefix] })))
        .collect();
    Value::Object(map)
}
