// system-tests/tests/suites/apply_scenarios.rs
// ============================================================================
// Module: Apply Scenarios
// Description: Full deploy of the VNet module into per-tenant resource groups.
// Purpose: Validate outputs and live resources, then tear everything down.
// Dependencies: vnet-harness-core, vnet-harness-runner
// ============================================================================

//! ## Overview
//! Creates real Azure resources. Set `VNET_HARNESS_SKIP_APPLY=true` to skip.
//! Destroy and resource group deletion are registered by the scope and run
//! whether or not the assertions pass.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use serde_json::json;
use tracing::info;
use vnet_harness_core::VirtualNetworkExpectation;
use vnet_harness_core::require_equal;
use vnet_harness_core::require_no_permissive_inbound;
use vnet_harness_core::require_output_keys;
use vnet_harness_core::require_virtual_network;
use vnet_harness_runner::HarnessError;

use crate::helpers;
use crate::helpers::ADDRESS_SPACE;

/// Subnets deployed by the apply scenario.
const SUBNETS: [(&str, &str); 3] =
    [("default", "10.0.1.0/24"), ("aks", "10.0.2.0/24"), ("gateway", "10.0.3.0/27")];

/// DNS servers configured on the network.
const DNS_SERVERS: [&str; 2] = ["8.8.8.8", "8.8.4.4"];

#[tokio::test(flavor = "multi_thread")]
async fn virtual_network_deploys_with_subnets_and_dns() -> Result<(), HarnessError> {
    let modules = helpers::modules()?;
    if modules.skip_apply {
        info!("apply scenarios skipped");
        return Ok(());
    }
    let dir = modules.vnet_module_dir().to_path_buf();
    helpers::runner()?
        .run("virtual_network_deploys_with_subnets_and_dns", move |scope| {
            let dir = dir.clone();
            async move {
                scope.create_resource_group().await?;
                let vnet_name = scope.qualified_name("vnet-test");
                let options = scope
                    .module_options(&dir)
                    .var("vnet_name", vnet_name.as_str())
                    .var("address_space", json!([ADDRESS_SPACE]))
                    .var("dns_servers", json!(DNS_SERVERS))
                    .var("subnets", helpers::subnets(&SUBNETS))
                    .build()?;
                let outputs = scope.apply(options).await?;

                require_equal("output vnet_name", outputs.string("vnet_name")?, vnet_name.as_str())?;
                let subnet_names: Vec<&str> = SUBNETS.iter().map(|(name, _)| *name).collect();
                require_output_keys(&outputs, "subnet_ids", &subnet_names)?;

                let network = scope.virtual_network(&vnet_name).await?;
                require_virtual_network(&network, &VirtualNetworkExpectation {
                    subnet_count: Some(SUBNETS.len()),
                    subnet_names: subnet_names.iter().map(ToString::to_string).collect(),
                    dns_servers: DNS_SERVERS.iter().map(ToString::to_string).collect(),
                    address_prefixes: vec![ADDRESS_SPACE.to_string()],
                    location: Some(scope.config().region.clone()),
                })?;
                require_no_permissive_inbound(&scope.security_groups().await?)?;
                Ok(())
            }
        })
        .await
        .into_result()?;
    Ok(())
}
