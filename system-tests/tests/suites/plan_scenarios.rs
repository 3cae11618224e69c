// system-tests/tests/suites/plan_scenarios.rs
// ============================================================================
// Module: Plan Scenarios
// Description: Plan-only checks of the basic and complete module examples.
// Purpose: Validate plan shape, naming, and security rules per tenant.
// Dependencies: vnet-harness-core, vnet-harness-runner
// ============================================================================

//! ## Overview
//! Each test runs once per configured tenant. Options are plan-only, so the
//! provisioning tool never applies and destroy is a no-op.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use serde_json::json;
use vnet_harness_core::require_count;
use vnet_harness_core::require_equal;
use vnet_harness_core::require_no_permissive_inbound;
use vnet_harness_core::require_planned_resource;
use vnet_harness_core::require_resource_name_contains;
use vnet_harness_runner::HarnessError;

use crate::helpers;
use crate::helpers::ADDRESS_SPACE;

#[tokio::test(flavor = "multi_thread")]
async fn basic_module_plans_virtual_network() -> Result<(), HarnessError> {
    let dir = helpers::modules()?.example_dir("basic");
    helpers::runner()?
        .run("basic_module_plans_virtual_network", move |scope| {
            let dir = dir.clone();
            async move {
                let options = scope
                    .module_options(&dir)
                    .var("environment", "test")
                    .var("address_space", json!([ADDRESS_SPACE]))
                    .var("subnets", helpers::subnets(&[("default", "10.0.1.0/24")]))
                    .plan_only(true)
                    .build()?;
                let plan = scope.plan(options).await?;
                require_planned_resource(&plan, "azurerm_virtual_network.main")?;
                Ok(())
            }
        })
        .await
        .into_result()?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn security_groups_plan_without_permissive_inbound() -> Result<(), HarnessError> {
    let dir = helpers::modules()?.example_dir("complete");
    helpers::runner()?
        .run("security_groups_plan_without_permissive_inbound", move |scope| {
            let dir = dir.clone();
            async move {
                let options = scope
                    .module_options(&dir)
                    .var("environment", "test")
                    .var("address_space", json!([ADDRESS_SPACE]))
                    .var(
                        "subnets",
                        json!({
                            "web": {
                                "address_prefixes": ["10.0.1.0/24"],
                                "network_security_group_keys": ["web-nsg"]
                            },
                            "app": {
                                "address_prefixes": ["10.0.2.0/24"],
                                "network_security_group_keys": ["app-nsg"]
                            }
                        }),
                    )
                    .var(
                        "network_security_groups",
                        json!({
                            "web-nsg": {"security_rules": [{
                                "name": "AllowHTTP",
                                "priority": 100,
                                "direction": "Inbound",
                                "access": "Allow",
                                "protocol": "Tcp",
                                "source_port_range": "*",
                                "destination_port_range": "80",
                                "source_address_prefix": "*",
                                "destination_address_prefix": "*"
                            }]},
                            "app-nsg": {"security_rules": [{
                                "name": "DenyAllInbound",
                                "priority": 100,
                                "direction": "Inbound",
                                "access": "Deny",
                                "protocol": "*",
                                "source_port_range": "*",
                                "destination_port_range": "*",
                                "source_address_prefix": "*",
                                "destination_address_prefix": "*"
                            }]}
                        }),
                    )
                    .plan_only(true)
                    .build()?;
                let plan = scope.plan(options).await?;
                require_planned_resource(&plan, "azurerm_network_security_group.nsgs")?;
                let groups = plan.security_groups()?;
                require_count("planned security groups", &groups, 2)?;
                require_no_permissive_inbound(&groups)?;
                let catch_all_denies = groups
                    .iter()
                    .flat_map(|group| &group.rules)
                    .filter(|rule| rule.is_inbound_catch_all_deny())
                    .count();
                require_equal("inbound catch-all deny rules", &catch_all_denies, &1)?;
                Ok(())
            }
        })
        .await
        .into_result()?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn virtual_network_name_carries_environment() -> Result<(), HarnessError> {
    let dir = helpers::modules()?.example_dir("basic");
    helpers::runner()?
        .run("virtual_network_name_carries_environment", move |scope| {
            let dir = dir.clone();
            async move {
                let options = scope
                    .module_options(&dir)
                    .var("environment", "prod")
                    .var("naming_prefix", "vnetprod")
                    .var("address_space", json!([ADDRESS_SPACE]))
                    .plan_only(true)
                    .build()?;
                let plan = scope.plan(options).await?;
                require_resource_name_contains(&plan, "azurerm_virtual_network", "prod")?;
                Ok(())
            }
        })
        .await
        .into_result()?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn delegated_subnet_is_planned() -> Result<(), HarnessError> {
    let dir = helpers::modules()?.example_dir("complete");
    helpers::runner()?
        .run("delegated_subnet_is_planned", move |scope| {
            let dir = dir.clone();
            async move {
                let options = scope
                    .module_options(&dir)
                    .var("environment", "test")
                    .var("address_space", json!([ADDRESS_SPACE]))
                    .var(
                        "subnets",
                        json!({
                            "aks": {
                                "address_prefixes": ["10.0.1.0/24"],
                                "delegations": [{
                                    "name": "aks-delegation",
                                    "service_name": "Microsoft.ContainerService/managedClusters",
                                    "actions": [
                                        "Microsoft.Network/virtualNetworks/subnets/join/action"
                                    ]
                                }]
                            }
                        }),
                    )
                    .plan_only(true)
                    .build()?;
                let plan = scope.plan(options).await?;
                require_planned_resource(&plan, "azurerm_subnet.subnets")?;
                Ok(())
            }
        })
        .await
        .into_result()?;
    Ok(())
}
