// crates/vnet-harness-azure/src/resources.rs
// ============================================================================
// Module: ARM Resource Documents
// Description: Deserialization of ARM network documents into property bags.
// Purpose: Keep the ARM wire shape out of assertion code.
// Dependencies: serde, serde_json, vnet-harness-core
// ============================================================================

//! ## Overview
//! ARM returns camelCase documents with a `properties` envelope. This module
//! decodes virtual networks, network security groups, and resource groups
//! into the normalized [`vnet_harness_core`] property bags. Optional ARM
//! fields default to empty; rule direction and access must parse.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use vnet_harness_core::Access;
use vnet_harness_core::Direction;
use vnet_harness_core::NetworkSecurityGroup;
use vnet_harness_core::SecurityRule;
use vnet_harness_core::SubnetProperties;
use vnet_harness_core::VirtualNetworkProperties;

// ============================================================================
// SECTION: Resource Groups
// ============================================================================

/// Summary of one resource group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroupSummary {
    /// Group name.
    pub name: String,
    /// Region.
    pub location: String,
    /// Resource tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// One page of a list response.
#[derive(Deserialize)]
pub(crate) struct Page<T> {
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub(crate) value: Vec<T>,
    /// Next page URL.
    #[serde(default, rename = "nextLink")]
    pub(crate) next_link: Option<String>,
}

// ============================================================================
// SECTION: Virtual Networks
// ============================================================================

/// ARM virtual network document.
#[derive(Deserialize)]
pub(crate) struct ArmVirtualNetwork {
    /// Network name.
    name: String,
    /// Resource id.
    #[serde(default)]
    id: String,
    /// Region.
    #[serde(default)]
    location: String,
    /// Properties envelope.
    #[serde(default)]
    properties: ArmVirtualNetworkProperties,
}

/// Virtual network properties envelope.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ArmVirtualNetworkProperties {
    /// Address space.
    #[serde(default)]
    address_space: ArmAddressSpace,
    /// DHCP options carrying custom DNS servers.
    #[serde(default)]
    dhcp_options: ArmDhcpOptions,
    /// Inline subnets.
    #[serde(default)]
    subnets: Vec<ArmSubnet>,
}

/// Address space block.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ArmAddressSpace {
    /// Address prefixes.
    #[serde(default)]
    address_prefixes: Vec<String>,
}

/// DHCP options block.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ArmDhcpOptions {
    /// DNS servers.
    #[serde(default)]
    dns_servers: Vec<String>,
}

/// ARM subnet document.
#[derive(Deserialize)]
struct ArmSubnet {
    /// Subnet name.
    name: String,
    /// Properties envelope.
    #[serde(default)]
    properties: ArmSubnetProperties,
}

/// Subnet properties envelope.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ArmSubnetProperties {
    /// Singular address prefix.
    #[serde(default)]
    address_prefix: Option<String>,
    /// Plural address prefixes.
    #[serde(default)]
    address_prefixes: Vec<String>,
    /// Associated security group reference.
    #[serde(default)]
    network_security_group: Option<ArmReference>,
    /// Service delegations.
    #[serde(default)]
    delegations: Vec<ArmDelegation>,
}

/// `{ "id": ... }` reference.
#[derive(Deserialize)]
struct ArmReference {
    /// Referenced resource id.
    id: String,
}

/// Subnet delegation.
#[derive(Deserialize)]
struct ArmDelegation {
    /// Delegation properties.
    #[serde(default)]
    properties: ArmDelegationProperties,
}

/// Delegation properties envelope.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ArmDelegationProperties {
    /// Delegated service name.
    #[serde(default)]
    service_name: Option<String>,
}

impl From<ArmVirtualNetwork> for VirtualNetworkProperties {
    fn from(raw: ArmVirtualNetwork) -> Self {
        Self {
            name: raw.name,
            id: raw.id,
            location: raw.location,
            address_prefixes: raw.properties.address_space.address_prefixes,
            dns_servers: raw.properties.dhcp_options.dns_servers,
            subnets: raw.properties.subnets.into_iter().map(SubnetProperties::from).collect(),
        }
    }
}

impl From<ArmSubnet> for SubnetProperties {
    fn from(raw: ArmSubnet) -> Self {
        let mut address_prefixes = raw.properties.address_prefixes;
        if let Some(prefix) = raw.properties.address_prefix
            && !address_prefixes.contains(&prefix)
        {
            address_prefixes.insert(0, prefix);
        }
        Self {
            name: raw.name,
            address_prefixes,
            network_security_group_id: raw.properties.network_security_group.map(|group| group.id),
            delegations: raw
                .properties
                .delegations
                .into_iter()
                .filter_map(|delegation| delegation.properties.service_name)
                .collect(),
        }
    }
}

// ============================================================================
// SECTION: Network Security Groups
// ============================================================================

/// ARM network security group document.
#[derive(Deserialize)]
pub(crate) struct ArmSecurityGroup {
    /// Group name.
    name: String,
    /// Resource id.
    #[serde(default)]
    id: Option<String>,
    /// Properties envelope.
    #[serde(default)]
    properties: ArmSecurityGroupProperties,
}

/// Security group properties envelope.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ArmSecurityGroupProperties {
    /// Custom rules; default rules are not evaluated.
    #[serde(default)]
    security_rules: Vec<ArmSecurityRule>,
}

/// ARM security rule document.
#[derive(Deserialize)]
struct ArmSecurityRule {
    /// Rule name.
    name: String,
    /// Properties envelope.
    properties: ArmSecurityRuleProperties,
}

/// Security rule properties envelope.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmSecurityRuleProperties {
    /// Priority.
    priority: u32,
    /// Direction.
    direction: Direction,
    /// Access.
    access: Access,
    /// Protocol.
    protocol: String,
    /// Singular source port range.
    #[serde(default)]
    source_port_range: Option<String>,
    /// Singular destination port range.
    #[serde(default)]
    destination_port_range: Option<String>,
    /// Singular source prefix.
    #[serde(default)]
    source_address_prefix: Option<String>,
    /// Singular destination prefix.
    #[serde(default)]
    destination_address_prefix: Option<String>,
    /// Plural source port ranges.
    #[serde(default)]
    source_port_ranges: Vec<String>,
    /// Plural destination port ranges.
    #[serde(default)]
    destination_port_ranges: Vec<String>,
    /// Plural source prefixes.
    #[serde(default)]
    source_address_prefixes: Vec<String>,
    /// Plural destination prefixes.
    #[serde(default)]
    destination_address_prefixes: Vec<String>,
}

impl From<ArmSecurityGroup> for NetworkSecurityGroup {
    fn from(raw: ArmSecurityGroup) -> Self {
        Self {
            name: raw.name,
            id: raw.id,
            rules: raw
                .properties
                .security_rules
                .into_iter()
                .map(|rule| {
                    let props = rule.properties;
                    SecurityRule {
                        name: rule.name,
                        priority: props.priority,
                        direction: props.direction,
                        access: props.access,
                        protocol: props.protocol,
                        source_port_range: props.source_port_range.unwrap_or_default(),
                        destination_port_range: props.destination_port_range.unwrap_or_default(),
                        source_address_prefix: props.source_address_prefix.unwrap_or_default(),
                        destination_address_prefix: props
                            .destination_address_prefix
                            .unwrap_or_default(),
                        source_port_ranges: props.source_port_ranges,
                        destination_port_ranges: props.destination_port_ranges,
                        source_address_prefixes: props.source_address_prefixes,
                        destination_address_prefixes: props.destination_address_prefixes,
                    }
                })
                .collect(),
        }
    }
}
