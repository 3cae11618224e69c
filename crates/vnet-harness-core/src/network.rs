// crates/vnet-harness-core/src/network.rs
// ============================================================================
// Module: Network Property Bags
// Description: Typed views of virtual networks, subnets, and security rules.
// Purpose: Normalize plan values and live cloud properties into one model.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Security rules reach the harness from two places: inline
//! `security_rule` blocks and standalone `azurerm_network_security_rule`
//! resources in a plan, and `securityRules` in the live resource. Both are
//! normalized into [`SecurityRule`] so compliance evaluation never depends on
//! where the data came from.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::assertions::AssertionError;
use crate::module::json_kind;
use crate::plan::PlanResult;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Plan resource type for network security groups.
pub const NSG_RESOURCE_TYPE: &str = "azurerm_network_security_group";
/// Plan resource type for standalone security rules.
pub const NSG_RULE_RESOURCE_TYPE: &str = "azurerm_network_security_rule";

/// Address prefixes that match any source or destination.
const OPEN_PREFIXES: &[&str] = &["*", "0.0.0.0/0", "::/0", "internet", "any"];
/// Port ranges covering every port.
const ALL_PORTS: &[&str] = &["*", "0-65535", "1-65535"];

// ============================================================================
// SECTION: Rule Enums
// ============================================================================

/// Traffic direction of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Traffic entering the protected resource.
    Inbound,
    /// Traffic leaving the protected resource.
    Outbound,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.eq_ignore_ascii_case("inbound") {
            Ok(Self::Inbound)
        } else if raw.eq_ignore_ascii_case("outbound") {
            Ok(Self::Outbound)
        } else {
            Err(format!("unknown rule direction `{raw}`"))
        }
    }
}

/// Rule effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    /// Permit matching traffic.
    Allow,
    /// Drop matching traffic.
    Deny,
}

impl FromStr for Access {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.eq_ignore_ascii_case("allow") {
            Ok(Self::Allow)
        } else if raw.eq_ignore_ascii_case("deny") {
            Ok(Self::Deny)
        } else {
            Err(format!("unknown rule access `{raw}`"))
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inbound => f.write_str("Inbound"),
            Self::Outbound => f.write_str("Outbound"),
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("Allow"),
            Self::Deny => f.write_str("Deny"),
        }
    }
}

// ============================================================================
// SECTION: Security Rule
// ============================================================================

/// One network security rule.
///
/// # Invariants
/// - Lower `priority` is evaluated first.
/// - Plural prefix/port fields are empty when the singular form is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityRule {
    /// Rule name.
    pub name: String,
    /// Evaluation priority (lower first).
    pub priority: u32,
    /// Traffic direction.
    pub direction: Direction,
    /// Rule effect.
    pub access: Access,
    /// Protocol (`Tcp`, `Udp`, `Icmp`, `*`, ...).
    pub protocol: String,
    /// Source port range.
    pub source_port_range: String,
    /// Destination port range.
    pub destination_port_range: String,
    /// Source address prefix.
    pub source_address_prefix: String,
    /// Destination address prefix.
    pub destination_address_prefix: String,
    /// Additional source port ranges.
    pub source_port_ranges: Vec<String>,
    /// Additional destination port ranges.
    pub destination_port_ranges: Vec<String>,
    /// Additional source address prefixes.
    pub source_address_prefixes: Vec<String>,
    /// Additional destination address prefixes.
    pub destination_address_prefixes: Vec<String>,
}

impl SecurityRule {
    /// Returns true when the rule matches every protocol.
    #[must_use]
    pub fn is_any_protocol(&self) -> bool {
        self.protocol == "*" || self.protocol.eq_ignore_ascii_case("any")
    }

    /// Returns true when any source prefix is fully open.
    #[must_use]
    pub fn has_open_source(&self) -> bool {
        is_open_prefix(&self.source_address_prefix)
            || self.source_address_prefixes.iter().any(|prefix| is_open_prefix(prefix))
    }

    /// Returns true when any destination prefix is fully open.
    #[must_use]
    pub fn has_open_destination(&self) -> bool {
        is_open_prefix(&self.destination_address_prefix)
            || self.destination_address_prefixes.iter().any(|prefix| is_open_prefix(prefix))
    }

    /// Returns true when the source ports cover every port.
    #[must_use]
    pub fn covers_all_source_ports(&self) -> bool {
        is_all_ports(&self.source_port_range)
            || self.source_port_ranges.iter().any(|range| is_all_ports(range))
    }

    /// Returns true when the destination ports cover every port.
    #[must_use]
    pub fn covers_all_destination_ports(&self) -> bool {
        is_all_ports(&self.destination_port_range)
            || self.destination_port_ranges.iter().any(|range| is_all_ports(range))
    }

    /// Returns true for an inbound Allow rule on any protocol from any
    /// source.
    #[must_use]
    pub fn is_overly_permissive(&self) -> bool {
        self.direction == Direction::Inbound
            && self.access == Access::Allow
            && self.is_any_protocol()
            && self.has_open_source()
    }

    /// Returns true for an inbound Deny rule matching all traffic. Such a
    /// rule shadows every rule with a higher priority number.
    #[must_use]
    pub fn is_inbound_catch_all_deny(&self) -> bool {
        self.direction == Direction::Inbound
            && self.access == Access::Deny
            && self.is_any_protocol()
            && self.has_open_source()
            && self.has_open_destination()
            && self.covers_all_source_ports()
            && self.covers_all_destination_ports()
    }

    /// Parses a rule from plan values (snake_case attributes).
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::TypeMismatch`] when required attributes are
    /// missing or have the wrong type.
    pub fn from_plan_value(address: &str, value: &Value) -> Result<Self, AssertionError> {
        let raw: PlanRuleValues =
            serde_json::from_value(value.clone()).map_err(|err| AssertionError::TypeMismatch {
                address: address.to_string(),
                attribute: "security_rule".to_string(),
                expected: "security rule object",
                actual: format!("{} ({err})", json_kind(value)),
            })?;
        let direction = raw
            .direction
            .parse::<Direction>()
            .map_err(|err| rule_mismatch(address, "direction", err))?;
        let access =
            raw.access.parse::<Access>().map_err(|err| rule_mismatch(address, "access", err))?;
        Ok(Self {
            name: raw.name,
            priority: raw.priority,
            direction,
            access,
            protocol: raw.protocol,
            source_port_range: raw.source_port_range.unwrap_or_default(),
            destination_port_range: raw.destination_port_range.unwrap_or_default(),
            source_address_prefix: raw.source_address_prefix.unwrap_or_default(),
            destination_address_prefix: raw.destination_address_prefix.unwrap_or_default(),
            source_port_ranges: raw.source_port_ranges.unwrap_or_default(),
            destination_port_ranges: raw.destination_port_ranges.unwrap_or_default(),
            source_address_prefixes: raw.source_address_prefixes.unwrap_or_default(),
            destination_address_prefixes: raw.destination_address_prefixes.unwrap_or_default(),
        })
    }
}

/// Plan attribute layout of a security rule.
#[derive(Deserialize)]
struct PlanRuleValues {
    /// Rule name.
    name: String,
    /// Priority.
    priority: u32,
    /// Direction label.
    direction: String,
    /// Access label.
    access: String,
    /// Protocol label.
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
    source_port_ranges: Option<Vec<String>>,
    /// Plural destination port ranges.
    #[serde(default)]
    destination_port_ranges: Option<Vec<String>>,
    /// Plural source prefixes.
    #[serde(default)]
    source_address_prefixes: Option<Vec<String>>,
    /// Plural destination prefixes.
    #[serde(default)]
    destination_address_prefixes: Option<Vec<String>>,
}

/// Builds a rule attribute mismatch.
fn rule_mismatch(address: &str, attribute: &str, detail: String) -> AssertionError {
    AssertionError::TypeMismatch {
        address: address.to_string(),
        attribute: attribute.to_string(),
        expected: "Inbound|Outbound or Allow|Deny",
        actual: detail,
    }
}

/// Returns true when `prefix` matches every address.
fn is_open_prefix(prefix: &str) -> bool {
    let trimmed = prefix.trim();
    OPEN_PREFIXES.iter().any(|open| trimmed.eq_ignore_ascii_case(open))
}

/// Returns true when `range` covers every port.
fn is_all_ports(range: &str) -> bool {
    let trimmed = range.trim();
    ALL_PORTS.contains(&trimmed)
}

// ============================================================================
// SECTION: Groups, Subnets, Networks
// ============================================================================

/// A network security group and its rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkSecurityGroup {
    /// Group name.
    pub name: String,
    /// Cloud resource id (unknown at plan time).
    pub id: Option<String>,
    /// Rules in declaration order.
    pub rules: Vec<SecurityRule>,
}

/// Live subnet properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetProperties {
    /// Subnet name.
    pub name: String,
    /// Address prefixes.
    pub address_prefixes: Vec<String>,
    /// Associated network security group id.
    pub network_security_group_id: Option<String>,
    /// Delegated service names.
    pub delegations: Vec<String>,
}

/// Live virtual network properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualNetworkProperties {
    /// Network name.
    pub name: String,
    /// Cloud resource id.
    pub id: String,
    /// Region.
    pub location: String,
    /// Address space prefixes.
    pub address_prefixes: Vec<String>,
    /// Custom DNS servers (empty means platform DNS).
    pub dns_servers: Vec<String>,
    /// Subnets.
    pub subnets: Vec<SubnetProperties>,
}

impl VirtualNetworkProperties {
    /// Returns subnet names in declaration order.
    #[must_use]
    pub fn subnet_names(&self) -> Vec<String> {
        self.subnets.iter().map(|subnet| subnet.name.clone()).collect()
    }
}

// ============================================================================
// SECTION: Plan Extraction
// ============================================================================

/// Extracts security groups and their rules from a plan.
///
/// Inline `security_rule` blocks are read from each group's `after` value.
/// Standalone rule resources are attached to the group named by their
/// `network_security_group_name` attribute; a group that only exists outside
/// the plan is represented by name.
///
/// # Errors
///
/// Returns [`AssertionError::TypeMismatch`] when a group or rule value has
/// an unexpected shape.
pub fn security_groups_from_plan(
    plan: &PlanResult,
) -> Result<Vec<NetworkSecurityGroup>, AssertionError> {
    let mut groups: Vec<NetworkSecurityGroup> = Vec::new();
    for change in plan.changes_of_type(NSG_RESOURCE_TYPE) {
        let Some(after) = change.change.after.as_ref() else {
            continue;
        };
        let name = string_attribute(&change.address, after, "name")?;
        let rules = match after.get("security_rule") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| SecurityRule::from_plan_value(&change.address, item))
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(AssertionError::TypeMismatch {
                    address: change.address.clone(),
                    attribute: "security_rule".to_string(),
                    expected: "array",
                    actual: json_kind(other).to_string(),
                });
            }
        };
        groups.push(NetworkSecurityGroup {
            name,
            id: None,
            rules,
        });
    }
    for change in plan.changes_of_type(NSG_RULE_RESOURCE_TYPE) {
        let Some(after) = change.change.after.as_ref() else {
            continue;
        };
        let group_name = string_attribute(&change.address, after, "network_security_group_name")?;
        let rule = SecurityRule::from_plan_value(&change.address, after)?;
        match groups.iter_mut().find(|group| group.name == group_name) {
            Some(group) => group.rules.push(rule),
            None => groups.push(NetworkSecurityGroup {
                name: group_name,
                id: None,
                rules: vec![rule],
            }),
        }
    }
    Ok(groups)
}

impl PlanResult {
    /// Extracts security groups from this plan.
    ///
    /// # Errors
    ///
    /// See [`security_groups_from_plan`].
    pub fn security_groups(&self) -> Result<Vec<NetworkSecurityGroup>, AssertionError> {
        security_groups_from_plan(self)
    }
}

/// Reads a string attribute from a plan value with an explicit type check.
pub(crate) fn string_attribute(
    address: &str,
    value: &Value,
    attribute: &str,
) -> Result<String, AssertionError> {
    match value.get(attribute) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(other) => Err(AssertionError::TypeMismatch {
            address: address.to_string(),
            attribute: attribute.to_string(),
            expected: "string",
            actual: json_kind(other).to_string(),
        }),
        None => Err(AssertionError::TypeMismatch {
            address: address.to_string(),
            attribute: attribute.to_string(),
            expected: "string",
            actual: "unknown until apply".to_string(),
        }),
    }
}
