// crates/vnet-harness-core/src/compliance_tests.rs
// ============================================================================
// Module: Compliance Unit Tests
// Description: Unit coverage for security group and subnet compliance.
// Purpose: Ensure priority ordering, shadowing, and subnet checks hold.
// Dependencies: vnet-harness-core, serde_json
// ============================================================================

//! ## Overview
//! Unit coverage for [`crate::compliance`], including rules extracted from a
//! plan with both inline and standalone security rules.

#![allow(
    clippy::expect_used,
    clippy::panic,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use serde_json::json;

use crate::assertions::AssertionError;
use crate::compliance::ViolationKind;
use crate::compliance::evaluate_security_groups;
use crate::compliance::evaluate_subnet_protection;
use crate::compliance::require_no_permissive_inbound;
use crate::compliance::require_security_compliance;
use crate::network::Access;
use crate::network::Direction;
use crate::network::NetworkSecurityGroup;
use crate::network::SecurityRule;
use crate::network::SubnetProperties;
use crate::plan::PlanResult;

fn rule(name: &str, priority: u32, access: Access, protocol: &str, source: &str) -> SecurityRule {
    SecurityRule {
        name: name.to_string(),
        priority,
        direction: Direction::Inbound,
        access,
        protocol: protocol.to_string(),
        source_port_range: "*".to_string(),
        destination_port_range: "*".to_string(),
        source_address_prefix: source.to_string(),
        destination_address_prefix: "*".to_string(),
        source_port_ranges: Vec::new(),
        destination_port_ranges: Vec::new(),
        source_address_prefixes: Vec::new(),
        destination_address_prefixes: Vec::new(),
    }
}

fn group(name: &str, rules: Vec<SecurityRule>) -> NetworkSecurityGroup {
    NetworkSecurityGroup {
        name: name.to_string(),
        id: None,
        rules,
    }
}

#[test]
fn scoped_allow_and_deny_all_are_compliant() {
    let mut http = rule("allow-http", 100, Access::Allow, "Tcp", "*");
    http.destination_port_range = "80".to_string();
    let groups = vec![
        group("web-nsg", vec![http]),
        group("app-nsg", vec![rule("deny-all", 4096, Access::Deny, "*", "*")]),
    ];
    require_no_permissive_inbound(&groups).expect("compliant");
}

#[test]
fn any_protocol_from_anywhere_is_flagged() {
    let groups = vec![group("web-nsg", vec![rule("allow-all", 100, Access::Allow, "*", "Internet")])];
    let violations = evaluate_security_groups(&groups);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::PermissiveInbound);
    assert_eq!(violations[0].group, "web-nsg");
    assert_eq!(violations[0].rule.as_deref(), Some("allow-all"));
}

#[test]
fn restricted_source_is_not_flagged() {
    let groups =
        vec![group("app-nsg", vec![rule("allow-vnet", 100, Access::Allow, "*", "10.0.0.0/16")])];
    assert!(evaluate_security_groups(&groups).is_empty());
}

#[test]
fn outbound_rules_are_not_flagged() {
    let mut outbound = rule("allow-out", 100, Access::Allow, "*", "*");
    outbound.direction = Direction::Outbound;
    assert!(evaluate_security_groups(&[group("nsg", vec![outbound])]).is_empty());
}

#[test]
fn catch_all_deny_shadows_later_rules() {
    let groups = vec![group(
        "nsg",
        vec![
            rule("allow-all", 200, Access::Allow, "*", "*"),
            rule("deny-all", 100, Access::Deny, "*", "*"),
        ],
    )];
    assert!(evaluate_security_groups(&groups).is_empty());
}

#[test]
fn permissive_rule_before_deny_is_flagged() {
    let groups = vec![group(
        "nsg",
        vec![
            rule("deny-all", 4096, Access::Deny, "*", "*"),
            rule("allow-all", 100, Access::Allow, "*", "*"),
        ],
    )];
    let violations = evaluate_security_groups(&groups);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].rule.as_deref(), Some("allow-all"));
}

#[test]
fn partial_deny_does_not_shadow() {
    let mut deny_ssh = rule("deny-ssh", 100, Access::Deny, "*", "*");
    deny_ssh.destination_port_range = "22".to_string();
    let groups =
        vec![group("nsg", vec![deny_ssh, rule("allow-all", 200, Access::Allow, "*", "*")])];
    assert_eq!(evaluate_security_groups(&groups).len(), 1);
}

#[test]
fn deny_on_one_source_port_does_not_shadow() {
    let mut deny_port = rule("deny-from-1234", 100, Access::Deny, "*", "*");
    deny_port.source_port_range = "1234".to_string();
    assert!(!deny_port.is_inbound_catch_all_deny());
    let groups =
        vec![group("nsg", vec![deny_port, rule("allow-all", 200, Access::Allow, "*", "*")])];
    let violations = evaluate_security_groups(&groups);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].rule.as_deref(), Some("allow-all"));
}

#[test]
fn deny_with_wildcard_in_source_port_list_shadows() {
    let mut deny_all = rule("deny-all", 100, Access::Deny, "*", "*");
    deny_all.source_port_range = String::new();
    deny_all.source_port_ranges = vec!["1234".to_string(), "*".to_string()];
    assert!(deny_all.covers_all_source_ports());
    let groups =
        vec![group("nsg", vec![deny_all, rule("allow-all", 200, Access::Allow, "*", "*")])];
    assert!(evaluate_security_groups(&groups).is_empty());
}

#[test]
fn plan_deny_limited_by_source_port_list_does_not_shadow() {
    let plan = PlanResult::from_value(json!({
        "resource_changes": [{
            "address": "azurerm_network_security_group.nsg",
            "type": "azurerm_network_security_group",
            "name": "nsg",
            "change": {
                "actions": ["create"],
                "after": {
                    "name": "nsg",
                    "security_rule": [
                        {
                            "name": "deny-ephemeral",
                            "priority": 100,
                            "direction": "Inbound",
                            "access": "Deny",
                            "protocol": "*",
                            "source_port_ranges": ["1024-2048"],
                            "destination_port_range": "*",
                            "source_address_prefix": "*",
                            "destination_address_prefix": "*"
                        },
                        {
                            "name": "allow-all",
                            "priority": 200,
                            "direction": "Inbound",
                            "access": "Allow",
                            "protocol": "*",
                            "source_port_range": "*",
                            "destination_port_range": "*",
                            "source_address_prefix": "*",
                            "destination_address_prefix": "*"
                        }
                    ]
                }
            }
        }]
    }))
    .expect("plan parses");
    let groups = plan.security_groups().expect("groups extract");
    assert_eq!(groups[0].rules[0].source_port_ranges, vec!["1024-2048".to_string()]);
    let violations = evaluate_security_groups(&groups);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].rule.as_deref(), Some("allow-all"));
}

#[test]
fn duplicate_priorities_are_flagged_per_direction() {
    let mut outbound = rule("out", 100, Access::Deny, "Tcp", "10.0.0.0/8");
    outbound.direction = Direction::Outbound;
    let groups = vec![group(
        "nsg",
        vec![
            rule("a", 100, Access::Allow, "Tcp", "10.0.0.0/8"),
            rule("b", 100, Access::Deny, "Udp", "10.0.0.0/8"),
            outbound,
        ],
    )];
    let violations = evaluate_security_groups(&groups);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::DuplicatePriority);
    assert_eq!(violations[0].rule.as_deref(), Some("b"));
}

#[test]
fn unprotected_and_missing_subnets_are_flagged() {
    let subnets = vec![
        SubnetProperties {
            name: "web".to_string(),
            address_prefixes: vec!["10.0.1.0/24".to_string()],
            network_security_group_id: Some("/nsg/web".to_string()),
            delegations: Vec::new(),
        },
        SubnetProperties {
            name: "app".to_string(),
            address_prefixes: vec!["10.0.2.0/24".to_string()],
            network_security_group_id: None,
            delegations: Vec::new(),
        },
    ];
    assert!(evaluate_subnet_protection(&subnets, &["web"]).is_empty());
    let violations = evaluate_subnet_protection(&subnets, &["web", "app", "dmz"]);
    let names: Vec<&str> = violations.iter().map(|violation| violation.group.as_str()).collect();
    assert_eq!(names, vec!["app", "dmz"]);
    assert!(violations.iter().all(|violation| violation.kind == ViolationKind::UnprotectedSubnet));
}

#[test]
fn combined_check_reports_every_violation() {
    let groups = vec![group("nsg", vec![rule("allow-all", 100, Access::Allow, "*", "*")])];
    let err = require_security_compliance(&groups, &[], &["web"]).expect_err("two violations");
    let AssertionError::Compliance {
        violations,
        summary,
    } = err
    else {
        panic!("expected compliance failure");
    };
    assert_eq!(violations.len(), 2);
    assert!(summary.contains("permissive_inbound"));
    assert!(summary.contains("unprotected_subnet"));
}

#[test]
fn plan_groups_merge_inline_and_standalone_rules() {
    let plan = PlanResult::from_value(json!({
        "resource_changes": [
            {
                "address": "azurerm_network_security_group.nsgs[\"web-nsg\"]",
                "type": "azurerm_network_security_group",
                "name": "nsgs",
                "change": {
                    "actions": ["create"],
                    "after": {
                        "name": "web-nsg",
                        "security_rule": [{
                            "name": "allow-http",
                            "priority": 100,
                            "direction": "Inbound",
                            "access": "Allow",
                            "protocol": "Tcp",
                            "source_port_range": "*",
                            "destination_port_range": "80",
                            "source_address_prefix": "*",
                            "destination_address_prefix": "*"
                        }]
                    }
                }
            },
            {
                "address": "azurerm_network_security_rule.rules[\"web-any\"]",
                "type": "azurerm_network_security_rule",
                "name": "rules",
                "change": {
                    "actions": ["create"],
                    "after": {
                        "name": "web-any",
                        "network_security_group_name": "web-nsg",
                        "priority": 200,
                        "direction": "Inbound",
                        "access": "Allow",
                        "protocol": "*",
                        "source_address_prefix": "Internet",
                        "destination_port_ranges": ["443", "8443"]
                    }
                }
            }
        ]
    }))
    .expect("plan parses");
    let groups = plan.security_groups().expect("groups extract");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].rules.len(), 2);
    let violations = evaluate_security_groups(&groups);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].rule.as_deref(), Some("web-any"));
}

#[test]
fn plan_rules_with_bad_direction_are_type_errors() {
    let plan = PlanResult::from_value(json!({
        "resource_changes": [{
            "address": "azurerm_network_security_group.nsg",
            "type": "azurerm_network_security_group",
            "name": "nsg",
            "change": {
                "actions": ["create"],
                "after": {
                    "name": "nsg",
                    "security_rule": [{
                        "name": "r",
                        "priority": 100,
                        "direction": "Sideways",
                        "access": "Allow",
                        "protocol": "*"
                    }]
                }
            }
        }]
    }))
    .expect("plan parses");
    let err = plan.security_groups().expect_err("bad direction");
    assert!(matches!(err, AssertionError::TypeMismatch { ref attribute, .. } if attribute == "direction"));
}
