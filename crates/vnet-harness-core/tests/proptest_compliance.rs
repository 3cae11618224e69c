// crates/vnet-harness-core/tests/proptest_compliance.rs
// ============================================================================
// Module: Compliance Property-Based Tests
// Description: Property tests for rule ordering, shadowing, and identifiers.
// Purpose: Detect ordering dependence and panics across wide input ranges.
// ============================================================================

//! Property-based tests for compliance evaluation and identifier invariants.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use proptest::prelude::*;
use serde_json::Value;
use vnet_harness_core::Access;
use vnet_harness_core::Direction;
use vnet_harness_core::NetworkSecurityGroup;
use vnet_harness_core::PlanResult;
use vnet_harness_core::SecurityRule;
use vnet_harness_core::UniqueId;
use vnet_harness_core::ViolationKind;
use vnet_harness_core::evaluate_security_groups;

fn rule_strategy() -> impl Strategy<Value = (bool, bool, bool, bool)> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>())
}

fn build_rule(index: usize, priority: u32, shape: (bool, bool, bool, bool)) -> SecurityRule {
    let (inbound, allow, any_protocol, open_source) = shape;
    SecurityRule {
        name: format!("rule-{index}"),
        priority,
        direction: if inbound { Direction::Inbound } else { Direction::Outbound },
        access: if allow { Access::Allow } else { Access::Deny },
        protocol: if any_protocol { "*".to_string() } else { "Tcp".to_string() },
        source_port_range: "*".to_string(),
        destination_port_range: "443".to_string(),
        source_address_prefix: if open_source {
            "*".to_string()
        } else {
            "10.0.0.0/8".to_string()
        },
        destination_address_prefix: "*".to_string(),
        source_port_ranges: Vec::new(),
        destination_port_ranges: Vec::new(),
        source_address_prefixes: Vec::new(),
        destination_address_prefixes: Vec::new(),
    }
}

fn catch_all_deny(priority: u32) -> SecurityRule {
    let mut rule = build_rule(usize::MAX, priority, (true, false, true, true));
    rule.name = "deny-all".to_string();
    rule.destination_port_range = "*".to_string();
    rule
}

fn group(rules: Vec<SecurityRule>) -> NetworkSecurityGroup {
    NetworkSecurityGroup {
        name: "nsg".to_string(),
        id: None,
        rules,
    }
}

fn flagged(rules: Vec<SecurityRule>) -> Vec<String> {
    let mut names: Vec<String> = evaluate_security_groups(&[group(rules)])
        .into_iter()
        .filter_map(|violation| violation.rule)
        .collect();
    names.sort();
    names
}

proptest! {
    #[test]
    fn violations_do_not_depend_on_declaration_order(
        priorities in prop::collection::btree_set(200u32 .. 4096, 1 .. 12),
        shapes in prop::collection::vec(rule_strategy(), 12),
        rotate in 0usize .. 12,
    ) {
        let rules: Vec<SecurityRule> = priorities
            .iter()
            .zip(shapes)
            .enumerate()
            .map(|(index, (priority, shape))| build_rule(index, *priority, shape))
            .collect();
        let mut rotated = rules.clone();
        let len = rotated.len();
        rotated.rotate_left(rotate % len);
        prop_assert_eq!(flagged(rules), flagged(rotated));
    }

    #[test]
    fn leading_catch_all_deny_shadows_every_inbound_rule(
        priorities in prop::collection::btree_set(200u32 .. 4096, 1 .. 12),
        shapes in prop::collection::vec(rule_strategy(), 12),
    ) {
        let mut rules: Vec<SecurityRule> = priorities
            .iter()
            .zip(shapes)
            .enumerate()
            .map(|(index, (priority, shape))| build_rule(index, *priority, shape))
            .collect();
        rules.push(catch_all_deny(100));
        let violations = evaluate_security_groups(&[group(rules)]);
        prop_assert!(violations.iter().all(|violation| violation.kind != ViolationKind::PermissiveInbound));
    }

    #[test]
    fn parsed_identifiers_round_trip(raw in "[a-z0-9]{4,32}") {
        let id = UniqueId::parse(&raw).expect("valid id");
        prop_assert_eq!(id.as_str(), raw.as_str());
    }

    #[test]
    fn plan_parsing_never_panics(raw in ".{0,256}") {
        let _ = PlanResult::from_json_slice(raw.as_bytes());
    }

    #[test]
    fn plan_parsing_rejects_non_object_roots(value in any::<i64>()) {
        prop_assert!(PlanResult::from_value(Value::from(value)).is_err());
    }
}
