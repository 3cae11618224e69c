// crates/vnet-harness-core/src/compliance.rs
// ============================================================================
// Module: Security Compliance
// Description: Network security group and subnet protection checks.
// Purpose: Flag overly permissive inbound rules and unprotected subnets.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Rules inside a group are evaluated in ascending priority order, the way
//! the platform applies them. An inbound Deny rule that matches all traffic
//! shadows every rule with a higher priority number, so permissive rules
//! behind it are not reported. Two rules with the same priority in the same
//! direction of one group are always a violation: the platform rejects them
//! and the evaluation order would be undefined.
//!
//! Subnet protection is a separate check: every internet-facing subnet must
//! be associated with a security group.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::assertions::AssertionError;
use crate::network::Direction;
use crate::network::NetworkSecurityGroup;
use crate::network::SecurityRule;
use crate::network::SubnetProperties;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Category of a compliance violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Inbound Allow on any protocol from any source.
    PermissiveInbound,
    /// Two rules share a priority within one direction.
    DuplicatePriority,
    /// Internet-facing subnet without a security group.
    UnprotectedSubnet,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissiveInbound => f.write_str("permissive_inbound"),
            Self::DuplicatePriority => f.write_str("duplicate_priority"),
            Self::UnprotectedSubnet => f.write_str("unprotected_subnet"),
        }
    }
}

/// One compliance violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceViolation {
    /// Security group name, or subnet name for subnet violations.
    pub group: String,
    /// Offending rule name (`None` for subnet violations).
    pub rule: Option<String>,
    /// Violation category.
    pub kind: ViolationKind,
    /// Human-readable detail.
    pub detail: String,
}

impl fmt::Display for ComplianceViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            Some(rule) => write!(f, "[{}] {}/{}: {}", self.kind, self.group, rule, self.detail),
            None => write!(f, "[{}] {}: {}", self.kind, self.group, self.detail),
        }
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates every group and returns all violations in group order.
#[must_use]
pub fn evaluate_security_groups(groups: &[NetworkSecurityGroup]) -> Vec<ComplianceViolation> {
    groups.iter().flat_map(evaluate_group).collect()
}

/// Evaluates one group.
fn evaluate_group(group: &NetworkSecurityGroup) -> Vec<ComplianceViolation> {
    let mut violations = duplicate_priorities(group);
    let mut inbound: Vec<&SecurityRule> =
        group.rules.iter().filter(|rule| rule.direction == Direction::Inbound).collect();
    inbound.sort_by_key(|rule| rule.priority);
    for rule in inbound {
        if rule.is_inbound_catch_all_deny() {
            break;
        }
        if rule.is_overly_permissive() {
            violations.push(ComplianceViolation {
                group: group.name.clone(),
                rule: Some(rule.name.clone()),
                kind: ViolationKind::PermissiveInbound,
                detail: format!(
                    "priority {} allows protocol `{}` from `{}`",
                    rule.priority, rule.protocol, rule.source_address_prefix
                ),
            });
        }
    }
    violations
}

/// Reports every rule sharing a priority with an earlier rule in the same
/// direction.
fn duplicate_priorities(group: &NetworkSecurityGroup) -> Vec<ComplianceViolation> {
    let mut seen: BTreeMap<(u32, bool), &str> = BTreeMap::new();
    let mut violations = Vec::new();
    for rule in &group.rules {
        let key = (rule.priority, rule.direction == Direction::Inbound);
        if let Some(first) = seen.get(&key) {
            violations.push(ComplianceViolation {
                group: group.name.clone(),
                rule: Some(rule.name.clone()),
                kind: ViolationKind::DuplicatePriority,
                detail: format!(
                    "{} priority {} already used by `{first}`",
                    rule.direction, rule.priority
                ),
            });
        } else {
            seen.insert(key, &rule.name);
        }
    }
    violations
}

/// Returns a violation for every internet-facing subnet that has no
/// security group, including subnets that do not exist at all.
#[must_use]
pub fn evaluate_subnet_protection(
    subnets: &[SubnetProperties],
    internet_facing: &[&str],
) -> Vec<ComplianceViolation> {
    internet_facing
        .iter()
        .filter_map(|name| match subnets.iter().find(|subnet| subnet.name == *name) {
            None => Some(ComplianceViolation {
                group: (*name).to_string(),
                rule: None,
                kind: ViolationKind::UnprotectedSubnet,
                detail: "subnet not found".to_string(),
            }),
            Some(subnet) if subnet.network_security_group_id.is_none() => {
                Some(ComplianceViolation {
                    group: subnet.name.clone(),
                    rule: None,
                    kind: ViolationKind::UnprotectedSubnet,
                    detail: "no network security group associated".to_string(),
                })
            }
            Some(_) => None,
        })
        .collect()
}

// ============================================================================
// SECTION: Assertions
// ============================================================================

/// Requires no group to contain an effective overly permissive inbound
/// rule or a duplicate priority.
///
/// # Errors
///
/// Returns [`AssertionError::Compliance`] listing every violation.
pub fn require_no_permissive_inbound(
    groups: &[NetworkSecurityGroup],
) -> Result<(), AssertionError> {
    into_result(evaluate_security_groups(groups))
}

/// Requires every internet-facing subnet to have a security group.
///
/// # Errors
///
/// Returns [`AssertionError::Compliance`] listing every unprotected subnet.
pub fn require_subnets_protected(
    subnets: &[SubnetProperties],
    internet_facing: &[&str],
) -> Result<(), AssertionError> {
    into_result(evaluate_subnet_protection(subnets, internet_facing))
}

/// Runs both compliance checks and reports all violations together.
///
/// # Errors
///
/// Returns [`AssertionError::Compliance`] listing every violation.
pub fn require_security_compliance(
    groups: &[NetworkSecurityGroup],
    subnets: &[SubnetProperties],
    internet_facing: &[&str],
) -> Result<(), AssertionError> {
    let mut violations = evaluate_security_groups(groups);
    violations.extend(evaluate_subnet_protection(subnets, internet_facing));
    into_result(violations)
}

/// Converts a violation list into an assertion result.
fn into_result(violations: Vec<ComplianceViolation>) -> Result<(), AssertionError> {
    if violations.is_empty() {
        return Ok(());
    }
    let summary = violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
    Err(AssertionError::Compliance {
        violations,
        summary,
    })
}
