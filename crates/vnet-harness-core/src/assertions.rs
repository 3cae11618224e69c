// crates/vnet-harness-core/src/assertions.rs
// ============================================================================
// Module: Assertions
// Description: Plan-shape, naming, live-resource, and output assertions.
// Purpose: Turn fetched data into typed pass/fail results with context.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every assertion is a pure function over data the caller already fetched.
//! A failure is an [`AssertionError`] carrying the expected value, the actual
//! value, and the resource address or field involved, so a report line is
//! enough to diagnose which tenant saw what.
//!
//! Security compliance lives in [`crate::compliance`]; its failures are
//! reported through [`AssertionError::Compliance`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt::Display;

use thiserror::Error;

use crate::compliance::ComplianceViolation;
use crate::network::VirtualNetworkProperties;
use crate::network::string_attribute;
use crate::outputs::Outputs;
use crate::plan::PlanResult;
use crate::plan::PlannedResource;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Assertion failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssertionError {
    /// No planned resource matches the address.
    #[error("planned resource `{address}` not found (planned: {available})")]
    MissingPlannedResource {
        /// Requested address.
        address: String,
        /// Comma-separated planned addresses.
        available: String,
    },
    /// The plan has no change record of the resource type.
    #[error("no resource change of type `{resource_type}` in plan")]
    MissingResourceChange {
        /// Requested resource type.
        resource_type: String,
    },
    /// A value has the wrong shape.
    #[error("`{address}` attribute `{attribute}`: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Resource address or output reference.
        address: String,
        /// Attribute name.
        attribute: String,
        /// Expected shape.
        expected: &'static str,
        /// Actual shape or detail.
        actual: String,
    },
    /// A planned name does not follow the naming convention.
    #[error("`{address}` name `{actual}` does not contain `{expected}`")]
    NamingConvention {
        /// Resource address.
        address: String,
        /// Required substring.
        expected: String,
        /// Planned name.
        actual: String,
    },
    /// A scalar value differs from its expectation.
    #[error("{field}: expected {expected}, got {actual}")]
    ValueMismatch {
        /// Field description.
        field: String,
        /// Expected value.
        expected: String,
        /// Actual value.
        actual: String,
    },
    /// A collection lacks expected members.
    #[error("{field}: missing [{}] (actual [{}])", .missing.join(", "), .actual.join(", "))]
    MissingValues {
        /// Field description.
        field: String,
        /// Expected members that were absent.
        missing: Vec<String>,
        /// Actual members.
        actual: Vec<String>,
    },
    /// Security compliance violations.
    #[error("security compliance failed: {summary}")]
    Compliance {
        /// Every violation found.
        violations: Vec<ComplianceViolation>,
        /// One-line summary.
        summary: String,
    },
    /// A declared output is missing.
    #[error("output `{name}` not found (outputs: {available})")]
    MissingOutput {
        /// Requested output.
        name: String,
        /// Comma-separated output names.
        available: String,
    },
}

// ============================================================================
// SECTION: Plan Shape
// ============================================================================

/// Requires at least one planned resource at `address` and returns it.
///
/// # Errors
///
/// Returns [`AssertionError::MissingPlannedResource`] listing the planned
/// addresses when nothing matches.
pub fn require_planned_resource<'a>(
    plan: &'a PlanResult,
    address: &str,
) -> Result<&'a PlannedResource, AssertionError> {
    plan.planned_values().values().find(|resource| resource.matches(address)).ok_or_else(|| {
        AssertionError::MissingPlannedResource {
            address: address.to_string(),
            available: plan.planned_values().keys().cloned().collect::<Vec<_>>().join(", "),
        }
    })
}

// ============================================================================
// SECTION: Naming Convention
// ============================================================================

/// Requires every planned resource of `resource_type` to carry a name
/// containing `needle`, and returns the planned names.
///
/// Change records without an `after` value (deletions) are skipped. A plan
/// with no record of the type fails: a naming assertion that inspects
/// nothing passes vacuously otherwise.
///
/// # Errors
///
/// Returns [`AssertionError::MissingResourceChange`] when the plan has no
/// record of the type, [`AssertionError::TypeMismatch`] when a name is not
/// a string, and [`AssertionError::NamingConvention`] on the first name
/// without `needle`.
pub fn require_resource_name_contains(
    plan: &PlanResult,
    resource_type: &str,
    needle: &str,
) -> Result<Vec<String>, AssertionError> {
    let mut names = Vec::new();
    for change in plan.changes_of_type(resource_type) {
        let Some(after) = change.change.after.as_ref() else {
            continue;
        };
        let name = string_attribute(&change.address, after, "name")?;
        if !name.contains(needle) {
            return Err(AssertionError::NamingConvention {
                address: change.address.clone(),
                expected: needle.to_string(),
                actual: name,
            });
        }
        names.push(name);
    }
    if names.is_empty() {
        return Err(AssertionError::MissingResourceChange {
            resource_type: resource_type.to_string(),
        });
    }
    Ok(names)
}

// ============================================================================
// SECTION: Live Resource
// ============================================================================

/// Requires `actual` to contain every member of `expected`.
///
/// # Errors
///
/// Returns [`AssertionError::MissingValues`] naming the absent members.
pub fn require_contains_all<S>(
    field: &str,
    actual: &[S],
    expected: &[&str],
) -> Result<(), AssertionError>
where
    S: AsRef<str>,
{
    let present: BTreeSet<&str> = actual.iter().map(|item| item.as_ref()).collect();
    let missing: Vec<String> = expected
        .iter()
        .filter(|item| !present.contains(*item))
        .map(|item| (*item).to_string())
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(AssertionError::MissingValues {
        field: field.to_string(),
        missing,
        actual: actual.iter().map(|item| item.as_ref().to_string()).collect(),
    })
}

/// Requires a collection to have exactly `expected` members.
///
/// # Errors
///
/// Returns [`AssertionError::ValueMismatch`] with both counts.
pub fn require_count<T>(field: &str, actual: &[T], expected: usize) -> Result<(), AssertionError> {
    if actual.len() == expected {
        return Ok(());
    }
    Err(AssertionError::ValueMismatch {
        field: format!("{field} count"),
        expected: expected.to_string(),
        actual: actual.len().to_string(),
    })
}

/// Requires two values to be equal.
///
/// # Errors
///
/// Returns [`AssertionError::ValueMismatch`] with both values rendered via
/// `Display`.
pub fn require_equal<T>(field: &str, actual: &T, expected: &T) -> Result<(), AssertionError>
where
    T: PartialEq + Display + ?Sized,
{
    if actual == expected {
        return Ok(());
    }
    Err(AssertionError::ValueMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

/// Expected shape of a live virtual network.
///
/// Unset fields are not checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualNetworkExpectation {
    /// Exact subnet count.
    pub subnet_count: Option<usize>,
    /// Subnet names that must exist.
    pub subnet_names: Vec<String>,
    /// DNS servers that must be configured.
    pub dns_servers: Vec<String>,
    /// Address prefixes that must be in the address space.
    pub address_prefixes: Vec<String>,
    /// Expected region (compared case-insensitively without spaces).
    pub location: Option<String>,
}

/// Checks a live virtual network against an expectation.
///
/// # Errors
///
/// Returns the first [`AssertionError`] found, in field order: subnet count,
/// subnet names, DNS servers, address prefixes, location.
pub fn require_virtual_network(
    network: &VirtualNetworkProperties,
    expected: &VirtualNetworkExpectation,
) -> Result<(), AssertionError> {
    let label = format!("virtual network `{}`", network.name);
    if let Some(count) = expected.subnet_count {
        require_count(&format!("{label} subnets"), &network.subnets, count)?;
    }
    let subnet_names = network.subnet_names();
    let wanted: Vec<&str> = expected.subnet_names.iter().map(String::as_str).collect();
    require_contains_all(&format!("{label} subnets"), &subnet_names, &wanted)?;
    let wanted: Vec<&str> = expected.dns_servers.iter().map(String::as_str).collect();
    require_contains_all(&format!("{label} dns_servers"), &network.dns_servers, &wanted)?;
    let wanted: Vec<&str> = expected.address_prefixes.iter().map(String::as_str).collect();
    require_contains_all(&format!("{label} address_space"), &network.address_prefixes, &wanted)?;
    if let Some(location) = &expected.location
        && normalize_location(location) != normalize_location(&network.location)
    {
        return Err(AssertionError::ValueMismatch {
            field: format!("{label} location"),
            expected: location.clone(),
            actual: network.location.clone(),
        });
    }
    Ok(())
}

/// Normalizes a region display name (`East US`) to its short form
/// (`eastus`).
fn normalize_location(location: &str) -> String {
    location.chars().filter(|ch| !ch.is_whitespace()).collect::<String>().to_ascii_lowercase()
}

// ============================================================================
// SECTION: Outputs
// ============================================================================

/// Requires a mapping output to contain every key in `keys`.
///
/// # Errors
///
/// Returns [`AssertionError`] when the output is missing, is not a mapping,
/// or lacks keys.
pub fn require_output_keys(
    outputs: &Outputs,
    name: &str,
    keys: &[&str],
) -> Result<(), AssertionError> {
    let map = outputs.map(name)?;
    let present: Vec<&str> = map.keys().map(String::as_str).collect();
    require_contains_all(&format!("output `{name}` keys"), &present, keys)
}
