// crates/vnet-harness-core/src/plan.rs
// ============================================================================
// Module: Plan Result
// Description: Structured view over the provisioning tool's JSON plan.
// Purpose: Expose planned values by address and ordered resource changes.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`PlanResult`] is parsed from the JSON rendering of a saved plan
//! (`terraform show -json <planfile>`). It exposes two views:
//! - planned values keyed by full resource address, flattened across child
//!   modules;
//! - resource changes in plan order, each with `before`/`after` values.
//!
//! Address lookups accept the full instance address
//! (`module.vnet.azurerm_subnet.subnets["aks"]`), the resource address
//! without instance key, and both forms relative to the owning module
//! (`azurerm_subnet.subnets`). Module tests usually wrap the module under
//! test in an example root, so relative lookups are the common case.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while parsing a plan document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanParseError {
    /// Document is not valid JSON or does not match the plan format.
    #[error("plan json is malformed: {0}")]
    Malformed(String),
    /// Two planned resources share the same address.
    #[error("duplicate planned resource address `{0}`")]
    DuplicateAddress(String),
}

// ============================================================================
// SECTION: Public Types
// ============================================================================

/// Planned values for a single resource instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedResource {
    /// Full instance address.
    pub address: String,
    /// Owning module address (`None` for the root module).
    pub module_address: Option<String>,
    /// Resource type, e.g. `azurerm_virtual_network`.
    pub resource_type: String,
    /// Resource name within its module.
    pub name: String,
    /// Planned attribute values known at plan time.
    pub values: Value,
}

impl PlannedResource {
    /// Returns true when `address` identifies this resource.
    #[must_use]
    pub fn matches(&self, address: &str) -> bool {
        address_matches(&self.address, self.module_address.as_deref(), address)
    }
}

/// Action planned for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeAction {
    /// No change.
    NoOp,
    /// Create a new object.
    Create,
    /// Read a data source.
    Read,
    /// Update in place.
    Update,
    /// Delete an object.
    Delete,
    /// Any action the parser does not recognize.
    #[serde(other)]
    Other,
}

/// Before/after values for one resource change.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Change {
    /// Planned actions, in order.
    #[serde(default)]
    pub actions: Vec<ChangeAction>,
    /// Prior values (`None` on create).
    #[serde(default)]
    pub before: Option<Value>,
    /// Planned values (`None` on delete). Unknown attributes are absent.
    #[serde(default)]
    pub after: Option<Value>,
    /// Attributes whose values are only known after apply.
    #[serde(default)]
    pub after_unknown: Option<Value>,
}

/// A single resource-change record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceChange {
    /// Full instance address.
    pub address: String,
    /// Owning module address.
    #[serde(default)]
    pub module_address: Option<String>,
    /// Resource type.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource name within its module.
    pub name: String,
    /// Planned change.
    pub change: Change,
}

impl ResourceChange {
    /// Returns true when `address` identifies this resource.
    #[must_use]
    pub fn matches(&self, address: &str) -> bool {
        address_matches(&self.address, self.module_address.as_deref(), address)
    }
}

/// Parsed plan document.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanResult {
    /// Planned values keyed by full address.
    planned_values: BTreeMap<String, PlannedResource>,
    /// Resource changes in plan order.
    resource_changes: Vec<ResourceChange>,
    /// Original document for artifacts.
    raw: Value,
}

impl PlanResult {
    /// Parses the JSON rendering of a saved plan.
    ///
    /// # Errors
    ///
    /// Returns [`PlanParseError`] when the document is malformed or contains
    /// duplicate resource addresses.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, PlanParseError> {
        let raw: Value =
            serde_json::from_slice(bytes).map_err(|err| PlanParseError::Malformed(err.to_string()))?;
        Self::from_value(raw)
    }

    /// Parses an already-decoded plan document.
    ///
    /// # Errors
    ///
    /// Returns [`PlanParseError`] when the document does not match the plan
    /// format.
    pub fn from_value(raw: Value) -> Result<Self, PlanParseError> {
        let document: RawPlan = serde_json::from_value(raw.clone())
            .map_err(|err| PlanParseError::Malformed(err.to_string()))?;
        let mut planned_values = BTreeMap::new();
        if let Some(values) = document.planned_values {
            collect_module(values.root_module, &mut planned_values)?;
        }
        Ok(Self {
            planned_values,
            resource_changes: document.resource_changes,
            raw,
        })
    }

    /// Returns planned values keyed by full address.
    #[must_use]
    pub const fn planned_values(&self) -> &BTreeMap<String, PlannedResource> {
        &self.planned_values
    }

    /// Returns resource changes in plan order.
    #[must_use]
    pub fn resource_changes(&self) -> &[ResourceChange] {
        &self.resource_changes
    }

    /// Returns the original plan document.
    #[must_use]
    pub const fn raw(&self) -> &Value {
        &self.raw
    }

    /// Returns every planned resource identified by `address`.
    #[must_use]
    pub fn find_planned(&self, address: &str) -> Vec<&PlannedResource> {
        self.planned_values.values().filter(|resource| resource.matches(address)).collect()
    }

    /// Returns true when at least one planned resource matches `address`.
    #[must_use]
    pub fn has_planned(&self, address: &str) -> bool {
        self.planned_values.values().any(|resource| resource.matches(address))
    }

    /// Returns resource changes of the given type, in plan order.
    pub fn changes_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a ResourceChange> + 'a {
        self.resource_changes.iter().filter(move |change| change.resource_type == resource_type)
    }
}

// ============================================================================
// SECTION: Raw Document
// ============================================================================

/// Subset of the plan document the harness reads.
#[derive(Deserialize)]
struct RawPlan {
    /// Planned values tree.
    #[serde(default)]
    planned_values: Option<RawPlannedValues>,
    /// Resource changes.
    #[serde(default)]
    resource_changes: Vec<ResourceChange>,
}

/// Planned values wrapper.
#[derive(Deserialize)]
struct RawPlannedValues {
    /// Root module.
    #[serde(default)]
    root_module: RawModule,
}

/// One module in the planned values tree.
#[derive(Deserialize, Default)]
struct RawModule {
    /// Module address (absent for the root module).
    #[serde(default)]
    address: Option<String>,
    /// Resources declared directly in this module.
    #[serde(default)]
    resources: Vec<RawResource>,
    /// Nested modules.
    #[serde(default)]
    child_modules: Vec<RawModule>,
}

/// One resource in the planned values tree.
#[derive(Deserialize)]
struct RawResource {
    /// Full instance address.
    address: String,
    /// Resource type.
    #[serde(rename = "type")]
    resource_type: String,
    /// Resource name.
    name: String,
    /// Known values.
    #[serde(default)]
    values: Value,
}

/// Flattens a module subtree into `out`.
fn collect_module(
    module: RawModule,
    out: &mut BTreeMap<String, PlannedResource>,
) -> Result<(), PlanParseError> {
    for resource in module.resources {
        let planned = PlannedResource {
            address: resource.address.clone(),
            module_address: module.address.clone(),
            resource_type: resource.resource_type,
            name: resource.name,
            values: resource.values,
        };
        if out.insert(resource.address.clone(), planned).is_some() {
            return Err(PlanParseError::DuplicateAddress(resource.address));
        }
    }
    for child in module.child_modules {
        collect_module(child, out)?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Address Matching
// ============================================================================

/// Returns true when `wanted` names the resource at `address`.
///
/// Accepted forms: full address, full address without instance key,
/// module-relative address, and module-relative address without instance key.
fn address_matches(address: &str, module_address: Option<&str>, wanted: &str) -> bool {
    if address == wanted {
        return true;
    }
    let relative = module_address
        .and_then(|module| address.strip_prefix(module))
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(address);
    let relative_base = strip_instance_key(relative);
    if relative == wanted || relative_base == wanted {
        return true;
    }
    module_address
        .and_then(|module| wanted.strip_prefix(module))
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|rest| rest == relative_base)
}

/// Removes a trailing `[key]` instance selector from a module-relative
/// address.
fn strip_instance_key(relative: &str) -> &str {
    relative.split_once('[').map_or(relative, |(head, _)| head)
}
