// crates/vnet-harness-cli/src/sweep.rs
// ============================================================================
// Module: Resource Group Sweep
// Description: Finds and deletes harness resource groups left behind.
// Purpose: Reclaim groups whose unit was killed before cleanup could run.
// Dependencies: time, tracing, vnet-harness-azure, vnet-harness-runner
// ============================================================================

//! ## Overview
//! A unit that is killed outright (SIGKILL, lost CI runner) never drains its
//! cleanup stack. Its resource group still carries the harness tags, so a
//! sweep can find it: a group is stale when it has a test tag and a
//! creation timestamp older than the cutoff. Groups without a parseable
//! timestamp are never touched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;
use tracing::warn;
use vnet_harness_azure::AzureError;
use vnet_harness_azure::CloudClient;
use vnet_harness_azure::ResourceGroupSummary;
use vnet_harness_runner::TAG_CREATED_AT;
use vnet_harness_runner::TAG_TEST;
use vnet_harness_runner::TAG_TENANT;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A harness resource group older than the cutoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleGroup {
    /// Group name.
    pub name: String,
    /// Test that created it.
    pub test: String,
    /// Tenant that created it, when tagged.
    pub tenant: Option<String>,
    /// Age in whole hours.
    pub age_hours: i64,
}

/// What the sweep did with one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SweepAction {
    /// Deletion completed.
    Deleted,
    /// Dry run; nothing was deleted.
    WouldDelete,
    /// Deletion failed.
    Failed {
        /// Failure detail.
        error: String,
    },
}

/// One swept group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepEntry {
    /// The stale group.
    #[serde(flatten)]
    pub group: StaleGroup,
    /// Outcome.
    #[serde(flatten)]
    pub action: SweepAction,
}

// ============================================================================
// SECTION: Selection
// ============================================================================

/// Returns the harness groups created more than `older_than` before `now`,
/// oldest first.
#[must_use]
pub fn stale_groups(
    groups: &[ResourceGroupSummary],
    now: OffsetDateTime,
    older_than: Duration,
) -> Vec<StaleGroup> {
    let mut stale: Vec<StaleGroup> = groups
        .iter()
        .filter_map(|group| {
            let test = group.tags.get(TAG_TEST)?;
            let created_at = OffsetDateTime::parse(group.tags.get(TAG_CREATED_AT)?, &Rfc3339).ok()?;
            let age = now - created_at;
            (age > older_than).then(|| StaleGroup {
                name: group.name.clone(),
                test: test.clone(),
                tenant: group.tags.get(TAG_TENANT).cloned(),
                age_hours: age.whole_hours(),
            })
        })
        .collect();
    stale.sort_by(|left, right| {
        right.age_hours.cmp(&left.age_hours).then_with(|| left.name.cmp(&right.name))
    });
    stale
}

// ============================================================================
// SECTION: Sweep
// ============================================================================

/// Lists the subscription's groups and deletes the stale ones.
///
/// Deletion failures are recorded per group; the sweep continues.
///
/// # Errors
///
/// Returns [`AzureError`] when the groups cannot be listed.
pub async fn sweep(
    cloud: &dyn CloudClient,
    now: OffsetDateTime,
    older_than: Duration,
    dry_run: bool,
) -> Result<Vec<SweepEntry>, AzureError> {
    let groups = cloud.list_resource_groups().await?;
    let stale = stale_groups(&groups, now, older_than);
    info!(listed = groups.len(), stale = stale.len(), dry_run, "sweep candidates");
    let mut entries = Vec::with_capacity(stale.len());
    for group in stale {
        let action = if dry_run {
            SweepAction::WouldDelete
        } else {
            match cloud.delete_resource_group(&group.name).await {
                Ok(()) => {
                    info!(resource_group = %group.name, test = %group.test, "stale resource group deleted");
                    SweepAction::Deleted
                }
                Err(err) => {
                    warn!(resource_group = %group.name, error = %err, "stale resource group not deleted");
                    SweepAction::Failed {
                        error: err.to_string(),
                    }
                }
            }
        };
        entries.push(SweepEntry {
            group,
            action,
        });
    }
    Ok(entries)
}
