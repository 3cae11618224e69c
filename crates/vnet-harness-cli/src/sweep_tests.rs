// crates/vnet-harness-cli/src/sweep_tests.rs
// ============================================================================
// Module: Resource Group Sweep Tests
// Description: Unit coverage for stale group selection and deletion.
// Purpose: Ensure only tagged, dated, old groups are ever deleted.
// Dependencies: async-trait, time, tokio
// ============================================================================

//! ## Overview
//! Unit coverage for [`crate::sweep`].

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use vnet_harness_azure::AzureError;
use vnet_harness_azure::CloudClient;
use vnet_harness_azure::ResourceGroupSummary;
use vnet_harness_core::NetworkSecurityGroup;
use vnet_harness_core::VirtualNetworkProperties;
use vnet_harness_runner::TAG_CREATED_AT;
use vnet_harness_runner::TAG_TENANT;
use vnet_harness_runner::TAG_TEST;

use crate::sweep::SweepAction;
use crate::sweep::stale_groups;
use crate::sweep::sweep;

fn now() -> OffsetDateTime {
    OffsetDateTime::parse("2026-03-10T12:00:00Z", &Rfc3339).unwrap()
}

fn group(name: &str, created_at: Option<&str>, tagged: bool) -> ResourceGroupSummary {
    let mut tags = BTreeMap::new();
    if tagged {
        tags.insert(TAG_TEST.to_string(), "basic_plan".to_string());
        tags.insert(TAG_TENANT.to_string(), "primary".to_string());
    }
    if let Some(created_at) = created_at {
        tags.insert(TAG_CREATED_AT.to_string(), created_at.to_string());
    }
    ResourceGroupSummary {
        name: name.to_string(),
        location: "westeurope".to_string(),
        tags,
    }
}

fn fixture() -> Vec<ResourceGroupSummary> {
    vec![
        group("rg-vnet-test-fresh001", Some("2026-03-10T10:00:00Z"), true),
        group("rg-vnet-test-old00001", Some("2026-03-09T06:00:00Z"), true),
        group("rg-vnet-test-older001", Some("2026-03-01T12:00:00Z"), true),
        group("rg-production", Some("2020-01-01T00:00:00Z"), false),
        group("rg-vnet-test-nodate01", None, true),
        group("rg-vnet-test-baddate1", Some("yesterday"), true),
    ]
}

#[test]
fn selects_only_tagged_groups_past_the_cutoff() {
    let stale = stale_groups(&fixture(), now(), Duration::hours(24));
    let names: Vec<&str> = stale.iter().map(|group| group.name.as_str()).collect();
    assert_eq!(names, vec!["rg-vnet-test-older001", "rg-vnet-test-old00001"]);
    assert_eq!(stale[0].age_hours, 216);
    assert_eq!(stale[1].age_hours, 30);
    assert_eq!(stale[1].test, "basic_plan");
    assert_eq!(stale[1].tenant.as_deref(), Some("primary"));
}

#[test]
fn zero_cutoff_still_requires_positive_age() {
    let groups = vec![group("rg-vnet-test-now00001", Some("2026-03-10T12:00:00Z"), true)];
    assert!(stale_groups(&groups, now(), Duration::ZERO).is_empty());
}

#[derive(Default)]
struct FakeCloud {
    groups: Vec<ResourceGroupSummary>,
    deny: Option<String>,
    deleted: Mutex<Vec<String>>,
}

#[async_trait]
impl CloudClient for FakeCloud {
    async fn create_resource_group(
        &self,
        _name: &str,
        _location: &str,
        _tags: &BTreeMap<String, String>,
    ) -> Result<(), AzureError> {
        Ok(())
    }

    async fn delete_resource_group(&self, name: &str) -> Result<(), AzureError> {
        if self.deny.as_deref() == Some(name) {
            return Err(AzureError::Client("locked".to_string()));
        }
        self.deleted.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn resource_group_exists(&self, _name: &str) -> Result<bool, AzureError> {
        Ok(false)
    }

    async fn get_virtual_network(
        &self,
        _resource_group: &str,
        name: &str,
    ) -> Result<VirtualNetworkProperties, AzureError> {
        Err(AzureError::InvalidName(name.to_string()))
    }

    async fn list_network_security_groups(
        &self,
        _resource_group: &str,
    ) -> Result<Vec<NetworkSecurityGroup>, AzureError> {
        Ok(Vec::new())
    }

    async fn list_resource_groups(&self) -> Result<Vec<ResourceGroupSummary>, AzureError> {
        Ok(self.groups.clone())
    }
}

#[tokio::test]
async fn dry_run_deletes_nothing() {
    let cloud = FakeCloud {
        groups: fixture(),
        ..FakeCloud::default()
    };
    let entries = sweep(&cloud, now(), Duration::hours(24), true).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|entry| entry.action == SweepAction::WouldDelete));
    assert!(cloud.deleted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn deletion_failure_does_not_stop_the_sweep() {
    let cloud = FakeCloud {
        groups: fixture(),
        deny: Some("rg-vnet-test-older001".to_string()),
        ..FakeCloud::default()
    };
    let entries = sweep(&cloud, now(), Duration::hours(24), false).await.unwrap();
    assert_eq!(entries[0].action, SweepAction::Failed {
        error: "http client setup failed: locked".to_string(),
    });
    assert_eq!(entries[1].action, SweepAction::Deleted);
    assert_eq!(*cloud.deleted.lock().unwrap(), vec!["rg-vnet-test-old00001".to_string()]);
}
