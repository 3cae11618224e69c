// crates/vnet-harness-config/src/config_tests.rs
// ============================================================================
// Module: Harness Config Unit Tests
// Description: Unit coverage for TOML parsing, defaults, and validation.
// Purpose: Ensure invalid tenant definitions fail before any unit starts.
// Dependencies: vnet-harness-config, tempfile
// ============================================================================

//! ## Overview
//! Unit coverage for [`crate::config::HarnessConfig`] parsing and validation.
//! These tests never read the process environment.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::time::Duration;

use vnet_harness_core::Secret;

use crate::config::AuthMode;
use crate::config::ConfigError;
use crate::config::DEFAULT_RESOURCE_GROUP;
use crate::config::HarnessConfig;
use crate::config::MAX_CONFIG_FILE_SIZE;
use crate::env::EnvOverrides;

const TWO_TENANTS: &str = r#"
[defaults]
region = "westeurope"
resource_group = "rg-vnet-test"

[runner]
timeout_seconds = 600
max_parallel = 2

[[tenants]]
name = "primary"
subscription_id = "00000000-0000-0000-0000-000000000001"
tenant_id = "00000000-0000-0000-0000-0000000000aa"

[[tenants]]
name = "secondary"
subscription_id = "00000000-0000-0000-0000-000000000002"
tenant_id = "00000000-0000-0000-0000-0000000000bb"
region = "northeurope"
auth = "service_principal"
client_id = "11111111-1111-1111-1111-111111111111"
client_secret_env = "SECONDARY_CLIENT_SECRET"
"#;

fn parsed_with_secret() -> HarnessConfig {
    let mut config = HarnessConfig::from_toml_str(TWO_TENANTS).expect("config parses");
    config.tenants[1].client_secret = Some(Secret::new("s3cret".to_string()));
    config
}

#[test]
fn defaults_fill_unset_tenant_fields() {
    let mut config = parsed_with_secret();
    config.validate().expect("config validates");
    assert_eq!(config.tenants[0].region.as_deref(), Some("westeurope"));
    assert_eq!(config.tenants[1].region.as_deref(), Some("northeurope"));
    assert_eq!(config.tenants[0].auth_mode(), AuthMode::AzureCli);
    assert_eq!(config.tenants[1].auth_mode(), AuthMode::ServicePrincipal);
    assert_eq!(config.runner.timeout(), Duration::from_secs(600));
    assert_eq!(config.runner.max_parallel, Some(2));
}

#[test]
fn runner_defaults_apply_without_section() {
    let mut config = HarnessConfig::from_toml_str(
        r#"
[[tenants]]
name = "only"
subscription_id = "sub"
tenant_id = "tenant"
region = "eastus"
"#,
    )
    .expect("config parses");
    config.validate().expect("config validates");
    assert_eq!(config.runner.timeout(), Duration::from_secs(90 * 60));
    assert_eq!(config.runner.terraform_bin, "terraform");
    assert_eq!(config.tenants[0].resource_group_prefix(), DEFAULT_RESOURCE_GROUP);
}

#[test]
fn missing_identity_is_reported_per_field() {
    let mut config = HarnessConfig::from_toml_str(
        r#"
[[tenants]]
name = "broken"
subscription_id = "sub"
region = "eastus"
"#,
    )
    .expect("config parses");
    assert_eq!(
        config.validate(),
        Err(ConfigError::MissingField {
            tenant: "broken".to_string(),
            field: "tenant_id",
        })
    );
}

#[test]
fn blank_region_is_not_a_default() {
    let mut config = HarnessConfig::from_toml_str(
        r#"
[[tenants]]
name = "blank"
subscription_id = "sub"
tenant_id = "tenant"
region = "  "
"#,
    )
    .expect("config parses");
    assert!(matches!(config.validate(), Err(ConfigError::MissingField { field: "region", .. })));
}

#[test]
fn service_principal_requires_secret() {
    let mut config = HarnessConfig::from_toml_str(TWO_TENANTS).expect("config parses");
    let err = config.validate().expect_err("secret missing");
    assert!(err.to_string().contains("SECONDARY_CLIENT_SECRET"));
}

#[test]
fn duplicate_and_invalid_names_are_rejected() {
    let mut config = parsed_with_secret();
    config.tenants[1].name = "primary".to_string();
    assert!(config.validate().unwrap_err().to_string().contains("duplicate tenant name"));

    let mut config = parsed_with_secret();
    config.tenants[0].name = "has space".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn unknown_keys_are_rejected() {
    let err = HarnessConfig::from_toml_str("[runner]\ntimeout = 5\n").expect_err("unknown key");
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn empty_tenant_list_is_rejected() {
    let mut config = HarnessConfig::from_toml_str("").expect("empty parses");
    assert!(config.validate().unwrap_err().to_string().contains("at least one tenant"));
}

#[test]
fn resource_group_prefix_is_bounded() {
    let mut config = parsed_with_secret();
    config.tenants[0].resource_group = Some("r".repeat(58));
    assert!(config.validate().is_err());

    let mut config = parsed_with_secret();
    config.tenants[0].resource_group = Some("rg/with/slash".to_string());
    assert!(config.validate().is_err());
}

#[test]
fn tenant_filter_selects_and_validates() {
    let mut config = parsed_with_secret();
    config.apply_overrides(EnvOverrides {
        tenants: Some(vec!["secondary".to_string()]),
        ..EnvOverrides::default()
    });
    config.validate().expect("config validates");
    let selected: Vec<&str> =
        config.selected_tenants().iter().map(|tenant| tenant.name.as_str()).collect();
    assert_eq!(selected, vec!["secondary"]);

    config.runner.tenant_filter = vec!["ghost".to_string()];
    assert!(config.validate().unwrap_err().to_string().contains("ghost"));
}

#[test]
fn overrides_replace_runner_settings() {
    let mut config = parsed_with_secret();
    config.apply_overrides(EnvOverrides {
        timeout: Some(Duration::from_secs(30)),
        run_root: Some("target/runs".into()),
        tenants: None,
        max_parallel: Some(8),
        terraform_bin: Some("/opt/terraform".to_string()),
    });
    config.validate().expect("config validates");
    assert_eq!(config.runner.timeout_seconds, 30);
    assert_eq!(config.runner.max_parallel, Some(8));
    assert_eq!(config.runner.terraform_bin, "/opt/terraform");
    assert_eq!(config.selected_tenants().len(), 2);
}

#[test]
fn zero_limits_are_rejected() {
    let mut config = parsed_with_secret();
    config.runner.max_parallel = Some(0);
    assert!(config.validate().is_err());

    let mut config = parsed_with_secret();
    config.runner.timeout_seconds = 0;
    assert!(config.validate().is_err());
}

#[test]
fn files_are_read_with_limits() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("vnet-harness.toml");
    std::fs::write(&path, TWO_TENANTS).expect("write config");
    let config = HarnessConfig::from_file(&path).expect("file parses");
    assert_eq!(config.tenants.len(), 2);

    let oversized = dir.path().join("big.toml");
    std::fs::write(&oversized, vec![b'#'; MAX_CONFIG_FILE_SIZE + 1]).expect("write big");
    assert!(HarnessConfig::from_file(&oversized).unwrap_err().to_string().contains("size limit"));

    let missing = dir.path().join("missing.toml");
    assert!(matches!(HarnessConfig::from_file(&missing), Err(ConfigError::Io(_))));
}
