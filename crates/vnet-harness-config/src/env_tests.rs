// crates/vnet-harness-config/src/env_tests.rs
// ============================================================================
// Module: Harness Env Unit Tests
// Description: Unit coverage for strict environment parsing and loading.
// Purpose: Ensure configuration parsing fails closed on invalid inputs.
// Dependencies: std, tempfile
// ============================================================================

//! ## Overview
//! Unit coverage for environment overrides and the `ARM_*` fallback.
//! Invariants:
//! - Environment parsing rejects invalid or empty values.
//! - Tests restore environment state after each run.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::sync::Mutex;
use std::sync::OnceLock;
use std::time::Duration;

use crate::config::AuthMode;
use crate::config::ConfigError;
use crate::config::FALLBACK_TENANT_NAME;
use crate::config::HarnessConfig;
use crate::env::EnvOverrides;
use crate::env::HarnessEnv;

mod env_mut {
    #![allow(unsafe_code, reason = "Tests mutate process env vars in a controlled scope.")]

    /// Sets an environment variable for the current process.
    pub fn set_var(key: &str, value: &str) {
        // SAFETY: Tests serialize environment mutation via a global lock.
        unsafe {
            std::env::set_var(key, value);
        }
    }

    /// Removes an environment variable from the current process.
    pub fn remove_var(key: &str) {
        // SAFETY: Tests serialize environment mutation via a global lock.
        unsafe {
            std::env::remove_var(key);
        }
    }
}

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

struct EnvGuard {
    entries: Vec<(&'static str, Option<String>)>,
}

impl EnvGuard {
    fn new(names: &[&'static str]) -> Self {
        let entries = names
            .iter()
            .map(|name| {
                let previous = std::env::var(*name).ok();
                env_mut::remove_var(name);
                (*name, previous)
            })
            .collect();
        Self {
            entries,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in self.entries.drain(..) {
            match value {
                Some(value) => env_mut::set_var(name, &value),
                None => env_mut::remove_var(name),
            }
        }
    }
}

const SECRET_VAR: &str = "VNET_HARNESS_TEST_SECONDARY_SECRET";

fn env_names() -> [&'static str; 13] {
    [
        HarnessEnv::ConfigPath.as_str(),
        HarnessEnv::TimeoutSeconds.as_str(),
        HarnessEnv::RunRoot.as_str(),
        HarnessEnv::Tenants.as_str(),
        HarnessEnv::MaxParallel.as_str(),
        HarnessEnv::TerraformBin.as_str(),
        HarnessEnv::Log.as_str(),
        HarnessEnv::Region.as_str(),
        HarnessEnv::SubscriptionId.as_str(),
        HarnessEnv::TenantId.as_str(),
        HarnessEnv::ClientId.as_str(),
        HarnessEnv::ClientSecret.as_str(),
        SECRET_VAR,
    ]
}

#[test]
fn timeout_rejects_invalid_values() {
    let _lock = env_lock();
    let _guard = EnvGuard::new(&env_names());

    env_mut::set_var(HarnessEnv::TimeoutSeconds.as_str(), "0");
    assert!(EnvOverrides::load().is_err());

    env_mut::set_var(HarnessEnv::TimeoutSeconds.as_str(), "not-a-number");
    assert!(EnvOverrides::load().is_err());

    env_mut::set_var(HarnessEnv::TimeoutSeconds.as_str(), "   ");
    assert!(EnvOverrides::load().is_err());
}

#[test]
fn overrides_parse_valid_values() {
    let _lock = env_lock();
    let _guard = EnvGuard::new(&env_names());

    env_mut::set_var(HarnessEnv::TimeoutSeconds.as_str(), "120");
    env_mut::set_var(HarnessEnv::Tenants.as_str(), "primary, secondary");
    env_mut::set_var(HarnessEnv::MaxParallel.as_str(), "3");
    env_mut::set_var(HarnessEnv::TerraformBin.as_str(), "tofu");
    let overrides = EnvOverrides::load().expect("overrides load");
    assert_eq!(overrides.timeout, Some(Duration::from_secs(120)));
    assert_eq!(overrides.tenants, Some(vec!["primary".to_string(), "secondary".to_string()]));
    assert_eq!(overrides.max_parallel, Some(3));
    assert_eq!(overrides.terraform_bin.as_deref(), Some("tofu"));
    assert_eq!(overrides.run_root, None);
}

#[test]
fn list_and_parallelism_reject_empty_entries() {
    let _lock = env_lock();
    let _guard = EnvGuard::new(&env_names());

    env_mut::set_var(HarnessEnv::Tenants.as_str(), "primary,,secondary");
    assert!(EnvOverrides::load().is_err());
    env_mut::remove_var(HarnessEnv::Tenants.as_str());

    env_mut::set_var(HarnessEnv::MaxParallel.as_str(), "0");
    assert!(EnvOverrides::load().is_err());
}

#[test]
fn fallback_reads_arm_variables() {
    let _lock = env_lock();
    let _guard = EnvGuard::new(&env_names());
    let dir = tempfile::tempdir().expect("tempdir");
    env_mut::set_var(
        HarnessEnv::ConfigPath.as_str(),
        dir.path().join("absent.toml").to_str().expect("utf-8 path"),
    );
    assert!(matches!(HarnessConfig::load(None), Err(ConfigError::Io(_))));
    env_mut::remove_var(HarnessEnv::ConfigPath.as_str());

    env_mut::set_var(HarnessEnv::SubscriptionId.as_str(), "sub-env");
    env_mut::set_var(HarnessEnv::TenantId.as_str(), "tenant-env");
    env_mut::set_var(HarnessEnv::Region.as_str(), "swedencentral");
    let mut config = HarnessConfig::from_environment().expect("fallback builds");
    config.validate().expect("fallback validates");
    assert_eq!(config.tenants.len(), 1);
    assert_eq!(config.tenants[0].name, FALLBACK_TENANT_NAME);
    assert_eq!(config.tenants[0].subscription_id.as_deref(), Some("sub-env"));
    assert_eq!(config.tenants[0].auth_mode(), AuthMode::AzureCli);
}

#[test]
fn fallback_without_region_fails_closed() {
    let _lock = env_lock();
    let _guard = EnvGuard::new(&env_names());

    env_mut::set_var(HarnessEnv::SubscriptionId.as_str(), "sub-env");
    env_mut::set_var(HarnessEnv::TenantId.as_str(), "tenant-env");
    let mut config = HarnessConfig::from_environment().expect("fallback builds");
    assert!(matches!(config.validate(), Err(ConfigError::MissingField { field: "region", .. })));
}

#[test]
fn load_reads_file_secrets_and_overrides() {
    let _lock = env_lock();
    let _guard = EnvGuard::new(&env_names());
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("vnet-harness.toml");
    std::fs::write(
        &path,
        format!(
            r#"
[defaults]
region = "westeurope"

[[tenants]]
name = "primary"
subscription_id = "sub-1"
tenant_id = "tenant-1"

[[tenants]]
name = "secondary"
subscription_id = "sub-2"
tenant_id = "tenant-2"
auth = "service_principal"
client_id = "app-2"
client_secret_env = "{SECRET_VAR}"
"#
        ),
    )
    .expect("write config");

    assert!(HarnessConfig::load(Some(&path)).is_err());

    env_mut::set_var(SECRET_VAR, "s3cret");
    env_mut::set_var(HarnessEnv::Tenants.as_str(), "secondary");
    env_mut::set_var(HarnessEnv::TimeoutSeconds.as_str(), "45");
    let config = HarnessConfig::load(Some(&path)).expect("config loads");
    assert_eq!(config.runner.timeout(), Duration::from_secs(45));
    let selected = config.selected_tenants();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].client_secret.as_ref().map(|secret| secret.expose()), Some("s3cret"));
    assert_eq!(selected[0].region.as_deref(), Some("westeurope"));
}
