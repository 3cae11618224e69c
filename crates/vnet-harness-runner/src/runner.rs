// crates/vnet-harness-runner/src/runner.rs
// ============================================================================
// Module: Multi-Tenant Test Runner
// Description: Runs one test body per tenant as isolated parallel units.
// Purpose: Guarantee setup, failure isolation, and teardown per tenant.
// Dependencies: tokio, tracing, vnet-harness-config
// ============================================================================

//! ## Overview
//! [`MultiTenantTestRunner::run`] spawns one tokio task per selected tenant.
//! Each unit:
//! 1. resolves a [`vnet_harness_core::TenantConfig`] with a fresh unique id;
//! 2. builds the tenant's cloud client and provisioning tool;
//! 3. runs the body in its own task, so a panic is captured as a failure;
//! 4. drains its cleanup stack on every exit path, including timeout, after
//!    aborting the body task (in-flight tool processes are killed);
//! 5. verifies its resource group is gone when one was requested.
//!
//! Units share nothing mutable. A failing unit never affects its siblings;
//! the aggregated [`RunReport`] carries the verdict.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::Instrument;
use tracing::error;
use tracing::info;
use tracing::info_span;
use tracing::warn;
use vnet_harness_config::HarnessConfig;
use vnet_harness_config::RunnerSettings;
use vnet_harness_config::TenantDefinition;
use vnet_harness_config::global_config;
use vnet_harness_config::resolve;

use crate::backend::AzureBackend;
use crate::backend::Backend;
use crate::cleanup::CleanupStack;
use crate::cleanup::panic_message;
use crate::error::CleanupFailure;
use crate::error::HarnessError;
use crate::report::RunReport;
use crate::report::UnitOutcome;
use crate::report::UnitReport;
use crate::scope::TenantScope;

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Runs a test body once per configured tenant.
#[derive(Clone)]
pub struct MultiTenantTestRunner {
    /// Tenants to run, in report order.
    tenants: Vec<TenantDefinition>,
    /// Timeout, parallelism, and report settings.
    settings: RunnerSettings,
    /// Collaborator factory.
    backend: Arc<dyn Backend>,
}

impl MultiTenantTestRunner {
    /// Creates a runner over explicit tenants.
    #[must_use]
    pub fn new(
        tenants: Vec<TenantDefinition>,
        settings: RunnerSettings,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self {
            tenants,
            settings,
            backend,
        }
    }

    /// Creates a runner over the selected tenants of `config`, backed by
    /// ARM and the configured terraform binary.
    #[must_use]
    pub fn from_config(config: &HarnessConfig) -> Self {
        let backend = AzureBackend::new(&config.runner.terraform_bin);
        Self::new(
            config.selected_tenants().into_iter().cloned().collect(),
            config.runner.clone(),
            Arc::new(backend),
        )
    }

    /// Creates a runner from the process-wide configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] when the configuration fails to load.
    pub fn from_global() -> Result<Self, HarnessError> {
        Ok(Self::from_config(global_config()?))
    }

    /// Returns the tenants this runner will use.
    #[must_use]
    pub fn tenants(&self) -> &[TenantDefinition] {
        &self.tenants
    }

    /// Returns the runner settings.
    #[must_use]
    pub const fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// Runs `body` once per tenant and aggregates the outcomes.
    ///
    /// When a run root is configured the report is also written there; a
    /// write failure is logged and does not change the verdict.
    pub async fn run<F, Fut>(&self, test_name: &str, body: F) -> RunReport
    where
        F: Fn(Arc<TenantScope>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HarnessError>> + Send + 'static,
    {
        let body = Arc::new(body);
        let semaphore = self.settings.max_parallel.map(|limit| Arc::new(Semaphore::new(limit)));
        let mut report = RunReport::start(test_name);
        info!(test = test_name, tenants = self.tenants.len(), "multi-tenant run started");

        let mut handles = Vec::with_capacity(self.tenants.len());
        for definition in &self.tenants {
            let unit = Unit {
                test_name: test_name.to_string(),
                definition: definition.clone(),
                backend: Arc::clone(&self.backend),
                timeout: self.settings.timeout(),
                semaphore: semaphore.clone(),
                body: Arc::clone(&body),
            };
            handles.push((definition.name.clone(), tokio::spawn(unit.run())));
        }
        for (tenant, handle) in handles {
            let unit_report = match handle.await {
                Ok(unit_report) => unit_report,
                Err(err) => UnitReport {
                    tenant,
                    unique_id: None,
                    resource_group: None,
                    outcome: UnitOutcome::Failed {
                        error: format!("unit task failed: {err}"),
                    },
                    duration_ms: 0,
                    cleanup_failures: Vec::new(),
                },
            };
            report.units.push(unit_report);
        }

        let failed = report.failures().count();
        if failed == 0 {
            info!(test = test_name, units = report.units.len(), "multi-tenant run passed");
        } else {
            error!(test = test_name, failed, units = report.units.len(), "multi-tenant run failed");
        }
        if let Some(run_root) = &self.settings.run_root {
            match report.write_artifacts(run_root) {
                Ok(dir) => info!(dir = %dir.display(), "run report written"),
                Err(err) => warn!(error = %err, "run report not written"),
            }
        }
        report
    }
}

// ============================================================================
// SECTION: Unit
// ============================================================================

/// Everything one tenant unit owns.
struct Unit<F> {
    /// Test name.
    test_name: String,
    /// Tenant definition.
    definition: TenantDefinition,
    /// Collaborator factory.
    backend: Arc<dyn Backend>,
    /// Body timeout.
    timeout: Duration,
    /// Optional parallelism cap.
    semaphore: Option<Arc<Semaphore>>,
    /// Test body.
    body: Arc<F>,
}

impl<F, Fut> Unit<F>
where
    F: Fn(Arc<TenantScope>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HarnessError>> + Send + 'static,
{
    /// Runs the unit to completion; never panics through.
    async fn run(self) -> UnitReport {
        let _permit = match &self.semaphore {
            Some(semaphore) => Arc::clone(semaphore).acquire_owned().await.ok(),
            None => None,
        };
        let started = Instant::now();
        let config = match resolve(&self.definition) {
            Ok(config) => config,
            Err(err) => {
                error!(test = %self.test_name, tenant = %self.definition.name, error = %err, "tenant resolution failed");
                return UnitReport {
                    tenant: self.definition.name.clone(),
                    unique_id: None,
                    resource_group: None,
                    outcome: UnitOutcome::Failed {
                        error: err.to_string(),
                    },
                    duration_ms: elapsed_ms(started),
                    cleanup_failures: Vec::new(),
                };
            }
        };
        let span = info_span!(
            "tenant_unit",
            test = %self.test_name,
            tenant = %config.tenant_name,
            unique_id = %config.unique_id
        );
        let tenant = config.tenant_name.clone();
        let unique_id = config.unique_id.to_string();
        let resource_group = config.resource_group_name();
        let (outcome, cleanup_failures) = self.execute(config).instrument(span).await;
        UnitReport {
            tenant,
            unique_id: Some(unique_id),
            resource_group: Some(resource_group),
            outcome,
            duration_ms: elapsed_ms(started),
            cleanup_failures,
        }
    }

    /// Runs setup, body, and cleanup for a resolved tenant.
    async fn execute(
        self,
        config: vnet_harness_core::TenantConfig,
    ) -> (UnitOutcome, Vec<CleanupFailure>) {
        let cloud = match self.backend.cloud(&config) {
            Ok(cloud) => cloud,
            Err(err) => {
                error!(error = %err, "tenant auth setup failed");
                return (
                    UnitOutcome::Failed {
                        error: err.to_string(),
                    },
                    Vec::new(),
                );
            }
        };
        let tool = self.backend.tool(&config);
        let cleanup = CleanupStack::default();
        let scope = Arc::new(TenantScope::new(&self.test_name, config, cloud, tool, cleanup.clone()));

        info!("test body started");
        let mut task = tokio::spawn((*self.body)(Arc::clone(&scope)));
        let outcome = match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(Ok(()))) => UnitOutcome::Passed,
            Ok(Ok(Err(err))) => UnitOutcome::Failed {
                error: err.to_string(),
            },
            Ok(Err(join)) if join.is_panic() => UnitOutcome::Panicked {
                message: panic_message(join.into_panic()),
            },
            Ok(Err(join)) => UnitOutcome::Failed {
                error: format!("test body cancelled: {join}"),
            },
            Err(_) => {
                task.abort();
                let _ = task.await;
                UnitOutcome::TimedOut {
                    after_secs: self.timeout.as_secs(),
                }
            }
        };
        match &outcome {
            UnitOutcome::Passed => info!("test body passed"),
            other => error!(outcome = %other, "test body did not pass"),
        }

        let mut cleanup_failures = cleanup.run().await;
        if scope.resource_group_requested()
            && let Err(err) = scope.verify_deleted().await
        {
            warn!(error = %err, "resource group verification failed");
            cleanup_failures.push(CleanupFailure {
                step: "verify resource group deleted".to_string(),
                error: err.to_string(),
            });
        }
        if cleanup_failures.is_empty() {
            info!("cleanup complete");
        }
        (outcome, cleanup_failures)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns elapsed milliseconds, saturating.
fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
