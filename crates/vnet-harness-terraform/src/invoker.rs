// crates/vnet-harness-terraform/src/invoker.rs
// ============================================================================
// Module: Module Invoker
// Description: Plan, apply, and destroy through the terraform binary.
// Purpose: Produce structured plan and output results with transient retry.
// Dependencies: async-trait, tokio, tracing, vnet-harness-core
// ============================================================================

//! ## Overview
//! [`Terraform`] implements [`ProvisioningTool`] by spawning the tool binary
//! once per command. Every command runs with:
//! - `-chdir=<module dir>` so the caller's working directory never matters;
//! - `TF_DATA_DIR`, `-state`, `-out` and `-var-file` pointing into the
//!   [`ModuleRun`] working area;
//! - inherited provider identity variables ([`PROVIDER_AUTH_ENV`]) removed,
//!   then the option's environment overrides passed to the child only;
//! - `kill_on_drop`, so aborting the calling task kills the child.
//!
//! Failed commands are retried when their combined output matches the
//! option's [`vnet_harness_core::RetryPolicy`]; anything else fails on the
//! first attempt.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;
use tracing::info;
use tracing::warn;
use vnet_harness_core::Outputs;
use vnet_harness_core::PROVIDER_AUTH_ENV;
use vnet_harness_core::PlanResult;

use crate::error::TerraformError;
use crate::workspace::ModuleRun;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default tool binary.
pub const DEFAULT_BINARY: &str = "terraform";
/// Maximum characters of command output kept in errors.
const MAX_ERROR_OUTPUT_CHARS: usize = 4000;

// ============================================================================
// SECTION: Provisioning Tool
// ============================================================================

/// Plan/apply/destroy boundary of the provisioning tool.
///
/// Each operation runs an implicit `init` first.
#[async_trait]
pub trait ProvisioningTool: Send + Sync {
    /// Runs init + plan and returns the parsed plan.
    async fn plan(&self, run: &ModuleRun) -> Result<PlanResult, TerraformError>;

    /// Runs init + apply and returns the declared outputs.
    ///
    /// Refused with [`TerraformError::PlanOnly`] for plan-only options.
    async fn apply(&self, run: &ModuleRun) -> Result<Outputs, TerraformError>;

    /// Destroys everything the run applied. A no-op for plan-only options
    /// and for runs that never wrote state.
    async fn destroy(&self, run: &ModuleRun) -> Result<(), TerraformError>;
}

// ============================================================================
// SECTION: Terraform
// ============================================================================

/// Captured result of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CommandOutput {
    /// Exit status (`-1` when killed by a signal).
    status: i32,
    /// Standard output.
    stdout: String,
    /// Standard error.
    stderr: String,
}

impl CommandOutput {
    /// Returns true for a zero exit status.
    const fn success(&self) -> bool {
        self.status == 0
    }

    /// Returns stdout and stderr joined for classification.
    fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Module invoker backed by the `terraform` binary.
#[derive(Debug, Clone)]
pub struct Terraform {
    /// Tool binary path or name resolved through `PATH`.
    binary: PathBuf,
}

impl Default for Terraform {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY)
    }
}

impl Terraform {
    /// Creates an invoker for `binary`.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Returns the tool binary.
    #[must_use]
    pub fn binary(&self) -> &std::path::Path {
        &self.binary
    }

    /// Runs `init`.
    async fn init(&self, run: &ModuleRun) -> Result<(), TerraformError> {
        self.run_command(run, "init", vec![flag("-input=false"), flag("-no-color")]).await?;
        Ok(())
    }

    /// Runs one subcommand with the retry policy.
    async fn run_command(
        &self,
        run: &ModuleRun,
        command: &'static str,
        args: Vec<OsString>,
    ) -> Result<CommandOutput, TerraformError> {
        let policy = &run.options().retry_policy;
        let attempts = policy.max_attempts();
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            info!(command, attempt, module = %run.options().terraform_dir().display(), "terraform command");
            let output = self.execute(run, command, &args).await?;
            if output.success() {
                debug!(command, attempt, "terraform command succeeded");
                return Ok(output);
            }
            let combined = output.combined();
            let Some(reason) = policy.classify(&combined) else {
                return Err(TerraformError::CommandFailed {
                    command,
                    status: output.status,
                    output: tail(&combined),
                });
            };
            if attempt >= attempts {
                return Err(TerraformError::RetriesExhausted {
                    command,
                    attempts: attempt,
                    reason: reason.to_string(),
                    output: tail(&combined),
                });
            }
            let delay = policy.backoff_for(attempt - 1);
            warn!(command, attempt, reason, delay_ms = delay.as_millis(), "retryable terraform error");
            tokio::time::sleep(delay).await;
        }
    }

    /// Spawns the binary once and captures its output.
    async fn execute(
        &self,
        run: &ModuleRun,
        command: &'static str,
        args: &[OsString],
    ) -> Result<CommandOutput, TerraformError> {
        let options = run.options();
        let mut chdir = OsString::from("-chdir=");
        chdir.push(options.terraform_dir());
        let mut child = Command::new(&self.binary);
        child.arg(chdir).arg(command).args(args);
        for key in PROVIDER_AUTH_ENV {
            child.env_remove(key);
        }
        let output = child
            .envs(&options.env_vars)
            .env("TF_DATA_DIR", run.data_dir())
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| TerraformError::Spawn {
                program: self.binary.display().to_string(),
                message: err.to_string(),
            })?;
        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[async_trait]
impl ProvisioningTool for Terraform {
    async fn plan(&self, run: &ModuleRun) -> Result<PlanResult, TerraformError> {
        self.init(run).await?;
        self.run_command(
            run,
            "plan",
            vec![
                flag("-input=false"),
                flag("-no-color"),
                flag("-lock=false"),
                path_flag("-out=", run.plan_path()),
                path_flag("-state=", run.state_path()),
                path_flag("-var-file=", run.var_file_path()),
            ],
        )
        .await?;
        let shown = self
            .run_command(run, "show", vec![flag("-json"), flag("-no-color"), run.plan_path().into()])
            .await?;
        let plan = PlanResult::from_json_slice(shown.stdout.as_bytes())?;
        info!(
            planned = plan.planned_values().len(),
            changes = plan.resource_changes().len(),
            "terraform plan parsed"
        );
        Ok(plan)
    }

    async fn apply(&self, run: &ModuleRun) -> Result<Outputs, TerraformError> {
        if run.options().plan_only {
            return Err(TerraformError::PlanOnly);
        }
        self.init(run).await?;
        self.run_command(
            run,
            "apply",
            vec![
                flag("-input=false"),
                flag("-no-color"),
                flag("-lock=false"),
                flag("-auto-approve"),
                path_flag("-state=", run.state_path()),
                path_flag("-var-file=", run.var_file_path()),
            ],
        )
        .await?;
        let output = self
            .run_command(
                run,
                "output",
                vec![flag("-json"), flag("-no-color"), path_flag("-state=", run.state_path())],
            )
            .await?;
        Ok(Outputs::from_json_slice(output.stdout.as_bytes())?)
    }

    async fn destroy(&self, run: &ModuleRun) -> Result<(), TerraformError> {
        if run.options().plan_only {
            debug!("destroy skipped for plan-only run");
            return Ok(());
        }
        if !run.has_state() {
            debug!("destroy skipped: no state was written");
            return Ok(());
        }
        self.init(run).await?;
        self.run_command(
            run,
            "destroy",
            vec![
                flag("-input=false"),
                flag("-no-color"),
                flag("-lock=false"),
                flag("-auto-approve"),
                path_flag("-state=", run.state_path()),
                path_flag("-var-file=", run.var_file_path()),
            ],
        )
        .await?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a plain argument.
fn flag(value: &str) -> OsString {
    OsString::from(value)
}

/// Builds a `-name=<path>` argument.
fn path_flag(prefix: &str, path: PathBuf) -> OsString {
    let mut arg = OsString::from(prefix);
    arg.push(path);
    arg
}

/// Keeps the last [`MAX_ERROR_OUTPUT_CHARS`] characters of `text`.
pub(crate) fn tail(text: &str) -> String {
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count <= MAX_ERROR_OUTPUT_CHARS {
        return trimmed.to_string();
    }
    let skipped: String = trimmed.chars().skip(count - MAX_ERROR_OUTPUT_CHARS).collect();
    format!("...{skipped}")
}
