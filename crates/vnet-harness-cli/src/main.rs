// crates/vnet-harness-cli/src/main.rs
// ============================================================================
// Module: VNet Harness CLI Entry Point
// Description: Command dispatcher for harness operator tasks.
// Purpose: Inspect tenant configuration and reclaim leaked resource groups.
// Dependencies: clap, tokio, time, vnet-harness-*
// ============================================================================

//! ## Overview
//! `vnet-harness` is the operator companion to the test suites:
//! - `tenants` prints the tenants a run would use;
//! - `config validate` loads and validates the configuration;
//! - `sweep` deletes harness resource groups older than a cutoff, for units
//!   that were killed before their cleanup ran.
//!
//! Logs go to stderr; command output goes to stdout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde::Serialize;
use thiserror::Error;
use time::Duration;
use time::OffsetDateTime;
use tracing::info;
use vnet_harness_azure::ArmClient;
use vnet_harness_azure::Endpoints;
use vnet_harness_cli::SweepAction;
use vnet_harness_cli::SweepEntry;
use vnet_harness_cli::sweep::sweep;
use vnet_harness_config::AuthMode;
use vnet_harness_config::HarnessConfig;
use vnet_harness_config::TenantDefinition;
use vnet_harness_config::resolve;
use vnet_harness_runner::LogConfig;
use vnet_harness_runner::LogFormat;
use vnet_harness_runner::init_logging;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "vnet-harness", version, disable_help_subcommand = true)]
struct Cli {
    /// Config file path (defaults to vnet-harness.toml or `VNET_HARNESS_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Log output format.
    #[arg(long, value_enum, value_name = "FORMAT", global = true)]
    log_format: Option<LogFormatArg>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// List the tenants a run would use.
    Tenants(TenantsCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Delete harness resource groups left behind by interrupted runs.
    Sweep(SweepCommand),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate the configuration.
    Validate,
}

/// Arguments for `tenants`.
#[derive(Args, Debug)]
struct TenantsCommand {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Arguments for `sweep`.
#[derive(Args, Debug)]
struct SweepCommand {
    /// Minimum age, in hours, of a group to delete.
    #[arg(long, value_name = "HOURS", default_value_t = 24)]
    older_than_hours: u32,
    /// Report what would be deleted without deleting.
    #[arg(long)]
    dry_run: bool,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Output formats.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// One line per item.
    Text,
    /// Canonical JSON.
    Json,
}

/// Log format selection.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LogFormatArg {
    /// Human-readable.
    Pretty,
    /// JSON lines.
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let mut log = LogConfig::from_env().map_err(|err| CliError::new(err.to_string()))?;
    if let Some(format) = cli.log_format {
        log.format = format.into();
    }
    init_logging(&log).map_err(|err| CliError::new(err.to_string()))?;

    let config = HarnessConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(format!("configuration error: {err}")))?;
    match cli.command {
        Commands::Tenants(command) => command_tenants(&config, &command),
        Commands::Config {
            command: ConfigCommand::Validate,
        } => command_config_validate(&config),
        Commands::Sweep(command) => command_sweep(&config, &command).await,
    }
}

// ============================================================================
// SECTION: Tenants
// ============================================================================

/// Tenant row for `tenants` output.
#[derive(Debug, Serialize)]
struct TenantRow<'a> {
    /// Tenant name.
    name: &'a str,
    /// Subscription id.
    subscription_id: &'a str,
    /// Region.
    region: &'a str,
    /// Authentication mode.
    auth: &'static str,
    /// Resource group prefix.
    resource_group_prefix: &'a str,
}

impl<'a> TenantRow<'a> {
    /// Builds a row from a validated definition.
    fn new(definition: &'a TenantDefinition) -> Self {
        Self {
            name: &definition.name,
            subscription_id: definition.subscription_id.as_deref().unwrap_or("-"),
            region: definition.region.as_deref().unwrap_or("-"),
            auth: auth_label(definition.auth_mode()),
            resource_group_prefix: definition.resource_group_prefix(),
        }
    }
}

/// Executes `tenants`.
fn command_tenants(config: &HarnessConfig, command: &TenantsCommand) -> CliResult<ExitCode> {
    let rows: Vec<TenantRow<'_>> = config.selected_tenants().into_iter().map(TenantRow::new).collect();
    match command.format {
        OutputFormat::Json => write_json(&rows)?,
        OutputFormat::Text => {
            for row in &rows {
                write_line(&format!(
                    "{}\tsubscription={}\tregion={}\tauth={}\tresource_group={}-*",
                    row.name, row.subscription_id, row.region, row.auth, row.resource_group_prefix
                ))?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `config validate`.
fn command_config_validate(config: &HarnessConfig) -> CliResult<ExitCode> {
    write_line(&format!(
        "config ok: {} tenants ({} selected), timeout {}s",
        config.tenants.len(),
        config.selected_tenants().len(),
        config.runner.timeout_seconds
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Returns the config label of an auth mode.
const fn auth_label(mode: AuthMode) -> &'static str {
    match mode {
        AuthMode::AzureCli => "azure_cli",
        AuthMode::ServicePrincipal => "service_principal",
    }
}

// ============================================================================
// SECTION: Sweep
// ============================================================================

/// Sweep results for one subscription.
#[derive(Debug, Serialize)]
struct SweepReport {
    /// Tenant used to reach the subscription.
    tenant: String,
    /// Subscription id.
    subscription_id: String,
    /// Listing failure, when the groups could not be listed.
    error: Option<String>,
    /// Swept groups.
    entries: Vec<SweepEntry>,
}

/// Executes `sweep` across the selected tenants, once per subscription.
async fn command_sweep(config: &HarnessConfig, command: &SweepCommand) -> CliResult<ExitCode> {
    let older_than = Duration::hours(i64::from(command.older_than_hours));
    let now = OffsetDateTime::now_utc();
    let endpoints = Endpoints::default();
    let mut seen = BTreeSet::new();
    let mut reports = Vec::new();
    for definition in config.selected_tenants() {
        let tenant = resolve(definition).map_err(|err| CliError::new(err.to_string()))?;
        if !seen.insert(tenant.subscription_id.clone()) {
            info!(tenant = %tenant.tenant_name, "subscription already swept");
            continue;
        }
        let result = match ArmClient::for_tenant(&tenant, &endpoints) {
            Ok(client) => sweep(&client, now, older_than, command.dry_run).await,
            Err(err) => Err(err),
        };
        let (error, entries) = match result {
            Ok(entries) => (None, entries),
            Err(err) => (Some(err.to_string()), Vec::new()),
        };
        reports.push(SweepReport {
            tenant: tenant.tenant_name,
            subscription_id: tenant.subscription_id,
            error,
            entries,
        });
    }

    match command.format {
        OutputFormat::Json => write_json(&reports)?,
        OutputFormat::Text => {
            for report in &reports {
                write_sweep_text(report)?;
            }
        }
    }
    let failed = reports.iter().any(|report| {
        report.error.is_some()
            || report.entries.iter().any(|entry| matches!(entry.action, SweepAction::Failed { .. }))
    });
    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// Writes one subscription's sweep results as text.
fn write_sweep_text(report: &SweepReport) -> CliResult<()> {
    if let Some(error) = &report.error {
        return write_line(&format!("{}: listing failed: {error}", report.tenant));
    }
    if report.entries.is_empty() {
        return write_line(&format!("{}: nothing to sweep", report.tenant));
    }
    for entry in &report.entries {
        let action = match &entry.action {
            SweepAction::Deleted => "deleted".to_string(),
            SweepAction::WouldDelete => "would delete".to_string(),
            SweepAction::Failed {
                error,
            } => format!("failed ({error})"),
        };
        write_line(&format!(
            "{}: {action} {} (test={}, age={}h)",
            report.tenant, entry.group.name, entry.group.test, entry.group.age_hours
        ))?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes canonical JSON followed by a newline.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let json = serde_jcs::to_string(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    write_line(&json)
}

/// Writes a line to stdout.
fn write_line(message: &str) -> CliResult<()> {
    write_stdout_line(message).map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
