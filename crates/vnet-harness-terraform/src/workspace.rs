// crates/vnet-harness-terraform/src/workspace.rs
// ============================================================================
// Module: Module Run Workspace
// Description: Per-lifecycle isolated working area for the provisioning tool.
// Purpose: Let parallel units share one module directory without collisions.
// Dependencies: tempfile, vnet-harness-core
// ============================================================================

//! ## Overview
//! A [`ModuleRun`] owns one plan-only or apply+destroy lifecycle. Its
//! temporary directory holds everything the tool would otherwise write next
//! to the module: the data directory (`TF_DATA_DIR`), the state file, the
//! saved plan, and the JSON variable file. Dropping the run removes the
//! directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use tempfile::TempDir;
use vnet_harness_core::ModuleOptions;

use crate::error::TerraformError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Data directory name inside the workspace.
const DATA_DIR: &str = "tf-data";
/// State file name inside the workspace.
const STATE_FILE: &str = "terraform.tfstate";
/// Saved plan file name inside the workspace.
const PLAN_FILE: &str = "plan.tfplan";
/// Variable file name inside the workspace.
const VAR_FILE: &str = "inputs.tfvars.json";

// ============================================================================
// SECTION: Module Run
// ============================================================================

/// One module lifecycle with its isolated working area.
///
/// # Invariants
/// - The variable file is written once, at construction.
/// - Paths stay valid until the run is dropped.
#[derive(Debug)]
pub struct ModuleRun {
    /// Validated invocation record.
    options: ModuleOptions,
    /// Isolated working area.
    workspace: TempDir,
}

impl ModuleRun {
    /// Creates the working area and writes the variable file.
    ///
    /// # Errors
    ///
    /// Returns [`TerraformError`] when the variables cannot be serialized or
    /// the working area cannot be created.
    pub fn new(options: ModuleOptions) -> Result<Self, TerraformError> {
        let var_file = options.var_file_json()?;
        let workspace = tempfile::Builder::new()
            .prefix("vnet-harness-")
            .tempdir()
            .map_err(|err| workspace_error("create workspace", &err))?;
        fs::create_dir(workspace.path().join(DATA_DIR))
            .map_err(|err| workspace_error("create data dir", &err))?;
        fs::write(workspace.path().join(VAR_FILE), var_file)
            .map_err(|err| workspace_error("write var file", &err))?;
        Ok(Self {
            options,
            workspace,
        })
    }

    /// Returns the invocation record.
    #[must_use]
    pub const fn options(&self) -> &ModuleOptions {
        &self.options
    }

    /// Returns the working area root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.workspace.path()
    }

    /// Returns the `TF_DATA_DIR` path.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.root().join(DATA_DIR)
    }

    /// Returns the state file path.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.root().join(STATE_FILE)
    }

    /// Returns the saved plan path.
    #[must_use]
    pub fn plan_path(&self) -> PathBuf {
        self.root().join(PLAN_FILE)
    }

    /// Returns the variable file path.
    #[must_use]
    pub fn var_file_path(&self) -> PathBuf {
        self.root().join(VAR_FILE)
    }

    /// Returns true once an apply has written state.
    #[must_use]
    pub fn has_state(&self) -> bool {
        self.state_path().is_file()
    }
}

/// Builds a workspace error.
fn workspace_error(context: &'static str, err: &std::io::Error) -> TerraformError {
    TerraformError::Workspace {
        context,
        message: err.to_string(),
    }
}
