// system-tests/src/lib.rs
// ============================================================================
// Module: VNet Harness System Tests Library
// Description: Shared configuration for module system test suites.
// Purpose: Locate the modules under test for the suites in `tests/`.
// Dependencies: vnet-harness-config
// ============================================================================

//! ## Overview
//! This crate hosts the configuration shared by the module suites in
//! `system-tests/tests`. The suites drive real Terraform against real
//! subscriptions and only build with `--features system-tests`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
