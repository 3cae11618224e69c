// crates/vnet-harness-cli/src/lib.rs
// ============================================================================
// Module: VNet Harness CLI Library
// Description: Reusable pieces of the operator CLI.
// Purpose: Keep command logic testable outside the binary entry point.
// Dependencies: vnet-harness-azure, vnet-harness-runner
// ============================================================================

//! ## Overview
//! Library half of the `vnet-harness` binary. [`sweep`] reclaims resource
//! groups left behind by units that never reached cleanup.

pub mod sweep;

pub use sweep::StaleGroup;
pub use sweep::SweepAction;
pub use sweep::SweepEntry;
pub use sweep::stale_groups;

#[cfg(test)]
mod sweep_tests;
