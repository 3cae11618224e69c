// crates/vnet-harness-runner/src/report_tests.rs
// ============================================================================
// Module: Run Report Unit Tests
// Description: Unit coverage for verdicts, summaries, and artifacts.
// Purpose: Ensure failures name `{test}/{tenant}` and summaries persist.
// Dependencies: serde_json, tempfile
// ============================================================================

//! ## Overview
//! Unit coverage for [`crate::report`].

#![allow(
    clippy::panic,
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use crate::error::CleanupFailure;
use crate::error::HarnessError;
use crate::report::RunReport;
use crate::report::UnitOutcome;
use crate::report::UnitReport;

fn unit(tenant: &str, outcome: UnitOutcome) -> UnitReport {
    UnitReport {
        tenant: tenant.to_string(),
        unique_id: Some("abc12345".to_string()),
        resource_group: Some("rg-vnet-test-abc12345".to_string()),
        outcome,
        duration_ms: 12,
        cleanup_failures: Vec::new(),
    }
}

fn report(units: Vec<UnitReport>) -> RunReport {
    let mut report = RunReport::start("basic_plan");
    report.units = units;
    report
}

#[test]
fn all_passed_units_pass_the_run() {
    let report = report(vec![unit("a", UnitOutcome::Passed), unit("b", UnitOutcome::Passed)]);
    assert!(report.passed());
    assert_eq!(report.failures().count(), 0);
    assert!(report.into_result().is_ok());
}

#[test]
fn empty_run_fails() {
    let report = report(Vec::new());
    assert!(!report.passed());
    assert_eq!(report.problem_lines(), vec!["basic_plan: no tenant units ran".to_string()]);
    assert!(report.into_result().is_err());
}

#[test]
fn cleanup_failure_fails_a_passed_body() {
    let mut leaked = unit("a", UnitOutcome::Passed);
    leaked.cleanup_failures.push(CleanupFailure {
        step: "delete resource group rg-vnet-test-abc12345".to_string(),
        error: "403".to_string(),
    });
    assert!(!leaked.passed());
    let report = report(vec![leaked]);
    assert_eq!(
        report.problem_lines(),
        vec!["basic_plan/a: cleanup `delete resource group rg-vnet-test-abc12345` failed: 403"]
    );
}

#[test]
fn failed_run_names_each_failing_tenant() {
    let report = report(vec![
        unit("a", UnitOutcome::Passed),
        unit(
            "b",
            UnitOutcome::Failed {
                error: "expected 3 subnets".to_string(),
            },
        ),
        unit(
            "c",
            UnitOutcome::TimedOut {
                after_secs: 5400,
            },
        ),
    ]);
    let Err(HarnessError::RunFailed {
        test,
        failed,
        total,
        summary,
    }) = report.into_result()
    else {
        panic!("expected RunFailed");
    };
    assert_eq!(test, "basic_plan");
    assert_eq!(failed, 2);
    assert_eq!(total, 3);
    assert_eq!(
        summary,
        "basic_plan/b: failed: expected 3 subnets\nbasic_plan/c: timed out after 5400s"
    );
}

#[test]
fn outcome_serializes_with_status_tag() {
    let value = serde_json::to_value(UnitOutcome::Panicked {
        message: "index out of bounds".to_string(),
    })
    .unwrap();
    assert_eq!(value, serde_json::json!({"status": "panicked", "message": "index out of bounds"}));
}

#[test]
fn markdown_lists_tenants_and_problems() {
    let mut failed = unit(
        "b",
        UnitOutcome::Failed {
            error: "boom".to_string(),
        },
    );
    failed.unique_id = None;
    let markdown = report(vec![unit("a", UnitOutcome::Passed), failed]).to_markdown();
    assert!(markdown.contains("- Verdict: failed"));
    assert!(markdown.contains("| a | abc12345 | passed | 12 | ok |"));
    assert!(markdown.contains("| b | - | failed: boom | 12 | ok |"));
    assert!(markdown.contains("- basic_plan/b: failed: boom"));
}

#[test]
fn write_artifacts_emits_canonical_json_and_markdown() {
    let temp = tempfile::tempdir().unwrap();
    let mut report = report(vec![unit("a", UnitOutcome::Passed)]);
    report.test_name = "scenario a/plan".to_string();

    let dir = report.write_artifacts(temp.path()).unwrap();

    assert_eq!(dir, temp.path().join("scenario_a_plan").join(format!("run_{}", report.started_at_ms)));
    let json = std::fs::read(dir.join("summary.json")).unwrap();
    assert_eq!(json, serde_jcs::to_vec(&report).unwrap());
    let parsed: serde_json::Value = serde_json::from_slice(&json).unwrap();
    assert_eq!(parsed["units"][0]["outcome"]["status"], "passed");
    let markdown = std::fs::read_to_string(dir.join("summary.md")).unwrap();
    assert_eq!(markdown, report.to_markdown());
}
