// crates/vnet-harness-core/src/retry_tests.rs
// ============================================================================
// Module: Retry Policy Unit Tests
// Description: Unit coverage for retry classification and backoff.
// Purpose: Ensure only allowlisted errors retry and delays stay bounded.
// Dependencies: vnet-harness-core
// ============================================================================

//! ## Overview
//! Unit coverage for the retryable-error allowlist and backoff schedule.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::time::Duration;

use crate::retry::RetryPolicy;

#[test]
fn default_schedule_doubles_and_caps() {
    let policy = RetryPolicy::default_terraform();
    assert_eq!(policy.max_attempts(), 4);
    assert_eq!(policy.backoff_for(0), Duration::from_secs(5));
    assert_eq!(policy.backoff_for(1), Duration::from_secs(10));
    assert_eq!(policy.backoff_for(2), Duration::from_secs(20));
    assert_eq!(policy.backoff_for(4), Duration::from_secs(60));
    assert_eq!(policy.backoff_for(40), Duration::from_secs(60));
}

#[test]
fn transient_errors_are_classified() {
    let policy = RetryPolicy::default_terraform();
    let transient = [
        "Error: Failed to query available provider packages",
        "read tcp 10.0.0.1:443: connection reset by peer",
        "net/http: TLS handshake timeout",
        "dial tcp: i/o timeout",
        "Status=429 Code=\"TooManyRequests\"",
        "StatusCode=503 -- Original Error: Code=\"ServiceUnavailable\"",
        "Code=\"AnotherOperationInProgress\" Message=\"Another operation on this resource\"",
        "RetryableError: still creating",
    ];
    for output in transient {
        assert!(policy.classify(output).is_some(), "expected retryable: {output}");
    }
}

#[test]
fn permanent_errors_are_not_retried() {
    let policy = RetryPolicy::default_terraform();
    let permanent = [
        "Error: Invalid value for variable",
        "Code=\"AuthorizationFailed\" Message=\"does not have authorization\"",
        "Error: Reference to undeclared input variable",
        "StatusCode=400 Code=\"InvalidResourceName\"",
    ];
    for output in permanent {
        assert_eq!(policy.classify(output), None, "expected permanent: {output}");
    }
}

#[test]
fn none_policy_never_retries() {
    let policy = RetryPolicy::none();
    assert_eq!(policy.max_attempts(), 1);
    assert_eq!(policy.classify("connection reset by peer"), None);
    assert_eq!(policy.backoff_for(3), Duration::ZERO);
}

#[test]
fn custom_patterns_extend_the_allowlist() {
    let policy = RetryPolicy::none()
        .with_pattern("PublicIPCountLimitReached", "regional quota")
        .expect("pattern compiles");
    assert_eq!(policy.classify("Code=PublicIPCountLimitReached"), Some("regional quota"));
    assert!(RetryPolicy::none().with_pattern("(", "broken").is_err());
}

#[test]
fn backoff_override_keeps_cap() {
    let policy = RetryPolicy::default_terraform().with_backoff(
        2,
        Duration::from_millis(10),
        Duration::from_millis(15),
    );
    assert_eq!(policy.max_attempts(), 3);
    assert_eq!(policy.backoff_for(0), Duration::from_millis(10));
    assert_eq!(policy.backoff_for(1), Duration::from_millis(15));
}
