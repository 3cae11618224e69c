// crates/vnet-harness-core/src/retry.rs
// ============================================================================
// Module: Retry Classification
// Description: Retryable-error allowlist and bounded backoff schedule.
// Purpose: Separate transient provisioning failures from real test failures.
// Dependencies: regex
// ============================================================================

//! ## Overview
//! Cloud APIs and provider registries fail transiently often enough that a
//! harness without retry classification reports false negatives. A
//! [`RetryPolicy`] holds an allowlist of regular expressions matched against
//! the combined stdout/stderr of a failed tool invocation and an exponential
//! backoff schedule. Errors that match no pattern are never retried.
//!
//! Default schedule: 3 retries, 5 s initial delay, doubling, capped at 60 s
//! (5 s, 10 s, 20 s).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use regex::Regex;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default delay before the first retry.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(5);
/// Default upper bound on a single delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(60);
/// Default multiplier between consecutive delays.
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;

/// Default allowlist: `(pattern, reason)`.
///
/// Covers registry/provider download flakes, network resets, ARM throttling,
/// transient ARM server errors, in-flight conflicting operations, and
/// transient token acquisition failures.
const DEFAULT_RETRYABLE_ERRORS: &[(&str, &str)] = &[
    (
        r"(?s)Error installing provider.*(connection reset by peer|TLS handshake timeout)",
        "provider download interrupted",
    ),
    (r"(?s)Failed to query available provider packages", "provider registry unavailable"),
    (r"(?s)Failed to install provider", "provider install failed"),
    (r"(?i)connection reset by peer", "connection reset"),
    (r"(?i)TLS handshake timeout", "TLS handshake timeout"),
    (r"(?i)i/o timeout", "network i/o timeout"),
    (r"(?i)(429 Too Many Requests|StatusCode=429|TooManyRequests)", "ARM throttling"),
    (r"(?i)RetryableError", "provider signalled retryable error"),
    (r"(?i)StatusCode=(500|502|503|504)\b", "transient ARM server error"),
    (r"(?i)InternalServerError|ServiceUnavailable|GatewayTimeout", "transient ARM server error"),
    (r"(?i)AnotherOperationInProgress", "conflicting operation in progress"),
    (
        r"(?is)(obtaining (an )?(authorization|access) token|acquiring (an )?(authorization|access) token).*(timeout|timed out|connection|temporar)",
        "transient token acquisition failure",
    ),
    (r"AADSTS(50058|90033|500011|7000215)?:? .*temporar", "transient Azure AD error"),
];

// ============================================================================
// SECTION: Types
// ============================================================================

/// A retryable error pattern with a human-readable reason.
#[derive(Debug, Clone)]
pub struct RetryablePattern {
    /// Compiled pattern.
    pattern: Regex,
    /// Reason reported when the pattern matches.
    reason: String,
}

impl RetryablePattern {
    /// Compiles a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] when the pattern does not compile.
    pub fn new(pattern: &str, reason: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            reason: reason.into(),
        })
    }

    /// Returns the pattern source.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Returns the match reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Retry policy for provisioning tool invocations.
///
/// # Invariants
/// - Total attempts are `max_retries + 1`.
/// - Each delay is at most `max_backoff`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on a single delay.
    pub max_backoff: Duration,
    /// Multiplier between consecutive delays.
    pub multiplier: u32,
    /// Retryable error allowlist.
    patterns: Vec<RetryablePattern>,
}

impl RetryPolicy {
    /// Returns the default policy with the built-in allowlist.
    #[must_use]
    pub fn default_terraform() -> Self {
        let patterns = DEFAULT_RETRYABLE_ERRORS
            .iter()
            .filter_map(|(pattern, reason)| RetryablePattern::new(pattern, *reason).ok())
            .collect();
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            patterns,
        }
    }

    /// Returns a policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1,
            patterns: Vec::new(),
        }
    }

    /// Adds a retryable pattern.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] when the pattern does not compile.
    pub fn with_pattern(
        mut self,
        pattern: &str,
        reason: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        self.patterns.push(RetryablePattern::new(pattern, reason)?);
        Ok(self)
    }

    /// Overrides the backoff schedule.
    #[must_use]
    pub const fn with_backoff(
        mut self,
        max_retries: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
    ) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff = initial_backoff;
        self.max_backoff = max_backoff;
        self
    }

    /// Returns the allowlist.
    #[must_use]
    pub fn patterns(&self) -> &[RetryablePattern] {
        &self.patterns
    }

    /// Returns the reason of the first pattern matching `output`, if any.
    #[must_use]
    pub fn classify(&self, output: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|pattern| pattern.pattern.is_match(output))
            .map(RetryablePattern::reason)
    }

    /// Returns the delay before retry number `retry` (zero-based).
    #[must_use]
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(retry);
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }

    /// Returns the total number of attempts.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::default_terraform()
    }
}
