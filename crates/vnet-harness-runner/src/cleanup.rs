// crates/vnet-harness-runner/src/cleanup.rs
// ============================================================================
// Module: Cleanup Stack
// Description: Deferred release actions executed in reverse registration order.
// Purpose: Guarantee teardown of acquired resources on every exit path.
// Dependencies: tokio, tracing
// ============================================================================

//! ## Overview
//! A release action is registered at acquisition time, before the acquiring
//! call is made, so an interrupted acquisition is still released. The
//! stack lives outside the test body task: the runner drains it after the
//! body returns, fails, panics, or is aborted on timeout.
//!
//! Every step runs in its own task, even when an earlier step fails,
//! panics, or times out; failures are collected and returned. A step that
//! exceeds its timeout is aborted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use tracing::Instrument;
use tracing::info;
use tracing::warn;

use crate::error::CleanupFailure;
use crate::error::HarnessError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Default bound on a single cleanup step.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(45 * 60);

/// Boxed release future.
type ReleaseFuture = Pin<Box<dyn Future<Output = Result<(), HarnessError>> + Send>>;

/// One registered release action.
struct CleanupStep {
    /// Human-readable label.
    label: String,
    /// Release future; not polled until the stack is drained.
    release: ReleaseFuture,
}

/// Shared LIFO stack of release actions for one tenant unit.
///
/// # Invariants
/// - Steps run in reverse registration order.
/// - Draining empties the stack; later registrations form a new batch.
#[derive(Clone)]
pub struct CleanupStack {
    /// Registered steps, oldest first.
    steps: Arc<Mutex<Vec<CleanupStep>>>,
    /// Bound on one step.
    step_timeout: Duration,
}

impl Default for CleanupStack {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_TIMEOUT)
    }
}

impl CleanupStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new(step_timeout: Duration) -> Self {
        Self {
            steps: Arc::new(Mutex::new(Vec::new())),
            step_timeout,
        }
    }

    /// Registers a release action. `release` is not polled until drained.
    pub fn defer<F>(&self, label: impl Into<String>, release: F)
    where
        F: Future<Output = Result<(), HarnessError>> + Send + 'static,
    {
        let step = CleanupStep {
            label: label.into(),
            release: Box::pin(release),
        };
        self.lock().push(step);
    }

    /// Returns the number of pending steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true when no steps are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Runs every pending step, newest first, and returns the failures.
    pub async fn run(&self) -> Vec<CleanupFailure> {
        let steps = std::mem::take(&mut *self.lock());
        let mut failures = Vec::new();
        for step in steps.into_iter().rev() {
            info!(step = %step.label, "cleanup step");
            let mut task = tokio::spawn(step.release.in_current_span());
            let error = match tokio::time::timeout(self.step_timeout, &mut task).await {
                Ok(Ok(Ok(()))) => continue,
                Ok(Ok(Err(err))) => err.to_string(),
                Ok(Err(join)) if join.is_panic() => {
                    format!("panicked: {}", panic_message(join.into_panic()))
                }
                Ok(Err(join)) => format!("cancelled: {join}"),
                Err(_) => {
                    task.abort();
                    format!("timed out after {}s", self.step_timeout.as_secs())
                }
            };
            warn!(step = %step.label, error = %error, "cleanup step failed");
            failures.push(CleanupFailure {
                step: step.label,
                error,
            });
        }
        failures
    }

    /// Locks the step list, recovering from poisoning.
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CleanupStep>> {
        self.steps.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Extracts text from a panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}
