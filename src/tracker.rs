//! Confirmation tracking
//!
//! Polls the operation status source until a target number of successful
//! confirmations accumulate. A single FAILED report is terminal; transport
//! errors are retried with capped exponential backoff up to a
//! consecutive-failure budget; the overall attempt budget bounds the loop
//! even if the chain never answers.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::bridge::{OperationStatus, OperationStatusSource, TransactionLinker};

/// Progress phases are surfaced to the UI through this callback. Calls are
/// fire-and-forget; the tracker never depends on them.
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Polling budgets and delays.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Maximum polls before giving up (~10 minutes at the base delay)
    pub max_attempts: u32,
    /// Consecutive transport errors before declaring network failure
    pub max_consecutive_failures: u32,
    /// Delay between polls when the last poll answered
    pub base_delay: Duration,
    /// Cap on the exponential backoff multiplier
    pub max_backoff_factor: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            max_consecutive_failures: 5,
            base_delay: Duration::from_secs(10),
            max_backoff_factor: 8,
        }
    }
}

impl TrackerConfig {
    /// Inter-poll delay given the current consecutive-failure count.
    /// Backoff accumulates only across consecutive error responses; any
    /// answered poll resets to the base delay.
    fn delay_for(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return self.base_delay;
        }
        let factor = 2u32
            .saturating_pow(consecutive_failures)
            .min(self.max_backoff_factor);
        self.base_delay * factor
    }
}

/// Why tracking declared failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The source reported FAILED
    StatusFailed,
    /// The consecutive-failure budget was exhausted
    NetworkIssues,
}

/// Terminal state of one tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// Reached the confirmation target
    Confirmed,
    Failed(FailureReason),
    /// Attempt budget exhausted while still polling
    TimedOut { confirmations: u32 },
}

impl ConfirmationOutcome {
    /// Whether the withdrawal should be treated as confirmed. A timeout
    /// with at least one confirmation counts as best-effort success.
    pub fn is_confirmed(&self) -> bool {
        match self {
            ConfirmationOutcome::Confirmed => true,
            ConfirmationOutcome::Failed(_) => false,
            ConfirmationOutcome::TimedOut { confirmations } => *confirmations > 0,
        }
    }
}

/// Polls a status source until a confirmation target is reached or a
/// budget runs out. Strictly sequential: one poll at a time per session.
pub struct ConfirmationTracker<S> {
    source: S,
    config: TrackerConfig,
}

impl<S: OperationStatusSource> ConfirmationTracker<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, TrackerConfig::default())
    }

    pub fn with_config(source: S, config: TrackerConfig) -> Self {
        Self { source, config }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Drive one tracking session to its terminal state.
    pub async fn track(
        &self,
        linker: &TransactionLinker,
        target: u32,
        progress: Option<&ProgressCallback>,
    ) -> ConfirmationOutcome {
        let mut confirmations = 0u32;
        let mut attempts = 0u32;
        let mut consecutive_failures = 0u32;

        info!(target, "Starting confirmation tracking");
        report(progress, "Processing...");

        while confirmations < target && attempts < self.config.max_attempts {
            match self.source.get_status(linker).await {
                Ok(OperationStatus::Successful) => {
                    confirmations += 1;
                    consecutive_failures = 0;
                    debug!(
                        attempt = attempts + 1,
                        confirmations, target, "Confirmation received"
                    );
                    if confirmations >= target {
                        info!(confirmations, "Transaction fully confirmed");
                        return ConfirmationOutcome::Confirmed;
                    }
                }
                Ok(OperationStatus::Failed) => {
                    warn!(attempt = attempts + 1, "Transaction failed on-chain");
                    report(progress, "Transaction failed");
                    return ConfirmationOutcome::Failed(FailureReason::StatusFailed);
                }
                Ok(OperationStatus::Pending) => {
                    // a pending read is an answer, not a failure
                    consecutive_failures = 0;
                    debug!(attempt = attempts + 1, "Transaction still pending");
                }
                Err(err) => {
                    consecutive_failures += 1;
                    warn!(
                        attempt = attempts + 1,
                        consecutive_failures,
                        error = %err,
                        "Confirmation check failed"
                    );
                    if consecutive_failures >= self.config.max_consecutive_failures {
                        warn!("Too many consecutive failures, aborting confirmation tracking");
                        report(progress, "Network connection issues");
                        return ConfirmationOutcome::Failed(FailureReason::NetworkIssues);
                    }
                }
            }

            tokio::time::sleep(self.config.delay_for(consecutive_failures)).await;
            attempts += 1;
        }

        warn!(
            attempts,
            confirmations, "Timeout waiting for confirmations"
        );
        report(progress, "Processing timeout - transaction may still complete");
        ConfirmationOutcome::TimedOut { confirmations }
    }
}

fn report(progress: Option<&ProgressCallback>, phase: &str) {
    if let Some(callback) = progress {
        callback(phase);
    }
}
