//! Error taxonomy for the unwrap core
//!
//! Amount problems are recovered locally (validation results or
//! [`AmountError`], never thrown past the codec). Price-fetch failures are
//! always absorbed by the cache's fallback chain and never surface. Only
//! submission and confirmation failures reach the caller, as
//! [`WithdrawError`].

use thiserror::Error;

/// Failure to turn a decimal string into an on-chain amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// The trimmed input was empty or literally "0".
    #[error("amount cannot be empty or zero")]
    EmptyOrZero,
    /// The input did not parse as a finite positive number.
    #[error("amount must be a valid positive number")]
    NotPositiveFinite,
    /// The parsed value exceeds the 1e12 ceiling.
    #[error("amount is too large")]
    TooLarge,
    /// Scaling by 10^decimals produced zero or could not be represented
    /// exactly.
    #[error("invalid amount format: {0}")]
    ParseFailure(String),
}

/// Terminal failure of one withdrawal attempt. No automatic retry occurs at
/// this level; retry/backoff lives entirely inside the confirmation tracker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WithdrawError {
    /// The bridge or wallet rejected the send. Carries the upstream error
    /// detail when one was reported.
    #[error("transaction submission rejected: {0}")]
    Submission(String),
    /// The tracker terminated without the transaction being confirmed.
    #[error("transaction did not receive sufficient confirmations within timeout period")]
    Confirmation,
}

/// A single network-level hiccup from a collaborator. Individual poll
/// errors are retried by the tracker up to its consecutive-failure budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError(err.to_string())
    }
}
