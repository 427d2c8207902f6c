//! WTAC unwrap core
//!
//! Engine for converting bridged WTAC jettons back into native TAC through
//! the TON cross-chain bridge. The host application (wallet UI) supplies the
//! collaborators defined in [`bridge`]; this crate owns the parts with real
//! logic:
//!
//! - [`amount`] — sanitization, validation, and fixed-point parsing of
//!   user-entered decimal amounts
//! - [`price`] — TTL-cached USD price lookups with single-flight request
//!   coalescing and a persisted fallback
//! - [`tracker`] — confirmation polling with capped exponential backoff and
//!   a consecutive-failure budget
//! - [`withdraw`] — end-to-end withdrawal orchestration
//!
//! Wallet connection, rendering, and the bridge's on-chain settlement are
//! the host's concern and are reached only through the [`bridge`] traits.

pub mod amount;
pub mod balance;
pub mod bridge;
pub mod config;
pub mod error;
pub mod price;
pub mod swap;
pub mod tracker;
pub mod withdraw;

pub use amount::FixedPointAmount;
pub use config::UnwrapConfig;
pub use error::{AmountError, TransportError, WithdrawError};
pub use price::{PriceCache, TokenSymbol};
pub use tracker::{ConfirmationOutcome, ConfirmationTracker, TrackerConfig};
pub use withdraw::{WithdrawalOrchestrator, WithdrawalResult};
