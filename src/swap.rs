//! Swap screen state
//!
//! Plain state object backing the unwrap widget: input handling, error
//! surfacing, estimated output, fiat rendering, and the gate that decides
//! whether a swap may be submitted. The host UI observes this struct; the
//! struct never touches the network itself.
//!
//! Balance refreshes are guarded by a generation counter: every refresh
//! captures a token, and a completed fetch commits only if its token is
//! still the latest. A slow fetch that finishes after a newer one can
//! never overwrite fresh balances with stale ones.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::amount::{
    is_valid_positive_number, sanitize, validate, validate_sufficient_balance,
};
use crate::balance::AllBalances;

/// WTAC converts to TAC one-to-one.
pub const UNWRAP_EXCHANGE_RATE: f64 = 1.0;

/// Token issued by [`SwapState::begin_refresh`]; proves which refresh a
/// completed balance fetch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshToken(u64);

/// State of the unwrap form.
#[derive(Debug)]
pub struct SwapState {
    input_value: String,
    error: Option<String>,
    estimated_output: String,
    input_balance: String,
    output_balance: String,
    generation: AtomicU64,
}

impl Default for SwapState {
    fn default() -> Self {
        Self {
            input_value: "0".to_string(),
            error: None,
            estimated_output: "0".to_string(),
            input_balance: "0".to_string(),
            output_balance: "0".to_string(),
            generation: AtomicU64::new(0),
        }
    }
}

impl SwapState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitize and validate a keystroke update. The first validation
    /// error (if any) becomes the displayed error; a valid input updates
    /// the estimated output.
    pub fn set_input_value(&mut self, raw: &str) {
        let sanitized = sanitize(raw);
        let validation = validate(&sanitized);

        if validation.is_valid() {
            self.error = None;
            let amount: f64 = sanitized.parse().unwrap_or(0.0);
            self.estimated_output = (amount * UNWRAP_EXCHANGE_RATE).to_string();
        } else {
            self.error = Some(
                validation
                    .first_message()
                    .unwrap_or("Invalid input")
                    .to_string(),
            );
            self.estimated_output = "0".to_string();
        }
        self.input_value = sanitized;
    }

    pub fn input_value(&self) -> &str {
        &self.input_value
    }

    pub fn estimated_output(&self) -> &str {
        &self.estimated_output
    }

    pub fn input_balance(&self) -> &str {
        &self.input_balance
    }

    pub fn output_balance(&self) -> &str {
        &self.output_balance
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Check the entered amount against the current input balance,
    /// surfacing the first violation as the displayed error.
    pub fn validate_balance(&mut self) -> bool {
        let result = validate_sufficient_balance(&self.input_value, &self.input_balance);
        if result.is_valid() {
            self.error = None;
            true
        } else {
            self.error = Some(
                result
                    .first_message()
                    .unwrap_or("Insufficient balance")
                    .to_string(),
            );
            false
        }
    }

    /// Whether a swap may be submitted right now.
    pub fn can_swap(&self) -> bool {
        if self.error.is_some() || !is_valid_positive_number(&self.input_value) {
            return false;
        }
        let amount: f64 = self.input_value.parse().unwrap_or(f64::NAN);
        let balance: f64 = self.input_balance.parse().unwrap_or(f64::NAN);
        amount <= balance
    }

    /// USD value of the entered amount at `price`, rendered to cents.
    pub fn fiat_value(&self, price: f64) -> String {
        let amount: f64 = self.input_value.parse().unwrap_or(0.0);
        format!("{:.2}", amount * price)
    }

    /// USD value of the estimated output at `price`.
    pub fn output_fiat_value(&self, price: f64) -> String {
        let amount: f64 = self.estimated_output.parse().unwrap_or(0.0);
        format!("{:.2}", amount * price)
    }

    /// Start a balance refresh, invalidating any still-running one.
    pub fn begin_refresh(&self) -> RefreshToken {
        RefreshToken(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Commit fetched balances if `token` still belongs to the latest
    /// refresh. Returns whether the commit was applied.
    pub fn commit_balances(&mut self, token: RefreshToken, balances: &AllBalances) -> bool {
        if self.generation.load(Ordering::SeqCst) != token.0 {
            tracing::debug!("Discarding stale balance refresh");
            return false;
        }
        self.input_balance = balances.wtac.balance.clone();
        self.output_balance = balances.tac.balance.clone();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::TokenBalance;
    use alloy::primitives::U256;

    fn balances(wtac_raw: u64, tac_raw: u64) -> AllBalances {
        AllBalances {
            wtac: TokenBalance::from_raw(U256::from(wtac_raw), 18),
            tac: TokenBalance::from_raw(U256::from(tac_raw), 18),
        }
    }

    #[test]
    fn test_input_is_sanitized_and_estimated() {
        let mut state = SwapState::new();
        state.set_input_value("$1,5abc");
        assert_eq!(state.input_value(), "15");
        assert_eq!(state.estimated_output(), "15");
        assert!(state.error().is_none());
    }

    #[test]
    fn test_invalid_input_surfaces_first_error() {
        let mut state = SwapState::new();
        state.set_input_value("0");
        assert_eq!(state.error(), Some("Value must be greater than 0"));
        assert_eq!(state.estimated_output(), "0");
    }

    #[test]
    fn test_validate_balance_gates_submission() {
        let mut state = SwapState::new();
        let token = state.begin_refresh();
        state.commit_balances(token, &balances(2_000_000_000_000_000_000, 0));

        state.set_input_value("1.5");
        assert!(state.validate_balance());
        assert!(state.can_swap());

        state.set_input_value("3");
        assert!(!state.validate_balance());
        assert_eq!(state.error(), Some("Insufficient balance"));
        assert!(!state.can_swap());
    }

    #[test]
    fn test_fiat_values() {
        let mut state = SwapState::new();
        state.set_input_value("100");
        assert_eq!(state.fiat_value(0.0012), "0.12");
        assert_eq!(state.output_fiat_value(0.0012), "0.12");
    }

    #[test]
    fn test_stale_refresh_is_discarded() {
        let mut state = SwapState::new();

        let slow = state.begin_refresh();
        let fast = state.begin_refresh();

        assert!(state.commit_balances(fast, &balances(2_000_000_000_000_000_000, 0)));
        // the older fetch completes afterwards and must not overwrite
        assert!(!state.commit_balances(slow, &balances(1_000_000_000_000_000_000, 0)));
        assert_eq!(state.input_balance(), "2");
    }
}
