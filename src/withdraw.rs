//! Withdrawal orchestration
//!
//! Drives one WTAC-to-TAC withdrawal end to end: builds the conversion
//! proxy call, submits the cross-chain send exactly once, and hands the
//! accepted transaction to the confirmation tracker. All retry behavior
//! lives in the tracker; a rejected submission is terminal here.

use alloy::sol_types::SolValue;
use tracing::{info, warn};

use crate::amount::FixedPointAmount;
use crate::bridge::{
    AssetBridgingData, AssetType, BridgeClient, OperationStatusSource, ProxyCall, SendOutcome,
    WalletSession,
};
use crate::config::{UnwrapConfig, CONVERT_METHOD};
use crate::error::WithdrawError;
use crate::tracker::{ConfirmationTracker, ProgressCallback};

/// Terminal output of a successful withdrawal.
#[derive(Debug, Clone)]
pub struct WithdrawalResult {
    /// Transaction hash, or "unknown" when the bridge omitted it
    pub transaction_hash: String,
    pub confirmed: bool,
    /// Raw send outcome, for callers that want the full detail
    pub outcome: SendOutcome,
}

/// Composes the bridge client, wallet session, and confirmation tracker
/// into one withdrawal flow.
pub struct WithdrawalOrchestrator<B, W, S> {
    bridge: B,
    wallet: W,
    tracker: ConfirmationTracker<S>,
    config: UnwrapConfig,
}

impl<B, W, S> WithdrawalOrchestrator<B, W, S>
where
    B: BridgeClient,
    W: WalletSession,
    S: OperationStatusSource,
{
    pub fn new(bridge: B, wallet: W, tracker: ConfirmationTracker<S>, config: UnwrapConfig) -> Self {
        Self {
            bridge,
            wallet,
            tracker,
            config,
        }
    }

    /// Submit `amount` of WTAC for conversion and wait for `target`
    /// confirmations. Submission happens exactly once per call.
    pub async fn withdraw(
        &self,
        amount: FixedPointAmount,
        target: u32,
        progress: Option<ProgressCallback>,
    ) -> Result<WithdrawalResult, WithdrawError> {
        info!(amount = %amount, target, "Starting WTAC to TAC withdrawal");

        let payload = ProxyCall {
            evm_target_address: self.config.convert_proxy.clone(),
            method_name: CONVERT_METHOD.to_string(),
            encoded_parameters: amount.raw().abi_encode(),
        };

        let sender = self
            .wallet
            .sender()
            .await
            .map_err(|err| WithdrawError::Submission(err.to_string()))?;

        let assets = [AssetBridgingData {
            asset_type: AssetType::Ft,
            address: self.config.wtac_jetton.clone(),
            raw_amount: amount.raw(),
        }];

        info!("Sending cross-chain transaction");
        let outcome = self
            .bridge
            .send_cross_chain_transaction(&payload, &sender, &assets)
            .await
            .map_err(|err| WithdrawError::Submission(err.to_string()))?;

        if !outcome.send_transaction_result.success {
            let detail = outcome
                .send_transaction_result
                .error
                .clone()
                .unwrap_or_else(|| {
                    "Unknown error. Transaction might not have been sent.".to_string()
                });
            warn!(error = %detail, "Bridge rejected submission");
            return Err(WithdrawError::Submission(detail));
        }

        info!("Transaction sent successfully, waiting for confirmations");
        let tracked = self
            .tracker
            .track(&outcome.transaction_linker, target, progress.as_ref())
            .await;

        if !tracked.is_confirmed() {
            return Err(WithdrawError::Confirmation);
        }

        Ok(WithdrawalResult {
            transaction_hash: outcome
                .transaction_hash
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            confirmed: true,
            outcome,
        })
    }

    /// The underlying tracker, exposed for inspection.
    pub fn tracker(&self) -> &ConfirmationTracker<S> {
        &self.tracker
    }

    /// Withdraw with the configured default confirmation target.
    pub async fn withdraw_default(
        &self,
        amount: FixedPointAmount,
        progress: Option<ProgressCallback>,
    ) -> Result<WithdrawalResult, WithdrawError> {
        self.withdraw(amount, self.config.required_confirmations, progress)
            .await
    }
}
