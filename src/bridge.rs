//! Collaborator traits and wire types
//!
//! The unwrap core does not talk to chains directly. The host supplies
//! implementations of these traits, which mirror the cross-chain SDK
//! surface the core depends on: one send call, one status read, one sender
//! factory, and two balance reads. Tests mock them.

use alloy::primitives::U256;
use async_trait::async_trait;

use crate::error::TransportError;

/// Opaque handle linking a submitted cross-chain send to its tracked
/// operation. The core never inspects its contents; it is passed back to
/// the status source verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionLinker(pub String);

/// Opaque signing capability bound to a connected wallet session.
#[derive(Debug, Clone)]
pub struct Sender {
    pub wallet_address: String,
}

/// Kind of asset attached to a cross-chain send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetType {
    /// Fungible token (jetton)
    Ft,
    /// Non-fungible token
    Nft,
}

/// One asset attached to a cross-chain send.
#[derive(Debug, Clone)]
pub struct AssetBridgingData {
    pub asset_type: AssetType,
    /// Jetton master address on the TON side
    pub address: String,
    /// Amount in smallest units
    pub raw_amount: U256,
}

/// Call payload addressed to an EVM proxy contract on the destination
/// chain.
#[derive(Debug, Clone)]
pub struct ProxyCall {
    pub evm_target_address: String,
    pub method_name: String,
    /// ABI-encoded parameters
    pub encoded_parameters: Vec<u8>,
}

/// Immediate acceptance/rejection of a send, as reported by the bridge.
#[derive(Debug, Clone)]
pub struct SendTransactionResult {
    pub success: bool,
    pub error: Option<String>,
}

/// Everything the bridge returns from a send call.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub transaction_linker: TransactionLinker,
    pub send_transaction_result: SendTransactionResult,
    pub transaction_hash: Option<String>,
}

/// Simplified status of a tracked cross-chain operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Successful,
    Failed,
    Pending,
}

/// Submits cross-chain transactions.
#[async_trait]
pub trait BridgeClient: Send + Sync {
    async fn send_cross_chain_transaction(
        &self,
        payload: &ProxyCall,
        sender: &Sender,
        assets: &[AssetBridgingData],
    ) -> Result<SendOutcome, TransportError>;
}

/// Produces a sender bound to the connected wallet.
#[async_trait]
pub trait WalletSession: Send + Sync {
    async fn sender(&self) -> Result<Sender, TransportError>;
}

/// Reads smallest-unit token balances.
#[async_trait]
pub trait BalanceReader: Send + Sync {
    async fn token_balance(
        &self,
        owner_address: &str,
        token_address: &str,
    ) -> Result<U256, TransportError>;
}

/// Reports the status of a tracked operation. May fail with a transport
/// error, which the tracker retries up to its consecutive-failure budget.
#[async_trait]
pub trait OperationStatusSource: Send + Sync {
    async fn get_status(
        &self,
        linker: &TransactionLinker,
    ) -> Result<OperationStatus, TransportError>;
}
