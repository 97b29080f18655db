//! Transaction signer abstraction
//!
//! Signing and submission sit behind a trait so the relay client does not care
//! where the key lives. The harness ships a local ECDSA key signer.

mod local;

pub use local::{parse_private_key, LocalSigner};

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionReceipt;
use eyre::Result;

/// Contract call (or plain value transfer) to be signed and submitted
#[derive(Debug, Clone)]
pub struct TxRequest {
    /// Token (or other contract) address
    pub to: Address,
    /// Value in weibars (1 tinybar = 10^10 weibars)
    pub value: U256,
    /// ABI-encoded call data
    pub data: Bytes,
    /// Gas limit; estimated by the relay when unset
    pub gas_limit: Option<u64>,
}

impl TxRequest {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            value: U256::ZERO,
            data: data.into(),
            gas_limit: None,
        }
    }

    /// Attach native value, e.g. a token creation fee
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Skip gas estimation and use a fixed limit
    pub fn with_gas_limit(mut self, gas_limit: Option<u64>) -> Self {
        self.gas_limit = gas_limit;
        self
    }
}

/// Trait for signing and sending transactions through the relay
pub trait TransactionSigner: Send + Sync {
    /// Returns the signer's EVM address
    fn address(&self) -> Address;

    /// Signs and sends a transaction, returning the transaction hash
    fn sign_and_send(
        &self,
        tx: TxRequest,
    ) -> impl std::future::Future<Output = Result<TxHash>> + Send;

    /// Waits for a transaction to be confirmed and returns the receipt
    fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl std::future::Future<Output = Result<TransactionReceipt>> + Send;

    /// Gets the native balance of the signer (weibars)
    fn get_balance(&self) -> impl std::future::Future<Output = Result<U256>> + Send;
}
