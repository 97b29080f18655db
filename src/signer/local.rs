//! Local ECDSA private key signer

use super::{TransactionSigner, TxRequest};
use crate::constants::{RECEIPT_POLL_ATTEMPTS, RECEIPT_POLL_INTERVAL_SECS};
use alloy::network::{Ethereum, EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use eyre::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

/// Parse a hex-encoded ECDSA (secp256k1) private key, with or without 0x prefix
pub fn parse_private_key(private_key: impl AsRef<str>) -> Result<PrivateKeySigner> {
    let key = private_key.as_ref().trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    key.parse().context("Failed to parse private key")
}

/// Signer holding an ECDSA key, sending through the relay
pub struct LocalSigner {
    /// Provider with wallet filler - handles nonce, gas, chain_id, and signing
    provider: Arc<dyn Provider<Ethereum>>,
    address: Address,
}

impl LocalSigner {
    /// Create a new LocalSigner from a private key hex string
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let signer = LocalSigner::from_private_key(
    ///     "0x2e1d968b041d84dd120a5860cee60cd83f9374ef527ca86996317ada3d0d03e7",
    ///     "http://localhost:7546",
    /// )?;
    /// ```
    pub fn from_private_key(private_key: impl AsRef<str>, rpc_url: impl AsRef<str>) -> Result<Self> {
        Self::from_signer(parse_private_key(private_key)?, rpc_url)
    }

    /// Create a LocalSigner from an already parsed key
    pub fn from_signer(signer: PrivateKeySigner, rpc_url: impl AsRef<str>) -> Result<Self> {
        let address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let url: Url = rpc_url.as_ref().parse().context("Invalid relay URL")?;

        // Build provider with wallet filler - this handles nonce, gas, and signing
        let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);

        Ok(Self {
            provider: Arc::new(provider),
            address,
        })
    }
}

impl TransactionSigner for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_and_send(&self, tx: TxRequest) -> Result<TxHash> {
        let mut tx_request = alloy::rpc::types::TransactionRequest::default()
            .with_from(self.address)
            .with_to(tx.to)
            .with_value(tx.value)
            .with_input(tx.data);

        if let Some(gas_limit) = tx.gas_limit {
            tx_request = tx_request.with_gas_limit(gas_limit);
        }

        let pending_tx = self
            .provider
            .send_transaction(tx_request)
            .await
            .context("Relay rejected transaction")?;

        tracing::debug!("Sent transaction {}", pending_tx.tx_hash());
        Ok(*pending_tx.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TransactionReceipt> {
        let poll_interval = Duration::from_secs(RECEIPT_POLL_INTERVAL_SECS);

        for _ in 0..RECEIPT_POLL_ATTEMPTS {
            let receipt: Option<TransactionReceipt> = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .context("Failed to get transaction receipt")?;

            if let Some(receipt) = receipt {
                return Ok(receipt);
            }

            tokio::time::sleep(poll_interval).await;
        }

        eyre::bail!("Transaction receipt not found after timeout: {}", tx_hash)
    }

    async fn get_balance(&self) -> Result<U256> {
        self.provider
            .get_balance(self.address)
            .await
            .context("Failed to get balance")
    }
}
