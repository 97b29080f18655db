//! TokenClient - ERC-20 calls against a token behind the JSON-RPC relay

use crate::config::NetworkConfig;
use crate::contracts::IERC20;
use crate::signer::{TransactionSigner, TxRequest};
use crate::token::Erc20;
use alloy::network::{Ethereum, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::TransactionReceipt;
use alloy::sol_types::SolCall;
use alloy::transports::http::reqwest::Url;
use eyre::{Context, Result};
use std::sync::Arc;

/// Type alias for read-only provider
type ReadProvider = Arc<RootProvider<Ethereum>>;

/// Client for one token, acting as the signer's account
pub struct TokenClient<S: TransactionSigner> {
    signer: S,
    config: NetworkConfig,
    provider: ReadProvider,
    token: Address,
}

impl<S: TransactionSigner> TokenClient<S> {
    /// Create a new TokenClient for the token at `token`
    pub fn new(signer: S, config: NetworkConfig, token: Address) -> Result<Self> {
        let url: Url = config.rpc_url.parse().context("Invalid relay URL")?;
        // Read-only provider without fillers (we only do eth_call operations)
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .network::<Ethereum>()
            .connect_http(url);

        Ok(Self {
            signer,
            config,
            provider: Arc::new(provider),
            token,
        })
    }

    /// Same token and relay, different signer
    pub fn connect<T: TransactionSigner>(&self, signer: T) -> TokenClient<T> {
        TokenClient {
            signer,
            config: self.config.clone(),
            provider: Arc::clone(&self.provider),
            token: self.token,
        }
    }

    /// Get the signer's address
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Get the token address
    pub fn token(&self) -> Address {
        self.token
    }

    /// Get the network configuration
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// eth_call a view function on the token
    async fn read<C: SolCall + Send>(&self, call: C) -> Result<C::Return> {
        let result: Bytes = self
            .provider
            .call(
                alloy::rpc::types::TransactionRequest::default()
                    .with_from(self.address())
                    .with_to(self.token)
                    .with_input(call.abi_encode()),
            )
            .await
            .with_context(|| format!("Failed to call {}", C::SIGNATURE))?;

        C::abi_decode_returns(&result).with_context(|| format!("Failed to decode {}", C::SIGNATURE))
    }

    /// Sign and submit a state-changing call on the token
    async fn send<C: SolCall + Send>(&self, call: C) -> Result<TxHash> {
        let tx = TxRequest::new(self.token, call.abi_encode()).with_gas_limit(self.config.gas_limit);
        self.signer
            .sign_and_send(tx)
            .await
            .with_context(|| format!("Failed to send {}", C::SIGNATURE))
    }

    // ========== Views ==========

    pub async fn name(&self) -> Result<String> {
        self.read(IERC20::nameCall {}).await
    }

    pub async fn symbol(&self) -> Result<String> {
        self.read(IERC20::symbolCall {}).await
    }

    pub async fn decimals(&self) -> Result<u8> {
        self.read(IERC20::decimalsCall {}).await
    }

    pub async fn total_supply(&self) -> Result<U256> {
        self.read(IERC20::totalSupplyCall {}).await
    }

    /// Get token balance of an account
    pub async fn get_balance(&self, account: Address) -> Result<U256> {
        self.read(IERC20::balanceOfCall { account }).await
    }

    /// Get remaining allowance of `spender` over `owner`
    pub async fn get_allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        self.read(IERC20::allowanceCall { owner, spender }).await
    }

    // ========== Transactions ==========

    /// Approve `spender` for `amount`, replacing any previous allowance
    pub async fn send_approve(&self, spender: Address, amount: U256) -> Result<TxHash> {
        self.send(IERC20::approveCall { spender, amount }).await
    }

    /// Transfer from the signer's own balance
    pub async fn send_transfer(&self, to: Address, amount: U256) -> Result<TxHash> {
        self.send(IERC20::transferCall { to, amount }).await
    }

    /// Spend the signer's allowance over `from`
    pub async fn send_transfer_from(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxHash> {
        self.send(IERC20::transferFromCall { from, to, amount })
            .await
    }

    /// Wait for transaction confirmation
    pub async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TransactionReceipt> {
        self.signer.wait_for_receipt(tx_hash).await
    }

    /// Wait for the receipt and report whether the transaction succeeded
    async fn confirm(&self, tx_hash: TxHash) -> Result<bool> {
        let receipt = self.wait_for_receipt(tx_hash).await?;
        if !receipt.status() {
            tracing::warn!("Transaction {} reverted", tx_hash);
        }
        Ok(receipt.status())
    }
}

impl<S: TransactionSigner> Erc20 for TokenClient<S> {
    fn caller(&self) -> Address {
        self.address()
    }

    fn token_address(&self) -> Address {
        self.token
    }

    async fn balance_of(&self, account: Address) -> Result<U256> {
        self.get_balance(account).await
    }

    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        self.get_allowance(owner, spender).await
    }

    async fn approve(&self, spender: Address, amount: U256) -> Result<bool> {
        let tx_hash = self.send_approve(spender, amount).await?;
        self.confirm(tx_hash).await
    }

    async fn transfer_from(&self, from: Address, to: Address, amount: U256) -> Result<bool> {
        let tx_hash = self.send_transfer_from(from, to, amount).await?;
        self.confirm(tx_hash).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::LocalSigner;

    const OWNER_KEY: &str = "0x2e1d968b041d84dd120a5860cee60cd83f9374ef527ca86996317ada3d0d03e7";
    const SPENDER_KEY: &str = "0x45a5a7108a18dd5013cf2d5857a28144beadc9c70b3bdbd914e38df4e804b8d8";

    #[test]
    fn test_connect_keeps_token_and_switches_signer() {
        let config = NetworkConfig::local();
        let token = Address::repeat_byte(0x42);

        let owner = LocalSigner::from_private_key(OWNER_KEY, &config.rpc_url).unwrap();
        let owner_address = owner.address();
        let client = TokenClient::new(owner, config.clone(), token).unwrap();

        let spender = LocalSigner::from_private_key(SPENDER_KEY, &config.rpc_url).unwrap();
        let spender_address = spender.address();
        let spender_client = client.connect(spender);

        assert_eq!(client.caller(), owner_address);
        assert_eq!(spender_client.caller(), spender_address);
        assert_ne!(owner_address, spender_address);
        assert_eq!(spender_client.token_address(), token);
        assert_eq!(spender_client.config().chain_id, 298);
    }

    #[test]
    fn test_new_rejects_bad_relay_url() {
        let config = NetworkConfig::local().with_rpc_url("::not a url::");
        let signer = LocalSigner::from_private_key(OWNER_KEY, "http://localhost:7546").unwrap();
        assert!(TokenClient::new(signer, config, Address::ZERO).is_err());
    }
}
