//! Provisioning on a live network through the JSON-RPC relay
//!
//! Accounts are auto-created by sending HBAR to a fresh EVM address, tokens
//! are created through the HTS system contract, and each account associates
//! itself by calling `associate()` at the token's address. The relay does not
//! report entity ids or system contract return values, so those are read back
//! from the mirror node once it has caught up.

use crate::config::{NetworkConfig, NetworkSelection};
use crate::constants::{
    hbar_to_weibars, ACCOUNT_FUNDING_HBAR, ASSOCIATE_GAS_LIMIT, AUTO_RENEW_PERIOD_SECS,
    MIRROR_POLL_ATTEMPTS, MIRROR_POLL_INTERVAL_SECS, TOKEN_CREATE_FEE_HBAR, TOKEN_CREATE_GAS_LIMIT,
};
use crate::contracts::IHederaTokenService::{
    createFungibleTokenCall, Expiry, HederaToken, KeyValue, TokenKey,
};
use crate::contracts::{
    IHRC719, ADMIN_KEY_BIT, FREEZE_KEY_BIT, HTS_SUCCESS, HTS_SYSTEM_CONTRACT, SUPPLY_KEY_BIT,
    WIPE_KEY_BIT,
};
use crate::error::ProvisionError;
use crate::mirror::{MirrorNodeClient, NetworkNode, TokenInfo};
use crate::provision::AssetProvisioner;
use crate::signer::{TransactionSigner, TxRequest};
use crate::types::{AccountId, TokenId, TokenSpec};
use alloy::network::Ethereum;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::sol_types::SolCall;
use alloy::transports::http::reqwest::Url;
use eyre::{ensure, Context, Result};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

/// Provisioner acting on the network behind the configured relay
///
/// The operator pays for everything and must be the treasury of the tokens it
/// creates. Accounts sign their own associations, so their signers have to be
/// handed over with [`with_signer`](Self::with_signer).
pub struct RelayProvisioner<S: TransactionSigner> {
    operator: S,
    signers: Vec<S>,
    config: NetworkConfig,
    mirror: MirrorNodeClient,
    provider: RootProvider<Ethereum>,
}

impl<S: TransactionSigner> RelayProvisioner<S> {
    pub fn new(operator: S, config: NetworkConfig) -> Result<Self> {
        let url: Url = config.rpc_url.parse().context("Invalid relay URL")?;
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .network::<Ethereum>()
            .connect_http(url);
        let mirror = MirrorNodeClient::new(&config.mirror_url)?;

        Ok(Self {
            operator,
            signers: Vec::new(),
            config,
            mirror,
            provider,
        })
    }

    /// Hold another account's signer so it can sign its own associations
    pub fn with_signer(mut self, signer: S) -> Self {
        self.signers.push(signer);
        self
    }

    pub fn operator(&self) -> &S {
        &self.operator
    }

    pub fn mirror(&self) -> &MirrorNodeClient {
        &self.mirror
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    fn signer_for(&self, address: Address) -> Option<&S> {
        std::iter::once(&self.operator)
            .chain(&self.signers)
            .find(|signer| signer.address() == address)
    }

    /// Check that the relay and the mirror node serve the selected network
    pub async fn verify_network(&self) -> Result<()> {
        let chain_id = self
            .provider
            .get_chain_id()
            .await
            .context("Failed to read chain id from relay")?;
        ensure!(
            chain_id == self.config.chain_id,
            "Relay {} serves chain {}, expected {}",
            self.config.rpc_url,
            chain_id,
            self.config.chain_id
        );

        match &self.config.network {
            NetworkSelection::Named(named) => {
                tracing::info!("Using {} through {}", named.name(), self.config.rpc_url);
            }
            NetworkSelection::Custom(nodes) => {
                let known = self.mirror.get_nodes().await?;
                check_nodes(nodes, &known)?;
                tracing::info!(
                    "Using {} custom node(s) through {}",
                    nodes.len(),
                    self.config.rpc_url
                );
            }
        }
        Ok(())
    }

    /// EVM address that signs for `account`
    pub async fn account_address(&self, account: AccountId) -> Result<Address> {
        let info = self
            .mirror
            .find_account(&account.to_string())
            .await?
            .ok_or(ProvisionError::UnknownAccount(account))?;
        Ok(info
            .evm_address
            .unwrap_or_else(|| account.to_solidity_address()))
    }

    async fn submit(&self, signer: &S, tx: TxRequest, what: &str) -> Result<TxHash> {
        let tx_hash = signer
            .sign_and_send(tx)
            .await
            .with_context(|| format!("Failed to send {}", what))?;
        let receipt = signer.wait_for_receipt(tx_hash).await?;
        ensure!(receipt.status(), "{} reverted in {}", what, tx_hash);
        Ok(tx_hash)
    }

    /// Poll the mirror node until `lookup` finds what it is after
    async fn poll_mirror<T, F, Fut>(&self, what: &str, lookup: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let interval = Duration::from_secs(MIRROR_POLL_INTERVAL_SECS);
        for _ in 0..MIRROR_POLL_ATTEMPTS {
            if let Some(found) = lookup().await? {
                return Ok(found);
            }
            tokio::time::sleep(interval).await;
        }
        eyre::bail!("Mirror node did not report the {} in time", what)
    }

    /// Return data of a successful system contract call
    async fn call_output(&self, tx_hash: TxHash) -> Result<Bytes> {
        let result = self
            .poll_mirror("contract result", || {
                self.mirror.find_contract_result(tx_hash)
            })
            .await?;
        ensure!(
            result.is_success(),
            "Transaction {} failed: {} {}",
            tx_hash,
            result.result,
            result.error_message.unwrap_or_default()
        );
        Ok(result.call_result.unwrap_or_default())
    }
}

impl<S: TransactionSigner> AssetProvisioner for RelayProvisioner<S> {
    async fn create_account(&self, key: Address) -> Result<AccountId> {
        let lookup = format!("{:#x}", key);
        let lookup = lookup.as_str();
        if self.mirror.find_account(lookup).await?.is_some() {
            return Err(ProvisionError::AccountExists(key.to_string()).into());
        }

        let tx = TxRequest::new(key, Bytes::new())
            .with_value(hbar_to_weibars(ACCOUNT_FUNDING_HBAR))
            .with_gas_limit(self.config.gas_limit);
        self.submit(&self.operator, tx, "account funding").await?;

        let info = self
            .poll_mirror("new account", || self.mirror.find_account(lookup))
            .await?;
        tracing::info!("Created account {} for {}", info.account, key);
        Ok(info.account)
    }

    async fn create_fungible_token(&self, spec: &TokenSpec, signers: &[Address]) -> Result<TokenId> {
        spec.validate().context("Invalid token spec")?;

        let operator = self.operator.address();
        let treasury = self.account_address(spec.treasury).await?;
        if !signers.contains(&treasury) {
            return Err(ProvisionError::MissingSignature(spec.treasury).into());
        }
        if treasury != operator {
            return Err(ProvisionError::ForeignKey(treasury).into());
        }
        if let Some(admin_key) = spec.admin_key {
            if !signers.contains(&admin_key) {
                return Err(ProvisionError::MissingKeySignature(admin_key).into());
            }
        }

        let call = createFungibleTokenCall {
            token: hedera_token(spec, operator)?,
            initialTotalSupply: i64::try_from(spec.initial_supply)
                .context("Initial supply does not fit the token service")?,
            decimals: i32::from(spec.decimals),
        };
        let tx = TxRequest::new(HTS_SYSTEM_CONTRACT, call.abi_encode())
            .with_value(hbar_to_weibars(TOKEN_CREATE_FEE_HBAR))
            .with_gas_limit(Some(self.config.gas_limit.unwrap_or(TOKEN_CREATE_GAS_LIMIT)));
        let tx_hash = self.submit(&self.operator, tx, "token creation").await?;

        let output = self.call_output(tx_hash).await?;
        let created = createFungibleTokenCall::abi_decode_returns(&output)
            .context("Failed to decode token creation result")?;
        if created.responseCode != HTS_SUCCESS {
            return Err(ProvisionError::ServiceFailure(created.responseCode).into());
        }
        let token_id = TokenId::from_solidity_address(created.tokenAddress);

        let info = self
            .poll_mirror("new token", || self.mirror.find_token(token_id))
            .await?;
        verify_token(spec, &info)?;

        tracing::info!("Created HTS with tokenId: {}", token_id);
        Ok(token_id)
    }

    async fn associate(
        &self,
        account: AccountId,
        tokens: &[TokenId],
        signers: &[Address],
    ) -> Result<()> {
        let address = self.account_address(account).await?;
        if !signers.contains(&address) {
            return Err(ProvisionError::MissingSignature(account).into());
        }
        let signer = self
            .signer_for(address)
            .ok_or(ProvisionError::MissingSignature(account))?;

        // Refuse up front rather than after some tokens went through
        let holder = account.to_string();
        for token in tokens {
            if self.mirror.find_token(*token).await?.is_none() {
                return Err(ProvisionError::UnknownToken(*token).into());
            }
            if self.mirror.is_associated(&holder, *token).await? {
                return Err(ProvisionError::TokenAlreadyAssociated {
                    account,
                    token: *token,
                }
                .into());
            }
        }

        for token in tokens {
            let tx = TxRequest::new(token.to_solidity_address(), IHRC719::associateCall {}.abi_encode())
                .with_gas_limit(Some(self.config.gas_limit.unwrap_or(ASSOCIATE_GAS_LIMIT)));
            let tx_hash = self.submit(signer, tx, "token association").await?;

            let output = self.call_output(tx_hash).await?;
            let code = IHRC719::associateCall::abi_decode_returns(&output)
                .context("Failed to decode association result")?;
            if code != U256::from(HTS_SUCCESS as u64) {
                let code = i64::try_from(code).unwrap_or(i64::MAX);
                return Err(ProvisionError::ServiceFailure(code).into());
            }
            tracing::info!("Associated account {} with token {}", account, token);
        }
        Ok(())
    }
}

/// Token keys as the token service expects them
///
/// Only keys of the submitting account can be expressed, so every key set on
/// the spec has to be `operator`. They collapse into one entry with the type
/// bits merged.
fn token_keys(spec: &TokenSpec, operator: Address) -> Result<Vec<TokenKey>, ProvisionError> {
    let mut bits = 0u64;
    for (key, bit) in [
        (spec.admin_key, ADMIN_KEY_BIT),
        (spec.freeze_key, FREEZE_KEY_BIT),
        (spec.wipe_key, WIPE_KEY_BIT),
        (spec.supply_key, SUPPLY_KEY_BIT),
    ] {
        match key {
            Some(key) if key == operator => bits |= bit,
            Some(key) => return Err(ProvisionError::ForeignKey(key)),
            None => {}
        }
    }

    if bits == 0 {
        return Ok(Vec::new());
    }
    Ok(vec![TokenKey {
        keyType: U256::from(bits),
        key: KeyValue {
            inheritAccountKey: true,
            contractId: Address::ZERO,
            ed25519: Bytes::new(),
            ECDSA_secp256k1: Bytes::new(),
            delegatableContractId: Address::ZERO,
        },
    }])
}

fn hedera_token(spec: &TokenSpec, operator: Address) -> Result<HederaToken, ProvisionError> {
    let treasury = spec.treasury.to_solidity_address();
    Ok(HederaToken {
        name: spec.name.clone(),
        symbol: spec.symbol.clone(),
        treasury,
        memo: String::new(),
        // Infinite supply type, no maximum
        tokenSupplyType: false,
        maxSupply: 0,
        freezeDefault: spec.freeze_default,
        tokenKeys: token_keys(spec, operator)?,
        expiry: Expiry {
            second: 0,
            autoRenewAccount: treasury,
            autoRenewPeriod: AUTO_RENEW_PERIOD_SECS,
        },
    })
}

/// The mirror node's view of a new token must match what was asked for
fn verify_token(spec: &TokenSpec, info: &TokenInfo) -> Result<()> {
    ensure!(
        info.decimals_u8()? == spec.decimals,
        "Token {} has {} decimals, expected {}",
        info.token_id,
        info.decimals,
        spec.decimals
    );
    ensure!(
        info.total_supply_units()? == spec.initial_supply_units(),
        "Token {} has supply {}, expected {}",
        info.token_id,
        info.total_supply,
        spec.initial_supply
    );
    Ok(())
}

/// Every configured node must belong to the network the mirror node indexes
fn check_nodes(configured: &BTreeMap<String, AccountId>, known: &[NetworkNode]) -> Result<()> {
    for (endpoint, account) in configured {
        ensure!(
            known.iter().any(|node| node.node_account_id == *account),
            "Node {} at {} is not part of the network indexed by the mirror node",
            account,
            endpoint
        );
    }
    Ok(())
}
