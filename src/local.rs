//! In-process network: accounts, fungible tokens and association
//!
//! Stands in for the provisioning service and the JSON-RPC relay. Token calls
//! arrive ABI-encoded, the same bytes [`TokenClient`](crate::client::TokenClient)
//! sends to a relay, and are routed to the token's [`TokenLedger`]. All
//! submissions go through one lock, so every operation observes the complete
//! effect of the one before it.

use crate::constants::{FIRST_USER_ENTITY, HTS_MAX_AMOUNT};
use crate::contracts::IERC20;
use crate::error::ProvisionError;
use crate::ledger::{LedgerEvent, TokenLedger};
use crate::provision::AssetProvisioner;
use crate::token::Erc20;
use crate::types::{AccountId, TokenId, TokenSpec};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{SolCall, SolInterface};
use eyre::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

struct TokenState {
    ledger: TokenLedger,
    freeze_key: Option<Address>,
    associated: HashSet<AccountId>,
    frozen: HashSet<AccountId>,
    freeze_default: bool,
}

struct NetworkState {
    next_entity: u64,
    accounts: HashMap<AccountId, Address>,
    by_address: HashMap<Address, AccountId>,
    tokens: HashMap<TokenId, TokenState>,
}

impl NetworkState {
    fn allocate(&mut self) -> AccountId {
        // Skip numbers taken by explicitly registered accounts
        while self.accounts.contains_key(&AccountId::new(self.next_entity))
            || self.tokens.contains_key(&TokenId::new(self.next_entity))
        {
            self.next_entity += 1;
        }
        let id = AccountId::new(self.next_entity);
        self.next_entity += 1;
        id
    }

    fn insert_account(&mut self, id: AccountId, address: Address) -> Result<(), ProvisionError> {
        if self.accounts.contains_key(&id) || self.tokens.contains_key(&id) {
            return Err(ProvisionError::AccountExists(id.to_string()));
        }
        if self.by_address.contains_key(&address) {
            return Err(ProvisionError::AccountExists(address.to_string()));
        }
        self.accounts.insert(id, address);
        self.by_address.insert(address, id);
        Ok(())
    }

    fn address_of(&self, account: AccountId) -> Result<Address, ProvisionError> {
        self.accounts
            .get(&account)
            .copied()
            .ok_or(ProvisionError::UnknownAccount(account))
    }

    fn account_of(&self, address: Address) -> Result<AccountId, ProvisionError> {
        self.by_address
            .get(&address)
            .copied()
            .ok_or(ProvisionError::UnknownAddress(address))
    }

    fn require_signature(
        &self,
        account: AccountId,
        signers: &[Address],
    ) -> Result<Address, ProvisionError> {
        let address = self.address_of(account)?;
        if !signers.contains(&address) {
            return Err(ProvisionError::MissingSignature(account));
        }
        Ok(address)
    }
}

/// In-process network of accounts and fungible tokens
#[derive(Clone)]
pub struct LocalNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl Default for LocalNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalNetwork {
    /// Create an empty network numbering entities from 0.0.1001
    pub fn new() -> Self {
        Self::with_first_entity(FIRST_USER_ENTITY)
    }

    /// Create an empty network numbering entities from `0.0.{num}`
    pub fn with_first_entity(num: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(NetworkState {
                next_entity: num,
                accounts: HashMap::new(),
                by_address: HashMap::new(),
                tokens: HashMap::new(),
            })),
        }
    }

    /// Register an account under a fixed id (e.g., a pre-funded node account)
    pub async fn register_account(&self, id: AccountId, address: Address) -> Result<()> {
        let mut state = self.state.lock().await;
        state.insert_account(id, address)?;
        Ok(())
    }

    /// Address that signs for an account
    pub async fn account_address(&self, account: AccountId) -> Result<Address> {
        let state = self.state.lock().await;
        Ok(state.address_of(account)?)
    }

    /// Account registered for an address
    pub async fn account_id(&self, address: Address) -> Result<AccountId> {
        let state = self.state.lock().await;
        Ok(state.account_of(address)?)
    }

    /// EVM address of a token
    pub fn token_address(&self, token: TokenId) -> Address {
        token.to_solidity_address()
    }

    /// Whether `account` may hold `token`
    pub async fn is_associated(&self, account: AccountId, token: TokenId) -> Result<bool> {
        let state = self.state.lock().await;
        let token_state = state
            .tokens
            .get(&token)
            .ok_or(ProvisionError::UnknownToken(token))?;
        Ok(token_state.associated.contains(&account))
    }

    /// Lift the freeze on an account; needs the token's freeze key
    pub async fn unfreeze(
        &self,
        token: TokenId,
        account: AccountId,
        signers: &[Address],
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let token_state = state
            .tokens
            .get_mut(&token)
            .ok_or(ProvisionError::UnknownToken(token))?;

        let freeze_key = token_state
            .freeze_key
            .ok_or(ProvisionError::TokenHasNoFreezeKey(token))?;
        if !signers.contains(&freeze_key) {
            return Err(ProvisionError::MissingKeySignature(freeze_key).into());
        }

        token_state.frozen.remove(&account);
        Ok(())
    }

    /// Events emitted by a token's ledger so far
    pub async fn events(&self, token: TokenId) -> Result<Vec<LedgerEvent>> {
        let state = self.state.lock().await;
        let token_state = state
            .tokens
            .get(&token)
            .ok_or(ProvisionError::UnknownToken(token))?;
        Ok(token_state.ledger.events().to_vec())
    }

    /// Submit ABI-encoded ERC-20 call data to a token, signed by `signer`
    ///
    /// Views may come from any address, as with `eth_call`. State changes
    /// need a registered signer. Transfers to accounts that are not associated
    /// with the token, or that are frozen, are refused before the ledger sees
    /// them. Ledger failures come back as
    /// [`LedgerError`](crate::error::LedgerError).
    pub async fn submit(&self, token: TokenId, signer: Address, data: &[u8]) -> Result<Bytes> {
        let mut state = self.state.lock().await;
        let call = IERC20::IERC20Calls::abi_decode(data).ok();

        let moves = match &call {
            Some(IERC20::IERC20Calls::transfer(c)) => Some((signer, c.to)),
            Some(IERC20::IERC20Calls::transferFrom(c)) => Some((c.from, c.to)),
            _ => None,
        };
        let is_view = matches!(
            call,
            Some(
                IERC20::IERC20Calls::name(_)
                    | IERC20::IERC20Calls::symbol(_)
                    | IERC20::IERC20Calls::decimals(_)
                    | IERC20::IERC20Calls::totalSupply(_)
                    | IERC20::IERC20Calls::balanceOf(_)
                    | IERC20::IERC20Calls::allowance(_)
            )
        );
        if !is_view {
            let signer_account = state.account_of(signer)?;
            tracing::debug!("Submitting call to {} from {}", token, signer_account);
        }

        // The zero address is never an account; the ledger rejects it as a receiver
        if let Some((from, to)) = moves.filter(|(_, to)| !to.is_zero()) {
            let to_account = state.account_of(to)?;
            let from_account = state.by_address.get(&from).copied();
            let token_state = state
                .tokens
                .get(&token)
                .ok_or(ProvisionError::UnknownToken(token))?;

            if !token_state.associated.contains(&to_account) {
                return Err(ProvisionError::TokenNotAssociated {
                    account: to_account,
                    token,
                }
                .into());
            }
            for account in from_account.into_iter().chain([to_account]) {
                if token_state.frozen.contains(&account) {
                    return Err(ProvisionError::AccountFrozen { account, token }.into());
                }
            }
        }

        let token_state = state
            .tokens
            .get_mut(&token)
            .ok_or(ProvisionError::UnknownToken(token))?;
        Ok(token_state.ledger.execute(signer, data)?)
    }

    /// Handle for making ERC-20 calls to `token` as `caller`
    pub fn token(&self, token: TokenId, caller: Address) -> LocalToken {
        LocalToken {
            network: self.clone(),
            token,
            caller,
        }
    }
}

impl AssetProvisioner for LocalNetwork {
    async fn create_account(&self, key: Address) -> Result<AccountId> {
        let mut state = self.state.lock().await;
        if state.by_address.contains_key(&key) {
            return Err(ProvisionError::AccountExists(key.to_string()).into());
        }
        let id = state.allocate();
        state.insert_account(id, key)?;
        tracing::info!("Created account {} for {}", id, key);
        Ok(id)
    }

    async fn create_fungible_token(&self, spec: &TokenSpec, signers: &[Address]) -> Result<TokenId> {
        spec.validate().context("Invalid token spec")?;

        let mut state = self.state.lock().await;
        let treasury = state.require_signature(spec.treasury, signers)?;
        if let Some(admin_key) = spec.admin_key {
            if !signers.contains(&admin_key) {
                return Err(ProvisionError::MissingKeySignature(admin_key).into());
            }
        }

        let ledger = TokenLedger::new(
            spec.name.clone(),
            spec.symbol.clone(),
            spec.decimals,
            treasury,
            spec.initial_supply_units(),
        )
        .with_amount_ceiling(U256::from(HTS_MAX_AMOUNT));

        let token_id = state.allocate();
        state.tokens.insert(
            token_id,
            TokenState {
                ledger,
                freeze_key: spec.freeze_key,
                associated: HashSet::from([spec.treasury]),
                frozen: HashSet::new(),
                freeze_default: spec.freeze_default,
            },
        );

        tracing::info!("Created HTS with tokenId: {}", token_id);
        Ok(token_id)
    }

    async fn associate(
        &self,
        account: AccountId,
        tokens: &[TokenId],
        signers: &[Address],
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.require_signature(account, signers)?;

        // Validate every token first so a failure associates nothing
        for token in tokens {
            let token_state = state
                .tokens
                .get(token)
                .ok_or(ProvisionError::UnknownToken(*token))?;
            if token_state.associated.contains(&account) {
                return Err(ProvisionError::TokenAlreadyAssociated {
                    account,
                    token: *token,
                }
                .into());
            }
        }

        for token in tokens {
            if let Some(token_state) = state.tokens.get_mut(token) {
                token_state.associated.insert(account);
                if token_state.freeze_default {
                    token_state.frozen.insert(account);
                }
            }
            tracing::info!("Associated account {} with token {}", account, token);
        }
        Ok(())
    }
}

/// ERC-20 handle on a [`LocalNetwork`] token, bound to one caller
#[derive(Clone)]
pub struct LocalToken {
    network: LocalNetwork,
    token: TokenId,
    caller: Address,
}

impl LocalToken {
    /// Same token, different caller
    pub fn connect(&self, caller: Address) -> Self {
        Self {
            network: self.network.clone(),
            token: self.token,
            caller,
        }
    }

    pub fn token_id(&self) -> TokenId {
        self.token
    }

    async fn call<C: SolCall + Send>(&self, call: C) -> Result<C::Return> {
        let output = self
            .network
            .submit(self.token, self.caller, &call.abi_encode())
            .await?;
        C::abi_decode_returns(&output)
            .with_context(|| format!("Failed to decode {} return data", C::SIGNATURE))
    }

    pub async fn name(&self) -> Result<String> {
        self.call(IERC20::nameCall {}).await
    }

    pub async fn symbol(&self) -> Result<String> {
        self.call(IERC20::symbolCall {}).await
    }

    pub async fn decimals(&self) -> Result<u8> {
        self.call(IERC20::decimalsCall {}).await
    }

    pub async fn total_supply(&self) -> Result<U256> {
        self.call(IERC20::totalSupplyCall {}).await
    }

    /// Transfer from the caller's own balance
    pub async fn transfer(&self, to: Address, amount: U256) -> Result<bool> {
        self.call(IERC20::transferCall { to, amount }).await
    }
}

impl Erc20 for LocalToken {
    fn caller(&self) -> Address {
        self.caller
    }

    fn token_address(&self) -> Address {
        self.token.to_solidity_address()
    }

    async fn balance_of(&self, account: Address) -> Result<U256> {
        self.call(IERC20::balanceOfCall { account }).await
    }

    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        self.call(IERC20::allowanceCall { owner, spender }).await
    }

    async fn approve(&self, spender: Address, amount: U256) -> Result<bool> {
        self.call(IERC20::approveCall { spender, amount }).await
    }

    async fn transfer_from(&self, from: Address, to: Address, amount: U256) -> Result<bool> {
        self.call(IERC20::transferFromCall { from, to, amount }).await
    }
}
