//! Error types for the allowance harness
//!
//! Uses `eyre` for ergonomic error handling with context. The ledger and the
//! provisioning layer expose typed errors that travel inside `eyre::Report`
//! and can be recovered with `downcast_ref`.

pub use eyre::{eyre, Context, Report, Result};

use crate::types::{AccountId, TokenId};
use alloy::primitives::{Address, FixedBytes, U256};
use thiserror::Error;

/// Failures of a single ledger operation. None of them leave partial state behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient allowance for {spender}: have {allowance}, need {needed}")]
    InsufficientAllowance {
        spender: Address,
        allowance: U256,
        needed: U256,
    },
    #[error("insufficient balance for {account}: have {balance}, need {needed}")]
    InsufficientBalance {
        account: Address,
        balance: U256,
        needed: U256,
    },
    #[error("{caller} cannot act on behalf of {owner}")]
    UnauthorizedCaller { caller: Address, owner: Address },
    #[error("invalid spender: {0}")]
    InvalidSpender(Address),
    #[error("invalid receiver: {0}")]
    InvalidReceiver(Address),
    #[error("amount {amount} exceeds the token ceiling {ceiling}")]
    AmountOutOfRange { amount: U256, ceiling: U256 },
    #[error("unsupported call selector {0}")]
    UnsupportedCall(FixedBytes<4>),
    #[error("malformed call data: {0}")]
    MalformedCall(String),
}

/// Failures of the account-and-asset provisioning layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    #[error("unknown account {0}")]
    UnknownAccount(AccountId),
    #[error("no account registered for address {0}")]
    UnknownAddress(Address),
    #[error("unknown token {0}")]
    UnknownToken(TokenId),
    #[error("account already exists: {0}")]
    AccountExists(String),
    #[error("transaction is missing the signature of {0}")]
    MissingSignature(AccountId),
    #[error("transaction is missing the signature of key {0}")]
    MissingKeySignature(Address),
    #[error("token {0} has no freeze key")]
    TokenHasNoFreezeKey(TokenId),
    #[error("account {account} is already associated with token {token}")]
    TokenAlreadyAssociated { account: AccountId, token: TokenId },
    #[error("account {account} is not associated with token {token}")]
    TokenNotAssociated { account: AccountId, token: TokenId },
    #[error("account {account} is frozen for token {token}")]
    AccountFrozen { account: AccountId, token: TokenId },
    #[error("key {0} is not held by the submitting account")]
    ForeignKey(Address),
    #[error("token service returned response code {0}")]
    ServiceFailure(i64),
}
