//! Account-and-asset provisioning abstraction
//!
//! Before an account can hold a fungible token it has to exist on the network
//! and be associated with that token. Transactions carry the addresses of the
//! keys that signed them; each operation lists whose signature it needs.

use crate::types::{AccountId, TokenId, TokenSpec};
use alloy::primitives::Address;
use eyre::Result;

/// Trait for creating accounts and tokens and wiring them together
pub trait AssetProvisioner: Send + Sync {
    /// Create an account whose key resolves to `key`
    fn create_account(
        &self,
        key: Address,
    ) -> impl std::future::Future<Output = Result<AccountId>> + Send;

    /// Create a fungible token, crediting the initial supply to the treasury
    ///
    /// Needs the treasury's signature, and the admin key's if one is set.
    fn create_fungible_token(
        &self,
        spec: &TokenSpec,
        signers: &[Address],
    ) -> impl std::future::Future<Output = Result<TokenId>> + Send;

    /// Associate `account` with each of `tokens`
    ///
    /// Needs the account's own signature.
    fn associate(
        &self,
        account: AccountId,
        tokens: &[TokenId],
        signers: &[Address],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
