//! Token-standard call surface shared by every backend
//!
//! Both the in-process [`LocalToken`](crate::local::LocalToken) and the relay
//! [`TokenClient`](crate::client::TokenClient) implement [`Erc20`], so the same
//! scenario can be pointed at either one.

use alloy::primitives::{Address, U256};
use eyre::Result;

/// ERC-20 calls made on behalf of a fixed caller
///
/// Mutations resolve to `Ok(false)` when the backend reports a reverted
/// transaction, or to an error when it refuses the call outright. Callers
/// treat both as a failed mutation.
pub trait Erc20: Send + Sync {
    /// Address the calls are made from
    fn caller(&self) -> Address;

    /// Address of the token contract
    fn token_address(&self) -> Address;

    /// Balance of an account
    fn balance_of(&self, account: Address) -> impl std::future::Future<Output = Result<U256>> + Send;

    /// Remaining allowance of `spender` over `owner`'s balance
    fn allowance(
        &self,
        owner: Address,
        spender: Address,
    ) -> impl std::future::Future<Output = Result<U256>> + Send;

    /// Set the caller's allowance for `spender` to `amount`
    fn approve(
        &self,
        spender: Address,
        amount: U256,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Spend the caller's allowance over `from`, crediting `to`
    fn transfer_from(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}
