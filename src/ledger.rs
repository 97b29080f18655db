//! In-process ERC-20 ledger
//!
//! Tracks balances and per-(owner, spender) allowances for one fungible token.
//! An allowance is a single slot: `approve` overwrites it, `transfer_from`
//! decrements it by exactly the amount spent. Every mutating operation checks
//! all of its preconditions before touching state, so a failed call leaves the
//! ledger exactly as it was.

use crate::contracts::IERC20;
use crate::error::LedgerError;
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{SolCall, SolInterface};
use std::collections::HashMap;

/// Notification emitted by a successful mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    Transfer(IERC20::Transfer),
    Approval(IERC20::Approval),
}

/// Balance and allowance ledger for a single token
#[derive(Debug, Clone)]
pub struct TokenLedger {
    name: String,
    symbol: String,
    decimals: u8,
    total_supply: U256,
    /// Largest amount a single approval may carry
    ceiling: U256,
    balances: HashMap<Address, U256>,
    /// (owner, spender) -> remaining allowance
    allowances: HashMap<(Address, Address), U256>,
    events: Vec<LedgerEvent>,
}

impl TokenLedger {
    /// Create a ledger with the whole initial supply credited to `treasury`
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
        treasury: Address,
        initial_supply: U256,
    ) -> Self {
        let mut balances = HashMap::new();
        balances.insert(treasury, initial_supply);

        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
            total_supply: initial_supply,
            ceiling: U256::MAX,
            balances,
            allowances: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Bound approvals to the token's amount domain
    pub fn with_amount_ceiling(mut self, ceiling: U256) -> Self {
        self.ceiling = ceiling;
        self
    }

    // ========== Views ==========

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn amount_ceiling(&self) -> U256 {
        self.ceiling
    }

    /// Balance of an account, zero if it has never been credited
    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or(U256::ZERO)
    }

    /// Remaining allowance, zero if never approved
    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Events emitted so far, oldest first
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    // ========== Mutations ==========

    /// Set `allowance[owner][spender] = amount`, replacing any previous value
    ///
    /// The owner is always the transaction signer: `signer != owner` fails with
    /// [`LedgerError::UnauthorizedCaller`].
    pub fn approve(
        &mut self,
        signer: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<IERC20::Approval, LedgerError> {
        if signer != owner {
            return Err(LedgerError::UnauthorizedCaller {
                caller: signer,
                owner,
            });
        }
        if spender.is_zero() {
            return Err(LedgerError::InvalidSpender(spender));
        }
        if amount > self.ceiling {
            return Err(LedgerError::AmountOutOfRange {
                amount,
                ceiling: self.ceiling,
            });
        }

        self.allowances.insert((owner, spender), amount);

        let event = IERC20::Approval {
            owner,
            spender,
            value: amount,
        };
        tracing::debug!("Approval {} -> {}: {}", owner, spender, amount);
        self.events.push(LedgerEvent::Approval(event.clone()));
        Ok(event)
    }

    /// Move `amount` from the caller to `to`
    pub fn transfer(
        &mut self,
        caller: Address,
        to: Address,
        amount: U256,
    ) -> Result<IERC20::Transfer, LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::InvalidReceiver(to));
        }

        let (from_balance, to_balance) = self.plan_move(caller, to, amount)?;
        self.balances.insert(caller, from_balance);
        self.balances.insert(to, to_balance);

        Ok(self.record_transfer(caller, to, amount))
    }

    /// Move `amount` from `from` to `to` on the strength of the caller's allowance
    ///
    /// Checks the allowance first, then the owner's balance. On success the
    /// allowance drops by exactly `amount`.
    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<IERC20::Transfer, LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::InvalidReceiver(to));
        }

        let allowance = self.allowance(from, caller);
        if allowance < amount {
            return Err(LedgerError::InsufficientAllowance {
                spender: caller,
                allowance,
                needed: amount,
            });
        }

        let (from_balance, to_balance) = self.plan_move(from, to, amount)?;

        self.allowances.insert((from, caller), allowance - amount);
        self.balances.insert(from, from_balance);
        self.balances.insert(to, to_balance);

        Ok(self.record_transfer(from, to, amount))
    }

    /// Post-transfer balances of `from` and `to`, without applying them
    fn plan_move(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(U256, U256), LedgerError> {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(LedgerError::InsufficientBalance {
                account: from,
                balance: from_balance,
                needed: amount,
            });
        }

        let remaining = from_balance - amount;
        let to_balance = if to == from {
            remaining
        } else {
            self.balance_of(to)
        };
        let credited = to_balance
            .checked_add(amount)
            .ok_or(LedgerError::AmountOutOfRange {
                amount,
                ceiling: self.ceiling,
            })?;

        Ok((remaining, credited))
    }

    fn record_transfer(&mut self, from: Address, to: Address, amount: U256) -> IERC20::Transfer {
        let event = IERC20::Transfer {
            from,
            to,
            value: amount,
        };
        tracing::debug!("Transfer {} -> {}: {}", from, to, amount);
        self.events.push(LedgerEvent::Transfer(event.clone()));
        event
    }

    // ========== ABI dispatch ==========

    /// Run ABI-encoded ERC-20 call data with `signer` as the caller
    ///
    /// Returns the ABI-encoded return value, exactly as a contract call would.
    pub fn execute(&mut self, signer: Address, data: &[u8]) -> Result<Bytes, LedgerError> {
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| LedgerError::MalformedCall("call data shorter than a selector".into()))?;

        if !IERC20::IERC20Calls::valid_selector(selector) {
            return Err(LedgerError::UnsupportedCall(selector.into()));
        }

        let call = IERC20::IERC20Calls::abi_decode(data)
            .map_err(|e| LedgerError::MalformedCall(e.to_string()))?;

        let output = match call {
            IERC20::IERC20Calls::name(_) => IERC20::nameCall::abi_encode_returns(&self.name),
            IERC20::IERC20Calls::symbol(_) => IERC20::symbolCall::abi_encode_returns(&self.symbol),
            IERC20::IERC20Calls::decimals(_) => {
                IERC20::decimalsCall::abi_encode_returns(&self.decimals)
            }
            IERC20::IERC20Calls::totalSupply(_) => {
                IERC20::totalSupplyCall::abi_encode_returns(&self.total_supply)
            }
            IERC20::IERC20Calls::balanceOf(c) => {
                IERC20::balanceOfCall::abi_encode_returns(&self.balance_of(c.account))
            }
            IERC20::IERC20Calls::allowance(c) => {
                IERC20::allowanceCall::abi_encode_returns(&self.allowance(c.owner, c.spender))
            }
            IERC20::IERC20Calls::approve(c) => {
                self.approve(signer, signer, c.spender, c.amount)?;
                IERC20::approveCall::abi_encode_returns(&true)
            }
            IERC20::IERC20Calls::transfer(c) => {
                self.transfer(signer, c.to, c.amount)?;
                IERC20::transferCall::abi_encode_returns(&true)
            }
            IERC20::IERC20Calls::transferFrom(c) => {
                self.transfer_from(signer, c.from, c.to, c.amount)?;
                IERC20::transferFromCall::abi_encode_returns(&true)
            }
        };

        Ok(Bytes::from(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREASURY: Address = Address::repeat_byte(0x01);
    const SPENDER: Address = Address::repeat_byte(0x02);
    const RECIPIENT: Address = Address::repeat_byte(0x03);

    fn create_test_ledger() -> TokenLedger {
        TokenLedger::new("ffff", "F", 3, TREASURY, U256::from(100u64))
    }

    fn units(n: u64) -> U256 {
        U256::from(n)
    }

    /// Accounts with a non-zero balance, ordered by address
    fn holders(ledger: &TokenLedger) -> Vec<(Address, U256)> {
        let mut holders: Vec<_> = ledger
            .balances
            .iter()
            .filter(|(_, balance)| !balance.is_zero())
            .map(|(account, balance)| (*account, *balance))
            .collect();
        holders.sort_by_key(|(account, _)| *account);
        holders
    }

    fn sum_of_balances(ledger: &TokenLedger) -> U256 {
        holders(ledger)
            .iter()
            .fold(U256::ZERO, |acc, (_, balance)| acc + *balance)
    }

    #[test]
    fn test_creation() {
        let ledger = create_test_ledger();

        assert_eq!(ledger.name(), "ffff");
        assert_eq!(ledger.symbol(), "F");
        assert_eq!(ledger.decimals(), 3);
        assert_eq!(ledger.total_supply(), units(100));
        assert_eq!(ledger.balance_of(TREASURY), units(100));
        assert_eq!(ledger.balance_of(RECIPIENT), U256::ZERO);
        assert_eq!(ledger.allowance(TREASURY, SPENDER), U256::ZERO);
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn test_approve_replaces_previous_allowance() {
        let mut ledger = create_test_ledger();

        ledger.approve(TREASURY, TREASURY, SPENDER, units(40)).unwrap();
        ledger.approve(TREASURY, TREASURY, SPENDER, units(25)).unwrap();
        assert_eq!(ledger.allowance(TREASURY, SPENDER), units(25));

        // Revoke
        ledger.approve(TREASURY, TREASURY, SPENDER, U256::ZERO).unwrap();
        assert_eq!(ledger.allowance(TREASURY, SPENDER), U256::ZERO);
    }

    #[test]
    fn test_approve_emits_event() {
        let mut ledger = create_test_ledger();

        let event = ledger
            .approve(TREASURY, TREASURY, SPENDER, units(100))
            .unwrap();
        assert_eq!(event.owner, TREASURY);
        assert_eq!(event.spender, SPENDER);
        assert_eq!(event.value, units(100));
        assert_eq!(ledger.events(), &[LedgerEvent::Approval(event)]);
    }

    #[test]
    fn test_approve_by_someone_else_is_rejected() {
        let mut ledger = create_test_ledger();

        let result = ledger.approve(SPENDER, TREASURY, SPENDER, units(100));
        assert_eq!(
            result,
            Err(LedgerError::UnauthorizedCaller {
                caller: SPENDER,
                owner: TREASURY
            })
        );
        assert_eq!(ledger.allowance(TREASURY, SPENDER), U256::ZERO);
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn test_approve_rejects_zero_spender_and_oversized_amount() {
        let mut ledger = create_test_ledger().with_amount_ceiling(units(1_000));

        assert_eq!(
            ledger.approve(TREASURY, TREASURY, Address::ZERO, units(1)),
            Err(LedgerError::InvalidSpender(Address::ZERO))
        );
        assert!(matches!(
            ledger.approve(TREASURY, TREASURY, SPENDER, units(1_001)),
            Err(LedgerError::AmountOutOfRange { .. })
        ));
        // More than the balance is fine, only the ceiling binds
        assert!(ledger.approve(TREASURY, TREASURY, SPENDER, units(1_000)).is_ok());
    }

    #[test]
    fn test_transfer_from_spends_allowance() {
        let mut ledger = create_test_ledger();
        ledger.approve(TREASURY, TREASURY, SPENDER, units(100)).unwrap();

        let event = ledger
            .transfer_from(SPENDER, TREASURY, RECIPIENT, units(30))
            .unwrap();

        assert_eq!(event.from, TREASURY);
        assert_eq!(event.to, RECIPIENT);
        assert_eq!(event.value, units(30));
        assert_eq!(ledger.balance_of(TREASURY), units(70));
        assert_eq!(ledger.balance_of(RECIPIENT), units(30));
        assert_eq!(ledger.allowance(TREASURY, SPENDER), units(70));
        assert_eq!(sum_of_balances(&ledger), ledger.total_supply());
    }

    #[test]
    fn test_transfer_from_full_allowance_scenario() {
        let mut ledger = create_test_ledger();

        ledger.approve(TREASURY, TREASURY, SPENDER, units(100)).unwrap();
        assert_eq!(ledger.allowance(TREASURY, SPENDER), units(100));

        ledger
            .transfer_from(SPENDER, TREASURY, RECIPIENT, units(100))
            .unwrap();
        assert_eq!(ledger.balance_of(TREASURY), U256::ZERO);
        assert_eq!(ledger.balance_of(RECIPIENT), units(100));
        assert_eq!(ledger.allowance(TREASURY, SPENDER), U256::ZERO);

        // Nothing left to spend: fails instead of clamping
        let result = ledger.transfer_from(SPENDER, TREASURY, RECIPIENT, units(1));
        assert_eq!(
            result,
            Err(LedgerError::InsufficientAllowance {
                spender: SPENDER,
                allowance: U256::ZERO,
                needed: units(1)
            })
        );
    }

    #[test]
    fn test_transfer_from_beyond_allowance_leaves_state_unchanged() {
        let mut ledger = create_test_ledger();
        ledger.approve(TREASURY, TREASURY, SPENDER, units(10)).unwrap();
        let events_before = ledger.events().len();

        let result = ledger.transfer_from(SPENDER, TREASURY, RECIPIENT, units(11));
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientAllowance { .. })
        ));
        assert_eq!(ledger.balance_of(TREASURY), units(100));
        assert_eq!(ledger.balance_of(RECIPIENT), U256::ZERO);
        assert_eq!(ledger.allowance(TREASURY, SPENDER), units(10));
        assert_eq!(ledger.events().len(), events_before);
    }

    #[test]
    fn test_transfer_from_beyond_balance_leaves_state_unchanged() {
        let mut ledger = create_test_ledger();
        ledger.approve(TREASURY, TREASURY, SPENDER, units(500)).unwrap();

        let result = ledger.transfer_from(SPENDER, TREASURY, RECIPIENT, units(101));
        assert_eq!(
            result,
            Err(LedgerError::InsufficientBalance {
                account: TREASURY,
                balance: units(100),
                needed: units(101)
            })
        );
        assert_eq!(ledger.balance_of(TREASURY), units(100));
        assert_eq!(ledger.balance_of(RECIPIENT), U256::ZERO);
        assert_eq!(ledger.allowance(TREASURY, SPENDER), units(500));
    }

    #[test]
    fn test_allowance_is_checked_before_balance() {
        let mut ledger = create_test_ledger();

        let result = ledger.transfer_from(SPENDER, TREASURY, RECIPIENT, units(1_000));
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientAllowance { .. })
        ));
    }

    #[test]
    fn test_allowance_is_per_spender() {
        let mut ledger = create_test_ledger();
        let other = Address::repeat_byte(0x04);
        ledger.approve(TREASURY, TREASURY, SPENDER, units(50)).unwrap();

        assert!(ledger
            .transfer_from(other, TREASURY, RECIPIENT, units(1))
            .is_err());
        assert_eq!(ledger.allowance(TREASURY, other), U256::ZERO);
        assert_eq!(ledger.allowance(TREASURY, SPENDER), units(50));
    }

    #[test]
    fn test_transfer_to_self_keeps_balance() {
        let mut ledger = create_test_ledger();
        ledger.approve(TREASURY, TREASURY, SPENDER, units(20)).unwrap();

        ledger
            .transfer_from(SPENDER, TREASURY, TREASURY, units(20))
            .unwrap();
        assert_eq!(ledger.balance_of(TREASURY), units(100));
        assert_eq!(ledger.allowance(TREASURY, SPENDER), U256::ZERO);
    }

    #[test]
    fn test_transfer_rejects_zero_receiver() {
        let mut ledger = create_test_ledger();

        assert_eq!(
            ledger.transfer(TREASURY, Address::ZERO, units(1)),
            Err(LedgerError::InvalidReceiver(Address::ZERO))
        );
        ledger.transfer(TREASURY, RECIPIENT, units(60)).unwrap();
        assert!(matches!(
            ledger.transfer(TREASURY, RECIPIENT, units(41)),
            Err(LedgerError::InsufficientBalance { .. })
        ));
        assert_eq!(holders(&ledger), vec![(TREASURY, units(40)), (RECIPIENT, units(60))]);
    }

    #[test]
    fn test_reads_are_stable() {
        let mut ledger = create_test_ledger();
        ledger.approve(TREASURY, TREASURY, SPENDER, units(7)).unwrap();

        let first = (
            ledger.balance_of(TREASURY),
            ledger.allowance(TREASURY, SPENDER),
        );
        let second = (
            ledger.balance_of(TREASURY),
            ledger.allowance(TREASURY, SPENDER),
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_execute_dispatches_abi_calls() {
        let mut ledger = create_test_ledger();

        let approve = IERC20::approveCall {
            spender: SPENDER,
            amount: units(100),
        };
        let output = ledger.execute(TREASURY, &approve.abi_encode()).unwrap();
        assert!(IERC20::approveCall::abi_decode_returns(&output).unwrap());

        let transfer_from = IERC20::transferFromCall {
            from: TREASURY,
            to: RECIPIENT,
            amount: units(100),
        };
        ledger
            .execute(SPENDER, &transfer_from.abi_encode())
            .unwrap();

        let balance = IERC20::balanceOfCall { account: RECIPIENT };
        let output = ledger.execute(SPENDER, &balance.abi_encode()).unwrap();
        assert_eq!(
            IERC20::balanceOfCall::abi_decode_returns(&output).unwrap(),
            units(100)
        );

        let symbol = ledger
            .execute(SPENDER, &IERC20::symbolCall {}.abi_encode())
            .unwrap();
        assert_eq!(IERC20::symbolCall::abi_decode_returns(&symbol).unwrap(), "F");
    }

    #[test]
    fn test_execute_surfaces_ledger_errors() {
        let mut ledger = create_test_ledger();

        let transfer_from = IERC20::transferFromCall {
            from: TREASURY,
            to: RECIPIENT,
            amount: units(1),
        };
        assert!(matches!(
            ledger.execute(SPENDER, &transfer_from.abi_encode()),
            Err(LedgerError::InsufficientAllowance { .. })
        ));
    }

    #[test]
    fn test_execute_rejects_unknown_and_malformed_calls() {
        let mut ledger = create_test_ledger();

        assert!(matches!(
            ledger.execute(TREASURY, &[0xde, 0xad]),
            Err(LedgerError::MalformedCall(_))
        ));
        assert_eq!(
            ledger.execute(TREASURY, &[0xde, 0xad, 0xbe, 0xef]),
            Err(LedgerError::UnsupportedCall([0xde, 0xad, 0xbe, 0xef].into()))
        );

        // Valid approve selector, truncated arguments
        let data = IERC20::approveCall {
            spender: SPENDER,
            amount: units(1),
        }
        .abi_encode();
        assert!(matches!(
            ledger.execute(TREASURY, &data[..20]),
            Err(LedgerError::MalformedCall(_))
        ));
    }
}
