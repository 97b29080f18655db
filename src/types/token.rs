//! Fungible token creation parameters

use crate::constants::{
    HARNESS_TOKEN_DECIMALS, HARNESS_TOKEN_NAME, HARNESS_TOKEN_SUPPLY, HARNESS_TOKEN_SYMBOL,
    HTS_MAX_AMOUNT, MAX_DECIMALS, MAX_TOKEN_TEXT_LEN,
};
use crate::types::AccountId;
use alloy::primitives::{Address, U256};
use eyre::{ensure, Result};

/// Parameters for creating a fungible token
///
/// Key fields hold the address of the key holder; a token created without an
/// admin key is immutable.
#[derive(Debug, Clone)]
pub struct TokenSpec {
    /// Token name (e.g., "ffff")
    pub name: String,
    /// Token symbol (e.g., "F")
    pub symbol: String,
    /// Decimal places of the smallest unit
    pub decimals: u8,
    /// Initial supply in smallest units, credited to the treasury
    pub initial_supply: u64,
    /// Account receiving the initial supply
    pub treasury: AccountId,
    pub admin_key: Option<Address>,
    pub freeze_key: Option<Address>,
    pub wipe_key: Option<Address>,
    pub supply_key: Option<Address>,
    /// Whether newly associated accounts start frozen
    pub freeze_default: bool,
}

impl TokenSpec {
    /// Create a token spec with no keys and zero supply
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, treasury: AccountId) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals: 0,
            initial_supply: 0,
            treasury,
            admin_key: None,
            freeze_key: None,
            wipe_key: None,
            supply_key: None,
            freeze_default: false,
        }
    }

    /// The token used by the allowance harness: `ffff`/`F`, 3 decimals,
    /// 100 units, every key held by the treasury's key
    pub fn harness(treasury: AccountId, key: Address) -> Self {
        Self::new(HARNESS_TOKEN_NAME, HARNESS_TOKEN_SYMBOL, treasury)
            .with_decimals(HARNESS_TOKEN_DECIMALS)
            .with_initial_supply(HARNESS_TOKEN_SUPPLY)
            .with_admin_key(key)
            .with_freeze_key(key)
            .with_wipe_key(key)
            .with_supply_key(key)
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_initial_supply(mut self, initial_supply: u64) -> Self {
        self.initial_supply = initial_supply;
        self
    }

    pub fn with_admin_key(mut self, key: Address) -> Self {
        self.admin_key = Some(key);
        self
    }

    pub fn with_freeze_key(mut self, key: Address) -> Self {
        self.freeze_key = Some(key);
        self
    }

    pub fn with_wipe_key(mut self, key: Address) -> Self {
        self.wipe_key = Some(key);
        self
    }

    pub fn with_supply_key(mut self, key: Address) -> Self {
        self.supply_key = Some(key);
        self
    }

    pub fn with_freeze_default(mut self, freeze_default: bool) -> Self {
        self.freeze_default = freeze_default;
        self
    }

    /// Initial supply as a ledger amount
    pub fn initial_supply_units(&self) -> U256 {
        U256::from(self.initial_supply)
    }

    /// Validate the spec
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.name.is_empty() && self.name.len() <= MAX_TOKEN_TEXT_LEN,
            "Token name must be 1-{} characters",
            MAX_TOKEN_TEXT_LEN
        );
        ensure!(
            !self.symbol.is_empty() && self.symbol.len() <= MAX_TOKEN_TEXT_LEN,
            "Token symbol must be 1-{} characters",
            MAX_TOKEN_TEXT_LEN
        );
        ensure!(
            self.decimals <= MAX_DECIMALS,
            "Decimals must be at most {}",
            MAX_DECIMALS
        );
        ensure!(
            self.initial_supply <= HTS_MAX_AMOUNT,
            "Initial supply {} exceeds {}",
            self.initial_supply,
            HTS_MAX_AMOUNT
        );
        ensure!(
            !(self.freeze_default && self.freeze_key.is_none()),
            "freeze_default requires a freeze key"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_spec() {
        let key = Address::repeat_byte(0x11);
        let spec = TokenSpec::harness(AccountId::new(1013), key);

        assert_eq!(spec.name, "ffff");
        assert_eq!(spec.symbol, "F");
        assert_eq!(spec.decimals, 3);
        assert_eq!(spec.initial_supply_units(), U256::from(100u64));
        assert_eq!(spec.supply_key, Some(key));
        assert!(!spec.freeze_default);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let treasury = AccountId::new(1013);

        assert!(TokenSpec::new("", "F", treasury).validate().is_err());
        assert!(TokenSpec::new("ffff", "", treasury).validate().is_err());
        assert!(TokenSpec::new("ffff", "F", treasury)
            .with_decimals(19)
            .validate()
            .is_err());
        assert!(TokenSpec::new("ffff", "F", treasury)
            .with_initial_supply(u64::MAX)
            .validate()
            .is_err());
        assert!(TokenSpec::new("ffff", "F", treasury)
            .with_freeze_default(true)
            .validate()
            .is_err());
        assert!(TokenSpec::new("ffff", "F", treasury)
            .with_initial_supply(HTS_MAX_AMOUNT)
            .validate()
            .is_ok());
    }
}
