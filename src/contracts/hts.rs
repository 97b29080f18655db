//! Hedera Token Service bindings
//!
//! Token creation goes through the HTS system contract at `0x167`. Every
//! fungible token also answers `associate()` at its own address, called by
//! the account that wants to hold it.

use alloy::primitives::{address, Address};
use alloy::sol;

/// HTS system contract
pub const HTS_SYSTEM_CONTRACT: Address = address!("0000000000000000000000000000000000000167");

/// HTS response code for a successful call
pub const HTS_SUCCESS: i64 = 22;

/// Key type bits of `TokenKey.keyType`
pub const ADMIN_KEY_BIT: u64 = 1;
pub const FREEZE_KEY_BIT: u64 = 4;
pub const WIPE_KEY_BIT: u64 = 8;
pub const SUPPLY_KEY_BIT: u64 = 16;

sol! {
    /// Subset of the HTS system contract used for provisioning
    #[sol(rpc, all_derives)]
    interface IHederaTokenService {
        struct KeyValue {
            bool inheritAccountKey;
            address contractId;
            bytes ed25519;
            bytes ECDSA_secp256k1;
            address delegatableContractId;
        }

        struct TokenKey {
            uint256 keyType;
            KeyValue key;
        }

        struct Expiry {
            int64 second;
            address autoRenewAccount;
            int64 autoRenewPeriod;
        }

        struct HederaToken {
            string name;
            string symbol;
            address treasury;
            string memo;
            bool tokenSupplyType;
            int64 maxSupply;
            bool freezeDefault;
            TokenKey[] tokenKeys;
            Expiry expiry;
        }

        /// Creates a fungible token, crediting the initial supply to the treasury
        function createFungibleToken(
            HederaToken memory token,
            int64 initialTotalSupply,
            int32 decimals
        ) external payable returns (int64 responseCode, address tokenAddress);
    }
}

sol! {
    /// Association facade exposed at every token address
    #[sol(rpc, all_derives)]
    interface IHRC719 {
        /// Associates the caller with this token
        function associate() external returns (uint256 responseCode);

        /// Whether the caller is associated with this token
        function isAssociated() external view returns (bool associated);
    }
}
