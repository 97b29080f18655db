//! Constants and unit conversion for the allowance harness

use alloy::primitives::U256;

/// Largest token amount the network accepts (amounts are signed 64-bit)
pub const HTS_MAX_AMOUNT: u64 = i64::MAX as u64;

/// Maximum decimals a fungible token may declare
pub const MAX_DECIMALS: u8 = 18;

/// Maximum length of a token name or symbol
pub const MAX_TOKEN_TEXT_LEN: usize = 100;

/// Harness token parameters
pub const HARNESS_TOKEN_NAME: &str = "ffff";
pub const HARNESS_TOKEN_SYMBOL: &str = "F";
pub const HARNESS_TOKEN_DECIMALS: u8 = 3;
pub const HARNESS_TOKEN_SUPPLY: u64 = 100;

/// First entity number handed out by a fresh local network
pub const FIRST_USER_ENTITY: u64 = 1001;

/// JSON-RPC relay of a local node
pub const LOCAL_RELAY_URL: &str = "http://localhost:7546";

/// Mirror node REST API of a local node
pub const LOCAL_MIRROR_URL: &str = "http://localhost:5551";

/// Chain IDs served by the relay
pub const MAINNET_CHAIN_ID: u64 = 295;
pub const TESTNET_CHAIN_ID: u64 = 296;
pub const PREVIEWNET_CHAIN_ID: u64 = 297;
pub const LOCAL_CHAIN_ID: u64 = 298;

/// Networks that can be selected by name
pub const DEFAULT_SUPPORTED_ENV: &[&str] = &["mainnet", "testnet", "previewnet", "local-node"];

/// Receipt polling (60 attempts * 2 seconds = 2 minutes)
pub const RECEIPT_POLL_ATTEMPTS: u32 = 60;
pub const RECEIPT_POLL_INTERVAL_SECS: u64 = 2;

/// Mirror node catch-up polling (30 attempts * 2 seconds = 1 minute)
pub const MIRROR_POLL_ATTEMPTS: u32 = 30;
pub const MIRROR_POLL_INTERVAL_SECS: u64 = 2;

/// HBAR sent with a token creation to cover its fee; the surplus is refunded
pub const TOKEN_CREATE_FEE_HBAR: u64 = 50;

/// HBAR sent to a fresh EVM address to auto-create its account
pub const ACCOUNT_FUNDING_HBAR: u64 = 10;

/// Gas limits for provisioning calls (the relay cannot estimate system contract calls)
pub const TOKEN_CREATE_GAS_LIMIT: u64 = 1_000_000;
pub const ASSOCIATE_GAS_LIMIT: u64 = 1_000_000;

/// Token auto-renew period (90 days)
pub const AUTO_RENEW_PERIOD_SECS: i64 = 7_776_000;

/// Weibars per HBAR: the relay exposes HBAR with 18 decimals
pub const WEIBARS_PER_HBAR: u64 = 1_000_000_000_000_000_000;

/// Convert whole HBAR to the relay's value unit
pub fn hbar_to_weibars(hbar: u64) -> U256 {
    U256::from(hbar) * U256::from(WEIBARS_PER_HBAR)
}

/// Render a smallest-unit amount as a decimal string (e.g., 100 with 3 decimals -> "0.100")
pub fn format_units(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = value / divisor;
    let fraction = value % divisor;
    format!(
        "{}.{:0>width$}",
        whole,
        fraction.to_string(),
        width = decimals as usize
    )
}
