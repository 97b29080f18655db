//! Allowance scenario runner
//!
//! Run with: cargo run --example allowance
//!
//! Without HEDERA_NETWORK the scenario runs against an in-process network.
//! With HEDERA_NETWORK set it runs on that network through the relay in
//! RELAY_URL: the owner (0.0.1013) creates the harness token and the spender
//! (0.0.1014) and recipient (0.0.1015) associate with it, unless TOKEN_ID names
//! an existing token. Keys come from OWNER_KEY, SPENDER_KEY and RECIPIENT_KEY
//! and default to the local node's pre-funded accounts.

use alloy::primitives::U256;
use hts_allowance::constants::format_units;
use hts_allowance::{
    parse_private_key, AccountId, AllowanceScenario, AssetProvisioner, Erc20, LocalNetwork,
    LocalSigner, NetworkConfig, RelayProvisioner, ScenarioReport, TokenClient, TokenId, TokenSpec,
    TransactionSigner,
};

const OWNER_KEY: &str = "0x2e1d968b041d84dd120a5860cee60cd83f9374ef527ca86996317ada3d0d03e7";
const SPENDER_KEY: &str = "0x45a5a7108a18dd5013cf2d5857a28144beadc9c70b3bdbd914e38df4e804b8d8";
const RECIPIENT_KEY: &str = "0x6e9d61a325be3f6675cf8b7676c70e4a004d2308e3e182370a41f5653d52c6bd";

const AMOUNT: u64 = 100;

fn key(name: &str, default: &str) -> String {
    dotenvy::var(name).unwrap_or_else(|_| default.to_string())
}

fn account(name: &str, default: u64) -> eyre::Result<AccountId> {
    match dotenvy::var(name) {
        Ok(id) => id.parse(),
        Err(_) => Ok(AccountId::new(default)),
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let report = if dotenvy::var("HEDERA_NETWORK").is_ok() {
        run_remote().await?
    } else {
        run_local().await?
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.passed() {
        eyre::bail!("Allowance scenario failed: {:?}", report.failures());
    }
    println!("Allowance scenario passed");
    Ok(())
}

/// Provision accounts and a token in-process, then run the scenario
async fn run_local() -> eyre::Result<ScenarioReport> {
    println!("\n=== In-process network ===");

    let owner = parse_private_key(key("OWNER_KEY", OWNER_KEY))?.address();
    let spender = parse_private_key(key("SPENDER_KEY", SPENDER_KEY))?.address();
    let recipient = parse_private_key(key("RECIPIENT_KEY", RECIPIENT_KEY))?.address();

    let network = LocalNetwork::new();
    let owner_id = network.create_account(owner).await?;
    let spender_id = network.create_account(spender).await?;
    let recipient_id = network.create_account(recipient).await?;
    println!("Owner:     {} ({})", owner_id, owner);
    println!("Spender:   {} ({})", spender_id, spender);
    println!("Recipient: {} ({})", recipient_id, recipient);

    let spec = TokenSpec::harness(owner_id, owner).with_initial_supply(AMOUNT);
    let token_id = network.create_fungible_token(&spec, &[owner]).await?;
    network
        .associate(spender_id, &[token_id], &[owner, spender])
        .await?;
    network
        .associate(recipient_id, &[token_id], &[owner, recipient])
        .await?;
    println!(
        "Token:     {} ({})",
        token_id,
        network.token_address(token_id)
    );

    let owner_token = network.token(token_id, owner);
    let spender_token = owner_token.connect(spender);
    AllowanceScenario::new(U256::from(AMOUNT))
        .run(&owner_token, &spender_token, recipient)
        .await
}

/// Provision on the selected network (or reuse TOKEN_ID) and run the scenario through the relay
async fn run_remote() -> eyre::Result<ScenarioReport> {
    let config = NetworkConfig::from_env()?;
    println!("\n=== Relay {} (chain {}) ===", config.rpc_url, config.chain_id);

    let owner_key = parse_private_key(key("OWNER_KEY", OWNER_KEY))?;
    let spender_key = parse_private_key(key("SPENDER_KEY", SPENDER_KEY))?;
    let recipient_key = parse_private_key(key("RECIPIENT_KEY", RECIPIENT_KEY))?;
    let (owner_address, spender_address, recipient_address) = (
        owner_key.address(),
        spender_key.address(),
        recipient_key.address(),
    );

    let owner_id = account("OWNER_ACCOUNT_ID", 1013)?;
    let spender_id = account("SPENDER_ACCOUNT_ID", 1014)?;
    let recipient_id = account("RECIPIENT_ACCOUNT_ID", 1015)?;

    let owner = LocalSigner::from_signer(owner_key.clone(), &config.rpc_url)?;
    let gas_balance = owner.get_balance().await?;
    println!(
        "Owner:     {} ({}) {} HBAR",
        owner_id,
        owner_address,
        format_units(gas_balance, 18)
    );

    let provisioner = RelayProvisioner::new(owner, config.clone())?
        .with_signer(LocalSigner::from_signer(spender_key.clone(), &config.rpc_url)?)
        .with_signer(LocalSigner::from_signer(recipient_key, &config.rpc_url)?);
    provisioner.verify_network().await?;

    let token_id: TokenId = match dotenvy::var("TOKEN_ID") {
        Ok(token_id) => token_id.parse()?,
        Err(_) => {
            let spec = TokenSpec::harness(owner_id, owner_address);
            let token_id = provisioner
                .create_fungible_token(&spec, &[owner_address])
                .await?;
            provisioner
                .associate(spender_id, &[token_id], &[owner_address, spender_address])
                .await?;
            provisioner
                .associate(recipient_id, &[token_id], &[owner_address, recipient_address])
                .await?;
            token_id
        }
    };

    // Confirm what the mirror node sees before spending
    let mirror = provisioner.mirror();
    let token_info = mirror.get_token(token_id).await?;
    let decimals = token_info.decimals_u8()?;
    println!(
        "Token:     {} {} ({}), supply {}",
        token_info.token_id,
        token_info.name,
        token_info.symbol,
        format_units(token_info.total_supply_units()?, decimals)
    );
    let relationship = mirror
        .token_relationship(&recipient_id.to_string(), token_id)
        .await?
        .ok_or_else(|| eyre::eyre!("Recipient {} is not associated with {}", recipient_id, token_id))?;
    if relationship.is_frozen() {
        eyre::bail!("Recipient {} is frozen for {}", recipient_id, token_id);
    }

    let owner_token = TokenClient::new(
        LocalSigner::from_signer(owner_key, &config.rpc_url)?,
        config.clone(),
        token_id.to_solidity_address(),
    )?;
    let spender_token = owner_token.connect(LocalSigner::from_signer(spender_key, &config.rpc_url)?);

    let balance = owner_token.balance_of(owner_token.caller()).await?;
    println!("Owner token balance: {}", format_units(balance, decimals));

    AllowanceScenario::new(U256::from(AMOUNT))
        .run(&owner_token, &spender_token, recipient_address)
        .await
}
