//! ERC-20 allowance harness for Hedera JSON-RPC relays
//!
//! Verifies approve/allowance/transferFrom semantics of fungible tokens exposed
//! through their ERC-20 facade.
//!
//! # Features
//!
//! - In-process token ledger with replace-on-approve, decrement-on-spend allowances
//! - In-process network for account creation, token creation and association
//! - Relay client for tokens on a live network
//! - Provisioning on a live network through the relay and the token service
//! - One allowance scenario that runs against either backend
//!
//! # Example
//!
//! ```rust,ignore
//! use hts_allowance::{AllowanceScenario, AssetProvisioner, LocalNetwork, TokenSpec};
//! use alloy::primitives::U256;
//!
//! #[tokio::main]
//! async fn main() -> eyre::Result<()> {
//!     let network = LocalNetwork::new();
//!     let owner = network.create_account(owner_key).await?;
//!     let token = network
//!         .create_fungible_token(&TokenSpec::harness(owner, owner_key), &[owner_key])
//!         .await?;
//!
//!     let owner_token = network.token(token, owner_key);
//!     let spender_token = owner_token.connect(spender_key);
//!     let report = AllowanceScenario::new(U256::from(100))
//!         .run(&owner_token, &spender_token, recipient_key)
//!         .await?;
//!     assert!(report.passed());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod contracts;
pub mod error;
pub mod ledger;
pub mod local;
pub mod mirror;
pub mod provision;
pub mod relay;
pub mod scenario;
pub mod signer;
pub mod token;
pub mod types;

// Re-export main types for convenience
pub use client::TokenClient;
pub use config::{NamedNetwork, NetworkConfig, NetworkSelection};
pub use error::{eyre, Context, LedgerError, ProvisionError, Report, Result};
pub use ledger::{LedgerEvent, TokenLedger};
pub use local::{LocalNetwork, LocalToken};
pub use mirror::{AccountInfo, ContractResult, MirrorNodeClient, NetworkNode, TokenInfo, TokenRelationship};
pub use provision::AssetProvisioner;
pub use relay::RelayProvisioner;
pub use scenario::{AllowanceScenario, ScenarioReport, StepOutcome};
pub use signer::{parse_private_key, LocalSigner, TransactionSigner, TxRequest};
pub use token::Erc20;
pub use types::{AccountId, EntityId, TokenId, TokenSpec};
