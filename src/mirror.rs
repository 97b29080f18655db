//! Mirror node client for confirming accounts, tokens and associations

use crate::types::{AccountId, TokenId};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use eyre::{Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// Account as reported by the mirror node
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    pub account: AccountId,
    #[serde(default)]
    pub evm_address: Option<Address>,
    #[serde(default)]
    pub balance: Option<AccountBalance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountBalance {
    /// Native balance in tinybars
    pub balance: u64,
}

/// Token as reported by the mirror node
///
/// Decimals and supply arrive as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    pub token_id: TokenId,
    pub name: String,
    pub symbol: String,
    pub decimals: String,
    pub total_supply: String,
    #[serde(default)]
    pub treasury_account_id: Option<AccountId>,
}

impl TokenInfo {
    pub fn decimals_u8(&self) -> Result<u8> {
        self.decimals
            .parse()
            .with_context(|| format!("Invalid decimals {:?}", self.decimals))
    }

    pub fn total_supply_units(&self) -> Result<U256> {
        self.total_supply
            .parse()
            .with_context(|| format!("Invalid total supply {:?}", self.total_supply))
    }
}

/// An account's relationship with one token
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRelationship {
    pub token_id: TokenId,
    pub balance: u64,
    #[serde(default)]
    pub automatic_association: bool,
    #[serde(default)]
    pub freeze_status: Option<String>,
}

impl TokenRelationship {
    pub fn is_frozen(&self) -> bool {
        self.freeze_status.as_deref() == Some("FROZEN")
    }
}

/// Outcome of an EVM transaction, including the call's return data
#[derive(Debug, Clone, Deserialize)]
pub struct ContractResult {
    /// ABI-encoded return value
    #[serde(default)]
    pub call_result: Option<Bytes>,
    /// Network status, `SUCCESS` on success
    pub result: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ContractResult {
    pub fn is_success(&self) -> bool {
        self.result == "SUCCESS"
    }
}

/// Consensus node known to the mirror node
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkNode {
    pub node_account_id: AccountId,
    #[serde(default)]
    pub service_endpoints: Vec<ServiceEndpoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceEndpoint {
    #[serde(default)]
    pub ip_address_v4: String,
    #[serde(default)]
    pub domain_name: String,
    pub port: u16,
}

fn excerpt(text: &str) -> String {
    text.chars().take(200).collect()
}

#[derive(Deserialize)]
struct RelationshipsResponse {
    tokens: Vec<TokenRelationship>,
}

#[derive(Deserialize)]
struct Links {
    next: Option<String>,
}

#[derive(Deserialize)]
struct NodesResponse {
    nodes: Vec<NetworkNode>,
    links: Links,
}

/// Read-only mirror node REST client
pub struct MirrorNodeClient {
    url: String,
    client: reqwest::Client,
}

impl MirrorNodeClient {
    /// Create a new mirror node client
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url: String = url.into();
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .user_agent("hts-allowance/0.1.0")
                .timeout(Duration::from_secs(30))
                .connect_timeout(Duration::from_secs(10))
                .use_rustls_tls()
                .build()
                .context("Failed to create HTTP client")?,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.url, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path);
        self.get_url(&url)
            .await?
            .ok_or_else(|| eyre::eyre!("Mirror node has no record at {}", url))
    }

    /// GET a JSON document, `None` when the mirror node answers 404
    async fn get_url<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to query mirror node: {}", url))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let text = response
            .text()
            .await
            .context("Failed to read mirror node response body")?;
        if !status.is_success() {
            eyre::bail!(
                "Mirror node returned {} for {}: {}",
                status,
                url,
                excerpt(&text)
            );
        }

        serde_json::from_str(&text)
            .map(Some)
            .with_context(|| format!("Failed to parse mirror node response: {}", excerpt(&text)))
    }

    /// Look up an account by id (`0.0.1013`) or EVM address
    pub async fn get_account(&self, id_or_address: &str) -> Result<AccountInfo> {
        self.get_json(&format!("accounts/{}", id_or_address)).await
    }

    /// Look up an account, `None` if the mirror node has not seen it
    pub async fn find_account(&self, id_or_address: &str) -> Result<Option<AccountInfo>> {
        self.get_url(&self.endpoint(&format!("accounts/{}", id_or_address)))
            .await
    }

    /// Look up a token by id
    pub async fn get_token(&self, token: TokenId) -> Result<TokenInfo> {
        self.get_json(&format!("tokens/{}", token)).await
    }

    /// Look up a token, `None` if the mirror node has not seen it
    pub async fn find_token(&self, token: TokenId) -> Result<Option<TokenInfo>> {
        self.get_url(&self.endpoint(&format!("tokens/{}", token)))
            .await
    }

    /// Result of an EVM transaction, `None` until the mirror node has it
    pub async fn find_contract_result(&self, tx_hash: TxHash) -> Result<Option<ContractResult>> {
        self.get_url(&self.endpoint(&format!("contracts/results/{}", tx_hash)))
            .await
    }

    /// Every consensus node of the indexed network, following pagination
    pub async fn get_nodes(&self) -> Result<Vec<NetworkNode>> {
        let mut nodes = Vec::new();
        let mut next = Some(self.endpoint("network/nodes?limit=25"));
        while let Some(url) = next {
            let page: NodesResponse = self
                .get_url(&url)
                .await?
                .ok_or_else(|| eyre::eyre!("Mirror node has no node list at {}", url))?;
            nodes.extend(page.nodes);
            next = page.links.next.map(|path| format!("{}{}", self.url, path));
        }
        Ok(nodes)
    }

    /// The account's relationship with `token`, if they are associated
    pub async fn token_relationship(
        &self,
        account: &str,
        token: TokenId,
    ) -> Result<Option<TokenRelationship>> {
        let response: RelationshipsResponse = self
            .get_json(&format!("accounts/{}/tokens?token.id={}", account, token))
            .await?;
        Ok(response
            .tokens
            .into_iter()
            .find(|relationship| relationship.token_id == token))
    }

    /// Whether the account may hold `token`
    pub async fn is_associated(&self, account: &str, token: TokenId) -> Result<bool> {
        Ok(self.token_relationship(account, token).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = MirrorNodeClient::new("http://localhost:5551/").unwrap();
        assert_eq!(
            client.endpoint("tokens/0.0.1016"),
            "http://localhost:5551/api/v1/tokens/0.0.1016"
        );
    }

    #[test]
    fn test_parse_account() {
        let json = r#"{
            "account": "0.0.1013",
            "evm_address": "0x67d8d32e9bf1a9968a5ff53b87d777aa8ebbee69",
            "balance": { "balance": 1000000000000, "timestamp": "1700000000.000000000", "tokens": [] },
            "memo": ""
        }"#;
        let account: AccountInfo = serde_json::from_str(json).unwrap();

        assert_eq!(account.account, AccountId::new(1013));
        assert!(account.evm_address.is_some());
        assert_eq!(account.balance.unwrap().balance, 1_000_000_000_000);
    }

    #[test]
    fn test_parse_token() {
        let json = r#"{
            "token_id": "0.0.1016",
            "name": "ffff",
            "symbol": "F",
            "decimals": "3",
            "total_supply": "100",
            "treasury_account_id": "0.0.1013",
            "type": "FUNGIBLE_COMMON"
        }"#;
        let token: TokenInfo = serde_json::from_str(json).unwrap();

        assert_eq!(token.token_id, TokenId::new(1016));
        assert_eq!(token.decimals_u8().unwrap(), 3);
        assert_eq!(token.total_supply_units().unwrap(), U256::from(100u64));
        assert_eq!(token.treasury_account_id, Some(AccountId::new(1013)));
    }

    #[test]
    fn test_parse_relationships() {
        let json = r#"{
            "tokens": [
                { "token_id": "0.0.1016", "balance": 0, "automatic_association": false,
                  "freeze_status": "UNFROZEN", "kyc_status": "NOT_APPLICABLE" }
            ],
            "links": { "next": null }
        }"#;
        let response: RelationshipsResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.tokens.len(), 1);
        assert_eq!(response.tokens[0].token_id, TokenId::new(1016));
        assert!(!response.tokens[0].is_frozen());
    }

    #[test]
    fn test_parse_contract_result() {
        let json = r#"{
            "call_result": "0x0000000000000000000000000000000000000000000000000000000000000016",
            "result": "SUCCESS",
            "status": "0x1",
            "error_message": null
        }"#;
        let result: ContractResult = serde_json::from_str(json).unwrap();

        assert!(result.is_success());
        assert_eq!(result.call_result.unwrap().len(), 32);
    }

    #[test]
    fn test_parse_reverted_contract_result() {
        let json = r#"{ "result": "CONTRACT_REVERT_EXECUTED", "error_message": "0x" }"#;
        let result: ContractResult = serde_json::from_str(json).unwrap();

        assert!(!result.is_success());
        assert!(result.call_result.is_none());
    }

    #[test]
    fn test_parse_nodes_page() {
        let json = r#"{
            "nodes": [
                { "node_id": 0, "node_account_id": "0.0.3",
                  "service_endpoints": [ { "domain_name": "", "ip_address_v4": "127.0.0.1", "port": 50211 } ] }
            ],
            "links": { "next": "/api/v1/network/nodes?limit=25&node.id=gt:0" }
        }"#;
        let page: NodesResponse = serde_json::from_str(json).unwrap();

        assert_eq!(page.nodes[0].node_account_id, AccountId::new(3));
        assert_eq!(page.nodes[0].service_endpoints[0].port, 50211);
        assert!(page.links.next.is_some());
    }
}
