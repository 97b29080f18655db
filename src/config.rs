//! Network configuration for the allowance harness
//!
//! The consensus network is picked from `HEDERA_NETWORK`: a name listed in
//! `SUPPORTED_ENV` selects a well-known network, anything else is read as a JSON
//! map of `host:port` to node account id. Relay and mirror node endpoints
//! default from the chosen network and can be overridden individually.

use crate::constants::{
    DEFAULT_SUPPORTED_ENV, LOCAL_CHAIN_ID, LOCAL_MIRROR_URL, LOCAL_RELAY_URL, MAINNET_CHAIN_ID,
    PREVIEWNET_CHAIN_ID, TESTNET_CHAIN_ID,
};
use crate::types::AccountId;
use eyre::{bail, ensure, Context, Result};
use std::collections::BTreeMap;

/// Networks that can be selected by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedNetwork {
    Mainnet,
    Testnet,
    Previewnet,
    LocalNode,
}

impl NamedNetwork {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "mainnet" => Some(Self::Mainnet),
            "testnet" => Some(Self::Testnet),
            "previewnet" => Some(Self::Previewnet),
            "local-node" | "localhost" => Some(Self::LocalNode),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Previewnet => "previewnet",
            Self::LocalNode => "local-node",
        }
    }

    /// Chain ID served by the network's relay
    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Mainnet => MAINNET_CHAIN_ID,
            Self::Testnet => TESTNET_CHAIN_ID,
            Self::Previewnet => PREVIEWNET_CHAIN_ID,
            Self::LocalNode => LOCAL_CHAIN_ID,
        }
    }

    /// Public mirror node REST endpoint
    pub fn mirror_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://mainnet-public.mirrornode.hedera.com",
            Self::Testnet => "https://testnet.mirrornode.hedera.com",
            Self::Previewnet => "https://previewnet.mirrornode.hedera.com",
            Self::LocalNode => LOCAL_MIRROR_URL,
        }
    }
}

/// Which consensus nodes transactions go to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkSelection {
    Named(NamedNetwork),
    /// `host:port` -> node account id
    Custom(BTreeMap<String, AccountId>),
}

impl NetworkSelection {
    /// Resolve a network identifier against the list of supported names
    pub fn resolve(identifier: &str, supported: &[String]) -> Result<Self> {
        let lowered = identifier.trim().to_lowercase();
        if supported.iter().any(|name| *name == lowered) {
            return match NamedNetwork::from_name(&lowered) {
                Some(named) => Ok(Self::Named(named)),
                None => bail!("Unknown network name: {}", identifier),
            };
        }

        let nodes: BTreeMap<String, AccountId> = serde_json::from_str(identifier)
            .with_context(|| format!("Network {:?} is neither supported nor a node map", identifier))?;
        ensure!(!nodes.is_empty(), "Custom network has no consensus nodes");
        Ok(Self::Custom(nodes))
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Named(named) => named.chain_id(),
            Self::Custom(_) => LOCAL_CHAIN_ID,
        }
    }

    pub fn mirror_url(&self) -> &'static str {
        match self {
            Self::Named(named) => named.mirror_url(),
            Self::Custom(_) => LOCAL_MIRROR_URL,
        }
    }
}

/// Parse `SUPPORTED_ENV`: a JSON array, or names separated by commas/whitespace
pub fn parse_supported_env(raw: &str) -> Result<Vec<String>> {
    let raw = raw.trim();
    let names: Vec<String> = if raw.starts_with('[') {
        serde_json::from_str(raw).context("SUPPORTED_ENV is not a JSON array of names")?
    } else {
        raw.split(|c: char| c == ',' || c.is_whitespace())
            .map(|name| name.trim_matches(|c| c == '"' || c == '\'').to_string())
            .collect()
    };

    Ok(names
        .into_iter()
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect())
}

/// Endpoints and chain parameters for one run of the harness
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Consensus network selection
    pub network: NetworkSelection,
    /// Chain ID (298 for a local node)
    pub chain_id: u64,
    /// JSON-RPC relay URL
    pub rpc_url: String,
    /// Mirror node REST URL
    pub mirror_url: String,
    /// Fixed gas limit for token calls (relay estimates when unset)
    pub gas_limit: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::local()
    }
}

impl NetworkConfig {
    /// Local node: relay on 7546, mirror node on 5551, chain 298
    pub fn local() -> Self {
        Self::for_selection(NetworkSelection::Named(NamedNetwork::LocalNode))
    }

    /// Defaults derived from a network selection
    pub fn for_selection(network: NetworkSelection) -> Self {
        Self {
            chain_id: network.chain_id(),
            mirror_url: network.mirror_url().to_string(),
            rpc_url: LOCAL_RELAY_URL.to_string(),
            network,
            gas_limit: None,
        }
    }

    /// Read the configuration from the environment (and `.env`, if present)
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| dotenvy::var(name).ok())
    }

    /// Read the configuration through an arbitrary variable lookup
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let identifier = lookup("HEDERA_NETWORK").unwrap_or_else(|| "{}".to_string());
        let supported = match lookup("SUPPORTED_ENV") {
            Some(raw) => parse_supported_env(&raw)?,
            None => DEFAULT_SUPPORTED_ENV.iter().map(|s| s.to_string()).collect(),
        };

        let network = NetworkSelection::resolve(&identifier, &supported)
            .context("Failed to select network from HEDERA_NETWORK")?;
        let mut config = Self::for_selection(network);

        if let Some(rpc_url) = lookup("RELAY_URL") {
            config = config.with_rpc_url(rpc_url);
        }
        if let Some(mirror_url) = lookup("MIRROR_NODE_URL") {
            config = config.with_mirror_url(mirror_url);
        }
        if let Some(chain_id) = lookup("CHAIN_ID") {
            let chain_id = chain_id
                .trim()
                .parse()
                .with_context(|| format!("Invalid CHAIN_ID: {}", chain_id))?;
            config = config.with_chain_id(chain_id);
        }
        if let Some(gas_limit) = lookup("GAS_LIMIT") {
            let gas_limit = gas_limit
                .trim()
                .parse()
                .with_context(|| format!("Invalid GAS_LIMIT: {}", gas_limit))?;
            config = config.with_gas_limit(gas_limit);
        }

        Ok(config)
    }

    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    pub fn with_mirror_url(mut self, mirror_url: impl Into<String>) -> Self {
        self.mirror_url = mirror_url.into();
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_named_network_is_case_insensitive() {
        let config = NetworkConfig::from_vars(vars(&[
            ("HEDERA_NETWORK", "TestNet"),
            ("SUPPORTED_ENV", "mainnet,testnet,previewnet"),
        ]))
        .unwrap();

        assert_eq!(config.network, NetworkSelection::Named(NamedNetwork::Testnet));
        assert_eq!(config.chain_id, 296);
        assert_eq!(config.mirror_url, "https://testnet.mirrornode.hedera.com");
        assert_eq!(config.rpc_url, "http://localhost:7546");
    }

    #[test]
    fn test_custom_network_map() {
        let config = NetworkConfig::from_vars(vars(&[
            ("HEDERA_NETWORK", r#"{"127.0.0.1:50211":"0.0.3"}"#),
            ("SUPPORTED_ENV", r#"["mainnet","testnet"]"#),
            ("RELAY_URL", "http://relay:7546"),
            ("GAS_LIMIT", "400000"),
        ]))
        .unwrap();

        let mut nodes = BTreeMap::new();
        nodes.insert("127.0.0.1:50211".to_string(), AccountId::new(3));
        assert_eq!(config.network, NetworkSelection::Custom(nodes));
        assert_eq!(config.chain_id, 298);
        assert_eq!(config.mirror_url, "http://localhost:5551");
        assert_eq!(config.rpc_url, "http://relay:7546");
        assert_eq!(config.gas_limit, Some(400_000));
    }

    #[test]
    fn test_name_outside_supported_list_is_parsed_as_map() {
        // "testnet" is a known name but not supported here, so it must be a node map
        let result = NetworkConfig::from_vars(vars(&[
            ("HEDERA_NETWORK", "testnet"),
            ("SUPPORTED_ENV", "mainnet"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_unset_network_is_an_empty_map() {
        assert!(NetworkConfig::from_vars(vars(&[])).is_err());
    }

    #[test]
    fn test_default_supported_list_and_overrides() {
        let config = NetworkConfig::from_vars(vars(&[
            ("HEDERA_NETWORK", "local-node"),
            ("CHAIN_ID", "1298"),
            ("MIRROR_NODE_URL", "http://mirror:5551"),
        ]))
        .unwrap();

        assert_eq!(config.network, NetworkSelection::Named(NamedNetwork::LocalNode));
        assert_eq!(config.chain_id, 1298);
        assert_eq!(config.mirror_url, "http://mirror:5551");

        assert!(NetworkConfig::from_vars(vars(&[
            ("HEDERA_NETWORK", "local-node"),
            ("CHAIN_ID", "abc"),
        ]))
        .is_err());
    }

    #[test]
    fn test_parse_supported_env() {
        assert_eq!(
            parse_supported_env("mainnet, testnet  'previewnet'").unwrap(),
            vec!["mainnet", "testnet", "previewnet"]
        );
        assert_eq!(
            parse_supported_env(r#"["MAINNET","local-node"]"#).unwrap(),
            vec!["mainnet", "local-node"]
        );
        assert!(parse_supported_env("[not json").is_err());
    }

    #[test]
    fn test_local_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.chain_id, 298);
        assert_eq!(config.rpc_url, "http://localhost:7546");
        assert_eq!(config.mirror_url, "http://localhost:5551");
        assert_eq!(config.gas_limit, None);
    }
}
