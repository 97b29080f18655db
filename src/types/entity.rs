//! `shard.realm.num` entity identifiers and their long-zero EVM address form

use alloy::primitives::Address;
use eyre::{ensure, Context, Report, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ledger entity identifier (account, token, node)
///
/// The EVM ("solidity") form packs the three parts big-endian into 20 bytes:
/// 4 bytes of shard, 8 bytes of realm, 8 bytes of entity number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    pub shard: u32,
    pub realm: u64,
    pub num: u64,
}

/// Account identifier
pub type AccountId = EntityId;

/// Token identifier
pub type TokenId = EntityId;

impl EntityId {
    /// Entity in shard 0, realm 0
    pub const fn new(num: u64) -> Self {
        Self {
            shard: 0,
            realm: 0,
            num,
        }
    }

    /// Create an identifier with explicit shard and realm
    pub const fn with_shard_realm(shard: u32, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }

    /// Long-zero EVM address of this entity
    pub fn to_solidity_address(&self) -> Address {
        let mut bytes = [0u8; 20];
        bytes[..4].copy_from_slice(&self.shard.to_be_bytes());
        bytes[4..12].copy_from_slice(&self.realm.to_be_bytes());
        bytes[12..].copy_from_slice(&self.num.to_be_bytes());
        Address::from(bytes)
    }

    /// Decode a long-zero EVM address back into an entity identifier
    pub fn from_solidity_address(address: Address) -> Self {
        let bytes = address.as_slice();
        let mut shard = [0u8; 4];
        let mut realm = [0u8; 8];
        let mut num = [0u8; 8];
        shard.copy_from_slice(&bytes[..4]);
        realm.copy_from_slice(&bytes[4..12]);
        num.copy_from_slice(&bytes[12..]);
        Self {
            shard: u32::from_be_bytes(shard),
            realm: u64::from_be_bytes(realm),
            num: u64::from_be_bytes(num),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl FromStr for EntityId {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        ensure!(
            parts.len() == 3,
            "Entity id must look like shard.realm.num, got {:?}",
            s
        );

        let shard = parts[0]
            .parse()
            .with_context(|| format!("Invalid shard in {:?}", s))?;
        let realm = parts[1]
            .parse()
            .with_context(|| format!("Invalid realm in {:?}", s))?;
        let num = parts[2]
            .parse()
            .with_context(|| format!("Invalid entity number in {:?}", s))?;

        Ok(Self { shard, realm, num })
    }
}

impl TryFrom<String> for EntityId {
    type Error = Report;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> String {
        id.to_string()
    }
}
