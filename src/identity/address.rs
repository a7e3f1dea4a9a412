use crate::identity::PublicKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const ADDRESS_PREFIX: &str = "rune1";
pub const ADDRESS_LEN: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid address format: {0}")]
    InvalidFormat(String),

    #[error("Invalid base58 encoding: {0}")]
    InvalidBase58(String),

    #[error("Invalid address length: expected {ADDRESS_LEN}, got {0}")]
    InvalidLength(usize),
}

/// Account address: the first 20 bytes of SHA-256 over the account public key,
/// rendered as `rune1<base58>`.
///
/// Ordering is bytewise, which is what every deterministic iteration in the
/// state machine relies on.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(public_key.as_bytes());
        Self::from_digest(&hasher.finalize())
    }

    /// Address of an account owned by a module rather than a key holder
    pub fn for_module(name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"module:");
        hasher.update(name.as_bytes());
        Self::from_digest(&hasher.finalize())
    }

    fn from_digest(digest: &[u8]) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[..ADDRESS_LEN]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let body = s
            .strip_prefix(ADDRESS_PREFIX)
            .ok_or_else(|| AddressError::InvalidFormat(format!("expected '{ADDRESS_PREFIX}' prefix")))?;
        if body.is_empty() {
            return Err(AddressError::InvalidFormat("empty address body".into()));
        }
        let bytes = bs58::decode(body)
            .into_vec()
            .map_err(|e| AddressError::InvalidBase58(e.to_string()))?;
        let arr: [u8; ADDRESS_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ADDRESS_PREFIX, bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Address::parse(&s).map_err(serde::de::Error::custom)
        } else {
            Ok(Self(<[u8; ADDRESS_LEN]>::deserialize(deserializer)?))
        }
    }
}

/// Accounts that hold escrowed coins on behalf of a module
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleAccount {
    /// Coins backing validator tokens and pending unbondings
    BondedPool,
    /// Proposal deposits held in escrow
    GovDeposits,
    /// Transaction fees
    FeeCollector,
    /// Forfeited proposal deposits
    CommunityPool,
}

impl ModuleAccount {
    pub const ALL: [ModuleAccount; 4] = [
        ModuleAccount::BondedPool,
        ModuleAccount::GovDeposits,
        ModuleAccount::FeeCollector,
        ModuleAccount::CommunityPool,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModuleAccount::BondedPool => "bonded_pool",
            ModuleAccount::GovDeposits => "gov_deposits",
            ModuleAccount::FeeCollector => "fee_collector",
            ModuleAccount::CommunityPool => "community_pool",
        }
    }

    pub fn address(&self) -> Address {
        Address::for_module(self.name())
    }

    /// The module owning `address`, if any
    pub fn from_address(address: &Address) -> Option<ModuleAccount> {
        Self::ALL.into_iter().find(|m| m.address() == *address)
    }
}
