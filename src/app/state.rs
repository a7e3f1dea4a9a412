use crate::app::AppConfig;
use crate::gov::Governance;
use crate::ledger::Ledger;
use crate::staking::Staking;
use crate::types::BlockHeader;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Everything the state machine owns. Handlers receive it (or one of its
/// modules) by reference; nothing lives in globals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    pub chain_id: String,
    pub config: AppConfig,
    /// Last committed block; height 0 is genesis
    pub last_block: BlockHeader,
    pub ledger: Ledger,
    pub staking: Staking,
    pub gov: Governance,
}

impl ChainState {
    pub fn new(chain_id: &str, config: AppConfig, genesis_time: u64, staking: Staking, gov: Governance) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            config,
            last_block: BlockHeader::new(0, genesis_time),
            ledger: Ledger::new(),
            staking,
            gov,
        }
    }

    pub fn height(&self) -> u64 {
        self.last_block.height
    }

    /// Canonical encoding. Every table is a BTreeMap, so equal states encode
    /// to equal bytes on every replica.
    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    /// SHA-256 of the canonical encoding
    pub fn app_hash(&self) -> [u8; 32] {
        Sha256::digest(self.to_bytes()).into()
    }
}
