// ChainStore - persistent committed state and local keyring over sled
//
// Each state table lives under its own key prefix:
// - accounts by address
// - validators by owner
// - delegations by (delegator, validator)
// - unbonding entries by (completion time, id)
// - proposals by id
// - deposits and votes by (proposal id, address)
// plus one metadata record holding params, counters and the last block.

use crate::app::{AppConfig, ChainState};
use crate::gov::{Deposit, GovParams, Governance, Proposal, Vote};
use crate::identity::{Address, Keypair};
use crate::ledger::{Account, Ledger};
use crate::staking::{Delegation, Staking, StakingParams, UnbondingEntry, Validator};
use crate::types::{BlockHeader, Coins};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Key prefixes for organizing data
mod keys {
    pub const META: &[u8] = b"state:meta";
    pub const ACCOUNT: &[u8] = b"state:acct:";
    pub const VALIDATOR: &[u8] = b"state:val:";
    pub const DELEGATION: &[u8] = b"state:del:";
    pub const UNBONDING: &[u8] = b"state:ubd:";
    pub const PROPOSAL: &[u8] = b"state:prop:";
    pub const DEPOSIT: &[u8] = b"state:dep:";
    pub const VOTE: &[u8] = b"state:vote:";
    pub const STATE_PREFIX: &[u8] = b"state:";
    pub const KEYPAIR_PREFIX: &[u8] = b"keys:";

    /// Row tables by display name
    pub const TABLES: [(&str, &[u8]); 7] = [
        ("accounts", ACCOUNT),
        ("validators", VALIDATOR),
        ("delegations", DELEGATION),
        ("unbonding_entries", UNBONDING),
        ("proposals", PROPOSAL),
        ("deposits", DEPOSIT),
        ("votes", VOTE),
    ];
}

/// Errors from storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Flush failed: {0}")]
    FlushFailed(String),

    #[error("Key already exists: {0}")]
    KeyExists(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

/// Statistics about the storage
#[derive(Clone, Debug)]
pub struct StorageStats {
    pub key_count: usize,
    pub disk_size_bytes: u64,
}

/// Everything in `ChainState` that is not a table row
#[derive(Serialize, Deserialize)]
struct ChainMeta {
    chain_id: String,
    config: AppConfig,
    last_block: BlockHeader,
    supply: Coins,
    staking_params: StakingParams,
    next_unbonding_id: u64,
    last_powers: BTreeMap<Address, u64>,
    gov_params: GovParams,
    next_proposal_id: u64,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    postcard::to_allocvec(value).map_err(|e| StoreError::SerializationFailed(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    postcard::from_bytes(bytes).map_err(|e| StoreError::DeserializationFailed(e.to_string()))
}

fn key(prefix: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    let mut k = prefix.to_vec();
    for part in parts {
        k.extend_from_slice(part);
    }
    k
}

/// Persistent store for committed chain state
///
/// Uses sled for crash-safe, embedded storage. A commit replaces every
/// state table in one atomic batch.
pub struct ChainStore {
    db: sled::Db,
}

impl ChainStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::OpenFailed(e.to_string()))?;
        Ok(Self { db })
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        Ok(())
    }

    pub fn stats(&self) -> Result<StorageStats, StoreError> {
        Ok(StorageStats {
            key_count: self.db.len(),
            disk_size_bytes: self.db.size_on_disk().unwrap_or(0),
        })
    }

    // ========================================================================
    // RAW KEY-VALUE OPERATIONS
    // ========================================================================

    pub fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    pub fn list_keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut keys = Vec::new();
        for result in self.db.scan_prefix(prefix) {
            let (key, _) = result?;
            keys.push(key.to_vec());
        }
        Ok(keys)
    }

    /// Stored row count of each state table, in a fixed order
    pub fn table_counts(&self) -> Result<Vec<(&'static str, usize)>, StoreError> {
        let mut counts = Vec::with_capacity(keys::TABLES.len());
        for (name, prefix) in keys::TABLES {
            counts.push((name, self.list_keys_with_prefix(prefix)?.len()));
        }
        Ok(counts)
    }

    fn scan<T: DeserializeOwned>(&self, prefix: &[u8]) -> Result<Vec<T>, StoreError> {
        let mut rows = Vec::new();
        for result in self.db.scan_prefix(prefix) {
            let (_, value) = result?;
            rows.push(decode(&value)?);
        }
        Ok(rows)
    }

    // ========================================================================
    // CHAIN STATE PERSISTENCE
    // ========================================================================

    /// Replace the stored state with `state` atomically
    pub fn save_committed(&self, state: &ChainState) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        for result in self.db.scan_prefix(keys::STATE_PREFIX) {
            let (k, _) = result?;
            batch.remove(k);
        }

        let meta = ChainMeta {
            chain_id: state.chain_id.clone(),
            config: state.config.clone(),
            last_block: state.last_block,
            supply: state.ledger.total_supply().clone(),
            staking_params: state.staking.params().clone(),
            next_unbonding_id: state.staking.next_unbonding_id(),
            last_powers: state.staking.last_powers().clone(),
            gov_params: state.gov.params().clone(),
            next_proposal_id: state.gov.next_proposal_id(),
        };
        batch.insert(keys::META, encode(&meta)?);

        for a in state.ledger.accounts() {
            batch.insert(key(keys::ACCOUNT, &[a.address().as_bytes()]), a.to_bytes());
        }
        for v in state.staking.validators() {
            batch.insert(key(keys::VALIDATOR, &[v.owner().as_bytes()]), v.to_bytes());
        }
        for d in state.staking.delegations() {
            batch.insert(
                key(keys::DELEGATION, &[d.delegator.as_bytes(), d.validator.as_bytes()]),
                encode(d)?,
            );
        }
        for e in state.staking.unbonding_entries() {
            batch.insert(
                key(keys::UNBONDING, &[&e.completion_time.to_be_bytes(), &e.id.to_be_bytes()]),
                encode(e)?,
            );
        }
        for p in state.gov.proposals() {
            batch.insert(key(keys::PROPOSAL, &[&p.id.to_be_bytes()]), p.to_bytes());
        }
        for d in state.gov.deposits() {
            batch.insert(
                key(keys::DEPOSIT, &[&d.proposal_id.to_be_bytes(), d.depositor.as_bytes()]),
                encode(d)?,
            );
        }
        for v in state.gov.votes() {
            batch.insert(
                key(keys::VOTE, &[&v.proposal_id.to_be_bytes(), v.voter.as_bytes()]),
                v.to_bytes(),
            );
        }

        self.db.apply_batch(batch)?;
        self.flush()?;
        debug!(height = state.last_block.height, "state persisted");
        Ok(())
    }

    /// Load the last saved state, if any
    pub fn load_committed(&self) -> Result<Option<ChainState>, StoreError> {
        let Some(meta_bytes) = self.get_raw(keys::META)? else {
            return Ok(None);
        };
        let meta: ChainMeta = decode(&meta_bytes)?;

        let accounts: Vec<Account> = self.scan(keys::ACCOUNT)?;
        let validators: Vec<Validator> = self.scan(keys::VALIDATOR)?;
        let delegations: Vec<Delegation> = self.scan(keys::DELEGATION)?;
        let unbonding: Vec<UnbondingEntry> = self.scan(keys::UNBONDING)?;
        let proposals: Vec<Proposal> = self.scan(keys::PROPOSAL)?;
        let deposits: Vec<Deposit> = self.scan(keys::DEPOSIT)?;
        let votes: Vec<Vote> = self.scan(keys::VOTE)?;

        Ok(Some(ChainState {
            chain_id: meta.chain_id,
            config: meta.config,
            last_block: meta.last_block,
            ledger: Ledger::restore(accounts, meta.supply),
            staking: Staking::restore(
                meta.staking_params,
                validators,
                delegations,
                unbonding,
                meta.next_unbonding_id,
                meta.last_powers,
            ),
            gov: Governance::restore(meta.gov_params, proposals, meta.next_proposal_id, deposits, votes),
        }))
    }

    // ========================================================================
    // KEYRING
    // ========================================================================

    /// Save a keypair under a label. Refuses to overwrite an existing label.
    pub fn save_keypair_with_label(&self, keypair: &Keypair, label: &str) -> Result<(), StoreError> {
        let key = [keys::KEYPAIR_PREFIX, label.as_bytes()].concat();
        let inserted = self
            .db
            .compare_and_swap(key, None as Option<&[u8]>, Some(keypair.to_bytes()))?;
        if inserted.is_err() {
            return Err(StoreError::KeyExists(label.to_string()));
        }
        Ok(())
    }

    /// Load a keypair by label
    pub fn load_keypair_with_label(&self, label: &str) -> Result<Option<Keypair>, StoreError> {
        let key = [keys::KEYPAIR_PREFIX, label.as_bytes()].concat();
        match self.get_raw(&key)? {
            Some(bytes) => {
                let keypair = Keypair::from_bytes(&bytes)
                    .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
                Ok(Some(keypair))
            }
            None => Ok(None),
        }
    }

    /// All stored keys as (label, keypair), sorted by label
    pub fn list_keypairs(&self) -> Result<Vec<(String, Keypair)>, StoreError> {
        let mut out = Vec::new();
        for result in self.db.scan_prefix(keys::KEYPAIR_PREFIX) {
            let (k, v) = result?;
            let label = String::from_utf8_lossy(&k[keys::KEYPAIR_PREFIX.len()..]).into_owned();
            let keypair = Keypair::from_bytes(&v).map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
            out.push((label, keypair));
        }
        Ok(out)
    }
}
