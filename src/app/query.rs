use crate::app::{ChainState, QueryError};
use crate::gov::{Deposit, Proposal, ProposalFilter, Vote};
use crate::identity::Address;
use crate::ledger::Account;
use crate::staking::{Delegation, UnbondingEntry, Validator};
use crate::types::BlockHeader;
use std::sync::{Arc, RwLock};

/// Read-only access to the last committed state. Cheap to clone and safe
/// to share across threads; each call pins one snapshot for its duration.
#[derive(Clone, Debug)]
pub struct QueryHandle {
    committed: Arc<RwLock<Arc<ChainState>>>,
}

impl QueryHandle {
    pub(crate) fn new(committed: Arc<RwLock<Arc<ChainState>>>) -> Self {
        Self { committed }
    }

    /// The committed state as of the call. Holding it keeps that version
    /// alive even after later commits.
    pub fn snapshot(&self) -> Arc<ChainState> {
        let guard = self
            .committed
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    pub fn last_block(&self) -> BlockHeader {
        self.snapshot().last_block
    }

    pub fn app_hash(&self) -> [u8; 32] {
        self.snapshot().app_hash()
    }

    pub fn account(&self, address: &Address) -> Result<Account, QueryError> {
        self.snapshot()
            .ledger
            .account(address)
            .cloned()
            .ok_or_else(|| QueryError::AccountNotFound(address.to_string()))
    }

    pub fn validator(&self, owner: &Address) -> Result<Validator, QueryError> {
        self.snapshot()
            .staking
            .validator(owner)
            .cloned()
            .ok_or_else(|| QueryError::ValidatorNotFound(owner.to_string()))
    }

    pub fn validators(&self) -> Vec<Validator> {
        self.snapshot().staking.validators().cloned().collect()
    }

    pub fn delegation(&self, delegator: &Address, validator: &Address) -> Result<Delegation, QueryError> {
        self.snapshot()
            .staking
            .delegation(delegator, validator)
            .cloned()
            .ok_or_else(|| QueryError::DelegationNotFound(format!("{delegator} -> {validator}")))
    }

    pub fn delegations_of(&self, delegator: &Address) -> Vec<Delegation> {
        self.snapshot().staking.delegations_of(delegator).cloned().collect()
    }

    pub fn unbonding_entries_of(&self, delegator: &Address) -> Vec<UnbondingEntry> {
        self.snapshot()
            .staking
            .unbonding_entries_of(delegator)
            .cloned()
            .collect()
    }

    pub fn proposal(&self, id: u64) -> Result<Proposal, QueryError> {
        self.snapshot()
            .gov
            .proposal(id)
            .cloned()
            .ok_or(QueryError::ProposalNotFound(id))
    }

    pub fn proposals(&self, filter: &ProposalFilter) -> Vec<Proposal> {
        self.snapshot()
            .gov
            .filter_proposals(filter)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Textual listing, or "No matching proposals found"
    pub fn list_proposals(&self, filter: &ProposalFilter) -> String {
        self.snapshot().gov.list_proposals(filter)
    }

    pub fn vote(&self, proposal_id: u64, voter: &Address) -> Result<Vote, QueryError> {
        let snapshot = self.snapshot();
        snapshot
            .gov
            .proposal(proposal_id)
            .ok_or(QueryError::ProposalNotFound(proposal_id))?;
        snapshot
            .gov
            .vote_record(proposal_id, voter)
            .cloned()
            .ok_or_else(|| QueryError::VoteNotFound(proposal_id, voter.to_string()))
    }

    pub fn votes(&self, proposal_id: u64) -> Result<Vec<Vote>, QueryError> {
        let snapshot = self.snapshot();
        snapshot
            .gov
            .proposal(proposal_id)
            .ok_or(QueryError::ProposalNotFound(proposal_id))?;
        Ok(snapshot.gov.votes_of(proposal_id).cloned().collect())
    }

    pub fn deposit(&self, proposal_id: u64, depositor: &Address) -> Result<Deposit, QueryError> {
        let snapshot = self.snapshot();
        snapshot
            .gov
            .proposal(proposal_id)
            .ok_or(QueryError::ProposalNotFound(proposal_id))?;
        snapshot
            .gov
            .deposit_record(proposal_id, depositor)
            .cloned()
            .ok_or_else(|| QueryError::DepositNotFound(proposal_id, depositor.to_string()))
    }

    pub fn deposits(&self, proposal_id: u64) -> Result<Vec<Deposit>, QueryError> {
        let snapshot = self.snapshot();
        snapshot
            .gov
            .proposal(proposal_id)
            .ok_or(QueryError::ProposalNotFound(proposal_id))?;
        Ok(snapshot.gov.deposits_of(proposal_id).cloned().collect())
    }
}
