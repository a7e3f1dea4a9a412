// App - block lifecycle around the router: begin, deliver, end, commit

use crate::app::{invariants, router, ChainState, FatalError, QueryHandle, TxResult};
use crate::gov::ProposalOutcome;
use crate::staking::{UnbondingEntry, ValidatorUpdate};
use crate::tx::Tx;
use crate::types::BlockHeader;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// What end of block changed, handed back to consensus
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndBlockResult {
    pub matured_unbondings: Vec<UnbondingEntry>,
    pub proposal_outcomes: Vec<ProposalOutcome>,
    pub validator_updates: Vec<ValidatorUpdate>,
}

/// Single writer over the working state. Readers go through a
/// `QueryHandle`, which only ever sees the last committed snapshot.
pub struct App {
    state: ChainState,
    current: Option<BlockHeader>,
    committed: Arc<RwLock<Arc<ChainState>>>,
}

impl App {
    pub fn new(state: ChainState) -> Self {
        let committed = Arc::new(RwLock::new(Arc::new(state.clone())));
        Self {
            state,
            current: None,
            committed,
        }
    }

    /// Working state, including effects of the open block
    pub fn state(&self) -> &ChainState {
        &self.state
    }

    pub fn current_block(&self) -> Option<&BlockHeader> {
        self.current.as_ref()
    }

    pub fn query_handle(&self) -> QueryHandle {
        QueryHandle::new(Arc::clone(&self.committed))
    }

    pub fn begin_block(&mut self, header: BlockHeader) -> Result<(), FatalError> {
        if let Some(open) = &self.current {
            return Err(FatalError::InvalidBlock(format!(
                "block {} is still open",
                open.height
            )));
        }
        let last = self.state.last_block;
        if header.height != last.height + 1 {
            return Err(FatalError::InvalidBlock(format!(
                "expected height {}, got {}",
                last.height + 1,
                header.height
            )));
        }
        if header.time < last.time {
            return Err(FatalError::InvalidBlock(format!(
                "block time {} is before {}",
                header.time, last.time
            )));
        }
        debug!(height = header.height, time = header.time, "begin block");
        self.current = Some(header);
        Ok(())
    }

    pub fn deliver_tx(&mut self, tx: &Tx) -> Result<TxResult, FatalError> {
        let block = self
            .current
            .ok_or_else(|| FatalError::InvalidBlock("no open block".to_string()))?;
        router::deliver_tx(&mut self.state, tx, &block)
    }

    /// Matured unbondings are paid before governance tallies, then the
    /// validator set is recomputed. Invariants run last when enabled.
    pub fn end_block(&mut self) -> Result<EndBlockResult, FatalError> {
        let block = self
            .current
            .ok_or_else(|| FatalError::InvalidBlock("no open block".to_string()))?;
        let state = &mut self.state;

        let matured_unbondings = state
            .staking
            .process_matured_unbondings(&mut state.ledger, block.time)?;
        let proposal_outcomes = state
            .gov
            .process_expired_proposals(&mut state.ledger, &state.staking, block.time)?;
        let validator_updates = state.staking.apply_validator_set(block.time);

        if state.config.check_invariants {
            invariants::check(state)?;
        }
        Ok(EndBlockResult {
            matured_unbondings,
            proposal_outcomes,
            validator_updates,
        })
    }

    /// Close the block and publish the new state to readers. Returns the
    /// app hash.
    pub fn commit(&mut self) -> Result<[u8; 32], FatalError> {
        let block = self
            .current
            .take()
            .ok_or_else(|| FatalError::InvalidBlock("no open block".to_string()))?;
        self.state.last_block = block;
        let snapshot = Arc::new(self.state.clone());
        let app_hash = snapshot.app_hash();
        {
            let mut committed = self
                .committed
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *committed = snapshot;
        }
        info!(height = block.height, app_hash = %hex::encode(app_hash), "committed block");
        Ok(app_hash)
    }

    /// Run one block holding `txs`, as the devnet CLI does
    pub fn apply_block(&mut self, header: BlockHeader, txs: &[Tx]) -> Result<(Vec<TxResult>, EndBlockResult), FatalError> {
        self.begin_block(header)?;
        let mut results = Vec::with_capacity(txs.len());
        for tx in txs {
            results.push(self.deliver_tx(tx)?);
        }
        let end = self.end_block()?;
        self.commit()?;
        Ok((results, end))
    }
}
