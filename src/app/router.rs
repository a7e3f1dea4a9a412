// Router - authenticates a transaction and dispatches its messages under
// an all-or-nothing boundary

use crate::app::{ChainState, FatalError};
use crate::gov::{ProposalContent, VoteOption};
use crate::identity::{Address, ModuleAccount};
use crate::ledger::LedgerError;
use crate::tx::{Msg, Tx, TxError};
use crate::types::{BlockHeader, Coins, Event};
use tracing::{debug, warn};

/// Result reported back to consensus for one transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxResult {
    pub outcome: Result<(), TxError>,
    pub events: Vec<Event>,
    pub sequence_advanced: bool,
    pub fee_charged: bool,
}

impl TxResult {
    fn rejected(err: TxError) -> Self {
        Self {
            outcome: Err(err),
            events: Vec::new(),
            sequence_advanced: false,
            fee_charged: false,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// "OK" or the stable error kind
    pub fn code(&self) -> &'static str {
        match &self.outcome {
            Ok(()) => "OK",
            Err(e) => e.code(),
        }
    }

    pub fn error(&self) -> Option<&TxError> {
        self.outcome.as_ref().err()
    }
}

/// Read-only checks that gate every transaction. Nothing is charged or
/// advanced if one of these fails.
fn ante_check(state: &ChainState, tx: &Tx) -> Result<Address, TxError> {
    let body = tx.body();
    if body.chain_id != state.chain_id {
        return Err(TxError::WrongChainId {
            expected: state.chain_id.clone(),
            got: body.chain_id.clone(),
        });
    }
    if body.msgs.is_empty() {
        return Err(TxError::EmptyTransaction);
    }
    if body.memo.len() > crate::tx::MAX_MEMO_LEN {
        return Err(TxError::MemoTooLong(body.memo.len()));
    }
    body.fee
        .validate()
        .map_err(|e| TxError::InvalidDenom(e.to_string()))?;

    let signer = tx.signer_address();
    for msg in &body.msgs {
        msg.validate_basic()?;
        if msg.signer() != &signer {
            return Err(TxError::Unauthorized {
                tx_signer: signer,
                msg_signer: *msg.signer(),
            });
        }
    }
    if !tx.verify_signature() {
        return Err(TxError::InvalidSignature);
    }

    state.ledger.check_sequence(&signer, body.sequence)?;
    let available = state.ledger.balances(&signer);
    if !available.is_all_gte(&body.fee) {
        return Err(LedgerError::InsufficientFunds {
            address: signer,
            available,
            required: body.fee.clone(),
        }
        .into());
    }
    Ok(signer)
}

fn advance_sequence(state: &mut ChainState, tx: &Tx, signer: &Address) -> Result<u64, LedgerError> {
    let seq = state.ledger.check_and_increment_sequence(signer, tx.sequence())?;
    state.ledger.set_pub_key_if_missing(signer, *tx.signer());
    Ok(seq)
}

fn charge_fee(state: &mut ChainState, signer: &Address, fee: &Coins) -> Result<(), LedgerError> {
    state
        .ledger
        .transfer(signer, &ModuleAccount::FeeCollector.address(), fee)
}

/// Apply one transaction. Message effects are staged on a scratch copy of
/// the state and swapped in only if every message succeeds. On message
/// failure the tx policy decides whether the fee and sequence still apply.
/// The error side is reserved for conditions that cannot happen unless the
/// state machine itself is broken.
pub fn deliver_tx(state: &mut ChainState, tx: &Tx, block: &BlockHeader) -> Result<TxResult, FatalError> {
    let signer = match ante_check(state, tx) {
        Ok(signer) => signer,
        Err(e) => {
            warn!(code = e.code(), error = %e, "transaction rejected");
            return Ok(TxResult::rejected(e));
        }
    };

    let mut scratch = state.clone();
    match stage(&mut scratch, tx, &signer, block) {
        Ok(events) => {
            *state = scratch;
            debug!(signer = %signer, msgs = tx.msgs().len(), "transaction applied");
            Ok(TxResult {
                outcome: Ok(()),
                events,
                sequence_advanced: true,
                fee_charged: !tx.fee().is_zero(),
            })
        }
        Err(e) => {
            let policy = state.config.tx_policy.clone();
            let mut result = TxResult::rejected(e);
            if policy.charge_fee_on_failure {
                charge_fee(state, &signer, tx.fee())?;
                result.fee_charged = !tx.fee().is_zero();
            }
            if policy.advance_sequence_on_failure {
                advance_sequence(state, tx, &signer)?;
                result.sequence_advanced = true;
            }
            if let Err(e) = &result.outcome {
                warn!(signer = %signer, code = e.code(), error = %e, "transaction failed");
            }
            Ok(result)
        }
    }
}

fn stage(scratch: &mut ChainState, tx: &Tx, signer: &Address, block: &BlockHeader) -> Result<Vec<Event>, TxError> {
    advance_sequence(scratch, tx, signer)?;
    charge_fee(scratch, signer, tx.fee())?;
    let mut events = Vec::new();
    for msg in tx.msgs() {
        events.extend(handle_msg(scratch, msg, block)?);
    }
    Ok(events)
}

/// Dispatch table: message variant to owning module handler
fn handle_msg(state: &mut ChainState, msg: &Msg, block: &BlockHeader) -> Result<Vec<Event>, TxError> {
    let event = Event::new(msg.kind());
    let event = match msg {
        Msg::Send { from, to, amount, memo } => {
            state.ledger.transfer(from, to, amount)?;
            let event = event
                .attr("sender", from)
                .attr("recipient", to)
                .attr("amount", amount);
            match memo {
                Some(memo) => event.attr("memo", memo),
                None => event,
            }
        }
        Msg::CreateValidator {
            owner,
            consensus_pubkey,
            self_bond,
            moniker,
        } => {
            let shares = state.staking.create_validator(
                &mut state.ledger,
                *owner,
                *consensus_pubkey,
                self_bond,
                moniker,
            )?;
            event
                .attr("validator", owner)
                .attr("moniker", moniker)
                .attr("shares", shares)
        }
        Msg::Delegate {
            delegator,
            validator,
            amount,
        } => {
            let shares = state
                .staking
                .delegate(&mut state.ledger, *delegator, *validator, amount)?;
            event
                .attr("delegator", delegator)
                .attr("validator", validator)
                .attr("amount", amount)
                .attr("shares", shares)
        }
        Msg::BeginUnbond {
            delegator,
            validator,
            shares,
        } => {
            let entry = state
                .staking
                .begin_unbond(*delegator, *validator, *shares, block)?;
            event
                .attr("delegator", delegator)
                .attr("validator", validator)
                .attr("shares", shares)
                .attr("balance", entry.balance)
                .attr("completion_time", entry.completion_time)
        }
        Msg::SubmitProposal {
            proposer,
            title,
            description,
            proposal_type,
            initial_deposit,
        } => {
            let content = ProposalContent {
                title: title.clone(),
                description: description.clone(),
                proposal_type: *proposal_type,
            };
            let id = state
                .gov
                .submit_proposal(&mut state.ledger, *proposer, content, initial_deposit, block.time)?;
            event
                .attr("proposal_id", id)
                .attr("proposer", proposer)
                .attr("deposit", initial_deposit)
        }
        Msg::Deposit {
            depositor,
            proposal_id,
            amount,
        } => {
            let voting_started = state
                .gov
                .deposit(&mut state.ledger, *depositor, *proposal_id, amount, block.time)?;
            event
                .attr("proposal_id", proposal_id)
                .attr("depositor", depositor)
                .attr("amount", amount)
                .attr("voting_period_start", voting_started)
        }
        Msg::Vote {
            voter,
            proposal_id,
            option,
        } => {
            let option = VoteOption::try_from(*option)?;
            state.gov.vote(*voter, *proposal_id, option, block.time)?;
            event
                .attr("proposal_id", proposal_id)
                .attr("voter", voter)
                .attr("option", option)
        }
    };
    Ok(vec![event])
}
