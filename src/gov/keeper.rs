// Governance - proposal registry, deposit escrow and stake-weighted tallying

use crate::gov::{Deposit, Proposal, ProposalStatus, ProposalType, TallyResult, Vote, VoteOption};
use crate::identity::{Address, ModuleAccount, ADDRESS_LEN};
use crate::ledger::{Ledger, LedgerError};
use crate::staking::Staking;
use crate::types::{Coins, Rational};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;
use thiserror::Error;
use tracing::info;

pub const MAX_TITLE_LEN: usize = 140;
pub const MAX_DESCRIPTION_LEN: usize = 5000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GovError {
    #[error("Proposal not found: {0}")]
    ProposalNotFound(u64),

    #[error("Deposit too late: proposal {0} is no longer accepting deposits")]
    DepositTooLate(u64),

    #[error("Vote outside voting period: proposal {0}")]
    VoteOutsideVotingPeriod(u64),

    #[error("Invalid vote option: {0}")]
    InvalidOption(String),

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Invalid proposal type: {0}")]
    InvalidProposalType(String),

    #[error("Invalid proposal status: {0}")]
    InvalidProposalStatus(String),

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Arithmetic overflow in tally")]
    ArithmeticOverflow,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// What happens to escrowed deposits when a proposal does not succeed.
/// Forfeited coins go to the community pool; nothing is destroyed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositPolicy {
    /// Deposit period elapsed without reaching the minimum deposit
    pub forfeit_on_deposit_expiry: bool,
    /// Voting ended without quorum
    pub forfeit_on_no_quorum: bool,
    /// Voting ended with the veto cap exceeded
    pub forfeit_on_veto: bool,
}

impl Default for DepositPolicy {
    fn default() -> Self {
        Self {
            forfeit_on_deposit_expiry: true,
            forfeit_on_no_quorum: true,
            forfeit_on_veto: true,
        }
    }
}

/// Governance parameters, fixed at genesis
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovParams {
    pub min_deposit: Coins,
    pub max_deposit_period_secs: u64,
    pub voting_period_secs: u64,
    /// Share of bonded stake that must vote
    pub quorum: Rational,
    /// Yes share of non-abstain votes that must be exceeded
    pub threshold: Rational,
    /// NoWithVeto share of all votes above which the proposal is rejected
    pub veto: Rational,
    pub deposit_policy: DepositPolicy,
}

impl Default for GovParams {
    fn default() -> Self {
        Self {
            min_deposit: Coins::single(5_000_000_000, "RUNE"),
            max_deposit_period_secs: 2 * 24 * 60 * 60,
            voting_period_secs: 2 * 24 * 60 * 60,
            quorum: Rational::new(1, 3).unwrap_or(Rational::ZERO),
            threshold: Rational::new(1, 2).unwrap_or(Rational::ZERO),
            veto: Rational::new(1, 3).unwrap_or(Rational::ZERO),
            deposit_policy: DepositPolicy::default(),
        }
    }
}

impl GovParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_deposit(mut self, min_deposit: Coins) -> Self {
        self.min_deposit = min_deposit;
        self
    }

    pub fn with_max_deposit_period(mut self, secs: u64) -> Self {
        self.max_deposit_period_secs = secs;
        self
    }

    pub fn with_voting_period(mut self, secs: u64) -> Self {
        self.voting_period_secs = secs;
        self
    }

    pub fn with_quorum(mut self, quorum: Rational) -> Self {
        self.quorum = quorum;
        self
    }

    pub fn with_threshold(mut self, threshold: Rational) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_veto(mut self, veto: Rational) -> Self {
        self.veto = veto;
        self
    }

    pub fn with_deposit_policy(mut self, policy: DepositPolicy) -> Self {
        self.deposit_policy = policy;
        self
    }
}

/// Title, description and type of a new proposal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalContent {
    pub title: String,
    pub description: String,
    pub proposal_type: ProposalType,
}

impl ProposalContent {
    pub fn validate(&self) -> Result<(), GovError> {
        if self.title.trim().is_empty() {
            return Err(GovError::InvalidProposal("title cannot be empty".into()));
        }
        if self.title.len() > MAX_TITLE_LEN {
            return Err(GovError::InvalidProposal(format!(
                "title longer than {MAX_TITLE_LEN} bytes"
            )));
        }
        if self.description.len() > MAX_DESCRIPTION_LEN {
            return Err(GovError::InvalidProposal(format!(
                "description longer than {MAX_DESCRIPTION_LEN} bytes"
            )));
        }
        Ok(())
    }
}

/// How a proposal left its active phase at end of block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalOutcome {
    pub proposal_id: u64,
    pub status: ProposalStatus,
    pub tally: Option<TallyResult>,
    pub quorum_reached: bool,
    pub vetoed: bool,
    pub deposits_refunded: bool,
}

fn proposal_range(proposal_id: u64) -> RangeInclusive<(u64, Address)> {
    (proposal_id, Address::from_bytes([0u8; ADDRESS_LEN]))
        ..=(proposal_id, Address::from_bytes([0xffu8; ADDRESS_LEN]))
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Governance {
    params: GovParams,
    proposals: BTreeMap<u64, Proposal>,
    next_proposal_id: u64,
    /// Keyed by (proposal id, depositor)
    deposits: BTreeMap<(u64, Address), Deposit>,
    /// Keyed by (proposal id, voter)
    votes: BTreeMap<(u64, Address), Vote>,
    /// Proposals in DepositPeriod keyed by (deposit end, id)
    deposit_queue: BTreeSet<(u64, u64)>,
    /// Proposals in VotingPeriod keyed by (voting end, id)
    voting_queue: BTreeSet<(u64, u64)>,
}

impl Governance {
    pub fn new(params: GovParams) -> Self {
        Self {
            params,
            next_proposal_id: 1,
            ..Default::default()
        }
    }

    pub fn params(&self) -> &GovParams {
        &self.params
    }

    // ========================================================================
    // MESSAGE HANDLERS
    // ========================================================================

    /// Create a proposal and escrow its initial deposit. Returns the new id.
    pub fn submit_proposal(
        &mut self,
        ledger: &mut Ledger,
        proposer: Address,
        content: ProposalContent,
        initial_deposit: &Coins,
        now: u64,
    ) -> Result<u64, GovError> {
        content.validate()?;
        let deposit_end_time = now
            .checked_add(self.params.max_deposit_period_secs)
            .ok_or(GovError::ArithmeticOverflow)?;

        ledger.transfer(&proposer, &ModuleAccount::GovDeposits.address(), initial_deposit)?;

        let id = self.next_proposal_id;
        self.next_proposal_id += 1;
        let proposal = Proposal {
            id,
            proposer,
            title: content.title,
            description: content.description,
            proposal_type: content.proposal_type,
            status: ProposalStatus::DepositPeriod,
            total_deposit: initial_deposit.clone(),
            submit_time: now,
            deposit_end_time,
            voting_start_time: None,
            voting_end_time: None,
            final_tally: None,
        };
        self.proposals.insert(id, proposal);
        if !initial_deposit.is_zero() {
            self.deposits.insert(
                (id, proposer),
                Deposit {
                    proposal_id: id,
                    depositor: proposer,
                    amount: initial_deposit.clone(),
                },
            );
        }

        if initial_deposit.is_all_gte(&self.params.min_deposit) {
            self.start_voting(id, now)?;
        } else {
            self.deposit_queue.insert((deposit_end_time, id));
        }
        Ok(id)
    }

    /// Add to a proposal's escrow. Returns true if this deposit opened voting.
    pub fn deposit(
        &mut self,
        ledger: &mut Ledger,
        depositor: Address,
        proposal_id: u64,
        amount: &Coins,
        now: u64,
    ) -> Result<bool, GovError> {
        let proposal = self
            .proposals
            .get(&proposal_id)
            .ok_or(GovError::ProposalNotFound(proposal_id))?;
        if proposal.status != ProposalStatus::DepositPeriod || now >= proposal.deposit_end_time {
            return Err(GovError::DepositTooLate(proposal_id));
        }
        if amount.is_zero() {
            return Err(GovError::InvalidAmount);
        }
        let total = proposal
            .total_deposit
            .checked_add(amount)
            .ok_or(GovError::ArithmeticOverflow)?;
        let key = (proposal_id, depositor);
        let deposited = self
            .deposits
            .get(&key)
            .map(|d| d.amount.clone())
            .unwrap_or_default()
            .checked_add(amount)
            .ok_or(GovError::ArithmeticOverflow)?;

        ledger.transfer(&depositor, &ModuleAccount::GovDeposits.address(), amount)?;

        let deposit_end = proposal.deposit_end_time;
        if let Some(p) = self.proposals.get_mut(&proposal_id) {
            p.total_deposit = total.clone();
        }
        self.deposits.insert(
            key,
            Deposit {
                proposal_id,
                depositor,
                amount: deposited,
            },
        );

        if total.is_all_gte(&self.params.min_deposit) {
            self.deposit_queue.remove(&(deposit_end, proposal_id));
            self.start_voting(proposal_id, now)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn start_voting(&mut self, proposal_id: u64, now: u64) -> Result<(), GovError> {
        let voting_end = now
            .checked_add(self.params.voting_period_secs)
            .ok_or(GovError::ArithmeticOverflow)?;
        let proposal = self
            .proposals
            .get_mut(&proposal_id)
            .ok_or(GovError::ProposalNotFound(proposal_id))?;
        proposal.status = ProposalStatus::VotingPeriod;
        proposal.voting_start_time = Some(now);
        proposal.voting_end_time = Some(voting_end);
        self.voting_queue.insert((voting_end, proposal_id));
        Ok(())
    }

    /// Record or overwrite a vote while the proposal is in its voting period
    pub fn vote(&mut self, voter: Address, proposal_id: u64, option: VoteOption, now: u64) -> Result<(), GovError> {
        let proposal = self
            .proposals
            .get(&proposal_id)
            .ok_or(GovError::ProposalNotFound(proposal_id))?;
        let open = proposal.status == ProposalStatus::VotingPeriod
            && proposal.voting_end_time.is_some_and(|end| now < end);
        if !open {
            return Err(GovError::VoteOutsideVotingPeriod(proposal_id));
        }
        self.votes.insert(
            (proposal_id, voter),
            Vote {
                proposal_id,
                voter,
                option,
            },
        );
        Ok(())
    }

    // ========================================================================
    // BLOCK HOOKS
    // ========================================================================

    /// Fail proposals whose deposit period elapsed, then tally proposals whose
    /// voting period elapsed. Each queue drains in (deadline, id) order.
    /// Ledger errors here mean the escrow is short and are fatal to the caller.
    pub fn process_expired_proposals(
        &mut self,
        ledger: &mut Ledger,
        staking: &Staking,
        now: u64,
    ) -> Result<Vec<ProposalOutcome>, GovError> {
        let mut outcomes = Vec::new();

        let expired: Vec<(u64, u64)> = self
            .deposit_queue
            .range(..=(now, u64::MAX))
            .copied()
            .collect();
        for key in expired {
            self.deposit_queue.remove(&key);
            let id = key.1;
            self.set_status(id, ProposalStatus::Failed)?;
            let refund = !self.params.deposit_policy.forfeit_on_deposit_expiry;
            self.settle_deposits(ledger, id, refund)?;
            info!(proposal = id, refunded = refund, "proposal failed to reach minimum deposit");
            outcomes.push(ProposalOutcome {
                proposal_id: id,
                status: ProposalStatus::Failed,
                tally: None,
                quorum_reached: false,
                vetoed: false,
                deposits_refunded: refund,
            });
        }

        let ended: Vec<(u64, u64)> = self
            .voting_queue
            .range(..=(now, u64::MAX))
            .copied()
            .collect();
        for key in ended {
            self.voting_queue.remove(&key);
            let id = key.1;
            let mut outcome = self.tally(staking, id)?;
            let policy = &self.params.deposit_policy;
            let forfeit = outcome.status == ProposalStatus::Rejected
                && ((!outcome.quorum_reached && policy.forfeit_on_no_quorum)
                    || (outcome.vetoed && policy.forfeit_on_veto));
            outcome.deposits_refunded = !forfeit;

            self.set_status(id, outcome.status)?;
            if let Some(p) = self.proposals.get_mut(&id) {
                p.final_tally = outcome.tally.clone();
            }
            self.settle_deposits(ledger, id, !forfeit)?;
            info!(proposal = id, status = %outcome.status, refunded = !forfeit, "proposal tallied");
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    fn set_status(&mut self, proposal_id: u64, status: ProposalStatus) -> Result<(), GovError> {
        let proposal = self
            .proposals
            .get_mut(&proposal_id)
            .ok_or(GovError::ProposalNotFound(proposal_id))?;
        proposal.status = status;
        Ok(())
    }

    /// Refund each depositor, or sweep the escrow to the community pool.
    /// Deposit records are removed either way.
    fn settle_deposits(&mut self, ledger: &mut Ledger, proposal_id: u64, refund: bool) -> Result<(), GovError> {
        let escrow = ModuleAccount::GovDeposits.address();
        let keys: Vec<(u64, Address)> = self
            .deposits
            .range(proposal_range(proposal_id))
            .map(|(k, _)| *k)
            .collect();
        for key in keys {
            if let Some(deposit) = self.deposits.remove(&key) {
                let to = if refund {
                    deposit.depositor
                } else {
                    ModuleAccount::CommunityPool.address()
                };
                ledger.transfer(&escrow, &to, &deposit.amount)?;
            }
        }
        Ok(())
    }

    /// Stake-weighted tally of a proposal's votes against the current bonded set
    pub fn tally(&self, staking: &Staking, proposal_id: u64) -> Result<ProposalOutcome, GovError> {
        let mut tally = TallyResult::default();
        for (_, vote) in self.votes.range(proposal_range(proposal_id)) {
            let power = staking
                .voting_power(&vote.voter)
                .ok_or(GovError::ArithmeticOverflow)?;
            tally
                .add(vote.option, &power)
                .ok_or(GovError::ArithmeticOverflow)?;
        }

        let total_bonded = staking
            .total_bonded_tokens()
            .ok_or(GovError::ArithmeticOverflow)?;
        let cast = tally.total().ok_or(GovError::ArithmeticOverflow)?;
        let non_abstain = tally.total_non_abstain().ok_or(GovError::ArithmeticOverflow)?;

        let quorum_reached = match cast.checked_div(&total_bonded) {
            Some(turnout) => !cast.is_zero() && turnout >= self.params.quorum,
            None => false,
        };
        let vetoed = quorum_reached
            && tally
                .no_with_veto
                .checked_div(&cast)
                .is_some_and(|ratio| ratio > self.params.veto);
        let passed = quorum_reached
            && !vetoed
            && tally
                .yes
                .checked_div(&non_abstain)
                .is_some_and(|ratio| ratio > self.params.threshold);

        Ok(ProposalOutcome {
            proposal_id,
            status: if passed {
                ProposalStatus::Passed
            } else {
                ProposalStatus::Rejected
            },
            tally: Some(tally),
            quorum_reached,
            vetoed,
            deposits_refunded: false,
        })
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn proposal(&self, id: u64) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    pub fn proposals(&self) -> impl DoubleEndedIterator<Item = &Proposal> {
        self.proposals.values()
    }

    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }

    pub fn next_proposal_id(&self) -> u64 {
        self.next_proposal_id
    }

    pub fn deposit_record(&self, proposal_id: u64, depositor: &Address) -> Option<&Deposit> {
        self.deposits.get(&(proposal_id, *depositor))
    }

    pub fn deposits_of(&self, proposal_id: u64) -> impl Iterator<Item = &Deposit> {
        self.deposits.range(proposal_range(proposal_id)).map(|(_, d)| d)
    }

    pub fn deposits(&self) -> impl Iterator<Item = &Deposit> {
        self.deposits.values()
    }

    pub fn vote_record(&self, proposal_id: u64, voter: &Address) -> Option<&Vote> {
        self.votes.get(&(proposal_id, *voter))
    }

    pub fn votes_of(&self, proposal_id: u64) -> impl Iterator<Item = &Vote> {
        self.votes.range(proposal_range(proposal_id)).map(|(_, v)| v)
    }

    pub fn votes(&self) -> impl Iterator<Item = &Vote> {
        self.votes.values()
    }

    pub(crate) fn restore(
        params: GovParams,
        proposals: Vec<Proposal>,
        next_proposal_id: u64,
        deposits: Vec<Deposit>,
        votes: Vec<Vote>,
    ) -> Self {
        let mut deposit_queue = BTreeSet::new();
        let mut voting_queue = BTreeSet::new();
        for p in &proposals {
            match (p.status, p.voting_end_time) {
                (ProposalStatus::DepositPeriod, _) => {
                    deposit_queue.insert((p.deposit_end_time, p.id));
                }
                (ProposalStatus::VotingPeriod, Some(end)) => {
                    voting_queue.insert((end, p.id));
                }
                _ => {}
            }
        }
        Self {
            params,
            proposals: proposals.into_iter().map(|p| (p.id, p)).collect(),
            next_proposal_id,
            deposits: deposits
                .into_iter()
                .map(|d| ((d.proposal_id, d.depositor), d))
                .collect(),
            votes: votes
                .into_iter()
                .map(|v| ((v.proposal_id, v.voter), v))
                .collect(),
            deposit_queue,
            voting_queue,
        }
    }
}
