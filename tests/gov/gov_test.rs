// Governance Tests
// Proposal lifecycle, deposits, votes and the stake-weighted tally

use runechain::gov::{
    DepositPolicy, GovError, GovParams, Governance, Proposal, ProposalContent, ProposalFilter, ProposalStatus,
    ProposalType, Vote, VoteOption, NO_MATCHING_PROPOSALS,
};
use runechain::identity::{Address, Keypair, ModuleAccount};
use runechain::ledger::{Ledger, LedgerError};
use runechain::staking::{Staking, StakingParams};
use runechain::types::{Coin, Coins, Rational};

const PERIOD: u64 = 10;

fn key(seed: u8) -> Address {
    Address::from_public_key(&Keypair::from_seed([seed; 32]).public_key())
}

fn rune(n: u128) -> Coins {
    Coins::single(n, "RUNE")
}

fn text(title: &str) -> ProposalContent {
    ProposalContent {
        title: title.to_string(),
        description: "description".to_string(),
        proposal_type: ProposalType::Text,
    }
}

fn params() -> GovParams {
    GovParams::default()
        .with_min_deposit(rune(100))
        .with_max_deposit_period(PERIOD)
        .with_voting_period(PERIOD)
}

/// Validators 1 and 2 bonded with 60 and 40 tokens; accounts 1..=4 hold 1_000
fn setup(gov_params: GovParams) -> (Governance, Staking, Ledger) {
    let mut ledger = Ledger::new();
    for seed in 1..=4 {
        ledger.mint_genesis(key(seed), &rune(1_000)).unwrap();
    }
    let mut staking = Staking::new(StakingParams::default());
    for (seed, bond) in [(1u8, 60u128), (2, 40)] {
        let kp = Keypair::from_seed([seed; 32]);
        staking
            .create_validator(&mut ledger, key(seed), kp.public_key(), &Coin::new(bond, "RUNE"), "v")
            .unwrap();
    }
    staking.apply_validator_set(0);
    (Governance::new(gov_params), staking, ledger)
}

fn voting_proposal(gov: &mut Governance, ledger: &mut Ledger) -> u64 {
    gov.submit_proposal(ledger, key(3), text("Test"), &rune(100), 0).unwrap()
}

// ============================================================================
// SUBMIT / DEPOSIT
// ============================================================================

#[test]
fn test_ids_are_monotonic() {
    let (mut gov, _, mut ledger) = setup(params());
    let a = gov.submit_proposal(&mut ledger, key(3), text("a"), &rune(1), 0).unwrap();
    let b = gov.submit_proposal(&mut ledger, key(3), text("b"), &rune(1), 0).unwrap();
    assert_eq!((a, b), (1, 2));
}

#[test]
fn test_submit_with_min_deposit_opens_voting() {
    let (mut gov, _, mut ledger) = setup(params());

    let id = gov.submit_proposal(&mut ledger, key(3), text("Test"), &rune(100), 5).unwrap();

    let p = gov.proposal(id).unwrap();
    assert_eq!(p.status, ProposalStatus::VotingPeriod);
    assert_eq!(p.voting_start_time, Some(5));
    assert_eq!(p.voting_end_time, Some(5 + PERIOD));
    assert_eq!(ledger.balance(&ModuleAccount::GovDeposits.address(), "RUNE"), 100);
}

#[test]
fn test_submit_insufficient_funds() {
    let (mut gov, _, mut ledger) = setup(params());
    let err = gov
        .submit_proposal(&mut ledger, key(3), text("Test"), &rune(1_001), 0)
        .unwrap_err();
    assert!(matches!(err, GovError::Ledger(LedgerError::InsufficientFunds { .. })));
    assert_eq!(gov.proposal_count(), 0);
    assert_eq!(gov.next_proposal_id(), 1);
}

#[test]
fn test_deposit_reaching_minimum_opens_voting() {
    let (mut gov, _, mut ledger) = setup(params());
    let id = gov.submit_proposal(&mut ledger, key(3), text("Test"), &rune(60), 0).unwrap();

    assert!(!gov.deposit(&mut ledger, key(4), id, &rune(20), 3).unwrap());
    assert!(gov.deposit(&mut ledger, key(4), id, &rune(20), 4).unwrap());

    let p = gov.proposal(id).unwrap();
    assert_eq!(p.status, ProposalStatus::VotingPeriod);
    assert_eq!(p.total_deposit, rune(100));
    assert_eq!(p.voting_end_time, Some(4 + PERIOD));
    assert_eq!(gov.deposit_record(id, &key(4)).unwrap().amount, rune(40));
}

#[test]
fn test_deposit_unknown_proposal() {
    let (mut gov, _, mut ledger) = setup(params());
    let err = gov.deposit(&mut ledger, key(4), 9, &rune(1), 0).unwrap_err();
    assert_eq!(err, GovError::ProposalNotFound(9));
}

#[test]
fn test_deposit_after_deadline_is_too_late() {
    let (mut gov, _, mut ledger) = setup(params());
    let id = gov.submit_proposal(&mut ledger, key(3), text("Test"), &rune(10), 0).unwrap();

    let err = gov.deposit(&mut ledger, key(4), id, &rune(10), PERIOD).unwrap_err();

    assert_eq!(err, GovError::DepositTooLate(id));
    assert_eq!(ledger.balance(&key(4), "RUNE"), 1_000);
}

#[test]
fn test_deposit_during_voting_is_too_late() {
    let (mut gov, _, mut ledger) = setup(params());
    let id = voting_proposal(&mut gov, &mut ledger);
    let err = gov.deposit(&mut ledger, key(4), id, &rune(10), 1).unwrap_err();
    assert_eq!(err, GovError::DepositTooLate(id));
}

// ============================================================================
// VOTE
// ============================================================================

#[test]
fn test_vote_outside_voting_period() {
    let (mut gov, _, mut ledger) = setup(params());
    let id = gov.submit_proposal(&mut ledger, key(3), text("Test"), &rune(10), 0).unwrap();

    let err = gov.vote(key(1), id, VoteOption::Yes, 1).unwrap_err();

    assert_eq!(err, GovError::VoteOutsideVotingPeriod(id));
}

#[test]
fn test_vote_after_voting_deadline_rejected() {
    let (mut gov, _, mut ledger) = setup(params());
    let id = voting_proposal(&mut gov, &mut ledger);
    let err = gov.vote(key(1), id, VoteOption::Yes, PERIOD).unwrap_err();
    assert_eq!(err, GovError::VoteOutsideVotingPeriod(id));
}

#[test]
fn test_revote_overwrites() {
    let (mut gov, _, mut ledger) = setup(params());
    let id = voting_proposal(&mut gov, &mut ledger);

    gov.vote(key(1), id, VoteOption::No, 1).unwrap();
    gov.vote(key(1), id, VoteOption::Yes, 2).unwrap();

    let votes: Vec<&Vote> = gov.votes_of(id).collect();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].option, VoteOption::Yes);
}

// ============================================================================
// TALLY AND DEPOSIT DISPOSITION
// ============================================================================

#[test]
fn test_majority_yes_passes_and_refunds() {
    let (mut gov, staking, mut ledger) = setup(params());
    let id = voting_proposal(&mut gov, &mut ledger);
    gov.vote(key(1), id, VoteOption::Yes, 1).unwrap();
    gov.vote(key(2), id, VoteOption::No, 1).unwrap();

    let outcomes = gov.process_expired_proposals(&mut ledger, &staking, PERIOD).unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, ProposalStatus::Passed);
    let p = gov.proposal(id).unwrap();
    assert_eq!(p.status, ProposalStatus::Passed);
    let tally = p.final_tally.clone().unwrap();
    assert_eq!(tally.yes, Rational::from_integer(60));
    assert_eq!(tally.no, Rational::from_integer(40));
    assert_eq!(ledger.balance(&key(3), "RUNE"), 1_000);
    assert!(gov.deposits_of(id).next().is_none());
}

#[test]
fn test_not_processed_before_deadline() {
    let (mut gov, staking, mut ledger) = setup(params());
    let id = voting_proposal(&mut gov, &mut ledger);
    let outcomes = gov.process_expired_proposals(&mut ledger, &staking, PERIOD - 1).unwrap();
    assert!(outcomes.is_empty());
    assert_eq!(gov.proposal(id).unwrap().status, ProposalStatus::VotingPeriod);
}

#[test]
fn test_exact_half_is_rejected() {
    let (mut gov, mut staking, mut ledger) = setup(params());
    staking
        .delegate(&mut ledger, key(4), key(2), &Coin::new(20, "RUNE"))
        .unwrap();
    let id = voting_proposal(&mut gov, &mut ledger);
    gov.vote(key(1), id, VoteOption::Yes, 1).unwrap();
    gov.vote(key(2), id, VoteOption::No, 1).unwrap();
    gov.vote(key(4), id, VoteOption::No, 1).unwrap();
    staking.apply_validator_set(1);

    let outcomes = gov.process_expired_proposals(&mut ledger, &staking, PERIOD).unwrap();

    assert_eq!(outcomes[0].status, ProposalStatus::Rejected);
    assert!(outcomes[0].quorum_reached);
    assert!(!outcomes[0].vetoed);
    assert!(outcomes[0].deposits_refunded);
    assert_eq!(ledger.balance(&key(3), "RUNE"), 1_000);
}

#[test]
fn test_no_quorum_forfeits_by_default() {
    let (mut gov, staking, mut ledger) = setup(params());
    let id = voting_proposal(&mut gov, &mut ledger);
    // 0 of 100 bonded tokens vote
    gov.vote(key(3), id, VoteOption::Yes, 1).unwrap();

    let outcomes = gov.process_expired_proposals(&mut ledger, &staking, PERIOD).unwrap();

    assert_eq!(outcomes[0].status, ProposalStatus::Rejected);
    assert!(!outcomes[0].quorum_reached);
    assert!(!outcomes[0].deposits_refunded);
    assert_eq!(ledger.balance(&key(3), "RUNE"), 900);
    assert_eq!(ledger.balance(&ModuleAccount::CommunityPool.address(), "RUNE"), 100);
    assert_eq!(ledger.balance(&ModuleAccount::GovDeposits.address(), "RUNE"), 0);
}

#[test]
fn test_no_quorum_refunds_when_policy_says_so() {
    let policy = DepositPolicy {
        forfeit_on_no_quorum: false,
        ..DepositPolicy::default()
    };
    let (mut gov, staking, mut ledger) = setup(params().with_deposit_policy(policy));
    voting_proposal(&mut gov, &mut ledger);

    let outcomes = gov.process_expired_proposals(&mut ledger, &staking, PERIOD).unwrap();

    assert_eq!(outcomes[0].status, ProposalStatus::Rejected);
    assert!(outcomes[0].deposits_refunded);
    assert_eq!(ledger.balance(&key(3), "RUNE"), 1_000);
}

#[test]
fn test_veto_rejects_and_forfeits() {
    let (mut gov, staking, mut ledger) = setup(params());
    let id = voting_proposal(&mut gov, &mut ledger);
    gov.vote(key(1), id, VoteOption::Yes, 1).unwrap();
    gov.vote(key(2), id, VoteOption::NoWithVeto, 1).unwrap();

    let outcomes = gov.process_expired_proposals(&mut ledger, &staking, PERIOD).unwrap();

    assert_eq!(outcomes[0].status, ProposalStatus::Rejected);
    assert!(outcomes[0].vetoed);
    assert_eq!(ledger.balance(&ModuleAccount::CommunityPool.address(), "RUNE"), 100);
}

#[test]
fn test_all_abstain_is_rejected_with_refund() {
    let (mut gov, staking, mut ledger) = setup(params());
    let id = voting_proposal(&mut gov, &mut ledger);
    gov.vote(key(1), id, VoteOption::Abstain, 1).unwrap();
    gov.vote(key(2), id, VoteOption::Abstain, 1).unwrap();

    let outcomes = gov.process_expired_proposals(&mut ledger, &staking, PERIOD).unwrap();

    assert_eq!(outcomes[0].status, ProposalStatus::Rejected);
    assert!(outcomes[0].quorum_reached);
    assert!(outcomes[0].deposits_refunded);
}

#[test]
fn test_deposit_expiry_fails_and_forfeits() {
    let (mut gov, staking, mut ledger) = setup(params());
    let id = gov.submit_proposal(&mut ledger, key(3), text("Test"), &rune(30), 0).unwrap();
    gov.deposit(&mut ledger, key(4), id, &rune(30), 1).unwrap();

    let outcomes = gov.process_expired_proposals(&mut ledger, &staking, PERIOD).unwrap();

    assert_eq!(outcomes[0].status, ProposalStatus::Failed);
    assert_eq!(gov.proposal(id).unwrap().status, ProposalStatus::Failed);
    assert_eq!(ledger.balance(&ModuleAccount::CommunityPool.address(), "RUNE"), 60);
    assert_eq!(ledger.balance(&key(4), "RUNE"), 970);
}

#[test]
fn test_deposit_expiry_refunds_when_policy_says_so() {
    let policy = DepositPolicy {
        forfeit_on_deposit_expiry: false,
        ..DepositPolicy::default()
    };
    let (mut gov, staking, mut ledger) = setup(params().with_deposit_policy(policy));
    let id = gov.submit_proposal(&mut ledger, key(3), text("Test"), &rune(30), 0).unwrap();
    gov.deposit(&mut ledger, key(4), id, &rune(30), 1).unwrap();

    gov.process_expired_proposals(&mut ledger, &staking, PERIOD).unwrap();

    assert_eq!(ledger.balance(&key(3), "RUNE"), 1_000);
    assert_eq!(ledger.balance(&key(4), "RUNE"), 1_000);
    assert_eq!(ledger.balance(&ModuleAccount::CommunityPool.address(), "RUNE"), 0);
}

#[test]
fn test_expired_proposals_processed_in_id_order() {
    let (mut gov, staking, mut ledger) = setup(params());
    let a = voting_proposal(&mut gov, &mut ledger);
    let b = voting_proposal(&mut gov, &mut ledger);

    let outcomes = gov.process_expired_proposals(&mut ledger, &staking, PERIOD).unwrap();

    let ids: Vec<u64> = outcomes.iter().map(|o| o.proposal_id).collect();
    assert_eq!(ids, vec![a, b]);
}

// ============================================================================
// LISTING
// ============================================================================

#[test]
fn test_listing_filters() {
    let (mut gov, _, mut ledger) = setup(params());
    gov.submit_proposal(&mut ledger, key(3), text("Test"), &rune(10), 0).unwrap();
    let apples = gov.submit_proposal(&mut ledger, key(4), text("Apples"), &rune(100), 0).unwrap();
    gov.vote(key(1), apples, VoteOption::Yes, 1).unwrap();

    assert_eq!(gov.list_proposals(&ProposalFilter::new()), "1 - Test\n2 - Apples");
    assert_eq!(
        gov.list_proposals(&ProposalFilter::new().with_status(ProposalStatus::DepositPeriod)),
        "1 - Test"
    );
    assert_eq!(gov.list_proposals(&ProposalFilter::new().with_latest(1)), "2 - Apples");
    assert_eq!(gov.list_proposals(&ProposalFilter::new().with_voter(key(1))), "2 - Apples");
    assert_eq!(gov.list_proposals(&ProposalFilter::new().with_depositor(key(3))), "1 - Test");
    assert_eq!(
        gov.list_proposals(&ProposalFilter::new().with_status(ProposalStatus::Passed)),
        NO_MATCHING_PROPOSALS
    );
}

#[test]
fn test_depositor_filter_ignores_proposer_without_deposit() {
    let (mut gov, _, mut ledger) = setup(params());
    let id = gov
        .submit_proposal(&mut ledger, key(3), text("Test"), &Coins::new(), 0)
        .unwrap();

    assert!(gov.deposit_record(id, &key(3)).is_none());
    assert_eq!(
        gov.list_proposals(&ProposalFilter::new().with_depositor(key(3))),
        NO_MATCHING_PROPOSALS
    );

    gov.deposit(&mut ledger, key(4), id, &rune(5), 1).unwrap();
    assert_eq!(gov.list_proposals(&ProposalFilter::new().with_depositor(key(4))), "1 - Test");
    assert_eq!(
        gov.list_proposals(&ProposalFilter::new().with_depositor(key(3))),
        NO_MATCHING_PROPOSALS
    );
}

#[test]
fn test_proposal_and_vote_records_round_trip() {
    let (mut gov, _, mut ledger) = setup(params());
    let id = voting_proposal(&mut gov, &mut ledger);
    gov.vote(key(1), id, VoteOption::NoWithVeto, 1).unwrap();

    let p = gov.proposal(id).unwrap().clone();
    let v = gov.vote_record(id, &key(1)).unwrap().clone();

    assert_eq!(Proposal::from_bytes(&p.to_bytes()).unwrap(), p);
    assert_eq!(Vote::from_bytes(&v.to_bytes()).unwrap(), v);
}
