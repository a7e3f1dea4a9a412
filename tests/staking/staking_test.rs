// Staking Tests
// Validators, share accounting, unbonding queue and the bonded set

use runechain::identity::{Address, Keypair, ModuleAccount, PublicKey};
use runechain::ledger::{Ledger, LedgerError};
use runechain::staking::{Staking, StakingError, StakingParams, Validator, ValidatorStatus};
use runechain::types::{BlockHeader, Coin, Coins, Rational};

const UNBONDING: u64 = 100;

fn key(seed: u8) -> (Address, PublicKey) {
    let kp = Keypair::from_seed([seed; 32]);
    (Address::from_public_key(&kp.public_key()), kp.public_key())
}

fn rune(n: u128) -> Coin {
    Coin::new(n, "RUNE")
}

fn setup() -> (Staking, Ledger) {
    let mut ledger = Ledger::new();
    for seed in 1..=4 {
        ledger.mint_genesis(key(seed).0, &Coins::single(1_000, "RUNE")).unwrap();
    }
    let params = StakingParams::default().with_unbonding_period(UNBONDING);
    (Staking::new(params), ledger)
}

// ============================================================================
// CREATE VALIDATOR
// ============================================================================

#[test]
fn test_create_validator_self_delegates_one_to_one() {
    let (mut staking, mut ledger) = setup();
    let (owner, pk) = key(1);

    let shares = staking
        .create_validator(&mut ledger, owner, pk, &rune(2), "bar")
        .unwrap();

    assert_eq!(shares, Rational::from_integer(2));
    let v = staking.validator(&owner).unwrap();
    assert_eq!(v.tokens(), Rational::from_integer(2));
    assert_eq!(v.moniker(), "bar");
    assert_eq!(v.status(), ValidatorStatus::Unbonded);
    assert_eq!(staking.delegation(&owner, &owner).unwrap().shares, Rational::from_integer(2));
    assert_eq!(ledger.balance(&owner, "RUNE"), 998);
    assert_eq!(ledger.balance(&ModuleAccount::BondedPool.address(), "RUNE"), 2);
}

#[test]
fn test_create_validator_twice_fails() {
    let (mut staking, mut ledger) = setup();
    let (owner, pk) = key(1);
    let (_, other_pk) = key(2);
    staking.create_validator(&mut ledger, owner, pk, &rune(2), "a").unwrap();

    let err = staking
        .create_validator(&mut ledger, owner, other_pk, &rune(2), "b")
        .unwrap_err();

    assert_eq!(err, StakingError::ValidatorAlreadyExists(owner));
    assert_eq!(ledger.balance(&owner, "RUNE"), 998);
}

#[test]
fn test_create_validator_insufficient_funds_has_no_effect() {
    let (mut staking, mut ledger) = setup();
    let (owner, pk) = key(1);
    let before = ledger.clone();

    let err = staking
        .create_validator(&mut ledger, owner, pk, &rune(1_001), "a")
        .unwrap_err();

    assert!(matches!(err, StakingError::Ledger(LedgerError::InsufficientFunds { .. })));
    assert!(staking.validator(&owner).is_none());
    assert_eq!(ledger, before);
}

#[test]
fn test_create_validator_wrong_denom() {
    let (mut staking, mut ledger) = setup();
    let (owner, pk) = key(1);
    let err = staking
        .create_validator(&mut ledger, owner, pk, &Coin::new(5, "ATOM"), "a")
        .unwrap_err();
    assert!(matches!(err, StakingError::InvalidDenom { .. }));
}

#[test]
fn test_consensus_key_cannot_be_reused() {
    let (mut staking, mut ledger) = setup();
    let (a, pk) = key(1);
    let (b, _) = key(2);
    staking.create_validator(&mut ledger, a, pk, &rune(2), "a").unwrap();

    let err = staking.create_validator(&mut ledger, b, pk, &rune(2), "b").unwrap_err();

    assert_eq!(err, StakingError::ConsensusKeyInUse(a));
}

// ============================================================================
// DELEGATE / UNBOND
// ============================================================================

#[test]
fn test_delegate_to_missing_validator() {
    let (mut staking, mut ledger) = setup();
    let err = staking
        .delegate(&mut ledger, key(2).0, key(1).0, &rune(5))
        .unwrap_err();
    assert_eq!(err, StakingError::ValidatorNotFound(key(1).0));
}

#[test]
fn test_delegate_accumulates_shares() {
    let (mut staking, mut ledger) = setup();
    let (owner, pk) = key(1);
    let delegator = key(2).0;
    staking.create_validator(&mut ledger, owner, pk, &rune(10), "v").unwrap();

    staking.delegate(&mut ledger, delegator, owner, &rune(5)).unwrap();
    staking.delegate(&mut ledger, delegator, owner, &rune(3)).unwrap();

    assert_eq!(
        staking.delegation(&delegator, &owner).unwrap().shares,
        Rational::from_integer(8)
    );
    let v = staking.validator(&owner).unwrap();
    assert_eq!(v.tokens(), Rational::from_integer(18));
    assert_eq!(v.delegator_shares(), Rational::from_integer(18));
}

#[test]
fn test_unbond_more_than_held() {
    let (mut staking, mut ledger) = setup();
    let (owner, pk) = key(1);
    staking.create_validator(&mut ledger, owner, pk, &rune(2), "v").unwrap();

    let err = staking
        .begin_unbond(owner, owner, Rational::from_integer(3), &BlockHeader::new(1, 0))
        .unwrap_err();

    assert!(matches!(err, StakingError::InsufficientShares { .. }));
}

#[test]
fn test_unbond_without_delegation() {
    let (mut staking, mut ledger) = setup();
    let (owner, pk) = key(1);
    let stranger = key(3).0;
    staking.create_validator(&mut ledger, owner, pk, &rune(2), "v").unwrap();

    let err = staking
        .begin_unbond(stranger, owner, Rational::ONE, &BlockHeader::new(1, 0))
        .unwrap_err();

    assert_eq!(
        err,
        StakingError::DelegationNotFound {
            delegator: stranger,
            validator: owner
        }
    );
}

#[test]
fn test_unbond_reduces_tokens_but_not_balance() {
    let (mut staking, mut ledger) = setup();
    let (owner, pk) = key(1);
    staking.create_validator(&mut ledger, owner, pk, &rune(2), "v").unwrap();

    let entry = staking
        .begin_unbond(owner, owner, Rational::ONE, &BlockHeader::new(3, 1_000))
        .unwrap();

    assert_eq!(staking.validator(&owner).unwrap().tokens().to_string(), "1/1");
    assert_eq!(ledger.balance(&owner, "RUNE"), 998);
    assert_eq!(entry.balance, 1);
    assert_eq!(entry.creation_height, 3);
    assert_eq!(entry.completion_time, 1_000 + UNBONDING);
}

#[test]
fn test_matured_unbonding_pays_out_once() {
    let (mut staking, mut ledger) = setup();
    let (owner, pk) = key(1);
    staking.create_validator(&mut ledger, owner, pk, &rune(2), "v").unwrap();
    staking
        .begin_unbond(owner, owner, Rational::ONE, &BlockHeader::new(1, 0))
        .unwrap();

    assert!(staking
        .process_matured_unbondings(&mut ledger, UNBONDING - 1)
        .unwrap()
        .is_empty());
    assert_eq!(ledger.balance(&owner, "RUNE"), 998);

    let paid = staking.process_matured_unbondings(&mut ledger, UNBONDING).unwrap();
    assert_eq!(paid.len(), 1);
    assert_eq!(ledger.balance(&owner, "RUNE"), 999);

    assert!(staking
        .process_matured_unbondings(&mut ledger, UNBONDING * 10)
        .unwrap()
        .is_empty());
    assert_eq!(ledger.balance(&owner, "RUNE"), 999);
}

#[test]
fn test_fractional_unbond_rejected_and_whole_split_pays_in_full() {
    let (mut staking, mut ledger) = setup();
    let (owner, pk) = key(1);
    staking.create_validator(&mut ledger, owner, pk, &rune(2), "v").unwrap();
    let half = Rational::new(1, 2).unwrap();
    let before = staking.clone();

    let err = staking
        .begin_unbond(owner, owner, half, &BlockHeader::new(1, 0))
        .unwrap_err();

    assert_eq!(err, StakingError::FractionalUnbond(half));
    assert_eq!(staking, before);

    // the same two coins unbonded as whole shares come back in full
    for _ in 0..2 {
        staking
            .begin_unbond(owner, owner, Rational::ONE, &BlockHeader::new(1, 0))
            .unwrap();
    }
    staking.process_matured_unbondings(&mut ledger, UNBONDING).unwrap();

    assert_eq!(ledger.balance(&owner, "RUNE"), 1_000);
    assert_eq!(ledger.balance(&ModuleAccount::BondedPool.address(), "RUNE"), 0);
}

#[test]
fn test_unbondings_drain_in_completion_then_id_order() {
    let (mut staking, mut ledger) = setup();
    let (owner, pk) = key(1);
    let d1 = key(2).0;
    let d2 = key(3).0;
    staking.create_validator(&mut ledger, owner, pk, &rune(10), "v").unwrap();
    staking.delegate(&mut ledger, d1, owner, &rune(10)).unwrap();
    staking.delegate(&mut ledger, d2, owner, &rune(10)).unwrap();

    let late = staking
        .begin_unbond(d1, owner, Rational::ONE, &BlockHeader::new(1, 50))
        .unwrap();
    let early_a = staking
        .begin_unbond(d2, owner, Rational::ONE, &BlockHeader::new(1, 10))
        .unwrap();
    let early_b = staking
        .begin_unbond(d1, owner, Rational::ONE, &BlockHeader::new(1, 10))
        .unwrap();

    let paid = staking.process_matured_unbondings(&mut ledger, 1_000).unwrap();
    let ids: Vec<u64> = paid.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![early_a.id, early_b.id, late.id]);
}

// ============================================================================
// VALIDATOR SET
// ============================================================================

#[test]
fn test_top_n_bonded_with_address_tie_break() {
    let mut ledger = Ledger::new();
    for seed in 1..=3 {
        ledger.mint_genesis(key(seed).0, &Coins::single(100, "RUNE")).unwrap();
    }
    let mut staking = Staking::new(StakingParams::default().with_max_validators(2).with_unbonding_period(UNBONDING));
    for seed in 1..=3 {
        let (owner, pk) = key(seed);
        staking.create_validator(&mut ledger, owner, pk, &rune(5), "v").unwrap();
    }

    let updates = staking.apply_validator_set(0);

    let mut owners: Vec<Address> = (1..=3).map(|s| key(s).0).collect();
    owners.sort();
    assert_eq!(updates.len(), 2);
    assert_eq!(staking.validator(&owners[0]).unwrap().status(), ValidatorStatus::Bonded);
    assert_eq!(staking.validator(&owners[1]).unwrap().status(), ValidatorStatus::Bonded);
    assert_eq!(staking.validator(&owners[2]).unwrap().status(), ValidatorStatus::Unbonded);
}

#[test]
fn test_displaced_validator_unbonds_then_unbonded() {
    let (_, mut ledger) = setup();
    let mut staking = Staking::new(
        StakingParams::default()
            .with_max_validators(1)
            .with_unbonding_period(UNBONDING),
    );
    let (a, pk_a) = key(1);
    let (b, pk_b) = key(2);
    staking.create_validator(&mut ledger, a, pk_a, &rune(5), "a").unwrap();
    staking.apply_validator_set(0);
    assert_eq!(staking.validator(&a).unwrap().status(), ValidatorStatus::Bonded);

    staking.create_validator(&mut ledger, b, pk_b, &rune(50), "b").unwrap();
    let updates = staking.apply_validator_set(10);

    assert_eq!(staking.validator(&b).unwrap().status(), ValidatorStatus::Bonded);
    assert_eq!(staking.validator(&a).unwrap().status(), ValidatorStatus::Unbonding);
    assert!(updates.iter().any(|u| u.owner == a && u.power == 0));
    assert!(updates.iter().any(|u| u.owner == b && u.power == 50));

    staking.apply_validator_set(10 + UNBONDING);
    assert_eq!(staking.validator(&a).unwrap().status(), ValidatorStatus::Unbonded);
}

#[test]
fn test_empty_unbonded_validator_is_removed() {
    let (mut staking, mut ledger) = setup();
    let (owner, pk) = key(1);
    staking.create_validator(&mut ledger, owner, pk, &rune(2), "v").unwrap();
    staking.apply_validator_set(0);

    staking
        .begin_unbond(owner, owner, Rational::from_integer(2), &BlockHeader::new(1, 0))
        .unwrap();
    staking.apply_validator_set(0);

    assert!(staking.validator(&owner).is_none());
    // the pending entry still pays out
    staking.process_matured_unbondings(&mut ledger, UNBONDING).unwrap();
    assert_eq!(ledger.balance(&owner, "RUNE"), 1_000);
}

#[test]
fn test_voting_power_counts_only_bonded_validators() {
    let (mut staking, mut ledger) = setup();
    let (owner, pk) = key(1);
    let delegator = key(2).0;
    staking.create_validator(&mut ledger, owner, pk, &rune(10), "v").unwrap();
    staking.delegate(&mut ledger, delegator, owner, &rune(5)).unwrap();

    assert_eq!(staking.voting_power(&delegator).unwrap(), Rational::ZERO);

    staking.apply_validator_set(0);
    assert_eq!(staking.voting_power(&delegator).unwrap(), Rational::from_integer(5));
    assert_eq!(staking.total_bonded_tokens().unwrap(), Rational::from_integer(15));
}

#[test]
fn test_validator_record_round_trip() {
    let (mut staking, mut ledger) = setup();
    let (owner, pk) = key(1);
    staking.create_validator(&mut ledger, owner, pk, &rune(3), "v").unwrap();
    staking
        .begin_unbond(owner, owner, Rational::ONE, &BlockHeader::new(1, 0))
        .unwrap();
    let v = staking.validator(&owner).unwrap().clone();

    assert_eq!(Validator::from_bytes(&v.to_bytes()).unwrap(), v);
}
