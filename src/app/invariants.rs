// Cross-module consistency checks run at the end of every block

use crate::app::{ChainState, FatalError};
use crate::identity::{Address, ModuleAccount};
use crate::types::{Coins, Rational};
use std::collections::BTreeMap;

pub fn check(state: &ChainState) -> Result<(), FatalError> {
    supply_conserved(state)?;
    bonded_pool_covers_stake(state)?;
    shares_conserved(state)?;
    unbonding_within_issued(state)?;
    deposits_escrowed(state)?;
    Ok(())
}

fn violation(msg: String) -> FatalError {
    FatalError::InvariantViolation(msg)
}

fn overflow(what: &str) -> FatalError {
    violation(format!("overflow while summing {what}"))
}

/// Sum of balances equals the supply minted at genesis
pub fn supply_conserved(state: &ChainState) -> Result<(), FatalError> {
    let sum = state.ledger.sum_of_balances().ok_or_else(|| overflow("balances"))?;
    if &sum != state.ledger.total_supply() {
        return Err(violation(format!(
            "sum of balances {sum} != total supply {}",
            state.ledger.total_supply()
        )));
    }
    Ok(())
}

/// The bonded pool holds at least the validators' tokens plus every pending
/// unbonding payout
pub fn bonded_pool_covers_stake(state: &ChainState) -> Result<(), FatalError> {
    let denom = &state.staking.params().bond_denom;
    let pool = Rational::from_integer(
        state
            .ledger
            .balance(&ModuleAccount::BondedPool.address(), denom),
    );
    let tokens = state
        .staking
        .validators()
        .try_fold(Rational::ZERO, |acc, v| acc.checked_add(&v.tokens()))
        .ok_or_else(|| overflow("validator tokens"))?;
    let pending = state
        .staking
        .unbonding_entries()
        .try_fold(0u128, |acc, e| acc.checked_add(e.balance))
        .ok_or_else(|| overflow("unbonding balances"))?;
    let required = tokens
        .checked_add(&Rational::from_integer(pending))
        .ok_or_else(|| overflow("bonded stake"))?;
    if pool < required {
        return Err(violation(format!(
            "bonded pool holds {pool}, validators and unbondings need {required}"
        )));
    }
    Ok(())
}

/// Each validator's share total equals the sum of its delegations
pub fn shares_conserved(state: &ChainState) -> Result<(), FatalError> {
    let mut sums: BTreeMap<Address, Rational> = BTreeMap::new();
    for d in state.staking.delegations() {
        let entry = sums.entry(d.validator).or_insert(Rational::ZERO);
        *entry = entry
            .checked_add(&d.shares)
            .ok_or_else(|| overflow("delegation shares"))?;
    }
    for v in state.staking.validators() {
        let delegated = sums.remove(v.owner()).unwrap_or(Rational::ZERO);
        if delegated != v.delegator_shares() {
            return Err(violation(format!(
                "validator {} has {} shares, delegations sum to {delegated}",
                v.owner(),
                v.delegator_shares()
            )));
        }
    }
    if let Some((owner, _)) = sums.into_iter().next() {
        return Err(violation(format!("delegations to unknown validator {owner}")));
    }
    Ok(())
}

/// Pending unbonding shares never exceed what a validator has ever issued
pub fn unbonding_within_issued(state: &ChainState) -> Result<(), FatalError> {
    let mut pending: BTreeMap<Address, Rational> = BTreeMap::new();
    for e in state.staking.unbonding_entries() {
        let entry = pending.entry(e.validator).or_insert(Rational::ZERO);
        *entry = entry
            .checked_add(&e.shares)
            .ok_or_else(|| overflow("unbonding shares"))?;
    }
    for (owner, shares) in pending {
        // removed validators have nothing left to compare against
        let Some(v) = state.staking.validator(&owner) else {
            continue;
        };
        if shares > v.shares_issued() {
            return Err(violation(format!(
                "validator {owner} has {shares} shares unbonding but issued only {}",
                v.shares_issued()
            )));
        }
    }
    Ok(())
}

/// The deposit escrow holds exactly the recorded deposits, and each open
/// proposal's total matches its records
pub fn deposits_escrowed(state: &ChainState) -> Result<(), FatalError> {
    let recorded = state
        .gov
        .deposits()
        .try_fold(Coins::new(), |acc, d| acc.checked_add(&d.amount))
        .ok_or_else(|| overflow("deposits"))?;
    let escrow = state.ledger.balances(&ModuleAccount::GovDeposits.address());
    if recorded != escrow {
        return Err(violation(format!(
            "deposit escrow holds {escrow}, records sum to {recorded}"
        )));
    }
    for p in state.gov.proposals().filter(|p| !p.status.is_final()) {
        let total = state
            .gov
            .deposits_of(p.id)
            .try_fold(Coins::new(), |acc, d| acc.checked_add(&d.amount))
            .ok_or_else(|| overflow("proposal deposits"))?;
        if total != p.total_deposit {
            return Err(violation(format!(
                "proposal {} total deposit {} != recorded {total}",
                p.id, p.total_deposit
            )));
        }
    }
    Ok(())
}
