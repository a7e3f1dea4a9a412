// Staking - validator registry, delegation share accounting and the unbonding queue

use crate::identity::{Address, ModuleAccount, PublicKey, ADDRESS_LEN};
use crate::ledger::{Ledger, LedgerError};
use crate::staking::{Delegation, UnbondingEntry, Validator, ValidatorStatus, ValidatorUpdate};
use crate::types::{BlockHeader, Coin, Coins, Rational};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakingError {
    #[error("Validator already exists: {0}")]
    ValidatorAlreadyExists(Address),

    #[error("Consensus key already bound to validator {0}")]
    ConsensusKeyInUse(Address),

    #[error("Validator not found: {0}")]
    ValidatorNotFound(Address),

    #[error("Delegation not found: {delegator} -> {validator}")]
    DelegationNotFound { delegator: Address, validator: Address },

    #[error("Insufficient shares: have {available}, requested {requested}")]
    InsufficientShares { available: Rational, requested: Rational },

    #[error("Invalid denomination: expected {expected}, got {got}")]
    InvalidDenom { expected: String, got: String },

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Unbonding {0} tokens would leave a fractional coin behind")]
    FractionalUnbond(Rational),

    #[error("Arithmetic overflow in share accounting")]
    ArithmeticOverflow,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Staking parameters, fixed at genesis
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingParams {
    pub bond_denom: String,
    /// Delay between begin-unbond and coins becoming spendable
    pub unbonding_period_secs: u64,
    /// Size of the bonded validator set
    pub max_validators: usize,
}

impl Default for StakingParams {
    fn default() -> Self {
        Self {
            bond_denom: "RUNE".to_string(),
            unbonding_period_secs: 3 * 7 * 24 * 60 * 60,
            max_validators: 100,
        }
    }
}

impl StakingParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bond_denom(mut self, denom: &str) -> Self {
        self.bond_denom = denom.to_string();
        self
    }

    pub fn with_unbonding_period(mut self, secs: u64) -> Self {
        self.unbonding_period_secs = secs;
        self
    }

    pub fn with_max_validators(mut self, n: usize) -> Self {
        self.max_validators = n;
        self
    }
}

fn min_address() -> Address {
    Address::from_bytes([0u8; ADDRESS_LEN])
}

fn max_address() -> Address {
    Address::from_bytes([0xffu8; ADDRESS_LEN])
}

fn delegator_range(delegator: &Address) -> RangeInclusive<(Address, Address)> {
    (*delegator, min_address())..=(*delegator, max_address())
}

/// Validators, delegations and the time-ordered unbonding queue
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staking {
    params: StakingParams,
    validators: BTreeMap<Address, Validator>,
    /// Keyed by (delegator, validator)
    delegations: BTreeMap<(Address, Address), Delegation>,
    /// Keyed by (completion time, entry id) so draining is deterministic
    unbonding_queue: BTreeMap<(u64, u64), UnbondingEntry>,
    next_unbonding_id: u64,
    /// Validators leaving the bonded set, keyed by completion time
    validator_queue: BTreeSet<(u64, Address)>,
    /// Power last reported to consensus
    last_powers: BTreeMap<Address, u64>,
}

impl Staking {
    pub fn new(params: StakingParams) -> Self {
        Self {
            params,
            next_unbonding_id: 1,
            ..Default::default()
        }
    }

    pub fn params(&self) -> &StakingParams {
        &self.params
    }

    fn check_bond_coin(&self, coin: &Coin) -> Result<(), StakingError> {
        if coin.denom != self.params.bond_denom {
            return Err(StakingError::InvalidDenom {
                expected: self.params.bond_denom.clone(),
                got: coin.denom.clone(),
            });
        }
        if coin.amount == 0 {
            return Err(StakingError::InvalidAmount);
        }
        Ok(())
    }

    // ========================================================================
    // MESSAGE HANDLERS
    // ========================================================================

    /// Register a validator and bond its self-delegation at a 1:1 rate
    pub fn create_validator(
        &mut self,
        ledger: &mut Ledger,
        owner: Address,
        consensus_pubkey: PublicKey,
        self_bond: &Coin,
        moniker: &str,
    ) -> Result<Rational, StakingError> {
        if self.validators.contains_key(&owner) {
            return Err(StakingError::ValidatorAlreadyExists(owner));
        }
        if let Some(v) = self
            .validators
            .values()
            .find(|v| v.consensus_pubkey() == &consensus_pubkey)
        {
            return Err(StakingError::ConsensusKeyInUse(*v.owner()));
        }
        self.check_bond_coin(self_bond)?;

        let tokens = Rational::from_integer(self_bond.amount);
        let mut validator = Validator::new(owner, consensus_pubkey, moniker.to_string());
        validator
            .add_tokens(tokens, tokens)
            .ok_or(StakingError::ArithmeticOverflow)?;

        ledger.transfer(&owner, &ModuleAccount::BondedPool.address(), &self_bond.clone().into())?;

        self.validators.insert(owner, validator);
        self.delegations.insert(
            (owner, owner),
            Delegation {
                delegator: owner,
                validator: owner,
                shares: tokens,
            },
        );
        debug!(validator = %owner, amount = self_bond.amount, "validator created");
        Ok(tokens)
    }

    /// Bond coins to a validator. Returns the shares issued.
    pub fn delegate(
        &mut self,
        ledger: &mut Ledger,
        delegator: Address,
        validator_owner: Address,
        amount: &Coin,
    ) -> Result<Rational, StakingError> {
        let validator = self
            .validators
            .get(&validator_owner)
            .ok_or(StakingError::ValidatorNotFound(validator_owner))?;
        self.check_bond_coin(amount)?;

        let tokens = Rational::from_integer(amount.amount);
        let shares = validator
            .shares_for_tokens(&tokens)
            .ok_or(StakingError::ArithmeticOverflow)?;
        let mut updated = validator.clone();
        updated
            .add_tokens(tokens, shares)
            .ok_or(StakingError::ArithmeticOverflow)?;

        let key = (delegator, validator_owner);
        let held = self
            .delegations
            .get(&key)
            .map(|d| d.shares)
            .unwrap_or(Rational::ZERO);
        let new_shares = held
            .checked_add(&shares)
            .ok_or(StakingError::ArithmeticOverflow)?;

        ledger.transfer(&delegator, &ModuleAccount::BondedPool.address(), &amount.clone().into())?;

        self.validators.insert(validator_owner, updated);
        self.delegations.insert(
            key,
            Delegation {
                delegator,
                validator: validator_owner,
                shares: new_shares,
            },
        );
        Ok(shares)
    }

    /// Withdraw shares. Tokens leave the validator immediately; the coins stay
    /// in the bonded pool until the entry matures.
    pub fn begin_unbond(
        &mut self,
        delegator: Address,
        validator_owner: Address,
        shares: Rational,
        block: &BlockHeader,
    ) -> Result<UnbondingEntry, StakingError> {
        if shares.is_zero() {
            return Err(StakingError::InvalidAmount);
        }
        let key = (delegator, validator_owner);
        let delegation = self
            .delegations
            .get(&key)
            .ok_or(StakingError::DelegationNotFound {
                delegator,
                validator: validator_owner,
            })?;
        if shares > delegation.shares {
            return Err(StakingError::InsufficientShares {
                available: delegation.shares,
                requested: shares,
            });
        }
        let remaining = delegation
            .shares
            .checked_sub(&shares)
            .ok_or(StakingError::ArithmeticOverflow)?;

        let validator = self
            .validators
            .get(&validator_owner)
            .ok_or(StakingError::ValidatorNotFound(validator_owner))?;
        let tokens = validator
            .tokens_for_shares(&shares)
            .ok_or(StakingError::ArithmeticOverflow)?;
        // entries pay out whole coins, so a fractional token value has no owner at maturity
        if !tokens.is_integer() {
            return Err(StakingError::FractionalUnbond(tokens));
        }
        let mut updated = validator.clone();
        updated
            .remove_shares(tokens, shares)
            .ok_or(StakingError::ArithmeticOverflow)?;

        let completion_time = block
            .time
            .checked_add(self.params.unbonding_period_secs)
            .ok_or(StakingError::ArithmeticOverflow)?;
        let entry = UnbondingEntry {
            id: self.next_unbonding_id,
            delegator,
            validator: validator_owner,
            shares,
            balance: tokens.numerator(),
            creation_height: block.height,
            completion_time,
        };

        self.validators.insert(validator_owner, updated);
        if remaining.is_zero() {
            self.delegations.remove(&key);
        } else if let Some(d) = self.delegations.get_mut(&key) {
            d.shares = remaining;
        }
        self.next_unbonding_id += 1;
        self.unbonding_queue
            .insert((completion_time, entry.id), entry.clone());
        Ok(entry)
    }

    // ========================================================================
    // BLOCK HOOKS
    // ========================================================================

    /// Pay out every unbonding entry whose completion time has passed, in
    /// (completion time, id) order. A failed payout means the bonded pool is
    /// short, which the caller treats as fatal.
    pub fn process_matured_unbondings(
        &mut self,
        ledger: &mut Ledger,
        now: u64,
    ) -> Result<Vec<UnbondingEntry>, LedgerError> {
        let matured: Vec<(u64, u64)> = self
            .unbonding_queue
            .range(..=(now, u64::MAX))
            .map(|(k, _)| *k)
            .collect();

        let pool = ModuleAccount::BondedPool.address();
        let mut completed = Vec::with_capacity(matured.len());
        for key in matured {
            if let Some(entry) = self.unbonding_queue.remove(&key) {
                ledger.transfer(&pool, &entry.delegator, &Coins::single(entry.balance, &self.params.bond_denom))?;
                info!(
                    delegator = %entry.delegator,
                    validator = %entry.validator,
                    amount = entry.balance,
                    "unbonding matured"
                );
                completed.push(entry);
            }
        }
        Ok(completed)
    }

    /// Recompute the bonded set: the top `max_validators` by tokens, ties
    /// broken by owner address. Returns power changes for consensus.
    pub fn apply_validator_set(&mut self, now: u64) -> Vec<ValidatorUpdate> {
        let finished: Vec<(u64, Address)> = self
            .validator_queue
            .range(..=(now, max_address()))
            .copied()
            .collect();
        for key in finished {
            self.validator_queue.remove(&key);
            if let Some(v) = self.validators.get_mut(&key.1) {
                if v.status() == ValidatorStatus::Unbonding && v.unbonding_completion() == Some(key.0) {
                    v.set_status(ValidatorStatus::Unbonded, None);
                }
            }
        }

        let mut ranked: Vec<&Validator> = self
            .validators
            .values()
            .filter(|v| !v.tokens().is_zero())
            .collect();
        ranked.sort_by(|a, b| b.tokens().cmp(&a.tokens()).then_with(|| a.owner().cmp(b.owner())));
        let bonded: BTreeSet<Address> = ranked
            .iter()
            .take(self.params.max_validators)
            .map(|v| *v.owner())
            .collect();

        let completion = now.saturating_add(self.params.unbonding_period_secs);
        for (owner, v) in self.validators.iter_mut() {
            if bonded.contains(owner) || v.tokens().is_zero() {
                if let Some(t) = v.unbonding_completion() {
                    self.validator_queue.remove(&(t, *owner));
                }
            }
            if bonded.contains(owner) {
                if v.status() != ValidatorStatus::Bonded {
                    v.set_status(ValidatorStatus::Bonded, None);
                }
            } else if v.tokens().is_zero() {
                if v.status() != ValidatorStatus::Unbonded {
                    v.set_status(ValidatorStatus::Unbonded, None);
                }
            } else if v.status() == ValidatorStatus::Bonded {
                v.set_status(ValidatorStatus::Unbonding, Some(completion));
                self.validator_queue.insert((completion, *owner));
            }
        }

        let new_powers: BTreeMap<Address, u64> = bonded
            .iter()
            .filter_map(|a| self.validators.get(a).map(|v| (*a, v.power())))
            .collect();

        let mut updates = Vec::new();
        for (owner, power) in &new_powers {
            if self.last_powers.get(owner) != Some(power) {
                if let Some(v) = self.validators.get(owner) {
                    updates.push(ValidatorUpdate {
                        owner: *owner,
                        consensus_pubkey: *v.consensus_pubkey(),
                        power: *power,
                    });
                }
            }
        }
        for owner in self.last_powers.keys() {
            if !new_powers.contains_key(owner) {
                if let Some(v) = self.validators.get(owner) {
                    updates.push(ValidatorUpdate {
                        owner: *owner,
                        consensus_pubkey: *v.consensus_pubkey(),
                        power: 0,
                    });
                }
            }
        }
        self.last_powers = new_powers;

        self.validators.retain(|_, v| {
            !(v.status() == ValidatorStatus::Unbonded && v.tokens().is_zero() && v.delegator_shares().is_zero())
        });

        updates
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn validator(&self, owner: &Address) -> Option<&Validator> {
        self.validators.get(owner)
    }

    pub fn validators(&self) -> impl Iterator<Item = &Validator> {
        self.validators.values()
    }

    pub fn delegation(&self, delegator: &Address, validator: &Address) -> Option<&Delegation> {
        self.delegations.get(&(*delegator, *validator))
    }

    pub fn delegations(&self) -> impl Iterator<Item = &Delegation> {
        self.delegations.values()
    }

    pub fn delegations_of(&self, delegator: &Address) -> impl Iterator<Item = &Delegation> {
        self.delegations.range(delegator_range(delegator)).map(|(_, d)| d)
    }

    pub fn unbonding_entries(&self) -> impl Iterator<Item = &UnbondingEntry> {
        self.unbonding_queue.values()
    }

    pub fn unbonding_entries_of<'a>(&'a self, delegator: &'a Address) -> impl Iterator<Item = &'a UnbondingEntry> + 'a {
        self.unbonding_queue
            .values()
            .filter(move |e| &e.delegator == delegator)
    }

    pub fn last_powers(&self) -> &BTreeMap<Address, u64> {
        &self.last_powers
    }

    /// Token-equivalent stake a delegator holds in bonded validators
    pub fn voting_power(&self, delegator: &Address) -> Option<Rational> {
        let mut total = Rational::ZERO;
        for d in self.delegations_of(delegator) {
            let Some(v) = self.validators.get(&d.validator) else {
                continue;
            };
            if v.status() != ValidatorStatus::Bonded {
                continue;
            }
            total = total.checked_add(&v.tokens_for_shares(&d.shares)?)?;
        }
        Some(total)
    }

    /// Tokens held by bonded validators
    pub fn total_bonded_tokens(&self) -> Option<Rational> {
        self.validators
            .values()
            .filter(|v| v.status() == ValidatorStatus::Bonded)
            .try_fold(Rational::ZERO, |acc, v| acc.checked_add(&v.tokens()))
    }

    pub(crate) fn restore(
        params: StakingParams,
        validators: Vec<Validator>,
        delegations: Vec<Delegation>,
        unbonding: Vec<UnbondingEntry>,
        next_unbonding_id: u64,
        last_powers: BTreeMap<Address, u64>,
    ) -> Self {
        let validator_queue = validators
            .iter()
            .filter_map(|v| v.unbonding_completion().map(|t| (t, *v.owner())))
            .collect();
        Self {
            params,
            validators: validators.into_iter().map(|v| (*v.owner(), v)).collect(),
            delegations: delegations
                .into_iter()
                .map(|d| ((d.delegator, d.validator), d))
                .collect(),
            unbonding_queue: unbonding
                .into_iter()
                .map(|e| ((e.completion_time, e.id), e))
                .collect(),
            next_unbonding_id,
            validator_queue,
            last_powers,
        }
    }

    pub(crate) fn next_unbonding_id(&self) -> u64 {
        self.next_unbonding_id
    }
}
