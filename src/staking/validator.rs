use crate::identity::{Address, PublicKey};
use crate::types::Rational;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidatorStatus {
    Unbonded,
    Unbonding,
    Bonded,
}

impl fmt::Display for ValidatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidatorStatus::Unbonded => "Unbonded",
            ValidatorStatus::Unbonding => "Unbonding",
            ValidatorStatus::Bonded => "Bonded",
        };
        f.write_str(s)
    }
}

/// A registered validator. `tokens` always equals the sum over its
/// delegations of `shares * exchange_rate()`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    owner: Address,
    consensus_pubkey: PublicKey,
    tokens: Rational,
    delegator_shares: Rational,
    /// Cumulative shares ever issued; bounds the shares that can be pending unbonding
    shares_issued: Rational,
    status: ValidatorStatus,
    moniker: String,
    /// Set while the validator is Unbonding
    unbonding_completion: Option<u64>,
}

impl Validator {
    pub(crate) fn new(owner: Address, consensus_pubkey: PublicKey, moniker: String) -> Self {
        Self {
            owner,
            consensus_pubkey,
            tokens: Rational::ZERO,
            delegator_shares: Rational::ZERO,
            shares_issued: Rational::ZERO,
            status: ValidatorStatus::Unbonded,
            moniker,
            unbonding_completion: None,
        }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn consensus_pubkey(&self) -> &PublicKey {
        &self.consensus_pubkey
    }

    pub fn tokens(&self) -> Rational {
        self.tokens
    }

    pub fn delegator_shares(&self) -> Rational {
        self.delegator_shares
    }

    pub fn shares_issued(&self) -> Rational {
        self.shares_issued
    }

    pub fn status(&self) -> ValidatorStatus {
        self.status
    }

    pub fn moniker(&self) -> &str {
        &self.moniker
    }

    pub fn unbonding_completion(&self) -> Option<u64> {
        self.unbonding_completion
    }

    /// Consensus voting power: whole bonded tokens
    pub fn power(&self) -> u64 {
        u64::try_from(self.tokens.floor()).unwrap_or(u64::MAX)
    }

    /// Tokens per share; 1 until the first delegation
    pub fn exchange_rate(&self) -> Rational {
        self.tokens
            .checked_div(&self.delegator_shares)
            .unwrap_or(Rational::ONE)
    }

    pub fn shares_for_tokens(&self, tokens: &Rational) -> Option<Rational> {
        if self.delegator_shares.is_zero() {
            return Some(*tokens);
        }
        tokens
            .checked_mul(&self.delegator_shares)?
            .checked_div(&self.tokens)
    }

    pub fn tokens_for_shares(&self, shares: &Rational) -> Option<Rational> {
        if self.delegator_shares.is_zero() {
            return Some(Rational::ZERO);
        }
        shares
            .checked_mul(&self.tokens)?
            .checked_div(&self.delegator_shares)
    }

    pub(crate) fn add_tokens(&mut self, tokens: Rational, shares: Rational) -> Option<()> {
        let new_tokens = self.tokens.checked_add(&tokens)?;
        let new_shares = self.delegator_shares.checked_add(&shares)?;
        let issued = self.shares_issued.checked_add(&shares)?;
        self.tokens = new_tokens;
        self.delegator_shares = new_shares;
        self.shares_issued = issued;
        Some(())
    }

    pub(crate) fn remove_shares(&mut self, tokens: Rational, shares: Rational) -> Option<()> {
        let new_tokens = self.tokens.checked_sub(&tokens)?;
        let new_shares = self.delegator_shares.checked_sub(&shares)?;
        self.tokens = new_tokens;
        self.delegator_shares = new_shares;
        Some(())
    }

    pub(crate) fn set_status(&mut self, status: ValidatorStatus, unbonding_completion: Option<u64>) {
        self.status = status;
        self.unbonding_completion = unbonding_completion;
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

/// Shares a delegator holds in one validator. Unique per (delegator, validator).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator: Address,
    pub validator: Address,
    pub shares: Rational,
}

/// Coins released from a validator, waiting out the unbonding period
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingEntry {
    pub id: u64,
    pub delegator: Address,
    pub validator: Address,
    pub shares: Rational,
    /// Whole coins returned to the delegator at maturity
    pub balance: u128,
    pub creation_height: u64,
    pub completion_time: u64,
}

/// Power change handed to the consensus engine at end of block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorUpdate {
    pub owner: Address,
    pub consensus_pubkey: PublicKey,
    /// Zero removes the validator from the consensus set
    pub power: u64,
}

/// Parse a validator status name as used by query filters
impl FromStr for ValidatorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unbonded" => Ok(ValidatorStatus::Unbonded),
            "Unbonding" => Ok(ValidatorStatus::Unbonding),
            "Bonded" => Ok(ValidatorStatus::Bonded),
            other => Err(format!("unknown validator status '{other}'")),
        }
    }
}
