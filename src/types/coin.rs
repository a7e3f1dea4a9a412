use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoinError {
    #[error("Invalid coin string '{0}': expected <amount><denom>")]
    Parse(String),

    #[error("Invalid denomination '{0}'")]
    InvalidDenom(String),
}

fn validate_denom(denom: &str) -> Result<(), CoinError> {
    let valid = (2..=16).contains(&denom.len())
        && denom.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && denom.chars().all(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(())
    } else {
        Err(CoinError::InvalidDenom(denom.to_string()))
    }
}

/// A single amount of one denomination
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn validate(&self) -> Result<(), CoinError> {
        validate_denom(&self.denom)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = CoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| CoinError::Parse(s.to_string()))?;
        let (amount, denom) = s.split_at(split);
        let amount = amount
            .parse::<u128>()
            .map_err(|_| CoinError::Parse(s.to_string()))?;
        validate_denom(denom)?;
        Ok(Coin::new(amount, denom))
    }
}

/// Multi-denomination balance. Zero amounts are never stored, so two equal
/// balances always have equal encodings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(BTreeMap<String, u128>);

impl Coins {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn single(amount: u128, denom: &str) -> Self {
        let mut coins = Self::new();
        if amount > 0 {
            coins.0.insert(denom.to_string(), amount);
        }
        coins
    }

    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0.get(denom).copied().unwrap_or(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn denoms(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = Coin> + '_ {
        self.0.iter().map(|(d, a)| Coin::new(*a, d.clone()))
    }

    pub fn checked_add(&self, other: &Coins) -> Option<Coins> {
        let mut out = self.0.clone();
        for (denom, amount) in other.0.iter().filter(|(_, a)| **a > 0) {
            let entry = out.entry(denom.clone()).or_insert(0);
            *entry = entry.checked_add(*amount)?;
        }
        Some(Coins(out))
    }

    /// None if any denomination would go negative
    pub fn checked_sub(&self, other: &Coins) -> Option<Coins> {
        let mut out = self.0.clone();
        for (denom, amount) in &other.0 {
            let have = out.get(denom).copied().unwrap_or(0);
            let left = have.checked_sub(*amount)?;
            if left == 0 {
                out.remove(denom);
            } else {
                out.insert(denom.clone(), left);
            }
        }
        Some(Coins(out))
    }

    /// Decoded balances can carry zero entries or bad denominations that
    /// the constructors never produce
    pub fn validate(&self) -> Result<(), CoinError> {
        for (denom, amount) in &self.0 {
            validate_denom(denom)?;
            if *amount == 0 {
                return Err(CoinError::Parse(format!("0{denom}")));
            }
        }
        Ok(())
    }

    /// True if every denomination in `other` is covered by `self`
    pub fn is_all_gte(&self, other: &Coins) -> bool {
        other.0.iter().all(|(d, a)| self.amount_of(d) >= *a)
    }
}

impl From<Coin> for Coins {
    fn from(coin: Coin) -> Self {
        Coins::single(coin.amount, &coin.denom)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|c| c.to_string()).collect();
        f.write_str(&parts.join(","))
    }
}

impl FromStr for Coins {
    type Err = CoinError;

    /// Parses `10RUNE,5ATOM`; an empty string is the empty balance
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut coins = Coins::new();
        for part in s.split(',').filter(|p| !p.trim().is_empty()) {
            let coin: Coin = part.parse()?;
            coins = coins
                .checked_add(&coin.into())
                .ok_or_else(|| CoinError::Parse(s.to_string()))?;
        }
        Ok(coins)
    }
}
