// Ledger - account registry and the coin transfer primitive

use crate::identity::{Address, PublicKey};
use crate::ledger::Account;
use crate::types::Coins;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient funds: {address} has {available}, requires {required}")]
    InsufficientFunds {
        address: Address,
        available: Coins,
        required: Coins,
    },

    #[error("Account not found: {0}")]
    AccountNotFound(Address),

    #[error("Invalid sequence: expected {expected}, got {got}")]
    InvalidSequence { expected: u64, got: u64 },

    #[error("Balance overflow for {0}")]
    Overflow(Address),
}

/// Account table plus the total supply fixed at genesis
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    accounts: BTreeMap<Address, Account>,
    supply: Coins,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit genesis funds. The only path that increases total supply.
    pub fn mint_genesis(&mut self, address: Address, coins: &Coins) -> Result<(), LedgerError> {
        let supply = self
            .supply
            .checked_add(coins)
            .ok_or(LedgerError::Overflow(address))?;
        self.credit(address, coins)?;
        self.supply = supply;
        Ok(())
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn balances(&self, address: &Address) -> Coins {
        self.accounts
            .get(address)
            .map(|a| a.coins().clone())
            .unwrap_or_default()
    }

    pub fn balance(&self, address: &Address, denom: &str) -> u128 {
        self.accounts
            .get(address)
            .map(|a| a.coins().amount_of(denom))
            .unwrap_or(0)
    }

    pub fn total_supply(&self) -> &Coins {
        &self.supply
    }

    /// Sum over every account; equals total supply while the ledger is sound
    pub fn sum_of_balances(&self) -> Option<Coins> {
        self.accounts
            .values()
            .try_fold(Coins::new(), |acc, a| acc.checked_add(a.coins()))
    }

    /// Move coins between accounts. Everything is validated before either side
    /// is touched, so a failed transfer leaves both balances as they were.
    /// The recipient account is created on first credit.
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: &Coins) -> Result<(), LedgerError> {
        let sender = self
            .accounts
            .get(from)
            .ok_or(LedgerError::AccountNotFound(*from))?;

        let debited = sender
            .coins()
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientFunds {
                address: *from,
                available: sender.coins().clone(),
                required: amount.clone(),
            })?;

        if amount.is_zero() || from == to {
            return Ok(());
        }

        let credited = self
            .balances(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*to))?;

        if let Some(sender) = self.accounts.get_mut(from) {
            sender.set_coins(debited);
        }
        self.accounts
            .entry(*to)
            .or_insert_with(|| Account::new(*to))
            .set_coins(credited);
        Ok(())
    }

    fn credit(&mut self, to: Address, amount: &Coins) -> Result<(), LedgerError> {
        let account = self.accounts.entry(to).or_insert_with(|| Account::new(to));
        let coins = account
            .coins()
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(to))?;
        account.set_coins(coins);
        Ok(())
    }

    /// Read-only form of the sequence check
    pub fn check_sequence(&self, address: &Address, provided: u64) -> Result<(), LedgerError> {
        let account = self
            .accounts
            .get(address)
            .ok_or(LedgerError::AccountNotFound(*address))?;
        if account.sequence() != provided {
            return Err(LedgerError::InvalidSequence {
                expected: account.sequence(),
                got: provided,
            });
        }
        Ok(())
    }

    /// Replay protection: the provided sequence must equal the stored one,
    /// which then advances by exactly one. Returns the new sequence.
    pub fn check_and_increment_sequence(&mut self, address: &Address, provided: u64) -> Result<u64, LedgerError> {
        self.check_sequence(address, provided)?;
        let account = self
            .accounts
            .get_mut(address)
            .ok_or(LedgerError::AccountNotFound(*address))?;
        Ok(account.increment_sequence())
    }

    pub fn set_pub_key_if_missing(&mut self, address: &Address, pub_key: PublicKey) {
        if let Some(account) = self.accounts.get_mut(address) {
            if account.pub_key().is_none() {
                account.set_pub_key(pub_key);
            }
        }
    }

    /// Reinsert a persisted account record
    pub(crate) fn restore(accounts: Vec<Account>, supply: Coins) -> Self {
        Self {
            accounts: accounts.into_iter().map(|a| (*a.address(), a)).collect(),
            supply,
        }
    }
}
