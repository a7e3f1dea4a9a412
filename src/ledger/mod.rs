// Ledger module - accounts, balances, transfers and replay protection

mod account;
mod bank;

pub use account::Account;
pub use bank::{Ledger, LedgerError};
