// runechain - deterministic ledger, staking and governance state machine

pub mod app;
pub mod gov;
pub mod identity;
pub mod ledger;
pub mod staking;
pub mod storage;
pub mod tx;
pub mod types;
