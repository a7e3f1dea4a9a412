// Staking module - validators, delegations, unbonding and the bonded set

mod keeper;
mod validator;

pub use keeper::{Staking, StakingError, StakingParams};
pub use validator::{Delegation, UnbondingEntry, Validator, ValidatorStatus, ValidatorUpdate};
