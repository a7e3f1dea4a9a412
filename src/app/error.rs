use crate::gov::GovError;
use crate::ledger::LedgerError;
use crate::staking::StakingError;
use thiserror::Error;

/// A condition that means the state machine itself is wrong. The node
/// must stop instead of committing diverged state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Block hook failed: {0}")]
    BlockHook(String),

    #[error("Unexpected block: {0}")]
    InvalidBlock(String),
}

impl From<LedgerError> for FatalError {
    fn from(err: LedgerError) -> Self {
        FatalError::BlockHook(err.to_string())
    }
}

impl From<GovError> for FatalError {
    fn from(err: GovError) -> Self {
        FatalError::BlockHook(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenesisError {
    #[error("Empty chain id")]
    EmptyChainId,

    #[error("Duplicate genesis account: {0}")]
    DuplicateAccount(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Staking(#[from] StakingError),

    #[error(transparent)]
    Fatal(#[from] FatalError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Validator not found: {0}")]
    ValidatorNotFound(String),

    #[error("Delegation not found: {0}")]
    DelegationNotFound(String),

    #[error("Proposal not found: {0}")]
    ProposalNotFound(u64),

    #[error("Vote not found: proposal {0}, voter {1}")]
    VoteNotFound(u64, String),

    #[error("Deposit not found: proposal {0}, depositor {1}")]
    DepositNotFound(u64, String),
}
