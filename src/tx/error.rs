use crate::gov::GovError;
use crate::identity::Address;
use crate::ledger::LedgerError;
use crate::staking::StakingError;
use thiserror::Error;

/// Why a transaction was rejected. Every variant aborts the whole
/// transaction; none of them is fatal to the node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    #[error("Transaction has no messages")]
    EmptyTransaction,

    #[error("Wrong chain id: expected {expected}, got {got}")]
    WrongChainId { expected: String, got: String },

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Message signer {msg_signer} does not match transaction signer {tx_signer}")]
    Unauthorized { tx_signer: Address, msg_signer: Address },

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Invalid denomination: {0}")]
    InvalidDenom(String),

    #[error("Invalid moniker: '{0}'")]
    InvalidMoniker(String),

    #[error("Memo too long: {0} bytes")]
    MemoTooLong(usize),

    #[error("Module account '{0}' cannot receive transfers")]
    BlockedRecipient(&'static str),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Staking(#[from] StakingError),

    #[error(transparent)]
    Gov(#[from] GovError),
}

impl TxError {
    /// Stable error kind reported to clients
    pub fn code(&self) -> &'static str {
        match self {
            TxError::EmptyTransaction => "EmptyTransaction",
            TxError::WrongChainId { .. } => "WrongChainId",
            TxError::InvalidSignature => "InvalidSignature",
            TxError::Unauthorized { .. } => "Unauthorized",
            TxError::InvalidAmount => "InvalidAmount",
            TxError::InvalidDenom(_) => "InvalidDenom",
            TxError::InvalidMoniker(_) => "InvalidMoniker",
            TxError::MemoTooLong(_) => "MemoTooLong",
            TxError::BlockedRecipient(_) => "BlockedRecipient",
            TxError::Ledger(e) => ledger_code(e),
            TxError::Staking(e) => match e {
                StakingError::ValidatorAlreadyExists(_) => "ValidatorAlreadyExists",
                StakingError::ConsensusKeyInUse(_) => "ConsensusKeyInUse",
                StakingError::ValidatorNotFound(_) => "ValidatorNotFound",
                StakingError::DelegationNotFound { .. } => "DelegationNotFound",
                StakingError::InsufficientShares { .. } => "InsufficientShares",
                StakingError::InvalidDenom { .. } => "InvalidDenom",
                StakingError::InvalidAmount | StakingError::FractionalUnbond(_) => "InvalidAmount",
                StakingError::ArithmeticOverflow => "ArithmeticOverflow",
                StakingError::Ledger(e) => ledger_code(e),
            },
            TxError::Gov(e) => match e {
                GovError::ProposalNotFound(_) => "ProposalNotFound",
                GovError::DepositTooLate(_) => "DepositTooLate",
                GovError::VoteOutsideVotingPeriod(_) => "VoteOutsideVotingPeriod",
                GovError::InvalidOption(_) => "InvalidOption",
                GovError::InvalidProposal(_) | GovError::InvalidProposalStatus(_) => "InvalidProposal",
                GovError::InvalidProposalType(_) => "InvalidProposalType",
                GovError::InvalidAmount => "InvalidAmount",
                GovError::ArithmeticOverflow => "ArithmeticOverflow",
                GovError::Ledger(e) => ledger_code(e),
            },
        }
    }
}

fn ledger_code(e: &LedgerError) -> &'static str {
    match e {
        LedgerError::InsufficientFunds { .. } => "InsufficientFunds",
        LedgerError::AccountNotFound(_) => "AccountNotFound",
        LedgerError::InvalidSequence { .. } => "InvalidSequence",
        LedgerError::Overflow(_) => "ArithmeticOverflow",
    }
}
