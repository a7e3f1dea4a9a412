use crate::gov::{ProposalContent, ProposalType, VoteOption};
use crate::identity::{Address, ModuleAccount, PublicKey};
use crate::tx::TxError;
use crate::types::{Coin, Coins, Rational};
use serde::{Deserialize, Serialize};

pub const MAX_MEMO_LEN: usize = 256;
pub const MAX_MONIKER_LEN: usize = 70;

/// Every state-changing operation the router accepts. Dispatch is a
/// match over this enum; there is no open registration of handlers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Msg {
    Send {
        from: Address,
        to: Address,
        amount: Coins,
        memo: Option<String>,
    },
    CreateValidator {
        owner: Address,
        consensus_pubkey: PublicKey,
        self_bond: Coin,
        moniker: String,
    },
    Delegate {
        delegator: Address,
        validator: Address,
        amount: Coin,
    },
    BeginUnbond {
        delegator: Address,
        validator: Address,
        shares: Rational,
    },
    SubmitProposal {
        proposer: Address,
        title: String,
        description: String,
        proposal_type: ProposalType,
        initial_deposit: Coins,
    },
    Deposit {
        depositor: Address,
        proposal_id: u64,
        amount: Coins,
    },
    Vote {
        voter: Address,
        proposal_id: u64,
        /// Wire byte, see `VoteOption::code`
        option: u8,
    },
}

/// Module that owns a message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Bank,
    Staking,
    Gov,
}

impl Msg {
    /// Address that must have signed the enclosing transaction
    pub fn signer(&self) -> &Address {
        match self {
            Msg::Send { from, .. } => from,
            Msg::CreateValidator { owner, .. } => owner,
            Msg::Delegate { delegator, .. } => delegator,
            Msg::BeginUnbond { delegator, .. } => delegator,
            Msg::SubmitProposal { proposer, .. } => proposer,
            Msg::Deposit { depositor, .. } => depositor,
            Msg::Vote { voter, .. } => voter,
        }
    }

    pub fn route(&self) -> Route {
        match self {
            Msg::Send { .. } => Route::Bank,
            Msg::CreateValidator { .. } | Msg::Delegate { .. } | Msg::BeginUnbond { .. } => Route::Staking,
            Msg::SubmitProposal { .. } | Msg::Deposit { .. } | Msg::Vote { .. } => Route::Gov,
        }
    }

    /// Event kind emitted when the message applies
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Send { .. } => "send",
            Msg::CreateValidator { .. } => "create_validator",
            Msg::Delegate { .. } => "delegate",
            Msg::BeginUnbond { .. } => "begin_unbond",
            Msg::SubmitProposal { .. } => "submit_proposal",
            Msg::Deposit { .. } => "deposit",
            Msg::Vote { .. } => "vote",
        }
    }

    /// Stateless checks, run before anything touches state
    pub fn validate_basic(&self) -> Result<(), TxError> {
        match self {
            Msg::Send { to, amount, memo, .. } => {
                // module balances move only through their own keepers
                if let Some(module) = ModuleAccount::from_address(to) {
                    return Err(TxError::BlockedRecipient(module.name()));
                }
                check_coins(amount)?;
                if amount.is_zero() {
                    return Err(TxError::InvalidAmount);
                }
                if let Some(memo) = memo {
                    if memo.len() > MAX_MEMO_LEN {
                        return Err(TxError::MemoTooLong(memo.len()));
                    }
                }
            }
            Msg::CreateValidator { self_bond, moniker, .. } => {
                check_coin(self_bond)?;
                if moniker.trim().is_empty() || moniker.len() > MAX_MONIKER_LEN {
                    return Err(TxError::InvalidMoniker(moniker.clone()));
                }
            }
            Msg::Delegate { amount, .. } => check_coin(amount)?,
            Msg::BeginUnbond { shares, .. } => {
                if shares.is_zero() {
                    return Err(TxError::InvalidAmount);
                }
            }
            Msg::SubmitProposal {
                title,
                description,
                proposal_type,
                initial_deposit,
                ..
            } => {
                check_coins(initial_deposit)?;
                ProposalContent {
                    title: title.clone(),
                    description: description.clone(),
                    proposal_type: *proposal_type,
                }
                .validate()?;
            }
            Msg::Deposit { amount, .. } => {
                check_coins(amount)?;
                if amount.is_zero() {
                    return Err(TxError::InvalidAmount);
                }
            }
            Msg::Vote { option, .. } => {
                VoteOption::try_from(*option).map_err(TxError::from)?;
            }
        }
        Ok(())
    }
}

fn check_coin(coin: &Coin) -> Result<(), TxError> {
    coin.validate()
        .map_err(|_| TxError::InvalidDenom(coin.denom.clone()))?;
    if coin.amount == 0 {
        return Err(TxError::InvalidAmount);
    }
    Ok(())
}

fn check_coins(coins: &Coins) -> Result<(), TxError> {
    coins
        .validate()
        .map_err(|e| TxError::InvalidDenom(e.to_string()))
}

impl From<VoteOption> for u8 {
    fn from(option: VoteOption) -> Self {
        option.code()
    }
}
