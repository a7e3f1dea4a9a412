use crate::gov::GovError;
use crate::identity::Address;
use crate::types::{Coins, Rational};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle: DepositPeriod -> VotingPeriod -> {Passed, Rejected}, or
/// DepositPeriod -> Failed. Never backward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    DepositPeriod,
    VotingPeriod,
    Passed,
    Rejected,
    Failed,
}

impl ProposalStatus {
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Passed | ProposalStatus::Rejected | ProposalStatus::Failed
        )
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step
    pub fn can_transition_to(&self, next: ProposalStatus) -> bool {
        use ProposalStatus::*;
        matches!(
            (self, next),
            (DepositPeriod, VotingPeriod)
                | (DepositPeriod, Failed)
                | (VotingPeriod, Passed)
                | (VotingPeriod, Rejected)
        )
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProposalStatus::DepositPeriod => "DepositPeriod",
            ProposalStatus::VotingPeriod => "VotingPeriod",
            ProposalStatus::Passed => "Passed",
            ProposalStatus::Rejected => "Rejected",
            ProposalStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

impl FromStr for ProposalStatus {
    type Err = GovError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DepositPeriod" => Ok(ProposalStatus::DepositPeriod),
            "VotingPeriod" => Ok(ProposalStatus::VotingPeriod),
            "Passed" => Ok(ProposalStatus::Passed),
            "Rejected" => Ok(ProposalStatus::Rejected),
            "Failed" => Ok(ProposalStatus::Failed),
            other => Err(GovError::InvalidProposalStatus(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalType {
    Text,
    ParameterChange,
    SoftwareUpgrade,
}

impl fmt::Display for ProposalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProposalType::Text => "Text",
            ProposalType::ParameterChange => "ParameterChange",
            ProposalType::SoftwareUpgrade => "SoftwareUpgrade",
        };
        f.write_str(s)
    }
}

impl FromStr for ProposalType {
    type Err = GovError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Text" => Ok(ProposalType::Text),
            "ParameterChange" => Ok(ProposalType::ParameterChange),
            "SoftwareUpgrade" => Ok(ProposalType::SoftwareUpgrade),
            other => Err(GovError::InvalidProposalType(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteOption {
    Yes,
    No,
    Abstain,
    NoWithVeto,
}

impl VoteOption {
    /// Wire byte carried by vote messages
    pub fn code(&self) -> u8 {
        match self {
            VoteOption::Yes => 1,
            VoteOption::Abstain => 2,
            VoteOption::No => 3,
            VoteOption::NoWithVeto => 4,
        }
    }
}

impl TryFrom<u8> for VoteOption {
    type Error = GovError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(VoteOption::Yes),
            2 => Ok(VoteOption::Abstain),
            3 => Ok(VoteOption::No),
            4 => Ok(VoteOption::NoWithVeto),
            other => Err(GovError::InvalidOption(other.to_string())),
        }
    }
}

impl fmt::Display for VoteOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VoteOption::Yes => "Yes",
            VoteOption::No => "No",
            VoteOption::Abstain => "Abstain",
            VoteOption::NoWithVeto => "NoWithVeto",
        };
        f.write_str(s)
    }
}

impl FromStr for VoteOption {
    type Err = GovError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Yes" => Ok(VoteOption::Yes),
            "No" => Ok(VoteOption::No),
            "Abstain" => Ok(VoteOption::Abstain),
            "NoWithVeto" => Ok(VoteOption::NoWithVeto),
            other => Err(GovError::InvalidOption(other.to_string())),
        }
    }
}

/// Stake-weighted vote totals, in token-equivalents
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyResult {
    pub yes: Rational,
    pub no: Rational,
    pub abstain: Rational,
    pub no_with_veto: Rational,
}

impl TallyResult {
    pub(crate) fn add(&mut self, option: VoteOption, power: &Rational) -> Option<()> {
        let slot = match option {
            VoteOption::Yes => &mut self.yes,
            VoteOption::No => &mut self.no,
            VoteOption::Abstain => &mut self.abstain,
            VoteOption::NoWithVeto => &mut self.no_with_veto,
        };
        *slot = slot.checked_add(power)?;
        Some(())
    }

    pub fn total(&self) -> Option<Rational> {
        self.yes
            .checked_add(&self.no)?
            .checked_add(&self.abstain)?
            .checked_add(&self.no_with_veto)
    }

    /// Total excluding abstentions
    pub fn total_non_abstain(&self) -> Option<Rational> {
        self.yes.checked_add(&self.no)?.checked_add(&self.no_with_veto)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    pub proposer: Address,
    pub title: String,
    pub description: String,
    pub proposal_type: ProposalType,
    pub status: ProposalStatus,
    pub total_deposit: Coins,
    pub submit_time: u64,
    pub deposit_end_time: u64,
    pub voting_start_time: Option<u64>,
    pub voting_end_time: Option<u64>,
    pub final_tally: Option<TallyResult>,
}

impl Proposal {
    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub proposal_id: u64,
    pub depositor: Address,
    pub amount: Coins,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub proposal_id: u64,
    pub voter: Address,
    pub option: VoteOption,
}

impl Vote {
    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}
