// Governance module - proposals, deposit escrow, votes and tallying

mod keeper;
mod listing;
mod proposal;

pub use keeper::{
    DepositPolicy, GovError, GovParams, Governance, ProposalContent, ProposalOutcome, MAX_DESCRIPTION_LEN,
    MAX_TITLE_LEN,
};
pub use listing::{format_listing, ProposalFilter, NO_MATCHING_PROPOSALS};
pub use proposal::{Deposit, Proposal, ProposalStatus, ProposalType, TallyResult, Vote, VoteOption};
