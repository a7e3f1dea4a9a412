use crate::gov::{Governance, Proposal, ProposalStatus};
use crate::identity::Address;
use serde::{Deserialize, Serialize};

pub const NO_MATCHING_PROPOSALS: &str = "No matching proposals found";

/// Query filter for proposal listings. `latest` restricts the candidate set
/// to the N highest proposal ids before the other filters apply.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalFilter {
    pub status: Option<ProposalStatus>,
    pub depositor: Option<Address>,
    pub voter: Option<Address>,
    pub latest: Option<usize>,
}

impl ProposalFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: ProposalStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_depositor(mut self, depositor: Address) -> Self {
        self.depositor = Some(depositor);
        self
    }

    pub fn with_voter(mut self, voter: Address) -> Self {
        self.voter = Some(voter);
        self
    }

    pub fn with_latest(mut self, n: usize) -> Self {
        self.latest = Some(n);
        self
    }
}

impl Governance {
    /// Proposals matching `filter`, in ascending id order
    pub fn filter_proposals(&self, filter: &ProposalFilter) -> Vec<&Proposal> {
        let mut candidates: Vec<&Proposal> = match filter.latest {
            Some(n) => {
                let mut newest: Vec<&Proposal> = self.proposals().rev().take(n).collect();
                newest.reverse();
                newest
            }
            None => self.proposals().collect(),
        };

        candidates.retain(|p| {
            filter.status.is_none_or(|s| p.status == s)
                && filter
                    .depositor
                    .is_none_or(|d| self.deposit_record(p.id, &d).is_some())
                && filter
                    .voter
                    .is_none_or(|v| self.vote_record(p.id, &v).is_some())
        });
        candidates
    }

    /// One `"<id> - <title>"` line per matching proposal
    pub fn list_proposals(&self, filter: &ProposalFilter) -> String {
        format_listing(&self.filter_proposals(filter))
    }
}

pub fn format_listing(proposals: &[&Proposal]) -> String {
    if proposals.is_empty() {
        return NO_MATCHING_PROPOSALS.to_string();
    }
    proposals
        .iter()
        .map(|p| format!("{} - {}", p.id, p.title))
        .collect::<Vec<_>>()
        .join("\n")
}
