//! Pure tally arithmetic over a proposal's weight buckets.

use agora_store::ProposalRecord;
use agora_types::Outcome;
use serde::{Deserialize, Serialize};

/// Share of the participating weight per choice, in percent with one decimal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Percentages {
    pub yes: f64,
    pub no: f64,
    pub abstain: f64,
}

/// Everything a view needs to present a proposal's standing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub weight_yes: u64,
    pub weight_no: u64,
    pub weight_abstain: u64,
    pub total_weight: u128,
    pub percentages: Percentages,
    pub quorum_reached: bool,
    /// Final outcome if the proposal has closed, projected outcome otherwise.
    pub outcome: Outcome,
}

pub struct TallyCalculator;

impl TallyCalculator {
    /// `weight / total * 100`, rounded half-up to one decimal place.
    ///
    /// All zeros when nobody has voted.
    pub fn percentages(proposal: &ProposalRecord) -> Percentages {
        let total = proposal.total_weight();
        if total == 0 {
            return Percentages::default();
        }
        Percentages {
            yes: percent_tenths(proposal.weight_yes, total),
            no: percent_tenths(proposal.weight_no, total),
            abstain: percent_tenths(proposal.weight_abstain, total),
        }
    }

    pub fn quorum_reached(proposal: &ProposalRecord, threshold: u64) -> bool {
        proposal.total_weight() >= threshold as u128
    }

    /// Ties reject.
    pub fn outcome(proposal: &ProposalRecord, threshold: u64) -> Outcome {
        if !Self::quorum_reached(proposal, threshold) {
            Outcome::QuorumFailed
        } else if proposal.weight_yes > proposal.weight_no {
            Outcome::Passed
        } else {
            Outcome::Rejected
        }
    }

    pub fn tally(proposal: &ProposalRecord, threshold: u64) -> Tally {
        Tally {
            weight_yes: proposal.weight_yes,
            weight_no: proposal.weight_no,
            weight_abstain: proposal.weight_abstain,
            total_weight: proposal.total_weight(),
            percentages: Self::percentages(proposal),
            quorum_reached: Self::quorum_reached(proposal, threshold),
            outcome: Self::outcome(proposal, threshold),
        }
    }
}

fn percent_tenths(weight: u64, total: u128) -> f64 {
    // weight <= total < 2^66, so weight * 1000 fits comfortably in u128.
    let tenths = (weight as u128 * 1000 + total / 2) / total;
    tenths as f64 / 10.0
}
