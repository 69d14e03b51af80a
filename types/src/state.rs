//! Proposal lifecycle states and tally outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a proposal is in its lifecycle.
///
/// `Active → Closed → {Passed | Rejected | QuorumFailed}`, and `Passed → Executed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalState {
    /// Deposit confirmed; accepting votes until the deadline.
    Active,
    /// Deadline reached; outcome not yet recorded.
    Closed,
    /// Quorum met and yes outweighed no.
    Passed,
    /// Quorum met but no majority for yes.
    Rejected,
    /// Not enough participating weight.
    QuorumFailed,
    /// A passed proposal that has been carried out externally.
    Executed,
}

impl ProposalState {
    /// Whether votes may still be recorded (deadline aside).
    pub fn accepts_votes(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether an outcome has been recorded.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Passed | Self::Rejected | Self::QuorumFailed | Self::Executed
        )
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    pub fn can_transition_to(&self, next: ProposalState) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Closed)
                | (Self::Closed, Self::Passed)
                | (Self::Closed, Self::Rejected)
                | (Self::Closed, Self::QuorumFailed)
                | (Self::Passed, Self::Executed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
            Self::Passed => "passed",
            Self::Rejected => "rejected",
            Self::QuorumFailed => "quorum_failed",
            Self::Executed => "executed",
        }
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of tallying a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Rejected,
    QuorumFailed,
}

impl Outcome {
    /// The lifecycle state that records this outcome.
    pub fn final_state(&self) -> ProposalState {
        match self {
            Self::Passed => ProposalState::Passed,
            Self::Rejected => ProposalState::Rejected,
            Self::QuorumFailed => ProposalState::QuorumFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_is_reachable_only_from_active() {
        assert!(ProposalState::Active.can_transition_to(ProposalState::Closed));
        assert!(!ProposalState::Passed.can_transition_to(ProposalState::Closed));
        assert!(!ProposalState::Closed.can_transition_to(ProposalState::Closed));
    }

    #[test]
    fn only_passed_proposals_execute() {
        assert!(ProposalState::Passed.can_transition_to(ProposalState::Executed));
        assert!(!ProposalState::Rejected.can_transition_to(ProposalState::Executed));
        assert!(!ProposalState::Active.can_transition_to(ProposalState::Executed));
    }

    #[test]
    fn outcome_maps_to_final_state() {
        for outcome in [Outcome::Passed, Outcome::Rejected, Outcome::QuorumFailed] {
            assert!(ProposalState::Closed.can_transition_to(outcome.final_state()));
            assert!(outcome.final_state().is_final());
        }
    }
}
