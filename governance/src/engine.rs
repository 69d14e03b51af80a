//! Vote casting.

use crate::delegation::DelegationRegistry;
use crate::error::GovernanceError;
use crate::lifecycle::ProposalLifecycle;
use agora_store::{GovernanceStore, StoreError, VoteRecord};
use agora_types::{BalanceOracle, Clock, ProposalId, Timestamp, VoteChoice, WalletAddress};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Confirmation of a recorded vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub proposal_id: ProposalId,
    pub voter: WalletAddress,
    pub choice: VoteChoice,
    /// Voting power snapshotted from the balance oracle at `timestamp`.
    pub weight: u64,
    pub timestamp: Timestamp,
}

impl From<VoteRecord> for VoteReceipt {
    fn from(record: VoteRecord) -> Self {
        Self {
            proposal_id: record.proposal_id,
            voter: record.voter,
            choice: record.choice,
            weight: record.weight,
            timestamp: record.cast_at,
        }
    }
}

pub struct VotingEngine {
    store: Arc<dyn GovernanceStore>,
    clock: Arc<dyn Clock>,
    oracle: Arc<dyn BalanceOracle>,
    lifecycle: Arc<ProposalLifecycle>,
    registry: Arc<DelegationRegistry>,
}

impl VotingEngine {
    pub fn new(
        store: Arc<dyn GovernanceStore>,
        clock: Arc<dyn Clock>,
        oracle: Arc<dyn BalanceOracle>,
        lifecycle: Arc<ProposalLifecycle>,
        registry: Arc<DelegationRegistry>,
    ) -> Self {
        Self {
            store,
            clock,
            oracle,
            lifecycle,
            registry,
        }
    }

    /// Record `voter`'s vote with its current voting power.
    ///
    /// Checks run in this order, so a repeat vote always reports
    /// `AlreadyVoted` and a delegated voter always reports
    /// `DelegationActive`, whatever the proposal's state:
    /// proposal exists, not yet voted, not delegated, still open, non-zero
    /// weight. The record and the weight then commit together or not at all.
    pub fn cast_vote(
        &self,
        proposal_id: &ProposalId,
        voter: &WalletAddress,
        choice: VoteChoice,
    ) -> Result<VoteReceipt, GovernanceError> {
        let proposal = self.lifecycle.get(proposal_id)?;

        // Fast path only; the unique insert in commit_vote is authoritative.
        if self.store.get_vote(proposal_id, voter)?.is_some() {
            return Err(self.already_voted(proposal_id, voter));
        }
        if self.registry.is_delegated(voter)? {
            debug!(proposal = %proposal_id, voter = %voter, "vote refused: delegated");
            return Err(GovernanceError::DelegationActive(voter.clone()));
        }

        let now = self.clock.now();
        if !proposal.is_open_at(now) {
            return Err(GovernanceError::ProposalNotActive(*proposal_id));
        }

        let weight = self.oracle.weight_of(voter, now)?;
        if weight == 0 {
            return Err(GovernanceError::ZeroWeight(voter.clone()));
        }

        let record = VoteRecord {
            proposal_id: *proposal_id,
            voter: voter.clone(),
            choice,
            weight,
            cast_at: now,
        };
        self.store.commit_vote(&record).map_err(|e| match e {
            StoreError::Duplicate(_) => self.already_voted(proposal_id, voter),
            StoreError::Inactive(_) => GovernanceError::ProposalNotActive(*proposal_id),
            StoreError::NotFound(_) => GovernanceError::ProposalNotFound(*proposal_id),
            other => other.into(),
        })?;

        info!(
            proposal = %proposal_id,
            voter = %voter,
            choice = %choice,
            weight,
            "vote recorded"
        );
        Ok(record.into())
    }

    /// The recorded vote of `voter` on `proposal_id`, if any.
    pub fn vote_of(
        &self,
        proposal_id: &ProposalId,
        voter: &WalletAddress,
    ) -> Result<Option<VoteReceipt>, GovernanceError> {
        self.lifecycle.get(proposal_id)?;
        Ok(self.store.get_vote(proposal_id, voter)?.map(VoteReceipt::from))
    }

    /// Every vote recorded on `proposal_id`.
    pub fn votes_for(&self, proposal_id: &ProposalId) -> Result<Vec<VoteReceipt>, GovernanceError> {
        self.lifecycle.get(proposal_id)?;
        Ok(self
            .store
            .get_votes(proposal_id)?
            .into_iter()
            .map(VoteReceipt::from)
            .collect())
    }

    fn already_voted(&self, proposal_id: &ProposalId, voter: &WalletAddress) -> GovernanceError {
        debug!(proposal = %proposal_id, voter = %voter, "vote refused: already voted");
        GovernanceError::AlreadyVoted {
            proposal: *proposal_id,
            voter: voter.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_nullables::{NullBalanceOracle, NullClock, NullGovernanceStore};
    use agora_store::{ProposalRecord, ProposalStore};
    use agora_types::Category;

    fn wallet(n: u8) -> WalletAddress {
        WalletAddress::parse(&format!("0x{}", format!("{n:02x}").repeat(20))).unwrap()
    }

    struct Fixture {
        store: Arc<NullGovernanceStore>,
        clock: Arc<NullClock>,
        oracle: Arc<NullBalanceOracle>,
        registry: Arc<DelegationRegistry>,
        engine: VotingEngine,
        proposal: ProposalId,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(NullGovernanceStore::new());
        let clock = Arc::new(NullClock::new(1_000));
        let oracle = Arc::new(
            NullBalanceOracle::new()
                .with_balance(&wallet(1), 850_000)
                .with_balance(&wallet(2), 390_000),
        );
        let lifecycle = Arc::new(ProposalLifecycle::new(store.clone(), clock.clone(), 1_000));
        let registry = Arc::new(DelegationRegistry::new(store.clone(), clock.clone()));
        let engine = VotingEngine::new(
            store.clone(),
            clock.clone(),
            oracle.clone(),
            lifecycle,
            registry.clone(),
        );
        let proposal = ProposalRecord::new(
            ProposalId::new([5; 32]),
            "Lower listing fee".into(),
            String::new(),
            Category::FeeStructure,
            wallet(9),
            Timestamp::new(1_000),
            Timestamp::new(2_000),
            1_000,
        );
        store.insert_proposal(&proposal).unwrap();
        Fixture {
            store,
            clock,
            oracle,
            registry,
            engine,
            proposal: proposal.id,
        }
    }

    #[test]
    fn test_vote_records_snapshot_weight() {
        let f = fixture();
        let receipt = f.engine.cast_vote(&f.proposal, &wallet(1), VoteChoice::Yes).unwrap();
        assert_eq!(receipt.weight, 850_000);
        assert_eq!(receipt.timestamp, Timestamp::new(1_000));

        // Later balance changes do not touch the recorded weight.
        f.oracle.set_balance(&wallet(1), 1);
        let stored = f.engine.vote_of(&f.proposal, &wallet(1)).unwrap().unwrap();
        assert_eq!(stored, receipt);
    }

    #[test]
    fn test_second_vote_is_refused_and_tally_unchanged() {
        let f = fixture();
        f.engine.cast_vote(&f.proposal, &wallet(1), VoteChoice::Yes).unwrap();
        let err = f
            .engine
            .cast_vote(&f.proposal, &wallet(1), VoteChoice::No)
            .unwrap_err();
        assert!(matches!(err, GovernanceError::AlreadyVoted { .. }));

        let p = f.store.get_proposal(&f.proposal).unwrap();
        assert_eq!((p.weight_yes, p.weight_no, p.weight_abstain), (850_000, 0, 0));
    }

    #[test]
    fn test_second_vote_after_close_still_already_voted() {
        let f = fixture();
        f.engine.cast_vote(&f.proposal, &wallet(1), VoteChoice::Yes).unwrap();
        f.clock.set(5_000);
        assert!(matches!(
            f.engine.cast_vote(&f.proposal, &wallet(1), VoteChoice::Yes),
            Err(GovernanceError::AlreadyVoted { .. })
        ));
    }

    #[test]
    fn test_delegated_voter_refused_regardless_of_state() {
        let f = fixture();
        f.registry.delegate(&wallet(2), wallet(1).as_str()).unwrap();
        assert!(matches!(
            f.engine.cast_vote(&f.proposal, &wallet(2), VoteChoice::No),
            Err(GovernanceError::DelegationActive(_))
        ));

        f.clock.set(5_000);
        assert!(matches!(
            f.engine.cast_vote(&f.proposal, &wallet(2), VoteChoice::No),
            Err(GovernanceError::DelegationActive(_))
        ));

        // Delegation never forwards weight to the delegate.
        let p = f.store.get_proposal(&f.proposal).unwrap();
        assert_eq!(p.total_weight(), 0);
    }

    #[test]
    fn test_undelegated_voter_can_vote() {
        let f = fixture();
        f.registry.delegate(&wallet(2), wallet(1).as_str()).unwrap();
        f.registry.undelegate(&wallet(2)).unwrap();
        let receipt = f.engine.cast_vote(&f.proposal, &wallet(2), VoteChoice::No).unwrap();
        assert_eq!(receipt.weight, 390_000);
    }

    #[test]
    fn test_vote_at_deadline_is_refused() {
        let f = fixture();
        f.clock.set(2_000);
        assert!(matches!(
            f.engine.cast_vote(&f.proposal, &wallet(1), VoteChoice::Yes),
            Err(GovernanceError::ProposalNotActive(_))
        ));
    }

    #[test]
    fn test_zero_weight() {
        let f = fixture();
        assert!(matches!(
            f.engine.cast_vote(&f.proposal, &wallet(7), VoteChoice::Yes),
            Err(GovernanceError::ZeroWeight(_))
        ));
        assert!(f.engine.votes_for(&f.proposal).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_proposal() {
        let f = fixture();
        assert!(matches!(
            f.engine.cast_vote(&ProposalId::new([0xee; 32]), &wallet(1), VoteChoice::Yes),
            Err(GovernanceError::ProposalNotFound(_))
        ));
    }

    #[test]
    fn test_oracle_outage_is_transient_and_records_nothing() {
        let f = fixture();
        f.oracle.set_unavailable(true);
        let err = f
            .engine
            .cast_vote(&f.proposal, &wallet(1), VoteChoice::Yes)
            .unwrap_err();
        assert!(err.is_transient());
        assert!(f.engine.vote_of(&f.proposal, &wallet(1)).unwrap().is_none());

        f.oracle.set_unavailable(false);
        f.engine.cast_vote(&f.proposal, &wallet(1), VoteChoice::Yes).unwrap();
    }

    #[test]
    fn test_store_outage_is_transient() {
        let f = fixture();
        f.store.set_fail_writes(true);
        let err = f
            .engine
            .cast_vote(&f.proposal, &wallet(1), VoteChoice::Yes)
            .unwrap_err();
        assert!(err.is_transient());
        f.store.set_fail_writes(false);
        assert_eq!(f.store.get_proposal(&f.proposal).unwrap().total_weight(), 0);
    }
}
