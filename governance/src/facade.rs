//! The single entry point for everything outside the governance crate.

use crate::delegation::DelegationRegistry;
use crate::engine::{VoteReceipt, VotingEngine};
use crate::error::GovernanceError;
use crate::lifecycle::{ProposalFilter, ProposalIter, ProposalLifecycle};

pub use crate::lifecycle::STAT_PROPOSALS_CLOSED;
use crate::params::GovernanceParams;
use crate::tally::{Tally, TallyCalculator};
use agora_store::{GovernanceStore, ProposalCursor, ProposalRecord};
use agora_types::{
    BalanceOracle, Category, Clock, DepositEscrow, DepositProof, ProposalId, ProposalState,
    Timestamp, VoteChoice, WalletAddress,
};
use agora_utils::{format_duration, StatsCounter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub const STAT_PROPOSALS_CREATED: &str = "proposals_created";
pub const STAT_VOTES_CAST: &str = "votes_cast";
pub const STAT_VOTES_REJECTED: &str = "votes_rejected";
pub const STAT_DELEGATIONS_SET: &str = "delegations_set";
pub const STAT_DELEGATIONS_CLEARED: &str = "delegations_cleared";

const STAT_NAMES: &[&str] = &[
    STAT_PROPOSALS_CREATED,
    STAT_VOTES_CAST,
    STAT_VOTES_REJECTED,
    STAT_DELEGATIONS_SET,
    STAT_DELEGATIONS_CLEARED,
    STAT_PROPOSALS_CLOSED,
];

/// What a member submits to open a proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDraft {
    pub title: String,
    pub category: Category,
    #[serde(default)]
    pub description: String,
    /// Falls back to the configured default when absent.
    #[serde(default)]
    pub voting_period_secs: Option<u64>,
}

/// A proposal with its live tally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProposalView {
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub creator: WalletAddress,
    pub created_at: Timestamp,
    pub voting_deadline: Timestamp,
    pub state: ProposalState,
    pub discussion_count: u32,
    pub deposit: u64,
    pub tally: Tally,
    /// Human-readable time left to vote, `None` once voting has ended.
    pub time_remaining: Option<String>,
}

impl ProposalView {
    pub fn new(proposal: ProposalRecord, quorum_threshold: u64, now: Timestamp) -> Self {
        let tally = TallyCalculator::tally(&proposal, quorum_threshold);
        let time_remaining = proposal
            .is_open_at(now)
            .then(|| format_duration(proposal.voting_deadline.remaining_from(now)));
        Self {
            id: proposal.id,
            title: proposal.title,
            description: proposal.description,
            category: proposal.category,
            creator: proposal.creator,
            created_at: proposal.created_at,
            voting_deadline: proposal.voting_deadline,
            state: proposal.state,
            discussion_count: proposal.discussion_count,
            deposit: proposal.deposit,
            tally,
            time_remaining,
        }
    }

    pub fn cursor(&self) -> ProposalCursor {
        ProposalCursor {
            created_at: self.created_at,
            id: self.id,
        }
    }
}

/// Acknowledgement for idempotent operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Whether the call changed anything.
    pub changed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationStatus {
    pub voter: WalletAddress,
    pub delegate: Option<WalletAddress>,
    pub since: Option<Timestamp>,
    /// Accounts delegating to this voter. Informational; adds no weight.
    pub delegators: Vec<WalletAddress>,
}

pub struct GovernanceFacade {
    clock: Arc<dyn Clock>,
    escrow: Arc<dyn DepositEscrow>,
    params: GovernanceParams,
    lifecycle: Arc<ProposalLifecycle>,
    registry: Arc<DelegationRegistry>,
    engine: VotingEngine,
    stats: Arc<StatsCounter>,
}

impl GovernanceFacade {
    pub fn new(
        store: Arc<dyn GovernanceStore>,
        clock: Arc<dyn Clock>,
        oracle: Arc<dyn BalanceOracle>,
        escrow: Arc<dyn DepositEscrow>,
        params: GovernanceParams,
    ) -> Self {
        let stats = Arc::new(StatsCounter::new(STAT_NAMES));
        let lifecycle = Arc::new(
            ProposalLifecycle::new(Arc::clone(&store), Arc::clone(&clock), params.quorum_threshold)
                .with_stats(Arc::clone(&stats)),
        );
        let registry = Arc::new(DelegationRegistry::new(Arc::clone(&store), Arc::clone(&clock)));
        let engine = VotingEngine::new(
            store,
            Arc::clone(&clock),
            oracle,
            Arc::clone(&lifecycle),
            Arc::clone(&registry),
        );
        Self {
            clock,
            escrow,
            params,
            lifecycle,
            registry,
            engine,
            stats,
        }
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    pub fn stats(&self) -> &StatsCounter {
        &self.stats
    }

    /// Open a proposal backed by an escrowed deposit.
    ///
    /// The depositor becomes the creator.
    pub fn create_proposal(
        &self,
        draft: ProposalDraft,
        proof: &DepositProof,
    ) -> Result<ProposalView, GovernanceError> {
        let period = self.validate_draft(&draft)?;

        let required = self.params.min_deposit;
        if proof.amount < required {
            return Err(GovernanceError::InsufficientDeposit {
                offered: proof.amount,
                required,
            });
        }
        if !self.escrow.verify(proof)? {
            debug!(reference = %proof.reference, depositor = %proof.depositor, "deposit not confirmed");
            return Err(GovernanceError::InsufficientDeposit {
                offered: 0,
                required,
            });
        }

        let now = self.clock.now();
        let title = draft.title.trim().to_string();
        let id = ProposalId::derive(&[
            proof.depositor.as_str().as_bytes(),
            title.as_bytes(),
            draft.category.as_str().as_bytes(),
            &now.as_secs().to_be_bytes(),
        ]);
        let record = ProposalRecord::new(
            id,
            title,
            draft.description,
            draft.category,
            proof.depositor.clone(),
            now,
            now.plus_secs(period),
            proof.amount,
        );
        self.lifecycle.create(&record)?;
        self.stats.increment(STAT_PROPOSALS_CREATED);
        Ok(self.view(record))
    }

    /// Returns the voting period to use.
    fn validate_draft(&self, draft: &ProposalDraft) -> Result<u64, GovernanceError> {
        let title_len = draft.title.trim().chars().count();
        if title_len == 0 {
            return Err(GovernanceError::InvalidProposal("title is empty".into()));
        }
        if title_len > self.params.max_title_len {
            return Err(GovernanceError::InvalidProposal(format!(
                "title longer than {} characters",
                self.params.max_title_len
            )));
        }
        if draft.description.chars().count() > self.params.max_description_len {
            return Err(GovernanceError::InvalidProposal(format!(
                "description longer than {} characters",
                self.params.max_description_len
            )));
        }
        let period = draft
            .voting_period_secs
            .unwrap_or(self.params.default_voting_period_secs);
        if period == 0 || period > self.params.max_voting_period_secs {
            return Err(GovernanceError::InvalidProposal(format!(
                "voting period must be between 1 and {} seconds",
                self.params.max_voting_period_secs
            )));
        }
        Ok(period)
    }

    pub fn cast_vote(
        &self,
        proposal_id: &ProposalId,
        voter: &WalletAddress,
        choice: VoteChoice,
    ) -> Result<VoteReceipt, GovernanceError> {
        let result = self.engine.cast_vote(proposal_id, voter, choice);
        match &result {
            Ok(_) => self.stats.increment(STAT_VOTES_CAST),
            Err(_) => self.stats.increment(STAT_VOTES_REJECTED),
        }
        result
    }

    pub fn delegate(
        &self,
        voter: &WalletAddress,
        delegate: &str,
    ) -> Result<DelegationStatus, GovernanceError> {
        self.registry.delegate(voter, delegate)?;
        self.stats.increment(STAT_DELEGATIONS_SET);
        self.delegation_status(voter)
    }

    pub fn undelegate(&self, voter: &WalletAddress) -> Result<Ack, GovernanceError> {
        let changed = self.registry.undelegate(voter)?;
        if changed {
            self.stats.increment(STAT_DELEGATIONS_CLEARED);
        }
        Ok(Ack { changed })
    }

    pub fn delegation_status(
        &self,
        voter: &WalletAddress,
    ) -> Result<DelegationStatus, GovernanceError> {
        let record = self.registry.record_of(voter)?;
        Ok(DelegationStatus {
            voter: voter.clone(),
            delegate: record.as_ref().map(|r| r.delegate.clone()),
            since: record.as_ref().map(|r| r.activated_at),
            delegators: self.registry.delegators_of(voter)?,
        })
    }

    pub fn get_proposal(&self, id: &ProposalId) -> Result<ProposalView, GovernanceError> {
        Ok(self.view(self.lifecycle.get(id)?))
    }

    /// All proposals, newest first, optionally restricted to one category.
    pub fn list_proposals(
        &self,
        category: Option<Category>,
    ) -> Result<Vec<ProposalView>, GovernanceError> {
        let filter = ProposalFilter {
            category,
            state: None,
        };
        self.lifecycle
            .iter(filter)
            .map(|p| p.map(|p| self.view(p)))
            .collect()
    }

    /// Lazy listing; pages are fetched from the store as the iterator advances.
    pub fn proposals(&self, filter: ProposalFilter) -> ProposalIter<'_> {
        self.lifecycle.iter(filter)
    }

    /// One page of the listing plus the cursor to continue from, if any.
    pub fn list_page(
        &self,
        filter: ProposalFilter,
        after: Option<ProposalCursor>,
        count: usize,
    ) -> Result<(Vec<ProposalView>, Option<ProposalCursor>), GovernanceError> {
        let iter = match after {
            Some(cursor) => self.lifecycle.iter_after(filter, cursor),
            None => self.lifecycle.iter(filter),
        };
        let mut page = iter
            .take(count.saturating_add(1))
            .map(|p| p.map(|p| self.view(p)))
            .collect::<Result<Vec<_>, _>>()?;
        let next = if page.len() > count {
            page.truncate(count);
            page.last().map(ProposalView::cursor)
        } else {
            None
        };
        Ok((page, next))
    }

    /// Close every proposal whose deadline has passed. Returns how many
    /// this call closed.
    pub fn close_expired(&self) -> Result<usize, GovernanceError> {
        self.lifecycle.close_expired()
    }

    pub fn mark_executed(&self, id: &ProposalId) -> Result<ProposalView, GovernanceError> {
        Ok(self.view(self.lifecycle.mark_executed(id)?))
    }

    pub fn record_discussion(&self, id: &ProposalId) -> Result<u32, GovernanceError> {
        let count = self.lifecycle.record_discussion(id)?;
        debug!(proposal = %id, count, "discussion recorded");
        Ok(count)
    }

    pub fn vote_of(
        &self,
        id: &ProposalId,
        voter: &WalletAddress,
    ) -> Result<Option<VoteReceipt>, GovernanceError> {
        self.engine.vote_of(id, voter)
    }

    pub fn votes_for(&self, id: &ProposalId) -> Result<Vec<VoteReceipt>, GovernanceError> {
        self.engine.votes_for(id)
    }

    fn view(&self, proposal: ProposalRecord) -> ProposalView {
        ProposalView::new(proposal, self.params.quorum_threshold, self.clock.now())
    }
}
