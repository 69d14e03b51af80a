//! Proposal lifecycle: creation, lazy closing, outcome recording, listing.
//!
//! Every state change goes through the store's compare-and-set, so a lazy
//! close on read and the periodic sweep can race freely: exactly one caller
//! wins each transition and the others observe it.

use crate::error::GovernanceError;
use crate::tally::TallyCalculator;
use agora_store::{GovernanceStore, ProposalCursor, ProposalRecord, StoreError};
use agora_types::{Category, Clock, ProposalId, ProposalState};
use agora_utils::StatsCounter;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Proposals fetched per store round trip while iterating.
const PAGE_SIZE: usize = 64;

/// Counts every `Active -> Closed` transition, whether a read or the sweep
/// performed it.
pub const STAT_PROPOSALS_CLOSED: &str = "proposals_closed";

pub(crate) fn lookup_error(id: &ProposalId, e: StoreError) -> GovernanceError {
    match e {
        StoreError::NotFound(_) => GovernanceError::ProposalNotFound(*id),
        other => other.into(),
    }
}

/// Which proposals a listing should yield.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProposalFilter {
    pub category: Option<Category>,
    pub state: Option<ProposalState>,
}

impl ProposalFilter {
    pub fn category(category: Category) -> Self {
        Self {
            category: Some(category),
            state: None,
        }
    }

    pub fn matches(&self, proposal: &ProposalRecord) -> bool {
        self.category.map_or(true, |c| c == proposal.category)
            && self.state.map_or(true, |s| s == proposal.state)
    }
}

pub struct ProposalLifecycle {
    store: Arc<dyn GovernanceStore>,
    clock: Arc<dyn Clock>,
    quorum_threshold: u64,
    stats: Option<Arc<StatsCounter>>,
}

impl ProposalLifecycle {
    pub fn new(
        store: Arc<dyn GovernanceStore>,
        clock: Arc<dyn Clock>,
        quorum_threshold: u64,
    ) -> Self {
        Self {
            store,
            clock,
            quorum_threshold,
            stats: None,
        }
    }

    /// Report closes under [`STAT_PROPOSALS_CLOSED`].
    pub fn with_stats(mut self, stats: Arc<StatsCounter>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Persist a freshly built proposal.
    pub fn create(&self, proposal: &ProposalRecord) -> Result<ProposalId, GovernanceError> {
        let now = self.clock.now();
        if proposal.voting_deadline <= now {
            return Err(GovernanceError::InvalidProposal(
                "voting deadline must be in the future".into(),
            ));
        }
        self.store.insert_proposal(proposal).map_err(|e| match e {
            StoreError::Duplicate(_) => GovernanceError::DuplicateProposal(proposal.id),
            other => other.into(),
        })?;
        info!(
            proposal = %proposal.id,
            creator = %proposal.creator,
            category = %proposal.category,
            deadline = proposal.voting_deadline.as_secs(),
            "proposal created"
        );
        Ok(proposal.id)
    }

    /// Fetch a proposal, closing it first if its deadline has passed.
    pub fn get(&self, id: &ProposalId) -> Result<ProposalRecord, GovernanceError> {
        let proposal = self.store.get_proposal(id).map_err(|e| lookup_error(id, e))?;
        self.refresh(proposal)
    }

    /// Bring a record read from the store up to date with the clock.
    fn refresh(&self, proposal: ProposalRecord) -> Result<ProposalRecord, GovernanceError> {
        let needs_settling = proposal.is_expired_at(self.clock.now())
            || proposal.state == ProposalState::Closed;
        if !needs_settling {
            return Ok(proposal);
        }
        self.settle(&proposal.id)?;
        self.store
            .get_proposal(&proposal.id)
            .map_err(|e| lookup_error(&proposal.id, e))
    }

    /// Move an expired proposal to `Closed`, then to its outcome.
    ///
    /// Returns whether this call performed the close. Only call this once the
    /// deadline has passed.
    fn settle(&self, id: &ProposalId) -> Result<bool, GovernanceError> {
        let closed = self
            .store
            .compare_and_set_state(id, ProposalState::Active, ProposalState::Closed)
            .map_err(|e| lookup_error(id, e))?;
        if closed {
            debug!(proposal = %id, "proposal closed");
            if let Some(stats) = &self.stats {
                stats.increment(STAT_PROPOSALS_CLOSED);
            }
        }

        // Weights are frozen once the state has left Active.
        let current = self.store.get_proposal(id).map_err(|e| lookup_error(id, e))?;
        if current.state == ProposalState::Closed {
            let tally = TallyCalculator::tally(&current, self.quorum_threshold);
            let next = tally.outcome.final_state();
            if self
                .store
                .compare_and_set_state(id, ProposalState::Closed, next)
                .map_err(|e| lookup_error(id, e))?
            {
                info!(
                    proposal = %id,
                    outcome = %next,
                    yes = current.weight_yes,
                    no = current.weight_no,
                    abstain = current.weight_abstain,
                    quorum_reached = tally.quorum_reached,
                    "proposal outcome recorded"
                );
            }
        }
        Ok(closed)
    }

    /// Close every proposal whose deadline has passed.
    ///
    /// Returns how many this call closed; proposals closed concurrently by
    /// someone else are not counted.
    pub fn close_expired(&self) -> Result<usize, GovernanceError> {
        let now = self.clock.now();
        let expired = self.store.expired_active_proposals(now)?;
        let mut closed = 0;
        for id in &expired {
            match self.settle(id) {
                Ok(true) => closed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(proposal = %id, error = %e, "failed to close expired proposal");
                    return Err(e);
                }
            }
        }
        if closed > 0 {
            info!(closed, "closed expired proposals");
        }
        Ok(closed)
    }

    /// Record that a passed proposal has been acted on.
    pub fn mark_executed(&self, id: &ProposalId) -> Result<ProposalRecord, GovernanceError> {
        let current = self.get(id)?;
        let swapped = current.state == ProposalState::Passed
            && self
                .store
                .compare_and_set_state(id, ProposalState::Passed, ProposalState::Executed)
                .map_err(|e| lookup_error(id, e))?;
        if !swapped {
            let from = self.store.get_proposal(id).map_err(|e| lookup_error(id, e))?.state;
            return Err(GovernanceError::InvalidTransition {
                from,
                to: ProposalState::Executed,
            });
        }
        info!(proposal = %id, "proposal marked executed");
        self.get(id)
    }

    /// Bump the discussion counter. Allowed in any state.
    pub fn record_discussion(&self, id: &ProposalId) -> Result<u32, GovernanceError> {
        self.store
            .increment_discussion(id)
            .map_err(|e| lookup_error(id, e))
    }

    /// Lazily page through proposals, newest first.
    pub fn iter(&self, filter: ProposalFilter) -> ProposalIter<'_> {
        ProposalIter::new(self, filter, None)
    }

    /// Lazily page through proposals strictly after `cursor`.
    pub fn iter_after(&self, filter: ProposalFilter, cursor: ProposalCursor) -> ProposalIter<'_> {
        ProposalIter::new(self, filter, Some(cursor))
    }
}

/// A finite, restartable walk over the created-at index.
///
/// Each page is read from the store only when the previous one is used up,
/// and every yielded proposal has been brought up to date with the clock.
pub struct ProposalIter<'a> {
    lifecycle: &'a ProposalLifecycle,
    filter: ProposalFilter,
    after: Option<ProposalCursor>,
    buffer: VecDeque<ProposalRecord>,
    exhausted: bool,
}

impl<'a> ProposalIter<'a> {
    fn new(
        lifecycle: &'a ProposalLifecycle,
        filter: ProposalFilter,
        after: Option<ProposalCursor>,
    ) -> Self {
        Self {
            lifecycle,
            filter,
            after,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn fill(&mut self) -> Result<(), GovernanceError> {
        let page = self
            .lifecycle
            .store
            .list_proposals_page(self.after.as_ref(), PAGE_SIZE)?;
        if page.len() < PAGE_SIZE {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.after = Some(last.cursor());
        }
        self.buffer.extend(page);
        Ok(())
    }
}

impl Iterator for ProposalIter<'_> {
    type Item = Result<ProposalRecord, GovernanceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.buffer.is_empty() {
                if self.exhausted {
                    return None;
                }
                if let Err(e) = self.fill() {
                    self.exhausted = true;
                    return Some(Err(e));
                }
                continue;
            }
            let raw = self.buffer.pop_front()?;
            match self.lifecycle.refresh(raw) {
                Ok(p) if self.filter.matches(&p) => return Some(Ok(p)),
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
