//! In-memory governance storage for tests.
//!
//! All tables sit behind one mutex, so every trait method is a single
//! critical section. That gives `commit_vote` the same all-or-nothing
//! behaviour as the LMDB backend's write transaction.

use agora_store::{
    DelegationRecord, DelegationStore, ProposalCursor, ProposalRecord, ProposalStore,
    StoreError, VoteRecord, VoteStore,
};
use agora_types::{ProposalId, ProposalState, Timestamp, VoteChoice, WalletAddress};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct Tables {
    proposals: HashMap<ProposalId, ProposalRecord>,
    by_time: BTreeSet<ProposalCursor>,
    votes: BTreeMap<(ProposalId, WalletAddress), VoteRecord>,
    delegations: HashMap<WalletAddress, DelegationRecord>,
}

/// An in-memory implementation of every governance store trait.
pub struct NullGovernanceStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
}

impl NullGovernanceStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every write fail with a backend error (reads keep working).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null store: writes disabled".into()));
        }
        Ok(())
    }
}

impl Default for NullGovernanceStore {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_in(
    tables: &mut Tables,
    id: &ProposalId,
    choice: VoteChoice,
    weight: u64,
    now: Timestamp,
) -> Result<(), StoreError> {
    let proposal = tables
        .proposals
        .get_mut(id)
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
    if !proposal.is_open_at(now) {
        return Err(StoreError::Inactive(id.to_string()));
    }
    proposal.add_weight(choice, weight)
}

impl ProposalStore for NullGovernanceStore {
    fn insert_proposal(&self, proposal: &ProposalRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        if tables.proposals.contains_key(&proposal.id) {
            return Err(StoreError::Duplicate(proposal.id.to_string()));
        }
        tables.by_time.insert(proposal.cursor());
        tables.proposals.insert(proposal.id, proposal.clone());
        Ok(())
    }

    fn get_proposal(&self, id: &ProposalId) -> Result<ProposalRecord, StoreError> {
        self.tables
            .lock()
            .unwrap()
            .proposals
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn compare_and_set_state(
        &self,
        id: &ProposalId,
        expected: ProposalState,
        next: ProposalState,
    ) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        let proposal = tables
            .proposals
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if proposal.state != expected {
            return Ok(false);
        }
        proposal.state = next;
        Ok(true)
    }

    fn increment_discussion(&self, id: &ProposalId) -> Result<u32, StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        let proposal = tables
            .proposals
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        proposal.discussion_count = proposal.discussion_count.saturating_add(1);
        Ok(proposal.discussion_count)
    }

    fn list_proposals_page(
        &self,
        after: Option<&ProposalCursor>,
        limit: usize,
    ) -> Result<Vec<ProposalRecord>, StoreError> {
        let tables = self.tables.lock().unwrap();
        let lower = match after {
            Some(cursor) => Bound::Excluded(*cursor),
            None => Bound::Unbounded,
        };
        Ok(tables
            .by_time
            .range((lower, Bound::Unbounded))
            .take(limit)
            .filter_map(|c| tables.proposals.get(&c.id).cloned())
            .collect())
    }

    fn expired_active_proposals(&self, now: Timestamp) -> Result<Vec<ProposalId>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .proposals
            .values()
            .filter(|p| p.is_expired_at(now))
            .map(|p| p.id)
            .collect())
    }
}

impl VoteStore for NullGovernanceStore {
    fn get_vote(
        &self,
        proposal: &ProposalId,
        voter: &WalletAddress,
    ) -> Result<Option<VoteRecord>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .votes
            .get(&(*proposal, voter.clone()))
            .cloned())
    }

    fn get_votes(&self, proposal: &ProposalId) -> Result<Vec<VoteRecord>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .votes
            .iter()
            .filter(|((id, _), _)| id == proposal)
            .map(|(_, v)| v.clone())
            .collect())
    }

    fn commit_vote(&self, record: &VoteRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        let proposal = tables
            .proposals
            .get(&record.proposal_id)
            .ok_or_else(|| StoreError::NotFound(record.proposal_id.to_string()))?;
        if !proposal.is_open_at(record.cast_at) {
            return Err(StoreError::Inactive(record.proposal_id.to_string()));
        }
        let key = (record.proposal_id, record.voter.clone());
        if tables.votes.contains_key(&key) {
            return Err(StoreError::Duplicate(format!(
                "{}/{}",
                record.proposal_id, record.voter
            )));
        }
        apply_in(
            &mut tables,
            &record.proposal_id,
            record.choice,
            record.weight,
            record.cast_at,
        )?;
        tables.votes.insert(key, record.clone());
        Ok(())
    }
}

impl DelegationStore for NullGovernanceStore {
    fn put_delegation(&self, record: &DelegationRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        self.tables
            .lock()
            .unwrap()
            .delegations
            .insert(record.voter.clone(), record.clone());
        Ok(())
    }

    fn get_delegation(
        &self,
        voter: &WalletAddress,
    ) -> Result<Option<DelegationRecord>, StoreError> {
        Ok(self.tables.lock().unwrap().delegations.get(voter).cloned())
    }

    fn deactivate_delegation(&self, voter: &WalletAddress) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        match tables.delegations.get_mut(voter) {
            Some(record) if record.active => {
                record.active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn delegators_of(&self, delegate: &WalletAddress) -> Result<Vec<WalletAddress>, StoreError> {
        let mut delegators: Vec<WalletAddress> = self
            .tables
            .lock()
            .unwrap()
            .delegations
            .values()
            .filter(|r| r.active && &r.delegate == delegate)
            .map(|r| r.voter.clone())
            .collect();
        delegators.sort();
        Ok(delegators)
    }
}
