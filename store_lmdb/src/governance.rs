//! LMDB implementation of the proposal, vote and delegation stores.
//!
//! LMDB allows a single writer at a time, so every read-check-write below
//! happens inside one `RwTxn` and is serialized against all other writers.
//! Dropping a transaction without committing aborts it.

use std::ops::Bound;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use agora_store::{
    DelegationRecord, DelegationStore, ProposalCursor, ProposalRecord, ProposalStore,
    StoreError, VoteRecord, VoteStore,
};
use agora_types::{ProposalId, ProposalState, Timestamp, VoteChoice, WalletAddress};

use crate::keys::{deadline_key, increment_prefix, parse_deadline_key, vote_key};
use crate::LmdbError;

pub struct LmdbGovernanceStore {
    pub(crate) env: Arc<Env>,
    pub(crate) proposals_db: Database<Bytes, Bytes>,
    pub(crate) proposals_by_time_db: Database<Bytes, Bytes>,
    pub(crate) proposals_by_deadline_db: Database<Bytes, Bytes>,
    pub(crate) votes_db: Database<Bytes, Bytes>,
    pub(crate) delegations_db: Database<Bytes, Bytes>,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LmdbError> {
    Ok(bincode::deserialize(bytes)?)
}

impl LmdbGovernanceStore {
    fn read_proposal(
        &self,
        txn: &RoTxn,
        id: &ProposalId,
    ) -> Result<ProposalRecord, StoreError> {
        let bytes = self
            .proposals_db
            .get(txn, id.as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(decode(bytes)?)
    }

    fn write_proposal(
        &self,
        txn: &mut heed::RwTxn,
        proposal: &ProposalRecord,
    ) -> Result<(), StoreError> {
        let bytes = encode(proposal)?;
        self.proposals_db
            .put(txn, proposal.id.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Refill `proposals_by_deadline` from the `proposals` table.
    ///
    /// Used when upgrading a database written before the index existed.
    pub(crate) fn rebuild_deadline_index(&self) -> Result<usize, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.proposals_by_deadline_db
            .clear(&mut wtxn)
            .map_err(LmdbError::from)?;
        let mut active = Vec::new();
        for entry in self.proposals_db.iter(&wtxn).map_err(LmdbError::from)? {
            let (_, val) = entry.map_err(LmdbError::from)?;
            let proposal: ProposalRecord = decode(val)?;
            if proposal.state == ProposalState::Active {
                active.push(deadline_key(proposal.voting_deadline, &proposal.id));
            }
        }
        for key in &active {
            self.proposals_by_deadline_db
                .put(&mut wtxn, key, &[])
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(active.len())
    }

    /// Check that the proposal accepts votes at `now` and bump its bucket,
    /// inside the caller's transaction.
    fn apply_vote_in(
        &self,
        txn: &mut heed::RwTxn,
        id: &ProposalId,
        choice: VoteChoice,
        weight: u64,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let mut proposal = self.read_proposal(txn, id)?;
        if !proposal.is_open_at(now) {
            return Err(StoreError::Inactive(id.to_string()));
        }
        proposal.add_weight(choice, weight)?;
        self.write_proposal(txn, &proposal)
    }
}

impl ProposalStore for LmdbGovernanceStore {
    fn insert_proposal(&self, proposal: &ProposalRecord) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .proposals_db
            .get(&wtxn, proposal.id.as_bytes())
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(proposal.id.to_string()));
        }
        self.write_proposal(&mut wtxn, proposal)?;
        self.proposals_by_time_db
            .put(&mut wtxn, &proposal.cursor().to_key(), &[])
            .map_err(LmdbError::from)?;
        if proposal.state == ProposalState::Active {
            self.proposals_by_deadline_db
                .put(&mut wtxn, &deadline_key(proposal.voting_deadline, &proposal.id), &[])
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_proposal(&self, id: &ProposalId) -> Result<ProposalRecord, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        self.read_proposal(&rtxn, id)
    }

    fn compare_and_set_state(
        &self,
        id: &ProposalId,
        expected: ProposalState,
        next: ProposalState,
    ) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut proposal = self.read_proposal(&wtxn, id)?;
        if proposal.state != expected {
            return Ok(false);
        }
        proposal.state = next;
        self.write_proposal(&mut wtxn, &proposal)?;
        if expected == ProposalState::Active && next != ProposalState::Active {
            self.proposals_by_deadline_db
                .delete(&mut wtxn, &deadline_key(proposal.voting_deadline, id))
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }

    fn increment_discussion(&self, id: &ProposalId) -> Result<u32, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut proposal = self.read_proposal(&wtxn, id)?;
        proposal.discussion_count = proposal.discussion_count.saturating_add(1);
        self.write_proposal(&mut wtxn, &proposal)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(proposal.discussion_count)
    }

    fn list_proposals_page(
        &self,
        after: Option<&ProposalCursor>,
        limit: usize,
    ) -> Result<Vec<ProposalRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let after_key = after.map(|c| c.to_key());
        let lower = match after_key.as_ref() {
            Some(key) => Bound::Excluded(&key[..]),
            None => Bound::Unbounded,
        };
        let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (lower, Bound::Unbounded);
        let iter = self
            .proposals_by_time_db
            .range(&rtxn, &bounds)
            .map_err(LmdbError::from)?;

        let mut results = Vec::new();
        for entry in iter {
            if results.len() >= limit {
                break;
            }
            let (key, _) = entry.map_err(LmdbError::from)?;
            let cursor = ProposalCursor::from_key(key)
                .ok_or_else(|| StoreError::Corruption("malformed proposal time key".into()))?;
            results.push(self.read_proposal(&rtxn, &cursor.id)?);
        }
        Ok(results)
    }

    /// Walks the deadline index, which only holds `Active` proposals, and
    /// stops at the first deadline still in the future.
    fn expired_active_proposals(&self, now: Timestamp) -> Result<Vec<ProposalId>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self
            .proposals_by_deadline_db
            .iter(&rtxn)
            .map_err(LmdbError::from)?;
        let mut expired = Vec::new();
        for entry in iter {
            let (key, _) = entry.map_err(LmdbError::from)?;
            let (deadline, id) = parse_deadline_key(key)
                .ok_or_else(|| StoreError::Corruption("malformed proposal deadline key".into()))?;
            if deadline > now {
                break;
            }
            expired.push(id);
        }
        Ok(expired)
    }
}

impl VoteStore for LmdbGovernanceStore {
    fn get_vote(
        &self,
        proposal: &ProposalId,
        voter: &WalletAddress,
    ) -> Result<Option<VoteRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let key = vote_key(proposal, voter);
        match self.votes_db.get(&rtxn, &key).map_err(LmdbError::from)? {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn get_votes(&self, proposal: &ProposalId) -> Result<Vec<VoteRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let prefix = proposal.as_bytes().to_vec();
        let mut upper = prefix.clone();
        increment_prefix(&mut upper);
        let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (
            Bound::Included(prefix.as_slice()),
            Bound::Excluded(upper.as_slice()),
        );
        let iter = self.votes_db.range(&rtxn, &bounds).map_err(LmdbError::from)?;
        let mut votes = Vec::new();
        for entry in iter {
            let (_, val) = entry.map_err(LmdbError::from)?;
            votes.push(decode(val)?);
        }
        Ok(votes)
    }

    fn commit_vote(&self, record: &VoteRecord) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let proposal = self.read_proposal(&wtxn, &record.proposal_id)?;
        if !proposal.is_open_at(record.cast_at) {
            return Err(StoreError::Inactive(record.proposal_id.to_string()));
        }

        let key = vote_key(&record.proposal_id, &record.voter);
        if self
            .votes_db
            .get(&wtxn, &key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(format!(
                "{}/{}",
                record.proposal_id, record.voter
            )));
        }

        let bytes = encode(record)?;
        self.votes_db
            .put(&mut wtxn, &key, &bytes)
            .map_err(LmdbError::from)?;
        self.apply_vote_in(
            &mut wtxn,
            &record.proposal_id,
            record.choice,
            record.weight,
            record.cast_at,
        )?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

impl DelegationStore for LmdbGovernanceStore {
    fn put_delegation(&self, record: &DelegationRecord) -> Result<(), StoreError> {
        let bytes = encode(record)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.delegations_db
            .put(&mut wtxn, record.voter.as_str().as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_delegation(
        &self,
        voter: &WalletAddress,
    ) -> Result<Option<DelegationRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .delegations_db
            .get(&rtxn, voter.as_str().as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn deactivate_delegation(&self, voter: &WalletAddress) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = voter.as_str().as_bytes();
        let mut record: DelegationRecord = match self
            .delegations_db
            .get(&wtxn, key)
            .map_err(LmdbError::from)?
        {
            Some(bytes) => decode(bytes)?,
            None => return Ok(false),
        };
        if !record.active {
            return Ok(false);
        }
        record.active = false;
        let bytes = encode(&record)?;
        self.delegations_db
            .put(&mut wtxn, key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }

    /// Full scan; delegation tables stay small relative to votes.
    fn delegators_of(&self, delegate: &WalletAddress) -> Result<Vec<WalletAddress>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.delegations_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut delegators = Vec::new();
        for entry in iter {
            let (_, val) = entry.map_err(LmdbError::from)?;
            let record: DelegationRecord = decode(val)?;
            if record.active && &record.delegate == delegate {
                delegators.push(record.voter);
            }
        }
        Ok(delegators)
    }
}
