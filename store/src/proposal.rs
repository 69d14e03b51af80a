//! Proposal storage trait.

use crate::StoreError;
use agora_types::{Category, ProposalId, ProposalState, Timestamp, VoteChoice, WalletAddress};
use serde::{Deserialize, Serialize};

/// A stored proposal and its running tally.
///
/// The three weight buckets are only ever changed by
/// [`crate::VoteStore::commit_vote`], in the same atomic step that stores the
/// matching vote record. Nothing sets them directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub creator: WalletAddress,
    pub created_at: Timestamp,
    pub voting_deadline: Timestamp,
    pub weight_yes: u64,
    pub weight_no: u64,
    pub weight_abstain: u64,
    pub state: ProposalState,
    /// Number of discussion posts. Informational only.
    pub discussion_count: u32,
    /// Deposit escrowed at creation. Informational only.
    pub deposit: u64,
}

impl ProposalRecord {
    /// A fresh, active proposal with an empty tally.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ProposalId,
        title: String,
        description: String,
        category: Category,
        creator: WalletAddress,
        created_at: Timestamp,
        voting_deadline: Timestamp,
        deposit: u64,
    ) -> Self {
        Self {
            id,
            title,
            description,
            category,
            creator,
            created_at,
            voting_deadline,
            weight_yes: 0,
            weight_no: 0,
            weight_abstain: 0,
            state: ProposalState::Active,
            discussion_count: 0,
            deposit,
        }
    }

    /// Sum of all three buckets, widened so it cannot overflow.
    pub fn total_weight(&self) -> u128 {
        self.weight_yes as u128 + self.weight_no as u128 + self.weight_abstain as u128
    }

    pub fn weight_for(&self, choice: VoteChoice) -> u64 {
        match choice {
            VoteChoice::Yes => self.weight_yes,
            VoteChoice::No => self.weight_no,
            VoteChoice::Abstain => self.weight_abstain,
        }
    }

    /// Whether a vote cast at `now` may be recorded.
    pub fn is_open_at(&self, now: Timestamp) -> bool {
        self.state.accepts_votes() && now < self.voting_deadline
    }

    /// Whether the deadline has passed while the proposal is still marked active.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.state == ProposalState::Active && now >= self.voting_deadline
    }

    /// Add `weight` to the bucket for `choice`, refusing to wrap.
    pub fn add_weight(&mut self, choice: VoteChoice, weight: u64) -> Result<(), StoreError> {
        let bucket = match choice {
            VoteChoice::Yes => &mut self.weight_yes,
            VoteChoice::No => &mut self.weight_no,
            VoteChoice::Abstain => &mut self.weight_abstain,
        };
        *bucket = bucket
            .checked_add(weight)
            .ok_or_else(|| StoreError::Overflow(self.id.to_string()))?;
        Ok(())
    }

    /// Position of this proposal in the listing order.
    pub fn cursor(&self) -> ProposalCursor {
        ProposalCursor {
            created_at: self.created_at,
            id: self.id,
        }
    }
}

/// Position in the listing order: newest first, ties broken by ascending id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposalCursor {
    pub created_at: Timestamp,
    pub id: ProposalId,
}

impl ProposalCursor {
    /// 40-byte key whose lexicographic order is the listing order:
    /// `(u64::MAX - created_at)` big-endian, then the id bytes.
    pub fn to_key(&self) -> [u8; 40] {
        let mut key = [0u8; 40];
        key[..8].copy_from_slice(&(u64::MAX - self.created_at.as_secs()).to_be_bytes());
        key[8..].copy_from_slice(self.id.as_bytes());
        key
    }

    pub fn from_key(key: &[u8]) -> Option<Self> {
        if key.len() != 40 {
            return None;
        }
        let mut inv = [0u8; 8];
        inv.copy_from_slice(&key[..8]);
        let mut id = [0u8; 32];
        id.copy_from_slice(&key[8..]);
        Some(Self {
            created_at: Timestamp::new(u64::MAX - u64::from_be_bytes(inv)),
            id: ProposalId::new(id),
        })
    }
}

impl Ord for ProposalCursor {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .created_at
            .cmp(&self.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for ProposalCursor {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Keyed proposal storage with lifecycle CAS.
///
/// Tally buckets have no writer here; see [`crate::VoteStore::commit_vote`].
pub trait ProposalStore {
    /// Store a new proposal. Fails with `Duplicate` if the id is taken.
    fn insert_proposal(&self, proposal: &ProposalRecord) -> Result<(), StoreError>;

    /// Get a proposal by id. Fails with `NotFound` if absent.
    fn get_proposal(&self, id: &ProposalId) -> Result<ProposalRecord, StoreError>;

    /// Set the state to `next` only if it is currently `expected`.
    ///
    /// Returns `false` (and changes nothing) when another writer got there
    /// first.
    fn compare_and_set_state(
        &self,
        id: &ProposalId,
        expected: ProposalState,
        next: ProposalState,
    ) -> Result<bool, StoreError>;

    /// Bump the informational discussion counter, returning the new value.
    fn increment_discussion(&self, id: &ProposalId) -> Result<u32, StoreError>;

    /// Up to `limit` proposals in listing order, strictly after `after`.
    fn list_proposals_page(
        &self,
        after: Option<&ProposalCursor>,
        limit: usize,
    ) -> Result<Vec<ProposalRecord>, StoreError>;

    /// Ids of proposals still marked `Active` whose deadline is at or before `now`.
    fn expired_active_proposals(&self, now: Timestamp) -> Result<Vec<ProposalId>, StoreError>;
}
