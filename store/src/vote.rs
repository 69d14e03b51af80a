//! Vote storage trait.

use crate::StoreError;
use agora_types::{ProposalId, Timestamp, VoteChoice, WalletAddress};
use serde::{Deserialize, Serialize};

/// A recorded vote. Keyed by `(proposal_id, voter)`; append-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub proposal_id: ProposalId,
    pub voter: WalletAddress,
    pub choice: VoteChoice,
    /// Voting power snapshotted when the vote was cast.
    pub weight: u64,
    pub cast_at: Timestamp,
}

/// Append-only vote index.
pub trait VoteStore {
    /// The vote `voter` cast on `proposal`, if any.
    fn get_vote(
        &self,
        proposal: &ProposalId,
        voter: &WalletAddress,
    ) -> Result<Option<VoteRecord>, StoreError>;

    /// All votes cast on `proposal`.
    fn get_votes(&self, proposal: &ProposalId) -> Result<Vec<VoteRecord>, StoreError>;

    /// Insert `record` and add its weight to the proposal's tally as one
    /// atomic unit.
    ///
    /// This is the uniqueness enforcement point: a second record for the
    /// same `(proposal_id, voter)` fails with `Duplicate` and leaves the tally
    /// untouched. Also fails with `NotFound` for an unknown proposal,
    /// `Inactive` when the proposal is not `Active` or `record.cast_at` is at
    /// or past its deadline, and `Overflow` when the bucket would wrap. Every
    /// failure leaves both the vote index and the tally unchanged.
    ///
    /// This is the only writer of the tally buckets.
    fn commit_vote(&self, record: &VoteRecord) -> Result<(), StoreError>;
}
