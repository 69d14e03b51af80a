//! Binary key layouts.
//!
//! - `proposals`: `proposal_id(32)`
//! - `proposals_by_time`: `(u64::MAX - created_at)_be(8) ++ proposal_id(32)`,
//!   so a forward scan yields newest first
//! - `proposals_by_deadline`: `voting_deadline_be(8) ++ proposal_id(32)`,
//!   holding only proposals still `Active`
//! - `votes`: `proposal_id(32) ++ voter_address_utf8`
//! - `delegations`: `voter_address_utf8`

use agora_types::{ProposalId, Timestamp, WalletAddress};

/// Key for the `proposals_by_deadline` index; sorts earliest deadline first.
pub fn deadline_key(deadline: Timestamp, proposal: &ProposalId) -> [u8; 40] {
    let mut key = [0u8; 40];
    key[..8].copy_from_slice(&deadline.as_secs().to_be_bytes());
    key[8..].copy_from_slice(proposal.as_bytes());
    key
}

/// Split a `proposals_by_deadline` key back into its parts.
pub fn parse_deadline_key(key: &[u8]) -> Option<(Timestamp, ProposalId)> {
    if key.len() != 40 {
        return None;
    }
    let secs: [u8; 8] = key[..8].try_into().ok()?;
    let id: [u8; 32] = key[8..].try_into().ok()?;
    Some((Timestamp::new(u64::from_be_bytes(secs)), ProposalId::new(id)))
}

/// Composite key for the `votes` database.
pub fn vote_key(proposal: &ProposalId, voter: &WalletAddress) -> Vec<u8> {
    let mut key = Vec::with_capacity(32 + voter.as_str().len());
    key.extend_from_slice(proposal.as_bytes());
    key.extend_from_slice(voter.as_str().as_bytes());
    key
}

/// Turn `prefix` into the smallest key greater than every key starting with
/// it. Used as the exclusive upper bound of a prefix range scan.
pub fn increment_prefix(prefix: &mut Vec<u8>) {
    while let Some(last) = prefix.last_mut() {
        if *last < u8::MAX {
            *last += 1;
            return;
        }
        prefix.pop();
    }
}
