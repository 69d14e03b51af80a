//! Delegation storage trait.

use crate::StoreError;
use agora_types::{Timestamp, WalletAddress};
use serde::{Deserialize, Serialize};

/// The single current delegation record of a voter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationRecord {
    pub voter: WalletAddress,
    pub delegate: WalletAddress,
    pub activated_at: Timestamp,
    pub active: bool,
}

/// One record per voter; replacing it drops the previous one.
pub trait DelegationStore {
    /// Store `record`, replacing whatever the voter had before.
    fn put_delegation(&self, record: &DelegationRecord) -> Result<(), StoreError>;

    /// The voter's current record, active or not.
    fn get_delegation(&self, voter: &WalletAddress)
        -> Result<Option<DelegationRecord>, StoreError>;

    /// Mark the voter's record inactive. Returns `false` if there was no
    /// active record to change.
    fn deactivate_delegation(&self, voter: &WalletAddress) -> Result<bool, StoreError>;

    /// Voters whose active delegation points at `delegate`.
    fn delegators_of(&self, delegate: &WalletAddress) -> Result<Vec<WalletAddress>, StoreError>;
}
