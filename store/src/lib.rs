//! Abstract storage traits for the Agora governance service.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.
//!
//! Uniqueness of votes and atomicity of tally updates are enforced here, at
//! the storage layer, not only in the engine above it.

pub mod delegation;
pub mod error;
pub mod meta;
pub mod proposal;
pub mod vote;

pub use delegation::{DelegationRecord, DelegationStore};
pub use error::StoreError;
pub use meta::MetaStore;
pub use proposal::{ProposalCursor, ProposalRecord, ProposalStore};
pub use vote::{VoteRecord, VoteStore};

/// Everything the governance engine needs from a backend, as one object.
pub trait GovernanceStore: ProposalStore + VoteStore + DelegationStore + Send + Sync {}

impl<T> GovernanceStore for T where T: ProposalStore + VoteStore + DelegationStore + Send + Sync {}
