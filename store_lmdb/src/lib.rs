//! LMDB storage backend for the Agora governance service.
//!
//! Implements the storage traits from `agora-store` using the `heed` LMDB
//! bindings. All logical tables live in named databases within a single
//! environment, so a vote insert and its tally update share one write
//! transaction.

pub mod environment;
pub mod error;
pub mod governance;
pub mod keys;
pub mod meta;
pub mod migration;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use governance::LmdbGovernanceStore;
pub use meta::LmdbMetaStore;
