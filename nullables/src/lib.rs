//! Test doubles for everything the governance engine talks to.
//!
//! The clock, the store, the balance oracle and the deposit escrow are all
//! traits. The types here implement them in memory, can be steered from a
//! test (time, balances, injected outages) and never touch disk.

pub mod clock;
pub mod oracle;
pub mod store;

pub use clock::NullClock;
pub use oracle::{NullBalanceOracle, NullDepositEscrow};
pub use store::NullGovernanceStore;
