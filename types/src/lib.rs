//! Fundamental types for the Agora governance service.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! wallet addresses, proposal identifiers, timestamps, vote choices, proposal
//! categories, lifecycle states, and the interfaces of the external balance
//! oracle and deposit escrow.

pub mod address;
pub mod category;
pub mod choice;
pub mod error;
pub mod hash;
pub mod oracle;
pub mod state;
pub mod time;

pub use address::WalletAddress;
pub use category::Category;
pub use choice::VoteChoice;
pub use error::TypesError;
pub use hash::ProposalId;
pub use oracle::{BalanceOracle, DepositEscrow, DepositProof, OracleError};
pub use state::{Outcome, ProposalState};
pub use time::{Clock, SystemClock, Timestamp};
