//! Governance for the Agora model marketplace.
//!
//! Proposals collect token-weighted Yes/No/Abstain votes until a deadline,
//! then close exactly once and record an outcome:
//! `Active → Closed → {Passed | Rejected | QuorumFailed} → Executed`.
//!
//! Key rules:
//! - one vote per account per proposal, enforced by the store's unique insert;
//! - a delegated account cannot vote directly until it undelegates;
//! - delegation does not add the delegator's weight to the delegate.
//!
//! [`GovernanceFacade`] is the only type surrounding code needs.

pub mod delegation;
pub mod engine;
pub mod error;
pub mod facade;
pub mod lifecycle;
pub mod oracle;
pub mod params;
pub mod tally;

pub use delegation::DelegationRegistry;
pub use engine::{VoteReceipt, VotingEngine};
pub use error::GovernanceError;
pub use facade::{Ack, DelegationStatus, GovernanceFacade, ProposalDraft, ProposalView};
pub use lifecycle::{ProposalFilter, ProposalIter, ProposalLifecycle};
pub use oracle::{EscrowReceipt, ReceiptEscrow, SnapshotBalances};
pub use params::GovernanceParams;
pub use tally::{Percentages, Tally, TallyCalculator};
