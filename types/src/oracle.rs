//! Interfaces to the external collaborators that supply voting power and
//! confirm proposal deposits.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Timestamp, WalletAddress};

/// A collaborator could not answer. Always safe to retry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{source_name} unavailable: {reason}")]
pub struct OracleError {
    pub source_name: &'static str,
    pub reason: String,
}

impl OracleError {
    pub fn new(source_name: &'static str, reason: impl Into<String>) -> Self {
        Self {
            source_name,
            reason: reason.into(),
        }
    }
}

/// Supplies a voter's token-denominated voting power.
pub trait BalanceOracle: Send + Sync {
    /// Voting power of `voter` as of `at`.
    ///
    /// Must be deterministic for a given `at` so recorded weights stay
    /// auditable.
    fn weight_of(&self, voter: &WalletAddress, at: Timestamp) -> Result<u64, OracleError>;
}

/// Evidence that a proposal deposit was escrowed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositProof {
    /// Who paid the deposit; becomes the proposal's creator.
    pub depositor: WalletAddress,
    /// Tokens claimed to be escrowed.
    pub amount: u64,
    /// Escrow receipt reference (transaction hash or similar).
    pub reference: String,
}

/// Confirms deposit proofs against the external escrow.
pub trait DepositEscrow: Send + Sync {
    fn verify(&self, proof: &DepositProof) -> Result<bool, OracleError>;
}
