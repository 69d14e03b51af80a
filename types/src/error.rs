//! Parse errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("invalid proposal id: {0}")]
    InvalidProposalId(String),

    #[error("unknown proposal category: {0}")]
    UnknownCategory(String),

    #[error("unknown vote choice: {0}")]
    UnknownChoice(String),
}
