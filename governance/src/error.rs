use agora_store::StoreError;
use agora_types::{OracleError, ProposalId, ProposalState, WalletAddress};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),

    #[error("proposal {0} is closed or past its voting deadline")]
    ProposalNotActive(ProposalId),

    #[error("wallet {voter} has already voted on proposal {proposal}")]
    AlreadyVoted {
        proposal: ProposalId,
        voter: WalletAddress,
    },

    #[error("wallet {0} has delegated its voting power; undelegate before voting")]
    DelegationActive(WalletAddress),

    #[error("wallet {0} has no voting power")]
    ZeroWeight(WalletAddress),

    #[error("cannot delegate to self")]
    SelfDelegation,

    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("insufficient deposit: offered {offered}, need {required}")]
    InsufficientDeposit { offered: u64, required: u64 },

    #[error("proposal {0} already exists")]
    DuplicateProposal(ProposalId),

    #[error("invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("cannot move proposal from {from} to {to}")]
    InvalidTransition {
        from: ProposalState,
        to: ProposalState,
    },

    /// Storage or collaborator failure. Safe to retry.
    #[error("transient failure: {0}")]
    Transient(String),
}

impl GovernanceError {
    /// Whether the caller may retry the same request.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Short machine-readable name, used for metrics labels and API bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProposalNotFound(_) => "proposal_not_found",
            Self::ProposalNotActive(_) => "proposal_not_active",
            Self::AlreadyVoted { .. } => "already_voted",
            Self::DelegationActive(_) => "delegation_active",
            Self::ZeroWeight(_) => "zero_weight",
            Self::SelfDelegation => "self_delegation",
            Self::InvalidAddress(_) => "invalid_address",
            Self::InsufficientDeposit { .. } => "insufficient_deposit",
            Self::DuplicateProposal(_) => "duplicate_proposal",
            Self::InvalidProposal(_) => "invalid_proposal",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Transient(_) => "transient",
        }
    }
}

impl From<OracleError> for GovernanceError {
    fn from(e: OracleError) -> Self {
        GovernanceError::Transient(e.to_string())
    }
}

/// Store failures that carry no domain meaning at the call site.
///
/// Call sites that can see `NotFound`, `Duplicate` or `Inactive` translate
/// those themselves before falling back to this.
impl From<StoreError> for GovernanceError {
    fn from(e: StoreError) -> Self {
        GovernanceError::Transient(e.to_string())
    }
}
