//! RPC error types and their HTTP mapping.

use agora_governance::GovernanceError;
use agora_types::TypesError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error("not found: {0}")]
    NotFound(String),

    /// Well-formed request with a value the domain does not accept.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// Malformed path or query parameter.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("server error: {0}")]
    Server(String),
}

impl From<TypesError> for RpcError {
    fn from(e: TypesError) -> Self {
        match e {
            TypesError::InvalidAddress(raw) => GovernanceError::InvalidAddress(raw).into(),
            other => RpcError::Invalid(other.to_string()),
        }
    }
}

impl From<prometheus::Error> for RpcError {
    fn from(e: prometheus::Error) -> Self {
        RpcError::Internal(e.to_string())
    }
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::Governance(e) => match e {
                GovernanceError::ProposalNotFound(_) => StatusCode::NOT_FOUND,
                GovernanceError::AlreadyVoted { .. }
                | GovernanceError::DuplicateProposal(_)
                | GovernanceError::DelegationActive(_) => StatusCode::CONFLICT,
                GovernanceError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            RpcError::NotFound(_) => StatusCode::NOT_FOUND,
            RpcError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RpcError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RpcError::Internal(_) | RpcError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RpcError::Governance(e) => e.code(),
            RpcError::NotFound(_) => "not_found",
            RpcError::Invalid(_) => "invalid_request",
            RpcError::BadRequest(_) => "bad_request",
            RpcError::Internal(_) | RpcError::Server(_) => "internal",
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        let body = serde_json::json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "retryable": status == StatusCode::SERVICE_UNAVAILABLE,
            }
        });
        (status, Json(body)).into_response()
    }
}
