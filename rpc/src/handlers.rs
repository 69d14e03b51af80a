//! RPC request handlers.
//!
//! Facade calls block on the store and oracles, so each one runs on the
//! blocking thread pool.

use crate::error::RpcError;
use crate::metrics::RpcMetrics;
use crate::pagination::{encode_cursor, PaginationMeta, PaginationParams};
use agora_governance::{
    Ack, DelegationStatus, GovernanceError, GovernanceFacade, ProposalDraft, ProposalFilter,
    ProposalView, VoteReceipt,
};
use agora_types::{Category, DepositProof, ProposalId, VoteChoice, WalletAddress};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub facade: Arc<GovernanceFacade>,
    pub metrics: Arc<RpcMetrics>,
}

impl AppState {
    pub fn new(facade: Arc<GovernanceFacade>, metrics: Arc<RpcMetrics>) -> Self {
        Self { facade, metrics }
    }
}

async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, RpcError>
where
    T: Send + 'static,
    F: FnOnce(&GovernanceFacade) -> Result<T, GovernanceError> + Send + 'static,
{
    let facade = Arc::clone(&state.facade);
    tokio::task::spawn_blocking(move || f(&facade))
        .await
        .map_err(|e| RpcError::Internal(e.to_string()))?
        .map_err(RpcError::from)
}

fn parse_id(raw: &str) -> Result<ProposalId, RpcError> {
    ProposalId::from_hex(raw).map_err(|_| RpcError::BadRequest(format!("proposal id {raw}")))
}

fn parse_address(raw: &str) -> Result<WalletAddress, RpcError> {
    Ok(WalletAddress::parse(raw)?)
}

// ── Proposals ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub depositor: String,
    pub amount: u64,
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProposalRequest {
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub voting_period_secs: Option<u64>,
    pub deposit: DepositRequest,
}

pub async fn create_proposal(
    State(state): State<AppState>,
    Json(req): Json<CreateProposalRequest>,
) -> Result<(StatusCode, Json<ProposalView>), RpcError> {
    let category: Category = req.category.parse()?;
    let proof = DepositProof {
        depositor: parse_address(&req.deposit.depositor)?,
        amount: req.deposit.amount,
        reference: req.deposit.reference,
    };
    let draft = ProposalDraft {
        title: req.title,
        category,
        description: req.description,
        voting_period_secs: req.voting_period_secs,
    };
    let view = blocking(&state, move |f| f.create_proposal(draft, &proof)).await?;
    state.metrics.proposals_created.inc();
    Ok((StatusCode::CREATED, Json(view)))
}

/// Query string for `GET /proposals`.
///
/// Kept flat: `serde_urlencoded` cannot parse numbers through `flatten`.
#[derive(Debug, Default, Deserialize)]
pub struct ListProposalsQuery {
    pub category: Option<String>,
    pub cursor: Option<String>,
    pub count: Option<u32>,
}

#[derive(Serialize)]
pub struct ProposalListResponse {
    pub proposals: Vec<ProposalView>,
    #[serde(flatten)]
    pub pagination: PaginationMeta,
}

pub async fn list_proposals(
    State(state): State<AppState>,
    Query(query): Query<ListProposalsQuery>,
) -> Result<Json<ProposalListResponse>, RpcError> {
    let category = match query.category.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<Category>()?),
    };
    let paging = PaginationParams {
        cursor: query.cursor,
        count: query.count,
    };
    let after = paging
        .decode()
        .map_err(|raw| RpcError::BadRequest(format!("cursor {raw}")))?;
    let count = paging.effective_count() as usize;
    let filter = ProposalFilter {
        category,
        state: None,
    };

    let (proposals, next) = blocking(&state, move |f| f.list_page(filter, after, count)).await?;
    Ok(Json(ProposalListResponse {
        proposals,
        pagination: PaginationMeta {
            cursor: next.as_ref().map(encode_cursor),
        },
    }))
}

pub async fn get_proposal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProposalView>, RpcError> {
    let id = parse_id(&id)?;
    Ok(Json(blocking(&state, move |f| f.get_proposal(&id)).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiscussionResponse {
    pub proposal_id: ProposalId,
    pub discussion_count: u32,
}

pub async fn record_discussion(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DiscussionResponse>, RpcError> {
    let id = parse_id(&id)?;
    let discussion_count = blocking(&state, move |f| f.record_discussion(&id)).await?;
    Ok(Json(DiscussionResponse {
        proposal_id: id,
        discussion_count,
    }))
}

pub async fn mark_executed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProposalView>, RpcError> {
    let id = parse_id(&id)?;
    Ok(Json(blocking(&state, move |f| f.mark_executed(&id)).await?))
}

// ── Votes ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub voter: String,
    /// `yes`, `no` or `abstain`.
    pub choice: String,
}

pub async fn cast_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CastVoteRequest>,
) -> Result<(StatusCode, Json<VoteReceipt>), RpcError> {
    let id = parse_id(&id)?;
    let voter = parse_address(&req.voter)?;
    let choice: VoteChoice = req.choice.parse()?;

    match blocking(&state, move |f| f.cast_vote(&id, &voter, choice)).await {
        Ok(receipt) => {
            state.metrics.votes_cast.inc();
            Ok((StatusCode::CREATED, Json(receipt)))
        }
        Err(e) => {
            state
                .metrics
                .votes_rejected
                .with_label_values(&[e.code()])
                .inc();
            Err(e)
        }
    }
}

pub async fn vote_of(
    State(state): State<AppState>,
    Path((id, voter)): Path<(String, String)>,
) -> Result<Json<VoteReceipt>, RpcError> {
    let id = parse_id(&id)?;
    let voter = parse_address(&voter)?;
    let lookup = voter.clone();
    blocking(&state, move |f| f.vote_of(&id, &lookup))
        .await?
        .map(Json)
        .ok_or_else(|| RpcError::NotFound(format!("vote by {voter} on {id}")))
}

// ── Delegations ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DelegateRequest {
    pub voter: String,
    pub delegate: String,
}

pub async fn delegate(
    State(state): State<AppState>,
    Json(req): Json<DelegateRequest>,
) -> Result<Json<DelegationStatus>, RpcError> {
    let voter = parse_address(&req.voter)?;
    let status = blocking(&state, move |f| f.delegate(&voter, &req.delegate)).await?;
    state.metrics.delegations_changed.inc();
    Ok(Json(status))
}

pub async fn undelegate(
    State(state): State<AppState>,
    Path(voter): Path<String>,
) -> Result<Json<Ack>, RpcError> {
    let voter = parse_address(&voter)?;
    let ack = blocking(&state, move |f| f.undelegate(&voter)).await?;
    if ack.changed {
        state.metrics.delegations_changed.inc();
    }
    Ok(Json(ack))
}

pub async fn delegation_status(
    State(state): State<AppState>,
    Path(voter): Path<String>,
) -> Result<Json<DelegationStatus>, RpcError> {
    let voter = parse_address(&voter)?;
    Ok(Json(blocking(&state, move |f| f.delegation_status(&voter)).await?))
}

// ── Telemetry ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub quorum_threshold: u64,
    pub min_deposit: u64,
    pub stats: BTreeMap<&'static str, u64>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let params = state.facade.params();
    Json(HealthResponse {
        status: "ok",
        quorum_threshold: params.quorum_threshold,
        min_deposit: params.min_deposit,
        stats: state.facade.stats().snapshot(),
    })
}

pub async fn metrics(State(state): State<AppState>) -> Result<String, RpcError> {
    let closed = state
        .facade
        .stats()
        .get(agora_governance::facade::STAT_PROPOSALS_CLOSED);
    state
        .metrics
        .proposals_closed
        .set(i64::try_from(closed).unwrap_or(i64::MAX));
    Ok(state.metrics.encode()?)
}
