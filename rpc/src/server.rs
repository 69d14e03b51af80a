//! Axum-based RPC server.

use std::future::Future;
use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::error::RpcError;
use crate::handlers::{self, AppState};

/// Every route the API serves.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/proposals",
            post(handlers::create_proposal).get(handlers::list_proposals),
        )
        .route("/proposals/:id", get(handlers::get_proposal))
        .route("/proposals/:id/votes", post(handlers::cast_vote))
        .route("/proposals/:id/votes/:voter", get(handlers::vote_of))
        .route("/proposals/:id/discussion", post(handlers::record_discussion))
        .route("/proposals/:id/execute", post(handlers::mark_executed))
        .route("/delegations", post(handlers::delegate))
        .route(
            "/delegations/:voter",
            get(handlers::delegation_status).delete(handlers::undelegate),
        )
        .route("/metrics", get(handlers::metrics))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct RpcServer {
    pub port: u16,
    state: AppState,
}

impl RpcServer {
    pub fn new(port: u16, state: AppState) -> Self {
        Self { port, state }
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| RpcError::Server(format!("bind {addr}: {e}")))?;
        tracing::info!(%addr, "RPC server listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
        tracing::info!("RPC server stopped");
        Ok(())
    }
}
