//! HTTP/JSON API for the governance service.
//!
//! Provides endpoints for:
//! - Proposal creation, lookup and cursor-paginated listing
//! - Vote casting and vote lookup
//! - Delegation set, clear and status
//! - Prometheus metrics and a health check

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod pagination;
pub mod server;

pub use error::RpcError;
pub use handlers::AppState;
pub use metrics::RpcMetrics;
pub use server::{router, RpcServer};
