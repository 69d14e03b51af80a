//! Prometheus metrics for the governance API.
//!
//! [`RpcMetrics`] owns a dedicated [`Registry`] that the `/metrics` endpoint
//! encodes into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

pub struct RpcMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub proposals_created: IntCounter,
    pub votes_cast: IntCounter,
    /// Refused votes, labelled by error code.
    pub votes_rejected: IntCounterVec,
    /// Delegations set or cleared.
    pub delegations_changed: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Proposals closed since start-up, by the sweep or on first read.
    pub proposals_closed: IntGauge,
}

impl RpcMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let proposals_created = register_int_counter_with_registry!(
            Opts::new("agora_proposals_created_total", "Total proposals created"),
            registry
        )?;

        let votes_cast = register_int_counter_with_registry!(
            Opts::new("agora_votes_cast_total", "Total votes recorded"),
            registry
        )?;

        let votes_rejected = register_int_counter_vec_with_registry!(
            Opts::new("agora_votes_rejected_total", "Total vote attempts refused"),
            &["reason"],
            registry
        )?;

        let delegations_changed = register_int_counter_with_registry!(
            Opts::new(
                "agora_delegations_changed_total",
                "Total delegations set or cleared"
            ),
            registry
        )?;

        let proposals_closed = register_int_gauge_with_registry!(
            Opts::new(
                "agora_proposals_closed",
                "Proposals closed since start-up"
            ),
            registry
        )?;

        Ok(Self {
            registry,
            proposals_created,
            votes_cast,
            votes_rejected,
            delegations_changed,
            proposals_closed,
        })
    }

    /// Encode every registered metric in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
