//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Channel messages posted, by outcome
//! - Typing jobs finished, by terminal status
//! - Active voice sessions
//! - Gateway heartbeats sent and handshake failures

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Messages posted to channels, by outcome ("sent", "failed")
pub static MESSAGES_SENT_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("messages_sent_total", "Channel messages posted by typing jobs")
            .namespace("autotyper"),
        &["outcome"],
    )
    .expect("Failed to create MESSAGES_SENT_TOTAL metric")
});

/// Typing jobs that reached a terminal status
pub static TYPING_JOBS_FINISHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("typing_jobs_finished_total", "Typing jobs by terminal status")
            .namespace("autotyper"),
        &["status"],
    )
    .expect("Failed to create TYPING_JOBS_FINISHED_TOTAL metric")
});

/// Voice sessions currently holding an open gateway connection
pub static VOICE_SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("voice_sessions_active", "Open gateway connections").namespace("autotyper"),
    )
    .expect("Failed to create VOICE_SESSIONS_ACTIVE metric")
});

/// Heartbeat frames written to gateway connections
pub static GATEWAY_HEARTBEATS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("gateway_heartbeats_total", "Heartbeat frames sent").namespace("autotyper"),
    )
    .expect("Failed to create GATEWAY_HEARTBEATS_TOTAL metric")
});

/// Gateway handshakes that ended in error
pub static GATEWAY_HANDSHAKE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "gateway_handshake_failures_total",
            "Gateway handshakes that failed before joining voice",
        )
        .namespace("autotyper"),
    )
    .expect("Failed to create GATEWAY_HANDSHAKE_FAILURES_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(MESSAGES_SENT_TOTAL.clone()))
        .expect("Failed to register MESSAGES_SENT_TOTAL");
    registry
        .register(Box::new(TYPING_JOBS_FINISHED_TOTAL.clone()))
        .expect("Failed to register TYPING_JOBS_FINISHED_TOTAL");
    registry
        .register(Box::new(VOICE_SESSIONS_ACTIVE.clone()))
        .expect("Failed to register VOICE_SESSIONS_ACTIVE");
    registry
        .register(Box::new(GATEWAY_HEARTBEATS_TOTAL.clone()))
        .expect("Failed to register GATEWAY_HEARTBEATS_TOTAL");
    registry
        .register(Box::new(GATEWAY_HANDSHAKE_FAILURES_TOTAL.clone()))
        .expect("Failed to register GATEWAY_HANDSHAKE_FAILURES_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record the outcome of one channel message post
pub fn record_message_sent(success: bool) {
    let outcome = if success { "sent" } else { "failed" };
    MESSAGES_SENT_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a typing job reaching a terminal status
pub fn record_job_finished(status: &str) {
    TYPING_JOBS_FINISHED_TOTAL.with_label_values(&[status]).inc();
}

/// Counts one open gateway session in `VOICE_SESSIONS_ACTIVE` for as long
/// as it is held. Dropping it, including when the owning task is aborted,
/// takes the session back out of the gauge.
#[derive(Debug)]
#[must_use]
pub struct ActiveSessionGuard(());

impl ActiveSessionGuard {
    pub fn acquire() -> Self {
        VOICE_SESSIONS_ACTIVE.inc();
        Self(())
    }
}

impl Drop for ActiveSessionGuard {
    fn drop(&mut self) {
        VOICE_SESSIONS_ACTIVE.dec();
    }
}
