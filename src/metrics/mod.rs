//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Transaction submission and confirmation outcomes
//! - Confirmation latency
//! - Account pipeline outcomes
//! - RPC endpoint swaps

use crate::error::{FleetError, FleetResult};

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;

lazy_static! {
    // Transaction metrics
    pub static ref TX_SUBMITTED: CounterVec = register_counter_vec!(
        "fleet_transactions_submitted_total",
        "Total transactions accepted by an endpoint",
        &["chain_id"]
    ).expect("metric can be registered");

    pub static ref TX_OUTCOMES: CounterVec = register_counter_vec!(
        "fleet_transaction_outcomes_total",
        "Confirmation outcomes by kind",
        &["outcome"]
    ).expect("metric can be registered");

    pub static ref TX_BROADCAST_FAILED: CounterVec = register_counter_vec!(
        "fleet_transactions_broadcast_failed_total",
        "Broadcasts rejected by the endpoint",
        &[]
    ).expect("metric can be registered");

    pub static ref CONFIRMATION_LATENCY: HistogramVec = register_histogram_vec!(
        "fleet_confirmation_latency_seconds",
        "Time from broadcast to a final outcome",
        &["outcome"],
        vec![1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]
    ).expect("metric can be registered");

    // Account metrics
    pub static ref ACCOUNTS_FINISHED: CounterVec = register_counter_vec!(
        "fleet_accounts_finished_total",
        "Account pipelines by terminal status",
        &["status"]
    ).expect("metric can be registered");

    // Endpoint metrics
    pub static ref ENDPOINT_SWAPS: CounterVec = register_counter_vec!(
        "fleet_endpoint_swaps_total",
        "Total RPC endpoint swaps",
        &[]
    ).expect("metric can be registered");
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> FleetResult<()> {
        let app = Router::new()
            .route("/metrics", get(metrics_handler))
            .layer(TraceLayer::new_for_http());

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app)
            .await
            .map_err(|e| FleetError::Internal(format!("metrics server stopped: {}", e)))?;

        Ok(())
    }
}

async fn metrics_handler() -> Result<String, StatusCode> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

// Helper functions to record metrics

pub fn record_tx_submitted(chain_id: u64) {
    TX_SUBMITTED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_broadcast_failed() {
    TX_BROADCAST_FAILED.with_label_values(&[]).inc();
}

pub fn record_outcome(outcome: &str, latency_secs: f64) {
    TX_OUTCOMES.with_label_values(&[outcome]).inc();
    CONFIRMATION_LATENCY
        .with_label_values(&[outcome])
        .observe(latency_secs);
}

pub fn record_account_finished(status: &str) {
    ACCOUNTS_FINISHED.with_label_values(&[status]).inc();
}

pub fn record_endpoint_swap() {
    ENDPOINT_SWAPS.with_label_values(&[]).inc();
}
