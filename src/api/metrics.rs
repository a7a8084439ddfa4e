//! Prometheus metrics endpoint and HTTP request tracking middleware.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;

use crate::AppState;

// Metric names as constants for consistency
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const LOGINS_TOTAL: &str = "logins_total";
pub const INVENTORY_ITEMS_TOTAL: &str = "inventory_items_total";

/// Install the Prometheus recorder and return a handle for rendering.
///
/// Call once during startup. Without it every metric call is a no-op.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(HTTP_REQUEST_DURATION_SECONDS, "HTTP request duration in seconds");
    describe_counter!(LOGINS_TOTAL, "Login attempts by result (success/failed)");
    describe_gauge!(INVENTORY_ITEMS_TOTAL, "Number of inventory items across all users");

    Ok(handle)
}

/// GET /metrics - Returns Prometheus-formatted metrics.
pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.count_items().await {
        Ok(count) => gauge!(INVENTORY_ITEMS_TOTAL).set(count as f64),
        Err(e) => tracing::warn!(error = %e, "Failed to count inventory items"),
    }

    match state.metrics_handle.as_ref() {
        Some(h) => (StatusCode::OK, h.render()),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Metrics not initialized".to_string(),
        ),
    }
}

/// Middleware to track HTTP request metrics.
///
/// Records:
/// - `http_requests_total` counter with method, path, and status labels
/// - `http_request_duration_seconds` histogram with method and path labels
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();

    // Use the matched route (e.g. /api/items/:id) to keep label cardinality low
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let method = request.method().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

/// Record the outcome of a login attempt.
pub fn record_login(success: bool) {
    let result = if success { "success" } else { "failed" };
    counter!(LOGINS_TOTAL, "result" => result).increment(1);
}
