//! Health endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use pw_pages::HealthReport;
use serde::Serialize;

use crate::state::AppState;

/// Response for GET /health.
#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    /// "ok" when storage is reachable and consistent, "degraded" otherwise.
    status: &'static str,
    #[serde(flatten)]
    report: HealthReport,
}

/// Handle GET /health.
///
/// Unreachable storage answers 503. Orphaned pages are reported but do not
/// change the status code.
pub(crate) async fn get_health(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let report = state.service.health().await;

    let code = if report.reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let status = if report.reachable && report.orphaned.is_empty() && report.error.is_none() {
        "ok"
    } else {
        "degraded"
    };

    (code, Json(HealthResponse { status, report }))
}
