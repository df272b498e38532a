//! Generate endpoint.
//!
//! Runs the full pipeline for one request on its own task. The configured
//! timeout only abandons the response; a publish already under way still
//! writes both records.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use pw_pages::GenerateRequest;
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::handlers::view_url;
use crate::state::AppState;

/// Body of POST /generate.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateBody {
    #[serde(default)]
    instructions: String,
    #[serde(default)]
    page_name: String,
    #[serde(default)]
    sibling_pages: Vec<String>,
    /// Overrides the configured page kind for this request.
    #[serde(default)]
    page_type: Option<String>,
}

/// Response for POST /generate.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateResponse {
    success: bool,
    canonical_key: String,
    public_url: String,
    view_url: String,
    body: String,
    created: bool,
}

/// Handle POST /generate.
pub(crate) async fn generate_page(
    State(state): State<Arc<AppState>>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ServerError> {
    let Json(body) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let request = GenerateRequest {
        page_name: body.page_name,
        instructions: body.instructions,
        sibling_pages: body.sibling_pages,
        page_kind: body.page_type,
    };

    let service = Arc::clone(&state.service);
    let pipeline = tokio::spawn(async move { service.generate(&request).await });

    let generated = tokio::time::timeout(state.request_timeout, pipeline)
        .await
        .map_err(|_| ServerError::Timeout(state.request_timeout))?
        .map_err(ServerError::Task)??;

    Ok(Json(GenerateResponse {
        success: true,
        view_url: view_url(&generated.canonical_key),
        canonical_key: generated.canonical_key,
        public_url: generated.public_url,
        body: generated.body,
        created: generated.created,
    }))
}
