//! Page read, delete and list endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use pw_storage::PageMetadata;
use serde::Serialize;

use crate::error::ServerError;
use crate::handlers::{PageQuery, view_url};
use crate::state::AppState;

/// Response for GET /page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageResponse {
    success: bool,
    canonical_key: String,
    html_content: String,
    /// Absent when the body exists without its metadata record.
    metadata: Option<PageMetadata>,
    view_url: String,
}

/// Response for DELETE /page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteResponse {
    success: bool,
    canonical_key: String,
    message: &'static str,
}

/// Response for GET /pages.
#[derive(Debug, Serialize)]
pub(crate) struct PagesResponse {
    success: bool,
    pages: Vec<PageMetadata>,
}

/// Handle GET /page?name=.
pub(crate) async fn get_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse>, ServerError> {
    let view = state.service.page(&query.name).await?;

    Ok(Json(PageResponse {
        success: true,
        view_url: view_url(&view.canonical_key),
        canonical_key: view.canonical_key,
        html_content: view.body,
        metadata: view.metadata,
    }))
}

/// Handle DELETE /page?name=.
pub(crate) async fn delete_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<DeleteResponse>, ServerError> {
    let canonical_key = state.service.delete(&query.name).await?;

    Ok(Json(DeleteResponse {
        success: true,
        canonical_key,
        message: "Page deleted successfully",
    }))
}

/// Handle GET /pages.
pub(crate) async fn list_pages(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PagesResponse>, ServerError> {
    let pages = state.service.list().await?;

    Ok(Json(PagesResponse {
        success: true,
        pages,
    }))
}
