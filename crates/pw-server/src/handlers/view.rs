//! Viewer endpoint.
//!
//! Serves a published document as HTML, bypassing caches so a revised page
//! shows immediately.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use pw_pages::PageError;
use serde::Deserialize;

use crate::state::AppState;

const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Query string for GET /view.
#[derive(Debug, Deserialize)]
pub(crate) struct ViewQuery {
    #[serde(default)]
    page: String,
}

/// Handle GET /view?page=.
pub(crate) async fn view_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Response {
    match state.service.page(&query.page).await {
        Ok(view) => (
            [
                (header::CACHE_CONTROL, NO_CACHE),
                (header::PRAGMA, "no-cache"),
                (header::EXPIRES, "0"),
            ],
            Html(view.body),
        )
            .into_response(),
        Err(PageError::NotFound(_)) => (StatusCode::NOT_FOUND, "Page not found").into_response(),
        Err(PageError::Validation(message)) => (StatusCode::BAD_REQUEST, message).into_response(),
        Err(e) => {
            tracing::error!(page = %query.page, error = %e, "Failed to load page for viewing");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error loading page").into_response()
        }
    }
}
