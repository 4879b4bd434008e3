use crate::AppState;
use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use std::sync::Arc;

#[derive(Template)]
#[template(path = "not_found.html")]
struct NotFoundTemplate {
    shortcode: String,
}

/// GET /:code
///
/// Resolve the shortcode against the stored map and redirect the browser
/// to the original URL. An unknown code and an expired one get the same
/// not-found page.
pub async fn redirect(State(state): State<Arc<AppState>>, Path(code): Path<String>) -> Response {
    match state.store.resolve(&code, Utc::now()).await {
        Some(url) => {
            tracing::info!("redirecting {} -> {}", code, url);
            Redirect::to(&url).into_response()
        }
        None => {
            tracing::warn!("invalid or expired shortcode: {}", code);
            (StatusCode::NOT_FOUND, NotFoundTemplate { shortcode: code }).into_response()
        }
    }
}
