use crate::{
    models::{ShortenRequest, ShortenedUrl},
    AppState,
};
use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

// ── Template structs ───────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    base_url: String,
    error: Option<String>,
    results: Vec<ShortenedUrl>,
}

// ── Form types ─────────────────────────────────────────────────────────────

/// The submission form posts its five rows as repeated `url` / `validity` /
/// `shortcode` fields, which axum-extra's Form collects positionally.
#[derive(Deserialize)]
pub struct ShortenForm {
    #[serde(default)]
    pub url: Vec<String>,
    #[serde(default)]
    pub validity: Vec<String>,
    #[serde(default)]
    pub shortcode: Vec<String>,
}

// ── Handlers ───────────────────────────────────────────────────────────────

/// GET /
pub async fn index(State(state): State<Arc<AppState>>) -> Response {
    IndexTemplate {
        base_url: state.config.base_url.clone(),
        error: None,
        results: Vec::new(),
    }
    .into_response()
}

/// POST /
///
/// Rows whose URL field is blank are skipped; everything else is validated
/// in order and committed all-or-nothing. A rejected batch re-renders the
/// form with the first failure as an error banner; a committed one renders
/// the batch results.
pub async fn shorten(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ShortenForm>,
) -> Response {
    let requests = collect_rows(&form);

    match state.store.shorten_batch(requests, Utc::now()).await {
        Ok(results) => IndexTemplate {
            base_url: state.config.base_url.clone(),
            error: None,
            results,
        }
        .into_response(),
        Err(err) if err.is_internal() => {
            tracing::error!("failed to persist link map: {:?}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save links").into_response()
        }
        Err(err) => IndexTemplate {
            base_url: state.config.base_url.clone(),
            error: Some(err.to_string()),
            results: Vec::new(),
        }
        .into_response(),
    }
}

// ── Private helpers ────────────────────────────────────────────────────────

/// Pair up the positional form fields into rows, dropping rows the user
/// left blank. Missing trailing fields count as blank.
fn collect_rows(form: &ShortenForm) -> Vec<ShortenRequest> {
    (0..form.url.len())
        .filter_map(|i| {
            let url = form.url[i].trim();
            if url.is_empty() {
                return None;
            }
            Some(ShortenRequest {
                url: url.to_owned(),
                validity: form.validity.get(i).cloned().unwrap_or_default(),
                shortcode: form.shortcode.get(i).cloned().unwrap_or_default(),
            })
        })
        .collect()
}
