use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use engine::{DocId, Hit, RankError, SearchEngine, DEFAULT_TOP_K, MAX_TOP_K};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { DEFAULT_TOP_K }

#[derive(Deserialize)]
pub struct BooleanParams {
    pub q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<Hit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct DocResponse {
    pub doc_id: DocId,
    pub label: String,
    pub text: String,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(serde_json::json!({ "error": message.into() })))
}

/// Loads the data directory and builds the router. Fails when an artifact is missing.
pub fn build_app<P: AsRef<std::path::Path>>(index_dir: P) -> Result<Router> {
    let engine = SearchEngine::load(index_dir)?;
    Ok(router(engine))
}

/// Routes over an already loaded engine.
pub fn router(engine: SearchEngine) -> Router {
    let app_state = AppState { engine: Arc::new(engine) };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/boolean", get(boolean_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let k = params.k.clamp(1, MAX_TOP_K);
    let (results, message) = match state.engine.ranked(&params.q, k) {
        Ok(hits) => (hits, None),
        Err(err @ RankError::NoMatchingTerms) => {
            tracing::debug!(query = %params.q, "degenerate ranked query");
            (Vec::new(), Some(err.to_string()))
        }
    };
    Json(SearchResponse {
        query: params.q,
        took_s: start.elapsed().as_secs_f64(),
        total_hits: results.len(),
        results,
        message,
    })
}

pub async fn boolean_handler(
    State(state): State<AppState>,
    Query(params): Query<BooleanParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let results = state.engine.boolean(&params.q).map_err(|err| {
        tracing::debug!(query = %params.q, error = %err, "rejected boolean query");
        api_error(StatusCode::BAD_REQUEST, format!("invalid query ({err})"))
    })?;
    Ok(Json(SearchResponse {
        query: params.q,
        took_s: start.elapsed().as_secs_f64(),
        total_hits: results.len(),
        results,
        message: None,
    }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<DocResponse>, ApiError> {
    if !state.engine.contains(doc_id) {
        return Err(api_error(StatusCode::NOT_FOUND, "not found"));
    }
    let text = state.engine.text(doc_id).map_err(|err| {
        tracing::error!(doc_id, error = %format!("{err:#}"), "failed to read document text");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "document text unavailable")
    })?;
    let label = state.engine.label(doc_id).unwrap_or_default().to_string();
    Ok(Json(DocResponse { doc_id, label, text }))
}
