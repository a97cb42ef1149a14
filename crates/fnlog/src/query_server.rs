use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use fnlog_core::error::FnlogError;
use fnlog_core::ids::LogId;
use fnlog_core::query::{ErrorResponse, ListParams, LogsResponse, StatsResponse};
use fnlog_store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
struct QueryState {
    store: Store,
    default_limit: usize,
}

pub fn router(store: Store, default_limit: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS]);
    Router::new()
        .route("/api/logs", get(list_logs))
        .route("/api/logs/{id}", get(get_log))
        .route("/api/stats", get(stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(QueryState {
            store,
            default_limit,
        })
}

pub async fn run_query_http_server(
    store: Store,
    addr: SocketAddr,
    default_limit: usize,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind query HTTP listener {addr}"))?;
    tracing::info!(%addr, "query api listening");
    axum::serve(listener, router(store, default_limit))
        .await
        .context("query HTTP server failed")
}

async fn list_logs(
    State(state): State<QueryState>,
    Query(params): Query<ListParams>,
) -> Json<LogsResponse> {
    let entries = state.store.query(&params.to_query(state.default_limit));
    Json(LogsResponse::from_entries(entries, params.preview))
}

async fn get_log(State(state): State<QueryState>, Path(id): Path<String>) -> Response {
    // A malformed id cannot name a stored entry.
    let found = id
        .parse::<LogId>()
        .map_err(|_| FnlogError::NotFound(format!("log {id}")))
        .and_then(|id| state.store.get(&id));
    match found {
        Ok(entry) => Json(entry).into_response(),
        Err(FnlogError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Log not found")),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(e.to_string())),
        )
            .into_response(),
    }
}

async fn stats(State(state): State<QueryState>) -> Json<StatsResponse> {
    Json(state.store.stats().into())
}
