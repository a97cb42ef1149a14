use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::{CONTENT_ENCODING, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router, body::Bytes};
use fnlog_core::error::FnlogError;
use fnlog_core::query::ErrorResponse;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Level;

use crate::pipeline::Pipeline;

pub const LOGS_PATH: &str = "/v1/logs";

pub fn router(pipeline: Pipeline) -> Router {
    let max_request_bytes = pipeline.max_request_bytes();
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    Router::new()
        .route(LOGS_PATH, post(export_logs))
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .on_request(tower_http::trace::DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(pipeline)
}

async fn export_logs(
    State(pipeline): State<Pipeline>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = header_str(&headers, CONTENT_TYPE.as_str());
    let content_encoding = header_str(&headers, CONTENT_ENCODING.as_str());

    match pipeline.ingest(&body, content_type, content_encoding) {
        Ok(resp) => {
            tracing::debug!(count = resp.logs_added, "otlp http logs accepted");
            (StatusCode::OK, Json(resp)).into_response()
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                content_type = content_type.unwrap_or_default(),
                bytes = body.len(),
                "otlp http logs rejected"
            );
            let status = match &e {
                FnlogError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
                e if e.is_client_error() => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(ErrorResponse::new(e.to_string()))).into_response()
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
