//! Torrent info lookup endpoint.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use dhtinfo_core::LookupError;

use crate::state::AppState;

/// Diagnostic header telling whether the response came from the cache.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

#[derive(Debug, Deserialize)]
pub struct InfoQuery {
    pub info_hash: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Look up torrent metadata by info hash.
///
/// GET /info?info_hash=<40 hex chars>
pub async fn get_info(
    State(state): State<Arc<AppState>>,
    query: Result<Query<InfoQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let Some(raw_info_hash) = query.info_hash else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Missing info_hash query parameter",
        );
    };

    match state.orchestrator().lookup(&raw_info_hash).await {
        Ok(resolution) => {
            debug!(
                info_hash = %resolution.record.info_hash,
                source = resolution.source.as_header_value(),
                "Resolved torrent info"
            );
            (
                [
                    (header::CACHE_CONTROL, resolution.cache_control()),
                    (X_CACHE, resolution.source.as_header_value().to_string()),
                ],
                Json(resolution.record),
            )
                .into_response()
        }
        Err(LookupError::InvalidInfoHash(e)) => {
            error_response(StatusCode::BAD_REQUEST, format!("Invalid info_hash: {}", e))
        }
        Err(LookupError::NotFound(info_hash)) => error_response(
            StatusCode::NOT_FOUND,
            format!("Torrent {} not found", info_hash),
        ),
    }
}
