use std::io;
use std::time::Duration;

use axum::{
    Json,
    body::Body,
    extract::{Query, State},
    http::{
        HeaderName,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tokio_util::io::ReaderStream;

use super::AppState;
use super::error::ApiError;
use crate::cache::{CacheEntry, CacheError, RefreshCoordinator};
use crate::schemas::{DumpQuery, RefreshResponse, StatusResponse, iso8601};

pub const X_CACHE_AGE_MINUTES: HeaderName = HeaderName::from_static("x-cache-age-minutes");
pub const X_CACHE_TIMESTAMP: HeaderName = HeaderName::from_static("x-cache-timestamp");

// ============================================================
// Status
// ============================================================

pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let status = state.coordinator.status();
    Json(StatusResponse::new(status, state.default_ttl.as_secs()))
}

// ============================================================
// Dump download
// ============================================================

pub async fn dump_handler(
    State(state): State<AppState>,
    Query(query): Query<DumpQuery>,
) -> Result<Response, ApiError> {
    let ttl = query
        .ttl
        .map(Duration::from_secs)
        .unwrap_or(state.default_ttl);
    let coordinator = &state.coordinator;

    if query.wants_wait() {
        if let Err(e) = coordinator.ensure_fresh(ttl).await {
            tracing::warn!("Fresh dump unavailable, falling back to current: {}", e);
        }
    } else if coordinator.trigger_refresh(ttl) {
        tracing::info!("Dump is older than {}s, refreshing in the background", ttl.as_secs());
    }

    let entry = coordinator.current().ok_or(CacheError::NotAvailable)?;
    serve_entry(coordinator, entry).await
}

/// Stream `entry` to the client. If its file vanished, the entry is dropped
/// from the cache; when a newer entry was published in the meantime that one
/// is served instead.
async fn serve_entry(
    coordinator: &RefreshCoordinator,
    mut entry: CacheEntry,
) -> Result<Response, ApiError> {
    let file = loop {
        match tokio::fs::File::open(entry.path()).await {
            Ok(file) => break file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let missing = entry.path().to_path_buf();
                if !coordinator.invalidate(&entry) {
                    if let Some(newer) = coordinator.current() {
                        if newer.created_at > entry.created_at {
                            entry = newer;
                            continue;
                        }
                    }
                }
                return Err(CacheError::MissingFile { path: missing }.into());
            }
            Err(e) => return Err(CacheError::store_io(entry.path(), e).into()),
        }
    };

    let length = file
        .metadata()
        .await
        .map_err(|e| CacheError::store_io(entry.path(), e))?
        .len();
    let age_minutes = entry.age(Utc::now()).as_secs() / 60;

    tracing::info!("Serving {} ({} bytes)", entry.file_name(), length);

    let headers = [
        (CONTENT_TYPE, "application/gzip".to_string()),
        (CONTENT_LENGTH, length.to_string()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", entry.file_name()),
        ),
        (X_CACHE_AGE_MINUTES, age_minutes.to_string()),
        (X_CACHE_TIMESTAMP, iso8601(entry.created_at)),
    ];

    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

// ============================================================
// Forced refresh
// ============================================================

pub async fn refresh_handler(
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, ApiError> {
    tracing::info!("Forced refresh requested");

    let entry = state.coordinator.refresh_now().await?;

    Ok(Json(RefreshResponse {
        success: true,
        cache_timestamp: iso8601(entry.created_at),
    }))
}

pub async fn not_found_handler() -> ApiError {
    ApiError::NotFound
}
