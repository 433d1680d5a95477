use axum::{
    Router,
    routing::{get, post},
};

use super::AppState;
use super::handlers::{dump_handler, refresh_handler, status_handler};

pub fn create_status_routes() -> Router<AppState> {
    Router::new().route("/status", get(status_handler))
}

pub fn create_dump_routes() -> Router<AppState> {
    Router::new()
        .route("/dump", get(dump_handler))
        .route("/refresh", post(refresh_handler))
}
