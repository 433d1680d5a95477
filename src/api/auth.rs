use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;

use super::AppState;
use super::error::ApiError;

/// Rejects requests whose `Authorization: Bearer` token is not the shared secret.
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| tokens_match(token, state.api_token.expose_secret()));

    if !authorized {
        tracing::warn!(
            "Rejected unauthenticated {} {}",
            request.method(),
            request.uri().path()
        );
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}

/// Comparison whose running time does not depend on where the tokens differ.
fn tokens_match(given: &str, expected: &str) -> bool {
    let given = given.as_bytes();
    let expected = expected.as_bytes();
    if given.len() != expected.len() {
        return false;
    }
    given
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
