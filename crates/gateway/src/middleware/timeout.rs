//! Request deadline middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use paperlens_common::errors::AppError;
use std::time::Duration;

/// Abort the handler once the deadline passes and answer with the error envelope
///
/// Handlers must leave the session consistent at every await point, since
/// the future is dropped where it stands.
pub async fn enforce_timeout(
    State(limit): State<Duration>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();
    tokio::time::timeout(limit, next.run(request))
        .await
        .map_err(|_| {
            tracing::warn!(path = %path, timeout_secs = limit.as_secs(), "Request timed out");
            AppError::RequestTimeout {
                timeout_secs: limit.as_secs(),
            }
        })
}
