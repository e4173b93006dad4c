//! Session management handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::ApiPath;
use crate::AppState;
use paperlens_common::{errors::Result, session::SessionOverview};

/// Create a new session
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionOverview>)> {
    let session = state.sessions.create().await?;
    Ok((StatusCode::CREATED, Json(session.overview().await)))
}

/// Get session overview
pub async fn get_session(
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<Uuid>,
) -> Result<Json<SessionOverview>> {
    let session = state.sessions.get(session_id).await?;
    Ok(Json(session.overview().await))
}

/// End a session and drop everything it holds
pub async fn delete_session(
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<Uuid>,
) -> Result<StatusCode> {
    state.sessions.remove(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
