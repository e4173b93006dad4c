//! Cross-document comparison handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{json_rejection, validate_body, ApiPath};
use crate::AppState;
use paperlens_common::{errors::Result, models::ComparisonResult};

#[derive(Debug, Deserialize, Validate)]
pub struct CompareRequest {
    #[validate(length(min = 2, message = "at least two documents are needed"))]
    pub document_ids: Vec<Uuid>,
}

#[derive(Serialize)]
pub struct ComparisonsResponse {
    pub comparisons: Vec<ComparisonResult>,
}

/// Compare documents of one session
pub async fn create_comparison(
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<Uuid>,
    request: std::result::Result<Json<CompareRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ComparisonResult>)> {
    let Json(request) = request.map_err(json_rejection)?;
    validate_body(&request)?;

    let session = state.sessions.get(session_id).await?;
    let mut contents = session.lock().await;

    let selected = state.comparator.select(&contents, &request.document_ids)?;
    let result = state.comparator.compare(&selected).await?;
    let stored = contents.add_comparison(result).clone();

    info!(
        session_id = %session_id,
        comparison_id = %stored.id,
        documents = stored.documents.len(),
        "Comparison stored"
    );
    Ok((StatusCode::CREATED, Json(stored)))
}

/// Comparisons produced in a session, oldest first
pub async fn list_comparisons(
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<Uuid>,
) -> Result<Json<ComparisonsResponse>> {
    let session = state.sessions.get(session_id).await?;
    let contents = session.lock().await;

    Ok(Json(ComparisonsResponse {
        comparisons: contents.comparisons().to_vec(),
    }))
}
