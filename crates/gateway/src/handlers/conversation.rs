//! Per-document Q&A handlers

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
use paperlens_common::{errors::Result, models::ConversationTurn};
use paperlens_context::QaContext;

/// Question about one document
#[derive(Debug, Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1, message = "question must not be empty"))]
    pub question: String,
}

#[derive(Serialize)]
pub struct ConversationResponse {
    pub document_id: Uuid,
    pub turns: Vec<ConversationTurn>,
}

/// Ask a question and record the answered turn
///
/// A failed completion leaves the conversation unchanged.
pub async fn ask_question(
    State(state): State<AppState>,
    ApiPath((session_id, document_id)): ApiPath<(Uuid, Uuid)>,
    request: std::result::Result<Json<AskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ConversationTurn>)> {
    let Json(request) = request.map_err(json_rejection)?;
    validate_body(&request)?;

    let session = state.sessions.get(session_id).await?;
    let mut contents = session.lock().await;

    let document = contents.document(document_id)?;
    let context = QaContext {
        filename: &document.filename,
        text: &document.text,
        review: document.analysis.as_ref().map(|a| a.review_text.as_str()),
    };
    let log = contents.conversation(document_id)?;
    let turn = state.qa.answer(&context, log, &request.question).await?;

    let turn = contents
        .conversation_mut(document_id)?
        .append(turn)?
        .clone();

    info!(
        session_id = %session_id,
        document_id = %document_id,
        turn = turn.index,
        "Question answered"
    );
    Ok((StatusCode::CREATED, Json(turn)))
}

/// Full transcript for a document
pub async fn get_conversation(
    State(state): State<AppState>,
    ApiPath((session_id, document_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<ConversationResponse>> {
    let session = state.sessions.get(session_id).await?;
    let contents = session.lock().await;
    let log = contents.conversation(document_id)?;

    Ok(Json(ConversationResponse {
        document_id,
        turns: log.turns().to_vec(),
    }))
}

/// Clear the chat for a document
pub async fn clear_conversation(
    State(state): State<AppState>,
    ApiPath((session_id, document_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    let session = state.sessions.get(session_id).await?;
    let mut contents = session.lock().await;
    let log = contents.conversation_mut(document_id)?;
    let cleared = log.len();
    log.clear();

    info!(
        session_id = %session_id,
        document_id = %document_id,
        cleared,
        "Conversation cleared"
    );
    Ok(StatusCode::NO_CONTENT)
}
