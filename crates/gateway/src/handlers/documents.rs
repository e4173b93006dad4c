//! Document upload, detail, analysis and report handlers

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::ApiPath;
use crate::AppState;
use paperlens_common::{
    errors::{AppError, Result},
    models::{Analysis, DocumentSummary},
};
use paperlens_ingestion::ingest;

/// Multipart field carrying the uploaded file
const FILE_FIELD: &str = "file";

/// Response after uploading a document
#[derive(Serialize)]
pub struct UploadResponse {
    pub document: DocumentSummary,
    /// Identical bytes were already in the session
    pub duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
    /// Set when the document was stored but analysis failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_error: Option<String>,
}

/// Document detail with a text preview
#[derive(Serialize)]
pub struct DocumentResponse {
    #[serde(flatten)]
    pub document: DocumentSummary,
    pub preview: String,
    pub preview_truncated: bool,
    pub conversation_turns: usize,
    pub analysis: Option<Analysis>,
}

#[derive(Serialize)]
pub struct AnalysisResponse {
    pub document_id: Uuid,
    pub analysis: Analysis,
}

struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// Pull the file part out of a multipart body
async fn read_file_field(mut multipart: Multipart, limit: usize) -> Result<UploadedFile> {
    loop {
        let field = multipart.next_field().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::BodyTooLarge { limit }
            } else {
                AppError::InvalidFormat {
                    message: e.body_text(),
                }
            }
        })?;

        let Some(field) = field else {
            return Err(AppError::MissingField {
                field: FILE_FIELD.to_string(),
            });
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| AppError::Validation {
                message: "the file part needs a filename".to_string(),
                field: Some(FILE_FIELD.to_string()),
            })?;
        let content_type = field.content_type().map(str::to_string);

        let bytes = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::BodyTooLarge { limit }
            } else {
                AppError::InvalidFormat {
                    message: e.body_text(),
                }
            }
        })?;

        return Ok(UploadedFile {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
}

/// Upload a document into a session
///
/// Text is extracted before the session is locked. Identical bytes already
/// in the session return the existing document with 200. The document is
/// stored before `analysis.auto_analyze` runs the review, so a failed or
/// timed-out analysis leaves it in place without one.
pub async fn upload_document(
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<Uuid>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    let session = state.sessions.get(session_id).await?;
    let multipart = multipart.map_err(|e| AppError::InvalidFormat {
        message: e.body_text(),
    })?;

    let limit = state.config.ingestion.max_upload_bytes;
    let upload = read_file_field(multipart, limit).await?;

    let ingestion = state.config.ingestion.clone();
    let document = tokio::task::spawn_blocking(move || {
        ingest(
            upload.bytes,
            &upload.filename,
            upload.content_type.as_deref(),
            &ingestion,
        )
    })
    .await
    .map_err(|e| AppError::Internal {
        message: format!("ingestion task failed: {}", e),
    })??;

    let mut contents = session.lock().await;

    if let Some(existing) = contents.find_by_hash(&document.content_hash) {
        info!(
            session_id = %session_id,
            document_id = %existing.id,
            "Duplicate upload, returning existing document"
        );
        return Ok((
            StatusCode::OK,
            Json(UploadResponse {
                document: existing.summary(),
                duplicate: true,
                analysis: existing.analysis.clone(),
                analysis_error: None,
            }),
        ));
    }

    let stored = contents.add_document(document)?;
    let document_id = stored.id;
    info!(
        session_id = %session_id,
        document_id = %document_id,
        filename = %stored.filename,
        char_count = stored.char_count,
        "Document uploaded"
    );

    let mut analysis_error = None;
    if state.config.analysis.auto_analyze {
        let text = &contents.document(document_id)?.text;
        match state.analyzer.analyze(text).await {
            Ok(analysis) => contents.document_mut(document_id)?.analysis = Some(analysis),
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    document_id = %document_id,
                    error = %e,
                    "Analysis failed, document kept without review"
                );
                analysis_error = Some(e.to_string());
            }
        }
    }

    let stored = contents.document(document_id)?;
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            document: stored.summary(),
            duplicate: false,
            analysis: stored.analysis.clone(),
            analysis_error,
        }),
    ))
}

/// Get a document with its preview and analysis
pub async fn get_document(
    State(state): State<AppState>,
    ApiPath((session_id, document_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<DocumentResponse>> {
    let session = state.sessions.get(session_id).await?;
    let contents = session.lock().await;
    let document = contents.document(document_id)?;
    let preview_chars = state.config.ingestion.preview_chars;

    Ok(Json(DocumentResponse {
        document: document.summary(),
        preview: document.preview(preview_chars),
        preview_truncated: document.char_count > preview_chars,
        conversation_turns: contents.conversation(document_id)?.len(),
        analysis: document.analysis.clone(),
    }))
}

/// Remove a document and its conversation
pub async fn delete_document(
    State(state): State<AppState>,
    ApiPath((session_id, document_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    let session = state.sessions.get(session_id).await?;
    let removed = session.lock().await.remove_document(document_id)?;

    info!(
        session_id = %session_id,
        document_id = %removed.id,
        "Document removed"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Run (or re-run) the literature review for a document
pub async fn analyze_document(
    State(state): State<AppState>,
    ApiPath((session_id, document_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<Json<AnalysisResponse>> {
    let session = state.sessions.get(session_id).await?;
    let mut contents = session.lock().await;

    let text = &contents.document(document_id)?.text;
    let analysis = state.analyzer.analyze(text).await?;
    contents.document_mut(document_id)?.analysis = Some(analysis.clone());

    Ok(Json(AnalysisResponse {
        document_id,
        analysis,
    }))
}

/// Download the review as a Markdown report
pub async fn download_report(
    State(state): State<AppState>,
    ApiPath((session_id, document_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    let session = state.sessions.get(session_id).await?;
    let contents = session.lock().await;
    let document = contents.document(document_id)?;

    let analysis = document
        .analysis
        .as_ref()
        .ok_or_else(|| AppError::AnalysisNotFound {
            id: document_id.to_string(),
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"analysis_report.md\"",
            ),
        ],
        analysis.to_markdown(&document.filename),
    ))
}
