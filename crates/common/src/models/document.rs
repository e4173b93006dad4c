//! Uploaded document with its extracted text

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use super::Analysis;

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Text,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Text => "text",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SHA-256 of the uploaded bytes, hex encoded
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// A document held in a session
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub filename: String,
    pub format: DocumentFormat,
    /// Raw upload, kept only for the session's lifetime
    pub bytes: Vec<u8>,
    pub content_hash: String,
    pub text: String,
    pub char_count: usize,
    /// PDF only
    pub page_count: Option<usize>,
    pub analysis: Option<Analysis>,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        filename: impl Into<String>,
        format: DocumentFormat,
        bytes: Vec<u8>,
        text: String,
        page_count: Option<usize>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            format,
            content_hash: content_hash(&bytes),
            char_count: text.chars().count(),
            bytes,
            text,
            page_count,
            analysis: None,
            uploaded_at: Utc::now(),
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Leading characters of the extracted text
    pub fn preview(&self, max_chars: usize) -> String {
        self.text.chars().take(max_chars).collect()
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id,
            filename: self.filename.clone(),
            format: self.format,
            size_bytes: self.size_bytes(),
            content_hash: self.content_hash.clone(),
            char_count: self.char_count,
            page_count: self.page_count,
            analyzed: self.analysis.is_some(),
            uploaded_at: self.uploaded_at,
        }
    }
}

/// Serializable document metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub filename: String,
    pub format: DocumentFormat,
    pub size_bytes: usize,
    pub content_hash: String,
    pub char_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    pub analyzed: bool,
    pub uploaded_at: DateTime<Utc>,
}
