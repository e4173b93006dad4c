//! Ingestion error types

use paperlens_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Unsupported document format: {declared}")]
    UnsupportedFormat { declared: String },

    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("PDF parse error for {filename}: {message}")]
    CorruptPdf { filename: String, message: String },

    #[error("{filename} is encrypted")]
    Encrypted { filename: String },

    #[error("{filename} is not valid UTF-8 text")]
    InvalidEncoding { filename: String },

    #[error("No extractable text in {filename}")]
    NoExtractableText { filename: String },

    #[error("Chunking error: {0}")]
    ChunkingError(String),
}

impl From<IngestionError> for AppError {
    fn from(e: IngestionError) -> Self {
        match e {
            IngestionError::UnsupportedFormat { declared } => AppError::UnsupportedFormat { declared },
            IngestionError::TooLarge { size, limit } => AppError::PayloadTooLarge { size, limit },
            IngestionError::CorruptPdf { filename, message } => {
                AppError::CorruptDocument { filename, message }
            }
            IngestionError::Encrypted { filename } => AppError::CorruptDocument {
                filename,
                message: "encrypted PDFs are not supported".to_string(),
            },
            IngestionError::InvalidEncoding { filename } => AppError::InvalidEncoding { filename },
            IngestionError::NoExtractableText { filename } => {
                AppError::NoExtractableText { filename }
            }
            IngestionError::ChunkingError(message) => AppError::Internal { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperlens_common::errors::ErrorCode;

    #[test]
    fn test_maps_to_app_errors() {
        let err: AppError = IngestionError::InvalidEncoding {
            filename: "a.txt".into(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::InvalidEncoding);
        assert_eq!(err.status_code().as_u16(), 422);

        let err: AppError = IngestionError::UnsupportedFormat {
            declared: "image/png".into(),
        }
        .into();
        assert_eq!(err.status_code().as_u16(), 415);

        let err: AppError = IngestionError::TooLarge { size: 10, limit: 5 }.into();
        assert_eq!(err.status_code().as_u16(), 413);
    }
}
