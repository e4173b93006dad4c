//! Document ingestor
//!
//! Turns an upload (bytes, filename, declared content type) into a
//! [`Document`] with extracted text: resolve format, enforce limits,
//! extract, and record metrics.

use crate::errors::IngestionError;
use crate::pdf::extract_text_from_pdf;
use crate::text::extract_text_from_plain;
use paperlens_common::config::IngestionConfig;
use paperlens_common::metrics;
use paperlens_common::models::{Document, DocumentFormat};
use std::path::Path;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Resolve the document format from the declared MIME type and filename
///
/// The MIME type wins when it names a supported format. A missing or
/// generic (`application/octet-stream`) type falls back to the extension.
pub fn resolve_format(
    filename: &str,
    content_type: Option<&str>,
) -> Result<DocumentFormat, IngestionError> {
    let mime = content_type
        .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty());

    match mime.as_deref() {
        Some("application/pdf") | Some("application/x-pdf") => Ok(DocumentFormat::Pdf),
        Some("text/plain") | Some("text/markdown") | Some("text/x-markdown") => {
            Ok(DocumentFormat::Text)
        }
        None | Some("application/octet-stream") => format_from_extension(filename),
        Some(other) => Err(IngestionError::UnsupportedFormat {
            declared: other.to_string(),
        }),
    }
}

fn format_from_extension(filename: &str) -> Result<DocumentFormat, IngestionError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("pdf") => Ok(DocumentFormat::Pdf),
        Some("txt") | Some("md") | Some("markdown") => Ok(DocumentFormat::Text),
        _ => Err(IngestionError::UnsupportedFormat {
            declared: filename.to_string(),
        }),
    }
}

/// Ingest one upload
#[instrument(skip(bytes, config), fields(size = bytes.len()))]
pub fn ingest(
    bytes: Vec<u8>,
    filename: &str,
    content_type: Option<&str>,
    config: &IngestionConfig,
) -> Result<Document, IngestionError> {
    let start = Instant::now();

    if bytes.len() > config.max_upload_bytes {
        return Err(IngestionError::TooLarge {
            size: bytes.len(),
            limit: config.max_upload_bytes,
        });
    }

    let format = resolve_format(filename, content_type)?;

    if bytes.is_empty() {
        return Err(IngestionError::NoExtractableText {
            filename: filename.to_string(),
        });
    }

    let (text, page_count) = match format {
        DocumentFormat::Pdf => {
            let pdf = extract_text_from_pdf(&bytes, filename)?;
            (pdf.text, Some(pdf.page_count))
        }
        DocumentFormat::Text => (extract_text_from_plain(&bytes, filename)?, None),
    };

    let document = Document::new(filename, format, bytes, text, page_count);

    if document.char_count < 200 {
        warn!(
            char_count = document.char_count,
            "Very little text extracted; analysis quality may suffer"
        );
    }

    let elapsed = start.elapsed().as_secs_f64();
    metrics::record_ingestion(elapsed, format.as_str(), document.char_count);

    info!(
        document_id = %document.id,
        format = %format,
        char_count = document.char_count,
        page_count = ?document.page_count,
        elapsed_ms = elapsed * 1000.0,
        "Document ingested"
    );

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::tests::build_pdf;
    use tokio_test::{assert_err, assert_ok};

    fn config() -> IngestionConfig {
        IngestionConfig::default()
    }

    #[test]
    fn test_mime_wins_over_extension() {
        assert_eq!(
            assert_ok!(resolve_format("paper.txt", Some("application/pdf"))),
            DocumentFormat::Pdf
        );
        assert_eq!(
            assert_ok!(resolve_format("notes.pdf", Some("text/plain; charset=utf-8"))),
            DocumentFormat::Text
        );
    }

    #[test]
    fn test_generic_mime_falls_back_to_extension() {
        assert_eq!(
            assert_ok!(resolve_format("Paper.PDF", Some("application/octet-stream"))),
            DocumentFormat::Pdf
        );
        assert_eq!(assert_ok!(resolve_format("readme.md", None)), DocumentFormat::Text);
        assert_err!(resolve_format("archive.zip", None));
    }

    #[test]
    fn test_unsupported_mime() {
        let err = resolve_format("paper.pdf", Some("image/png")).unwrap_err();
        assert!(matches!(err, IngestionError::UnsupportedFormat { declared } if declared == "image/png"));
    }

    #[test]
    fn test_ingest_text() {
        let body = "Abstract\r\nWe study transformers.".as_bytes().to_vec();
        let doc = ingest(body, "paper.txt", Some("text/plain"), &config()).unwrap();

        assert_eq!(doc.format, DocumentFormat::Text);
        assert_eq!(doc.text, "Abstract\nWe study transformers.");
        assert_eq!(doc.char_count, doc.text.chars().count());
        assert!(doc.page_count.is_none());
        assert!(doc.analysis.is_none());
    }

    #[test]
    fn test_ingest_pdf() {
        let bytes = build_pdf(&["Graph neural networks", "Future work"]);
        let doc = ingest(bytes, "gnn.pdf", Some("application/pdf"), &config()).unwrap();

        assert_eq!(doc.format, DocumentFormat::Pdf);
        assert_eq!(doc.page_count, Some(2));
        assert!(doc.text.contains("Graph neural networks"));
    }

    #[test]
    fn test_pdf_declared_text_is_corrupt() {
        let err = ingest(b"plain words".to_vec(), "fake.pdf", None, &config()).unwrap_err();
        assert!(matches!(err, IngestionError::CorruptPdf { .. }));
    }

    #[test]
    fn test_empty_upload() {
        let err = ingest(Vec::new(), "empty.txt", None, &config()).unwrap_err();
        assert!(matches!(err, IngestionError::NoExtractableText { .. }));
    }

    #[test]
    fn test_too_large() {
        let config = IngestionConfig {
            max_upload_bytes: 4,
            ..IngestionConfig::default()
        };
        let err = ingest(b"12345".to_vec(), "a.txt", None, &config).unwrap_err();
        assert!(matches!(err, IngestionError::TooLarge { size: 5, limit: 4 }));
    }
}
