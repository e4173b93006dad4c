//! Plain-text and Markdown decoding

use crate::errors::IngestionError;

/// Decode an uploaded text file
///
/// The bytes must be valid UTF-8. A leading byte-order mark is dropped and
/// line endings are normalised to `\n`.
pub fn extract_text_from_plain(bytes: &[u8], filename: &str) -> Result<String, IngestionError> {
    let decoded = std::str::from_utf8(bytes).map_err(|_| IngestionError::InvalidEncoding {
        filename: filename.to_string(),
    })?;

    let decoded = decoded.strip_prefix('\u{FEFF}').unwrap_or(decoded);
    let text = decoded.replace("\r\n", "\n").replace('\r', "\n");
    let text = text.trim();

    if text.is_empty() {
        return Err(IngestionError::NoExtractableText {
            filename: filename.to_string(),
        });
    }

    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_bom_and_normalises_newlines() {
        let bytes = b"\xEF\xBB\xBFline one\r\nline two\rline three\n";
        let text = extract_text_from_plain(bytes, "notes.txt").unwrap();
        assert_eq!(text, "line one\nline two\nline three");
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let err = extract_text_from_plain(b"caf\xE9", "latin1.txt").unwrap_err();
        assert!(matches!(err, IngestionError::InvalidEncoding { .. }));
    }

    #[test]
    fn test_empty_and_blank_input() {
        for bytes in [&b""[..], &b"  \n\t "[..], &b"\xEF\xBB\xBF"[..]] {
            let err = extract_text_from_plain(bytes, "empty.txt").unwrap_err();
            assert!(matches!(err, IngestionError::NoExtractableText { .. }));
        }
    }

    #[test]
    fn test_preserves_markdown() {
        let text = extract_text_from_plain("# Title\n\n- point *one*".as_bytes(), "a.md").unwrap();
        assert_eq!(text, "# Title\n\n- point *one*");
    }
}
