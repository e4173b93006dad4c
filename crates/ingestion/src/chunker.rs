//! Text chunking module
//!
//! Splits text into semantic chunks and cuts text to a character budget
//! without breaking mid-sentence where possible.

use crate::errors::IngestionError;
use text_splitter::{ChunkConfig, TextSplitter};
use tracing::debug;

/// Configuration for text chunking
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap: 0,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 6000,
            chunk_overlap: 0,
        }
    }
}

/// A text chunk with its position in the source
#[derive(Debug, Clone)]
pub struct TextChunk {
    /// The chunk content
    pub content: String,
    /// Index of this chunk in the document
    pub index: usize,
    /// Start byte offset in original text
    pub start_pos: usize,
    /// End byte offset in original text
    pub end_pos: usize,
}

/// Split text into semantic chunks
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<TextChunk>, IngestionError> {
    if config.chunk_size == 0 {
        return Err(IngestionError::ChunkingError(
            "chunk size must be greater than zero".to_string(),
        ));
    }

    let chunk_config = ChunkConfig::new(config.chunk_size)
        .with_overlap(config.chunk_overlap)
        .map_err(|e| IngestionError::ChunkingError(e.to_string()))?;
    let splitter = TextSplitter::new(chunk_config);

    let chunks: Vec<TextChunk> = splitter
        .chunk_indices(text)
        .enumerate()
        .map(|(index, (start_pos, content))| TextChunk {
            content: content.to_string(),
            index,
            start_pos,
            end_pos: start_pos + content.len(),
        })
        .collect();

    debug!(
        input_len = text.len(),
        chunk_count = chunks.len(),
        chunk_size = config.chunk_size,
        "Text chunked"
    );

    Ok(chunks)
}

/// Longest semantically bounded prefix of at most `max_chars` characters
///
/// Returns the prefix and whether anything was cut.
pub fn truncate_to_boundary(text: &str, max_chars: usize) -> (&str, bool) {
    if text.chars().count() <= max_chars {
        return (text, false);
    }
    if max_chars == 0 {
        return ("", true);
    }

    let splitter = TextSplitter::new(ChunkConfig::new(max_chars));
    let semantic = splitter
        .chunk_indices(text)
        .next()
        .map(|(offset, chunk)| text[..offset + chunk.len()].trim_end())
        .filter(|prefix| !prefix.is_empty() && prefix.chars().count() <= max_chars);

    let prefix = match semantic {
        Some(prefix) => prefix,
        None => hard_cut(text, max_chars),
    };
    (prefix, true)
}

/// Cut at a character boundary
fn hard_cut(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_chunking() {
        let text = "This is a test. ".repeat(100);
        let chunks = chunk_text(&text, &ChunkingConfig::new(200)).unwrap();
        assert!(chunks.len() > 1);

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert!(chunk.content.chars().count() <= 200);
            assert_eq!(&text[chunk.start_pos..chunk.end_pos], chunk.content);
        }
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let config = ChunkingConfig {
            chunk_size: 10,
            chunk_overlap: 20,
        };
        assert!(chunk_text("some text", &config).is_err());
    }

    #[test]
    fn test_empty_text() {
        let chunks = chunk_text("", &ChunkingConfig::default()).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_short_text_untouched() {
        assert_eq!(truncate_to_boundary("short", 10), ("short", false));
    }

    #[test]
    fn test_truncates_at_sentence() {
        let text = "First sentence here. Second sentence follows. Third one ends it.";
        let (prefix, truncated) = truncate_to_boundary(text, 50);
        assert!(truncated);
        assert!(prefix.chars().count() <= 50);
        assert!(text.starts_with(prefix));
        assert!(prefix.ends_with('.'));
    }

    #[test]
    fn test_truncate_respects_multibyte_chars() {
        let text = "é".repeat(30);
        let (prefix, truncated) = truncate_to_boundary(&text, 10);
        assert!(truncated);
        assert!(!prefix.is_empty());
        assert!(prefix.chars().count() <= 10);
    }

    #[test]
    fn test_zero_budget() {
        assert_eq!(truncate_to_boundary("text", 0), ("", true));
    }
}
