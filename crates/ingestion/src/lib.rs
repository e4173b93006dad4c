//! PaperLens Document Ingestion
//!
//! Format detection, text extraction from PDF and plain-text uploads,
//! and the chunking and truncation helpers shared with the analyzer.

pub mod chunker;
pub mod errors;
mod fonts;
pub mod ingestor;
pub mod pdf;
pub mod text;

pub use chunker::{chunk_text, truncate_to_boundary, ChunkingConfig, TextChunk};
pub use errors::IngestionError;
pub use ingestor::{ingest, resolve_format};
