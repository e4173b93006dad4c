//! In-memory data model
//!
//! Nothing here is persisted. Documents, conversations and comparisons live
//! inside a session and are dropped with it.

mod analysis;
mod comparison;
mod conversation;
mod document;

pub use analysis::{Analysis, LiteratureReview};
pub use comparison::{ComparedDocument, ComparisonResult};
pub use conversation::{ConversationLog, ConversationTurn};
pub use document::{content_hash, Document, DocumentFormat, DocumentSummary};
