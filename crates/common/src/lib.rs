//! PaperLens Common Library
//!
//! Shared code for all PaperLens crates including:
//! - Error types and handling
//! - Configuration management
//! - Completion capability (LLM clients with retry)
//! - In-memory data model and session store
//! - Metrics and observability

pub mod config;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod session;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use llm::{CompletionClient, LlmError, LlmProvider};
pub use session::{Session, SessionStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
