//! Completion capability abstraction
//!
//! Every component talks to the language model through [`CompletionClient`]:
//! a prompt goes in, generated text comes out. Providers:
//! - Google Gemini (`generateContent`)
//! - OpenAI-compatible chat completions
//! - Mock (offline, deterministic)
//!
//! [`create_client`] wraps the configured provider in a [`RetryingClient`].

mod gemini;
mod mock;
mod openai;
mod retry;

pub use gemini::{GeminiClient, DEFAULT_GEMINI_MODEL};
pub use mock::MockClient;
pub use openai::{OpenAIClient, DEFAULT_OPENAI_MODEL};
pub use retry::{RetryPolicy, RetryingClient};

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Trait for text completion
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion for a single prompt
    async fn complete(&self, prompt: &str) -> std::result::Result<String, LlmError>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the provider kind
    fn provider(&self) -> LlmProvider;
}

/// Supported completion providers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    OpenAI,
    Mock,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "gemini",
            LlmProvider::OpenAI => "openai",
            LlmProvider::Mock => "mock",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LlmProvider::Mock)
    }

    /// Conventional environment variable holding this provider's key
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Gemini => Some("GEMINI_API_KEY"),
            LlmProvider::OpenAI => Some("OPENAI_API_KEY"),
            LlmProvider::Mock => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => DEFAULT_GEMINI_MODEL,
            LlmProvider::OpenAI => DEFAULT_OPENAI_MODEL,
            LlmProvider::Mock => "mock-completion",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion failures
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("completion request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("completion quota or rate limit exceeded: {message}")]
    RateLimited { message: String },

    #[error("completion service returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("completion request failed: {message}")]
    Transport { message: String },

    #[error("completion service returned an empty response")]
    EmptyResponse,

    #[error("completion blocked by provider: {reason}")]
    Blocked { reason: String },

    #[error("malformed completion response: {message}")]
    Malformed { message: String },
}

impl LlmError {
    /// Whether a retry may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Timeout { .. }
            | LlmError::RateLimited { .. }
            | LlmError::Transport { .. }
            | LlmError::EmptyResponse => true,
            LlmError::Upstream { status, .. } => *status >= 500 || *status == 408,
            LlmError::Blocked { .. } | LlmError::Malformed { .. } => false,
        }
    }

    /// Classify a non-success HTTP response
    pub fn from_status(status: u16, body: String) -> Self {
        let body = truncate_body(body);
        match status {
            429 => LlmError::RateLimited { message: body },
            408 => LlmError::Timeout { timeout_secs: 0 },
            _ => LlmError::Upstream { status, body },
        }
    }

    /// Classify a transport-level failure
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            LlmError::Timeout { timeout_secs }
        } else if err.is_decode() {
            LlmError::Malformed {
                message: err.to_string(),
            }
        } else {
            LlmError::Transport {
                message: err.to_string(),
            }
        }
    }
}

fn truncate_body(body: String) -> String {
    const MAX_BODY_CHARS: usize = 500;
    if body.chars().count() <= MAX_BODY_CHARS {
        body
    } else {
        let mut cut: String = body.chars().take(MAX_BODY_CHARS).collect();
        cut.push_str("...");
        cut
    }
}

/// Create a completion client based on configuration
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn CompletionClient>> {
    let inner: Arc<dyn CompletionClient> = match config.provider {
        LlmProvider::Gemini => Arc::new(GeminiClient::from_config(config)?),
        LlmProvider::OpenAI => Arc::new(OpenAIClient::from_config(config)?),
        LlmProvider::Mock => {
            tracing::warn!("Using mock completion client - not for production use");
            Arc::new(MockClient::new(config.model.clone()))
        }
    };

    tracing::info!(
        provider = %inner.provider(),
        model = inner.model_name(),
        max_retries = config.max_retries,
        "Completion client ready"
    );

    Ok(Arc::new(RetryingClient::new(inner, RetryPolicy::from_config(config))))
}

/// Build the shared HTTP client used by remote providers
pub(crate) fn http_client(config: &LlmConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .map_err(|e| AppError::Internal {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

/// Read a required API key from configuration
pub(crate) fn required_api_key(config: &LlmConfig) -> Result<String> {
    config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| AppError::Configuration {
            message: format!("API key is required for provider '{}'", config.provider),
        })
}
