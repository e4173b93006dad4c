//! Configuration management for PaperLens services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Provider-conventional API key variables (GEMINI_API_KEY, OPENAI_API_KEY)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{AppError, Result};
use crate::llm::LlmProvider;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Completion capability configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Document ingestion limits
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Analyzer configuration
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Q&A context window policy
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Comparator configuration
    #[serde(default)]
    pub comparison: ComparisonConfig,

    /// Session lifetime and limits
    #[serde(default)]
    pub session: SessionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds (must cover the slowest completion round trip)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Provider: gemini, openai, mock
    #[serde(default)]
    pub provider: LlmProvider,

    /// API key; falls back to the provider's conventional environment variable
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use (provider default when unset)
    pub model: Option<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens per completion
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for transient failures
    #[serde(default = "default_llm_retries")]
    pub max_retries: u32,

    /// First backoff interval in milliseconds
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Upper bound for a single backoff interval in milliseconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestionConfig {
    /// Largest accepted upload in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Characters of extracted text returned in document previews
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

/// How the analyzer fits long documents into one prompt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStrategy {
    /// Cut the text at a semantic boundary
    #[default]
    Truncate,
    /// Summarise chunks first, then review the combined notes
    MapReduce,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub strategy: AnalysisStrategy,

    /// Maximum characters of paper text in a review prompt
    #[serde(default = "default_analysis_input_chars")]
    pub max_input_chars: usize,

    /// Chunk size for map-reduce
    #[serde(default = "default_analysis_chunk_chars")]
    pub chunk_chars: usize,

    /// Maximum chunks summarised in map-reduce
    #[serde(default = "default_analysis_max_chunks")]
    pub max_chunks: usize,

    /// Analyse documents as part of the upload request
    #[serde(default = "default_enabled")]
    pub auto_analyze: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversationConfig {
    /// Hard ceiling for a complete Q&A prompt, in characters
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,

    /// Maximum characters of document text in a Q&A prompt
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,

    /// Most recent turns considered for the prompt
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,

    /// Maximum question length in characters
    #[serde(default = "default_max_question_chars")]
    pub max_question_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComparisonConfig {
    /// Maximum documents in one comparison
    #[serde(default = "default_max_compare")]
    pub max_documents: usize,

    /// Characters of each document's text included
    #[serde(default = "default_compare_chars")]
    pub max_chars_per_document: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Idle time before a session expires
    #[serde(default = "default_session_ttl")]
    pub ttl_minutes: i64,

    /// Interval of the expired-session sweeper
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Maximum live sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Maximum documents per session
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log filter directive (debug, info, paperlens=debug,tower_http=info, ...)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (global)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 300 }
fn default_temperature() -> f32 { 0.4 }
fn default_max_output_tokens() -> u32 { 2048 }
fn default_llm_timeout() -> u64 { 60 }
fn default_llm_retries() -> u32 { 2 }
fn default_initial_backoff() -> u64 { 500 }
fn default_max_backoff() -> u64 { 8_000 }
fn default_max_upload_bytes() -> usize { 20 * 1024 * 1024 }
fn default_preview_chars() -> usize { 1_000 }
fn default_analysis_input_chars() -> usize { 8_000 }
fn default_analysis_chunk_chars() -> usize { 6_000 }
fn default_analysis_max_chunks() -> usize { 8 }
fn default_max_prompt_chars() -> usize { 24_000 }
fn default_max_document_chars() -> usize { 12_000 }
fn default_max_history_turns() -> usize { 10 }
fn default_max_question_chars() -> usize { 4_000 }
fn default_max_compare() -> usize { 5 }
fn default_compare_chars() -> usize { 4_000 }
fn default_session_ttl() -> i64 { 60 }
fn default_sweep_interval() -> u64 { 60 }
fn default_max_sessions() -> usize { 1_000 }
fn default_max_documents() -> usize { 10 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "paperlens".to_string() }
fn default_rate_limit() -> u32 { 20 }
fn default_burst() -> u32 { 40 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__LLM__PROVIDER=openai
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = config.try_deserialize()?;
        config.llm.resolve_api_key(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = config.try_deserialize()?;
        config.llm.resolve_api_key(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.llm.provider.requires_api_key()
            && self.llm.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(AppError::Configuration {
                message: format!(
                    "llm.api_key is required for provider '{}' (set APP__LLM__API_KEY or {})",
                    self.llm.provider,
                    self.llm.provider.api_key_env().unwrap_or("an API key variable"),
                ),
            });
        }

        let positive = [
            ("analysis.max_input_chars", self.analysis.max_input_chars),
            ("analysis.chunk_chars", self.analysis.chunk_chars),
            ("analysis.max_chunks", self.analysis.max_chunks),
            ("conversation.max_prompt_chars", self.conversation.max_prompt_chars),
            ("conversation.max_document_chars", self.conversation.max_document_chars),
            ("comparison.max_chars_per_document", self.comparison.max_chars_per_document),
            ("ingestion.max_upload_bytes", self.ingestion.max_upload_bytes),
            ("session.max_documents", self.session.max_documents),
            ("session.max_sessions", self.session.max_sessions),
            ("conversation.max_question_chars", self.conversation.max_question_chars),
        ];
        let positive_secs = [
            ("server.request_timeout_secs", self.server.request_timeout_secs),
            ("llm.timeout_secs", self.llm.timeout_secs),
            ("session.sweep_interval_secs", self.session.sweep_interval_secs),
        ];
        let zero = positive
            .iter()
            .find(|(_, value)| *value == 0)
            .map(|(name, _)| *name)
            .or_else(|| {
                positive_secs
                    .iter()
                    .find(|(_, value)| *value == 0)
                    .map(|(name, _)| *name)
            });
        if let Some(name) = zero {
            return Err(AppError::Configuration {
                message: format!("{} must be greater than zero", name),
            });
        }

        if self.server.request_timeout_secs <= self.llm.timeout_secs {
            return Err(AppError::Configuration {
                message: format!(
                    "server.request_timeout_secs ({}) must exceed llm.timeout_secs ({})",
                    self.server.request_timeout_secs, self.llm.timeout_secs
                ),
            });
        }

        if self.comparison.max_documents < 2 {
            return Err(AppError::Configuration {
                message: "comparison.max_documents must be at least 2".to_string(),
            });
        }

        if self.session.ttl_minutes <= 0 {
            return Err(AppError::Configuration {
                message: "session.ttl_minutes must be positive".to_string(),
            });
        }

        if self.rate_limit.enabled
            && (self.rate_limit.requests_per_second == 0 || self.rate_limit.burst == 0)
        {
            return Err(AppError::Configuration {
                message: "rate_limit.requests_per_second and rate_limit.burst must be positive"
                    .to_string(),
            });
        }

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get session idle TTL as a chrono Duration
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session.ttl_minutes)
    }
}

impl LlmConfig {
    /// Fill a missing API key from the provider's conventional variable
    pub fn resolve_api_key<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing = self.api_key.as_deref().map_or(true, |k| k.trim().is_empty());
        if !missing {
            return;
        }
        if let Some(var) = self.provider.api_key_env() {
            self.api_key = lookup(var).filter(|k| !k.trim().is_empty());
        }
    }

    /// Get completion request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            api_key: None,
            api_base: None,
            model: None,
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_llm_timeout(),
            max_retries: default_llm_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            preview_chars: default_preview_chars(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            strategy: AnalysisStrategy::default(),
            max_input_chars: default_analysis_input_chars(),
            chunk_chars: default_analysis_chunk_chars(),
            max_chunks: default_analysis_max_chunks(),
            auto_analyze: default_enabled(),
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: default_max_prompt_chars(),
            max_document_chars: default_max_document_chars(),
            max_history_turns: default_max_history_turns(),
            max_question_chars: default_max_question_chars(),
        }
    }
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            max_documents: default_max_compare(),
            max_chars_per_document: default_compare_chars(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_session_ttl(),
            sweep_interval_secs: default_sweep_interval(),
            max_sessions: default_max_sessions(),
            max_documents: default_max_documents(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.llm.provider, LlmProvider::Gemini);
        assert_eq!(config.analysis.max_input_chars, 8_000);
        assert_eq!(config.comparison.max_documents, 5);
        assert_eq!(config.comparison.max_chars_per_document, 4_000);
    }

    #[test]
    fn test_gemini_requires_api_key() {
        let config = AppConfig::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_mock_provider_needs_no_key() {
        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::Mock;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_api_key_falls_back_to_provider_variable() {
        let mut llm = LlmConfig::default();
        llm.resolve_api_key(|name| (name == "GEMINI_API_KEY").then(|| "secret".to_string()));
        assert_eq!(llm.api_key.as_deref(), Some("secret"));

        let mut explicit = LlmConfig {
            api_key: Some("explicit".to_string()),
            ..LlmConfig::default()
        };
        explicit.resolve_api_key(|_| Some("ignored".to_string()));
        assert_eq!(explicit.api_key.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_zero_limits_rejected() {
        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::Mock;
        config.conversation.max_prompt_chars = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("conversation.max_prompt_chars"));

        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::Mock;
        config.comparison.max_documents = 1;
        assert!(config.validate().is_err());
    }

    fn mock_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::Mock;
        config
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let mut config = mock_config();
        config.session.sweep_interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("session.sweep_interval_secs"));
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let mut config = mock_config();
        config.server.request_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.request_timeout_secs"));
    }

    #[test]
    fn test_zero_question_limit_rejected() {
        let mut config = mock_config();
        config.conversation.max_question_chars = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("conversation.max_question_chars"));
    }

    #[test]
    fn test_request_timeout_must_exceed_completion_timeout() {
        let mut config = mock_config();
        config.llm.timeout_secs = 60;
        config.server.request_timeout_secs = 60;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("llm.timeout_secs"));

        config.server.request_timeout_secs = 61;
        assert!(config.validate().is_ok());
    }
}
