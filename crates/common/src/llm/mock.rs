//! Offline completion client for development and tests

use super::{CompletionClient, LlmError, LlmProvider};
use async_trait::async_trait;

/// Deterministic client that never leaves the process
pub struct MockClient {
    model: String,
}

impl MockClient {
    pub fn new(model: Option<String>) -> Self {
        Self {
            model: model.unwrap_or_else(|| LlmProvider::Mock.default_model().to_string()),
        }
    }
}

#[async_trait]
impl CompletionClient for MockClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let opening: String = prompt
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .chars()
            .take(160)
            .collect();

        Ok(format!(
            "Mock completion for a {}-character prompt.\n\n\
            Prompt opening: {}\n\n\
            [Mock response - configure llm.provider and llm.api_key for real output]",
            prompt.chars().count(),
            opening
        ))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Mock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_is_deterministic() {
        let client = MockClient::new(None);
        let a = client.complete("\n  Summarise this paper\nbody").await.unwrap();
        let b = client.complete("\n  Summarise this paper\nbody").await.unwrap();
        assert_eq!(a, b);
        assert!(a.contains("Summarise this paper"));
    }
}
