//! PaperLens Research Intelligence
//!
//! Everything that talks to the completion capability:
//! - Analyzer: literature review generation
//! - Q&A session: conversational questions about one paper
//! - Comparator: structured comparison of several papers

pub mod analyzer;
pub mod comparator;
pub mod conversation;
pub mod prompts;
pub mod review;

pub use analyzer::Analyzer;
pub use comparator::Comparator;
pub use conversation::{build_qa_prompt, QaContext, QaPrompt, QaSession};
pub use review::parse_review;

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use paperlens_common::llm::{CompletionClient, LlmError, LlmProvider};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays scripted responses and records every prompt
    pub struct ScriptedClient {
        responses: Mutex<VecDeque<Result<String, LlmError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        pub fn new(responses: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("scripted answer".to_string()))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::Mock
        }
    }
}
