//! Analyzer - literature review generation
//!
//! Two strategies for fitting a paper into one prompt:
//! - `truncate`: cut the text at a semantic boundary
//! - `map_reduce`: take notes per chunk, then review the combined notes

use crate::prompts::{review_from_notes_prompt, review_prompt, section_notes_prompt};
use crate::review::parse_review;
use chrono::Utc;
use paperlens_common::config::{AnalysisConfig, AnalysisStrategy};
use paperlens_common::errors::{AppError, Result};
use paperlens_common::llm::CompletionClient;
use paperlens_common::metrics;
use paperlens_common::models::Analysis;
use paperlens_ingestion::{chunk_text, truncate_to_boundary, ChunkingConfig};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Generates literature reviews through the completion capability
pub struct Analyzer {
    client: Arc<dyn CompletionClient>,
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(client: Arc<dyn CompletionClient>, config: AnalysisConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Produce an analysis of a document's text
    #[instrument(skip_all, fields(char_count = text.chars().count(), strategy = ?self.config.strategy))]
    pub async fn analyze(&self, text: &str) -> Result<Analysis> {
        let char_count = text.chars().count();
        let use_map_reduce = self.config.strategy == AnalysisStrategy::MapReduce
            && char_count > self.config.max_input_chars;

        let result = if use_map_reduce {
            self.map_reduce(text).await
        } else {
            self.single_pass(text).await
        };

        let strategy = if use_map_reduce {
            AnalysisStrategy::MapReduce
        } else {
            AnalysisStrategy::Truncate
        };
        metrics::record_analysis(strategy_label(strategy), result.is_ok());

        let (review_text, truncated, input_chars) = result?;
        let review = parse_review(&review_text);

        if !review.missing_fields.is_empty() {
            debug!(missing = ?review.missing_fields, "Review is missing sections");
        }

        info!(
            truncated,
            input_chars,
            review_chars = review_text.chars().count(),
            "Analysis complete"
        );

        Ok(Analysis {
            review_text,
            review,
            model: self.client.model_name().to_string(),
            strategy,
            truncated,
            input_chars,
            created_at: Utc::now(),
        })
    }

    async fn single_pass(&self, text: &str) -> Result<(String, bool, usize)> {
        let (input, truncated) = truncate_to_boundary(text, self.config.max_input_chars);
        if truncated {
            debug!(
                kept = input.chars().count(),
                limit = self.config.max_input_chars,
                "Document text truncated for analysis"
            );
        }

        let review = self.complete(&review_prompt(input, truncated)).await?;
        Ok((review, truncated, input.chars().count()))
    }

    async fn map_reduce(&self, text: &str) -> Result<(String, bool, usize)> {
        let chunks = chunk_text(text, &ChunkingConfig::new(self.config.chunk_chars))?;
        let truncated = chunks.len() > self.config.max_chunks;
        if truncated {
            warn!(
                chunks = chunks.len(),
                max_chunks = self.config.max_chunks,
                "Document longer than the map-reduce budget, later sections skipped"
            );
        }

        let selected = &chunks[..chunks.len().min(self.config.max_chunks)];
        let total = selected.len();
        let mut notes = Vec::with_capacity(total);
        let mut input_chars = 0;

        // Sequential to stay within provider rate limits
        for chunk in selected {
            let part = chunk.index + 1;
            let note = self
                .complete(&section_notes_prompt(&chunk.content, part, total))
                .await?;
            debug!(part, total, "Section notes taken");
            input_chars += chunk.content.chars().count();
            notes.push(format!("### Part {}\n{}", part, note.trim()));
        }

        let combined = notes.join("\n\n");
        let (combined, notes_cut) = truncate_to_boundary(&combined, self.config.max_input_chars);
        let review = self
            .complete(&review_from_notes_prompt(combined, truncated || notes_cut))
            .await?;

        Ok((review, truncated, input_chars))
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self.client.complete(prompt).await?;
        if response.trim().is_empty() {
            return Err(AppError::AnalysisFailed {
                message: "the model returned an empty review".to_string(),
            });
        }
        Ok(response)
    }
}

fn strategy_label(strategy: AnalysisStrategy) -> &'static str {
    match strategy {
        AnalysisStrategy::Truncate => "truncate",
        AnalysisStrategy::MapReduce => "map_reduce",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedClient;
    use paperlens_common::llm::LlmError;

    const REVIEW: &str = "**Title of the Paper:** Sparse Models\n**Year of the Paper:** 2020\n**Methodology:** Pruning.";

    fn config(strategy: AnalysisStrategy) -> AnalysisConfig {
        AnalysisConfig {
            strategy,
            max_input_chars: 100,
            chunk_chars: 60,
            max_chunks: 2,
            ..AnalysisConfig::default()
        }
    }

    #[tokio::test]
    async fn test_truncate_strategy() {
        let client = ScriptedClient::new(vec![Ok(REVIEW.to_string())]);
        let analyzer = Analyzer::new(client.clone(), config(AnalysisStrategy::Truncate));

        let text = "A sentence about pruning. ".repeat(20);
        let analysis = analyzer.analyze(&text).await.unwrap();

        assert!(analysis.truncated);
        assert!(analysis.input_chars <= 100);
        assert_eq!(analysis.review.title.as_deref(), Some("Sparse Models"));
        assert_eq!(analysis.review.year, Some(2020));
        assert_eq!(analysis.strategy, AnalysisStrategy::Truncate);

        let prompts = client.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("truncated for analysis"));
    }

    #[tokio::test]
    async fn test_short_text_is_not_truncated() {
        let client = ScriptedClient::new(vec![Ok(REVIEW.to_string())]);
        let analyzer = Analyzer::new(client.clone(), config(AnalysisStrategy::MapReduce));

        let analysis = analyzer.analyze("Short paper.").await.unwrap();
        assert!(!analysis.truncated);
        assert_eq!(analysis.strategy, AnalysisStrategy::Truncate);
        assert_eq!(client.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_map_reduce_strategy() {
        let client = ScriptedClient::new(vec![
            Ok("notes one".to_string()),
            Ok("notes two".to_string()),
            Ok(REVIEW.to_string()),
        ]);
        let analyzer = Analyzer::new(client.clone(), config(AnalysisStrategy::MapReduce));

        let text = "Pruning removes weights from the network. ".repeat(10);
        let analysis = analyzer.analyze(&text).await.unwrap();

        assert_eq!(analysis.strategy, AnalysisStrategy::MapReduce);
        assert!(analysis.truncated);

        let prompts = client.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[0].contains("part 1 of 2"));
        assert!(prompts[2].contains("notes one"));
        assert!(prompts[2].contains("notes two"));
    }

    #[tokio::test]
    async fn test_empty_review_fails() {
        let client = ScriptedClient::new(vec![Ok("   ".to_string())]);
        let analyzer = Analyzer::new(client, config(AnalysisStrategy::Truncate));

        let err = analyzer.analyze("Some text.").await.unwrap_err();
        assert!(matches!(err, AppError::AnalysisFailed { .. }));
    }

    #[tokio::test]
    async fn test_completion_error_maps_to_analysis_failed() {
        let client = ScriptedClient::new(vec![Err(LlmError::Timeout { timeout_secs: 60 })]);
        let analyzer = Analyzer::new(client, config(AnalysisStrategy::Truncate));

        let err = analyzer.analyze("Some text.").await.unwrap_err();
        assert!(matches!(err, AppError::AnalysisFailed { .. }));
        assert_eq!(err.status_code().as_u16(), 502);
    }
}
