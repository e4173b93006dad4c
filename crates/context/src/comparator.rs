//! Comparator - structured comparison of several papers

use crate::prompts::{COMPARISON_DIRECTIVE, COMPARISON_INSTRUCTIONS};
use paperlens_common::config::ComparisonConfig;
use paperlens_common::errors::{AppError, Result};
use paperlens_common::llm::CompletionClient;
use paperlens_common::metrics;
use paperlens_common::models::{ComparedDocument, ComparisonResult, Document};
use paperlens_common::session::SessionState;
use paperlens_ingestion::truncate_to_boundary;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

pub struct Comparator {
    client: Arc<dyn CompletionClient>,
    config: ComparisonConfig,
}

impl Comparator {
    pub fn new(client: Arc<dyn CompletionClient>, config: ComparisonConfig) -> Self {
        Self { client, config }
    }

    /// Resolve the requested documents, in request order
    ///
    /// Rejects fewer than two ids, more than the configured maximum,
    /// duplicates and ids that are not in the session.
    pub fn select<'s>(&self, state: &'s SessionState, ids: &[Uuid]) -> Result<Vec<&'s Document>> {
        if ids.len() < 2 || ids.len() > self.config.max_documents {
            return Err(AppError::Validation {
                message: format!(
                    "compare between 2 and {} documents, got {}",
                    self.config.max_documents,
                    ids.len()
                ),
                field: Some("document_ids".to_string()),
            });
        }

        let mut seen = HashSet::new();
        if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
            return Err(AppError::Validation {
                message: format!("document {} listed more than once", dup),
                field: Some("document_ids".to_string()),
            });
        }

        ids.iter().map(|id| state.document(*id)).collect()
    }

    /// Label documents and build the comparison prompt
    pub fn build_prompt(&self, documents: &[&Document]) -> (String, Vec<ComparedDocument>) {
        let mut prompt = format!("{}\n\n", COMPARISON_DIRECTIVE);
        let mut compared = Vec::with_capacity(documents.len());

        for (i, doc) in documents.iter().enumerate() {
            let label = format!("Paper {}", i + 1);
            let (text, truncated) = truncate_to_boundary(&doc.text, self.config.max_chars_per_document);

            prompt.push_str(&format!("===== {}: {} =====\n", label, doc.filename));
            if let Some(analysis) = &doc.analysis {
                prompt.push_str(&format!("Literature review:\n{}\n\n", analysis.review_text.trim()));
            }
            prompt.push_str(if truncated { "Text (truncated):\n" } else { "Text:\n" });
            prompt.push_str(text);
            prompt.push_str("\n\n");

            compared.push(ComparedDocument {
                document_id: doc.id,
                label,
                filename: doc.filename.clone(),
            });
        }

        prompt.push_str(COMPARISON_INSTRUCTIONS);
        (prompt, compared)
    }

    /// Compare the given documents with one completion
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub async fn compare(&self, documents: &[&Document]) -> Result<ComparisonResult> {
        if documents.len() < 2 || documents.len() > self.config.max_documents {
            return Err(AppError::Validation {
                message: format!(
                    "compare between 2 and {} documents, got {}",
                    self.config.max_documents,
                    documents.len()
                ),
                field: Some("document_ids".to_string()),
            });
        }

        let (prompt, compared) = self.build_prompt(documents);
        let result = self.client.complete(&prompt).await;
        metrics::record_comparison(documents.len(), matches!(&result, Ok(t) if !t.trim().is_empty()));

        let comparison = result?;
        if comparison.trim().is_empty() {
            return Err(AppError::AnalysisFailed {
                message: "the model returned an empty comparison".to_string(),
            });
        }

        let result = ComparisonResult::new(compared, comparison.trim().to_string(), self.client.model_name())?;
        info!(comparison_id = %result.id, "Comparison complete");
        Ok(result)
    }
}
