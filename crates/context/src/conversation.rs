//! Conversational Q&A over one document
//!
//! The prompt builder is pure: given the document context, the turn history
//! and a question it decides what fits in the character budget. The paper
//! text always goes in (cut to its own limit) and is budgeted first; the
//! literature review gets what the text leaves. History is filled newest
//! first and the scan stops at the first turn that does not fit, so the
//! oldest turns are the ones dropped.

use crate::prompts::QA_DIRECTIVE;
use paperlens_common::config::ConversationConfig;
use paperlens_common::errors::{AppError, Result};
use paperlens_common::llm::CompletionClient;
use paperlens_common::metrics;
use paperlens_common::models::{ConversationLog, ConversationTurn};
use paperlens_ingestion::truncate_to_boundary;
use std::sync::Arc;
use tracing::{debug, instrument};

/// What the model is told about the document
#[derive(Debug, Clone, Copy)]
pub struct QaContext<'a> {
    pub filename: &'a str,
    pub text: &'a str,
    /// Literature review, when the document has been analysed
    pub review: Option<&'a str>,
}

/// A built Q&A prompt and what went into it
#[derive(Debug, Clone)]
pub struct QaPrompt {
    pub prompt: String,
    /// Number of most recent turns included
    pub included_turns: usize,
    pub document_chars: usize,
    pub document_truncated: bool,
    pub review_truncated: bool,
}

const DOCUMENT_HEADER: &str = "Paper text:\n";
const TRUNCATED_DOCUMENT_HEADER: &str = "Paper text (truncated):\n";
const HISTORY_HEADER: &str = "Conversation so far:\n";
const REVIEW_HEADER: &str = "Literature review:\n";
const TRUNCATED_REVIEW_HEADER: &str = "Literature review (truncated):\n";

fn render_turn(turn: &ConversationTurn) -> String {
    format!("User: {}\nAssistant: {}\n\n", turn.question, turn.answer)
}

/// Build the prompt for the next question
pub fn build_qa_prompt(
    context: &QaContext<'_>,
    history: &[ConversationTurn],
    question: &str,
    config: &ConversationConfig,
) -> QaPrompt {
    let head = format!("{}\n\nPaper: {}\n\n", QA_DIRECTIVE, context.filename);
    let tail = format!("Question:\n{}\n\nAnswer:", question);

    let considered = &history[history.len().saturating_sub(config.max_history_turns)..];

    // Worst case framing: truncated header, blank line after the text
    let mut fixed = head.chars().count() + tail.chars().count() + TRUNCATED_DOCUMENT_HEADER.len() + 2;
    if !considered.is_empty() {
        fixed += HISTORY_HEADER.len();
    }
    let mut remaining = config.max_prompt_chars.saturating_sub(fixed);

    let (document, document_truncated) =
        truncate_to_boundary(context.text, config.max_document_chars.min(remaining));
    let document_chars = document.chars().count();
    remaining = remaining.saturating_sub(document_chars);

    let mut review_section = None;
    let mut review_truncated = false;
    let review_framing = TRUNCATED_REVIEW_HEADER.len() + 2;
    if let Some(review) = context.review.map(str::trim).filter(|r| !r.is_empty()) {
        if remaining > review_framing {
            let (kept, cut) = truncate_to_boundary(review, remaining - review_framing);
            if !kept.trim().is_empty() {
                let header = if cut { TRUNCATED_REVIEW_HEADER } else { REVIEW_HEADER };
                let section = format!("{}{}\n\n", header, kept);
                remaining = remaining.saturating_sub(section.chars().count());
                review_truncated = cut;
                review_section = Some(section);
            }
        }
    }

    let mut included: Vec<String> = Vec::new();
    for turn in considered.iter().rev() {
        let rendered = render_turn(turn);
        let cost = rendered.chars().count();
        if cost > remaining {
            break;
        }
        remaining -= cost;
        included.push(rendered);
    }
    included.reverse();

    let mut prompt = head;
    if let Some(section) = &review_section {
        prompt.push_str(section);
    }
    prompt.push_str(if document_truncated {
        TRUNCATED_DOCUMENT_HEADER
    } else {
        DOCUMENT_HEADER
    });
    prompt.push_str(document);
    prompt.push_str("\n\n");
    if !included.is_empty() {
        prompt.push_str(HISTORY_HEADER);
        for turn in &included {
            prompt.push_str(turn);
        }
    }
    prompt.push_str(&tail);

    QaPrompt {
        prompt,
        included_turns: included.len(),
        document_chars,
        document_truncated,
        review_truncated,
    }
}

/// Answers questions about a document, one completion per question
pub struct QaSession {
    client: Arc<dyn CompletionClient>,
    config: ConversationConfig,
}

impl QaSession {
    pub fn new(client: Arc<dyn CompletionClient>, config: ConversationConfig) -> Self {
        Self { client, config }
    }

    /// Reject empty or oversized questions before any model call
    pub fn validate_question<'q>(&self, question: &'q str) -> Result<&'q str> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Validation {
                message: "question must not be empty".to_string(),
                field: Some("question".to_string()),
            });
        }
        let len = question.chars().count();
        if len > self.config.max_question_chars {
            return Err(AppError::Validation {
                message: format!(
                    "question is {} characters, the limit is {}",
                    len, self.config.max_question_chars
                ),
                field: Some("question".to_string()),
            });
        }
        Ok(question)
    }

    /// Answer a question, returning the turn to append
    ///
    /// The log is not modified; on failure nothing should be appended.
    #[instrument(skip_all, fields(document_id = %log.document_id(), history = log.len()))]
    pub async fn answer(
        &self,
        context: &QaContext<'_>,
        log: &ConversationLog,
        question: &str,
    ) -> Result<ConversationTurn> {
        let question = self.validate_question(question)?;
        let built = build_qa_prompt(context, log.turns(), question, &self.config);

        debug!(
            prompt_chars = built.prompt.chars().count(),
            included_turns = built.included_turns,
            document_truncated = built.document_truncated,
            "Q&A prompt built"
        );

        let result = self.client.complete(&built.prompt).await;
        metrics::record_question(matches!(&result, Ok(a) if !a.trim().is_empty()));

        let answer = result?;
        if answer.trim().is_empty() {
            return Err(AppError::AnalysisFailed {
                message: "the model returned an empty answer".to_string(),
            });
        }

        Ok(ConversationTurn::new(log.next_index(), question, answer.trim()))
    }
}
