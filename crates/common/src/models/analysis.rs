//! Literature review produced by the analyzer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AnalysisStrategy;

/// Structured sections of a literature review
///
/// Sections the model did not produce stay `None` and are named in
/// `missing_fields`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiteratureReview {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub methodology: Option<String>,
    pub dataset: Option<String>,
    pub results: Option<String>,
    pub future_work: Option<String>,
    pub insights: Option<String>,
    pub missing_sections: Option<String>,
    #[serde(default)]
    pub missing_fields: Vec<String>,
}

impl LiteratureReview {
    pub fn is_complete(&self) -> bool {
        self.missing_fields.is_empty()
    }
}

/// Derived analysis of one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    /// Review text as returned by the model
    pub review_text: String,
    pub review: LiteratureReview,
    pub model: String,
    pub strategy: AnalysisStrategy,
    /// Whether the input had to be cut to fit the prompt
    pub truncated: bool,
    /// Characters of document text the review was based on
    pub input_chars: usize,
    pub created_at: DateTime<Utc>,
}

impl Analysis {
    /// Render a downloadable Markdown report
    pub fn to_markdown(&self, filename: &str) -> String {
        let heading = self
            .review
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(filename);

        let mut out = format!("# Literature Review: {}\n\n", heading);
        out.push_str(&format!("- **Source file:** {}\n", filename));
        if let Some(year) = self.review.year {
            out.push_str(&format!("- **Year:** {}\n", year));
        }
        out.push_str(&format!("- **Model:** {}\n", self.model));
        out.push_str(&format!(
            "- **Generated:** {}\n",
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        if self.truncated {
            out.push_str(&format!(
                "- **Note:** based on the first {} characters of the document\n",
                self.input_chars
            ));
        }
        out.push_str("\n---\n\n");
        out.push_str(self.review_text.trim());
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(title: Option<&str>, truncated: bool) -> Analysis {
        Analysis {
            review_text: "**Title:** Deep Nets\n\n**Results:** Good.".into(),
            review: LiteratureReview {
                title: title.map(String::from),
                year: Some(2021),
                ..Default::default()
            },
            model: "mock-completion".into(),
            strategy: AnalysisStrategy::Truncate,
            truncated,
            input_chars: 8_000,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_markdown_uses_review_title() {
        let md = analysis(Some("Deep Nets"), false).to_markdown("paper.pdf");
        assert!(md.starts_with("# Literature Review: Deep Nets\n"));
        assert!(md.contains("**Year:** 2021"));
        assert!(md.contains("**Results:** Good."));
        assert!(!md.contains("**Note:**"));
    }

    #[test]
    fn test_markdown_falls_back_to_filename() {
        let md = analysis(None, true).to_markdown("paper.pdf");
        assert!(md.starts_with("# Literature Review: paper.pdf\n"));
        assert!(md.contains("first 8000 characters"));
    }
}
