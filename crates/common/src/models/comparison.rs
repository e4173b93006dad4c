//! Cross-document comparison output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::errors::{AppError, Result};

/// A document as it was labelled in a comparison prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparedDocument {
    pub document_id: Uuid,
    /// "Paper 1", "Paper 2", ...
    pub label: String,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub id: Uuid,
    pub documents: Vec<ComparedDocument>,
    pub comparison: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

impl ComparisonResult {
    /// Build a result, requiring at least two distinct documents
    pub fn new(
        documents: Vec<ComparedDocument>,
        comparison: String,
        model: impl Into<String>,
    ) -> Result<Self> {
        if documents.len() < 2 {
            return Err(AppError::Validation {
                message: "a comparison needs at least two documents".to_string(),
                field: Some("document_ids".to_string()),
            });
        }

        let mut seen = HashSet::new();
        if let Some(dup) = documents.iter().find(|d| !seen.insert(d.document_id)) {
            return Err(AppError::Validation {
                message: format!("document {} appears more than once", dup.document_id),
                field: Some("document_ids".to_string()),
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            documents,
            comparison,
            model: model.into(),
            created_at: Utc::now(),
        })
    }

    pub fn document_ids(&self) -> Vec<Uuid> {
        self.documents.iter().map(|d| d.document_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compared(n: usize) -> ComparedDocument {
        ComparedDocument {
            document_id: Uuid::new_v4(),
            label: format!("Paper {}", n),
            filename: format!("p{}.pdf", n),
        }
    }

    #[test]
    fn test_requires_two_documents() {
        let err = ComparisonResult::new(vec![compared(1)], "x".into(), "m").unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_rejects_duplicates() {
        let a = compared(1);
        let err = ComparisonResult::new(vec![a.clone(), a], "x".into(), "m").unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_keeps_order() {
        let docs = vec![compared(1), compared(2), compared(3)];
        let ids: Vec<Uuid> = docs.iter().map(|d| d.document_id).collect();
        let result = ComparisonResult::new(docs, "compared".into(), "m").unwrap();
        assert_eq!(result.document_ids(), ids);
    }
}
