//! Append-only Q&A transcript for one document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, Result};

/// One question and its answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub index: usize,
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(index: usize, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            index,
            question: question.into(),
            answer: answer.into(),
            asked_at: Utc::now(),
        }
    }
}

/// Ordered turns scoped to a single document
///
/// Turns are never edited or reordered; indices are contiguous from 0.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationLog {
    document_id: Uuid,
    turns: Vec<ConversationTurn>,
}

impl ConversationLog {
    pub fn new(document_id: Uuid) -> Self {
        Self {
            document_id,
            turns: Vec::new(),
        }
    }

    pub fn document_id(&self) -> Uuid {
        self.document_id
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Index the next appended turn must carry
    pub fn next_index(&self) -> usize {
        self.turns.len()
    }

    /// Append a completed turn
    pub fn append(&mut self, turn: ConversationTurn) -> Result<&ConversationTurn> {
        if turn.index != self.next_index() {
            return Err(AppError::Conflict {
                message: format!(
                    "conversation for document {} expected turn {}, got {}",
                    self.document_id,
                    self.next_index(),
                    turn.index
                ),
            });
        }
        self.turns.push(turn);
        Ok(&self.turns[self.turns.len() - 1])
    }

    /// Start a fresh log for the same document
    pub fn clear(&mut self) {
        self.turns = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_contiguous_indices() {
        let mut log = ConversationLog::new(Uuid::new_v4());
        assert!(log.is_empty());

        log.append(ConversationTurn::new(0, "q0", "a0")).unwrap();
        log.append(ConversationTurn::new(1, "q1", "a1")).unwrap();

        let indices: Vec<usize> = log.turns().iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(log.next_index(), 2);
    }

    #[test]
    fn test_out_of_order_turn_rejected() {
        let mut log = ConversationLog::new(Uuid::new_v4());
        let err = log.append(ConversationTurn::new(3, "q", "a")).unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
        assert!(log.is_empty());
    }

    #[test]
    fn test_clear_resets_indices() {
        let id = Uuid::new_v4();
        let mut log = ConversationLog::new(id);
        log.append(ConversationTurn::new(0, "q", "a")).unwrap();
        log.clear();

        assert!(log.is_empty());
        assert_eq!(log.document_id(), id);
        assert!(log.append(ConversationTurn::new(0, "again", "a")).is_ok());
    }
}
