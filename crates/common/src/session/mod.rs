//! In-memory session store
//!
//! Each session owns its documents, one conversation per document and the
//! comparisons produced in it. The id map sits behind an `RwLock`; every
//! session has its own async `Mutex`, so work inside one session is
//! serialised while different sessions run concurrently. The map lock is
//! never held across a completion call.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::models::{ComparisonResult, ConversationLog, Document, DocumentSummary};

/// Mutable contents of one session
#[derive(Debug)]
pub struct SessionState {
    documents: Vec<Document>,
    conversations: HashMap<Uuid, ConversationLog>,
    comparisons: Vec<ComparisonResult>,
    max_documents: usize,
}

impl SessionState {
    fn new(max_documents: usize) -> Self {
        Self {
            documents: Vec::new(),
            conversations: HashMap::new(),
            comparisons: Vec::new(),
            max_documents,
        }
    }

    /// Documents in upload order
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document(&self, id: Uuid) -> Result<&Document> {
        self.documents
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| AppError::DocumentNotFound { id: id.to_string() })
    }

    pub fn document_mut(&mut self, id: Uuid) -> Result<&mut Document> {
        self.documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| AppError::DocumentNotFound { id: id.to_string() })
    }

    /// Document previously uploaded with identical bytes
    pub fn find_by_hash(&self, content_hash: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.content_hash == content_hash)
    }

    /// Fail if another document would exceed the per-session limit
    pub fn ensure_capacity(&self) -> Result<()> {
        if self.documents.len() >= self.max_documents {
            return Err(AppError::LimitExceeded {
                message: format!(
                    "session already holds the maximum of {} documents",
                    self.max_documents
                ),
            });
        }
        Ok(())
    }

    /// Add a document together with its empty conversation
    pub fn add_document(&mut self, document: Document) -> Result<&Document> {
        self.ensure_capacity()?;
        self.conversations
            .insert(document.id, ConversationLog::new(document.id));
        self.documents.push(document);
        Ok(&self.documents[self.documents.len() - 1])
    }

    /// Remove a document and its conversation
    pub fn remove_document(&mut self, id: Uuid) -> Result<Document> {
        let position = self
            .documents
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| AppError::DocumentNotFound { id: id.to_string() })?;
        self.conversations.remove(&id);
        Ok(self.documents.remove(position))
    }

    pub fn conversation(&self, document_id: Uuid) -> Result<&ConversationLog> {
        self.conversations
            .get(&document_id)
            .ok_or_else(|| AppError::DocumentNotFound {
                id: document_id.to_string(),
            })
    }

    pub fn conversation_mut(&mut self, document_id: Uuid) -> Result<&mut ConversationLog> {
        self.conversations
            .get_mut(&document_id)
            .ok_or_else(|| AppError::DocumentNotFound {
                id: document_id.to_string(),
            })
    }

    pub fn comparisons(&self) -> &[ComparisonResult] {
        &self.comparisons
    }

    pub fn add_comparison(&mut self, comparison: ComparisonResult) -> &ComparisonResult {
        self.comparisons.push(comparison);
        &self.comparisons[self.comparisons.len() - 1]
    }
}

/// Shared handle to one live session
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    /// Milliseconds since the epoch; readable without the state lock
    last_active_ms: AtomicI64,
    ttl: chrono::Duration,
    state: Mutex<SessionState>,
}

impl Session {
    fn new(ttl: chrono::Duration, max_documents: usize) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            last_active_ms: AtomicI64::new(now.timestamp_millis()),
            ttl,
            state: Mutex::new(SessionState::new(max_documents)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.last_active_ms.load(Ordering::Relaxed))
            .single()
            .unwrap_or(self.created_at)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.last_active_at() + self.ttl
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    fn touch(&self) {
        self.last_active_ms
            .fetch_max(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Exclusive access to the session's contents
    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        let guard = self.state.lock().await;
        self.touch();
        guard
    }

    /// Whether a request currently holds the session
    fn is_busy(&self) -> bool {
        self.state.try_lock().is_err()
    }

    pub async fn overview(&self) -> SessionOverview {
        let state = self.lock().await;
        SessionOverview {
            id: self.id,
            created_at: self.created_at,
            last_active_at: self.last_active_at(),
            expires_at: self.expires_at(),
            documents: state.documents.iter().map(Document::summary).collect(),
            conversation_turns: state
                .documents
                .iter()
                .map(|d| state.conversations.get(&d.id).map_or(0, ConversationLog::len))
                .sum(),
            comparison_count: state.comparisons.len(),
        }
    }
}

/// Serializable session snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SessionOverview {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub documents: Vec<DocumentSummary>,
    pub conversation_turns: usize,
    pub comparison_count: usize,
}

/// Registry of live sessions
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
    ttl: chrono::Duration,
    max_sessions: usize,
    max_documents: usize,
}

impl SessionStore {
    pub fn new(ttl: chrono::Duration, max_sessions: usize, max_documents: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            max_sessions,
            max_documents,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            chrono::Duration::minutes(config.ttl_minutes),
            config.max_sessions,
            config.max_documents,
        )
    }

    /// Start a new session
    pub async fn create(&self) -> Result<Arc<Session>> {
        if self.len().await >= self.max_sessions {
            self.purge_expired().await;
        }

        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            return Err(AppError::LimitExceeded {
                message: format!("maximum of {} live sessions reached", self.max_sessions),
            });
        }

        let session = Arc::new(Session::new(self.ttl, self.max_documents));
        sessions.insert(session.id, session.clone());
        metrics::record_sessions(sessions.len(), 0);

        info!(session_id = %session.id, "Session created");
        Ok(session)
    }

    /// Look up a live session and extend its lifetime
    pub async fn get(&self, id: Uuid) -> Result<Arc<Session>> {
        let session = {
            let sessions = self.sessions.read().await;
            sessions.get(&id).cloned()
        };

        match session {
            Some(session) if session.is_expired(Utc::now()) && !session.is_busy() => {
                self.evict(id).await;
                Err(AppError::SessionNotFound { id: id.to_string() })
            }
            Some(session) => {
                session.touch();
                Ok(session)
            }
            None => Err(AppError::SessionNotFound { id: id.to_string() }),
        }
    }

    /// End a session explicitly
    pub async fn remove(&self, id: Uuid) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        match sessions.remove(&id) {
            Some(_) => {
                metrics::record_sessions(sessions.len(), 0);
                info!(session_id = %id, "Session ended");
                Ok(())
            }
            None => Err(AppError::SessionNotFound { id: id.to_string() }),
        }
    }

    async fn evict(&self, id: Uuid) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(&id).is_some() {
            metrics::record_sessions(sessions.len(), 1);
            info!(session_id = %id, "Session expired");
        }
    }

    /// Drop sessions idle past their TTL, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now) || session.is_busy());
        let removed = before - sessions.len();

        metrics::record_sessions(sessions.len(), removed);
        if removed > 0 {
            info!(removed, remaining = sessions.len(), "Expired sessions purged");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Periodically purge expired sessions
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = self.purge_expired().await;
                debug!(removed, "Session sweep finished");
            }
        })
    }
}
