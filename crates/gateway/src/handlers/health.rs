//! Health check handlers

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: ReadyChecks,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ReadyChecks {
    pub completion: CompletionCheck,
    pub sessions: SessionCheck,
}

#[derive(Serialize)]
pub struct CompletionCheck {
    pub provider: String,
    pub model: String,
}

#[derive(Serialize)]
pub struct SessionCheck {
    pub active: usize,
    pub capacity: usize,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: paperlens_common::VERSION.to_string(),
    })
}

/// Readiness probe
///
/// Not ready once the session store is full, since new sessions would be
/// refused.
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let active = state.sessions.len().await;
    let capacity = state.config.session.max_sessions;

    Json(ReadyResponse {
        status: if active < capacity { "ready" } else { "not_ready" }.to_string(),
        checks: ReadyChecks {
            completion: CompletionCheck {
                provider: state.client.provider().to_string(),
                model: state.client.model_name().to_string(),
            },
            sessions: SessionCheck { active, capacity },
        },
        timestamp: Utc::now(),
    })
}
