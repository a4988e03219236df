use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use launchpad_core::SessionStore;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    sessions: Arc<dyn SessionStore>,
    tools: usize,
    model: Arc<str>,
}

impl HealthState {
    pub fn new(sessions: Arc<dyn SessionStore>, tools: usize, model: impl Into<String>) -> Self {
        Self { sessions, tools, model: Arc::from(model.into()) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub sessions: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let sessions = match state.sessions.len().await {
        Ok(active) => {
            HealthCheck { status: "ready", detail: format!("{active} active sessions") }
        }
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("session store unavailable: {error}") }
        }
    };
    let ready = sessions.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: format!("serving {} tools with model `{}`", state.tools, state.model),
        },
        sessions,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}
