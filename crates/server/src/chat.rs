//! Conversational provisioning API.
//!
//! - `POST   /api/v1/chat`                   run one turn
//! - `DELETE /api/v1/sessions/{session_id}`  forget slot-filling state (404 if unknown)
//! - `GET    /api/v1/tools`                  list the tool catalog
//!
//! Every route requires the caller's session token, read from the configured
//! cookie or, failing that, an `Authorization: Bearer` header.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{
        header::{AUTHORIZATION, COOKIE},
        HeaderMap, StatusCode,
    },
    routing::{delete, get, post},
    Json, Router,
};
use launchpad_agent::{ChatMessage, ChatResponse, ProvisioningAgent, TurnFailure, TurnRequest};
use launchpad_core::{ApplicationError, AuthContext, SessionId, ToolDefinition};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ChatState {
    agent: Arc<ProvisioningAgent>,
    cookie_name: Arc<str>,
}

impl ChatState {
    pub fn new(agent: Arc<ProvisioningAgent>, cookie_name: impl Into<String>) -> Self {
        Self { agent, cookie_name: Arc::from(cookie_name.into()) }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResetResponse {
    pub success: bool,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolDefinition>,
}

type ApiError = (StatusCode, Json<TurnFailure>);

pub fn router(state: ChatState) -> Router {
    Router::new()
        .route("/api/v1/chat", post(chat))
        .route("/api/v1/sessions/{session_id}", delete(reset_session))
        .route("/api/v1/tools", get(list_tools))
        .with_state(state)
}

async fn chat(
    State(state): State<ChatState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let auth = require_auth(&headers, &state.cookie_name, &correlation_id)?;
    let Json(body) = payload.map_err(|rejection| {
        api_error(ApplicationError::InvalidRequest(rejection.body_text()), &correlation_id)
    })?;

    let request = TurnRequest {
        session_id: SessionId::new(body.session_id.unwrap_or_default()),
        messages: body.messages,
        correlation_id: correlation_id.clone(),
    };

    state
        .agent
        .handle_turn(request, &auth)
        .await
        .map(Json)
        .map_err(|error| api_error(error, &correlation_id))
}

async fn reset_session(
    State(state): State<ChatState>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResetResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    require_auth(&headers, &state.cookie_name, &correlation_id)?;

    let session_id = SessionId::new(session_id);
    let removed = state
        .agent
        .reset_session(&session_id)
        .await
        .map_err(|error| api_error(error, &correlation_id))?;
    if !removed {
        return Err(api_error(
            ApplicationError::NotFound(format!("session `{session_id}` does not exist")),
            &correlation_id,
        ));
    }

    info!(
        event_name = "http.session.reset",
        correlation_id = %correlation_id,
        session_id = %session_id,
        "session state cleared"
    );

    Ok(Json(SessionResetResponse { success: true, session_id: session_id.as_str().to_string() }))
}

async fn list_tools(
    State(state): State<ChatState>,
    headers: HeaderMap,
) -> Result<Json<ToolsResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    require_auth(&headers, &state.cookie_name, &correlation_id)?;

    Ok(Json(ToolsResponse { tools: state.agent.catalog().list().into_iter().cloned().collect() }))
}

fn require_auth(
    headers: &HeaderMap,
    cookie_name: &str,
    correlation_id: &str,
) -> Result<AuthContext, ApiError> {
    extract_auth(headers, cookie_name).ok_or_else(|| {
        api_error(
            ApplicationError::Unauthenticated(format!(
                "a `{cookie_name}` cookie or bearer token is required"
            )),
            correlation_id,
        )
    })
}

/// Cookie first, then `Authorization: Bearer`.
pub fn extract_auth(headers: &HeaderMap, cookie_name: &str) -> Option<AuthContext> {
    cookie_value(headers, cookie_name).or_else(|| bearer_token(headers)).and_then(AuthContext::new)
}

fn cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name.trim() == cookie_name).then(|| value.trim().to_string())
        })
        .find(|value| !value.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))?;
    Some(token.trim().to_string()).filter(|token| !token.is_empty())
}

fn api_error(error: ApplicationError, correlation_id: &str) -> ApiError {
    let interface = error.into_interface(correlation_id);
    let status =
        StatusCode::from_u16(interface.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    warn!(
        event_name = "http.request.failed",
        correlation_id = %correlation_id,
        status = status.as_u16(),
        error = %interface,
        "request failed"
    );
    (status, Json(TurnFailure::from(&interface)))
}
