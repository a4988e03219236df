//! Function-calling completion clients.
//!
//! Both supported providers speak the OpenAI chat-completions dialect, so a
//! single HTTP client covers them; the trait exists so tests and the runtime
//! can swap in a scripted model.

use std::time::Duration;

use async_trait::async_trait;
use launchpad_core::config::{LlmConfig, LlmProvider};
use launchpad_core::{RawToolCall, ToolDefinition};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::conversation::ChatMessage;

const ERROR_BODY_LIMIT: usize = 200;

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub history: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Completion {
    pub assistant_text: Option<String>,
    pub tool_calls: Vec<RawToolCall>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("completion endpoint unreachable: {0}")]
    Transport(String),
    #[error("completion request timed out after {0}s")]
    Timeout(u64),
    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion response was malformed: {0}")]
    Envelope(String),
    #[error("completion client misconfigured: {0}")]
    Configuration(String),
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError>;

    fn model(&self) -> &str;
}

pub struct OpenAiCompletionClient {
    http: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    temperature: f32,
    timeout_secs: u64,
}

impl OpenAiCompletionClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        if config.provider == LlmProvider::OpenAi && config.api_key.is_none() {
            return Err(CompletionError::Configuration("openai provider requires an api key".into()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| CompletionError::Configuration(error.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.effective_base_url()),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn wire_request(&self, request: &CompletionRequest) -> WireRequest {
        let mut messages = Vec::with_capacity(request.history.len() + 1);
        messages.push(WireMessage { role: "system", content: request.system_prompt.clone() });
        messages.extend(request.history.iter().map(|message| WireMessage {
            role: message.role.as_str(),
            content: message.content.clone(),
        }));

        let tools = request
            .tools
            .iter()
            .map(|tool| WireTool {
                kind: "function",
                function: WireFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameter_schema.to_json_schema(),
                },
            })
            .collect::<Vec<_>>();
        let tool_choice = if tools.is_empty() { None } else { Some("auto") };

        WireRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            messages,
            tools,
            tool_choice,
            stream: false,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        let mut builder = self.http.post(&self.endpoint).json(&self.wire_request(&request));
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder.send().await.map_err(|error| {
            if error.is_timeout() {
                CompletionError::Timeout(self.timeout_secs)
            } else {
                CompletionError::Transport(error.without_url().to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            if error.is_timeout() {
                CompletionError::Timeout(self.timeout_secs)
            } else {
                CompletionError::Transport(error.without_url().to_string())
            }
        })?;

        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        let parsed: WireResponse = serde_json::from_str(&body)
            .map_err(|error| CompletionError::Envelope(error.to_string()))?;
        parsed.into_completion()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    temperature: f32,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireAssistantMessage,
}

#[derive(Debug, Deserialize)]
struct WireAssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

impl WireResponse {
    fn into_completion(self) -> Result<Completion, CompletionError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::Envelope("response contained no choices".to_string()))?;

        let assistant_text = choice.message.content.filter(|text| !text.trim().is_empty());
        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| RawToolCall {
                id: call.id,
                name: call.function.name,
                // Some OpenAI-compatible servers (Ollama among them) send an object here.
                arguments: match call.function.arguments {
                    Value::String(text) => text,
                    Value::Null => String::new(),
                    other => other.to_string(),
                },
            })
            .collect();

        Ok(Completion { assistant_text, tool_calls })
    }
}
