//! Handlers backed by the control panel's provisioning HTTP API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use launchpad_core::config::{CredentialForwarding, ProvisioningConfig};
use launchpad_core::{ActionKind, Arguments, AuthContext};
use reqwest::header::COOKIE;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::{HandlerError, Provisioned, ProvisioningHandler};

pub struct HttpProvisioningHandler {
    kind: ActionKind,
    http: Client,
    endpoint: String,
    forwarding: CredentialForwarding,
    cookie_name: String,
    timeout_secs: u64,
}

impl HttpProvisioningHandler {
    pub fn new(kind: ActionKind, http: Client, config: &ProvisioningConfig) -> Self {
        Self {
            kind,
            http,
            endpoint: format!("{}{}", config.base_url.trim_end_matches('/'), kind.endpoint_path()),
            forwarding: config.credential_forwarding,
            cookie_name: config.cookie_name.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    /// One handler per action kind, sharing a single connection pool.
    pub fn standard_set(
        config: &ProvisioningConfig,
    ) -> Result<Vec<Arc<dyn ProvisioningHandler>>, HandlerError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| HandlerError::Transport(error.to_string()))?;

        Ok(ActionKind::ALL
            .into_iter()
            .map(|kind| {
                Arc::new(Self::new(kind, http.clone(), config)) as Arc<dyn ProvisioningHandler>
            })
            .collect())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_send_error(&self, error: reqwest::Error) -> HandlerError {
        if error.is_timeout() {
            HandlerError::Timeout(self.timeout_secs)
        } else {
            HandlerError::Transport(error.without_url().to_string())
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ServiceResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default, alias = "_id", alias = "identifier")]
    id: Option<Value>,
    #[serde(default, alias = "displayName", alias = "display_name")]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ServiceResponse {
    fn reason(&self) -> Option<String> {
        self.error.clone().or_else(|| self.message.clone()).filter(|text| !text.trim().is_empty())
    }
}

fn identifier_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[async_trait]
impl ProvisioningHandler for HttpProvisioningHandler {
    fn kind(&self) -> ActionKind {
        self.kind
    }

    async fn execute(
        &self,
        arguments: &Arguments,
        auth: &AuthContext,
    ) -> Result<Provisioned, HandlerError> {
        let mut request = self.http.post(&self.endpoint).json(arguments);
        request = match self.forwarding {
            CredentialForwarding::Cookie => {
                request.header(COOKIE, format!("{}={}", self.cookie_name, auth.expose()))
            }
            CredentialForwarding::Bearer => request.bearer_auth(auth.expose()),
        };

        let response = request.send().await.map_err(|error| self.map_send_error(error))?;
        let status = response.status();
        let body = response.text().await.map_err(|error| self.map_send_error(error))?;
        let parsed = serde_json::from_str::<ServiceResponse>(&body).ok();

        if !status.is_success() {
            let reason = parsed
                .as_ref()
                .and_then(ServiceResponse::reason)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "request failed".to_string());
            return Err(HandlerError::Status { status: status.as_u16(), reason });
        }

        let parsed = parsed.ok_or_else(|| {
            HandlerError::MalformedResponse("response body was not a JSON object".to_string())
        })?;
        if parsed.success == Some(false) {
            return Err(HandlerError::Rejected(
                parsed.reason().unwrap_or_else(|| "request was rejected".to_string()),
            ));
        }

        let identifier = parsed.id.as_ref().and_then(identifier_text).ok_or_else(|| {
            HandlerError::MalformedResponse("response did not include a resource identifier".into())
        })?;
        let display_name = parsed
            .name
            .filter(|name| !name.trim().is_empty())
            .or_else(|| {
                arguments.get(self.kind.name_parameter()).and_then(Value::as_str).map(str::to_string)
            })
            .unwrap_or_else(|| identifier.clone());

        Ok(Provisioned { identifier, display_name })
    }
}
