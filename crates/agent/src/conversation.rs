use launchpad_core::{ActionKind, ApplicationError, SessionState, ToolCatalog};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are the provisioning assistant for a hosting \
control panel. You can deploy apps and create databases, web-builder sites, chatbots and \
virtual spaces by calling the provided tools. Only call a tool when the user asked for that \
resource. If a required detail is missing, ask the user for it instead of guessing. You may \
call several tools in one reply when the user asks for several resources. Never repeat \
passwords back to the user.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// History is supplied by the caller on every turn; the service keeps none of it.
pub fn validate_history(messages: &[ChatMessage]) -> Result<(), ApplicationError> {
    if messages.is_empty() {
        return Err(ApplicationError::InvalidRequest("messages must not be empty".to_string()));
    }
    if messages.iter().all(|message| message.content.trim().is_empty()) {
        return Err(ApplicationError::InvalidRequest(
            "messages must contain at least one non-empty message".to_string(),
        ));
    }
    Ok(())
}

/// Base instructions plus a note about any partially collected request, so the
/// model can ask for exactly the fields that are still missing.
pub fn system_prompt(base: &str, session: &SessionState, catalog: &ToolCatalog) -> String {
    let Some(tool) = session.pending_action.as_deref() else {
        return base.to_string();
    };
    let Some(definition) = ActionKind::from_tool_name(tool).and_then(|kind| catalog.definition(kind))
    else {
        return base.to_string();
    };

    let provided = definition
        .parameter_schema
        .required
        .iter()
        .filter(|name| session.collected_data.contains_key(name.as_str()))
        .map(String::as_str)
        .collect::<Vec<_>>();
    let missing = definition.parameter_schema.missing_parameters(&session.collected_data);
    if missing.is_empty() {
        return base.to_string();
    }

    let provided = if provided.is_empty() { "none".to_string() } else { provided.join(", ") };
    format!(
        "{base}\n\nA {tool} request is in progress. Details already provided: {provided}. \
         Still needed: {}. When the user supplies them, call {tool} again with the new values.",
        missing.join(", ")
    )
}
