//! User-facing wording and the response envelope returned for each turn.

use launchpad_core::{ActionKind, Arguments, InterfaceError, SessionId, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::Provisioned;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: Option<String>,
    pub tool_results: Vec<ToolResult>,
    pub success: bool,
    pub session_id: String,
}

impl ChatResponse {
    pub fn compose(
        assistant_text: Option<String>,
        tool_results: Vec<ToolResult>,
        session_id: &SessionId,
    ) -> Self {
        Self {
            message: assistant_text,
            tool_results,
            success: true,
            session_id: session_id.as_str().to_string(),
        }
    }
}

/// Body returned when a turn fails as a whole.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnFailure {
    pub error: String,
    pub details: String,
    pub status: u16,
    pub success: bool,
}

impl From<&InterfaceError> for TurnFailure {
    fn from(error: &InterfaceError) -> Self {
        Self {
            error: error.user_message().to_string(),
            details: error.details().to_string(),
            status: error.status_code(),
            success: false,
        }
    }
}

fn text<'a>(arguments: &'a Arguments, key: &str) -> &'a str {
    arguments.get(key).and_then(Value::as_str).unwrap_or_default()
}

pub fn success_message(kind: ActionKind, arguments: &Arguments, provisioned: &Provisioned) -> String {
    let id = &provisioned.identifier;
    match kind {
        ActionKind::DeployApp => format!(
            "Your {} app '{}' is being deployed (id {id}).",
            text(arguments, "apptype"),
            provisioned.display_name
        ),
        ActionKind::CreateDatabase => format!(
            "Created {} database '{}' for user '{}' (id {id}).",
            text(arguments, "dbtype"),
            text(arguments, "dbname"),
            text(arguments, "dbuser")
        ),
        ActionKind::CreateWebBuilder => format!(
            "Your {} website '{}' is ready in the web builder (id {id}).",
            text(arguments, "sitetype"),
            provisioned.display_name
        ),
        ActionKind::CreateChatbot => format!(
            "Your {} chatbot '{}' has been created (id {id}).",
            text(arguments, "bottype"),
            provisioned.display_name
        ),
        ActionKind::CreateVirtualSpace => format!(
            "Your {} virtual space '{}' has been created (id {id}).",
            text(arguments, "spacetype"),
            provisioned.display_name
        ),
    }
}

/// Deliberately generic; the specific reason travels in the result's `error`.
pub fn failure_message(kind: ActionKind) -> String {
    match kind {
        ActionKind::DeployApp => {
            "Sorry, I couldn't deploy the app right now. Please try again later.".to_string()
        }
        other => format!(
            "Sorry, I couldn't create the {} right now. Please try again later.",
            other.noun()
        ),
    }
}

pub fn missing_parameters_message(kind: ActionKind, missing: &[String]) -> String {
    format!("To set up the {} I still need: {}.", kind.noun(), missing.join(", "))
}

pub fn invalid_arguments_message(kind: ActionKind, reason: &str) -> String {
    format!("I couldn't use the details given for the {}: {reason}.", kind.noun())
}

pub fn unknown_action_message(tool: &str) -> String {
    format!("Sorry, I don't know how to handle \"{tool}\".")
}

#[cfg(test)]
mod tests {
    use launchpad_core::{ActionKind, InterfaceError, SessionId, ToolResult};
    use serde_json::json;

    use super::{failure_message, success_message, ChatResponse, TurnFailure};
    use crate::tools::Provisioned;

    #[test]
    fn database_success_mentions_name_and_engine_but_not_password() {
        let arguments = json!({"dbname": "demo", "dbuser": "admin", "dbpass": "pw-9", "dbtype": "mysql"})
            .as_object()
            .cloned()
            .unwrap_or_default();
        let message = success_message(
            ActionKind::CreateDatabase,
            &arguments,
            &Provisioned { identifier: "abc123".to_string(), display_name: "demo".to_string() },
        );

        assert!(message.contains("demo"));
        assert!(message.contains("mysql"));
        assert!(message.contains("abc123"));
        assert!(!message.contains("pw-9"));
    }

    #[test]
    fn failure_message_is_generic() {
        let message = failure_message(ActionKind::CreateDatabase);
        assert!(message.starts_with("Sorry"));
        assert!(message.contains("database"));
    }

    #[test]
    fn response_serializes_in_camel_case() {
        let response = ChatResponse::compose(
            Some("done".to_string()),
            vec![ToolResult::failure("deploy-app", "quota exceeded", "Sorry")],
            &SessionId::new(""),
        );
        let encoded = serde_json::to_value(&response).expect("encode");

        assert_eq!(encoded["sessionId"], "default");
        assert_eq!(encoded["success"], true);
        assert_eq!(encoded["toolResults"][0]["error"], "quota exceeded");
        assert_eq!(encoded["toolResults"][0].get("result"), None);
    }

    #[test]
    fn turn_failure_mirrors_interface_error() {
        let error = InterfaceError::Internal {
            message: "completion endpoint unreachable".to_string(),
            correlation_id: "req-1".to_string(),
        };
        let failure = TurnFailure::from(&error);

        assert_eq!(failure.status, 500);
        assert!(!failure.success);
        assert_eq!(failure.details, "completion endpoint unreachable");
        assert_eq!(serde_json::to_value(&failure).expect("encode")["success"], json!(false));
    }
}
