use std::sync::Arc;
use std::time::Duration;

use launchpad_core::config::AppConfig;
use launchpad_core::{
    ApplicationError, Arguments, AuthContext, SessionId, SessionState, SessionStore, ToolCatalog,
};
use tracing::{error, info, warn};

use crate::composer::ChatResponse;
use crate::conversation::{system_prompt, validate_history, ChatMessage, DEFAULT_SYSTEM_PROMPT};
use crate::dispatcher::{ActionDispatcher, DispatchOutcome, SlotStatus};
use crate::interpreter::{interpret, Interpreted};
use crate::llm::{CompletionClient, CompletionRequest};
use crate::tools::{DispatchTable, DispatchTableError};

#[derive(Clone, Debug, PartialEq)]
pub struct TurnRequest {
    pub session_id: SessionId,
    pub messages: Vec<ChatMessage>,
    pub correlation_id: String,
}

/// One conversational turn: model call, interpretation, dispatch, and the
/// session update that carries slot-filling state into the next turn.
pub struct ProvisioningAgent {
    completion: Arc<dyn CompletionClient>,
    sessions: Arc<dyn SessionStore>,
    catalog: Arc<ToolCatalog>,
    dispatcher: ActionDispatcher,
    base_prompt: String,
}

impl ProvisioningAgent {
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        sessions: Arc<dyn SessionStore>,
        catalog: Arc<ToolCatalog>,
        dispatcher: ActionDispatcher,
        base_prompt: impl Into<String>,
    ) -> Self {
        Self { completion, sessions, catalog, dispatcher, base_prompt: base_prompt.into() }
    }

    /// Wires the agent from configuration; fails if any catalog entry lacks a handler.
    pub fn from_config(
        config: &AppConfig,
        completion: Arc<dyn CompletionClient>,
        sessions: Arc<dyn SessionStore>,
        table: DispatchTable,
    ) -> Result<Self, DispatchTableError> {
        table.ensure_complete()?;
        let dispatcher = ActionDispatcher::new(
            Arc::new(table),
            config.provisioning.dispatch_mode,
            Duration::from_secs(config.provisioning.timeout_secs),
        );
        let base_prompt =
            config.llm.system_prompt.clone().unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        Ok(Self::new(
            completion,
            sessions,
            Arc::new(ToolCatalog::standard()),
            dispatcher,
            base_prompt,
        ))
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub async fn handle_turn(
        &self,
        request: TurnRequest,
        auth: &AuthContext,
    ) -> Result<ChatResponse, ApplicationError> {
        let TurnRequest { session_id, messages, correlation_id } = request;
        validate_history(&messages)?;

        let session = self.sessions.get_or_create(&session_id).await?;
        info!(
            event_name = "turn.started",
            correlation_id = %correlation_id,
            session_id = %session_id,
            messages = messages.len(),
            pending_action = session.pending_action.as_deref().unwrap_or("none"),
            "handling chat turn"
        );

        let completion = self
            .completion
            .complete(CompletionRequest {
                system_prompt: system_prompt(&self.base_prompt, &session, &self.catalog),
                history: messages,
                tools: self.catalog.list().into_iter().cloned().collect(),
            })
            .await
            .map_err(|failure| {
                let detail = auth.redact(&failure.to_string());
                error!(
                    event_name = "turn.completion_failed",
                    correlation_id = %correlation_id,
                    session_id = %session_id,
                    error = %detail,
                    "completion call failed; turn aborted"
                );
                ApplicationError::Integration(detail)
            })?;

        let calls = merge_pending(&session, interpret(completion.tool_calls));
        let outcomes = self.dispatcher.dispatch(calls, auth, &correlation_id).await;

        let next = advance_session(session, &outcomes);
        if let Err(failure) = self.sessions.put(&session_id, next).await {
            // Handlers have already run, so the turn still succeeds.
            warn!(
                event_name = "turn.session_write_failed",
                correlation_id = %correlation_id,
                session_id = %session_id,
                error = %failure,
                "could not persist session state"
            );
        }

        let results = outcomes.into_iter().map(|outcome| outcome.result).collect::<Vec<_>>();
        info!(
            event_name = "turn.completed",
            correlation_id = %correlation_id,
            session_id = %session_id,
            tool_calls = results.len(),
            failures = results.iter().filter(|result| !result.is_success()).count(),
            "chat turn completed"
        );

        Ok(ChatResponse::compose(
            completion.assistant_text.map(|text| auth.redact(&text)),
            results,
            &session_id,
        ))
    }

    pub async fn reset_session(&self, session_id: &SessionId) -> Result<bool, ApplicationError> {
        Ok(self.sessions.delete(session_id).await?)
    }
}

/// Fills a pending request's earlier answers into the first follow-up call for
/// the same tool; values from the new call win. Later calls to that tool in the
/// same turn are separate requests and stay untouched.
fn merge_pending(session: &SessionState, calls: Vec<Interpreted>) -> Vec<Interpreted> {
    let mut pending = session.pending_action.is_some();
    calls
        .into_iter()
        .map(|call| match call {
            Interpreted::Call(mut call) if pending && session.is_pending(&call.name) => {
                pending = false;
                let mut merged: Arguments = session.collected_data.clone();
                for (key, value) in call.arguments {
                    let blank = value.is_null() || value.as_str().is_some_and(|s| s.trim().is_empty());
                    if !blank || !merged.contains_key(&key) {
                        merged.insert(key, value);
                    }
                }
                call.arguments = merged;
                Interpreted::Call(call)
            }
            other => other,
        })
        .collect()
}

fn advance_session(mut session: SessionState, outcomes: &[DispatchOutcome]) -> SessionState {
    for outcome in outcomes {
        match &outcome.slots {
            SlotStatus::Complete if session.is_pending(&outcome.result.tool) => {
                session.clear_pending();
            }
            SlotStatus::Incomplete { collected, .. } => {
                session.pending_action = Some(outcome.result.tool.clone());
                session.collected_data = collected.clone();
            }
            SlotStatus::Complete | SlotStatus::Unchanged => {}
        }
    }
    session.step += 1;
    session
}

#[cfg(test)]
mod tests {
    use launchpad_core::{SessionState, ToolCall, ToolResult};
    use serde_json::json;

    use super::{advance_session, merge_pending};
    use crate::dispatcher::{DispatchOutcome, SlotStatus};
    use crate::interpreter::Interpreted;

    fn pending_database() -> SessionState {
        let mut session = SessionState::default();
        session.pending_action = Some("create-database".to_string());
        session.collected_data =
            json!({"dbname": "demo", "dbtype": "mysql"}).as_object().cloned().unwrap_or_default();
        session
    }

    #[test]
    fn follow_up_call_inherits_collected_fields_and_overrides_them() {
        let call = Interpreted::Call(ToolCall {
            id: None,
            name: "create-database".to_string(),
            arguments: json!({"dbuser": "admin", "dbtype": "postgresql", "dbname": ""})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        });

        let merged = merge_pending(&pending_database(), vec![call]);

        match &merged[0] {
            Interpreted::Call(call) => {
                assert_eq!(call.arguments["dbname"], "demo");
                assert_eq!(call.arguments["dbuser"], "admin");
                assert_eq!(call.arguments["dbtype"], "postgresql");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn only_the_first_matching_call_inherits_collected_fields() {
        let first = Interpreted::Call(ToolCall {
            id: None,
            name: "create-database".to_string(),
            arguments: json!({"dbuser": "admin", "dbpass": "s3cret"})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        });
        let second = Interpreted::Call(ToolCall {
            id: None,
            name: "create-database".to_string(),
            arguments: json!({"dbname": "analytics"}).as_object().cloned().unwrap_or_default(),
        });

        let merged = merge_pending(&pending_database(), vec![first, second.clone()]);

        match &merged[0] {
            Interpreted::Call(call) => {
                assert_eq!(call.arguments["dbname"], "demo");
                assert_eq!(call.arguments["dbpass"], "s3cret");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(merged[1], second);
    }

    #[test]
    fn other_tools_are_not_merged() {
        let call = Interpreted::Call(ToolCall {
            id: None,
            name: "create-chatbot".to_string(),
            arguments: Default::default(),
        });
        let merged = merge_pending(&pending_database(), vec![call.clone()]);
        assert_eq!(merged, vec![call]);
    }

    #[test]
    fn completed_pending_action_is_cleared_and_step_advances() {
        let outcome = DispatchOutcome {
            result: ToolResult::success("create-database", json!({"id": "1"}), "ok"),
            slots: SlotStatus::Complete,
        };
        let next = advance_session(pending_database(), &[outcome]);

        assert_eq!(next.pending_action, None);
        assert!(next.collected_data.is_empty());
        assert_eq!(next.step, 1);
    }

    #[test]
    fn unrelated_completion_keeps_pending_state() {
        let outcome = DispatchOutcome {
            result: ToolResult::success("deploy-app", json!({"id": "1"}), "ok"),
            slots: SlotStatus::Complete,
        };
        let next = advance_session(pending_database(), &[outcome]);
        assert_eq!(next.pending_action.as_deref(), Some("create-database"));
    }
}
