use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use launchpad_core::config::DispatchMode;
use launchpad_core::{ActionKind, ArgumentError, Arguments, AuthContext, ToolCall, ToolResult};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::composer::{
    failure_message, invalid_arguments_message, missing_parameters_message, success_message,
    unknown_action_message,
};
use crate::interpreter::Interpreted;
use crate::tools::{normalize_arguments, DispatchTable, HandlerError, Provisioned};

pub const UNKNOWN_ACTION: &str = "unknown action";

/// How a dispatched call affects the session's slot-filling state.
#[derive(Clone, Debug, PartialEq)]
pub enum SlotStatus {
    /// The call reached its handler; any pending request for the tool is done.
    Complete,
    /// Required fields are missing; these are the usable fields so far.
    Incomplete { collected: Arguments, missing: Vec<String> },
    /// Nothing to record (unknown tool, unreadable or invalid arguments).
    Unchanged,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DispatchOutcome {
    pub result: ToolResult,
    pub slots: SlotStatus,
}

impl DispatchOutcome {
    fn unchanged(result: ToolResult) -> Self {
        Self { result, slots: SlotStatus::Unchanged }
    }
}

/// Runs each call against its handler. One outcome per call, in call order;
/// a failing, slow, or panicking handler never affects its siblings.
#[derive(Clone)]
pub struct ActionDispatcher {
    table: Arc<DispatchTable>,
    mode: DispatchMode,
    handler_timeout: Duration,
}

impl ActionDispatcher {
    pub fn new(table: Arc<DispatchTable>, mode: DispatchMode, handler_timeout: Duration) -> Self {
        Self { table, mode, handler_timeout }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub async fn dispatch(
        &self,
        calls: Vec<Interpreted>,
        auth: &AuthContext,
        correlation_id: &str,
    ) -> Vec<DispatchOutcome> {
        match self.mode {
            DispatchMode::Concurrent => {
                join_all(calls.into_iter().map(|call| self.dispatch_one(call, auth, correlation_id)))
                    .await
            }
            DispatchMode::Sequential => {
                let mut outcomes = Vec::with_capacity(calls.len());
                for call in calls {
                    outcomes.push(self.dispatch_one(call, auth, correlation_id).await);
                }
                outcomes
            }
        }
    }

    async fn dispatch_one(
        &self,
        call: Interpreted,
        auth: &AuthContext,
        correlation_id: &str,
    ) -> DispatchOutcome {
        let call = match call {
            Interpreted::Call(call) => call,
            Interpreted::Rejected(result) => {
                warn!(
                    event_name = "dispatch.arguments_unreadable",
                    correlation_id = %correlation_id,
                    tool = %result.tool,
                    "tool call arguments could not be parsed"
                );
                return DispatchOutcome::unchanged(result);
            }
        };

        let Some((kind, handler)) = ActionKind::from_tool_name(&call.name)
            .and_then(|kind| self.table.handler(kind).map(|handler| (kind, handler)))
        else {
            warn!(
                event_name = "dispatch.unknown_action",
                correlation_id = %correlation_id,
                tool = %call.name,
                "model requested a tool that is not in the catalog"
            );
            return DispatchOutcome::unchanged(ToolResult::failure(
                call.name.clone(),
                UNKNOWN_ACTION,
                unknown_action_message(&call.name),
            ));
        };

        let arguments = match handler.validate(&call.arguments) {
            Ok(arguments) => arguments,
            Err(ArgumentError::MissingParameters(missing)) => {
                info!(
                    event_name = "dispatch.parameters_missing",
                    correlation_id = %correlation_id,
                    tool = %call.name,
                    missing = %missing.join(","),
                    "tool call is missing required parameters"
                );
                let result = ToolResult::failure(
                    call.name.clone(),
                    ArgumentError::MissingParameters(missing.clone()).to_string(),
                    missing_parameters_message(kind, &missing),
                );
                return DispatchOutcome {
                    result,
                    slots: SlotStatus::Incomplete { collected: collected_fields(&call), missing },
                };
            }
            Err(error) => {
                warn!(
                    event_name = "dispatch.arguments_invalid",
                    correlation_id = %correlation_id,
                    tool = %call.name,
                    error = %error,
                    "tool call arguments failed validation"
                );
                let reason = error.to_string();
                return DispatchOutcome::unchanged(ToolResult::failure(
                    call.name.clone(),
                    reason.clone(),
                    invalid_arguments_message(kind, &reason),
                ));
            }
        };

        let outcome = self.execute_guarded(kind, &arguments, auth).await;
        let result = match outcome {
            Ok(provisioned) => {
                let provisioned = Provisioned {
                    identifier: auth.redact(&provisioned.identifier),
                    display_name: auth.redact(&provisioned.display_name),
                };
                info!(
                    event_name = "dispatch.tool_succeeded",
                    correlation_id = %correlation_id,
                    tool = %call.name,
                    resource_id = %provisioned.identifier,
                    "provisioning action completed"
                );
                ToolResult::success(
                    call.name.clone(),
                    json!({ "id": provisioned.identifier, "name": provisioned.display_name }),
                    auth.redact(&success_message(kind, &arguments, &provisioned)),
                )
            }
            Err(error) => {
                warn!(
                    event_name = "dispatch.tool_failed",
                    correlation_id = %correlation_id,
                    tool = %call.name,
                    error_class = error.class(),
                    "provisioning action failed"
                );
                ToolResult::failure(
                    call.name.clone(),
                    auth.redact(&error.to_string()),
                    failure_message(kind),
                )
            }
        };

        DispatchOutcome { result, slots: SlotStatus::Complete }
    }

    async fn execute_guarded(
        &self,
        kind: ActionKind,
        arguments: &Arguments,
        auth: &AuthContext,
    ) -> Result<Provisioned, HandlerError> {
        let Some(handler) = self.table.handler(kind) else {
            return Err(HandlerError::Transport(UNKNOWN_ACTION.to_string()));
        };
        let guarded = AssertUnwindSafe(handler.execute(arguments, auth)).catch_unwind();
        match tokio::time::timeout(self.handler_timeout, guarded).await {
            Err(_) => Err(HandlerError::Timeout(self.handler_timeout.as_secs())),
            Ok(Err(_panic)) => Err(HandlerError::Panicked),
            Ok(Ok(result)) => result,
        }
    }
}

/// Non-blank values the user has supplied so far, normalized like a real call.
fn collected_fields(call: &ToolCall) -> Arguments {
    normalize_arguments(&call.arguments)
        .into_iter()
        .filter(|(_, value)| match value {
            Value::Null => false,
            Value::String(text) => !text.trim().is_empty(),
            _ => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use launchpad_core::config::DispatchMode;
    use launchpad_core::{ActionKind, Arguments, AuthContext, ToolCall};
    use serde_json::json;

    use super::{ActionDispatcher, SlotStatus, UNKNOWN_ACTION};
    use crate::interpreter::{interpret, Interpreted};
    use crate::tools::{DispatchTable, HandlerError, Provisioned, ProvisioningHandler};

    /// Fails when the name argument is "boom", panics on "panic", stalls on "slow".
    struct Scripted {
        kind: ActionKind,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ProvisioningHandler for Scripted {
        fn kind(&self) -> ActionKind {
            self.kind
        }

        async fn execute(
            &self,
            arguments: &Arguments,
            auth: &AuthContext,
        ) -> Result<Provisioned, HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let name = arguments
                .get(self.kind.name_parameter())
                .and_then(|value| value.as_str())
                .unwrap_or_default()
                .to_string();
            match name.as_str() {
                "boom" => Err(HandlerError::Rejected("quota exceeded".to_string())),
                "leak" => Err(HandlerError::Rejected(format!("bad cookie {}", auth.expose()))),
                "panic" => panic!("handler exploded"),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Provisioned { identifier: "late".to_string(), display_name: name })
                }
                _ => Ok(Provisioned { identifier: format!("id-{name}"), display_name: name }),
            }
        }
    }

    fn dispatcher(mode: DispatchMode) -> (ActionDispatcher, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let table = DispatchTable::complete(ActionKind::ALL.map(|kind| {
            Arc::new(Scripted { kind, calls: Arc::clone(&calls) }) as Arc<dyn ProvisioningHandler>
        }))
        .expect("table");
        (ActionDispatcher::new(Arc::new(table), mode, Duration::from_millis(200)), calls)
    }

    fn app(name: &str) -> Interpreted {
        Interpreted::Call(ToolCall {
            id: None,
            name: "deploy-app".to_string(),
            arguments: json!({"appname": name, "apptype": "nodejs"})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        })
    }

    fn auth() -> AuthContext {
        AuthContext::new("secret-token-xyz").expect("token")
    }

    #[tokio::test]
    async fn one_failure_never_affects_siblings_at_any_position() {
        for mode in [DispatchMode::Concurrent, DispatchMode::Sequential] {
            for failing in 0..4 {
                let (dispatcher, _) = dispatcher(mode);
                let calls = (0..4)
                    .map(|index| app(if index == failing { "boom" } else { "ok" }))
                    .collect::<Vec<_>>();

                let outcomes = dispatcher.dispatch(calls, &auth(), "req").await;

                assert_eq!(outcomes.len(), 4);
                for (index, outcome) in outcomes.iter().enumerate() {
                    assert_eq!(outcome.result.tool, "deploy-app");
                    if index == failing {
                        assert_eq!(outcome.result.error(), Some("quota exceeded"));
                        assert!(outcome.result.message.starts_with("Sorry"));
                    } else {
                        assert!(outcome.result.is_success(), "{mode:?} index {index}");
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn panicking_and_stalled_handlers_become_failures() {
        let (dispatcher, _) = dispatcher(DispatchMode::Concurrent);
        let outcomes =
            dispatcher.dispatch(vec![app("panic"), app("slow"), app("fine")], &auth(), "req").await;

        assert_eq!(outcomes[0].result.error(), Some("provisioning handler aborted unexpectedly"));
        assert!(outcomes[1].result.error().is_some_and(|error| error.contains("timed out")));
        assert!(outcomes[2].result.is_success());
    }

    #[tokio::test]
    async fn unknown_tool_and_unreadable_arguments_skip_handlers() {
        let (dispatcher, calls) = dispatcher(DispatchMode::Concurrent);
        let mut batch = interpret(vec![launchpad_core::RawToolCall {
            id: None,
            name: "deploy-app".to_string(),
            arguments: "{not json".to_string(),
        }]);
        batch.push(Interpreted::Call(ToolCall {
            id: None,
            name: "drop-everything".to_string(),
            arguments: Arguments::new(),
        }));

        let outcomes = dispatcher.dispatch(batch, &auth(), "req").await;

        assert_eq!(outcomes[0].result.error(), Some("invalid arguments"));
        assert_eq!(outcomes[1].result.tool, "drop-everything");
        assert_eq!(outcomes[1].result.error(), Some(UNKNOWN_ACTION));
        assert!(outcomes.iter().all(|outcome| outcome.slots == SlotStatus::Unchanged));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_parameters_report_collected_fields() {
        let (dispatcher, calls) = dispatcher(DispatchMode::Sequential);
        let call = Interpreted::Call(ToolCall {
            id: None,
            name: "create-database".to_string(),
            arguments: json!({"dbname": " demo ", "dbuser": ""})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        });

        let outcomes = dispatcher.dispatch(vec![call], &auth(), "req").await;

        assert_eq!(
            outcomes[0].result.error(),
            Some("missing required parameters: dbuser, dbpass, dbtype")
        );
        match &outcomes[0].slots {
            SlotStatus::Incomplete { collected, missing } => {
                assert_eq!(collected.len(), 1);
                assert_eq!(collected["dbname"], "demo");
                assert_eq!(missing.len(), 3);
            }
            other => panic!("unexpected slots {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn credential_is_scrubbed_from_failure_text() {
        let (dispatcher, _) = dispatcher(DispatchMode::Concurrent);
        let outcomes = dispatcher.dispatch(vec![app("leak")], &auth(), "req").await;

        let encoded = serde_json::to_string(&outcomes[0].result).expect("encode");
        assert!(!encoded.contains("secret-token-xyz"));
        assert!(encoded.contains("[redacted]"));
    }
}
