use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use launchpad_core::{standard_catalog, ActionKind, ArgumentError, Arguments, AuthContext};
use serde_json::Value;
use thiserror::Error;

/// What the provisioning service reported for a created resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Provisioned {
    pub identifier: String,
    pub display_name: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("provisioning service unreachable: {0}")]
    Transport(String),
    #[error("provisioning service timed out after {0}s")]
    Timeout(u64),
    #[error("provisioning service returned {status}: {reason}")]
    Status { status: u16, reason: String },
    #[error("{0}")]
    Rejected(String),
    #[error("provisioning service response was malformed: {0}")]
    MalformedResponse(String),
    #[error("provisioning handler aborted unexpectedly")]
    Panicked,
}

impl HandlerError {
    /// Stable label for logs; never carries request data.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Timeout(_) => "timeout",
            Self::Status { .. } => "status",
            Self::Rejected(_) => "rejected",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Panicked => "panicked",
        }
    }
}

#[async_trait]
pub trait ProvisioningHandler: Send + Sync {
    fn kind(&self) -> ActionKind;

    /// Checks `arguments` against the catalog schema and returns the
    /// normalized arguments the handler will execute with.
    fn validate(&self, arguments: &Arguments) -> Result<Arguments, ArgumentError> {
        validate_for(self.kind(), arguments)
    }

    async fn execute(
        &self,
        arguments: &Arguments,
        auth: &AuthContext,
    ) -> Result<Provisioned, HandlerError>;
}

pub fn validate_for(kind: ActionKind, arguments: &Arguments) -> Result<Arguments, ArgumentError> {
    let normalized = normalize_arguments(arguments);
    if let Some(definition) = standard_catalog().definition(kind) {
        definition.parameter_schema.validate(&normalized)?;
    }
    Ok(normalized)
}

/// Names and users are trimmed; `*type` fields are trimmed and lowercased.
/// Everything else (passwords in particular) passes through untouched.
pub fn normalize_arguments(arguments: &Arguments) -> Arguments {
    arguments
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(text) if key.ends_with("type") => {
                    Value::String(text.trim().to_ascii_lowercase())
                }
                Value::String(text) if key.ends_with("name") || key.ends_with("user") => {
                    Value::String(text.trim().to_string())
                }
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DispatchTableError {
    #[error("handler for `{0}` registered twice")]
    Duplicate(ActionKind),
    #[error("no handler registered for: {}", .0.iter().map(|kind| kind.tool_name()).collect::<Vec<_>>().join(", "))]
    Incomplete(Vec<ActionKind>),
}

/// Exactly one handler per [`ActionKind`].
#[derive(Clone, Default)]
pub struct DispatchTable {
    handlers: BTreeMap<ActionKind, Arc<dyn ProvisioningHandler>>,
}

impl DispatchTable {
    /// Builds a table and fails unless every action kind is covered.
    pub fn complete(
        handlers: impl IntoIterator<Item = Arc<dyn ProvisioningHandler>>,
    ) -> Result<Self, DispatchTableError> {
        let mut table = Self::default();
        for handler in handlers {
            table.register(handler)?;
        }
        table.ensure_complete()?;
        Ok(table)
    }

    pub fn register(
        &mut self,
        handler: Arc<dyn ProvisioningHandler>,
    ) -> Result<(), DispatchTableError> {
        let kind = handler.kind();
        if self.handlers.contains_key(&kind) {
            return Err(DispatchTableError::Duplicate(kind));
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    pub fn missing_kinds(&self) -> Vec<ActionKind> {
        ActionKind::ALL.into_iter().filter(|kind| !self.handlers.contains_key(kind)).collect()
    }

    pub fn ensure_complete(&self) -> Result<(), DispatchTableError> {
        let missing = self.missing_kinds();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DispatchTableError::Incomplete(missing))
        }
    }

    pub fn handler(&self, kind: ActionKind) -> Option<&Arc<dyn ProvisioningHandler>> {
        self.handlers.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use launchpad_core::{ActionKind, ArgumentError, Arguments, AuthContext};
    use serde_json::json;

    use super::{
        normalize_arguments, DispatchTable, DispatchTableError, HandlerError, Provisioned,
        ProvisioningHandler,
    };

    struct Noop(ActionKind);

    #[async_trait]
    impl ProvisioningHandler for Noop {
        fn kind(&self) -> ActionKind {
            self.0
        }

        async fn execute(
            &self,
            _arguments: &Arguments,
            _auth: &AuthContext,
        ) -> Result<Provisioned, HandlerError> {
            Ok(Provisioned { identifier: "1".to_string(), display_name: "x".to_string() })
        }
    }

    fn args(value: serde_json::Value) -> Arguments {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn table_requires_a_handler_for_every_kind() {
        let partial = DispatchTable::complete(vec![
            Arc::new(Noop(ActionKind::DeployApp)) as Arc<dyn ProvisioningHandler>,
        ]);
        match partial {
            Err(DispatchTableError::Incomplete(missing)) => assert_eq!(missing.len(), 4),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("partial table accepted"),
        }

        let full = DispatchTable::complete(
            ActionKind::ALL.map(|kind| Arc::new(Noop(kind)) as Arc<dyn ProvisioningHandler>),
        )
        .expect("complete table");
        assert_eq!(full.len(), ActionKind::ALL.len());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut table = DispatchTable::default();
        table.register(Arc::new(Noop(ActionKind::CreateChatbot))).expect("first");
        assert_eq!(
            table.register(Arc::new(Noop(ActionKind::CreateChatbot))),
            Err(DispatchTableError::Duplicate(ActionKind::CreateChatbot))
        );
    }

    #[test]
    fn normalization_trims_names_and_lowercases_types_but_keeps_passwords() {
        let normalized = normalize_arguments(&args(json!({
            "dbname": "  demo ",
            "dbuser": " admin",
            "dbpass": " s3cret ",
            "dbtype": " MySQL ",
        })));

        assert_eq!(normalized["dbname"], "demo");
        assert_eq!(normalized["dbuser"], "admin");
        assert_eq!(normalized["dbpass"], " s3cret ");
        assert_eq!(normalized["dbtype"], "mysql");
    }

    #[test]
    fn default_validation_uses_the_catalog_schema() {
        let handler = Noop(ActionKind::CreateDatabase);

        assert_eq!(
            handler.validate(&args(json!({"dbname": "demo"}))),
            Err(ArgumentError::MissingParameters(vec![
                "dbuser".to_string(),
                "dbpass".to_string(),
                "dbtype".to_string(),
            ]))
        );

        let valid = handler
            .validate(&args(json!({
                "dbname": "demo", "dbuser": "admin", "dbpass": "pw", "dbtype": "PostgreSQL"
            })))
            .expect("valid");
        assert_eq!(valid["dbtype"], "postgresql");
    }
}
