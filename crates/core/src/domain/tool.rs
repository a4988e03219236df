use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

pub type Arguments = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    String,
}

impl ParameterType {
    fn json_type(self) -> &'static str {
        match self {
            Self::String => "string",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub kind: ParameterType,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "enum")]
    pub allowed_values: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub required: Vec<String>,
    pub properties: BTreeMap<String, ParameterSpec>,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("invalid arguments")]
    InvalidJson,
    #[error("invalid arguments: expected a JSON object")]
    NotAnObject,
    #[error("missing required parameters: {}", .0.join(", "))]
    MissingParameters(Vec<String>),
    #[error("parameter `{0}` must be a string")]
    WrongType(String),
    #[error("parameter `{param}` must be one of: {}", .allowed.join(", "))]
    InvalidValue { param: String, allowed: Vec<String> },
}

impl ParameterSchema {
    /// Required parameters that are absent or blank in `arguments`, in schema order.
    pub fn missing_parameters(&self, arguments: &Arguments) -> Vec<String> {
        self.required
            .iter()
            .filter(|name| match arguments.get(name.as_str()) {
                None | Some(Value::Null) => true,
                Some(Value::String(value)) => value.trim().is_empty(),
                Some(_) => false,
            })
            .cloned()
            .collect()
    }

    pub fn validate(&self, arguments: &Arguments) -> Result<(), ArgumentError> {
        let missing = self.missing_parameters(arguments);
        if !missing.is_empty() {
            return Err(ArgumentError::MissingParameters(missing));
        }

        for (name, spec) in &self.properties {
            let Some(value) = arguments.get(name) else {
                continue;
            };
            let text = match (spec.kind, value) {
                (_, Value::Null) => continue,
                (ParameterType::String, Value::String(text)) => text,
                (ParameterType::String, _) => return Err(ArgumentError::WrongType(name.clone())),
            };
            if let Some(allowed) = &spec.allowed_values {
                let normalized = text.trim().to_ascii_lowercase();
                if !allowed.iter().any(|candidate| *candidate == normalized) {
                    return Err(ArgumentError::InvalidValue {
                        param: name.clone(),
                        allowed: allowed.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// JSON Schema object in the shape function-calling models expect.
    pub fn to_json_schema(&self) -> Value {
        let properties = self
            .properties
            .iter()
            .map(|(name, spec)| {
                let mut property = json!({
                    "type": spec.kind.json_type(),
                    "description": spec.description,
                });
                if let Some(allowed) = &spec.allowed_values {
                    property["enum"] = json!(allowed);
                }
                (name.clone(), property)
            })
            .collect::<Map<String, Value>>();

        json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "parameterSchema")]
    pub parameter_schema: ParameterSchema,
}

/// A tool call exactly as the model emitted it; `arguments` is unparsed text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawToolCall {
    pub id: Option<String>,
    pub name: String,
    pub arguments: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolCall {
    pub id: Option<String>,
    pub name: String,
    pub arguments: Arguments,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ToolOutcome {
    #[serde(rename = "result")]
    Success(Value),
    #[serde(rename = "error")]
    Failure(String),
}

/// Wire shape: `{tool, result?, error?, message}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    #[serde(flatten)]
    pub outcome: ToolOutcome,
    pub message: String,
}

impl ToolResult {
    pub fn success(tool: impl Into<String>, data: Value, message: impl Into<String>) -> Self {
        Self { tool: tool.into(), outcome: ToolOutcome::Success(data), message: message.into() }
    }

    pub fn failure(
        tool: impl Into<String>,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            outcome: ToolOutcome::Failure(reason.into()),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success(_))
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ToolOutcome::Failure(reason) => Some(reason),
            ToolOutcome::Success(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::{json, Value};

    use super::{
        ArgumentError, Arguments, ParameterSchema, ParameterSpec, ParameterType, ToolResult,
    };

    fn schema() -> ParameterSchema {
        let mut properties = BTreeMap::new();
        properties.insert(
            "dbname".to_string(),
            ParameterSpec {
                kind: ParameterType::String,
                description: "name".to_string(),
                allowed_values: None,
            },
        );
        properties.insert(
            "dbtype".to_string(),
            ParameterSpec {
                kind: ParameterType::String,
                description: "engine".to_string(),
                allowed_values: Some(vec!["mysql".to_string(), "postgresql".to_string()]),
            },
        );
        ParameterSchema { required: vec!["dbname".to_string(), "dbtype".to_string()], properties }
    }

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn blank_and_null_values_count_as_missing() {
        let missing = schema().missing_parameters(&args(json!({"dbname": "  ", "dbtype": null})));
        assert_eq!(missing, vec!["dbname".to_string(), "dbtype".to_string()]);
    }

    #[test]
    fn allowed_values_are_matched_case_insensitively() {
        assert_eq!(schema().validate(&args(json!({"dbname": "demo", "dbtype": "MySQL"}))), Ok(()));
        assert!(matches!(
            schema().validate(&args(json!({"dbname": "demo", "dbtype": "oracle"}))),
            Err(ArgumentError::InvalidValue { ref param, .. }) if param == "dbtype"
        ));
    }

    #[test]
    fn non_string_values_are_rejected() {
        assert_eq!(
            schema().validate(&args(json!({"dbname": 42, "dbtype": "mysql"}))),
            Err(ArgumentError::WrongType("dbname".to_string()))
        );
    }

    #[test]
    fn json_schema_lists_required_and_enum() {
        let rendered = schema().to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["required"], json!(["dbname", "dbtype"]));
        assert_eq!(rendered["properties"]["dbtype"]["enum"], json!(["mysql", "postgresql"]));
        assert!(rendered["properties"]["dbname"].get("enum").is_none());
    }

    #[test]
    fn tool_result_serializes_outcome_as_result_or_error_key() {
        let ok = serde_json::to_value(ToolResult::success(
            "create-database",
            json!({"id": "abc123"}),
            "done",
        ))
        .expect("encode");
        assert_eq!(ok, json!({"tool": "create-database", "result": {"id": "abc123"}, "message": "done"}));

        let failed =
            serde_json::to_value(ToolResult::failure("create-database", "quota exceeded", "sorry"))
                .expect("encode");
        assert_eq!(
            failed,
            json!({"tool": "create-database", "error": "quota exceeded", "message": "sorry"})
        );
    }
}
