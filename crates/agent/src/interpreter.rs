use launchpad_core::{ArgumentError, Arguments, RawToolCall, ToolCall, ToolResult};
use serde_json::Value;

/// A model-emitted call after argument parsing. Calls whose arguments cannot be
/// read never reach a handler and carry their failure result instead.
#[derive(Clone, Debug, PartialEq)]
pub enum Interpreted {
    Call(ToolCall),
    Rejected(ToolResult),
}

impl Interpreted {
    pub fn tool(&self) -> &str {
        match self {
            Self::Call(call) => &call.name,
            Self::Rejected(result) => &result.tool,
        }
    }
}

pub fn parse_arguments(raw: &str) -> Result<Arguments, ArgumentError> {
    // An empty argument string from the model means "no arguments".
    if raw.trim().is_empty() {
        return Ok(Arguments::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(arguments)) => Ok(arguments),
        Ok(_) => Err(ArgumentError::NotAnObject),
        Err(_) => Err(ArgumentError::InvalidJson),
    }
}

/// Preserves the model's order; one entry per raw call.
pub fn interpret(raw_calls: Vec<RawToolCall>) -> Vec<Interpreted> {
    raw_calls.into_iter().map(interpret_one).collect()
}

fn interpret_one(raw: RawToolCall) -> Interpreted {
    match parse_arguments(&raw.arguments) {
        Ok(arguments) => Interpreted::Call(ToolCall { id: raw.id, name: raw.name, arguments }),
        Err(_) => Interpreted::Rejected(ToolResult::failure(
            raw.name,
            ArgumentError::InvalidJson.to_string(),
            "I couldn't read the details for that request. Could you rephrase it?",
        )),
    }
}
