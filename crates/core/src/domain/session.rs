use serde::{Deserialize, Serialize};

use crate::domain::tool::Arguments;

pub const DEFAULT_SESSION_ID: &str = "default";

/// Caller-supplied conversation key. Blank ids collapse to `"default"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            Self(DEFAULT_SESSION_ID.to_string())
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Slot-filling progress for one conversation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub pending_action: Option<String>,
    pub collected_data: Arguments,
    pub step: u64,
}

impl SessionState {
    pub fn is_pending(&self, tool: &str) -> bool {
        self.pending_action.as_deref() == Some(tool)
    }

    pub fn clear_pending(&mut self) {
        self.pending_action = None;
        self.collected_data.clear();
    }
}
