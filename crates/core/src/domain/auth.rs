use secrecy::{ExposeSecret, SecretString};

const REDACTED: &str = "[redacted]";

/// The caller's session token, threaded read-only into every provisioning
/// call of a turn. `Debug` never prints the value.
#[derive(Clone)]
pub struct AuthContext {
    token: SecretString,
}

impl AuthContext {
    /// Returns `None` for blank tokens.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return None;
        }
        Some(Self { token: token.trim().to_string().into() })
    }

    pub fn expose(&self) -> &str {
        self.token.expose_secret()
    }

    /// Replaces every occurrence of the token in `text`.
    pub fn redact(&self, text: &str) -> String {
        text.replace(self.expose(), REDACTED)
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext").field("token", &REDACTED).finish()
    }
}
