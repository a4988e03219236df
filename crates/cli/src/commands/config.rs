use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use launchpad_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::CommandResult;

struct Entry {
    key: &'static str,
    env_key: &'static str,
    value: String,
}

impl Entry {
    fn new(key: &'static str, env_key: &'static str, value: impl Into<String>) -> Self {
        Self { key, env_key, value: value.into() }
    }
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            )
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for entry in entries(&config) {
        let source = field_source(
            entry.key,
            &[entry.env_key, legacy_env_key(entry.env_key)],
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(entry.key, &entry.value, source));
    }

    CommandResult::text(0, lines.join("\n"))
}

fn entries(config: &AppConfig) -> Vec<Entry> {
    let llm = &config.llm;
    let provisioning = &config.provisioning;

    vec![
        Entry::new("llm.provider", "LAUNCHPAD_LLM_PROVIDER", format!("{:?}", llm.provider)),
        Entry::new("llm.model", "LAUNCHPAD_LLM_MODEL", llm.model.clone()),
        Entry::new(
            "llm.base_url",
            "LAUNCHPAD_LLM_BASE_URL",
            match llm.base_url.as_deref() {
                Some(url) if !url.trim().is_empty() => url.to_string(),
                _ => format!("<unset> (using {})", llm.effective_base_url()),
            },
        ),
        Entry::new(
            "llm.api_key",
            "LAUNCHPAD_LLM_API_KEY",
            redact_secret(llm.api_key.as_ref().map(|key| key.expose_secret())),
        ),
        Entry::new("llm.timeout_secs", "LAUNCHPAD_LLM_TIMEOUT_SECS", llm.timeout_secs.to_string()),
        Entry::new("llm.temperature", "LAUNCHPAD_LLM_TEMPERATURE", llm.temperature.to_string()),
        Entry::new(
            "llm.system_prompt",
            "LAUNCHPAD_LLM_SYSTEM_PROMPT",
            match &llm.system_prompt {
                Some(prompt) => format!("<custom, {} chars>", prompt.chars().count()),
                None => "<built-in>".to_string(),
            },
        ),
        Entry::new(
            "provisioning.base_url",
            "LAUNCHPAD_PROVISIONING_BASE_URL",
            provisioning.base_url.clone(),
        ),
        Entry::new(
            "provisioning.timeout_secs",
            "LAUNCHPAD_PROVISIONING_TIMEOUT_SECS",
            provisioning.timeout_secs.to_string(),
        ),
        Entry::new(
            "provisioning.dispatch_mode",
            "LAUNCHPAD_PROVISIONING_DISPATCH_MODE",
            format!("{:?}", provisioning.dispatch_mode),
        ),
        Entry::new(
            "provisioning.credential_forwarding",
            "LAUNCHPAD_PROVISIONING_CREDENTIAL_FORWARDING",
            format!("{:?}", provisioning.credential_forwarding),
        ),
        Entry::new(
            "provisioning.cookie_name",
            "LAUNCHPAD_PROVISIONING_COOKIE_NAME",
            provisioning.cookie_name.clone(),
        ),
        Entry::new(
            "sessions.ttl_secs",
            "LAUNCHPAD_SESSIONS_TTL_SECS",
            config.sessions.ttl_secs.to_string(),
        ),
        Entry::new(
            "sessions.sweep_interval_secs",
            "LAUNCHPAD_SESSIONS_SWEEP_INTERVAL_SECS",
            config.sessions.sweep_interval_secs.to_string(),
        ),
        Entry::new("auth.cookie_name", "LAUNCHPAD_AUTH_COOKIE_NAME", config.auth.cookie_name.clone()),
        Entry::new(
            "server.bind_address",
            "LAUNCHPAD_SERVER_BIND_ADDRESS",
            config.server.bind_address.clone(),
        ),
        Entry::new("server.port", "LAUNCHPAD_SERVER_PORT", config.server.port.to_string()),
        Entry::new(
            "server.graceful_shutdown_secs",
            "LAUNCHPAD_SERVER_GRACEFUL_SHUTDOWN_SECS",
            config.server.graceful_shutdown_secs.to_string(),
        ),
        Entry::new("logging.level", "LAUNCHPAD_LOGGING_LEVEL", config.logging.level.clone()),
        Entry::new(
            "logging.format",
            "LAUNCHPAD_LOGGING_FORMAT",
            format!("{:?}", config.logging.format),
        ),
    ]
}

/// `LAUNCHPAD_LOG_*` is accepted alongside `LAUNCHPAD_LOGGING_*`.
fn legacy_env_key(env_key: &str) -> &'static str {
    match env_key {
        "LAUNCHPAD_LOGGING_LEVEL" => "LAUNCHPAD_LOG_LEVEL",
        "LAUNCHPAD_LOGGING_FORMAT" => "LAUNCHPAD_LOG_FORMAT",
        _ => "",
    }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("launchpad.toml"), PathBuf::from("config/launchpad.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) =
        env_keys.iter().find(|key| !key.is_empty() && env::var_os(key).is_some())
    {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&str>) -> String {
    match secret.map(str::trim) {
        None => "<unset>".to_string(),
        Some("") => "<empty>".to_string(),
        Some(value) => match value.split_once('-') {
            Some((prefix, _)) if prefix.len() <= 4 => format!("{prefix}-***"),
            _ => "<redacted>".to_string(),
        },
    }
}
