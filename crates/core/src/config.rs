use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub provisioning: ProvisioningConfig,
    pub sessions: SessionConfig,
    pub auth: AuthConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub system_prompt: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ProvisioningConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub dispatch_mode: DispatchMode,
    pub credential_forwarding: CredentialForwarding,
    pub cookie_name: String,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub cookie_name: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Both providers speak the OpenAI-compatible chat-completions protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(alias = "openai")]
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    Sequential,
    Concurrent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialForwarding {
    Cookie,
    Bearer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub llm_provider: Option<LlmProvider>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub provisioning_base_url: Option<String>,
    pub dispatch_mode: Option<DispatchMode>,
    pub server_port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: None,
                model: "llama3.1".to_string(),
                timeout_secs: 60,
                temperature: 0.2,
                system_prompt: None,
            },
            provisioning: ProvisioningConfig {
                base_url: "http://127.0.0.1:3000".to_string(),
                timeout_secs: 30,
                dispatch_mode: DispatchMode::Concurrent,
                credential_forwarding: CredentialForwarding::Cookie,
                cookie_name: "session_token".to_string(),
            },
            sessions: SessionConfig { ttl_secs: 1800, sweep_interval_secs: 60 },
            auth: AuthConfig { cookie_name: "session_token".to_string() },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for DispatchMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "concurrent" => Ok(Self::Concurrent),
            other => Err(ConfigError::Validation(format!(
                "unsupported dispatch mode `{other}` (expected sequential|concurrent)"
            ))),
        }
    }
}

impl std::str::FromStr for CredentialForwarding {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cookie" => Ok(Self::Cookie),
            "bearer" => Ok(Self::Bearer),
            other => Err(ConfigError::Validation(format!(
                "unsupported credential forwarding `{other}` (expected cookie|bearer)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LlmConfig {
    /// Base URL the completion client talks to, with provider defaults applied.
    pub fn effective_base_url(&self) -> String {
        let base = match (&self.base_url, self.provider) {
            (Some(url), _) if !url.trim().is_empty() => url.trim().to_string(),
            (_, LlmProvider::OpenAi) => DEFAULT_OPENAI_BASE_URL.to_string(),
            (_, LlmProvider::Ollama) => DEFAULT_OLLAMA_BASE_URL.to_string(),
        };
        base.trim_end_matches('/').to_string()
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("launchpad.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(system_prompt) = llm.system_prompt {
                self.llm.system_prompt = Some(system_prompt);
            }
        }

        if let Some(provisioning) = patch.provisioning {
            if let Some(base_url) = provisioning.base_url {
                self.provisioning.base_url = base_url;
            }
            if let Some(timeout_secs) = provisioning.timeout_secs {
                self.provisioning.timeout_secs = timeout_secs;
            }
            if let Some(dispatch_mode) = provisioning.dispatch_mode {
                self.provisioning.dispatch_mode = dispatch_mode;
            }
            if let Some(credential_forwarding) = provisioning.credential_forwarding {
                self.provisioning.credential_forwarding = credential_forwarding;
            }
            if let Some(cookie_name) = provisioning.cookie_name {
                self.provisioning.cookie_name = cookie_name;
            }
        }

        if let Some(sessions) = patch.sessions {
            if let Some(ttl_secs) = sessions.ttl_secs {
                self.sessions.ttl_secs = ttl_secs;
            }
            if let Some(sweep_interval_secs) = sessions.sweep_interval_secs {
                self.sessions.sweep_interval_secs = sweep_interval_secs;
            }
        }

        if let Some(auth) = patch.auth {
            if let Some(cookie_name) = auth.cookie_name {
                self.auth.cookie_name = cookie_name;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("LAUNCHPAD_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("LAUNCHPAD_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("LAUNCHPAD_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("LAUNCHPAD_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("LAUNCHPAD_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("LAUNCHPAD_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("LAUNCHPAD_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("LAUNCHPAD_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("LAUNCHPAD_LLM_SYSTEM_PROMPT") {
            self.llm.system_prompt = Some(value);
        }

        if let Some(value) = read_env("LAUNCHPAD_PROVISIONING_BASE_URL") {
            self.provisioning.base_url = value;
        }
        if let Some(value) = read_env("LAUNCHPAD_PROVISIONING_TIMEOUT_SECS") {
            self.provisioning.timeout_secs =
                parse_u64("LAUNCHPAD_PROVISIONING_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("LAUNCHPAD_PROVISIONING_DISPATCH_MODE") {
            self.provisioning.dispatch_mode = value.parse()?;
        }
        if let Some(value) = read_env("LAUNCHPAD_PROVISIONING_CREDENTIAL_FORWARDING") {
            self.provisioning.credential_forwarding = value.parse()?;
        }
        if let Some(value) = read_env("LAUNCHPAD_PROVISIONING_COOKIE_NAME") {
            self.provisioning.cookie_name = value;
        }

        if let Some(value) = read_env("LAUNCHPAD_SESSIONS_TTL_SECS") {
            self.sessions.ttl_secs = parse_u64("LAUNCHPAD_SESSIONS_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("LAUNCHPAD_SESSIONS_SWEEP_INTERVAL_SECS") {
            self.sessions.sweep_interval_secs =
                parse_u64("LAUNCHPAD_SESSIONS_SWEEP_INTERVAL_SECS", &value)?;
        }

        if let Some(value) = read_env("LAUNCHPAD_AUTH_COOKIE_NAME") {
            self.auth.cookie_name = value;
        }

        if let Some(value) = read_env("LAUNCHPAD_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("LAUNCHPAD_SERVER_PORT") {
            self.server.port = parse_u16("LAUNCHPAD_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("LAUNCHPAD_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("LAUNCHPAD_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("LAUNCHPAD_LOGGING_LEVEL").or_else(|| read_env("LAUNCHPAD_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LAUNCHPAD_LOGGING_FORMAT").or_else(|| read_env("LAUNCHPAD_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(provider) = overrides.llm_provider {
            self.llm.provider = provider;
        }
        if let Some(api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(api_key));
        }
        if let Some(base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(base_url);
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        if let Some(base_url) = overrides.provisioning_base_url {
            self.provisioning.base_url = base_url;
        }
        if let Some(dispatch_mode) = overrides.dispatch_mode {
            self.provisioning.dispatch_mode = dispatch_mode;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_provisioning(&self.provisioning)?;
        validate_sessions(&self.sessions)?;
        validate_auth(&self.auth)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("launchpad.toml"), PathBuf::from("config/launchpad.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if llm.provider == LlmProvider::OpenAi {
        let missing = llm
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "llm.api_key is required for the openai provider".to_string(),
            ));
        }
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.trim().is_empty() && !is_http_url(base_url) {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_provisioning(provisioning: &ProvisioningConfig) -> Result<(), ConfigError> {
    if !is_http_url(&provisioning.base_url) {
        return Err(ConfigError::Validation(
            "provisioning.base_url must start with http:// or https://".to_string(),
        ));
    }

    if provisioning.timeout_secs == 0 || provisioning.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "provisioning.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if provisioning.credential_forwarding == CredentialForwarding::Cookie
        && !is_cookie_name(&provisioning.cookie_name)
    {
        return Err(ConfigError::Validation(
            "provisioning.cookie_name must be a non-empty token without `=`, `;` or whitespace"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_sessions(sessions: &SessionConfig) -> Result<(), ConfigError> {
    if sessions.ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "sessions.ttl_secs must be greater than zero".to_string(),
        ));
    }

    if sessions.sweep_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "sessions.sweep_interval_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_auth(auth: &AuthConfig) -> Result<(), ConfigError> {
    if !is_cookie_name(&auth.cookie_name) {
        return Err(ConfigError::Validation(
            "auth.cookie_name must be a non-empty token without `=`, `;` or whitespace"
                .to_string(),
        ));
    }
    Ok(())
}

fn is_cookie_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|ch| ch == '=' || ch == ';' || ch.is_whitespace())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    provisioning: Option<ProvisioningPatch>,
    sessions: Option<SessionPatch>,
    auth: Option<AuthPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    temperature: Option<f32>,
    system_prompt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProvisioningPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    dispatch_mode: Option<DispatchMode>,
    credential_forwarding: Option<CredentialForwarding>,
    cookie_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    ttl_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthPatch {
    cookie_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
