use std::sync::Arc;
use std::time::Duration;

use launchpad_agent::{
    CompletionClient, CompletionError, DispatchTable, DispatchTableError, HandlerError,
    HttpProvisioningHandler, OpenAiCompletionClient, ProvisioningAgent,
};
use launchpad_core::config::{AppConfig, ConfigError, LoadOptions};
use launchpad_core::{InMemorySessionStore, SessionStore};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub agent: Arc<ProvisioningAgent>,
    pub sessions: Arc<dyn SessionStore>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("completion client setup failed: {0}")]
    Completion(#[from] CompletionError),
    #[error("provisioning handler setup failed: {0}")]
    Handlers(#[from] HandlerError),
    #[error("dispatch table is incomplete: {0}")]
    DispatchTable(#[from] DispatchTableError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let completion: Arc<dyn CompletionClient> =
        Arc::new(OpenAiCompletionClient::from_config(&config.llm)?);
    info!(
        event_name = "system.bootstrap.completion_client_ready",
        correlation_id = "bootstrap",
        model = %completion.model(),
        base_url = %config.llm.effective_base_url(),
        "completion client configured"
    );

    let table = DispatchTable::complete(HttpProvisioningHandler::standard_set(&config.provisioning)?)?;
    info!(
        event_name = "system.bootstrap.handlers_registered",
        correlation_id = "bootstrap",
        handlers = table.len(),
        provisioning_url = %config.provisioning.base_url,
        "provisioning handlers registered"
    );

    let sessions: Arc<dyn SessionStore> =
        Arc::new(InMemorySessionStore::new(Duration::from_secs(config.sessions.ttl_secs)));
    let agent = ProvisioningAgent::from_config(&config, completion, Arc::clone(&sessions), table)?;

    Ok(Application { config, agent: Arc::new(agent), sessions })
}
