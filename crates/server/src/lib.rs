//! HTTP surface for the provisioning agent.

pub mod bootstrap;
pub mod chat;
pub mod health;
pub mod sweeper;

use std::sync::Arc;

use axum::Router;

use crate::bootstrap::Application;
use crate::chat::ChatState;
use crate::health::HealthState;

pub fn router(app: &Application) -> Router {
    chat::router(ChatState::new(Arc::clone(&app.agent), app.config.auth.cookie_name.clone()))
        .merge(health::router(HealthState::new(
            Arc::clone(&app.sessions),
            app.agent.catalog().len(),
            app.config.llm.model.clone(),
        )))
}
