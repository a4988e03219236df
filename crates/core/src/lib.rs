//! Domain model, tool catalog, session service, configuration, and error
//! taxonomy shared by the provisioning agent, the HTTP server, and the CLI.

pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod session;

pub use catalog::{standard_catalog, ToolCatalog};
pub use domain::action::ActionKind;
pub use domain::auth::AuthContext;
pub use domain::session::{SessionId, SessionState};
pub use domain::tool::{
    ArgumentError, Arguments, ParameterSchema, ParameterSpec, ParameterType, RawToolCall,
    ToolCall, ToolDefinition, ToolOutcome, ToolResult,
};
pub use errors::{ApplicationError, InterfaceError};
pub use session::{InMemorySessionStore, SessionStore, SessionStoreError};
