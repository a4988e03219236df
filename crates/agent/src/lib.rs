//! Provisioning agent runtime.
//!
//! A turn runs a fixed pipeline:
//! 1. **Completion** (`llm`) - one function-calling request with the full tool catalog
//! 2. **Interpretation** (`interpreter`) - parse each call's JSON arguments
//! 3. **Dispatch** (`dispatcher`) - validate and run calls against the typed handler table
//! 4. **Composition** (`composer`) - ordered tool results plus the assistant's text
//!
//! Per-call failures are reported inside the response; only a failed completion
//! call aborts the turn.

pub mod composer;
pub mod conversation;
pub mod dispatcher;
pub mod handlers;
pub mod interpreter;
pub mod llm;
pub mod runtime;
pub mod tools;

pub use composer::{ChatResponse, TurnFailure};
pub use conversation::{ChatMessage, Role};
pub use dispatcher::ActionDispatcher;
pub use handlers::HttpProvisioningHandler;
pub use llm::{Completion, CompletionClient, CompletionError, CompletionRequest, OpenAiCompletionClient};
pub use runtime::{ProvisioningAgent, TurnRequest};
pub use tools::{DispatchTable, DispatchTableError, HandlerError, Provisioned, ProvisioningHandler};
