use launchpad_core::{standard_catalog, ToolDefinition};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ToolsListing<'a> {
    count: usize,
    tools: Vec<&'a ToolDefinition>,
}

pub fn run() -> CommandResult {
    let catalog = standard_catalog();
    let listing = ToolsListing { count: catalog.len(), tools: catalog.list() };

    match serde_json::to_string_pretty(&listing) {
        Ok(output) => CommandResult::text(0, output),
        Err(error) => CommandResult::failure(
            "tools",
            "serialization",
            format!("failed to render tool catalog: {error}"),
            1,
        ),
    }
}
