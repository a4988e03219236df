//! Static registry of provisionable actions exposed to the model every turn.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::domain::action::ActionKind;
use crate::domain::tool::{ParameterSchema, ParameterSpec, ParameterType, ToolDefinition};

#[derive(Debug, Clone, Copy)]
struct ParameterTemplate {
    name: &'static str,
    description: &'static str,
    allowed_values: Option<&'static [&'static str]>,
}

#[derive(Debug, Clone, Copy)]
struct ToolTemplate {
    kind: ActionKind,
    description: &'static str,
    parameters: &'static [ParameterTemplate],
}

const TOOL_TEMPLATES: &[ToolTemplate] = &[
    ToolTemplate {
        kind: ActionKind::DeployApp,
        description: "Deploy a new application for the user.",
        parameters: &[
            ParameterTemplate {
                name: "appname",
                description: "Name of the application to deploy.",
                allowed_values: None,
            },
            ParameterTemplate {
                name: "apptype",
                description: "Runtime of the application, for example nodejs, python, php or static.",
                allowed_values: None,
            },
        ],
    },
    ToolTemplate {
        kind: ActionKind::CreateDatabase,
        description: "Create a new database with its own user credentials.",
        parameters: &[
            ParameterTemplate {
                name: "dbname",
                description: "Name of the database.",
                allowed_values: None,
            },
            ParameterTemplate {
                name: "dbuser",
                description: "Username that will own the database.",
                allowed_values: None,
            },
            ParameterTemplate {
                name: "dbpass",
                description: "Password for the database user.",
                allowed_values: None,
            },
            ParameterTemplate {
                name: "dbtype",
                description: "Database engine.",
                allowed_values: Some(&["mysql", "postgresql", "mongodb"]),
            },
        ],
    },
    ToolTemplate {
        kind: ActionKind::CreateWebBuilder,
        description: "Create a new site in the web builder.",
        parameters: &[
            ParameterTemplate {
                name: "sitename",
                description: "Name of the website.",
                allowed_values: None,
            },
            ParameterTemplate {
                name: "sitetype",
                description: "Kind of site, for example business, portfolio, blog or store.",
                allowed_values: None,
            },
        ],
    },
    ToolTemplate {
        kind: ActionKind::CreateChatbot,
        description: "Create a new chatbot.",
        parameters: &[
            ParameterTemplate {
                name: "botname",
                description: "Name of the chatbot.",
                allowed_values: None,
            },
            ParameterTemplate {
                name: "bottype",
                description: "Purpose of the chatbot, for example support, sales or faq.",
                allowed_values: None,
            },
        ],
    },
    ToolTemplate {
        kind: ActionKind::CreateVirtualSpace,
        description: "Create a new virtual workspace.",
        parameters: &[
            ParameterTemplate {
                name: "spacename",
                description: "Name of the virtual space.",
                allowed_values: None,
            },
            ParameterTemplate {
                name: "spacetype",
                description: "Kind of space, for example office, classroom or studio.",
                allowed_values: None,
            },
        ],
    },
];

impl ToolTemplate {
    fn definition(&self) -> ToolDefinition {
        let properties = self
            .parameters
            .iter()
            .map(|parameter| {
                (
                    parameter.name.to_string(),
                    ParameterSpec {
                        kind: ParameterType::String,
                        description: parameter.description.to_string(),
                        allowed_values: parameter
                            .allowed_values
                            .map(|values| values.iter().map(|value| (*value).to_string()).collect()),
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();

        ToolDefinition {
            name: self.kind.tool_name().to_string(),
            description: self.description.to_string(),
            parameter_schema: ParameterSchema {
                required: self.parameters.iter().map(|p| p.name.to_string()).collect(),
                properties,
            },
        }
    }
}

static STANDARD_CATALOG: OnceLock<ToolCatalog> = OnceLock::new();

/// Process-wide instance of [`ToolCatalog::standard`].
pub fn standard_catalog() -> &'static ToolCatalog {
    STANDARD_CATALOG.get_or_init(ToolCatalog::standard)
}

/// Immutable, built once at startup.
#[derive(Clone, Debug)]
pub struct ToolCatalog {
    entries: Vec<(ActionKind, ToolDefinition)>,
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl ToolCatalog {
    pub fn standard() -> Self {
        Self {
            entries: TOOL_TEMPLATES
                .iter()
                .map(|template| (template.kind, template.definition()))
                .collect(),
        }
    }

    pub fn list(&self) -> Vec<&ToolDefinition> {
        self.entries.iter().map(|(_, definition)| definition).collect()
    }

    pub fn definition(&self, kind: ActionKind) -> Option<&ToolDefinition> {
        self.entries.iter().find(|(entry, _)| *entry == kind).map(|(_, definition)| definition)
    }

    pub fn kinds(&self) -> Vec<ActionKind> {
        self.entries.iter().map(|(kind, _)| *kind).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
