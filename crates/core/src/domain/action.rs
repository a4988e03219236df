use serde::{Deserialize, Serialize};

/// The provisionable resource kinds. Every kind has exactly one catalog
/// entry and exactly one provisioning handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    DeployApp,
    CreateDatabase,
    CreateWebBuilder,
    CreateChatbot,
    CreateVirtualSpace,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        Self::DeployApp,
        Self::CreateDatabase,
        Self::CreateWebBuilder,
        Self::CreateChatbot,
        Self::CreateVirtualSpace,
    ];

    pub fn tool_name(self) -> &'static str {
        match self {
            Self::DeployApp => "deploy-app",
            Self::CreateDatabase => "create-database",
            Self::CreateWebBuilder => "create-web-builder",
            Self::CreateChatbot => "create-chatbot",
            Self::CreateVirtualSpace => "create-virtual-space",
        }
    }

    /// Exact, case-sensitive match against the tool name the model emitted.
    pub fn from_tool_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tool_name() == name)
    }

    /// Human noun used in user-facing messages.
    pub fn noun(self) -> &'static str {
        match self {
            Self::DeployApp => "app",
            Self::CreateDatabase => "database",
            Self::CreateWebBuilder => "website",
            Self::CreateChatbot => "chatbot",
            Self::CreateVirtualSpace => "virtual space",
        }
    }

    /// Catalog parameter that names the resource being created.
    pub fn name_parameter(self) -> &'static str {
        match self {
            Self::DeployApp => "appname",
            Self::CreateDatabase => "dbname",
            Self::CreateWebBuilder => "sitename",
            Self::CreateChatbot => "botname",
            Self::CreateVirtualSpace => "spacename",
        }
    }

    /// Path of the resource-creation endpoint, relative to the provisioning base URL.
    pub fn endpoint_path(self) -> &'static str {
        match self {
            Self::DeployApp => "/api/apps",
            Self::CreateDatabase => "/api/databases",
            Self::CreateWebBuilder => "/api/webbuilder",
            Self::CreateChatbot => "/api/chatbots",
            Self::CreateVirtualSpace => "/api/virtualspaces",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tool_name())
    }
}

#[cfg(test)]
mod tests {
    use super::ActionKind;

    #[test]
    fn tool_names_resolve_back_to_their_kind() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::from_tool_name(kind.tool_name()), Some(kind));
        }
    }

    #[test]
    fn tool_name_match_is_exact() {
        assert_eq!(ActionKind::from_tool_name("Create-Database"), None);
        assert_eq!(ActionKind::from_tool_name("create_database"), None);
        assert_eq!(ActionKind::from_tool_name(" create-database"), None);
        assert_eq!(ActionKind::from_tool_name("drop-database"), None);
    }

    #[test]
    fn serde_uses_tool_names() {
        let encoded = serde_json::to_string(&ActionKind::CreateVirtualSpace).expect("encode");
        assert_eq!(encoded, "\"create-virtual-space\"");
    }
}
