//! Static prerequisite rules.

use std::path::{Path, PathBuf};

use crate::types::ProxyTool;

/// A documentation file that must be read before a family of tools is used
#[derive(Debug, Clone, Copy)]
pub struct PrerequisiteRule {
    /// Short identifier for logging
    pub name: &'static str,
    /// Whether the rule applies to a tool name
    pub matches: fn(&str) -> bool,
    /// Absolute path of the required file for a tool and workspace root
    pub resolve: fn(&str, &Path) -> Option<PathBuf>,
    /// Block message for a tool and its unread file
    pub message: fn(&str, &Path) -> String,
}

/// `{workspace}/sources/{slug}/guide.md`
pub fn guide_path(workspace_root: &Path, slug: &str) -> PathBuf {
    workspace_root.join("sources").join(slug).join("guide.md")
}

fn is_mcp_tool(tool_name: &str) -> bool {
    matches!(ProxyTool::parse(tool_name), Some(ProxyTool::Mcp { .. }))
}

fn is_api_tool(tool_name: &str) -> bool {
    matches!(ProxyTool::parse(tool_name), Some(ProxyTool::Api { .. }))
}

fn resolve_guide(tool_name: &str, workspace_root: &Path) -> Option<PathBuf> {
    ProxyTool::parse(tool_name).map(|tool| guide_path(workspace_root, tool.source_slug()))
}

fn guide_message(tool_name: &str, path: &Path) -> String {
    format!(
        "Before using {tool_name}, read the source guide at {}. \
         Use the Read tool on that file first, then retry this call.",
        path.display()
    )
}

/// The rules every session starts with
pub fn builtin_rules() -> Vec<PrerequisiteRule> {
    vec![
        PrerequisiteRule {
            name: "mcp-source-guide",
            matches: is_mcp_tool,
            resolve: resolve_guide,
            message: guide_message,
        },
        PrerequisiteRule {
            name: "api-source-guide",
            matches: is_api_tool,
            resolve: resolve_guide,
            message: guide_message,
        },
    ]
}
