//! Default permission-mode table.
//!
//! `ask` and `allow-all` permit every call here (prompting is decided later by
//! [`crate::ask`]). `safe` is read-only exploration: anything that can change
//! the machine or a connected source is refused with a reason the model can
//! act on.

use std::path::Path;

use crate::collaborators::{
    EndpointPolicy, ModePolicy, ModeVerdict, PolicyContext, ReadOnlyClassifier, expand_tilde,
};
use crate::shell::ShellReadOnlyClassifier;
use crate::types::{
    BASH_TOOL, BUILTIN_PROXY_SERVERS, FILE_WRITE_TOOLS, PermissionMode, ProxyTool, ToolInput,
};

/// MCP tool name prefixes treated as read-only in safe mode
pub const READ_ONLY_MCP_PREFIXES: &[&str] = &[
    "describe", "fetch", "find", "get", "list", "lookup", "query", "read", "retrieve", "search",
    "show", "view",
];

/// Built-in [`ModePolicy`]
pub struct ModePolicyTable<C = ShellReadOnlyClassifier> {
    classifier: C,
}

impl ModePolicyTable {
    /// Create a table using the shell AST classifier
    pub fn new() -> Self {
        Self {
            classifier: ShellReadOnlyClassifier,
        }
    }
}

impl Default for ModePolicyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ReadOnlyClassifier> ModePolicyTable<C> {
    /// Create a table using a custom command classifier
    pub fn with_classifier(classifier: C) -> Self {
        Self { classifier }
    }

    fn check_safe(&self, tool_name: &str, input: &ToolInput, ctx: &PolicyContext<'_>) -> ModeVerdict {
        if FILE_WRITE_TOOLS.contains(&tool_name) {
            if is_plans_write(input, ctx) {
                return ModeVerdict::allow();
            }
            return blocked(tool_name, "modifies files");
        }

        if tool_name == BASH_TOOL {
            let command = input.get("command").and_then(|v| v.as_str()).unwrap_or_default();
            if self.classifier.is_read_only(command, ctx.policy) {
                return ModeVerdict::allow();
            }
            return ModeVerdict::deny(format!(
                "Bash command `{command}` is not allowed in safe mode because it may modify the system. \
                 Only read-only commands can run in safe mode; ask the user to switch to ask or allow-all mode."
            ));
        }

        match ProxyTool::parse(tool_name) {
            Some(ProxyTool::Mcp { server, tool }) => {
                if BUILTIN_PROXY_SERVERS.contains(&server)
                    || is_read_only_mcp_tool(tool)
                    || ctx.policy.is_mcp_pattern_allowed(server, tool)
                {
                    ModeVerdict::allow()
                } else {
                    blocked(tool_name, "may modify data in a connected source")
                }
            }
            Some(ProxyTool::Api { source }) => {
                let method = api_method(input);
                let path = input.get("path").and_then(|v| v.as_str()).unwrap_or("/");
                if method == "GET" || ctx.policy.is_endpoint_allowed(&method, path, source) {
                    ModeVerdict::allow()
                } else {
                    ModeVerdict::deny(format!(
                        "{method} {path} on {source} is not allowed in safe mode. \
                         Only GET requests can run in safe mode; ask the user to switch to ask or allow-all mode."
                    ))
                }
            }
            None => ModeVerdict::allow(),
        }
    }
}

impl<C: ReadOnlyClassifier> ModePolicy for ModePolicyTable<C> {
    fn check(
        &self,
        tool_name: &str,
        input: &ToolInput,
        mode: PermissionMode,
        ctx: &PolicyContext<'_>,
    ) -> ModeVerdict {
        match mode {
            PermissionMode::Ask | PermissionMode::AllowAll => ModeVerdict::allow(),
            PermissionMode::Safe => self.check_safe(tool_name, input, ctx),
        }
    }
}

fn blocked(tool_name: &str, why: &str) -> ModeVerdict {
    ModeVerdict::deny(format!(
        "{tool_name} is not allowed in safe mode because it {why}. \
         Ask the user to switch to ask or allow-all mode to make changes."
    ))
}

/// HTTP method of a proxied REST call, upper-cased, `GET` when absent
pub fn api_method(input: &ToolInput) -> String {
    input
        .get("method")
        .and_then(|v| v.as_str())
        .map(str::to_ascii_uppercase)
        .unwrap_or_else(|| "GET".to_string())
}

fn is_read_only_mcp_tool(tool: &str) -> bool {
    let lower = tool.to_ascii_lowercase();
    READ_ONLY_MCP_PREFIXES.iter().any(|prefix| {
        lower
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['_', '-']))
    })
}

fn is_plans_write(input: &ToolInput, ctx: &PolicyContext<'_>) -> bool {
    let Some(plans) = ctx.plans_folder else {
        return false;
    };
    let Some(target) = input
        .get("file_path")
        .or_else(|| input.get("notebook_path"))
        .and_then(|v| v.as_str())
    else {
        return false;
    };
    let target = expand_tilde(target, ctx.home_dir).unwrap_or_else(|| Path::new(target).to_path_buf());
    // Lexical check only; `..` components would escape the folder.
    target.starts_with(plans) && !target.components().any(|c| c.as_os_str() == "..")
}
