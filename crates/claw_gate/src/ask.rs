//! Ask-mode approval decisions.
//!
//! Runs only in [`PermissionMode::Ask`](crate::types::PermissionMode::Ask),
//! after the mode and prerequisite gates have passed. Decides whether the user
//! still has to approve the call and, if so, describes it.
//!
//! # Example
//!
//! ```
//! use claw_gate::ask::{AskContext, decide};
//! use claw_gate::knowledge::SessionKnowledge;
//! use claw_gate::mode::ModePolicyTable;
//! use claw_gate::policy::MergedPolicy;
//! use claw_gate::shell::ShellReadOnlyClassifier;
//! use claw_gate::types::PromptKind;
//! use serde_json::json;
//! use std::path::Path;
//!
//! let policy = MergedPolicy::empty();
//! let knowledge = SessionKnowledge::new();
//! let ctx = AskContext {
//!     knowledge: &knowledge,
//!     classifier: &ShellReadOnlyClassifier,
//!     mode_policy: &ModePolicyTable::new(),
//!     endpoints: &policy,
//!     policy: &policy,
//!     workspace_root: Path::new("/ws"),
//!     home_dir: Path::new("/home/dev"),
//!     plans_folder: None,
//! };
//!
//! let input = json!({"command": "ls -la"});
//! assert!(decide("Bash", input.as_object().unwrap(), &ctx).is_none());
//!
//! let input = json!({"command": "npm publish"});
//! let prompt = decide("Bash", input.as_object().unwrap(), &ctx).unwrap();
//! assert_eq!(prompt.kind, PromptKind::Bash);
//! assert_eq!(prompt.description, "Execute: npm publish");
//! ```

use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::collaborators::{
    CommandKnowledge, EndpointPolicy, ModePolicy, PolicyContext, ReadOnlyClassifier,
};
use crate::knowledge::NETWORK_COMMANDS;
use crate::mode::api_method;
use crate::policy::MergedPolicy;
use crate::shell::parse;
use crate::types::{
    BASH_TOOL, EDIT_TOOL, FILE_WRITE_TOOLS, MULTI_EDIT_TOOL, NOTEBOOK_EDIT_TOOL, PermissionMode,
    PromptKind, PromptSpec, ProxyTool, ToolInput, WRITE_TOOL,
};

/// Collaborators consulted by [`decide`]
#[derive(Clone, Copy)]
pub struct AskContext<'a> {
    /// Session approvals and command facts
    pub knowledge: &'a dyn CommandKnowledge,
    /// Full-command read-only classifier
    pub classifier: &'a dyn ReadOnlyClassifier,
    /// Mode table, asked how safe mode would treat MCP tools
    pub mode_policy: &'a dyn ModePolicy,
    /// Static allow rules for REST mutations
    pub endpoints: &'a dyn EndpointPolicy,
    /// Merged static policy
    pub policy: &'a MergedPolicy,
    /// Root of the current workspace
    pub workspace_root: &'a Path,
    /// Home directory
    pub home_dir: &'a Path,
    /// Plans folder, if any
    pub plans_folder: Option<&'a Path>,
}

impl AskContext<'_> {
    fn policy_context(&self) -> PolicyContext<'_> {
        PolicyContext {
            policy: self.policy,
            workspace_root: self.workspace_root,
            home_dir: self.home_dir,
            plans_folder: self.plans_folder,
        }
    }
}

/// Decide whether a call needs live approval
///
/// `input` is the input as the model sent it, before any transform.
pub fn decide(tool_name: &str, input: &ToolInput, ctx: &AskContext<'_>) -> Option<PromptSpec> {
    if FILE_WRITE_TOOLS.contains(&tool_name) {
        return decide_file_write(tool_name, input, ctx);
    }
    if tool_name == BASH_TOOL {
        return decide_bash(input, ctx);
    }
    match ProxyTool::parse(tool_name)? {
        ProxyTool::Mcp { server, tool } => decide_mcp(tool_name, server, tool, input, ctx),
        ProxyTool::Api { source } => decide_api(tool_name, source, input, ctx),
    }
}

fn str_field<'a>(input: &'a ToolInput, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str)
}

fn decide_file_write(tool_name: &str, input: &ToolInput, ctx: &AskContext<'_>) -> Option<PromptSpec> {
    if ctx.knowledge.is_whitelisted(tool_name) {
        debug!("{} whitelisted for this session", tool_name);
        return None;
    }
    let path = str_field(input, "file_path")
        .or_else(|| str_field(input, "notebook_path"))
        .unwrap_or("(unknown path)");
    let verb = match tool_name {
        WRITE_TOOL => "Write file",
        EDIT_TOOL | MULTI_EDIT_TOOL => "Edit file",
        NOTEBOOK_EDIT_TOOL => "Edit notebook",
        _ => "Modify file",
    };
    Some(PromptSpec::new(PromptKind::FileWrite, format!("{verb}: {path}")))
}

fn decide_bash(input: &ToolInput, ctx: &AskContext<'_>) -> Option<PromptSpec> {
    let command = str_field(input, "command").unwrap_or_default();

    if ctx.classifier.is_read_only(command, ctx.policy) {
        debug!("Read-only command auto-allowed: {}", command);
        return None;
    }

    // Whitelist shortcuts only apply when the command has no structural side
    // effects; `cat x > y` must prompt even if `cat` was approved.
    if let Ok(list) = parse(command) {
        if !list.has_write_effects() {
            let bases: Vec<String> = list
                .program_names()
                .into_iter()
                .map(|p| ctx.knowledge.base_command(p))
                .collect();

            let all_whitelisted = !bases.is_empty()
                && bases
                    .iter()
                    .all(|b| ctx.knowledge.is_whitelisted(b) && !ctx.knowledge.is_dangerous(b));
            if all_whitelisted {
                debug!("Whitelisted command auto-allowed: {}", command);
                return None;
            }

            if let [base] = bases.as_slice() {
                if NETWORK_COMMANDS.contains(&base.as_str()) {
                    let domains = ctx.knowledge.extract_domains(command);
                    if !domains.is_empty()
                        && domains.iter().all(|d| ctx.knowledge.is_domain_whitelisted(d))
                    {
                        debug!("Whitelisted domain auto-allowed: {}", command);
                        return None;
                    }
                }
            }
        }
    }

    Some(PromptSpec::new(PromptKind::Bash, format!("Execute: {command}")).with_command(command))
}

fn decide_mcp(
    tool_name: &str,
    server: &str,
    tool: &str,
    input: &ToolInput,
    ctx: &AskContext<'_>,
) -> Option<PromptSpec> {
    let safe = ctx
        .mode_policy
        .check(tool_name, input, PermissionMode::Safe, &ctx.policy_context());
    if safe.allowed || ctx.knowledge.is_whitelisted(tool_name) {
        return None;
    }
    Some(PromptSpec::new(PromptKind::McpMutation, format!("{server}/{tool}")))
}

fn decide_api(
    tool_name: &str,
    source: &str,
    input: &ToolInput,
    ctx: &AskContext<'_>,
) -> Option<PromptSpec> {
    let method = api_method(input);
    if method == "GET" {
        return None;
    }
    let path = str_field(input, "path").unwrap_or("/");
    if ctx.endpoints.is_endpoint_allowed(&method, path, source)
        || ctx.knowledge.is_whitelisted(tool_name)
    {
        return None;
    }
    Some(PromptSpec::new(PromptKind::ApiMutation, format!("{method} {path}")))
}
