//! Shared request, result and mode types.
//!
//! # Example
//!
//! ```
//! use claw_gate::types::{PermissionMode, ProxyTool, ToolCallRequest};
//! use serde_json::json;
//!
//! let request = ToolCallRequest::from_value(
//!     "mcp__github__create_issue",
//!     json!({"title": "Bug"}),
//! ).unwrap();
//!
//! assert_eq!(
//!     ProxyTool::parse(&request.tool_name),
//!     Some(ProxyTool::Mcp { server: "github", tool: "create_issue" })
//! );
//! assert_eq!(PermissionMode::AllowAll.as_str(), "allow-all");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GateError;

/// Tool input: an insertion-ordered JSON object
pub type ToolInput = Map<String, Value>;

/// Shell execution tool
pub const BASH_TOOL: &str = "Bash";
/// File read tool
pub const READ_TOOL: &str = "Read";
/// Whole-file write tool
pub const WRITE_TOOL: &str = "Write";
/// Single string replacement tool
pub const EDIT_TOOL: &str = "Edit";
/// Batched string replacement tool
pub const MULTI_EDIT_TOOL: &str = "MultiEdit";
/// Notebook cell edit tool
pub const NOTEBOOK_EDIT_TOOL: &str = "NotebookEdit";
/// Named skill invocation tool
pub const SKILL_TOOL: &str = "Skill";

/// Secondary LLM helper, diverted to the caller
pub const CALL_LLM_TOOL: &str = "mcp__session__call_llm";
/// Sub-session spawner, diverted to the caller
pub const SPAWN_SESSION_TOOL: &str = "mcp__session__spawn_session";

/// Proxy servers that are always available and never need activation
pub const BUILTIN_PROXY_SERVERS: &[&str] = &["session", "docs"];

/// Bookkeeping fields injected into every tool schema for the UI
pub const META_FIELDS: &[&str] = &["_intent", "_displayName"];

/// Tools that write files
pub const FILE_WRITE_TOOLS: &[&str] = &[WRITE_TOOL, EDIT_TOOL, MULTI_EDIT_TOOL, NOTEBOOK_EDIT_TOOL];

/// Session-wide permission level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionMode {
    /// Read-only exploration; mutations are blocked
    Safe,
    /// Mutations require user approval
    Ask,
    /// Everything the mode table permits runs without prompting
    AllowAll,
}

impl PermissionMode {
    /// Wire name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Safe => "safe",
            PermissionMode::Ask => "ask",
            PermissionMode::AllowAll => "allow-all",
        }
    }
}

/// A proposed tool call, normalized by the runtime adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Tool name (`Bash`, `mcp__{slug}__{tool}`, `api_{slug}`, ...)
    pub tool_name: String,
    /// Tool parameters
    pub input: ToolInput,
}

impl ToolCallRequest {
    /// Create a request from an already-validated input object
    pub fn new(tool_name: impl Into<String>, input: ToolInput) -> Self {
        Self {
            tool_name: tool_name.into(),
            input,
        }
    }

    /// Create a request from an arbitrary JSON value
    ///
    /// Returns [`GateError::MalformedRequest`] when `input` is not an object.
    pub fn from_value(tool_name: impl Into<String>, input: Value) -> Result<Self, GateError> {
        let tool_name = tool_name.into();
        match input {
            Value::Object(map) => Ok(Self::new(tool_name, map)),
            Value::Null => Ok(Self::new(tool_name, Map::new())),
            other => Err(GateError::MalformedRequest(format!(
                "input for {tool_name} must be an object, got {other}"
            ))),
        }
    }

    /// String field of the input, if present
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.input.get(key).and_then(Value::as_str)
    }
}

/// A tool routed to an externally connected source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyTool<'a> {
    /// `mcp__{server}__{tool}`
    Mcp {
        /// Source slug
        server: &'a str,
        /// Tool name within the source
        tool: &'a str,
    },
    /// `api_{source}`
    Api {
        /// Source slug
        source: &'a str,
    },
}

impl<'a> ProxyTool<'a> {
    /// Split a proxied tool name into its parts
    pub fn parse(tool_name: &'a str) -> Option<Self> {
        if let Some(rest) = tool_name.strip_prefix("mcp__") {
            let (server, tool) = rest.split_once("__")?;
            if server.is_empty() || tool.is_empty() {
                return None;
            }
            return Some(ProxyTool::Mcp { server, tool });
        }
        let source = tool_name.strip_prefix("api_")?;
        (!source.is_empty()).then_some(ProxyTool::Api { source })
    }

    /// Slug of the source this tool belongs to
    pub fn source_slug(&self) -> &'a str {
        match self {
            ProxyTool::Mcp { server, .. } => server,
            ProxyTool::Api { source } => source,
        }
    }
}

/// Category of a pending approval prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// Shell command execution
    Bash,
    /// File write or edit
    FileWrite,
    /// Mutating proxied MCP tool
    McpMutation,
    /// Non-GET proxied REST call
    ApiMutation,
}

/// What the user is asked to approve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSpec {
    /// Prompt category
    pub kind: PromptKind,
    /// Human-readable summary of the pending action
    pub description: String,
    /// Full shell command, for `Bash` prompts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Input to run with once approved, when transforms changed it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_input: Option<ToolInput>,
}

impl PromptSpec {
    /// Create a prompt without a command or modified input
    pub fn new(kind: PromptKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            command: None,
            modified_input: None,
        }
    }

    /// Attach the shell command
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Attach the transformed input
    pub fn with_modified_input(mut self, input: ToolInput) -> Self {
        self.modified_input = Some(input);
        self
    }
}

/// Outcome of evaluating one tool call
///
/// Every variant must be handled by the runtime adapter; there is no
/// catch-all outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineResult {
    /// Run the call unchanged
    Allow,
    /// Run the call with a rewritten input
    Modify {
        /// Input to execute with
        input: ToolInput,
    },
    /// Refuse the call; `reason` is returned to the model as tool output
    Block {
        /// Explanation for the model
        reason: String,
        /// Slug of the proxied source involved, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
    /// Ask the user before running
    Prompt(PromptSpec),
    /// The call targets a source that is not switched on
    SourceActivationNeeded {
        /// Slug of the inactive source
        source_slug: String,
        /// Whether the source is configured at all
        source_exists: bool,
    },
    /// Divert to the caller's secondary LLM helper
    CallLlmIntercept {
        /// Untouched tool input
        input: ToolInput,
    },
    /// Divert to the caller's sub-session spawner
    SpawnSessionIntercept {
        /// Untouched tool input
        input: ToolInput,
    },
}

impl PipelineResult {
    /// Create a block without a source tag
    pub fn block(reason: impl Into<String>) -> Self {
        PipelineResult::Block {
            reason: reason.into(),
            source: None,
        }
    }

    /// Whether the call may run without further interaction
    pub fn is_allowed(&self) -> bool {
        matches!(self, PipelineResult::Allow | PipelineResult::Modify { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_permission_mode_serialization() {
        assert_eq!(
            serde_json::to_string(&PermissionMode::AllowAll).unwrap(),
            r#""allow-all""#
        );
        let mode: PermissionMode = serde_json::from_str(r#""safe""#).unwrap();
        assert_eq!(mode, PermissionMode::Safe);
    }

    #[test]
    fn test_request_from_object() {
        let request = ToolCallRequest::from_value("Bash", json!({"command": "ls"})).unwrap();
        assert_eq!(request.str_field("command"), Some("ls"));
    }

    #[test]
    fn test_request_from_null_is_empty() {
        let request = ToolCallRequest::from_value("Read", Value::Null).unwrap();
        assert!(request.input.is_empty());
    }

    #[test]
    fn test_request_rejects_non_object() {
        let err = ToolCallRequest::from_value("Bash", json!(["ls"])).unwrap_err();
        assert!(err.to_string().contains("must be an object"));
    }

    #[test]
    fn test_request_preserves_field_order() {
        let request = ToolCallRequest::from_value(
            "Write",
            json!({"file_path": "/a", "content": "x", "_intent": "y"}),
        )
        .unwrap();
        let keys: Vec<_> = request.input.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["file_path", "content", "_intent"]);
    }

    #[test]
    fn test_proxy_tool_parse() {
        assert_eq!(
            ProxyTool::parse("mcp__linear__list_issues"),
            Some(ProxyTool::Mcp {
                server: "linear",
                tool: "list_issues"
            })
        );
        assert_eq!(
            ProxyTool::parse("api_stripe"),
            Some(ProxyTool::Api { source: "stripe" })
        );
        assert_eq!(ProxyTool::parse("mcp__broken"), None);
        assert_eq!(ProxyTool::parse("api_"), None);
        assert_eq!(ProxyTool::parse("Bash"), None);
    }

    #[test]
    fn test_proxy_tool_keeps_double_underscore_in_tool() {
        let parsed = ProxyTool::parse("mcp__gh__repo__list").unwrap();
        assert_eq!(
            parsed,
            ProxyTool::Mcp {
                server: "gh",
                tool: "repo__list"
            }
        );
        assert_eq!(parsed.source_slug(), "gh");
    }

    #[test]
    fn test_pipeline_result_serialization() {
        let json = serde_json::to_value(PipelineResult::block("no")).unwrap();
        assert_eq!(json["type"], "block");
        assert_eq!(json["reason"], "no");
        assert!(json.get("source").is_none());

        let prompt = PipelineResult::Prompt(
            PromptSpec::new(PromptKind::Bash, "Execute: rm x").with_command("rm x"),
        );
        let json = serde_json::to_value(prompt).unwrap();
        assert_eq!(json["type"], "prompt");
        assert_eq!(json["kind"], "bash");
        assert_eq!(json["command"], "rm x");
    }

    #[test]
    fn test_is_allowed() {
        assert!(PipelineResult::Allow.is_allowed());
        assert!(PipelineResult::Modify { input: Map::new() }.is_allowed());
        assert!(!PipelineResult::block("x").is_allowed());
    }
}
