//! Hook input and context types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::PermissionMode;

/// Input data passed to a hook callback
///
/// # Examples
///
/// ```
/// use claw_gate::prelude::*;
/// use serde_json::json;
///
/// let input = HookInput {
///     tool_name: Some("Bash".to_string()),
///     tool_input: Some(json!({"command": "ls"})),
///     ..Default::default()
/// };
///
/// assert_eq!(input.tool_name.as_deref(), Some("Bash"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookInput {
    /// Name of the tool being invoked (for tool-related events)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// Input parameters for the tool (for tool-related events)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<Value>,

    /// Output from the tool (for post-tool events)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_output: Option<Value>,

    /// Error message (for failure events)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// What started a compaction, `manual` or `auto` (for PreCompact events)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
}

impl HookInput {
    /// Create a new HookInput for a tool use event
    pub fn tool_use(tool_name: impl Into<String>, tool_input: Value) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            tool_input: Some(tool_input),
            ..Default::default()
        }
    }

    /// Create a new HookInput for a tool success event
    pub fn tool_success(tool_name: impl Into<String>, tool_input: Value, output: Value) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            tool_input: Some(tool_input),
            tool_output: Some(output),
            ..Default::default()
        }
    }

    /// Create a new HookInput for a tool failure event
    pub fn tool_failure(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Create a new HookInput for a compaction event
    pub fn compaction(trigger: impl Into<String>) -> Self {
        Self {
            trigger: Some(trigger.into()),
            ..Default::default()
        }
    }
}

/// Context provided to hook callbacks
///
/// # Examples
///
/// ```
/// use claw_gate::prelude::*;
///
/// let context = HookContext::with_session("session-123").with_mode(PermissionMode::Ask);
///
/// assert_eq!(context.session_id.as_deref(), Some("session-123"));
/// assert_eq!(context.permission_mode, Some(PermissionMode::Ask));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookContext {
    /// Current session ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Permission mode in effect for this call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<PermissionMode>,
}

impl HookContext {
    /// Create a new HookContext with a session ID
    pub fn with_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Default::default()
        }
    }

    /// Set the permission mode
    pub fn with_mode(mut self, mode: PermissionMode) -> Self {
        self.permission_mode = Some(mode);
        self
    }
}
