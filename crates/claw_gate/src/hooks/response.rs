//! Hook response types for permission decisions and context injection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{PromptSpec, ToolInput};

/// Permission decision for tool use or other controlled actions
///
/// # Examples
///
/// ```
/// use claw_gate::prelude::*;
///
/// let decision = PermissionDecision::Allow;
/// assert_eq!(serde_json::to_string(&decision).unwrap(), r#""allow""#);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    /// Allow the action to proceed
    Allow,
    /// Deny the action
    Deny,
    /// Ask the user for permission
    Ask,
}

/// Response from a hook callback
///
/// # Examples
///
/// ```
/// use claw_gate::prelude::*;
///
/// // Allow with reason
/// let response = HookResponse::allow("Read-only command");
///
/// // Deny with reason
/// let response = HookResponse::deny("Write is not allowed in safe mode");
///
/// // Ask user
/// let response = HookResponse::ask("Execute: npm publish");
///
/// // Nothing to say
/// let response = HookResponse::pass();
/// assert!(response.permission_decision.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HookResponse {
    /// Permission decision (Allow/Deny/Ask)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_decision: Option<PermissionDecision>,

    /// Reason for the permission decision (shown to user)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_decision_reason: Option<String>,

    /// Additional context to inject into Claude's prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,

    /// Whether to continue processing subsequent hooks
    #[serde(rename = "continue")]
    pub should_continue: bool,

    /// Modified tool input (if tool input should be transformed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<Value>,

    /// The approval being asked for, kept so an "always allow" answer can be
    /// remembered with [`GateSession::remember_approval`](crate::hooks::GateSession::remember_approval)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<PromptSpec>,

    /// Session tool the host runs itself instead of dispatching the call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intercept: Option<String>,
}

impl Default for HookResponse {
    fn default() -> Self {
        Self {
            permission_decision: None,
            permission_decision_reason: None,
            additional_context: None,
            should_continue: true,
            updated_input: None,
            approval: None,
            intercept: None,
        }
    }
}

impl HookResponse {
    /// Response with no decision
    pub fn pass() -> Self {
        Self::default()
    }

    /// Create a response that allows the action
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            permission_decision: Some(PermissionDecision::Allow),
            permission_decision_reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Create a response that denies the action
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            permission_decision: Some(PermissionDecision::Deny),
            permission_decision_reason: Some(reason.into()),
            should_continue: false,
            ..Default::default()
        }
    }

    /// Create a response that asks the user
    pub fn ask(prompt: impl Into<String>) -> Self {
        Self {
            permission_decision: Some(PermissionDecision::Ask),
            permission_decision_reason: Some(prompt.into()),
            ..Default::default()
        }
    }

    /// Add additional context for Claude
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.additional_context = Some(context.into());
        self
    }

    /// Set updated tool input
    pub fn with_updated_input(mut self, input: ToolInput) -> Self {
        self.updated_input = Some(Value::Object(input));
        self
    }

    /// Attach the approval details of an ask response
    pub fn with_approval(mut self, prompt: PromptSpec) -> Self {
        self.approval = Some(prompt);
        self
    }

    /// Name the session tool the host must run in place of this call
    pub fn with_intercept(mut self, tool_name: impl Into<String>) -> Self {
        self.intercept = Some(tool_name.into());
        self
    }
}
