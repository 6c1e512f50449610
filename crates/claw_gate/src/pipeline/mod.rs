//! The PreToolUse authorization pipeline.
//!
//! [`evaluate`] takes one tool call and produces exactly one
//! [`PipelineResult`]. Stages run in order and the first stage that does not
//! pass the call through decides the outcome:
//!
//! 1. Permission mode check
//! 2. Source activation
//! 3. Prerequisite reading gate
//! 4. Privileged session tool interception
//! 5. Input transforms (path expansion, config validation, skill
//!    qualification, metadata stripping)
//! 6. Ask-mode approval
//! 7. `Allow`, or `Modify` when a transform changed the input
//!
//! # Example
//!
//! ```
//! use claw_gate::collaborators::RealFileSystem;
//! use claw_gate::knowledge::SessionKnowledge;
//! use claw_gate::mode::ModePolicyTable;
//! use claw_gate::options::GateOptions;
//! use claw_gate::pipeline::{EvaluationContext, evaluate};
//! use claw_gate::policy::MergedPolicy;
//! use claw_gate::prerequisites::PrerequisiteManager;
//! use claw_gate::shell::ShellReadOnlyClassifier;
//! use claw_gate::types::{PermissionMode, PipelineResult, ToolCallRequest};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let workspace = tempfile::tempdir().unwrap();
//! let options = GateOptions::builder()
//!     .workspace_root(workspace.path())
//!     .home_dir("/home/dev")
//!     .build()
//!     .unwrap();
//! let policy = MergedPolicy::empty();
//! let knowledge = SessionKnowledge::new();
//! let mode_policy = ModePolicyTable::new();
//! let ctx = EvaluationContext {
//!     mode: PermissionMode::Safe,
//!     options: &options,
//!     policy: &policy,
//!     mode_policy: &mode_policy,
//!     knowledge: &knowledge,
//!     classifier: &ShellReadOnlyClassifier,
//!     fs: &RealFileSystem,
//! };
//! let mut prerequisites =
//!     PrerequisiteManager::new(workspace.path(), "/home/dev", Arc::new(RealFileSystem));
//!
//! let request = ToolCallRequest::from_value("Bash", json!({"command": "rm -rf build"})).unwrap();
//! let result = evaluate(&request, &ctx, &mut prerequisites);
//! assert!(matches!(result, PipelineResult::Block { .. }));
//!
//! let request = ToolCallRequest::from_value("Bash", json!({"command": "ls"})).unwrap();
//! assert_eq!(evaluate(&request, &ctx, &mut prerequisites), PipelineResult::Allow);
//! ```

pub mod transforms;

use tracing::debug;

use crate::ask::{self, AskContext};
use crate::collaborators::{
    CommandKnowledge, FileSystem, ModePolicy, PolicyContext, ReadOnlyClassifier,
};
use crate::options::GateOptions;
use crate::policy::MergedPolicy;
use crate::prerequisites::{PrerequisiteCheck, PrerequisiteManager};
use crate::types::{
    BASH_TOOL, BUILTIN_PROXY_SERVERS, CALL_LLM_TOOL, PermissionMode, PipelineResult, ProxyTool,
    SKILL_TOOL, SPAWN_SESSION_TOOL, ToolCallRequest,
};

/// Everything [`evaluate`] reads besides the request and prerequisite state
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// Permission mode for this call
    pub mode: PermissionMode,
    /// Session facts
    pub options: &'a GateOptions,
    /// Merged static policy
    pub policy: &'a MergedPolicy,
    /// Mode oracle
    pub mode_policy: &'a dyn ModePolicy,
    /// Session approvals
    pub knowledge: &'a dyn CommandKnowledge,
    /// Shell command classifier
    pub classifier: &'a dyn ReadOnlyClassifier,
    /// Filesystem access
    pub fs: &'a dyn FileSystem,
}

impl<'a> EvaluationContext<'a> {
    fn policy_context(&self) -> PolicyContext<'a> {
        PolicyContext {
            policy: self.policy,
            workspace_root: &self.options.workspace_root,
            home_dir: &self.options.home_dir,
            plans_folder: self.options.plans_folder(),
        }
    }

    fn ask_context(&self) -> AskContext<'a> {
        AskContext {
            knowledge: self.knowledge,
            classifier: self.classifier,
            mode_policy: self.mode_policy,
            endpoints: self.policy,
            policy: self.policy,
            workspace_root: &self.options.workspace_root,
            home_dir: &self.options.home_dir,
            plans_folder: self.options.plans_folder(),
        }
    }
}

/// Authorize one tool call
///
/// Never fails; every outcome is a [`PipelineResult`]. The only state touched
/// is the session's prerequisite manager.
pub fn evaluate(
    request: &ToolCallRequest,
    ctx: &EvaluationContext<'_>,
    prerequisites: &mut PrerequisiteManager,
) -> PipelineResult {
    let tool = request.tool_name.as_str();
    let options = ctx.options;

    let verdict = ctx
        .mode_policy
        .check(tool, &request.input, ctx.mode, &ctx.policy_context());
    if !verdict.allowed {
        debug!("{} blocked in {} mode", tool, ctx.mode.as_str());
        return PipelineResult::block(verdict.reason);
    }

    let proxy = ProxyTool::parse(tool);
    if let Some(ProxyTool::Mcp { server, .. }) = proxy {
        if !BUILTIN_PROXY_SERVERS.contains(&server) && !options.is_source_active(server) {
            debug!("{} needs source {} activated", tool, server);
            return PipelineResult::SourceActivationNeeded {
                source_slug: server.to_string(),
                source_exists: options.source_exists(server),
            };
        }
    }

    let skill_read_via_bash =
        tool == BASH_TOOL && prerequisites.track_bash_skill_read(&request.input);
    if !skill_read_via_bash {
        if let PrerequisiteCheck::Blocked { reason } = prerequisites.check_prerequisites(tool) {
            debug!("{} blocked by prerequisites", tool);
            return PipelineResult::Block {
                reason,
                source: proxy.map(|p| p.source_slug().to_string()),
            };
        }
    }

    if tool == CALL_LLM_TOOL {
        debug!("Intercepting {}", tool);
        return PipelineResult::CallLlmIntercept {
            input: request.input.clone(),
        };
    }
    if tool == SPAWN_SESSION_TOOL {
        debug!("Intercepting {}", tool);
        return PipelineResult::SpawnSessionIntercept {
            input: request.input.clone(),
        };
    }

    let mut input = request.input.clone();
    let mut modified = transforms::expand_path_fields(&mut input, &options.home_dir);
    if let Some(reason) = transforms::validate_config_write(tool, &input, options, ctx.fs) {
        debug!("{} blocked by config validation", tool);
        return PipelineResult::block(reason);
    }
    if tool == SKILL_TOOL {
        modified |= transforms::qualify_skill(&mut input, options, ctx.fs);
    }
    modified |= transforms::strip_meta_fields(&mut input);

    if ctx.mode == PermissionMode::Ask {
        if let Some(prompt) = ask::decide(tool, &request.input, &ctx.ask_context()) {
            debug!("{} needs approval: {}", tool, prompt.description);
            let prompt = if modified {
                prompt.with_modified_input(input)
            } else {
                prompt
            };
            return PipelineResult::Prompt(prompt);
        }
    }

    if modified {
        PipelineResult::Modify { input }
    } else {
        PipelineResult::Allow
    }
}
