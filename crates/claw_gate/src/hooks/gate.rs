//! Hook callbacks that run the authorization pipeline for one session.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::collaborators::{
    CommandKnowledge, FileSystem, ModePolicy, ReadOnlyClassifier, RealFileSystem,
};
use crate::error::GateError;
use crate::hooks::{HookCallback, HookContext, HookEvent, HookInput, HookMatcher, HookResponse};
use crate::knowledge::{NETWORK_COMMANDS, SessionKnowledge};
use crate::mode::ModePolicyTable;
use crate::options::GateOptions;
use crate::pipeline::{EvaluationContext, evaluate};
use crate::policy::MergedPolicy;
use crate::prerequisites::PrerequisiteManager;
use crate::shell::ShellReadOnlyClassifier;
use crate::types::{
    CALL_LLM_TOOL, PermissionMode, PipelineResult, PromptKind, PromptSpec, READ_TOOL,
    SPAWN_SESSION_TOOL, ToolCallRequest, ToolInput,
};

/// Per-session gate state shared by the hook callbacks
///
/// The prerequisite manager sits behind an async mutex so concurrent hook
/// invocations for one session are serialized. Each session owns its own
/// `GateSession`.
///
/// # Example
///
/// ```
/// use claw_gate::prelude::*;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let options = GateOptions::builder()
///     .workspace_root("/work/acme")
///     .home_dir("/home/dev")
///     .build()
///     .unwrap();
/// let session = Arc::new(GateSession::new(options, MergedPolicy::empty()));
/// let gate = PreToolUseGate::new(session.clone());
///
/// let context = HookContext::default().with_mode(PermissionMode::Safe);
/// let input = HookInput::tool_use("Write", json!({"file_path": "/work/acme/a.rs", "content": ""}));
/// let response = gate.call(input, None, &context).await.unwrap();
/// assert_eq!(response.permission_decision, Some(PermissionDecision::Deny));
/// # });
/// ```
pub struct GateSession {
    options: GateOptions,
    policy: MergedPolicy,
    default_mode: PermissionMode,
    mode_policy: Box<dyn ModePolicy>,
    classifier: Box<dyn ReadOnlyClassifier>,
    fs: Arc<dyn FileSystem>,
    knowledge: RwLock<SessionKnowledge>,
    prerequisites: Mutex<PrerequisiteManager>,
}

impl GateSession {
    /// Create a session with the built-in collaborators
    pub fn new(options: GateOptions, policy: MergedPolicy) -> Self {
        Self::with_file_system(options, policy, Arc::new(RealFileSystem))
    }

    /// Create a session probing files through `fs`
    pub fn with_file_system(options: GateOptions, policy: MergedPolicy, fs: Arc<dyn FileSystem>) -> Self {
        let prerequisites =
            PrerequisiteManager::new(&options.workspace_root, &options.home_dir, fs.clone());
        Self {
            options,
            policy,
            default_mode: PermissionMode::Ask,
            mode_policy: Box::new(ModePolicyTable::new()),
            classifier: Box::new(ShellReadOnlyClassifier),
            fs,
            knowledge: RwLock::new(SessionKnowledge::new()),
            prerequisites: Mutex::new(prerequisites),
        }
    }

    /// Create a session whose policy is loaded from the workspace
    ///
    /// Reads `permissions.json` at the workspace root and in every active
    /// source directory.
    ///
    /// # Errors
    ///
    /// Returns an error when a permissions file exists but cannot be read,
    /// parsed, or compiled.
    pub fn load(options: GateOptions) -> Result<Self, GateError> {
        let mut sources: Vec<String> = options.active_sources.iter().cloned().collect();
        sources.sort();
        let policy = MergedPolicy::load(&options.workspace_root, &sources)?;
        Ok(Self::new(options, policy))
    }

    /// Mode used when the hook context does not name one
    pub fn with_default_mode(mut self, mode: PermissionMode) -> Self {
        self.default_mode = mode;
        self
    }

    /// Replace the mode table
    pub fn with_mode_policy(mut self, mode_policy: impl ModePolicy + 'static) -> Self {
        self.mode_policy = Box::new(mode_policy);
        self
    }

    /// Replace the shell command classifier
    pub fn with_classifier(mut self, classifier: impl ReadOnlyClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    /// Session options
    pub fn options(&self) -> &GateOptions {
        &self.options
    }

    /// Run the pipeline for one call
    pub async fn evaluate(&self, request: &ToolCallRequest, mode: PermissionMode) -> PipelineResult {
        let knowledge = self.knowledge.read().await;
        let mut prerequisites = self.prerequisites.lock().await;
        let ctx = EvaluationContext {
            mode,
            options: &self.options,
            policy: &self.policy,
            mode_policy: self.mode_policy.as_ref(),
            knowledge: &*knowledge,
            classifier: self.classifier.as_ref(),
            fs: self.fs.as_ref(),
        };
        evaluate(request, &ctx, &mut prerequisites)
    }

    /// Remember a base command the user approved for the session
    pub async fn whitelist_command(&self, command: impl Into<String>) {
        self.knowledge.write().await.whitelist_command(command);
    }

    /// Remember a tool the user approved for the session
    pub async fn whitelist_tool(&self, tool_name: impl Into<String>) {
        self.knowledge.write().await.whitelist_tool(tool_name);
    }

    /// Remember a network domain the user approved for the session
    pub async fn whitelist_domain(&self, domain: impl Into<String>) {
        self.knowledge.write().await.whitelist_domain(domain);
    }

    /// Remember an "always allow" answer to a prompt for `tool_name`
    ///
    /// Network commands whitelist their target hosts; other shell commands
    /// whitelist their base command unless it is dangerous. File, MCP and API
    /// prompts whitelist the tool name.
    pub async fn remember_approval(&self, tool_name: &str, prompt: &PromptSpec) {
        let mut knowledge = self.knowledge.write().await;
        match prompt.kind {
            PromptKind::Bash => {
                let Some(command) = prompt.command.as_deref() else {
                    return;
                };
                let base = knowledge.base_command(command);
                if NETWORK_COMMANDS.contains(&base.as_str()) {
                    for domain in knowledge.extract_domains(command) {
                        knowledge.whitelist_domain(domain);
                    }
                } else if !base.is_empty() && !knowledge.is_dangerous(&base) {
                    knowledge.whitelist_command(base);
                }
            }
            PromptKind::FileWrite | PromptKind::McpMutation | PromptKind::ApiMutation => {
                knowledge.whitelist_tool(tool_name);
            }
        }
    }

    /// Require skill files to be read before any other tool
    pub async fn register_skill_prerequisites<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        self.prerequisites
            .lock()
            .await
            .register_skill_prerequisites(paths);
    }

    /// Record a successful read
    pub async fn track_read(&self, input: &Value) {
        if let Some(input) = input.as_object() {
            self.prerequisites.lock().await.track_read_tool(input);
        }
    }

    /// Forget what has been read, e.g. after the context was compacted
    pub async fn reset_read_state(&self) {
        self.prerequisites.lock().await.reset_read_state();
    }

    /// Whether a file was read since the last reset
    pub async fn has_read(&self, path: impl AsRef<std::path::Path>) -> bool {
        self.prerequisites.lock().await.has_read(path)
    }

    /// Hook registrations for every callback this session provides
    pub fn hook_registrations(self: &Arc<Self>) -> Vec<HookRegistration> {
        vec![
            HookRegistration {
                event: HookEvent::PreToolUse,
                matcher: HookMatcher::all(),
                callback: Arc::new(PreToolUseGate::new(self.clone())),
            },
            HookRegistration {
                event: HookEvent::PostToolUse,
                matcher: HookMatcher::tool(READ_TOOL),
                callback: Arc::new(ReadTracker::new(self.clone())),
            },
            HookRegistration {
                event: HookEvent::PreCompact,
                matcher: HookMatcher::all(),
                callback: Arc::new(CompactionReset::new(self.clone())),
            },
        ]
    }
}

/// One callback bound to an event and tool matcher
#[derive(Clone)]
pub struct HookRegistration {
    /// Event that triggers the callback
    pub event: HookEvent,
    /// Tool filter
    pub matcher: HookMatcher,
    /// The callback
    pub callback: Arc<dyn HookCallback>,
}

impl std::fmt::Debug for HookRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistration")
            .field("event", &self.event)
            .field("matcher", &self.matcher)
            .finish_non_exhaustive()
    }
}

/// Translate a pipeline outcome into a hook response
pub fn to_hook_response(result: PipelineResult) -> HookResponse {
    match result {
        PipelineResult::Allow => HookResponse::allow("Permitted"),
        PipelineResult::Modify { input } => {
            HookResponse::allow("Permitted with normalized input").with_updated_input(input)
        }
        PipelineResult::Block {
            reason,
            source: None,
        } => HookResponse::deny(reason),
        PipelineResult::Block {
            reason,
            source: Some(slug),
        } => HookResponse::deny(reason).with_context(format!("Blocked call targets the {slug} source")),
        PipelineResult::Prompt(prompt) => {
            let response = HookResponse::ask(prompt.description.clone());
            let response = match &prompt.modified_input {
                Some(input) => response.with_updated_input(input.clone()),
                None => response,
            };
            response.with_approval(prompt)
        }
        PipelineResult::SourceActivationNeeded {
            source_slug,
            source_exists: true,
        } => HookResponse::deny(format!(
            "The {source_slug} source is not active in this session. \
             Ask the user to activate it, then retry this call."
        )),
        PipelineResult::SourceActivationNeeded {
            source_slug,
            source_exists: false,
        } => HookResponse::deny(format!(
            "No source named {source_slug} is configured in this workspace. \
             Ask the user to add it before using its tools."
        )),
        PipelineResult::CallLlmIntercept { input } => intercepted(CALL_LLM_TOOL, input),
        PipelineResult::SpawnSessionIntercept { input } => intercepted(SPAWN_SESSION_TOOL, input),
    }
}

/// Stop normal dispatch; the host runs the intercepted tool with `input`
fn intercepted(tool_name: &str, input: ToolInput) -> HookResponse {
    HookResponse::deny(format!("{tool_name} is executed by the session host, not dispatched"))
        .with_intercept(tool_name)
        .with_updated_input(input)
}

fn request_from(input: HookInput) -> Result<ToolCallRequest, GateError> {
    let tool_name = input
        .tool_name
        .ok_or_else(|| GateError::MalformedRequest("hook input has no tool_name".to_string()))?;
    ToolCallRequest::from_value(tool_name, input.tool_input.unwrap_or(Value::Null))
}

/// PreToolUse hook running the authorization pipeline
pub struct PreToolUseGate {
    session: Arc<GateSession>,
}

impl PreToolUseGate {
    /// Create a gate for a session
    pub fn new(session: Arc<GateSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl HookCallback for PreToolUseGate {
    async fn call(
        &self,
        input: HookInput,
        tool_use_id: Option<&str>,
        context: &HookContext,
    ) -> Result<HookResponse, GateError> {
        let request = request_from(input)?;
        let mode = context.permission_mode.unwrap_or(self.session.default_mode);
        trace!(
            "Evaluating {} ({}) in {} mode for session {}",
            request.tool_name,
            tool_use_id.unwrap_or("-"),
            mode.as_str(),
            context.session_id.as_deref().unwrap_or("-")
        );
        let result = self.session.evaluate(&request, mode).await;
        Ok(to_hook_response(result))
    }
}

/// PostToolUse hook recording successful reads
pub struct ReadTracker {
    session: Arc<GateSession>,
}

impl ReadTracker {
    /// Create a tracker for a session
    pub fn new(session: Arc<GateSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl HookCallback for ReadTracker {
    async fn call(
        &self,
        input: HookInput,
        _tool_use_id: Option<&str>,
        _context: &HookContext,
    ) -> Result<HookResponse, GateError> {
        if input.tool_name.as_deref() == Some(READ_TOOL) && input.error.is_none() {
            if let Some(tool_input) = &input.tool_input {
                self.session.track_read(tool_input).await;
            }
        }
        Ok(HookResponse::pass())
    }
}

/// PreCompact hook clearing read state
///
/// Files read before a compaction are no longer in the model's context, so
/// their prerequisites must be read again.
pub struct CompactionReset {
    session: Arc<GateSession>,
}

impl CompactionReset {
    /// Create a reset hook for a session
    pub fn new(session: Arc<GateSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl HookCallback for CompactionReset {
    async fn call(
        &self,
        input: HookInput,
        _tool_use_id: Option<&str>,
        _context: &HookContext,
    ) -> Result<HookResponse, GateError> {
        debug!(
            "Compaction ({}), resetting read state",
            input.trigger.as_deref().unwrap_or("unknown")
        );
        self.session.reset_read_state().await;
        Ok(HookResponse::pass())
    }
}
