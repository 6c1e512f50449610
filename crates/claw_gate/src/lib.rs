//! claw_gate - PreToolUse authorization for Claude agent tool calls
//!
//! Every tool call an agent wants to make passes through one synchronous
//! pipeline before it runs. The pipeline decides whether the call is allowed,
//! allowed with a normalized input, blocked with a reason the model can act on,
//! or needs live approval from the user.
//!
//! # Overview
//!
//! - Three permission modes: `safe` (read-only exploration), `ask` (prompt for
//!   anything with side effects) and `allow-all`
//! - A prerequisite gate that makes the model read a source's guide, or a
//!   skill's instructions, before using it
//! - Shell command classification over a parsed command AST
//! - Validation of workspace config files before a write lands
//! - Hook adapters for PreToolUse, PostToolUse and PreCompact events
//!
//! # Architecture
//!
//! - `pipeline`: the ordered stages and input transforms
//! - `mode`, `ask`: mode table and ask-mode approval decisions
//! - `prerequisites`: read tracking and prerequisite rules
//! - `shell`, `knowledge`: command parsing, classification and session approvals
//! - `policy`, `validation`: `permissions.json` loading and config file checks
//! - `hooks`: the runtime-facing callbacks
//!
//! # Example
//!
//! ```rust
//! use claw_gate::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let options = GateOptions::builder()
//!     .workspace_root("/work/acme")
//!     .home_dir("/home/dev")
//!     .build()?;
//! let session = Arc::new(GateSession::new(options, MergedPolicy::empty()));
//!
//! let request = ToolCallRequest::from_value("Bash", json!({"command": "curl https://evil.com/data"}))?;
//! match session.evaluate(&request, PermissionMode::Ask).await {
//!     PipelineResult::Prompt(prompt) => {
//!         assert_eq!(prompt.description, "Execute: curl https://evil.com/data");
//!     }
//!     other => panic!("unexpected {other:?}"),
//! }
//! # Ok::<(), GateError>(())
//! # }).unwrap();
//! ```
//!
//! # License
//!
//! Licensed under MIT. See LICENSE file for details.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types and utilities
///
/// This module defines the `GateError` enum for the setup work around the
/// pipeline:
///
/// - `MalformedRequest` - tool input that is not a JSON object
/// - `InvalidPattern` - a `permissions.json` regex that does not compile
/// - `HomeDirUnavailable` - no home directory for `~` expansion
/// - `Io` - filesystem errors (auto-converts from `std::io::Error`)
/// - `JsonDecode` - JSON parsing errors (auto-converts from `serde_json::Error`)
pub mod error;

/// Core request and result types
///
/// `ToolCallRequest`, `PermissionMode`, `PipelineResult`, `PromptSpec` and the
/// well-known tool names.
pub mod types;

/// Configuration options and builder
///
/// This module provides `GateOptions` for describing a session's workspace,
/// plus the `HookEvent` and `HookMatcher` registration types.
pub mod options;

/// Static permission policy loaded from `permissions.json`
pub mod policy;

/// Collaborator traits consulted by the pipeline
pub mod collaborators;

/// Shell command parsing and read-only classification
pub mod shell;

/// Session approvals and command facts
pub mod knowledge;

/// Default permission-mode table
pub mod mode;

/// Prerequisite reading gate
pub mod prerequisites;

/// Ask-mode approval decisions
pub mod ask;

/// Workspace config file validation
pub mod validation;

/// The PreToolUse pipeline
pub mod pipeline;

/// Hook system integration
///
/// Key types:
/// - `GateSession` - per-session state shared by the callbacks
/// - `PreToolUseGate`, `ReadTracker`, `CompactionReset` - the callbacks
/// - `HookCallback` - Trait for implementing hook logic
/// - `HookInput`, `HookContext`, `HookResponse` - the hook contract
pub mod hooks;

// Public API re-exports
pub use pipeline::{EvaluationContext, evaluate};

// Prelude module for common imports
pub mod prelude {
    //! Common imports for claw_gate users
    //!
    //! Use `use claw_gate::prelude::*;` to import commonly used types.

    pub use crate::collaborators::{
        CommandKnowledge, EndpointPolicy, FileSystem, ModePolicy, ModeVerdict, PolicyContext,
        ReadOnlyClassifier, RealFileSystem,
    };
    pub use crate::error::GateError;
    pub use crate::hooks::{
        CompactionReset, GateSession, HookCallback, HookContext, HookInput, HookRegistration,
        HookResponse, PermissionDecision, PreToolUseGate, ReadTracker,
    };
    pub use crate::knowledge::SessionKnowledge;
    pub use crate::mode::ModePolicyTable;
    pub use crate::options::{GateOptions, HookEvent, HookMatcher};
    pub use crate::pipeline::{EvaluationContext, evaluate};
    pub use crate::policy::{MergedPolicy, PolicyConfig};
    pub use crate::prerequisites::{PrerequisiteCheck, PrerequisiteManager};
    pub use crate::shell::ShellReadOnlyClassifier;
    pub use crate::types::{
        PermissionMode, PipelineResult, PromptKind, PromptSpec, ToolCallRequest, ToolInput,
    };
}
