//! Hook system integration for the authorization pipeline.
//!
//! The hook runtime calls into claw_gate through three callbacks that share
//! one [`GateSession`]:
//!
//! - [`PreToolUseGate`] - runs the pipeline and turns its outcome into a
//!   permission decision
//! - [`ReadTracker`] - records successful `Read` calls so prerequisite gates lift
//! - [`CompactionReset`] - forgets what was read when the context is compacted
//!
//! # Architecture
//!
//! - `HookEvent` - Events that trigger hooks (defined in options module)
//! - `HookMatcher` - Pattern matching for selective hook triggering
//! - `HookCallback` - Trait for implementing hook logic
//! - `HookInput` - Data passed to hooks
//! - `HookContext` - Session id and permission mode for the call
//! - `HookResponse` - Response with permission decisions
//!
//! # Examples
//!
//! ## Registering the gate
//!
//! ```
//! use claw_gate::prelude::*;
//! use std::sync::Arc;
//!
//! let options = GateOptions::builder()
//!     .workspace_root("/work/acme")
//!     .home_dir("/home/dev")
//!     .build()
//!     .unwrap();
//! let session = Arc::new(GateSession::new(options, MergedPolicy::empty()));
//!
//! for registration in session.hook_registrations() {
//!     println!("{:?} -> {:?}", registration.event, registration.matcher.tool_name);
//! }
//! ```
//!
//! ## Pattern Matching
//!
//! ```
//! use claw_gate::prelude::*;
//!
//! // Match all tools
//! let matcher = HookMatcher::all();
//! assert!(matcher.matches("Bash"));
//!
//! // Match every MCP tool
//! let matcher = HookMatcher::tool("mcp__*");
//! assert!(matcher.matches("mcp__github__create_issue"));
//! assert!(!matcher.matches("Read"));
//! ```

mod callback;
mod gate;
mod response;
mod types;

pub use callback::HookCallback;
pub use gate::{
    CompactionReset, GateSession, HookRegistration, PreToolUseGate, ReadTracker, to_hook_response,
};
pub use response::{HookResponse, PermissionDecision};
pub use types::{HookContext, HookInput};

// Re-export HookEvent and HookMatcher from options for convenience
pub use crate::options::{HookEvent, HookMatcher};
