//! Required-reading gate for proxied sources and skills.
//!
//! Some capabilities come with documentation the model must have read in its
//! current context before using them:
//!
//! - **Source guides** - `{workspace}/sources/{slug}/guide.md` gates every
//!   `mcp__{slug}__*` and `api_{slug}` tool, when the guide exists
//! - **Skill manifests** - registered `SKILL.md` paths block every tool except
//!   `Read` until they are read
//!
//! Detection is inferred from observed reads, so it can be wrong. Each gate
//! therefore rejects at most [`GRACE_LIMIT`] times before letting the call
//! through, and the whole state re-arms on compaction.
//!
//! # Example
//!
//! ```
//! use claw_gate::collaborators::RealFileSystem;
//! use claw_gate::prerequisites::{PrerequisiteCheck, PrerequisiteManager};
//! use std::sync::Arc;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let guide = dir.path().join("sources/github/guide.md");
//! std::fs::create_dir_all(guide.parent().unwrap()).unwrap();
//! std::fs::write(&guide, "# GitHub").unwrap();
//!
//! let mut manager = PrerequisiteManager::new(dir.path(), "/home/dev", Arc::new(RealFileSystem));
//!
//! // First use is blocked and names the guide
//! let check = manager.check_prerequisites("mcp__github__list_issues");
//! assert!(matches!(check, PrerequisiteCheck::Blocked { ref reason } if reason.contains("guide.md")));
//!
//! // Reading the guide clears the gate
//! let input = serde_json::json!({"file_path": guide.to_str().unwrap()});
//! manager.track_read_tool(input.as_object().unwrap());
//! assert_eq!(manager.check_prerequisites("mcp__github__list_issues"), PrerequisiteCheck::Allowed);
//! ```

mod manager;
mod rules;

pub use manager::{GRACE_LIMIT, PrerequisiteCheck, PrerequisiteManager};
pub use rules::{PrerequisiteRule, builtin_rules, guide_path};
