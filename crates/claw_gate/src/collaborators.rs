//! Narrow interfaces the pipeline consults but does not own.
//!
//! Each collaborator is a trait so the pipeline can be exercised with
//! lightweight fakes. Default implementations live in [`crate::mode`],
//! [`crate::knowledge`], [`crate::shell`] and [`crate::policy`].
//!
//! # Example
//!
//! ```
//! use claw_gate::collaborators::FileSystem;
//! use std::collections::HashSet;
//! use std::path::{Path, PathBuf};
//!
//! struct FakeFs(HashSet<PathBuf>);
//!
//! impl FileSystem for FakeFs {
//!     fn exists(&self, path: &Path) -> bool {
//!         self.0.contains(path)
//!     }
//!
//!     fn read_to_string(&self, _path: &Path) -> Option<String> {
//!         None
//!     }
//! }
//!
//! let fs = FakeFs(HashSet::from([PathBuf::from("/ws/sources/github/guide.md")]));
//! assert!(fs.exists(Path::new("/ws/sources/github/guide.md")));
//! ```

use std::path::{Path, PathBuf};

use crate::policy::MergedPolicy;
use crate::types::{PermissionMode, ToolInput};

/// Extra context handed to the mode policy
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    /// Merged static policy for this session
    pub policy: &'a MergedPolicy,
    /// Root of the current workspace
    pub workspace_root: &'a Path,
    /// Home directory used for `~` expansion
    pub home_dir: &'a Path,
    /// Folder where plans may be written even in safe mode
    pub plans_folder: Option<&'a Path>,
}

/// Answer from the mode policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeVerdict {
    /// Whether the mode permits the call
    pub allowed: bool,
    /// Explanation shown to the model when not allowed
    pub reason: String,
}

impl ModeVerdict {
    /// Permit the call
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: String::new(),
        }
    }

    /// Refuse the call
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// Classifies each tool call as permitted or not for a permission mode
pub trait ModePolicy: Send + Sync {
    /// Decide whether `mode` permits this exact call
    fn check(
        &self,
        tool_name: &str,
        input: &ToolInput,
        mode: PermissionMode,
        ctx: &PolicyContext<'_>,
    ) -> ModeVerdict;
}

/// Session memory of approved commands and domains
pub trait CommandKnowledge: Send + Sync {
    /// Whether a command or tool name was approved earlier this session
    fn is_whitelisted(&self, name: &str) -> bool;

    /// Whether a base command is intrinsically dangerous
    fn is_dangerous(&self, name: &str) -> bool;

    /// Program name of a command (`/usr/bin/git status` -> `git`)
    fn base_command(&self, command: &str) -> String;

    /// Network target of a `curl`/`wget` style command
    fn extract_domain(&self, command: &str) -> Option<String>;

    /// Every request target host of a command
    ///
    /// Empty when no target can be vetted; callers must then prompt.
    fn extract_domains(&self, command: &str) -> Vec<String> {
        self.extract_domain(command).into_iter().collect()
    }

    /// Whether a domain was approved earlier this session
    fn is_domain_whitelisted(&self, domain: &str) -> bool;
}

/// Static allow rules for mutating REST calls
pub trait EndpointPolicy: Send + Sync {
    /// Whether `method path` on the given source may run without prompting
    fn is_endpoint_allowed(&self, method: &str, path: &str, source_slug: &str) -> bool;
}

/// Decides whether a full shell command has no side effects
pub trait ReadOnlyClassifier: Send + Sync {
    /// Whether `command` only reads
    fn is_read_only(&self, command: &str, policy: &MergedPolicy) -> bool;
}

/// Filesystem access
pub trait FileSystem: Send + Sync {
    /// Whether a file exists
    fn exists(&self, path: &Path) -> bool;

    /// File contents, or `None` if the file cannot be read
    fn read_to_string(&self, path: &Path) -> Option<String>;
}

/// [`FileSystem`] backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> Option<String> {
        std::fs::read_to_string(path).ok()
    }
}

/// Expand a leading `~` against `home`
///
/// Only `~` and `~/...` are expanded; `~user` forms are left alone.
pub fn expand_tilde(path: &str, home: &Path) -> Option<PathBuf> {
    if path == "~" {
        return Some(home.to_path_buf());
    }
    path.strip_prefix("~/").map(|rest| home.join(rest))
}
