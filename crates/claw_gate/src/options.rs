//! Session configuration and hook registration types
//!
//! This module provides [`GateOptions`], the per-session facts the pipeline
//! needs (workspace layout, home directory, which sources exist and which are
//! active), plus [`HookEvent`] and [`HookMatcher`] for wiring the gate into a
//! hook runtime.
//!
//! # Example
//!
//! ```
//! use claw_gate::options::GateOptions;
//!
//! let options = GateOptions::builder()
//!     .workspace_root("/work/acme")
//!     .working_directory("/work/acme/app")
//!     .home_dir("/home/dev")
//!     .active_sources(["github"])
//!     .all_sources(["github", "linear"])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(options.workspace_slug, "acme");
//! assert!(options.is_source_active("github"));
//! assert!(!options.is_source_active("linear"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::GateError;

/// Slug used when the workspace root has no usable directory name
const FALLBACK_WORKSPACE_SLUG: &str = "workspace";

/// Hook event type - triggers for lifecycle callbacks
///
/// # Examples
///
/// ```
/// use claw_gate::prelude::*;
///
/// let event = HookEvent::PreToolUse;
/// assert_eq!(format!("{:?}", event), "PreToolUse");
/// ```
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum HookEvent {
    /// Before a tool is invoked
    PreToolUse,
    /// After a tool successfully completes
    PostToolUse,
    /// Before conversation compaction
    PreCompact,
}

/// Hook matcher for pattern-based hook triggering
///
/// Patterns are exact tool names, or a prefix followed by a single trailing
/// `*` (`mcp__*`, `api_*`).
///
/// # Examples
///
/// ```
/// use claw_gate::prelude::*;
///
/// // Match all tools
/// let matcher = HookMatcher::all();
/// assert!(matcher.matches("Bash"));
/// assert!(matcher.matches("Read"));
///
/// // Match specific tool
/// let matcher = HookMatcher::tool("Bash");
/// assert!(matcher.matches("Bash"));
/// assert!(!matcher.matches("Read"));
///
/// // Match a tool family
/// let matcher = HookMatcher::tool("mcp__*");
/// assert!(matcher.matches("mcp__github__list_issues"));
/// assert!(!matcher.matches("Bash"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookMatcher {
    /// Tool name pattern to match (e.g., "Bash", "mcp__*", or None for all)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl HookMatcher {
    /// Create a matcher that matches all tools
    pub fn all() -> Self {
        Self { tool_name: None }
    }

    /// Create a matcher for a specific tool name or prefix pattern
    pub fn tool(name: impl Into<String>) -> Self {
        Self {
            tool_name: Some(name.into()),
        }
    }

    /// Check if this matcher matches the given tool name
    pub fn matches(&self, tool_name: &str) -> bool {
        match &self.tool_name {
            None => true,
            Some(pattern) => match pattern.strip_suffix('*') {
                Some(prefix) => tool_name.starts_with(prefix),
                None => pattern == tool_name,
            },
        }
    }
}

/// Per-session facts consulted by the pipeline
///
/// Build with [`GateOptions::builder`]. Every path is expected to be absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOptions {
    /// Root of the current workspace
    pub workspace_root: PathBuf,
    /// Slug of the workspace, used to qualify workspace skills
    pub workspace_slug: String,
    /// Working directory of the agent, searched for project skills
    pub working_directory: PathBuf,
    /// Home directory, used for `~` expansion and global skills
    pub home_dir: PathBuf,
    /// Sources whose tools are currently enabled
    pub active_sources: HashSet<String>,
    /// Every source configured in the workspace
    pub all_sources: HashSet<String>,
    /// Folder plans may be written to in safe mode
    pub plans_folder: Option<PathBuf>,
}

impl GateOptions {
    /// Create a new options builder
    ///
    /// # Example
    ///
    /// ```
    /// use claw_gate::options::GateOptions;
    ///
    /// let options = GateOptions::builder()
    ///     .workspace_root("/work/acme")
    ///     .home_dir("/home/dev")
    ///     .build()
    ///     .unwrap();
    ///
    /// // The working directory defaults to the workspace root.
    /// assert_eq!(options.working_directory, options.workspace_root);
    /// ```
    pub fn builder() -> GateOptionsBuilder {
        GateOptionsBuilder::default()
    }

    /// Whether a source's tools are enabled in this session
    pub fn is_source_active(&self, slug: &str) -> bool {
        self.active_sources.contains(slug)
    }

    /// Whether a source is configured in the workspace
    pub fn source_exists(&self, slug: &str) -> bool {
        self.all_sources.contains(slug)
    }

    /// Plans folder as a borrowed path
    pub fn plans_folder(&self) -> Option<&Path> {
        self.plans_folder.as_deref()
    }
}

/// Builder for [`GateOptions`]
///
/// Provides a fluent interface for constructing options with chainable setters.
/// Unset paths are resolved in [`build`](GateOptionsBuilder::build):
///
/// - `workspace_root` falls back to the working directory
/// - `working_directory` falls back to the workspace root, then the process cwd
/// - `home_dir` falls back to the user's home directory
/// - `workspace_slug` falls back to the workspace root's directory name
#[derive(Debug, Default)]
pub struct GateOptionsBuilder {
    workspace_root: Option<PathBuf>,
    workspace_slug: Option<String>,
    working_directory: Option<PathBuf>,
    home_dir: Option<PathBuf>,
    active_sources: HashSet<String>,
    all_sources: HashSet<String>,
    plans_folder: Option<PathBuf>,
}

impl GateOptionsBuilder {
    /// Set workspace root
    pub fn workspace_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(path.into());
        self
    }

    /// Set workspace slug
    pub fn workspace_slug(mut self, slug: impl Into<String>) -> Self {
        self.workspace_slug = Some(slug.into());
        self
    }

    /// Set working directory
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(path.into());
        self
    }

    /// Set home directory
    pub fn home_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(path.into());
        self
    }

    /// Set the sources whose tools are enabled
    pub fn active_sources<I, S>(mut self, slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_sources = slugs.into_iter().map(Into::into).collect();
        self
    }

    /// Set every source configured in the workspace
    pub fn all_sources<I, S>(mut self, slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.all_sources = slugs.into_iter().map(Into::into).collect();
        self
    }

    /// Set plans folder
    pub fn plans_folder(mut self, path: impl Into<PathBuf>) -> Self {
        self.plans_folder = Some(path.into());
        self
    }

    /// Build the options
    ///
    /// # Errors
    ///
    /// - [`GateError::HomeDirUnavailable`] when no home directory was set and
    ///   none can be determined
    /// - [`GateError::Io`] when neither a workspace root nor a working
    ///   directory was set and the process cwd cannot be read
    pub fn build(self) -> Result<GateOptions, GateError> {
        let working_directory = match (self.working_directory, &self.workspace_root) {
            (Some(dir), _) => dir,
            (None, Some(root)) => root.clone(),
            (None, None) => std::env::current_dir()?,
        };
        let workspace_root = self
            .workspace_root
            .unwrap_or_else(|| working_directory.clone());
        let home_dir = match self.home_dir {
            Some(home) => home,
            None => dirs::home_dir().ok_or(GateError::HomeDirUnavailable)?,
        };
        let workspace_slug = self.workspace_slug.unwrap_or_else(|| {
            workspace_root
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(FALLBACK_WORKSPACE_SLUG)
                .to_string()
        });

        Ok(GateOptions {
            workspace_root,
            workspace_slug,
            working_directory,
            home_dir,
            active_sources: self.active_sources,
            all_sources: self.all_sources,
            plans_folder: self.plans_folder,
        })
    }
}
