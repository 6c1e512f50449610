//! Read tracking and the grace-limited prerequisite gate.

use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::rules::{PrerequisiteRule, builtin_rules};
use crate::collaborators::{FileSystem, expand_tilde};
use crate::types::{READ_TOOL, ToolInput};

/// How many times a gate rejects before letting the call through
///
/// The gate can only observe that a read of the path happened, not that the
/// model took it in, so a missed detection must not block a session forever.
pub const GRACE_LIMIT: u32 = 1;

/// Result of [`PrerequisiteManager::check_prerequisites`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrerequisiteCheck {
    /// No unread prerequisite applies
    Allowed,
    /// A prerequisite must be read first
    Blocked {
        /// Message for the model naming the file(s) to read
        reason: String,
    },
}

/// Per-context read tracking for one session
///
/// State lives for one reasoning context. Call
/// [`reset_read_state`](Self::reset_read_state) after every compaction.
pub struct PrerequisiteManager {
    workspace_root: PathBuf,
    home_dir: PathBuf,
    fs: Arc<dyn FileSystem>,
    rules: Vec<PrerequisiteRule>,
    read_paths: HashSet<PathBuf>,
    rejections: HashMap<String, u32>,
    pending_skills: BTreeSet<PathBuf>,
}

impl PrerequisiteManager {
    /// Create a manager with the built-in source guide rules
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        home_dir: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            home_dir: home_dir.into(),
            fs,
            rules: builtin_rules(),
            read_paths: HashSet::new(),
            rejections: HashMap::new(),
            pending_skills: BTreeSet::new(),
        }
    }

    /// Replace the static rules
    pub fn with_rules(mut self, rules: Vec<PrerequisiteRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Decide whether `tool_name` may run given what has been read
    pub fn check_prerequisites(&mut self, tool_name: &str) -> PrerequisiteCheck {
        if !self.pending_skills.is_empty() && tool_name != READ_TOOL {
            let key = self.skill_key();
            if self.reject(&key) {
                let listing: Vec<String> = self
                    .pending_skills
                    .iter()
                    .map(|p| format!("- {}", p.display()))
                    .collect();
                debug!("Blocking {} until skill files are read", tool_name);
                return PrerequisiteCheck::Blocked {
                    reason: format!(
                        "Before using any other tool, read these skill files with the Read tool:\n{}",
                        listing.join("\n")
                    ),
                };
            }
            warn!(
                "Skill prerequisites not observed as read after grace limit; releasing {} path(s)",
                self.pending_skills.len()
            );
            self.rejections.remove(&key);
            self.pending_skills.clear();
            return PrerequisiteCheck::Allowed;
        }

        for i in 0..self.rules.len() {
            let rule = self.rules[i];
            if !(rule.matches)(tool_name) {
                continue;
            }
            let Some(path) = (rule.resolve)(tool_name, &self.workspace_root) else {
                continue;
            };
            if !self.fs.exists(&path) || self.read_paths.contains(&path) {
                continue;
            }
            if self.reject(&path.to_string_lossy()) {
                debug!("{} blocked by {}: {} unread", tool_name, rule.name, path.display());
                return PrerequisiteCheck::Blocked {
                    reason: (rule.message)(tool_name, &path),
                };
            }
            warn!(
                "{} allowed after grace limit although {} was not read",
                tool_name,
                path.display()
            );
        }
        PrerequisiteCheck::Allowed
    }

    /// Record a successful read tool call
    pub fn track_read_tool(&mut self, input: &ToolInput) {
        let Some(raw) = ["file_path", "path"]
            .iter()
            .find_map(|key| input.get(*key).and_then(Value::as_str))
        else {
            return;
        };
        let path = self.normalize(raw);
        self.pending_skills.remove(&path);
        self.read_paths.insert(path);
    }

    /// Clear pending skill paths that a shell command reads
    ///
    /// Returns whether any pending path appears in the command.
    pub fn track_bash_skill_read(&mut self, input: &ToolInput) -> bool {
        let Some(command) = input.get("command").and_then(Value::as_str) else {
            return false;
        };
        let matched: Vec<PathBuf> = self
            .pending_skills
            .iter()
            .filter(|path| self.command_mentions(command, path))
            .cloned()
            .collect();
        for path in &matched {
            debug!("Skill file {} read via Bash", path.display());
            self.pending_skills.remove(path);
            self.read_paths.insert(path.clone());
        }
        !matched.is_empty()
    }

    /// Require skill files to be read before any other tool
    pub fn register_skill_prerequisites<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        for path in paths {
            let path = self.normalize(path.as_ref());
            self.pending_skills.insert(path);
        }
    }

    /// Forget every read, counter and pending skill
    pub fn reset_read_state(&mut self) {
        debug!(
            "Resetting read state ({} read, {} pending)",
            self.read_paths.len(),
            self.pending_skills.len()
        );
        self.read_paths.clear();
        self.rejections.clear();
        self.pending_skills.clear();
    }

    /// Whether a path was read in the current context
    pub fn has_read(&self, path: impl AsRef<Path>) -> bool {
        self.read_paths.contains(path.as_ref())
    }

    /// Skill files still waiting to be read
    pub fn pending_skill_prerequisites(&self) -> impl Iterator<Item = &Path> {
        self.pending_skills.iter().map(PathBuf::as_path)
    }

    fn normalize(&self, raw: &str) -> PathBuf {
        expand_tilde(raw, &self.home_dir).unwrap_or_else(|| PathBuf::from(raw))
    }

    /// Bump the counter for `key`; true while still within the grace limit
    fn reject(&mut self, key: &str) -> bool {
        let count = self.rejections.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count <= GRACE_LIMIT
    }

    fn skill_key(&self) -> String {
        let paths: Vec<String> = self
            .pending_skills
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        format!("skills:{}", paths.join("|"))
    }

    fn command_mentions(&self, command: &str, path: &Path) -> bool {
        if command.contains(path.to_string_lossy().as_ref()) {
            return true;
        }
        path.strip_prefix(&self.home_dir)
            .is_ok_and(|rest| command.contains(&format!("~/{}", rest.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FakeFs(HashSet<PathBuf>);

    impl FileSystem for FakeFs {
        fn exists(&self, path: &Path) -> bool {
            self.0.contains(path)
        }

        fn read_to_string(&self, _path: &Path) -> Option<String> {
            None
        }
    }

    const GUIDE: &str = "/ws/sources/github/guide.md";

    fn manager() -> PrerequisiteManager {
        let fs = FakeFs(HashSet::from([PathBuf::from(GUIDE)]));
        PrerequisiteManager::new("/ws", "/home/dev", Arc::new(fs))
    }

    fn input(value: Value) -> ToolInput {
        value.as_object().cloned().unwrap()
    }

    fn is_blocked(check: &PrerequisiteCheck) -> bool {
        matches!(check, PrerequisiteCheck::Blocked { .. })
    }

    #[test]
    fn test_unread_guide_blocks_once() {
        let mut m = manager();
        match m.check_prerequisites("mcp__github__list_issues") {
            PrerequisiteCheck::Blocked { reason } => assert!(reason.contains(GUIDE)),
            PrerequisiteCheck::Allowed => panic!("expected block"),
        }
        assert_eq!(
            m.check_prerequisites("mcp__github__list_issues"),
            PrerequisiteCheck::Allowed
        );
    }

    #[test]
    fn test_grace_is_per_path_not_per_tool() {
        let mut m = manager();
        assert!(is_blocked(&m.check_prerequisites("mcp__github__list_issues")));
        // Same guide, different tool family: grace already used.
        assert!(!is_blocked(&m.check_prerequisites("api_github")));
    }

    #[test]
    fn test_missing_guide_fails_open() {
        let mut m = manager();
        assert_eq!(
            m.check_prerequisites("mcp__linear__list_issues"),
            PrerequisiteCheck::Allowed
        );
    }

    #[test]
    fn test_read_clears_gate() {
        let mut m = manager();
        m.track_read_tool(&input(json!({"file_path": GUIDE})));
        assert!(m.has_read(GUIDE));
        assert_eq!(m.check_prerequisites("api_github"), PrerequisiteCheck::Allowed);
    }

    #[test]
    fn test_read_via_path_field_and_tilde() {
        let mut m = manager();
        m.track_read_tool(&input(json!({"path": "~/notes.md"})));
        assert!(m.has_read("/home/dev/notes.md"));
    }

    #[test]
    fn test_non_proxy_tools_unaffected() {
        let mut m = manager();
        assert_eq!(m.check_prerequisites("Bash"), PrerequisiteCheck::Allowed);
        assert_eq!(m.check_prerequisites("Write"), PrerequisiteCheck::Allowed);
    }

    #[test]
    fn test_reset_rearms_gate() {
        let mut m = manager();
        assert!(is_blocked(&m.check_prerequisites("mcp__github__x")));
        assert!(!is_blocked(&m.check_prerequisites("mcp__github__x")));
        m.reset_read_state();
        assert!(is_blocked(&m.check_prerequisites("mcp__github__x")));
    }

    #[test]
    fn test_reset_forgets_reads() {
        let mut m = manager();
        m.track_read_tool(&input(json!({"file_path": GUIDE})));
        m.reset_read_state();
        assert!(!m.has_read(GUIDE));
        assert!(is_blocked(&m.check_prerequisites("mcp__github__x")));
    }

    #[test]
    fn test_skill_prerequisite_blocks_everything_but_read() {
        let mut m = manager();
        m.register_skill_prerequisites(["/ws/skills/commit/SKILL.md"]);

        match m.check_prerequisites("Bash") {
            PrerequisiteCheck::Blocked { reason } => {
                assert!(reason.contains("/ws/skills/commit/SKILL.md"))
            }
            PrerequisiteCheck::Allowed => panic!("expected block"),
        }
        assert_eq!(m.check_prerequisites("Read"), PrerequisiteCheck::Allowed);
    }

    #[test]
    fn test_skill_gate_lists_every_path() {
        let mut m = manager();
        m.register_skill_prerequisites(["/a/SKILL.md", "/b/SKILL.md"]);
        let PrerequisiteCheck::Blocked { reason } = m.check_prerequisites("Write") else {
            panic!("expected block");
        };
        assert!(reason.contains("- /a/SKILL.md"));
        assert!(reason.contains("- /b/SKILL.md"));
    }

    #[test]
    fn test_skill_gate_releases_after_grace() {
        let mut m = manager();
        m.register_skill_prerequisites(["/a/SKILL.md"]);
        assert!(is_blocked(&m.check_prerequisites("Bash")));
        assert_eq!(m.check_prerequisites("Bash"), PrerequisiteCheck::Allowed);
        assert_eq!(m.pending_skill_prerequisites().count(), 0);
        assert_eq!(m.check_prerequisites("Bash"), PrerequisiteCheck::Allowed);
    }

    #[test]
    fn test_skill_read_tool_clears_pending() {
        let mut m = manager();
        m.register_skill_prerequisites(["/a/SKILL.md"]);
        m.track_read_tool(&input(json!({"file_path": "/a/SKILL.md"})));
        assert_eq!(m.pending_skill_prerequisites().count(), 0);
        assert_eq!(m.check_prerequisites("Bash"), PrerequisiteCheck::Allowed);
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut m = manager();
        m.register_skill_prerequisites(["/a/SKILL.md"]);
        m.register_skill_prerequisites(["/a/SKILL.md", "/b/SKILL.md"]);
        assert_eq!(m.pending_skill_prerequisites().count(), 2);
    }

    #[test]
    fn test_bash_skill_read() {
        let mut m = manager();
        m.register_skill_prerequisites(["/a/SKILL.md", "/b/SKILL.md"]);

        assert!(!m.track_bash_skill_read(&input(json!({"command": "ls /a"}))));
        assert_eq!(m.pending_skill_prerequisites().count(), 2);

        assert!(m.track_bash_skill_read(&input(json!({"command": "cat /a/SKILL.md"}))));
        let pending: Vec<_> = m.pending_skill_prerequisites().collect();
        assert_eq!(pending, vec![Path::new("/b/SKILL.md")]);
        assert!(m.has_read("/a/SKILL.md"));
    }

    #[test]
    fn test_bash_skill_read_with_tilde_form() {
        let mut m = manager();
        m.register_skill_prerequisites(["~/.agents/skills/pdf/SKILL.md"]);
        assert!(m.track_bash_skill_read(&input(
            json!({"command": "head -50 ~/.agents/skills/pdf/SKILL.md"})
        )));
        assert!(m.has_read("/home/dev/.agents/skills/pdf/SKILL.md"));
    }

    #[test]
    fn test_bash_skill_read_without_command() {
        let mut m = manager();
        m.register_skill_prerequisites(["/a/SKILL.md"]);
        assert!(!m.track_bash_skill_read(&ToolInput::new()));
    }

    #[test]
    fn test_reset_clears_pending_skills() {
        let mut m = manager();
        m.register_skill_prerequisites(["/a/SKILL.md"]);
        m.reset_read_state();
        assert_eq!(m.check_prerequisites("Bash"), PrerequisiteCheck::Allowed);
    }
}
