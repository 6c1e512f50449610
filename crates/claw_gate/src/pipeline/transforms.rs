//! Input transforms applied to calls that pass every gate.
//!
//! Each transform edits the input in place and reports whether it changed
//! anything; config validation instead returns a block reason.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::trace;

use crate::collaborators::{FileSystem, expand_tilde};
use crate::options::GateOptions;
use crate::types::{EDIT_TOOL, META_FIELDS, MULTI_EDIT_TOOL, ToolInput, WRITE_TOOL};
use crate::validation::{ConfigFileKind, format_issues, validate_content};

/// Input fields holding a filesystem path
pub const PATH_FIELDS: &[&str] = &["file_path", "notebook_path", "path"];

/// Prefix of project-level skills found under the working directory
pub const PROJECT_SKILL_PREFIX: &str = ".agents";

/// Prefix of skills installed in the home directory
pub const GLOBAL_SKILL_PREFIX: &str = "global";

/// Expand `~` and `~/...` in every path field
pub fn expand_path_fields(input: &mut ToolInput, home_dir: &Path) -> bool {
    let mut changed = false;
    for field in PATH_FIELDS {
        let Some(Value::String(raw)) = input.get(*field) else {
            continue;
        };
        let Some(expanded) = expand_tilde(raw, home_dir) else {
            continue;
        };
        let expanded = expanded.to_string_lossy().into_owned();
        trace!("Expanded {} to {}", field, expanded);
        input.insert((*field).to_string(), Value::String(expanded));
        changed = true;
    }
    changed
}

/// Check a write or edit to a workspace config file before it lands
///
/// Returns the block reason when the resulting content would be invalid.
/// Returns `None` for other tools, non-config targets, and edits that cannot
/// be simulated.
pub fn validate_config_write(
    tool_name: &str,
    input: &ToolInput,
    options: &GateOptions,
    fs: &dyn FileSystem,
) -> Option<String> {
    if !matches!(tool_name, WRITE_TOOL | EDIT_TOOL | MULTI_EDIT_TOOL) {
        return None;
    }
    let raw = input.get("file_path").and_then(Value::as_str)?;
    let path = absolute(raw, &options.working_directory);
    let kind = ConfigFileKind::classify(&path, &options.workspace_root)?;

    let Some(content) = simulate(tool_name, input, &path, fs) else {
        trace!("Skipping {} validation for {}", kind, path.display());
        return None;
    };
    let issues = validate_content(&kind, &content);
    if issues.is_empty() {
        trace!("{} at {} is valid", kind, path.display());
        return None;
    }
    Some(format_issues(&kind, &path, &issues))
}

fn absolute(raw: &str, base: &Path) -> PathBuf {
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// File content after the call runs
fn simulate(tool_name: &str, input: &ToolInput, path: &Path, fs: &dyn FileSystem) -> Option<String> {
    match tool_name {
        WRITE_TOOL => input.get("content").and_then(Value::as_str).map(str::to_string),
        EDIT_TOOL => apply_edit(&fs.read_to_string(path)?, input),
        MULTI_EDIT_TOOL => {
            let edits = input.get("edits").and_then(Value::as_array)?;
            let mut content = fs.read_to_string(path)?;
            for edit in edits {
                content = apply_edit(&content, edit.as_object()?)?;
            }
            Some(content)
        }
        _ => None,
    }
}

fn apply_edit(content: &str, edit: &ToolInput) -> Option<String> {
    let old = edit.get("old_string").and_then(Value::as_str)?;
    let new = edit.get("new_string").and_then(Value::as_str)?;
    let replace_all = edit
        .get("replace_all")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if old.is_empty() || !content.contains(old) {
        return None;
    }
    Some(if replace_all {
        content.replace(old, new)
    } else {
        content.replacen(old, new, 1)
    })
}

/// Qualify the `skill` field with the tier its manifest lives in
///
/// Tiers are searched project, workspace, global. When no manifest exists the
/// workspace qualification is used.
pub fn qualify_skill(input: &mut ToolInput, options: &GateOptions, fs: &dyn FileSystem) -> bool {
    let Some(current) = input.get("skill").and_then(Value::as_str) else {
        return false;
    };
    let slug = current.rsplit(':').next().unwrap_or(current);
    if slug.is_empty() {
        return false;
    }

    let tiers = [
        (
            options.working_directory.join(".agents").join("skills"),
            PROJECT_SKILL_PREFIX,
        ),
        (options.workspace_root.join("skills"), options.workspace_slug.as_str()),
        (
            options.home_dir.join(".agents").join("skills"),
            GLOBAL_SKILL_PREFIX,
        ),
    ];
    let prefix = tiers
        .iter()
        .find(|(dir, _)| fs.exists(&dir.join(slug).join("SKILL.md")))
        .map(|(_, prefix)| *prefix)
        .unwrap_or(options.workspace_slug.as_str());

    let qualified = format!("{prefix}:{slug}");
    if qualified == current {
        return false;
    }
    trace!("Qualified skill {} as {}", current, qualified);
    input.insert("skill".to_string(), Value::String(qualified));
    true
}

/// Remove model-facing metadata fields
pub fn strip_meta_fields(input: &mut ToolInput) -> bool {
    let mut changed = false;
    for field in META_FIELDS {
        changed |= input.shift_remove(*field).is_some();
    }
    if changed {
        trace!("Stripped metadata fields");
    }
    changed
}
