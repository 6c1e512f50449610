//! Content validation for workspace configuration files.
//!
//! Writes and edits to configuration files are simulated before they run and
//! the resulting content is checked here, so a structurally invalid file is
//! never persisted.
//!
//! # Example
//!
//! ```
//! use claw_gate::validation::{ConfigFileKind, validate_content};
//! use std::path::Path;
//!
//! let kind = ConfigFileKind::classify(
//!     Path::new("/ws/sources/github/config.json"),
//!     Path::new("/ws"),
//! ).unwrap();
//! assert_eq!(kind, ConfigFileKind::SourceConfig { slug: "github".to_string() });
//!
//! let issues = validate_content(&kind, r#"{"name": "GitHub"}"#);
//! assert!(issues.iter().any(|i| i.field == "slug"));
//! ```

use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use url::Url;

use crate::policy::PolicyConfig;

/// Which configuration file a path refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigFileKind {
    /// `{workspace}/config.json`
    WorkspaceConfig,
    /// `{workspace}/sources/{slug}/config.json`
    SourceConfig {
        /// Directory slug of the source
        slug: String,
    },
    /// `{workspace}/permissions.json` or `{workspace}/sources/{slug}/permissions.json`
    Permissions,
    /// `{workspace}/skills/{slug}/SKILL.md`
    SkillManifest,
}

impl ConfigFileKind {
    /// Classify an absolute path relative to the workspace root
    pub fn classify(path: &Path, workspace_root: &Path) -> Option<Self> {
        let rel = path.strip_prefix(workspace_root).ok()?;
        let parts: Vec<&str> = rel.iter().filter_map(|c| c.to_str()).collect();
        match parts.as_slice() {
            ["config.json"] => Some(ConfigFileKind::WorkspaceConfig),
            ["permissions.json"] => Some(ConfigFileKind::Permissions),
            ["sources", slug, "config.json"] => Some(ConfigFileKind::SourceConfig {
                slug: slug.to_string(),
            }),
            ["sources", _, "permissions.json"] => Some(ConfigFileKind::Permissions),
            ["skills", _, "SKILL.md"] => Some(ConfigFileKind::SkillManifest),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFileKind::WorkspaceConfig => write!(f, "workspace config"),
            ConfigFileKind::SourceConfig { slug } => write!(f, "source config for '{slug}'"),
            ConfigFileKind::Permissions => write!(f, "permissions file"),
            ConfigFileKind::SkillManifest => write!(f, "skill manifest"),
        }
    }
}

/// One problem found in a configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Offending field (`$` for the document itself)
    pub field: String,
    /// What is wrong
    pub message: String,
}

impl ValidationIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the full content a file would have after a write
pub fn validate_content(kind: &ConfigFileKind, content: &str) -> Vec<ValidationIssue> {
    match kind {
        ConfigFileKind::WorkspaceConfig => with_object(content, validate_workspace),
        ConfigFileKind::SourceConfig { slug } => with_object(content, |obj| validate_source(obj, slug)),
        ConfigFileKind::Permissions => validate_permissions(content),
        ConfigFileKind::SkillManifest => validate_skill(content),
    }
}

/// Block message listing every issue
pub fn format_issues(kind: &ConfigFileKind, path: &Path, issues: &[ValidationIssue]) -> String {
    let lines: Vec<String> = issues.iter().map(|i| format!("- {i}")).collect();
    format!(
        "This change would leave an invalid {kind} at {}:\n{}\nFix these issues and try again.",
        path.display(),
        lines.join("\n")
    )
}

fn with_object<F>(content: &str, check: F) -> Vec<ValidationIssue>
where
    F: FnOnce(&Map<String, Value>) -> Vec<ValidationIssue>,
{
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(obj)) => check(&obj),
        Ok(_) => vec![ValidationIssue::new("$", "must be a JSON object")],
        Err(e) => vec![ValidationIssue::new("$", format!("invalid JSON: {e}"))],
    }
}

fn require_string(obj: &Map<String, Value>, field: &str, issues: &mut Vec<ValidationIssue>) -> Option<String> {
    match obj.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::String(_)) => {
            issues.push(ValidationIssue::new(field, "must not be empty"));
            None
        }
        Some(_) => {
            issues.push(ValidationIssue::new(field, "must be a string"));
            None
        }
        None => {
            issues.push(ValidationIssue::new(field, "is required"));
            None
        }
    }
}

fn validate_workspace(obj: &Map<String, Value>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    require_string(obj, "name", &mut issues);
    if let Some(mode) = obj.get("defaultPermissionMode") {
        if !matches!(mode.as_str(), Some("safe" | "ask" | "allow-all")) {
            issues.push(ValidationIssue::new(
                "defaultPermissionMode",
                "must be one of safe, ask, allow-all",
            ));
        }
    }
    issues
}

fn validate_source(obj: &Map<String, Value>, dir_slug: &str) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    require_string(obj, "name", &mut issues);
    if let Some(slug) = require_string(obj, "slug", &mut issues) {
        if slug != dir_slug {
            issues.push(ValidationIssue::new(
                "slug",
                format!("must match the source directory name '{dir_slug}'"),
            ));
        }
    }
    if let Some(enabled) = obj.get("enabled") {
        if !enabled.is_boolean() {
            issues.push(ValidationIssue::new("enabled", "must be a boolean"));
        }
    }

    let Some(kind) = require_string(obj, "type", &mut issues) else {
        return issues;
    };
    let section = match obj.get(&kind) {
        Some(Value::Object(section)) => section,
        Some(_) => {
            issues.push(ValidationIssue::new(kind.as_str(), "must be an object"));
            return issues;
        }
        None if matches!(kind.as_str(), "mcp" | "api" | "local") => {
            issues.push(ValidationIssue::new(
                kind.as_str(),
                format!("is required for type '{kind}'"),
            ));
            return issues;
        }
        None => {
            issues.push(ValidationIssue::new("type", "must be one of mcp, api, local"));
            return issues;
        }
    };

    match kind.as_str() {
        "mcp" => {
            let has = |key: &str| section.get(key).is_some_and(Value::is_string);
            if !has("url") && !has("command") {
                issues.push(ValidationIssue::new("mcp", "needs a url or a command"));
            }
            if let Some(url) = section.get("url").and_then(Value::as_str) {
                check_http_url("mcp.url", url, &mut issues);
            }
        }
        "api" => {
            let mut nested = Vec::new();
            if let Some(base) = require_string(section, "baseUrl", &mut nested) {
                check_http_url("api.baseUrl", &base, &mut issues);
            }
            issues.extend(
                nested
                    .into_iter()
                    .map(|i| ValidationIssue::new(format!("api.{}", i.field), i.message)),
            );
        }
        "local" => {
            let mut nested = Vec::new();
            require_string(section, "path", &mut nested);
            issues.extend(
                nested
                    .into_iter()
                    .map(|i| ValidationIssue::new(format!("local.{}", i.field), i.message)),
            );
        }
        _ => issues.push(ValidationIssue::new("type", "must be one of mcp, api, local")),
    }
    issues
}

fn check_http_url(field: &str, raw: &str, issues: &mut Vec<ValidationIssue>) {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => issues.push(ValidationIssue::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => issues.push(ValidationIssue::new(field, format!("invalid URL: {e}"))),
    }
}

const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

fn validate_permissions(content: &str) -> Vec<ValidationIssue> {
    let config = match serde_json::from_str::<PolicyConfig>(content) {
        Ok(config) => config,
        Err(e) => return vec![ValidationIssue::new("$", e.to_string())],
    };
    let mut issues: Vec<ValidationIssue> = config
        .patterns()
        .filter_map(|(field, pattern)| {
            Regex::new(pattern)
                .err()
                .map(|e| ValidationIssue::new(field, format!("invalid pattern '{pattern}': {e}")))
        })
        .collect();
    for endpoint in &config.allowed_api_endpoints {
        if !HTTP_METHODS.contains(&endpoint.method.to_ascii_uppercase().as_str()) {
            issues.push(ValidationIssue::new(
                "allowedApiEndpoints",
                format!("unknown HTTP method '{}'", endpoint.method),
            ));
        }
    }
    issues
}

fn validate_skill(content: &str) -> Vec<ValidationIssue> {
    let mut lines = content.lines();
    if lines.next().map(str::trim_end) != Some("---") {
        return vec![ValidationIssue::new(
            "frontmatter",
            "must start with a '---' line",
        )];
    }

    let mut fields = Map::new();
    let mut closed = false;
    for line in lines.by_ref() {
        if line.trim_end() == "---" {
            closed = true;
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            if !key.starts_with([' ', '\t']) {
                let value = value.trim().trim_matches(['"', '\'']);
                fields.insert(key.trim().to_string(), Value::String(value.to_string()));
            }
        }
    }
    if !closed {
        return vec![ValidationIssue::new("frontmatter", "is missing its closing '---' line")];
    }

    let mut issues = Vec::new();
    require_string(&fields, "name", &mut issues);
    require_string(&fields, "description", &mut issues);
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(slug: &str) -> ConfigFileKind {
        ConfigFileKind::SourceConfig {
            slug: slug.to_string(),
        }
    }

    fn fields(issues: &[ValidationIssue]) -> Vec<&str> {
        issues.iter().map(|i| i.field.as_str()).collect()
    }

    #[test]
    fn test_classify_paths() {
        let root = Path::new("/ws");
        assert_eq!(
            ConfigFileKind::classify(Path::new("/ws/config.json"), root),
            Some(ConfigFileKind::WorkspaceConfig)
        );
        assert_eq!(
            ConfigFileKind::classify(Path::new("/ws/permissions.json"), root),
            Some(ConfigFileKind::Permissions)
        );
        assert_eq!(
            ConfigFileKind::classify(Path::new("/ws/sources/gh/permissions.json"), root),
            Some(ConfigFileKind::Permissions)
        );
        assert_eq!(
            ConfigFileKind::classify(Path::new("/ws/skills/commit/SKILL.md"), root),
            Some(ConfigFileKind::SkillManifest)
        );
        assert_eq!(ConfigFileKind::classify(Path::new("/ws/src/config.json"), root), None);
        assert_eq!(ConfigFileKind::classify(Path::new("/other/config.json"), root), None);
    }

    #[test]
    fn test_invalid_json() {
        let issues = validate_content(&ConfigFileKind::WorkspaceConfig, "{ nope");
        assert_eq!(fields(&issues), vec!["$"]);
        assert!(issues[0].message.starts_with("invalid JSON"));

        let issues = validate_content(&ConfigFileKind::WorkspaceConfig, "[]");
        assert_eq!(issues[0].message, "must be a JSON object");
    }

    #[test]
    fn test_workspace_config() {
        assert!(validate_content(&ConfigFileKind::WorkspaceConfig, r#"{"name": "Acme"}"#).is_empty());
        let issues = validate_content(
            &ConfigFileKind::WorkspaceConfig,
            r#"{"name": "", "defaultPermissionMode": "yolo"}"#,
        );
        assert_eq!(fields(&issues), vec!["name", "defaultPermissionMode"]);
    }

    #[test]
    fn test_valid_source_configs() {
        let mcp = r#"{"name": "GitHub", "slug": "github", "type": "mcp", "mcp": {"url": "https://mcp.github.com"}}"#;
        assert!(validate_content(&source("github"), mcp).is_empty());

        let api = r#"{"name": "Stripe", "slug": "stripe", "type": "api", "api": {"baseUrl": "https://api.stripe.com"}}"#;
        assert!(validate_content(&source("stripe"), api).is_empty());

        let local = r#"{"name": "Notes", "slug": "notes", "type": "local", "local": {"path": "~/notes"}}"#;
        assert!(validate_content(&source("notes"), local).is_empty());
    }

    #[test]
    fn test_source_slug_must_match_directory() {
        let content = r#"{"name": "GitHub", "slug": "gh", "type": "mcp", "mcp": {"command": "gh-mcp"}}"#;
        let issues = validate_content(&source("github"), content);
        assert_eq!(fields(&issues), vec!["slug"]);
    }

    #[test]
    fn test_source_type_section() {
        let issues = validate_content(&source("x"), r#"{"name": "X", "slug": "x", "type": "mcp"}"#);
        assert_eq!(fields(&issues), vec!["mcp"]);

        let issues = validate_content(&source("x"), r#"{"name": "X", "slug": "x", "type": "ftp"}"#);
        assert_eq!(fields(&issues), vec!["type"]);

        let issues = validate_content(&source("x"), r#"{"name": "X", "slug": "x", "type": "mcp", "mcp": {}}"#);
        assert_eq!(issues[0].message, "needs a url or a command");
    }

    #[test]
    fn test_source_urls() {
        let content = r#"{"name": "X", "slug": "x", "type": "api", "api": {"baseUrl": "not a url"}}"#;
        let issues = validate_content(&source("x"), content);
        assert_eq!(fields(&issues), vec!["api.baseUrl"]);

        let content = r#"{"name": "X", "slug": "x", "type": "api", "api": {}}"#;
        let issues = validate_content(&source("x"), content);
        assert_eq!(fields(&issues), vec!["api.baseUrl"]);

        let content = r#"{"name": "X", "slug": "x", "type": "mcp", "mcp": {"url": "file:///tmp/sock"}}"#;
        let issues = validate_content(&source("x"), content);
        assert!(issues[0].message.contains("unsupported scheme"));
    }

    #[test]
    fn test_permissions() {
        let ok = r#"{"allowedBashPatterns": ["^make$"], "allowedApiEndpoints": [{"method": "post", "path": "^/q"}]}"#;
        assert!(validate_content(&ConfigFileKind::Permissions, ok).is_empty());

        let bad = r#"{"allowedBashPatterns": ["("], "allowedApiEndpoints": [{"method": "YEET", "path": "/"}]}"#;
        let issues = validate_content(&ConfigFileKind::Permissions, bad);
        assert_eq!(fields(&issues), vec!["allowedBashPatterns", "allowedApiEndpoints"]);

        let unknown = r#"{"allowEverything": true}"#;
        let issues = validate_content(&ConfigFileKind::Permissions, unknown);
        assert!(issues[0].message.contains("unknown field"));
    }

    #[test]
    fn test_skill_manifest() {
        let ok = "---\nname: commit\ndescription: \"Write commit messages\"\n---\n# Body\n";
        assert!(validate_content(&ConfigFileKind::SkillManifest, ok).is_empty());

        let missing = "---\nname: commit\n---\n";
        let issues = validate_content(&ConfigFileKind::SkillManifest, missing);
        assert_eq!(fields(&issues), vec!["description"]);

        let unclosed = "---\nname: commit\n";
        let issues = validate_content(&ConfigFileKind::SkillManifest, unclosed);
        assert!(issues[0].message.contains("closing"));

        let none = "# Just markdown\n";
        let issues = validate_content(&ConfigFileKind::SkillManifest, none);
        assert_eq!(fields(&issues), vec!["frontmatter"]);
    }

    #[test]
    fn test_format_issues() {
        let issues = vec![
            ValidationIssue::new("name", "is required"),
            ValidationIssue::new("slug", "must not be empty"),
        ];
        let message = format_issues(&source("gh"), Path::new("/ws/sources/gh/config.json"), &issues);
        assert!(message.contains("source config for 'gh'"));
        assert!(message.contains("- name: is required"));
        assert!(message.contains("- slug: must not be empty"));
    }
}
