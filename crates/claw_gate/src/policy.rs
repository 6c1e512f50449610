//! Static permission policy loaded from `permissions.json` files.
//!
//! A workspace and each of its sources may carry a `permissions.json`. The
//! files are parsed into [`PolicyConfig`] and combined into one
//! [`MergedPolicy`], which compiles every pattern once. The merged policy is
//! built by the caller and passed into each evaluation; nothing here is cached
//! process-wide.
//!
//! Workspace rules apply to every source. MCP and API rules from a source's
//! own file only apply to that source's tools.
//!
//! # Example
//!
//! ```
//! use claw_gate::policy::{MergedPolicy, PolicyConfig};
//! use claw_gate::collaborators::EndpointPolicy;
//!
//! let config: PolicyConfig = serde_json::from_str(r#"{
//!     "allowedBashPatterns": ["^make lint$"],
//!     "allowedApiEndpoints": [{"method": "POST", "path": "^/search"}]
//! }"#).unwrap();
//!
//! let policy = MergedPolicy::merge([config]).unwrap();
//! assert!(policy.is_bash_pattern_allowed("make lint"));
//! assert!(policy.is_endpoint_allowed("POST", "/search/issues", "github"));
//! assert!(!policy.is_endpoint_allowed("DELETE", "/search", "github"));
//!
//! // Source rules stay with their source
//! let stripe: PolicyConfig = serde_json::from_str(r#"{"allowedMcpPatterns": ["^refund_"]}"#).unwrap();
//! let policy = policy.with_source_config("stripe", stripe).unwrap();
//! assert!(policy.is_mcp_pattern_allowed("stripe", "refund_charge"));
//! assert!(!policy.is_mcp_pattern_allowed("github", "refund_charge"));
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::collaborators::EndpointPolicy;
use crate::error::GateError;

/// A REST endpoint allowed to mutate without prompting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiEndpointRule {
    /// HTTP method, matched case-insensitively
    pub method: String,
    /// Regex matched against the request path
    pub path: String,
}

/// The on-disk shape of a `permissions.json` file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PolicyConfig {
    /// Regexes for shell commands treated as read-only
    #[serde(default)]
    pub allowed_bash_patterns: Vec<String>,
    /// Regexes for MCP tool names treated as read-only
    #[serde(default)]
    pub allowed_mcp_patterns: Vec<String>,
    /// REST endpoints allowed to mutate
    #[serde(default)]
    pub allowed_api_endpoints: Vec<ApiEndpointRule>,
}

impl PolicyConfig {
    /// Parse a permissions file from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GateError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse a permissions document
    pub fn from_json(text: &str) -> Result<Self, GateError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Every regex in the config with the field it came from
    pub(crate) fn patterns(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.allowed_bash_patterns
            .iter()
            .map(|p| ("allowedBashPatterns", p.as_str()))
            .chain(
                self.allowed_mcp_patterns
                    .iter()
                    .map(|p| ("allowedMcpPatterns", p.as_str())),
            )
            .chain(
                self.allowed_api_endpoints
                    .iter()
                    .map(|e| ("allowedApiEndpoints", e.path.as_str())),
            )
    }
}

/// A compiled rule and the source it belongs to; `None` applies everywhere
#[derive(Debug, Clone)]
struct Scoped<T> {
    source: Option<String>,
    rule: T,
}

impl<T> Scoped<T> {
    fn applies_to(&self, source_slug: &str) -> bool {
        self.source.as_deref().is_none_or(|s| s == source_slug)
    }
}

#[derive(Debug, Clone)]
struct CompiledEndpoint {
    method: String,
    path: Regex,
}

/// Union of several [`PolicyConfig`]s with their patterns compiled
#[derive(Debug, Clone, Default)]
pub struct MergedPolicy {
    bash_patterns: Vec<Regex>,
    mcp_patterns: Vec<Scoped<Regex>>,
    api_endpoints: Vec<Scoped<CompiledEndpoint>>,
}

fn compile(pattern: &str) -> Result<Regex, GateError> {
    Regex::new(pattern).map_err(|source| GateError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

impl MergedPolicy {
    /// An empty policy that allows nothing extra
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge workspace-level configs in order, compiling every pattern
    ///
    /// Rules merged here apply to every source.
    pub fn merge<I>(configs: I) -> Result<Self, GateError>
    where
        I: IntoIterator<Item = PolicyConfig>,
    {
        let mut merged = Self::default();
        for config in configs {
            merged.add(None, &config)?;
        }
        Ok(merged)
    }

    /// Add a source's own config; its MCP and API rules only match that source
    ///
    /// Bash patterns are not tied to a source and apply globally.
    pub fn with_source_config(
        mut self,
        source_slug: impl Into<String>,
        config: PolicyConfig,
    ) -> Result<Self, GateError> {
        self.add(Some(source_slug.into()), &config)?;
        Ok(self)
    }

    fn add(&mut self, source: Option<String>, config: &PolicyConfig) -> Result<(), GateError> {
        for pattern in &config.allowed_bash_patterns {
            self.bash_patterns.push(compile(pattern)?);
        }
        for pattern in &config.allowed_mcp_patterns {
            self.mcp_patterns.push(Scoped {
                source: source.clone(),
                rule: compile(pattern)?,
            });
        }
        for endpoint in &config.allowed_api_endpoints {
            self.api_endpoints.push(Scoped {
                source: source.clone(),
                rule: CompiledEndpoint {
                    method: endpoint.method.to_ascii_uppercase(),
                    path: compile(&endpoint.path)?,
                },
            });
        }
        Ok(())
    }

    /// Load and merge the workspace file plus any source files that exist
    ///
    /// Missing files are skipped; unreadable or invalid ones are errors.
    pub fn load(workspace_root: &Path, source_slugs: &[String]) -> Result<Self, GateError> {
        let workspace_file = workspace_root.join("permissions.json");
        let mut merged = if workspace_file.exists() {
            Self::merge([PolicyConfig::from_file(&workspace_file)?])?
        } else {
            Self::default()
        };

        for slug in source_slugs {
            let path = workspace_root.join("sources").join(slug).join("permissions.json");
            if path.exists() {
                merged = merged.with_source_config(slug.as_str(), PolicyConfig::from_file(&path)?)?;
            }
        }
        Ok(merged)
    }

    /// Whether a shell command matches an allowed pattern
    pub fn is_bash_pattern_allowed(&self, command: &str) -> bool {
        self.bash_patterns.iter().any(|re| re.is_match(command))
    }

    /// Whether a tool on an MCP server matches an allowed read-only pattern
    ///
    /// Patterns match the bare tool name, without the `mcp__{server}__` prefix.
    pub fn is_mcp_pattern_allowed(&self, server: &str, tool: &str) -> bool {
        self.mcp_patterns
            .iter()
            .any(|p| p.applies_to(server) && p.rule.is_match(tool))
    }
}

impl EndpointPolicy for MergedPolicy {
    fn is_endpoint_allowed(&self, method: &str, path: &str, source_slug: &str) -> bool {
        self.api_endpoints.iter().any(|e| {
            e.applies_to(source_slug)
                && e.rule.method.eq_ignore_ascii_case(method)
                && e.rule.path.is_match(path)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_missing_fields() {
        let config = PolicyConfig::from_json("{}").unwrap();
        assert_eq!(config, PolicyConfig::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = PolicyConfig::from_json(r#"{"allowedBash": []}"#).unwrap_err();
        assert!(matches!(err, GateError::JsonDecode(_)));
    }

    #[test]
    fn test_invalid_regex_rejected_on_merge() {
        let config = PolicyConfig {
            allowed_mcp_patterns: vec!["[".to_string()],
            ..Default::default()
        };
        let err = MergedPolicy::merge([config]).unwrap_err();
        assert!(matches!(err, GateError::InvalidPattern { ref pattern, .. } if pattern == "["));
    }

    #[test]
    fn test_merge_is_union() {
        let a = PolicyConfig {
            allowed_bash_patterns: vec!["^make$".to_string()],
            ..Default::default()
        };
        let b = PolicyConfig {
            allowed_bash_patterns: vec!["^just$".to_string()],
            allowed_mcp_patterns: vec!["^export_".to_string()],
            ..Default::default()
        };
        let policy = MergedPolicy::merge([a, b]).unwrap();
        assert!(policy.is_bash_pattern_allowed("make"));
        assert!(policy.is_bash_pattern_allowed("just"));
        assert!(policy.is_mcp_pattern_allowed("sheets", "export_csv"));
        assert!(!policy.is_mcp_pattern_allowed("sheets", "delete_all"));
    }

    #[test]
    fn test_endpoint_method_case_insensitive() {
        let config = PolicyConfig {
            allowed_api_endpoints: vec![ApiEndpointRule {
                method: "post".to_string(),
                path: "^/v1/query$".to_string(),
            }],
            ..Default::default()
        };
        let policy = MergedPolicy::merge([config]).unwrap();
        assert!(policy.is_endpoint_allowed("POST", "/v1/query", "db"));
        assert!(!policy.is_endpoint_allowed("POST", "/v1/query/drop", "db"));
    }

    #[test]
    fn test_load_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sources/github")).unwrap();
        std::fs::write(
            dir.path().join("sources/github/permissions.json"),
            r#"{"allowedMcpPatterns": ["^search_"]}"#,
        )
        .unwrap();

        let policy =
            MergedPolicy::load(dir.path(), &["github".to_string(), "absent".to_string()]).unwrap();
        assert!(policy.is_mcp_pattern_allowed("github", "search_code"));
        assert!(!policy.is_mcp_pattern_allowed("linear", "search_code"));
    }

    #[test]
    fn test_source_rules_do_not_leak_to_other_sources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sources/stripe")).unwrap();
        std::fs::write(
            dir.path().join("sources/stripe/permissions.json"),
            r#"{"allowedApiEndpoints": [{"method": "DELETE", "path": ".*"}],
                "allowedMcpPatterns": ["^delete_"],
                "allowedBashPatterns": ["^stripe listen$"]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("permissions.json"),
            r#"{"allowedApiEndpoints": [{"method": "POST", "path": "^/search"}]}"#,
        )
        .unwrap();

        let policy =
            MergedPolicy::load(dir.path(), &["github".to_string(), "stripe".to_string()]).unwrap();
        assert!(policy.is_endpoint_allowed("DELETE", "/v1/customers/cus_1", "stripe"));
        assert!(!policy.is_endpoint_allowed("DELETE", "/repos/acme/app", "github"));
        assert!(policy.is_mcp_pattern_allowed("stripe", "delete_customer"));
        assert!(!policy.is_mcp_pattern_allowed("github", "delete_repo"));

        // Workspace rules and Bash patterns stay global
        assert!(policy.is_endpoint_allowed("POST", "/search/issues", "github"));
        assert!(policy.is_endpoint_allowed("POST", "/search", "stripe"));
        assert!(policy.is_bash_pattern_allowed("stripe listen"));
    }

    #[test]
    fn test_patterns_lists_every_field() {
        let config = PolicyConfig {
            allowed_bash_patterns: vec!["a".to_string()],
            allowed_mcp_patterns: vec!["b".to_string()],
            allowed_api_endpoints: vec![ApiEndpointRule {
                method: "GET".to_string(),
                path: "c".to_string(),
            }],
        };
        let fields: Vec<_> = config.patterns().map(|(field, _)| field).collect();
        assert_eq!(
            fields,
            vec!["allowedBashPatterns", "allowedMcpPatterns", "allowedApiEndpoints"]
        );
    }
}
