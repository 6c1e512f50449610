//! Error types for claw_gate
//!
//! The authorization pipeline itself never fails: every outcome, including a
//! block, is a [`PipelineResult`](crate::types::PipelineResult) value. `GateError`
//! covers the surrounding setup work that can go wrong:
//!
//! - [`GateError::MalformedRequest`]: a caller handed over a request of the wrong shape
//! - [`GateError::InvalidPattern`]: a policy file contains a regex that does not compile
//! - [`GateError::HomeDirUnavailable`]: no home directory could be determined for `~` expansion
//! - [`GateError::Io`]: reading a policy file failed (auto-converts from `std::io::Error`)
//! - [`GateError::JsonDecode`]: a policy file is not valid JSON (auto-converts from `serde_json::Error`)
//!
//! # Example
//!
//! ```rust
//! use claw_gate::error::GateError;
//! use claw_gate::types::ToolCallRequest;
//! use serde_json::json;
//!
//! let err = ToolCallRequest::from_value("Bash", json!("ls")).unwrap_err();
//! assert!(matches!(err, GateError::MalformedRequest(_)));
//! ```

use thiserror::Error;

/// The main error type for claw_gate setup operations
#[derive(Error, Debug)]
pub enum GateError {
    /// A tool call request did not have the expected shape
    ///
    /// Tool input must be a JSON object. Anything else is a bug in the
    /// runtime adapter and is reported instead of being coerced.
    #[error("Malformed tool call request: {0}")]
    MalformedRequest(String),

    /// A pattern in a permissions file failed to compile
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern text
        pattern: String,
        /// The underlying regex compilation error
        #[source]
        source: regex::Error,
    },

    /// No home directory was configured and none could be detected
    #[error("Home directory could not be determined. Set home_dir explicitly.")]
    HomeDirUnavailable,

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse JSON
    #[error("Failed to parse JSON: {0}")]
    JsonDecode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_request_message() {
        let err = GateError::MalformedRequest("input must be an object".to_string());
        assert_eq!(
            err.to_string(),
            "Malformed tool call request: input must be an object"
        );
    }

    #[test]
    fn test_invalid_pattern_message() {
        let source = regex::Regex::new("(unclosed").unwrap_err();
        let err = GateError::InvalidPattern {
            pattern: "(unclosed".to_string(),
            source,
        };
        assert!(err.to_string().starts_with("Invalid pattern '(unclosed'"));
    }

    #[test]
    fn test_home_dir_unavailable_message() {
        assert!(GateError::HomeDirUnavailable
            .to_string()
            .contains("home_dir"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GateError = io_err.into();
        assert!(matches!(err, GateError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_result_with_question_mark_json() {
        fn parse_json() -> Result<serde_json::Value, GateError> {
            Ok(serde_json::from_str("{ invalid }")?)
        }

        let err = parse_json().unwrap_err();
        assert!(matches!(err, GateError::JsonDecode(_)));
    }
}
