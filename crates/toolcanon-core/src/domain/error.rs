//! Error taxonomy for toolcanon.
//!
//! Malformed tool output, classification ambiguity and session conflicts are
//! never errors: they degrade into partial results or first-class fields.
//! Only the two fatal categories live here.

/// Structural contract violations found by the result validator.
///
/// Any of these indicates a parser defect, not a runtime condition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("counts do not match children: declared {declared}, derived {derived}")]
    CountsMismatch { declared: String, derived: String },

    #[error("success flag is {declared} but children imply {derived}")]
    SuccessMismatch { declared: bool, derived: bool },

    #[error("diagnostic in {file} has line 0 (lines are 1-based)")]
    ZeroLine { file: String },

    #[error("test {scope}::{name} has captured output but status {status}")]
    OutputOnNonFailure {
        scope: String,
        name: String,
        status: String,
    },

    #[error("duplicate test case {scope}::{name}")]
    DuplicateTestCase { scope: String, name: String },

    #[error("package failure for scope {scope} coexists with named tests")]
    PackageFailureShadowed { scope: String },

    #[error("elapsed time for {key} is negative")]
    NegativeElapsed { key: String },

    #[error("compact field `{field}` is not derivable from the canonical result")]
    InventedField { field: String },

    #[error("compact result kind {compact} does not match canonical kind {canonical}")]
    KindMismatch { compact: String, canonical: String },
}

/// toolcanon core errors.
#[derive(Debug, thiserror::Error)]
pub enum CanonError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CanonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canon_error_display() {
        let err = CanonError::UnknownTool("make".to_string());
        assert!(err.to_string().contains("unknown tool"));
        assert!(err.to_string().contains("make"));
    }

    #[test]
    fn test_validation_error_wraps() {
        let err: CanonError = ValidationError::ZeroLine {
            file: "main.go".to_string(),
        }
        .into();
        let msg = err.to_string();
        assert!(msg.contains("validation error"));
        assert!(msg.contains("main.go"));
    }

    #[test]
    fn test_output_on_non_failure_display() {
        let err = ValidationError::OutputOnNonFailure {
            scope: "pkg/a".to_string(),
            name: "TestX".to_string(),
            status: "pass".to_string(),
        };
        assert!(err.to_string().contains("pkg/a::TestX"));
    }
}
