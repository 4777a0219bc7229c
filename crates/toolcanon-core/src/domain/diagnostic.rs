//! Normalized diagnostic types.

use serde::{Deserialize, Serialize};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Help,
    Note,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Help => "help",
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Map a tool's free-form severity label onto the canonical scale.
    ///
    /// Unknown or empty labels fall back to [`Severity::Warning`].
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "error" | "err" | "fatal" | "fatal error" | "failure" | "critical" | "high" => {
                Severity::Error
            }
            "note" | "info" | "information" | "message" | "low" => Severity::Note,
            "help" | "hint" | "suggestion" => Severity::Help,
            _ => Severity::Warning,
        }
    }
}

/// Source position of a diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    /// Source file path as reported by the tool.
    pub file: String,

    /// Line number (1-indexed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,

    /// Column number (1-indexed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl Location {
    /// A location with a 1-based line; `0` lines are dropped.
    pub fn new(file: impl Into<String>, line: u32, column: Option<u32>) -> Self {
        Self {
            file: file.into(),
            line: (line > 0).then_some(line),
            column: column.filter(|c| *c > 0),
        }
    }

    /// A file-only location (formatters, file-level lints).
    pub fn file_only(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
        }
    }
}

/// A single located diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: Location,

    pub severity: Severity,

    /// Diagnostic/lint code (e.g. "E0425", "TS2304", "no-unused-vars").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Human-readable message.
    pub message: String,

    /// Fix hint supplied by the tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(location: Location, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            location,
            severity,
            code: None,
            message: message.into(),
            suggestion: None,
        }
    }

    /// Set diagnostic code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Set fix suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Category of an error line that could not be located to a file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RawErrorKind {
    /// Reported under a `# package` marker.
    Package,
    /// Link-time failure.
    Linker,
    /// Module or dependency resolution failure.
    Module,
    Other,
}

/// An unlocated error line. Always counts as an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawError {
    pub kind: RawErrorKind,

    pub message: String,

    /// Package or module the line was reported under, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl RawError {
    pub fn new(kind: RawErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            scope: None,
        }
    }

    pub fn in_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}
