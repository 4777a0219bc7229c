//! The canonical result: aggregate root for one tool invocation.

use serde::{Deserialize, Serialize};

use super::diagnostic::{Diagnostic, RawError};
use super::raw::RawOutput;
use super::records::{BlameLine, Commit, FileChange, LogLine, ResourceChange};
use super::test_case::{PackageFailure, TestCase};
use crate::aggregate;

/// Entity kind carried by a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Diagnostics,
    Tests,
    Commits,
    Changes,
    Blame,
    Log,
    Resources,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultKind::Diagnostics => "diagnostics",
            ResultKind::Tests => "tests",
            ResultKind::Commits => "commits",
            ResultKind::Changes => "changes",
            ResultKind::Blame => "blame",
            ResultKind::Log => "log",
            ResultKind::Resources => "resources",
        }
    }
}

/// Classified children of a result, one variant per entity kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Children {
    Diagnostics {
        diagnostics: Vec<Diagnostic>,
        raw_errors: Vec<RawError>,
    },
    Tests {
        tests: Vec<TestCase>,
        package_failures: Vec<PackageFailure>,
    },
    Commits {
        commits: Vec<Commit>,
    },
    Changes {
        changes: Vec<FileChange>,
    },
    Blame {
        lines: Vec<BlameLine>,
    },
    Log {
        lines: Vec<LogLine>,
    },
    Resources {
        resources: Vec<ResourceChange>,
    },
}

impl Children {
    pub fn kind(&self) -> ResultKind {
        match self {
            Children::Diagnostics { .. } => ResultKind::Diagnostics,
            Children::Tests { .. } => ResultKind::Tests,
            Children::Commits { .. } => ResultKind::Commits,
            Children::Changes { .. } => ResultKind::Changes,
            Children::Blame { .. } => ResultKind::Blame,
            Children::Log { .. } => ResultKind::Log,
            Children::Resources { .. } => ResultKind::Resources,
        }
    }

    /// Number of classified children.
    pub fn len(&self) -> usize {
        match self {
            Children::Diagnostics {
                diagnostics,
                raw_errors,
            } => diagnostics.len() + raw_errors.len(),
            Children::Tests {
                tests,
                package_failures,
            } => tests.len() + package_failures.len(),
            Children::Commits { commits } => commits.len(),
            Children::Changes { changes } => changes.len(),
            Children::Blame { lines } => lines.len(),
            Children::Log { lines } => lines.len(),
            Children::Resources { resources } => resources.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An empty set of children of the given kind.
    pub fn empty(kind: ResultKind) -> Self {
        match kind {
            ResultKind::Diagnostics => Children::Diagnostics {
                diagnostics: Vec::new(),
                raw_errors: Vec::new(),
            },
            ResultKind::Tests => Children::Tests {
                tests: Vec::new(),
                package_failures: Vec::new(),
            },
            ResultKind::Commits => Children::Commits {
                commits: Vec::new(),
            },
            ResultKind::Changes => Children::Changes {
                changes: Vec::new(),
            },
            ResultKind::Blame => Children::Blame { lines: Vec::new() },
            ResultKind::Log => Children::Log { lines: Vec::new() },
            ResultKind::Resources => Children::Resources {
                resources: Vec::new(),
            },
        }
    }
}

/// Summary counts, always derived from [`Children`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Counts {
    Diagnostics {
        errors: u32,
        warnings: u32,
        notes: u32,
        helps: u32,
        raw_errors: u32,
        total: u32,
    },
    Tests {
        passed: u32,
        failed: u32,
        skipped: u32,
        running: u32,
        package_failures: u32,
        total: u32,
    },
    Commits {
        total: u32,
    },
    Changes {
        additions: u32,
        deletions: u32,
        total: u32,
    },
    Blame {
        commits: u32,
        total: u32,
    },
    Log {
        stderr: u32,
        total: u32,
    },
    Resources {
        changed: u32,
        total: u32,
    },
}

impl Counts {
    pub fn total(&self) -> u32 {
        match *self {
            Counts::Diagnostics { total, .. }
            | Counts::Tests { total, .. }
            | Counts::Commits { total }
            | Counts::Changes { total, .. }
            | Counts::Blame { total, .. }
            | Counts::Log { total, .. }
            | Counts::Resources { total, .. } => total,
        }
    }
}

/// Which parser path produced the children.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    Json,
    Text,
    /// Nothing parseable was found.
    None,
}

/// Auxiliary facts about the invocation. Never feeds `success`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvocationContext {
    pub tool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub input_format: InputFormat,
}

impl InvocationContext {
    pub fn from_raw(tool: &str, raw: &RawOutput, input_format: InputFormat) -> Self {
        Self {
            tool: tool.to_string(),
            exit_code: raw.exit_code,
            timed_out: raw.timed_out,
            stdout_truncated: raw.stdout_truncated,
            stderr_truncated: raw.stderr_truncated,
            duration_ms: raw.duration_ms,
            input_format,
        }
    }
}

/// Validated, tool-agnostic outcome of one invocation.
///
/// Build with [`CanonicalResult::new`]; `counts` and `success` are derived
/// from `children` there and nowhere else.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalResult {
    pub success: bool,
    pub counts: Counts,
    pub children: Children,
    pub context: InvocationContext,
    /// Stderr of a tool that produced nothing classifiable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_output: Option<String>,
}

impl CanonicalResult {
    pub fn new(children: Children, context: InvocationContext) -> Self {
        let counts = aggregate::counts(&children);
        let success = aggregate::success(&children);
        Self {
            success,
            counts,
            children,
            context,
            failure_output: None,
        }
    }

    /// Mark a result whose tool produced no classifiable output and exited
    /// non-zero with an error stream. The stderr is preserved verbatim.
    pub fn with_failure_output(mut self, stderr: impl Into<String>) -> Self {
        self.failure_output = Some(stderr.into());
        self.success = false;
        self
    }

    pub fn kind(&self) -> ResultKind {
        self.children.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::diagnostic::{Location, RawErrorKind, Severity};

    fn ctx() -> InvocationContext {
        InvocationContext::from_raw("go-build", &RawOutput::stdout("", 2), InputFormat::Text)
    }

    #[test]
    fn test_children_len_counts_both_lists() {
        let children = Children::Diagnostics {
            diagnostics: vec![Diagnostic::new(
                Location::new("a.go", 1, None),
                Severity::Error,
                "x",
            )],
            raw_errors: vec![RawError::new(RawErrorKind::Linker, "ld: boom")],
        };
        assert_eq!(children.len(), 2);
        assert_eq!(children.kind(), ResultKind::Diagnostics);
    }

    #[test]
    fn test_new_derives_counts_and_success() {
        let result = CanonicalResult::new(Children::empty(ResultKind::Diagnostics), ctx());
        assert!(result.success);
        assert_eq!(result.counts.total(), 0);
        assert_eq!(result.context.exit_code, Some(2));
    }

    #[test]
    fn test_children_serialize_with_kind_tag() {
        let v = serde_json::to_value(Children::empty(ResultKind::Blame)).expect("serialize");
        assert_eq!(v["kind"], "blame");
        assert!(v["lines"].as_array().expect("lines").is_empty());
    }

    #[test]
    fn test_failure_output_forces_unsuccessful() {
        let result = CanonicalResult::new(Children::empty(ResultKind::Commits), ctx())
            .with_failure_output("fatal: not a git repository");
        assert!(!result.success);
        assert!(result.failure_output.is_some());
    }
}
