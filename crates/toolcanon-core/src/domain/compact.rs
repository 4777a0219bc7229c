//! Compact projection types.
//!
//! Every field here is either copied verbatim from a [`CanonicalResult`]
//! or produced by one of the four [`Strategy`] rules. Nothing is invented.
//!
//! [`CanonicalResult`]: super::result::CanonicalResult

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::diagnostic::{Location, RawError, Severity};
use super::records::{ChangeStatus, LogLine, ResourceChange};
use super::result::{Counts, InvocationContext, ResultKind};

/// Declared lossy rule applied to one compact field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Large free-text blobs dropped, summary scalars kept.
    ElideDetail,
    /// Only actionable children kept.
    FilterThenKeep,
    /// Fixed head, explicit omission marker, fixed tail.
    BoundedSample,
    /// Line numbers collapsed into closed ranges per key.
    RangeCompress,
}

/// A bounded sample of an ordered sequence.
///
/// When the source fit in `head + tail` the whole sequence is in `head`,
/// `omitted` is `None` and `tail` is empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Sampled<T> {
    pub head: Vec<T>,
    /// Number of items dropped between `head` and `tail`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub omitted: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tail: Vec<T>,
}

impl<T> Sampled<T> {
    /// Wrap a sequence that needs no sampling.
    pub fn whole(items: Vec<T>) -> Self {
        Self {
            head: items,
            omitted: None,
            tail: Vec::new(),
        }
    }

    /// Length of the original sequence.
    pub fn original_len(&self) -> usize {
        self.head.len() + self.omitted.unwrap_or(0) + self.tail.len()
    }

    pub fn is_truncated(&self) -> bool {
        self.omitted.is_some()
    }

    /// Kept items in order, skipping the marker.
    pub fn kept(&self) -> impl Iterator<Item = &T> {
        self.head.iter().chain(self.tail.iter())
    }
}

/// A diagnostic with its fix suggestion elided.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompactDiagnostic {
    pub location: Location,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

/// A failing test or failed scope with sampled output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompactFailure {
    pub scope: String,
    /// `None` for a package-level failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Sampled<String>>,
}

/// A commit with its body elided.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompactCommit {
    pub hash: String,
    pub author: String,
    pub date: String,
    pub subject: String,
}

/// A file change with its patch elided.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompactChange {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    pub status: ChangeStatus,
    pub additions: u32,
    pub deletions: u32,
    #[serde(default)]
    pub binary: bool,
}

/// Lines attributed to one commit, range-compressed (`"1-3, 7, 9-10"`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlameRange {
    pub commit: String,
    pub author: String,
    pub summary: String,
    pub lines: String,
}

/// Compact children, one variant per entity kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompactChildren {
    Diagnostics {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diagnostics: Option<Sampled<CompactDiagnostic>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw_errors: Option<Sampled<RawError>>,
    },
    Tests {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        failures: Vec<CompactFailure>,
    },
    Commits {
        commits: Sampled<CompactCommit>,
    },
    Changes {
        changes: Vec<CompactChange>,
    },
    Blame {
        ranges: Vec<BlameRange>,
    },
    Log {
        lines: Sampled<LogLine>,
    },
    Resources {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        changed: Vec<ResourceChange>,
    },
}

impl CompactChildren {
    pub fn kind(&self) -> ResultKind {
        match self {
            CompactChildren::Diagnostics { .. } => ResultKind::Diagnostics,
            CompactChildren::Tests { .. } => ResultKind::Tests,
            CompactChildren::Commits { .. } => ResultKind::Commits,
            CompactChildren::Changes { .. } => ResultKind::Changes,
            CompactChildren::Blame { .. } => ResultKind::Blame,
            CompactChildren::Log { .. } => ResultKind::Log,
            CompactChildren::Resources { .. } => ResultKind::Resources,
        }
    }
}

/// Bounded projection of a canonical result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompactResult {
    /// Copied verbatim.
    pub success: bool,
    /// Copied verbatim.
    pub counts: Counts,
    pub children: CompactChildren,
    /// Copied verbatim.
    pub context: InvocationContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_output: Option<Sampled<String>>,
    /// Field name to the rule that produced it.
    pub strategies: BTreeMap<String, Strategy>,
}

impl CompactResult {
    pub fn kind(&self) -> ResultKind {
        self.children.kind()
    }
}
