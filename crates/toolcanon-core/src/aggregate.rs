//! Summary counts and the overall success flag.
//!
//! Both are pure functions of classified children. The exit code is never
//! consulted: formatters exit 1 for "needs formatting", linters exit 1 for
//! warnings, and a killed test binary may exit 0.

use std::collections::HashSet;

use crate::domain::diagnostic::Severity;
use crate::domain::records::LogStream;
use crate::domain::result::{Children, Counts};
use crate::domain::test_case::TestStatus;

fn count<T>(items: &[T], pred: impl Fn(&T) -> bool) -> u32 {
    items.iter().filter(|i| pred(i)).count() as u32
}

/// Derive [`Counts`] from children.
pub fn counts(children: &Children) -> Counts {
    let total = children.len() as u32;
    match children {
        Children::Diagnostics {
            diagnostics,
            raw_errors,
        } => Counts::Diagnostics {
            errors: count(diagnostics, |d| d.severity == Severity::Error)
                + raw_errors.len() as u32,
            warnings: count(diagnostics, |d| d.severity == Severity::Warning),
            notes: count(diagnostics, |d| d.severity == Severity::Note),
            helps: count(diagnostics, |d| d.severity == Severity::Help),
            raw_errors: raw_errors.len() as u32,
            total,
        },
        Children::Tests {
            tests,
            package_failures,
        } => Counts::Tests {
            passed: count(tests, |t| t.status == TestStatus::Pass),
            failed: count(tests, |t| t.status == TestStatus::Fail),
            skipped: count(tests, |t| t.status == TestStatus::Skip),
            running: count(tests, |t| t.status == TestStatus::Running),
            package_failures: package_failures.len() as u32,
            total,
        },
        Children::Commits { .. } => Counts::Commits { total },
        Children::Changes { changes } => Counts::Changes {
            additions: changes.iter().map(|c| c.additions).sum(),
            deletions: changes.iter().map(|c| c.deletions).sum(),
            total,
        },
        Children::Blame { lines } => Counts::Blame {
            commits: lines
                .iter()
                .map(|l| l.commit.as_str())
                .collect::<HashSet<_>>()
                .len() as u32,
            total,
        },
        Children::Log { lines } => Counts::Log {
            stderr: count(lines, |l| l.stream == LogStream::Stderr),
            total,
        },
        Children::Resources { resources } => Counts::Resources {
            changed: count(resources, |r| r.action.is_change()),
            total,
        },
    }
}

/// `true` iff there are no failing tests, no package failures and no
/// error-severity diagnostics or raw errors.
pub fn success(children: &Children) -> bool {
    match children {
        Children::Diagnostics {
            diagnostics,
            raw_errors,
        } => raw_errors.is_empty() && diagnostics.iter().all(|d| d.severity != Severity::Error),
        Children::Tests {
            tests,
            package_failures,
        } => package_failures.is_empty() && tests.iter().all(|t| t.status != TestStatus::Fail),
        Children::Commits { .. }
        | Children::Changes { .. }
        | Children::Blame { .. }
        | Children::Log { .. }
        | Children::Resources { .. } => true,
    }
}
