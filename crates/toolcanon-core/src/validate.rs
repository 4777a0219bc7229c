//! Structural checks run on every result before it leaves the core.
//!
//! A failure here is a parser or compactor defect, never a property of
//! the tool's output.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::aggregate;
use crate::compact::expand_ranges;
use crate::domain::compact::{CompactChildren, CompactResult, Sampled};
use crate::domain::error::ValidationError;
use crate::domain::result::{CanonicalResult, Children};
use crate::domain::test_case::TestStatus;

type Check = Result<(), ValidationError>;

fn invented(field: &str) -> ValidationError {
    ValidationError::InventedField {
        field: field.to_string(),
    }
}

fn check_elapsed(key: impl FnOnce() -> String, elapsed: Option<f64>) -> Check {
    match elapsed {
        Some(e) if e < 0.0 => Err(ValidationError::NegativeElapsed { key: key() }),
        _ => Ok(()),
    }
}

/// Validate a canonical result's internal consistency.
pub fn validate_canonical(result: &CanonicalResult) -> Check {
    let derived = aggregate::counts(&result.children);
    if derived != result.counts {
        return Err(ValidationError::CountsMismatch {
            declared: format!("{:?}", result.counts),
            derived: format!("{derived:?}"),
        });
    }

    let derived_success = aggregate::success(&result.children) && result.failure_output.is_none();
    if derived_success != result.success {
        return Err(ValidationError::SuccessMismatch {
            declared: result.success,
            derived: derived_success,
        });
    }

    match &result.children {
        Children::Diagnostics { diagnostics, .. } => {
            if let Some(d) = diagnostics.iter().find(|d| d.location.line == Some(0)) {
                return Err(ValidationError::ZeroLine {
                    file: d.location.file.clone(),
                });
            }
        }
        Children::Tests {
            tests,
            package_failures,
        } => {
            let mut seen = HashSet::new();
            for t in tests {
                if !seen.insert(t.key()) {
                    return Err(ValidationError::DuplicateTestCase {
                        scope: t.scope.clone(),
                        name: t.name.clone(),
                    });
                }
                if t.captured_output.is_some() && t.status != TestStatus::Fail {
                    return Err(ValidationError::OutputOnNonFailure {
                        scope: t.scope.clone(),
                        name: t.name.clone(),
                        status: t.status.as_str().to_string(),
                    });
                }
                check_elapsed(|| format!("{}::{}", t.scope, t.name), t.elapsed)?;
            }
            let named: HashSet<&str> = tests.iter().map(|t| t.scope.as_str()).collect();
            for p in package_failures {
                if named.contains(p.scope.as_str()) {
                    return Err(ValidationError::PackageFailureShadowed {
                        scope: p.scope.clone(),
                    });
                }
                check_elapsed(|| p.scope.clone(), p.elapsed)?;
            }
        }
        Children::Blame { lines } => {
            if lines.iter().any(|l| l.line == 0) {
                return Err(invented("lines.line"));
            }
        }
        _ => {}
    }
    Ok(())
}

/// `sample` is a bounded sample of `source` (after `project`).
fn check_sample<S, T: PartialEq>(
    field: &str,
    sample: &Sampled<T>,
    source: &[S],
    project: impl Fn(&S) -> T,
) -> Check {
    if sample.original_len() != source.len() {
        return Err(invented(field));
    }
    let head_ok = sample
        .head
        .iter()
        .zip(source.iter())
        .all(|(kept, src)| *kept == project(src));
    let tail_start = source.len() - sample.tail.len();
    let tail_ok = sample
        .tail
        .iter()
        .zip(source[tail_start..].iter())
        .all(|(kept, src)| *kept == project(src));
    if head_ok && tail_ok {
        Ok(())
    } else {
        Err(invented(field))
    }
}

fn check_optional_sample<S, T: PartialEq>(
    field: &str,
    sample: Option<&Sampled<T>>,
    source: &[S],
    project: impl Fn(&S) -> T,
) -> Check {
    match sample {
        None if source.is_empty() => Ok(()),
        Some(s) if !source.is_empty() => check_sample(field, s, source, project),
        _ => Err(invented(field)),
    }
}

fn output_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

fn check_output(field: &str, sample: Option<&Sampled<String>>, source: Option<&str>) -> Check {
    match (sample, source) {
        (None, None) => Ok(()),
        (Some(s), Some(text)) => check_sample(field, s, &output_lines(text), String::clone),
        _ => Err(invented(field)),
    }
}

/// Validate that every compact field is a documented derivation of the
/// canonical result it claims to project.
pub fn validate_compact(compact: &CompactResult, canonical: &CanonicalResult) -> Check {
    if compact.kind() != canonical.kind() {
        return Err(ValidationError::KindMismatch {
            compact: compact.kind().as_str().to_string(),
            canonical: canonical.kind().as_str().to_string(),
        });
    }
    if compact.success != canonical.success {
        return Err(invented("success"));
    }
    if compact.counts != canonical.counts {
        return Err(invented("counts"));
    }
    if compact.context != canonical.context {
        return Err(invented("context"));
    }
    check_output(
        "failure_output",
        compact.failure_output.as_ref(),
        canonical.failure_output.as_deref(),
    )?;

    match (&compact.children, &canonical.children) {
        (
            CompactChildren::Diagnostics {
                diagnostics,
                raw_errors,
            },
            Children::Diagnostics {
                diagnostics: src_diags,
                raw_errors: src_raw,
            },
        ) => {
            check_optional_sample("diagnostics", diagnostics.as_ref(), src_diags, |d| {
                crate::domain::compact::CompactDiagnostic {
                    location: d.location.clone(),
                    severity: d.severity,
                    code: d.code.clone(),
                    message: d.message.clone(),
                }
            })?;
            check_optional_sample("raw_errors", raw_errors.as_ref(), src_raw, Clone::clone)
        }
        (
            CompactChildren::Tests { failures },
            Children::Tests {
                tests,
                package_failures,
            },
        ) => {
            let failing: Vec<_> = tests.iter().filter(|t| t.status == TestStatus::Fail).collect();
            if failures.len() != failing.len() + package_failures.len() {
                return Err(invented("failures"));
            }
            let (named, scoped) = failures.split_at(failing.len());
            for (kept, src) in named.iter().zip(&failing) {
                if kept.scope != src.scope || kept.name.as_deref() != Some(src.name.as_str()) {
                    return Err(invented("failures"));
                }
                check_output("failures.output", kept.output.as_ref(), src.captured_output.as_deref())?;
            }
            for (kept, src) in scoped.iter().zip(package_failures) {
                if kept.scope != src.scope || kept.name.is_some() {
                    return Err(invented("failures"));
                }
                check_output("failures.output", kept.output.as_ref(), src.output.as_deref())?;
            }
            Ok(())
        }
        (CompactChildren::Commits { commits }, Children::Commits { commits: src }) => {
            check_sample("commits", commits, src, |c| crate::domain::compact::CompactCommit {
                hash: c.hash.clone(),
                author: c.author.clone(),
                date: c.date.clone(),
                subject: c.subject.clone(),
            })
        }
        (CompactChildren::Changes { changes }, Children::Changes { changes: src }) => {
            let same = changes.len() == src.len()
                && changes.iter().zip(src).all(|(kept, c)| {
                    kept.path == c.path
                        && kept.old_path == c.old_path
                        && kept.status == c.status
                        && kept.additions == c.additions
                        && kept.deletions == c.deletions
                        && kept.binary == c.binary
                });
            if same {
                Ok(())
            } else {
                Err(invented("changes"))
            }
        }
        (CompactChildren::Blame { ranges }, Children::Blame { lines }) => {
            let mut expected: HashMap<&str, BTreeSet<u32>> = HashMap::new();
            for l in lines {
                expected.entry(l.commit.as_str()).or_default().insert(l.line);
            }
            if ranges.len() != expected.len() {
                return Err(invented("ranges"));
            }
            for range in ranges {
                let listed = expand_ranges(&range.lines).ok_or_else(|| invented("ranges"))?;
                if expected.get(range.commit.as_str()) != Some(&listed) {
                    return Err(invented("ranges"));
                }
            }
            Ok(())
        }
        (CompactChildren::Log { lines }, Children::Log { lines: src }) => {
            check_sample("lines", lines, src, Clone::clone)
        }
        (CompactChildren::Resources { changed }, Children::Resources { resources }) => {
            let expected: Vec<_> = resources.iter().filter(|r| r.action.is_change()).collect();
            if changed.len() == expected.len() && changed.iter().zip(expected).all(|(a, b)| a == b) {
                Ok(())
            } else {
                Err(invented("changed"))
            }
        }
        _ => Err(ValidationError::KindMismatch {
            compact: compact.kind().as_str().to_string(),
            canonical: canonical.kind().as_str().to_string(),
        }),
    }
}
