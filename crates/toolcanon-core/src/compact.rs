//! Compaction: bounded, declared-lossy projection of canonical results.
//!
//! Each entity kind has a fixed rule set (see [`compact`]). Every rule
//! either copies a field verbatim or applies one of the four
//! [`Strategy`] rules, and the rules applied are listed in
//! [`CompactResult::strategies`].
//!
//! [`recompact`] applies the same bounds to an already-compact result; it
//! never grows a field, and recompacting with the same config is a no-op.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::compact::{
    BlameRange, CompactChange, CompactChildren, CompactCommit, CompactDiagnostic,
    CompactFailure, CompactResult, Sampled, Strategy,
};
use crate::domain::records::BlameLine;
use crate::domain::result::{CanonicalResult, Children};
use crate::domain::test_case::TestStatus;
use crate::obs;

/// Head/tail sizes for bounded sampling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompactionConfig {
    /// Leading children kept from a long child list.
    pub item_head: usize,
    /// Trailing children kept from a long child list.
    pub item_tail: usize,
    /// Leading lines kept from captured output.
    pub output_head: usize,
    /// Trailing lines kept from captured output.
    pub output_tail: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            item_head: 10,
            item_tail: 5,
            output_head: 20,
            output_tail: 10,
        }
    }
}

/// Keep `head` leading and `tail` trailing items when the sequence is
/// longer than `head + tail`; otherwise keep everything with no marker.
pub fn bounded_sample<T: Clone>(items: &[T], head: usize, tail: usize) -> Sampled<T> {
    if items.len() <= head.saturating_add(tail) {
        return Sampled::whole(items.to_vec());
    }
    Sampled {
        head: items[..head].to_vec(),
        omitted: Some(items.len() - head - tail),
        tail: items[items.len() - tail..].to_vec(),
    }
}

/// [`bounded_sample`] over the lines of a text blob.
pub fn bounded_sample_lines(text: &str, head: usize, tail: usize) -> Sampled<String> {
    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    bounded_sample(&lines, head, tail)
}

/// Re-apply bounds to an existing sample without ever growing it.
pub fn resample<T: Clone>(sample: &Sampled<T>, head: usize, tail: usize) -> Sampled<T> {
    let Some(omitted) = sample.omitted else {
        return bounded_sample(&sample.head, head, tail);
    };
    if sample.head.len() <= head && sample.tail.len() <= tail {
        return sample.clone();
    }
    let new_head: Vec<T> = sample.head.iter().take(head).cloned().collect();
    let skip = sample.tail.len().saturating_sub(tail);
    let new_tail: Vec<T> = sample.tail.iter().skip(skip).cloned().collect();
    let dropped = (sample.head.len() - new_head.len()) + skip;
    Sampled {
        head: new_head,
        omitted: Some(omitted + dropped),
        tail: new_tail,
    }
}

/// Collapse line numbers into sorted closed ranges: `[1,2,3,7,9,10]`
/// becomes `"1-3, 7, 9-10"`.
pub fn range_compress(lines: &[u32]) -> String {
    let sorted: BTreeSet<u32> = lines.iter().copied().collect();
    let mut ranges: Vec<(u32, u32)> = Vec::new();
    for n in sorted {
        match ranges.last_mut() {
            Some((_, end)) if *end + 1 == n => *end = n,
            _ => ranges.push((n, n)),
        }
    }
    ranges
        .into_iter()
        .map(|(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Inverse of [`range_compress`]. `None` if the text is not a range list.
pub fn expand_ranges(text: &str) -> Option<BTreeSet<u32>> {
    let mut out = BTreeSet::new();
    for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: u32 = start.trim().parse().ok()?;
                let end: u32 = end.trim().parse().ok()?;
                if start > end {
                    return None;
                }
                out.extend(start..=end);
            }
            None => {
                out.insert(part.parse().ok()?);
            }
        }
    }
    Some(out)
}

/// Group blame lines by commit in first-appearance order.
pub(crate) fn blame_ranges(lines: &[BlameLine]) -> Vec<BlameRange> {
    let mut order: Vec<&BlameLine> = Vec::new();
    let mut numbers: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
    for line in lines {
        let entry = numbers.entry(line.commit.as_str()).or_default();
        if entry.is_empty() {
            order.push(line);
        }
        entry.push(line.line);
    }
    order
        .into_iter()
        .map(|first| BlameRange {
            commit: first.commit.clone(),
            author: first.author.clone(),
            summary: first.summary.clone(),
            lines: range_compress(
                numbers
                    .get(first.commit.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or_default(),
            ),
        })
        .collect()
}

fn declare(pairs: &[(&str, Strategy)]) -> BTreeMap<String, Strategy> {
    pairs.iter().map(|(k, s)| (k.to_string(), *s)).collect()
}

fn non_empty_sample<T: Clone>(items: &[T], cfg: &CompactionConfig) -> Option<Sampled<T>> {
    (!items.is_empty()).then(|| bounded_sample(items, cfg.item_head, cfg.item_tail))
}

/// Project a canonical result under the per-kind rules:
///
/// | kind | rule |
/// |---|---|
/// | diagnostics | omitted when empty; suggestion elided; bounded sample |
/// | tests | failing tests and package failures only; output sampled per line |
/// | commits | bounded sample; body elided |
/// | changes | patch elided |
/// | blame | line numbers range-compressed per commit |
/// | log | bounded sample |
/// | resources | changed resources only |
pub fn compact(result: &CanonicalResult, cfg: &CompactionConfig) -> CompactResult {
    let sample_output =
        |text: &str| bounded_sample_lines(text, cfg.output_head, cfg.output_tail);

    let (children, mut strategies) = match &result.children {
        Children::Diagnostics {
            diagnostics,
            raw_errors,
        } => {
            let slim: Vec<CompactDiagnostic> = diagnostics
                .iter()
                .map(|d| CompactDiagnostic {
                    location: d.location.clone(),
                    severity: d.severity,
                    code: d.code.clone(),
                    message: d.message.clone(),
                })
                .collect();
            (
                CompactChildren::Diagnostics {
                    diagnostics: non_empty_sample(&slim, cfg),
                    raw_errors: non_empty_sample(raw_errors, cfg),
                },
                declare(&[
                    ("diagnostics", Strategy::BoundedSample),
                    ("diagnostics.suggestion", Strategy::ElideDetail),
                    ("raw_errors", Strategy::BoundedSample),
                ]),
            )
        }
        Children::Tests {
            tests,
            package_failures,
        } => {
            let failed_tests = tests
                .iter()
                .filter(|t| t.status == TestStatus::Fail)
                .map(|t| CompactFailure {
                    scope: t.scope.clone(),
                    name: Some(t.name.clone()),
                    elapsed: t.elapsed,
                    output: t.captured_output.as_deref().map(sample_output),
                });
            let failed_scopes = package_failures.iter().map(|p| CompactFailure {
                scope: p.scope.clone(),
                name: None,
                elapsed: p.elapsed,
                output: p.output.as_deref().map(sample_output),
            });
            (
                CompactChildren::Tests {
                    failures: failed_tests.chain(failed_scopes).collect(),
                },
                declare(&[
                    ("failures", Strategy::FilterThenKeep),
                    ("failures.output", Strategy::BoundedSample),
                ]),
            )
        }
        Children::Commits { commits } => {
            let slim: Vec<CompactCommit> = commits
                .iter()
                .map(|c| CompactCommit {
                    hash: c.hash.clone(),
                    author: c.author.clone(),
                    date: c.date.clone(),
                    subject: c.subject.clone(),
                })
                .collect();
            (
                CompactChildren::Commits {
                    commits: bounded_sample(&slim, cfg.item_head, cfg.item_tail),
                },
                declare(&[
                    ("commits", Strategy::BoundedSample),
                    ("commits.body", Strategy::ElideDetail),
                ]),
            )
        }
        Children::Changes { changes } => (
            CompactChildren::Changes {
                changes: changes
                    .iter()
                    .map(|c| CompactChange {
                        path: c.path.clone(),
                        old_path: c.old_path.clone(),
                        status: c.status,
                        additions: c.additions,
                        deletions: c.deletions,
                        binary: c.binary,
                    })
                    .collect(),
            },
            declare(&[("changes.patch", Strategy::ElideDetail)]),
        ),
        Children::Blame { lines } => (
            CompactChildren::Blame {
                ranges: blame_ranges(lines),
            },
            declare(&[("ranges", Strategy::RangeCompress)]),
        ),
        Children::Log { lines } => (
            CompactChildren::Log {
                lines: bounded_sample(lines, cfg.item_head, cfg.item_tail),
            },
            declare(&[("lines", Strategy::BoundedSample)]),
        ),
        Children::Resources { resources } => (
            CompactChildren::Resources {
                changed: resources
                    .iter()
                    .filter(|r| r.action.is_change())
                    .cloned()
                    .collect(),
            },
            declare(&[("changed", Strategy::FilterThenKeep)]),
        ),
    };

    let failure_output = result.failure_output.as_deref().map(sample_output);
    if failure_output.is_some() {
        strategies.insert("failure_output".to_string(), Strategy::BoundedSample);
    }

    let compacted = CompactResult {
        success: result.success,
        counts: result.counts,
        children,
        context: result.context.clone(),
        failure_output,
        strategies,
    };
    obs::emit_compact_applied(
        &result.context.tool,
        result.kind().as_str(),
        result.children.len(),
        kept_children(&compacted.children),
    );
    compacted
}

/// Apply `cfg` to an already-compact result.
pub fn recompact(result: &CompactResult, cfg: &CompactionConfig) -> CompactResult {
    let children = match &result.children {
        CompactChildren::Diagnostics {
            diagnostics,
            raw_errors,
        } => CompactChildren::Diagnostics {
            diagnostics: diagnostics
                .as_ref()
                .map(|s| resample(s, cfg.item_head, cfg.item_tail)),
            raw_errors: raw_errors
                .as_ref()
                .map(|s| resample(s, cfg.item_head, cfg.item_tail)),
        },
        CompactChildren::Tests { failures } => CompactChildren::Tests {
            failures: failures
                .iter()
                .map(|f| CompactFailure {
                    output: f
                        .output
                        .as_ref()
                        .map(|o| resample(o, cfg.output_head, cfg.output_tail)),
                    ..f.clone()
                })
                .collect(),
        },
        CompactChildren::Commits { commits } => CompactChildren::Commits {
            commits: resample(commits, cfg.item_head, cfg.item_tail),
        },
        CompactChildren::Log { lines } => CompactChildren::Log {
            lines: resample(lines, cfg.item_head, cfg.item_tail),
        },
        other => other.clone(),
    };

    CompactResult {
        children,
        failure_output: result
            .failure_output
            .as_ref()
            .map(|o| resample(o, cfg.output_head, cfg.output_tail)),
        ..result.clone()
    }
}

/// Number of child records retained in a compact projection.
pub fn kept_children(children: &CompactChildren) -> usize {
    match children {
        CompactChildren::Diagnostics {
            diagnostics,
            raw_errors,
        } => {
            diagnostics.as_ref().map_or(0, |s| s.kept().count())
                + raw_errors.as_ref().map_or(0, |s| s.kept().count())
        }
        CompactChildren::Tests { failures } => failures.len(),
        CompactChildren::Commits { commits } => commits.kept().count(),
        CompactChildren::Changes { changes } => changes.len(),
        CompactChildren::Blame { ranges } => ranges.len(),
        CompactChildren::Log { lines } => lines.kept().count(),
        CompactChildren::Resources { changed } => changed.len(),
    }
}
