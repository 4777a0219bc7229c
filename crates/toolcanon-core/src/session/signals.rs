//! Facts read from one session step's output.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::raw::RawOutput;

static CONFLICT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^CONFLICT \((?P<reason>[^)]+)\): (?P<detail>.+)$").expect("valid conflict regex")
});

static BISECTING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Bisecting: (?P<remaining>\d+) revisions? left to test").expect("valid bisecting regex")
});

static BISECT_CURRENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(?P<sha>[0-9a-f]{7,64})\] ").expect("valid bisect ref regex"));

static FIRST_BAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<sha>[0-9a-f]{7,64}) is the first bad commit").expect("valid first bad regex")
});

static COULD_NOT_APPLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:error: )?[Cc]ould not apply (?P<sha>[0-9a-f]{7,64})").expect("valid apply regex")
});

static STOPPED_AT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Stopped at (?P<sha>[0-9a-f]{7,64})").expect("valid stopped regex")
});

/// `[main 1a2b3c4] subject` printed by a successful commit or cherry-pick.
static COMMIT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?:detached HEAD |[^\s\]]+ )(?P<sha>[0-9a-f]{7,64})\] ").expect("valid commit regex")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signals {
    /// Paths from `CONFLICT (...)` lines, verbatim.
    pub conflicts: Vec<String>,
    pub automatic_merge_failed: bool,
    pub fast_forward: bool,
    pub merge_made: bool,
    pub up_to_date: bool,
    pub rebase_done: bool,
    pub remaining: Option<u32>,
    pub bisect_ref: Option<String>,
    pub first_bad: Option<String>,
    pub could_not_apply: Option<String>,
    pub stopped_at: Option<String>,
    pub committed: Option<String>,
    /// The tool said there was nothing to operate on (abort with no flow).
    pub nothing_in_progress: bool,
}

impl Signals {
    /// Whether the output confirms that the flow moved.
    pub fn confirms_transition(&self) -> bool {
        !self.conflicts.is_empty()
            || self.automatic_merge_failed
            || self.fast_forward
            || self.merge_made
            || self.up_to_date
            || self.rebase_done
            || self.remaining.is_some()
            || self.first_bad.is_some()
            || self.could_not_apply.is_some()
            || self.stopped_at.is_some()
            || self.committed.is_some()
    }

    pub fn finished(&self) -> bool {
        self.fast_forward
            || self.merge_made
            || self.up_to_date
            || self.rebase_done
            || self.first_bad.is_some()
            || self.committed.is_some()
    }
}

/// The conflicted path in a `CONFLICT (...)` line's detail.
fn conflict_path(detail: &str) -> Option<String> {
    if let Some((_, path)) = detail.split_once("Merge conflict in ") {
        return Some(path.trim().to_string());
    }
    detail.split_whitespace().next().map(str::to_string)
}

/// Paths from `git diff --name-only --diff-filter=U`, one per line. A
/// failed listing yields nothing.
pub fn unmerged_paths(raw: &RawOutput) -> BTreeSet<String> {
    if raw.exited_nonzero() {
        return BTreeSet::new();
    }
    raw.stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Scan both streams of a step's output.
pub fn read(raw: &RawOutput) -> Signals {
    let mut signals = Signals::default();

    for line in raw.combined().lines() {
        let line = line.trim();

        if let Some(caps) = CONFLICT.captures(line) {
            if let Some(path) = conflict_path(&caps["detail"]) {
                if !signals.conflicts.contains(&path) {
                    signals.conflicts.push(path);
                }
            }
        } else if line.starts_with("Automatic merge failed") {
            signals.automatic_merge_failed = true;
        } else if line == "Fast-forward" || line.starts_with("Fast-forwarded ") {
            signals.fast_forward = true;
        } else if line.starts_with("Merge made by") {
            signals.merge_made = true;
        } else if line.starts_with("Already up to date")
            || line.starts_with("Already up-to-date")
            || (line.starts_with("Current branch ") && line.ends_with(" is up to date."))
        {
            signals.up_to_date = true;
        } else if line.starts_with("Successfully rebased") {
            signals.rebase_done = true;
        } else if let Some(caps) = BISECTING.captures(line) {
            signals.remaining = caps["remaining"].parse().ok();
        } else if let Some(caps) = FIRST_BAD.captures(line) {
            signals.first_bad = Some(caps["sha"].to_string());
        } else if let Some(caps) = COULD_NOT_APPLY.captures(line) {
            signals.could_not_apply = Some(caps["sha"].to_string());
        } else if let Some(caps) = STOPPED_AT.captures(line) {
            signals.stopped_at = Some(caps["sha"].to_string());
        } else if let Some(caps) = COMMIT_LINE.captures(line) {
            signals.committed = Some(caps["sha"].to_string());
        } else if let Some(caps) = BISECT_CURRENT.captures(line) {
            signals.bisect_ref = Some(caps["sha"].to_string());
        } else if line.contains("no merge to abort")
            || line.contains("No rebase in progress")
            || line.contains("no cherry-pick or revert in progress")
            || line.contains("not bisecting")
        {
            signals.nothing_in_progress = true;
        }
    }

    signals
}
