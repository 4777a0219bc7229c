//! Plain-text rendering of canonical and compact results.
//!
//! Rendering is a pure function of the result: the same result always
//! renders to the same text.

use crate::compact::blame_ranges;
use crate::domain::compact::{BlameRange, CompactChildren, CompactResult, Sampled};
use crate::domain::diagnostic::{Location, RawError};
use crate::domain::records::{ChangeStatus, LogLine, LogStream, ResourceAction, ResourceChange};
use crate::domain::result::{CanonicalResult, Children, Counts};
use crate::domain::session::Session;
use crate::domain::test_case::TestStatus;

fn plural(n: u32, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn location(loc: &Location) -> String {
    match (loc.line, loc.column) {
        (Some(line), Some(col)) => format!("{}:{}:{}", loc.file, line, col),
        (Some(line), None) => format!("{}:{}", loc.file, line),
        _ => loc.file.clone(),
    }
}

fn change_status(status: ChangeStatus) -> &'static str {
    match status {
        ChangeStatus::Added => "A",
        ChangeStatus::Modified => "M",
        ChangeStatus::Deleted => "D",
        ChangeStatus::Renamed => "R",
    }
}

fn resource_action(action: ResourceAction) -> &'static str {
    match action {
        ResourceAction::Created => "created",
        ResourceAction::Configured => "configured",
        ResourceAction::Unchanged => "unchanged",
        ResourceAction::Deleted => "deleted",
        ResourceAction::Other => "other",
    }
}

/// One-line summary of counts, e.g. `go-build: failed (1 error, 0 warnings)`.
pub fn summary_line(tool: &str, success: bool, counts: &Counts) -> String {
    let verdict = if success { "ok" } else { "failed" };
    let detail = match *counts {
        Counts::Diagnostics {
            errors,
            warnings,
            notes,
            helps,
            ..
        } => {
            let mut parts = vec![plural(errors, "error"), plural(warnings, "warning")];
            if notes > 0 {
                parts.push(plural(notes, "note"));
            }
            if helps > 0 {
                parts.push(format!("{helps} help"));
            }
            parts.join(", ")
        }
        Counts::Tests {
            passed,
            failed,
            skipped,
            running,
            package_failures,
            ..
        } => {
            let mut parts = vec![
                format!("{passed} passed"),
                format!("{failed} failed"),
                format!("{skipped} skipped"),
            ];
            if running > 0 {
                parts.push(format!("{running} unfinished"));
            }
            if package_failures > 0 {
                parts.push(plural(package_failures, "package failure"));
            }
            parts.join(", ")
        }
        Counts::Commits { total } => plural(total, "commit"),
        Counts::Changes {
            additions,
            deletions,
            total,
        } => format!("{}, +{additions} -{deletions}", plural(total, "file")),
        Counts::Blame { commits, total } => {
            format!("{} from {}", plural(total, "line"), plural(commits, "commit"))
        }
        Counts::Log { stderr, total } => format!("{}, {stderr} on stderr", plural(total, "line")),
        Counts::Resources { changed, total } => {
            format!("{} changed of {}", changed, plural(total, "resource"))
        }
    };
    format!("{tool}: {verdict} ({detail})")
}

fn push_raw_error(out: &mut String, e: &RawError) {
    match &e.scope {
        Some(scope) => out.push_str(&format!("[{scope}] {}\n", e.message)),
        None => out.push_str(&format!("{}\n", e.message)),
    }
}

fn push_log_line(out: &mut String, l: &LogLine) {
    let marker = match l.stream {
        LogStream::Stdout => ' ',
        LogStream::Stderr => '!',
    };
    out.push_str(&format!("{marker} {}\n", l.line));
}

fn push_resource(out: &mut String, r: &ResourceChange) {
    out.push_str(&format!("{}/{} {}\n", r.kind, r.name, resource_action(r.action)));
}

fn push_ranges(out: &mut String, ranges: &[BlameRange]) {
    for r in ranges {
        out.push_str(&format!("{}: lines {}\n", r.commit, r.lines));
    }
}

fn push_indented(out: &mut String, text: &str) {
    for line in text.lines() {
        out.push_str(&format!("    {line}\n"));
    }
}

fn push_sample<T>(out: &mut String, sample: &Sampled<T>, mut item: impl FnMut(&mut String, &T)) {
    for i in &sample.head {
        item(out, i);
    }
    if let Some(n) = sample.omitted {
        out.push_str(&format!("... {n} omitted ...\n"));
    }
    for i in &sample.tail {
        item(out, i);
    }
}

/// Render the full canonical result.
pub fn render_canonical(result: &CanonicalResult) -> String {
    let mut out = summary_line(&result.context.tool, result.success, &result.counts);
    out.push('\n');

    match &result.children {
        Children::Diagnostics {
            diagnostics,
            raw_errors,
        } => {
            for d in diagnostics {
                let code = d.code.as_deref().map(|c| format!("[{c}] ")).unwrap_or_default();
                out.push_str(&format!(
                    "{}: {}: {}{}\n",
                    location(&d.location),
                    d.severity.as_str(),
                    code,
                    d.message
                ));
                if let Some(s) = &d.suggestion {
                    out.push_str(&format!("    help: {s}\n"));
                }
            }
            for e in raw_errors {
                push_raw_error(&mut out, e);
            }
        }
        Children::Tests {
            tests,
            package_failures,
        } => {
            for t in tests {
                let status = match t.status {
                    TestStatus::Running => "RUNNING",
                    TestStatus::Pass => "PASS",
                    TestStatus::Fail => "FAIL",
                    TestStatus::Skip => "SKIP",
                };
                match t.elapsed {
                    Some(e) => out.push_str(&format!("{status} {}::{} ({e:.2}s)\n", t.scope, t.name)),
                    None => out.push_str(&format!("{status} {}::{}\n", t.scope, t.name)),
                }
                if let Some(o) = &t.captured_output {
                    push_indented(&mut out, o);
                }
            }
            for p in package_failures {
                out.push_str(&format!("FAIL {} (no tests ran)\n", p.scope));
                if let Some(o) = &p.output {
                    push_indented(&mut out, o);
                }
            }
        }
        Children::Commits { commits } => {
            for c in commits {
                out.push_str(&format!("{} {} {} {}\n", c.hash, c.date, c.author, c.subject));
                if let Some(body) = &c.body {
                    push_indented(&mut out, body);
                }
            }
        }
        Children::Changes { changes } => {
            for c in changes {
                let path = match &c.old_path {
                    Some(old) => format!("{old} -> {}", c.path),
                    None => c.path.clone(),
                };
                out.push_str(&format!(
                    "{} {path} +{} -{}\n",
                    change_status(c.status),
                    c.additions,
                    c.deletions
                ));
            }
        }
        Children::Blame { lines } => push_ranges(&mut out, &blame_ranges(lines)),
        Children::Log { lines } => {
            for l in lines {
                push_log_line(&mut out, l);
            }
        }
        Children::Resources { resources } => {
            for r in resources {
                push_resource(&mut out, r);
            }
        }
    }

    if let Some(f) = &result.failure_output {
        out.push_str("tool output:\n");
        push_indented(&mut out, f);
    }
    out
}

/// Render a compact result. Omission markers are shown where sampling
/// dropped items.
pub fn render_compact(result: &CompactResult) -> String {
    let mut out = summary_line(&result.context.tool, result.success, &result.counts);
    out.push('\n');

    match &result.children {
        CompactChildren::Diagnostics {
            diagnostics,
            raw_errors,
        } => {
            if let Some(sample) = diagnostics {
                push_sample(&mut out, sample, |out, d| {
                    let code = d.code.as_deref().map(|c| format!("[{c}] ")).unwrap_or_default();
                    out.push_str(&format!(
                        "{}: {}: {}{}\n",
                        location(&d.location),
                        d.severity.as_str(),
                        code,
                        d.message
                    ));
                });
            }
            if let Some(sample) = raw_errors {
                push_sample(&mut out, sample, push_raw_error);
            }
        }
        CompactChildren::Tests { failures } => {
            for f in failures {
                match &f.name {
                    Some(name) => out.push_str(&format!("FAIL {}::{name}\n", f.scope)),
                    None => out.push_str(&format!("FAIL {} (no tests ran)\n", f.scope)),
                }
                if let Some(o) = &f.output {
                    push_sample(&mut out, o, |out, line| out.push_str(&format!("    {line}\n")));
                }
            }
        }
        CompactChildren::Commits { commits } => {
            push_sample(&mut out, commits, |out, c| {
                out.push_str(&format!("{} {} {} {}\n", c.hash, c.date, c.author, c.subject));
            });
        }
        CompactChildren::Changes { changes } => {
            for c in changes {
                out.push_str(&format!(
                    "{} {} +{} -{}\n",
                    change_status(c.status),
                    c.path,
                    c.additions,
                    c.deletions
                ));
            }
        }
        CompactChildren::Blame { ranges } => push_ranges(&mut out, ranges),
        CompactChildren::Log { lines } => push_sample(&mut out, lines, push_log_line),
        CompactChildren::Resources { changed } => {
            for r in changed {
                push_resource(&mut out, r);
            }
        }
    }

    if let Some(f) = &result.failure_output {
        out.push_str("tool output:\n");
        push_sample(&mut out, f, |out, line| out.push_str(&format!("    {line}\n")));
    }
    out
}

pub fn render_session(session: &Session) -> String {
    let mut out = format!("{}: {}", session.kind.subcommand(), session.state.as_str());
    if let Some(r) = &session.current_ref {
        out.push_str(&format!(" at {r}"));
    }
    out.push('\n');
    for path in &session.conflict_set {
        out.push_str(&format!("conflict: {path}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compact::{compact, CompactionConfig};
    use crate::domain::diagnostic::{Diagnostic, Severity};
    use crate::domain::raw::RawOutput;
    use crate::domain::records::BlameLine;
    use crate::domain::result::{InputFormat, InvocationContext};

    fn ctx(tool: &str) -> InvocationContext {
        InvocationContext::from_raw(tool, &RawOutput::stdout("", 0), InputFormat::Text)
    }

    #[test]
    fn test_blame_renders_ranges() {
        let lines = [1, 2, 3, 7, 9, 10]
            .into_iter()
            .map(|line| BlameLine {
                line,
                commit: "1a2b3c4".into(),
                author: "Ada".into(),
                summary: "init".into(),
            })
            .collect();
        let result = CanonicalResult::new(Children::Blame { lines }, ctx("git-blame"));
        let text = render_canonical(&result);
        assert!(text.contains("1a2b3c4: lines 1-3, 7, 9-10"));
        assert_eq!(text, render_compact(&compact(&result, &CompactionConfig::default())));
    }

    #[test]
    fn test_diagnostics_render_deterministically() {
        let result = CanonicalResult::new(
            Children::Diagnostics {
                diagnostics: vec![Diagnostic::new(
                    Location::new("main.go", 10, Some(5)),
                    Severity::Error,
                    "undefined: foo",
                )],
                raw_errors: vec![],
            },
            ctx("go-build"),
        );
        let text = render_canonical(&result);
        assert_eq!(
            text,
            "go-build: failed (1 error, 0 warnings)\nmain.go:10:5: error: undefined: foo\n"
        );
        assert_eq!(text, render_canonical(&result.clone()));
    }

    #[test]
    fn test_compact_shows_omission_marker() {
        let diagnostics = (1..=20)
            .map(|i| Diagnostic::new(Location::new("a.ts", i, None), Severity::Warning, "w"))
            .collect();
        let result = CanonicalResult::new(
            Children::Diagnostics {
                diagnostics,
                raw_errors: vec![],
            },
            ctx("tsc"),
        );
        let text = render_compact(&compact(&result, &CompactionConfig::default()));
        assert!(text.starts_with("tsc: ok (0 errors, 20 warnings)"));
        assert!(text.contains("... 5 omitted ..."));
    }
}
