//! `cargo build|check|clippy` adapter.
//!
//! JSON mode reads `--message-format=json` records; text mode reads the
//! human renderer, where the location sits on the ` --> ` line after the
//! header.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::{json_lines, DiagnosticAdapter, Extraction};
use crate::domain::diagnostic::{Diagnostic, Location, RawError, RawErrorKind, Severity};
use crate::domain::raw::RawOutput;
use crate::domain::result::InputFormat;

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<level>error|warning|note|help)(?:\[(?P<code>[^\]]+)\])?: (?P<message>.+)$")
        .expect("valid cargo header regex")
});

static ARROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*--> (?P<file>.+?):(?P<line>\d+):(?P<col>\d+)$").expect("valid cargo arrow regex")
});

static HELP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:= )?help: (?P<message>.+)$").expect("valid cargo help regex")
});

/// Headers that summarize rather than report.
const SUMMARY_MARKERS: &[&str] = &[
    "aborting due to",
    "could not compile",
    "generated ",
    "warning emitted",
    "warnings emitted",
    "build failed",
    "error emitted",
    "errors emitted",
];

const LINKER_MARKERS: &[&str] = &["linking with", "undefined reference", "could not find native static library"];

const MODULE_MARKERS: &[&str] = &[
    "no matching package named",
    "failed to select a version",
    "could not find `Cargo.toml`",
    "failed to load manifest",
    "failed to get",
    "unresolved import",
];

/// Cargo's status lines, right-aligned verbs on stderr.
const PROGRESS_VERBS: &[&str] = &[
    "Compiling",
    "Checking",
    "Finished",
    "Blocking",
    "Updating",
    "Locking",
    "Adding",
    "Downloading",
    "Downloaded",
    "Fresh",
    "Documenting",
    "Running",
];

#[derive(Debug, Deserialize)]
struct Record {
    reason: String,
    #[serde(default)]
    message: Option<CompilerMessage>,
}

#[derive(Debug, Deserialize)]
struct CompilerMessage {
    message: String,
    #[serde(default)]
    code: Option<Code>,
    #[serde(default)]
    level: String,
    #[serde(default)]
    spans: Vec<Span>,
    #[serde(default)]
    children: Vec<CompilerMessage>,
}

#[derive(Debug, Deserialize)]
struct Code {
    code: String,
}

#[derive(Debug, Deserialize)]
struct Span {
    file_name: String,
    line_start: u32,
    column_start: u32,
    #[serde(default)]
    is_primary: bool,
    #[serde(default)]
    suggested_replacement: Option<String>,
}

fn is_summary(message: &str) -> bool {
    SUMMARY_MARKERS.iter().any(|m| message.contains(m))
}

fn unlocated(message: &str) -> RawError {
    let kind = if LINKER_MARKERS.iter().any(|m| message.contains(m)) {
        RawErrorKind::Linker
    } else if MODULE_MARKERS.iter().any(|m| message.contains(m)) {
        RawErrorKind::Module
    } else {
        RawErrorKind::Other
    };
    RawError::new(kind, message)
}

fn suggestion_of(msg: &CompilerMessage) -> Option<String> {
    let help = msg.children.iter().find(|c| c.level == "help")?;
    let replacement = help
        .spans
        .iter()
        .find_map(|s| s.suggested_replacement.as_deref())
        .filter(|r| !r.is_empty());
    Some(match replacement {
        Some(r) => format!("{}: `{}`", help.message, r),
        None => help.message.clone(),
    })
}

fn map_compiler_message(msg: &CompilerMessage) -> Option<Result<Diagnostic, RawError>> {
    let severity = match msg.level.as_str() {
        "failure-note" => return None,
        level if level.starts_with("error") => Severity::Error,
        level => Severity::from_label(level),
    };
    if is_summary(&msg.message) {
        return None;
    }

    let primary = msg
        .spans
        .iter()
        .find(|s| s.is_primary)
        .or_else(|| msg.spans.first());
    let Some(span) = primary else {
        return (severity == Severity::Error).then(|| Err(unlocated(&msg.message)));
    };

    let mut diag = Diagnostic::new(
        Location::new(span.file_name.clone(), span.line_start, Some(span.column_start)),
        severity,
        msg.message.clone(),
    );
    if let Some(code) = &msg.code {
        diag = diag.with_code(code.code.clone());
    }
    if let Some(s) = suggestion_of(msg) {
        diag = diag.with_suggestion(s);
    }
    Some(Ok(diag))
}

/// Header seen in text mode, waiting for its ` --> ` line.
struct Pending {
    severity: Severity,
    code: Option<String>,
    message: String,
    location: Option<Location>,
    suggestion: Option<String>,
}

impl Pending {
    fn finish(self, out: &mut Extraction) {
        match self.location {
            Some(location) => {
                let mut diag = Diagnostic::new(location, self.severity, self.message);
                diag.code = self.code;
                diag.suggestion = self.suggestion;
                out.diagnostics.push(diag);
            }
            None if self.severity == Severity::Error => out.raw_errors.push(unlocated(&self.message)),
            None => {}
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CargoAdapter;

impl DiagnosticAdapter for CargoAdapter {
    fn tool(&self) -> &str {
        "cargo"
    }

    fn parse_json(&self, raw: &RawOutput) -> Option<Extraction> {
        let mut recognized = false;
        let mut out = Extraction::empty(InputFormat::Json);

        for record in json_lines::<Record>(&raw.stdout) {
            recognized = true;
            if record.reason != "compiler-message" {
                continue;
            }
            match record.message.as_ref().and_then(map_compiler_message) {
                Some(Ok(diag)) => out.diagnostics.push(diag),
                Some(Err(raw_error)) => out.raw_errors.push(raw_error),
                None => {}
            }
        }

        recognized.then_some(out)
    }

    fn parse_text(&self, raw: &RawOutput) -> Extraction {
        let mut out = Extraction::empty(InputFormat::Text);
        let mut pending: Option<Pending> = None;

        for line in raw.combined().lines() {
            let line = line.trim_end();

            if let Some(caps) = HEADER.captures(line) {
                if let Some(p) = pending.take() {
                    p.finish(&mut out);
                }
                let message = caps["message"].to_string();
                let level = &caps["level"];
                if is_summary(&message) || matches!(level, "note" | "help") {
                    continue;
                }
                pending = Some(Pending {
                    severity: Severity::from_label(level),
                    code: caps.name("code").map(|c| c.as_str().to_string()),
                    message,
                    location: None,
                    suggestion: None,
                });
                continue;
            }

            let Some(p) = pending.as_mut() else {
                continue;
            };
            if p.location.is_none() {
                if let Some(caps) = ARROW.captures(line) {
                    let line_no = caps["line"].parse().unwrap_or(0);
                    let col = caps["col"].parse().ok();
                    p.location = Some(Location::new(&caps["file"], line_no, col));
                    continue;
                }
            }
            if p.suggestion.is_none() {
                if let Some(caps) = HELP.captures(line) {
                    p.suggestion = Some(caps["message"].to_string());
                }
            }
        }

        if let Some(p) = pending.take() {
            p.finish(&mut out);
        }
        out
    }

    fn is_noise(&self, line: &str) -> bool {
        let verb = line.split_whitespace().next().unwrap_or_default();
        PROGRESS_VERBS.contains(&verb)
    }
}
