//! Formatter check mode: `gofmt -l`, `prettier --check`, `cargo fmt --check`.
//!
//! Formatters report files, not positions. Every listed file becomes a
//! file-only warning; syntax errors that stop the formatter are errors.

use std::sync::LazyLock;

use regex::Regex;

use super::{DiagnosticAdapter, Extraction};
use crate::domain::diagnostic::{Diagnostic, Location, RawError, RawErrorKind, Severity};
use crate::domain::raw::RawOutput;
use crate::domain::result::InputFormat;

pub const NEEDS_FORMATTING: &str = "needs formatting";

/// `[error] src/a.ts: SyntaxError: ... (3:5)`
static PRETTIER_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[error\] (?P<file>[^:]+): (?P<message>.+?)(?: \((?P<line>\d+):(?P<col>\d+)\))?$")
        .expect("valid prettier error regex")
});

/// `Diff in /repo/src/main.rs at line 3:` (rustfmt --check)
static RUSTFMT_DIFF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Diff in (?P<file>.+?)(?::(?P<line>\d+))?(?: at line (?P<at>\d+))?:$")
        .expect("valid rustfmt diff regex")
});

const SUMMARY_PREFIXES: &[&str] = &[
    "Checking formatting",
    "All matched files use Prettier",
    "Code style issues",
    "[warn] Code style issues",
    "Error occurred when checking code style",
];

fn looks_like_path(line: &str) -> bool {
    !line.contains(' ') && line.contains('.') && !line.starts_with(['+', '-', '@', '['])
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FmtCheckAdapter;

impl DiagnosticAdapter for FmtCheckAdapter {
    fn tool(&self) -> &str {
        "fmt-check"
    }

    fn parse_text(&self, raw: &RawOutput) -> Extraction {
        let mut out = Extraction::empty(InputFormat::Text);
        let mut seen = std::collections::HashSet::new();
        let mut flag = |file: &str, out: &mut Extraction| {
            if seen.insert(file.to_string()) {
                out.diagnostics.push(Diagnostic::new(
                    Location::file_only(file),
                    Severity::Warning,
                    NEEDS_FORMATTING,
                ));
            }
        };

        for line in raw.combined().lines() {
            let line = line.trim_end();
            if line.is_empty() || SUMMARY_PREFIXES.iter().any(|p| line.starts_with(p)) {
                continue;
            }

            if let Some(file) = line.strip_prefix("[warn] ") {
                flag(file.trim(), &mut out);
                continue;
            }
            if let Some(caps) = PRETTIER_ERROR.captures(line) {
                let message = caps["message"].to_string();
                match caps.name("line").and_then(|l| l.as_str().parse().ok()) {
                    Some(line_no) => {
                        let col = caps.name("col").and_then(|c| c.as_str().parse().ok());
                        out.diagnostics.push(Diagnostic::new(
                            Location::new(&caps["file"], line_no, col),
                            Severity::Error,
                            message,
                        ));
                    }
                    None => out.diagnostics.push(Diagnostic::new(
                        Location::file_only(&caps["file"]),
                        Severity::Error,
                        message,
                    )),
                }
                continue;
            }
            if let Some(caps) = RUSTFMT_DIFF.captures(line) {
                flag(&caps["file"], &mut out);
                continue;
            }
            if let Some(rest) = line.strip_prefix("error: ") {
                out.raw_errors.push(RawError::new(RawErrorKind::Other, rest));
                continue;
            }
            if looks_like_path(line) {
                flag(line, &mut out);
            }
        }
        out
    }
}
