//! Line-oriented diagnostic extraction, parameterized per tool.
//!
//! A [`TextRules`] value is the whole per-tool configuration: location
//! patterns plus the allow/deny markers used to classify lines that carry
//! no location. Lines are never classified by shape alone; a line that
//! matches no rule is ignored, which keeps progress chatter like
//! `go: downloading ...` out of the error count.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{DiagnosticAdapter, Extraction};
use crate::domain::diagnostic::{Diagnostic, Location, RawError, RawErrorKind, Severity};
use crate::domain::raw::RawOutput;
use crate::domain::result::InputFormat;

/// `file:line[:col]: message` (Go toolchain).
static GO_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>[^\s:][^:]*\.[A-Za-z0-9_]+):(?P<line>\d+)(?::(?P<col>\d+))?: (?P<message>.+)$")
        .expect("valid go location regex")
});

/// `file(line,col): error TS1234: message` (tsc default reporter).
static TSC_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<file>[^\s(][^(]*)\((?P<line>\d+),(?P<col>\d+)\): (?P<severity>error|warning|message) (?P<code>TS\d+): (?P<message>.+)$",
    )
    .expect("valid tsc location regex")
});

/// `file:line:col - error TS1234: message` (tsc --pretty).
static TSC_PRETTY_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<file>[^\s:][^:]*):(?P<line>\d+):(?P<col>\d+) - (?P<severity>error|warning|message) (?P<code>TS\d+): (?P<message>.+)$",
    )
    .expect("valid tsc pretty location regex")
});

static TSC_UNLOCATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^error (?P<code>TS\d+): (?P<message>.+)$").expect("valid tsc unlocated regex")
});

/// `file:line[:col]: severity: message [code]` (gcc, clang, mypy).
static GNU_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<file>[^\s:][^:]*):(?P<line>\d+):(?:(?P<col>\d+):)? (?P<severity>fatal error|error|warning|note|help): (?P<message>.+?)(?: \[(?P<code>[^\]]+)\])?$",
    )
    .expect("valid gnu location regex")
});

static GNU_UNLOCATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[\w.+-]+: )?(?:fatal )?error: (?P<message>.+)$")
        .expect("valid gnu unlocated regex")
});

/// Per-tool configuration for [`TextAdapter`].
#[derive(Debug, Clone)]
pub struct TextRules {
    /// Location patterns, tried in order. Named groups: `file`, `line`,
    /// `message`, and optionally `col`, `severity`, `code`.
    pub locations: Vec<Regex>,
    /// Severity for located lines with no `severity` group.
    pub default_severity: Severity,
    /// Prefix of a package marker line (`# example.com/pkg`). Unlocated
    /// lines after a marker become package raw errors.
    pub package_marker: Option<String>,
    pub linker_markers: Vec<String>,
    pub module_markers: Vec<String>,
    /// Pattern for unlocated error lines. Groups: `message`, optional `code`.
    pub unlocated_error: Option<Regex>,
    /// Lines starting with these are never classified.
    pub ignore_prefixes: Vec<String>,
    /// Located messages that are summaries rather than findings.
    pub ignore_messages: Vec<String>,
    /// Indented lines right after a diagnostic extend its message.
    pub indented_continuations: bool,
}

/// A marker matches at the start of a line or after a space, so `ld:` does
/// not fire inside `build:`.
fn has_marker(line: &str, marker: &str) -> bool {
    line.starts_with(marker)
        || line
            .match_indices(marker)
            .any(|(i, _)| line[..i].ends_with(' '))
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl TextRules {
    /// `go build` / `go vet` / `go install`.
    pub fn go() -> Self {
        Self {
            locations: vec![GO_LOCATION.clone()],
            default_severity: Severity::Error,
            package_marker: Some("# ".to_string()),
            linker_markers: strings(&[
                "/usr/bin/ld:",
                "ld:",
                "collect2:",
                "undefined reference",
                "relocation target",
                "running gcc failed",
            ]),
            module_markers: strings(&[
                "go: ",
                "no required module provides package",
                "cannot find module",
                "cannot find package",
                "missing go.sum entry",
                "go.mod file not found",
                "is not in std",
                "is not in GOROOT",
            ]),
            unlocated_error: None,
            ignore_prefixes: strings(&[
                "go: downloading",
                "go: finding",
                "go: extracting",
                "go: found",
                "go: added",
                "go: upgraded",
                "go: to add module requirements",
                "go: warning:",
            ]),
            ignore_messages: strings(&["too many errors"]),
            indented_continuations: true,
        }
    }

    /// `tsc --noEmit`, both default and pretty reporters.
    pub fn tsc() -> Self {
        Self {
            locations: vec![TSC_LOCATION.clone(), TSC_PRETTY_LOCATION.clone()],
            default_severity: Severity::Error,
            package_marker: None,
            linker_markers: Vec::new(),
            module_markers: Vec::new(),
            unlocated_error: Some(TSC_UNLOCATED.clone()),
            ignore_prefixes: strings(&["Found ", "Watching for file changes"]),
            ignore_messages: Vec::new(),
            indented_continuations: true,
        }
    }

    /// gcc, clang, mypy and other GNU-format reporters.
    pub fn gnu() -> Self {
        Self {
            locations: vec![GNU_LOCATION.clone()],
            default_severity: Severity::Warning,
            package_marker: None,
            linker_markers: strings(&[
                "/usr/bin/ld:",
                "ld:",
                "collect2:",
                "undefined reference",
                "ld.lld:",
            ]),
            module_markers: strings(&["Cannot find implementation or library stub"]),
            unlocated_error: Some(GNU_UNLOCATED.clone()),
            ignore_prefixes: strings(&["Found ", "Success:", "compilation terminated"]),
            ignore_messages: Vec::new(),
            indented_continuations: false,
        }
    }

    /// Whether `line` is skipped before any classification.
    pub fn ignores(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        self.ignore_prefixes.iter().any(|p| trimmed.starts_with(p.as_str()))
    }

    fn match_location(&self, line: &str) -> Option<Diagnostic> {
        self.locations
            .iter()
            .find_map(|re| re.captures(line))
            .and_then(|caps| self.diagnostic_from(&caps))
    }

    fn diagnostic_from(&self, caps: &Captures<'_>) -> Option<Diagnostic> {
        let file = caps.name("file")?.as_str().trim();
        let line: u32 = caps.name("line")?.as_str().parse().ok()?;
        let column = caps.name("col").and_then(|c| c.as_str().parse().ok());
        let message = caps.name("message")?.as_str().trim();
        let severity = caps
            .name("severity")
            .map(|s| Severity::from_label(s.as_str()))
            .unwrap_or(self.default_severity);

        let mut diag = Diagnostic::new(Location::new(file, line, column), severity, message);
        if let Some(code) = caps.name("code") {
            diag = diag.with_code(code.as_str());
        }
        Some(diag)
    }

    fn classify_unlocated(&self, line: &str) -> Option<RawError> {
        if self.linker_markers.iter().any(|m| has_marker(line, m)) {
            return Some(RawError::new(RawErrorKind::Linker, line));
        }
        if self.module_markers.iter().any(|m| has_marker(line, m)) {
            return Some(RawError::new(RawErrorKind::Module, line));
        }
        let caps = self.unlocated_error.as_ref()?.captures(line)?;
        let message = caps.name("message").map_or(line, |m| m.as_str());
        let message = match caps.name("code") {
            Some(code) => format!("{}: {}", code.as_str(), message),
            None => message.to_string(),
        };
        Some(RawError::new(RawErrorKind::Other, message))
    }

    /// Classify every line of `text`.
    pub fn parse(&self, text: &str) -> Extraction {
        let mut out = Extraction::empty(InputFormat::Text);
        let mut scope: Option<String> = None;
        let mut extends_diagnostic = false;

        for line in text.lines() {
            let line = line.trim_end();
            if line.trim().is_empty() {
                extends_diagnostic = false;
                continue;
            }

            let indented = line.starts_with('\t') || line.starts_with("    ");
            if self.indented_continuations && extends_diagnostic && indented {
                if let Some(last) = out.diagnostics.last_mut() {
                    last.message.push('\n');
                    last.message.push_str(line.trim());
                }
                continue;
            }
            extends_diagnostic = false;

            let trimmed = line.trim_start();
            if self.ignores(trimmed) {
                continue;
            }

            if let Some(marker) = &self.package_marker {
                if let Some(pkg) = trimmed.strip_prefix(marker.as_str()) {
                    scope = Some(pkg.trim().to_string());
                    continue;
                }
            }

            if let Some(diag) = self.match_location(trimmed) {
                if self.ignore_messages.iter().any(|m| *m == diag.message) {
                    continue;
                }
                out.diagnostics.push(diag);
                extends_diagnostic = true;
                continue;
            }

            let raw = match (self.classify_unlocated(trimmed), &scope) {
                (Some(raw), Some(pkg)) => Some(raw.in_scope(pkg.clone())),
                (Some(raw), None) => Some(raw),
                (None, Some(pkg)) => {
                    Some(RawError::new(RawErrorKind::Package, trimmed).in_scope(pkg.clone()))
                }
                (None, None) => None,
            };
            if let Some(raw) = raw {
                out.raw_errors.push(raw);
            }
        }

        out
    }
}

/// A text-only adapter driven entirely by [`TextRules`].
#[derive(Debug, Clone)]
pub struct TextAdapter {
    tool: String,
    rules: TextRules,
}

impl TextAdapter {
    pub fn new(tool: impl Into<String>, rules: TextRules) -> Self {
        Self {
            tool: tool.into(),
            rules,
        }
    }

    pub fn rules(&self) -> &TextRules {
        &self.rules
    }
}

impl DiagnosticAdapter for TextAdapter {
    fn tool(&self) -> &str {
        &self.tool
    }

    fn parse_text(&self, raw: &RawOutput) -> Extraction {
        self.rules.parse(&raw.combined())
    }

    fn is_noise(&self, line: &str) -> bool {
        self.rules.ignores(line)
    }
}
