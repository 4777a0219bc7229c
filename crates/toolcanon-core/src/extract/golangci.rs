//! `golangci-lint run --out-format json` adapter.

use serde::Deserialize;

use super::{DiagnosticAdapter, Extraction};
use crate::domain::diagnostic::{Diagnostic, Location, Severity};
use crate::domain::raw::RawOutput;
use crate::domain::result::InputFormat;
use crate::extract::text::TextRules;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Report {
    #[serde(default)]
    issues: Option<Vec<Issue>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Issue {
    from_linter: String,
    text: String,
    #[serde(default)]
    severity: String,
    pos: Pos,
    #[serde(default)]
    replacement: Option<Replacement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Pos {
    filename: String,
    #[serde(default)]
    line: u32,
    #[serde(default)]
    column: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Replacement {
    #[serde(default)]
    new_lines: Option<Vec<String>>,
}

impl Issue {
    fn into_diagnostic(self) -> Diagnostic {
        // golangci-lint leaves severity empty unless severity rules are configured.
        let severity = if self.severity.is_empty() {
            Severity::Warning
        } else {
            Severity::from_label(&self.severity)
        };
        let mut diag = Diagnostic::new(
            Location::new(self.pos.filename, self.pos.line, Some(self.pos.column)),
            severity,
            self.text,
        )
        .with_code(self.from_linter);

        if let Some(lines) = self.replacement.and_then(|r| r.new_lines) {
            diag = diag.with_suggestion(format!("replace with: {}", lines.join("\n")));
        }
        diag
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GolangciAdapter;

impl DiagnosticAdapter for GolangciAdapter {
    fn tool(&self) -> &str {
        "golangci-lint"
    }

    fn parse_json(&self, raw: &RawOutput) -> Option<Extraction> {
        // The report is one object on one line; config warnings may precede it.
        let line = raw
            .stdout
            .lines()
            .map(str::trim)
            .find(|l| l.starts_with('{'))?;
        let report: Report = serde_json::from_str(line).ok()?;

        let mut out = Extraction::empty(InputFormat::Json);
        out.diagnostics = report
            .issues
            .unwrap_or_default()
            .into_iter()
            .map(Issue::into_diagnostic)
            .collect();
        Some(out)
    }

    /// The default text reporter is `file:line:col: message (linter)`.
    fn parse_text(&self, raw: &RawOutput) -> Extraction {
        let rules = TextRules {
            indented_continuations: false,
            ..TextRules::go()
        };
        let mut out = rules.parse(&raw.combined());
        for diag in &mut out.diagnostics {
            diag.severity = Severity::Warning;
            if let Some(open) = diag.message.rfind(" (") {
                if diag.message.ends_with(')') {
                    let linter = diag.message[open + 2..diag.message.len() - 1].to_string();
                    diag.message.truncate(open);
                    diag.code = Some(linter);
                }
            }
        }
        out
    }

    /// Config and deprecation notices arrive as `level=warning msg=...`.
    fn is_noise(&self, line: &str) -> bool {
        line.starts_with("level=warning") || line.starts_with("level=info") || TextRules::go().ignores(line)
    }
}
