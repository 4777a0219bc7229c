//! `eslint --format json` adapter.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::{DiagnosticAdapter, Extraction};
use crate::domain::diagnostic::{Diagnostic, Location, Severity};
use crate::domain::raw::RawOutput;
use crate::domain::result::InputFormat;
use crate::extract::text::TextRules;

/// `file:line:col: message [Severity/rule]` (`--format unix`).
static UNIX_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<file>[^\s:][^:]*):(?P<line>\d+):(?P<col>\d+): (?P<message>.+?) \[(?P<severity>Error|Warning)(?:/(?P<code>[^\]]+))?\]$",
    )
    .expect("valid eslint unix regex")
});

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileReport {
    file_path: String,
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Message {
    #[serde(default)]
    rule_id: Option<String>,
    #[serde(default)]
    severity: Option<u8>,
    #[serde(default)]
    fatal: bool,
    message: String,
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    column: Option<u32>,
    #[serde(default)]
    suggestions: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
struct Suggestion {
    desc: String,
}

fn severity_of(msg: &Message) -> Severity {
    if msg.fatal {
        return Severity::Error;
    }
    match msg.severity {
        Some(2) => Severity::Error,
        _ => Severity::Warning,
    }
}

/// ESLint's JSON formatter emits one array for the whole run, possibly
/// preceded by banner text from wrappers like `npx`.
fn find_array(text: &str) -> Option<&str> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return Some(trimmed.trim_end());
    }
    let start = text.find("\n[")? + 1;
    Some(text[start..].trim_end())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EslintAdapter;

impl DiagnosticAdapter for EslintAdapter {
    fn tool(&self) -> &str {
        "eslint"
    }

    fn parse_json(&self, raw: &RawOutput) -> Option<Extraction> {
        let body = find_array(&raw.stdout)?;
        let reports: Vec<FileReport> = serde_json::from_str(body).ok()?;

        let mut out = Extraction::empty(InputFormat::Json);
        for report in reports {
            for msg in report.messages {
                let location = match msg.line {
                    Some(line) => Location::new(report.file_path.clone(), line, msg.column),
                    None => Location::file_only(report.file_path.clone()),
                };
                let mut diag = Diagnostic::new(location, severity_of(&msg), msg.message.clone());
                if let Some(rule) = msg.rule_id {
                    diag = diag.with_code(rule);
                }
                if let Some(first) = msg.suggestions.into_iter().next() {
                    diag = diag.with_suggestion(first.desc);
                }
                out.diagnostics.push(diag);
            }
        }
        Some(out)
    }

    /// The default "stylish" formatter splits file and line across rows;
    /// only `--format unix` is read in text mode.
    fn parse_text(&self, raw: &RawOutput) -> Extraction {
        let rules = TextRules {
            locations: vec![UNIX_LINE.clone()],
            ignore_prefixes: vec!["✖ ".to_string()],
            ..TextRules::gnu()
        };
        rules.parse(&raw.stdout)
    }
}
