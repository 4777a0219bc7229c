//! Diagnostic extraction from compiler, linter and formatter output.
//!
//! Each tool gets one [`DiagnosticAdapter`] that maps its output onto the
//! canonical [`Diagnostic`]/[`RawError`] shape. [`extract`] applies the
//! precedence rule shared by all of them:
//!
//! 1. JSON is attempted first when the adapter has a JSON mode.
//! 2. If JSON produced at least one diagnostic or raw error, it is the
//!    result. Text is not parsed at all.
//! 3. Otherwise text is parsed. If text found anything, it is the result.
//! 4. Otherwise, if the run exited non-zero, every stderr line the adapter
//!    does not treat as noise becomes an unclassified raw error. A tool
//!    that crashed before reporting anything is not a clean run.
//! 5. Otherwise the (empty) JSON result stands if JSON records were
//!    recognized, else the result is empty with [`InputFormat::None`].
//!
//! Parsing never fails: malformed input degrades to an empty extraction.

pub mod cargo;
pub mod eslint;
pub mod fmt_check;
pub mod golangci;
pub mod text;

use crate::domain::diagnostic::{Diagnostic, RawError, RawErrorKind};
use crate::domain::raw::RawOutput;
use crate::domain::result::InputFormat;
use crate::obs;

pub use cargo::CargoAdapter;
pub use eslint::EslintAdapter;
pub use fmt_check::FmtCheckAdapter;
pub use golangci::GolangciAdapter;
pub use text::{TextAdapter, TextRules};

/// Outcome of one extraction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub diagnostics: Vec<Diagnostic>,
    pub raw_errors: Vec<RawError>,
    pub format: InputFormat,
}

impl Extraction {
    pub fn empty(format: InputFormat) -> Self {
        Self {
            diagnostics: Vec::new(),
            raw_errors: Vec::new(),
            format,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty() && self.raw_errors.is_empty()
    }
}

/// Per-tool mapping from raw output to canonical diagnostics.
pub trait DiagnosticAdapter: Send + Sync {
    /// Tool identifier used in logs and result context.
    fn tool(&self) -> &str;

    /// Parse the tool's JSON output.
    ///
    /// Returns `None` when the output contains no recognizable JSON record
    /// for this tool (the default for text-only tools).
    fn parse_json(&self, _raw: &RawOutput) -> Option<Extraction> {
        None
    }

    /// Parse the tool's plain-text output.
    fn parse_text(&self, raw: &RawOutput) -> Extraction;

    /// Progress or informational stderr line that never signals failure.
    fn is_noise(&self, _line: &str) -> bool {
        false
    }
}

/// Stderr lines of a failed run that no parser claimed.
fn unclassified_stderr(adapter: &dyn DiagnosticAdapter, raw: &RawOutput) -> Vec<RawError> {
    if !raw.exited_nonzero() {
        return Vec::new();
    }
    raw.stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !adapter.is_noise(line))
        .map(|line| RawError::new(RawErrorKind::Other, line))
        .collect()
}

/// Run an adapter under the JSON-first, text-fallback rule.
pub fn extract(adapter: &dyn DiagnosticAdapter, raw: &RawOutput) -> Extraction {
    let json = match adapter.parse_json(raw) {
        Some(found) if !found.is_empty() => return found,
        other => other,
    };

    let text = adapter.parse_text(raw);
    if !text.is_empty() {
        return text;
    }

    let unclassified = unclassified_stderr(adapter, raw);
    if !unclassified.is_empty() {
        obs::emit_malformed_input(adapter.tool(), "failed run left unclassified stderr");
        return Extraction {
            diagnostics: Vec::new(),
            raw_errors: unclassified,
            format: InputFormat::Text,
        };
    }

    match json {
        Some(found) => found,
        None => {
            if raw.exited_nonzero() && !raw.combined().trim().is_empty() {
                obs::emit_malformed_input(adapter.tool(), "no diagnostic shape recognized");
            }
            Extraction::empty(InputFormat::None)
        }
    }
}

/// Iterate JSON objects from a JSON-lines stream, skipping anything that
/// does not parse. Non-JSON lines (progress, banners) are common in these
/// streams and never an error.
pub(crate) fn json_lines<'a, T: serde::de::DeserializeOwned + 'a>(
    text: &'a str,
) -> impl Iterator<Item = T> + 'a {
    text.lines().filter_map(|line| {
        let line = line.trim();
        if !line.starts_with('{') {
            return None;
        }
        serde_json::from_str::<T>(line).ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::diagnostic::{Location, RawErrorKind, Severity};

    struct Fixed {
        json: Option<Extraction>,
        text: Extraction,
    }

    impl DiagnosticAdapter for Fixed {
        fn tool(&self) -> &str {
            "fixed"
        }
        fn parse_json(&self, _raw: &RawOutput) -> Option<Extraction> {
            self.json.clone()
        }
        fn parse_text(&self, _raw: &RawOutput) -> Extraction {
            self.text.clone()
        }
    }

    fn one_diag(format: InputFormat, msg: &str) -> Extraction {
        Extraction {
            diagnostics: vec![Diagnostic::new(
                Location::new("a.rs", 1, None),
                Severity::Error,
                msg,
            )],
            raw_errors: vec![],
            format,
        }
    }

    #[test]
    fn test_json_wins_when_non_empty() {
        let adapter = Fixed {
            json: Some(one_diag(InputFormat::Json, "from json")),
            text: one_diag(InputFormat::Text, "from text"),
        };
        let out = extract(&adapter, &RawOutput::default());
        assert_eq!(out.format, InputFormat::Json);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].message, "from json");
    }

    #[test]
    fn test_text_used_when_json_empty() {
        let adapter = Fixed {
            json: Some(Extraction::empty(InputFormat::Json)),
            text: Extraction {
                diagnostics: vec![],
                raw_errors: vec![RawError::new(RawErrorKind::Module, "no module")],
                format: InputFormat::Text,
            },
        };
        let out = extract(&adapter, &RawOutput::default());
        assert_eq!(out.format, InputFormat::Text);
        assert_eq!(out.raw_errors.len(), 1);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_empty_json_stands_when_text_empty() {
        let adapter = Fixed {
            json: Some(Extraction::empty(InputFormat::Json)),
            text: Extraction::empty(InputFormat::Text),
        };
        assert_eq!(extract(&adapter, &RawOutput::default()).format, InputFormat::Json);
    }

    #[test]
    fn test_nothing_recognized_is_none_format() {
        let adapter = Fixed {
            json: None,
            text: Extraction::empty(InputFormat::Text),
        };
        let out = extract(&adapter, &RawOutput::stdout("???", 1));
        assert!(out.is_empty());
        assert_eq!(out.format, InputFormat::None);
    }

    #[test]
    fn test_failed_run_keeps_unclassified_stderr() {
        let adapter = Fixed {
            json: None,
            text: Extraction::empty(InputFormat::Text),
        };
        let out = extract(&adapter, &RawOutput::stderr("Oops! Something went wrong!\n\nsegfault\n", 2));
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.raw_errors.len(), 2);
        assert!(out.raw_errors.iter().all(|r| r.kind == RawErrorKind::Other));
        assert_eq!(out.raw_errors[0].message, "Oops! Something went wrong!");
    }

    #[test]
    fn test_empty_json_with_failed_run_keeps_stderr() {
        let adapter = Fixed {
            json: Some(Extraction::empty(InputFormat::Json)),
            text: Extraction::empty(InputFormat::Text),
        };
        let out = extract(&adapter, &RawOutput::stderr("config file not found", 3));
        assert_eq!(out.raw_errors.len(), 1);
    }

    #[test]
    fn test_stderr_of_clean_run_is_not_an_error() {
        let adapter = Fixed {
            json: None,
            text: Extraction::empty(InputFormat::Text),
        };
        assert!(extract(&adapter, &RawOutput::stderr("some notice", 0)).is_empty());
    }

    #[test]
    fn test_json_lines_skips_garbage() {
        let input = "Compiling foo\n{\"a\":1}\n{broken\n  {\"a\":2}\n";
        let values: Vec<serde_json::Value> = json_lines(input).collect();
        assert_eq!(values.len(), 2);
    }
}
