//! `go test` adapter: `-json` event stream first, `-v` text as fallback.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::{Action, EventStream, TestEvent, TestStreamAdapter, UntaggedLines};
use crate::domain::raw::RawOutput;
use crate::domain::result::InputFormat;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GoEvent {
    action: String,
    #[serde(default)]
    package: Option<String>,
    #[serde(default)]
    import_path: Option<String>,
    #[serde(default)]
    test: Option<String>,
    #[serde(default)]
    elapsed: Option<f64>,
    #[serde(default)]
    output: Option<String>,
}

fn map_action(action: &str) -> Option<Action> {
    Some(match action {
        "start" | "run" => Action::Start,
        "pass" => Action::Pass,
        "fail" | "build-fail" => Action::Fail,
        "skip" => Action::Skip,
        "output" | "bench" | "build-output" => Action::Output,
        "pause" | "cont" => Action::Other,
        _ => return None,
    })
}

/// `example.com/pkg [example.com/pkg.test]` names the same scope as
/// `example.com/pkg`.
fn scope_of(event: &GoEvent) -> Option<String> {
    let raw = event.package.as_deref().or(event.import_path.as_deref())?;
    let base = raw.split_once(" [").map_or(raw, |(base, _)| base);
    Some(base.to_string())
}

impl GoEvent {
    fn into_test_event(self) -> Option<TestEvent> {
        let action = map_action(&self.action)?;
        let scope = scope_of(&self)?;
        Some(TestEvent {
            scope,
            name: self.test,
            action,
            elapsed: self.elapsed,
            output: self.output,
        })
    }
}

static TEXT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^=== RUN\s+(?P<name>\S+)$").expect("valid go run regex"));

static TEXT_RESUME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^=== (?:PAUSE|CONT|NAME)\s+(?P<name>\S+)$").expect("valid go resume regex")
});

static TEXT_RESULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*--- (?P<status>PASS|FAIL|SKIP): (?P<name>\S+) \((?P<elapsed>[\d.]+)s\)$")
        .expect("valid go result regex")
});

static TEXT_PACKAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<status>ok|FAIL)\s+(?P<pkg>\S+)(?:\s+(?P<elapsed>[\d.]+)s|\s+\(cached\)|\s+\[[^\]]+\])?")
        .expect("valid go package regex")
});

/// Test events for a package block, held until the block's summary line
/// names the package.
#[derive(Default)]
struct TextBlock {
    events: Vec<TestEvent>,
    pending_terminal: Option<TestEvent>,
    current: Option<String>,
}

impl TextBlock {
    fn settle(&mut self) {
        if let Some(event) = self.pending_terminal.take() {
            self.events.push(event);
        }
    }

    fn flush_into(&mut self, scope: &str, out: &mut Vec<TestEvent>) {
        self.settle();
        self.current = None;
        out.extend(self.events.drain(..).map(|mut e| {
            e.scope = scope.to_string();
            e
        }));
    }
}

fn parse_text(text: &str) -> Vec<TestEvent> {
    let mut out = Vec::new();
    let mut block = TextBlock::default();

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = TEXT_RESULT.captures(line) {
            block.settle();
            let action = match &caps["status"] {
                "PASS" => Action::Pass,
                "FAIL" => Action::Fail,
                _ => Action::Skip,
            };
            let mut event = TestEvent::test("", &caps["name"], action);
            event.elapsed = caps["elapsed"].parse().ok();
            block.pending_terminal = Some(event);
            block.current = Some(caps["name"].to_string());
            continue;
        }

        let indented = line.starts_with("    ") || line.starts_with('\t');
        if indented {
            if let Some(name) = block.current.clone() {
                block
                    .events
                    .push(TestEvent::test("", name, Action::Output).with_output(line.trim_start()));
                continue;
            }
        }
        block.settle();

        if let Some(caps) = TEXT_RUN.captures(line) {
            block.events.push(TestEvent::test("", &caps["name"], Action::Start));
            block.current = Some(caps["name"].to_string());
        } else if let Some(caps) = TEXT_RESUME.captures(line) {
            block.current = Some(caps["name"].to_string());
        } else if let Some(caps) = TEXT_PACKAGE.captures(line) {
            let pkg = caps["pkg"].to_string();
            let action = if &caps["status"] == "ok" {
                Action::Pass
            } else {
                Action::Fail
            };
            block.flush_into(&pkg, &mut out);
            let mut event = TestEvent::scope(pkg, action);
            event.elapsed = caps.name("elapsed").and_then(|e| e.as_str().parse().ok());
            out.push(event);
        } else if line == "PASS" || line == "FAIL" || line.starts_with("?   ") {
            continue;
        } else {
            block.events.push(TestEvent::scope("", Action::Output).with_output(line));
        }
    }

    block.flush_into("", &mut out);
    out
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GoTestAdapter;

impl TestStreamAdapter for GoTestAdapter {
    fn tool(&self) -> &str {
        "go-test"
    }

    fn events(&self, raw: &RawOutput) -> EventStream {
        let mut events = Vec::new();
        let mut untagged = UntaggedLines::default();
        let mut recognized = false;

        for line in raw.combined().lines() {
            let parsed = line
                .trim_start()
                .starts_with('{')
                .then(|| serde_json::from_str::<GoEvent>(line.trim()).ok())
                .flatten();
            match parsed {
                Some(go_event) => {
                    recognized = true;
                    if let Some(event) = go_event.into_test_event() {
                        untagged.enter(&event.scope, &mut events);
                        events.push(event);
                    }
                }
                None => untagged.line(line, &mut events),
            }
        }

        if recognized {
            return EventStream {
                events,
                format: InputFormat::Json,
            };
        }

        let events = parse_text(&raw.combined());
        let format = if events.is_empty() {
            InputFormat::None
        } else {
            InputFormat::Text
        };
        EventStream { events, format }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlate::correlate_output;
    use crate::domain::test_case::TestStatus;

    #[test]
    fn test_json_stream_with_failing_test() {
        let stdout = r#"{"Action":"start","Package":"example.com/calc"}
{"Action":"run","Package":"example.com/calc","Test":"TestAdd"}
{"Action":"output","Package":"example.com/calc","Test":"TestAdd","Output":"=== RUN   TestAdd\n"}
{"Action":"pass","Package":"example.com/calc","Test":"TestAdd","Elapsed":0}
{"Action":"run","Package":"example.com/calc","Test":"TestDiv"}
{"Action":"output","Package":"example.com/calc","Test":"TestDiv","Output":"    calc_test.go:14: got 0\n"}
{"Action":"output","Package":"example.com/calc","Test":"TestDiv","Output":"--- FAIL: TestDiv (0.00s)\n"}
{"Action":"fail","Package":"example.com/calc","Test":"TestDiv","Elapsed":0}
{"Action":"output","Package":"example.com/calc","Output":"FAIL\n"}
{"Action":"fail","Package":"example.com/calc","Elapsed":0.004}
"#;
        let result = correlate_output(&GoTestAdapter, &RawOutput::stdout(stdout, 1));
        assert_eq!(result.format, InputFormat::Json);
        assert_eq!(result.tests.len(), 2);
        assert!(result.package_failures.is_empty());

        let div = &result.tests[1];
        assert_eq!(div.status, TestStatus::Fail);
        assert_eq!(
            div.captured_output.as_deref(),
            Some("    calc_test.go:14: got 0\n--- FAIL: TestDiv (0.00s)")
        );
        assert!(result.tests[0].captured_output.is_none());
    }

    #[test]
    fn test_build_failure_is_one_package_failure() {
        let stdout = r##"{"ImportPath":"example.com/calc [example.com/calc.test]","Action":"build-output","Output":"# example.com/calc\n"}
{"ImportPath":"example.com/calc [example.com/calc.test]","Action":"build-output","Output":"./calc.go:3:9: undefined: y\n"}
{"ImportPath":"example.com/calc [example.com/calc.test]","Action":"build-fail"}
{"Action":"start","Package":"example.com/calc"}
{"Action":"output","Package":"example.com/calc","Output":"FAIL\texample.com/calc [build failed]\n"}
{"Action":"fail","Package":"example.com/calc","Elapsed":0}
"##;
        let result = correlate_output(&GoTestAdapter, &RawOutput::stdout(stdout, 1));
        assert!(result.tests.is_empty());
        assert_eq!(result.package_failures.len(), 1);
        let failure = &result.package_failures[0];
        assert_eq!(failure.scope, "example.com/calc");
        assert!(failure
            .output
            .as_deref()
            .is_some_and(|o| o.contains("undefined: y")));
    }

    #[test]
    fn test_non_json_lines_become_scope_output() {
        let stdout = "warning: something odd\n{\"Action\":\"fail\",\"Package\":\"p\"}\n";
        let result = correlate_output(&GoTestAdapter, &RawOutput::stdout(stdout, 1));
        assert_eq!(result.package_failures.len(), 1);
        assert_eq!(
            result.package_failures[0].output.as_deref(),
            Some("warning: something odd")
        );
    }

    #[test]
    fn test_verbose_text_fallback() {
        let stdout = "\
=== RUN   TestAdd
--- PASS: TestAdd (0.00s)
=== RUN   TestDiv
    calc_test.go:14: got 0
--- FAIL: TestDiv (0.01s)
FAIL
FAIL\texample.com/calc\t0.004s
ok  \texample.com/other\t0.002s
";
        let result = correlate_output(&GoTestAdapter, &RawOutput::stdout(stdout, 1));
        assert_eq!(result.format, InputFormat::Text);
        assert_eq!(result.tests.len(), 2);
        assert!(result.tests.iter().all(|t| t.scope == "example.com/calc"));
        assert_eq!(result.tests[1].status, TestStatus::Fail);
        assert_eq!(result.tests[1].elapsed, Some(0.01));
        assert_eq!(
            result.tests[1].captured_output.as_deref(),
            Some("calc_test.go:14: got 0")
        );
        assert!(result.package_failures.is_empty());
    }

    #[test]
    fn test_quiet_text_attaches_trailing_log_lines() {
        let stdout = "\
--- FAIL: TestDiv (0.00s)
    calc_test.go:14: got 0
FAIL
FAIL\texample.com/calc\t0.004s
";
        let result = correlate_output(&GoTestAdapter, &RawOutput::stdout(stdout, 1));
        assert_eq!(result.tests.len(), 1);
        assert_eq!(
            result.tests[0].captured_output.as_deref(),
            Some("calc_test.go:14: got 0")
        );
    }

    #[test]
    fn test_empty_output_is_none_format() {
        let result = correlate_output(&GoTestAdapter, &RawOutput::default());
        assert_eq!(result.format, InputFormat::None);
        assert!(result.tests.is_empty());
    }
}
