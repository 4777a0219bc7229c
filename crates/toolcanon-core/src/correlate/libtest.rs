//! `cargo test -- -Z unstable-options --format json` adapter.
//!
//! libtest does not name the binary a suite belongs to, so each suite is
//! scoped by its ordinal: `suite-1`, `suite-2`, ...

use serde::Deserialize;

use super::{Action, EventStream, TestEvent, TestStreamAdapter, UntaggedLines};
use crate::domain::raw::RawOutput;
use crate::domain::result::InputFormat;

#[derive(Debug, Deserialize)]
struct LibtestEvent {
    #[serde(rename = "type")]
    kind: String,
    event: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    exec_time: Option<f64>,
}

fn map_event(event: &str) -> Option<Action> {
    Some(match event {
        "started" => Action::Start,
        "ok" | "allowed_fail" => Action::Pass,
        "failed" => Action::Fail,
        "ignored" => Action::Skip,
        "timeout" => Action::Other,
        _ => return None,
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LibtestAdapter;

impl TestStreamAdapter for LibtestAdapter {
    fn tool(&self) -> &str {
        "cargo-test"
    }

    fn events(&self, raw: &RawOutput) -> EventStream {
        let mut events = Vec::new();
        let mut untagged = UntaggedLines::default();
        let mut suite = 0usize;
        let mut recognized = false;

        for line in raw.combined().lines() {
            let parsed = line
                .trim_start()
                .starts_with('{')
                .then(|| serde_json::from_str::<LibtestEvent>(line.trim()).ok())
                .flatten();
            let Some(record) = parsed else {
                untagged.line(line, &mut events);
                continue;
            };
            recognized = true;

            let Some(action) = map_event(&record.event) else {
                continue;
            };
            if record.kind == "suite" && action == Action::Start {
                suite += 1;
            }
            let scope = format!("suite-{}", suite.max(1));
            untagged.enter(&scope, &mut events);

            match (record.kind.as_str(), record.name) {
                ("suite", _) => {
                    let mut event = TestEvent::scope(scope, action);
                    event.elapsed = record.exec_time;
                    events.push(event);
                }
                ("test", Some(name)) => {
                    // Captured stdout arrives on the terminal event itself.
                    if let Some(stdout) = record.stdout.filter(|s| !s.is_empty()) {
                        for chunk in stdout.lines() {
                            events.push(
                                TestEvent::test(scope.clone(), name.clone(), Action::Output)
                                    .with_output(chunk),
                            );
                        }
                    }
                    let mut event = TestEvent::test(scope, name, action);
                    event.elapsed = record.exec_time;
                    events.push(event);
                }
                _ => {}
            }
        }

        let format = if recognized {
            InputFormat::Json
        } else {
            InputFormat::None
        };
        EventStream { events, format }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlate::correlate_output;
    use crate::domain::test_case::TestStatus;

    const STREAM: &str = r#"{ "type": "suite", "event": "started", "test_count": 3 }
{ "type": "test", "event": "started", "name": "tests::adds" }
{ "type": "test", "event": "started", "name": "tests::divides" }
{ "type": "test", "event": "started", "name": "tests::slow" }
{ "type": "test", "name": "tests::adds", "event": "ok", "exec_time": 0.001 }
{ "type": "test", "name": "tests::divides", "event": "failed", "exec_time": 0.002, "stdout": "thread 'tests::divides' panicked at src/lib.rs:20:9:\nattempt to divide by zero\n" }
{ "type": "test", "name": "tests::slow", "event": "ignored" }
{ "type": "suite", "event": "failed", "passed": 1, "failed": 1, "ignored": 1, "measured": 0, "filtered_out": 0, "exec_time": 0.003 }
error: test failed, to rerun pass `--lib`
"#;

    #[test]
    fn test_suite_stream() {
        let result = correlate_output(&LibtestAdapter, &RawOutput::stdout(STREAM, 101));
        assert_eq!(result.format, InputFormat::Json);
        assert_eq!(result.tests.len(), 3);
        assert!(result.tests.iter().all(|t| t.scope == "suite-1"));
        assert!(result.package_failures.is_empty());

        let divides = &result.tests[1];
        assert_eq!(divides.status, TestStatus::Fail);
        assert_eq!(
            divides.captured_output.as_deref(),
            Some("thread 'tests::divides' panicked at src/lib.rs:20:9:\nattempt to divide by zero")
        );
        assert_eq!(result.tests[2].status, TestStatus::Skip);
        assert!(result.tests[0].captured_output.is_none());
    }

    #[test]
    fn test_second_suite_gets_next_ordinal() {
        let stdout = r#"{ "type": "suite", "event": "started", "test_count": 1 }
{ "type": "test", "name": "a", "event": "ok" }
{ "type": "suite", "event": "ok", "exec_time": 0.0 }
{ "type": "suite", "event": "started", "test_count": 1 }
{ "type": "test", "name": "a", "event": "ok" }
{ "type": "suite", "event": "ok", "exec_time": 0.0 }
"#;
        let result = correlate_output(&LibtestAdapter, &RawOutput::stdout(stdout, 0));
        assert_eq!(result.tests.len(), 2);
        assert_eq!(result.tests[1].scope, "suite-2");
    }

    #[test]
    fn test_plain_output_is_not_recognized() {
        let result = correlate_output(
            &LibtestAdapter,
            &RawOutput::stderr("error[E0425]: cannot find value `x`\n", 101),
        );
        assert_eq!(result.format, InputFormat::None);
        assert!(result.tests.is_empty());
    }
}
