//! Test-run event correlation.
//!
//! Test runners report progress as a flat, ordered stream of events. The
//! [`Correlator`] folds that stream left to right into one [`TestCase`] per
//! `(scope, name)` and a [`PackageFailure`] for each scope that failed
//! without any named test.
//!
//! Per key the lifecycle is `unseen -> running -> {pass, fail, skip}`:
//! - a terminal event for an unseen key creates the record directly;
//! - a terminal event for a key that is already terminal is ignored;
//! - a named output event for an unseen key starts that test;
//! - output that arrives outside a running window goes to the scope buffer.
//!
//! Tests still running when the stream ends keep `running`.

pub mod go_test;
pub mod libtest;

use std::collections::HashMap;

use crate::domain::raw::RawOutput;
use crate::domain::result::InputFormat;
use crate::domain::test_case::{PackageFailure, TestCase, TestStatus};

pub use go_test::GoTestAdapter;
pub use libtest::LibtestAdapter;

/// What a single event says about its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Pass,
    Fail,
    Skip,
    Output,
    /// Pause/continue and similar bookkeeping.
    Other,
}

impl Action {
    fn terminal_status(self) -> Option<TestStatus> {
        match self {
            Action::Pass => Some(TestStatus::Pass),
            Action::Fail => Some(TestStatus::Fail),
            Action::Skip => Some(TestStatus::Skip),
            _ => None,
        }
    }
}

/// Tool-agnostic test event.
#[derive(Debug, Clone, PartialEq)]
pub struct TestEvent {
    pub scope: String,
    /// `None` for scope-level events.
    pub name: Option<String>,
    pub action: Action,
    /// Seconds.
    pub elapsed: Option<f64>,
    pub output: Option<String>,
}

impl TestEvent {
    pub fn scope(scope: impl Into<String>, action: Action) -> Self {
        Self {
            scope: scope.into(),
            name: None,
            action,
            elapsed: None,
            output: None,
        }
    }

    pub fn test(scope: impl Into<String>, name: impl Into<String>, action: Action) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::scope(scope, action)
        }
    }

    pub fn with_elapsed(mut self, elapsed: f64) -> Self {
        self.elapsed = Some(elapsed);
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// Result of folding a whole stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    pub tests: Vec<TestCase>,
    pub package_failures: Vec<PackageFailure>,
    pub format: InputFormat,
}

/// Decoded events plus the format they were read from.
#[derive(Debug, Clone, PartialEq)]
pub struct EventStream {
    pub events: Vec<TestEvent>,
    pub format: InputFormat,
}

/// Per-tool mapping from raw runner output to [`TestEvent`]s.
pub trait TestStreamAdapter: Send + Sync {
    fn tool(&self) -> &str;

    /// Decode every event in stream order. Lines that are not events are
    /// returned as untagged scope output.
    fn events(&self, raw: &RawOutput) -> EventStream;
}

#[derive(Debug, Default)]
struct ScopeState {
    output: Vec<String>,
    terminal: Option<(TestStatus, Option<f64>)>,
}

/// Stateful left fold over a test event stream.
#[derive(Debug, Default)]
pub struct Correlator {
    cases: Vec<TestCase>,
    output: Vec<Vec<String>>,
    index: HashMap<(String, String), usize>,
    scopes: Vec<(String, ScopeState)>,
    scope_index: HashMap<String, usize>,
}

fn sanitize_elapsed(elapsed: Option<f64>) -> Option<f64> {
    match elapsed {
        Some(e) if e.is_finite() && e >= 0.0 => Some(e),
        Some(e) => {
            tracing::debug!(elapsed = e, "dropping invalid elapsed time");
            None
        }
        None => None,
    }
}

fn push_output(buffer: &mut Vec<String>, chunk: &str) {
    let chunk = chunk.strip_suffix('\n').unwrap_or(chunk);
    let chunk = chunk.strip_suffix('\r').unwrap_or(chunk);
    buffer.push(chunk.to_string());
}

fn joined(lines: Vec<String>) -> Option<String> {
    (!lines.is_empty()).then(|| lines.join("\n"))
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    fn scope_mut(&mut self, scope: &str) -> &mut ScopeState {
        let idx = match self.scope_index.get(scope) {
            Some(idx) => *idx,
            None => {
                self.scopes.push((scope.to_string(), ScopeState::default()));
                self.scope_index.insert(scope.to_string(), self.scopes.len() - 1);
                self.scopes.len() - 1
            }
        };
        &mut self.scopes[idx].1
    }

    fn case_index(&mut self, scope: &str, name: &str) -> usize {
        let key = (scope.to_string(), name.to_string());
        if let Some(idx) = self.index.get(&key) {
            return *idx;
        }
        self.cases.push(TestCase {
            scope: scope.to_string(),
            name: name.to_string(),
            status: TestStatus::Running,
            elapsed: None,
            captured_output: None,
        });
        self.output.push(Vec::new());
        self.index.insert(key, self.cases.len() - 1);
        self.cases.len() - 1
    }

    /// Apply one event.
    pub fn feed(&mut self, event: TestEvent) {
        // Every scope seen is tracked, even if it only ever carries output.
        self.scope_mut(&event.scope);
        let elapsed = sanitize_elapsed(event.elapsed);

        match event.name.as_deref() {
            None => self.feed_scope(&event.scope, event.action, elapsed, event.output.as_deref()),
            Some(name) => self.feed_test(&event.scope, name, event.action, elapsed, event.output.as_deref()),
        }
    }

    fn feed_scope(&mut self, scope: &str, action: Action, elapsed: Option<f64>, output: Option<&str>) {
        let state = self.scope_mut(scope);
        if let Some(text) = output {
            push_output(&mut state.output, text);
        }
        if let Some(status) = action.terminal_status() {
            if state.terminal.is_none() {
                state.terminal = Some((status, elapsed));
            }
        }
    }

    fn feed_test(
        &mut self,
        scope: &str,
        name: &str,
        action: Action,
        elapsed: Option<f64>,
        output: Option<&str>,
    ) {
        match action {
            Action::Start => {
                self.case_index(scope, name);
            }
            Action::Output => {
                let Some(text) = output else { return };
                let idx = self.case_index(scope, name);
                if self.cases[idx].status.is_terminal() {
                    push_output(&mut self.scope_mut(scope).output, text);
                } else {
                    push_output(&mut self.output[idx], text);
                }
            }
            Action::Pass | Action::Fail | Action::Skip => {
                let idx = self.case_index(scope, name);
                let case = &mut self.cases[idx];
                if case.status.is_terminal() {
                    return;
                }
                if let Some(status) = action.terminal_status() {
                    case.status = status;
                    case.elapsed = elapsed;
                }
                if let Some(text) = output {
                    push_output(&mut self.output[idx], text);
                }
            }
            Action::Other => {}
        }
    }

    /// Close the stream and emit outcomes in first-appearance order.
    pub fn finish(self) -> (Vec<TestCase>, Vec<PackageFailure>) {
        let mut named_scopes = std::collections::HashSet::new();
        let tests: Vec<TestCase> = self
            .cases
            .into_iter()
            .zip(self.output)
            .map(|(mut case, lines)| {
                named_scopes.insert(case.scope.clone());
                if case.status == TestStatus::Fail {
                    case.captured_output = joined(lines);
                }
                case
            })
            .collect();

        let package_failures = self
            .scopes
            .into_iter()
            .filter_map(|(scope, state)| match state.terminal {
                Some((TestStatus::Fail, elapsed)) if !named_scopes.contains(&scope) => {
                    Some(PackageFailure {
                        scope,
                        elapsed,
                        output: joined(state.output),
                    })
                }
                _ => None,
            })
            .collect();

        (tests, package_failures)
    }
}

/// Fold a whole event stream.
pub fn correlate(events: impl IntoIterator<Item = TestEvent>) -> (Vec<TestCase>, Vec<PackageFailure>) {
    let mut correlator = Correlator::new();
    for event in events {
        correlator.feed(event);
    }
    correlator.finish()
}

/// Decode and fold a runner's output.
pub fn correlate_output(adapter: &dyn TestStreamAdapter, raw: &RawOutput) -> Correlation {
    let EventStream { events, format } = adapter.events(raw);
    let (tests, package_failures) = correlate(events);
    Correlation {
        tests,
        package_failures,
        format,
    }
}

/// Routes non-event lines to the most recent scope. Lines seen before any
/// scope are held until the first scope appears.
#[derive(Debug, Default)]
pub(crate) struct UntaggedLines {
    last_scope: Option<String>,
    pending: Vec<String>,
}

impl UntaggedLines {
    /// Record that `scope` is now current, flushing held lines into it.
    pub(crate) fn enter(&mut self, scope: &str, events: &mut Vec<TestEvent>) {
        if self.last_scope.as_deref() != Some(scope) {
            self.last_scope = Some(scope.to_string());
        }
        for line in self.pending.drain(..) {
            events.push(TestEvent::scope(scope, Action::Output).with_output(line));
        }
    }

    pub(crate) fn line(&mut self, line: &str, events: &mut Vec<TestEvent>) {
        if line.trim().is_empty() {
            return;
        }
        match &self.last_scope {
            Some(scope) => events.push(TestEvent::scope(scope.clone(), Action::Output).with_output(line)),
            None => self.pending.push(line.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PKG: &str = "example.com/pkg";

    #[test]
    fn test_failing_test_captures_output_passing_sibling_does_not() {
        let (tests, failures) = correlate(vec![
            TestEvent::test(PKG, "TestOk", Action::Start),
            TestEvent::test(PKG, "TestOk", Action::Output).with_output("ok line\n"),
            TestEvent::test(PKG, "TestOk", Action::Pass).with_elapsed(0.0),
            TestEvent::test(PKG, "TestBad", Action::Start),
            TestEvent::test(PKG, "TestBad", Action::Output).with_output("got 1\n"),
            TestEvent::test(PKG, "TestBad", Action::Output).with_output("want 2\n"),
            TestEvent::test(PKG, "TestBad", Action::Fail).with_elapsed(0.01),
            TestEvent::scope(PKG, Action::Fail).with_elapsed(0.02),
        ]);

        assert!(failures.is_empty());
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].status, TestStatus::Pass);
        assert!(tests[0].captured_output.is_none());
        assert_eq!(tests[1].status, TestStatus::Fail);
        assert_eq!(tests[1].captured_output.as_deref(), Some("got 1\nwant 2"));
        assert_eq!(tests[0].elapsed, Some(0.0));
    }

    #[test]
    fn test_scope_only_failure_synthesizes_package_failure() {
        let (tests, failures) = correlate(vec![
            TestEvent::scope(PKG, Action::Start),
            TestEvent::scope(PKG, Action::Output).with_output("panic: boom\n"),
            TestEvent::scope(PKG, Action::Output).with_output("FAIL\texample.com/pkg\t0.003s\n"),
            TestEvent::scope(PKG, Action::Fail).with_elapsed(0.003),
        ]);

        assert!(tests.is_empty());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].scope, PKG);
        assert_eq!(failures[0].elapsed, Some(0.003));
        assert_eq!(
            failures[0].output.as_deref(),
            Some("panic: boom\nFAIL\texample.com/pkg\t0.003s")
        );
    }

    #[test]
    fn test_scope_failure_with_named_tests_is_not_package_failure() {
        let (tests, failures) = correlate(vec![
            TestEvent::test(PKG, "TestOk", Action::Pass),
            TestEvent::scope(PKG, Action::Fail),
        ]);
        assert_eq!(tests.len(), 1);
        assert!(failures.is_empty());
    }

    #[test]
    fn test_terminal_for_unseen_key_creates_record() {
        let (tests, _) = correlate(vec![TestEvent::test(PKG, "TestX", Action::Skip)]);
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].status, TestStatus::Skip);
    }

    #[test]
    fn test_first_terminal_wins() {
        let (tests, _) = correlate(vec![
            TestEvent::test(PKG, "TestX", Action::Start),
            TestEvent::test(PKG, "TestX", Action::Pass),
            TestEvent::test(PKG, "TestX", Action::Fail),
        ]);
        assert_eq!(tests[0].status, TestStatus::Pass);
    }

    #[test]
    fn test_output_after_terminal_goes_to_scope() {
        let (tests, failures) = correlate(vec![
            TestEvent::test(PKG, "TestX", Action::Fail),
            TestEvent::test(PKG, "TestX", Action::Output).with_output("late\n"),
        ]);
        assert!(tests[0].captured_output.is_none());
        assert!(failures.is_empty());
    }

    #[test]
    fn test_running_at_end_stays_running() {
        let (tests, _) = correlate(vec![
            TestEvent::test(PKG, "TestHang", Action::Start),
            TestEvent::test(PKG, "TestHang", Action::Output).with_output("waiting\n"),
        ]);
        assert_eq!(tests[0].status, TestStatus::Running);
        assert!(tests[0].captured_output.is_none());
    }

    #[test]
    fn test_negative_elapsed_dropped() {
        let (tests, _) = correlate(vec![TestEvent::test(PKG, "TestX", Action::Pass).with_elapsed(-1.0)]);
        assert!(tests[0].elapsed.is_none());
    }

    #[test]
    fn test_deterministic() {
        let events = vec![
            TestEvent::test("a", "T1", Action::Fail).with_output("x"),
            TestEvent::scope("b", Action::Fail),
            TestEvent::test("a", "T2", Action::Pass),
        ];
        assert_eq!(correlate(events.clone()), correlate(events));
    }

    #[test]
    fn test_untagged_lines_before_first_scope_are_held() {
        let mut lines = UntaggedLines::default();
        let mut events = Vec::new();
        lines.line("# example.com/pkg", &mut events);
        assert!(events.is_empty());
        lines.enter(PKG, &mut events);
        assert_eq!(events.len(), 1);
        lines.line("more", &mut events);
        assert_eq!(events[1].scope, PKG);
    }
}
