//! Test-run outcome types.

use serde::{Deserialize, Serialize};

/// Status of a single test case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Running,
    Pass,
    Fail,
    Skip,
}

impl TestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TestStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Running => "running",
            TestStatus::Pass => "pass",
            TestStatus::Fail => "fail",
            TestStatus::Skip => "skip",
        }
    }
}

/// Outcome of one named test, keyed by `(scope, name)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    /// Package, module or suite the test belongs to.
    pub scope: String,

    pub name: String,

    pub status: TestStatus,

    /// Elapsed seconds as reported by the runner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,

    /// Output captured while the test ran. Only kept for failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_output: Option<String>,
}

impl TestCase {
    pub fn key(&self) -> (&str, &str) {
        (&self.scope, &self.name)
    }
}

/// A scope that failed without any named test to blame (build failure,
/// panic in init, missing test binary).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageFailure {
    pub scope: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,

    /// Scope-level output buffered outside any running test.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}
