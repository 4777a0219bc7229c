//! Raw captured output handed to the pipeline by the process executor.

use serde::{Deserialize, Serialize};

/// Everything the executor captured from one tool invocation.
///
/// The executor may have cut either stream at its byte cap or stopped the
/// process on timeout; those facts arrive as explicit flags and are copied
/// into the result context as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed or never reported a code.
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub stdout_truncated: bool,
    #[serde(default)]
    pub stderr_truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl RawOutput {
    /// Output with only stdout and an exit code (handy for fixtures).
    pub fn stdout(text: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: text.into(),
            exit_code: Some(exit_code),
            ..Self::default()
        }
    }

    /// Output with only stderr and an exit code.
    pub fn stderr(text: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stderr: text.into(),
            exit_code: Some(exit_code),
            ..Self::default()
        }
    }

    /// Both streams, stdout first. Tools interleave diagnostics across
    /// streams unpredictably; text parsers read the union.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (true, _) => self.stderr.clone(),
            (false, true) => self.stdout.clone(),
            (false, false) => {
                let mut out = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
                out.push_str(&self.stdout);
                if !self.stdout.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&self.stderr);
                out
            }
        }
    }

    pub fn exited_nonzero(&self) -> bool {
        matches!(self.exit_code, Some(code) if code != 0)
    }
}
