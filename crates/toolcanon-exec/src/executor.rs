//! Process executor: spawn, capture both streams up to a byte cap, stop on
//! timeout.
//!
//! On timeout the child is killed and whatever was read so far is returned
//! with `timed_out` set; partial output is still valid pipeline input.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use toolcanon_core::RawOutput;
use tracing::{debug, warn};

use crate::error::{ExecError, Result};

/// Executor limits, loadable from `[exec]` in `toolcanon.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecConfig {
    /// Wall-clock limit per invocation.
    pub timeout_secs: u64,
    /// Bytes kept per stream; the rest is read and discarded.
    pub max_output_bytes: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            max_output_bytes: 4 * 1024 * 1024,
        }
    }
}

impl ExecConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub cwd: Option<PathBuf>,
    /// Overrides the executor's configured timeout.
    pub timeout: Option<Duration>,
    /// Extra environment for the child.
    pub env: Vec<(String, String)>,
}

impl ExecOptions {
    pub fn in_dir(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
            ..Self::default()
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Runs one external command to completion or timeout.
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    async fn execute(&self, program: &str, args: &[String], opts: &ExecOptions) -> Result<RawOutput>;
}

/// [`ProcessExecutor`] backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioExecutor {
    config: ExecConfig,
}

/// Bytes read from one stream, capped.
#[derive(Debug, Default)]
struct Capture {
    data: Vec<u8>,
    truncated: bool,
    done: bool,
}

impl Capture {
    fn push(&mut self, chunk: &[u8], cap: usize) {
        let room = cap.saturating_sub(self.data.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.data.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    fn into_string(self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

async fn read_chunk<R: AsyncRead + Unpin>(reader: &mut Option<R>, buf: &mut [u8]) -> std::io::Result<usize> {
    match reader.as_mut() {
        Some(r) => r.read(buf).await,
        None => Ok(0),
    }
}

impl TokioExecutor {
    pub fn new(config: ExecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }
}

#[async_trait]
impl ProcessExecutor for TokioExecutor {
    async fn execute(&self, program: &str, args: &[String], opts: &ExecOptions) -> Result<RawOutput> {
        let timeout = opts.timeout.unwrap_or_else(|| self.config.timeout());
        let cap = self.config.max_output_bytes;

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(opts.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .env("NO_COLOR", "1")
            .env("TERM", "dumb")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &opts.cwd {
            command.current_dir(cwd);
        }

        debug!(program, ?args, cwd = ?opts.cwd, "spawning");
        let start = Instant::now();
        let mut child = command.spawn().map_err(|source| ExecError::Spawn {
            program: program.to_string(),
            source,
        })?;

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let mut stdout = Capture {
            done: stdout_pipe.is_none(),
            ..Capture::default()
        };
        let mut stderr = Capture {
            done: stderr_pipe.is_none(),
            ..Capture::default()
        };
        let mut out_buf = vec![0u8; 8192];
        let mut err_buf = vec![0u8; 8192];

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        let io_error = |source| ExecError::Io {
            program: program.to_string(),
            source,
        };

        let mut timed_out = false;
        while !(stdout.done && stderr.done) {
            tokio::select! {
                read = read_chunk(&mut stdout_pipe, &mut out_buf), if !stdout.done => {
                    match read.map_err(io_error)? {
                        0 => stdout.done = true,
                        n => stdout.push(&out_buf[..n], cap),
                    }
                }
                read = read_chunk(&mut stderr_pipe, &mut err_buf), if !stderr.done => {
                    match read.map_err(io_error)? {
                        0 => stderr.done = true,
                        n => stderr.push(&err_buf[..n], cap),
                    }
                }
                _ = &mut deadline => {
                    timed_out = true;
                    break;
                }
            }
        }

        let exit_code = if timed_out {
            None
        } else {
            tokio::select! {
                status = child.wait() => status.map_err(io_error)?.code(),
                _ = &mut deadline => {
                    timed_out = true;
                    None
                }
            }
        };

        if timed_out {
            warn!(program, timeout_secs = timeout.as_secs(), "timed out; killing");
            if let Err(e) = child.kill().await {
                warn!(program, error = %e, "failed to kill timed-out process");
            }
        }
        if stdout.truncated || stderr.truncated {
            warn!(program, cap, "output truncated at byte cap");
        }

        Ok(RawOutput {
            stdout_truncated: stdout.truncated,
            stderr_truncated: stderr.truncated,
            stdout: stdout.into_string(),
            stderr: stderr.into_string(),
            exit_code,
            timed_out,
            duration_ms: Some(start.elapsed().as_millis() as u64),
        })
    }
}
