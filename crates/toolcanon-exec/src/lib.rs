//! toolcanon process execution
//!
//! The async side of toolcanon: spawn external tools with a byte cap and
//! timeout, reject flag-shaped user values, then hand the captured output
//! to the pure pipeline in `toolcanon-core`.

pub mod error;
pub mod executor;
pub mod invocation;
pub mod pipeline;
pub mod sanitize;
pub mod session_driver;

pub use error::{ExecError, Result};
pub use executor::{ExecConfig, ExecOptions, ProcessExecutor, TokioExecutor};
pub use invocation::{invocation_for, Invocation};
pub use pipeline::{Pipeline, PipelineRun};
pub use sanitize::{sanitize_value, sanitize_values};
pub use session_driver::{session_args, SessionDriver, UNMERGED_PATHS_ARGS};
