//! Error types for the execution layer.

use toolcanon_core::session::SessionError;
use toolcanon_core::CanonError;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error while running `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("rejected argument {value:?}: {reason}")]
    InvalidArgument { value: String, reason: String },

    #[error("tool {tool} needs at least {min} value(s)")]
    MissingValues { tool: String, min: usize },

    #[error("no command is known for tool: {0}")]
    NotRunnable(String),

    #[error(transparent)]
    Canon(#[from] CanonError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

pub type Result<T> = std::result::Result<T, ExecError>;
