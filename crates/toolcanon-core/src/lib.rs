//! toolcanon core library
//!
//! Turns raw developer-tool output into validated canonical results,
//! derives bounded compact projections and tracks multi-step git flows.
//! Everything here is synchronous and pure over already-captured output;
//! process execution lives in `toolcanon-exec`.

pub mod aggregate;
pub mod boundary;
pub mod compact;
pub mod correlate;
pub mod domain;
pub mod extract;
pub mod obs;
pub mod present;
pub mod records;
pub mod session;
pub mod telemetry;
pub mod tool;
pub mod validate;

pub use boundary::{respond, Representation, Response};
pub use compact::{compact, recompact, CompactionConfig};
pub use correlate::{correlate, correlate_output, Correlator, TestEvent, TestStreamAdapter};
pub use domain::{
    CanonError, CanonicalResult, Children, CompactResult, Counts, Diagnostic, InputFormat,
    InvocationContext, Location, RawError, RawOutput, Result, ResultKind, Session, SessionKind,
    SessionState, SessionStep, Severity, TestCase, TestStatus, ValidationError,
};
pub use extract::{extract, DiagnosticAdapter, Extraction};
pub use present::{render_canonical, render_compact, render_session};
pub use session::markers::{GitDirMarkers, SessionMarkers};
pub use session::{SessionError, SessionTracker};
pub use tool::{canonicalize, Parser, Tool, ToolRegistry};
pub use validate::{validate_canonical, validate_compact};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
