//! Domain models for toolcanon.
//!
//! Canonical definitions for the core entities:
//! - `Diagnostic` / `RawError`: located and unlocated compiler/linter findings
//! - `TestCase` / `PackageFailure`: correlated test-run outcomes
//! - `CanonicalResult`: aggregate root for one invocation
//! - `CompactResult`: bounded, declared-lossy projection of a canonical result
//! - `Session`: read-derived view of a multi-step external-tool flow

pub mod compact;
pub mod diagnostic;
pub mod error;
pub mod raw;
pub mod records;
pub mod result;
pub mod session;
pub mod test_case;

pub use compact::{
    BlameRange, CompactChange, CompactChildren, CompactCommit, CompactDiagnostic, CompactFailure,
    CompactResult, Sampled, Strategy,
};
pub use diagnostic::{Diagnostic, Location, RawError, RawErrorKind, Severity};
pub use error::{CanonError, Result, ValidationError};
pub use raw::RawOutput;
pub use records::{
    BlameLine, ChangeStatus, Commit, FileChange, LogLine, LogStream, ResourceAction,
    ResourceChange,
};
pub use result::{CanonicalResult, Children, Counts, InputFormat, InvocationContext, ResultKind};
pub use session::{Session, SessionDetail, SessionKind, SessionState, SessionStep, StepRecord};
pub use test_case::{PackageFailure, TestCase, TestStatus};
