//! Parsers for record-shaped output: VCS porcelain, logs, declarative
//! apply results.
//!
//! These tools do not report diagnostics; each parser maps the tool's
//! text onto a flat list of one canonical record kind. Lines a parser does
//! not recognize are skipped.

pub mod blame;
pub mod diff;
pub mod git_log;
pub mod log;
pub mod resources;

pub use blame::parse_blame;
pub use diff::parse_diff;
pub use git_log::{parse_git_log, GIT_LOG_FORMAT};
pub use log::parse_log;
pub use resources::parse_resources;
