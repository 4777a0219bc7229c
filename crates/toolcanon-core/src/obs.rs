//! Structured observability hooks for pipeline and session events.
//!
//! This module provides:
//! - An invocation-scoped tracing span via the [`InvocationSpan`] RAII guard
//! - Emission functions for canonicalization, compaction, session steps and
//!   malformed input
//!
//! Events are plain `tracing` events; nothing is accumulated in process
//! state between invocations.

use tracing::{debug, info, warn};

/// RAII guard that enters an invocation-scoped span.
///
/// # Example
///
/// ```ignore
/// let _span = InvocationSpan::enter("go-build");
/// // events below are tagged with tool = "go-build"
/// ```
pub struct InvocationSpan {
    _span: tracing::span::EnteredSpan,
}

impl InvocationSpan {
    pub fn enter(tool: &str) -> Self {
        let span = tracing::info_span!("toolcanon.invocation", tool = %tool);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: raw output turned into a canonical result.
pub fn emit_canonicalized(tool: &str, kind: &str, total: u32, success: bool, format: &str) {
    info!(
        event = "invocation.canonicalized",
        tool = %tool,
        kind = %kind,
        total = total,
        success = success,
        input_format = %format,
    );
}

/// Emit event: a compact projection was produced.
pub fn emit_compact_applied(tool: &str, kind: &str, children: usize, kept: usize) {
    debug!(
        event = "compact.applied",
        tool = %tool,
        kind = %kind,
        children = children,
        kept = kept,
    );
}

/// Emit event: a session step was applied.
pub fn emit_session_step(kind: &str, step: &str, from: &str, to: &str) {
    info!(
        event = "session.step",
        session = %kind,
        step = %step,
        from = %from,
        to = %to,
    );
}

/// Emit event: a session moved along an edge outside the transition table.
///
/// The tool's output is still trusted; this only flags the surprise.
pub fn emit_session_unexpected(kind: &str, step: &str, from: &str, to: &str) {
    warn!(
        event = "session.unexpected_transition",
        session = %kind,
        step = %step,
        from = %from,
        to = %to,
    );
}

/// Emit event: tool output could not be read in any known shape (warning level).
pub fn emit_malformed_input(tool: &str, reason: &str) {
    warn!(event = "input.malformed", tool = %tool, reason = %reason);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_span_create() {
        let _span = InvocationSpan::enter("go-build");
        emit_canonicalized("go-build", "diagnostics", 1, false, "text");
    }
}
