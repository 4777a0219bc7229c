//! Session state tracking for bisect, rebase, merge and cherry-pick.
//!
//! The external tool owns the session. [`SessionTracker`] only keeps a view
//! of it, re-derived after every step from two sources read fresh each
//! time: the step's own output and the on-disk markers.
//!
//! ```text
//! idle ──start──▶ active ──advance/continue──▶ completed
//!   ▲               │  ▲                           │
//!   │               ▼  │ continue                  │
//!   └──abort──── conflict ◀──────────────────────  │
//!   └──────────────────────────────────────abort───┘
//! ```
//!
//! A step that fails without the output or markers confirming any
//! transition is returned as [`SessionError::ToolFailed`] and leaves the
//! view untouched.

pub mod markers;
pub mod signals;

use crate::domain::raw::RawOutput;
use crate::domain::session::{
    Session, SessionDetail, SessionKind, SessionState, SessionStep, StepRecord,
};
use crate::obs;

pub use markers::{GitDirMarkers, SessionMarkers};
pub use signals::Signals;

/// Session-layer errors. Conflicts are not errors; they are a state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a {kind} is already in progress")]
    AlreadyInProgress { kind: String },

    #[error("no {kind} in progress; cannot {step}")]
    NotInProgress { kind: String, step: String },

    #[error("{kind} has no {step} step")]
    Unsupported { kind: String, step: String },

    #[error("{kind} {step} failed: {message}")]
    ToolFailed {
        kind: String,
        step: String,
        message: String,
    },
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Whether `kind` has a command for `step`.
pub fn supports(kind: SessionKind, step: SessionStep) -> bool {
    match step {
        SessionStep::Skip => kind != SessionKind::Merge,
        // Bisect moves only through good/bad verdicts.
        SessionStep::Continue | SessionStep::Quit => kind != SessionKind::Bisect,
        _ => true,
    }
}

/// First line that reads like an error, else the first non-empty line.
fn failure_message(output: &RawOutput) -> String {
    let text = if output.stderr.trim().is_empty() {
        &output.stdout
    } else {
        &output.stderr
    };
    let lines = || text.lines().map(str::trim).filter(|l| !l.is_empty());
    lines()
        .find(|l| l.starts_with("error:") || l.starts_with("fatal:"))
        .or_else(|| lines().next())
        .unwrap_or("tool exited with an error")
        .to_string()
}

/// Sequential view of one flow. Steps take `&mut self`, so a tracker can
/// only ever apply one step at a time.
#[derive(Debug)]
pub struct SessionTracker<M: SessionMarkers> {
    session: Session,
    markers: M,
}

impl<M: SessionMarkers> SessionTracker<M> {
    /// Create a tracker and derive its initial state from the markers.
    pub fn new(kind: SessionKind, markers: M) -> Self {
        let mut tracker = Self {
            session: Session::idle(kind),
            markers,
        };
        tracker.refresh();
        tracker
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn markers(&self) -> &M {
        &self.markers
    }

    pub fn kind(&self) -> SessionKind {
        self.session.kind
    }

    /// Re-derive state from the markers alone, for changes made outside
    /// the tracker.
    pub fn refresh(&mut self) -> &Session {
        let kind = self.session.kind;
        let live = self.markers.in_progress(kind);
        let state = self.session.state;
        let derived = match (live, state) {
            (true, SessionState::Idle | SessionState::Aborted) => SessionState::Active,
            // A finished bisect keeps its log until reset.
            (true, SessionState::Completed) if kind != SessionKind::Bisect => SessionState::Active,
            (false, SessionState::Active | SessionState::Conflict) => SessionState::Idle,
            (_, current) => current,
        };
        if derived != state {
            tracing::debug!(
                session = kind.subcommand(),
                from = state.as_str(),
                to = derived.as_str(),
                "session state changed outside the tracker"
            );
            self.session.state = derived;
            if !derived.is_live() {
                self.session.conflict_set.clear();
                self.session.current_ref = None;
            }
        }
        &self.session
    }

    /// Current view after a fresh marker read.
    pub fn status(&mut self) -> &Session {
        self.refresh()
    }

    /// Fold a fresh listing of unmerged paths (`git diff --name-only
    /// --diff-filter=U`) into the view. Markers only tell whether a flow is
    /// live; the listing tells whether it is stopped on conflicts, which a
    /// tracker that never saw the conflicting step cannot know otherwise.
    pub fn observe_unmerged(&mut self, listing: &RawOutput) -> &Session {
        self.refresh();
        let kind = self.session.kind;
        if kind == SessionKind::Bisect || !self.session.state.is_live() {
            return &self.session;
        }
        let paths = signals::unmerged_paths(listing);
        if paths.is_empty() {
            return &self.session;
        }
        if self.session.state != SessionState::Conflict {
            tracing::debug!(
                session = kind.subcommand(),
                conflicts = paths.len(),
                "unmerged paths found outside the tracker"
            );
        }
        self.session.state = SessionState::Conflict;
        self.session.conflict_set = paths;
        &self.session
    }

    /// Check that `step` can be issued now. Callers run the tool only after
    /// this succeeds; `abort` is always allowed.
    pub fn check(&mut self, step: SessionStep) -> SessionResult<()> {
        let kind = self.session.kind;
        if !supports(kind, step) {
            return Err(SessionError::Unsupported {
                kind: kind.subcommand().to_string(),
                step: step.as_str().to_string(),
            });
        }
        let state = self.refresh().state;
        match step {
            SessionStep::Start if state.is_live() => Err(SessionError::AlreadyInProgress {
                kind: kind.subcommand().to_string(),
            }),
            SessionStep::Advance | SessionStep::Continue | SessionStep::Skip | SessionStep::Quit
                if !state.is_live() =>
            {
                Err(SessionError::NotInProgress {
                    kind: kind.subcommand().to_string(),
                    step: step.as_str().to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn start(&mut self, output: &RawOutput) -> SessionResult<&Session> {
        self.apply(SessionStep::Start, output)
    }

    pub fn advance(&mut self, output: &RawOutput) -> SessionResult<&Session> {
        self.apply(SessionStep::Advance, output)
    }

    /// Continue after conflicts were resolved.
    pub fn resolve(&mut self, output: &RawOutput) -> SessionResult<&Session> {
        self.apply(SessionStep::Continue, output)
    }

    pub fn skip(&mut self, output: &RawOutput) -> SessionResult<&Session> {
        self.apply(SessionStep::Skip, output)
    }

    pub fn quit(&mut self, output: &RawOutput) -> SessionResult<&Session> {
        self.apply(SessionStep::Quit, output)
    }

    /// Abort or reset. From `idle` this is a no-op that succeeds.
    pub fn abort(&mut self, output: &RawOutput) -> SessionResult<&Session> {
        self.apply(SessionStep::Abort, output)
    }

    /// Fold one step's output into the view.
    pub fn apply(&mut self, step: SessionStep, output: &RawOutput) -> SessionResult<&Session> {
        let kind = self.session.kind;
        let from = self.session.state;
        let signals = signals::read(output);
        let live = self.markers.in_progress(kind);

        if step == SessionStep::Abort {
            if live && output.exited_nonzero() {
                return Err(self.tool_failed(step, output));
            }
            let recorded = if from == SessionState::Idle {
                SessionState::Idle
            } else {
                SessionState::Aborted
            };
            self.session.state = SessionState::Idle;
            self.session.conflict_set.clear();
            self.session.current_ref = None;
            self.session.detail = None;
            self.record(step, from, recorded);
            return Ok(&self.session);
        }

        let confirmed = signals.confirms_transition() || live != from.is_live();
        if output.exited_nonzero() && !confirmed {
            return Err(self.tool_failed(step, output));
        }

        let to = Self::derive(step, &signals, live);
        self.session.state = to;

        if to == SessionState::Conflict {
            if !signals.conflicts.is_empty() {
                self.session.conflict_set = signals.conflicts.iter().cloned().collect();
            }
        } else {
            self.session.conflict_set.clear();
        }

        let next_ref = match kind {
            SessionKind::Bisect => signals.first_bad.clone().or(signals.bisect_ref.clone()),
            SessionKind::Rebase => signals.could_not_apply.clone().or(signals.stopped_at.clone()),
            SessionKind::CherryPick => signals.could_not_apply.clone().or(signals.committed.clone()),
            SessionKind::Merge => None,
        };
        self.session.current_ref = match next_ref {
            Some(r) => Some(r),
            None if to.is_live() => self.session.current_ref.take(),
            None => None,
        };

        self.session.detail = Some(self.detail(to, &signals));
        self.record(step, from, to);
        Ok(&self.session)
    }

    fn derive(step: SessionStep, signals: &Signals, live: bool) -> SessionState {
        if !signals.conflicts.is_empty()
            || signals.automatic_merge_failed
            || (live && signals.could_not_apply.is_some())
        {
            SessionState::Conflict
        } else if signals.first_bad.is_some() {
            SessionState::Completed
        } else if live {
            SessionState::Active
        } else if step == SessionStep::Quit {
            SessionState::Idle
        } else {
            SessionState::Completed
        }
    }

    fn detail(&self, to: SessionState, signals: &Signals) -> SessionDetail {
        match self.session.kind {
            SessionKind::Merge => SessionDetail::Merge {
                merged: to == SessionState::Completed
                    && (signals.fast_forward || signals.merge_made || signals.committed.is_some()),
                fast_forward: signals.fast_forward,
            },
            SessionKind::Bisect => {
                let previous = match &self.session.detail {
                    Some(SessionDetail::Bisect { remaining, .. }) if to.is_live() => *remaining,
                    _ => None,
                };
                SessionDetail::Bisect {
                    first_bad: signals.first_bad.clone(),
                    remaining: signals.remaining.or(previous),
                }
            }
            SessionKind::Rebase => SessionDetail::Rebase {
                stopped_at: signals
                    .stopped_at
                    .clone()
                    .or(signals.could_not_apply.clone()),
            },
            SessionKind::CherryPick => SessionDetail::CherryPick {
                applied: signals.committed.clone(),
            },
        }
    }

    fn record(&mut self, step: SessionStep, from: SessionState, to: SessionState) {
        let kind = self.session.kind.subcommand();
        obs::emit_session_step(kind, step.as_str(), from.as_str(), to.as_str());
        // `to` is what the history shows; the table treats aborted as idle.
        let landed = if to == SessionState::Aborted {
            SessionState::Idle
        } else {
            to
        };
        if !step.allows(from, landed) {
            obs::emit_session_unexpected(kind, step.as_str(), from.as_str(), to.as_str());
        }
        self.session.history.push(StepRecord { step, from, to });
    }

    fn tool_failed(&self, step: SessionStep, output: &RawOutput) -> SessionError {
        SessionError::ToolFailed {
            kind: self.session.kind.subcommand().to_string(),
            step: step.as_str().to_string(),
            message: failure_message(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Markers the test flips by hand between steps.
    #[derive(Default)]
    struct Flag(Cell<bool>);

    impl Flag {
        fn set(&self, live: bool) {
            self.0.set(live);
        }
    }

    impl SessionMarkers for Flag {
        fn in_progress(&self, _kind: SessionKind) -> bool {
            self.0.get()
        }
    }

    fn tracker(kind: SessionKind) -> SessionTracker<Flag> {
        SessionTracker::new(kind, Flag::default())
    }

    #[test]
    fn test_merge_conflict() {
        let mut t = tracker(SessionKind::Merge);
        t.check(SessionStep::Start).expect("idle");
        t.markers().set(true);
        let out = RawOutput::stdout(
            "Auto-merging src/a.ts\nCONFLICT (content): Merge conflict in src/a.ts\nAutomatic merge failed; fix conflicts and then commit the result.\n",
            1,
        );
        let s = t.start(&out).expect("conflict is a state");
        assert_eq!(s.state, SessionState::Conflict);
        assert_eq!(s.conflict_set.iter().collect::<Vec<_>>(), vec!["src/a.ts"]);
        assert_eq!(
            s.detail,
            Some(SessionDetail::Merge {
                merged: false,
                fast_forward: false
            })
        );
    }

    #[test]
    fn test_merge_fast_forward_completes_in_one_step() {
        let mut t = tracker(SessionKind::Merge);
        let out = RawOutput::stdout("Updating 1a2b3c4..5d6e7f8\nFast-forward\n a.txt | 1 +\n", 0);
        let s = t.start(&out).expect("start");
        assert_eq!(s.state, SessionState::Completed);
        assert_eq!(
            s.detail,
            Some(SessionDetail::Merge {
                merged: true,
                fast_forward: true
            })
        );
        t.check(SessionStep::Start).expect("completed behaves as idle");
    }

    #[test]
    fn test_bisect_flow() {
        let mut t = tracker(SessionKind::Bisect);
        t.markers().set(true);
        let s = t
            .start(&RawOutput::stdout(
                "Bisecting: 3 revisions left to test after this (roughly 2 steps)\n[aaaaaaa1] Step\n",
                0,
            ))
            .expect("start");
        assert_eq!(s.state, SessionState::Active);
        assert_eq!(s.current_ref.as_deref(), Some("aaaaaaa1"));

        let s = t
            .advance(&RawOutput::stdout("bbbbbbb2 is the first bad commit\n", 0))
            .expect("advance");
        assert_eq!(s.state, SessionState::Completed);
        assert_eq!(
            s.detail,
            Some(SessionDetail::Bisect {
                first_bad: Some("bbbbbbb2".to_string()),
                remaining: None
            })
        );

        // The log stays until reset; a refresh must not reopen the session.
        assert_eq!(t.refresh().state, SessionState::Completed);

        t.markers().set(false);
        let s = t
            .abort(&RawOutput::stdout("Previous HEAD position was bbbbbbb2\n", 0))
            .expect("reset");
        assert_eq!(s.state, SessionState::Idle);
        let last = s.history.last().expect("history");
        assert_eq!((last.from, last.to), (SessionState::Completed, SessionState::Aborted));
        assert_eq!(s.history.len(), 3);
    }

    #[test]
    fn test_reset_from_idle_stays_idle() {
        let mut t = tracker(SessionKind::Merge);
        t.check(SessionStep::Abort).expect("abort always allowed");
        let out = RawOutput::stderr("fatal: There is no merge to abort (MERGE_HEAD missing).\n", 128);
        let s = t.abort(&out).expect("idle abort succeeds");
        assert_eq!(s.state, SessionState::Idle);
        assert_eq!(s.history[0].to, SessionState::Idle);
    }

    #[test]
    fn test_hard_error_leaves_state_untouched() {
        let mut t = tracker(SessionKind::Rebase);
        t.markers().set(true);
        t.start(&RawOutput::stdout(
            "CONFLICT (content): Merge conflict in lib.rs\nerror: could not apply 1234567... Edit\n",
            1,
        ))
        .expect("conflict");
        let before = t.session().clone();

        let err = t
            .resolve(&RawOutput::stderr(
                "lib.rs: needs merge\nerror: you must edit all merge conflicts and then\nmark them as resolved using git add\n",
                1,
            ))
            .expect_err("unresolved conflicts");
        assert!(matches!(err, SessionError::ToolFailed { .. }));
        assert!(err.to_string().contains("you must edit all merge conflicts"));
        assert_eq!(t.session(), &before);
    }

    #[test]
    fn test_rebase_conflict_then_continue_to_completion() {
        let mut t = tracker(SessionKind::Rebase);
        t.markers().set(true);
        let s = t
            .start(&RawOutput::stdout(
                "CONFLICT (content): Merge conflict in lib.rs\nerror: could not apply 1234567... Edit\n",
                1,
            ))
            .expect("conflict");
        assert_eq!(s.state, SessionState::Conflict);
        assert_eq!(s.current_ref.as_deref(), Some("1234567"));

        t.markers().set(false);
        let s = t
            .resolve(&RawOutput::stdout("Successfully rebased and updated refs/heads/topic.\n", 0))
            .expect("continue");
        assert_eq!(s.state, SessionState::Completed);
        assert!(s.conflict_set.is_empty());
    }

    #[test]
    fn test_cherry_pick_quit_goes_idle() {
        let mut t = tracker(SessionKind::CherryPick);
        t.markers().set(true);
        t.start(&RawOutput::stderr(
            "error: could not apply 7654321... Fix\nCONFLICT (content): Merge conflict in a.c\n",
            1,
        ))
        .expect("conflict");
        t.markers().set(false);
        let s = t.quit(&RawOutput::stdout("", 0)).expect("quit");
        assert_eq!(s.state, SessionState::Idle);
    }

    #[test]
    fn test_check_rejects_out_of_state_steps() {
        let mut t = tracker(SessionKind::Bisect);
        assert!(matches!(
            t.check(SessionStep::Advance),
            Err(SessionError::NotInProgress { .. })
        ));
        assert!(matches!(
            t.check(SessionStep::Quit),
            Err(SessionError::Unsupported { .. })
        ));
        t.markers().set(true);
        assert!(matches!(
            t.check(SessionStep::Start),
            Err(SessionError::AlreadyInProgress { .. })
        ));
    }

    #[test]
    fn test_fresh_tracker_sees_conflict_from_unmerged_listing() {
        let markers = Flag::default();
        markers.set(true);
        let mut t = SessionTracker::new(SessionKind::Merge, markers);
        assert_eq!(t.status().state, SessionState::Active);

        let s = t.observe_unmerged(&RawOutput::stdout("src/a.ts\n", 0));
        assert_eq!(s.state, SessionState::Conflict);
        assert_eq!(s.conflict_set.iter().collect::<Vec<_>>(), vec!["src/a.ts"]);
    }

    #[test]
    fn test_unmerged_listing_ignored_when_idle() {
        let mut t = tracker(SessionKind::CherryPick);
        let s = t.observe_unmerged(&RawOutput::stdout("src/a.ts\n", 0));
        assert_eq!(s.state, SessionState::Idle);
        assert!(s.conflict_set.is_empty());
    }

    #[test]
    fn test_refresh_picks_up_out_of_band_changes() {
        let mut t = tracker(SessionKind::Merge);
        t.markers().set(true);
        assert_eq!(t.status().state, SessionState::Active);
        t.markers().set(false);
        assert_eq!(t.status().state, SessionState::Idle);
    }
}
