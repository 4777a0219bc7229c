//! Session view types for multi-step external-tool flows.
//!
//! A [`Session`] is re-derived from the tool's own output and on-disk
//! markers after every step; it is never the source of truth.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Which multi-step flow a session tracks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SessionKind {
    Bisect,
    Rebase,
    Merge,
    CherryPick,
}

impl SessionKind {
    /// The git subcommand driving this flow.
    pub fn subcommand(&self) -> &'static str {
        match self {
            SessionKind::Bisect => "bisect",
            SessionKind::Rebase => "rebase",
            SessionKind::Merge => "merge",
            SessionKind::CherryPick => "cherry-pick",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bisect" => Some(SessionKind::Bisect),
            "rebase" => Some(SessionKind::Rebase),
            "merge" => Some(SessionKind::Merge),
            "cherry-pick" | "cherry_pick" | "cherrypick" => Some(SessionKind::CherryPick),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Active,
    Conflict,
    Completed,
    /// Recorded in history when an abort ended a live session. The session
    /// itself always lands in `Idle` after an abort.
    Aborted,
}

impl SessionState {
    /// Whether a flow is in progress (markers expected on disk).
    pub fn is_live(&self) -> bool {
        matches!(self, SessionState::Active | SessionState::Conflict)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Active => "active",
            SessionState::Conflict => "conflict",
            SessionState::Completed => "completed",
            SessionState::Aborted => "aborted",
        }
    }
}

/// A caller-issued step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionStep {
    /// Begin the flow (`git merge <ref>`, `git bisect start ...`).
    Start,
    /// Move an active flow forward (`git bisect good|bad`, `git rebase --continue` after an edit stop).
    Advance,
    /// Resume after conflicts were resolved.
    Continue,
    /// Skip the current commit (bisect, rebase, cherry-pick).
    Skip,
    /// End the sequencer but keep the working tree (cherry-pick).
    Quit,
    /// Abort or reset back to the pre-session state.
    Abort,
}

impl SessionStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStep::Start => "start",
            SessionStep::Advance => "advance",
            SessionStep::Continue => "continue",
            SessionStep::Skip => "skip",
            SessionStep::Quit => "quit",
            SessionStep::Abort => "abort",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "start" | "begin" => Some(SessionStep::Start),
            "advance" | "good" | "bad" | "step" => Some(SessionStep::Advance),
            "continue" | "resolve" => Some(SessionStep::Continue),
            "skip" => Some(SessionStep::Skip),
            "quit" => Some(SessionStep::Quit),
            "abort" | "reset" => Some(SessionStep::Abort),
            _ => None,
        }
    }

    /// Documented transition table. Observed transitions outside it are
    /// still accepted (the tool is authoritative) but get logged.
    pub fn allows(&self, from: SessionState, to: SessionState) -> bool {
        use SessionState::*;
        let from_idle = matches!(from, Idle | Completed | Aborted);
        match self {
            SessionStep::Start => from_idle && matches!(to, Active | Conflict | Completed),
            SessionStep::Advance => from == Active && matches!(to, Active | Completed | Conflict),
            SessionStep::Continue => {
                matches!(from, Conflict | Active) && matches!(to, Active | Completed | Conflict)
            }
            SessionStep::Skip | SessionStep::Quit => {
                from.is_live() && matches!(to, Active | Idle | Completed | Conflict)
            }
            SessionStep::Abort => to == Idle,
        }
    }
}

/// Flow-specific facts parsed from the latest step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SessionDetail {
    Merge {
        merged: bool,
        fast_forward: bool,
    },
    Bisect {
        #[serde(skip_serializing_if = "Option::is_none")]
        first_bad: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        remaining: Option<u32>,
    },
    Rebase {
        #[serde(skip_serializing_if = "Option::is_none")]
        stopped_at: Option<String>,
    },
    CherryPick {
        #[serde(skip_serializing_if = "Option::is_none")]
        applied: Option<String>,
    },
}

/// One accepted step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepRecord {
    pub step: SessionStep,
    pub from: SessionState,
    pub to: SessionState,
}

/// Read-derived view of a multi-step flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub kind: SessionKind,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_ref: Option<String>,
    pub conflict_set: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<SessionDetail>,
    pub history: Vec<StepRecord>,
}

impl Session {
    pub fn idle(kind: SessionKind) -> Self {
        Self {
            kind,
            state: SessionState::Idle,
            current_ref: None,
            conflict_set: BTreeSet::new(),
            detail: None,
            history: Vec::new(),
        }
    }
}
