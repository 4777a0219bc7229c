//! Drives git multi-step flows: check the step, run git, fold the output
//! into the tracker.

use std::path::{Path, PathBuf};

use toolcanon_core::session::{GitDirMarkers, SessionError, SessionTracker};
use toolcanon_core::{Session, SessionKind, SessionStep};
use tracing::debug;

use crate::error::{ExecError, Result};
use crate::executor::{ExecOptions, ProcessExecutor};
use crate::sanitize::sanitize_values;

/// Bisect verdicts accepted as the first value of an advance step.
const BISECT_VERDICTS: &[&str] = &["good", "bad", "old", "new"];

/// Lists paths with unresolved conflicts in the index.
pub const UNMERGED_PATHS_ARGS: &[&str] = &["diff", "--name-only", "--diff-filter=U"];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn unsupported(kind: SessionKind, step: SessionStep) -> ExecError {
    SessionError::Unsupported {
        kind: kind.subcommand().to_string(),
        step: step.as_str().to_string(),
    }
    .into()
}

/// git arguments for one step. `values` are refs or, for a bisect advance,
/// a verdict followed by optional refs.
pub fn session_args(kind: SessionKind, step: SessionStep, values: &[String]) -> Result<Vec<String>> {
    let sub = kind.subcommand();
    let mut args = match (kind, step) {
        (SessionKind::Bisect, SessionStep::Start) => strings(&["bisect", "start"]),
        (SessionKind::Bisect, SessionStep::Advance) => {
            let verdict = values.first().map(String::as_str).unwrap_or_default();
            if !BISECT_VERDICTS.contains(&verdict) {
                return Err(ExecError::InvalidArgument {
                    value: verdict.to_string(),
                    reason: "bisect advance needs good, bad, old or new".to_string(),
                });
            }
            let mut args = strings(&["bisect", verdict]);
            args.extend(sanitize_values(&values[1..])?);
            return Ok(args);
        }
        (SessionKind::Bisect, SessionStep::Skip) => strings(&["bisect", "skip"]),
        (SessionKind::Bisect, SessionStep::Abort) => strings(&["bisect", "reset"]),
        (SessionKind::Bisect, _) => return Err(unsupported(kind, step)),

        (SessionKind::Merge, SessionStep::Start) => strings(&["merge", "--no-edit"]),
        (SessionKind::Merge, SessionStep::Skip) => return Err(unsupported(kind, step)),

        (_, SessionStep::Start) => vec![sub.to_string()],
        (_, SessionStep::Advance | SessionStep::Continue) => vec![sub.to_string(), "--continue".to_string()],
        (_, SessionStep::Skip) => vec![sub.to_string(), "--skip".to_string()],
        (_, SessionStep::Quit) => vec![sub.to_string(), "--quit".to_string()],
        (_, SessionStep::Abort) => vec![sub.to_string(), "--abort".to_string()],
    };

    if step == SessionStep::Start {
        if values.is_empty() && kind != SessionKind::Bisect {
            return Err(ExecError::MissingValues {
                tool: sub.to_string(),
                min: 1,
            });
        }
        args.extend(sanitize_values(values)?);
    }
    Ok(args)
}

/// One tracked flow in one work tree.
pub struct SessionDriver<E: ProcessExecutor> {
    executor: E,
    worktree: PathBuf,
    tracker: SessionTracker<GitDirMarkers>,
}

impl<E: ProcessExecutor> SessionDriver<E> {
    pub fn new(executor: E, kind: SessionKind, worktree: impl Into<PathBuf>) -> Self {
        let worktree = worktree.into();
        let markers = GitDirMarkers::for_worktree(&worktree);
        Self {
            executor,
            tracker: SessionTracker::new(kind, markers),
            worktree,
        }
    }

    pub fn worktree(&self) -> &Path {
        &self.worktree
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Current view. While a merge, rebase or cherry-pick is live, git is
    /// asked for unmerged paths so a conflict shows even when this driver
    /// never ran the conflicting step.
    pub async fn status(&mut self) -> Result<&Session> {
        let kind = self.tracker.kind();
        let live = self.tracker.status().state.is_live();
        if !live || kind == SessionKind::Bisect {
            return Ok(self.tracker.session());
        }
        let listing = self
            .executor
            .execute("git", &strings(UNMERGED_PATHS_ARGS), &self.git_options())
            .await?;
        Ok(self.tracker.observe_unmerged(&listing))
    }

    fn git_options(&self) -> ExecOptions {
        // Continue steps would otherwise open an editor for the message.
        ExecOptions::in_dir(&self.worktree)
            .with_env("GIT_EDITOR", "true")
            .with_env("GIT_TERMINAL_PROMPT", "0")
    }

    /// Check, run and fold one step. Conflicts come back as a session in
    /// the `conflict` state, not as an error.
    pub async fn step(&mut self, step: SessionStep, values: &[String]) -> Result<&Session> {
        let kind = self.tracker.kind();
        let args = session_args(kind, step, values)?;
        self.tracker.check(step)?;

        let opts = self.git_options();
        debug!(session = kind.subcommand(), step = step.as_str(), ?args, "running session step");
        let output = self.executor.execute("git", &args, &opts).await?;
        Ok(self.tracker.apply(step, &output)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(v: &[&str]) -> Vec<String> {
        strings(v)
    }

    #[test]
    fn test_merge_start_args() {
        let args = session_args(SessionKind::Merge, SessionStep::Start, &values(&["feature"])).expect("args");
        assert_eq!(args, values(&["merge", "--no-edit", "feature"]));
    }

    #[test]
    fn test_start_needs_a_ref() {
        assert!(matches!(
            session_args(SessionKind::CherryPick, SessionStep::Start, &[]),
            Err(ExecError::MissingValues { .. })
        ));
        assert_eq!(
            session_args(SessionKind::Bisect, SessionStep::Start, &[]).expect("args"),
            values(&["bisect", "start"])
        );
    }

    #[test]
    fn test_bisect_advance_takes_verdict() {
        let args = session_args(SessionKind::Bisect, SessionStep::Advance, &values(&["bad", "HEAD~2"]))
            .expect("args");
        assert_eq!(args, values(&["bisect", "bad", "HEAD~2"]));
        assert!(session_args(SessionKind::Bisect, SessionStep::Advance, &values(&["--run"])).is_err());
    }

    #[test]
    fn test_rebase_steps() {
        assert_eq!(
            session_args(SessionKind::Rebase, SessionStep::Continue, &[]).expect("args"),
            values(&["rebase", "--continue"])
        );
        assert_eq!(
            session_args(SessionKind::Rebase, SessionStep::Abort, &[]).expect("args"),
            values(&["rebase", "--abort"])
        );
    }

    #[test]
    fn test_unsupported_steps() {
        assert!(matches!(
            session_args(SessionKind::Merge, SessionStep::Skip, &[]),
            Err(ExecError::Session(SessionError::Unsupported { .. }))
        ));
        assert!(session_args(SessionKind::Bisect, SessionStep::Quit, &[]).is_err());
    }

    #[test]
    fn test_start_values_sanitized() {
        assert!(matches!(
            session_args(SessionKind::Merge, SessionStep::Start, &values(&["--strategy=ours"])),
            Err(ExecError::InvalidArgument { .. })
        ));
    }
}
