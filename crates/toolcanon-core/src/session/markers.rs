//! On-disk session markers, read fresh on every query.

use std::path::{Path, PathBuf};

use crate::domain::session::SessionKind;

/// Read-only oracle for "is this flow in progress?".
///
/// Implementations must not cache: the external tool can change the answer
/// between any two calls.
pub trait SessionMarkers {
    fn in_progress(&self, kind: SessionKind) -> bool;
}

/// Markers under a repository's git directory.
#[derive(Debug, Clone)]
pub struct GitDirMarkers {
    git_dir: PathBuf,
}

impl GitDirMarkers {
    pub fn new(git_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
        }
    }

    /// Locate the git directory of a work tree. A `.git` file (linked
    /// worktrees, submodules) is followed through its `gitdir:` line.
    pub fn for_worktree(worktree: &Path) -> Self {
        let dot_git = worktree.join(".git");
        if dot_git.is_file() {
            if let Ok(text) = std::fs::read_to_string(&dot_git) {
                if let Some(target) = text.lines().find_map(|l| l.strip_prefix("gitdir:")) {
                    let target = Path::new(target.trim());
                    let resolved = if target.is_absolute() {
                        target.to_path_buf()
                    } else {
                        worktree.join(target)
                    };
                    return Self::new(resolved);
                }
            }
        }
        Self::new(dot_git)
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Marker paths for a flow; any one existing means in progress.
    pub fn marker_paths(&self, kind: SessionKind) -> Vec<PathBuf> {
        let names: &[&str] = match kind {
            SessionKind::Bisect => &["BISECT_LOG"],
            SessionKind::Rebase => &["rebase-merge", "rebase-apply"],
            SessionKind::Merge => &["MERGE_HEAD"],
            SessionKind::CherryPick => &["CHERRY_PICK_HEAD", "sequencer"],
        };
        names.iter().map(|n| self.git_dir.join(n)).collect()
    }
}

impl SessionMarkers for GitDirMarkers {
    fn in_progress(&self, kind: SessionKind) -> bool {
        self.marker_paths(kind).iter().any(|p| p.exists())
    }
}
