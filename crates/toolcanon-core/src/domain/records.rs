//! Record types for VCS, log and resource output.

use serde::{Deserialize, Serialize};

/// One commit from `git log`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Commit {
    pub hash: String,
    pub author: String,
    /// Author date, verbatim (ISO 8601 with `%aI`).
    pub date: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// How a file changed in a diff.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

/// One file section of a unified diff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    pub status: ChangeStatus,
    pub additions: u32,
    pub deletions: u32,
    /// Whether git reported the file as binary.
    #[serde(default)]
    pub binary: bool,
    /// The full section text, headers included.
    pub patch: String,
}

/// Attribution of one final-file line from `git blame --porcelain`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlameLine {
    /// Final line number (1-indexed).
    pub line: u32,
    pub commit: String,
    pub author: String,
    pub summary: String,
}

/// Stream a log line was read from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LogStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogLine {
    pub line: String,
    pub stream: LogStream,
}

/// What a declarative apply did to a resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceAction {
    Created,
    Configured,
    Unchanged,
    Deleted,
    Other,
}

impl ResourceAction {
    pub fn from_word(word: &str) -> Self {
        match word.trim().to_ascii_lowercase().as_str() {
            "created" => ResourceAction::Created,
            "configured" | "updated" | "recreated" | "serverside-applied" | "started"
            | "restarted" | "pulled" | "built" => ResourceAction::Configured,
            "unchanged" | "up-to-date" | "running" | "healthy" => ResourceAction::Unchanged,
            "deleted" | "removed" | "pruned" | "stopped" => ResourceAction::Deleted,
            _ => ResourceAction::Other,
        }
    }

    /// Whether this action altered the resource.
    pub fn is_change(&self) -> bool {
        !matches!(self, ResourceAction::Unchanged)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceChange {
    /// Resource kind (e.g. `deployment.apps`, `container`).
    pub kind: String,
    pub name: String,
    pub action: ResourceAction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_action_words() {
        assert_eq!(ResourceAction::from_word("created"), ResourceAction::Created);
        assert_eq!(
            ResourceAction::from_word("configured"),
            ResourceAction::Configured
        );
        assert_eq!(
            ResourceAction::from_word("Unchanged"),
            ResourceAction::Unchanged
        );
        assert_eq!(ResourceAction::from_word("pruned"), ResourceAction::Deleted);
        assert_eq!(ResourceAction::from_word("tainted"), ResourceAction::Other);
    }

    #[test]
    fn test_resource_action_is_change() {
        assert!(ResourceAction::Created.is_change());
        assert!(ResourceAction::Other.is_change());
        assert!(!ResourceAction::Unchanged.is_change());
    }
}
