//! Unified diff parser (`git diff`, `git show --patch`).

use crate::domain::records::{ChangeStatus, FileChange};

fn strip_side(path: &str) -> &str {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
}

/// `diff --git a/x b/x` names both sides; the split point is the last
/// ` b/`, which also handles paths containing spaces.
fn header_paths(rest: &str) -> (String, String) {
    match rest.rfind(" b/") {
        Some(i) => (strip_side(&rest[..i]).to_string(), rest[i + 3..].to_string()),
        None => (strip_side(rest).to_string(), strip_side(rest).to_string()),
    }
}

struct Section {
    change: FileChange,
    lines: Vec<String>,
    in_hunk: bool,
}

impl Section {
    fn start(old: String, new: String, header: &str) -> Self {
        Self {
            change: FileChange {
                path: new,
                old_path: Some(old),
                status: ChangeStatus::Modified,
                additions: 0,
                deletions: 0,
                binary: false,
                patch: String::new(),
            },
            lines: vec![header.to_string()],
            in_hunk: false,
        }
    }

    fn read(&mut self, line: &str) {
        self.lines.push(line.to_string());
        let change = &mut self.change;

        if line.starts_with("@@") {
            self.in_hunk = true;
            return;
        }
        if self.in_hunk {
            if line.starts_with('+') {
                change.additions += 1;
            } else if line.starts_with('-') {
                change.deletions += 1;
            }
            return;
        }

        if line.starts_with("new file mode") {
            change.status = ChangeStatus::Added;
        } else if line.starts_with("deleted file mode") {
            change.status = ChangeStatus::Deleted;
        } else if let Some(from) = line.strip_prefix("rename from ") {
            change.status = ChangeStatus::Renamed;
            change.old_path = Some(from.to_string());
        } else if let Some(to) = line.strip_prefix("rename to ") {
            change.path = to.to_string();
        } else if line.starts_with("Binary files ") || line == "GIT binary patch" {
            change.binary = true;
        } else if let Some(new) = line.strip_prefix("+++ ") {
            if new != "/dev/null" {
                change.path = strip_side(new).to_string();
            }
        } else if let Some(old) = line.strip_prefix("--- ") {
            if old != "/dev/null" {
                change.old_path = Some(strip_side(old).to_string());
            }
        }
    }

    fn finish(mut self) -> FileChange {
        self.change.patch = self.lines.join("\n");
        if self.change.status != ChangeStatus::Renamed {
            self.change.old_path = None;
        }
        self.change
    }
}

/// Split a unified diff into per-file changes.
pub fn parse_diff(text: &str) -> Vec<FileChange> {
    let mut changes = Vec::new();
    let mut section: Option<Section> = None;

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            if let Some(done) = section.take() {
                changes.push(done.finish());
            }
            let (old, new) = header_paths(rest);
            section = Some(Section::start(old, new, line));
            continue;
        }
        if let Some(current) = section.as_mut() {
            current.read(line);
        }
    }
    if let Some(done) = section.take() {
        changes.push(done.finish());
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIFF: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
index 83db48f..bf269f4 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,3 +1,4 @@
 use std::fmt;
-fn old() {}
+fn new() {}
+fn another() {}
diff --git a/NOTES.md b/NOTES.md
new file mode 100644
index 0000000..e69de29
--- /dev/null
+++ b/NOTES.md
@@ -0,0 +1 @@
+--- not a header
diff --git a/old name.txt b/new name.txt
similarity index 100%
rename from old name.txt
rename to new name.txt
diff --git a/logo.png b/logo.png
deleted file mode 100644
index 6b1f1b2..0000000
Binary files a/logo.png and /dev/null differ
";

    #[test]
    fn test_sections() {
        let changes = parse_diff(DIFF);
        assert_eq!(changes.len(), 4);

        assert_eq!(changes[0].path, "src/lib.rs");
        assert_eq!(changes[0].status, ChangeStatus::Modified);
        assert_eq!((changes[0].additions, changes[0].deletions), (2, 1));
        assert!(changes[0].old_path.is_none());
        assert!(changes[0].patch.starts_with("diff --git a/src/lib.rs"));

        assert_eq!(changes[1].status, ChangeStatus::Added);
        assert_eq!((changes[1].additions, changes[1].deletions), (1, 0));

        assert_eq!(changes[2].status, ChangeStatus::Renamed);
        assert_eq!(changes[2].path, "new name.txt");
        assert_eq!(changes[2].old_path.as_deref(), Some("old name.txt"));

        assert_eq!(changes[3].status, ChangeStatus::Deleted);
        assert!(changes[3].binary);
        assert_eq!(changes[3].path, "logo.png");
    }

    #[test]
    fn test_no_diff() {
        assert!(parse_diff("").is_empty());
    }
}
