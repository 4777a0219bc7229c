//! `git blame --porcelain` parser.
//!
//! Porcelain prints the full header block only the first time a commit
//! appears; later groups for the same commit carry just the
//! `<sha> <orig> <final> [<count>]` line. Author and summary are looked up
//! from the first block.

use std::collections::HashMap;

use crate::domain::records::BlameLine;

#[derive(Default, Clone)]
struct CommitInfo {
    author: String,
    summary: String,
}

fn is_sha(word: &str) -> bool {
    word.len() >= 7 && word.len() <= 64 && word.bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn parse_blame(text: &str) -> Vec<BlameLine> {
    let mut lines = Vec::new();
    let mut commits: HashMap<String, CommitInfo> = HashMap::new();
    let mut current: Option<(String, u32)> = None;

    for line in text.lines() {
        if line.starts_with('\t') {
            if let Some((sha, final_line)) = current.take() {
                let info = commits.get(&sha).cloned().unwrap_or_default();
                lines.push(BlameLine {
                    line: final_line,
                    commit: sha,
                    author: info.author,
                    summary: info.summary,
                });
            }
            continue;
        }

        let mut words = line.split(' ');
        let first = words.next().unwrap_or_default();
        if is_sha(first) {
            let final_line = words.nth(1).and_then(|w| w.parse::<u32>().ok());
            if let Some(final_line) = final_line.filter(|n| *n > 0) {
                commits.entry(first.to_string()).or_default();
                current = Some((first.to_string(), final_line));
                continue;
            }
        }

        let Some((sha, _)) = current.as_ref() else {
            continue;
        };
        let info = commits.entry(sha.clone()).or_default();
        if let Some(author) = line.strip_prefix("author ") {
            info.author = author.to_string();
        } else if let Some(summary) = line.strip_prefix("summary ") {
            info.summary = summary.to_string();
        }
    }

    lines
}
