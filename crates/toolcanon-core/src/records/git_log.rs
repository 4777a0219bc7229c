//! `git log` parser.
//!
//! The invocation layer asks git for [`GIT_LOG_FORMAT`], which separates
//! fields with `0x1f` and records with `0x1e` so subjects and bodies can
//! hold any text. Output in git's default `medium` format is also read.

use crate::domain::records::Commit;

/// `--format` argument matching [`parse_git_log`].
pub const GIT_LOG_FORMAT: &str = "%H%x1f%an%x1f%aI%x1f%s%x1f%b%x1e";

const FIELD: char = '\u{1f}';
const RECORD: char = '\u{1e}';

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_delimited(text: &str) -> Vec<Commit> {
    text.split(RECORD)
        .filter_map(|record| {
            let record = record.trim_start_matches(['\n', '\r']);
            let mut fields = record.splitn(5, FIELD);
            let hash = fields.next()?.trim();
            if hash.is_empty() {
                return None;
            }
            Some(Commit {
                hash: hash.to_string(),
                author: fields.next()?.to_string(),
                date: fields.next()?.to_string(),
                subject: fields.next()?.to_string(),
                body: fields.next().and_then(non_empty),
            })
        })
        .collect()
}

/// git's default output: `commit <hash>`, headers, blank line, message
/// indented by four spaces.
fn parse_medium(text: &str) -> Vec<Commit> {
    let mut commits = Vec::new();
    let mut current: Option<(Commit, Vec<String>)> = None;

    let finish = |entry: Option<(Commit, Vec<String>)>, commits: &mut Vec<Commit>| {
        if let Some((mut commit, message)) = entry {
            let mut lines = message.into_iter().skip_while(|l| l.trim().is_empty());
            commit.subject = lines.next().unwrap_or_default();
            let body: Vec<String> = lines.collect();
            commit.body = non_empty(&body.join("\n"));
            commits.push(commit);
        }
    };

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("commit ") {
            finish(current.take(), &mut commits);
            let hash = rest.split_whitespace().next().unwrap_or_default();
            current = Some((
                Commit {
                    hash: hash.to_string(),
                    author: String::new(),
                    date: String::new(),
                    subject: String::new(),
                    body: None,
                },
                Vec::new(),
            ));
            continue;
        }
        let Some((commit, message)) = current.as_mut() else {
            continue;
        };
        if let Some(author) = line.strip_prefix("Author:") {
            let author = author.trim();
            let name = author.split_once(" <").map_or(author, |(name, _)| name);
            commit.author = name.to_string();
        } else if let Some(date) = line.strip_prefix("Date:") {
            commit.date = date.trim().to_string();
        } else if let Some(msg) = line.strip_prefix("    ") {
            message.push(msg.to_string());
        } else if line.is_empty() && !message.is_empty() {
            message.push(String::new());
        }
    }
    finish(current.take(), &mut commits);
    commits
}

/// Parse `git log` output in either supported format.
pub fn parse_git_log(text: &str) -> Vec<Commit> {
    if text.contains(FIELD) {
        parse_delimited(text)
    } else {
        parse_medium(text)
    }
}
