//! Line-oriented log output (`docker logs`, `kubectl logs`, `journalctl`).

use crate::domain::raw::RawOutput;
use crate::domain::records::{LogLine, LogStream};

/// Every line of both streams, stdout first. Interleaving between the
/// two streams is not recoverable from captured output.
pub fn parse_log(raw: &RawOutput) -> Vec<LogLine> {
    let tagged = |text: &str, stream: LogStream| -> Vec<LogLine> {
        text.lines()
            .map(|line| LogLine {
                line: line.trim_end_matches('\r').to_string(),
                stream,
            })
            .collect()
    };
    let mut lines = tagged(&raw.stdout, LogStream::Stdout);
    lines.extend(tagged(&raw.stderr, LogStream::Stderr));
    lines
}
