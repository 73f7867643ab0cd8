//! Recovery of the in-memory buffer from the durable log
//!
//! Lines that fail to parse are skipped, whether they are a torn record from
//! an interrupted flush or damage elsewhere in the file; recovery never aborts
//! because of one bad record.
//!
//! The log is streamed twice. The first pass collects tombstones and the
//! highest id; the second keeps a window of at most `max_recent` surviving
//! messages, so memory stays bounded however long the log has grown.

use std::collections::{HashSet, VecDeque};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use log::{info, warn};

use crate::error::LogError;
use crate::types::{LogRecord, Message};

/// What recovery found in the log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// The most recent surviving messages, newest first
    pub messages: Vec<Message>,
    /// First id the store may assign (one past any id seen in the log)
    pub next_id: u64,
    /// Well-formed records read, including tombstones
    pub total_records: usize,
    /// Lines that could not be parsed
    pub skipped_lines: usize,
    /// Deletion tombstones applied
    pub tombstones: usize,
}

/// One line of the log, as seen by a scan
struct ScannedLine {
    number: usize,
    is_last: bool,
    parsed: Result<Option<LogRecord>, String>,
}

/// Replay the log at `path`, keeping at most `max_recent` messages.
///
/// A missing or empty log yields an empty report.
pub fn recover<P: AsRef<Path>>(path: P, max_recent: usize) -> Result<RecoveryReport, LogError> {
    let path = path.as_ref();
    if !path.exists() {
        info!("No durable log at {}, starting empty", path.display());
        return Ok(RecoveryReport {
            next_id: 1,
            ..Default::default()
        });
    }

    let mut report = RecoveryReport::default();
    let mut deleted: HashSet<u64> = HashSet::new();
    let mut max_id = 0u64;

    scan(path, |line| match line.parsed {
        Ok(None) => {}
        Ok(Some(LogRecord::Message(message))) => {
            report.total_records += 1;
            max_id = max_id.max(message.id);
        }
        Ok(Some(LogRecord::Tombstone { deleted: id })) => {
            report.total_records += 1;
            max_id = max_id.max(id);
            deleted.insert(id);
        }
        Err(e) => {
            report.skipped_lines += 1;
            let kind = if line.is_last { "torn trailing" } else { "corrupt" };
            warn!(
                "Skipping {} record at line {} of {}: {}",
                kind,
                line.number,
                path.display(),
                e
            );
        }
    })?;

    let mut window: VecDeque<Message> = VecDeque::with_capacity(max_recent);
    if max_recent > 0 {
        scan(path, |line| {
            if let Ok(Some(LogRecord::Message(message))) = line.parsed {
                if deleted.contains(&message.id) {
                    return;
                }
                if window.len() == max_recent {
                    window.pop_front();
                }
                window.push_back(message);
            }
        })?;
    }

    report.tombstones = deleted.len();
    report.next_id = max_id + 1;
    report.messages = window.into_iter().rev().collect();

    info!(
        "Recovered {} messages from {} ({} records, {} skipped, {} deleted)",
        report.messages.len(),
        path.display(),
        report.total_records,
        report.skipped_lines,
        report.tombstones
    );

    Ok(report)
}

/// Stream the log line by line, oldest first
fn scan(path: &Path, mut visit: impl FnMut(ScannedLine)) -> io::Result<()> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.split(b'\n').enumerate().peekable();

    while let Some((index, raw)) = lines.next() {
        let raw = raw?;
        let parsed = std::str::from_utf8(&raw)
            .map_err(|e| e.to_string())
            .and_then(|line| {
                let line = line.trim();
                if line.is_empty() {
                    Ok(None)
                } else {
                    LogRecord::from_json_line(line)
                        .map(Some)
                        .map_err(|e| e.to_string())
                }
            });

        visit(ScannedLine {
            number: index + 1,
            is_last: lines.peek().is_none(),
            parsed,
        });
    }
    Ok(())
}
