//! Batched append-only log writer
//!
//! `enqueue` only touches the in-memory pending batch. A background task
//! drains the whole batch on a fixed interval (or early, once the batch reaches
//! `max_batch_size`) and appends it to the log in a single write, one JSON
//! record per line.
//!
//! Durability is best effort: a failed append is logged and the batch is
//! dropped, and anything still pending when the process dies is lost. The loss
//! window is therefore one flush interval.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};
use tokio::time::{interval, MissedTickBehavior};

use crate::error::LogError;
use crate::types::{LogRecord, Message};

/// Writer for the durable message log
pub struct LogWriter {
    path: PathBuf,
    /// Records accepted since the last flush, oldest first
    pending: Mutex<Vec<LogRecord>>,
    /// Held across take + append so batches reach the file in order
    flush_lock: Mutex<()>,
    max_batch_size: usize,
    wake: Notify,
    flushed_records: AtomicU64,
    dropped_records: AtomicU64,
    failed_flushes: AtomicU64,
}

impl LogWriter {
    /// Open the log at `path`, creating parent directories.
    ///
    /// If the previous process died mid-append the file ends without a
    /// newline; a newline is added so the torn record stays isolated on its
    /// own line and the next batch starts clean.
    pub fn open<P: AsRef<Path>>(path: P, max_batch_size: usize) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        seal_torn_tail(&path)?;

        Ok(Self {
            path,
            pending: Mutex::new(Vec::new()),
            flush_lock: Mutex::new(()),
            max_batch_size: max_batch_size.max(1),
            wake: Notify::new(),
            flushed_records: AtomicU64::new(0),
            dropped_records: AtomicU64::new(0),
            failed_flushes: AtomicU64::new(0),
        })
    }

    /// Queue an accepted message for the next flush. Never blocks on I/O.
    pub fn enqueue(&self, message: &Message) {
        self.push(LogRecord::Message(message.clone()));
    }

    /// Queue a deletion tombstone for the next flush
    pub fn enqueue_tombstone(&self, id: u64) {
        self.push(LogRecord::Tombstone { deleted: id });
    }

    fn push(&self, record: LogRecord) {
        let len = {
            let mut pending = self.pending.lock();
            pending.push(record);
            pending.len()
        };
        if len >= self.max_batch_size {
            self.wake.notify_one();
        }
    }

    /// Number of records waiting for the next flush
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn flushed_records(&self) -> u64 {
        self.flushed_records.load(Ordering::Relaxed)
    }

    pub fn dropped_records(&self) -> u64 {
        self.dropped_records.load(Ordering::Relaxed)
    }

    pub fn failed_flushes(&self) -> u64 {
        self.failed_flushes.load(Ordering::Relaxed)
    }

    /// Drain the pending batch and append it in one write.
    ///
    /// On failure the batch is dropped, not requeued. Returns the number of
    /// records written.
    pub fn flush_now(&self) -> Result<usize, LogError> {
        let _guard = self.flush_lock.lock();
        let batch = std::mem::take(&mut *self.pending.lock());
        if batch.is_empty() {
            return Ok(0);
        }

        let count = batch.len();
        match append_batch(&self.path, &batch) {
            Ok(()) => {
                self.flushed_records
                    .fetch_add(count as u64, Ordering::Relaxed);
                Ok(count)
            }
            Err(e) => {
                self.dropped_records
                    .fetch_add(count as u64, Ordering::Relaxed);
                self.failed_flushes.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Flush and report the outcome to the log instead of the caller
    fn flush_and_report(&self) {
        match self.flush_now() {
            Ok(0) => {}
            Ok(count) => debug!("Flushed {} records to {}", count, self.path.display()),
            Err(e) => error!(
                "Flush to {} failed, batch dropped: {}",
                self.path.display(),
                e
            ),
        }
    }

    /// Run the flush loop until `shutdown` fires, then flush what is left.
    pub async fn run(self: Arc<Self>, flush_interval: Duration, mut shutdown: oneshot::Receiver<()>) {
        let mut timer = interval(flush_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = timer.tick() => {}
                _ = self.wake.notified() => {}
                _ = &mut shutdown => break,
            }

            let writer = Arc::clone(&self);
            if let Err(e) = tokio::task::spawn_blocking(move || writer.flush_and_report()).await {
                error!("Flush task panicked: {}", e);
            }
        }

        let writer = Arc::clone(&self);
        if let Err(e) = tokio::task::spawn_blocking(move || writer.flush_and_report()).await {
            error!("Final flush task panicked: {}", e);
        }
        info!(
            "Durable log writer stopped ({} records flushed, {} dropped)",
            self.flushed_records(),
            self.dropped_records()
        );
    }
}

/// Append every record as its own line with a single write call.
///
/// A file left ending mid-record by an earlier failed append gets a leading
/// newline first, so the torn bytes never swallow the first record.
fn append_batch(path: &Path, batch: &[LogRecord]) -> Result<(), LogError> {
    let mut content = String::new();
    for record in batch {
        content.push_str(&record.to_json_line()?);
        content.push('\n');
    }

    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;
    if ends_mid_record(&mut file)? {
        warn!(
            "{} ends with a torn record, starting the batch on a new line",
            path.display()
        );
        content.insert(0, '\n');
    }
    file.write_all(content.as_bytes())?;
    file.sync_data()?;
    Ok(())
}

fn seal_torn_tail(path: &Path) -> io::Result<()> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if !metadata.is_file() {
        return Ok(());
    }

    let mut file = OpenOptions::new().read(true).append(true).open(path)?;
    if ends_mid_record(&mut file)? {
        warn!(
            "{} ends with a torn record, sealing it with a newline",
            path.display()
        );
        file.write_all(b"\n")?;
        file.sync_data()?;
    }
    Ok(())
}

/// True when the file is non-empty and its last byte is not a newline
fn ends_mid_record(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
