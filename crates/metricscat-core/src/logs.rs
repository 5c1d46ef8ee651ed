//! Offset-tracked, size-bounded tail of the backend's log stream.
//!
//! Each poll asks the backend for lines newer than the cursor. The backend
//! answers newest-first, so a non-empty batch's first element carries the most
//! advanced offset and becomes the next cursor. The batch is prepended to the
//! tail, and only the newest `retention` previously held lines are carried
//! forward, which keeps the tail at most `batch.len() + retention` long.
//!
//! Offsets are trusted as unique: if the backend ever returns a line at or
//! below the cursor it is kept as-is, duplicates included.

use crate::model::LogLine;

/// Previously displayed lines carried into each merged tail.
pub const DEFAULT_RETENTION: usize = 25;

/// Newest-first window of log lines plus the cursor for the next fetch.
#[derive(Debug, Clone)]
pub struct LogTailStore {
    tail: Vec<LogLine>,
    cursor: Option<i64>,
    retention: usize,
}

impl Default for LogTailStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl LogTailStore {
    pub fn new(retention: usize) -> Self {
        Self {
            tail: Vec::new(),
            cursor: None,
            retention,
        }
    }

    /// Merge one backend batch (newest-first) into the tail.
    ///
    /// An empty batch means nothing new since the last poll and leaves both
    /// the tail and the cursor untouched.
    pub fn ingest(&mut self, batch: Vec<LogLine>) {
        let Some(first) = batch.first() else {
            return;
        };
        self.cursor = Some(first.offset);

        let keep = self.tail.len().min(self.retention);
        self.tail.truncate(keep);

        let mut merged = batch;
        merged.append(&mut self.tail);
        self.tail = merged;
    }

    /// Current tail, newest first.
    pub fn get(&self) -> &[LogLine] {
        &self.tail
    }

    /// Offset to send as `offset=` on the next fetch; `None` before the first
    /// non-empty batch.
    pub fn cursor(&self) -> Option<i64> {
        self.cursor
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub fn len(&self) -> usize {
        self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tail.is_empty()
    }
}
