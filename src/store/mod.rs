//! Shared, lock-guarded log store
//!
//! [`LogStore`] is the coordination point for every mutation of the ring:
//!
//! - Commits are strictly serialized by one writer lock
//! - Eviction is observed atomically with the commit that caused it
//! - Snapshots copy the full live content out under the lock, so a slow
//!   consumer never stalls writers while streaming
//! - Positional reads and entry-boundary seek resolution never mutate
//!
//! No component outside this module mutates ring state directly. The
//! storage backends that the socket transport selects between live in
//! [`backend`].

pub mod backend;

use std::io::Write;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::ring::buffer::{RingLog, DEFAULT_CAPACITY};
use crate::ring::Entry;

/// Errors raised by the store and the staging path.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Bytes could not be staged for the current write. Fatal to that one
    /// write only; the session recovers by aborting it.
    #[error("failed to stage {requested} bytes for a pending write")]
    Allocation {
        /// Size of the chunk that could not be staged.
        requested: usize,
    },

    /// A seek target does not resolve to a live entry position. The
    /// caller's cursor is left unchanged.
    #[error("seek to entry {write_cmd} offset {write_cmd_offset} is out of range")]
    SeekOutOfRange {
        /// Logical entry index counting from the oldest live entry.
        write_cmd: usize,
        /// Byte offset within that entry.
        write_cmd_offset: usize,
    },

    /// Internal accounting failure: a live slot index resolved to an empty
    /// slot. A defect, not a normal runtime condition.
    #[error("ring accounting violated: live slot {index} is empty")]
    CapacityInvariant {
        /// The logical index whose slot was unexpectedly empty.
        index: usize,
    },

    /// A stored record frame failed its integrity check.
    #[error("corrupt record frame at file offset {offset}")]
    CorruptRecord {
        /// File offset of the frame that failed validation.
        offset: u64,
    },

    /// Underlying file or transport I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The shared aggregate of one [`RingLog`] behind a writer lock.
#[derive(Debug)]
pub struct LogStore {
    ring: Mutex<RingLog>,
}

impl LogStore {
    /// Create a store over an empty ring with the given entry capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(RingLog::new(capacity)),
        }
    }

    /// Commit one completed entry, evicting the oldest if the ring is full.
    ///
    /// Commits from concurrent writers serialize on the store's lock; the
    /// eviction, when one occurs, happens atomically with the commit that
    /// caused it and the displaced bytes are released here.
    pub fn commit(&self, entry: Entry) {
        let mut ring = self.ring.lock();
        let committed_len = entry.len();
        if let Some(evicted) = ring.add_entry(entry) {
            debug!(
                committed_len,
                evicted_len = evicted.len(),
                "evicted oldest entry to make room"
            );
        } else {
            debug!(committed_len, "committed entry");
        }
    }

    /// Copy of the full live content, each entry carrying its terminator,
    /// in logical order. Taken under the writer lock; callers stream the
    /// copy after the lock is released.
    pub fn snapshot(&self) -> Vec<u8> {
        let ring = self.ring.lock();
        let mut content = Vec::with_capacity(ring.total_live_length());
        for entry in ring.iter_live() {
            content.extend_from_slice(entry.as_bytes());
        }
        content
    }

    /// Stream the full live content to `sink`.
    ///
    /// The content is copied out under the lock and written after the lock
    /// is released, so a stalled sink blocks no writers.
    pub fn snapshot_and_stream<W: Write>(&self, sink: &mut W) -> Result<(), StoreError> {
        let content = self.snapshot();
        sink.write_all(&content)?;
        Ok(())
    }

    /// Read up to `max_len` bytes starting at `flat_offset`, never crossing
    /// out of the single entry containing that offset.
    ///
    /// Mirrors a positional-file-read contract: callers needing more issue
    /// repeated calls advancing their own cursor. An offset at or past the
    /// end of live data reads zero bytes.
    pub fn read_at(&self, flat_offset: u64, max_len: usize) -> Vec<u8> {
        let flat = match usize::try_from(flat_offset) {
            Ok(value) => value,
            Err(_) => return Vec::new(),
        };
        let ring = self.ring.lock();
        match ring.find_entry_for_offset(flat) {
            Some((entry, within)) => {
                let take = (entry.len() - within).min(max_len);
                entry.as_bytes()[within..within + take].to_vec()
            }
            None => Vec::new(),
        }
    }

    /// Resolve `(write_cmd, write_cmd_offset)` to an absolute flat offset.
    ///
    /// `write_cmd` counts live entries from the oldest (index 0). The
    /// resolved offset is the sum of the lengths of all live entries before
    /// `write_cmd`, plus `write_cmd_offset`. An offset equal to the entry's
    /// length is valid (it names the position just past that entry).
    ///
    /// # Errors
    ///
    /// [`StoreError::SeekOutOfRange`] if `write_cmd` is at or past the ring
    /// capacity or the live entry count, or if `write_cmd_offset` exceeds
    /// the target entry's length. [`StoreError::CapacityInvariant`] if a
    /// live index resolves to an empty slot.
    pub fn resolve_seek(
        &self,
        write_cmd: usize,
        write_cmd_offset: usize,
    ) -> Result<u64, StoreError> {
        let ring = self.ring.lock();
        if write_cmd >= ring.capacity() || write_cmd >= ring.live_entry_count() {
            return Err(StoreError::SeekOutOfRange {
                write_cmd,
                write_cmd_offset,
            });
        }

        let mut flat = 0u64;
        for index in 0..write_cmd {
            flat += Self::live_entry(&ring, index)?.len() as u64;
        }
        let target = Self::live_entry(&ring, write_cmd)?;
        if write_cmd_offset > target.len() {
            return Err(StoreError::SeekOutOfRange {
                write_cmd,
                write_cmd_offset,
            });
        }
        Ok(flat + write_cmd_offset as u64)
    }

    /// Total addressable byte length of the live content.
    pub fn total_len(&self) -> u64 {
        self.ring.lock().total_live_length() as u64
    }

    /// Number of live entries.
    pub fn entry_count(&self) -> usize {
        self.ring.lock().live_entry_count()
    }

    /// Maximum number of live entries the ring retains.
    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity()
    }

    fn live_entry<'a>(ring: &'a RingLog, index: usize) -> Result<&'a Entry, StoreError> {
        match ring.nth_live_entry(index) {
            Some(entry) => Ok(entry),
            None => {
                debug_assert!(false, "live slot {index} is empty");
                Err(StoreError::CapacityInvariant { index })
            }
        }
    }
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
