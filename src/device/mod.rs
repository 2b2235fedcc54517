//! File-like device binding over the shared log store
//!
//! This module exposes the log through positional read/write/seek instead
//! of the socket transport's accumulate-then-broadcast semantics:
//!
//! - [`DirectDevice`] owns the device's single implicit write session: one
//!   shared staging buffer, no matter how many handles are open
//! - [`DeviceHandle`] is one open handle with its own position cursor,
//!   implementing [`std::io::Read`], [`std::io::Write`] and
//!   [`std::io::Seek`]
//! - [`DeviceHandle::seek_to_entry`] is the control operation that
//!   repositions the cursor to an exact (entry, offset) boundary
//!
//! Reads never span two entries in one call; callers advance through the
//! log with repeated reads, exactly like a positional file read. Writes
//! feed the shared session until a terminator completes an entry, which
//! commits through the store like any other writer.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::ring::accumulator::WriteAccumulator;
use crate::store::{LogStore, StoreError};

/// The device itself: shared store plus the one implicit write session.
pub struct DirectDevice {
    store: Arc<LogStore>,
    staged: Mutex<WriteAccumulator>,
}

impl DirectDevice {
    /// Create a device over the given store.
    pub fn new(store: Arc<LogStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            staged: Mutex::new(WriteAccumulator::new()),
        })
    }

    /// Open a handle with its cursor at the start of the log.
    pub fn open(self: &Arc<Self>) -> DeviceHandle {
        DeviceHandle {
            device: self.clone(),
            position: 0,
        }
    }

    /// The store this device is bound to.
    pub fn store(&self) -> &Arc<LogStore> {
        &self.store
    }
}

/// One open handle on the device, carrying its own position cursor.
pub struct DeviceHandle {
    device: Arc<DirectDevice>,
    position: u64,
}

impl DeviceHandle {
    /// Current cursor position as a flat byte offset.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Reposition the cursor to the flattened offset of
    /// `(write_cmd, write_cmd_offset)`.
    ///
    /// `write_cmd` is the zero-based logical index of a live entry, oldest
    /// first. On failure the cursor is left unchanged and an
    /// invalid-argument error is returned.
    pub fn seek_to_entry(
        &mut self,
        write_cmd: usize,
        write_cmd_offset: usize,
    ) -> io::Result<u64> {
        match self.device.store.resolve_seek(write_cmd, write_cmd_offset) {
            Ok(flat) => {
                debug!(write_cmd, write_cmd_offset, flat, "seek to entry boundary");
                self.position = flat;
                Ok(flat)
            }
            Err(err @ StoreError::SeekOutOfRange { .. }) => {
                Err(io::Error::new(io::ErrorKind::InvalidInput, err))
            }
            Err(err) => Err(io::Error::other(err)),
        }
    }
}

impl Read for DeviceHandle {
    /// Read from the cursor position, stopping at the end of the single
    /// entry containing it. Returns 0 at the end of live data.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes = self.device.store.read_at(self.position, buf.len());
        buf[..bytes.len()].copy_from_slice(&bytes);
        self.position += bytes.len() as u64;
        Ok(bytes.len())
    }
}

impl Write for DeviceHandle {
    /// Feed one chunk into the device's shared write session. Completing
    /// a logical entry commits it to the store, evicting the oldest entry
    /// if the ring is full. The position cursor is unaffected by writes.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut staged = self.device.staged.lock();
        match staged.append(buf) {
            Ok(Some(entry)) => {
                // Commit while still holding the session lock, so the
                // staging-then-commit step cannot interleave with another
                // handle's write.
                self.device.store.commit(entry);
                Ok(buf.len())
            }
            Ok(None) => Ok(buf.len()),
            Err(err) => Err(io::Error::new(io::ErrorKind::OutOfMemory, err)),
        }
    }

    /// Commits happen on terminator only; there is nothing to flush.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for DeviceHandle {
    /// Reposition the cursor. `SeekFrom::End` is relative to the total
    /// live length; a resolved position before the start of the log is an
    /// invalid-argument error that leaves the cursor unchanged.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let total = self.device.store.total_len();
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(offset) => i128::from(self.position) + i128::from(offset),
            SeekFrom::End(offset) => i128::from(total) + i128::from(offset),
        };
        self.position = u64::try_from(target).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek position out of range")
        })?;
        Ok(self.position)
    }
}
