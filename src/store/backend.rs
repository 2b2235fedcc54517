//! Polymorphic storage backends for the socket transport
//!
//! The socket front-end funnels every committed entry through a
//! [`StorageBackend`], selected at configuration time via [`BackendKind`]:
//!
//! - [`MemoryBackend`]: the shared in-memory ring store (the default)
//! - [`FileBackend`]: an append-only file of CRC-framed records
//!
//! Both expose the same capability set — append, positional read,
//! entry-boundary seek resolution, total length, and a full-content
//! snapshot — so the connection workers are indifferent to where the log
//! lives. Flat offsets always address the concatenated payload bytes;
//! file frames are invisible to callers.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crc32fast::Hasher;
use parking_lot::Mutex;
use tracing::debug;

use crate::ring::Entry;
use crate::store::{LogStore, StoreError};

/// Capability set shared by every log storage flavor.
pub trait StorageBackend: Send + Sync {
    /// Commit one completed entry to the log.
    fn write_append(&self, entry: Entry) -> Result<(), StoreError>;

    /// Read up to `max_len` bytes at `offset`, never crossing out of the
    /// single entry containing that offset. An offset at or past the end
    /// of the log reads zero bytes.
    fn read_at(&self, offset: u64, max_len: usize) -> Result<Vec<u8>, StoreError>;

    /// Resolve `(entry_index, offset_in_entry)` to an absolute flat
    /// offset, with the same validation rules as
    /// [`LogStore::resolve_seek`].
    fn seek_to(&self, entry_index: usize, offset_in_entry: usize) -> Result<u64, StoreError>;

    /// Total addressable payload length.
    fn total_length(&self) -> Result<u64, StoreError>;

    /// Copy of the full current content in logical order.
    fn snapshot(&self) -> Result<Vec<u8>, StoreError>;
}

/// Which storage flavor the socket transport commits to.
#[derive(Debug, Clone, Default)]
pub enum BackendKind {
    /// The shared in-memory bounded ring.
    #[default]
    Memory,
    /// An append-only framed file at the given path.
    File(PathBuf),
}

impl BackendKind {
    /// Build the backend this kind selects.
    ///
    /// The memory flavor shares `store`, so the socket transport and the
    /// device binding observe the same log; the file flavor opens (or
    /// creates) its backing file and ignores `store`.
    pub fn build(&self, store: &Arc<LogStore>) -> Result<Arc<dyn StorageBackend>, StoreError> {
        match self {
            BackendKind::Memory => Ok(Arc::new(MemoryBackend::new(store.clone()))),
            BackendKind::File(path) => Ok(Arc::new(FileBackend::open(path)?)),
        }
    }
}

/// Backend over the shared in-memory ring store.
pub struct MemoryBackend {
    store: Arc<LogStore>,
}

impl MemoryBackend {
    /// Create a backend sharing the given store.
    pub fn new(store: Arc<LogStore>) -> Self {
        Self { store }
    }
}

impl StorageBackend for MemoryBackend {
    fn write_append(&self, entry: Entry) -> Result<(), StoreError> {
        self.store.commit(entry);
        Ok(())
    }

    fn read_at(&self, offset: u64, max_len: usize) -> Result<Vec<u8>, StoreError> {
        Ok(self.store.read_at(offset, max_len))
    }

    fn seek_to(&self, entry_index: usize, offset_in_entry: usize) -> Result<u64, StoreError> {
        self.store.resolve_seek(entry_index, offset_in_entry)
    }

    fn total_length(&self) -> Result<u64, StoreError> {
        Ok(self.store.total_len())
    }

    fn snapshot(&self) -> Result<Vec<u8>, StoreError> {
        Ok(self.store.snapshot())
    }
}

/// Frame header preceding each record in the file backend.
#[derive(Debug, Clone, Copy)]
struct FrameHeader {
    /// Payload length in bytes.
    len: u32,
    /// CRC32 of the payload.
    crc32: u32,
}

impl FrameHeader {
    /// Magic identifying a record frame ("RL").
    const MAGIC: u16 = 0x524C;

    /// Encoded size of the header in bytes.
    const SIZE: usize = 12;

    fn for_payload(payload: &[u8]) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(payload);
        Self {
            len: payload.len() as u32,
            crc32: hasher.finalize(),
        }
    }

    fn encode(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..2].copy_from_slice(&Self::MAGIC.to_le_bytes());
        // bytes[2..4] reserved
        bytes[4..8].copy_from_slice(&self.len.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.crc32.to_le_bytes());
        bytes
    }

    /// Decode a header read at `file_offset`, used for error reporting.
    fn decode(bytes: &[u8; Self::SIZE], file_offset: u64) -> Result<Self, StoreError> {
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        if magic != Self::MAGIC {
            return Err(StoreError::CorruptRecord {
                offset: file_offset,
            });
        }
        Ok(Self {
            len: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            crc32: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        })
    }

    fn verify(&self, payload: &[u8], file_offset: u64) -> Result<(), StoreError> {
        let mut hasher = Hasher::new();
        hasher.update(payload);
        if self.crc32 != hasher.finalize() {
            return Err(StoreError::CorruptRecord {
                offset: file_offset,
            });
        }
        Ok(())
    }
}

struct FileInner {
    file: std::fs::File,
    /// Payload length of each stored record, in append order.
    lengths: Vec<usize>,
}

/// Append-only file backend storing CRC-framed records.
///
/// Unlike the ring, the file grows without bound; entry-index seeks
/// validate against the records actually present. Reopening an existing
/// file rebuilds the record index, verifying every frame.
pub struct FileBackend {
    inner: Mutex<FileInner>,
}

impl FileBackend {
    /// Open (or create) the backing file at `path` and index its records.
    ///
    /// # Errors
    ///
    /// I/O failures, or [`StoreError::CorruptRecord`] if an existing file
    /// holds a frame that fails validation.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;
        let lengths = Self::scan_frames(&mut file)?;
        debug!(
            path = %path.as_ref().display(),
            records = lengths.len(),
            "opened file backend"
        );
        Ok(Self {
            inner: Mutex::new(FileInner { file, lengths }),
        })
    }

    /// Walk every frame in the file, verifying magic and checksum, and
    /// return the payload lengths in order.
    fn scan_frames(file: &mut std::fs::File) -> Result<Vec<usize>, StoreError> {
        let end = file.seek(SeekFrom::End(0))?;
        file.seek(SeekFrom::Start(0))?;

        let mut lengths = Vec::new();
        let mut pos = 0u64;
        while pos + FrameHeader::SIZE as u64 <= end {
            let mut header_bytes = [0u8; FrameHeader::SIZE];
            file.read_exact(&mut header_bytes)?;
            let header = FrameHeader::decode(&header_bytes, pos)?;

            let payload_len = header.len as usize;
            let frame_end = pos + (FrameHeader::SIZE + payload_len) as u64;
            if frame_end > end {
                return Err(StoreError::CorruptRecord { offset: pos });
            }

            let mut payload = vec![0u8; payload_len];
            file.read_exact(&mut payload)?;
            header.verify(&payload, pos)?;

            lengths.push(payload_len);
            pos = frame_end;
        }
        if pos != end {
            // Trailing bytes too short to hold a header.
            return Err(StoreError::CorruptRecord { offset: pos });
        }
        Ok(lengths)
    }
}

impl StorageBackend for FileBackend {
    fn write_append(&self, entry: Entry) -> Result<(), StoreError> {
        let inner = &mut *self.inner.lock();
        let header = FrameHeader::for_payload(entry.as_bytes());

        inner.file.seek(SeekFrom::End(0))?;
        inner.file.write_all(&header.encode())?;
        inner.file.write_all(entry.as_bytes())?;
        inner.lengths.push(entry.len());
        Ok(())
    }

    fn read_at(&self, offset: u64, max_len: usize) -> Result<Vec<u8>, StoreError> {
        let flat = match usize::try_from(offset) {
            Ok(value) => value,
            Err(_) => return Ok(Vec::new()),
        };
        let inner = &mut *self.inner.lock();

        // Walk records to find the one containing the payload offset.
        let mut walked = 0usize;
        let mut file_pos = 0u64;
        for &len in &inner.lengths {
            if walked + len > flat {
                let within = flat - walked;
                let take = (len - within).min(max_len);
                let start = file_pos + (FrameHeader::SIZE + within) as u64;
                inner.file.seek(SeekFrom::Start(start))?;
                let mut payload = vec![0u8; take];
                inner.file.read_exact(&mut payload)?;
                return Ok(payload);
            }
            walked += len;
            file_pos += (FrameHeader::SIZE + len) as u64;
        }
        Ok(Vec::new())
    }

    fn seek_to(&self, entry_index: usize, offset_in_entry: usize) -> Result<u64, StoreError> {
        let inner = self.inner.lock();
        if entry_index >= inner.lengths.len() {
            return Err(StoreError::SeekOutOfRange {
                write_cmd: entry_index,
                write_cmd_offset: offset_in_entry,
            });
        }
        if offset_in_entry > inner.lengths[entry_index] {
            return Err(StoreError::SeekOutOfRange {
                write_cmd: entry_index,
                write_cmd_offset: offset_in_entry,
            });
        }
        let before: usize = inner.lengths[..entry_index].iter().sum();
        Ok((before + offset_in_entry) as u64)
    }

    fn total_length(&self) -> Result<u64, StoreError> {
        let inner = self.inner.lock();
        Ok(inner.lengths.iter().sum::<usize>() as u64)
    }

    fn snapshot(&self) -> Result<Vec<u8>, StoreError> {
        let inner = &mut *self.inner.lock();
        let total: usize = inner.lengths.iter().sum();
        let mut content = Vec::with_capacity(total);

        inner.file.seek(SeekFrom::Start(0))?;
        let mut pos = 0u64;
        for _ in 0..inner.lengths.len() {
            let mut header_bytes = [0u8; FrameHeader::SIZE];
            inner.file.read_exact(&mut header_bytes)?;
            let header = FrameHeader::decode(&header_bytes, pos)?;

            let mut payload = vec![0u8; header.len as usize];
            inner.file.read_exact(&mut payload)?;
            header.verify(&payload, pos)?;

            content.extend_from_slice(&payload);
            pos += (FrameHeader::SIZE + header.len as usize) as u64;
        }
        Ok(content)
    }
}
