//! Staging buffer that assembles terminator-delimited entries
//!
//! A [`WriteAccumulator`] collects raw inbound chunks for one writer (a
//! socket connection or the device's implicit write session) until the
//! terminator arrives as the final byte, then freezes the collected bytes
//! into an immutable [`Entry`]. Partial writes never reach the ring: a
//! cancelled or disconnected writer discards its staged bytes.

use super::{Entry, TERMINATOR};
use crate::store::StoreError;

/// Per-writer staging buffer for one logical write at a time.
#[derive(Debug, Default)]
pub struct WriteAccumulator {
    pending: Vec<u8>,
}

impl WriteAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw chunk to the pending write.
    ///
    /// Completion is detected from the newly appended bytes only: an entry
    /// is yielded when the terminator is the final byte of the staged
    /// buffer after the append. A terminator in the middle of a chunk does
    /// not complete the write. Zero-length chunks are a no-op.
    ///
    /// # Returns
    ///
    /// The completed entry once the terminator arrives, `None` while the
    /// write is still accumulating. Staging failure leaves the pending
    /// bytes unchanged and is recoverable by aborting this one write.
    pub fn append(&mut self, chunk: &[u8]) -> Result<Option<Entry>, StoreError> {
        if chunk.is_empty() {
            return Ok(None);
        }
        self.pending
            .try_reserve(chunk.len())
            .map_err(|_| StoreError::Allocation {
                requested: chunk.len(),
            })?;
        self.pending.extend_from_slice(chunk);

        if chunk.last() == Some(&TERMINATOR) {
            let data = std::mem::take(&mut self.pending);
            return Ok(Some(Entry::new(data)));
        }
        Ok(None)
    }

    /// Number of staged bytes awaiting a terminator.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether a partial write is currently staged.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drop any staged bytes without committing them, releasing their
    /// backing storage.
    pub fn discard(&mut self) {
        drop(std::mem::take(&mut self.pending));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_completes() {
        let mut acc = WriteAccumulator::new();
        let entry = acc.append(b"hello\n").unwrap().unwrap();
        assert_eq!(entry.as_bytes(), b"hello\n");
        assert!(!acc.has_pending());
    }

    #[test]
    fn chunk_boundaries_do_not_matter() {
        let mut split = WriteAccumulator::new();
        assert!(split.append(b"hel").unwrap().is_none());
        assert_eq!(split.pending_len(), 3);
        let from_split = split.append(b"lo\n").unwrap().unwrap();

        let mut whole = WriteAccumulator::new();
        let from_whole = whole.append(b"hello\n").unwrap().unwrap();

        assert_eq!(from_split, from_whole);
        assert_eq!(from_split.as_bytes(), b"hello\n");
    }

    #[test]
    fn zero_length_chunk_is_a_no_op() {
        let mut acc = WriteAccumulator::new();
        assert!(acc.append(b"").unwrap().is_none());
        assert!(acc.append(b"abc").unwrap().is_none());
        assert!(acc.append(b"").unwrap().is_none());
        assert_eq!(acc.pending_len(), 3);
    }

    #[test]
    fn embedded_terminator_does_not_complete() {
        let mut acc = WriteAccumulator::new();
        assert!(acc.append(b"a\nb").unwrap().is_none());
        let entry = acc.append(b"c\n").unwrap().unwrap();
        assert_eq!(entry.as_bytes(), b"a\nbc\n");
    }

    #[test]
    fn accumulator_resets_between_entries() {
        let mut acc = WriteAccumulator::new();
        let first = acc.append(b"one\n").unwrap().unwrap();
        let second = acc.append(b"two\n").unwrap().unwrap();
        assert_eq!(first.as_bytes(), b"one\n");
        assert_eq!(second.as_bytes(), b"two\n");
    }

    #[test]
    fn discard_drops_partial_write() {
        let mut acc = WriteAccumulator::new();
        acc.append(b"partial").unwrap();
        assert!(acc.has_pending());
        acc.discard();
        assert!(!acc.has_pending());

        // The next write starts clean.
        let entry = acc.append(b"fresh\n").unwrap().unwrap();
        assert_eq!(entry.as_bytes(), b"fresh\n");
    }
}
