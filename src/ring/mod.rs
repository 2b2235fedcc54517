//! Ring storage primitives: entries and the circular log holding them
//!
//! This module provides the data types shared by the ring submodules:
//!
//! - Entry, one complete terminator-delimited logical write
//! - The terminator constant that delimits writes on every transport
//!
//! The fixed-capacity circular buffer lives in [`buffer`] and the staging
//! buffer that assembles entries from raw chunks lives in [`accumulator`].

pub mod accumulator;
pub mod buffer;

/// Delimiter byte marking the end of one logical write.
pub const TERMINATOR: u8 = b'\n';

/// One complete log entry: an immutable byte run with a known length.
///
/// An entry is created by a
/// [`WriteAccumulator`](accumulator::WriteAccumulator) the moment the
/// terminator is observed, and is destroyed when the ring evicts it. The
/// backing bytes are owned by exactly one place at a time: the accumulator,
/// a ring slot, or the in-flight eviction value handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    data: Box<[u8]>,
}

impl Entry {
    /// Freeze the given bytes into an immutable entry.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: data.into_boxed_slice(),
        }
    }

    /// Length of the entry in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the entry holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The entry's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the entry, handing the backing bytes to the caller.
    pub fn into_bytes(self) -> Box<[u8]> {
        self.data
    }
}

impl AsRef<[u8]> for Entry {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_length_matches_data() {
        let entry = Entry::new(b"hello\n".to_vec());
        assert_eq!(entry.len(), 6);
        assert!(!entry.is_empty());
        assert_eq!(entry.as_bytes(), b"hello\n");
    }

    #[test]
    fn entry_round_trips_ownership() {
        let entry = Entry::new(b"abc\n".to_vec());
        let bytes = entry.into_bytes();
        assert_eq!(&*bytes, b"abc\n");
    }
}
