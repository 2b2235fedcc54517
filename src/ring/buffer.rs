//! Fixed-capacity circular buffer of variable-length entries
//!
//! This module implements the core primitive of the crate: a bounded,
//! append-only ring of [`Entry`] values with overwrite-oldest eviction.
//! Key properties:
//!
//! - Slot-based storage with a write index, a read index, and a full flag
//! - Oldest-first logical order starting at the read index
//! - Flat byte addressing, as if all live entries were concatenated
//! - Entry-count addressing for the direct-seek protocol
//! - Eviction hands the displaced entry back to the caller for disposal
//!
//! The ring performs no locking of its own; callers provide mutual
//! exclusion (see [`LogStore`](crate::LogStore)). All read-side
//! operations are pure functions of the current ring state.

use super::Entry;

/// Default number of entries retained before oldest-eviction begins.
pub const DEFAULT_CAPACITY: usize = 10;

/// A bounded circular buffer of variable-length byte entries.
#[derive(Debug)]
pub struct RingLog {
    /// Entry slots; `None` marks a slot that has never held a live entry.
    slots: Vec<Option<Entry>>,
    /// Index of the slot the next insertion writes to.
    write_index: usize,
    /// Index of the oldest live entry.
    read_index: usize,
    /// True iff the next insertion would overwrite the oldest live entry.
    full: bool,
}

impl RingLog {
    /// Create an empty ring with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be non-zero");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            write_index: 0,
            read_index: 0,
            full: false,
        }
    }

    /// Maximum number of live entries the ring retains.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live entries currently held.
    pub fn live_entry_count(&self) -> usize {
        if self.full {
            self.slots.len()
        } else if self.write_index >= self.read_index {
            self.write_index - self.read_index
        } else {
            self.slots.len() - self.read_index + self.write_index
        }
    }

    /// Whether the ring holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.live_entry_count() == 0
    }

    /// Whether the next insertion will evict the oldest entry.
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Sum of the lengths of all live entries.
    pub fn total_live_length(&self) -> usize {
        self.iter_live().map(Entry::len).sum()
    }

    /// Iterate over live entries in logical order, oldest first.
    pub fn iter_live(&self) -> impl Iterator<Item = &Entry> + '_ {
        let cap = self.slots.len();
        (0..self.live_entry_count())
            .filter_map(move |i| self.slots[(self.read_index + i) % cap].as_ref())
    }

    /// The `n`th live entry in logical order (0 = oldest), if it exists.
    pub fn nth_live_entry(&self, n: usize) -> Option<&Entry> {
        if n >= self.live_entry_count() {
            return None;
        }
        let cap = self.slots.len();
        self.slots[(self.read_index + n) % cap].as_ref()
    }

    /// Locate the entry containing `flat_offset`, counting bytes as if all
    /// live entries were concatenated oldest-first.
    ///
    /// # Returns
    ///
    /// The entry and the byte offset within it, or `None` if `flat_offset`
    /// is past the end of all live data. Pure: the result is a function of
    /// the current ring state only.
    pub fn find_entry_for_offset(&self, flat_offset: usize) -> Option<(&Entry, usize)> {
        let mut walked = 0usize;
        for entry in self.iter_live() {
            if walked + entry.len() > flat_offset {
                return Some((entry, flat_offset - walked));
            }
            walked += entry.len();
        }
        None
    }

    /// Insert `entry`, evicting the oldest live entry if the ring is full.
    ///
    /// # Returns
    ///
    /// The displaced entry when an eviction occurred, so the caller can
    /// dispose of its backing bytes; `None` otherwise.
    pub fn add_entry(&mut self, entry: Entry) -> Option<Entry> {
        let cap = self.slots.len();
        if self.slots[self.write_index].is_some() {
            // Overwriting the oldest entry: both indices advance together
            // and the ring stays full.
            debug_assert!(
                self.full && self.write_index == self.read_index,
                "occupied write slot in a ring not marked full"
            );
            let evicted = self.slots[self.write_index].replace(entry);
            self.read_index = (self.read_index + 1) % cap;
            self.write_index = (self.write_index + 1) % cap;
            self.full = true;
            evicted
        } else {
            self.slots[self.write_index] = Some(entry);
            self.write_index = (self.write_index + 1) % cap;
            self.full = self.write_index == self.read_index;
            None
        }
    }
}

impl Default for RingLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str) -> Entry {
        Entry::new(text.as_bytes().to_vec())
    }

    #[test]
    fn empty_ring_has_no_live_data() {
        let ring = RingLog::new(4);
        assert!(ring.is_empty());
        assert!(!ring.is_full());
        assert_eq!(ring.live_entry_count(), 0);
        assert_eq!(ring.total_live_length(), 0);
        assert!(ring.find_entry_for_offset(0).is_none());
    }

    #[test]
    fn fills_to_capacity_without_eviction() {
        let mut ring = RingLog::new(3);
        assert!(ring.add_entry(entry("a\n")).is_none());
        assert!(ring.add_entry(entry("bb\n")).is_none());
        assert!(!ring.is_full());
        assert!(ring.add_entry(entry("ccc\n")).is_none());
        assert!(ring.is_full());
        assert_eq!(ring.live_entry_count(), 3);
        assert_eq!(ring.total_live_length(), 2 + 3 + 4);
    }

    #[test]
    fn eviction_is_fifo() {
        let mut ring = RingLog::new(3);
        for text in ["one\n", "two\n", "three\n"] {
            assert!(ring.add_entry(entry(text)).is_none());
        }
        let evicted = ring.add_entry(entry("four\n")).unwrap();
        assert_eq!(evicted.as_bytes(), b"one\n");
        assert_eq!(ring.live_entry_count(), 3);

        let live: Vec<&[u8]> = ring.iter_live().map(Entry::as_bytes).collect();
        assert_eq!(live, vec![&b"two\n"[..], b"three\n", b"four\n"]);
    }

    #[test]
    fn stays_full_across_repeated_eviction() {
        let mut ring = RingLog::new(2);
        ring.add_entry(entry("a\n"));
        ring.add_entry(entry("b\n"));
        for text in ["c\n", "d\n", "e\n"] {
            assert!(ring.add_entry(entry(text)).is_some());
            assert!(ring.is_full());
            assert_eq!(ring.live_entry_count(), 2);
        }
        let live: Vec<&[u8]> = ring.iter_live().map(Entry::as_bytes).collect();
        assert_eq!(live, vec![&b"d\n"[..], b"e\n"]);
    }

    #[test]
    fn offset_resolution_over_all_positions() {
        let mut ring = RingLog::new(3);
        ring.add_entry(entry("a\n"));
        ring.add_entry(entry("bb\n"));
        ring.add_entry(entry("ccc\n"));

        let concatenated = b"a\nbb\nccc\n";
        for (k, expected) in concatenated.iter().enumerate() {
            let (found, within) = ring.find_entry_for_offset(k).unwrap();
            assert_eq!(found.as_bytes()[within], *expected, "offset {k}");
        }
        assert!(ring.find_entry_for_offset(concatenated.len()).is_none());
    }

    #[test]
    fn offset_resolution_after_wraparound() {
        let mut ring = RingLog::new(2);
        ring.add_entry(entry("old\n"));
        ring.add_entry(entry("mid\n"));
        ring.add_entry(entry("new\n")); // evicts "old\n"

        let concatenated = b"mid\nnew\n";
        for (k, expected) in concatenated.iter().enumerate() {
            let (found, within) = ring.find_entry_for_offset(k).unwrap();
            assert_eq!(found.as_bytes()[within], *expected, "offset {k}");
        }
        assert!(ring.find_entry_for_offset(concatenated.len()).is_none());
    }

    #[test]
    fn nth_live_entry_indexes_from_oldest() {
        let mut ring = RingLog::new(2);
        ring.add_entry(entry("a\n"));
        ring.add_entry(entry("b\n"));
        ring.add_entry(entry("c\n"));

        assert_eq!(ring.nth_live_entry(0).unwrap().as_bytes(), b"b\n");
        assert_eq!(ring.nth_live_entry(1).unwrap().as_bytes(), b"c\n");
        assert!(ring.nth_live_entry(2).is_none());
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn zero_capacity_is_rejected() {
        let _ = RingLog::new(0);
    }
}
