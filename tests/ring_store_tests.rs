//! Integration tests for the ring, the accumulator, and the shared store.

use ringlog::{Entry, LogStore, RingLog, WriteAccumulator};

fn entry(text: &str) -> Entry {
    Entry::new(text.as_bytes().to_vec())
}

#[test]
fn round_trip_preserves_order_and_terminators() {
    let store = LogStore::new(10);
    for text in ["a\n", "bb\n", "ccc\n"] {
        store.commit(entry(text));
    }
    assert_eq!(store.snapshot(), b"a\nbb\nccc\n");
}

#[test]
fn eviction_fifo_at_capacity_plus_one() {
    let capacity = 5;
    let mut ring = RingLog::new(capacity);
    for i in 0..=capacity {
        let evicted = ring.add_entry(entry(&format!("entry-{i}\n")));
        if i < capacity {
            assert!(evicted.is_none());
        } else {
            assert_eq!(evicted.unwrap().as_bytes(), b"entry-0\n");
        }
    }

    let live: Vec<Vec<u8>> = ring.iter_live().map(|e| e.as_bytes().to_vec()).collect();
    let expected: Vec<Vec<u8>> = (1..=capacity)
        .map(|i| format!("entry-{i}\n").into_bytes())
        .collect();
    assert_eq!(live, expected);
}

#[test]
fn offset_resolution_is_consistent_with_concatenation() {
    // Capacity 3 with five commits forces eviction and wraparound.
    let mut ring = RingLog::new(3);
    for text in ["first\n", "second\n", "third\n", "fourth\n", "fifth\n"] {
        ring.add_entry(entry(text));
    }

    let concatenated = b"third\nfourth\nfifth\n";
    assert_eq!(ring.total_live_length(), concatenated.len());
    for (k, expected) in concatenated.iter().enumerate() {
        let (found, within) = ring.find_entry_for_offset(k).unwrap();
        assert_eq!(found.as_bytes()[within], *expected, "mismatch at offset {k}");
    }
    assert!(ring.find_entry_for_offset(concatenated.len()).is_none());
}

#[test]
fn positional_reads_reassemble_the_log() {
    let store = LogStore::new(4);
    for text in ["alpha\n", "beta\n", "gamma\n"] {
        store.commit(entry(text));
    }

    // Drive a cursor with repeated single-entry reads, as a positional
    // reader would.
    let mut content = Vec::new();
    let mut position = 0u64;
    loop {
        let chunk = store.read_at(position, 4096);
        if chunk.is_empty() {
            break;
        }
        position += chunk.len() as u64;
        content.extend_from_slice(&chunk);
    }
    assert_eq!(content, b"alpha\nbeta\ngamma\n");
}

#[test]
fn seek_validity_boundaries() {
    let store = LogStore::new(10);
    for text in ["a\n", "bb\n", "ccc\n"] {
        store.commit(entry(text));
    }

    assert_eq!(store.resolve_seek(0, 0).unwrap(), 0);
    assert_eq!(store.resolve_seek(1, 3).unwrap(), 5);
    assert_eq!(store.resolve_seek(2, 0).unwrap(), 5);
    assert!(store.resolve_seek(1, 4).is_err());
    assert!(store.resolve_seek(3, 0).is_err());
}

#[test]
fn accumulator_is_chunking_independent() {
    let mut split = WriteAccumulator::new();
    assert!(split.append(b"hel").unwrap().is_none());
    let split_entry = split.append(b"lo\n").unwrap().unwrap();

    let mut whole = WriteAccumulator::new();
    let whole_entry = whole.append(b"hello\n").unwrap().unwrap();

    assert_eq!(split_entry, whole_entry);
}

#[test]
fn concurrent_commits_lose_nothing() {
    const WRITERS: usize = 8;
    const PER_WRITER: usize = 3;

    let store = LogStore::new(WRITERS * PER_WRITER);
    crossbeam_utils::thread::scope(|s| {
        for w in 0..WRITERS {
            let store = &store;
            s.spawn(move |_| {
                for m in 0..PER_WRITER {
                    store.commit(entry(&format!("writer-{w}-msg-{m}\n")));
                }
            });
        }
    })
    .unwrap();

    assert_eq!(store.entry_count(), WRITERS * PER_WRITER);
    let content = store.snapshot();
    let text = std::str::from_utf8(&content).unwrap();
    let lines: Vec<&str> = text.split_terminator('\n').collect();
    assert_eq!(lines.len(), WRITERS * PER_WRITER);
    for w in 0..WRITERS {
        for m in 0..PER_WRITER {
            let expected = format!("writer-{w}-msg-{m}");
            assert!(lines.contains(&expected.as_str()), "missing {expected}");
        }
    }
}

#[test]
fn concurrent_commits_past_capacity_evict_cleanly() {
    const WRITERS: usize = 8;
    const CAPACITY: usize = 4;

    let store = LogStore::new(CAPACITY);
    crossbeam_utils::thread::scope(|s| {
        for w in 0..WRITERS {
            let store = &store;
            s.spawn(move |_| {
                store.commit(entry(&format!("writer-{w}\n")));
            });
        }
    })
    .unwrap();

    // Exactly capacity entries survive, every one a complete line that
    // some writer actually sent.
    assert_eq!(store.entry_count(), CAPACITY);
    let content = store.snapshot();
    let text = std::str::from_utf8(&content).unwrap();
    let lines: Vec<&str> = text.split_terminator('\n').collect();
    assert_eq!(lines.len(), CAPACITY);
    for line in &lines {
        assert!(
            line.starts_with("writer-"),
            "torn or corrupt entry: {line:?}"
        );
    }
}
