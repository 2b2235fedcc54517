//! ringlog - a bounded, append-only log store with two front-ends:
//! a concurrent TCP socket server and a file-like device binding.
//!
//! # Overview
//!
//! Everything is built on one primitive: a fixed-capacity circular buffer
//! of variable-length byte entries with overwrite-oldest eviction,
//! addressable by a flattened byte offset and by logical entry index.
//!
//! 1. The socket server accepts newline-delimited writes, commits each
//!    completed entry to the shared store, and answers every write with
//!    the entire current log content
//! 2. The device binding exposes positional read/write/seek over the same
//!    store, including a direct seek to an exact (entry, offset) boundary
//!
//! # Key Features
//!
//! - Variable-length entries with flat-offset translation across wraparound
//! - Terminator-delimited write staging; partial writes never commit
//! - One worker thread per connection, serialized commits, opportunistic
//!   worker reaping
//! - Cooperative shutdown observed at every suspension point
//! - Storage backend chosen at configuration time: in-memory ring or
//!   append-only CRC-framed file
//!
//! # Usage
//!
//! The store is created once at startup and handed to every front-end as
//! an explicit shared handle; see the `demos` directory for a complete
//! walkthrough.

#![deny(missing_docs)]

mod device;
mod ring;
mod server;
mod shutdown;
mod store;

pub use device::{DeviceHandle, DirectDevice};
pub use ring::accumulator::WriteAccumulator;
pub use ring::buffer::{RingLog, DEFAULT_CAPACITY};
pub use ring::{Entry, TERMINATOR};
pub use server::{LogServer, ServerConfig, ServerError};
pub use shutdown::ShutdownToken;
pub use store::backend::{BackendKind, FileBackend, MemoryBackend, StorageBackend};
pub use store::{LogStore, StoreError};
