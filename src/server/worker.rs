//! Per-connection worker
//!
//! Each accepted connection is served to completion by one worker thread:
//! receive raw chunks into a staging buffer until a terminator completes
//! one logical entry, commit it through the configured backend, stream the
//! entire current log content back, and close the connection.
//!
//! The receive loop runs the socket in non-blocking mode with a short
//! fixed backoff, re-checking the shutdown token on every iteration; a
//! worker observing shutdown discards its partially staged bytes and
//! commits nothing. A peer that disconnects before the terminator likewise
//! leaves the log untouched.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::ring::accumulator::WriteAccumulator;
use crate::server::ServerError;
use crate::shutdown::ShutdownToken;
use crate::store::backend::StorageBackend;

/// Serve one accepted connection to completion.
///
/// # Errors
///
/// [`ServerError::PeerDisconnected`] if the peer closes before a
/// terminator arrives, [`ServerError::Transport`] on send/receive
/// failures. Either way only this connection is affected.
pub fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    backend: Arc<dyn StorageBackend>,
    shutdown: ShutdownToken,
    recv_buf_size: usize,
    backoff: Duration,
) -> Result<(), ServerError> {
    stream.set_nonblocking(true)?;
    let mut staged = WriteAccumulator::new();
    let mut buf = vec![0u8; recv_buf_size];

    let entry = loop {
        if shutdown.is_triggered() {
            debug!(
                %peer,
                discarded = staged.pending_len(),
                "shutdown observed, dropping partial write"
            );
            staged.discard();
            return Ok(());
        }
        match stream.read(&mut buf) {
            Ok(0) => {
                staged.discard();
                return Err(ServerError::PeerDisconnected);
            }
            Ok(n) => {
                if let Some(entry) = staged.append(&buf[..n])? {
                    break entry;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(backoff),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ServerError::Transport(e)),
        }
    };

    debug!(%peer, len = entry.len(), "committing entry");
    backend.write_append(entry)?;

    // Reply with the entire current log. The snapshot is copied out under
    // the store lock; the send happens with the lock released, in blocking
    // mode.
    let content = backend.snapshot()?;
    stream.set_nonblocking(false)?;
    stream.write_all(&content)?;
    info!(%peer, reply_bytes = content.len(), "closing connection");
    Ok(())
}
