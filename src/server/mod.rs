//! TCP front-end: listener, accept loop, worker lifecycle
//!
//! The socket transport accepts line-delimited writes and answers each
//! completed write with the entire current log content. Concurrency
//! model:
//!
//! - The accept loop is single-threaded and non-blocking; it never waits
//!   on a worker before accepting the next connection
//! - One named worker thread is spawned per accepted connection and runs
//!   to completion
//! - Finished workers are reaped opportunistically on every idle pass of
//!   the accept loop, and all workers are joined before [`LogServer::run`]
//!   returns
//! - The shutdown token is checked on every loop iteration, here and in
//!   every worker receive loop
//!
//! Per-connection failures are logged and never abort the store, other
//! workers, or the accept loop.

pub mod worker;

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::shutdown::ShutdownToken;
use crate::store::backend::BackendKind;
use crate::store::{LogStore, StoreError};

/// Errors raised by the socket transport.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("failed to bind listener on {addr}")]
    Bind {
        /// The address that could not be bound.
        addr: String,
        /// The underlying bind failure.
        source: io::Error,
    },

    /// The peer disconnected before a terminator arrived; nothing was
    /// committed.
    #[error("peer disconnected before completing a write")]
    PeerDisconnected,

    /// Send or receive failed mid-stream; that connection only is closed.
    #[error("transport failure: {0}")]
    Transport(#[from] io::Error),

    /// The store or backend rejected an operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Configuration for the socket front-end.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: String,
    /// Receive buffer size for each connection.
    pub recv_buf_size: usize,
    /// Backoff sleep applied when a non-blocking receive or accept has
    /// nothing to do; also bounds how quickly shutdown is observed.
    pub backoff: Duration,
    /// Storage flavor every connection commits to.
    pub backend: BackendKind,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9000".to_string(),
            recv_buf_size: 4096,
            backoff: Duration::from_millis(10),
            backend: BackendKind::Memory,
        }
    }
}

/// The socket server: a bound listener plus its worker handles.
pub struct LogServer {
    listener: TcpListener,
    backend: Arc<dyn crate::store::backend::StorageBackend>,
    config: ServerConfig,
    shutdown: ShutdownToken,
    workers: Vec<JoinHandle<()>>,
}

impl LogServer {
    /// Bind the listener and build the configured storage backend.
    ///
    /// Binding to port 0 selects an ephemeral port; see
    /// [`LogServer::local_addr`].
    pub fn bind(
        config: ServerConfig,
        store: Arc<LogStore>,
        shutdown: ShutdownToken,
    ) -> Result<Self, ServerError> {
        let backend = config.backend.build(&store)?;
        let listener = TcpListener::bind(&config.bind_addr).map_err(|source| ServerError::Bind {
            addr: config.bind_addr.clone(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        info!(addr = %listener.local_addr()?, "listening");
        Ok(Self {
            listener,
            backend,
            config,
            shutdown,
            workers: Vec::new(),
        })
    }

    /// The address the listener is actually bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the accept loop until the shutdown token trips, then join all
    /// remaining workers.
    pub fn run(&mut self) -> Result<(), ServerError> {
        let mut next_worker_id = 0usize;
        while !self.shutdown.is_triggered() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    info!(%peer, "accepted connection");
                    let backend = self.backend.clone();
                    let shutdown = self.shutdown.clone();
                    let recv_buf_size = self.config.recv_buf_size;
                    let backoff = self.config.backoff;
                    let handle = thread::Builder::new()
                        .name(format!("ringlog-conn-{next_worker_id}"))
                        .spawn(move || {
                            if let Err(error) = worker::serve_connection(
                                stream,
                                peer,
                                backend,
                                shutdown,
                                recv_buf_size,
                                backoff,
                            ) {
                                warn!(%peer, %error, "connection closed with error");
                            }
                        })
                        .map_err(ServerError::Transport)?;
                    self.workers.push(handle);
                    next_worker_id += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.reap_finished();
                    thread::sleep(self.config.backoff);
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                }
            }
        }
        self.join_all();
        info!("server stopped");
        Ok(())
    }

    /// Join workers that have already finished, leaving the rest running.
    fn reap_finished(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) = self
            .workers
            .drain(..)
            .partition(|handle| handle.is_finished());
        for handle in finished {
            if handle.join().is_err() {
                error!("worker panicked");
            }
        }
        self.workers = running;
    }

    /// Join every remaining worker; used on shutdown.
    fn join_all(&mut self) {
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("worker panicked");
            }
        }
    }
}
