//! Basic usage example for the ringlog store
//!
//! This example demonstrates:
//! 1. Creating the shared log store and handing it to both front-ends
//! 2. Starting the socket server on an ephemeral port
//! 3. Writing entries from several concurrent TCP clients
//! 4. Writing and reading through the file-like device binding
//! 5. Seeking to an exact (entry, offset) boundary
//! 6. Cooperative shutdown of the accept loop and its workers
//!
//! The server echoes the entire current log back after every completed
//! write, so each client's reply grows as the log fills.

use std::io::{Read, Seek, SeekFrom, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ringlog::{BackendKind, DirectDevice, LogServer, LogStore, ServerConfig, ShutdownToken};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // One store, created once, shared by every front-end.
    let store = Arc::new(LogStore::new(10));
    let shutdown = ShutdownToken::new();

    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        backend: BackendKind::Memory,
        ..Default::default()
    };
    let mut server = LogServer::bind(config, store.clone(), shutdown.clone())
        .expect("failed to bind example server");
    let addr = server.local_addr().expect("listener has no local address");
    println!("Server listening on {addr}");

    let server_thread = thread::spawn(move || {
        server.run().expect("server loop failed");
    });

    // A few concurrent clients, each sending one line and printing the
    // full-log reply.
    let clients: Vec<_> = (0..3)
        .map(|id| {
            thread::spawn(move || {
                let mut stream = TcpStream::connect(addr).expect("connect failed");
                let line = format!("hello from client {id}\n");
                stream.write_all(line.as_bytes()).expect("send failed");

                let mut reply = Vec::new();
                stream.read_to_end(&mut reply).expect("receive failed");
                println!(
                    "client {id} got {} bytes back:\n{}",
                    reply.len(),
                    String::from_utf8_lossy(&reply)
                );
            })
        })
        .collect();

    for client in clients {
        client.join().expect("client thread panicked");
    }

    // The device binding sees the same log and can add to it.
    let device = DirectDevice::new(store.clone());
    let mut handle = device.open();
    handle
        .write_all(b"hello from the device\n")
        .expect("device write failed");

    let mut content = Vec::new();
    handle
        .read_to_end(&mut content)
        .expect("device read failed");
    println!("full log via device:\n{}", String::from_utf8_lossy(&content));

    // Jump straight to the start of the newest entry and read just it.
    let newest = store.entry_count() - 1;
    handle
        .seek_to_entry(newest, 0)
        .expect("entry seek failed");
    let mut tail = Vec::new();
    handle.read_to_end(&mut tail).expect("tail read failed");
    println!("newest entry: {}", String::from_utf8_lossy(&tail));

    // End-relative positioning works too.
    let position = handle
        .seek(SeekFrom::End(0))
        .expect("end seek failed");
    println!("log ends at flat offset {position}");

    // Shut the server down; the accept loop joins its workers on the way
    // out.
    shutdown.trigger();
    server_thread.join().expect("server thread panicked");
    thread::sleep(Duration::from_millis(10));
    println!("Example completed successfully");
}
