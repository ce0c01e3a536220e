//! Shared helpers for the integration tests.
//!
//! Every socket binds `127.0.0.1:0` so tests can run in parallel.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use batqa_proxy::config::ProxyConfig;
use batqa_proxy::ProxyHandle;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Start a backend that echoes every line back to the sender.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (read, mut write) = socket.into_split();
                let mut reader = BufReader::new(read);
                let mut line = Vec::new();
                loop {
                    line.clear();
                    match reader.read_until(b'\n', &mut line).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {
                            if write.write_all(&line).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    addr
}

/// Start a backend that greets like a ServerQuery port and acknowledges
/// every command with `error id=0 msg=ok`.
pub async fn start_query_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (read, mut write) = socket.into_split();
                if write.write_all(b"TS3\n").await.is_err() {
                    return;
                }
                let mut lines = BufReader::new(read).lines();
                while let Ok(Some(_)) = lines.next_line().await {
                    if write.write_all(b"error id=0 msg=ok\n").await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    addr
}

/// An address with nothing listening on it.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Relay configuration on an ephemeral loopback port.
pub fn proxy_config(backend: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.backend.address = backend.to_string();
    config.backend.connect_timeout = Duration::from_secs(2);
    config
}

pub async fn start_proxy(config: ProxyConfig) -> ProxyHandle {
    ProxyHandle::start(config).await.unwrap()
}

/// Stop the relay, failing instead of hanging if a session is still open.
pub async fn stop_proxy(proxy: &ProxyHandle) {
    tokio::time::timeout(Duration::from_secs(5), proxy.stop())
        .await
        .expect("stop did not finish; a client socket is probably still open");
}

/// Send one line and read the echoed line back.
pub async fn round_trip(stream: &mut TcpStream, line: &[u8]) -> Vec<u8> {
    stream.write_all(line).await.unwrap();
    let mut buf = vec![0u8; line.len()];
    tokio::time::timeout(Duration::from_secs(2), stream.read_exact(&mut buf))
        .await
        .expect("timed out waiting for echo")
        .unwrap();
    buf
}

/// Assert the relay closed `stream` without sending anything.
pub async fn assert_closed(stream: &mut TcpStream) {
    let mut buf = [0u8; 64];
    let read = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf))
        .await
        .expect("connection was not closed");
    match read {
        Ok(n) => assert_eq!(n, 0, "expected EOF, got {n} bytes"),
        // A reset is also a close.
        Err(_) => {}
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
