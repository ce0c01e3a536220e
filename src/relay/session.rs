//! Per-connection session handling.
//!
//! # Responsibilities
//! - Dial the backend with the configured timeout (no retry)
//! - Run both relay directions as separate tasks
//! - Close both sockets as soon as either direction ends
//! - Join both directions before the session counts as finished
//!
//! # Design Decisions
//! - The dial timeout is the only timeout; established sessions may idle forever
//! - Socket ownership stays inside the session: the split halves move into the
//!   direction tasks, and aborting a task drops (closes) its halves
//! - A shutdown force-close signal is handled the same way as a finished direction

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinSet};
use tokio::time;
use tracing::Instrument;

use crate::net::ConnectionGuard;
use crate::observability::Stats;
use crate::relay::error::ConnectionError;
use crate::relay::frame::{relay_frames, Direction, SessionCounters};

type DirectionResult = (Direction, Result<(), ConnectionError>);

/// What a finished session did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Whether the backend dial succeeded.
    pub relayed: bool,
    pub commands: u64,
    pub bytes: u64,
}

/// Relays one accepted client connection to the backend.
#[derive(Debug)]
pub struct ConnectionHandler {
    backend_address: String,
    connect_timeout: Duration,
    stats: Arc<Stats>,
}

impl ConnectionHandler {
    pub fn new(backend_address: impl Into<String>, connect_timeout: Duration, stats: Arc<Stats>) -> Self {
        Self {
            backend_address: backend_address.into(),
            connect_timeout,
            stats,
        }
    }

    /// Run the session to completion.
    ///
    /// `guard` was opened when the connection was admitted; it is released
    /// when this returns, after both sockets are closed. A message on `close`
    /// ends the session early.
    pub async fn handle(
        &self,
        client: TcpStream,
        peer: SocketAddr,
        guard: ConnectionGuard,
        close: broadcast::Receiver<()>,
    ) -> SessionSummary {
        let span = tracing::info_span!("session", connection_id = %guard.id(), peer_addr = %peer);
        self.run(client, guard, close).instrument(span).await
    }

    async fn run(
        &self,
        client: TcpStream,
        guard: ConnectionGuard,
        mut close: broadcast::Receiver<()>,
    ) -> SessionSummary {
        tracing::info!(active = guard.active_at_open(), "New connection");

        let backend = match self.dial().await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, "Backend unavailable, closing client");
                return SessionSummary {
                    relayed: false,
                    commands: 0,
                    bytes: 0,
                };
            }
        };

        set_nodelay(&client, "client");
        set_nodelay(&backend, "backend");

        let counters = Arc::new(SessionCounters::default());
        let (client_read, client_write) = client.into_split();
        let (backend_read, backend_write) = backend.into_split();

        let mut directions: JoinSet<DirectionResult> = JoinSet::new();
        directions.spawn(
            forward(
                BufReader::new(client_read),
                backend_write,
                Direction::ClientToBackend,
                Arc::clone(&counters),
                Arc::clone(&self.stats),
            )
            .in_current_span(),
        );
        directions.spawn(
            forward(
                BufReader::new(backend_read),
                client_write,
                Direction::BackendToClient,
                Arc::clone(&counters),
                Arc::clone(&self.stats),
            )
            .in_current_span(),
        );

        let first = tokio::select! {
            first = directions.join_next() => first,
            signal = close.recv() => match signal {
                // Nobody can ask us to close any more; wait for the relay itself.
                Err(broadcast::error::RecvError::Closed) => directions.join_next().await,
                _ => {
                    tracing::debug!("Closing session for shutdown");
                    None
                }
            },
        };
        if let Some(outcome) = first {
            log_direction_end(outcome);
        }

        // Dropping the remaining halves closes both sockets.
        directions.abort_all();
        while let Some(outcome) = directions.join_next().await {
            log_direction_end(outcome);
        }

        let summary = SessionSummary {
            relayed: true,
            commands: counters.commands(),
            bytes: counters.bytes(),
        };
        tracing::info!(
            commands = summary.commands,
            bytes = summary.bytes,
            "Connection closed"
        );
        drop(guard);
        summary
    }

    async fn dial(&self) -> Result<TcpStream, ConnectionError> {
        match time::timeout(self.connect_timeout, TcpStream::connect(&self.backend_address)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(source)) => Err(ConnectionError::Dial {
                address: self.backend_address.clone(),
                source,
            }),
            Err(_) => Err(ConnectionError::DialTimeout {
                address: self.backend_address.clone(),
                timeout: self.connect_timeout,
            }),
        }
    }
}

async fn forward<R, W>(
    reader: R,
    writer: W,
    direction: Direction,
    counters: Arc<SessionCounters>,
    stats: Arc<Stats>,
) -> DirectionResult
where
    R: tokio::io::AsyncBufRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let result = relay_frames(reader, writer, direction, counters, stats).await;
    (direction, result)
}

fn log_direction_end(outcome: Result<DirectionResult, JoinError>) {
    match outcome {
        Ok((direction, Ok(()))) => tracing::debug!(%direction, "Peer closed stream"),
        Ok((_, Err(e))) => tracing::warn!(error = %e, "Relay error"),
        Err(e) if e.is_cancelled() => {}
        Err(e) => tracing::error!(error = %e, "Relay task panicked"),
    }
}

/// Line-at-a-time request/response traffic should not wait on Nagle.
fn set_nodelay(stream: &TcpStream, side: &'static str) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(side, error = %e, "Failed to set TCP_NODELAY");
    }
}
