//! Accept loop and session supervision.
//!
//! # Responsibilities
//! - Accept connections until shutdown
//! - Apply admission control (capacity, then per-source rate)
//! - Spawn one session task per admitted connection without waiting on it
//! - On shutdown: close the listener, then wait for every session to finish
//!
//! # Design Decisions
//! - Sessions live in a `JoinSet`, reaped as they finish
//! - The active-connection guard is opened before the session is spawned, so the
//!   capacity check never runs ahead of the count
//! - An optional drain timeout force-closes lingering sessions, which are still joined

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tokio::task::{JoinError, JoinSet};
use tokio::time;

use crate::config::ProxyConfig;
use crate::lifecycle::{LifecycleState, Shutdown};
use crate::net::{ConnectionGuard, Listener};
use crate::observability::Stats;
use crate::relay::session::{ConnectionHandler, SessionSummary};
use crate::security::{AdmissionControl, RateLimiter};

/// Pause after a failed accept so a persistent error (e.g. EMFILE) does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// The acceptor: owns the listening socket and supervises sessions.
pub struct RelayServer {
    admission: AdmissionControl,
    handler: Arc<ConnectionHandler>,
    stats: Arc<Stats>,
    drain_timeout: Option<Duration>,
    state: watch::Sender<LifecycleState>,
    /// Force-closes running sessions when the drain timeout elapses.
    close_sessions: broadcast::Sender<()>,
}

impl RelayServer {
    pub fn new(
        config: &ProxyConfig,
        stats: Arc<Stats>,
        limiter: Option<Arc<RateLimiter>>,
        state: watch::Sender<LifecycleState>,
    ) -> Self {
        let handler = ConnectionHandler::new(
            config.backend.normalized_address(),
            config.backend.connect_timeout,
            Arc::clone(&stats),
        );
        let (close_sessions, _) = broadcast::channel(1);

        Self {
            admission: AdmissionControl::new(
                Arc::clone(&stats),
                config.listener.max_connections,
                limiter,
            ),
            handler: Arc::new(handler),
            stats,
            drain_timeout: config.shutdown.drain_timeout,
            state,
            close_sessions,
        }
    }

    /// Accept until `shutdown` fires, then drain.
    ///
    /// `shutdown_rx` must have been subscribed from `shutdown` before the
    /// signal could fire.
    pub async fn run(self, listener: Listener, shutdown: Shutdown, mut shutdown_rx: broadcast::Receiver<()>) {
        self.state.send_replace(LifecycleState::Listening);
        let mut sessions: JoinSet<SessionSummary> = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    log_session_end(joined);
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.dispatch(stream, peer, &shutdown, &mut sessions),
                    Err(e) => {
                        tracing::error!(error = %e, "Accept error");
                        time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        self.state.send_replace(LifecycleState::Draining);
        tracing::info!(sessions = sessions.len(), "Listener closed, draining sessions");

        self.drain(&mut sessions).await;

        self.state.send_replace(LifecycleState::Stopped);
        tracing::info!("Relay stopped");
    }

    fn dispatch(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        shutdown: &Shutdown,
        sessions: &mut JoinSet<SessionSummary>,
    ) {
        if shutdown.is_triggered() {
            tracing::debug!(peer_addr = %peer, "Closing connection accepted during shutdown");
            return;
        }

        let admission = self.admission.check(peer);
        if !admission.is_admitted() {
            tracing::warn!(
                peer_addr = %peer,
                reason = %admission,
                active = self.stats.active_connections(),
                "Connection rejected"
            );
            return;
        }

        let guard = ConnectionGuard::open(Arc::clone(&self.stats));
        let handler = Arc::clone(&self.handler);
        let close = self.close_sessions.subscribe();
        sessions.spawn(async move { handler.handle(stream, peer, guard, close).await });
    }

    async fn drain(&self, sessions: &mut JoinSet<SessionSummary>) {
        match self.drain_timeout {
            Some(limit) => {
                if time::timeout(limit, join_all(sessions)).await.is_err() {
                    tracing::warn!(
                        remaining = sessions.len(),
                        timeout = ?limit,
                        "Drain timeout elapsed, closing remaining sessions"
                    );
                    let _ = self.close_sessions.send(());
                    join_all(sessions).await;
                }
            }
            None => join_all(sessions).await,
        }
    }
}

async fn join_all(sessions: &mut JoinSet<SessionSummary>) {
    while let Some(joined) = sessions.join_next().await {
        log_session_end(joined);
    }
}

fn log_session_end(joined: Result<SessionSummary, JoinError>) {
    match joined {
        Ok(summary) if !summary.relayed => {
            tracing::debug!("Session ended without reaching the backend");
        }
        Ok(summary) => {
            tracing::trace!(commands = summary.commands, bytes = summary.bytes, "Session reaped");
        }
        Err(e) => tracing::error!(error = %e, "Session task failed"),
    }
}
