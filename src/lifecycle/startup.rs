//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Bind the listener (fatal on failure)
//! - Start the accept loop and background tasks (rate limiter sweep, statistics)
//! - Stop everything on request and wait for in-flight sessions
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Every background task listens to the same shutdown signal
//! - Listener starts last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::loader::join_errors;
use crate::config::{validate_config, ProxyConfig, ValidationError};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::state::LifecycleState;
use crate::net::{Listener, ListenerError};
use crate::observability::{Stats, StatsReporter};
use crate::relay::RelayServer;
use crate::security::RateLimiter;

/// Fatal startup errors.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("invalid configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ValidationError>),

    #[error(transparent)]
    Bind(#[from] ListenerError),
}

/// A running relay.
#[derive(Debug)]
pub struct ProxyHandle {
    local_addr: SocketAddr,
    stats: Arc<Stats>,
    limiter: Option<Arc<RateLimiter>>,
    shutdown: Shutdown,
    state: watch::Receiver<LifecycleState>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ProxyHandle {
    /// Validate `config`, bind, and start accepting.
    pub async fn start(config: ProxyConfig) -> Result<Self, ProxyError> {
        validate_config(&config).map_err(ProxyError::InvalidConfig)?;

        let stats = Arc::new(Stats::new());
        let shutdown = Shutdown::new();
        let (state_tx, state) = watch::channel(LifecycleState::Stopped);

        let limiter = config.rate_limit.enabled().then(|| {
            Arc::new(RateLimiter::new(
                config.rate_limit.requests_per_second,
                config.rate_limit.window,
            ))
        });

        let listener = Listener::bind(&config.listener.normalized_bind_address()).await?;
        let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

        state_tx.send_replace(LifecycleState::Listening);
        log_banner(&config, local_addr, limiter.as_deref());

        let mut tasks = Vec::with_capacity(3);

        if let Some(limiter) = &limiter {
            tasks.push(tokio::spawn(
                Arc::clone(limiter).run_sweeper(config.rate_limit.sweep_interval, shutdown.subscribe()),
            ));
        }

        let reporter = StatsReporter::new(Arc::clone(&stats), config.observability.stats_interval);
        tasks.push(tokio::spawn(reporter.run(shutdown.subscribe())));

        let server = RelayServer::new(&config, Arc::clone(&stats), limiter.clone(), state_tx);
        let accept_rx = shutdown.subscribe();
        let accept_shutdown = shutdown.clone();
        tasks.push(tokio::spawn(server.run(listener, accept_shutdown, accept_rx)));

        Ok(Self {
            local_addr,
            stats,
            limiter,
            shutdown,
            state,
            tasks: Mutex::new(tasks),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> Arc<Stats> {
        Arc::clone(&self.stats)
    }

    /// The per-source limiter, if rate limiting is enabled.
    pub fn rate_limiter(&self) -> Option<Arc<RateLimiter>> {
        self.limiter.clone()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Stop accepting, wait for every session and background task, then return.
    ///
    /// Safe to call more than once; later calls wait for the same outcome.
    pub async fn stop(&self) {
        if !self.shutdown.is_triggered() {
            tracing::info!("Shutting down relay");
        }
        self.shutdown.trigger();

        let tasks = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *tasks)
        };
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Background task failed during shutdown");
            }
        }

        self.wait().await;
    }

    /// Wait until the relay has drained and reached [`LifecycleState::Stopped`].
    pub async fn wait(&self) {
        let mut state = self.state.clone();
        // An Err means the accept loop is gone, which is also stopped.
        let _ = state.wait_for(|s| *s == LifecycleState::Stopped).await;
    }
}

fn log_banner(config: &ProxyConfig, local_addr: SocketAddr, limiter: Option<&RateLimiter>) {
    let rate_limit = match limiter {
        Some(limiter) => format!(
            "{}/{}",
            limiter.limit(),
            humantime::format_duration(limiter.window())
        ),
        None => "unlimited".to_string(),
    };

    tracing::info!(
        listen = %local_addr,
        backend = %config.backend.address,
        max_connections = config.listener.max_connections,
        connect_timeout = %humantime::format_duration(config.backend.connect_timeout),
        rate_limit = %rate_limit,
        "Relay started"
    );
}
