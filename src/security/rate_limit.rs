//! Per-source sliding-log rate limiting.
//!
//! # Responsibilities
//! - Count exact admissions per source address within a trailing window
//! - Reject without recording once a source is at its limit
//! - Periodically forget sources with no admissions inside the window
//!
//! # Design Decisions
//! - One mutex over the whole map; it is only touched on the accept path
//! - The lock is never held across an await or a network operation
//! - Timestamps are injectable (`*_at`) so behaviour is testable without sleeping

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::time;

type Log = HashMap<String, VecDeque<Instant>>;

/// Sliding-log rate limiter keyed by source address.
#[derive(Debug)]
pub struct RateLimiter {
    log: Mutex<Log>,
    limit: usize,
    window: Duration,
}

impl RateLimiter {
    /// `limit` admissions per `window` for each key.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            log: Mutex::new(HashMap::new()),
            limit: limit as usize,
            window,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a request for `key` now and report whether it is within the limit.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    /// [`RateLimiter::allow`] evaluated at `now`.
    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut log = self.lock();

        let stamps = log.entry(key.to_string()).or_default();
        prune(stamps, now, self.window);

        if stamps.len() >= self.limit {
            return false;
        }
        stamps.push_back(now);
        true
    }

    /// Drop every key whose timestamps have all left the window. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// [`RateLimiter::sweep`] evaluated at `now`.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut log = self.lock();
        let before = log.len();
        log.retain(|_, stamps| {
            prune(stamps, now, self.window);
            !stamps.is_empty()
        });
        before - log.len()
    }

    /// Number of source addresses currently tracked.
    pub fn tracked_sources(&self) -> usize {
        self.lock().len()
    }

    /// Sweep on `interval` until the shutdown signal fires.
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::debug!(interval = ?interval, "Rate limiter sweeper starting");

        let start = time::Instant::now() + interval;
        let mut ticker = time::interval_at(start, interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.sweep();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.tracked_sources(), "Swept idle rate limit entries");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Rate limiter sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Log> {
        // Every critical section leaves the map consistent, so a poisoned lock is still usable.
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Remove timestamps at or before `now - window`. Timestamps are appended in
/// order, so expired entries are always at the front.
fn prune(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = stamps.front() {
        if now.saturating_duration_since(oldest) >= window {
            stamps.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(1);

    #[test]
    fn reports_configured_limit_and_window() {
        let limiter = RateLimiter::new(5, WINDOW);
        assert_eq!(limiter.limit(), 5);
        assert_eq!(limiter.window(), WINDOW);
    }

    #[test]
    fn admits_up_to_limit_within_window() {
        let limiter = RateLimiter::new(3, WINDOW);
        let t0 = Instant::now();

        assert!(limiter.allow_at("10.0.0.1", t0));
        assert!(limiter.allow_at("10.0.0.1", t0 + Duration::from_millis(100)));
        assert!(limiter.allow_at("10.0.0.1", t0 + Duration::from_millis(200)));
        assert!(!limiter.allow_at("10.0.0.1", t0 + Duration::from_millis(300)));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(1, WINDOW);
        let t0 = Instant::now();

        assert!(limiter.allow_at("10.0.0.1", t0));
        assert!(!limiter.allow_at("10.0.0.1", t0));
        assert!(limiter.allow_at("10.0.0.2", t0));
    }

    #[test]
    fn rejected_attempts_do_not_consume_capacity() {
        let limiter = RateLimiter::new(2, WINDOW);
        let t0 = Instant::now();

        assert!(limiter.allow_at("a", t0));
        assert!(limiter.allow_at("a", t0 + Duration::from_millis(500)));
        // Hammering while full must not push the next free slot further out.
        for ms in [600, 700, 800, 900] {
            assert!(!limiter.allow_at("a", t0 + Duration::from_millis(ms)));
        }
        // The t0 admission has left the window; exactly one slot is free.
        assert!(limiter.allow_at("a", t0 + Duration::from_millis(1000)));
        assert!(!limiter.allow_at("a", t0 + Duration::from_millis(1001)));
        // The t0+500 admission leaves next.
        assert!(limiter.allow_at("a", t0 + Duration::from_millis(1500)));
    }

    #[test]
    fn window_slides_rather_than_resets() {
        let limiter = RateLimiter::new(2, WINDOW);
        let t0 = Instant::now();

        assert!(limiter.allow_at("a", t0 + Duration::from_millis(900)));
        assert!(limiter.allow_at("a", t0 + Duration::from_millis(950)));
        // A fixed one-second bucket would reset at t0+1000; the sliding log does not.
        assert!(!limiter.allow_at("a", t0 + Duration::from_millis(1100)));
        assert!(limiter.allow_at("a", t0 + Duration::from_millis(1900)));
    }

    #[test]
    fn never_more_than_limit_in_any_trailing_window() {
        let limiter = RateLimiter::new(5, WINDOW);
        let t0 = Instant::now();
        let mut admitted = Vec::new();

        for step in 0..400u64 {
            let at = t0 + Duration::from_millis(step * 7);
            if limiter.allow_at("a", at) {
                admitted.push(at);
            }
        }

        for (i, start) in admitted.iter().enumerate() {
            let in_window = admitted[i..]
                .iter()
                .take_while(|t| t.duration_since(*start) < WINDOW)
                .count();
            assert!(in_window <= 5, "{in_window} admissions inside one window");
        }
    }

    #[test]
    fn zero_limit_rejects_everything() {
        let limiter = RateLimiter::new(0, WINDOW);
        assert!(!limiter.allow_at("a", Instant::now()));
    }

    #[test]
    fn sweep_removes_only_idle_keys() {
        let limiter = RateLimiter::new(5, WINDOW);
        let t0 = Instant::now();

        limiter.allow_at("stale", t0);
        limiter.allow_at("fresh", t0);
        limiter.allow_at("fresh", t0 + Duration::from_millis(800));
        assert_eq!(limiter.tracked_sources(), 2);

        let removed = limiter.sweep_at(t0 + Duration::from_millis(1200));
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_sources(), 1);

        let removed = limiter.sweep_at(t0 + Duration::from_millis(1800));
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_sources(), 0);
    }

    #[test]
    fn rejected_only_key_is_swept() {
        let limiter = RateLimiter::new(0, WINDOW);
        let t0 = Instant::now();
        assert!(!limiter.allow_at("a", t0));
        assert_eq!(limiter.sweep_at(t0), 1);
    }

    #[tokio::test]
    async fn sweeper_stops_on_shutdown() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::from_millis(5)));
        limiter.allow("a");

        let (tx, rx) = broadcast::channel(1);
        let task = tokio::spawn(Arc::clone(&limiter).run_sweeper(Duration::from_millis(10), rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(limiter.tracked_sources(), 0);

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("sweeper should exit after shutdown")
            .unwrap();
    }
}
