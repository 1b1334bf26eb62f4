//! Fixed-window rate limiting keyed by client address.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::WindowConfig;

/// Which traffic a limiter is charged for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    /// Every non-exempt request.
    Global,
    /// Only requests under the API prefix.
    ApiOnly,
}

impl LimitScope {
    pub fn as_str(self) -> &'static str {
        match self {
            LimitScope::Global => "global",
            LimitScope::ApiOnly => "api",
        }
    }

    /// Client-facing error text.
    pub fn message(self) -> &'static str {
        match self {
            LimitScope::Global => "Too many requests from this IP",
            LimitScope::ApiOnly => "Too many API requests from this IP",
        }
    }
}

/// Counter for one client inside its current window.
#[derive(Debug)]
struct WindowCounter {
    hits: u32,
    started: Instant,
}

/// Snapshot of a client's window after a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateState {
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

impl RateState {
    /// Seconds until the window resets, rounded up, never zero.
    pub fn retry_after_secs(&self) -> u64 {
        let millis = self.reset_after.as_millis() as u64;
        millis.div_ceil(1000).max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed(RateState),
    Limited(RateState),
}

impl RateDecision {
    pub fn state(&self) -> &RateState {
        match self {
            RateDecision::Allowed(state) | RateDecision::Limited(state) => state,
        }
    }
}

/// Per-client fixed window limiter.
///
/// A client's window opens at its first request and lasts `window`. Every
/// request is counted, including rejected ones.
pub struct FixedWindowLimiter {
    scope: LimitScope,
    window: Duration,
    max_requests: u32,
    counters: DashMap<String, WindowCounter>,
}

impl FixedWindowLimiter {
    pub fn new(scope: LimitScope, config: WindowConfig) -> Self {
        Self {
            scope,
            window: Duration::from_millis(config.window_ms),
            max_requests: config.max_requests,
            counters: DashMap::new(),
        }
    }

    pub fn scope(&self) -> LimitScope {
        self.scope
    }

    /// Charge one request to `client` at `now`.
    pub fn hit(&self, client: &str, now: Instant) -> RateDecision {
        let mut counter = self
            .counters
            .entry(client.to_string())
            .or_insert_with(|| WindowCounter { hits: 0, started: now });

        if now.duration_since(counter.started) >= self.window {
            counter.hits = 0;
            counter.started = now;
        }
        counter.hits = counter.hits.saturating_add(1);

        let state = RateState {
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(counter.hits),
            reset_after: (counter.started + self.window).saturating_duration_since(now),
        };

        if counter.hits > self.max_requests {
            RateDecision::Limited(state)
        } else {
            RateDecision::Allowed(state)
        }
    }

    /// Drop counters whose window has elapsed. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.counters.len();
        self.counters
            .retain(|_, counter| now.duration_since(counter.started) < self.window);
        before.saturating_sub(self.counters.len())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.counters.len()
    }
}

/// Periodically sweep expired counters until shutdown.
pub async fn run_sweeper(
    limiters: Vec<Arc<FixedWindowLimiter>>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                for limiter in &limiters {
                    let removed = limiter.sweep(now);
                    if removed > 0 {
                        tracing::debug!(
                            scope = limiter.scope().as_str(),
                            removed,
                            remaining = limiter.tracked_clients(),
                            "Swept expired rate limit counters"
                        );
                    }
                }
            }
            _ = shutdown.recv() => {
                tracing::debug!("Rate limit sweeper received shutdown signal, exiting loop");
                break;
            }
        }
    }
}
