//! Per-visitor rate limiting and rejection accounting.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::VisitorConfig;
use crate::http::error::HttpError;
use crate::observability::metrics;

/// Abuse accounting consulted before a rejection is written.
pub trait AbuseTracker: Send + Sync {
    /// Count a refused pushkey against `visitor`.
    fn record_rejection(&self, visitor: IpAddr, pushkey: &str);
}

/// A simple token bucket rate limiter.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn refill(&mut self, capacity: f64, refill_rate: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        self.refill(capacity, refill_rate);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Full and untouched for at least `idle_for`. Does not refill in place.
    fn is_idle(&self, capacity: f64, refill_rate: f64, idle_for: Duration) -> bool {
        let elapsed = self.last_update.elapsed();
        let tokens = self.tokens + elapsed.as_secs_f64() * refill_rate;
        elapsed >= idle_for && tokens >= capacity
    }

    /// Take `cost` tokens unconditionally, never going below zero.
    fn charge(&mut self, cost: f64, capacity: f64, refill_rate: f64) {
        self.refill(capacity, refill_rate);
        self.tokens = (self.tokens - cost).max(0.0);
    }
}

struct VisitorState {
    bucket: TokenBucket,
    rejections: u64,
}

/// Token buckets keyed by client IP.
pub struct VisitorLimiter {
    visitors: DashMap<IpAddr, VisitorState>,
    config: VisitorConfig,
}

impl VisitorLimiter {
    pub fn new(config: VisitorConfig) -> Self {
        Self {
            visitors: DashMap::new(),
            config,
        }
    }

    fn burst(&self) -> f64 {
        self.config.burst_size as f64
    }

    fn rate(&self) -> f64 {
        self.config.requests_per_second as f64
    }

    fn new_state(&self) -> VisitorState {
        VisitorState {
            bucket: TokenBucket::new(self.burst()),
            rejections: 0,
        }
    }

    /// Take one token for `visitor`. Always allowed when limiting is disabled.
    pub fn check(&self, visitor: IpAddr) -> bool {
        if !self.config.enabled {
            return true;
        }
        let (burst, rate) = (self.burst(), self.rate());
        let mut state = self
            .visitors
            .entry(visitor)
            .or_insert_with(|| self.new_state());
        state.bucket.try_acquire(burst, rate)
    }

    /// Number of pushkeys rejected for `visitor` so far.
    pub fn rejections(&self, visitor: IpAddr) -> u64 {
        self.visitors
            .get(&visitor)
            .map(|state| state.rejections)
            .unwrap_or(0)
    }

    /// Number of visitors currently holding a bucket.
    pub fn tracked(&self) -> usize {
        self.visitors.len()
    }

    /// Forget visitors whose bucket has refilled and seen no traffic for
    /// `idle_for`. Returns how many were dropped.
    ///
    /// A visitor still paying off rejections keeps its entry.
    pub fn evict_idle(&self, idle_for: Duration) -> usize {
        let (burst, rate) = (self.burst(), self.rate());
        let before = self.visitors.len();
        self.visitors
            .retain(|_, state| !state.bucket.is_idle(burst, rate, idle_for));
        before.saturating_sub(self.visitors.len())
    }
}

impl AbuseTracker for VisitorLimiter {
    fn record_rejection(&self, visitor: IpAddr, pushkey: &str) {
        let (burst, rate) = (self.burst(), self.rate());
        let cost = self.config.rejection_cost as f64;
        let mut state = self
            .visitors
            .entry(visitor)
            .or_insert_with(|| self.new_state());
        state.rejections += 1;
        state.bucket.charge(cost, burst, rate);

        metrics::record_rejection();
        tracing::debug!(visitor = %visitor, pushkey = %pushkey, rejections = state.rejections, "Rejection charged");
    }
}

/// Middleware enforcing the per-visitor limit.
pub async fn visitor_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(limiter): State<Arc<VisitorLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let visitor = addr.ip();
    if limiter.check(visitor) {
        next.run(request).await
    } else {
        tracing::warn!(visitor = %visitor, "Visitor rate limit exceeded");
        metrics::record_rate_limited();
        HttpError::too_many_requests().into_response()
    }
}
