//! Fixed-window rate limiting per client key.
//!
//! The key is the first of: `X-Forwarded-For` header, socket IP, `Origin`.
//! Every hit counts, rejected ones included, and the window for a key
//! starts at its first hit.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use tokio::task::JoinHandle;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

pub const RATELIMIT_POLICY: HeaderName = HeaderName::from_static("ratelimit-policy");
pub const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
pub const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
pub const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

const REJECTION_MESSAGE: &str = "Too many requests, please try again later.";

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u64,
}

/// Result of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    /// Time until the key's window rolls over.
    pub reset_after: Duration,
}

/// Shared counter table.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    max_requests: u64,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u64, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window())
    }

    /// Count a request for `key`.
    pub fn check(&self, key: &str) -> RateLimitStatus {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> RateLimitStatus {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(Window { started: now, hits: 0 });

        if now.duration_since(entry.started) >= self.window {
            *entry = Window { started: now, hits: 0 };
        }
        entry.hits += 1;

        let elapsed = now.duration_since(entry.started);
        RateLimitStatus {
            allowed: entry.hits <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.hits),
            reset_after: self.window.saturating_sub(elapsed),
        }
    }

    /// Drop windows that have rolled over.
    pub fn sweep(&self) {
        self.sweep_at(Instant::now());
    }

    fn sweep_at(&self, now: Instant) {
        let window = self.window;
        self.windows
            .retain(|_, w| now.duration_since(w.started) < window);
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Sweep expired windows once per window length until aborted.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(limiter.window);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.sweep();
                tracing::trace!(keys = limiter.tracked_keys(), "Rate limit windows swept");
            }
        })
    }

    fn policy_value(&self) -> String {
        format!("{};w={}", self.max_requests, self.window.as_secs())
    }
}

/// Derive the client key for a request.
pub fn client_key(headers: &HeaderMap, addr: Option<SocketAddr>) -> String {
    let header_str = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    header_str(HeaderName::from_static("x-forwarded-for"))
        .or_else(|| addr.map(|a| a.ip().to_string()))
        .or_else(|| header_str(header::ORIGIN))
        .unwrap_or_else(|| "unknown".to_string())
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

fn apply_headers(headers: &mut HeaderMap, limiter: &RateLimiter, status: &RateLimitStatus) {
    let pairs = [
        (RATELIMIT_POLICY, limiter.policy_value()),
        (RATELIMIT_LIMIT, status.limit.to_string()),
        (RATELIMIT_REMAINING, status.remaining.to_string()),
        (RATELIMIT_RESET, ceil_secs(status.reset_after).to_string()),
    ];
    for (name, value) in pairs {
        if let Ok(v) = HeaderValue::from_str(&value) {
            headers.insert(name, v);
        }
    }
}

/// Pipeline stage: count the request, reject with 429 once over quota.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), addr);
    let status = limiter.check(&key);

    if !status.allowed {
        tracing::warn!(client = %key, limit = status.limit, "Rate limit exceeded");
        metrics::record_rate_limited();

        let mut response = Response::new(Body::from(REJECTION_MESSAGE));
        *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
        apply_headers(response.headers_mut(), &limiter, &status);
        response.headers_mut().insert(
            header::RETRY_AFTER,
            HeaderValue::from(ceil_secs(status.reset_after)),
        );
        return response;
    }

    let mut response = next.run(request).await;
    apply_headers(response.headers_mut(), &limiter, &status);
    response
}
