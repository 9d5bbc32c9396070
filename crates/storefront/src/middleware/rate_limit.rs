//! Fixed-window rate limiting for form submissions.
//!
//! Each limiter counts requests per source address inside a window. The
//! first request from an address opens the window; once `max_requests` have
//! been admitted, further requests are denied until the window has passed.
//! The order and contact endpoints each get their own limiter so traffic on
//! one never spends the other's budget.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::config::RateLimitConfig;
use crate::error::AppError;

/// Key used when no proxy header names the client.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Headers checked for the client address, in priority order.
const SOURCE_HEADERS: [&str; 4] = [
    "x-forwarded-for",
    "x-real-ip",
    "cf-connecting-ip",
    "fly-client-ip",
];

/// Derive the rate-limit key from proxy headers.
///
/// `X-Forwarded-For` may carry a chain (`client, proxy1, proxy2`); only the
/// first entry is used. Requests without any usable header share the
/// [`UNKNOWN_SOURCE`] bucket.
#[must_use]
pub fn source_key(headers: &HeaderMap) -> String {
    SOURCE_HEADERS
        .iter()
        .find_map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .unwrap_or(UNKNOWN_SOURCE)
        .to_string()
}

/// Outcome of a [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Request may proceed.
    Allowed { remaining: u32 },
    /// Request must be rejected until the window resets.
    Denied { retry_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Per-address fixed-window counter.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: config.window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count a request from `key` and decide whether it is admitted.
    pub fn check(&self, key: &str) -> Admission {
        self.check_at(key, Instant::now())
    }

    /// [`check`](Self::check) with an explicit clock.
    pub fn check_at(&self, key: &str, now: Instant) -> Admission {
        let mut windows = self.lock();
        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            reset_at: now + self.window,
        });

        if now > window.reset_at {
            window.count = 0;
            window.reset_at = now + self.window;
        }
        window.count = window.count.saturating_add(1);

        if window.count > self.max_requests {
            Admission::Denied {
                retry_after: window.reset_at.saturating_duration_since(now),
            }
        } else {
            Admission::Allowed {
                remaining: self.max_requests - window.count,
            }
        }
    }

    /// Drop windows that have already elapsed. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    /// [`purge_expired`](Self::purge_expired) with an explicit clock.
    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, w| now <= w.reset_at);
        before - windows.len()
    }

    /// Number of addresses currently tracked.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.lock().len()
    }

    // A panic while holding the lock cannot leave a window half-updated,
    // so a poisoned map is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Window>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Route middleware rejecting requests over the limiter's budget with 429.
///
/// Runs before the handler extracts the body, so rejected requests are
/// never parsed or validated.
///
/// # Errors
///
/// Returns [`AppError::RateLimited`] when the source address is over budget.
pub async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = source_key(request.headers());
    match limiter.check(&key) {
        Admission::Allowed { remaining } => {
            tracing::debug!(source = %key, remaining, "Rate limit check passed");
            Ok(next.run(request).await)
        }
        Admission::Denied { retry_after } => {
            tracing::warn!(
                source = %key,
                path = %request.uri().path(),
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            Err(AppError::RateLimited { retry_after })
        }
    }
}
