//! Fixed-window rate limiting middleware.
//!
//! Counters live behind a [`RateLimitBackend`]; the default keeps them in a
//! `DashMap`, whose entry lock makes check-and-increment atomic per key.
//! Rejections are shaped as JSON-RPC errors so RPC clients can parse them.

use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::http::header::{HeaderValue, RETRY_AFTER};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dashmap::DashMap;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::RateLimitConfig;
use crate::http::endpoint::Endpoint;
use crate::http::middleware::{Middleware, MiddlewareArgs};
use crate::http::request::client_ip;
use crate::observability::metrics;
use crate::rpc::{RpcError, RpcResponse};

/// Outcome of one counted hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u64,
    /// Time until the current window resets.
    pub retry_after: Duration,
}

#[derive(Debug, Error)]
#[error("rate limit backend unavailable: {0}")]
pub struct BackendUnavailable(pub String);

pub trait RateLimitBackend: Send + Sync {
    /// Count one hit for `key` and decide. Must be atomic per key.
    fn hit(&self, key: &str, limit: u64, window: Duration) -> Result<Decision, BackendUnavailable>;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u64,
}

/// In-process counters.
///
/// Expired windows are swept from inside `hit` at most once per window
/// length, so the map stays bounded by the clients seen in one window.
#[derive(Debug)]
pub struct InMemoryBackend {
    windows: DashMap<String, Window>,
    last_sweep: Mutex<Instant>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self {
            windows: DashMap::new(),
            last_sweep: Mutex::new(Instant::now()),
        }
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop windows that have ended.
    pub fn purge_expired(&self, window: Duration) {
        let now = Instant::now();
        self.windows
            .retain(|_, w| now.duration_since(w.started) < window);
    }

    fn sweep_if_due(&self, now: Instant, window: Duration) {
        // Another caller is already sweeping.
        let Ok(mut last) = self.last_sweep.try_lock() else {
            return;
        };
        if now.duration_since(*last) < window {
            return;
        }
        *last = now;
        drop(last);
        self.purge_expired(window);
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

impl RateLimitBackend for InMemoryBackend {
    fn hit(&self, key: &str, limit: u64, window: Duration) -> Result<Decision, BackendUnavailable> {
        let now = Instant::now();
        self.sweep_if_due(now, window);
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= window {
            entry.started = now;
            entry.count = 0;
        }

        let retry_after = window.saturating_sub(now.duration_since(entry.started));
        if entry.count >= limit {
            return Ok(Decision {
                allowed: false,
                remaining: 0,
                retry_after,
            });
        }

        entry.count += 1;
        Ok(Decision {
            allowed: true,
            remaining: limit - entry.count,
            retry_after,
        })
    }
}

/// Limits requests per client address.
///
/// Options: `max_requests`, `window_secs` (override the config).
/// Security-aware so it can honour `trust_forwarded_headers`.
pub struct RateLimit {
    backend: Arc<dyn RateLimitBackend>,
    config: RateLimitConfig,
}

impl RateLimit {
    pub const ID: &'static str = "rate_limit";

    pub fn new(backend: Arc<dyn RateLimitBackend>, config: RateLimitConfig) -> Self {
        Self { backend, config }
    }

    pub fn in_memory(config: RateLimitConfig) -> Self {
        Self::new(Arc::new(InMemoryBackend::new()), config)
    }
}

impl Middleware for RateLimit {
    fn id(&self) -> &str {
        Self::ID
    }

    fn security_aware(&self) -> bool {
        true
    }

    fn wrap(&self, next: Endpoint, args: MiddlewareArgs<'_>) -> Endpoint {
        let backend = self.backend.clone();
        let limit = args.option_u64("max_requests").unwrap_or(self.config.max_requests);
        let window = Duration::from_secs(args.option_u64("window_secs").unwrap_or(self.config.window_secs));
        let fail_open = args.option_bool("fail_open").unwrap_or(self.config.fail_open);
        let trust_forwarded = args
            .security
            .as_ref()
            .is_some_and(|s| s.trust_forwarded_headers);

        Endpoint::new(move |req| {
            let next = next.clone();
            let ip = client_ip(req.headers(), req.extensions(), trust_forwarded);
            let key = client_key(ip);
            let verdict = backend.hit(&key, limit, window);
            async move {
                match verdict {
                    Ok(decision) if decision.allowed => next.call(req).await,
                    Ok(decision) => {
                        tracing::warn!(client = %key, limit, "Rate limit exceeded");
                        metrics::record_rate_limited();
                        too_many_requests(decision.retry_after)
                    }
                    Err(e) if fail_open => {
                        tracing::warn!(error = %e, "Rate limiter unavailable, failing open");
                        next.call(req).await
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rate limiter unavailable, rejecting request");
                        rpc_shaped(
                            StatusCode::SERVICE_UNAVAILABLE,
                            RpcError::unauthorized("Rate limiter unavailable"),
                        )
                    }
                }
            }
        })
    }
}

fn client_key(ip: Option<IpAddr>) -> String {
    ip.map(|ip| ip.to_string()).unwrap_or_else(|| "unknown".to_string())
}

fn too_many_requests(retry_after: Duration) -> Response {
    let secs = retry_after.as_secs().max(1);
    let error = RpcError::unauthorized("Rate limit exceeded").with_data(json!({ "retry_after": secs }));
    let mut response = rpc_shaped(StatusCode::TOO_MANY_REQUESTS, error);
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(secs));
    response
}

fn rpc_shaped(status: StatusCode, error: RpcError) -> Response {
    (status, Json(RpcResponse::error(Value::Null, error))).into_response()
}
