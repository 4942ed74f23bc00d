use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::HttpRequest;

use dashmap::DashMap;

use crate::error::{RestError, RestResult};
use crate::settings::RateLimitSettings;

/// Checks between sweeps of idle buckets
const SWEEP_EVERY: u64 = 256;

/// Sliding-window request limiter keyed by client address and route.
/// A client gets `max_requests` hits within any `window` long span.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    trust_forwarded_headers: bool,
    buckets: Arc<DashMap<String, Vec<Instant>>>,
    checks: Arc<AtomicU64>,
}

impl RateLimiter {
    pub fn new(settings: &RateLimitSettings) -> Self {
        Self {
            window: settings.window(),
            max_requests: settings.max_requests(),
            trust_forwarded_headers: settings.trust_forwarded_headers(),
            buckets: Arc::new(DashMap::new()),
            checks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record a hit for `key` on `route`, or report how long until a slot frees up
    pub fn check(&self, key: &str, route: &str) -> Result<(), Duration> {
        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.sweep();
        }

        let now = Instant::now();
        let window = self.window;

        let mut entry = self.buckets.entry(format!("{key}:{route}")).or_default();
        entry.retain(|hit| now.duration_since(*hit) < window);

        if entry.len() as u32 >= self.max_requests {
            let oldest = entry.first().copied().unwrap_or(now);
            return Err(window.saturating_sub(now.duration_since(oldest)));
        }

        entry.push(now);
        Ok(())
    }

    /// Drop buckets with no hits left in the window
    pub fn sweep(&self) {
        let now = Instant::now();
        let window = self.window;
        self.buckets.retain(|_, hits| {
            hits.retain(|hit| now.duration_since(*hit) < window);
            !hits.is_empty()
        });
    }

    /// Number of clients currently tracked
    pub fn tracked(&self) -> usize {
        self.buckets.len()
    }

    /// Apply the limiter to an incoming request, keyed by the peer address.
    /// Forwarding headers are only consulted when the settings say a proxy sets them.
    pub fn check_request(&self, req: &HttpRequest, route: &str) -> RestResult<()> {
        let key = self.client_key(req);

        self.check(&key, route).map_err(|retry_after| {
            tracing::warn!(client = %key, route, "Rate limit exceeded");
            RestError::RateLimited { retry_after }
        })
    }

    fn client_key(&self, req: &HttpRequest) -> String {
        let peer = req.peer_addr().map(|addr| addr.ip().to_string());
        if !self.trust_forwarded_headers {
            return peer.unwrap_or_else(|| "unknown".into());
        }

        let info = req.connection_info();
        let forwarded = info.realip_remote_addr().map(str::to_string);
        forwarded.or(peer).unwrap_or_else(|| "unknown".into())
    }
}
