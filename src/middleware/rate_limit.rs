use super::ip::extract_ip_from_headers;
use axum::{
    extract::{connect_info::ConnectInfo, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::{Arc, OnceLock},
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::state::AppState;

/// Sliding-window request counter keyed by client IP.
#[derive(Clone)]
pub struct RateLimiter {
    requests: Arc<RwLock<HashMap<IpAddr, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window_seconds: u64) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_seconds),
        }
    }

    fn in_window(&self, now: Instant, t: Instant) -> bool {
        // On clock skew keep the timestamp
        now.checked_duration_since(t).map(|d| d < self.window).unwrap_or(true)
    }

    /// Records a request from `ip`, or returns [`AppError::RateLimited`] if the
    /// window is already full.
    pub async fn check(&self, ip: IpAddr) -> Result<(), AppError> {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        let timestamps = requests.entry(ip).or_default();
        timestamps.retain(|&t| self.in_window(now, t));

        if timestamps.len() >= self.max_requests {
            let oldest = timestamps.first().copied().unwrap_or(now);
            let retry_after = now
                .checked_duration_since(oldest)
                .map(|elapsed| self.window.saturating_sub(elapsed))
                .unwrap_or(Duration::from_secs(1));
            // Never tell clients to retry after 0 seconds
            return Err(AppError::RateLimited { retry_after_seconds: retry_after.as_secs().max(1) });
        }

        timestamps.push(now);
        Ok(())
    }

    /// Drops IPs without requests inside the window.
    pub async fn cleanup_old_entries(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        requests.retain(|_, timestamps| {
            timestamps.retain(|&t| self.in_window(now, t));
            !timestamps.is_empty()
        });
    }

    #[cfg(test)]
    async fn tracked_ips(&self) -> usize {
        self.requests.read().await.len()
    }
}

lazy_static::lazy_static! {
    // Defaults: 1000 req / 60s, overridable via
    // FILMREGAL_RATE_LIMIT_MAX_REQUESTS and FILMREGAL_RATE_LIMIT_WINDOW_SECONDS
    static ref GLOBAL_RATE_LIMITER: RateLimiter = {
        let max = std::env::var("FILMREGAL_RATE_LIMIT_MAX_REQUESTS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1000);
        let win = std::env::var("FILMREGAL_RATE_LIMIT_WINDOW_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);
        RateLimiter::new(max, win)
    };
}

static GLOBAL_CLEANUP_STARTED: OnceLock<()> = OnceLock::new();

/// Per-IP limit applied to every request.
pub async fn rate_limit_middleware(req: Request, next: Next) -> Response {
    let remote_ip = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip());
    let ip = extract_ip_from_headers(req.headers(), remote_ip);

    GLOBAL_CLEANUP_STARTED.get_or_init(|| {
        let limiter = GLOBAL_RATE_LIMITER.clone();
        let cleanup_secs = std::env::var("FILMREGAL_GLOBAL_RATE_LIMIT_CLEANUP_INTERVAL")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(600)
            .clamp(60, 3600);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(cleanup_secs));
            loop {
                interval.tick().await;
                limiter.cleanup_old_entries().await;
            }
        });
    });

    match GLOBAL_RATE_LIMITER.check(ip).await {
        Ok(()) => next.run(req).await,
        Err(e) => {
            tracing::debug!(%ip, "global rate limit hit");
            e.into_response()
        }
    }
}

/// Stricter limits for individual endpoints, on top of the global one.
///
/// The set of endpoints is fixed at construction; only the per-IP windows change
/// afterwards.
#[derive(Clone, Default)]
pub struct EndpointRateLimiter {
    limiters: Arc<HashMap<String, RateLimiter>>,
}

impl EndpointRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces limits given as `(endpoint, max_requests, window_seconds)`.
    pub fn with_limits(self, limits: Vec<(&str, usize, u64)>) -> Self {
        let mut map = Arc::try_unwrap(self.limiters).unwrap_or_else(|shared| (*shared).clone());
        for (endpoint, max_requests, window_seconds) in limits {
            map.insert(endpoint.to_string(), RateLimiter::new(max_requests, window_seconds));
        }
        Self { limiters: Arc::new(map) }
    }

    /// Endpoints without a configured limit always pass.
    pub async fn check_endpoint_limit(&self, endpoint: &str, ip: IpAddr) -> Result<(), AppError> {
        match self.limiters.get(endpoint) {
            Some(limiter) => limiter.check(ip).await,
            None => Ok(()),
        }
    }

    pub async fn cleanup_all(&self) {
        for limiter in self.limiters.values() {
            limiter.cleanup_old_entries().await;
        }
    }
}

/// Key of the per-endpoint limit a request counts against, if any.
pub(crate) fn endpoint_key(method: &Method, path: &str) -> Option<&'static str> {
    if path == "/seeding/clear" {
        Some("/seeding/clear")
    } else if path == "/seeding/movies" {
        Some("/seeding/movies")
    } else if !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS) {
        Some("writes")
    } else if path == "/search" {
        Some("/search")
    } else if path.ends_with("/recent") {
        Some("/recent")
    } else {
        None
    }
}

/// Applies the per-endpoint limits from [`AppState::rate_limiter`].
pub async fn endpoint_rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if let Some(key) = endpoint_key(req.method(), req.uri().path()) {
        let remote_ip = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip());
        let ip = extract_ip_from_headers(req.headers(), remote_ip);
        if let Err(e) = state.rate_limiter.check_endpoint_limit(key, ip).await {
            tracing::debug!(%ip, endpoint = key, "endpoint rate limit hit");
            return e.into_response();
        }
    }
    next.run(req).await
}
