use std::sync::Arc;

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::middleware::EndpointRateLimiter;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// SQLite pool holding the catalog.
    pub db: sqlx::SqlitePool,
    pub config: Arc<AppConfig>,
    pub metrics: Metrics,
    /// Per-endpoint limits on top of the global rate limit.
    pub rate_limiter: EndpointRateLimiter,
}

impl AppState {
    /// Builds the state with the default endpoint limits:
    /// - 300 searches per minute
    /// - 600 featured lookups per minute
    /// - 120 writes per minute
    /// - 10 catalog wipes per minute
    /// - 2 TMDB imports per minute
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Self {
        let rate_limiter = EndpointRateLimiter::new().with_limits(vec![
            ("/search", 300, 60),
            ("/recent", 600, 60),
            ("writes", 120, 60),
            ("/seeding/clear", 10, 60),
            ("/seeding/movies", 2, 60),
        ]);

        Self { db, config: Arc::new(config), metrics: Metrics::new(), rate_limiter }
    }
}
