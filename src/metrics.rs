use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Catalog counters for monitoring
#[derive(Clone)]
pub struct Metrics {
    pub movies_created: Arc<AtomicU64>,
    pub actors_created: Arc<AtomicU64>,
    pub ratings_created: Arc<AtomicU64>,
    pub records_deleted: Arc<AtomicU64>,
    pub featured_queries: Arc<AtomicU64>,
    pub search_queries: Arc<AtomicU64>,
    pub movies_imported: Arc<AtomicU64>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            movies_created: Arc::new(AtomicU64::new(0)),
            actors_created: Arc::new(AtomicU64::new(0)),
            ratings_created: Arc::new(AtomicU64::new(0)),
            records_deleted: Arc::new(AtomicU64::new(0)),
            featured_queries: Arc::new(AtomicU64::new(0)),
            search_queries: Arc::new(AtomicU64::new(0)),
            movies_imported: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_movies_created(&self) {
        self.movies_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_actors_created(&self) {
        self.actors_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ratings_created(&self) {
        self.ratings_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_records_deleted(&self) {
        self.records_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_featured_queries(&self) {
        self.featured_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_search_queries(&self) {
        self.search_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_movies_imported(&self, count: u64) {
        self.movies_imported.fetch_add(count, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            movies_created: self.movies_created.load(Ordering::Relaxed),
            actors_created: self.actors_created.load(Ordering::Relaxed),
            ratings_created: self.ratings_created.load(Ordering::Relaxed),
            records_deleted: self.records_deleted.load(Ordering::Relaxed),
            featured_queries: self.featured_queries.load(Ordering::Relaxed),
            search_queries: self.search_queries.load(Ordering::Relaxed),
            movies_imported: self.movies_imported.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub movies_created: u64,
    pub actors_created: u64,
    pub ratings_created: u64,
    pub records_deleted: u64,
    pub featured_queries: u64,
    pub search_queries: u64,
    pub movies_imported: u64,
    pub uptime_seconds: u64,
}

impl MetricsSnapshot {
    /// Prometheus text exposition format.
    pub fn to_prometheus(&self) -> String {
        let counters = [
            ("movies_created", "Movies created", self.movies_created),
            ("actors_created", "Actors created", self.actors_created),
            ("ratings_created", "Ratings created", self.ratings_created),
            ("records_deleted", "Movies, actors and ratings deleted", self.records_deleted),
            ("featured_queries", "Featured selections served", self.featured_queries),
            ("search_queries", "Search requests served", self.search_queries),
            ("movies_imported", "Movies imported from TMDB", self.movies_imported),
        ];
        let mut body = String::new();
        for (name, help, value) in counters {
            body.push_str(&format!("# HELP filmregal_{name} {help}\n"));
            body.push_str(&format!("# TYPE filmregal_{name} counter\n"));
            body.push_str(&format!("filmregal_{name} {value}\n"));
        }
        body.push_str("# HELP filmregal_uptime_seconds Uptime seconds\n");
        body.push_str("# TYPE filmregal_uptime_seconds gauge\n");
        body.push_str(&format!("filmregal_uptime_seconds {}\n", self.uptime_seconds));
        body
    }
}
