//! Cache and database counters for a session.
//!
//! Every event is emitted through the `metrics` facade so any installed
//! recorder (Prometheus in the demo binary) picks it up. A copy is kept in
//! atomics so callers can inspect statistics without a recorder.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;

static DESCRIBED: OnceCell<()> = OnceCell::new();

fn describe_metrics() {
    DESCRIBED.get_or_init(|| {
        describe_counter!(
            "helenus_cache_hits_total",
            "Point lookups answered from a cache"
        );
        describe_counter!(
            "helenus_cache_misses_total",
            "Point lookups that fell through to the database"
        );
        describe_counter!(
            "helenus_database_requests_total",
            "Statements executed against the cluster"
        );
        describe_histogram!(
            "helenus_request_duration_seconds",
            "End-to-end duration of an operation execution"
        );
        describe_histogram!(
            "helenus_database_duration_seconds",
            "Time spent waiting on the cluster"
        );
    });
}

/// Where a cache lookup was answered
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CacheScope {
    Session,
    UnitOfWork,
}

/// Session-wide operation counters
#[derive(Debug)]
pub struct OperationMetrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    database_requests: AtomicU64,
    database_micros: AtomicU64,
}

impl Default for OperationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationMetrics {
    pub fn new() -> Self {
        describe_metrics();
        Self {
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            database_requests: AtomicU64::new(0),
            database_micros: AtomicU64::new(0),
        }
    }

    pub fn cache_hit(&self, scope: CacheScope) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        counter!("helenus_cache_hits_total", "scope" => scope.to_string()).increment(1);
    }

    pub fn cache_miss(&self, scope: CacheScope) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        counter!("helenus_cache_misses_total", "scope" => scope.to_string()).increment(1);
    }

    pub fn database_request(&self, operation: &'static str, elapsed: Duration) {
        self.database_requests.fetch_add(1, Ordering::Relaxed);
        self.database_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        counter!("helenus_database_requests_total", "operation" => operation).increment(1);
        histogram!("helenus_database_duration_seconds").record(elapsed.as_secs_f64());
    }

    pub fn request_completed(&self, operation: &'static str, elapsed: Duration) {
        histogram!("helenus_request_duration_seconds", "operation" => operation)
            .record(elapsed.as_secs_f64());
    }

    pub fn snapshot(&self) -> CacheStatistics {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        CacheStatistics {
            cache_hits: hits,
            cache_misses: misses,
            database_requests: self.database_requests.load(Ordering::Relaxed),
            database_time_micros: self.database_micros.load(Ordering::Relaxed),
            hit_ratio: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
        }
    }
}

/// Point-in-time view of [`OperationMetrics`]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CacheStatistics {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub database_requests: u64,
    pub database_time_micros: u64,
    pub hit_ratio: f64,
}
