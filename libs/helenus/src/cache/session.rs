use std::sync::Arc;

use moka::sync::Cache;
use tracing::{debug, warn};

use super::util::schema_prefix;
use crate::config::CacheConfig;
use crate::mapping::Row;

/// Session-wide row cache shared by every operation of a session.
///
/// Writers race on the same key with last-writer-wins semantics.
#[derive(Clone)]
pub struct SessionCache {
    enabled: bool,
    rows: Cache<String, Arc<Row>>,
}

impl SessionCache {
    pub fn new(config: &CacheConfig) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(config.max_capacity)
            .support_invalidation_closures();
        if let Some(ttl) = config.time_to_live {
            builder = builder.time_to_live(ttl);
        }
        Self {
            enabled: config.enabled,
            rows: builder.build(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// First cached row among `keys`
    pub fn get(&self, keys: &[String]) -> Option<Arc<Row>> {
        keys.iter().find_map(|key| self.rows.get(key))
    }

    pub fn put(&self, keys: &[String], row: Arc<Row>) {
        for key in keys {
            self.rows.insert(key.clone(), Arc::clone(&row));
        }
    }

    pub fn invalidate(&self, keys: &[String]) {
        for key in keys {
            self.rows.invalidate(key);
        }
    }

    /// Drop every row cached for a table
    pub fn invalidate_schema(&self, schema: &str) {
        let prefix = schema_prefix(schema);
        debug!(schema, "Evicting session cache entries");
        if let Err(e) = self
            .rows
            .invalidate_entries_if(move |key, _| key.starts_with(&prefix))
        {
            warn!(error = %e, "Predicate eviction unavailable, clearing session cache");
            self.rows.invalidate_all();
        }
    }

    pub fn clear(&self) {
        self.rows.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.rows.run_pending_tasks();
        self.rows.entry_count()
    }
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("enabled", &self.enabled)
            .field("entries", &self.rows.entry_count())
            .finish()
    }
}
