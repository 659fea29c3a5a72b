//! Request-scoped unit of work with its own row cache.
//!
//! A unit shadows the session cache: reads look in the unit (and its
//! parents) first, writes land in the unit, and a top-level commit
//! publishes rows and deletions to the session cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::cache::SessionCache;
use crate::error::{HelenusError, HelenusResult};
use crate::mapping::Row;

/// Result of consulting a cache that can record deletions
#[derive(Clone, Debug, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Deleted,
    Missing,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

#[derive(Clone, Debug)]
enum CacheEntry {
    /// `promote` marks rows eligible for the session cache on commit
    Row { row: Arc<Row>, promote: bool },
    Deleted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Status {
    Open,
    Committed,
    Aborted,
}

type Hook = Box<dyn FnOnce() + Send>;

struct State {
    status: Status,
    cache: HashMap<String, CacheEntry>,
    cache_operations: i64,
    database_operations: i64,
    cache_lookup_time: Duration,
    database_time: Duration,
    commit_hooks: Vec<Hook>,
    abort_hooks: Vec<Hook>,
}

struct Inner {
    id: Uuid,
    parent: Option<UnitOfWork>,
    session_cache: SessionCache,
    started: Instant,
    state: Mutex<State>,
}

/// Counters collected by a unit of work
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnitOfWorkStats {
    pub id: Uuid,
    pub cache_operations: i64,
    pub database_operations: i64,
    pub cache_lookup_micros: u64,
    pub database_micros: u64,
    pub elapsed_micros: u64,
}

/// Handle to a unit of work; clones share the same unit
#[derive(Clone)]
pub struct UnitOfWork {
    inner: Arc<Inner>,
}

impl UnitOfWork {
    pub(crate) fn new(session_cache: SessionCache, parent: Option<UnitOfWork>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: Uuid::now_v7(),
                parent,
                session_cache,
                started: Instant::now(),
                state: Mutex::new(State {
                    status: Status::Open,
                    cache: HashMap::new(),
                    cache_operations: 0,
                    database_operations: 0,
                    cache_lookup_time: Duration::ZERO,
                    database_time: Duration::ZERO,
                    commit_hooks: Vec::new(),
                    abort_hooks: Vec::new(),
                }),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn parent(&self) -> Option<&UnitOfWork> {
        self.inner.parent.as_ref()
    }

    /// Start a child unit whose changes fold into this one on commit
    pub fn begin_nested(&self) -> UnitOfWork {
        UnitOfWork::new(self.inner.session_cache.clone(), Some(self.clone()))
    }

    pub fn is_done(&self) -> bool {
        self.state().status != Status::Open
    }

    pub fn is_committed(&self) -> bool {
        self.state().status == Status::Committed
    }

    /// Look `keys` up in this unit, then in its parents
    pub fn cache_lookup(&self, keys: &[String]) -> Lookup<Arc<Row>> {
        let mut unit = Some(self);
        while let Some(current) = unit {
            let found = {
                let state = current.state();
                keys.iter().find_map(|key| state.cache.get(key).cloned())
            };
            match found {
                Some(CacheEntry::Row { row, .. }) => return Lookup::Found(row),
                Some(CacheEntry::Deleted) => return Lookup::Deleted,
                None => unit = current.parent(),
            }
        }
        Lookup::Missing
    }

    /// Cache `row` under every key
    pub fn cache_update(&self, keys: &[String], row: Arc<Row>, promote: bool) {
        let mut state = self.state();
        for key in keys {
            state.cache.insert(
                key.clone(),
                CacheEntry::Row {
                    row: Arc::clone(&row),
                    promote,
                },
            );
        }
    }

    /// Record a deletion that masks any row cached under `keys`
    pub fn cache_delete(&self, keys: &[String]) {
        let mut state = self.state();
        for key in keys {
            state.cache.insert(key.clone(), CacheEntry::Deleted);
        }
    }

    /// Drop entries of one table; used when a write cannot name its rows
    pub fn cache_evict_schema(&self, schema: &str) {
        let prefix = crate::cache::util::schema_prefix(schema);
        self.state().cache.retain(|key, _| !key.starts_with(&prefix));
    }

    pub fn record_cache_and_database_operation_count(&self, cache: i32, database: i32) {
        let mut state = self.state();
        state.cache_operations += i64::from(cache);
        state.database_operations += i64::from(database);
    }

    pub fn add_cache_lookup_time(&self, elapsed: Duration) {
        self.state().cache_lookup_time += elapsed;
    }

    pub fn add_database_time(&self, elapsed: Duration) {
        self.state().database_time += elapsed;
    }

    pub fn stats(&self) -> UnitOfWorkStats {
        let state = self.state();
        UnitOfWorkStats {
            id: self.inner.id,
            cache_operations: state.cache_operations,
            database_operations: state.database_operations,
            cache_lookup_micros: state.cache_lookup_time.as_micros() as u64,
            database_micros: state.database_time.as_micros() as u64,
            elapsed_micros: self.inner.started.elapsed().as_micros() as u64,
        }
    }

    /// Run `hook` once the outermost unit commits
    pub fn and_then(&self, hook: impl FnOnce() + Send + 'static) -> &Self {
        self.state().commit_hooks.push(Box::new(hook));
        self
    }

    /// Run `hook` if this unit is aborted
    pub fn or_else(&self, hook: impl FnOnce() + Send + 'static) -> &Self {
        self.state().abort_hooks.push(Box::new(hook));
        self
    }

    fn close(&self, to: Status) -> HelenusResult<State> {
        let mut state = self.state();
        if state.status != Status::Open {
            return Err(HelenusError::mapping(format!(
                "unit of work {} already {}",
                self.inner.id,
                if state.status == Status::Committed {
                    "committed"
                } else {
                    "aborted"
                }
            )));
        }
        state.status = to;
        Ok(State {
            status: to,
            cache: std::mem::take(&mut state.cache),
            cache_operations: state.cache_operations,
            database_operations: state.database_operations,
            cache_lookup_time: state.cache_lookup_time,
            database_time: state.database_time,
            commit_hooks: std::mem::take(&mut state.commit_hooks),
            abort_hooks: std::mem::take(&mut state.abort_hooks),
        })
    }

    /// Publish cached rows and deletions to the parent unit, or to the
    /// session cache for a top-level unit.
    pub fn commit(&self) -> HelenusResult<()> {
        let closed = self.close(Status::Committed)?;

        match self.parent() {
            Some(parent) => {
                let mut state = parent.state();
                state.cache.extend(closed.cache);
                state.cache_operations += closed.cache_operations;
                state.database_operations += closed.database_operations;
                state.cache_lookup_time += closed.cache_lookup_time;
                state.database_time += closed.database_time;
                state.commit_hooks.extend(closed.commit_hooks);
            }
            None => {
                let session = &self.inner.session_cache;
                if session.is_enabled() {
                    for (key, entry) in closed.cache {
                        match entry {
                            CacheEntry::Row { row, promote: true } => session.put(&[key], row),
                            CacheEntry::Row { promote: false, .. } => {}
                            CacheEntry::Deleted => session.invalidate(&[key]),
                        }
                    }
                }
                for hook in closed.commit_hooks {
                    hook();
                }
            }
        }

        debug!(
            uow = %self.inner.id,
            cache_operations = closed.cache_operations,
            database_operations = closed.database_operations,
            cache_lookup_ms = closed.cache_lookup_time.as_secs_f64() * 1000.0,
            database_ms = closed.database_time.as_secs_f64() * 1000.0,
            elapsed_ms = self.inner.started.elapsed().as_secs_f64() * 1000.0,
            "Unit of work committed"
        );
        Ok(())
    }

    /// Discard this unit's changes and run its abort hooks
    pub fn abort(&self) -> HelenusResult<()> {
        let closed = self.close(Status::Aborted)?;
        for hook in closed.abort_hooks {
            hook();
        }
        debug!(uow = %self.inner.id, "Unit of work aborted");
        Ok(())
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.inner.id)
            .field("nested", &self.inner.parent.is_some())
            .finish()
    }
}
