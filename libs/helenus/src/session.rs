//! Session: the entry point of the fluent DSL.

use std::fmt;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::cache::{CacheKind, CacheManager, SessionCache};
use crate::config::SessionConfig;
use crate::driver::{ScyllaExecutor, StatementExecutor, connect_with_retry};
use crate::error::HelenusResult;
use crate::mapping::{DefaultValuePreparer, Entity, Projection, Row, ValuePreparer, entity_values};
use crate::metrics::{CacheStatistics, OperationMetrics};
use crate::operation::{
    CountOperation, DeleteOperation, InsertOperation, SelectOperation, UpdateOperation,
};
use crate::uow::UnitOfWork;

struct SessionInner {
    executor: Arc<dyn StatementExecutor>,
    value_preparer: Arc<dyn ValuePreparer>,
    cache: SessionCache,
    config: SessionConfig,
    metrics: OperationMetrics,
}

/// Shared handle to an executor, the session cache and the session settings.
///
/// Cloning is cheap; clones share the same cache and counters.
#[derive(Clone)]
pub struct HelenusSession {
    inner: Arc<SessionInner>,
}

pub struct HelenusSessionBuilder {
    executor: Arc<dyn StatementExecutor>,
    value_preparer: Arc<dyn ValuePreparer>,
    config: SessionConfig,
}

impl HelenusSessionBuilder {
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn value_preparer(mut self, preparer: impl ValuePreparer + 'static) -> Self {
        self.value_preparer = Arc::new(preparer);
        self
    }

    pub fn build(self) -> HelenusSession {
        HelenusSession {
            inner: Arc::new(SessionInner {
                cache: SessionCache::new(&self.config.cache),
                executor: self.executor,
                value_preparer: self.value_preparer,
                config: self.config,
                metrics: OperationMetrics::new(),
            }),
        }
    }
}

impl HelenusSession {
    pub fn builder(executor: Arc<dyn StatementExecutor>) -> HelenusSessionBuilder {
        HelenusSessionBuilder {
            executor,
            value_preparer: Arc::new(DefaultValuePreparer),
            config: SessionConfig::default(),
        }
    }

    /// Connect to the cluster described by `config`, retrying with backoff
    #[instrument(skip(config), fields(keyspace = ?config.cassandra.keyspace))]
    pub async fn connect(config: SessionConfig) -> HelenusResult<Self> {
        let session = connect_with_retry(&config.cassandra, None).await?;
        info!(cache_enabled = config.cache.enabled, "Helenus session ready");
        Ok(Self::builder(Arc::new(ScyllaExecutor::new(session)))
            .config(config)
            .build())
    }

    pub fn executor(&self) -> &dyn StatementExecutor {
        self.inner.executor.as_ref()
    }

    pub fn value_preparer(&self) -> &dyn ValuePreparer {
        self.inner.value_preparer.as_ref()
    }

    pub fn session_cache(&self) -> &SessionCache {
        &self.inner.cache
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn metrics(&self) -> &OperationMetrics {
        &self.inner.metrics
    }

    pub fn statistics(&self) -> CacheStatistics {
        self.inner.metrics.snapshot()
    }

    /// Open a top-level unit of work over this session's cache
    pub fn begin(&self) -> UnitOfWork {
        UnitOfWork::new(self.inner.cache.clone(), None)
    }

    /// Put a known entity into the session cache without touching the cluster.
    ///
    /// Returns whether the row had enough facets to be cached.
    pub fn update_cache<E: Entity>(&self, entity: &E) -> HelenusResult<bool> {
        let manager = CacheManager::of(CacheKind::Update, Some(E::descriptor()));
        if !manager.is_session_cacheable(&self.inner.cache) {
            return Ok(false);
        }
        let values = entity_values(entity, self.value_preparer())?;
        let row = Row::from_pairs(
            values
                .into_iter()
                .map(|(node, value)| (node.column_name().as_str(), value)),
        );
        Ok(manager.update_session(&self.inner.cache, Arc::new(row)))
    }

    /// Select the columns of a projection, e.g. `(User::NAME, User::AGE)`
    pub fn select<P: Projection>(&self, projection: P) -> SelectOperation<P::Output> {
        SelectOperation::with_projection(self.clone(), projection)
    }

    /// Select every column of an entity
    pub fn select_all<E: Entity>(&self) -> SelectOperation<E> {
        SelectOperation::all(self.clone())
    }

    /// Select raw rows; add columns with [`SelectOperation::column`]
    pub fn select_raw(&self) -> SelectOperation<Row> {
        SelectOperation::raw(self.clone())
    }

    pub fn count<E: Entity>(&self) -> CountOperation {
        CountOperation::of::<E>(self.clone())
    }

    pub fn update(&self) -> UpdateOperation {
        UpdateOperation::new(self.clone())
    }

    pub fn insert<E: Entity>(&self, entity: &E) -> InsertOperation {
        InsertOperation::from_entity(self.clone(), entity)
    }

    /// Insert column by column with [`InsertOperation::value`]
    pub fn insert_raw(&self) -> InsertOperation {
        InsertOperation::new(self.clone())
    }

    pub fn delete<E: Entity>(&self) -> DeleteOperation {
        DeleteOperation::of::<E>(self.clone())
    }
}

impl fmt::Debug for HelenusSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelenusSession")
            .field("cache", &self.inner.cache)
            .field("show_cql", &self.inner.config.show_cql)
            .finish_non_exhaustive()
    }
}
