use std::sync::Arc;

use scylla::value::CqlValue;
use strum::Display;
use tracing::debug;

use super::{Facet, SessionCache, util};
use crate::mapping::{EntityDescriptor, PropertyNode, Row};

/// Least number of facets (the table facet included) a row needs before it
/// is written to the session cache.
pub const MIN_FACETS_FOR_SESSION_CACHE: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CacheKind {
    Fetch,
    Update,
    Delete,
}

/// Facet derivation and session cache policy for the entity of one operation
#[derive(Clone, Copy, Debug)]
pub struct CacheManager {
    kind: CacheKind,
    entity: Option<&'static EntityDescriptor>,
}

impl CacheManager {
    pub fn of(kind: CacheKind, entity: Option<&'static EntityDescriptor>) -> Self {
        Self { kind, entity }
    }

    pub fn kind(&self) -> CacheKind {
        self.kind
    }

    pub fn entity(&self) -> Option<&'static EntityDescriptor> {
        self.entity
    }

    pub fn is_session_cacheable(&self, cache: &SessionCache) -> bool {
        cache.is_enabled() && self.entity.is_some_and(|e| e.is_cacheable())
    }

    fn with_table(
        &self,
        bind: impl Fn(&super::UnboundFacet) -> Option<Facet>,
    ) -> Vec<Facet> {
        let Some(entity) = self.entity else {
            return Vec::new();
        };
        let mut facets = vec![Facet::table(entity.table().as_str())];
        facets.extend(entity.facets().iter().filter_map(bind));
        facets
    }

    /// Facets bound from the prepared values of equality filters
    pub fn bind_facet_values(&self, values: &[(PropertyNode, CqlValue)]) -> Vec<Facet> {
        self.with_table(|facet| {
            facet.bind(|node| {
                values
                    .iter()
                    .find(|(n, _)| n == node)
                    .map(|(_, value)| value.clone())
            })
        })
    }

    /// Facets bound from the values held by a row
    pub fn row_facets(&self, row: &Row) -> Vec<Facet> {
        self.with_table(|facet| facet.bind_row(row))
    }

    pub fn keys(&self, facets: &[Facet]) -> Vec<String> {
        util::schema_name(facets)
            .map(|schema| util::flatten(schema, facets))
            .unwrap_or_default()
    }

    pub fn schema(&self) -> Option<&'static str> {
        self.entity.map(|e| e.table().as_str())
    }

    pub fn check_session(&self, cache: &SessionCache, keys: &[String]) -> Option<Arc<Row>> {
        if keys.is_empty() {
            return None;
        }
        cache.get(keys)
    }

    /// Write a row under all of its facets when it has enough of them
    pub fn update_session(&self, cache: &SessionCache, row: Arc<Row>) -> bool {
        let facets = self.row_facets(&row);
        if facets.len() < MIN_FACETS_FOR_SESSION_CACHE {
            debug!(kind = %self.kind, facets = facets.len(), "Row not rich enough for session cache");
            return false;
        }
        let keys = self.keys(&facets);
        debug!(kind = %self.kind, ?keys, "Populating session cache");
        cache.put(&keys, row);
        true
    }

    /// Overlay known column values onto the cached row, dropping columns whose
    /// new value is only known to the cluster.
    pub fn merge_session(
        &self,
        cache: &SessionCache,
        keys: &[String],
        known: &Row,
        unknown: &[String],
    ) {
        if keys.is_empty() {
            self.evict_session(cache, keys);
            return;
        }
        let mut row = self
            .check_session(cache, keys)
            .map(|cached| (*cached).clone())
            .unwrap_or_default();
        let previous = self.keys(&self.row_facets(&row));
        row.merge(known);
        for column in unknown {
            row.remove(column);
        }
        cache.invalidate(&previous);
        self.update_session(cache, Arc::new(row));
    }

    /// Evict rows; without any key every row of the table goes
    pub fn evict_session(&self, cache: &SessionCache, keys: &[String]) {
        if keys.is_empty() {
            if let Some(schema) = self.schema() {
                cache.invalidate_schema(schema);
            }
            return;
        }
        let mut all = keys.to_vec();
        if let Some(cached) = cache.get(keys) {
            all.extend(self.keys(&self.row_facets(&cached)));
        }
        debug!(kind = %self.kind, keys = ?all, "Evicting session cache rows");
        cache.invalidate(&all);
    }
}
