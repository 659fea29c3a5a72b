//! Point-lookup row caches keyed by entity facets.

mod facet;
mod manager;
mod session;
pub mod util;

pub use facet::{Facet, UnboundFacet};
pub use manager::{CacheKind, CacheManager, MIN_FACETS_FOR_SESSION_CACHE};
pub use session::SessionCache;
