//! Place-resolution subsystem: candidate extraction, stored-row matching,
//! and geocoding backfill with an in-memory cache.

pub mod cache;
pub mod geocode;
pub mod resolver;
pub mod types;

pub use cache::GeocodeCache;
pub use geocode::{GeocodeClient, CENTROID_TOLERANCE_KM};
pub use resolver::{PlaceResolver, ResolvedPlaces};
pub use types::{
    Candidate, Category, CostLevel, Place, PlaceError, ResolveFilters, DEFAULT_VISIT_MINUTES,
};
