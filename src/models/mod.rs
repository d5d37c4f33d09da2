//! Entity types served by the proximity queries.

pub mod airport;
pub mod restaurant;

pub use airport::Airport;
pub use restaurant::Restaurant;

use crate::geo::GeoPoint;

/// An entity with exactly one valid location.
///
/// Records missing a location never reach a query-ready table; the ingest
/// path drops them.
pub trait Located {
    fn location(&self) -> GeoPoint;
}
