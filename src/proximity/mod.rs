//! Proximity query service: radius searches over located entities, sorted
//! ascending by great-circle distance.
//!
//! Stateless reads only. Every call resolves candidates through the table's
//! retrieval strategy, applies the exact haversine filter, sorts, and caps;
//! there is no cross-call state and no logging on the query path. Errors
//! from the store propagate unchanged.

use std::sync::Arc;

use serde::Serialize;

use crate::geo::{haversine_km, GeoPoint};
use crate::models::{Airport, Located, Restaurant};
use crate::store::{Dataset, StoreError, Table};

/// Search radius for the nearest-airport convenience query, in kilometers.
pub const NEAREST_AIRPORT_RADIUS_KM: f64 = 500.0;

/// Failures of a proximity query.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Out-of-contract input, such as a non-positive radius or limit.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A named location (airport code) resolved to nothing. Distinct from an
    /// empty result set, which is a successful outcome.
    #[error("not found: {0}")]
    NotFound(String),
    /// The underlying store failed; surfaced unchanged, never retried here.
    #[error(transparent)]
    DataAccess(#[from] StoreError),
}

/// A matched entity annotated with its distance from the query center.
///
/// `distance_m` is derived and transient: recomputed per query, meaningless
/// outside the query that produced it, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Nearby<T> {
    #[serde(flatten)]
    pub entity: T,
    pub distance_m: f64,
}

/// Proximity queries over a loaded dataset.
#[derive(Clone)]
pub struct ProximityService {
    dataset: Arc<Dataset>,
}

impl ProximityService {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }

    /// Restaurants within `radius_km` of `center`, optionally filtered by a
    /// minimum rating, nearest first, at most `limit` results.
    pub fn find_nearby_restaurants(
        &self,
        center: GeoPoint,
        radius_km: f64,
        min_rating: Option<f64>,
        limit: usize,
    ) -> Result<Vec<Nearby<Restaurant>>, QueryError> {
        find_nearby(&self.dataset.restaurants, center, radius_km, limit, |r| {
            min_rating.map_or(true, |min| r.rating >= min)
        })
    }

    /// Airports within `radius_km` of `center`, nearest first.
    pub fn find_nearby_airports(
        &self,
        center: GeoPoint,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<Nearby<Airport>>, QueryError> {
        find_nearby(&self.dataset.airports, center, radius_km, limit, |_| true)
    }

    /// The single nearest airport within 500 km, or `None` when there is
    /// none in range (a normal outcome, not an error).
    pub fn find_nearest_airport(
        &self,
        point: GeoPoint,
    ) -> Result<Option<Nearby<Airport>>, QueryError> {
        let mut found = self.find_nearby_airports(point, NEAREST_AIRPORT_RADIUS_KM, 1)?;
        Ok(found.pop())
    }

    /// Resolve an airport code (IATA or ICAO, case-insensitive exact match)
    /// to its record, or `NotFound`.
    pub fn resolve_airport(&self, code: &str) -> Result<&Airport, QueryError> {
        self.dataset
            .airports
            .rows()
            .iter()
            .find(|a| a.matches_code(code))
            .ok_or_else(|| QueryError::NotFound(format!("no airport with code '{}'", code)))
    }

    /// Restaurants near a named airport: resolve the code, then search from
    /// the airport's own location. A resolvable code with nothing in range
    /// yields the airport and an empty list.
    pub fn find_restaurants_near_airport(
        &self,
        code: &str,
        radius_km: f64,
        min_rating: Option<f64>,
        limit: usize,
    ) -> Result<(Airport, Vec<Nearby<Restaurant>>), QueryError> {
        let airport = self.resolve_airport(code)?.clone();
        let results =
            self.find_nearby_restaurants(airport.location(), radius_km, min_rating, limit)?;
        Ok((airport, results))
    }
}

/// Shared radius-query routine behind every entity-specific operation.
///
/// Matches are ordered by distance with ties broken on row order, which the
/// candidate strategies both preserve, so the index path and the full-scan
/// path return identical sequences for the same data.
fn find_nearby<T, F>(
    table: &Table<T>,
    center: GeoPoint,
    radius_km: f64,
    limit: usize,
    filter: F,
) -> Result<Vec<Nearby<T>>, QueryError>
where
    T: Located + Clone,
    F: Fn(&T) -> bool,
{
    if radius_km <= 0.0 {
        return Err(QueryError::InvalidArgument(format!(
            "radius must be positive, got {} km",
            radius_km
        )));
    }
    if limit == 0 {
        return Err(QueryError::InvalidArgument("limit must be positive".into()));
    }

    let radius_m = radius_km * 1000.0;
    let mut matches: Vec<(f64, usize, &T)> = Vec::new();

    for (row, entity) in table.candidates_within(center, radius_km)? {
        if !filter(entity) {
            continue;
        }
        let distance_m = haversine_km(center, entity.location()) * 1000.0;
        if distance_m <= radius_m {
            matches.push((distance_m, row, entity));
        }
    }

    matches.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    Ok(matches
        .into_iter()
        .take(limit)
        .map(|(distance_m, _, entity)| Nearby {
            entity: entity.clone(),
            distance_m,
        })
        .collect())
}
