//! Query-ready entity tables and the nearby-candidate strategies.
//!
//! A [`Table`] owns its rows and, when spatial indexing is enabled, an
//! R-tree of point envelopes over them. Candidate retrieval goes through
//! the index when one was built and falls back to a full scan otherwise;
//! either way the caller applies the exact distance filter, so the index is
//! a performance path, not a correctness one.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use rstar::{RTree, RTreeObject, AABB};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::geo::{bbox_around, GeoPoint};
use crate::models::{Airport, Located, Restaurant};

/// Failures reaching or loading the underlying data.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse dataset: {0}")]
    Csv(#[from] csv::Error),
}

/// R-tree entry: an entity's position plus its row number, so results can
/// be tie-broken on stable row order no matter which retrieval path ran.
struct IndexedRow {
    pos: [f64; 2],
    row: usize,
}

impl RTreeObject for IndexedRow {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.pos)
    }
}

/// A read-only table of located entities with an optional spatial index.
pub struct Table<T: Located> {
    rows: Vec<T>,
    index: Option<RTree<IndexedRow>>,
}

impl<T: Located> Table<T> {
    /// Build a table, bulk-loading an R-tree over the rows when `spatial`
    /// is set.
    pub fn new(rows: Vec<T>, spatial: bool) -> Self {
        let index = spatial.then(|| {
            let entries: Vec<IndexedRow> = rows
                .iter()
                .enumerate()
                .map(|(row, e)| {
                    let p = e.location();
                    IndexedRow { pos: [p.lon, p.lat], row }
                })
                .collect();
            RTree::bulk_load(entries)
        });

        Self { rows, index }
    }

    /// Candidate rows for a radius query: everything whose position falls in
    /// the query's degree bounding box (index path), or all rows (full-scan
    /// path). Row numbers come along for stable ordering downstream.
    ///
    /// Infallible for the in-memory table; the `Result` is the seam a
    /// remote-backed table would surface [`StoreError`] through.
    pub fn candidates_within(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<(usize, &T)>, StoreError> {
        match &self.index {
            Some(tree) => {
                // One envelope per side when the query box wraps at ±180°;
                // the split boxes are disjoint, so no row is seen twice.
                let mut out = Vec::new();
                for (min, max) in bbox_around(center, radius_km) {
                    let envelope = AABB::from_corners(min, max);
                    out.extend(
                        tree.locate_in_envelope_intersecting(&envelope)
                            .map(|ir| (ir.row, &self.rows[ir.row])),
                    );
                }
                Ok(out)
            }
            None => Ok(self.rows.iter().enumerate().collect()),
        }
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }
}

/// The loaded dataset served by the query layer.
pub struct Dataset {
    pub restaurants: Table<Restaurant>,
    pub airports: Table<Airport>,
    pub loaded_at: DateTime<Utc>,
}

impl Dataset {
    pub fn load<P: AsRef<Path>>(
        restaurants_path: P,
        airports_path: P,
        spatial: bool,
    ) -> Result<Self, StoreError> {
        let restaurants = read_restaurants(std::fs::File::open(restaurants_path)?)?;
        let airports = read_airports(std::fs::File::open(airports_path)?)?;

        info!(
            "Loaded {} restaurants and {} airports (spatial index: {})",
            restaurants.len(),
            airports.len(),
            spatial
        );

        Ok(Self {
            restaurants: Table::new(restaurants, spatial),
            airports: Table::new(airports, spatial),
            loaded_at: Utc::now(),
        })
    }
}

/// Raw restaurant CSV row. Everything optional so a bad row is a warning,
/// not a failed import.
#[derive(Debug, Deserialize)]
pub struct RawRestaurantRow {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub cuisine: Option<String>,
    pub rating: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Raw airport CSV row.
#[derive(Debug, Deserialize)]
pub struct RawAirportRow {
    pub iata: Option<String>,
    pub icao: Option<String>,
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

fn valid_coords(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Validate a raw restaurant row into a query-ready record.
pub fn validate_restaurant(row: RawRestaurantRow) -> Result<Restaurant, String> {
    let name = row.name.filter(|n| !n.is_empty()).ok_or("missing name")?;
    let (lat, lon) = match (row.lat, row.lon) {
        (Some(lat), Some(lon)) if valid_coords(lat, lon) => (lat, lon),
        (Some(_), Some(_)) => return Err("coordinates out of range".into()),
        _ => return Err("missing coordinates".into()),
    };
    let rating = row.rating.unwrap_or(0.0);
    if !(0.0..=5.0).contains(&rating) {
        return Err(format!("rating {} outside 0-5", rating));
    }

    Ok(Restaurant {
        id: row.id.unwrap_or_else(Uuid::new_v4),
        name,
        cuisine: row.cuisine.unwrap_or_default(),
        rating,
        lat,
        lon,
    })
}

/// Validate a raw airport row into a query-ready record. IATA codes are
/// normalized to uppercase.
pub fn validate_airport(row: RawAirportRow) -> Result<Airport, String> {
    let iata = row
        .iata
        .filter(|c| c.len() == 3 && c.chars().all(|ch| ch.is_ascii_alphabetic()))
        .ok_or("missing or malformed IATA code")?;
    let (lat, lon) = match (row.lat, row.lon) {
        (Some(lat), Some(lon)) if valid_coords(lat, lon) => (lat, lon),
        (Some(_), Some(_)) => return Err("coordinates out of range".into()),
        _ => return Err("missing coordinates".into()),
    };

    Ok(Airport {
        iata: iata.to_uppercase(),
        icao: row.icao.filter(|c| !c.is_empty()).map(|c| c.to_uppercase()),
        name: row.name.filter(|n| !n.is_empty()).ok_or("missing name")?,
        lat,
        lon,
    })
}

/// Read restaurants from CSV, skipping invalid rows with a warning.
pub fn read_restaurants<R: Read>(reader: R) -> Result<Vec<Restaurant>, StoreError> {
    let mut out = Vec::new();
    for (i, record) in csv::Reader::from_reader(reader).deserialize().enumerate() {
        let raw: RawRestaurantRow = record?;
        match validate_restaurant(raw) {
            Ok(r) => out.push(r),
            Err(reason) => warn!("Skipping restaurant row {}: {}", i + 1, reason),
        }
    }
    Ok(out)
}

/// Read airports from CSV, skipping invalid rows with a warning.
pub fn read_airports<R: Read>(reader: R) -> Result<Vec<Airport>, StoreError> {
    let mut out = Vec::new();
    for (i, record) in csv::Reader::from_reader(reader).deserialize().enumerate() {
        let raw: RawAirportRow = record?;
        match validate_airport(raw) {
            Ok(a) => out.push(a),
            Err(reason) => warn!("Skipping airport row {}: {}", i + 1, reason),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restaurant(name: &str, lat: f64, lon: f64) -> Restaurant {
        Restaurant::new(name, "test", 4.0, lat, lon)
    }

    #[test]
    fn index_candidates_are_a_subset_containing_all_in_range() {
        let rows = vec![
            restaurant("near", 40.71, -74.00),
            restaurant("far", 48.85, 2.35),
            restaurant("close", 40.72, -74.01),
        ];
        let indexed = Table::new(rows.clone(), true);
        let scan = Table::new(rows, false);

        let center = GeoPoint::new(40.7128, -74.0060);
        let from_index = indexed.candidates_within(center, 5.0).unwrap();
        let from_scan = scan.candidates_within(center, 5.0).unwrap();

        assert_eq!(from_scan.len(), 3);
        // The envelope prunes Paris but must keep both New York rows.
        let rows_hit: Vec<usize> = from_index.iter().map(|(i, _)| *i).collect();
        assert!(rows_hit.contains(&0));
        assert!(rows_hit.contains(&2));
        assert!(!rows_hit.contains(&1));
    }

    #[test]
    fn index_keeps_candidates_across_the_dateline() {
        let rows = vec![
            restaurant("east side", 0.0, 179.9),
            restaurant("west side", 0.0, -179.9),
        ];
        let indexed = Table::new(rows, true);

        // Both rows sit ~17 km from the center, on opposite sides of ±180°.
        let center = GeoPoint::new(0.0, 179.95);
        let candidates = indexed.candidates_within(center, 50.0).unwrap();

        let rows_hit: Vec<usize> = candidates.iter().map(|(i, _)| *i).collect();
        assert!(rows_hit.contains(&0), "lost the near-side candidate");
        assert!(rows_hit.contains(&1), "lost the cross-dateline candidate");
    }

    #[test]
    fn restaurant_csv_skips_bad_rows() {
        let csv_data = "\
name,cuisine,rating,lat,lon
Good Place,italian,4.5,40.7,-74.0
No Coords,thai,4.0,,
Bad Lat,sushi,4.0,95.0,10.0
";
        let restaurants = read_restaurants(csv_data.as_bytes()).unwrap();
        assert_eq!(restaurants.len(), 1);
        assert_eq!(restaurants[0].name, "Good Place");
    }

    #[test]
    fn airport_codes_are_normalized_uppercase() {
        let csv_data = "\
iata,icao,name,lat,lon
sfo,ksfo,San Francisco International,37.6213,-122.3790
";
        let airports = read_airports(csv_data.as_bytes()).unwrap();
        assert_eq!(airports[0].iata, "SFO");
        assert_eq!(airports[0].icao.as_deref(), Some("KSFO"));
    }

    #[test]
    fn airport_row_without_iata_is_rejected() {
        let row = RawAirportRow {
            iata: Some("TOOLONG".into()),
            icao: None,
            name: Some("X".into()),
            lat: Some(0.0),
            lon: Some(0.0),
        };
        assert!(validate_airport(row).is_err());
    }
}
