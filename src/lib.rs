//! Layover - proximity search for restaurants and airports
//!
//! This library provides the distance engine, entity tables, and proximity
//! query service shared by the serve and ingest binaries.

pub mod geo;
pub mod models;
pub mod proximity;
pub mod store;

pub use geo::{format_distance, haversine_km, GeoPoint};
pub use models::{Airport, Located, Restaurant};
