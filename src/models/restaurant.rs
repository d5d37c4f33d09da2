//! Restaurant records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Located;
use crate::geo::GeoPoint;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    pub cuisine: String,
    /// Average rating on a 0.0–5.0 scale.
    pub rating: f64,
    pub lat: f64,
    pub lon: f64,
}

impl Restaurant {
    pub fn new(name: &str, cuisine: &str, rating: f64, lat: f64, lon: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            cuisine: cuisine.to_string(),
            rating,
            lat,
            lon,
        }
    }
}

impl Located for Restaurant {
    fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}
