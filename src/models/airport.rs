//! Airport records.

use serde::{Deserialize, Serialize};

use super::Located;
use crate::geo::GeoPoint;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airport {
    /// IATA code, stored uppercase ("SFO"). Unique within a dataset.
    pub iata: String,
    /// ICAO code if known ("KSFO"). Serialized as an empty field when
    /// absent so CSV rows keep a fixed shape.
    pub icao: Option<String>,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Airport {
    pub fn new(iata: &str, name: &str, lat: f64, lon: f64) -> Self {
        Self {
            iata: iata.to_uppercase(),
            icao: None,
            name: name.to_string(),
            lat,
            lon,
        }
    }

    /// Case-insensitive match against either the IATA or ICAO code.
    pub fn matches_code(&self, code: &str) -> bool {
        self.iata.eq_ignore_ascii_case(code)
            || self
                .icao
                .as_deref()
                .is_some_and(|icao| icao.eq_ignore_ascii_case(code))
    }
}

impl Located for Airport {
    fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}
