//! Great-circle distance math and distance presentation.

use serde::{Deserialize, Serialize};

/// Mean earth radius in kilometers (spherical approximation, not WGS-84).
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Geographic point (lat/lon in degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Haversine great-circle distance between two points, in kilometers.
///
/// Pure and deterministic. Inputs are assumed to be in range (lat within
/// ±90°, lon within ±180°); callers validate at the API boundary. Longitude
/// wraparound at the antimeridian falls out of the trigonometry, no
/// branching needed.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Degree bounding boxes around a center point, used as cheap envelopes for
/// R-tree candidate retrieval before the exact haversine filter.
///
/// Each box is `([min_lon, min_lat], [max_lon, max_lat])`. A box that would
/// cross the antimeridian is split into one envelope per side, since stored
/// longitudes live in [-180, 180] and a single envelope past ±180° would
/// never intersect points on the far side. Deliberately conservative: near
/// the poles the longitude span degenerates and we fall back to the full
/// ±180° range rather than produce an inverted box.
pub fn bbox_around(center: GeoPoint, radius_km: f64) -> Vec<([f64; 2], [f64; 2])> {
    // 1° of latitude is ~111 km everywhere; longitude shrinks with cos(lat).
    let lat_delta = radius_km / 111.0;
    let min_lat = center.lat - lat_delta;
    let max_lat = center.lat + lat_delta;

    let cos_lat = center.lat.to_radians().cos().abs();
    let lon_delta = if cos_lat > 1e-6 {
        (radius_km / (111.0 * cos_lat)).min(180.0)
    } else {
        180.0
    };

    if lon_delta >= 180.0 {
        return vec![([-180.0, min_lat], [180.0, max_lat])];
    }

    let west = center.lon - lon_delta;
    let east = center.lon + lon_delta;

    if west < -180.0 {
        // Wraps past the antimeridian to the eastern hemisphere.
        vec![
            ([-180.0, min_lat], [east, max_lat]),
            ([west + 360.0, min_lat], [180.0, max_lat]),
        ]
    } else if east > 180.0 {
        // Wraps past the antimeridian to the western hemisphere.
        vec![
            ([west, min_lat], [180.0, max_lat]),
            ([-180.0, min_lat], [east - 360.0, max_lat]),
        ]
    } else {
        vec![([west, min_lat], [east, max_lat])]
    }
}

/// Render a distance in meters for display: `"743 m"` below one kilometer,
/// `"1.3 km"` (one decimal) above. Rounds half away from zero, so 1250 m is
/// "1.3 km" and 499.5 m is "500 m".
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{} m", meters.round() as i64)
    } else {
        // Round to one decimal before formatting; `{:.1}` alone would round
        // ties to even.
        format!("{:.1} km", (meters / 100.0).round() / 10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAN_FRANCISCO: GeoPoint = GeoPoint { lat: 37.7749, lon: -122.4194 };
    const LOS_ANGELES: GeoPoint = GeoPoint { lat: 34.0522, lon: -118.2437 };
    const NEW_YORK: GeoPoint = GeoPoint { lat: 40.7128, lon: -74.0060 };
    const LONDON: GeoPoint = GeoPoint { lat: 51.5074, lon: -0.1278 };

    #[test]
    fn distance_to_self_is_zero() {
        for p in [SAN_FRANCISCO, NEW_YORK, GeoPoint::new(0.0, 0.0), GeoPoint::new(-90.0, 45.0)] {
            assert_eq!(haversine_km(p, p), 0.0);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let d1 = haversine_km(SAN_FRANCISCO, NEW_YORK);
        let d2 = haversine_km(NEW_YORK, SAN_FRANCISCO);
        assert_eq!(d1, d2);
    }

    #[test]
    fn known_city_pairs() {
        let sf_la = haversine_km(SAN_FRANCISCO, LOS_ANGELES);
        assert!((sf_la - 559.0).abs() < 1.0, "SF-LA should be ~559 km, got {}", sf_la);

        let ny_london = haversine_km(NEW_YORK, LONDON);
        assert!((ny_london - 5570.0).abs() < 10.0, "NY-London should be ~5570 km, got {}", ny_london);
    }

    #[test]
    fn one_degree_is_about_111_km() {
        let origin = GeoPoint::new(0.0, 0.0);
        let north = haversine_km(origin, GeoPoint::new(1.0, 0.0));
        let east = haversine_km(origin, GeoPoint::new(0.0, 1.0));
        assert!((north - 111.0).abs() < 1.0, "got {}", north);
        assert!((east - 111.0).abs() < 1.0, "got {}", east);
    }

    #[test]
    fn antimeridian_wraparound() {
        // 2° of longitude apart across the date line, not 358°.
        let d = haversine_km(GeoPoint::new(0.0, 179.0), GeoPoint::new(0.0, -179.0));
        assert!((d - 222.4).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn format_meters_and_kilometers() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(500.0), "500 m");
        assert_eq!(format_distance(499.5), "500 m");
        assert_eq!(format_distance(999.0), "999 m");
        assert_eq!(format_distance(1000.0), "1.0 km");
        assert_eq!(format_distance(1250.0), "1.3 km");
        assert_eq!(format_distance(12_345.0), "12.3 km");
    }

    #[test]
    fn bbox_contains_center_and_scales_with_radius() {
        let boxes = bbox_around(NEW_YORK, 10.0);
        assert_eq!(boxes.len(), 1);
        let (min, max) = boxes[0];
        assert!(min[1] < NEW_YORK.lat && NEW_YORK.lat < max[1]);
        assert!(min[0] < NEW_YORK.lon && NEW_YORK.lon < max[0]);

        let lat_span = max[1] - min[1];
        assert!((lat_span - 0.18).abs() < 0.02, "lat span ~0.18°, got {}", lat_span);
    }

    #[test]
    fn bbox_near_pole_covers_all_longitudes() {
        let boxes = bbox_around(GeoPoint::new(89.9999, 0.0), 50.0);
        assert_eq!(boxes.len(), 1);
        let (min, max) = boxes[0];
        assert!(min[0] <= -180.0 && max[0] >= 180.0);
    }

    #[test]
    fn bbox_splits_at_the_antimeridian() {
        let contains = |boxes: &[([f64; 2], [f64; 2])], lon: f64, lat: f64| {
            boxes
                .iter()
                .any(|(min, max)| min[0] <= lon && lon <= max[0] && min[1] <= lat && lat <= max[1])
        };

        // Eastward wrap: a center just west of 180°.
        let boxes = bbox_around(GeoPoint::new(0.0, 179.95), 50.0);
        assert_eq!(boxes.len(), 2);
        assert!(contains(&boxes, 179.9, 0.0));
        assert!(contains(&boxes, -179.9, 0.0));
        assert!(!contains(&boxes, 0.0, 0.0));

        // Westward wrap: a center just east of -180°.
        let boxes = bbox_around(GeoPoint::new(0.0, -179.95), 50.0);
        assert_eq!(boxes.len(), 2);
        assert!(contains(&boxes, 179.9, 0.0));
        assert!(contains(&boxes, -179.9, 0.0));

        // All longitudes stay within the stored [-180, 180] range.
        for (min, max) in boxes {
            assert!(min[0] >= -180.0 && max[0] <= 180.0);
        }
    }
}
