//! Proximity query server.
//!
//! HTTP API over the proximity service: restaurants and airports near a
//! point, nearest airport, and restaurants near a named airport. Handlers
//! own boundary validation (coordinate ranges, radius caps, defaults) and
//! translate core errors into status codes; the core stays pure.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use layover::geo::{format_distance, GeoPoint};
use layover::models::{Airport, Restaurant};
use layover::proximity::{Nearby, ProximityService, QueryError};
use layover::store::Dataset;

/// Widest radius a restaurant search may use, in kilometers. Airport
/// searches get a wider cap since airports are sparse.
const MAX_RESTAURANT_RADIUS_KM: f64 = 100.0;
const MAX_AIRPORT_RADIUS_KM: f64 = 500.0;
const MAX_LIMIT: usize = 100;

#[derive(Parser, Debug)]
#[command(name = "serve")]
#[command(about = "Proximity query server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    listen: String,

    /// Query-ready restaurants CSV
    #[arg(long, default_value = "data/restaurants.csv")]
    restaurants: PathBuf,

    /// Query-ready airports CSV
    #[arg(long, default_value = "data/airports.csv")]
    airports: PathBuf,

    /// Skip building the spatial index and answer every query by full scan
    #[arg(long)]
    full_scan: bool,
}

/// Application state shared across handlers
struct AppState {
    service: ProximityService,
    dataset: Arc<Dataset>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Layover Query Server");

    let dataset = Dataset::load(&args.restaurants, &args.airports, !args.full_scan)
        .context("Failed to load dataset")?;
    let dataset = Arc::new(dataset);

    let state = Arc::new(AppState {
        service: ProximityService::new(Arc::clone(&dataset)),
        dataset,
    });

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/restaurants/nearby", get(restaurants_nearby_handler))
        .route("/v1/airports/nearby", get(airports_nearby_handler))
        .route("/v1/airports/nearest", get(nearest_airport_handler))
        .route(
            "/v1/airports/{code}/restaurants",
            get(restaurants_near_airport_handler),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", args.listen);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        restaurants: state.dataset.restaurants.len(),
        airports: state.dataset.airports.len(),
        spatial_index: state.dataset.restaurants.has_index(),
        loaded_at: state.dataset.loaded_at.to_rfc3339(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    restaurants: usize,
    airports: usize,
    spatial_index: bool,
    loaded_at: String,
}

/// Restaurants near a point
async fn restaurants_nearby_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RestaurantQueryParams>,
) -> Result<Json<NearbyResponse<Restaurant>>, (StatusCode, String)> {
    let center = validate_point(params.latitude, params.longitude)?;
    let radius_km = validate_radius(params.distance, MAX_RESTAURANT_RADIUS_KM)?;
    let limit = params.limit.min(MAX_LIMIT);

    let results = state
        .service
        .find_nearby_restaurants(center, radius_km, Some(params.min_rating), limit)
        .map_err(error_response)?;

    Ok(Json(NearbyResponse {
        search: SearchEcho {
            latitude: center.lat,
            longitude: center.lon,
            radius_km,
            min_rating: Some(params.min_rating),
            limit,
        },
        count: results.len(),
        results: results.into_iter().map(ResultItem::from).collect(),
    }))
}

/// Airports near a point
async fn airports_nearby_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AirportQueryParams>,
) -> Result<Json<NearbyResponse<Airport>>, (StatusCode, String)> {
    let center = validate_point(params.latitude, params.longitude)?;
    let radius_km = validate_radius(params.distance, MAX_AIRPORT_RADIUS_KM)?;
    let limit = params.limit.min(MAX_LIMIT);

    let results = state
        .service
        .find_nearby_airports(center, radius_km, limit)
        .map_err(error_response)?;

    Ok(Json(NearbyResponse {
        search: SearchEcho {
            latitude: center.lat,
            longitude: center.lon,
            radius_km,
            min_rating: None,
            limit,
        },
        count: results.len(),
        results: results.into_iter().map(ResultItem::from).collect(),
    }))
}

/// Single nearest airport within 500 km of a point
async fn nearest_airport_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PointParams>,
) -> Result<Json<NearestAirportResponse>, (StatusCode, String)> {
    let point = validate_point(params.latitude, params.longitude)?;

    let nearest = state
        .service
        .find_nearest_airport(point)
        .map_err(error_response)?;

    Ok(Json(NearestAirportResponse {
        found: nearest.is_some(),
        airport: nearest.map(ResultItem::from),
    }))
}

/// Restaurants near a named airport (IATA/ICAO code)
async fn restaurants_near_airport_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(params): Query<NamedLocationParams>,
) -> Result<Json<NearAirportResponse>, (StatusCode, String)> {
    let radius_km = validate_radius(params.distance, MAX_RESTAURANT_RADIUS_KM)?;
    let limit = params.limit.min(MAX_LIMIT);

    let (airport, results) = state
        .service
        .find_restaurants_near_airport(&code, radius_km, Some(params.min_rating), limit)
        .map_err(error_response)?;

    Ok(Json(NearAirportResponse {
        search: SearchEcho {
            // Echo the resolved center so clients can plot it.
            latitude: airport.lat,
            longitude: airport.lon,
            radius_km,
            min_rating: Some(params.min_rating),
            limit,
        },
        airport,
        count: results.len(),
        results: results.into_iter().map(ResultItem::from).collect(),
    }))
}

#[derive(Deserialize)]
struct RestaurantQueryParams {
    latitude: f64,
    longitude: f64,
    /// Search radius in kilometers
    #[serde(default = "default_restaurant_radius")]
    distance: f64,
    /// Minimum rating filter
    #[serde(default = "default_min_rating")]
    min_rating: f64,
    /// Number of results
    #[serde(default = "default_limit")]
    limit: usize,
}

#[derive(Deserialize)]
struct AirportQueryParams {
    latitude: f64,
    longitude: f64,
    /// Search radius in kilometers
    #[serde(default = "default_airport_radius")]
    distance: f64,
    /// Number of results
    #[serde(default = "default_limit")]
    limit: usize,
}

#[derive(Deserialize)]
struct PointParams {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct NamedLocationParams {
    #[serde(default = "default_restaurant_radius")]
    distance: f64,
    #[serde(default = "default_min_rating")]
    min_rating: f64,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_restaurant_radius() -> f64 {
    5.0
}

fn default_airport_radius() -> f64 {
    50.0
}

fn default_min_rating() -> f64 {
    4.0
}

fn default_limit() -> usize {
    20
}

/// Echo of the effective search parameters
#[derive(Serialize)]
struct SearchEcho {
    latitude: f64,
    longitude: f64,
    radius_km: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_rating: Option<f64>,
    limit: usize,
}

/// A distance-annotated result with a human-readable distance alongside the
/// raw meters.
#[derive(Serialize)]
struct ResultItem<T> {
    #[serde(flatten)]
    nearby: Nearby<T>,
    distance: String,
}

impl<T> From<Nearby<T>> for ResultItem<T> {
    fn from(nearby: Nearby<T>) -> Self {
        let distance = format_distance(nearby.distance_m);
        Self { nearby, distance }
    }
}

#[derive(Serialize)]
struct NearbyResponse<T> {
    search: SearchEcho,
    count: usize,
    results: Vec<ResultItem<T>>,
}

#[derive(Serialize)]
struct NearestAirportResponse {
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    airport: Option<ResultItem<Airport>>,
}

#[derive(Serialize)]
struct NearAirportResponse {
    airport: Airport,
    search: SearchEcho,
    count: usize,
    results: Vec<ResultItem<Restaurant>>,
}

/// Reject out-of-range coordinates before they reach the core.
fn validate_point(lat: f64, lon: f64) -> Result<GeoPoint, (StatusCode, String)> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("latitude must be in [-90, 90], got {}", lat),
        ));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("longitude must be in [-180, 180], got {}", lon),
        ));
    }
    Ok(GeoPoint::new(lat, lon))
}

/// Enforce the caller-side radius cap for this entity kind.
fn validate_radius(radius_km: f64, max_km: f64) -> Result<f64, (StatusCode, String)> {
    if !radius_km.is_finite() || radius_km <= 0.0 || radius_km > max_km {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("distance must be in (0, {}] km, got {}", max_km, radius_km),
        ));
    }
    Ok(radius_km)
}

/// Translate core errors into HTTP responses.
fn error_response(err: QueryError) -> (StatusCode, String) {
    match err {
        QueryError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg),
        QueryError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        QueryError::DataAccess(e) => {
            tracing::error!("Data access failure: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_validation_bounds() {
        assert!(validate_point(90.0, 180.0).is_ok());
        assert!(validate_point(-90.0, -180.0).is_ok());
        assert!(validate_point(90.1, 0.0).is_err());
        assert!(validate_point(0.0, -180.5).is_err());
    }

    #[test]
    fn radius_cap_is_enforced() {
        assert!(validate_radius(5.0, 100.0).is_ok());
        assert!(validate_radius(100.0, 100.0).is_ok());
        assert!(validate_radius(100.1, 100.0).is_err());
        assert!(validate_radius(0.0, 100.0).is_err());
        assert!(validate_radius(f64::NAN, 100.0).is_err());
    }
}
