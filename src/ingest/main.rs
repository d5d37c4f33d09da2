//! Dataset ingest tool.
//!
//! Validates raw restaurant and airport CSVs into query-ready datasets:
//! rows with missing or out-of-range coordinates are dropped (a query-ready
//! record always has exactly one valid location), airport codes are
//! normalized to uppercase and deduplicated, and restaurants without an id
//! get one assigned.

use std::collections::HashSet;
use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use layover::models::{Airport, Restaurant};
use layover::store::{validate_airport, validate_restaurant, RawAirportRow, RawRestaurantRow};

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Validate raw CSVs into query-ready datasets")]
struct Args {
    /// Raw restaurants CSV
    #[arg(long)]
    restaurants: PathBuf,

    /// Raw airports CSV
    #[arg(long)]
    airports: PathBuf,

    /// Output directory for the cleaned datasets
    #[arg(long, default_value = "data")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Layover Ingest");
    std::fs::create_dir_all(&args.out_dir).context("Failed to create output directory")?;

    let restaurants = ingest_restaurants(&args)?;
    let airports = ingest_airports(&args)?;

    info!(
        "Done: {} restaurants, {} airports written to {}",
        restaurants,
        airports,
        args.out_dir.display()
    );

    Ok(())
}

fn ingest_restaurants(args: &Args) -> Result<usize> {
    let file = File::open(&args.restaurants)
        .with_context(|| format!("Failed to open {}", args.restaurants.display()))?;

    let mut kept: Vec<Restaurant> = Vec::new();
    let mut dropped = 0usize;

    for (i, record) in csv::Reader::from_reader(file).deserialize().enumerate() {
        let raw: RawRestaurantRow = record.context("Malformed restaurants CSV")?;
        match validate_restaurant(raw) {
            Ok(r) => kept.push(r),
            Err(reason) => {
                warn!("Dropping restaurant row {}: {}", i + 1, reason);
                dropped += 1;
            }
        }
    }

    let out_path = args.out_dir.join("restaurants.csv");
    let mut writer = csv::Writer::from_path(&out_path)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;
    for r in &kept {
        writer.serialize(r)?;
    }
    writer.flush()?;

    info!("Restaurants: kept {}, dropped {}", kept.len(), dropped);
    Ok(kept.len())
}

fn ingest_airports(args: &Args) -> Result<usize> {
    let file = File::open(&args.airports)
        .with_context(|| format!("Failed to open {}", args.airports.display()))?;

    let mut kept: Vec<Airport> = Vec::new();
    let mut seen_codes: HashSet<String> = HashSet::new();
    let mut dropped = 0usize;

    for (i, record) in csv::Reader::from_reader(file).deserialize().enumerate() {
        let raw: RawAirportRow = record.context("Malformed airports CSV")?;
        match validate_airport(raw) {
            Ok(a) => {
                // IATA codes are the lookup identity, so duplicates lose.
                if seen_codes.insert(a.iata.clone()) {
                    kept.push(a);
                } else {
                    warn!("Dropping airport row {}: duplicate code {}", i + 1, a.iata);
                    dropped += 1;
                }
            }
            Err(reason) => {
                warn!("Dropping airport row {}: {}", i + 1, reason);
                dropped += 1;
            }
        }
    }

    let out_path = args.out_dir.join("airports.csv");
    let mut writer = csv::Writer::from_path(&out_path)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;
    for a in &kept {
        writer.serialize(a)?;
    }
    writer.flush()?;

    info!("Airports: kept {}, dropped {}", kept.len(), dropped);
    Ok(kept.len())
}
