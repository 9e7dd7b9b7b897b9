//! Demo command - drive the map offline against simulated services.
//!
//! Mounts the map on a headless engine with a simulated location sensor
//! and a canned geocoder, walks it through the common interactions and
//! prints what the engine was asked to draw after each step. Useful for
//! trying the library without network access or a real display.

use std::sync::Arc;

use clap::Args;
use futures::future::BoxFuture;
use vayumap::app::MapApp;
use vayumap::aqi::{color_for, samples_from_json, AqiSample, Severity};
use vayumap::config::ConfigFile;
use vayumap::coord::{LonLat, TileCoord};
use vayumap::layers::TileFetcher;
use vayumap::search::{GeocodeError, Geocoder};
use vayumap::surface::HeadlessEngine;
use vayumap::tracker::{AccuracyMode, PositionFix, SimulatedSensor};
use vayumap::viewport::BaseLayerKind;

use crate::error::CliError;

/// Demo command arguments.
#[derive(Debug, Args)]
pub struct DemoArgs {
    /// Location to search for after the locate step
    #[arg(long, default_value = "Mumbai")]
    pub search: String,

    /// Simulated device position as lon,lat
    #[arg(long, default_value = "77.5946,12.9716")]
    pub position: String,
}

/// Bundled snapshot of readings for the monitored cities, in the wire
/// format the external data source delivers.
const READINGS_JSON: &str = r#"[
    {"id": "bengaluru", "lon": 77.5946, "lat": 12.9716, "aqi": 150},
    {"id": "mumbai",    "lon": 72.8777, "lat": 19.0760, "aqi": 180},
    {"id": "delhi",     "lon": 77.1025, "lat": 28.7041, "aqi": 200},
    {"id": "chennai",   "lon": 80.2707, "lat": 13.0827, "aqi": 130},
    {"id": "kolkata",   "lon": 88.3639, "lat": 22.5726, "aqi": 160}
]"#;

/// Sample readings for the monitored cities.
fn sample_readings() -> Result<Vec<AqiSample>, CliError> {
    samples_from_json(READINGS_JSON)
        .map_err(|e| CliError::Config(format!("Bundled readings failed to parse: {}", e)))
}

/// Geocoder answering from the monitored cities, no network needed.
struct CityGeocoder;

impl Geocoder for CityGeocoder {
    fn geocode<'a>(
        &'a self,
        query: &'a str,
    ) -> BoxFuture<'a, Result<Option<LonLat>, GeocodeError>> {
        let hit = sample_readings()
            .ok()
            .and_then(|readings| {
                readings
                    .into_iter()
                    .find(|s| s.id.eq_ignore_ascii_case(query.trim()))
            })
            .map(|s| s.position);
        Box::pin(async move { Ok(hit) })
    }
}

/// Run the demo command.
pub async fn run(args: DemoArgs) -> Result<(), CliError> {
    let position = parse_position(&args.position)?;

    let config = ConfigFile::load()?;
    let engine = HeadlessEngine::new();
    let sensor = SimulatedSensor::new();
    sensor.respond_with(PositionFix::new(position));

    let app = MapApp::start_with_geocoder(
        config,
        Box::new(engine.clone()),
        Arc::new(sensor),
        Arc::new(CityGeocoder),
    )?;
    let controller = app.controller();

    println!("Mounted. Initial frame:");
    print_frame(&engine);

    println!();
    println!("AQI readings:");
    let readings = sample_readings()?;
    for sample in &readings {
        let severity = Severity::from_aqi(sample.value);
        println!(
            "  {:<10} AQI {:>3}  {}  {}",
            sample.id,
            sample.value,
            color_for(sample.value).to_hex(),
            severity.label(),
        );
    }
    controller.set_aqi_samples(readings);
    print_frame(&engine);

    println!();
    println!("Locating device...");
    let fix = controller.locate_once(AccuracyMode::High).await?;
    println!("  fix at {}", fix.position);
    print_frame(&engine);

    println!();
    println!("Searching for '{}'...", args.search);
    match controller.search(&args.search).await {
        Ok(outcome) => println!("  {:?}", outcome),
        Err(e) => println!("  {}", e),
    }
    print_frame(&engine);

    println!();
    println!("Switching to satellite imagery...");
    controller.select_base_layer(BaseLayerKind::Satellite);
    print_frame(&engine);

    println!();
    println!("Fetching the tile under the viewport centre...");
    fetch_center_tile(controller).await;

    app.shutdown();
    println!();
    println!("Unmounted. Engine released: {}", engine.released());
    Ok(())
}

/// Downloads the tile under the viewport centre through the visible base
/// layer's source. Offline this degrades to a missing tile, like the
/// rendering path does.
async fn fetch_center_tile(controller: &vayumap::MapViewController) {
    let snap = controller.viewport().snapshot();
    let Ok(tile) = TileCoord::containing(snap.center, snap.zoom as u8) else {
        return;
    };
    let source = controller
        .registry()
        .z_ordered()
        .into_iter()
        .find(|layer| layer.visible && layer.source.is_some())
        .and_then(|layer| layer.source);
    let Some(source) = source else { return };

    let fetcher = TileFetcher::new();
    match fetcher.fetch(&source, tile).await {
        Some(bytes) => println!("  tile {}: {} bytes", tile, bytes.len()),
        None => println!("  tile {}: unavailable, rendered as missing", tile),
    }
}

fn parse_position(raw: &str) -> Result<LonLat, CliError> {
    let parse = |raw: &str| -> Option<LonLat> {
        let (lon, lat) = raw.split_once(',')?;
        let lon: f64 = lon.trim().parse().ok()?;
        let lat: f64 = lat.trim().parse().ok()?;
        LonLat::validated(lon, lat).ok()
    };
    parse(raw).ok_or_else(|| {
        CliError::Config(format!(
            "Invalid --position '{}': expected lon,lat within range",
            raw
        ))
    })
}

fn print_frame(engine: &HeadlessEngine) {
    if let Some(frame) = engine.last_frame() {
        println!(
            "  frame #{}: zoom {:.1}, layers [{}], {} markers",
            engine.frame_count(),
            frame.zoom,
            frame.visible_layers.join(", "),
            frame.markers.len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_position_accepts_lon_lat() {
        let pos = parse_position("77.5946, 12.9716").unwrap();
        assert_eq!(pos, LonLat::new(77.5946, 12.9716));
    }

    #[test]
    fn test_parse_position_rejects_garbage() {
        assert!(parse_position("abc").is_err());
        assert!(parse_position("200,10").is_err());
    }

    #[test]
    fn test_bundled_readings_parse() {
        let readings = sample_readings().unwrap();
        assert_eq!(readings.len(), 5);
        assert_eq!(readings[0].id, "bengaluru");
        assert_eq!(readings[2].value, 200);
    }

    #[tokio::test]
    async fn test_city_geocoder_is_case_insensitive() {
        let hit = CityGeocoder.geocode("MUMBAI").await.unwrap();
        assert_eq!(hit, Some(LonLat::new(72.8777, 19.076)));
        assert_eq!(CityGeocoder.geocode("atlantis").await.unwrap(), None);
    }
}
