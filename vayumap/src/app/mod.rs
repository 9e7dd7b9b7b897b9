//! Application bootstrap and lifecycle management.
//!
//! `MapApp` assembles a running map from configuration: it turns the
//! config file into mount options, builds the real geocoder and mounts
//! the view controller against the supplied drawing engine and location
//! sensor. Screens embedding the map hold a `MapApp` and drain its
//! navigation channel.
//!
//! # Example
//!
//! ```ignore
//! use vayumap::app::MapApp;
//! use vayumap::config::ConfigFile;
//!
//! let config = ConfigFile::load()?;
//! let mut app = MapApp::start(config, engine, sensor)?;
//!
//! // ... drive the controller ...
//!
//! app.shutdown();
//! ```

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::{ConfigFile, ConfigFileError};
use crate::controller::{MapOptions, MapViewController, NavigationIntent};
use crate::search::{GeocodeError, Geocoder, NominatimGeocoder};
use crate::surface::DrawingEngine;
use crate::tracker::LocationSensor;

/// Errors that can occur during application startup.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration file error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigFileError),

    /// Failed to build the geocoder client.
    #[error("geocoder setup failed: {0}")]
    Geocoder(#[from] GeocodeError),
}

/// A running map application.
pub struct MapApp {
    controller: MapViewController,
    navigation: mpsc::UnboundedReceiver<NavigationIntent>,
}

impl MapApp {
    /// Starts the map from configuration.
    ///
    /// Builds a Nominatim geocoder from the `[search]` section; everything
    /// else in the config becomes mount options.
    pub fn start(
        config: ConfigFile,
        engine: Box<dyn DrawingEngine>,
        sensor: Arc<dyn LocationSensor>,
    ) -> Result<Self, AppError> {
        let geocoder = NominatimGeocoder::with_endpoint(
            config.search.endpoint.clone(),
            &config.search.user_agent,
        )?;
        Self::start_with_geocoder(config, engine, sensor, Arc::new(geocoder))
    }

    /// Starts the map with an explicit geocoder.
    ///
    /// Used by tests and the offline demo, which substitute a canned
    /// geocoder for the network one.
    pub fn start_with_geocoder(
        config: ConfigFile,
        engine: Box<dyn DrawingEngine>,
        sensor: Arc<dyn LocationSensor>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Result<Self, AppError> {
        let options = mount_options(&config);
        let (controller, navigation) =
            MapViewController::mount_with(options, engine, sensor, geocoder);
        info!("map application started");
        Ok(Self {
            controller,
            navigation,
        })
    }

    /// The mounted view controller.
    pub fn controller(&self) -> &MapViewController {
        &self.controller
    }

    /// Receives the next navigation intent, or `None` once shut down.
    pub async fn next_navigation(&mut self) -> Option<NavigationIntent> {
        self.navigation.recv().await
    }

    /// Unmounts the map and tears down every service.
    pub fn shutdown(mut self) {
        self.controller.unmount();
        info!("map application stopped");
    }
}

/// Translates the config file into mount options.
fn mount_options(config: &ConfigFile) -> MapOptions {
    MapOptions {
        initial_center: config.map.center,
        initial_zoom: config.map.zoom,
        street_source: config.map.street_source(),
        satellite_source: config.map.satellite_source(),
        locate_timeout: Duration::from_secs(config.tracker.locate_timeout_secs),
        found_zoom: config.map.found_zoom,
        locate_zoom: config.map.locate_zoom,
    }
}
