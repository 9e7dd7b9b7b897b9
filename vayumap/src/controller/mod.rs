//! Map view controller: user intents against the shared map state.
//!
//! Composes the viewport, layer registry, marker overlay, geolocation
//! tracker, search flow and map surface into the single component the
//! surrounding screens talk to. All user input arrives here as an intent;
//! the controller translates it into mutations of the owning component and
//! lets the change notifications drive the redraw.
//!
//! Navigation out of the map (marker detail, history view) is not handled
//! here: it is fired as an event on the navigation channel for the
//! surrounding shell to route.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::coord::{CoordError, LonLat};
use crate::layers::{LayerRegistry, TileSource, ARCGIS_IMAGERY_URL_TEMPLATE, OSM_URL_TEMPLATE};
use crate::markers::MarkerOverlay;
use crate::search::{Geocoder, SearchError, SearchFlow, SearchOutcome, FOUND_ZOOM};
use crate::surface::{DrawingEngine, MapSurface};
use crate::tracker::{
    AccuracyMode, GeolocationTracker, LocationSensor, PositionFix, SessionId, TrackerError,
    TrackingPhase, DEFAULT_LOCATE_TIMEOUT,
};
use crate::viewport::{BaseLayerKind, Viewport, DEFAULT_CENTER, DEFAULT_ZOOM};

/// Zoom applied after a successful one-shot locate.
pub const LOCATE_ZOOM: f64 = 15.0;

/// Tunables applied when mounting the map.
#[derive(Debug, Clone)]
pub struct MapOptions {
    /// Viewport centre on mount.
    pub initial_center: LonLat,
    /// Viewport zoom on mount (clamped).
    pub initial_zoom: f64,
    /// Imagery source of the street base layer.
    pub street_source: TileSource,
    /// Imagery source of the satellite base layer.
    pub satellite_source: TileSource,
    /// How long a one-shot locate waits for its fix.
    pub locate_timeout: Duration,
    /// Zoom applied when a search result is found.
    pub found_zoom: f64,
    /// Zoom applied after a successful one-shot locate.
    pub locate_zoom: f64,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            initial_center: DEFAULT_CENTER,
            initial_zoom: DEFAULT_ZOOM,
            street_source: TileSource::xyz(OSM_URL_TEMPLATE),
            satellite_source: TileSource::xyz(ARCGIS_IMAGERY_URL_TEMPLATE),
            locate_timeout: DEFAULT_LOCATE_TIMEOUT,
            found_zoom: FOUND_ZOOM,
            locate_zoom: LOCATE_ZOOM,
        }
    }
}

/// Map interaction failures, as reported to the user.
///
/// None of these is fatal; every one is recoverable by retrying the
/// triggering action.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    /// A coordinate outside the geographic range was rejected.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(#[from] CoordError),

    /// Tracking failure; tracking state returned to idle.
    #[error(transparent)]
    Tracking(#[from] TrackerError),

    /// Search failure; viewport unchanged.
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Events fired towards the surrounding screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationIntent {
    /// Open the detail screen for a marker.
    OpenDetail { marker_id: String },
    /// Switch to the historical trends view.
    GoToHistory,
}

/// The mounted map view controller.
pub struct MapViewController {
    viewport: Viewport,
    registry: LayerRegistry,
    overlay: MarkerOverlay,
    tracker: GeolocationTracker,
    search: SearchFlow,
    surface: Option<MapSurface>,
    navigation_tx: mpsc::UnboundedSender<NavigationIntent>,
    locate_zoom: f64,
}

impl MapViewController {
    /// Mounts the map: builds the component graph, binds the drawing engine
    /// and renders the initial frame.
    ///
    /// Returns the controller and the receiving end of the navigation
    /// channel.
    pub fn mount(
        engine: Box<dyn DrawingEngine>,
        sensor: Arc<dyn LocationSensor>,
        geocoder: Arc<dyn Geocoder>,
    ) -> (Self, mpsc::UnboundedReceiver<NavigationIntent>) {
        Self::mount_with(MapOptions::default(), engine, sensor, geocoder)
    }

    /// Mounts the map with explicit tunables (see [`MapOptions`]).
    pub fn mount_with(
        options: MapOptions,
        engine: Box<dyn DrawingEngine>,
        sensor: Arc<dyn LocationSensor>,
        geocoder: Arc<dyn Geocoder>,
    ) -> (Self, mpsc::UnboundedReceiver<NavigationIntent>) {
        let viewport = Viewport::with_initial(
            options.initial_center,
            options.initial_zoom,
            BaseLayerKind::Street,
        );
        let registry =
            LayerRegistry::with_sources(options.street_source, options.satellite_source);
        let overlay = MarkerOverlay::new();

        // Continuous fixes move the current-location marker only; the
        // viewport is recentred solely by explicit intents.
        let tracker = {
            let overlay = overlay.clone();
            GeolocationTracker::with_locate_timeout(
                sensor,
                Arc::new(move |fix: PositionFix| {
                    overlay.upsert_current_location(fix.position);
                }),
                options.locate_timeout,
            )
        };

        let search = SearchFlow::with_found_zoom(geocoder, viewport.clone(), options.found_zoom);
        let surface = MapSurface::mount(engine, &viewport, &registry, &overlay);
        let (navigation_tx, navigation_rx) = mpsc::unbounded_channel();

        info!("map view controller mounted");
        (
            Self {
                viewport,
                registry,
                overlay,
                tracker,
                search,
                surface: Some(surface),
                navigation_tx,
                locate_zoom: options.locate_zoom,
            },
            navigation_rx,
        )
    }

    /// Resolves the current position once and recentres on it.
    ///
    /// On success the viewport centres on the fix at the close-up zoom and
    /// the current-location marker moves there. On failure the viewport is
    /// untouched and the error is reported for display.
    pub async fn locate_once(&self, mode: AccuracyMode) -> Result<PositionFix, MapError> {
        let fix = self.tracker.locate_once(mode).await?;
        self.viewport.set_center(fix.position)?;
        self.viewport.set_zoom(self.locate_zoom);
        self.overlay.upsert_current_location(fix.position);
        Ok(fix)
    }

    /// Starts continuous tracking; fixes move the current-location marker.
    pub fn start_tracking(&self, mode: AccuracyMode) -> Result<SessionId, MapError> {
        Ok(self.tracker.start_tracking(mode)?)
    }

    /// Stops continuous tracking.
    pub fn stop_tracking(&self) {
        self.tracker.stop_tracking();
    }

    /// Current tracking phase.
    pub fn tracking_phase(&self) -> TrackingPhase {
        self.tracker.phase()
    }

    /// Searches for a location and recentres on the best match.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, MapError> {
        Ok(self.search.search(query).await?)
    }

    /// Switches the visible base layer.
    ///
    /// Registry visibility and the viewport selection change within one
    /// logical event; the redraw they trigger sees a consistent pair.
    pub fn select_base_layer(&self, kind: BaseLayerKind) {
        self.registry.select_base(kind);
        self.viewport.set_base_layer(kind);
        debug!(?kind, "base layer selected");
    }

    /// Recentres the viewport explicitly.
    pub fn set_center(&self, center: LonLat) -> Result<(), MapError> {
        self.viewport.set_center(center)?;
        Ok(())
    }

    /// Sets the zoom level (clamped).
    pub fn set_zoom(&self, zoom: f64) {
        self.viewport.set_zoom(zoom);
    }

    pub fn zoom_in(&self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&self) {
        self.viewport.zoom_out();
    }

    /// Replaces the AQI sample markers with a fresh snapshot.
    pub fn set_aqi_samples(&self, samples: Vec<crate::aqi::AqiSample>) {
        self.overlay.set_aqi_samples(samples);
    }

    /// Fires the "open detail for marker" navigation intent.
    pub fn open_marker_detail(&self, marker_id: impl Into<String>) {
        let _ = self.navigation_tx.send(NavigationIntent::OpenDetail {
            marker_id: marker_id.into(),
        });
    }

    /// Fires the "go to history view" navigation intent.
    pub fn open_history(&self) {
        let _ = self.navigation_tx.send(NavigationIntent::GoToHistory);
    }

    /// Read access to the viewport.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Read access to the layer registry.
    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    /// Read access to the marker overlay.
    pub fn overlay(&self) -> &MarkerOverlay {
        &self.overlay
    }

    /// Unmounts the map.
    ///
    /// Teardown order: the tracking session stops and in-flight searches are
    /// invalidated first, then the surface drops its subscriptions and
    /// releases the drawing engine. Nothing survives past this call.
    pub fn unmount(&mut self) {
        self.tracker.stop_tracking();
        self.search.invalidate();
        if let Some(surface) = self.surface.take() {
            surface.unmount();
        }
        info!("map view controller unmounted");
    }
}

impl Drop for MapViewController {
    fn drop(&mut self) {
        if self.surface.is_some() {
            self.unmount();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::GeocodeError;
    use crate::surface::HeadlessEngine;
    use crate::tracker::SimulatedSensor;
    use futures::future::BoxFuture;

    struct TableGeocoder;

    impl Geocoder for TableGeocoder {
        fn geocode<'a>(
            &'a self,
            query: &'a str,
        ) -> BoxFuture<'a, Result<Option<LonLat>, GeocodeError>> {
            Box::pin(async move {
                match query {
                    "Mumbai" => Ok(Some(LonLat::new(72.8777, 19.076))),
                    _ => Ok(None),
                }
            })
        }
    }

    fn mounted() -> (
        MapViewController,
        mpsc::UnboundedReceiver<NavigationIntent>,
        HeadlessEngine,
        SimulatedSensor,
    ) {
        let engine = HeadlessEngine::new();
        let sensor = SimulatedSensor::new();
        let (controller, navigation) = MapViewController::mount(
            Box::new(engine.clone()),
            Arc::new(sensor.clone()),
            Arc::new(TableGeocoder),
        );
        (controller, navigation, engine, sensor)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_locate_once_recentres_and_moves_marker() {
        let (controller, _nav, engine, sensor) = mounted();
        sensor.respond_with(PositionFix::new(LonLat::new(77.59, 12.97)));

        let fix = controller.locate_once(AccuracyMode::High).await.unwrap();
        assert_eq!(fix.position, LonLat::new(77.59, 12.97));

        let snap = controller.viewport().snapshot();
        assert_eq!(snap.center, LonLat::new(77.59, 12.97));
        assert_eq!(snap.zoom, LOCATE_ZOOM);

        let frame = engine.last_frame().unwrap();
        assert_eq!(frame.markers.last().unwrap().position, fix.position);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_locate_leaves_viewport_unchanged() {
        let (controller, _nav, _engine, sensor) = mounted();
        sensor.deny_permission();

        let before = controller.viewport().snapshot();
        let result = controller.locate_once(AccuracyMode::High).await;

        assert!(matches!(
            result,
            Err(MapError::Tracking(TrackerError::PermissionDenied))
        ));
        assert_eq!(controller.viewport().snapshot(), before);
        assert_eq!(controller.tracking_phase(), TrackingPhase::Idle);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_search_recentres_on_match() {
        let (controller, _nav, _engine, _sensor) = mounted();

        let outcome = controller.search("Mumbai").await.unwrap();
        assert_eq!(
            outcome,
            SearchOutcome::Recentred(LonLat::new(72.8777, 19.076))
        );
        assert_eq!(
            controller.viewport().snapshot().center,
            LonLat::new(72.8777, 19.076)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_base_layer_intent_is_consistent() {
        let (controller, _nav, engine, _sensor) = mounted();

        controller.select_base_layer(BaseLayerKind::Satellite);

        assert_eq!(controller.registry().visible_base_count(), 1);
        assert_eq!(
            controller.viewport().snapshot().active_base,
            BaseLayerKind::Satellite
        );
        let frame = engine.last_frame().unwrap();
        assert!(frame
            .visible_layers
            .contains(&crate::layers::SATELLITE_LAYER_ID.to_string()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_navigation_intents_are_events() {
        let (controller, mut navigation, _engine, _sensor) = mounted();

        controller.open_marker_detail("blr");
        controller.open_history();

        assert_eq!(
            navigation.recv().await,
            Some(NavigationIntent::OpenDetail {
                marker_id: "blr".to_string()
            })
        );
        assert_eq!(navigation.recv().await, Some(NavigationIntent::GoToHistory));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unmount_tears_everything_down() {
        let (mut controller, _nav, engine, sensor) = mounted();
        controller.start_tracking(AccuracyMode::High).unwrap();

        controller.unmount();

        assert_eq!(controller.tracking_phase(), TrackingPhase::Idle);
        assert!(engine.released());
        assert_eq!(controller.viewport().subscriber_count(), 0);
        assert_eq!(controller.overlay().subscriber_count(), 0);

        // Give the pump task a moment to observe cancellation and drop its
        // sensor subscription.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(sensor.subscriber_count(), 0);
    }
}
