//! Marker overlay: the mutable collection of point features.
//!
//! Holds the singleton current-location marker and the AQI sample markers.
//! This module is the only writer of the feature set; the geolocation
//! tracker and the AQI data source feed it, and the map surface subscribes
//! to redraw when it changes.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::aqi::{color_for, AqiSample, Rgb};
use crate::coord::LonLat;
use crate::notify::{Subscribers, Subscription};

/// Identity-stable id of the singleton current-location marker.
pub const CURRENT_LOCATION_ID: &str = "current-location";

/// Colour of the current-location marker.
const CURRENT_LOCATION_COLOR: Rgb = Rgb::new(0x19, 0x76, 0xd2);

/// What a marker represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// The device's current position.
    CurrentLocation,
    /// An air quality sample point.
    AqiSample,
}

/// A renderable point feature.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerFeature {
    pub id: String,
    pub kind: MarkerKind,
    pub position: LonLat,
    pub color: Rgb,
    /// Label shown in detail views; the AQI value for sample markers.
    pub label: Option<String>,
}

struct OverlayState {
    current_location: Option<MarkerFeature>,
    samples: Vec<MarkerFeature>,
}

struct Shared {
    state: Mutex<OverlayState>,
    subscribers: Subscribers<Vec<MarkerFeature>>,
}

/// Handle to the marker overlay. Cheap to clone.
#[derive(Clone)]
pub struct MarkerOverlay {
    shared: Arc<Shared>,
}

/// Subscription guard for overlay change notifications.
pub type OverlaySubscription = Subscription<Vec<MarkerFeature>>;

impl MarkerOverlay {
    /// Creates an empty overlay.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(OverlayState {
                    current_location: None,
                    samples: Vec::new(),
                }),
                subscribers: Subscribers::new(),
            }),
        }
    }

    /// Moves the singleton current-location marker, creating it on first use.
    ///
    /// A repeated position is a no-op: no notification fires, so
    /// high-frequency sensor updates at a standstill do not force redraws.
    ///
    /// # Returns
    ///
    /// `true` when the marker actually moved.
    pub fn upsert_current_location(&self, position: LonLat) -> bool {
        let features = {
            let mut state = self.shared.state.lock();
            match &mut state.current_location {
                Some(marker) if marker.position == position => return false,
                Some(marker) => marker.position = position,
                None => {
                    state.current_location = Some(MarkerFeature {
                        id: CURRENT_LOCATION_ID.to_string(),
                        kind: MarkerKind::CurrentLocation,
                        position,
                        color: CURRENT_LOCATION_COLOR,
                        label: None,
                    });
                }
            }
            collect_features(&state)
        };
        self.shared.subscribers.emit(&features);
        true
    }

    /// Replaces the AQI sample markers wholesale.
    ///
    /// The previous collection is discarded; each sample's colour comes from
    /// the fixed breakpoint table.
    pub fn set_aqi_samples(&self, samples: Vec<AqiSample>) {
        let features = {
            let mut state = self.shared.state.lock();
            state.samples = samples
                .into_iter()
                .map(|sample| MarkerFeature {
                    id: sample.id,
                    kind: MarkerKind::AqiSample,
                    position: sample.position,
                    color: color_for(sample.value),
                    label: Some(sample.value.to_string()),
                })
                .collect();
            collect_features(&state)
        };
        self.shared.subscribers.emit(&features);
    }

    /// Returns all features in draw order: samples first, current location
    /// on top.
    pub fn features(&self) -> Vec<MarkerFeature> {
        collect_features(&self.shared.state.lock())
    }

    /// Position of the current-location marker, if it exists.
    pub fn current_location(&self) -> Option<LonLat> {
        self.shared
            .state
            .lock()
            .current_location
            .as_ref()
            .map(|m| m.position)
    }

    /// Subscribes to change notifications carrying the full feature set.
    pub fn subscribe(
        &self,
        callback: impl Fn(&Vec<MarkerFeature>) + Send + Sync + 'static,
    ) -> OverlaySubscription {
        self.shared.subscribers.subscribe(callback)
    }

    /// Number of live change subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.len()
    }
}

impl Default for MarkerOverlay {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_features(state: &OverlayState) -> Vec<MarkerFeature> {
    let mut features = state.samples.clone();
    if let Some(current) = &state.current_location {
        features.push(current.clone());
    }
    features
}
