//! Viewport state: the single source of truth for what the map displays.
//!
//! Holds the centre coordinate, zoom level and active base-layer selection.
//! All other components go through this module to move the map; the map
//! surface subscribes here and redraws whenever the state changes.
//!
//! Setters are synchronous and have no side effect beyond the state mutation
//! and the change notification: rendering is a pure function of the latest
//! snapshot.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::coord::{CoordError, LonLat};
use crate::notify::{Subscribers, Subscription};

/// Lowest zoom level the viewport accepts.
pub const MIN_ZOOM: f64 = 4.0;
/// Highest zoom level the viewport accepts.
pub const MAX_ZOOM: f64 = 20.0;

/// Default centre on mount: geographic centre of India.
pub const DEFAULT_CENTER: LonLat = LonLat {
    lon: 78.9629,
    lat: 20.5937,
};
/// Default zoom on mount: country-wide view.
pub const DEFAULT_ZOOM: f64 = 5.0;

/// Selectable base layers. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseLayerKind {
    /// Street map tiles.
    Street,
    /// Satellite imagery tiles.
    Satellite,
}

/// Point-in-time copy of the viewport, handed to change subscribers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSnapshot {
    pub center: LonLat,
    pub zoom: f64,
    pub active_base: BaseLayerKind,
}

struct ViewportState {
    center: LonLat,
    zoom: f64,
    active_base: BaseLayerKind,
}

impl ViewportState {
    fn snapshot(&self) -> ViewportSnapshot {
        ViewportSnapshot {
            center: self.center,
            zoom: self.zoom,
            active_base: self.active_base,
        }
    }
}

struct Shared {
    state: Mutex<ViewportState>,
    subscribers: Subscribers<ViewportSnapshot>,
}

/// Handle to the shared viewport state. Cheap to clone.
#[derive(Clone)]
pub struct Viewport {
    shared: Arc<Shared>,
}

/// Subscription guard for viewport change notifications.
pub type ViewportSubscription = Subscription<ViewportSnapshot>;

impl Viewport {
    /// Creates a viewport at the default centre and zoom.
    pub fn new() -> Self {
        Self::with_initial(DEFAULT_CENTER, DEFAULT_ZOOM, BaseLayerKind::Street)
    }

    /// Creates a viewport with an explicit initial state.
    ///
    /// The initial zoom is clamped the same way [`Viewport::set_zoom`] clamps.
    pub fn with_initial(center: LonLat, zoom: f64, active_base: BaseLayerKind) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ViewportState {
                    center,
                    zoom: clamp_zoom(zoom),
                    active_base,
                }),
                subscribers: Subscribers::new(),
            }),
        }
    }

    /// Replaces the centre coordinate.
    ///
    /// Fails with [`CoordError`] if the coordinate is outside the geographic
    /// range; the viewport is left unchanged in that case.
    pub fn set_center(&self, center: LonLat) -> Result<(), CoordError> {
        center.validate()?;
        let snapshot = {
            let mut state = self.shared.state.lock();
            state.center = center;
            state.snapshot()
        };
        debug!(center = %center, "viewport recentred");
        self.shared.subscribers.emit(&snapshot);
        Ok(())
    }

    /// Sets the zoom level, silently clamping to `[MIN_ZOOM, MAX_ZOOM]`.
    pub fn set_zoom(&self, zoom: f64) {
        let snapshot = {
            let mut state = self.shared.state.lock();
            state.zoom = clamp_zoom(zoom);
            state.snapshot()
        };
        self.shared.subscribers.emit(&snapshot);
    }

    /// Zooms in one level.
    pub fn zoom_in(&self) {
        let current = self.shared.state.lock().zoom;
        self.set_zoom(current + 1.0);
    }

    /// Zooms out one level.
    pub fn zoom_out(&self) {
        let current = self.shared.state.lock().zoom;
        self.set_zoom(current - 1.0);
    }

    /// Records the active base layer selection.
    ///
    /// This is the only writer of the selection; layer visibility flags are
    /// swapped by the layer registry as part of the same user intent.
    pub fn set_base_layer(&self, kind: BaseLayerKind) {
        let snapshot = {
            let mut state = self.shared.state.lock();
            state.active_base = kind;
            state.snapshot()
        };
        self.shared.subscribers.emit(&snapshot);
    }

    /// Returns a point-in-time copy of the state.
    pub fn snapshot(&self) -> ViewportSnapshot {
        self.shared.state.lock().snapshot()
    }

    /// Subscribes to change notifications.
    ///
    /// The callback runs synchronously on the mutating caller's stack, once
    /// per successful mutation. Dropping the returned guard unsubscribes.
    pub fn subscribe(
        &self,
        callback: impl Fn(&ViewportSnapshot) + Send + Sync + 'static,
    ) -> ViewportSubscription {
        self.shared.subscribers.subscribe(callback)
    }

    /// Number of live change subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.len()
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        return MIN_ZOOM;
    }
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_defaults_match_country_view() {
        let viewport = Viewport::new();
        let snap = viewport.snapshot();
        assert_eq!(snap.center, DEFAULT_CENTER);
        assert_eq!(snap.zoom, DEFAULT_ZOOM);
        assert_eq!(snap.active_base, BaseLayerKind::Street);
    }

    #[test]
    fn test_set_center_updates_and_notifies() {
        let viewport = Viewport::new();
        let notified = Arc::new(AtomicUsize::new(0));
        let n = Arc::clone(&notified);
        let _sub = viewport.subscribe(move |_| {
            n.fetch_add(1, Ordering::SeqCst);
        });

        viewport.set_center(LonLat::new(77.5946, 12.9716)).unwrap();

        assert_eq!(viewport.snapshot().center, LonLat::new(77.5946, 12.9716));
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalid_center_rejected_and_state_unchanged() {
        let viewport = Viewport::new();
        let notified = Arc::new(AtomicUsize::new(0));
        let n = Arc::clone(&notified);
        let _sub = viewport.subscribe(move |_| {
            n.fetch_add(1, Ordering::SeqCst);
        });

        assert!(viewport.set_center(LonLat::new(181.0, 0.0)).is_err());
        assert!(viewport.set_center(LonLat::new(0.0, 91.0)).is_err());

        assert_eq!(viewport.snapshot().center, DEFAULT_CENTER);
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_zoom_clamped_silently() {
        let viewport = Viewport::new();

        viewport.set_zoom(100.0);
        assert_eq!(viewport.snapshot().zoom, MAX_ZOOM);

        viewport.set_zoom(-3.0);
        assert_eq!(viewport.snapshot().zoom, MIN_ZOOM);

        viewport.set_zoom(12.0);
        assert_eq!(viewport.snapshot().zoom, 12.0);
    }

    #[test]
    fn test_zoom_in_and_out_step_by_one() {
        let viewport = Viewport::new();
        viewport.set_zoom(12.0);
        viewport.zoom_in();
        assert_eq!(viewport.snapshot().zoom, 13.0);
        viewport.zoom_out();
        viewport.zoom_out();
        assert_eq!(viewport.snapshot().zoom, 11.0);
    }

    #[test]
    fn test_zoom_at_limits_stays_clamped() {
        let viewport = Viewport::new();
        viewport.set_zoom(MAX_ZOOM);
        viewport.zoom_in();
        assert_eq!(viewport.snapshot().zoom, MAX_ZOOM);

        viewport.set_zoom(MIN_ZOOM);
        viewport.zoom_out();
        assert_eq!(viewport.snapshot().zoom, MIN_ZOOM);
    }

    #[test]
    fn test_base_layer_switch_notifies() {
        let viewport = Viewport::new();
        viewport.set_base_layer(BaseLayerKind::Satellite);
        assert_eq!(viewport.snapshot().active_base, BaseLayerKind::Satellite);
    }

    #[test]
    fn test_dropped_subscription_is_removed() {
        let viewport = Viewport::new();
        let sub = viewport.subscribe(|_| {});
        assert_eq!(viewport.subscriber_count(), 1);
        drop(sub);
        assert_eq!(viewport.subscriber_count(), 0);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_zoom_always_within_bounds(zoom in -1000.0..1000.0_f64) {
                let viewport = Viewport::new();
                viewport.set_zoom(zoom);
                let result = viewport.snapshot().zoom;
                prop_assert!((MIN_ZOOM..=MAX_ZOOM).contains(&result));
            }

            #[test]
            fn test_zoom_clamp_idempotent(zoom in -1000.0..1000.0_f64) {
                let viewport = Viewport::new();
                viewport.set_zoom(zoom);
                let once = viewport.snapshot().zoom;
                viewport.set_zoom(once);
                prop_assert_eq!(viewport.snapshot().zoom, once);
            }

            #[test]
            fn test_invalid_center_never_applied(
                lon in 181.0..10_000.0_f64,
                lat in -90.0..90.0_f64,
            ) {
                let viewport = Viewport::new();
                prop_assert!(viewport.set_center(LonLat::new(lon, lat)).is_err());
                prop_assert_eq!(viewport.snapshot().center, DEFAULT_CENTER);
            }
        }
    }
}
