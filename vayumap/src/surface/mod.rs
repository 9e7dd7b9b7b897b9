//! Map surface lifecycle.
//!
//! The surface is the rendering target: `Unmounted → Mounted → Unmounted`.
//! On mount it binds the drawing engine, attaches the layer stack in fixed
//! z-order and subscribes to viewport and marker changes; every notification
//! becomes a same-tick redraw. On unmount every subscription is dropped
//! before the engine is released, so nothing can render into a dead engine.

mod engine;

pub use engine::{DrawingEngine, HeadlessEngine, RenderFrame};

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::layers::LayerRegistry;
use crate::markers::MarkerOverlay;
use crate::notify::Subscription;
use crate::viewport::{Viewport, ViewportSnapshot};

/// A mounted map surface.
///
/// Existence of the value is the `Mounted` state; [`MapSurface::unmount`]
/// consumes it.
pub struct MapSurface {
    engine: Arc<Mutex<Box<dyn DrawingEngine>>>,
    // Subscriptions are dropped before the engine is released in unmount().
    viewport_sub: Option<Subscription<ViewportSnapshot>>,
    overlay_sub: Option<Subscription<Vec<crate::markers::MarkerFeature>>>,
}

impl MapSurface {
    /// Mounts the surface: binds the engine, attaches layers and subscribes
    /// to state changes. An initial frame is rendered immediately.
    pub fn mount(
        mut engine: Box<dyn DrawingEngine>,
        viewport: &Viewport,
        registry: &LayerRegistry,
        overlay: &MarkerOverlay,
    ) -> Self {
        engine.attach_layers(&registry.z_ordered());
        let engine = Arc::new(Mutex::new(engine));

        let redraw = {
            let engine = Arc::clone(&engine);
            let viewport = viewport.clone();
            let registry = registry.clone();
            let overlay = overlay.clone();
            move || {
                let frame = compose_frame(&viewport, &registry, &overlay);
                engine.lock().render(&frame);
            }
        };

        redraw();

        let viewport_sub = {
            let redraw = redraw.clone();
            viewport.subscribe(move |_| redraw())
        };
        let overlay_sub = overlay.subscribe(move |_| redraw());

        debug!("map surface mounted");
        Self {
            engine,
            viewport_sub: Some(viewport_sub),
            overlay_sub: Some(overlay_sub),
        }
    }

    /// Unmounts the surface, releasing the drawing engine.
    ///
    /// Subscriptions are torn down first; once this returns, no state change
    /// reaches the engine.
    pub fn unmount(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.viewport_sub.take();
        self.overlay_sub.take();
        self.engine.lock().release();
        debug!("map surface unmounted");
    }
}

impl Drop for MapSurface {
    fn drop(&mut self) {
        if self.viewport_sub.is_some() || self.overlay_sub.is_some() {
            self.teardown();
        }
    }
}

/// Derives a render frame from the latest state. Pure: no side effects, no
/// mutation.
fn compose_frame(
    viewport: &Viewport,
    registry: &LayerRegistry,
    overlay: &MarkerOverlay,
) -> RenderFrame {
    let snapshot = viewport.snapshot();
    RenderFrame {
        center: snapshot.center.to_mercator(),
        zoom: snapshot.zoom,
        visible_layers: registry.visible_layer_ids(),
        markers: overlay.features(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aqi::AqiSample;
    use crate::coord::LonLat;
    use crate::layers::{MARKER_LAYER_ID, SATELLITE_LAYER_ID, STREET_LAYER_ID};
    use crate::viewport::BaseLayerKind;

    fn mounted() -> (HeadlessEngine, Viewport, LayerRegistry, MarkerOverlay, MapSurface) {
        let engine = HeadlessEngine::new();
        let viewport = Viewport::new();
        let registry = LayerRegistry::new();
        let overlay = MarkerOverlay::new();
        let surface = MapSurface::mount(
            Box::new(engine.clone()),
            &viewport,
            &registry,
            &overlay,
        );
        (engine, viewport, registry, overlay, surface)
    }

    #[test]
    fn test_mount_attaches_layers_in_z_order() {
        let (engine, _viewport, _registry, _overlay, _surface) = mounted();
        assert_eq!(
            engine.attached_layers(),
            vec![
                STREET_LAYER_ID.to_string(),
                SATELLITE_LAYER_ID.to_string(),
                MARKER_LAYER_ID.to_string(),
            ]
        );
    }

    #[test]
    fn test_mount_renders_initial_frame() {
        let (engine, viewport, _registry, _overlay, _surface) = mounted();
        assert_eq!(engine.frame_count(), 1);

        let frame = engine.last_frame().unwrap();
        assert_eq!(frame.zoom, viewport.snapshot().zoom);
        assert!(frame.visible_layers.contains(&STREET_LAYER_ID.to_string()));
    }

    #[test]
    fn test_viewport_change_redraws_same_tick() {
        let (engine, viewport, _registry, _overlay, _surface) = mounted();
        let before = engine.frame_count();

        viewport.set_zoom(9.0);

        assert_eq!(engine.frame_count(), before + 1);
        assert_eq!(engine.last_frame().unwrap().zoom, 9.0);
    }

    #[test]
    fn test_marker_change_redraws() {
        let (engine, _viewport, _registry, overlay, _surface) = mounted();
        let before = engine.frame_count();

        overlay.set_aqi_samples(vec![AqiSample {
            id: "blr".to_string(),
            position: LonLat::new(77.5946, 12.9716),
            value: 150,
        }]);

        assert_eq!(engine.frame_count(), before + 1);
        assert_eq!(engine.last_frame().unwrap().markers.len(), 1);
    }

    #[test]
    fn test_base_swap_reflected_in_frame() {
        let (engine, viewport, registry, _overlay, _surface) = mounted();

        registry.select_base(BaseLayerKind::Satellite);
        viewport.set_base_layer(BaseLayerKind::Satellite);

        let frame = engine.last_frame().unwrap();
        assert!(frame
            .visible_layers
            .contains(&SATELLITE_LAYER_ID.to_string()));
        assert!(!frame.visible_layers.contains(&STREET_LAYER_ID.to_string()));
    }

    #[test]
    fn test_unmount_releases_engine_and_subscriptions() {
        let (engine, viewport, _registry, overlay, surface) = mounted();

        surface.unmount();

        assert!(engine.released());
        assert_eq!(viewport.subscriber_count(), 0);
        assert_eq!(overlay.subscriber_count(), 0);
    }

    #[test]
    fn test_no_render_after_unmount() {
        let (engine, viewport, _registry, _overlay, surface) = mounted();
        surface.unmount();
        let frames = engine.frame_count();

        viewport.set_zoom(10.0);

        assert_eq!(engine.frame_count(), frames);
    }

    #[test]
    fn test_drop_also_releases_engine() {
        let (engine, _viewport, _registry, _overlay, surface) = mounted();
        drop(surface);
        assert!(engine.released());
    }
}
