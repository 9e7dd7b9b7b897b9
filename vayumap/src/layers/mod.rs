//! Layer registry: the declarative set of map layers.
//!
//! Two base layers (street, satellite) of which exactly one is visible at a
//! time, plus the marker overlay which is always visible and sits above both
//! bases in z-order. Base visibility is swapped atomically by
//! [`LayerRegistry::select_base`]; there is never a moment with zero or two
//! visible base layers.

mod fetch;
mod source;

pub use fetch::TileFetcher;
pub use source::{TileSource, ARCGIS_IMAGERY_URL_TEMPLATE, OSM_URL_TEMPLATE};

use std::sync::Arc;

use parking_lot::Mutex;

use crate::viewport::BaseLayerKind;

/// Stable identifier of the street base layer.
pub const STREET_LAYER_ID: &str = "base-street";
/// Stable identifier of the satellite base layer.
pub const SATELLITE_LAYER_ID: &str = "base-satellite";
/// Stable identifier of the marker overlay layer.
pub const MARKER_LAYER_ID: &str = "overlay-markers";

/// What role a layer plays in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Full-coverage street background.
    BaseStreet,
    /// Full-coverage satellite background.
    BaseSatellite,
    /// Marker overlay drawn above the bases.
    Overlay,
}

impl LayerKind {
    /// Whether this is one of the mutually exclusive base layers.
    pub fn is_base(&self) -> bool {
        matches!(self, LayerKind::BaseStreet | LayerKind::BaseSatellite)
    }
}

impl From<BaseLayerKind> for LayerKind {
    fn from(kind: BaseLayerKind) -> Self {
        match kind {
            BaseLayerKind::Street => LayerKind::BaseStreet,
            BaseLayerKind::Satellite => LayerKind::BaseSatellite,
        }
    }
}

/// Declarative description of one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDescriptor {
    /// Stable layer identifier.
    pub id: String,
    pub kind: LayerKind,
    pub visible: bool,
    /// Imagery source; `None` for the marker overlay, which is drawn from
    /// marker features rather than tiles.
    pub source: Option<TileSource>,
}

/// Handle to the layer set. Cheap to clone.
#[derive(Clone)]
pub struct LayerRegistry {
    layers: Arc<Mutex<Vec<LayerDescriptor>>>,
}

impl LayerRegistry {
    /// Builds the default registry: OSM street base (visible), ArcGIS
    /// satellite base (hidden), marker overlay (always visible).
    pub fn new() -> Self {
        Self::with_sources(
            TileSource::xyz(OSM_URL_TEMPLATE),
            TileSource::xyz(ARCGIS_IMAGERY_URL_TEMPLATE),
        )
    }

    /// Builds a registry with explicit base sources.
    ///
    /// Used when configuration overrides a base with a WMS proxy source.
    pub fn with_sources(street: TileSource, satellite: TileSource) -> Self {
        let layers = vec![
            LayerDescriptor {
                id: STREET_LAYER_ID.to_string(),
                kind: LayerKind::BaseStreet,
                visible: true,
                source: Some(street),
            },
            LayerDescriptor {
                id: SATELLITE_LAYER_ID.to_string(),
                kind: LayerKind::BaseSatellite,
                visible: false,
                source: Some(satellite),
            },
            LayerDescriptor {
                id: MARKER_LAYER_ID.to_string(),
                kind: LayerKind::Overlay,
                visible: true,
                source: None,
            },
        ];
        Self {
            layers: Arc::new(Mutex::new(layers)),
        }
    }

    /// Makes the chosen base layer visible and every other base hidden.
    ///
    /// The swap happens in one pass under the registry lock, so observers
    /// never see zero or two visible base layers.
    pub fn select_base(&self, kind: BaseLayerKind) {
        let selected: LayerKind = kind.into();
        let mut layers = self.layers.lock();
        for layer in layers.iter_mut().filter(|l| l.kind.is_base()) {
            layer.visible = layer.kind == selected;
        }
    }

    /// Returns all layers in draw order: base layers first, overlay last.
    pub fn z_ordered(&self) -> Vec<LayerDescriptor> {
        let layers = self.layers.lock();
        let mut ordered: Vec<LayerDescriptor> =
            layers.iter().filter(|l| l.kind.is_base()).cloned().collect();
        ordered.extend(layers.iter().filter(|l| !l.kind.is_base()).cloned());
        ordered
    }

    /// Identifiers of the currently visible layers, in draw order.
    pub fn visible_layer_ids(&self) -> Vec<String> {
        self.z_ordered()
            .into_iter()
            .filter(|l| l.visible)
            .map(|l| l.id)
            .collect()
    }

    /// Number of visible base layers. Invariant: always exactly one.
    pub fn visible_base_count(&self) -> usize {
        self.layers
            .lock()
            .iter()
            .filter(|l| l.kind.is_base() && l.visible)
            .count()
    }
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_show_street_and_overlay() {
        let registry = LayerRegistry::new();
        assert_eq!(
            registry.visible_layer_ids(),
            vec![STREET_LAYER_ID.to_string(), MARKER_LAYER_ID.to_string()]
        );
    }

    #[test]
    fn test_select_satellite_swaps_bases() {
        let registry = LayerRegistry::new();
        registry.select_base(BaseLayerKind::Satellite);
        assert_eq!(
            registry.visible_layer_ids(),
            vec![SATELLITE_LAYER_ID.to_string(), MARKER_LAYER_ID.to_string()]
        );
    }

    #[test]
    fn test_exactly_one_base_visible_for_any_sequence() {
        let registry = LayerRegistry::new();
        let sequence = [
            BaseLayerKind::Satellite,
            BaseLayerKind::Satellite,
            BaseLayerKind::Street,
            BaseLayerKind::Satellite,
            BaseLayerKind::Street,
            BaseLayerKind::Street,
        ];
        for kind in sequence {
            registry.select_base(kind);
            assert_eq!(registry.visible_base_count(), 1);
        }
    }

    #[test]
    fn test_overlay_always_visible() {
        let registry = LayerRegistry::new();
        registry.select_base(BaseLayerKind::Satellite);
        registry.select_base(BaseLayerKind::Street);
        assert!(registry
            .visible_layer_ids()
            .contains(&MARKER_LAYER_ID.to_string()));
    }

    #[test]
    fn test_z_order_puts_overlay_last() {
        let registry = LayerRegistry::new();
        let ordered = registry.z_ordered();
        assert_eq!(ordered.last().unwrap().kind, LayerKind::Overlay);
    }

    #[test]
    fn test_wms_base_source_honoured() {
        let registry = LayerRegistry::with_sources(
            TileSource::wms(
                "http://localhost:5000/api/bhuvan-proxy/wms",
                "india3,india5",
                "1.1.1",
                "image/jpeg",
            ),
            TileSource::xyz(ARCGIS_IMAGERY_URL_TEMPLATE),
        );
        let street = registry
            .z_ordered()
            .into_iter()
            .find(|l| l.kind == LayerKind::BaseStreet)
            .unwrap();
        assert!(matches!(street.source, Some(TileSource::Wms { .. })));
    }
}
