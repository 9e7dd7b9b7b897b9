//! Tile source descriptors and request URL building.
//!
//! A layer's imagery comes from one of two transports: an XYZ template URL
//! (street and satellite tiles) or a WMS endpoint queried with GetMap
//! parameters (the regional imagery proxy). Both are static configuration;
//! only the proxy endpoint varies per deployment.

use crate::coord::TileCoord;

/// Default street base layer template (OpenStreetMap).
pub const OSM_URL_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Default satellite base layer template (ArcGIS World Imagery).
pub const ARCGIS_IMAGERY_URL_TEMPLATE: &str =
    "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}";

/// Tile edge length in pixels, used for WMS GetMap requests.
const WMS_TILE_SIZE: u32 = 256;

/// Where a layer's tile images come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileSource {
    /// XYZ template with `{z}`, `{x}`, `{y}` placeholders.
    Xyz { url_template: String },

    /// WMS endpoint queried per tile with GetMap parameters.
    Wms {
        endpoint: String,
        layers: String,
        version: String,
        format: String,
    },
}

impl TileSource {
    /// Creates an XYZ source from a template URL.
    pub fn xyz(url_template: impl Into<String>) -> Self {
        Self::Xyz {
            url_template: url_template.into(),
        }
    }

    /// Creates a WMS source with the given GetMap parameters.
    pub fn wms(
        endpoint: impl Into<String>,
        layers: impl Into<String>,
        version: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self::Wms {
            endpoint: endpoint.into(),
            layers: layers.into(),
            version: version.into(),
            format: format.into(),
        }
    }

    /// Builds the request URL for one tile.
    pub fn url_for(&self, tile: TileCoord) -> String {
        match self {
            TileSource::Xyz { url_template } => url_template
                .replace("{z}", &tile.z.to_string())
                .replace("{x}", &tile.x.to_string())
                .replace("{y}", &tile.y.to_string()),
            TileSource::Wms {
                endpoint,
                layers,
                version,
                format,
            } => {
                let (min_x, min_y, max_x, max_y) = tile.mercator_bbox();
                format!(
                    "{}?SERVICE=WMS&REQUEST=GetMap&VERSION={}&LAYERS={}&FORMAT={}\
                     &SRS=EPSG:3857&WIDTH={}&HEIGHT={}&BBOX={:.2},{:.2},{:.2},{:.2}",
                    endpoint,
                    version,
                    layers,
                    format,
                    WMS_TILE_SIZE,
                    WMS_TILE_SIZE,
                    min_x,
                    min_y,
                    max_x,
                    max_y,
                )
            }
        }
    }
}
