//! Configuration file handling for `~/.vayumap/config.ini`.
//!
//! Loads and saves user configuration with sensible defaults. Tile and WMS
//! source descriptors are static configuration; the only runtime-varying
//! piece is the regional imagery proxy endpoint, which deployments point at
//! their own WMS proxy.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::controller::LOCATE_ZOOM;
use crate::coord::LonLat;
use crate::layers::{TileSource, ARCGIS_IMAGERY_URL_TEMPLATE, OSM_URL_TEMPLATE};
use crate::search::{DEFAULT_GEOCODER_USER_AGENT, DEFAULT_NOMINATIM_ENDPOINT, FOUND_ZOOM};
use crate::viewport::{DEFAULT_CENTER, DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM};

/// Default one-shot locate timeout in seconds.
pub const DEFAULT_LOCATE_TIMEOUT_SECS: u64 = 10;

/// WMS parameters used when a proxy endpoint is configured, matching the
/// regional imagery service behind the proxy.
pub const DEFAULT_WMS_LAYERS: &str = "india3,india5";
pub const DEFAULT_WMS_VERSION: &str = "1.1.1";
pub const DEFAULT_WMS_FORMAT: &str = "image/jpeg";

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

/// `[map]` section: viewport defaults and imagery sources.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    /// Viewport centre on mount.
    pub center: LonLat,
    /// Viewport zoom on mount.
    pub zoom: f64,
    /// Zoom applied after a successful one-shot locate.
    pub locate_zoom: f64,
    /// Zoom applied when a search result is found.
    pub found_zoom: f64,
    /// Street base XYZ template.
    pub street_template: String,
    /// Satellite base XYZ template.
    pub satellite_template: String,
    /// When set, the street base is served through this WMS proxy instead
    /// of the XYZ template.
    pub wms_proxy_endpoint: Option<String>,
    pub wms_layers: String,
    pub wms_version: String,
    pub wms_format: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            locate_zoom: LOCATE_ZOOM,
            found_zoom: FOUND_ZOOM,
            street_template: OSM_URL_TEMPLATE.to_string(),
            satellite_template: ARCGIS_IMAGERY_URL_TEMPLATE.to_string(),
            wms_proxy_endpoint: None,
            wms_layers: DEFAULT_WMS_LAYERS.to_string(),
            wms_version: DEFAULT_WMS_VERSION.to_string(),
            wms_format: DEFAULT_WMS_FORMAT.to_string(),
        }
    }
}

impl MapSettings {
    /// Source descriptor for the street base layer.
    pub fn street_source(&self) -> TileSource {
        match &self.wms_proxy_endpoint {
            Some(endpoint) => TileSource::wms(
                endpoint.clone(),
                self.wms_layers.clone(),
                self.wms_version.clone(),
                self.wms_format.clone(),
            ),
            None => TileSource::xyz(self.street_template.clone()),
        }
    }

    /// Source descriptor for the satellite base layer.
    pub fn satellite_source(&self) -> TileSource {
        TileSource::xyz(self.satellite_template.clone())
    }
}

/// `[search]` section: geocoder endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub endpoint: String,
    pub user_agent: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_NOMINATIM_ENDPOINT.to_string(),
            user_agent: DEFAULT_GEOCODER_USER_AGENT.to_string(),
        }
    }
}

/// `[tracker]` section: geolocation tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSettings {
    /// Seconds a one-shot locate waits before reporting unavailable.
    pub locate_timeout_secs: u64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            locate_timeout_secs: DEFAULT_LOCATE_TIMEOUT_SECS,
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub map: MapSettings,
    pub search: SearchSettings,
    pub tracker: TrackerSettings,
}

impl ConfigFile {
    /// Load configuration from the default path (`~/.vayumap/config.ini`).
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }
        std::fs::write(path, self.to_config_string())
            .map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }

    /// Serializes to INI text.
    pub fn to_config_string(&self) -> String {
        let mut out = String::new();
        out.push_str("[map]\n");
        out.push_str(&format!("center_lon = {}\n", self.map.center.lon));
        out.push_str(&format!("center_lat = {}\n", self.map.center.lat));
        out.push_str(&format!("zoom = {}\n", self.map.zoom));
        out.push_str(&format!("locate_zoom = {}\n", self.map.locate_zoom));
        out.push_str(&format!("found_zoom = {}\n", self.map.found_zoom));
        out.push_str(&format!("street_template = {}\n", self.map.street_template));
        out.push_str(&format!(
            "satellite_template = {}\n",
            self.map.satellite_template
        ));
        if let Some(endpoint) = &self.map.wms_proxy_endpoint {
            out.push_str(&format!("wms_proxy_endpoint = {}\n", endpoint));
        }
        out.push_str(&format!("wms_layers = {}\n", self.map.wms_layers));
        out.push_str(&format!("wms_version = {}\n", self.map.wms_version));
        out.push_str(&format!("wms_format = {}\n", self.map.wms_format));
        out.push('\n');
        out.push_str("[search]\n");
        out.push_str(&format!("endpoint = {}\n", self.search.endpoint));
        out.push_str(&format!("user_agent = {}\n", self.search.user_agent));
        out.push('\n');
        out.push_str("[tracker]\n");
        out.push_str(&format!(
            "locate_timeout_secs = {}\n",
            self.tracker.locate_timeout_secs
        ));
        out
    }
}

/// Parse an [`Ini`] object, overlaying values found in the file onto the
/// defaults.
fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    if let Some(section) = ini.section(Some("map")) {
        let lon = parse_f64(section.get("center_lon"), "map", "center_lon")?;
        let lat = parse_f64(section.get("center_lat"), "map", "center_lat")?;
        if let (Some(lon), Some(lat)) = (
            lon.or(Some(config.map.center.lon)),
            lat.or(Some(config.map.center.lat)),
        ) {
            config.map.center =
                LonLat::validated(lon, lat).map_err(|e| ConfigFileError::InvalidValue {
                    section: "map".to_string(),
                    key: "center_lon/center_lat".to_string(),
                    value: format!("{lon},{lat}"),
                    reason: e.to_string(),
                })?;
        }
        if let Some(zoom) = parse_zoom(section.get("zoom"), "zoom")? {
            config.map.zoom = zoom;
        }
        if let Some(zoom) = parse_zoom(section.get("locate_zoom"), "locate_zoom")? {
            config.map.locate_zoom = zoom;
        }
        if let Some(zoom) = parse_zoom(section.get("found_zoom"), "found_zoom")? {
            config.map.found_zoom = zoom;
        }
        if let Some(v) = non_empty(section.get("street_template")) {
            config.map.street_template = v;
        }
        if let Some(v) = non_empty(section.get("satellite_template")) {
            config.map.satellite_template = v;
        }
        config.map.wms_proxy_endpoint = non_empty(section.get("wms_proxy_endpoint"));
        if let Some(v) = non_empty(section.get("wms_layers")) {
            config.map.wms_layers = v;
        }
        if let Some(v) = non_empty(section.get("wms_version")) {
            config.map.wms_version = v;
        }
        if let Some(v) = non_empty(section.get("wms_format")) {
            config.map.wms_format = v;
        }
    }

    if let Some(section) = ini.section(Some("search")) {
        if let Some(v) = non_empty(section.get("endpoint")) {
            config.search.endpoint = v;
        }
        if let Some(v) = non_empty(section.get("user_agent")) {
            config.search.user_agent = v;
        }
    }

    if let Some(section) = ini.section(Some("tracker")) {
        if let Some(raw) = section.get("locate_timeout_secs") {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigFileError::InvalidValue {
                    section: "tracker".to_string(),
                    key: "locate_timeout_secs".to_string(),
                    value: raw.to_string(),
                    reason: "must be a positive integer".to_string(),
                })?;
            if secs == 0 {
                return Err(ConfigFileError::InvalidValue {
                    section: "tracker".to_string(),
                    key: "locate_timeout_secs".to_string(),
                    value: raw.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
            config.tracker.locate_timeout_secs = secs;
        }
    }

    Ok(config)
}

/// Parses a `[map]` zoom key, enforcing the viewport's zoom range.
fn parse_zoom(raw: Option<&str>, key: &str) -> Result<Option<f64>, ConfigFileError> {
    match parse_f64(raw, "map", key)? {
        None => Ok(None),
        Some(zoom) if (MIN_ZOOM..=MAX_ZOOM).contains(&zoom) => Ok(Some(zoom)),
        Some(zoom) => Err(ConfigFileError::InvalidValue {
            section: "map".to_string(),
            key: key.to_string(),
            value: zoom.to_string(),
            reason: format!("must be within {MIN_ZOOM}..={MAX_ZOOM}"),
        }),
    }
}

fn parse_f64(
    raw: Option<&str>,
    section: &str,
    key: &str,
) -> Result<Option<f64>, ConfigFileError> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigFileError::InvalidValue {
                section: section.to_string(),
                key: key.to_string(),
                value: raw.to_string(),
                reason: "must be a number".to_string(),
            }),
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Path to the config directory (`~/.vayumap`).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".vayumap")
}

/// Path to the config file (`~/.vayumap/config.ini`).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigFile::load_from(&dir.path().join("nope.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.map.center = LonLat::new(77.5946, 12.9716);
        config.map.zoom = 11.0;
        config.map.wms_proxy_endpoint =
            Some("http://localhost:5000/api/bhuvan-proxy/wms".to_string());
        config.tracker.locate_timeout_secs = 20;

        config.save_to(&path).unwrap();
        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_overlays_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[search]\nendpoint = http://geo.local/search\n").unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.search.endpoint, "http://geo.local/search");
        assert_eq!(config.map, MapSettings::default());
    }

    #[test]
    fn test_interaction_zooms_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[map]\nlocate_zoom = 13\nfound_zoom = 10\n").unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.map.locate_zoom, 13.0);
        assert_eq!(config.map.found_zoom, 10.0);
        // The mount zoom keeps its default.
        assert_eq!(config.map.zoom, MapSettings::default().zoom);
    }

    #[test]
    fn test_out_of_range_locate_zoom_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[map]\nlocate_zoom = 30\n").unwrap();

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigFileError::InvalidValue { .. }));
    }

    #[test]
    fn test_out_of_range_zoom_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[map]\nzoom = 25\n").unwrap();

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigFileError::InvalidValue { .. }));
    }

    #[test]
    fn test_invalid_center_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[map]\ncenter_lon = 200\ncenter_lat = 10\n").unwrap();

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigFileError::InvalidValue { .. }));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[tracker]\nlocate_timeout_secs = 0\n").unwrap();

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigFileError::InvalidValue { .. }));
    }

    #[test]
    fn test_wms_proxy_switches_street_source() {
        let mut settings = MapSettings::default();
        assert!(matches!(settings.street_source(), TileSource::Xyz { .. }));

        settings.wms_proxy_endpoint = Some("http://localhost:5000/wms".to_string());
        assert!(matches!(settings.street_source(), TileSource::Wms { .. }));
    }
}
