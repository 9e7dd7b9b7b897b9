//! Coordinate types and conversions.
//!
//! Provides the geographic (WGS84 longitude/latitude) coordinate used
//! throughout the map core, the projected Web Mercator frame used by the
//! drawing engine, and slippy-map tile addressing used when building tile
//! and WMS requests.

use std::f64::consts::PI;

use thiserror::Error;

/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;
/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;
/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;
/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;

/// Latitude limit of the Web Mercator projection.
///
/// Latitudes beyond this are clamped before projecting; the projection
/// diverges towards the poles.
pub const MERCATOR_MAX_LAT: f64 = 85.051_128_78;

/// Mean Earth radius used by the spherical Mercator projection, in metres.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Errors produced when validating geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordError {
    /// Longitude outside [-180, 180] degrees.
    #[error("invalid longitude: {0} (expected -180..=180)")]
    InvalidLongitude(f64),

    /// Latitude outside [-90, 90] degrees.
    #[error("invalid latitude: {0} (expected -90..=90)")]
    InvalidLatitude(f64),
}

/// A geographic coordinate: longitude and latitude in degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLat {
    /// Longitude in degrees, positive east.
    pub lon: f64,
    /// Latitude in degrees, positive north.
    pub lat: f64,
}

impl LonLat {
    /// Creates a coordinate without validating it.
    ///
    /// Use [`LonLat::validated`] when the values come from outside the core
    /// (sensor fixes, geocoder responses, user input).
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Creates a coordinate, rejecting out-of-range values.
    pub fn validated(lon: f64, lat: f64) -> Result<Self, CoordError> {
        let coord = Self { lon, lat };
        coord.validate()?;
        Ok(coord)
    }

    /// Checks that the coordinate lies within the geographic reference frame.
    pub fn validate(&self) -> Result<(), CoordError> {
        if !(MIN_LON..=MAX_LON).contains(&self.lon) || !self.lon.is_finite() {
            return Err(CoordError::InvalidLongitude(self.lon));
        }
        if !(MIN_LAT..=MAX_LAT).contains(&self.lat) || !self.lat.is_finite() {
            return Err(CoordError::InvalidLatitude(self.lat));
        }
        Ok(())
    }

    /// Projects into the Web Mercator frame (EPSG:3857).
    ///
    /// Latitude is clamped to the Mercator limit so polar coordinates stay
    /// finite.
    pub fn to_mercator(&self) -> Mercator {
        let lat = self.lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT);
        let x = self.lon.to_radians() * EARTH_RADIUS_M;
        let y = ((PI / 4.0) + (lat.to_radians() / 2.0)).tan().ln() * EARTH_RADIUS_M;
        Mercator { x, y }
    }
}

impl std::fmt::Display for LonLat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lon, self.lat)
    }
}

/// A projected coordinate in the Web Mercator frame (EPSG:3857, metres).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mercator {
    /// Easting in metres.
    pub x: f64,
    /// Northing in metres.
    pub y: f64,
}

impl Mercator {
    /// Unprojects back to geographic longitude/latitude.
    pub fn to_lon_lat(&self) -> LonLat {
        let lon = (self.x / EARTH_RADIUS_M).to_degrees();
        let lat = (2.0 * (self.y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
        LonLat { lon, lat }
    }
}

/// A slippy-map tile address at a given zoom level.
///
/// `x` runs west to east, `y` north to south, matching the XYZ scheme the
/// street and satellite tile servers use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Tile column (0 to 2^z - 1, west to east).
    pub x: u32,
    /// Tile row (0 to 2^z - 1, north to south).
    pub y: u32,
    /// Zoom level.
    pub z: u8,
}

impl TileCoord {
    /// Computes the tile containing a geographic coordinate at a zoom level.
    ///
    /// # Returns
    ///
    /// The tile address, or an error if the coordinate is out of range.
    pub fn containing(coord: LonLat, zoom: u8) -> Result<Self, CoordError> {
        coord.validate()?;
        let n = 2.0_f64.powi(zoom as i32);
        let lat = coord.lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT);

        let x = (((coord.lon + 180.0) / 360.0 * n) as u32).min(n as u32 - 1);
        let lat_rad = lat.to_radians();
        let y = ((((1.0 - lat_rad.tan().asinh() / PI) / 2.0) * n) as u32).min(n as u32 - 1);

        Ok(Self { x, y, z: zoom })
    }

    /// Returns the geographic coordinate of this tile's northwest corner.
    pub fn northwest(&self) -> LonLat {
        let n = 2.0_f64.powi(self.z as i32);
        let lon = self.x as f64 / n * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * self.y as f64 / n)).sinh().atan().to_degrees();
        LonLat { lon, lat }
    }

    /// Returns the tile's bounding box in Web Mercator metres.
    ///
    /// The box is `(min_x, min_y, max_x, max_y)`, the axis order WMS GetMap
    /// requests expect for EPSG:3857.
    pub fn mercator_bbox(&self) -> (f64, f64, f64, f64) {
        let nw = self.northwest().to_mercator();
        let se = TileCoord {
            x: self.x + 1,
            y: self.y + 1,
            z: self.z,
        }
        .northwest()
        .to_mercator();
        (nw.x, se.y, se.x, nw.y)
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}
