//! Geocoder seam and the Nominatim implementation.
//!
//! The search flow treats geocoding as `query -> coordinate | not found`,
//! regardless of transport. [`NominatimGeocoder`] resolves free text against
//! the OpenStreetMap Nominatim API.

use futures::future::BoxFuture;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::coord::LonLat;

/// Default Nominatim endpoint.
pub const DEFAULT_NOMINATIM_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

/// Default User-Agent sent to the geocoder, as its usage policy requires.
pub const DEFAULT_GEOCODER_USER_AGENT: &str = "vayumap/0.1";

/// Request timeout for geocode lookups.
const GEOCODE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Failures while resolving a query. The search flow reports all of these
/// to the user as "location not found".
#[derive(Debug, Clone, Error)]
pub enum GeocodeError {
    /// Transport-level failure (connection, timeout, HTTP status).
    #[error("geocoder request failed: {0}")]
    Transport(String),

    /// The service answered with something unparseable.
    #[error("malformed geocoder response: {0}")]
    Malformed(String),
}

/// Free-text to coordinate resolution.
pub trait Geocoder: Send + Sync {
    /// Resolves a query to its best-match coordinate.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the service has no match for the query.
    fn geocode<'a>(&'a self, query: &'a str)
        -> BoxFuture<'a, Result<Option<LonLat>, GeocodeError>>;
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// Geocoder backed by the OpenStreetMap Nominatim API.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    endpoint: String,
}

impl NominatimGeocoder {
    /// Creates a geocoder against the default public endpoint.
    pub fn new() -> Result<Self, GeocodeError> {
        Self::with_endpoint(DEFAULT_NOMINATIM_ENDPOINT, DEFAULT_GEOCODER_USER_AGENT)
    }

    /// Creates a geocoder against a custom endpoint (self-hosted instance
    /// or test server).
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        user_agent: &str,
    ) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(GEOCODE_TIMEOUT)
            .build()
            .map_err(|e| GeocodeError::Transport(format!("failed to build client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode<'a>(
        &'a self,
        query: &'a str,
    ) -> BoxFuture<'a, Result<Option<LonLat>, GeocodeError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(&self.endpoint)
                .query(&[("q", query), ("format", "json"), ("limit", "1")])
                .send()
                .await
                .map_err(|e| GeocodeError::Transport(e.to_string()))?;

            if !response.status().is_success() {
                return Err(GeocodeError::Transport(format!(
                    "HTTP {} from geocoder",
                    response.status()
                )));
            }

            let places: Vec<NominatimPlace> = response
                .json()
                .await
                .map_err(|e| GeocodeError::Malformed(e.to_string()))?;

            let Some(place) = places.into_iter().next() else {
                debug!(%query, "geocoder returned no match");
                return Ok(None);
            };

            let lon: f64 = place
                .lon
                .parse()
                .map_err(|_| GeocodeError::Malformed(format!("bad longitude: {}", place.lon)))?;
            let lat: f64 = place
                .lat
                .parse()
                .map_err(|_| GeocodeError::Malformed(format!("bad latitude: {}", place.lat)))?;

            let coord = LonLat::validated(lon, lat)
                .map_err(|e| GeocodeError::Malformed(e.to_string()))?;
            Ok(Some(coord))
        })
    }
}
