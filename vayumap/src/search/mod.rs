//! Search and recenter flow.
//!
//! Takes free-text input, resolves it through the geocoder seam and
//! recentres the viewport on the result. Only the most recent in-flight
//! search may touch the viewport: each search takes a ticket from a
//! monotonically increasing sequence and compares it against the sequence
//! at response time, so a stale response is discarded silently rather than
//! clobbering a newer result (the transport itself is never cancelled).

mod geocoder;

pub use geocoder::{
    GeocodeError, Geocoder, NominatimGeocoder, DEFAULT_GEOCODER_USER_AGENT,
    DEFAULT_NOMINATIM_ENDPOINT,
};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::coord::LonLat;
use crate::viewport::Viewport;

/// Zoom applied when a search result is found.
pub const FOUND_ZOOM: f64 = 12.0;

/// Search failures reported to the user. The viewport is unchanged in
/// every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The trimmed query was empty; no lookup was issued.
    #[error("search query is empty")]
    EmptyQuery,

    /// The geocoder had no match, or the lookup failed.
    #[error("location not found")]
    LocationNotFound,
}

/// How a completed search ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchOutcome {
    /// The viewport was recentred on the resolved coordinate.
    Recentred(LonLat),
    /// A newer search was issued while this one was in flight; its result
    /// was discarded and nothing reported.
    Superseded,
}

/// Handle to the search flow. Cheap to clone.
#[derive(Clone)]
pub struct SearchFlow {
    geocoder: Arc<dyn Geocoder>,
    viewport: Viewport,
    sequence: Arc<AtomicU64>,
    found_zoom: f64,
}

impl SearchFlow {
    /// Creates a search flow recentring the given viewport.
    pub fn new(geocoder: Arc<dyn Geocoder>, viewport: Viewport) -> Self {
        Self::with_found_zoom(geocoder, viewport, FOUND_ZOOM)
    }

    /// Creates a search flow with an explicit "found" zoom level.
    pub fn with_found_zoom(geocoder: Arc<dyn Geocoder>, viewport: Viewport, found_zoom: f64) -> Self {
        Self {
            geocoder,
            viewport,
            sequence: Arc::new(AtomicU64::new(0)),
            found_zoom,
        }
    }

    /// Resolves a query and recentres the viewport on the result.
    ///
    /// Last-request-wins: when a newer search is issued before this one
    /// resolves, this one's outcome is [`SearchOutcome::Superseded`] and the
    /// viewport is untouched, whatever the geocoder answered.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let ticket = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(%query, ticket, "search issued");

        let resolved = self.geocoder.geocode(query).await;

        if self.sequence.load(Ordering::SeqCst) != ticket {
            debug!(%query, ticket, "search superseded, result discarded");
            return Ok(SearchOutcome::Superseded);
        }

        match resolved {
            Ok(Some(coord)) => {
                // The geocoder validated the coordinate; a failure here
                // means it slipped through, treat it as no match.
                if self.viewport.set_center(coord).is_err() {
                    return Err(SearchError::LocationNotFound);
                }
                self.viewport.set_zoom(self.found_zoom);
                debug!(%query, position = %coord, "search recentred viewport");
                Ok(SearchOutcome::Recentred(coord))
            }
            Ok(None) => Err(SearchError::LocationNotFound),
            Err(error) => {
                warn!(%query, %error, "geocode lookup failed");
                Err(SearchError::LocationNotFound)
            }
        }
    }

    /// Invalidates every in-flight search.
    ///
    /// Used on unmount so a response arriving afterwards cannot touch the
    /// viewport.
    pub fn invalidate(&self) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
    }
}
