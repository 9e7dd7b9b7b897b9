//! Tile image fetching.
//!
//! Pulls tile images over HTTP for whatever source a layer declares. Tile
//! failures are a rendering concern, not an application error: a failed
//! fetch is logged and the tile is simply missing from the frame. Responses
//! are cached in memory keyed by URL so panning back over an area does not
//! re-download it.

use std::time::Duration;

use bytes::Bytes;
use moka::future::Cache;
use tracing::debug;

use crate::coord::TileCoord;
use crate::layers::TileSource;

/// Default request timeout for tile downloads.
const TILE_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Default number of tiles kept in the in-memory cache.
const DEFAULT_CACHE_CAPACITY: u64 = 512;

/// Asynchronous tile downloader with an in-memory cache.
pub struct TileFetcher {
    client: reqwest::Client,
    cache: Cache<String, Bytes>,
}

impl TileFetcher {
    /// Creates a fetcher with the default cache capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a fetcher caching up to `capacity` tiles.
    pub fn with_capacity(capacity: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(TILE_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            cache: Cache::new(capacity),
        }
    }

    /// Fetches one tile image from the given source.
    ///
    /// # Returns
    ///
    /// The image bytes, or `None` when the request fails for any reason.
    /// Failures degrade visually (a missing tile); they are never surfaced
    /// as application errors.
    pub async fn fetch(&self, source: &TileSource, tile: TileCoord) -> Option<Bytes> {
        let url = source.url_for(tile);

        if let Some(cached) = self.cache.get(&url).await {
            return Some(cached);
        }

        match self.download(&url).await {
            Ok(body) => {
                self.cache.insert(url, body.clone()).await;
                Some(body)
            }
            Err(reason) => {
                debug!(tile = %tile, %reason, "tile fetch failed, rendering as missing");
                None
            }
        }
    }

    async fn download(&self, url: &str) -> Result<Bytes, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }
        response.bytes().await.map_err(|e| e.to_string())
    }
}

impl Default for TileFetcher {
    fn default() -> Self {
        Self::new()
    }
}
