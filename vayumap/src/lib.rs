//! Vayumap - Interactive air-quality map
//!
//! This library provides the interactive map at the centre of an
//! air-quality monitoring application: a shared viewport, a base/overlay
//! layer registry, AQI severity classification, a marker overlay, a
//! geolocation tracker, free-text search with recentring and a mount/
//! unmount surface lifecycle, composed behind a single view controller.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   MapViewController                      │
//! │                                                          │
//! │  Viewport ── LayerRegistry ── MarkerOverlay              │
//! │     │              │               ▲                     │
//! │     │              │               │ fixes / samples     │
//! │     │              │         GeolocationTracker          │
//! │     │              │         SearchFlow                  │
//! │     ▼              ▼                                     │
//! │  MapSurface ──► DrawingEngine (one frame per change)     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! State handles are cheap clones over shared interior state; every
//! mutation notifies subscribers on the same tick, and the mounted
//! surface turns each notification into a redraw.

pub mod app;
pub mod aqi;
pub mod config;
pub mod controller;
pub mod coord;
pub mod layers;
pub mod logging;
pub mod markers;
pub mod notify;
pub mod search;
pub mod surface;
pub mod tracker;
pub mod viewport;

pub use app::{AppError, MapApp};
pub use controller::{MapError, MapOptions, MapViewController, NavigationIntent};
pub use coord::LonLat;
pub use viewport::{BaseLayerKind, Viewport};
