//! Drawing engine seam.
//!
//! The map surface owns a drawing engine instance for its mount/unmount
//! lifetime. The engine is handed the layer stack once on mount and a
//! [`RenderFrame`] on every redraw; [`HeadlessEngine`] records those calls
//! for tests and the CLI demo.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::coord::Mercator;
use crate::layers::LayerDescriptor;
use crate::markers::MarkerFeature;

/// Everything the engine needs to draw one frame.
///
/// Pure data derived from the latest viewport, registry and overlay state;
/// the centre is already projected into the engine's frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    /// Viewport centre in Web Mercator metres.
    pub center: Mercator,
    pub zoom: f64,
    /// Visible layers in draw order.
    pub visible_layers: Vec<String>,
    /// Marker features in draw order.
    pub markers: Vec<MarkerFeature>,
}

/// The rendering target owned by a mounted map surface.
pub trait DrawingEngine: Send {
    /// Binds the layer stack, in draw order. Called once on mount.
    fn attach_layers(&mut self, layers: &[LayerDescriptor]);

    /// Draws one frame.
    fn render(&mut self, frame: &RenderFrame);

    /// Releases the engine's resources. Called once on unmount; no call
    /// follows it.
    fn release(&mut self);
}

#[derive(Default)]
struct HeadlessState {
    attached: Vec<String>,
    frames: Vec<RenderFrame>,
    released: bool,
}

/// Engine that records calls instead of drawing.
///
/// Clones share state, so a test can keep a handle and inspect what the
/// surface did after unmounting it.
#[derive(Clone, Default)]
pub struct HeadlessEngine {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of the layers attached on mount, in draw order.
    pub fn attached_layers(&self) -> Vec<String> {
        self.state.lock().attached.clone()
    }

    /// Number of frames rendered so far.
    pub fn frame_count(&self) -> usize {
        self.state.lock().frames.len()
    }

    /// The most recently rendered frame.
    pub fn last_frame(&self) -> Option<RenderFrame> {
        self.state.lock().frames.last().cloned()
    }

    /// Whether the engine has been released.
    pub fn released(&self) -> bool {
        self.state.lock().released
    }
}

impl DrawingEngine for HeadlessEngine {
    fn attach_layers(&mut self, layers: &[LayerDescriptor]) {
        self.state.lock().attached = layers.iter().map(|l| l.id.clone()).collect();
    }

    fn render(&mut self, frame: &RenderFrame) {
        self.state.lock().frames.push(frame.clone());
    }

    fn release(&mut self) {
        self.state.lock().released = true;
    }
}
