//! Device location sensor seam.
//!
//! The platform sensor is external: capability may be absent or denied, and
//! fixes arrive as an asynchronous stream. [`LocationSensor`] is the seam the
//! tracker depends on; [`SimulatedSensor`] is the in-process implementation
//! used by tests and the headless demo, with a push handle for scripting
//! fixes.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::coord::LonLat;
use crate::tracker::TrackerError;

/// Requested positioning accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccuracyMode {
    /// High accuracy (GNSS), higher power draw.
    High,
    /// Coarse accuracy (network), lower power draw.
    Low,
}

/// A single resolved device position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    pub position: LonLat,
    /// Estimated accuracy radius in metres, when the sensor reports one.
    pub accuracy_m: Option<f64>,
}

impl PositionFix {
    pub fn new(position: LonLat) -> Self {
        Self {
            position,
            accuracy_m: None,
        }
    }
}

/// Events delivered while a sensor subscription is live.
#[derive(Debug, Clone)]
pub enum SensorEvent {
    /// A resolved position.
    Fix(PositionFix),
    /// The sensor failed mid-stream; the subscription is dead after this.
    Fault(String),
}

/// A live sensor subscription.
///
/// Dropping the stream unsubscribes from the sensor: the sender side sees
/// the channel closed and stops producing.
pub struct SensorStream {
    pub events: mpsc::UnboundedReceiver<SensorEvent>,
}

/// The device position sensor, as the tracker sees it.
pub trait LocationSensor: Send + Sync {
    /// Begins delivering position events.
    ///
    /// # Errors
    ///
    /// [`TrackerError::PermissionDenied`] when the user refused the
    /// capability, [`TrackerError::SensorUnavailable`] when the platform has
    /// no usable sensor.
    fn subscribe(&self, mode: AccuracyMode) -> Result<SensorStream, TrackerError>;
}

/// How a [`SimulatedSensor`] should refuse subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimulatedFailure {
    PermissionDenied,
    SensorUnavailable,
}

struct SimulatedState {
    senders: Vec<mpsc::UnboundedSender<SensorEvent>>,
    failure: Option<SimulatedFailure>,
    /// Fix delivered immediately on subscribe, for deterministic one-shot
    /// tests.
    fix_on_subscribe: Option<PositionFix>,
}

/// Scriptable in-process sensor.
#[derive(Clone)]
pub struct SimulatedSensor {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimulatedState {
                senders: Vec::new(),
                failure: None,
                fix_on_subscribe: None,
            })),
        }
    }

    /// Makes future subscriptions fail with `PermissionDenied`.
    pub fn deny_permission(&self) {
        self.state.lock().failure = Some(SimulatedFailure::PermissionDenied);
    }

    /// Makes future subscriptions fail with `SensorUnavailable`.
    pub fn make_unavailable(&self) {
        self.state.lock().failure = Some(SimulatedFailure::SensorUnavailable);
    }

    /// Queues a fix to be delivered the moment a subscription is opened.
    pub fn respond_with(&self, fix: PositionFix) {
        self.state.lock().fix_on_subscribe = Some(fix);
    }

    /// Pushes a fix to every live subscription.
    pub fn push_fix(&self, fix: PositionFix) {
        self.broadcast(SensorEvent::Fix(fix));
    }

    /// Pushes a mid-stream fault to every live subscription.
    pub fn push_fault(&self, reason: impl Into<String>) {
        self.broadcast(SensorEvent::Fault(reason.into()));
    }

    /// Number of live subscriptions (closed ones are pruned first).
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.state.lock();
        state.senders.retain(|tx| !tx.is_closed());
        state.senders.len()
    }

    fn broadcast(&self, event: SensorEvent) {
        let mut state = self.state.lock();
        state.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationSensor for SimulatedSensor {
    fn subscribe(&self, _mode: AccuracyMode) -> Result<SensorStream, TrackerError> {
        let mut state = self.state.lock();
        match state.failure {
            Some(SimulatedFailure::PermissionDenied) => {
                return Err(TrackerError::PermissionDenied)
            }
            Some(SimulatedFailure::SensorUnavailable) => {
                return Err(TrackerError::SensorUnavailable)
            }
            None => {}
        }

        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(fix) = state.fix_on_subscribe {
            let _ = tx.send(SensorEvent::Fix(fix));
        }
        state.senders.push(tx);
        Ok(SensorStream { events: rx })
    }
}
