//! Geolocation tracking sessions.
//!
//! Wraps the device position sensor behind two usage patterns:
//!
//! - **continuous tracking** (`Idle → Tracking → Idle`): fixes update the
//!   last known position and invoke the registered fix callback (which moves
//!   the current-location marker); the viewport is not recentred,
//! - **one-shot locate** (`Idle → AwaitingFix → Idle`): waits for exactly one
//!   fix or a timeout, then stops automatically.
//!
//! # Cancellation
//!
//! `stop_tracking` must be effective synchronously: once it returns, no
//! callback for that session fires, even for an event already in flight.
//! Every delivery is guarded by a session-generation check taken under the
//! same lock `stop_tracking` mutates, so a late event either observes the
//! bumped generation and is dropped, or completes before `stop_tracking`
//! acquires the lock. The registered callback therefore runs with the
//! tracker lock held and must not call back into the tracker.

mod sensor;

pub use sensor::{
    AccuracyMode, LocationSensor, PositionFix, SensorEvent, SensorStream, SimulatedSensor,
};

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::coord::LonLat;

/// Default wait for a one-shot fix before giving up.
pub const DEFAULT_LOCATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Tracking failures. All are non-fatal and user-visible; the tracker
/// returns to `Idle` and the viewport is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// The user refused the location capability.
    #[error("location permission denied")]
    PermissionDenied,

    /// The platform has no usable location sensor.
    #[error("no location sensor available")]
    SensorUnavailable,

    /// No fix arrived before the one-shot timeout, or the sensor faulted.
    #[error("current location unavailable")]
    LocationUnavailable,
}

/// Tracker life-cycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingPhase {
    /// No session active.
    Idle,
    /// Continuous session delivering fixes.
    Tracking,
    /// One-shot locate waiting for its fix.
    AwaitingFix,
}

/// Identifier of a continuous tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionId(u64);

/// Callback invoked for each delivered fix of a continuous session.
pub type FixCallback = Arc<dyn Fn(PositionFix) + Send + Sync>;

struct TrackerState {
    phase: TrackingPhase,
    /// Session identity; bumped whenever a session starts or ends, which
    /// invalidates deliveries belonging to older sessions.
    generation: u64,
    last_known: Option<LonLat>,
    cancel: Option<CancellationToken>,
}

/// Handle to the geolocation tracker. Cheap to clone.
#[derive(Clone)]
pub struct GeolocationTracker {
    sensor: Arc<dyn LocationSensor>,
    on_fix: FixCallback,
    state: Arc<Mutex<TrackerState>>,
    locate_timeout: Duration,
}

impl GeolocationTracker {
    /// Creates a tracker over the given sensor.
    ///
    /// `on_fix` is invoked for every fix delivered by a continuous session.
    /// It runs with the tracker lock held and must not call back into the
    /// tracker.
    pub fn new(sensor: Arc<dyn LocationSensor>, on_fix: FixCallback) -> Self {
        Self::with_locate_timeout(sensor, on_fix, DEFAULT_LOCATE_TIMEOUT)
    }

    /// Creates a tracker with an explicit one-shot timeout.
    pub fn with_locate_timeout(
        sensor: Arc<dyn LocationSensor>,
        on_fix: FixCallback,
        locate_timeout: Duration,
    ) -> Self {
        Self {
            sensor,
            on_fix,
            state: Arc::new(Mutex::new(TrackerState {
                phase: TrackingPhase::Idle,
                generation: 0,
                last_known: None,
                cancel: None,
            })),
            locate_timeout,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> TrackingPhase {
        self.state.lock().phase
    }

    /// Last position delivered by any session, if one exists.
    pub fn last_known_position(&self) -> Option<LonLat> {
        self.state.lock().last_known
    }

    /// Starts a continuous tracking session.
    ///
    /// Starting while a session is already active is an idempotent no-op
    /// returning the live session's id; no duplicate sensor subscription is
    /// created.
    pub fn start_tracking(&self, mode: AccuracyMode) -> Result<SessionId, TrackerError> {
        let (generation, stream, token) = {
            let mut state = self.state.lock();
            if state.phase != TrackingPhase::Idle {
                debug!("start_tracking ignored, session already active");
                return Ok(SessionId(state.generation));
            }

            // Subscribe before committing the transition so a refusal
            // leaves the tracker Idle.
            let stream = self.sensor.subscribe(mode)?;
            let token = CancellationToken::new();

            state.generation += 1;
            state.phase = TrackingPhase::Tracking;
            state.cancel = Some(token.clone());
            (state.generation, stream, token)
        };

        debug!(session = generation, "continuous tracking started");
        self.spawn_pump(generation, stream, token);
        Ok(SessionId(generation))
    }

    /// Stops the active session.
    ///
    /// Guaranteed: after this returns, no callback registered for the
    /// stopped session fires again.
    pub fn stop_tracking(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.phase = TrackingPhase::Idle;
        if let Some(token) = state.cancel.take() {
            token.cancel();
        }
        debug!("tracking stopped");
    }

    /// Resolves the current position once, then stops automatically.
    ///
    /// Waits for exactly one fix or the configured timeout. On success the
    /// fix is recorded as the last known position; the caller recentres the
    /// viewport. On timeout or sensor fault the state returns to `Idle` and
    /// [`TrackerError::LocationUnavailable`] is reported.
    pub async fn locate_once(&self, mode: AccuracyMode) -> Result<PositionFix, TrackerError> {
        let (generation, mut stream) = {
            let mut state = self.state.lock();
            match state.phase {
                TrackingPhase::Idle => {}
                // A continuous session already owns the sensor; answer from
                // the freshest fix it has delivered.
                TrackingPhase::Tracking => {
                    return state
                        .last_known
                        .map(PositionFix::new)
                        .ok_or(TrackerError::LocationUnavailable);
                }
                // A concurrent locate is already waiting; there is at most
                // one session per surface.
                TrackingPhase::AwaitingFix => return Err(TrackerError::LocationUnavailable),
            }

            let stream = self.sensor.subscribe(mode)?;
            state.generation += 1;
            state.phase = TrackingPhase::AwaitingFix;
            (state.generation, stream)
        };

        debug!(session = generation, "one-shot locate started");
        let outcome = timeout(self.locate_timeout, Self::first_fix(&mut stream)).await;
        drop(stream); // unsubscribe from the sensor

        let mut state = self.state.lock();
        if state.generation != generation {
            // stop_tracking (or unmount) superseded this locate while it was
            // waiting; its result must not be acted upon.
            return Err(TrackerError::LocationUnavailable);
        }
        state.generation += 1;
        state.phase = TrackingPhase::Idle;
        state.cancel = None;

        match outcome {
            Ok(Some(fix)) => {
                state.last_known = Some(fix.position);
                debug!(position = %fix.position, "one-shot locate resolved");
                Ok(fix)
            }
            Ok(None) => {
                warn!("location sensor faulted during one-shot locate");
                Err(TrackerError::LocationUnavailable)
            }
            Err(_) => {
                warn!(timeout = ?self.locate_timeout, "one-shot locate timed out");
                Err(TrackerError::LocationUnavailable)
            }
        }
    }

    /// Waits for the first usable fix on a stream.
    async fn first_fix(stream: &mut SensorStream) -> Option<PositionFix> {
        loop {
            match stream.events.recv().await? {
                SensorEvent::Fix(fix) => return Some(fix),
                SensorEvent::Fault(reason) => {
                    warn!(%reason, "sensor fault while awaiting fix");
                    return None;
                }
            }
        }
    }

    fn spawn_pump(&self, generation: u64, mut stream: SensorStream, token: CancellationToken) {
        let tracker = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = stream.events.recv() => match event {
                        None => break,
                        Some(SensorEvent::Fix(fix)) => tracker.deliver(generation, fix),
                        Some(SensorEvent::Fault(reason)) => {
                            tracker.fault(generation, &reason);
                            break;
                        }
                    },
                }
            }
            // Dropping the stream here closes the sensor subscription.
        });
    }

    /// Delivers one fix to the session callback, if the session is still
    /// live. The generation check and the callback run under the state lock;
    /// see the module docs for why.
    fn deliver(&self, generation: u64, fix: PositionFix) {
        let mut state = self.state.lock();
        if state.generation != generation || state.phase != TrackingPhase::Tracking {
            debug!(session = generation, "dropping fix for ended session");
            return;
        }
        state.last_known = Some(fix.position);
        (self.on_fix)(fix);
    }

    /// Handles a mid-stream sensor fault: the session is destroyed and the
    /// tracker returns to `Idle`.
    fn fault(&self, generation: u64, reason: &str) {
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }
        warn!(%reason, "sensor fault ended tracking session");
        state.generation += 1;
        state.phase = TrackingPhase::Idle;
        if let Some(token) = state.cancel.take() {
            token.cancel();
        }
    }
}
