//! Frame clock, tick scheduler, and time sources.
//!
//! The host environment offers one "frame presentation opportunity" at a
//! time. The [`Scheduler`] models that as a one-shot request: the sim runner
//! calls [`schedule_next_tick`](Scheduler::schedule_next_tick) at the end of
//! every tick, and the host only runs another tick if a request is pending.
//! Stopping the loop is simply not re-arming.
//!
//! The [`FrameClock`] turns successive frame times into `deltaTimeSeconds`,
//! using [`NOMINAL_FIRST_DT`] for the very first tick.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub use joist_trace::NOMINAL_FIRST_DT;

/// Seconds elapsed between two frame times given in milliseconds.
///
/// `last_tick_millis` is `None` before the first tick; the nominal 1/60 s is
/// returned in that case so a genuine zero delta stays distinguishable.
pub fn compute_delta(now_millis: f64, last_tick_millis: Option<f64>) -> f64 {
    match last_tick_millis {
        Some(last) => (now_millis - last) / 1000.0,
        None => NOMINAL_FIRST_DT,
    }
}

// ---------------------------------------------------------------------------
// FrameClock
// ---------------------------------------------------------------------------

/// Tracks the time of the previous tick.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last_tick_millis: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tick at `now_millis` and return its delta in seconds.
    ///
    /// A time source that steps backwards yields a zero delta instead of a
    /// negative one.
    pub fn advance(&mut self, now_millis: f64) -> f64 {
        let dt = compute_delta(now_millis, self.last_tick_millis);
        self.last_tick_millis = Some(now_millis);
        if dt < 0.0 {
            tracing::warn!(dt, "time source went backwards; clamping delta to zero");
            return 0.0;
        }
        dt
    }

    pub fn last_tick_millis(&self) -> Option<f64> {
        self.last_tick_millis
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// One-shot tick request. No implicit repeat.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    armed: bool,
    requests: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request exactly one future tick. Requesting twice before the host
    /// consumes the request still yields one tick.
    pub fn schedule_next_tick(&mut self) {
        self.armed = true;
        self.requests += 1;
    }

    /// Consume the pending request, if any.
    pub fn take_scheduled(&mut self) -> bool {
        std::mem::take(&mut self.armed)
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Total requests made over the scheduler's lifetime.
    pub fn requests(&self) -> u64 {
        self.requests
    }
}

// ---------------------------------------------------------------------------
// TimeSource
// ---------------------------------------------------------------------------

/// Where the runner reads time from.
pub trait TimeSource {
    /// Monotonic milliseconds; used for deltas and playback statistics.
    fn now_millis(&self) -> f64;

    /// Wall-clock milliseconds since the Unix epoch; diagnostic timestamps
    /// only.
    fn epoch_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Real time: a monotonic [`Instant`] origin plus the system wall clock.
#[derive(Debug, Clone)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now_millis(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven time. Clones share the same clock, so a test can keep one
/// handle while the simulation owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    now: Rc<Cell<f64>>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `millis`.
    pub fn advance(&self, millis: f64) {
        self.now.set(self.now.get() + millis);
    }

    pub fn set(&self, millis: f64) {
        self.now.set(millis);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_millis(&self) -> f64 {
        self.now.get()
    }

    fn epoch_millis(&self) -> u64 {
        self.now.get().max(0.0) as u64
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
