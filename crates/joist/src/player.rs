//! Trace playback.
//!
//! The [`EventPlayer`] replays a loaded [`PlaybackTrace`] one frame per tick.
//! Each frame is applied in a fixed order: recorded navigation (screen
//! changes, pause and resume), then the viewport resize (if the frame
//! carries one), then the recorded events in order, then one simulation
//! step with the recorded delta. Replaying the same trace against the same
//! initial state therefore reproduces the recorded run exactly.
//!
//! ```text
//! Idle --load--> Loading --parsed--> Playing --last frame--> Finished
//! ```
//!
//! Every transition is appended to a history so tests can assert that a
//! state was passed through, not just where the player ended up.

use joist_input::{InputEvent, Viewport};
use joist_trace::{Navigation, PlaybackTrace, TraceError, TraceSource};
use serde::{Deserialize, Serialize};

use crate::clock::TimeSource;
use crate::SimError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayerState {
    Idle,
    Loading,
    Playing,
    Finished,
}

/// Statistics reported when a replay finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSummary {
    pub frames: usize,
    /// Wall-clock time from the first playback tick to the end of the last.
    pub elapsed_millis: f64,
    /// `frames / (elapsed_millis / 1000)`, or 0 when no time elapsed.
    pub frames_per_second: f64,
    /// `elapsed_millis / frames`, or 0 for an empty trace.
    pub average_millis_per_frame: f64,
}

impl PlaybackSummary {
    pub fn compute(frames: usize, elapsed_millis: f64) -> Self {
        let frames_per_second = if elapsed_millis > 0.0 {
            frames as f64 / (elapsed_millis / 1000.0)
        } else {
            0.0
        };
        let average_millis_per_frame = if frames > 0 {
            elapsed_millis / frames as f64
        } else {
            0.0
        };
        Self {
            frames,
            elapsed_millis,
            frames_per_second,
            average_millis_per_frame,
        }
    }
}

/// Where a replayed frame is applied.
pub trait PlaybackTarget {
    fn navigate(&mut self, navigation: Navigation);
    fn resize(&mut self, viewport: Viewport);
    fn dispatch(&mut self, event: &InputEvent);
    fn step(&mut self, dt: f64);
}

/// Result of one [`EventPlayer::tick`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackTick {
    /// Not playing; nothing was applied.
    Inactive,
    /// A frame was applied and more remain.
    Continue,
    /// The last frame was applied (or the trace was empty).
    Finished(PlaybackSummary),
}

// ---------------------------------------------------------------------------
// EventPlayer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EventPlayer {
    state: PlayerState,
    history: Vec<PlayerState>,
    trace: Option<PlaybackTrace>,
    cursor: usize,
    started_at_millis: Option<f64>,
    summary: Option<PlaybackSummary>,
}

impl Default for EventPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPlayer {
    pub fn new() -> Self {
        Self {
            state: PlayerState::Idle,
            history: vec![PlayerState::Idle],
            trace: None,
            cursor: 0,
            started_at_millis: None,
            summary: None,
        }
    }

    /// Fetch and parse trace `name`, then start playing.
    ///
    /// Any fetch or parse failure is a fatal [`SimError::PlaybackLoad`]; the
    /// player stays in `Loading` and never plays a partial trace.
    pub fn load(&mut self, source: &mut dyn TraceSource, name: &str) -> Result<(), SimError> {
        self.begin_loading()?;
        let trace = source
            .fetch(name)
            .and_then(|payload| PlaybackTrace::parse(&payload))
            .map_err(|err| load_error(name, err))?;
        tracing::info!(
            name,
            frames = trace.len(),
            events = trace.event_count(),
            simulated_seconds = trace.simulated_seconds(),
            digest = %trace.digest(),
            "playback trace loaded"
        );
        self.start_playing(trace);
        Ok(())
    }

    /// Start playing an already-validated trace.
    pub fn load_trace(&mut self, trace: PlaybackTrace) -> Result<(), SimError> {
        self.begin_loading()?;
        self.start_playing(trace);
        Ok(())
    }

    fn begin_loading(&mut self) -> Result<(), SimError> {
        if self.state != PlayerState::Idle {
            return Err(SimError::PlayerNotIdle(self.state));
        }
        self.transition(PlayerState::Loading);
        Ok(())
    }

    fn start_playing(&mut self, trace: PlaybackTrace) {
        self.trace = Some(trace);
        self.cursor = 0;
        self.transition(PlayerState::Playing);
    }

    /// Apply the next frame to `target`.
    ///
    /// The playback clock starts on the first call. When the cursor runs off
    /// the end, the player moves to `Finished` and the summary is returned;
    /// an empty trace finishes on its first tick without applying anything.
    pub fn tick(&mut self, time: &dyn TimeSource, target: &mut dyn PlaybackTarget) -> PlaybackTick {
        if self.state != PlayerState::Playing {
            return PlaybackTick::Inactive;
        }
        let Some(trace) = self.trace.as_ref() else {
            return PlaybackTick::Inactive;
        };
        let started_at = *self.started_at_millis.get_or_insert_with(|| time.now_millis());

        if let Some(frame) = trace.get(self.cursor) {
            for navigation in &frame.navigation {
                target.navigate(*navigation);
            }
            if let Some(viewport) = frame.viewport {
                target.resize(viewport);
            }
            for event in &frame.events {
                target.dispatch(event);
            }
            target.step(frame.delta_time_seconds);
            self.cursor += 1;
        }

        let frames = trace.len();
        if self.cursor < frames {
            return PlaybackTick::Continue;
        }

        let summary = PlaybackSummary::compute(frames, time.now_millis() - started_at);
        self.summary = Some(summary.clone());
        self.transition(PlayerState::Finished);
        PlaybackTick::Finished(summary)
    }

    fn transition(&mut self, next: PlayerState) {
        tracing::debug!(from = ?self.state, to = ?next, "event player transition");
        self.state = next;
        self.history.push(next);
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Every state entered, starting with `Idle`.
    pub fn history(&self) -> &[PlayerState] {
        &self.history
    }

    /// Index of the next frame to apply.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn trace(&self) -> Option<&PlaybackTrace> {
        self.trace.as_ref()
    }

    pub fn summary(&self) -> Option<&PlaybackSummary> {
        self.summary.as_ref()
    }
}

fn load_error(name: &str, source: TraceError) -> SimError {
    tracing::error!(name, error = %source, "failed to load playback trace");
    SimError::PlaybackLoad {
        name: name.to_owned(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
