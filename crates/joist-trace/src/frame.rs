//! Frame records, playback traces, and the JSON wire format.
//!
//! # Wire format
//!
//! A trace is a JSON array with one object per tick:
//!
//! ```json
//! [
//!   {"dt": 0.016666666666666666, "fireEvents": [{"kind": "mouseDown", "x": 10.0, "y": 20.0, "button": 0}],
//!    "width": 1024, "height": 768, "id": 0, "time": 1700000000000},
//!   {"dt": 0.02, "navigation": [{"action": "selectScreen", "index": 1}], "id": 1,
//!    "time": 1700000000020}
//! ]
//! ```
//!
//! - `dt` -- simulated seconds since the previous tick.
//! - `fireEvents` -- the structured event descriptors to re-issue, omitted
//!   when the tick saw no input.
//! - `navigation` -- screen changes and pause/resume applied before this
//!   tick, in order; omitted when there were none.
//! - `width` / `height` -- present only when the viewport is recorded at this
//!   frame (the first frame, and any frame where the size changed).
//! - `id` -- contiguous sequence id starting at 0.
//! - `time` -- wall-clock capture time in milliseconds; diagnostic only.
//!
//! Parsing validates every frame before a [`PlaybackTrace`] exists, so a
//! corrupt trace is rejected as a whole and never partially replayed.

use joist_input::{InputEvent, Viewport};
use serde::{Deserialize, Serialize};

use crate::TraceError;

/// Delta time used for the first tick of a session, when no previous tick
/// exists to measure against.
pub const NOMINAL_FIRST_DT: f64 = 1.0 / 60.0;

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// A screen-selection change made between two ticks.
///
/// Replayed before the frame's events so the model sees the same screen and
/// active flag it saw while recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Navigation {
    SelectScreen { index: usize },
    GoHome,
    SetActive { active: bool },
}

// ---------------------------------------------------------------------------
// FrameRecord
// ---------------------------------------------------------------------------

/// One recorded tick.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    /// Simulated seconds elapsed since the previous tick.
    pub delta_time_seconds: f64,
    /// Events observed during the tick, in delivery order.
    pub events: Vec<InputEvent>,
    /// Navigation applied since the previous tick, in order.
    pub navigation: Vec<Navigation>,
    /// Viewport size, present only where the delta encoding records it.
    pub viewport: Option<Viewport>,
    /// Position of this frame in its recording session.
    pub sequence_id: u64,
    /// Wall-clock capture time in milliseconds.
    pub timestamp_millis: u64,
}

// ---------------------------------------------------------------------------
// Wire representation
// ---------------------------------------------------------------------------

fn no_events(events: &&[InputEvent]) -> bool {
    events.is_empty()
}

fn no_navigation(navigation: &&[Navigation]) -> bool {
    navigation.is_empty()
}

#[derive(Serialize)]
struct WireFrameRef<'a> {
    dt: f64,
    #[serde(rename = "fireEvents", skip_serializing_if = "no_events")]
    fire_events: &'a [InputEvent],
    #[serde(skip_serializing_if = "no_navigation")]
    navigation: &'a [Navigation],
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    id: u64,
    time: u64,
}

#[derive(Deserialize)]
struct WireFrame {
    dt: f64,
    #[serde(rename = "fireEvents", default)]
    fire_events: Vec<InputEvent>,
    #[serde(default)]
    navigation: Vec<Navigation>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    id: u64,
    #[serde(default)]
    time: u64,
}

/// Serialize frames to the wire format.
pub(crate) fn encode_frames(frames: &[FrameRecord]) -> String {
    let wire: Vec<WireFrameRef<'_>> = frames
        .iter()
        .map(|frame| WireFrameRef {
            dt: frame.delta_time_seconds,
            fire_events: &frame.events,
            navigation: &frame.navigation,
            width: frame.viewport.map(|v| v.width),
            height: frame.viewport.map(|v| v.height),
            id: frame.sequence_id,
            time: frame.timestamp_millis,
        })
        .collect();

    serde_json::to_string(&wire).expect("trace frames should always be JSON-serializable")
}

// ---------------------------------------------------------------------------
// PlaybackTrace
// ---------------------------------------------------------------------------

/// A validated, immutable trace ready for playback.
///
/// Invariants (checked on construction):
///
/// - every `delta_time_seconds` is finite and non-negative;
/// - sequence ids are `0, 1, 2, ...` without gaps;
/// - a non-empty trace records the viewport on its first frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackTrace {
    frames: Vec<FrameRecord>,
}

impl PlaybackTrace {
    /// Build a trace from frames, validating every invariant.
    pub fn new(frames: Vec<FrameRecord>) -> Result<Self, TraceError> {
        for (index, frame) in frames.iter().enumerate() {
            let dt = frame.delta_time_seconds;
            if !dt.is_finite() || dt < 0.0 {
                return Err(TraceError::malformed(
                    index,
                    format!("dt must be finite and non-negative, got {dt}"),
                ));
            }
            if frame.sequence_id != index as u64 {
                return Err(TraceError::malformed(
                    index,
                    format!(
                        "sequence id {} breaks the contiguous run (expected {index})",
                        frame.sequence_id
                    ),
                ));
            }
        }
        if let Some(first) = frames.first() {
            if first.viewport.is_none() {
                return Err(TraceError::malformed(0, "first frame carries no viewport size"));
            }
        }
        Ok(Self { frames })
    }

    /// Parse and validate a wire-format payload.
    pub fn parse(payload: &str) -> Result<Self, TraceError> {
        let wire: Vec<WireFrame> = serde_json::from_str(payload)?;
        let mut frames = Vec::with_capacity(wire.len());

        for (index, frame) in wire.into_iter().enumerate() {
            let viewport = match (frame.width, frame.height) {
                (Some(width), Some(height)) => Some(Viewport::new(width, height)),
                (None, None) => None,
                _ => {
                    return Err(TraceError::malformed(
                        index,
                        "width and height must be recorded together",
                    ))
                }
            };
            frames.push(FrameRecord {
                delta_time_seconds: frame.dt,
                events: frame.fire_events,
                navigation: frame.navigation,
                viewport,
                sequence_id: frame.id,
                timestamp_millis: frame.time,
            });
        }

        Self::new(frames)
    }

    /// Serialize back to the wire format.
    pub fn to_wire_string(&self) -> String {
        encode_frames(&self.frames)
    }

    /// BLAKE3 hex digest of the canonical wire payload.
    ///
    /// Two machines holding traces with the same digest replay the same
    /// deltas and events.
    pub fn digest(&self) -> String {
        blake3::hash(self.to_wire_string().as_bytes())
            .to_hex()
            .to_string()
    }

    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    pub fn get(&self, index: usize) -> Option<&FrameRecord> {
        self.frames.get(index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total simulated time covered by the trace.
    pub fn simulated_seconds(&self) -> f64 {
        self.frames.iter().map(|f| f.delta_time_seconds).sum()
    }

    /// Total number of recorded events.
    pub fn event_count(&self) -> usize {
        self.frames.iter().map(|f| f.events.len()).sum()
    }

    /// The viewport in effect at every frame.
    ///
    /// Undoes the delta encoding: each frame takes the size of the most
    /// recent frame (itself included) that carries one.
    pub fn effective_viewports(&self) -> Vec<Viewport> {
        let mut current = Viewport::default();
        self.frames
            .iter()
            .map(|frame| {
                if let Some(viewport) = frame.viewport {
                    current = viewport;
                }
                current
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
