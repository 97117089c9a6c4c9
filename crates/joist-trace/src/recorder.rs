//! Event recorder: accumulates one [`FrameRecord`] per tick while a
//! simulation runs live.
//!
//! The recorder is driven by the sim runner. It never looks at the clock or
//! the display itself; every tick it is handed the delta time, the events
//! that were delivered, the current viewport, and a wall-clock timestamp.
//! Navigation made between ticks is noted as it happens and attached to the
//! next frame.
//!
//! # Viewport delta encoding
//!
//! The first frame always carries the viewport. After that a frame carries
//! it only when it differs from the last viewport that was written, so a
//! session without resizes records the size exactly once.
//!
//! # Example
//!
//! ```
//! use joist_trace::prelude::*;
//!
//! let mut recorder = EventRecorder::new();
//! assert!(!recorder.is_enabled());
//!
//! recorder.begin_recording(Viewport::new(640, 480));
//! recorder.on_tick(NOMINAL_FIRST_DT, &[], Viewport::new(640, 480), 0);
//! recorder.on_tick(0.02, &[], Viewport::new(800, 600), 20);
//! recorder.on_tick(0.02, &[], Viewport::new(800, 600), 40);
//!
//! let frames = recorder.frames();
//! assert_eq!(frames[0].viewport, Some(Viewport::new(640, 480)));
//! assert_eq!(frames[1].viewport, Some(Viewport::new(800, 600)));
//! assert_eq!(frames[2].viewport, None);
//! ```

use joist_input::{InputEvent, Viewport};

use crate::frame::{encode_frames, FrameRecord, Navigation, PlaybackTrace};
use crate::transport::{RecordingDestination, TraceTransport};
use crate::TraceError;

// ---------------------------------------------------------------------------
// TransmitStatus
// ---------------------------------------------------------------------------

/// Outcome of [`EventRecorder::export_and_transmit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitStatus {
    /// Recording was never enabled for this run; nothing was sent.
    Skipped,
    /// The trace was handed to the transport.
    Sent {
        /// Number of frames in the submitted payload.
        frames: usize,
        /// Size of the serialized payload in bytes.
        bytes: usize,
    },
}

// ---------------------------------------------------------------------------
// EventRecorder
// ---------------------------------------------------------------------------

/// Accumulates frame records for one recording session.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    /// Set by [`begin_recording`](Self::begin_recording); a recorder that was
    /// never started ignores ticks and skips transmission.
    enabled: bool,
    frames: Vec<FrameRecord>,
    next_sequence_id: u64,
    /// Navigation waiting for the next frame.
    pending_navigation: Vec<Navigation>,
    /// Last viewport written into a frame.
    last_written_viewport: Option<Viewport>,
}

impl EventRecorder {
    /// A disabled recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh session.
    ///
    /// Clears any prior trace and resets the sequence id to 0. The first
    /// frame always carries its viewport. Navigation noted before the session
    /// began is kept and lands on the first frame.
    pub fn begin_recording(&mut self, viewport: Viewport) {
        tracing::info!(
            width = viewport.width,
            height = viewport.height,
            discarded_frames = self.frames.len(),
            "input event recording started"
        );
        self.enabled = true;
        self.frames.clear();
        self.next_sequence_id = 0;
        self.last_written_viewport = None;
    }

    /// Note a navigation change; it is written into the next frame.
    pub fn note_navigation(&mut self, navigation: Navigation) {
        tracing::trace!(?navigation, "navigation noted");
        self.pending_navigation.push(navigation);
    }

    /// Append the record for one tick.
    ///
    /// Ignored when recording is not enabled. `events` are cloned; the
    /// caller's events are left untouched.
    pub fn on_tick(
        &mut self,
        delta_time_seconds: f64,
        events: &[InputEvent],
        viewport: Viewport,
        timestamp_millis: u64,
    ) {
        if !self.enabled {
            return;
        }

        let record_viewport =
            self.frames.is_empty() || self.last_written_viewport != Some(viewport);
        if record_viewport {
            self.last_written_viewport = Some(viewport);
        }

        let sequence_id = self.next_sequence_id;
        self.next_sequence_id += 1;

        tracing::trace!(
            sequence_id,
            dt = delta_time_seconds,
            events = events.len(),
            navigation = self.pending_navigation.len(),
            resized = record_viewport,
            "recorded frame"
        );

        self.frames.push(FrameRecord {
            delta_time_seconds,
            events: events.to_vec(),
            navigation: std::mem::take(&mut self.pending_navigation),
            viewport: record_viewport.then_some(viewport),
            sequence_id,
            timestamp_millis,
        });
    }

    /// Serialize the accumulated trace. Repeatable; the trace is kept.
    pub fn export(&self) -> String {
        encode_frames(&self.frames)
    }

    /// Convert the accumulated trace into a validated [`PlaybackTrace`].
    pub fn to_trace(&self) -> Result<PlaybackTrace, TraceError> {
        PlaybackTrace::new(self.frames.clone())
    }

    /// Export the trace and hand it to `transport` for `destination`.
    ///
    /// Returns [`TransmitStatus::Skipped`] when recording was never enabled.
    /// An enabled recorder with no frames still sends a valid empty payload.
    pub fn export_and_transmit(
        &self,
        destination: &RecordingDestination,
        transport: &mut dyn TraceTransport,
    ) -> TransmitStatus {
        if !self.enabled {
            tracing::debug!("recording disabled; skipping trace transmission");
            return TransmitStatus::Skipped;
        }

        let payload = self.export();
        let status = TransmitStatus::Sent {
            frames: self.frames.len(),
            bytes: payload.len(),
        };
        transport.submit(destination.submission(payload));
        status
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::NOMINAL_FIRST_DT;
    use crate::transport::{MemoryTransport, Submission};
    use joist_input::InputEventKind;

    const VIEW: Viewport = Viewport {
        width: 1024,
        height: 768,
    };

    fn endpoint() -> RecordingDestination {
        RecordingDestination::Endpoint {
            host: "localhost".to_owned(),
            sim_name: "faradays-law".to_owned(),
            session: "chrome".to_owned(),
        }
    }

    #[test]
    fn disabled_recorder_ignores_ticks() {
        let mut recorder = EventRecorder::new();
        recorder.on_tick(0.1, &[], VIEW, 0);
        assert!(recorder.is_empty());
    }

    #[test]
    fn sequence_ids_are_contiguous_from_zero() {
        let mut recorder = EventRecorder::new();
        recorder.begin_recording(VIEW);
        for i in 0..5 {
            recorder.on_tick(0.016, &[], VIEW, i * 16);
        }
        let ids: Vec<u64> = recorder.frames().iter().map(|f| f.sequence_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn begin_recording_clears_previous_session() {
        let mut recorder = EventRecorder::new();
        recorder.begin_recording(VIEW);
        recorder.on_tick(0.016, &[], VIEW, 0);
        recorder.on_tick(0.016, &[], VIEW, 16);

        recorder.begin_recording(Viewport::new(10, 10));
        assert!(recorder.is_empty());
        recorder.on_tick(0.016, &[], Viewport::new(10, 10), 32);
        assert_eq!(recorder.frames()[0].sequence_id, 0);
        assert_eq!(recorder.frames()[0].viewport, Some(Viewport::new(10, 10)));
    }

    #[test]
    fn three_ticks_with_one_resize() {
        let mut recorder = EventRecorder::new();
        recorder.begin_recording(VIEW);
        let resized = Viewport::new(800, 600);

        recorder.on_tick(NOMINAL_FIRST_DT, &[], VIEW, 0);
        recorder.on_tick(0.02, &[], resized, 20);
        recorder.on_tick(0.02, &[], resized, 40);

        let value: serde_json::Value = serde_json::from_str(&recorder.export()).unwrap();
        let frames = value.as_array().unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0]["width"], 1024);
        assert_eq!(frames[0]["height"], 768);
        assert_eq!(frames[1]["width"], 800);
        assert_eq!(frames[1]["height"], 600);
        assert!(frames[2].get("width").is_none());
        assert!(frames[2].get("height").is_none());
        assert_eq!(frames[0]["dt"], NOMINAL_FIRST_DT);
    }

    #[test]
    fn resize_back_to_original_is_recorded() {
        let mut recorder = EventRecorder::new();
        recorder.begin_recording(VIEW);
        recorder.on_tick(0.01, &[], VIEW, 0);
        recorder.on_tick(0.01, &[], Viewport::new(1, 1), 10);
        recorder.on_tick(0.01, &[], VIEW, 20);

        let carried: Vec<Option<Viewport>> =
            recorder.frames().iter().map(|f| f.viewport).collect();
        assert_eq!(carried, vec![Some(VIEW), Some(Viewport::new(1, 1)), Some(VIEW)]);
    }

    #[test]
    fn events_are_copied_not_moved() {
        let mut recorder = EventRecorder::new();
        recorder.begin_recording(VIEW);
        let events = vec![InputEvent::mouse(InputEventKind::MouseMove, 3.0, 4.0)];
        recorder.on_tick(0.01, &events, VIEW, 0);

        assert_eq!(events.len(), 1);
        assert_eq!(recorder.frames()[0].events, events);
    }

    #[test]
    fn navigation_lands_on_the_next_frame() {
        let mut recorder = EventRecorder::new();
        recorder.note_navigation(Navigation::SelectScreen { index: 1 });
        recorder.begin_recording(VIEW);
        recorder.on_tick(0.01, &[], VIEW, 0);
        recorder.note_navigation(Navigation::SetActive { active: false });
        recorder.note_navigation(Navigation::GoHome);
        recorder.on_tick(0.01, &[], VIEW, 10);
        recorder.on_tick(0.01, &[], VIEW, 20);

        let frames = recorder.frames();
        assert_eq!(frames[0].navigation, vec![Navigation::SelectScreen { index: 1 }]);
        assert_eq!(
            frames[1].navigation,
            vec![Navigation::SetActive { active: false }, Navigation::GoHome]
        );
        assert!(frames[2].navigation.is_empty());

        let replayed = PlaybackTrace::parse(&recorder.export()).unwrap();
        assert_eq!(replayed.frames()[1].navigation, frames[1].navigation);
    }

    #[test]
    fn export_is_repeatable() {
        let mut recorder = EventRecorder::new();
        recorder.begin_recording(VIEW);
        recorder.on_tick(0.01, &[], VIEW, 0);
        assert_eq!(recorder.export(), recorder.export());
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn transmit_skipped_when_disabled() {
        let recorder = EventRecorder::new();
        let mut transport = MemoryTransport::new();
        let status = recorder.export_and_transmit(&endpoint(), &mut transport);
        assert_eq!(status, TransmitStatus::Skipped);
        assert!(transport.submissions().is_empty());
    }

    #[test]
    fn empty_enabled_recording_still_transmits() {
        let mut recorder = EventRecorder::new();
        recorder.begin_recording(VIEW);
        let mut transport = MemoryTransport::new();

        let status = recorder.export_and_transmit(&endpoint(), &mut transport);
        assert_eq!(status, TransmitStatus::Sent { frames: 0, bytes: 2 });
        assert_eq!(
            transport.submissions(),
            &[Submission::Post {
                url: "http://localhost:8083/faradays-law_chrome".to_owned(),
                body: "[]".to_owned(),
            }]
        );
    }

    #[test]
    fn recorded_trace_converts_to_playback_trace() {
        let mut recorder = EventRecorder::new();
        recorder.begin_recording(VIEW);
        recorder.on_tick(NOMINAL_FIRST_DT, &[], VIEW, 0);
        recorder.on_tick(0.02, &[], VIEW, 20);

        let trace = recorder.to_trace().unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace, PlaybackTrace::parse(&recorder.export()).unwrap());
    }
}
