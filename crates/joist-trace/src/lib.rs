//! Joist Trace -- replayable input traces for the simulation shell.
//!
//! A trace is an ordered list of [`FrameRecord`]s, one per animation tick:
//! the simulated delta time, the input events observed during the tick, and
//! (delta-encoded) the viewport size. The [`EventRecorder`] produces traces
//! while a simulation runs live; a [`PlaybackTrace`] is the immutable,
//! validated form consumed by the player.
//!
//! Traces travel as JSON (see [`frame`] for the wire format). They are
//! fetched through a [`TraceSource`] and submitted through a
//! [`TraceTransport`].
//!
//! # Quick Start
//!
//! ```
//! use joist_trace::prelude::*;
//!
//! let mut recorder = EventRecorder::new();
//! recorder.begin_recording(Viewport::new(1024, 768));
//! recorder.on_tick(1.0 / 60.0, &[], Viewport::new(1024, 768), 0);
//! recorder.on_tick(0.02, &[], Viewport::new(1024, 768), 20);
//!
//! let payload = recorder.export();
//! let trace = PlaybackTrace::parse(&payload).unwrap();
//! assert_eq!(trace.len(), 2);
//! assert_eq!(trace.frames()[0].viewport, Some(Viewport::new(1024, 768)));
//! assert_eq!(trace.frames()[1].viewport, None);
//! ```

#![deny(unsafe_code)]

pub mod frame;
pub mod recorder;
pub mod source;
pub mod transport;

pub use frame::{FrameRecord, Navigation, PlaybackTrace, NOMINAL_FIRST_DT};
pub use recorder::{EventRecorder, TransmitStatus};
pub use source::TraceSource;
pub use transport::{RecordingDestination, TraceTransport};

use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while fetching, parsing, or validating a trace.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// The payload is not valid trace JSON.
    #[error("trace payload is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The payload parsed but violates a trace invariant.
    #[error("malformed trace at frame {frame}: {reason}")]
    Malformed { frame: usize, reason: String },

    /// The trace could not be fetched from its source.
    #[error("failed to fetch trace '{name}': {details}")]
    Fetch { name: String, details: String },

    /// A trace file could not be read.
    #[error("cannot read trace file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be built or a request failed.
    #[cfg(feature = "network")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TraceError {
    pub(crate) fn malformed(frame: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            frame,
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use joist_input::prelude::*;

    pub use crate::frame::{FrameRecord, Navigation, PlaybackTrace, NOMINAL_FIRST_DT};
    pub use crate::recorder::{EventRecorder, TransmitStatus};
    pub use crate::source::{DirectoryTraceSource, InlineTraceSource, TraceSource};
    pub use crate::transport::{
        MemoryTransport, RecordingDestination, Submission, TraceTransport, RECORDING_PORT,
    };
    pub use crate::TraceError;
}
