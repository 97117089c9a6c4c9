//! Joist -- application shell for interactive educational simulations.
//!
//! This crate owns the top-level simulation lifecycle: the animation loop,
//! screen selection and the home screen, the pausable active state, and
//! record/playback of input traces. Rendering, screen internals, and input
//! hit-testing belong to external collaborators that the [`Sim`](sim::Sim)
//! talks to through the traits in [`collaborators`].
//!
//! Each tick the runner either steps live (delivering buffered input,
//! measuring a wall-clock delta, optionally recording the frame) or replays
//! the next frame of a loaded trace with its recorded delta and events. A
//! process is configured once, at startup, as exactly one of live,
//! live-with-recording, or playback.
//!
//! # Quick Start
//!
//! ```
//! use joist::prelude::*;
//!
//! struct Pendulum { steps: u32 }
//!
//! impl Screen for Pendulum {
//!     fn name(&self) -> &str { "pendulum" }
//!     fn step_model(&mut self, _dt: f64) { self.steps += 1; }
//! }
//!
//! let mut sim = SimBuilder::new("pendulum-lab")
//!     .screen(Pendulum { steps: 0 })
//!     .time_source(ManualTimeSource::new())
//!     .build()
//!     .unwrap();
//!
//! let config = HeadlessConfig { max_ticks: Some(10), ..Default::default() };
//! let report = run_headless(&mut sim, &config);
//! assert_eq!(report.ticks, 10);
//! assert_eq!(sim.frame_counter(), 10);
//! ```

#![deny(unsafe_code)]

pub mod clock;
pub mod collaborators;
pub mod display;
pub mod host;
pub mod logging;
pub mod options;
pub mod player;
pub mod screen;
pub mod sim;
#[cfg(feature = "windowed")]
pub mod windowed;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the input crate for convenience.
pub use joist_input;

/// Re-export the trace crate for convenience.
pub use joist_trace;

use joist_trace::TraceError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by simulation construction and navigation.
///
/// Everything raised while building a [`Sim`](sim::Sim) is a fatal startup
/// misconfiguration: the simulation never starts in a degraded state.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A simulation was built without screens.
    #[error("a simulation needs at least one screen")]
    NoScreens,

    /// A screen index outside `[0, screen_count)`.
    #[error("screen index {index} out of range (screen count {count})")]
    ScreenOutOfRange { index: usize, count: usize },

    /// The configured display strategy is not one of the known variants.
    #[error("unknown screen display strategy '{0}' (expected 'setVisible' or 'setChildren')")]
    UnknownDisplayStrategy(String),

    /// A startup option could not be parsed.
    #[error("invalid value '{value}' for option '{key}'")]
    InvalidOption { key: String, value: String },

    /// A static options document could not be parsed.
    #[error("invalid options document: {0}")]
    OptionsDocument(#[from] serde_json::Error),

    /// Recording and playback were both requested.
    #[error("input event recording and playback cannot both be enabled")]
    ConflictingModes,

    /// Playback was requested but the trace could not be fetched or parsed.
    #[error("failed to load playback trace '{name}': {source}")]
    PlaybackLoad {
        name: String,
        #[source]
        source: TraceError,
    },

    /// The event player only loads once, from `Idle`.
    #[error("event player cannot load a trace while {0:?}")]
    PlayerNotIdle(player::PlayerState),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use joist_trace::prelude::*;

    pub use crate::clock::{
        compute_delta, FrameClock, ManualTimeSource, Scheduler, SystemTimeSource, TimeSource,
    };
    pub use crate::collaborators::{
        Display, DisplayTarget, InputDispatcher, LogPresenter, Presenter, Screen, Stepper,
    };
    pub use crate::display::{background_for, DisplayStrategy, ScreenTransitionHandler};
    pub use crate::host::{
        run_headless, CollectingDispatcher, HeadlessConfig, HeadlessDisplay, NoopDispatcher,
        RunReport, StopReason,
    };
    pub use crate::options::{RunMode, SimOptions};
    pub use crate::player::{EventPlayer, PlaybackSummary, PlaybackTarget, PlayerState};
    pub use crate::screen::{HomeScreen, ScreenSelection};
    pub use crate::sim::{Sim, SimBuilder, TeardownHandle, TickDiagnostics, TickOutcome};
    pub use crate::SimError;
}
