//! Seams to the systems the shell drives but does not own.
//!
//! Rendering, per-screen models and views, input hit-testing, tween and
//! timer engines, and the user-facing report of playback statistics are all
//! external. The [`Sim`](crate::sim::Sim) holds each one as a boxed trait
//! object and calls it at fixed points of the tick.

use joist_input::{InputEvent, Viewport};

use crate::player::PlaybackSummary;

/// Something the display can show or hide: the home screen or one of the
/// content screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DisplayTarget {
    Home,
    Screen(usize),
}

/// The rendering surface.
pub trait Display {
    /// Current viewport in logical pixels.
    fn viewport_size(&self) -> Viewport;

    /// Apply a new viewport size.
    fn resize(&mut self, viewport: Viewport);

    /// Toggle one target's visibility (the `setVisible` strategy).
    fn set_visible(&mut self, target: DisplayTarget, visible: bool);

    /// Make `target` the only attached child (the `setChildren` strategy).
    fn attach_only(&mut self, target: DisplayTarget);

    fn set_background(&mut self, color: &str);

    /// Trigger one redraw pass.
    fn redraw(&mut self);

    /// Accessibility features were requested at startup.
    fn set_accessibility(&mut self, _enabled: bool) {}
}

/// Delivers input events into the scene (hit-testing is not ours).
pub trait InputDispatcher {
    fn dispatch(&mut self, event: &InputEvent);
}

/// One content screen: a model plus a view.
pub trait Screen {
    fn name(&self) -> &str;

    fn background_color(&self) -> &str {
        "white"
    }

    /// Advance the model. Never called with a zero delta.
    fn step_model(&mut self, dt: f64);

    /// Advance view-side animation.
    fn step_view(&mut self, _dt: f64) {}
}

/// Global steppers advanced once per active tick, after the screens
/// (tween engines, timers).
pub trait Stepper {
    fn step(&mut self, dt: f64);
}

/// Shows the playback statistics when a replay finishes.
pub trait Presenter {
    fn report_playback_summary(&mut self, summary: &PlaybackSummary);
}

/// Reports playback statistics through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn report_playback_summary(&mut self, summary: &PlaybackSummary) {
        tracing::info!(
            frames = summary.frames,
            elapsed_ms = summary.elapsed_millis,
            fps = summary.frames_per_second,
            ms_per_frame = summary.average_millis_per_frame,
            "playback complete"
        );
    }
}
