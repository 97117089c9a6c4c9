//! The sim runner: lifecycle and the per-tick pipeline.
//!
//! A [`Sim`] owns the screens, the selection state, the input buffer, the
//! recorder and player, and the boxed collaborators. The host calls
//! [`Sim::start`] once and then runs [`Sim::tick`] whenever
//! [`Sim::take_scheduled_tick`] reports a pending request. Each tick:
//!
//! 1. Returns immediately if teardown was requested.
//! 2. Increments the frame counter.
//! 3. In playback mode, discards live input and lets the [`EventPlayer`]
//!    apply the next recorded frame (resize, events, step).
//! 4. Otherwise, appends fuzzed input (if enabled), delivers the buffered
//!    input when active or discards it when inactive, measures the delta,
//!    steps the simulation, and records the frame when recording.
//! 5. Redraws.
//! 6. Re-arms the scheduler unless torn down or playback finished.
//!
//! Navigation (screen changes, home, pause and resume) is applied at once,
//! and while recording it is also noted for the next frame so playback
//! reproduces it. During playback the trace drives navigation and host
//! requests are ignored. Going inactive drops any input still buffered.
//!
//! Stepping only happens while active. The current screen's model is
//! skipped on the home screen and for a zero delta; its view, the tween
//! stepper, and the timer stepper always step while active.
//!
//! # Example
//!
//! ```
//! use joist::prelude::*;
//!
//! struct Counter;
//! impl Screen for Counter {
//!     fn name(&self) -> &str { "counter" }
//!     fn step_model(&mut self, _dt: f64) {}
//! }
//!
//! let time = ManualTimeSource::new();
//! let mut sim = SimBuilder::new("counter")
//!     .screen(Counter)
//!     .time_source(time.clone())
//!     .build()
//!     .unwrap();
//!
//! sim.start();
//! while sim.take_scheduled_tick() && sim.frame_counter() < 3 {
//!     time.advance(16.0);
//!     sim.tick();
//! }
//! assert_eq!(sim.frame_counter(), 3);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use joist_input::buffer::InputBuffer;
use joist_input::fuzz::InputFuzzer;
use joist_input::{InputEvent, Viewport};
use joist_trace::{
    EventRecorder, Navigation, RecordingDestination, TraceError, TraceSource, TraceTransport,
    TransmitStatus,
};

use crate::clock::{FrameClock, Scheduler, SystemTimeSource, TimeSource};
use crate::collaborators::{Display, InputDispatcher, LogPresenter, Presenter, Screen, Stepper};
use crate::display::{background_for, DisplayStrategy};
use crate::host::{HeadlessDisplay, NoopDispatcher};
use crate::options::{RunMode, SimOptions};
use crate::player::{EventPlayer, PlaybackSummary, PlaybackTarget, PlaybackTick};
use crate::screen::{HomeScreen, ScreenSelection};
use crate::SimError;

/// Viewport of the default headless display.
pub const DEFAULT_VIEWPORT: Viewport = Viewport {
    width: 1024,
    height: 768,
};

// ---------------------------------------------------------------------------
// TickOutcome / TickDiagnostics
// ---------------------------------------------------------------------------

/// What one call to [`Sim::tick`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A frame ran and another tick was scheduled.
    Continue,
    /// The last playback frame ran; the loop is not re-armed.
    PlaybackFinished(PlaybackSummary),
    /// Playback mode with nothing left to play; the loop is not re-armed.
    Halted,
    /// Teardown was requested; nothing ran.
    TornDown,
}

/// Diagnostics from the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    pub frame: u64,
    /// Delta applied to the simulation this tick.
    pub dt: f64,
    pub events_delivered: usize,
    pub events_discarded: usize,
    pub model_stepped: bool,
    pub view_stepped: bool,
    /// Wall-clock time spent in the tick.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// TeardownHandle
// ---------------------------------------------------------------------------

/// Cancellation token checked at the top of every tick.
///
/// Clones share the flag, so the handle can be given to whatever decides
/// the simulation should stop (a window close, a test, another thread).
#[derive(Debug, Clone, Default)]
pub struct TeardownHandle(Arc<AtomicBool>);

impl TeardownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Everything stepping and navigation touch.
struct Stage {
    screens: Vec<Box<dyn Screen>>,
    selection: ScreenSelection,
    home: Option<HomeScreen>,
    strategy: DisplayStrategy,
    tweens: Option<Box<dyn Stepper>>,
    timer: Option<Box<dyn Stepper>>,
}

#[derive(Debug, Clone, Copy, Default)]
struct StepReport {
    model_stepped: bool,
    view_stepped: bool,
}

impl Stage {
    fn step(&mut self, dt: f64) -> StepReport {
        let mut report = StepReport::default();
        if !self.selection.is_active() {
            return report;
        }

        if let Some(index) = self.selection.current_screen() {
            let screen = &mut self.screens[index];
            if dt != 0.0 {
                screen.step_model(dt);
                report.model_stepped = true;
            }
            screen.step_view(dt);
            report.view_stepped = true;
        }
        if let Some(tweens) = self.tweens.as_mut() {
            tweens.step(dt);
        }
        if let Some(timer) = self.timer.as_mut() {
            timer.step(dt);
        }
        report
    }

    /// Apply one navigation change and refresh the display. Returns whether
    /// anything changed.
    fn navigate(
        &mut self,
        display: &mut dyn Display,
        navigation: Navigation,
    ) -> Result<bool, SimError> {
        let handler = self.strategy.handler();
        match navigation {
            Navigation::SelectScreen { index } => {
                self.selection.select_screen(index)?;
                tracing::info!(index, "screen selected");
                handler.on_screen_changed(display, &self.selection);
            }
            Navigation::GoHome => {
                if !self.selection.go_home() {
                    tracing::debug!("no home screen to return to");
                    return Ok(false);
                }
                tracing::info!("home screen shown");
                handler.on_home_toggled(display, &self.selection);
            }
            Navigation::SetActive { active } => {
                if !self.selection.set_active(active) {
                    return Ok(false);
                }
                tracing::info!(active, "simulation active state changed");
            }
        }
        self.refresh_background(display);
        Ok(true)
    }

    fn refresh_background(&self, display: &mut dyn Display) {
        let current = self
            .selection
            .current_screen()
            .map(|index| self.screens[index].as_ref());
        display.set_background(background_for(current, self.home.as_ref()));
    }
}

/// Routes replayed frames into the live collaborators.
struct PlaybackBridge<'a> {
    display: &'a mut Box<dyn Display>,
    input: &'a mut Box<dyn InputDispatcher>,
    stage: &'a mut Stage,
    dispatched: usize,
    dt: f64,
    report: StepReport,
}

impl PlaybackTarget for PlaybackBridge<'_> {
    fn navigate(&mut self, navigation: Navigation) {
        if let Err(err) = self.stage.navigate(&mut **self.display, navigation) {
            tracing::warn!(?navigation, error = %err, "recorded navigation not applied");
        }
    }

    fn resize(&mut self, viewport: Viewport) {
        self.display.resize(viewport);
    }

    fn dispatch(&mut self, event: &InputEvent) {
        self.input.dispatch(event);
        self.dispatched += 1;
    }

    fn step(&mut self, dt: f64) {
        self.dt = dt;
        self.report = self.stage.step(dt);
    }
}

// ---------------------------------------------------------------------------
// Sim
// ---------------------------------------------------------------------------

pub struct Sim {
    name: String,
    options: SimOptions,
    mode: RunMode,
    stage: Stage,
    display: Box<dyn Display>,
    input: Box<dyn InputDispatcher>,
    presenter: Box<dyn Presenter>,
    time: Box<dyn TimeSource>,
    clock: FrameClock,
    scheduler: Scheduler,
    input_buffer: InputBuffer,
    fuzzer: Option<InputFuzzer>,
    recorder: EventRecorder,
    player: EventPlayer,
    frame_counter: u64,
    teardown: TeardownHandle,
    started: bool,
    last_diagnostics: TickDiagnostics,
}

impl Sim {
    pub fn builder(name: impl Into<String>) -> SimBuilder {
        SimBuilder::new(name)
    }

    /// Begin recording (when configured) and schedule the first tick.
    ///
    /// Playback was already loaded by [`SimBuilder::build`]. Calling `start`
    /// twice is ignored.
    pub fn start(&mut self) {
        if self.started {
            tracing::warn!(name = %self.name, "simulation already started");
            return;
        }
        self.started = true;

        if self.mode == RunMode::Recording {
            self.recorder.begin_recording(self.display.viewport_size());
        }
        tracing::info!(
            name = %self.name,
            mode = ?self.mode,
            screens = self.stage.screens.len(),
            home_screen = self.stage.home.is_some(),
            fuzzing = self.fuzzer.is_some(),
            "simulation started"
        );
        self.scheduler.schedule_next_tick();
    }

    /// Consume the pending tick request. Hosts run [`tick`](Self::tick) only
    /// when this returns `true`.
    pub fn take_scheduled_tick(&mut self) -> bool {
        self.scheduler.take_scheduled()
    }

    /// Run one frame.
    pub fn tick(&mut self) -> TickOutcome {
        if self.teardown.is_requested() {
            tracing::trace!(name = %self.name, "tick after teardown ignored");
            return TickOutcome::TornDown;
        }
        let tick_start = Instant::now();
        self.frame_counter += 1;

        let mut diagnostics = TickDiagnostics {
            frame: self.frame_counter,
            ..Default::default()
        };

        let outcome = match self.mode {
            RunMode::Playback => self.tick_playback(&mut diagnostics),
            RunMode::Live | RunMode::Recording => {
                self.tick_live(&mut diagnostics);
                TickOutcome::Continue
            }
        };

        self.display.redraw();

        diagnostics.total_time = tick_start.elapsed();
        self.last_diagnostics = diagnostics;

        let finished = matches!(
            outcome,
            TickOutcome::PlaybackFinished(_) | TickOutcome::Halted
        );
        if !finished && !self.teardown.is_requested() {
            self.scheduler.schedule_next_tick();
        }
        outcome
    }

    fn tick_live(&mut self, diagnostics: &mut TickDiagnostics) {
        if let Some(fuzzer) = self.fuzzer.as_mut() {
            self.input_buffer
                .extend(fuzzer.synthesize(self.display.viewport_size()));
        }

        let delivered = if self.stage.selection.is_active() {
            let events = self.input_buffer.drain();
            for event in &events {
                self.input.dispatch(event);
            }
            events
        } else {
            diagnostics.events_discarded = self.input_buffer.discard();
            Vec::new()
        };
        diagnostics.events_delivered = delivered.len();

        let dt = self.clock.advance(self.time.now_millis());
        let report = self.stage.step(dt);
        diagnostics.dt = dt;
        diagnostics.model_stepped = report.model_stepped;
        diagnostics.view_stepped = report.view_stepped;

        if self.recorder.is_enabled() {
            self.recorder.on_tick(
                dt,
                &delivered,
                self.display.viewport_size(),
                self.time.epoch_millis(),
            );
        }
    }

    fn tick_playback(&mut self, diagnostics: &mut TickDiagnostics) -> TickOutcome {
        // Live input never reaches a replaying simulation.
        diagnostics.events_discarded = self.input_buffer.discard();

        let mut bridge = PlaybackBridge {
            display: &mut self.display,
            input: &mut self.input,
            stage: &mut self.stage,
            dispatched: 0,
            dt: 0.0,
            report: StepReport::default(),
        };
        let tick = self.player.tick(self.time.as_ref(), &mut bridge);

        diagnostics.events_delivered = bridge.dispatched;
        diagnostics.dt = bridge.dt;
        diagnostics.model_stepped = bridge.report.model_stepped;
        diagnostics.view_stepped = bridge.report.view_stepped;

        match tick {
            PlaybackTick::Continue => TickOutcome::Continue,
            PlaybackTick::Finished(summary) => {
                self.presenter.report_playback_summary(&summary);
                TickOutcome::PlaybackFinished(summary)
            }
            PlaybackTick::Inactive => {
                tracing::debug!(state = ?self.player.state(), "no playback frame to apply");
                TickOutcome::Halted
            }
        }
    }

    // -- input and display ---------------------------------------------------

    /// Queue a live input event for the next tick.
    pub fn push_input(&mut self, event: InputEvent) {
        self.input_buffer.push(event);
    }

    /// The host surface changed size.
    pub fn resize(&mut self, viewport: Viewport) {
        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            "viewport resized"
        );
        self.display.resize(viewport);
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_screen(&mut self, index: usize) -> Result<(), SimError> {
        self.navigate(Navigation::SelectScreen { index }).map(|_| ())
    }

    /// Show the home screen. Returns `false` when there is none.
    pub fn go_home(&mut self) -> bool {
        matches!(self.navigate(Navigation::GoHome), Ok(true))
    }

    /// Pause or resume. Going inactive drops every buffered input event, so
    /// input queued before a pause is never delivered.
    pub fn set_active(&mut self, active: bool) {
        // Toggling the active flag cannot fail.
        let _ = self.navigate(Navigation::SetActive { active });
    }

    fn navigate(&mut self, navigation: Navigation) -> Result<bool, SimError> {
        if self.mode == RunMode::Playback {
            tracing::warn!(?navigation, "navigation ignored during playback");
            return Ok(false);
        }
        let changed = self.stage.navigate(self.display.as_mut(), navigation)?;
        if !changed {
            return Ok(false);
        }
        if navigation == (Navigation::SetActive { active: false }) {
            self.input_buffer.discard();
        }
        if self.mode == RunMode::Recording {
            self.recorder.note_navigation(navigation);
        }
        Ok(true)
    }

    // -- teardown ------------------------------------------------------------

    /// Request teardown. The next tick returns [`TickOutcome::TornDown`] and
    /// the loop is not re-armed.
    pub fn destroy(&mut self) {
        tracing::info!(name = %self.name, frames = self.frame_counter, "simulation torn down");
        self.teardown.request();
    }

    pub fn teardown_handle(&self) -> TeardownHandle {
        self.teardown.clone()
    }

    pub fn is_torn_down(&self) -> bool {
        self.teardown.is_requested()
    }

    // -- recording -----------------------------------------------------------

    /// The recorded trace, or `None` when this run is not recording.
    pub fn export_input_event_log(&self) -> Option<String> {
        self.recorder.is_enabled().then(|| self.recorder.export())
    }

    /// The recording server destination for this sim and session.
    pub fn recording_destination(&self, host: impl Into<String>) -> RecordingDestination {
        RecordingDestination::Endpoint {
            host: host.into(),
            sim_name: self.name.clone(),
            session: self.options.input_event_log_name.clone(),
        }
    }

    pub fn export_and_transmit(
        &self,
        destination: &RecordingDestination,
        transport: &mut dyn TraceTransport,
    ) -> TransmitStatus {
        self.recorder.export_and_transmit(destination, transport)
    }

    // -- accessors -----------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &SimOptions {
        &self.options
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Ticks run so far.
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    pub fn selection(&self) -> &ScreenSelection {
        &self.stage.selection
    }

    /// The home screen; `None` for single-screen simulations.
    pub fn home_screen(&self) -> Option<&HomeScreen> {
        self.stage.home.as_ref()
    }

    pub fn screen(&self, index: usize) -> Option<&dyn Screen> {
        self.stage.screens.get(index).map(|screen| screen.as_ref())
    }

    pub fn display(&self) -> &dyn Display {
        self.display.as_ref()
    }

    pub fn recorder(&self) -> &EventRecorder {
        &self.recorder
    }

    pub fn player(&self) -> &EventPlayer {
        &self.player
    }

    /// Live events waiting for the next tick.
    pub fn pending_input(&self) -> usize {
        self.input_buffer.len()
    }

    pub fn accessibility_enabled(&self) -> bool {
        self.options.accessibility
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// SimBuilder
// ---------------------------------------------------------------------------

/// Assembles a [`Sim`]. Every startup misconfiguration is reported by
/// [`build`](Self::build).
pub struct SimBuilder {
    name: String,
    options: SimOptions,
    screens: Vec<Box<dyn Screen>>,
    display: Option<Box<dyn Display>>,
    input: Option<Box<dyn InputDispatcher>>,
    presenter: Option<Box<dyn Presenter>>,
    time: Option<Box<dyn TimeSource>>,
    trace_source: Option<Box<dyn TraceSource>>,
    tweens: Option<Box<dyn Stepper>>,
    timer: Option<Box<dyn Stepper>>,
}

impl SimBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: SimOptions::default(),
            screens: Vec::new(),
            display: None,
            input: None,
            presenter: None,
            time: None,
            trace_source: None,
            tweens: None,
            timer: None,
        }
    }

    pub fn options(mut self, options: SimOptions) -> Self {
        self.options = options;
        self
    }

    /// Append a screen; screens are indexed in the order added.
    pub fn screen(mut self, screen: impl Screen + 'static) -> Self {
        self.screens.push(Box::new(screen));
        self
    }

    /// Defaults to a [`HeadlessDisplay`] at [`DEFAULT_VIEWPORT`].
    pub fn display(mut self, display: impl Display + 'static) -> Self {
        self.display = Some(Box::new(display));
        self
    }

    pub fn input_dispatcher(mut self, input: impl InputDispatcher + 'static) -> Self {
        self.input = Some(Box::new(input));
        self
    }

    /// Defaults to [`LogPresenter`].
    pub fn presenter(mut self, presenter: impl Presenter + 'static) -> Self {
        self.presenter = Some(Box::new(presenter));
        self
    }

    /// Defaults to [`SystemTimeSource`].
    pub fn time_source(mut self, time: impl TimeSource + 'static) -> Self {
        self.time = Some(Box::new(time));
        self
    }

    /// Required in playback mode.
    pub fn trace_source(mut self, source: impl TraceSource + 'static) -> Self {
        self.trace_source = Some(Box::new(source));
        self
    }

    pub fn tween_stepper(mut self, tweens: impl Stepper + 'static) -> Self {
        self.tweens = Some(Box::new(tweens));
        self
    }

    pub fn timer_stepper(mut self, timer: impl Stepper + 'static) -> Self {
        self.timer = Some(Box::new(timer));
        self
    }

    /// Validate the configuration and assemble the simulation.
    ///
    /// In playback mode the trace is fetched and parsed here, so a bad trace
    /// stops the process before the first tick.
    pub fn build(mut self) -> Result<Sim, SimError> {
        if self.screens.is_empty() {
            return Err(SimError::NoScreens);
        }
        let mode = self.options.run_mode()?;
        let selection = ScreenSelection::new(
            self.screens.len(),
            self.options.screen_index,
            self.options.show_home_screen,
        )?;
        let home = selection.has_home_screen().then(|| {
            HomeScreen::new(
                self.screens
                    .iter()
                    .map(|screen| screen.name().to_owned())
                    .collect(),
            )
        });

        let fuzz = self.options.fuzz_config(rand::random());
        let fuzzer = if !fuzz.is_enabled() {
            None
        } else if mode == RunMode::Playback {
            tracing::warn!("input fuzzing is ignored during playback");
            None
        } else {
            tracing::info!(
                seed = fuzz.seed,
                mouse = fuzz.mouse,
                touches = fuzz.touches,
                rate = fuzz.events_per_tick,
                "input fuzzing enabled"
            );
            Some(InputFuzzer::new(fuzz))
        };

        let mut player = EventPlayer::new();
        if mode == RunMode::Playback {
            let name = self.options.input_event_log_name.clone();
            let source = self.trace_source.as_deref_mut().ok_or_else(|| {
                SimError::PlaybackLoad {
                    name: name.clone(),
                    source: TraceError::Fetch {
                        name: name.clone(),
                        details: "no trace source configured".to_owned(),
                    },
                }
            })?;
            player.load(source, &name)?;
        }

        let mut display = self
            .display
            .unwrap_or_else(|| Box::new(HeadlessDisplay::new(DEFAULT_VIEWPORT)));
        display.set_accessibility(self.options.accessibility);

        let mut sim = Sim {
            name: self.name,
            mode,
            stage: Stage {
                screens: self.screens,
                selection,
                home,
                strategy: self.options.screen_display_strategy,
                tweens: self.tweens,
                timer: self.timer,
            },
            display,
            input: self.input.unwrap_or_else(|| Box::new(NoopDispatcher)),
            presenter: self.presenter.unwrap_or_else(|| Box::new(LogPresenter)),
            time: self
                .time
                .unwrap_or_else(|| Box::new(SystemTimeSource::new())),
            clock: FrameClock::new(),
            scheduler: Scheduler::new(),
            input_buffer: InputBuffer::new(),
            fuzzer,
            recorder: EventRecorder::new(),
            player,
            frame_counter: 0,
            teardown: TeardownHandle::new(),
            started: false,
            last_diagnostics: TickDiagnostics::default(),
            options: self.options,
        };

        sim.stage
            .strategy
            .handler()
            .on_screen_changed(sim.display.as_mut(), &sim.stage.selection);
        sim.stage.refresh_background(sim.display.as_mut());
        Ok(sim)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
