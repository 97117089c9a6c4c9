//! Headless hosting: a frame loop without a window, plus in-memory
//! collaborators for it.
//!
//! [`run_headless`] stands in for a display's frame callback:
//! it runs a tick only when the simulation asked for one, so a finished
//! playback or a teardown stops it naturally. A tick limit bounds live runs,
//! which otherwise go on until torn down.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::{Duration, Instant};

use joist_input::{InputEvent, Viewport};

use crate::collaborators::{Display, DisplayTarget, InputDispatcher};
use crate::player::PlaybackSummary;
use crate::sim::{Sim, TickOutcome};

// ---------------------------------------------------------------------------
// run_headless
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Stop after this many ticks. `None` runs until the simulation stops
    /// scheduling ticks.
    pub max_ticks: Option<u64>,
    /// Pace ticks to at most one per interval. `None` runs flat out.
    pub frame_interval: Option<Duration>,
}

/// Why [`run_headless`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    PlaybackFinished,
    TornDown,
    TickLimit,
    /// No tick was scheduled and there was nothing left to play.
    Halted,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    /// Ticks that ran.
    pub ticks: u64,
    pub stop: StopReason,
    /// Set when a playback finished during the run.
    pub summary: Option<PlaybackSummary>,
    pub elapsed: Duration,
}

/// Drive `sim` until it stops scheduling ticks or the tick limit is hit.
///
/// Starts the simulation first if the caller has not.
pub fn run_headless(sim: &mut Sim, config: &HeadlessConfig) -> RunReport {
    let run_start = Instant::now();
    if !sim.is_started() {
        sim.start();
    }

    let mut ticks = 0u64;
    let mut summary = None;
    let stop = loop {
        if config.max_ticks.is_some_and(|max| ticks >= max) {
            break StopReason::TickLimit;
        }
        if !sim.take_scheduled_tick() {
            break if sim.is_torn_down() {
                StopReason::TornDown
            } else {
                StopReason::Halted
            };
        }

        let frame_start = Instant::now();
        match sim.tick() {
            TickOutcome::Continue => ticks += 1,
            TickOutcome::PlaybackFinished(finished) => {
                ticks += 1;
                summary = Some(finished);
                break StopReason::PlaybackFinished;
            }
            TickOutcome::Halted => {
                ticks += 1;
                break StopReason::Halted;
            }
            TickOutcome::TornDown => break StopReason::TornDown,
        }

        if let Some(interval) = config.frame_interval {
            std::thread::sleep(interval.saturating_sub(frame_start.elapsed()));
        }
    };

    let report = RunReport {
        ticks,
        stop,
        summary,
        elapsed: run_start.elapsed(),
    };
    tracing::info!(
        ticks = report.ticks,
        stop = ?report.stop,
        elapsed_ms = report.elapsed.as_secs_f64() * 1000.0,
        "headless run finished"
    );
    report
}

// ---------------------------------------------------------------------------
// HeadlessDisplay
// ---------------------------------------------------------------------------

/// What a [`HeadlessDisplay`] has been told so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadlessDisplayState {
    pub viewport: Viewport,
    /// Targets currently visible (`setVisible` strategy).
    pub visible: BTreeSet<DisplayTarget>,
    /// Target currently attached (`setChildren` strategy).
    pub attached: Option<DisplayTarget>,
    /// Every target ever made visible or attached.
    pub shown: BTreeSet<DisplayTarget>,
    pub background: String,
    pub redraws: u64,
    /// Every resize applied, in order.
    pub resizes: Vec<Viewport>,
    pub accessibility: bool,
}

/// A display with no surface. Clones share state, so a caller can keep a
/// handle after giving one to the simulation.
#[derive(Debug, Clone, Default)]
pub struct HeadlessDisplay {
    state: Rc<RefCell<HeadlessDisplayState>>,
}

impl HeadlessDisplay {
    pub fn new(viewport: Viewport) -> Self {
        let display = Self::default();
        display.state.borrow_mut().viewport = viewport;
        display
    }

    pub fn snapshot(&self) -> HeadlessDisplayState {
        self.state.borrow().clone()
    }
}

impl Display for HeadlessDisplay {
    fn viewport_size(&self) -> Viewport {
        self.state.borrow().viewport
    }

    fn resize(&mut self, viewport: Viewport) {
        let mut state = self.state.borrow_mut();
        state.viewport = viewport;
        state.resizes.push(viewport);
    }

    fn set_visible(&mut self, target: DisplayTarget, visible: bool) {
        let mut state = self.state.borrow_mut();
        if visible {
            state.visible.insert(target);
            state.shown.insert(target);
        } else {
            state.visible.remove(&target);
        }
    }

    fn attach_only(&mut self, target: DisplayTarget) {
        let mut state = self.state.borrow_mut();
        state.attached = Some(target);
        state.shown.insert(target);
    }

    fn set_background(&mut self, color: &str) {
        self.state.borrow_mut().background = color.to_owned();
    }

    fn redraw(&mut self) {
        self.state.borrow_mut().redraws += 1;
    }

    fn set_accessibility(&mut self, enabled: bool) {
        self.state.borrow_mut().accessibility = enabled;
    }
}

// ---------------------------------------------------------------------------
// Dispatchers
// ---------------------------------------------------------------------------

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDispatcher;

impl InputDispatcher for NoopDispatcher {
    fn dispatch(&mut self, _event: &InputEvent) {}
}

/// Keeps every dispatched event. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct CollectingDispatcher {
    events: Rc<RefCell<Vec<InputEvent>>>,
}

impl CollectingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<InputEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl InputDispatcher for CollectingDispatcher {
    fn dispatch(&mut self, event: &InputEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
