//! Integration tests for recording a live session and replaying it.
//!
//! A recorded run replayed against the same initial state must reproduce the
//! same model state, the same delivered events, and the same viewport
//! history. Playback statistics and the player's state history are checked
//! against a hand-driven clock.

use std::cell::RefCell;
use std::rc::Rc;

use joist::prelude::*;

// ---------------------------------------------------------------------------
// Test model
// ---------------------------------------------------------------------------

/// A cart whose velocity is kicked by mouse presses.
#[derive(Debug, Clone, Default, PartialEq)]
struct Cart {
    position: f64,
    velocity: f64,
    presses: u32,
    simulated_seconds: f64,
    model_steps: u32,
}

type SharedCart = Rc<RefCell<Cart>>;

struct CartScreen(SharedCart);

impl Screen for CartScreen {
    fn name(&self) -> &str {
        "cart"
    }

    fn background_color(&self) -> &str {
        "rgb(240,240,255)"
    }

    fn step_model(&mut self, dt: f64) {
        let mut cart = self.0.borrow_mut();
        cart.position += cart.velocity * dt;
        cart.simulated_seconds += dt;
        cart.model_steps += 1;
    }
}

struct CartInput(SharedCart);

impl InputDispatcher for CartInput {
    fn dispatch(&mut self, event: &InputEvent) {
        let mut cart = self.0.borrow_mut();
        match event.kind {
            InputEventKind::MouseDown => {
                cart.presses += 1;
                cart.velocity += event.x / 100.0;
            }
            InputEventKind::MouseMove => cart.velocity *= 0.99,
            _ => {}
        }
    }
}

/// Advances a manual clock each step, standing in for time spent rendering.
struct ClockAdvance {
    time: ManualTimeSource,
    millis: f64,
}

impl Stepper for ClockAdvance {
    fn step(&mut self, _dt: f64) {
        self.time.advance(self.millis);
    }
}

#[derive(Clone, Default)]
struct CapturingPresenter(Rc<RefCell<Vec<PlaybackSummary>>>);

impl Presenter for CapturingPresenter {
    fn report_playback_summary(&mut self, summary: &PlaybackSummary) {
        self.0.borrow_mut().push(summary.clone());
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const FRAME_MILLIS: [f64; 6] = [16.0, 17.0, 0.0, 33.0, 16.5, 8.0];

struct Recorded {
    payload: String,
    cart: Cart,
    viewport: Viewport,
    frames: usize,
}

fn record_session(ticks: usize, seed: u64) -> Recorded {
    let cart = SharedCart::default();
    let time = ManualTimeSource::new();
    let display = HeadlessDisplay::new(Viewport::new(800, 600));
    let options = SimOptions {
        record_input_event_log: true,
        fuzz_mouse: true,
        fuzz_rate: 2,
        fuzz_seed: Some(seed),
        ..Default::default()
    };
    let mut sim = SimBuilder::new("cart-lab")
        .options(options)
        .screen(CartScreen(cart.clone()))
        .input_dispatcher(CartInput(cart.clone()))
        .display(display.clone())
        .time_source(time.clone())
        .build()
        .unwrap();

    sim.start();
    for i in 0..ticks {
        assert!(sim.take_scheduled_tick());
        if i == ticks / 2 {
            sim.resize(Viewport::new(1024, 640));
        }
        sim.tick();
        time.advance(FRAME_MILLIS[i % FRAME_MILLIS.len()]);
    }

    let payload = sim.export_input_event_log().unwrap();
    let cart = cart.borrow().clone();
    Recorded {
        payload,
        cart,
        viewport: display.snapshot().viewport,
        frames: sim.recorder().len(),
    }
}

fn playback_sim(
    payload: &str,
    cart: &SharedCart,
    display: &HeadlessDisplay,
    presenter: &CapturingPresenter,
) -> Sim {
    let time = ManualTimeSource::new();
    let options = SimOptions {
        playback_input_event_log: true,
        input_event_log_name: "cart-run".to_owned(),
        ..Default::default()
    };
    SimBuilder::new("cart-lab")
        .options(options)
        .screen(CartScreen(cart.clone()))
        .input_dispatcher(CartInput(cart.clone()))
        .display(display.clone())
        .presenter(presenter.clone())
        .time_source(time.clone())
        .timer_stepper(ClockAdvance { time, millis: 10.0 })
        .trace_source(InlineTraceSource::new().with("cart-run", payload))
        .build()
        .unwrap()
}

// ---------------------------------------------------------------------------
// 1. Round trip
// ---------------------------------------------------------------------------

#[test]
fn replay_reproduces_recorded_model_state() {
    let recorded = record_session(120, 42);
    assert_eq!(recorded.frames, 120);
    assert!(recorded.cart.presses > 0, "fuzzer should have pressed at least once");

    let cart = SharedCart::default();
    let display = HeadlessDisplay::new(Viewport::new(320, 200));
    let presenter = CapturingPresenter::default();
    let mut sim = playback_sim(&recorded.payload, &cart, &display, &presenter);

    let report = run_headless(&mut sim, &HeadlessConfig::default());
    assert_eq!(report.stop, StopReason::PlaybackFinished);
    assert_eq!(report.ticks, 120);

    assert_eq!(*cart.borrow(), recorded.cart);
    assert_eq!(display.snapshot().viewport, recorded.viewport);
}

#[test]
fn replay_applies_recorded_resizes_in_order() {
    let recorded = record_session(40, 3);
    let cart = SharedCart::default();
    let display = HeadlessDisplay::new(Viewport::new(1, 1));
    let presenter = CapturingPresenter::default();
    let mut sim = playback_sim(&recorded.payload, &cart, &display, &presenter);
    run_headless(&mut sim, &HeadlessConfig::default());

    assert_eq!(
        display.snapshot().resizes,
        vec![Viewport::new(800, 600), Viewport::new(1024, 640)]
    );
}

#[test]
fn recording_twice_is_deterministic_for_a_seed() {
    let a = record_session(60, 9);
    let b = record_session(60, 9);
    let trace_a = PlaybackTrace::parse(&a.payload).unwrap();
    let trace_b = PlaybackTrace::parse(&b.payload).unwrap();

    // Wall-clock timestamps are diagnostic; everything replayed must match.
    for (fa, fb) in trace_a.frames().iter().zip(trace_b.frames()) {
        assert_eq!(fa.delta_time_seconds, fb.delta_time_seconds);
        assert_eq!(fa.events, fb.events);
        assert_eq!(fa.viewport, fb.viewport);
    }
    assert_eq!(a.cart, b.cart);
}

#[test]
fn first_recorded_frame_uses_nominal_delta() {
    let recorded = record_session(3, 1);
    let trace = PlaybackTrace::parse(&recorded.payload).unwrap();
    assert_eq!(trace.frames()[0].delta_time_seconds, NOMINAL_FIRST_DT);
    assert_eq!(trace.frames()[0].viewport, Some(Viewport::new(800, 600)));
    assert_eq!(trace.frames()[1].delta_time_seconds, 0.016);
    assert_eq!(trace.frames()[2].delta_time_seconds, 0.017);
}

// ---------------------------------------------------------------------------
// 2. Playback statistics and lifecycle
// ---------------------------------------------------------------------------

fn uniform_trace(frames: u64) -> String {
    let mut recorder = EventRecorder::new();
    recorder.begin_recording(Viewport::new(640, 480));
    for i in 0..frames {
        let events = if i % 10 == 0 {
            vec![InputEvent::mouse(InputEventKind::MouseDown, 50.0, 50.0)]
        } else {
            Vec::new()
        };
        recorder.on_tick(1.0 / 60.0, &events, Viewport::new(640, 480), i * 16);
    }
    recorder.export()
}

#[test]
fn hundred_frame_playback_reports_statistics() {
    let cart = SharedCart::default();
    let display = HeadlessDisplay::new(Viewport::new(640, 480));
    let presenter = CapturingPresenter::default();
    let mut sim = playback_sim(&uniform_trace(100), &cart, &display, &presenter);

    let report = run_headless(&mut sim, &HeadlessConfig::default());
    assert_eq!(report.ticks, 100);
    assert_eq!(cart.borrow().model_steps, 100);
    assert_eq!(cart.borrow().presses, 10);

    let reported = presenter.0.borrow();
    assert_eq!(reported.len(), 1);
    let summary = &reported[0];
    assert_eq!(summary.frames, 100);
    assert_eq!(summary.elapsed_millis, 1000.0);
    assert_eq!(
        summary.frames_per_second,
        100.0 / (summary.elapsed_millis / 1000.0)
    );
    assert_eq!(summary.average_millis_per_frame, 10.0);
    assert_eq!(report.summary.as_ref(), Some(summary));

    assert_eq!(
        sim.player().history(),
        &[
            PlayerState::Idle,
            PlayerState::Loading,
            PlayerState::Playing,
            PlayerState::Finished
        ]
    );
    assert_eq!(sim.frame_counter(), 100);
}

#[test]
fn playback_stops_scheduling_after_last_frame() {
    let cart = SharedCart::default();
    let display = HeadlessDisplay::new(Viewport::new(640, 480));
    let presenter = CapturingPresenter::default();
    let mut sim = playback_sim(&uniform_trace(3), &cart, &display, &presenter);

    sim.start();
    let mut outcomes = Vec::new();
    while sim.take_scheduled_tick() {
        outcomes.push(sim.tick());
    }
    assert_eq!(outcomes.len(), 3);
    assert!(matches!(outcomes[2], TickOutcome::PlaybackFinished(_)));
    assert_eq!(sim.player().state(), PlayerState::Finished);
}

#[test]
fn playback_discards_live_input() {
    let cart = SharedCart::default();
    let display = HeadlessDisplay::new(Viewport::new(640, 480));
    let presenter = CapturingPresenter::default();
    let mut sim = playback_sim(&uniform_trace(5), &cart, &display, &presenter);

    sim.start();
    while sim.take_scheduled_tick() {
        sim.push_input(InputEvent::mouse(InputEventKind::MouseDown, 900.0, 1.0));
        sim.tick();
    }
    // Only the recorded press at frame 0 reaches the model.
    assert_eq!(cart.borrow().presses, 1);
    assert_eq!(sim.pending_input(), 0);
}

#[test]
fn empty_trace_finishes_on_first_tick() {
    let cart = SharedCart::default();
    let display = HeadlessDisplay::new(Viewport::new(640, 480));
    let presenter = CapturingPresenter::default();
    let mut sim = playback_sim("[]", &cart, &display, &presenter);

    let report = run_headless(&mut sim, &HeadlessConfig::default());
    assert_eq!(report.ticks, 1);
    assert_eq!(report.stop, StopReason::PlaybackFinished);
    let summary = report.summary.unwrap();
    assert_eq!(summary.frames, 0);
    assert_eq!(summary.frames_per_second, 0.0);
    assert_eq!(cart.borrow().model_steps, 0);
}

#[test]
fn malformed_trace_is_fatal_at_build() {
    let options = SimOptions {
        playback_input_event_log: true,
        input_event_log_name: "broken".to_owned(),
        ..Default::default()
    };
    let result = SimBuilder::new("cart-lab")
        .options(options)
        .screen(CartScreen(SharedCart::default()))
        .trace_source(InlineTraceSource::new().with("broken", "[{\"dt\": \"soon\"}]"))
        .build();

    match result {
        Err(SimError::PlaybackLoad { name, source }) => {
            assert_eq!(name, "broken");
            assert!(matches!(source, TraceError::Parse(_)));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("malformed trace must not build"),
    }
}

// ---------------------------------------------------------------------------
// 3. Transmission
// ---------------------------------------------------------------------------

#[test]
fn recording_posts_to_sim_and_session_endpoint() {
    let options = SimOptions {
        record_input_event_log: true,
        input_event_log_name: "chrome".to_owned(),
        ..Default::default()
    };
    let mut sim = SimBuilder::new("faradays-law")
        .options(options)
        .screen(CartScreen(SharedCart::default()))
        .time_source(ManualTimeSource::new())
        .build()
        .unwrap();
    sim.start();

    let destination = sim.recording_destination("localhost");
    let mut transport = MemoryTransport::new();
    let status = sim.export_and_transmit(&destination, &mut transport);
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
fn live_run_skips_transmission() {
    let mut sim = SimBuilder::new("live")
        .screen(CartScreen(SharedCart::default()))
        .time_source(ManualTimeSource::new())
        .build()
        .unwrap();
    sim.start();
    sim.tick();

    let mut transport = MemoryTransport::new();
    let status = sim.export_and_transmit(&sim.recording_destination("localhost"), &mut transport);
    assert_eq!(status, TransmitStatus::Skipped);
    assert!(transport.submissions().is_empty());
    assert_eq!(sim.export_input_event_log(), None);
}

// ---------------------------------------------------------------------------
// 4. Navigation replay
// ---------------------------------------------------------------------------

struct Counter {
    name: &'static str,
    steps: Rc<RefCell<u32>>,
}

impl Screen for Counter {
    fn name(&self) -> &str {
        self.name
    }

    fn step_model(&mut self, _dt: f64) {
        *self.steps.borrow_mut() += 1;
    }
}

type Counts = [Rc<RefCell<u32>>; 2];

fn steps(counts: &Counts) -> (u32, u32) {
    (*counts[0].borrow(), *counts[1].borrow())
}

fn counter_sim(options: SimOptions, counts: &Counts) -> SimBuilder {
    SimBuilder::new("two-labs")
        .options(options)
        .screen(Counter {
            name: "first",
            steps: counts[0].clone(),
        })
        .screen(Counter {
            name: "second",
            steps: counts[1].clone(),
        })
}

/// Record `ticks` frames 16 ms apart, calling `navigate` before each tick.
fn record_navigation(
    show_home_screen: bool,
    ticks: usize,
    mut navigate: impl FnMut(&mut Sim, usize),
) -> (String, (u32, u32)) {
    let counts = Counts::default();
    let time = ManualTimeSource::new();
    let options = SimOptions {
        record_input_event_log: true,
        show_home_screen,
        ..Default::default()
    };
    let mut sim = counter_sim(options, &counts)
        .time_source(time.clone())
        .build()
        .unwrap();

    sim.start();
    for i in 0..ticks {
        navigate(&mut sim, i);
        sim.tick();
        time.advance(16.0);
    }
    (sim.export_input_event_log().unwrap(), steps(&counts))
}

fn replay_navigation(show_home_screen: bool, payload: &str) -> ((u32, u32), Sim) {
    let counts = Counts::default();
    let options = SimOptions {
        playback_input_event_log: true,
        show_home_screen,
        ..Default::default()
    };
    let mut sim = counter_sim(options, &counts)
        .time_source(ManualTimeSource::new())
        .trace_source(InlineTraceSource::new().with("session", payload))
        .build()
        .unwrap();
    let report = run_headless(&mut sim, &HeadlessConfig::default());
    assert_eq!(report.stop, StopReason::PlaybackFinished);
    (steps(&counts), sim)
}

#[test]
fn screen_changes_replay_on_the_frames_they_were_made() {
    let (payload, recorded) = record_navigation(false, 6, |sim, i| {
        if i == 2 {
            sim.select_screen(1).unwrap();
        }
    });
    assert_eq!(recorded, (2, 4));

    let trace = PlaybackTrace::parse(&payload).unwrap();
    assert!(trace.frames()[1].navigation.is_empty());
    assert_eq!(
        trace.frames()[2].navigation,
        vec![Navigation::SelectScreen { index: 1 }]
    );

    let (replayed, sim) = replay_navigation(false, &payload);
    assert_eq!(replayed, recorded);
    assert_eq!(sim.selection().current_screen(), Some(1));
}

#[test]
fn home_screen_round_trips_replay() {
    let (payload, recorded) = record_navigation(true, 8, |sim, i| match i {
        2 => sim.select_screen(0).unwrap(),
        4 => assert!(sim.go_home()),
        6 => sim.select_screen(1).unwrap(),
        _ => {}
    });
    assert_eq!(recorded, (2, 2));

    let (replayed, sim) = replay_navigation(true, &payload);
    assert_eq!(replayed, recorded);
    assert_eq!(sim.selection().current_screen(), Some(1));
}

#[test]
fn pause_and_resume_replay_without_extra_steps() {
    let (payload, recorded) = record_navigation(false, 6, |sim, i| match i {
        1 => sim.set_active(false),
        3 => sim.set_active(true),
        _ => {}
    });
    assert_eq!(recorded, (4, 0));

    let (replayed, sim) = replay_navigation(false, &payload);
    assert_eq!(replayed, recorded);
    assert!(sim.selection().is_active());
}

#[test]
fn host_navigation_is_ignored_during_playback() {
    let (payload, recorded) = record_navigation(false, 3, |_, _| {});
    assert_eq!(recorded, (3, 0));

    let counts = Counts::default();
    let options = SimOptions {
        playback_input_event_log: true,
        show_home_screen: false,
        ..Default::default()
    };
    let mut sim = counter_sim(options, &counts)
        .time_source(ManualTimeSource::new())
        .trace_source(InlineTraceSource::new().with("session", payload))
        .build()
        .unwrap();
    sim.start();
    sim.select_screen(1).unwrap();
    sim.set_active(false);
    assert_eq!(sim.selection().current_screen(), Some(0));
    assert!(sim.selection().is_active());

    run_headless(&mut sim, &HeadlessConfig::default());
    assert_eq!(steps(&counts), recorded);
}
