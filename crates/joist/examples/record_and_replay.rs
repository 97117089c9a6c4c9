//! Record a fuzzed session headlessly, then replay it and compare.
//!
//! ```sh
//! cargo run -p joist --example record_and_replay -- "fuzzMouse&fuzzRate=3&fuzzSeed=7"
//! RUST_LOG=joist=debug cargo run -p joist --example record_and_replay
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use joist::logging::init_tracing;
use joist::prelude::*;

#[derive(Debug, Clone, Default, PartialEq)]
struct Spring {
    displacement: f64,
    velocity: f64,
    grabs: u32,
}

struct SpringScreen(Rc<RefCell<Spring>>);

impl Screen for SpringScreen {
    fn name(&self) -> &str {
        "spring"
    }

    fn step_model(&mut self, dt: f64) {
        let mut s = self.0.borrow_mut();
        let accel = -4.0 * s.displacement - 0.2 * s.velocity;
        s.velocity += accel * dt;
        s.displacement += s.velocity * dt;
    }
}

struct SpringInput(Rc<RefCell<Spring>>);

impl InputDispatcher for SpringInput {
    fn dispatch(&mut self, event: &InputEvent) {
        if event.kind == InputEventKind::MouseDown {
            let mut s = self.0.borrow_mut();
            s.grabs += 1;
            s.displacement = event.y / 100.0;
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let query = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "fuzzMouse&fuzzRate=2&fuzzSeed=42".to_owned());

    // -- record --------------------------------------------------------------
    let recorded = Rc::new(RefCell::new(Spring::default()));
    let options = SimOptions::default()
        .with_query(&query)?
        .with_query("recordInputEventLog&inputEventLogName=demo")?;
    let mut sim = SimBuilder::new("spring-lab")
        .options(options)
        .screen(SpringScreen(recorded.clone()))
        .input_dispatcher(SpringInput(recorded.clone()))
        .build()?;
    run_headless(
        &mut sim,
        &HeadlessConfig {
            max_ticks: Some(300),
            frame_interval: Some(std::time::Duration::from_millis(2)),
        },
    );

    let mut transport = MemoryTransport::new();
    let destination = sim.recording_destination("localhost");
    let status = sim.export_and_transmit(&destination, &mut transport);
    tracing::info!(?status, "recording exported");
    let payload = sim
        .export_input_event_log()
        .ok_or_else(|| anyhow::anyhow!("recording was not enabled"))?;
    let trace = PlaybackTrace::parse(&payload)?;
    tracing::info!(
        frames = trace.len(),
        events = trace.event_count(),
        digest = %trace.digest(),
        "trace captured"
    );

    // -- replay --------------------------------------------------------------
    let replayed = Rc::new(RefCell::new(Spring::default()));
    let options =
        SimOptions::default().with_query("playbackInputEventLog&inputEventLogName=demo")?;
    let mut sim = SimBuilder::new("spring-lab")
        .options(options)
        .screen(SpringScreen(replayed.clone()))
        .input_dispatcher(SpringInput(replayed.clone()))
        .trace_source(InlineTraceSource::new().with("demo", payload))
        .build()?;
    let report = run_headless(&mut sim, &HeadlessConfig::default());

    let matches = *recorded.borrow() == *replayed.borrow();
    tracing::info!(
        ticks = report.ticks,
        matches,
        recorded = ?recorded.borrow(),
        replayed = ?replayed.borrow(),
        "replay complete"
    );
    anyhow::ensure!(matches, "replayed state diverged from the recording");
    Ok(())
}
