//! Open a window and run a two-screen simulation driven by real input.
//!
//! ```sh
//! cargo run -p joist --features windowed --example windowed_sim
//! cargo run -p joist --features windowed --example windowed_sim -- "showHomeScreen=false&screenIndex=1"
//! ```

use joist::logging::init_tracing;
use joist::prelude::*;
use joist::windowed::run_windowed;

/// A screen that only accumulates elapsed time.
struct Tracer {
    name: &'static str,
    elapsed: f64,
}

impl Screen for Tracer {
    fn name(&self) -> &str {
        self.name
    }

    fn background_color(&self) -> &str {
        "rgb(20,24,40)"
    }

    fn step_model(&mut self, dt: f64) {
        self.elapsed += dt;
    }
}

struct LoggingInput;

impl InputDispatcher for LoggingInput {
    fn dispatch(&mut self, event: &InputEvent) {
        if event.kind != InputEventKind::MouseMove {
            tracing::info!(kind = ?event.kind, x = event.x, y = event.y, "input");
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let query = std::env::args().nth(1).unwrap_or_default();
    let options = SimOptions::default().with_query(&query)?;
    let mut sim = SimBuilder::new("tracer")
        .options(options)
        .screen(Tracer {
            name: "first",
            elapsed: 0.0,
        })
        .screen(Tracer {
            name: "second",
            elapsed: 0.0,
        })
        .input_dispatcher(LoggingInput)
        .build()?;
    // There is no home-screen UI in this demo; go straight to a screen.
    if sim.selection().show_home_screen() {
        sim.select_screen(0)?;
    }

    run_windowed(sim, "joist")
}
