//! Seeded synthesis of random mouse and touch input.
//!
//! The [`InputFuzzer`] stands in for a real user during robustness runs. It
//! uses a seeded PCG generator, so the same seed and the same sequence of
//! viewports always produce the same events. Mouse fuzzing keeps track of
//! whether the button is down so that presses and releases pair up; touch
//! fuzzing keeps a small set of live touch ids and only moves or ends touches
//! that were started.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use crate::{InputEvent, InputEventKind, Viewport};

/// Upper bound on simultaneously active synthetic touches.
pub const MAX_ACTIVE_TOUCHES: usize = 5;

// ---------------------------------------------------------------------------
// FuzzConfig
// ---------------------------------------------------------------------------

/// Which input families to synthesize and how much.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzConfig {
    /// Synthesize mouse events.
    pub mouse: bool,
    /// Synthesize touch events.
    pub touches: bool,
    /// Events generated per tick.
    pub events_per_tick: usize,
    /// Seed for the generator.
    pub seed: u64,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            mouse: false,
            touches: false,
            events_per_tick: 1,
            seed: 0,
        }
    }
}

impl FuzzConfig {
    /// Whether any input family is enabled.
    pub fn is_enabled(&self) -> bool {
        (self.mouse || self.touches) && self.events_per_tick > 0
    }
}

// ---------------------------------------------------------------------------
// InputFuzzer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct ActiveTouch {
    id: u32,
    x: f64,
    y: f64,
}

/// Deterministic random input generator.
pub struct InputFuzzer {
    config: FuzzConfig,
    rng: Pcg64,
    mouse_down: bool,
    touches: Vec<ActiveTouch>,
    next_touch_id: u32,
    generated: u64,
}

impl InputFuzzer {
    pub fn new(config: FuzzConfig) -> Self {
        let rng = Pcg64::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            mouse_down: false,
            touches: Vec::new(),
            next_touch_id: 0,
            generated: 0,
        }
    }

    pub fn config(&self) -> &FuzzConfig {
        &self.config
    }

    /// Total events synthesized so far.
    pub fn generated(&self) -> u64 {
        self.generated
    }

    /// Synthesize this tick's events inside `viewport`.
    ///
    /// Returns an empty vector when fuzzing is disabled.
    pub fn synthesize(&mut self, viewport: Viewport) -> Vec<InputEvent> {
        if !self.config.is_enabled() {
            return Vec::new();
        }

        let mut events = Vec::with_capacity(self.config.events_per_tick);
        for _ in 0..self.config.events_per_tick {
            let use_mouse = match (self.config.mouse, self.config.touches) {
                (true, true) => self.rng.gen_bool(0.5),
                (mouse, _) => mouse,
            };
            let event = if use_mouse {
                self.next_mouse_event(viewport)
            } else {
                self.next_touch_event(viewport)
            };
            events.push(event);
        }
        self.generated += events.len() as u64;
        events
    }

    fn random_point(&mut self, viewport: Viewport) -> (f64, f64) {
        // A zero-sized viewport still yields the origin rather than an empty range.
        let width = f64::from(viewport.width.max(1));
        let height = f64::from(viewport.height.max(1));
        (
            self.rng.gen_range(0.0..width),
            self.rng.gen_range(0.0..height),
        )
    }

    fn next_mouse_event(&mut self, viewport: Viewport) -> InputEvent {
        let (x, y) = self.random_point(viewport);
        let kind = if self.mouse_down {
            if self.rng.gen_bool(0.3) {
                self.mouse_down = false;
                InputEventKind::MouseUp
            } else {
                InputEventKind::MouseMove
            }
        } else if self.rng.gen_bool(0.2) {
            self.mouse_down = true;
            InputEventKind::MouseDown
        } else {
            InputEventKind::MouseMove
        };
        InputEvent::mouse(kind, x, y)
    }

    fn next_touch_event(&mut self, viewport: Viewport) -> InputEvent {
        let start_new = self.touches.is_empty()
            || (self.touches.len() < MAX_ACTIVE_TOUCHES && self.rng.gen_bool(0.2));

        if start_new {
            let (x, y) = self.random_point(viewport);
            let id = self.next_touch_id;
            self.next_touch_id = self.next_touch_id.wrapping_add(1);
            self.touches.push(ActiveTouch { id, x, y });
            return InputEvent::touch(InputEventKind::TouchStart, id, x, y);
        }

        let index = self.rng.gen_range(0..self.touches.len());
        if self.rng.gen_bool(0.25) {
            let touch = self.touches.remove(index);
            InputEvent::touch(InputEventKind::TouchEnd, touch.id, touch.x, touch.y)
        } else {
            let (x, y) = self.random_point(viewport);
            let touch = &mut self.touches[index];
            touch.x = x;
            touch.y = y;
            InputEvent::touch(InputEventKind::TouchMove, touch.id, x, y)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mouse: bool, touches: bool, seed: u64) -> FuzzConfig {
        FuzzConfig {
            mouse,
            touches,
            events_per_tick: 4,
            seed,
        }
    }

    #[test]
    fn disabled_fuzzer_produces_nothing() {
        let mut fuzzer = InputFuzzer::new(FuzzConfig::default());
        assert!(fuzzer.synthesize(Viewport::new(100, 100)).is_empty());
        assert_eq!(fuzzer.generated(), 0);
    }

    #[test]
    fn same_seed_same_events() {
        let viewport = Viewport::new(640, 480);
        let mut a = InputFuzzer::new(config(true, true, 42));
        let mut b = InputFuzzer::new(config(true, true, 42));
        for _ in 0..50 {
            assert_eq!(a.synthesize(viewport), b.synthesize(viewport));
        }
        assert_eq!(a.generated(), 200);
    }

    #[test]
    fn mouse_only_emits_mouse_kinds_inside_viewport() {
        let viewport = Viewport::new(320, 200);
        let mut fuzzer = InputFuzzer::new(config(true, false, 7));
        for _ in 0..100 {
            for event in fuzzer.synthesize(viewport) {
                assert!(event.kind.is_mouse(), "unexpected kind {:?}", event.kind);
                assert!(viewport.contains(event.x, event.y));
            }
        }
    }

    #[test]
    fn mouse_presses_and_releases_alternate() {
        let mut fuzzer = InputFuzzer::new(config(true, false, 99));
        let mut down = false;
        for _ in 0..200 {
            for event in fuzzer.synthesize(Viewport::new(50, 50)) {
                match event.kind {
                    InputEventKind::MouseDown => {
                        assert!(!down, "double press");
                        down = true;
                    }
                    InputEventKind::MouseUp => {
                        assert!(down, "release without press");
                        down = false;
                    }
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn touches_only_move_or_end_started_ids() {
        let mut fuzzer = InputFuzzer::new(config(false, true, 3));
        let mut live = std::collections::HashSet::new();
        for _ in 0..200 {
            for event in fuzzer.synthesize(Viewport::new(200, 200)) {
                let id = event.pointer_id.expect("touch events carry an id");
                match event.kind {
                    InputEventKind::TouchStart => assert!(live.insert(id)),
                    InputEventKind::TouchMove => assert!(live.contains(&id)),
                    InputEventKind::TouchEnd => assert!(live.remove(&id)),
                    other => panic!("unexpected kind {other:?}"),
                }
            }
            assert!(live.len() <= MAX_ACTIVE_TOUCHES);
        }
    }

    #[test]
    fn zero_sized_viewport_does_not_panic() {
        let mut fuzzer = InputFuzzer::new(config(true, true, 5));
        let events = fuzzer.synthesize(Viewport::new(0, 0));
        assert_eq!(events.len(), 4);
    }
}
