//! Windowed host on top of winit.
//!
//! Provides [`run_windowed`], which takes ownership of a [`Sim`] and drives
//! it inside a winit event loop. The simulation's one-shot tick request maps
//! onto `request_redraw`: each `RedrawRequested` runs one tick, and the next
//! redraw is only requested if the tick re-armed the scheduler. Window input
//! is translated into [`InputEvent`]s and queued for the next tick.
//!
//! The window is only an input and lifecycle surface; drawing stays with the
//! simulation's [`Display`](crate::collaborators::Display) collaborator.
//!
//! This module is feature-gated behind `windowed`.

use joist_input::{InputEvent, InputEventKind, Modifiers, Viewport};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, Touch, TouchPhase, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::sim::{Sim, TickOutcome};

/// Pixels per wheel "line" when the platform reports line deltas.
const LINE_HEIGHT: f64 = 16.0;

/// Run `sim` in a window until it is closed or stops scheduling ticks.
///
/// The window opens at the display's current viewport size (logical
/// pixels). Closing the window tears the simulation down.
///
/// # Errors
///
/// Returns an error if the event loop cannot be created or the window
/// cannot be opened.
pub fn run_windowed(sim: Sim, window_title: &str) -> Result<(), anyhow::Error> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App {
        state: AppState::Pending {
            sim,
            title: window_title.to_owned(),
        },
        init_failed: false,
        cursor: PhysicalPosition::new(0.0, 0.0),
        modifiers: Modifiers::NONE,
    };

    event_loop.run_app(&mut app)?;

    if app.init_failed {
        return Err(anyhow::anyhow!(
            "failed to open simulation window (see logs for details)"
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Internal state machine
// ---------------------------------------------------------------------------

/// Winit 0.30 only allows window creation inside `resumed`, so the app
/// starts `Pending` and becomes `Running` once the window exists.
enum AppState {
    Pending { sim: Sim, title: String },
    Running { sim: Sim, window: Window },
    /// Placeholder while moving between states.
    Transitioning,
}

struct App {
    state: AppState,
    init_failed: bool,
    /// Last cursor position, for button events (which carry none).
    cursor: PhysicalPosition<f64>,
    modifiers: Modifiers,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let state = std::mem::replace(&mut self.state, AppState::Transitioning);
        match state {
            AppState::Pending { mut sim, title } => {
                let viewport = sim.display().viewport_size();
                let window_attrs = WindowAttributes::default()
                    .with_title(title.clone())
                    .with_inner_size(LogicalSize::new(viewport.width, viewport.height));

                match event_loop.create_window(window_attrs) {
                    Ok(window) => {
                        tracing::info!(
                            width = viewport.width,
                            height = viewport.height,
                            "simulation window created"
                        );
                        sim.start();
                        if sim.take_scheduled_tick() {
                            window.request_redraw();
                        }
                        self.state = AppState::Running { sim, window };
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to create window -- exiting");
                        self.init_failed = true;
                        self.state = AppState::Pending { sim, title };
                        event_loop.exit();
                    }
                }
            }
            running @ AppState::Running { .. } => {
                self.state = running;
            }
            AppState::Transitioning => {
                tracing::warn!("resumed called during state transition");
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let AppState::Running { sim, window } = &mut self.state else {
            return;
        };
        let scale = window.scale_factor();

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!(
                    frames = sim.frame_counter(),
                    "window close requested -- shutting down"
                );
                sim.destroy();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let logical = size.to_logical::<u32>(scale);
                sim.resize(Viewport::new(logical.width, logical.height));
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                let state = modifiers.state();
                self.modifiers = Modifiers {
                    shift: state.shift_key(),
                    ctrl: state.control_key(),
                    alt: state.alt_key(),
                    meta: state.super_key(),
                };
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = position;
                let event = pointer(InputEventKind::MouseMove, self.cursor, self.modifiers, scale);
                sim.push_input(event);
            }
            WindowEvent::CursorEntered { .. } => {
                let event = pointer(InputEventKind::MouseOver, self.cursor, self.modifiers, scale);
                sim.push_input(event);
            }
            WindowEvent::CursorLeft { .. } => {
                let event = pointer(InputEventKind::MouseOut, self.cursor, self.modifiers, scale);
                sim.push_input(event);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let kind = match state {
                    ElementState::Pressed => InputEventKind::MouseDown,
                    ElementState::Released => InputEventKind::MouseUp,
                };
                let event = pointer(kind, self.cursor, self.modifiers, scale)
                    .with_button(button_index(button));
                sim.push_input(event);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let (dx, dy) = match delta {
                    MouseScrollDelta::LineDelta(x, y) => {
                        (f64::from(x) * LINE_HEIGHT, f64::from(y) * LINE_HEIGHT)
                    }
                    MouseScrollDelta::PixelDelta(p) => (p.x / scale, p.y / scale),
                };
                let at = self.cursor.to_logical::<f64>(scale);
                sim.push_input(
                    InputEvent::wheel(at.x, at.y, dx, dy).with_modifiers(self.modifiers),
                );
            }
            WindowEvent::Touch(touch) => {
                sim.push_input(touch_event(&touch, scale));
            }
            WindowEvent::RedrawRequested => {
                let outcome = sim.tick();
                if sim.take_scheduled_tick() {
                    window.request_redraw();
                    return;
                }
                match outcome {
                    TickOutcome::PlaybackFinished(summary) => {
                        tracing::info!(
                            frames = summary.frames,
                            fps = summary.frames_per_second,
                            "playback finished -- closing window"
                        );
                        event_loop.exit();
                    }
                    TickOutcome::TornDown | TickOutcome::Halted => event_loop.exit(),
                    TickOutcome::Continue => {}
                }
            }
            _ => {}
        }
    }
}

fn pointer(
    kind: InputEventKind,
    cursor: PhysicalPosition<f64>,
    modifiers: Modifiers,
    scale: f64,
) -> InputEvent {
    let at = cursor.to_logical::<f64>(scale);
    InputEvent::mouse(kind, at.x, at.y).with_modifiers(modifiers)
}

fn button_index(button: MouseButton) -> u8 {
    match button {
        MouseButton::Left => 0,
        MouseButton::Middle => 1,
        MouseButton::Right => 2,
        MouseButton::Back => 3,
        MouseButton::Forward => 4,
        MouseButton::Other(n) => u8::try_from(n).unwrap_or(u8::MAX),
    }
}

fn touch_event(touch: &Touch, scale: f64) -> InputEvent {
    let kind = match touch.phase {
        TouchPhase::Started => InputEventKind::TouchStart,
        TouchPhase::Moved => InputEventKind::TouchMove,
        TouchPhase::Ended => InputEventKind::TouchEnd,
        TouchPhase::Cancelled => InputEventKind::TouchCancel,
    };
    let at = touch.location.to_logical::<f64>(scale);
    // Platform touch ids are u64; keep the low bits.
    InputEvent::touch(kind, touch.id as u32, at.x, at.y)
}
