//! Joist Input -- structured input event descriptors for the simulation shell.
//!
//! Everything that reaches a simulation as user input is represented here as
//! plain data: an [`InputEvent`] carries the event kind, the position in
//! viewport coordinates, modifier keys, and the pointer/button/wheel details
//! that matter for replay. Because events are values (not callbacks), the
//! same descriptor can be delivered live, captured into a trace, serialized,
//! and re-issued verbatim during playback.
//!
//! The crate also provides the [`InputBuffer`](buffer::InputBuffer) that holds
//! live input between ticks and the seeded [`InputFuzzer`](fuzz::InputFuzzer)
//! used for robustness testing.
//!
//! # Quick Start
//!
//! ```
//! use joist_input::prelude::*;
//!
//! let mut buffer = InputBuffer::new();
//! buffer.push(InputEvent::mouse(InputEventKind::MouseDown, 10.0, 20.0));
//! buffer.push(InputEvent::mouse(InputEventKind::MouseUp, 10.0, 20.0));
//!
//! let delivered = buffer.drain();
//! assert_eq!(delivered.len(), 2);
//! assert!(buffer.is_empty());
//! ```

#![deny(unsafe_code)]

pub mod buffer;
pub mod fuzz;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// InputEventKind
// ---------------------------------------------------------------------------

/// The logical kind of an input event.
///
/// Serialized in camelCase (`"mouseDown"`, `"touchStart"`, ...) to match the
/// trace wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputEventKind {
    MouseDown,
    MouseUp,
    MouseMove,
    MouseOver,
    MouseOut,
    TouchStart,
    TouchMove,
    TouchEnd,
    TouchCancel,
    Wheel,
}

impl InputEventKind {
    /// Whether this is one of the touch kinds (which carry a pointer id).
    pub fn is_touch(self) -> bool {
        matches!(
            self,
            Self::TouchStart | Self::TouchMove | Self::TouchEnd | Self::TouchCancel
        )
    }

    /// Whether this is one of the mouse kinds.
    pub fn is_mouse(self) -> bool {
        matches!(
            self,
            Self::MouseDown | Self::MouseUp | Self::MouseMove | Self::MouseOver | Self::MouseOut
        )
    }
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

fn is_false(value: &bool) -> bool {
    !*value
}

/// Keyboard modifier state at the time an event was fired.
///
/// Only the set flags are written to the wire; an all-clear value is omitted
/// from the event entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default, skip_serializing_if = "is_false")]
    pub shift: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ctrl: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub alt: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub meta: bool,
}

impl Modifiers {
    /// No modifier held.
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// `true` when no modifier is held.
    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

// ---------------------------------------------------------------------------
// InputEvent
// ---------------------------------------------------------------------------

/// A single input event descriptor.
///
/// This is the unit that gets buffered, delivered to the input-dispatch
/// collaborator, recorded into a frame, and re-issued during playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputEvent {
    /// What happened.
    pub kind: InputEventKind,
    /// Horizontal position in viewport coordinates.
    pub x: f64,
    /// Vertical position in viewport coordinates.
    pub y: f64,
    /// Modifier keys held while the event fired.
    #[serde(default, skip_serializing_if = "Modifiers::is_empty")]
    pub modifiers: Modifiers,
    /// Touch identifier. Present for touch kinds only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer_id: Option<u32>,
    /// Mouse button index (0 = primary).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<u8>,
    /// Horizontal wheel delta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_x: Option<f64>,
    /// Vertical wheel delta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_y: Option<f64>,
}

impl InputEvent {
    /// A mouse event at `(x, y)`. Down/up events default to the primary
    /// button.
    pub fn mouse(kind: InputEventKind, x: f64, y: f64) -> Self {
        let button = match kind {
            InputEventKind::MouseDown | InputEventKind::MouseUp => Some(0),
            _ => None,
        };
        Self {
            kind,
            x,
            y,
            modifiers: Modifiers::NONE,
            pointer_id: None,
            button,
            delta_x: None,
            delta_y: None,
        }
    }

    /// A touch event for touch `id` at `(x, y)`.
    pub fn touch(kind: InputEventKind, id: u32, x: f64, y: f64) -> Self {
        Self {
            kind,
            x,
            y,
            modifiers: Modifiers::NONE,
            pointer_id: Some(id),
            button: None,
            delta_x: None,
            delta_y: None,
        }
    }

    /// A wheel event at `(x, y)` scrolling by `(delta_x, delta_y)`.
    pub fn wheel(x: f64, y: f64, delta_x: f64, delta_y: f64) -> Self {
        Self {
            kind: InputEventKind::Wheel,
            x,
            y,
            modifiers: Modifiers::NONE,
            pointer_id: None,
            button: None,
            delta_x: Some(delta_x),
            delta_y: Some(delta_y),
        }
    }

    /// Replace the modifier state.
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Replace the mouse button index.
    pub fn with_button(mut self, button: u8) -> Self {
        self.button = Some(button);
        self
    }
}

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

/// Size of the display viewport in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether `(x, y)` lies inside the viewport.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && y >= 0.0 && x < f64::from(self.width) && y < f64::from(self.height)
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::buffer::InputBuffer;
    pub use crate::fuzz::{FuzzConfig, InputFuzzer};
    pub use crate::{InputEvent, InputEventKind, Modifiers, Viewport};
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
