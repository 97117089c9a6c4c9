//! Display strategies and background selection.
//!
//! When the selection changes, the display is updated by one of two
//! strategies chosen at startup: `setVisible` keeps every screen attached
//! and toggles visibility, `setChildren` attaches only the target. Both are
//! [`ScreenTransitionHandler`]s so the sim runner never branches on the
//! strategy itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::collaborators::{Display, DisplayTarget, Screen};
use crate::screen::{HomeScreen, ScreenSelection};
use crate::SimError;

/// Background used when neither a screen nor a home screen is available.
pub const DEFAULT_BACKGROUND: &str = "white";

// ---------------------------------------------------------------------------
// DisplayStrategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayStrategy {
    #[default]
    SetVisible,
    SetChildren,
}

impl DisplayStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SetVisible => "setVisible",
            Self::SetChildren => "setChildren",
        }
    }

    pub fn handler(self) -> &'static dyn ScreenTransitionHandler {
        match self {
            Self::SetVisible => &SetVisibleHandler,
            Self::SetChildren => &SetChildrenHandler,
        }
    }
}

impl FromStr for DisplayStrategy {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "setVisible" => Ok(Self::SetVisible),
            "setChildren" => Ok(Self::SetChildren),
            other => Err(SimError::UnknownDisplayStrategy(other.to_owned())),
        }
    }
}

impl fmt::Display for DisplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Applies selection changes to the display.
pub trait ScreenTransitionHandler {
    fn on_screen_changed(&self, display: &mut dyn Display, selection: &ScreenSelection);
    fn on_home_toggled(&self, display: &mut dyn Display, selection: &ScreenSelection);
}

/// Every target stays attached; only the current one is visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetVisibleHandler;

impl SetVisibleHandler {
    fn apply(display: &mut dyn Display, selection: &ScreenSelection) {
        let current = selection.display_target();
        for index in 0..selection.screen_count() {
            let target = DisplayTarget::Screen(index);
            display.set_visible(target, target == current);
        }
        if selection.has_home_screen() {
            display.set_visible(DisplayTarget::Home, current == DisplayTarget::Home);
        }
    }
}

impl ScreenTransitionHandler for SetVisibleHandler {
    fn on_screen_changed(&self, display: &mut dyn Display, selection: &ScreenSelection) {
        Self::apply(display, selection);
    }

    fn on_home_toggled(&self, display: &mut dyn Display, selection: &ScreenSelection) {
        Self::apply(display, selection);
    }
}

/// Only the current target is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetChildrenHandler;

impl ScreenTransitionHandler for SetChildrenHandler {
    fn on_screen_changed(&self, display: &mut dyn Display, selection: &ScreenSelection) {
        display.attach_only(selection.display_target());
    }

    fn on_home_toggled(&self, display: &mut dyn Display, selection: &ScreenSelection) {
        display.attach_only(selection.display_target());
    }
}

// ---------------------------------------------------------------------------
// Background
// ---------------------------------------------------------------------------

/// The background for the current state: the shown screen's color, else
/// the home screen's, else [`DEFAULT_BACKGROUND`].
pub fn background_for<'a>(
    current_screen: Option<&'a dyn Screen>,
    home_screen: Option<&'a HomeScreen>,
) -> &'a str {
    match (current_screen, home_screen) {
        (Some(screen), _) => screen.background_color(),
        (None, Some(home)) => home.background_color(),
        (None, None) => DEFAULT_BACKGROUND,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
