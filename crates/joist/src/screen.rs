//! Screen selection state and the home screen.
//!
//! [`ScreenSelection`] is the authoritative answer to "what is showing and
//! is the simulation running": the current screen index, whether the home
//! screen covers it, and the active flag. A simulation with a single screen
//! never has a home screen, so `show_home_screen` is forced off there.

use crate::collaborators::DisplayTarget;
use crate::SimError;

/// Background painted behind the home screen.
pub const HOME_BACKGROUND: &str = "black";

// ---------------------------------------------------------------------------
// ScreenSelection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenSelection {
    screen_count: usize,
    screen_index: usize,
    show_home_screen: bool,
    active: bool,
}

impl ScreenSelection {
    /// Fails with [`SimError::NoScreens`] for zero screens and
    /// [`SimError::ScreenOutOfRange`] for a bad initial index.
    pub fn new(
        screen_count: usize,
        screen_index: usize,
        show_home_screen: bool,
    ) -> Result<Self, SimError> {
        if screen_count == 0 {
            return Err(SimError::NoScreens);
        }
        check_index(screen_index, screen_count)?;
        Ok(Self {
            screen_count,
            screen_index,
            show_home_screen: show_home_screen && screen_count > 1,
            active: true,
        })
    }

    /// Show screen `index`, leaving the home screen if it was up.
    pub fn select_screen(&mut self, index: usize) -> Result<(), SimError> {
        check_index(index, self.screen_count)?;
        self.screen_index = index;
        self.show_home_screen = false;
        Ok(())
    }

    /// Return to the home screen. Returns `false` (and changes nothing) when
    /// the simulation has no home screen.
    pub fn go_home(&mut self) -> bool {
        if !self.has_home_screen() {
            return false;
        }
        self.show_home_screen = true;
        true
    }

    /// Set the active flag; returns whether it changed.
    pub fn set_active(&mut self, active: bool) -> bool {
        let changed = self.active != active;
        self.active = active;
        changed
    }

    pub fn has_home_screen(&self) -> bool {
        self.screen_count > 1
    }

    /// The content screen being shown, or `None` while the home screen is up.
    pub fn current_screen(&self) -> Option<usize> {
        (!self.show_home_screen).then_some(self.screen_index)
    }

    pub fn display_target(&self) -> DisplayTarget {
        match self.current_screen() {
            Some(index) => DisplayTarget::Screen(index),
            None => DisplayTarget::Home,
        }
    }

    pub fn screen_count(&self) -> usize {
        self.screen_count
    }

    /// Last selected screen index, even while the home screen covers it.
    pub fn screen_index(&self) -> usize {
        self.screen_index
    }

    pub fn show_home_screen(&self) -> bool {
        self.show_home_screen
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

fn check_index(index: usize, count: usize) -> Result<(), SimError> {
    if index >= count {
        return Err(SimError::ScreenOutOfRange { index, count });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// HomeScreen
// ---------------------------------------------------------------------------

/// The chooser shown before a content screen is picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeScreen {
    screen_names: Vec<String>,
}

impl HomeScreen {
    pub fn new(screen_names: Vec<String>) -> Self {
        Self { screen_names }
    }

    /// Names of the screens the home screen offers, in index order.
    pub fn screen_names(&self) -> &[String] {
        &self.screen_names
    }

    pub fn background_color(&self) -> &str {
        HOME_BACKGROUND
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
