//! Startup options.
//!
//! Options are read once, before the simulation is built, from a static JSON
//! document, a URL-style query string, or both (the query wins). Keys use
//! the same camelCase names in both forms:
//!
//! | key                     | type   | default      |
//! |-------------------------|--------|--------------|
//! | `screenIndex`           | usize  | `0`          |
//! | `showHomeScreen`        | bool   | `true`       |
//! | `recordInputEventLog`   | bool   | `false`      |
//! | `inputEventLogName`     | string | `"session"`  |
//! | `playbackInputEventLog` | bool   | `false`      |
//! | `fuzzMouse`             | bool   | `false`      |
//! | `fuzzTouches`           | bool   | `false`      |
//! | `fuzzRate`              | usize  | `1`          |
//! | `fuzzSeed`              | u64    | random       |
//! | `screenDisplayStrategy` | string | `setVisible` |
//! | `accessibility`         | bool   | `false`      |
//!
//! In a query string a bare key (`?fuzzMouse`) means `true`.

use joist_input::fuzz::FuzzConfig;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

use crate::display::DisplayStrategy;
use crate::SimError;

/// How the process runs. Fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunMode {
    Live,
    Recording,
    Playback,
}

// ---------------------------------------------------------------------------
// SimOptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimOptions {
    pub screen_index: usize,
    pub show_home_screen: bool,
    pub record_input_event_log: bool,
    /// Session name for recordings and the trace name for playback.
    pub input_event_log_name: String,
    pub playback_input_event_log: bool,
    pub fuzz_mouse: bool,
    pub fuzz_touches: bool,
    /// Synthetic events per tick.
    pub fuzz_rate: usize,
    /// `None` draws a random seed at build time.
    pub fuzz_seed: Option<u64>,
    pub screen_display_strategy: DisplayStrategy,
    pub accessibility: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            screen_index: 0,
            show_home_screen: true,
            record_input_event_log: false,
            input_event_log_name: "session".to_owned(),
            playback_input_event_log: false,
            fuzz_mouse: false,
            fuzz_touches: false,
            fuzz_rate: 1,
            fuzz_seed: None,
            screen_display_strategy: DisplayStrategy::SetVisible,
            accessibility: false,
        }
    }
}

impl SimOptions {
    /// Parse a static options document. Missing keys keep their defaults.
    pub fn from_json(document: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(document)?)
    }

    /// Overlay `key=value` pairs from a query string (leading `?` optional).
    ///
    /// Values are percent-decoded with `+` as a space. Unrecognized keys are
    /// logged and ignored; unparsable values are an error.
    pub fn with_query(mut self, query: &str) -> Result<Self, SimError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = match pair.split_once('=') {
                Some((key, value)) => (percent_decode(key), Some(percent_decode(value))),
                None => (percent_decode(pair), None),
            };
            self.apply(&key, value.as_deref())?;
        }
        Ok(self)
    }

    fn apply(&mut self, key: &str, value: Option<&str>) -> Result<(), SimError> {
        match key {
            "screenIndex" => self.screen_index = parse_number(key, value)?,
            "showHomeScreen" => self.show_home_screen = parse_flag(key, value)?,
            "recordInputEventLog" => self.record_input_event_log = parse_flag(key, value)?,
            "inputEventLogName" => {
                self.input_event_log_name = match value {
                    Some(name) if !name.is_empty() => name.to_owned(),
                    _ => return Err(invalid(key, value.unwrap_or(""))),
                }
            }
            "playbackInputEventLog" => self.playback_input_event_log = parse_flag(key, value)?,
            "fuzzMouse" => self.fuzz_mouse = parse_flag(key, value)?,
            "fuzzTouches" => self.fuzz_touches = parse_flag(key, value)?,
            "fuzzRate" => self.fuzz_rate = parse_number(key, value)?,
            "fuzzSeed" => self.fuzz_seed = Some(parse_number(key, value)?),
            "screenDisplayStrategy" => {
                self.screen_display_strategy = value.unwrap_or_default().parse()?
            }
            "accessibility" => self.accessibility = parse_flag(key, value)?,
            other => tracing::debug!(key = other, "ignoring unrecognized option"),
        }
        Ok(())
    }

    /// The run mode these options select.
    ///
    /// Recording and playback together are a configuration error.
    pub fn run_mode(&self) -> Result<RunMode, SimError> {
        match (self.record_input_event_log, self.playback_input_event_log) {
            (true, true) => Err(SimError::ConflictingModes),
            (true, false) => Ok(RunMode::Recording),
            (false, true) => Ok(RunMode::Playback),
            (false, false) => Ok(RunMode::Live),
        }
    }

    /// Fuzzer settings, using `fallback_seed` when no seed was given.
    pub fn fuzz_config(&self, fallback_seed: u64) -> FuzzConfig {
        FuzzConfig {
            mouse: self.fuzz_mouse,
            touches: self.fuzz_touches,
            events_per_tick: self.fuzz_rate,
            seed: self.fuzz_seed.unwrap_or(fallback_seed),
        }
    }
}

// ---------------------------------------------------------------------------
// Value parsing
// ---------------------------------------------------------------------------

fn invalid(key: &str, value: &str) -> SimError {
    SimError::InvalidOption {
        key: key.to_owned(),
        value: value.to_owned(),
    }
}

fn parse_flag(key: &str, value: Option<&str>) -> Result<bool, SimError> {
    match value {
        None | Some("") | Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(invalid(key, other)),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: Option<&str>) -> Result<T, SimError> {
    let raw = value.unwrap_or("");
    raw.parse().map_err(|_| invalid(key, raw))
}

/// Decode `%XX` escapes and `+`. Malformed escapes are kept literally.
fn percent_decode(input: &str) -> String {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = SimOptions::default();
        assert!(options.show_home_screen);
        assert_eq!(options.input_event_log_name, "session");
        assert_eq!(options.fuzz_rate, 1);
        assert_eq!(options.fuzz_seed, None);
        assert_eq!(options.screen_display_strategy, DisplayStrategy::SetVisible);
        assert_eq!(options.run_mode().unwrap(), RunMode::Live);
    }

    #[test]
    fn decodes_escapes_and_plus() {
        assert_eq!(percent_decode("a+b%20c"), "a b c");
        assert_eq!(percent_decode("caf%C3%A9"), "café");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
        assert_eq!(percent_decode("%4"), "%4");
        assert_eq!(percent_decode("1%2B1"), "1+1");
    }

    #[test]
    fn flags_accept_bare_keys() {
        assert_eq!(parse_flag("k", None).unwrap(), true);
        assert_eq!(parse_flag("k", Some("0")).unwrap(), false);
        assert!(parse_flag("k", Some("maybe")).is_err());
    }
}
