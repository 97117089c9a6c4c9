//! Where playback traces come from.
//!
//! A [`TraceSource`] only returns the raw payload; parsing and validation
//! happen in [`PlaybackTrace::parse`](crate::PlaybackTrace::parse) so every
//! source gets the same fail-fast treatment.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::TraceError;

/// Fetches a named trace payload.
pub trait TraceSource {
    fn fetch(&mut self, name: &str) -> Result<String, TraceError>;
}

// ---------------------------------------------------------------------------
// InlineTraceSource
// ---------------------------------------------------------------------------

/// Named payloads held in memory.
#[derive(Debug, Clone, Default)]
pub struct InlineTraceSource {
    traces: HashMap<String, String>,
}

impl InlineTraceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, payload: impl Into<String>) -> Self {
        self.insert(name, payload);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, payload: impl Into<String>) {
        self.traces.insert(name.into(), payload.into());
    }
}

impl TraceSource for InlineTraceSource {
    fn fetch(&mut self, name: &str) -> Result<String, TraceError> {
        self.traces
            .get(name)
            .cloned()
            .ok_or_else(|| TraceError::Fetch {
                name: name.to_owned(),
                details: "no inline trace with that name".to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// DirectoryTraceSource
// ---------------------------------------------------------------------------

/// Reads `<root>/<name>.json`.
#[derive(Debug, Clone)]
pub struct DirectoryTraceSource {
    root: PathBuf,
}

impl DirectoryTraceSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }
}

impl TraceSource for DirectoryTraceSource {
    fn fetch(&mut self, name: &str) -> Result<String, TraceError> {
        let path = self.path_for(name);
        std::fs::read_to_string(&path).map_err(|source| TraceError::Io { path, source })
    }
}

// ---------------------------------------------------------------------------
// EndpointTraceSource
// ---------------------------------------------------------------------------

/// Fetches traces from the recording server, the same place recordings are
/// posted to.
#[cfg(feature = "network")]
#[derive(Debug, Clone)]
pub struct EndpointTraceSource {
    host: String,
    sim_name: String,
    client: reqwest::blocking::Client,
}

#[cfg(feature = "network")]
impl EndpointTraceSource {
    pub fn new(host: impl Into<String>, sim_name: impl Into<String>) -> Result<Self, TraceError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(2))
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            host: host.into(),
            sim_name: sim_name.into(),
            client,
        })
    }
}

#[cfg(feature = "network")]
impl TraceSource for EndpointTraceSource {
    fn fetch(&mut self, name: &str) -> Result<String, TraceError> {
        let url = crate::transport::RecordingDestination::endpoint_url(
            &self.host,
            &self.sim_name,
            name,
        );
        tracing::info!(%url, "fetching playback trace");
        self.client
            .get(&url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(|e| TraceError::Fetch {
                name: name.to_owned(),
                details: format!("{url}: {e}"),
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
