//! Submission of recorded traces to the outside world.
//!
//! A recorded trace leaves the process in one of two ways:
//!
//! - **Endpoint**: an HTTP POST to the recording server that runs next to the
//!   simulation host, on the fixed [`RECORDING_PORT`]. The path combines the
//!   simulation name with a session identifier.
//! - **Mail**: a `mailto:` URI carrying the whole trace inline as the message
//!   body, for users who are not on the recording network.
//!
//! Both are fire-and-forget. A [`TraceTransport`] never reports back into
//! the simulation; failures are logged and dropped.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

#[cfg(feature = "network")]
use crate::TraceError;

/// Port the recording server listens on.
pub const RECORDING_PORT: u16 = 8083;

// ---------------------------------------------------------------------------
// RecordingDestination
// ---------------------------------------------------------------------------

/// Where a recorded trace should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingDestination {
    /// The recording server on `host`.
    Endpoint {
        host: String,
        sim_name: String,
        session: String,
    },
    /// The user's mail client.
    Mail { to: Option<String>, subject: String },
}

impl RecordingDestination {
    /// URL of the recording endpoint for `sim_name` and `session`.
    pub fn endpoint_url(host: &str, sim_name: &str, session: &str) -> String {
        format!("http://{host}:{RECORDING_PORT}/{sim_name}_{session}")
    }

    /// Build the submission that delivers `payload` to this destination.
    pub fn submission(&self, payload: String) -> Submission {
        match self {
            Self::Endpoint {
                host,
                sim_name,
                session,
            } => Submission::Post {
                url: Self::endpoint_url(host, sim_name, session),
                body: payload,
            },
            Self::Mail { to, subject } => {
                let recipient = to.as_deref().map(percent_encode).unwrap_or_default();
                Submission::ComposeMail {
                    uri: format!(
                        "mailto:{recipient}?subject={}&body={}",
                        percent_encode(subject),
                        percent_encode(&payload)
                    ),
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// A ready-to-send trace submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// POST `body` to `url`.
    Post { url: String, body: String },
    /// Open a mail composition for `uri`.
    ComposeMail { uri: String },
}

/// Everything outside the RFC 3986 unreserved set.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode `input` for use inside a URI component.
pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

// ---------------------------------------------------------------------------
// TraceTransport
// ---------------------------------------------------------------------------

/// Delivers submissions. Must not block the tick loop.
pub trait TraceTransport {
    fn submit(&mut self, submission: Submission);
}

/// Keeps every submission in memory. Used headless and in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    submissions: Vec<Submission>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    pub fn take(&mut self) -> Vec<Submission> {
        std::mem::take(&mut self.submissions)
    }
}

impl TraceTransport for MemoryTransport {
    fn submit(&mut self, submission: Submission) {
        self.submissions.push(submission);
    }
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// Posts traces over HTTP from a background thread.
///
/// Mail compositions cannot be opened from here; their URI is logged so a
/// host with a mail client can pick it up.
#[cfg(feature = "network")]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "network")]
impl HttpTransport {
    pub fn new() -> Result<Self, TraceError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(2))
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }
}

#[cfg(feature = "network")]
impl TraceTransport for HttpTransport {
    fn submit(&mut self, submission: Submission) {
        match submission {
            Submission::Post { url, body } => {
                let client = self.client.clone();
                std::thread::spawn(move || {
                    let bytes = body.len();
                    match client
                        .post(&url)
                        .header("Content-Type", "application/json")
                        .body(body)
                        .send()
                        .and_then(|response| response.error_for_status())
                    {
                        Ok(_) => tracing::info!(%url, bytes, "trace submitted"),
                        Err(e) => tracing::warn!(%url, error = %e, "trace submission failed"),
                    }
                });
            }
            Submission::ComposeMail { uri } => {
                tracing::info!(uri_len = uri.len(), "mail composition requested");
                tracing::debug!(%uri, "mail composition uri");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_uses_fixed_port() {
        assert_eq!(
            RecordingDestination::endpoint_url("sims.local", "gravity", "firefox"),
            "http://sims.local:8083/gravity_firefox"
        );
    }

    #[test]
    fn percent_encode_leaves_unreserved_alone() {
        assert_eq!(percent_encode("abc-XYZ_0.9~"), "abc-XYZ_0.9~");
        assert_eq!(percent_encode("a b"), "a%20b");
        assert_eq!(percent_encode(r#"[{"dt":1}]"#), "%5B%7B%22dt%22%3A1%7D%5D");
        assert_eq!(percent_encode("é"), "%C3%A9");
    }

    #[test]
    fn mail_submission_inlines_trace() {
        let destination = RecordingDestination::Mail {
            to: Some("qa@example.org".to_owned()),
            subject: "input log".to_owned(),
        };
        let submission = destination.submission("[]".to_owned());
        assert_eq!(
            submission,
            Submission::ComposeMail {
                uri: "mailto:qa%40example.org?subject=input%20log&body=%5B%5D".to_owned()
            }
        );
    }

    #[test]
    fn mail_without_recipient() {
        let destination = RecordingDestination::Mail {
            to: None,
            subject: "log".to_owned(),
        };
        let Submission::ComposeMail { uri } = destination.submission("x".to_owned()) else {
            panic!("expected a mail composition");
        };
        assert!(uri.starts_with("mailto:?subject=log"));
    }

    #[test]
    fn memory_transport_take_drains() {
        let mut transport = MemoryTransport::new();
        transport.submit(Submission::ComposeMail {
            uri: "mailto:".to_owned(),
        });
        assert_eq!(transport.take().len(), 1);
        assert!(transport.submissions().is_empty());
    }
}
