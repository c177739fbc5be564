use thiserror::Error;

/// Top-level error type for the `kitsync-api` crate.
///
/// Covers every failure mode across both API surfaces: transport,
/// HTTP status, device-reported errors inside a successful reply, and
/// payload decoding. `kitsync-core` maps these into engine failure kinds.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The device cloud rejected the account credentials.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Remote errors ───────────────────────────────────────────────
    /// Non-success HTTP status. The body is kept verbatim for passthrough.
    #[error("Device cloud returned HTTP {status}")]
    Http { status: u16, body: String },

    /// HTTP 200, but the reply contains an `error` element somewhere.
    #[error("Device reported an error in its reply")]
    DeviceReported { reply: serde_json::Value },

    /// The reply was well-formed JSON but lacked an expected element.
    #[error("Could not parse reply: missing {path}")]
    MissingElement {
        path: String,
        reply: serde_json::Value,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The caller supplied a payload that cannot be expressed as an SCI request.
    #[error("Invalid request payload: {message}")]
    InvalidPayload { message: String },
}

impl Error {
    /// Returns `true` if the remote system could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect(),
            Self::Tls(_) => true,
            _ => false,
        }
    }

    /// The HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Authentication { .. } => Some(401),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
