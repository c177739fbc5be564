// ── Core error types ──
//
// Failure kinds surfaced by the engine. Consumers never see reqwest
// errors or raw reply parsing failures directly; the
// `From<kitsync_api::Error>` impl sorts transport-layer errors into
// "could not reach the cloud" versus "the cloud said no".
//
// Push-side failures (unroutable events, handler faults) are not errors
// here: they are recorded in a `DispatchReport` and never fail a batch.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input errors ─────────────────────────────────────────────────
    /// A directive name or value could not be classified or coerced.
    /// Raised before any device is contacted.
    #[error("Invalid directive '{name}': {reason}")]
    InvalidDirective { name: String, reason: String },

    /// A push callback body lacked its message envelope or a topic.
    #[error("Malformed push callback: {message}")]
    MalformedPush { message: String },

    // ── Upstream errors ──────────────────────────────────────────────
    /// The device cloud answered, but with a transport or protocol error.
    /// `status` and `body` are passed through verbatim when present.
    #[error("Device cloud request failed: {message}")]
    UpstreamFailure {
        message: String,
        status: Option<u16>,
        body: String,
    },

    /// The device cloud could not be reached at all.
    #[error("Device cloud unavailable: {reason}")]
    UpstreamUnavailable { reason: String },

    #[error("Device cloud request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDirective {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// The HTTP status a front end should answer with for this failure.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidDirective { .. } | Self::MalformedPush { .. } => 400,
            Self::UpstreamFailure { status, .. } => status.unwrap_or(500),
            Self::UpstreamUnavailable { .. } => 503,
            Self::Timeout { .. } => 504,
            Self::Config { .. } | Self::Internal(_) => 500,
        }
    }

    /// `true` for failures caused by the caller's input rather than the cloud.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDirective { .. } | Self::MalformedPush { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<kitsync_api::Error> for CoreError {
    fn from(err: kitsync_api::Error) -> Self {
        use kitsync_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::UpstreamFailure {
                body: message.clone(),
                message,
                status: Some(401),
            },
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if err.is_unreachable() {
                    CoreError::UpstreamUnavailable {
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::UpstreamFailure {
                        message: e.to_string(),
                        status: err.status(),
                        body: String::new(),
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            ApiError::Tls(msg) => CoreError::UpstreamUnavailable {
                reason: format!("TLS error: {msg}"),
            },
            ApiError::Http { status, body } => CoreError::UpstreamFailure {
                message: format!("HTTP {status}"),
                status: Some(status),
                body,
            },
            ApiError::DeviceReported { reply } => CoreError::UpstreamFailure {
                message: "device reported an error".into(),
                status: None,
                body: reply.to_string(),
            },
            ApiError::MissingElement { path, reply } => CoreError::UpstreamFailure {
                message: format!("could not parse settings (missing {path})"),
                status: None,
                body: reply.to_string(),
            },
            ApiError::Deserialization { message, body } => CoreError::UpstreamFailure {
                message: format!("unreadable reply: {message}"),
                status: None,
                body,
            },
            ApiError::InvalidPayload { message } => CoreError::InvalidDirective {
                name: "payload".into(),
                reason: message,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn http_errors_pass_status_and_body_through() {
        let err = CoreError::from(kitsync_api::Error::Http {
            status: 404,
            body: "no such device".into(),
        });
        assert_eq!(err.http_status(), 404);
        match err {
            CoreError::UpstreamFailure { body, .. } => assert_eq!(body, "no such device"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn device_reported_errors_are_upstream_failures() {
        let err = CoreError::from(kitsync_api::Error::DeviceReported {
            reply: serde_json::json!({"error": "x"}),
        });
        assert!(matches!(err, CoreError::UpstreamFailure { status: None, .. }));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn timeouts_are_distinct_from_unavailable() {
        let err = CoreError::from(kitsync_api::Error::Timeout { timeout_secs: 30 });
        assert_eq!(err.http_status(), 504);
        assert!(!err.is_client_error());
    }

    #[test]
    fn tls_failures_mean_unavailable() {
        let err = CoreError::from(kitsync_api::Error::Tls("bad cert".into()));
        assert_eq!(err.http_status(), 503);
    }

    #[tokio::test]
    async fn refused_connections_mean_unavailable() {
        let api = kitsync_api::DeviceCloudClient::new(
            url::Url::parse("http://127.0.0.1:1").unwrap(),
            "kit-user".into(),
            secrecy::SecretString::from("kit-pass".to_string()),
            &kitsync_api::TransportConfig::default(),
        )
        .unwrap();
        let err = api.set_output("dev", "0x1", "0x1").await.unwrap_err();
        assert!(err.is_unreachable(), "{err:?}");

        let err = CoreError::from(err);
        assert!(matches!(err, CoreError::UpstreamUnavailable { .. }), "{err:?}");
        assert_eq!(err.http_status(), 503);
    }
}
