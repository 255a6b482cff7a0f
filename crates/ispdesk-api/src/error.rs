use thiserror::Error;

/// Top-level error type for the `ispdesk-api` crate.
///
/// Covers every failure mode across both wire surfaces: the RouterOS
/// binary API (TCP sentences) and the Gemini HTTP endpoint.
/// `ispdesk-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The router rejected the login sentence.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Socket-level failure (connection refused, reset, DNS failure).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error from the insight client.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Operation did not finish inside its deadline.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── RouterOS ────────────────────────────────────────────────────
    /// Malformed framing or an unexpected reply word.
    #[error("RouterOS protocol error: {0}")]
    Protocol(String),

    /// `!trap` reply: the command was understood but refused.
    #[error("RouterOS trap: {message}")]
    Trap {
        category: Option<u32>,
        message: String,
    },

    /// `!fatal` reply: the router is closing the connection.
    #[error("RouterOS fatal: {0}")]
    Fatal(String),

    /// The connection closed before a `!done` arrived.
    #[error("Connection closed by router")]
    ConnectionClosed,

    // ── Gemini ──────────────────────────────────────────────────────
    /// Non-success response from the generative language endpoint.
    #[error("Gemini API error (HTTP {status}): {message}")]
    Gemini { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON or attribute decoding failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Platform ────────────────────────────────────────────────────
    /// Operation not supported by this router firmware.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),
}

impl Error {
    /// Returns `true` if the router refused our credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying by hand.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Io(_) | Self::Timeout { .. } | Self::ConnectionClosed => true,
            _ => false,
        }
    }

    /// Returns `true` if the router reported that the addressed item is gone.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Trap { message, .. } => message.contains("no such item"),
            Self::Http(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Gemini { status: 404, .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_item_trap_is_not_found() {
        let err = Error::Trap {
            category: None,
            message: "no such item (4)".into(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }

    #[test]
    fn timeouts_are_transient() {
        assert!(Error::Timeout { timeout_secs: 10 }.is_transient());
        assert!(Error::ConnectionClosed.is_transient());
        assert!(!Error::Fatal("bye".into()).is_transient());
    }
}
