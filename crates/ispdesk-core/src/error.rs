// ── Core error types ──
//
// User-facing errors from ispdesk-core. Consumers never see socket
// errors or RouterOS trap sentences directly: the
// `From<ispdesk_api::Error>` impl translates wire failures into
// domain variants, and `kind()` collapses them into the four
// categories callers branch on.

use thiserror::Error;

use crate::validation::FieldErrors;

/// Coarse category of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input. Render the field messages, do not log.
    Validation,
    /// Unknown id. Navigate away.
    NotFound,
    /// Device unreachable or slow. Transient status, retry by hand.
    Connectivity,
    /// Missing, invalid or expired bearer token. Return to login.
    Auth,
    /// Another operation holds the device.
    Busy,
    Other,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input ────────────────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Device connectivity ──────────────────────────────────────────
    #[error("Cannot reach device '{device}': {reason}")]
    Connectivity { device: String, reason: String },

    #[error("Device '{device}' did not answer within {timeout_secs}s")]
    Timeout { device: String, timeout_secs: u64 },

    #[error("Device rejected the operation: {message}")]
    Rejected { message: String },

    #[error("A {operation} is already in progress for '{device}'")]
    Busy { device: String, operation: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Session expired -- log in again")]
    SessionExpired,

    // ── Configuration / storage ──────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error at {path}: {reason}")]
    Storage { path: String, reason: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity_type: &str, identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Connectivity { .. } | Self::Timeout { .. } => ErrorKind::Connectivity,
            Self::AuthenticationFailed { .. } | Self::SessionExpired => ErrorKind::Auth,
            Self::Busy { .. } => ErrorKind::Busy,
            Self::Rejected { .. }
            | Self::Config { .. }
            | Self::Storage { .. }
            | Self::Internal(_) => ErrorKind::Other,
        }
    }

    /// Attach the device name to connectivity errors raised below the
    /// device layer, where only the socket address was known.
    pub(crate) fn on_device(self, name: &str) -> Self {
        match self {
            Self::Connectivity { reason, .. } => Self::Connectivity {
                device: name.into(),
                reason,
            },
            Self::Timeout { timeout_secs, .. } => Self::Timeout {
                device: name.into(),
                timeout_secs,
            },
            other => other,
        }
    }
}

// ── Conversion from wire-layer errors ────────────────────────────────

impl From<ispdesk_api::Error> for CoreError {
    fn from(err: ispdesk_api::Error) -> Self {
        use ispdesk_api::Error as Api;

        match err {
            // A router refusing our stored credentials is a device problem,
            // not an operator session problem.
            Api::Authentication { message } => CoreError::Rejected {
                message: format!("device login refused: {message}"),
            },
            Api::Timeout { timeout_secs } => CoreError::Timeout {
                device: String::new(),
                timeout_secs,
            },
            Api::Io(e) => CoreError::Connectivity {
                device: String::new(),
                reason: e.to_string(),
            },
            Api::ConnectionClosed => CoreError::Connectivity {
                device: String::new(),
                reason: "connection closed by router".into(),
            },
            Api::Fatal(message) => CoreError::Connectivity {
                device: String::new(),
                reason: format!("router closed the session: {message}"),
            },
            Api::Protocol(message) => CoreError::Connectivity {
                device: String::new(),
                reason: format!("protocol error: {message}"),
            },
            Api::Http(e) => CoreError::Connectivity {
                device: String::new(),
                reason: e.to_string(),
            },
            Api::Trap { message, .. } | Api::Gemini { message, .. } => {
                CoreError::Rejected { message }
            }
            Api::UnsupportedOperation(op) => CoreError::Rejected {
                message: format!("unsupported by device firmware: {op}"),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_login_refusal_does_not_look_like_operator_auth() {
        let err = CoreError::from(ispdesk_api::Error::Authentication {
            message: "invalid user name or password".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn on_device_fills_connectivity_context() {
        let err = CoreError::from(ispdesk_api::Error::ConnectionClosed).on_device("Main POP");
        match err {
            CoreError::Connectivity { device, .. } => assert_eq!(device, "Main POP"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn timeouts_are_connectivity() {
        let err = CoreError::Timeout {
            device: "x".into(),
            timeout_secs: 10,
        };
        assert_eq!(err.kind(), ErrorKind::Connectivity);
    }
}
