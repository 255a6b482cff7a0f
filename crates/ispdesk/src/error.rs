//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable process exit code.

use miette::Diagnostic;
use thiserror::Error;

use ispdesk_config::ConfigError;
use ispdesk_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const BUSY: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Device connectivity ──────────────────────────────────────────
    #[error("Could not reach server '{device}': {reason}")]
    #[diagnostic(
        code(ispdesk::connection_failed),
        help(
            "Check that the router is powered, reachable and has the API service enabled.\n\
             Try: ispdesk servers test <id>"
        )
    )]
    ConnectionFailed { device: String, reason: String },

    #[error("Server '{device}' did not answer within {seconds}s")]
    #[diagnostic(
        code(ispdesk::timeout),
        help("Raise the server timeout with: ispdesk servers edit <id> --timeout <secs>")
    )]
    Timeout { device: String, seconds: u64 },

    #[error("Router rejected the operation: {message}")]
    #[diagnostic(code(ispdesk::rejected))]
    Rejected { message: String },

    #[error("A {operation} is already running for '{device}'")]
    #[diagnostic(code(ispdesk::busy), help("Wait for it to finish and retry."))]
    Busy { device: String, operation: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(ispdesk::auth_failed),
        help("Run: ispdesk login\nThe admin password comes from ISPDESK_ADMIN_PASSWORD, the keyring or the config file.")
    )]
    AuthFailed { message: String },

    #[error("Not logged in")]
    #[diagnostic(code(ispdesk::not_logged_in), help("Run: ispdesk login"))]
    NotLoggedIn,

    #[error("Session expired")]
    #[diagnostic(code(ispdesk::session_expired), help("Run: ispdesk login"))]
    SessionExpired,

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(ispdesk::not_found),
        help("Run: ispdesk {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ispdesk::validation))]
    Validation { field: String, reason: String },

    #[error("{count} fields failed validation")]
    #[diagnostic(code(ispdesk::validation), help("{details}"))]
    InvalidFields { count: usize, details: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("'{action}' requires confirmation")]
    #[diagnostic(
        code(ispdesk::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration / storage ──────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(ispdesk::config),
        help("Inspect the effective settings with: ispdesk config show")
    )]
    Config(#[from] ConfigError),

    #[error("Configuration error: {message}")]
    #[diagnostic(code(ispdesk::config))]
    CoreConfig { message: String },

    #[error("Could not access {path}: {reason}")]
    #[diagnostic(code(ispdesk::storage))]
    Storage { path: String, reason: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(ispdesk::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(ispdesk::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NotLoggedIn | Self::SessionExpired => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Busy { .. } => exit_code::BUSY,
            Self::Validation { .. }
            | Self::InvalidFields { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

fn list_command(entity_type: &str) -> String {
    match entity_type {
        "server" => "servers list".into(),
        "session" => "clients list".into(),
        "firewall rule" => "router show <server>".into(),
        other => format!("{other}s list"),
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(errors) => {
                let mut fields = errors.iter();
                match (fields.next(), errors.len()) {
                    (Some((field, reason)), 1) => CliError::Validation {
                        field: field.into(),
                        reason: reason.into(),
                    },
                    _ => CliError::InvalidFields {
                        count: errors.len(),
                        details: errors
                            .iter()
                            .map(|(field, reason)| format!("{field}: {reason}"))
                            .collect::<Vec<_>>()
                            .join("\n"),
                    },
                }
            }

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                list_command: list_command(&entity_type),
                resource_type: entity_type,
                identifier,
            },

            CoreError::Connectivity { device, reason } => {
                CliError::ConnectionFailed { device, reason }
            }

            CoreError::Timeout {
                device,
                timeout_secs,
            } => CliError::Timeout {
                device,
                seconds: timeout_secs,
            },

            CoreError::Rejected { message } => CliError::Rejected { message },

            CoreError::Busy { device, operation } => CliError::Busy { device, operation },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::SessionExpired => CliError::SessionExpired,

            CoreError::Config { message } => CliError::CoreConfig { message },

            CoreError::Storage { path, reason } => CliError::Storage { path, reason },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ispdesk_core::FieldErrors;

    #[test]
    fn single_field_error_keeps_its_name() {
        let err = CliError::from(FieldErrors::single("host", "Host IP or domain is required"));
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "host"));
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn taxonomy_maps_to_exit_codes() {
        let cases = [
            (CoreError::not_found("server", "MKT404"), exit_code::NOT_FOUND),
            (
                CoreError::Connectivity {
                    device: "Main POP".into(),
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (
                CoreError::Timeout {
                    device: "Main POP".into(),
                    timeout_secs: 10,
                },
                exit_code::TIMEOUT,
            ),
            (
                CoreError::Busy {
                    device: "Main POP".into(),
                    operation: "kick".into(),
                },
                exit_code::BUSY,
            ),
            (CoreError::SessionExpired, exit_code::AUTH),
            (
                CoreError::Rejected {
                    message: "no".into(),
                },
                exit_code::GENERAL,
            ),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }

    #[test]
    fn missing_server_points_at_servers_list() {
        let err = CliError::from(CoreError::not_found("server", "MKT404"));
        let CliError::NotFound { list_command, .. } = err else {
            panic!("expected not found");
        };
        assert_eq!(list_command, "servers list");
    }
}
