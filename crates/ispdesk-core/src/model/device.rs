// ── Managed router records ──

use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CoreError;
use crate::validation::FieldErrors;

use super::EntityId;

/// RouterOS firmware generation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RouterOsVersion {
    V6,
    #[default]
    V7,
}

impl From<RouterOsVersion> for ispdesk_api::routeros::RouterOsMajor {
    fn from(v: RouterOsVersion) -> Self {
        match v {
            RouterOsVersion::V6 => Self::V6,
            RouterOsVersion::V7 => Self::V7,
        }
    }
}

/// Whether the console should talk to the device at all.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DeviceStatus {
    #[default]
    Active,
    Disabled,
}

/// Connection profile for one managed router.
///
/// The password is write-only: it is never serialized, so no list, detail
/// or JSON view can leak it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub id: EntityId,
    pub name: String,
    pub host: String,
    pub api_port: u16,
    pub username: String,
    #[serde(skip)]
    pub password: SecretString,
    pub protocol_version: RouterOsVersion,
    pub timeout_seconds: u32,
    pub status: DeviceStatus,
    pub last_checked_at: DateTime<Utc>,
}

impl DeviceRecord {
    /// Hard deadline for any single call to this device.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout_seconds))
    }

    pub fn is_active(&self) -> bool {
        self.status == DeviceStatus::Active
    }

    /// Build a new record from a validated draft.
    pub(crate) fn from_draft(id: EntityId, draft: DeviceDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name.trim().to_owned(),
            host: draft.host.trim().to_owned(),
            api_port: port_of(draft.api_port),
            username: draft.username.trim().to_owned(),
            password: draft.password,
            protocol_version: draft.protocol_version,
            timeout_seconds: draft.timeout_seconds,
            status: draft.status,
            last_checked_at: now,
        }
    }

    /// Merge a validated draft. An empty password keeps the stored secret.
    pub(crate) fn merge(&self, draft: DeviceDraft, now: DateTime<Utc>) -> Self {
        let password = if draft.has_password() {
            draft.password
        } else {
            self.password.clone()
        };
        Self {
            id: self.id.clone(),
            name: draft.name.trim().to_owned(),
            host: draft.host.trim().to_owned(),
            api_port: port_of(draft.api_port),
            username: draft.username.trim().to_owned(),
            password,
            protocol_version: draft.protocol_version,
            timeout_seconds: draft.timeout_seconds,
            status: draft.status,
            last_checked_at: now,
        }
    }
}

fn port_of(raw: u32) -> u16 {
    u16::try_from(raw).unwrap_or(ispdesk_api::routeros::DEFAULT_API_PORT)
}

// ── Draft ───────────────────────────────────────────────────────────

/// Whether a draft creates a record or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftMode {
    Create,
    Update,
}

/// Unvalidated add/edit form input.
///
/// Numeric fields are wider than the stored types so out-of-range input
/// reaches validation instead of failing to parse.
#[derive(Debug, Clone)]
pub struct DeviceDraft {
    pub name: String,
    pub host: String,
    pub api_port: u32,
    pub username: String,
    pub password: SecretString,
    pub protocol_version: RouterOsVersion,
    pub timeout_seconds: u32,
    pub status: DeviceStatus,
}

impl Default for DeviceDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            host: String::new(),
            api_port: u32::from(ispdesk_api::routeros::DEFAULT_API_PORT),
            username: "admin".into(),
            password: SecretString::from(String::new()),
            protocol_version: RouterOsVersion::V7,
            timeout_seconds: 10,
            status: DeviceStatus::Active,
        }
    }
}

impl DeviceDraft {
    /// Pre-fill an edit form from an existing record. The password is
    /// left empty: it is never redisplayed.
    pub fn from_record(record: &DeviceRecord) -> Self {
        Self {
            name: record.name.clone(),
            host: record.host.clone(),
            api_port: u32::from(record.api_port),
            username: record.username.clone(),
            password: SecretString::from(String::new()),
            protocol_version: record.protocol_version,
            timeout_seconds: record.timeout_seconds,
            status: record.status,
        }
    }

    pub fn has_password(&self) -> bool {
        !self.password.expose_secret().trim().is_empty()
    }

    /// Check required fields and ranges, reporting every failure at once.
    pub fn validate(&self, mode: DraftMode) -> Result<(), CoreError> {
        let mut errors = FieldErrors::new();
        errors.require("name", &self.name, "Server name is required");
        errors.require("host", &self.host, "Host IP or domain is required");
        errors.require("username", &self.username, "Username is required");
        if mode == DraftMode::Create {
            errors.check(
                self.has_password(),
                "password",
                "Password is required for a new server",
            );
        }
        errors.check(
            self.api_port > 0 && self.api_port <= u32::from(u16::MAX),
            "api_port",
            "Invalid port number",
        );
        errors.check(
            self.timeout_seconds > 0,
            "timeout_seconds",
            "Timeout must be positive",
        );
        errors.into_result()
    }
}
