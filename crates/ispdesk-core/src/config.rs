// ── Runtime configuration for a console ──
//
// Resolved values only: file layering and secret lookup happen in
// ispdesk-config, which hands a finished `ConsoleConfig` to the core.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::tester::DEFAULT_PROBE_RESET;

/// Which device backend to drive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BackendMode {
    /// In-process stand-in that keeps device state in the store.
    #[default]
    Simulated,
    /// Real routers over the RouterOS API.
    RouterOs,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub username: String,
    pub password: SecretString,
    /// HMAC key for session tokens.
    pub token_secret: SecretString,
    pub token_ttl: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            username: "admin".into(),
            password: SecretString::from("password".to_owned()),
            token_secret: SecretString::from("ispdesk-insecure-default-secret".to_owned()),
            token_ttl: Duration::from_secs(8 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub mode: BackendMode,
    pub simulated_latency: Duration,
    pub unreachable_hosts: Vec<String>,
    pub probe_reset: Duration,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            mode: BackendMode::Simulated,
            simulated_latency: Duration::from_millis(300),
            unreachable_hosts: Vec::new(),
            probe_reset: DEFAULT_PROBE_RESET,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InsightSettings {
    pub enabled: bool,
    /// `None` disables the generator and yields the placeholder text.
    pub api_key: Option<SecretString>,
    pub model: String,
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

impl Default for InsightSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            model: ispdesk_api::gemini::DEFAULT_MODEL.into(),
            endpoint: None,
            timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingSettings {
    pub currency: String,
    pub company_name: String,
    pub invoice_due_days: u32,
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            currency: "BDT".into(),
            company_name: "ISP Desk".into(),
            invoice_due_days: 15,
        }
    }
}

/// Everything a [`Console`](crate::Console) needs to start.
#[derive(Debug, Clone, Default)]
pub struct ConsoleConfig {
    pub auth: AuthSettings,
    pub backend: BackendSettings,
    pub insights: InsightSettings,
    pub billing: BillingSettings,
}
