//! Configuration for the ispdesk console.
//!
//! A TOML file layered under `ISPDESK_*` environment variables, secret
//! resolution (env, then keyring, then plaintext) and translation into
//! `ispdesk_core::ConsoleConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use ispdesk_core::{
    AuthSettings, BackendMode, BackendSettings, BillingSettings, ConsoleConfig, InsightSettings,
};

/// Service name under which secrets live in the system keyring.
pub const KEYRING_SERVICE: &str = "ispdesk";

/// Keyring entry names.
pub const ADMIN_PASSWORD_ENTRY: &str = "admin/password";
pub const TOKEN_SECRET_ENTRY: &str = "auth/token-secret";
pub const INSIGHTS_KEY_ENTRY: &str = "insights/api-key";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub insights: InsightsSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub billing: BillingSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthSection {
    #[serde(default = "default_username")]
    pub username: String,

    /// Admin password (plaintext, prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable holding the admin password.
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// Token signing key (plaintext, prefer keyring).
    pub token_secret: Option<String>,

    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: u64,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            username: default_username(),
            password: None,
            password_env: default_password_env(),
            token_secret: None,
            token_ttl_minutes: default_token_ttl(),
        }
    }
}

fn default_username() -> String {
    "admin".into()
}
fn default_password_env() -> String {
    "ISPDESK_ADMIN_PASSWORD".into()
}
fn default_token_ttl() -> u64 {
    480
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendSection {
    /// "simulated" or "routeros".
    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default = "default_latency")]
    pub simulated_latency_ms: u64,

    /// Hosts the simulated backend treats as offline.
    #[serde(default)]
    pub unreachable_hosts: Vec<String>,

    #[serde(default = "default_probe_reset")]
    pub probe_reset_ms: u64,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            simulated_latency_ms: default_latency(),
            unreachable_hosts: Vec::new(),
            probe_reset_ms: default_probe_reset(),
        }
    }
}

fn default_mode() -> String {
    "simulated".into()
}
fn default_latency() -> u64 {
    300
}
fn default_probe_reset() -> u64 {
    2500
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InsightsSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Gemini API key (plaintext, prefer keyring or env var).
    pub api_key: Option<String>,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Override the API base URL.
    pub endpoint: Option<String>,

    #[serde(default = "default_insight_timeout")]
    pub timeout_secs: u64,
}

impl Default for InsightsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            api_key_env: default_api_key_env(),
            model: default_model(),
            endpoint: None,
            timeout_secs: default_insight_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_model() -> String {
    InsightSettings::default().model
}
fn default_insight_timeout() -> u64 {
    20
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoreSection {
    /// State file location. Defaults to the platform data directory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Consult the system keyring for secrets.
    #[serde(default = "default_true")]
    pub keyring: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            keyring: true,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BillingSection {
    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_company")]
    pub company_name: String,

    #[serde(default = "default_due_days")]
    pub invoice_due_days: u32,
}

impl Default for BillingSection {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            company_name: default_company(),
            invoice_due_days: default_due_days(),
        }
    }
}

fn default_currency() -> String {
    "BDT".into()
}
fn default_company() -> String {
    "ISP Desk".into()
}
fn default_due_days() -> u32 {
    15
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "ispdesk", "ispdesk")
}

fn home_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("ispdesk");
    p
}

/// Config file path: `ISPDESK_CONFIG`, else the platform config dir.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("ISPDESK_CONFIG") {
        return PathBuf::from(path);
    }
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Platform data directory for state and session files.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

/// Where the state document lives.
pub fn state_path(cfg: &Config) -> PathBuf {
    cfg.store
        .path
        .clone()
        .unwrap_or_else(|| data_dir().join("state.json"))
}

/// The session token sits next to the state file.
pub fn session_path(state_path: &Path) -> PathBuf {
    state_path.with_file_name("session.json")
}

// ── Loading and saving ──────────────────────────────────────────────

/// Load from the default path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then the TOML file at `path` (if any), then `ISPDESK_*`
/// environment variables with `__` separating nested keys
/// (`ISPDESK_BACKEND__MODE=routeros`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ISPDESK_").split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

pub fn save_config(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Secret resolution ───────────────────────────────────────────────

/// Resolve a secret: named env var, then keyring, then plaintext.
pub fn resolve_secret(
    env_name: &str,
    keyring_entry: &str,
    plaintext: Option<&str>,
    use_keyring: bool,
) -> Option<SecretString> {
    // 1. Env var
    if let Ok(val) = std::env::var(env_name) {
        if !val.is_empty() {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if use_keyring {
        if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, keyring_entry) {
            if let Ok(secret) = entry.get_password() {
                return Some(SecretString::from(secret));
            }
        }
    }

    // 3. Plaintext in config
    plaintext
        .filter(|s| !s.is_empty())
        .map(|s| SecretString::from(s.to_owned()))
}

/// Store a secret in the system keyring.
pub fn store_secret(keyring_entry: &str, value: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, keyring_entry)?;
    entry.set_password(value)?;
    Ok(())
}

/// Token signing key: configured secret, else a random key generated on
/// first use and kept beside the state file.
fn token_secret(cfg: &Config, state_path: &Path) -> Result<SecretString, ConfigError> {
    if let Some(secret) = resolve_secret(
        "ISPDESK_TOKEN_SECRET",
        TOKEN_SECRET_ENTRY,
        cfg.auth.token_secret.as_deref(),
        cfg.defaults.keyring,
    ) {
        return Ok(secret);
    }

    let key_path = state_path.with_file_name("token.key");
    if let Ok(existing) = std::fs::read_to_string(&key_path) {
        let existing = existing.trim();
        if !existing.is_empty() {
            return Ok(SecretString::from(existing.to_owned()));
        }
    }
    let generated = format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple());
    if let Some(parent) = key_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write_private(&key_path, generated.as_bytes())?;
    debug!(path = %key_path.display(), "generated token signing key");
    Ok(SecretString::from(generated))
}

fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, bytes)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

fn backend_mode(raw: &str) -> Result<BackendMode, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: "backend.mode".into(),
        reason: format!("expected 'simulated' or 'routeros', got '{raw}'"),
    })
}

/// Build the core's runtime configuration, resolving every secret.
pub fn to_console_config(cfg: &Config, state_path: &Path) -> Result<ConsoleConfig, ConfigError> {
    let password = resolve_secret(
        &cfg.auth.password_env,
        ADMIN_PASSWORD_ENTRY,
        cfg.auth.password.as_deref(),
        cfg.defaults.keyring,
    )
    .unwrap_or_else(|| {
        warn!("no admin password configured, using the demo credentials");
        SecretString::from("password".to_owned())
    });

    let api_key = resolve_secret(
        &cfg.insights.api_key_env,
        INSIGHTS_KEY_ENTRY,
        cfg.insights.api_key.as_deref(),
        cfg.defaults.keyring,
    );

    if let Some(ref endpoint) = cfg.insights.endpoint {
        url::Url::parse(endpoint).map_err(|_| ConfigError::Validation {
            field: "insights.endpoint".into(),
            reason: format!("invalid URL: {endpoint}"),
        })?;
    }
    if cfg.billing.invoice_due_days == 0 {
        return Err(ConfigError::Validation {
            field: "billing.invoice_due_days".into(),
            reason: "must be at least 1".into(),
        });
    }

    Ok(ConsoleConfig {
        auth: AuthSettings {
            username: cfg.auth.username.clone(),
            password,
            token_secret: token_secret(cfg, state_path)?,
            token_ttl: Duration::from_secs(cfg.auth.token_ttl_minutes.saturating_mul(60)),
        },
        backend: BackendSettings {
            mode: backend_mode(&cfg.backend.mode)?,
            simulated_latency: Duration::from_millis(cfg.backend.simulated_latency_ms),
            unreachable_hosts: cfg.backend.unreachable_hosts.clone(),
            probe_reset: Duration::from_millis(cfg.backend.probe_reset_ms),
        },
        insights: InsightSettings {
            enabled: cfg.insights.enabled,
            api_key,
            model: cfg.insights.model.clone(),
            endpoint: cfg.insights.endpoint.clone(),
            timeout: Duration::from_secs(cfg.insights.timeout_secs),
        },
        billing: BillingSettings {
            currency: cfg.billing.currency.clone(),
            company_name: cfg.billing.company_name.clone(),
            invoice_due_days: cfg.billing.invoice_due_days,
        },
    })
}
