//! Business layer between `ispdesk-api` and the operator front ends.
//!
//! - **[`Console`]** — Facade owning the store, the device backend and all
//!   services. [`Console::login`] issues a bearer token and
//!   [`Console::authorize`] turns it into a [`Session`], the only way to
//!   reach the services below.
//!
//! - **[`Registry`]** — Managed router inventory with two-step removal.
//!
//! - **[`ConnectionTester`]** — Per-device reachability probes with an
//!   auto-clearing status.
//!
//! - **[`ConfigEditor`]** — Load, edit and atomically apply router
//!   configuration (identity, clock, NTP, DNS, firewall filter rules).
//!
//! - **[`ClientMonitor`]** — Live PPP/hotspot session table with filter
//!   and idempotent kick.
//!
//! - **Billing** ([`Customers`], [`Packages`], [`Invoices`]) and the
//!   [`Dashboard`] with its optional insight generator.
//!
//! - **[`DataStore`]** / **[`Repository`]** — Reactive in-memory state
//!   (`DashMap` + `tokio::sync::watch`) persisted to a JSON state file.

pub mod auth;
pub mod backend;
pub mod billing;
pub mod config;
pub mod console;
pub mod dashboard;
pub mod editor;
pub mod error;
mod locks;
pub mod model;
pub mod monitor;
pub mod registry;
pub mod store;
pub mod tester;
pub mod validation;

// ── Primary re-exports ──────────────────────────────────────────────
pub use auth::{Principal, SessionToken};
pub use backend::{DeviceBackend, KickOutcome, ProbeReport};
pub use billing::{Customers, Invoices, Packages};
pub use config::{
    AuthSettings, BackendMode, BackendSettings, BillingSettings, ConsoleConfig, InsightSettings,
};
pub use console::{Console, Session};
pub use dashboard::{Dashboard, InsightProvider, format_amount};
pub use editor::{ApplyRequest, ConfigEditor, EditSession};
pub use error::{CoreError, ErrorKind};
pub use monitor::ClientMonitor;
pub use registry::{Registry, RemovalRequest};
pub use store::{DataStore, Repository};
pub use tester::{ConnectionTester, ProbeOutcome, ProbeState};
pub use validation::FieldErrors;

pub use model::{
    ConfigEdit, ConfigSection, Customer, CustomerDraft, CustomerStatus, DashboardStats,
    DeviceConfig, DeviceDraft, DeviceRecord, DeviceStatus, DnsConfig, DnsEdit, DraftMode,
    EntityId, FirewallAction, FirewallProtocol, FirewallRule, Invoice, InvoiceStatus,
    MacAddress, NtpConfig, NtpEdit, OnlineClientSession, OnlineStatus, Package, PackageDraft,
    RouterOsVersion, RuleEdit,
};
