// ── Domain model ──
//
// Canonical types shared by the registry, editor, monitor and billing
// services. Everything here is plain data plus pure transforms; nothing
// touches the store or the network.

pub mod billing;
pub mod dashboard;
pub mod device;
pub mod entity_id;
pub mod firewall;
pub mod router_config;
pub mod session;

pub use billing::{
    Customer, CustomerDraft, CustomerStatus, Invoice, InvoiceStatus, OnlineStatus, Package,
    PackageDraft,
};
pub use dashboard::DashboardStats;
pub use device::{DeviceDraft, DeviceRecord, DeviceStatus, DraftMode, RouterOsVersion};
pub use entity_id::{EntityId, MacAddress};
pub use firewall::{FirewallAction, FirewallProtocol, FirewallRule, RuleEdit};
pub use router_config::{ConfigEdit, ConfigSection, DeviceConfig, DnsConfig, DnsEdit, NtpConfig, NtpEdit};
pub use session::OnlineClientSession;
