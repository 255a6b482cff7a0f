// ── Demo dataset ──
//
// First-run contents of a fresh store: three routers, their configs,
// a few online sessions, and a small billing book.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use super::DataStore;
use super::repository::{STATE_VERSION, StateDocument, StoredConfig, StoredDevice};
use crate::model::{
    Customer, CustomerStatus, DeviceConfig, DeviceStatus, DnsConfig, EntityId, FirewallAction,
    FirewallProtocol, FirewallRule, Invoice, InvoiceStatus, MacAddress, NtpConfig,
    OnlineClientSession, OnlineStatus, Package, RouterOsVersion,
};

/// A store holding the demo dataset, marked clean.
pub fn demo_store() -> DataStore {
    demo_document().into_store()
}

pub fn demo_document() -> StateDocument {
    StateDocument {
        version: STATE_VERSION,
        devices: devices(),
        configs: configs(),
        sessions: sessions(),
        customers: customers(),
        packages: packages(),
        invoices: invoices(),
        open_tickets: 12,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn time(h: u32, m: u32, s: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, s).unwrap_or_default()
}

fn at(d: NaiveDate, t: NaiveTime) -> DateTime<Utc> {
    NaiveDateTime::new(d, t).and_utc()
}

// ── Routers ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn device(
    id: &str,
    name: &str,
    host: &str,
    username: &str,
    version: RouterOsVersion,
    timeout_seconds: u32,
    status: DeviceStatus,
    checked: DateTime<Utc>,
) -> StoredDevice {
    StoredDevice {
        id: EntityId::from(id),
        name: name.into(),
        host: host.into(),
        api_port: ispdesk_api::routeros::DEFAULT_API_PORT,
        username: username.into(),
        password: String::new(),
        protocol_version: version,
        timeout_seconds,
        status,
        last_checked_at: checked,
    }
}

fn devices() -> Vec<StoredDevice> {
    vec![
        device(
            "MKT001",
            "Main POP",
            "192.168.88.1",
            "admin",
            RouterOsVersion::V7,
            10,
            DeviceStatus::Active,
            at(date(2024, 7, 30), time(10, 0, 0)),
        ),
        device(
            "MKT002",
            "Branch Office 1",
            "router.branch1.isp.com",
            "admin",
            RouterOsVersion::V6,
            15,
            DeviceStatus::Active,
            at(date(2024, 7, 30), time(10, 5, 0)),
        ),
        device(
            "MKT003",
            "Backup Server",
            "10.0.0.2",
            "readonly",
            RouterOsVersion::V7,
            10,
            DeviceStatus::Disabled,
            at(date(2024, 7, 29), time(15, 30, 0)),
        ),
    ]
}

fn rule(
    id: &str,
    name: &str,
    action: FirewallAction,
    protocol: FirewallProtocol,
    port: Option<&str>,
    enabled: bool,
) -> FirewallRule {
    FirewallRule {
        id: EntityId::from(id),
        name: name.into(),
        action,
        protocol,
        source_address: None,
        destination_port: port.map(str::to_owned),
        enabled,
    }
}

fn configs() -> Vec<StoredConfig> {
    let ntp = |enabled: bool, primary: &str, secondary: &str| NtpConfig {
        enabled,
        primary_server: primary.into(),
        secondary_server: secondary.into(),
    };
    let dns = |primary: &str, secondary: &str| DnsConfig {
        primary_server: primary.into(),
        secondary_server: secondary.into(),
    };
    vec![
        StoredConfig {
            device_id: EntityId::from("MKT001"),
            config: DeviceConfig {
                identity: "Main-POP-Router".into(),
                system_date: date(2024, 7, 30),
                system_time: time(10, 15, 30),
                ntp: ntp(true, "time.google.com", "pool.ntp.org"),
                dns: dns("8.8.8.8", "8.8.4.4"),
                firewall_rules: vec![
                    rule(
                        "fw1",
                        "Allow Winbox",
                        FirewallAction::Accept,
                        FirewallProtocol::Tcp,
                        Some("8291"),
                        true,
                    ),
                    rule(
                        "fw2",
                        "Drop Invalid",
                        FirewallAction::Drop,
                        FirewallProtocol::Any,
                        None,
                        true,
                    ),
                ],
            },
        },
        StoredConfig {
            device_id: EntityId::from("MKT002"),
            config: DeviceConfig {
                identity: "Branch-1-Router".into(),
                system_date: date(2024, 7, 30),
                system_time: time(10, 16, 0),
                ntp: ntp(false, "", ""),
                dns: dns("1.1.1.1", "1.0.0.1"),
                firewall_rules: vec![rule(
                    "fw3",
                    "Block Ping",
                    FirewallAction::Drop,
                    FirewallProtocol::Icmp,
                    None,
                    false,
                )],
            },
        },
        StoredConfig {
            device_id: EntityId::from("MKT003"),
            config: DeviceConfig {
                identity: "Backup-Router-Config".into(),
                system_date: date(2024, 7, 30),
                system_time: time(11, 0, 0),
                ntp: ntp(true, "time.google.com", "pool.ntp.org"),
                dns: dns("8.8.8.8", "1.1.1.1"),
                firewall_rules: Vec::new(),
            },
        },
    ]
}

// ── Online sessions ─────────────────────────────────────────────────

fn sessions() -> Vec<OnlineClientSession> {
    let session = |id: &str,
                   device: &str,
                   username: &str,
                   ip: &str,
                   mac: &str,
                   server: &str,
                   uptime: &str,
                   down: &str,
                   up: &str| OnlineClientSession {
        id: EntityId::from(id),
        device_id: Some(EntityId::from(device)),
        username: username.into(),
        ip_address: ip.into(),
        mac_address: MacAddress::new(mac),
        server: server.into(),
        uptime: uptime.into(),
        download_speed: down.into(),
        upload_speed: up.into(),
    };
    vec![
        session(
            "cl1",
            "MKT001",
            "john.doe",
            "10.5.50.112",
            "AA:BB:CC:11:22:33",
            "Main POP",
            "2h 15m",
            "12.5 Mbps",
            "2.1 Mbps",
        ),
        session(
            "cl2",
            "MKT001",
            "charlie.b",
            "10.5.50.115",
            "BB:CC:DD:22:33:44",
            "Main POP",
            "1d 4h 30m",
            "85.2 Mbps",
            "15.7 Mbps",
        ),
        session(
            "cl3",
            "MKT002",
            "testuser1",
            "172.16.10.5",
            "CC:DD:EE:33:44:55",
            "Branch Office 1",
            "5h 2m",
            "5.6 Mbps",
            "0.8 Mbps",
        ),
    ]
}

// ── Billing ─────────────────────────────────────────────────────────

fn packages() -> Vec<Package> {
    let package = |id: &str, name: &str, speed: &str, price: f64, active: u32| Package {
        id: EntityId::from(id),
        name: name.into(),
        speed: speed.into(),
        price,
        data_limit: "Unlimited".into(),
        active_customers: active,
    };
    vec![
        package("PKG001", "Fiber 100 Mbps", "100/20 Mbps", 1200.0, 200),
        package("PKG002", "Fiber 200 Mbps", "200/50 Mbps", 1800.0, 150),
        package("PKG003", "Fiber 50 Mbps", "50/10 Mbps", 800.0, 80),
        package("PKG004", "Fiber 1 Gbps", "1000/200 Mbps", 4000.0, 20),
    ]
}

fn customers() -> Vec<Customer> {
    let customer = |id: &str,
                    name: &str,
                    email: &str,
                    phone: &str,
                    status: CustomerStatus,
                    online: OnlineStatus,
                    package: &str,
                    joined: NaiveDate,
                    address: &str| Customer {
        id: EntityId::from(id),
        name: name.into(),
        email: email.into(),
        phone: phone.into(),
        status,
        online_status: online,
        package: package.into(),
        join_date: joined,
        address: address.into(),
    };
    vec![
        customer(
            "CUST001",
            "John Doe",
            "john.doe@example.com",
            "555-0100",
            CustomerStatus::Active,
            OnlineStatus::Online,
            "Fiber 100 Mbps",
            date(2023, 5, 15),
            "123 Main St, Anytown",
        ),
        customer(
            "CUST002",
            "Jane Smith",
            "jane.smith@example.com",
            "555-0101",
            CustomerStatus::Active,
            OnlineStatus::Offline,
            "Fiber 200 Mbps",
            date(2022, 11, 20),
            "456 Oak Ave, Somecity",
        ),
        customer(
            "CUST003",
            "Bob Johnson",
            "bob.j@example.com",
            "555-0102",
            CustomerStatus::Suspended,
            OnlineStatus::Offline,
            "Fiber 50 Mbps",
            date(2023, 1, 10),
            "789 Pine Ln, Otherville",
        ),
        customer(
            "CUST004",
            "Alice Williams",
            "alice.w@example.com",
            "555-0103",
            CustomerStatus::Inactive,
            OnlineStatus::Offline,
            "Fiber 100 Mbps",
            date(2021, 8, 1),
            "101 Maple Dr, Newplace",
        ),
        customer(
            "CUST005",
            "Charlie Brown",
            "charlie.b@example.com",
            "555-0104",
            CustomerStatus::Active,
            OnlineStatus::Online,
            "Fiber 1 Gbps",
            date(2023, 9, 30),
            "212 Birch Rd, Oldtown",
        ),
    ]
}

fn invoices() -> Vec<Invoice> {
    let invoice = |id: &str,
                   customer_id: &str,
                   customer_name: &str,
                   amount: f64,
                   issued: NaiveDate,
                   due: NaiveDate,
                   status: InvoiceStatus| Invoice {
        id: EntityId::from(id),
        customer_id: EntityId::from(customer_id),
        customer_name: customer_name.into(),
        amount,
        issue_date: issued,
        due_date: due,
        status,
    };
    vec![
        invoice(
            "INV-2024-001",
            "CUST001",
            "John Doe",
            1200.0,
            date(2024, 7, 1),
            date(2024, 7, 15),
            InvoiceStatus::Paid,
        ),
        invoice(
            "INV-2024-002",
            "CUST002",
            "Jane Smith",
            1800.0,
            date(2024, 7, 1),
            date(2024, 7, 15),
            InvoiceStatus::Due,
        ),
        invoice(
            "INV-2024-003",
            "CUST003",
            "Bob Johnson",
            800.0,
            date(2024, 6, 1),
            date(2024, 6, 15),
            InvoiceStatus::Overdue,
        ),
        invoice(
            "INV-2024-004",
            "CUST005",
            "Charlie Brown",
            4000.0,
            date(2024, 7, 5),
            date(2024, 7, 20),
            InvoiceStatus::Due,
        ),
    ]
}
