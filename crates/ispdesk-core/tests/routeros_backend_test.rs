#![allow(clippy::unwrap_used)]
// RouterOS backend against an in-process fake router: config mapping,
// apply rollback and idempotent kick.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveTime, Utc};
use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio_util::codec::Framed;

use ispdesk_api::routeros::{Sentence, SentenceCodec};
use ispdesk_core::{
    CoreError, DeviceBackend, DeviceRecord, DeviceStatus, EntityId, ErrorKind, KickOutcome,
    MacAddress, OnlineClientSession, RouterOsVersion,
};
use ispdesk_core::backend::RouterOsConnector;

// ── Fake router ─────────────────────────────────────────────────────

type Log = Arc<Mutex<Vec<Vec<String>>>>;

fn words(ws: &[&str]) -> Vec<String> {
    ws.iter().map(|w| (*w).to_owned()).collect()
}

fn done() -> Vec<String> {
    words(&["!done"])
}

/// Serve any number of connections. Each sentence is logged, then
/// answered by `handler`.
async fn spawn_router<F>(handler: F) -> (SocketAddr, Log)
where
    F: Fn(&[String]) -> Vec<Vec<String>> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: Log = Arc::default();
    let seen = Arc::clone(&log);
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let seen = Arc::clone(&seen);
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let mut framed = Framed::new(stream, SentenceCodec);
                while let Some(Ok(sentence)) = framed.next().await {
                    let received = sentence.into_words();
                    let replies = if received.first().map(String::as_str) == Some("/login") {
                        vec![done()]
                    } else {
                        handler(&received)
                    };
                    seen.lock().unwrap().push(received);
                    for reply in replies {
                        if framed.send(Sentence::from_words(reply)).await.is_err() {
                            return;
                        }
                    }
                }
            });
        }
    });

    (addr, log)
}

/// A v7 router whose DNS menu refuses any change.
fn main_pop(sentence: &[String]) -> Vec<Vec<String>> {
    match sentence[0].as_str() {
        "/system/identity/print" => vec![words(&["!re", "=name=Main-POP-Router"]), done()],
        "/system/clock/print" => vec![
            words(&["!re", "=date=2024-07-30", "=time=10:15:30"]),
            done(),
        ],
        "/system/ntp/client/print" => vec![
            words(&["!re", "=enabled=true", "=servers=time.google.com,pool.ntp.org"]),
            done(),
        ],
        "/ip/dns/print" => vec![words(&["!re", "=servers=8.8.8.8,8.8.4.4"]), done()],
        "/ip/firewall/filter/print" => vec![
            words(&[
                "!re",
                "=.id=*1",
                "=chain=input",
                "=action=accept",
                "=protocol=tcp",
                "=dst-port=8291",
                "=comment=Allow Winbox",
                "=disabled=false",
            ]),
            words(&["!re", "=.id=*2", "=chain=input", "=action=jump", "=disabled=false"]),
            done(),
        ],
        "/ip/dns/set" if sentence.iter().any(|w| w == "=servers=1.1.1.1,1.0.0.1") => vec![
            words(&["!trap", "=message=failure: dns servers rejected"]),
            done(),
        ],
        "/ppp/active/remove" => vec![words(&["!trap", "=message=no such item"]), done()],
        _ => vec![done()],
    }
}

fn device(addr: SocketAddr) -> DeviceRecord {
    DeviceRecord {
        id: EntityId::from("MKT001"),
        name: "Main POP".into(),
        host: addr.ip().to_string(),
        api_port: addr.port(),
        username: "admin".into(),
        password: SecretString::from("secret".to_owned()),
        protocol_version: RouterOsVersion::V7,
        timeout_seconds: 2,
        status: DeviceStatus::Active,
        last_checked_at: Utc::now(),
    }
}

fn backend() -> DeviceBackend {
    DeviceBackend::RouterOs(RouterOsConnector::new())
}

fn sent(log: &Log, command: &str) -> Vec<Vec<String>> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|s| s[0] == command)
        .cloned()
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_maps_router_state_and_skips_unsupported_rules() {
    let (addr, _) = spawn_router(main_pop).await;
    let config = backend().fetch_config(&device(addr)).await.unwrap();

    assert_eq!(config.identity, "Main-POP-Router");
    assert_eq!(config.system_date, NaiveDate::from_ymd_opt(2024, 7, 30).unwrap());
    assert_eq!(config.system_time, NaiveTime::from_hms_opt(10, 15, 30).unwrap());
    assert!(config.ntp.enabled);
    assert_eq!(config.ntp.secondary_server, "pool.ntp.org");
    assert_eq!(config.dns.primary_server, "8.8.8.8");
    assert_eq!(config.firewall_rules.len(), 1);
    assert_eq!(config.firewall_rules[0].name, "Allow Winbox");
    assert_eq!(config.firewall_rules[0].destination_port.as_deref(), Some("8291"));
}

#[tokio::test]
async fn failed_apply_restores_sections_already_written() {
    let (addr, log) = spawn_router(main_pop).await;
    let device = device(addr);
    let backend = backend();
    let baseline = backend.fetch_config(&device).await.unwrap();

    let mut desired = baseline.clone();
    desired.identity = "Core-1".into();
    desired.dns.primary_server = "1.1.1.1".into();
    desired.dns.secondary_server = "1.0.0.1".into();

    let err = backend
        .apply_config(&device, &baseline, &desired)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Rejected { .. }), "got {err:?}");

    let identity_sets = sent(&log, "/system/identity/set");
    assert_eq!(
        identity_sets,
        vec![
            words(&["/system/identity/set", "=name=Core-1"]),
            words(&["/system/identity/set", "=name=Main-POP-Router"]),
        ]
    );
    let dns_sets = sent(&log, "/ip/dns/set");
    assert_eq!(
        dns_sets.last().unwrap(),
        &words(&["/ip/dns/set", "=servers=8.8.8.8,8.8.4.4"])
    );
    assert!(sent(&log, "/system/clock/set").is_empty());
}

/// Like `main_pop`, but a DNS change to 9.9.9.9 is never answered.
fn stalls_on_dns(sentence: &[String]) -> Vec<Vec<String>> {
    if sentence[0] == "/ip/dns/set" && sentence.iter().any(|w| w == "=servers=9.9.9.9") {
        return Vec::new();
    }
    main_pop(sentence)
}

#[tokio::test]
async fn deadline_during_apply_still_rolls_back() {
    let (addr, log) = spawn_router(stalls_on_dns).await;
    let device = device(addr);
    let backend = backend();
    let baseline = backend.fetch_config(&device).await.unwrap();

    let mut desired = baseline.clone();
    desired.identity = "Core-1".into();
    desired.dns.primary_server = "9.9.9.9".into();
    desired.dns.secondary_server = String::new();

    let err = backend
        .apply_config(&device, &baseline, &desired)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Timeout { .. }), "got {err:?}");
    assert!(err.to_string().contains("Main POP"), "got {err}");

    assert_eq!(
        sent(&log, "/system/identity/set"),
        vec![
            words(&["/system/identity/set", "=name=Core-1"]),
            words(&["/system/identity/set", "=name=Main-POP-Router"]),
        ]
    );
    assert_eq!(
        sent(&log, "/ip/dns/set").last().unwrap(),
        &words(&["/ip/dns/set", "=servers=8.8.8.8,8.8.4.4"])
    );
}

#[tokio::test]
async fn unchanged_config_sends_nothing() {
    let (addr, log) = spawn_router(main_pop).await;
    let device = device(addr);
    let backend = backend();
    let baseline = backend.fetch_config(&device).await.unwrap();
    let before = log.lock().unwrap().len();

    backend.apply_config(&device, &baseline, &baseline).await.unwrap();
    assert_eq!(log.lock().unwrap().len(), before);
}

#[tokio::test]
async fn rule_edit_sends_only_that_rule() {
    let (addr, log) = spawn_router(main_pop).await;
    let device = device(addr);
    let backend = backend();
    let baseline = backend.fetch_config(&device).await.unwrap();

    let mut desired = baseline.clone();
    desired.firewall_rules[0].enabled = false;
    backend.apply_config(&device, &baseline, &desired).await.unwrap();

    let sets = sent(&log, "/ip/firewall/filter/set");
    assert_eq!(sets.len(), 1);
    assert!(sets[0].contains(&"=.id=*1".to_owned()));
    assert!(sets[0].contains(&"=disabled=yes".to_owned()));
}

#[tokio::test]
async fn kicking_a_vanished_session_is_already_gone() {
    let (addr, _) = spawn_router(main_pop).await;
    let session = OnlineClientSession {
        id: EntityId::from("ppp:*8"),
        device_id: None,
        username: "john.doe".into(),
        ip_address: "10.5.50.112".into(),
        mac_address: MacAddress::new("AA:BB:CC:11:22:33"),
        server: "Main POP".into(),
        uptime: "2h 15m".into(),
        download_speed: "12.5 Mbps".into(),
        upload_speed: "2.1 Mbps".into(),
    };
    let outcome = backend().kick(&device(addr), &session).await.unwrap();
    assert_eq!(outcome, KickOutcome::AlreadyGone);
}

#[tokio::test]
async fn closed_port_is_a_connectivity_error_naming_the_device() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = backend().probe(&device(addr)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert!(err.to_string().contains("Main POP"), "got {err}");
}
