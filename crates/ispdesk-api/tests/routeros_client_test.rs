#![allow(clippy::unwrap_used)]
// Integration tests for `RouterOsClient` against an in-process fake router.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio_util::codec::Framed;

use ispdesk_api::routeros::{
    FilterRuleUpdate, NtpClientSettings, RouterOsMajor, Sentence, SentenceCodec, SessionSource,
};
use ispdesk_api::{ConnectConfig, Error, RouterOsClient};

// ── Helpers ─────────────────────────────────────────────────────────

type Log = Arc<Mutex<Vec<Vec<String>>>>;

fn words(ws: &[&str]) -> Vec<String> {
    ws.iter().map(|w| (*w).to_owned()).collect()
}

fn done() -> Vec<String> {
    words(&["!done"])
}

/// Accept one connection and answer each sentence with `handler`'s replies.
/// Every received sentence is appended to the returned log.
async fn spawn_router<F>(handler: F) -> (SocketAddr, Log)
where
    F: Fn(&[String]) -> Vec<Vec<String>> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: Log = Arc::default();
    let seen = Arc::clone(&log);

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, SentenceCodec);
        while let Some(Ok(sentence)) = framed.next().await {
            let received = sentence.into_words();
            let replies = handler(&received);
            seen.lock().unwrap().push(received);
            for reply in replies {
                if framed.send(Sentence::from_words(reply)).await.is_err() {
                    return;
                }
            }
        }
    });

    (addr, log)
}

/// Handler that accepts any login, then delegates.
fn with_login<F>(rest: F) -> impl Fn(&[String]) -> Vec<Vec<String>> + Send + 'static
where
    F: Fn(&[String]) -> Vec<Vec<String>> + Send + 'static,
{
    move |sentence: &[String]| {
        if sentence.first().map(String::as_str) == Some("/login") {
            vec![done()]
        } else {
            rest(sentence)
        }
    }
}

fn config(addr: SocketAddr) -> ConnectConfig {
    ConnectConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        username: "admin".into(),
        password: SecretString::from("secret".to_owned()),
        connect_timeout: Duration::from_secs(2),
    }
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_sends_name_and_password() {
    let (addr, log) = spawn_router(with_login(|_| vec![done()])).await;

    let client = RouterOsClient::open(&config(addr)).await.unwrap();
    drop(client);

    let sent = log.lock().unwrap().clone();
    assert_eq!(sent[0], words(&["/login", "=name=admin", "=password=secret"]));
}

#[tokio::test]
async fn test_login_trap_is_authentication_error() {
    let (addr, _) = spawn_router(|_| {
        vec![
            words(&["!trap", "=message=invalid user name or password (6)"]),
            done(),
        ]
    })
    .await;

    let result = RouterOsClient::open(&config(addr)).await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error"
    );
}

#[tokio::test]
async fn test_challenge_login_is_unsupported() {
    let (addr, _) = spawn_router(|_| vec![words(&["!done", "=ret=ebddd18303a54111e2dea05a92ab46b4"])]).await;

    let result = RouterOsClient::open(&config(addr)).await;
    assert!(matches!(result, Err(Error::UnsupportedOperation(_))));
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_identity_print() {
    let (addr, _) = spawn_router(with_login(|_| {
        vec![words(&["!re", "=name=Main-POP-Router"]), done()]
    }))
    .await;

    let mut client = RouterOsClient::open(&config(addr)).await.unwrap();
    assert_eq!(client.identity().await.unwrap(), "Main-POP-Router");
}

#[tokio::test]
async fn test_trap_then_connection_stays_usable() {
    let (addr, _) = spawn_router(with_login(|s| match s[0].as_str() {
        "/ppp/active/remove" => vec![
            words(&["!trap", "=message=no such item"]),
            done(),
        ],
        _ => vec![words(&["!re", "=name=still-here"]), done()],
    }))
    .await;

    let mut client = RouterOsClient::open(&config(addr)).await.unwrap();
    let err = client
        .remove_session(SessionSource::Ppp, "*9")
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    assert_eq!(client.identity().await.unwrap(), "still-here");
}

#[tokio::test]
async fn test_fatal_reply_ends_command() {
    let (addr, _) = spawn_router(with_login(|_| {
        vec![words(&["!fatal", "not logged in"])]
    }))
    .await;

    let mut client = RouterOsClient::open(&config(addr)).await.unwrap();
    let result = client.identity().await;
    assert!(matches!(result, Err(Error::Fatal(m)) if m == "not logged in"));
}

#[tokio::test]
async fn test_active_sessions_tolerates_missing_hotspot() {
    let (addr, _) = spawn_router(with_login(|s| match s[0].as_str() {
        "/ppp/active/print" => vec![
            words(&[
                "!re",
                "=.id=*8",
                "=name=john.doe",
                "=caller-id=AA:BB:CC:11:22:33",
                "=address=10.5.50.112",
                "=uptime=2h15m",
            ]),
            done(),
        ],
        _ => vec![
            words(&["!trap", "=message=no such command prefix"]),
            done(),
        ],
    }))
    .await;

    let mut client = RouterOsClient::open(&config(addr)).await.unwrap();
    let sessions = client.active_sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].username, "john.doe");
    assert_eq!(sessions[0].id, "*8");
}

#[tokio::test]
async fn test_v6_ntp_splits_addresses_and_names() {
    let (addr, log) = spawn_router(with_login(|_| vec![done()])).await;

    let mut client = RouterOsClient::open(&config(addr)).await.unwrap();
    client
        .set_ntp_client(
            RouterOsMajor::V6,
            &NtpClientSettings {
                enabled: true,
                servers: vec!["162.159.200.1".into(), "pool.ntp.org".into()],
            },
        )
        .await
        .unwrap();

    let sent = log.lock().unwrap().clone();
    assert_eq!(
        sent[1],
        words(&[
            "/system/ntp/client/set",
            "=enabled=yes",
            "=primary-ntp=162.159.200.1",
            "=secondary-ntp=0.0.0.0",
            "=server-dns-names=pool.ntp.org",
        ])
    );
}

#[tokio::test]
async fn test_v7_ntp_reads_server_list() {
    let (addr, _) = spawn_router(with_login(|_| {
        vec![
            words(&["!re", "=enabled=true", "=servers=time.google.com,pool.ntp.org"]),
            done(),
        ]
    }))
    .await;

    let mut client = RouterOsClient::open(&config(addr)).await.unwrap();
    let ntp = client.ntp_client(RouterOsMajor::V7).await.unwrap();
    assert!(ntp.enabled);
    assert_eq!(ntp.servers, vec!["time.google.com", "pool.ntp.org"]);
}

#[tokio::test]
async fn test_filter_update_unsets_cleared_matchers() {
    let (addr, log) = spawn_router(with_login(|_| vec![done()])).await;

    let mut client = RouterOsClient::open(&config(addr)).await.unwrap();
    client
        .update_filter_rule(&FilterRuleUpdate {
            id: "*2".into(),
            action: "drop".into(),
            protocol: Some("tcp".into()),
            src_address: None,
            dst_port: Some("8291".into()),
            comment: Some("Allow Winbox".into()),
            disabled: false,
        })
        .await
        .unwrap();

    let sent = log.lock().unwrap().clone();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[1][0], "/ip/firewall/filter/set");
    assert!(sent[1].contains(&"=dst-port=8291".to_owned()));
    assert!(sent[1].contains(&"=comment=Allow Winbox".to_owned()));
    assert_eq!(
        sent[2],
        words(&[
            "/ip/firewall/filter/unset",
            "=numbers=*2",
            "=value-name=src-address",
        ])
    );
}

#[tokio::test]
async fn test_filter_update_without_comment_leaves_it_alone() {
    let (addr, log) = spawn_router(with_login(|_| vec![done()])).await;

    let mut client = RouterOsClient::open(&config(addr)).await.unwrap();
    client
        .update_filter_rule(&FilterRuleUpdate {
            id: "*4".into(),
            action: "accept".into(),
            protocol: None,
            src_address: None,
            dst_port: None,
            comment: None,
            disabled: true,
        })
        .await
        .unwrap();

    let sent = log.lock().unwrap().clone();
    assert_eq!(sent[1][0], "/ip/firewall/filter/set");
    assert!(sent[1].iter().all(|w| !w.starts_with("=comment=")));
    assert!(sent[1].contains(&"=disabled=yes".to_owned()));
}

#[tokio::test]
async fn test_connect_refused_is_io_error() {
    // Bind then drop to get a port nobody is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = RouterOsClient::connect(&addr.ip().to_string(), addr.port(), Duration::from_secs(2)).await;
    assert!(matches!(result, Err(Error::Io(_))));
}
