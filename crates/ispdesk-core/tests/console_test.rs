#![allow(clippy::unwrap_used)]
// End-to-end flows through an authorized session on the simulated backend.

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use tempfile::TempDir;

use ispdesk_core::{
    BackendSettings, Console, ConsoleConfig, CoreError, DeviceDraft, DeviceStatus, EntityId,
    ErrorKind, KickOutcome, NtpEdit, ProbeState, Repository, RouterOsVersion, Session,
};

fn config(unreachable: &[&str]) -> ConsoleConfig {
    ConsoleConfig {
        backend: BackendSettings {
            unreachable_hosts: unreachable.iter().map(|h| (*h).to_owned()).collect(),
            ..BackendSettings::default()
        },
        ..ConsoleConfig::default()
    }
}

fn session(console: &Console) -> Session {
    let token = console.login("admin", "password").unwrap();
    console.authorize(&token.token).unwrap()
}

#[tokio::test(start_paused = true)]
async fn add_probe_and_remove_a_server() {
    let console = Console::open(config(&[]), Repository::Memory).unwrap();
    let session = session(&console);
    let registry = session.registry().unwrap();

    let added = registry
        .add(DeviceDraft {
            name: "Edge-1".into(),
            host: "10.0.0.5".into(),
            password: SecretString::from("x".to_owned()),
            ..DeviceDraft::default()
        })
        .unwrap();
    assert_eq!(registry.list()[0].id, added.id);
    assert_eq!(added.protocol_version, RouterOsVersion::V7);

    let tester = session.tester().unwrap();
    let outcome = tester.test_connection(&added.id).await.unwrap();
    assert_eq!(outcome.state, ProbeState::Success);
    assert!(matches!(
        tester.test_connection(&added.id).await,
        Err(CoreError::Busy { .. })
    ));
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(tester.state(&added.id), None);

    let request = registry.request_removal(&added.id).unwrap();
    registry.confirm_removal(request).unwrap();
    assert_eq!(registry.list().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn disabled_server_probe_fails_as_status() {
    let console = Console::open(config(&[]), Repository::Memory).unwrap();
    let session = session(&console);
    let backup = session.registry().unwrap().get(&EntityId::from("MKT003")).unwrap();
    assert_eq!(backup.status, DeviceStatus::Disabled);

    let outcome = session.tester().unwrap().test_connection(&backup.id).await.unwrap();
    assert_eq!(outcome.state, ProbeState::Failed);
}

#[tokio::test(start_paused = true)]
async fn ntp_servers_survive_a_disable_enable_round_trip() {
    let console = Console::open(config(&[]), Repository::Memory).unwrap();
    let session = session(&console);
    let editor = session.editor().unwrap();
    let mut edit = editor.load(&EntityId::from("MKT001")).await.unwrap();

    edit.set_ntp(NtpEdit::Enabled(false)).unwrap();
    let err = edit
        .set_ntp(NtpEdit::PrimaryServer("ntp.example.net".into()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    edit.set_ntp(NtpEdit::Enabled(true)).unwrap();

    assert_eq!(edit.draft().ntp.primary_server, "time.google.com");
    assert_eq!(edit.draft().ntp.secondary_server, "pool.ntp.org");
    assert!(!edit.is_dirty());
}

#[tokio::test(start_paused = true)]
async fn load_from_unreachable_router_leaves_cache_alone() {
    let console =
        Console::open(config(&["router.branch1.isp.com"]), Repository::Memory).unwrap();
    let session = session(&console);
    let editor = session.editor().unwrap();
    let id = EntityId::from("MKT002");
    let stored = console.store().config(&id).unwrap();

    let err = editor.load(&id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert_eq!(console.store().config(&id).unwrap(), stored);
}

#[tokio::test(start_paused = true)]
async fn kick_is_idempotent_through_the_session() {
    let console = Console::open(config(&[]), Repository::Memory).unwrap();
    let session = session(&console);
    let monitor = session.monitor().unwrap();
    let id = EntityId::from("cl1");

    assert_eq!(monitor.kick(&id).await.unwrap(), KickOutcome::Disconnected);
    assert_eq!(monitor.kick(&id).await.unwrap(), KickOutcome::AlreadyGone);
    assert_eq!(monitor.list("").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn state_file_round_trip_keeps_passwords_private() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");

    {
        let console = Console::open(config(&[]), Repository::StateFile(path.clone())).unwrap();
        let session = session(&console);
        session
            .registry()
            .unwrap()
            .add(DeviceDraft {
                name: "Edge-2".into(),
                host: "10.0.0.6".into(),
                password: SecretString::from("hunter2".to_owned()),
                ..DeviceDraft::default()
            })
            .unwrap();
        assert!(console.save().unwrap());
    }

    let console = Console::open(config(&[]), Repository::StateFile(path.clone())).unwrap();
    let session = session(&console);
    let devices = session.registry().unwrap().list();
    assert_eq!(devices.len(), 4);
    assert_eq!(devices[0].name, "Edge-2");

    let listing = serde_json::to_string(&*devices).unwrap();
    assert!(!listing.contains("hunter2"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
