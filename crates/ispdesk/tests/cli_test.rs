//! Integration tests for the `ispdesk` CLI binary.
//!
//! Every test runs against the simulated backend with its own temporary
//! config and state file, so nothing touches real routers or the user's
//! keyring.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `ispdesk` binary isolated inside `dir`.
fn ispdesk_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("ispdesk");
    cmd.env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env("XDG_DATA_HOME", dir.join("data"))
        .env("ISPDESK_CONFIG", dir.join("config.toml"))
        .env("ISPDESK_STATE", dir.join("state.json"))
        .env("ISPDESK_DEFAULTS__KEYRING", "false")
        .env("ISPDESK_BACKEND__SIMULATED_LATENCY_MS", "0")
        .env("NO_COLOR", "1")
        .env_remove("ISPDESK_OUTPUT")
        .env_remove("ISPDESK_PASSWORD")
        .env_remove("ISPDESK_ADMIN_PASSWORD")
        .env_remove("ISPDESK_TOKEN_SECRET")
        .env_remove("GEMINI_API_KEY")
        .env_remove("RUST_LOG")
        .write_stdin("");
    cmd
}

fn logged_in() -> TempDir {
    let dir = TempDir::new().unwrap();
    ispdesk_cmd(dir.path())
        .args(["login", "--password", "password"])
        .assert()
        .success();
    dir
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    let dir = TempDir::new().unwrap();
    ispdesk_cmd(dir.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("servers")
            .and(predicate::str::contains("router"))
            .and(predicate::str::contains("clients")),
    );
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    ispdesk_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ispdesk"));
}

#[test]
fn test_completions_zsh() {
    let dir = TempDir::new().unwrap();
    ispdesk_cmd(dir.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Authentication ──────────────────────────────────────────────────

#[test]
fn test_command_without_login_exits_auth() {
    let dir = TempDir::new().unwrap();
    let output = ispdesk_cmd(dir.path())
        .args(["servers", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(
        combined_output(&output).contains("login"),
        "Expected a login hint"
    );
}

#[test]
fn test_wrong_password_is_rejected() {
    let dir = TempDir::new().unwrap();
    ispdesk_cmd(dir.path())
        .args(["login", "--password", "letmein"])
        .assert()
        .code(3);
    assert!(!dir.path().join("session.json").exists());
}

#[test]
fn test_login_via_env_then_whoami() {
    let dir = TempDir::new().unwrap();
    ispdesk_cmd(dir.path())
        .arg("login")
        .env("ISPDESK_PASSWORD", "password")
        .assert()
        .success();

    ispdesk_cmd(dir.path())
        .args(["whoami", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"username\": \"admin\""));
}

#[test]
fn test_logout_forgets_the_session() {
    let dir = logged_in();
    ispdesk_cmd(dir.path()).arg("logout").assert().success();
    ispdesk_cmd(dir.path()).args(["servers", "list"]).assert().code(3);
}

// ── Servers ─────────────────────────────────────────────────────────

#[test]
fn test_servers_list_json() {
    let dir = logged_in();
    let output = ispdesk_cmd(dir.path())
        .args(["servers", "list", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let servers: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<&str> = servers
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s["id"].as_str())
        .collect();
    assert!(ids.contains(&"MKT001"), "ids: {ids:?}");
    assert!(ids.contains(&"MKT003"), "ids: {ids:?}");
    assert!(
        servers
            .as_array()
            .unwrap()
            .iter()
            .all(|s| s.get("password").is_none()),
        "passwords must never be serialized"
    );
}

#[test]
fn test_servers_get_unknown_exits_not_found() {
    let dir = logged_in();
    ispdesk_cmd(dir.path())
        .args(["servers", "get", "MKT999"])
        .assert()
        .code(4);
}

#[test]
fn test_servers_add_rejects_bad_fields() {
    let dir = logged_in();
    ispdesk_cmd(dir.path())
        .args([
            "servers", "add", "--name", "", "--host", "10.9.9.9", "--password", "x",
        ])
        .assert()
        .failure();
}

#[test]
fn test_remove_without_yes_is_refused_non_interactively() {
    let dir = logged_in();
    ispdesk_cmd(dir.path())
        .args(["servers", "remove", "MKT002"])
        .assert()
        .code(2);

    ispdesk_cmd(dir.path())
        .args(["servers", "list", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("MKT002"));
}

#[test]
fn test_remove_with_yes_persists() {
    let dir = logged_in();
    ispdesk_cmd(dir.path())
        .args(["--yes", "servers", "remove", "MKT002"])
        .assert()
        .success();

    ispdesk_cmd(dir.path())
        .args(["servers", "list", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("MKT002").not());
}

#[test]
fn test_connection_test_of_disabled_server_reports_failure() {
    let dir = logged_in();
    ispdesk_cmd(dir.path())
        .args(["servers", "test", "MKT003", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("failed"));
}

// ── Router config ───────────────────────────────────────────────────

#[test]
fn test_router_edit_then_cached_show() {
    let dir = logged_in();
    ispdesk_cmd(dir.path())
        .args(["--yes", "router", "edit", "MKT001", "--identity", "Core-Edge"])
        .assert()
        .success();

    ispdesk_cmd(dir.path())
        .args(["router", "show", "MKT001", "--cached"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Core-Edge"));
}

#[test]
fn test_router_edit_without_flags_changes_nothing() {
    let dir = logged_in();
    ispdesk_cmd(dir.path())
        .args(["router", "edit", "MKT001"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No changes"));
}

// ── Billing ─────────────────────────────────────────────────────────

#[test]
fn test_invoice_create_shows_up_in_list() {
    let dir = logged_in();
    ispdesk_cmd(dir.path())
        .args([
            "invoices", "create", "CUST002", "1800", "--issue-date", "2025-01-01",
        ])
        .assert()
        .success();

    ispdesk_cmd(dir.path())
        .args(["invoices", "list", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2025-01-01"));
}

#[test]
fn test_customers_export_header() {
    let dir = logged_in();
    ispdesk_cmd(dir.path())
        .args(["customers", "export"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "id,name,email,phone,package,status,joinDate,address",
        ));
}

#[test]
fn test_dashboard_json_without_insights() {
    let dir = logged_in();
    ispdesk_cmd(dir.path())
        .args(["dashboard", "--no-insights", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("totalRevenue"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_masks_secrets() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[auth]\npassword = \"hunter2\"\n\n[billing]\ncurrency = \"USD\"\n",
    )
    .unwrap();

    ispdesk_cmd(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("****")
                .and(predicate::str::contains("USD"))
                .and(predicate::str::contains("hunter2").not()),
        );
}

#[test]
fn test_config_init_requires_terminal() {
    let dir = TempDir::new().unwrap();
    ispdesk_cmd(dir.path())
        .args(["config", "init"])
        .assert()
        .failure();
    assert!(!dir.path().join("config.toml").exists());
}
