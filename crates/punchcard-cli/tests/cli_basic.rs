//! CLI E2E tests.
//!
//! Offline-mode invocations exercise the in-process store; the remote path
//! runs against a mocked attendance API via PUNCHCARD_API_URL.

use assert_cmd::Command;
use chrono::{Duration, Utc};
use predicates::prelude::*;

fn punchcard() -> Command {
    Command::cargo_bin("punchcard").unwrap()
}

#[test]
fn offline_status_is_neutral() {
    punchcard()
        .args(["status", "--offline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OFFLINE"))
        .stdout(predicate::str::contains("00:00:00"));
}

#[test]
fn offline_status_json_shape() {
    let output = punchcard()
        .args(["status", "--offline", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "offline");
    assert_eq!(json["metrics"]["worked_secs"], 0);
    assert_eq!(json["sync_error"], false);
}

#[test]
fn offline_clock_in_reports_the_event() {
    punchcard()
        .args(["in", "--offline", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Clocked in at"));
}

#[test]
fn status_against_store_shows_working_session() {
    let mut server = mockito::Server::new();
    let clock_in = (Utc::now() - Duration::hours(2)).to_rfc3339();
    let _fetch = server
        .mock("GET", "/attendance/get-individual-attendance")
        .with_status(200)
        .with_body(format!(
            r#"{{"data": {{"clockIn": "{clock_in}", "clockOut": null, "breaks": []}}}}"#
        ))
        .create();

    punchcard()
        .args(["status"])
        .env("PUNCHCARD_API_URL", server.url())
        .assert()
        .success()
        .stdout(predicate::str::contains("WORKING"))
        .stdout(predicate::str::contains("Worked:    02:00:"));
}

#[test]
fn stale_session_prompts_for_correction() {
    let mut server = mockito::Server::new();
    let clock_in = (Utc::now() - Duration::hours(13)).to_rfc3339();
    let _fetch = server
        .mock("GET", "/attendance/get-individual-attendance")
        .with_status(200)
        .with_body(format!(
            r#"{{"data": {{"clockIn": "{clock_in}", "clockOut": null, "breaks": []}}}}"#
        ))
        .create();

    punchcard()
        .args(["status"])
        .env("PUNCHCARD_API_URL", server.url())
        .assert()
        .success()
        .stdout(predicate::str::contains("Missed clock-out"))
        .stdout(predicate::str::contains("punchcard correct"));
}

#[test]
fn rejected_command_exits_with_error() {
    let mut server = mockito::Server::new();
    let _fetch = server
        .mock("GET", "/attendance/get-individual-attendance")
        .with_status(200)
        .with_body(r#"{"data": null}"#)
        .create();
    let _create = server
        .mock("POST", "/attendance/create")
        .with_status(500)
        .with_body("boom")
        .create();

    punchcard()
        .args(["in", "--yes"])
        .env("PUNCHCARD_API_URL", server.url())
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn clock_out_while_offline_is_an_invalid_transition() {
    let mut server = mockito::Server::new();
    let _fetch = server
        .mock("GET", "/attendance/get-individual-attendance")
        .with_status(200)
        .with_body(r#"{"data": null}"#)
        .create();

    punchcard()
        .args(["out", "--yes"])
        .env("PUNCHCARD_API_URL", server.url())
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot clock out while OFFLINE"));
}

#[test]
fn correct_rejects_unparseable_time() {
    punchcard()
        .args([
            "correct",
            "--offline",
            "--time",
            "yesterday-ish",
            "--reason",
            "x",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized timestamp"));
}
