//! End-to-end tests for the `ct` binary
//!
//! Sender and receiver run as separate processes sharing only a base directory.

use std::process::Stdio;
use std::thread;
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ct(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ct").expect("ct binary");
    cmd.arg("--base-dir").arg(temp.path());
    cmd
}

#[test]
fn test_send_then_receive() {
    let temp = TempDir::new().unwrap();

    ct(&temp)
        .args(["send", "addr1", "--int", "42", "--text", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Delivered 2 item(s)"));

    ct(&temp)
        .args(["receive", "addr1", "--timeout", "5000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("int: 42").and(predicate::str::contains("text: hello")));
}

#[test]
fn test_receiver_started_before_sender() {
    let temp = TempDir::new().unwrap();

    let receiver = std::process::Command::new(assert_cmd::cargo::cargo_bin("ct"))
        .arg("--base-dir")
        .arg(temp.path())
        .args(["receive", "addr2", "--timeout", "10000"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn receiver");

    thread::sleep(Duration::from_millis(300));
    ct(&temp).args(["send", "addr2", "--int", "7"]).assert().success();

    let output = receiver.wait_with_output().expect("Receiver did not finish");
    assert!(output.status.success(), "receiver failed: {}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("int: 7"));
}

#[test]
fn test_receive_timeout_fails() {
    let temp = TempDir::new().unwrap();

    ct(&temp)
        .args(["receive", "nowhere", "--timeout", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No delivery at nowhere"));
}

#[test]
fn test_peek_list_and_clear() {
    let temp = TempDir::new().unwrap();
    ct(&temp).args(["send", "addr3", "--text", "x", "--text", "y"]).assert().success();

    ct(&temp)
        .args(["peek", "addr3", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alloc::string::String"));

    ct(&temp)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("addr3"));

    ct(&temp)
        .args(["clear", "addr3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared addr3"));

    ct(&temp)
        .args(["peek", "addr3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing delivered at addr3"));
}

#[test]
fn test_invalid_address_is_rejected() {
    let temp = TempDir::new().unwrap();

    ct(&temp)
        .args(["send", "../escape", "--int", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid address name"));
}
