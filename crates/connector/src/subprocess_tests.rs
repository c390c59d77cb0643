// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[tokio::test]
async fn run_with_timeout_captures_output() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "echo out; echo err >&2"]);
    let output = run_with_timeout(cmd, Duration::from_secs(5), "echo test")
        .await
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "out");
    assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "err");
}

#[tokio::test]
async fn run_with_timeout_times_out() {
    let mut cmd = Command::new("sleep");
    cmd.arg("10");
    let err = run_with_timeout(cmd, Duration::from_millis(50), "slow sleep")
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::Timeout { .. }));
    assert!(err.to_string().contains("slow sleep"));
}

#[tokio::test]
async fn run_with_stdin_feeds_bytes() {
    let cmd = Command::new("cat");
    let output = run_with_stdin_timeout(cmd, b"hello stdin", Duration::from_secs(5), "cat")
        .await
        .unwrap();
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello stdin");
}

#[tokio::test]
async fn nonzero_exit_is_not_an_error() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "exit 3"]);
    let output = run_with_timeout(cmd, Duration::from_secs(5), "exit 3")
        .await
        .unwrap();
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(3));
}
