// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn default_reply_is_empty_success() {
    let fake = FakeConnector::new();
    let result = fake
        .run_shell_command("anything", ExecOptions::default())
        .await
        .unwrap();
    assert!(result.success);
    assert!(result.stdout.is_empty());
}

#[tokio::test]
async fn scripted_reply_matches_substring() {
    let fake = FakeConnector::new();
    fake.respond("tmux list-panes", CommandResult::ok("0|claude|123\n"));
    let result = fake
        .run_shell_command("tmux list-panes -t 'roost-demo'", ExecOptions::default())
        .await
        .unwrap();
    assert_eq!(result.stdout, "0|claude|123\n");
}

#[tokio::test]
async fn respond_once_drains() {
    let fake = FakeConnector::new();
    fake.respond_once("probe", CommandResult::failed("first", 1));
    let first = fake
        .run_shell_command("probe", ExecOptions::default())
        .await
        .unwrap();
    assert!(!first.success);
    let second = fake
        .run_shell_command("probe", ExecOptions::default())
        .await
        .unwrap();
    assert!(second.success);
}

#[tokio::test]
async fn dropped_connection_is_typed() {
    let fake = FakeConnector::new();
    fake.drop_connection_on("flaky");
    let err = fake
        .run_shell_command("flaky thing", ExecOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::ConnectionLost(_)));
}

#[tokio::test]
async fn files_round_trip_and_record_calls() {
    let fake = FakeConnector::new();
    fake.put_file(b"abc", Path::new("/x/y")).await.unwrap();
    assert_eq!(fake.get_file(Path::new("/x/y")).await.unwrap(), b"abc");
    let calls = fake.calls();
    assert!(matches!(calls[0], ConnectorCall::PutFile { .. }));
    assert!(matches!(calls[1], ConnectorCall::GetFile { .. }));
}
