// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use roost_connector::FakeConnector;

fn ctx(fake: &FakeConnector) -> GitContext {
    GitContext::new(Arc::new(fake.clone()), "/repo")
}

#[tokio::test]
async fn run_quotes_repo_path_and_args() {
    let fake = FakeConnector::new();
    let ctx = GitContext::new(Arc::new(fake.clone()), "/my repo");
    ctx.run(&["checkout", "-B", "feature branch"]).await.unwrap();
    let commands = fake.commands();
    assert_eq!(commands[0], "git -C '/my repo' checkout -B 'feature branch'");
}

#[tokio::test]
async fn current_branch_trims_and_handles_detached() {
    let fake = FakeConnector::new();
    fake.respond("abbrev-ref", roost_connector::CommandResult::ok("main\n"));
    assert_eq!(ctx(&fake).current_branch().await.unwrap(), Some("main".into()));

    let detached = FakeConnector::new();
    detached.respond("abbrev-ref", roost_connector::CommandResult::ok("HEAD\n"));
    assert_eq!(ctx(&detached).current_branch().await.unwrap(), None);
}

#[tokio::test]
async fn run_checked_surfaces_stderr() {
    let fake = FakeConnector::new();
    fake.respond(
        "fetch",
        roost_connector::CommandResult::failed("fatal: not a repo", 128),
    );
    let err = ctx(&fake).run_checked(&["fetch", "origin"]).await.unwrap_err();
    assert!(err.to_string().contains("not a repo"));
}

#[test]
fn porcelain_paths_keep_rename_target() {
    let porcelain = " M src/lib.rs\n?? new.txt\nR  old.rs -> new.rs\n";
    let paths = GitContext::parse_porcelain_paths(porcelain);
    assert_eq!(paths, vec!["new.rs", "new.txt", "src/lib.rs"]);
}

#[test]
fn porcelain_paths_dedupe() {
    let porcelain = " M a.txt\nMM a.txt\n";
    assert_eq!(GitContext::parse_porcelain_paths(porcelain), vec!["a.txt"]);
}

#[tokio::test]
async fn stash_len_counts_lines() {
    let fake = FakeConnector::new();
    fake.respond(
        "stash list",
        roost_connector::CommandResult::ok("stash@{0}: x\nstash@{1}: y\n"),
    );
    assert_eq!(ctx(&fake).stash_len().await.unwrap(), 2);
}

#[tokio::test]
async fn stash_push_reports_nothing_to_save() {
    let fake = FakeConnector::new();
    fake.respond(
        "stash push",
        roost_connector::CommandResult::ok("No local changes to save\n"),
    );
    assert!(!ctx(&fake).stash_push().await.unwrap());
}
