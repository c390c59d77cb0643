//! Git sync scenarios against real repositories.

use crate::prelude::*;
use roost_connector::LocalConnector;
use roost_core::{GitPushMode, UncommittedChangesMode};
use roost_sync::{pull_git, push_git, GitContext, PullOptions};
use std::path::Path;
use std::sync::Arc;

fn ctx(path: &Path) -> GitContext {
    GitContext::new(Arc::new(LocalConnector::new()), path)
}

fn init_repo(dir: &Path) {
    git(dir, &["init", "-b", "main"]);
    std::fs::write(dir.join("README.md"), "one\n").unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "-m", "initial"]);
}

/// Pull with uncommitted changes under MERGE: the new commit lands, the
/// dirty file survives, and the stash is drained.
#[tokio::test]
async fn pull_merge_keeps_uncommitted_changes() {
    if !git_available() {
        eprintln!("skipping: git not available");
        return;
    }

    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    init_repo(source.path());
    git(
        dest.path(),
        &["clone", &source.path().display().to_string(), "."],
    );

    // Source advances by one commit.
    std::fs::write(source.path().join("feature.txt"), "from source\n").unwrap();
    git(source.path(), &["add", "."]);
    git(source.path(), &["commit", "-m", "advance"]);
    let source_head = git(source.path(), &["rev-parse", "HEAD"]);

    // Destination has an uncommitted change.
    std::fs::write(dest.path().join("local-note.txt"), "uncommitted X\n").unwrap();

    let dest_ctx = ctx(dest.path());
    let stash_before = dest_ctx.stash_len().await.unwrap();

    let opts = PullOptions {
        branch: Some("main".into()),
        uncommitted: UncommittedChangesMode::Merge,
    };
    pull_git(&dest_ctx, &source.path().display().to_string(), &opts)
        .await
        .unwrap();

    // HEAD includes the new commit.
    let dest_head = git(dest.path(), &["rev-parse", "HEAD"]);
    assert_eq!(dest_head, source_head);
    assert!(dest.path().join("feature.txt").exists());

    // The working tree still contains the uncommitted change, and the
    // stash count is back where it started.
    let note = std::fs::read_to_string(dest.path().join("local-note.txt")).unwrap();
    assert_eq!(note, "uncommitted X\n");
    assert_eq!(dest_ctx.stash_len().await.unwrap(), stash_before);
}

/// FAIL mode refuses to touch a dirty destination.
#[tokio::test]
async fn pull_fail_mode_aborts_on_dirty_tree() {
    if !git_available() {
        eprintln!("skipping: git not available");
        return;
    }

    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    init_repo(source.path());
    git(
        dest.path(),
        &["clone", &source.path().display().to_string(), "."],
    );
    std::fs::write(dest.path().join("dirty.txt"), "x\n").unwrap();
    git(dest.path(), &["add", "dirty.txt"]);

    let err = pull_git(
        &ctx(dest.path()),
        &source.path().display().to_string(),
        &PullOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, roost_sync::SyncError::DirtyWorkingTree(_)));
}

/// Branch push moves the current branch; non-fast-forward is refused
/// without mirror mode.
#[tokio::test]
async fn push_branch_then_refuse_non_fast_forward() {
    if !git_available() {
        eprintln!("skipping: git not available");
        return;
    }

    let source = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    init_repo(source.path());
    git(target.path(), &["init", "--bare", "-b", "main"]);
    let target_url = target.path().display().to_string();

    push_git(&ctx(source.path()), &target_url, GitPushMode::Branch)
        .await
        .unwrap();
    let pushed = git(target.path(), &["rev-parse", "main"]);
    assert_eq!(pushed, git(source.path(), &["rev-parse", "HEAD"]));

    // Rewrite history; a plain branch push must refuse.
    git(source.path(), &["commit", "--amend", "-m", "rewritten"]);
    let err = push_git(&ctx(source.path()), &target_url, GitPushMode::Branch)
        .await
        .unwrap_err();
    assert!(matches!(err, roost_sync::SyncError::NonFastForward));

    // Mirror force-overwrites all refs.
    push_git(&ctx(source.path()), &target_url, GitPushMode::Mirror)
        .await
        .unwrap();
    assert_eq!(
        git(target.path(), &["rev-parse", "main"]),
        git(source.path(), &["rev-parse", "HEAD"])
    );
}
