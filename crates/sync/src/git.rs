// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git push and pull between a repository and a remote URL.
//!
//! The URL may be a filesystem path (same host) or an `ssh://` URL whose
//! transport is pinned via `GIT_SSH_COMMAND` on the context.

use crate::{with_stash_guard, GitContext, SyncError};
use roost_core::{GitPushMode, UncommittedChangesMode};

/// Options for a pull.
#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    /// Checkout this branch before merging; default stays on the current one.
    pub branch: Option<String>,
    pub uncommitted: UncommittedChangesMode,
}

/// Push from `source` to `dest_url`.
///
/// Branch mode pushes the current branch and refuses non-fast-forward;
/// mirror mode force-overwrites all refs. LFS objects are skipped either
/// way; they transfer later as needed.
pub async fn push_git(
    source: &GitContext,
    dest_url: &str,
    mode: GitPushMode,
) -> Result<(), SyncError> {
    let ctx = source
        .clone()
        .with_env("GIT_LFS_SKIP_PUSH", "1");

    match mode {
        GitPushMode::Mirror => {
            tracing::debug!(dest = %dest_url, "git push --mirror");
            ctx.run_checked(&["push", "--no-verify", "--mirror", dest_url])
                .await?;
        }
        GitPushMode::Branch => {
            let branch = ctx
                .current_branch()
                .await?
                .ok_or_else(|| SyncError::git("push", "detached HEAD; cannot branch-push"))?;
            tracing::debug!(dest = %dest_url, %branch, "git push");
            let result = ctx.run(&["push", "--no-verify", dest_url, &branch]).await?;
            if !result.success {
                let message = result.output_for_error();
                if message.contains("non-fast-forward")
                    || message.contains("fetch first")
                    || message.contains("rejected")
                {
                    return Err(SyncError::NonFastForward);
                }
                return Err(SyncError::git("push", message.trim()));
            }
        }
    }
    Ok(())
}

/// Pull from `source_url` into `dest`.
///
/// Fetch, optionally checkout the target branch, merge FETCH_HEAD. On
/// conflict, verify MERGE_HEAD exists then abort. The original branch is
/// restored on success and failure.
pub async fn pull_git(
    dest: &GitContext,
    source_url: &str,
    opts: &PullOptions,
) -> Result<(), SyncError> {
    let original_branch = dest.current_branch().await?;

    let outcome = with_stash_guard(dest, opts.uncommitted, || async {
        match &opts.branch {
            Some(branch) => {
                dest.run_checked(&["fetch", source_url, branch]).await?;
                if original_branch.as_deref() != Some(branch.as_str()) {
                    dest.checkout(branch).await?;
                }
            }
            None => {
                dest.run_checked(&["fetch", source_url, "HEAD"]).await?;
            }
        }

        let merge = dest.run(&["merge", "FETCH_HEAD"]).await?;
        if !merge.success {
            if dest.merge_in_progress().await? {
                dest.merge_abort().await?;
            }
            return Err(SyncError::MergeConflict);
        }
        Ok(())
    })
    .await;

    // Restore the original branch on all exit paths.
    if let Some(original) = &original_branch {
        let current = dest.current_branch().await?;
        if current.as_deref() != Some(original.as_str()) {
            if let Err(e) = dest.checkout(original).await {
                tracing::warn!(branch = %original, error = %e, "failed to restore original branch");
            }
        }
    }

    outcome
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
