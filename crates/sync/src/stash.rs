// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The uncommitted-changes policy and its scoped stash guard.

use crate::{GitContext, SyncError};
use roost_core::UncommittedChangesMode;
use std::future::Future;

/// Run `op` with the destination's uncommitted changes handled per `mode`.
///
/// - FAIL: abort if dirty.
/// - STASH: stash before; do not restore.
/// - MERGE: stash before; pop on exit, on success and failure paths.
/// - CLOBBER: `reset --hard HEAD && clean -fd` before.
pub async fn with_stash_guard<F, Fut, T>(
    ctx: &GitContext,
    mode: UncommittedChangesMode,
    op: F,
) -> Result<T, SyncError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    let mut stashed = false;
    match mode {
        UncommittedChangesMode::Fail => {
            let porcelain = ctx.status_porcelain().await?;
            if !porcelain.trim().is_empty() {
                return Err(SyncError::DirtyWorkingTree(porcelain.trim().to_string()));
            }
        }
        UncommittedChangesMode::Stash | UncommittedChangesMode::Merge => {
            if ctx.is_dirty().await? {
                stashed = ctx.stash_push().await?;
            }
        }
        UncommittedChangesMode::Clobber => {
            ctx.clobber().await?;
        }
    }

    let result = op().await;

    if stashed && mode == UncommittedChangesMode::Merge {
        match (&result, ctx.stash_pop().await) {
            (_, Ok(())) => {}
            (Ok(_), Err(pop_err)) => return Err(pop_err),
            (Err(_), Err(pop_err)) => {
                // The operation already failed; keep its error, note ours.
                tracing::warn!(error = %pop_err, "failed to restore stashed changes");
            }
        }
    }

    result
}

#[cfg(test)]
#[path = "stash_tests.rs"]
mod tests;
