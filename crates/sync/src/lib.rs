// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! roost-sync: moving code between the client and an agent's work dir.
//!
//! Two independent pipelines, both bidirectional: git push/pull for history
//! and file rsync for everything else. A [`GitContext`] runs every git
//! command through a [`roost_connector::Connector`], so the same logic
//! drives the local and remote sides without branching at each call site.

mod git;
mod git_context;
mod rsync;
mod stash;

pub use git::{pull_git, push_git, PullOptions};
pub use git_context::GitContext;
pub use rsync::{parse_rsync_stats, sync_files, RsyncEndpoint, RsyncOptions, SyncStats};
pub use stash::with_stash_guard;

use roost_connector::ConnectorError;
use thiserror::Error;

/// Errors from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    #[error("git {operation} failed: {message}")]
    Git { operation: String, message: String },
    #[error("working tree has uncommitted changes: {0}")]
    DirtyWorkingTree(String),
    #[error("push refused: non-fast-forward (use mirror mode to overwrite)")]
    NonFastForward,
    #[error("merge conflict; merge aborted")]
    MergeConflict,
    #[error("rsync failed: {0}")]
    Rsync(String),
    #[error("not a git repository: {0}")]
    NotARepository(String),
}

impl SyncError {
    pub(crate) fn git(operation: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Git {
            operation: operation.into(),
            message: message.into(),
        }
    }
}
