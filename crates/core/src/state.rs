// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle enums.
//!
//! Enums are closed and carry string representations used verbatim in
//! persisted JSON. Adding a value is forward-compatible; removing one
//! requires a migration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a host, derived rather than persisted.
///
/// Container present and running => RUNNING; record with failure_reason =>
/// FAILED; record but no live container and nonempty snapshots => STOPPED;
/// record absent => DESTROYED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HostState {
    Running,
    Stopped,
    Destroyed,
    Failed,
    Building,
}

/// Lifecycle state of an agent, computed from its tmux session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentLifecycleState {
    /// Expected process is in the foreground (or among descendants).
    Running,
    /// Running, and the `waiting` sentinel file exists.
    Waiting,
    /// Pane process exited, or only a bare shell remains.
    Done,
    /// A different non-shell process took over the pane.
    Replaced,
    /// No tmux session exists.
    Stopped,
}

/// Named sources of activity used for idle detection.
///
/// BOOT is host-scoped; the rest are agent-scoped. Activity time is the
/// mtime of `activity/<source>`; the file's JSON body is advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivitySource {
    Boot,
    Create,
    Start,
    Process,
    User,
    Agent,
    Ssh,
}

impl ActivitySource {
    /// All sources, in declaration order.
    pub const ALL: [ActivitySource; 7] = [
        ActivitySource::Boot,
        ActivitySource::Create,
        ActivitySource::Start,
        ActivitySource::Process,
        ActivitySource::User,
        ActivitySource::Agent,
        ActivitySource::Ssh,
    ];

    /// File name under the `activity/` directory.
    pub fn file_name(self) -> &'static str {
        match self {
            ActivitySource::Boot => "boot",
            ActivitySource::Create => "create",
            ActivitySource::Start => "start",
            ActivitySource::Process => "process",
            ActivitySource::User => "user",
            ActivitySource::Agent => "agent",
            ActivitySource::Ssh => "ssh",
        }
    }
}

/// How an agent's work dir is derived from the source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkDirCopyMode {
    Copy,
    Clone,
    Worktree,
}

/// Idle-detection mode, resolved against provider defaults at create time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdleMode {
    Disabled,
    Io,
    #[default]
    Process,
}

/// Direction of a sync operation relative to the local side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncMode {
    Push,
    Pull,
}

/// How git refs move during a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GitPushMode {
    /// Push the current branch; refuses non-fast-forward.
    #[default]
    Branch,
    /// `--mirror`: force-overwrite all refs.
    Mirror,
}

/// Policy for uncommitted changes on the destination of a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UncommittedChangesMode {
    /// Abort if dirty.
    #[default]
    Fail,
    /// Stash before sync; do not restore.
    Stash,
    /// Stash before sync; pop on exit (success and failure).
    Merge,
    /// `git reset --hard && git clean -fd` before sync.
    Clobber,
}

macro_rules! display_via_serde {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    // Serde's string form is the persisted representation;
                    // Display must agree with it.
                    match serde_json::to_value(self) {
                        Ok(serde_json::Value::String(s)) => write!(f, "{}", s),
                        _ => write!(f, "{:?}", self),
                    }
                }
            }
        )+
    };
}

display_via_serde!(
    HostState,
    AgentLifecycleState,
    ActivitySource,
    WorkDirCopyMode,
    IdleMode,
    SyncMode,
    GitPushMode,
    UncommittedChangesMode,
);

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
