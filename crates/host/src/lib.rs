// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! roost-host: the Host and Agent objects.
//!
//! A [`Host`] wraps a connector with the full filesystem/exec surface plus
//! lifecycle operations: activity recording, cooperative locking, env-file
//! management, the tmux session supervisor, work-dir construction, and
//! provisioning orchestration. An [`agent::Agent`] is a typed object over a
//! state directory on a host: lifecycle classification, message injection,
//! and the agent-type seam.

pub mod agent;
mod host;
mod idle;
mod lock;
mod paths;
mod provision;
mod sessions;
mod workdir;

pub use host::{CertifiedDataObserver, Host};
pub use lock::HostLock;
pub use paths::HostPaths;

use roost_connector::ConnectorError;
use roost_core::{AgentId, AgentName, HostId};
use std::time::Duration;
use thiserror::Error;

/// Default timeout for tmux commands.
pub const TMUX_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for file probes (stat, test -d).
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for provisioning commands; a safety net for long user
/// scripts.
pub const PROVISION_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// Default grace window before SIGKILL during stop.
pub const STOP_GRACE: Duration = Duration::from_secs(1);

/// Default overall timeout for stopping agents.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from host operations.
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    #[error(transparent)]
    Sync(#[from] roost_sync::SyncError),
    #[error("agent {0} not found on host {1}")]
    AgentNotFound(AgentId, HostId),
    #[error("agent {name} failed to start: {message}")]
    AgentStart { name: AgentName, message: String },
    #[error("invalid input: {0}")]
    UserInput(String),
    #[error("host command failed: {0}")]
    Command(String),
    #[error("could not acquire host lock within {}s", .0.as_secs())]
    LockTimeout(Duration),
    #[error("malformed state file {path}: {message}")]
    MalformedState { path: String, message: String },
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from agent-level operations.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Host(#[from] HostError),
    #[error("unknown agent type: {0}")]
    UnknownAgentType(String),
    #[error("send_message to {name} failed: {message}")]
    SendMessage { name: AgentName, message: String },
    #[error("agent {name} not ready within {}s", .timeout.as_secs())]
    ReadyTimeout { name: AgentName, timeout: Duration },
}
