// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted records.
//!
//! `CertifiedHostData` is data the control plane writes and owns; it is
//! authoritative, in contrast to *reported* data that agents and hooks write
//! for the control plane to read. Everything here round-trips through JSON
//! without field loss.

use crate::id::{AgentId, AgentName, HostId, HostName, SnapshotId};
use crate::options::NamedCommand;
use crate::state::ActivitySource;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// A provider-captured point-in-time image of a host's filesystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: SnapshotId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Host-scoped data owned by the control plane, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertifiedHostData {
    pub host_id: HostId,
    pub host_name: HostName,
    #[serde(default)]
    pub user_tags: IndexMap<String, String>,
    #[serde(default)]
    pub snapshots: Vec<SnapshotRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub activity_sources: BTreeSet<ActivitySource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_log: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    /// Absolute paths of work dirs the control plane materialized and may
    /// later remove. User-authored directories never appear here.
    #[serde(default)]
    pub generated_work_dirs: BTreeSet<PathBuf>,
    pub tmux_session_prefix: String,
    #[serde(default)]
    pub plugin: IndexMap<String, serde_json::Value>,
}

impl CertifiedHostData {
    pub fn new(host_id: HostId, host_name: HostName, tmux_session_prefix: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            host_id,
            host_name,
            user_tags: IndexMap::new(),
            snapshots: Vec::new(),
            created_at: now,
            updated_at: now,
            idle_timeout_seconds: None,
            activity_sources: BTreeSet::new(),
            failure_reason: None,
            build_log: None,
            stop_reason: None,
            generated_work_dirs: BTreeSet::new(),
            tmux_session_prefix: tmux_session_prefix.into(),
            plugin: IndexMap::new(),
        }
    }

    /// Bump `updated_at`; call after any mutation, before persisting.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Snapshot ids within a host are unique; deletion is an unordered
    /// removal.
    pub fn remove_snapshot(&mut self, id: &SnapshotId) -> Option<SnapshotRecord> {
        let idx = self.snapshots.iter().position(|s| &s.id == id)?;
        Some(self.snapshots.swap_remove(idx))
    }

    /// Most recently created snapshot, if any.
    pub fn latest_snapshot(&self) -> Option<&SnapshotRecord> {
        self.snapshots.iter().max_by_key(|s| s.created_at)
    }
}

/// Container launch configuration recorded for restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    #[serde(default)]
    pub start_args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Durable per-host record: certified data plus operational fields.
///
/// `ssh_host`, `ssh_port`, and `ssh_host_public_key` are all present or all
/// absent; all-absent marks a failed host which is listable but never
/// connectable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRecord {
    pub certified: CertifiedHostData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_host_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ContainerConfig>,
    /// Opaque provider handle (e.g. a Docker container id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
}

/// SSH endpoint of a connectable host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshEndpoint {
    pub host: String,
    pub port: u16,
    pub host_public_key: String,
}

impl HostRecord {
    pub fn new(certified: CertifiedHostData) -> Self {
        Self {
            certified,
            ssh_host: None,
            ssh_port: None,
            ssh_host_public_key: None,
            config: None,
            container_id: None,
        }
    }

    pub fn host_id(&self) -> &HostId {
        &self.certified.host_id
    }

    /// The SSH endpoint, or `None` for a failed (never-connectable) host.
    pub fn ssh_endpoint(&self) -> Option<SshEndpoint> {
        match (&self.ssh_host, self.ssh_port, &self.ssh_host_public_key) {
            (Some(host), Some(port), Some(key)) => Some(SshEndpoint {
                host: host.clone(),
                port,
                host_public_key: key.clone(),
            }),
            _ => None,
        }
    }

    pub fn set_ssh_endpoint(&mut self, host: String, port: u16, host_public_key: String) {
        self.ssh_host = Some(host);
        self.ssh_port = Some(port);
        self.ssh_host_public_key = Some(host_public_key);
    }
}

/// Per-agent record, persisted at `<host_dir>/agents/<agent_id>/data.json`.
///
/// Exactly one record per data.json file; the filesystem directory is
/// authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub name: AgentName,
    #[serde(rename = "type")]
    pub agent_type: String,
    pub work_dir: PathBuf,
    pub create_time: DateTime<Utc>,
    pub command: String,
    #[serde(default)]
    pub additional_commands: Vec<NamedCommand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_message: Option<String>,
    #[serde(default)]
    pub message_delay_seconds: f64,
    /// Delay between typed text and Enter; agent types tune this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enter_delay_seconds: Option<f64>,
    /// Opaque capability tokens.
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub start_on_boot: bool,
    #[serde(default)]
    pub plugin: IndexMap<String, serde_json::Value>,
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
