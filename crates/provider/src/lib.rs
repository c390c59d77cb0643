// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! roost-provider: drivers that create and destroy hosts.
//!
//! The [`Provider`] trait is the seam between the control plane and a kind
//! of compute (local machine, containers, cloud sandboxes). The Docker
//! provider is the reference implementation: containers discovered by
//! label, SSH bootstrapped inside each one, snapshots via filesystem
//! commit, and a shared state volume kept mounted by a singleton state
//! container.

pub mod docker;
mod keys;

pub use keys::{known_hosts_line, SshKeys};

use async_trait::async_trait;
use indexmap::IndexMap;
use roost_connector::ConnectorError;
use roost_core::{
    HostId, HostName, HostRecord, HostState, NewHostOptions, SnapshotId, SnapshotRecord, VolumeId,
};
use roost_host::{Host, HostError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("host {0} not found")]
    HostNotFound(String),
    #[error("snapshot {0} not found")]
    SnapshotNotFound(SnapshotId),
    #[error("host {host_id} failed during creation and cannot be started: {reason}")]
    HostFailed { host_id: HostId, reason: String },
    #[error("{0} is not supported by this provider")]
    Unsupported(&'static str),
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Store(#[from] roost_storage::StoreError),
    #[error("provider operation failed: {0}")]
    Operation(String),
}

/// Reference to a host by id or name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostReference {
    Id(HostId),
    Name(HostName),
}

impl HostReference {
    /// Parse a user-supplied string: canonical ids resolve by id,
    /// everything else by name.
    pub fn parse(input: &str) -> Self {
        match HostId::parse(input) {
            Ok(id) => HostReference::Id(id),
            Err(_) => HostReference::Name(HostName::new(input)),
        }
    }
}

impl std::fmt::Display for HostReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostReference::Id(id) => write!(f, "{}", id),
            HostReference::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Compute resources of a host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostResources {
    pub cpu_count: Option<f64>,
    pub cpu_freq_ghz: Option<f64>,
    pub memory_gb: Option<f64>,
    pub disk_gb: Option<f64>,
    pub gpu: Option<String>,
}

/// A provider-managed volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    pub id: VolumeId,
    pub name: String,
}

/// One host as seen by a listing: present even when failed or stopped.
#[derive(Debug, Clone)]
pub struct HostListing {
    pub host_id: HostId,
    pub host_name: HostName,
    pub state: HostState,
    pub record: Option<HostRecord>,
}

/// A driver that creates/destroys hosts of a particular kind.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    // Capabilities
    fn supports_snapshots(&self) -> bool;
    fn supports_shutdown_hosts(&self) -> bool;
    fn supports_volumes(&self) -> bool;
    fn supports_mutable_tags(&self) -> bool;

    // Host lifecycle
    async fn create_host(&self, options: &NewHostOptions) -> Result<Arc<Host>, ProviderError>;
    async fn stop_host(
        &self,
        host_id: &HostId,
        create_snapshot: bool,
        timeout: Duration,
    ) -> Result<(), ProviderError>;
    async fn start_host(
        &self,
        host_id: &HostId,
        snapshot_id: Option<&SnapshotId>,
    ) -> Result<Arc<Host>, ProviderError>;
    async fn destroy_host(
        &self,
        host_id: &HostId,
        delete_snapshots: bool,
    ) -> Result<(), ProviderError>;

    // Discovery
    async fn get_host(&self, reference: &HostReference) -> Result<Arc<Host>, ProviderError>;
    async fn list_hosts(&self, include_destroyed: bool)
        -> Result<Vec<HostListing>, ProviderError>;
    async fn get_host_resources(&self, host_id: &HostId)
        -> Result<HostResources, ProviderError>;

    // Snapshots
    async fn create_snapshot(
        &self,
        host_id: &HostId,
        name: Option<&str>,
    ) -> Result<SnapshotId, ProviderError>;
    async fn list_snapshots(&self, host_id: &HostId)
        -> Result<Vec<SnapshotRecord>, ProviderError>;
    async fn delete_snapshot(
        &self,
        host_id: &HostId,
        snapshot_id: &SnapshotId,
    ) -> Result<(), ProviderError>;

    // Volumes
    async fn list_volumes(&self) -> Result<Vec<VolumeInfo>, ProviderError>;
    async fn delete_volume(&self, volume_id: &VolumeId) -> Result<(), ProviderError>;
    async fn get_volume_for_host(
        &self,
        host_id: &HostId,
    ) -> Result<Option<VolumeInfo>, ProviderError>;

    // Tags. Providers without mutable tags raise Unsupported from the
    // mutating operations.
    async fn host_tags(&self, host_id: &HostId)
        -> Result<IndexMap<String, String>, ProviderError>;
    async fn set_host_tags(
        &self,
        host_id: &HostId,
        tags: IndexMap<String, String>,
    ) -> Result<(), ProviderError>;
    async fn add_host_tags(
        &self,
        host_id: &HostId,
        tags: IndexMap<String, String>,
    ) -> Result<(), ProviderError>;
    async fn remove_host_tags(
        &self,
        host_id: &HostId,
        keys: &[String],
    ) -> Result<(), ProviderError>;

    async fn rename_host(
        &self,
        host_id: &HostId,
        new_name: &HostName,
    ) -> Result<(), ProviderError>;

    // Out-of-band agent data, for offline-host resume.
    async fn persist_agent_data(
        &self,
        host_id: &HostId,
        record: &roost_core::AgentRecord,
    ) -> Result<(), ProviderError>;
    async fn remove_persisted_agent_data(
        &self,
        host_id: &HostId,
        agent_id: &roost_core::AgentId,
    ) -> Result<(), ProviderError>;
    async fn list_persisted_agent_data(
        &self,
        host_id: &HostId,
    ) -> Result<Vec<roost_core::AgentRecord>, ProviderError>;

    /// Hook invoked by callers on any transport failure: evict caches so
    /// the next call rediscovers the endpoint.
    async fn on_connection_error(&self, host_id: &HostId);
}

/// Derive a host's state from what the provider can observe.
///
/// Container present and running => RUNNING; record with a failure reason
/// => FAILED; record but no live container, with snapshots or a stopped
/// container => STOPPED; no record at all => DESTROYED.
pub fn derive_host_state(
    record: Option<&HostRecord>,
    container_running: bool,
    container_exists: bool,
) -> HostState {
    if container_running {
        return HostState::Running;
    }
    let Some(record) = record else {
        return HostState::Destroyed;
    };
    if record.certified.failure_reason.is_some() {
        return HostState::Failed;
    }
    if container_exists || !record.certified.snapshots.is_empty() {
        return HostState::Stopped;
    }
    HostState::Destroyed
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
