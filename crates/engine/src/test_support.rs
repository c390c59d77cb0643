// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test fakes shared by the engine's test modules.

use async_trait::async_trait;
use indexmap::IndexMap;
use roost_connector::{CommandResult, FakeConnector};
use roost_core::{
    AgentId, AgentName, AgentRecord, HostId, HostName, HostState, NewHostOptions, SnapshotId,
    SnapshotRecord, VolumeId,
};
use roost_host::Host;
use roost_provider::{
    HostListing, HostReference, HostResources, Provider, ProviderError, VolumeInfo,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Seed a stopped agent's record into a fake remote host and make its
/// agents directory list it.
pub(crate) fn seed_remote_agent(fake: &FakeConnector, host: &Arc<Host>, name: &str) -> AgentId {
    let id = AgentId::generate();
    let record = AgentRecord {
        id: id.clone(),
        name: AgentName::new(name),
        agent_type: "generic".into(),
        work_dir: "/work/existing".into(),
        create_time: chrono::Utc::now(),
        command: "sleep 999".into(),
        additional_commands: Vec::new(),
        initial_message: None,
        resume_message: None,
        message_delay_seconds: 0.0,
        enter_delay_seconds: Some(0.0),
        permissions: Vec::new(),
        start_on_boot: false,
        plugin: Default::default(),
    };
    fake.put_file_sync(
        host.paths().agent_data(&id),
        serde_json::to_vec(&record).unwrap().as_slice(),
    );
    fake.respond(
        "ls -1 /hostdir/agents",
        CommandResult::ok(format!("{}\n", id)),
    );
    id
}

/// Provider over one fixed, already-running host, with an in-memory
/// persisted-agent-data store.
pub(crate) struct FakeHostProvider {
    provider_name: String,
    host: Arc<Host>,
    persisted: Mutex<HashMap<AgentId, AgentRecord>>,
}

impl FakeHostProvider {
    pub(crate) fn new(provider_name: impl Into<String>, host: Arc<Host>) -> Self {
        Self {
            provider_name: provider_name.into(),
            host,
            persisted: Mutex::new(HashMap::new()),
        }
    }

    /// Ids of agents with persisted out-of-band data.
    pub(crate) fn persisted_agent_ids(&self) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self.persisted.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl Provider for FakeHostProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }
    fn supports_snapshots(&self) -> bool {
        false
    }
    fn supports_shutdown_hosts(&self) -> bool {
        false
    }
    fn supports_volumes(&self) -> bool {
        false
    }
    fn supports_mutable_tags(&self) -> bool {
        false
    }

    async fn create_host(&self, _options: &NewHostOptions) -> Result<Arc<Host>, ProviderError> {
        Ok(Arc::clone(&self.host))
    }
    async fn stop_host(
        &self,
        _host_id: &HostId,
        _create_snapshot: bool,
        _timeout: std::time::Duration,
    ) -> Result<(), ProviderError> {
        Ok(())
    }
    async fn start_host(
        &self,
        _host_id: &HostId,
        _snapshot_id: Option<&SnapshotId>,
    ) -> Result<Arc<Host>, ProviderError> {
        Ok(Arc::clone(&self.host))
    }
    async fn destroy_host(
        &self,
        _host_id: &HostId,
        _delete_snapshots: bool,
    ) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn get_host(&self, reference: &HostReference) -> Result<Arc<Host>, ProviderError> {
        let matches = match reference {
            HostReference::Id(id) => id == self.host.id(),
            HostReference::Name(name) => name == self.host.name(),
        };
        if matches {
            Ok(Arc::clone(&self.host))
        } else {
            Err(ProviderError::HostNotFound(reference.to_string()))
        }
    }
    async fn list_hosts(
        &self,
        _include_destroyed: bool,
    ) -> Result<Vec<HostListing>, ProviderError> {
        Ok(vec![HostListing {
            host_id: self.host.id().clone(),
            host_name: self.host.name().clone(),
            state: HostState::Running,
            record: None,
        }])
    }
    async fn get_host_resources(&self, _host_id: &HostId) -> Result<HostResources, ProviderError> {
        Ok(HostResources::default())
    }

    async fn create_snapshot(
        &self,
        _host_id: &HostId,
        _name: Option<&str>,
    ) -> Result<SnapshotId, ProviderError> {
        Err(ProviderError::Unsupported("snapshots"))
    }
    async fn list_snapshots(
        &self,
        _host_id: &HostId,
    ) -> Result<Vec<SnapshotRecord>, ProviderError> {
        Ok(Vec::new())
    }
    async fn delete_snapshot(
        &self,
        _host_id: &HostId,
        _snapshot_id: &SnapshotId,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported("snapshots"))
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeInfo>, ProviderError> {
        Ok(Vec::new())
    }
    async fn delete_volume(&self, _volume_id: &VolumeId) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported("volumes"))
    }
    async fn get_volume_for_host(
        &self,
        _host_id: &HostId,
    ) -> Result<Option<VolumeInfo>, ProviderError> {
        Ok(None)
    }

    async fn host_tags(
        &self,
        _host_id: &HostId,
    ) -> Result<IndexMap<String, String>, ProviderError> {
        Ok(IndexMap::new())
    }
    async fn set_host_tags(
        &self,
        _host_id: &HostId,
        _tags: IndexMap<String, String>,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported("mutable tags"))
    }
    async fn add_host_tags(
        &self,
        _host_id: &HostId,
        _tags: IndexMap<String, String>,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported("mutable tags"))
    }
    async fn remove_host_tags(
        &self,
        _host_id: &HostId,
        _keys: &[String],
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported("mutable tags"))
    }
    async fn rename_host(
        &self,
        _host_id: &HostId,
        _new_name: &HostName,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported("rename"))
    }

    async fn persist_agent_data(
        &self,
        _host_id: &HostId,
        record: &AgentRecord,
    ) -> Result<(), ProviderError> {
        self.persisted
            .lock()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }
    async fn remove_persisted_agent_data(
        &self,
        _host_id: &HostId,
        agent_id: &AgentId,
    ) -> Result<(), ProviderError> {
        self.persisted.lock().unwrap().remove(agent_id);
        Ok(())
    }
    async fn list_persisted_agent_data(
        &self,
        _host_id: &HostId,
    ) -> Result<Vec<AgentRecord>, ProviderError> {
        Ok(self.persisted.lock().unwrap().values().cloned().collect())
    }

    async fn on_connection_error(&self, _host_id: &HostId) {}
}
