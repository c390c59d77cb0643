// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory-backed host store.
//!
//! Layout under the root:
//! ```text
//! hosts/<host_id>/record.json
//! hosts/<host_id>/agents/<agent_id>.json
//! ```
//! The Docker provider points this at the shared state volume; other
//! providers may use a local directory. The contract is identical.

use crate::atomic::write_atomic;
use crate::{HostStore, StoreError};
use async_trait::async_trait;
use roost_core::{AgentId, AgentRecord, HostId, HostRecord};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct DirHostStore {
    root: PathBuf,
}

impl DirHostStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn host_dir(&self, host_id: &HostId) -> PathBuf {
        self.root.join("hosts").join(host_id.as_str())
    }

    fn record_path(&self, host_id: &HostId) -> PathBuf {
        self.host_dir(host_id).join("record.json")
    }

    fn agents_dir(&self, host_id: &HostId) -> PathBuf {
        self.host_dir(host_id).join("agents")
    }

    async fn read_record_file(path: &Path) -> Option<HostRecord> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable host record");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "malformed host record");
                None
            }
        }
    }
}

#[async_trait]
impl HostStore for DirHostStore {
    async fn read(
        &self,
        host_id: &HostId,
        _use_cache: bool,
    ) -> Result<Option<HostRecord>, StoreError> {
        Ok(Self::read_record_file(&self.record_path(host_id)).await)
    }

    async fn write(&self, record: &HostRecord) -> Result<(), StoreError> {
        let path = self.record_path(record.host_id());
        let data = serde_json::to_vec_pretty(record)?;
        write_atomic(&path, &data).await?;
        Ok(())
    }

    async fn delete(&self, host_id: &HostId) -> Result<(), StoreError> {
        let dir = self.host_dir(host_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_all(&self) -> Result<Vec<HostRecord>, StoreError> {
        let hosts_dir = self.root.join("hosts");
        let mut entries = match tokio::fs::read_dir(&hosts_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let record_path = entry.path().join("record.json");
            if let Some(record) = Self::read_record_file(&record_path).await {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn clear_cache(&self) {
        // No in-process cache at this layer; see CachedHostStore.
    }

    async fn persist_agent_data(
        &self,
        host_id: &HostId,
        record: &AgentRecord,
    ) -> Result<(), StoreError> {
        let path = self
            .agents_dir(host_id)
            .join(format!("{}.json", record.id));
        let data = serde_json::to_vec_pretty(record)?;
        write_atomic(&path, &data).await?;
        Ok(())
    }

    async fn remove_agent_data(
        &self,
        host_id: &HostId,
        agent_id: &AgentId,
    ) -> Result<(), StoreError> {
        let path = self.agents_dir(host_id).join(format!("{}.json", agent_id));
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_agent_data(&self, host_id: &HostId) -> Result<Vec<AgentRecord>, StoreError> {
        let dir = self.agents_dir(host_id);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            match tokio::fs::read(entry.path()).await {
                Ok(bytes) => match serde_json::from_slice(&bytes) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        tracing::warn!(path = %entry.path().display(), error = %e, "malformed agent record");
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "unreadable agent record");
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
#[path = "dir_store_tests.rs"]
mod tests;
