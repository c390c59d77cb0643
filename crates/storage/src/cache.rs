// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-through caching wrapper for any host store.

use crate::{HostStore, StoreError};
use async_trait::async_trait;
use parking_lot::RwLock;
use roost_core::{AgentId, AgentRecord, HostId, HostRecord};
use std::collections::HashMap;

/// Caches records in-process. Writes go through to the backing store and
/// update the cache; `clear_cache` drops everything so the next read
/// rediscovers endpoints.
pub struct CachedHostStore<S> {
    inner: S,
    cache: RwLock<HashMap<HostId, HostRecord>>,
}

impl<S: HostStore> CachedHostStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: HostStore> HostStore for CachedHostStore<S> {
    async fn read(
        &self,
        host_id: &HostId,
        use_cache: bool,
    ) -> Result<Option<HostRecord>, StoreError> {
        if use_cache {
            if let Some(record) = self.cache.read().get(host_id) {
                return Ok(Some(record.clone()));
            }
        }

        let record = self.inner.read(host_id, false).await?;
        match &record {
            Some(record) => {
                self.cache.write().insert(host_id.clone(), record.clone());
            }
            None => {
                self.cache.write().remove(host_id);
            }
        }
        Ok(record)
    }

    async fn write(&self, record: &HostRecord) -> Result<(), StoreError> {
        self.inner.write(record).await?;
        self.cache
            .write()
            .insert(record.host_id().clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, host_id: &HostId) -> Result<(), StoreError> {
        self.inner.delete(host_id).await?;
        self.cache.write().remove(host_id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<HostRecord>, StoreError> {
        let records = self.inner.list_all().await?;
        let mut cache = self.cache.write();
        for record in &records {
            cache.insert(record.host_id().clone(), record.clone());
        }
        Ok(records)
    }

    fn clear_cache(&self) {
        self.cache.write().clear();
        self.inner.clear_cache();
    }

    async fn persist_agent_data(
        &self,
        host_id: &HostId,
        record: &AgentRecord,
    ) -> Result<(), StoreError> {
        self.inner.persist_agent_data(host_id, record).await
    }

    async fn remove_agent_data(
        &self,
        host_id: &HostId,
        agent_id: &AgentId,
    ) -> Result<(), StoreError> {
        self.inner.remove_agent_data(host_id, agent_id).await
    }

    async fn list_agent_data(&self, host_id: &HostId) -> Result<Vec<AgentRecord>, StoreError> {
        self.inner.list_agent_data(host_id).await
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
