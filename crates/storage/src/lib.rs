// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! roost-storage: the durable host state store.
//!
//! Maps HostId to a [`HostRecord`] plus per-host out-of-band agent data,
//! used when a host is offline but an agent record must persist. Backing
//! stores vary by provider; the contract here is identical for all of them:
//! atomic replace on write, nonfatal reads, write-through caching.

mod atomic;
mod cache;
mod dir_store;

pub use atomic::write_atomic;
pub use cache::CachedHostStore;
pub use dir_store::DirHostStore;

use async_trait::async_trait;
use roost_core::{AgentId, AgentRecord, HostId, HostRecord};
use thiserror::Error;

/// Errors from the state store.
///
/// Every read returning `None` is nonfatal; only writes propagate the
/// underlying I/O failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Durable HostId -> HostRecord mapping plus per-host agent data.
#[async_trait]
pub trait HostStore: Send + Sync {
    /// Read one record. Cached reads serve the in-process map; uncached
    /// reads fetch fresh and repopulate. Missing or unreadable records are
    /// `Ok(None)`.
    async fn read(&self, host_id: &HostId, use_cache: bool)
        -> Result<Option<HostRecord>, StoreError>;

    /// Atomic replace of the record object. Implementers MUST write to a
    /// temp name and rename so partial writes are never observed.
    async fn write(&self, record: &HostRecord) -> Result<(), StoreError>;

    /// Remove the record and all per-host agent data.
    async fn delete(&self, host_id: &HostId) -> Result<(), StoreError>;

    /// All records; ordering unspecified.
    async fn list_all(&self) -> Result<Vec<HostRecord>, StoreError>;

    /// Drop the in-process cache. Called on any connection error so the
    /// next read rediscovers the SSH endpoint.
    fn clear_cache(&self);

    /// Persist agent data out of band, for offline-host resume.
    async fn persist_agent_data(
        &self,
        host_id: &HostId,
        record: &AgentRecord,
    ) -> Result<(), StoreError>;

    async fn remove_agent_data(
        &self,
        host_id: &HostId,
        agent_id: &AgentId,
    ) -> Result<(), StoreError>;

    async fn list_agent_data(&self, host_id: &HostId) -> Result<Vec<AgentRecord>, StoreError>;
}
