// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::DirHostStore;
use roost_core::{CertifiedHostData, HostName};

fn sample_record(name: &str) -> HostRecord {
    HostRecord::new(CertifiedHostData::new(
        HostId::generate(),
        HostName::new(name),
        "roost-",
    ))
}

#[tokio::test]
async fn cached_read_serves_without_touching_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = CachedHostStore::new(DirHostStore::new(dir.path()));
    let record = sample_record("worker");
    store.write(&record).await.unwrap();

    // Remove the backing file; the cache still serves the record.
    tokio::fs::remove_dir_all(dir.path().join("hosts")).await.unwrap();
    let read = store.read(record.host_id(), true).await.unwrap();
    assert_eq!(read, Some(record.clone()));

    // Uncached read goes to disk and finds nothing, evicting the entry.
    let fresh = store.read(record.host_id(), false).await.unwrap();
    assert!(fresh.is_none());
    let after = store.read(record.host_id(), true).await.unwrap();
    assert!(after.is_none());
}

#[tokio::test]
async fn clear_cache_forces_fresh_reads() {
    let dir = tempfile::tempdir().unwrap();
    let store = CachedHostStore::new(DirHostStore::new(dir.path()));
    let record = sample_record("worker");
    store.write(&record).await.unwrap();

    tokio::fs::remove_dir_all(dir.path().join("hosts")).await.unwrap();
    store.clear_cache();
    assert!(store.read(record.host_id(), true).await.unwrap().is_none());
}

#[tokio::test]
async fn uncached_read_repopulates() {
    let dir = tempfile::tempdir().unwrap();
    let store = CachedHostStore::new(DirHostStore::new(dir.path()));
    let record = sample_record("worker");
    // Written through the inner store directly: the cache has no entry.
    store.inner().write(&record).await.unwrap();

    let read = store.read(record.host_id(), false).await.unwrap();
    assert_eq!(read, Some(record.clone()));

    // Now cached: survives backing-file removal.
    tokio::fs::remove_dir_all(dir.path().join("hosts")).await.unwrap();
    assert!(store.read(record.host_id(), true).await.unwrap().is_some());
}
