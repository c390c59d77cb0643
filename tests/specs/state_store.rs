//! State-store durability specs.

use roost_core::{CertifiedHostData, HostId, HostName, HostRecord, SnapshotId, SnapshotRecord};
use roost_storage::{CachedHostStore, DirHostStore, HostStore};

fn sample_record(name: &str) -> HostRecord {
    let mut certified =
        CertifiedHostData::new(HostId::generate(), HostName::new(name), "roost-");
    certified.user_tags.insert("team".into(), "infra".into());
    certified.snapshots.push(SnapshotRecord {
        id: SnapshotId::generate(),
        name: "stop".into(),
        created_at: chrono::Utc::now(),
    });
    let mut record = HostRecord::new(certified);
    record.set_ssh_endpoint("127.0.0.1".into(), 2222, "ssh-ed25519 AAAA".into());
    record
}

/// A crash mid-write leaves either the prior record or the new one, never
/// a partial document.
#[tokio::test]
async fn write_is_atomic_against_torn_tmp_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirHostStore::new(dir.path());
    let record = sample_record("worker");
    store.write(&record).await.unwrap();

    // Simulate a crash during a later write: a half-written temp file
    // next to the record.
    let record_path = dir
        .path()
        .join("hosts")
        .join(record.host_id().as_str())
        .join("record.json");
    tokio::fs::write(record_path.with_extension("tmp"), b"{\"certified\": {\"trunc")
        .await
        .unwrap();

    let read = store.read(record.host_id(), false).await.unwrap().unwrap();
    assert_eq!(read, record);
}

/// Certified data survives the store's JSON encoding without field loss.
#[tokio::test]
async fn certified_data_round_trips_through_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirHostStore::new(dir.path());
    let record = sample_record("worker");
    store.write(&record).await.unwrap();

    let read = store.read(record.host_id(), false).await.unwrap().unwrap();
    assert_eq!(read.certified, record.certified);
    assert_eq!(read.ssh_endpoint(), record.ssh_endpoint());
}

/// The cache serves stale endpoints until cleared, then rediscovers.
#[tokio::test]
async fn clear_cache_drops_stale_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let store = CachedHostStore::new(DirHostStore::new(dir.path()));
    let mut record = sample_record("worker");
    store.write(&record).await.unwrap();

    // The endpoint moves (container restarted on a new port).
    record.ssh_port = Some(3333);
    store.inner().write(&record).await.unwrap();

    let cached = store.read(record.host_id(), true).await.unwrap().unwrap();
    assert_eq!(cached.ssh_port, Some(2222));

    store.clear_cache();
    let fresh = store.read(record.host_id(), true).await.unwrap().unwrap();
    assert_eq!(fresh.ssh_port, Some(3333));
}
