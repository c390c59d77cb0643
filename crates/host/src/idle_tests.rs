// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::agent::AgentTypeRegistry;
use roost_connector::LocalConnector;
use roost_core::{AgentId, HostId, HostName};
use std::sync::Arc;

fn local_host(dir: &tempfile::TempDir) -> Arc<Host> {
    Arc::new(Host::new(
        HostId::generate(),
        HostName::new("local"),
        "local",
        "roost-",
        dir.path(),
        Arc::new(LocalConnector::new()),
        Arc::new(AgentTypeRegistry::with_builtins()),
    ))
}

#[tokio::test]
async fn no_activity_means_idle_forever() {
    let dir = tempfile::tempdir().unwrap();
    let host = local_host(&dir);
    assert!(host.idle_seconds().await.unwrap().is_none());
}

#[tokio::test]
async fn activity_resets_idle_clock() {
    let dir = tempfile::tempdir().unwrap();
    let host = local_host(&dir);

    host.record_activity(ActivitySource::Boot).await.unwrap();
    let idle = host.idle_seconds().await.unwrap().unwrap();
    assert!(idle < 5.0);
}

#[tokio::test]
async fn agent_activity_counts_toward_host_idle() {
    let dir = tempfile::tempdir().unwrap();
    let host = local_host(&dir);

    // A stale host-level boot record...
    host.record_activity(ActivitySource::Boot).await.unwrap();
    let boot_path = host.paths().host_activity(ActivitySource::Boot);
    set_mtime_secs_ago(&boot_path, 3600);

    // ...and a fresh agent-level process record.
    let agent_id = AgentId::generate();
    tokio::fs::create_dir_all(host.paths().agent_state_dir(&agent_id))
        .await
        .unwrap();
    host.record_agent_activity(&agent_id, ActivitySource::Process)
        .await
        .unwrap();

    let idle = host.idle_seconds().await.unwrap().unwrap();
    assert!(idle < 60.0, "agent activity should win: idle={}", idle);
}

#[tokio::test]
async fn idle_is_nonincreasing_without_activity() {
    let dir = tempfile::tempdir().unwrap();
    let host = local_host(&dir);
    host.record_activity(ActivitySource::Boot).await.unwrap();

    let first = host.idle_seconds().await.unwrap().unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let second = host.idle_seconds().await.unwrap().unwrap();
    assert!(second >= first);

    host.record_activity(ActivitySource::Boot).await.unwrap();
    let after = host.idle_seconds().await.unwrap().unwrap();
    assert!(after <= second);
    assert!(after < 1.0);
}

fn set_mtime_secs_ago(path: &std::path::Path, secs: u64) {
    let past = std::time::SystemTime::now() - std::time::Duration::from_secs(secs);
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_times(std::fs::FileTimes::new().set_modified(past)).unwrap();
}
