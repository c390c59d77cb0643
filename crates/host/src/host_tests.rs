// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::agent::AgentTypeRegistry;
use roost_connector::{FakeConnector, LocalConnector};
use roost_core::ActivitySource;
use std::sync::Arc;
use tempfile::TempDir;

fn local_host(dir: &TempDir) -> Arc<Host> {
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

fn fake_host(fake: &FakeConnector) -> Arc<Host> {
    Arc::new(Host::new(
        HostId::generate(),
        HostName::new("fake"),
        "docker",
        "roost-",
        "/hostdir",
        Arc::new(fake.clone()),
        Arc::new(AgentTypeRegistry::with_builtins()),
    ))
}

#[tokio::test]
async fn write_read_and_append_files() {
    let dir = tempfile::tempdir().unwrap();
    let host = local_host(&dir);
    let path = dir.path().join("notes.txt");

    host.write_text_file(&path, "one\n").await.unwrap();
    host.append_to_file(&path, "two\n").await.unwrap();
    host.prepend_to_file(&path, "zero\n").await.unwrap();
    assert_eq!(host.read_text_file(&path).await.unwrap(), "zero\none\ntwo\n");
}

#[tokio::test]
async fn append_treats_missing_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let host = local_host(&dir);
    let path = dir.path().join("fresh.txt");
    host.append_to_file(&path, "hello").await.unwrap();
    assert_eq!(host.read_text_file(&path).await.unwrap(), "hello");
}

#[tokio::test]
async fn activity_mtime_is_normative() {
    let dir = tempfile::tempdir().unwrap();
    let host = local_host(&dir);

    assert!(host.activity_time(ActivitySource::Boot).await.unwrap().is_none());
    host.record_activity(ActivitySource::Boot).await.unwrap();
    let time = host.activity_time(ActivitySource::Boot).await.unwrap().unwrap();
    let age = (chrono::Utc::now() - time).num_seconds();
    assert!((0..5).contains(&age));

    // The body is advisory JSON.
    let body = host.activity_record(ActivitySource::Boot).await.unwrap().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(body.trim()).unwrap();
    assert!(parsed.get("time").is_some());
}

#[tokio::test]
async fn certified_data_round_trips_and_tracks_work_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let host = local_host(&dir);

    assert!(host.certified_data().await.unwrap().is_none());

    host.add_generated_work_dir(std::path::Path::new("/work/a")).await.unwrap();
    assert!(host.is_generated_work_dir(std::path::Path::new("/work/a")).await.unwrap());
    assert!(!host.is_generated_work_dir(std::path::Path::new("/work/b")).await.unwrap());

    host.remove_generated_work_dir(std::path::Path::new("/work/a")).await.unwrap();
    assert!(!host.is_generated_work_dir(std::path::Path::new("/work/a")).await.unwrap());

    let data = host.certified_data().await.unwrap().unwrap();
    assert_eq!(data.host_id, *host.id());
    assert_eq!(data.tmux_session_prefix, "roost-");
}

#[tokio::test]
async fn host_env_vars_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let host = local_host(&dir);

    host.set_env_var("A", "1").await.unwrap();
    host.set_env_var("B", "two words").await.unwrap();
    assert_eq!(host.env_var("A").await.unwrap().as_deref(), Some("1"));
    assert_eq!(host.env_var("B").await.unwrap().as_deref(), Some("two words"));
    assert!(host.env_var("MISSING").await.unwrap().is_none());
}

#[tokio::test]
async fn agent_ids_only_canonical_directories() {
    let dir = tempfile::tempdir().unwrap();
    let host = local_host(&dir);
    let agents_dir = host.paths().agents_dir();
    let id = AgentId::generate();
    tokio::fs::create_dir_all(agents_dir.join(id.as_str())).await.unwrap();
    tokio::fs::create_dir_all(agents_dir.join("not-an-agent")).await.unwrap();

    assert_eq!(host.agent_ids().await.unwrap(), vec![id]);
}

#[tokio::test]
async fn observer_sees_certified_updates() {
    struct Recorder(std::sync::Mutex<Vec<String>>);

    #[async_trait::async_trait]
    impl CertifiedDataObserver for Recorder {
        async fn certified_data_updated(
            &self,
            host_id: &HostId,
            _data: &roost_core::CertifiedHostData,
        ) {
            self.0.lock().unwrap().push(host_id.to_string());
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder(Default::default()));
    let host = Arc::new(
        Host::new(
            HostId::generate(),
            HostName::new("observed"),
            "local",
            "roost-",
            dir.path(),
            Arc::new(LocalConnector::new()),
            Arc::new(AgentTypeRegistry::with_builtins()),
        )
        .with_observer(recorder.clone()),
    );

    host.add_generated_work_dir(std::path::Path::new("/w")).await.unwrap();
    assert_eq!(recorder.0.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn mkdir_failure_is_typed() {
    let fake = FakeConnector::new();
    fake.respond("mkdir -p", roost_connector::CommandResult::failed("denied", 1));
    let host = fake_host(&fake);
    let err = host.mkdir(std::path::Path::new("/nope")).await.unwrap_err();
    assert!(matches!(err, HostError::Command(_)));
}
