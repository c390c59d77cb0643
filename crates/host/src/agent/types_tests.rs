// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::agent::AgentTypeRegistry;
use crate::host::Host;
use roost_connector::LocalConnector;
use roost_core::{AgentId, HostId, HostName};
use std::sync::Arc;

#[test]
fn generic_command_assembly() {
    let generic = GenericAgentType::default();
    assert_eq!(generic.assemble_command(&[]), "bash");
    assert_eq!(
        generic.assemble_command(&["python".into(), "app.py".into()]),
        "python app.py"
    );
    assert!(!generic.uses_marker_injection());
}

#[test]
fn tui_defaults_and_overrides() {
    let tui = TuiAgentType::named("claude")
        .with_process_name("node")
        .with_ready_indicator("❯")
        .with_enter_delay(Duration::from_millis(250));

    assert_eq!(tui.name(), "claude");
    assert!(tui.uses_marker_injection());
    assert_eq!(tui.tui_ready_indicator().as_deref(), Some("❯"));
    assert_eq!(tui.enter_delay(), Duration::from_millis(250));
    // Hardcoded process name wins over the command basename.
    assert_eq!(tui.expected_process_name("bash -lc 'claude || true'"), "node");

    let plain = TuiAgentType::named("claude");
    assert_eq!(plain.expected_process_name("/usr/local/bin/claude --chat"), "claude");
}

#[test]
fn registry_builtin_lookup() {
    let registry = AgentTypeRegistry::with_builtins();
    assert!(registry.lookup("generic").is_some());
    assert!(registry.lookup("tui").is_some());
    assert!(registry.lookup("nope").is_none());
    assert_eq!(registry.type_names(), vec!["generic", "tui"]);
}

#[tokio::test(start_paused = true)]
async fn tui_ready_signal_polls_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(Host::new(
        HostId::generate(),
        HostName::new("local"),
        "local",
        "roost-",
        dir.path(),
        Arc::new(LocalConnector::new()),
        Arc::new(AgentTypeRegistry::with_builtins()),
    ));
    let id = AgentId::generate();
    let agent = host.agent(id.clone());
    let tui = TuiAgentType::named("tui");

    // Sentinel missing: times out.
    let err = tui
        .wait_for_ready_signal(&agent, Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, crate::AgentError::ReadyTimeout { .. }));

    // Sentinel present: ready immediately.
    let sentinel = host.paths().agent_session_started(&id);
    tokio::fs::create_dir_all(sentinel.parent().unwrap()).await.unwrap();
    tokio::fs::write(&sentinel, b"").await.unwrap();
    tui.wait_for_ready_signal(&agent, Duration::from_secs(1))
        .await
        .unwrap();
}
