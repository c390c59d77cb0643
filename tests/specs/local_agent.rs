//! End-to-end local agent scenarios against a real tmux server.

use crate::prelude::*;
use roost_core::{AgentLifecycleState, AgentName, CreateAgentOptions};
use roost_engine::{CreateOptions, Engine};
use serial_test::serial;
use std::time::Duration;

fn options(name: &str, command: &str, work_dir: &std::path::Path) -> CreateOptions {
    let mut agent = CreateAgentOptions::new("generic");
    agent.name = Some(AgentName::new(name));
    agent.command = Some(command.to_string());
    agent.git = None; // in-place
    let mut options = CreateOptions::new(agent);
    options.source.path = Some(work_dir.to_path_buf());
    options
}

async fn wait_for_state(
    agent: &roost_host::agent::Agent,
    wanted: AgentLifecycleState,
    timeout: Duration,
) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if agent.lifecycle_state().await.ok() == Some(wanted) {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::test]
#[serial(tmux)]
async fn local_create_simple_agent() {
    if !tmux_available() {
        eprintln!("skipping: tmux not available");
        return;
    }

    let host_dir = tempfile::tempdir().unwrap();
    let work_dir = tempfile::tempdir().unwrap();
    let host = local_host(host_dir.path());
    let engine = Engine::new(host.clone());

    let name = unique_name("demo");
    let outcome = engine
        .create_agent(&options(&name, "sleep 999", work_dir.path()))
        .await
        .unwrap();

    // The session exists under the prefixed name.
    let session = host.session_name_for(&AgentName::new(name.clone()));
    assert!(host.session_exists(&session).await.unwrap());

    // data.json holds the command verbatim; the work dir is the source
    // (in-place).
    let record = host.read_agent_record(&outcome.agent_id).await.unwrap();
    assert_eq!(record.command, "sleep 999");
    assert_eq!(record.work_dir, work_dir.path());

    // RUNNING within 2s: sleep appears below the session's shell.
    let agent = host.agent(outcome.agent_id.clone());
    assert!(
        wait_for_state(&agent, AgentLifecycleState::Running, Duration::from_secs(2)).await,
        "agent did not reach RUNNING"
    );

    // Stop tears down the whole process tree and the session.
    host.destroy_agent(&outcome.agent_id).await.unwrap();
    assert!(!host.session_exists(&session).await.unwrap());

    // In-place work dirs are never removed.
    assert!(work_dir.path().exists());
}

#[tokio::test]
#[serial(tmux)]
async fn local_create_with_initial_message() {
    if !tmux_available() {
        eprintln!("skipping: tmux not available");
        return;
    }

    let host_dir = tempfile::tempdir().unwrap();
    let work_dir = tempfile::tempdir().unwrap();
    let host = local_host(host_dir.path());
    let engine = Engine::new(host.clone());

    let name = unique_name("cat");
    let mut create = options(&name, "cat", work_dir.path());
    create.agent.initial_message = Some("hello".to_string());

    let outcome = engine.create_agent(&create).await.unwrap();
    let session = host.session_name_for(&AgentName::new(name));

    // The injected message reaches the pane within 3s.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    let mut seen = false;
    while tokio::time::Instant::now() < deadline {
        let capture = host
            .execute_command(&format!(
                "tmux capture-pane -t {} -p",
                roost_connector::sh_quote(&session)
            ))
            .await
            .unwrap();
        if capture.stdout.contains("hello") {
            seen = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(seen, "initial message never appeared in the pane");

    host.destroy_agent(&outcome.agent_id).await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn stop_kills_descendant_processes() {
    if !tmux_available() {
        eprintln!("skipping: tmux not available");
        return;
    }

    let host_dir = tempfile::tempdir().unwrap();
    let work_dir = tempfile::tempdir().unwrap();
    let host = local_host(host_dir.path());
    let engine = Engine::new(host.clone());

    let name = unique_name("tree");
    // A shell wrapper so the real process hangs below the pane shell.
    let outcome = engine
        .create_agent(&options(&name, "sh -c 'sleep 997'", work_dir.path()))
        .await
        .unwrap();

    let session = host.session_name_for(&AgentName::new(name));
    // Give the typed command a beat to start.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let pids = host.collect_session_pids(&session).await.unwrap();
    assert!(!pids.is_empty());

    host.stop_agents(
        std::slice::from_ref(&outcome.agent_id),
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    // Every pre-stop PID is gone.
    for pid in pids {
        let alive = host
            .execute_command(&format!("kill -0 {} 2>/dev/null", pid))
            .await
            .unwrap();
        assert!(!alive.success, "pid {} survived stop", pid);
    }
    assert!(!host.session_exists(&session).await.unwrap());

    host.destroy_agent(&outcome.agent_id).await.unwrap();
}
