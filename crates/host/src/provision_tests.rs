// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::agent::AgentTypeRegistry;
use roost_connector::{CommandResult, FakeConnector};
use roost_core::{EnvVar, HostId, HostName, NamedCommand, TextEditSpec};
use std::path::PathBuf;

fn fake_host(fake: &FakeConnector) -> Arc<Host> {
    Arc::new(Host::new(
        HostId::generate(),
        HostName::new("worker"),
        "docker",
        "roost-",
        "/hostdir",
        Arc::new(fake.clone()),
        Arc::new(AgentTypeRegistry::with_builtins()),
    ))
}

fn base_options(name: &str) -> CreateAgentOptions {
    let mut opts = CreateAgentOptions::new("generic");
    opts.name = Some(AgentName::new(name));
    opts
}

#[tokio::test]
async fn create_agent_state_writes_record_and_activity() {
    let fake = FakeConnector::new();
    let host = fake_host(&fake);
    let mut opts = base_options("demo");
    opts.command = Some("sleep 999".into());
    opts.additional_commands = vec![NamedCommand::new("htop")];
    opts.initial_message = Some("hello".into());

    let agent_id = AgentId::generate();
    let agent = host
        .create_agent_state(Path::new("/work/demo"), &opts, agent_id.clone())
        .await
        .unwrap();
    assert_eq!(agent.id(), &agent_id);

    let record = agent.record().await.unwrap();
    assert_eq!(record.name, "demo");
    assert_eq!(record.command, "sleep 999");
    assert_eq!(record.work_dir, PathBuf::from("/work/demo"));
    assert_eq!(record.initial_message.as_deref(), Some("hello"));

    let create_activity = host.paths().agent_activity(&agent_id, ActivitySource::Create);
    assert!(fake.file(&create_activity).is_some());
}

#[tokio::test]
async fn create_agent_state_assembles_command_from_args() {
    let fake = FakeConnector::new();
    let host = fake_host(&fake);
    let mut opts = base_options("demo");
    opts.agent_args = vec!["python".into(), "serve.py".into()];

    let agent = host
        .create_agent_state(Path::new("/w"), &opts, AgentId::generate())
        .await
        .unwrap();
    assert_eq!(agent.record().await.unwrap().command, "python serve.py");
}

#[tokio::test]
async fn create_agent_state_unknown_type_is_rejected() {
    let fake = FakeConnector::new();
    let host = fake_host(&fake);
    let opts = CreateAgentOptions::new("does-not-exist");

    let err = host
        .create_agent_state(Path::new("/w"), &opts, AgentId::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::UnknownAgentType(_)));
}

#[tokio::test]
async fn default_agent_name_derives_from_id() {
    let fake = FakeConnector::new();
    let host = fake_host(&fake);
    let opts = CreateAgentOptions::new("generic");

    let agent = host
        .create_agent_state(Path::new("/w"), &opts, AgentId::generate())
        .await
        .unwrap();
    let record = agent.record().await.unwrap();
    assert!(record.name.as_str().starts_with("agent-"));
    assert_eq!(record.name.as_str().len(), "agent-".len() + 8);
}

#[tokio::test]
async fn env_layering_explicit_vars_win() {
    let dir = tempfile::tempdir().unwrap();
    let file_a = dir.path().join("a.env");
    let file_b = dir.path().join("b.env");
    tokio::fs::write(&file_a, "SHARED=from_a\nONLY_A=1\n").await.unwrap();
    tokio::fs::write(&file_b, "SHARED=from_b\nEXPLICIT=file\n").await.unwrap();

    let fake = FakeConnector::new();
    let host = fake_host(&fake);
    let mut opts = base_options("demo");
    opts.environment.env_files = vec![file_a, file_b];
    opts.environment.env_vars = vec![EnvVar::new("EXPLICIT", "cli")];

    let agent_id = AgentId::generate();
    host.create_agent_state(Path::new("/work/demo"), &opts, agent_id.clone())
        .await
        .unwrap();
    let env = host
        .collect_agent_env_vars(&agent_id, Path::new("/work/demo"), &opts)
        .await
        .unwrap();

    // A later env_file shadows an earlier one; explicit vars shadow files.
    assert_eq!(env.get("SHARED").map(String::as_str), Some("from_b"));
    assert_eq!(env.get("EXPLICIT").map(String::as_str), Some("cli"));
    assert_eq!(env.get("ONLY_A").map(String::as_str), Some("1"));

    // Core-injected variables are present.
    assert_eq!(
        env.get("ROOST_AGENT_ID").map(String::as_str),
        Some(agent_id.as_str())
    );
    assert_eq!(env.get("ROOST_AGENT_NAME").map(String::as_str), Some("demo"));
    assert_eq!(
        env.get("ROOST_AGENT_WORK_DIR").map(String::as_str),
        Some("/work/demo")
    );
    assert!(env.contains_key("ROOST_HOST_DIR"));
    assert!(env.contains_key("ROOST_AGENT_STATE_DIR"));
    assert!(env.contains_key("GIT_BASE_BRANCH"));
}

#[tokio::test]
async fn provision_steps_run_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let upload_src = dir.path().join("config.toml");
    tokio::fs::write(&upload_src, b"key = 1\n").await.unwrap();

    let fake = FakeConnector::new();
    let host = fake_host(&fake);
    let mut opts = base_options("demo");
    opts.provisioning.create_directories = vec!["/etc/app".into()];
    opts.provisioning.upload_files = vec![roost_core::UploadSpec {
        local_path: upload_src,
        remote_path: "/etc/app/config.toml".into(),
    }];
    opts.provisioning.append_to_files = vec![TextEditSpec {
        remote_path: "/etc/app/notes".into(),
        text: "appended\n".into(),
    }];
    opts.provisioning.sudo_commands = vec!["apt-get install -y jq".into()];
    opts.provisioning.user_commands = vec!["make setup".into()];

    let agent = host
        .create_agent_state(Path::new("/work/demo"), &opts, AgentId::generate())
        .await
        .unwrap();
    host.provision_agent(&agent, &opts).await.unwrap();

    let commands = fake.commands();
    let mkdir = commands.iter().position(|c| c.contains("mkdir -p /etc/app")).unwrap();
    let sudo = commands
        .iter()
        .position(|c| c.contains("apt-get install -y jq"))
        .unwrap();
    let user = commands.iter().position(|c| c.contains("make setup")).unwrap();
    assert!(mkdir < sudo);
    assert!(sudo < user, "sudo commands run before user commands");

    // Both command kinds source the env files first.
    assert!(commands[sudo].starts_with("set -a"));
    assert!(commands[user].starts_with("set -a"));

    // Upload and append landed as files.
    assert!(fake.file(Path::new("/etc/app/config.toml")).is_some());
    assert_eq!(
        fake.file(Path::new("/etc/app/notes")).unwrap(),
        b"appended\n"
    );

    // The agent env file was written.
    assert!(fake.file(&host.paths().agent_env(agent.id())).is_some());
}

#[tokio::test]
async fn provision_aborts_on_first_failure() {
    let fake = FakeConnector::new();
    fake.respond("failing-step", CommandResult::failed("boom", 1));
    let host = fake_host(&fake);
    let mut opts = base_options("demo");
    opts.provisioning.sudo_commands = vec!["failing-step".into()];
    opts.provisioning.user_commands = vec!["never-runs".into()];

    let agent = host
        .create_agent_state(Path::new("/w"), &opts, AgentId::generate())
        .await
        .unwrap();
    let err = host.provision_agent(&agent, &opts).await.unwrap_err();
    assert!(err.to_string().contains("sudo command failed"));
    assert!(!fake.commands().iter().any(|c| c.contains("never-runs")));

    // Partial state is preserved: the record is still there.
    assert!(agent.record().await.is_ok());
}

#[tokio::test]
async fn required_file_transfer_missing_fails_before_any_write() {
    use crate::agent::AgentType;
    use roost_core::FileTransferSpec;

    struct NeedyType;
    #[async_trait::async_trait]
    impl AgentType for NeedyType {
        fn name(&self) -> &str {
            "needy"
        }
        fn assemble_command(&self, _args: &[String]) -> String {
            "needy".into()
        }
        fn provision_file_transfers(&self, _options: &CreateAgentOptions) -> Vec<FileTransferSpec> {
            vec![FileTransferSpec {
                local_path: "/definitely/missing/file".into(),
                agent_path: "creds".into(),
                is_required: true,
            }]
        }
    }

    let fake = FakeConnector::new();
    let mut registry = AgentTypeRegistry::with_builtins();
    registry.register(Arc::new(NeedyType));
    let host = Arc::new(Host::new(
        HostId::generate(),
        HostName::new("worker"),
        "docker",
        "roost-",
        "/hostdir",
        Arc::new(fake.clone()),
        Arc::new(registry),
    ));

    let opts = CreateAgentOptions::new("needy");
    let agent = host
        .create_agent_state(Path::new("/w"), &opts, AgentId::generate())
        .await
        .unwrap();
    let err = host.provision_agent(&agent, &opts).await.unwrap_err();
    assert!(err.to_string().contains("required files"));
}

#[tokio::test]
async fn destroy_agent_removes_state_and_generated_work_dir() {
    let fake = FakeConnector::new();
    let host = fake_host(&fake);
    let mut opts = base_options("demo");
    opts.target_path = Some("/work/demo".into());
    opts.data_options.is_rsync_enabled = false;
    opts.git = Some(roost_core::AgentGitOptions {
        is_git_synced: false,
        ..roost_core::AgentGitOptions::default()
    });

    let agent_id = AgentId::generate();
    let work_dir = host
        .create_agent_work_dir(&host, Path::new("/src"), &opts, &agent_id)
        .await
        .unwrap();
    host.create_agent_state(&work_dir, &opts, agent_id.clone())
        .await
        .unwrap();
    assert!(host.is_generated_work_dir(&work_dir).await.unwrap());

    host.destroy_agent(&agent_id).await.unwrap();
    let commands = fake.commands();
    let state_dir = host.paths().agent_state_dir(&agent_id);
    assert!(commands
        .iter()
        .any(|c| c.contains(&format!("rm -rf {}", state_dir.display()))));
    assert!(commands.iter().any(|c| c.contains("rm -rf /work/demo")));
    assert!(!host.is_generated_work_dir(&work_dir).await.unwrap());
}

#[tokio::test]
async fn destroy_agent_leaves_user_authored_work_dir() {
    let fake = FakeConnector::new();
    let host = fake_host(&fake);
    let mut opts = base_options("demo");
    opts.git = None; // in-place

    let agent_id = AgentId::generate();
    let work_dir = host
        .create_agent_work_dir(&host, Path::new("/src/mine"), &opts, &agent_id)
        .await
        .unwrap();
    host.create_agent_state(&work_dir, &opts, agent_id.clone())
        .await
        .unwrap();

    host.destroy_agent(&agent_id).await.unwrap();
    assert!(!fake.commands().iter().any(|c| c.contains("rm -rf /src/mine")));
}
