// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Agent object and the agent-type seam.
//!
//! An agent is a single managed invocation of an external process inside a
//! tmux session on a host. Its state directory is authoritative: the
//! data.json record, activity files, and sentinels live there. Agent types
//! (a closed registry) decide command assembly, provisioning hooks,
//! readiness, and which message-injection protocol applies.

mod lifecycle;
mod message;
mod types;

pub use types::{GenericAgentType, TuiAgentType};

use crate::host::Host;
use crate::{AgentError, HostError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roost_core::{
    ActivitySource, AgentId, AgentName, AgentRecord, CreateAgentOptions, FileTransferSpec,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Behavior that varies per agent type. Defaults are provided for every
/// hook; interactive TUIs override the message-injection surface.
#[async_trait]
pub trait AgentType: Send + Sync {
    fn name(&self) -> &str;

    /// Build the primary command from ordered agent args.
    fn assemble_command(&self, agent_args: &[String]) -> String;

    /// Process basename expected in the pane for lifecycle classification.
    fn expected_process_name(&self, command: &str) -> String {
        command_basename(command)
    }

    /// Marker-based message injection, for TUIs that echo input and
    /// distinguish newline from submit.
    fn uses_marker_injection(&self) -> bool {
        false
    }

    /// A string whose presence in the pane means the TUI is ready for
    /// input.
    fn tui_ready_indicator(&self) -> Option<String> {
        None
    }

    /// Delay between typed text and Enter. A small constant agent types
    /// tune; not a global invariant.
    fn enter_delay(&self) -> Duration {
        Duration::from_millis(500)
    }

    /// Validation before any provisioning side effect.
    async fn on_before_provisioning(
        &self,
        _host: &Arc<Host>,
        _agent: &Agent,
        _options: &CreateAgentOptions,
    ) -> Result<(), HostError> {
        Ok(())
    }

    /// File transfers this agent type needs before provisioning.
    fn provision_file_transfers(&self, _options: &CreateAgentOptions) -> Vec<FileTransferSpec> {
        Vec::new()
    }

    /// Agent-type-specific provisioning.
    async fn provision(
        &self,
        _host: &Arc<Host>,
        _agent: &Agent,
        _options: &CreateAgentOptions,
    ) -> Result<(), HostError> {
        Ok(())
    }

    async fn on_after_provisioning(
        &self,
        _host: &Arc<Host>,
        _agent: &Agent,
        _options: &CreateAgentOptions,
    ) -> Result<(), HostError> {
        Ok(())
    }

    /// Block until the agent is ready to receive messages. The default is
    /// a no-op; TUI types poll for their startup sentinel.
    async fn wait_for_ready_signal(
        &self,
        _agent: &Agent,
        _timeout: Duration,
    ) -> Result<(), AgentError> {
        Ok(())
    }
}

/// Basename of a command's first word (`/usr/bin/sleep 10` -> `sleep`).
pub fn command_basename(command: &str) -> String {
    command
        .split_whitespace()
        .next()
        .unwrap_or("")
        .rsplit('/')
        .next()
        .unwrap_or("")
        .to_string()
}

/// Closed registry from type name to implementation. Registration happens
/// at program start; lookup is a map read.
#[derive(Default)]
pub struct AgentTypeRegistry {
    types: HashMap<String, Arc<dyn AgentType>>,
}

impl AgentTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in types: "generic" and "tui".
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GenericAgentType::default()));
        registry.register(Arc::new(TuiAgentType::named("tui")));
        registry
    }

    pub fn register(&mut self, agent_type: Arc<dyn AgentType>) {
        self.types.insert(agent_type.name().to_string(), agent_type);
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn AgentType>> {
        self.types.get(name).cloned()
    }

    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.keys().cloned().collect();
        names.sort();
        names
    }
}

/// A typed object over an agent state directory.
#[derive(Clone)]
pub struct Agent {
    host: Arc<Host>,
    id: AgentId,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("host_id", self.host.id())
            .field("id", &self.id)
            .finish()
    }
}

impl Agent {
    pub fn new(host: Arc<Host>, id: AgentId) -> Self {
        Self { host, id }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn host(&self) -> &Arc<Host> {
        &self.host
    }

    pub fn state_dir(&self) -> PathBuf {
        self.host.paths().agent_state_dir(&self.id)
    }

    pub async fn record(&self) -> Result<AgentRecord, HostError> {
        self.host.read_agent_record(&self.id).await
    }

    pub async fn write_record(&self, record: &AgentRecord) -> Result<(), HostError> {
        self.host.write_agent_record(record).await
    }

    pub async fn name(&self) -> Result<AgentName, HostError> {
        Ok(self.record().await?.name)
    }

    pub async fn session_name(&self) -> Result<String, HostError> {
        Ok(self.host.session_name_for(&self.record().await?.name))
    }

    pub async fn agent_type(&self) -> Result<Arc<dyn AgentType>, AgentError> {
        let record = self.record().await?;
        self.host
            .registry()
            .lookup(&record.agent_type)
            .ok_or(AgentError::UnknownAgentType(record.agent_type))
    }

    // =========================================================================
    // Activity
    // =========================================================================

    pub async fn record_activity(&self, source: ActivitySource) -> Result<(), HostError> {
        self.host.record_agent_activity(&self.id, source).await
    }

    pub async fn activity_time(
        &self,
        source: ActivitySource,
    ) -> Result<Option<DateTime<Utc>>, HostError> {
        let path = self.host.paths().agent_activity(&self.id, source);
        self.host.file_mtime(&path).await
    }

    /// Advisory JSON body of an activity file.
    pub async fn activity_record(
        &self,
        source: ActivitySource,
    ) -> Result<Option<String>, HostError> {
        let path = self.host.paths().agent_activity(&self.id, source);
        self.host.read_text_file_opt(&path).await
    }

    pub async fn runtime_seconds(&self) -> Result<Option<f64>, HostError> {
        let record = self.record().await?;
        Ok(Some(
            ((Utc::now() - record.create_time).num_milliseconds() as f64 / 1000.0).max(0.0),
        ))
    }

    // =========================================================================
    // Reported status (agent-written; the control plane only reads it)
    // =========================================================================

    pub async fn reported_url(&self) -> Result<Option<String>, HostError> {
        let path = self.host.paths().agent_status(&self.id, "url");
        Ok(self
            .host
            .read_text_file_opt(&path)
            .await?
            .map(|s| s.trim().to_string()))
    }

    pub async fn reported_start_time(&self) -> Result<Option<String>, HostError> {
        let path = self.host.paths().agent_status(&self.id, "start_time");
        Ok(self
            .host
            .read_text_file_opt(&path)
            .await?
            .map(|s| s.trim().to_string()))
    }

    pub async fn reported_status_markdown(&self) -> Result<Option<String>, HostError> {
        let path = self.host.paths().agent_status(&self.id, "status.md");
        self.host.read_text_file_opt(&path).await
    }

    // =========================================================================
    // Agent env vars
    // =========================================================================

    pub async fn env_vars(&self) -> Result<indexmap::IndexMap<String, String>, HostError> {
        let path = self.host.paths().agent_env(&self.id);
        let content = self.host.read_text_file_opt(&path).await?.unwrap_or_default();
        Ok(roost_core::parse_env_file(&content))
    }

    pub async fn set_env_var(&self, key: &str, value: &str) -> Result<(), HostError> {
        let mut env = self.env_vars().await?;
        env.insert(key.to_string(), value.to_string());
        let path = self.host.paths().agent_env(&self.id);
        self.host
            .write_text_file(&path, &roost_core::format_env_file(&env))
            .await
    }

    // =========================================================================
    // Plugin files (reported)
    // =========================================================================

    pub async fn reported_plugin_file(
        &self,
        plugin: &str,
        file: &str,
    ) -> Result<Option<String>, HostError> {
        let path = self.host.paths().agent_plugin_file(&self.id, plugin, file);
        self.host.read_text_file_opt(&path).await
    }

    pub async fn set_reported_plugin_file(
        &self,
        plugin: &str,
        file: &str,
        content: &str,
    ) -> Result<(), HostError> {
        let path = self.host.paths().agent_plugin_file(&self.id, plugin, file);
        self.host.write_text_file(&path, content).await
    }

    pub async fn list_reported_plugin_files(&self, plugin: &str) -> Result<Vec<String>, HostError> {
        let dir = self
            .host
            .paths()
            .agent_state_dir(&self.id)
            .join("plugin")
            .join(plugin);
        self.host.list_directory(&dir).await
    }

    // =========================================================================
    // Sentinels
    // =========================================================================

    /// Does the waiting sentinel exist (agent awaiting input)?
    pub async fn has_waiting_sentinel(&self) -> Result<bool, HostError> {
        let path = self.host.paths().agent_waiting(&self.id);
        self.host.path_exists(&path).await
    }

    /// Does the session_started sentinel exist (startup hook ran)?
    pub async fn has_session_started_sentinel(&self) -> Result<bool, HostError> {
        let path = self.host.paths().agent_session_started(&self.id);
        self.host.path_exists(&path).await
    }

    /// Fast liveness probe via the agent.pid file, when one exists.
    pub async fn is_running(&self) -> Result<bool, HostError> {
        let pid_path = self.state_dir().join("agent.pid");
        let Some(content) = self.host.read_text_file_opt(&pid_path).await? else {
            return Ok(false);
        };
        let Ok(pid) = content.trim().parse::<u32>() else {
            return Ok(false);
        };
        let result = self
            .host
            .execute_command(&format!("kill -0 {} 2>/dev/null", pid))
            .await?;
        Ok(result.success)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
