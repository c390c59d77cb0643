// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent state creation and provisioning orchestration.

use crate::agent::Agent;
use crate::host::Host;
use crate::{AgentError, HostError, PROVISION_COMMAND_TIMEOUT};
use chrono::Utc;
use indexmap::IndexMap;
use roost_connector::{sh_quote_path, ExecOptions};
use roost_core::{
    format_env_file, parse_env_file, ActivitySource, AgentId, AgentName, AgentRecord,
    CreateAgentOptions, FileTransferSpec, ENV_PREFIX,
};
use std::path::Path;
use std::sync::Arc;

impl Host {
    /// Create the agent state directory, write data.json, and return the
    /// agent. The record's command is assembled by the agent type unless
    /// overridden.
    pub async fn create_agent_state(
        self: &Arc<Self>,
        work_dir: &Path,
        options: &CreateAgentOptions,
        agent_id: AgentId,
    ) -> Result<Agent, AgentError> {
        let agent_name = options
            .name
            .clone()
            .unwrap_or_else(|| AgentName::new(format!("agent-{}", &agent_id.hex_suffix()[..8])));
        tracing::debug!(
            agent_id = %agent_id,
            agent_name = %agent_name,
            agent_type = %options.agent_type,
            "creating agent state"
        );

        let agent_type = self
            .registry()
            .lookup(&options.agent_type)
            .ok_or_else(|| AgentError::UnknownAgentType(options.agent_type.clone()))?;

        let state_dir = self.paths().agent_state_dir(&agent_id);
        self.mkdirs(&[
            state_dir.clone(),
            state_dir.join("activity"),
            state_dir.join("status"),
        ])
        .await?;

        let command = match &options.command {
            Some(command) => command.clone(),
            None => agent_type.assemble_command(&options.agent_args),
        };

        let record = AgentRecord {
            id: agent_id.clone(),
            name: agent_name,
            agent_type: options.agent_type.clone(),
            work_dir: work_dir.to_path_buf(),
            create_time: Utc::now(),
            command,
            additional_commands: options.additional_commands.clone(),
            initial_message: options.initial_message.clone(),
            resume_message: options.resume_message.clone(),
            message_delay_seconds: options.message_delay_seconds,
            enter_delay_seconds: None,
            permissions: options.permissions.clone(),
            start_on_boot: options.is_start_on_boot,
            plugin: IndexMap::new(),
        };
        self.write_agent_record(&record).await?;

        self.record_agent_activity(&agent_id, ActivitySource::Create).await?;

        Ok(self.agent(agent_id))
    }

    /// Compose environment for an agent's commands.
    ///
    /// Layering, later wins: core-injected variables, programmatic
    /// defaults, each env_file in order, explicit env_vars last. Env files
    /// are client-side paths.
    pub async fn collect_agent_env_vars(
        &self,
        agent_id: &AgentId,
        work_dir: &Path,
        options: &CreateAgentOptions,
    ) -> Result<IndexMap<String, String>, HostError> {
        let mut env: IndexMap<String, String> = IndexMap::new();

        let state_dir = self.paths().agent_state_dir(agent_id);
        let agent_name = match self.read_agent_record(agent_id).await {
            Ok(record) => record.name.to_string(),
            Err(_) => options
                .name
                .clone()
                .map(|n| n.to_string())
                .unwrap_or_default(),
        };
        env.insert(
            format!("{}_HOST_DIR", ENV_PREFIX),
            self.paths().host_dir().display().to_string(),
        );
        env.insert(format!("{}_AGENT_ID", ENV_PREFIX), agent_id.to_string());
        env.insert(format!("{}_AGENT_NAME", ENV_PREFIX), agent_name);
        env.insert(
            format!("{}_AGENT_STATE_DIR", ENV_PREFIX),
            state_dir.display().to_string(),
        );
        env.insert(
            format!("{}_AGENT_WORK_DIR", ENV_PREFIX),
            work_dir.display().to_string(),
        );

        env.insert(
            "GIT_BASE_BRANCH".to_string(),
            options
                .git
                .as_ref()
                .and_then(|g| g.base_branch.clone())
                .unwrap_or_default(),
        );

        for env_file in &options.environment.env_files {
            let content = tokio::fs::read_to_string(env_file)
                .await
                .map_err(roost_connector::ConnectorError::from)?;
            for (key, value) in parse_env_file(&content) {
                env.insert(key, value);
            }
        }

        for var in &options.environment.env_vars {
            env.insert(var.key.clone(), var.value.clone());
        }

        Ok(env)
    }

    pub async fn write_agent_env_file(
        &self,
        agent_id: &AgentId,
        env: &IndexMap<String, String>,
    ) -> Result<(), HostError> {
        if env.is_empty() {
            return Ok(());
        }
        let path = self.paths().agent_env(agent_id);
        self.write_text_file(&path, &format_env_file(env)).await?;
        tracing::debug!(count = env.len(), path = %path.display(), "wrote agent env file");
        Ok(())
    }

    /// A shell prefix that sources host then agent env files.
    pub fn source_env_prefix(&self, agent_id: &AgentId) -> String {
        let host_env = self.paths().host_env();
        let agent_env = self.paths().agent_env(agent_id);
        format!(
            "set -a && [ -f {h} ] && . {h} || true && [ -f {a} ] && . {a} || true && set +a && ",
            h = sh_quote_path(&host_env),
            a = sh_quote_path(&agent_env),
        )
    }

    /// Provision an agent, in strict order:
    ///
    /// 1. agent.on_before_provisioning (validation only)
    /// 2. collect file transfers declared by the agent type
    /// 3. validate required transfers, write them
    /// 4. agent.provision (agent-type-specific)
    /// 5. create_directories
    /// 6. upload_files
    /// 7. append_to_files
    /// 8. prepend_to_files
    /// 9. write the agent env file
    /// 10. sudo_commands (env sourced)
    /// 11. user_commands (env sourced, cwd = work dir)
    /// 12. agent.on_after_provisioning
    ///
    /// The first failure aborts the remaining steps; partial state is
    /// preserved for debugging.
    pub async fn provision_agent(
        self: &Arc<Self>,
        agent: &Agent,
        options: &CreateAgentOptions,
    ) -> Result<(), AgentError> {
        let agent_type = agent.agent_type().await?;
        let record = agent.record().await?;

        tracing::debug!(agent = %record.name, "on_before_provisioning");
        agent_type.on_before_provisioning(self, agent, options).await?;

        let transfers = agent_type.provision_file_transfers(options);
        self.execute_agent_file_transfers(&record.work_dir, &transfers).await?;

        tracing::debug!(agent = %record.name, "provision");
        agent_type.provision(self, agent, options).await?;

        let provisioning = &options.provisioning;
        tracing::debug!(
            agent = %record.name,
            dirs = provisioning.create_directories.len(),
            uploads = provisioning.upload_files.len(),
            appends = provisioning.append_to_files.len(),
            prepends = provisioning.prepend_to_files.len(),
            sudo_cmds = provisioning.sudo_commands.len(),
            user_cmds = provisioning.user_commands.len(),
            "applying user provisioning"
        );

        for dir in &provisioning.create_directories {
            self.mkdir(dir).await?;
        }

        for upload in &provisioning.upload_files {
            tracing::trace!(from = %upload.local_path.display(), to = %upload.remote_path.display(), "uploading file");
            let content = tokio::fs::read(&upload.local_path)
                .await
                .map_err(roost_connector::ConnectorError::from)
                .map_err(HostError::from)?;
            self.write_file(&upload.remote_path, &content).await?;
        }

        for append in &provisioning.append_to_files {
            self.append_to_file(&append.remote_path, &append.text).await?;
        }

        for prepend in &provisioning.prepend_to_files {
            self.prepend_to_file(&prepend.remote_path, &prepend.text).await?;
        }

        let env = self
            .collect_agent_env_vars(agent.id(), &record.work_dir, options)
            .await?;
        self.write_agent_env_file(agent.id(), &env).await?;

        let source_prefix = self.source_env_prefix(agent.id());

        for cmd in &provisioning.sudo_commands {
            tracing::trace!(%cmd, "running sudo command");
            let full = format!("{}{}", source_prefix, cmd);
            let opts = ExecOptions {
                timeout: PROVISION_COMMAND_TIMEOUT,
                as_root: true,
                ..ExecOptions::default()
            };
            let result = self.execute_command_with(&full, opts).await?;
            if !result.success {
                return Err(HostError::Command(format!(
                    "sudo command failed: {}\nstderr: {}",
                    cmd,
                    result.output_for_error().trim()
                ))
                .into());
            }
        }

        for cmd in &provisioning.user_commands {
            tracing::trace!(%cmd, "running user command");
            let full = format!("{}{}", source_prefix, cmd);
            let opts = ExecOptions {
                timeout: PROVISION_COMMAND_TIMEOUT,
                cwd: Some(record.work_dir.clone()),
                ..ExecOptions::default()
            };
            let result = self.execute_command_with(&full, opts).await?;
            if !result.success {
                return Err(HostError::Command(format!(
                    "user command failed: {}\nstderr: {}",
                    cmd,
                    result.output_for_error().trim()
                ))
                .into());
            }
        }

        tracing::debug!(agent = %record.name, "on_after_provisioning");
        agent_type.on_after_provisioning(self, agent, options).await?;

        Ok(())
    }

    /// Validate required transfers exist, then write them. Relative agent
    /// paths resolve against the work dir; optional missing files skip.
    async fn execute_agent_file_transfers(
        &self,
        work_dir: &Path,
        transfers: &[FileTransferSpec],
    ) -> Result<(), HostError> {
        if transfers.is_empty() {
            return Ok(());
        }

        let mut missing_required = Vec::new();
        for transfer in transfers {
            if transfer.is_required && !transfer.local_path.exists() {
                missing_required.push(transfer.local_path.display().to_string());
            }
        }
        if !missing_required.is_empty() {
            return Err(HostError::Command(format!(
                "required files for provisioning not found: {}",
                missing_required.join(", ")
            )));
        }

        for transfer in transfers {
            if !transfer.local_path.exists() {
                tracing::trace!(path = %transfer.local_path.display(), "skipping optional file transfer");
                continue;
            }
            let remote_path = if transfer.agent_path.is_absolute() {
                transfer.agent_path.clone()
            } else {
                work_dir.join(&transfer.agent_path)
            };
            tracing::trace!(from = %transfer.local_path.display(), to = %remote_path.display(), "agent file transfer");
            let content = tokio::fs::read(&transfer.local_path)
                .await
                .map_err(roost_connector::ConnectorError::from)?;
            self.write_file(&remote_path, &content).await?;
        }
        Ok(())
    }

    /// Destroy an agent: tear down the session and process tree, remove the
    /// state directory, and reclaim the work dir when the control plane
    /// materialized it. User-authored directories are never removed.
    ///
    /// Persisted out-of-band agent data lives in the provider's store; the
    /// engine removes it alongside this call.
    pub async fn destroy_agent(&self, agent_id: &AgentId) -> Result<(), HostError> {
        tracing::debug!(agent_id = %agent_id, "destroying agent");
        let work_dir = self
            .read_agent_record(agent_id)
            .await
            .ok()
            .map(|record| record.work_dir);

        self.stop_agents(std::slice::from_ref(agent_id), crate::DEFAULT_STOP_TIMEOUT)
            .await?;
        self.remove_directory(&self.paths().agent_state_dir(agent_id)).await?;

        if let Some(work_dir) = work_dir {
            self.remove_work_dir_if_generated(&work_dir).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "provision_tests.rs"]
mod tests;
