// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Host object: file/exec primitives, activity recording, certified
//! data access, and the env-var surface.

use crate::agent::{Agent, AgentTypeRegistry};
use crate::paths::HostPaths;
use crate::{HostError, PROBE_TIMEOUT};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use roost_connector::{sh_quote_path, CommandResult, Connector, ConnectorError, ExecOptions};
use roost_core::{
    format_env_file, parse_env_file, ActivitySource, AgentId, CertifiedHostData, HostId, HostName,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Receives certified-data updates so the provider can write them through
/// to the host record in the state store.
#[async_trait]
pub trait CertifiedDataObserver: Send + Sync {
    async fn certified_data_updated(&self, host_id: &HostId, data: &CertifiedHostData);
}

/// A compute environment addressable through a connector.
pub struct Host {
    id: HostId,
    name: HostName,
    provider_name: String,
    session_prefix: String,
    paths: HostPaths,
    connector: Arc<dyn Connector>,
    registry: Arc<AgentTypeRegistry>,
    observer: Option<Arc<dyn CertifiedDataObserver>>,
}

impl Host {
    pub fn new(
        id: HostId,
        name: HostName,
        provider_name: impl Into<String>,
        session_prefix: impl Into<String>,
        host_dir: impl Into<PathBuf>,
        connector: Arc<dyn Connector>,
        registry: Arc<AgentTypeRegistry>,
    ) -> Self {
        Self {
            id,
            name,
            provider_name: provider_name.into(),
            session_prefix: session_prefix.into(),
            paths: HostPaths::new(host_dir),
            connector,
            registry,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn CertifiedDataObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn id(&self) -> &HostId {
        &self.id
    }

    pub fn name(&self) -> &HostName {
        &self.name
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn session_prefix(&self) -> &str {
        &self.session_prefix
    }

    pub fn paths(&self) -> &HostPaths {
        &self.paths
    }

    pub fn connector(&self) -> &Arc<dyn Connector> {
        &self.connector
    }

    pub fn registry(&self) -> &Arc<AgentTypeRegistry> {
        &self.registry
    }

    pub fn is_local(&self) -> bool {
        self.connector.is_local()
    }

    pub async fn disconnect(&self) {
        self.connector.disconnect().await;
    }

    // =========================================================================
    // Exec
    // =========================================================================

    pub async fn execute_command(&self, cmd: &str) -> Result<CommandResult, HostError> {
        Ok(self
            .connector
            .run_shell_command(cmd, ExecOptions::default())
            .await?)
    }

    pub async fn execute_command_with(
        &self,
        cmd: &str,
        opts: ExecOptions,
    ) -> Result<CommandResult, HostError> {
        Ok(self.connector.run_shell_command(cmd, opts).await?)
    }

    pub async fn execute_command_in(
        &self,
        cmd: &str,
        cwd: &Path,
    ) -> Result<CommandResult, HostError> {
        self.execute_command_with(cmd, ExecOptions::in_dir(cwd)).await
    }

    pub async fn execute_sudo_command(&self, cmd: &str) -> Result<CommandResult, HostError> {
        let opts = ExecOptions {
            as_root: true,
            ..ExecOptions::default()
        };
        self.execute_command_with(cmd, opts).await
    }

    // =========================================================================
    // Files
    // =========================================================================

    pub async fn read_file(&self, path: &Path) -> Result<Vec<u8>, HostError> {
        Ok(self.connector.get_file(path).await?)
    }

    pub async fn read_text_file(&self, path: &Path) -> Result<String, HostError> {
        let bytes = self.read_file(path).await?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    /// Like [`Self::read_text_file`] but missing files are `None`.
    pub async fn read_text_file_opt(&self, path: &Path) -> Result<Option<String>, HostError> {
        match self.connector.get_file(path).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).to_string())),
            Err(ConnectorError::FileNotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn write_file(&self, path: &Path, content: &[u8]) -> Result<(), HostError> {
        Ok(self.connector.put_file(content, path).await?)
    }

    pub async fn write_text_file(&self, path: &Path, content: &str) -> Result<(), HostError> {
        self.write_file(path, content.as_bytes()).await
    }

    /// Write a file and set its mode (octal string, e.g. "755").
    pub async fn write_text_file_with_mode(
        &self,
        path: &Path,
        content: &str,
        mode: &str,
    ) -> Result<(), HostError> {
        self.write_text_file(path, content).await?;
        let result = self
            .execute_command(&format!("chmod {} {}", mode, sh_quote_path(path)))
            .await?;
        if !result.success {
            return Err(HostError::Command(format!(
                "chmod {} failed: {}",
                path.display(),
                result.output_for_error().trim()
            )));
        }
        Ok(())
    }

    /// Append text, treating a missing file as empty.
    pub async fn append_to_file(&self, path: &Path, text: &str) -> Result<(), HostError> {
        let existing = self.read_text_file_opt(path).await?.unwrap_or_default();
        self.write_text_file(path, &format!("{}{}", existing, text)).await
    }

    /// Prepend text, treating a missing file as empty.
    pub async fn prepend_to_file(&self, path: &Path, text: &str) -> Result<(), HostError> {
        let existing = self.read_text_file_opt(path).await?.unwrap_or_default();
        self.write_text_file(path, &format!("{}{}", text, existing)).await
    }

    pub async fn path_exists(&self, path: &Path) -> Result<bool, HostError> {
        if self.is_local() {
            return Ok(tokio::fs::try_exists(path).await.unwrap_or(false));
        }
        let result = self
            .execute_command_with(
                &format!("test -e {}", sh_quote_path(path)),
                ExecOptions::with_timeout(PROBE_TIMEOUT),
            )
            .await?;
        Ok(result.success)
    }

    pub async fn is_directory(&self, path: &Path) -> Result<bool, HostError> {
        if self.is_local() {
            return Ok(tokio::fs::metadata(path)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false));
        }
        let result = self
            .execute_command_with(
                &format!("test -d {}", sh_quote_path(path)),
                ExecOptions::with_timeout(PROBE_TIMEOUT),
            )
            .await?;
        Ok(result.success)
    }

    pub async fn mkdir(&self, path: &Path) -> Result<(), HostError> {
        let result = self
            .execute_command(&format!("mkdir -p {}", sh_quote_path(path)))
            .await?;
        if !result.success {
            return Err(HostError::Command(format!(
                "mkdir {} failed: {}",
                path.display(),
                result.output_for_error().trim()
            )));
        }
        Ok(())
    }

    pub async fn mkdirs(&self, paths: &[PathBuf]) -> Result<(), HostError> {
        for path in paths {
            self.mkdir(path).await?;
        }
        Ok(())
    }

    pub async fn remove_directory(&self, path: &Path) -> Result<(), HostError> {
        let result = self
            .execute_command(&format!("rm -rf {}", sh_quote_path(path)))
            .await?;
        if !result.success {
            return Err(HostError::Command(format!(
                "rm -rf {} failed: {}",
                path.display(),
                result.output_for_error().trim()
            )));
        }
        Ok(())
    }

    pub async fn list_directory(&self, path: &Path) -> Result<Vec<String>, HostError> {
        if self.is_local() {
            let mut names = Vec::new();
            let mut entries = match tokio::fs::read_dir(path).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(ConnectorError::from(e).into()),
            };
            while let Some(entry) = entries.next_entry().await.map_err(ConnectorError::from)? {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
            names.sort();
            return Ok(names);
        }
        let result = self
            .execute_command(&format!("ls -1 {} 2>/dev/null || true", sh_quote_path(path)))
            .await?;
        Ok(result
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect())
    }

    /// File mtime, or `None` if the file does not exist.
    pub async fn file_mtime(&self, path: &Path) -> Result<Option<DateTime<Utc>>, HostError> {
        if self.is_local() {
            return match tokio::fs::metadata(path).await {
                Ok(meta) => {
                    let modified = meta.modified().map_err(ConnectorError::from)?;
                    Ok(Some(DateTime::<Utc>::from(modified)))
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(ConnectorError::from(e).into()),
            };
        }

        // GNU stat first, BSD stat as fallback.
        let quoted = sh_quote_path(path);
        let result = self
            .execute_command_with(
                &format!("stat -c %Y {q} 2>/dev/null || stat -f %m {q}", q = quoted),
                ExecOptions::with_timeout(PROBE_TIMEOUT),
            )
            .await?;
        if !result.success {
            return Ok(None);
        }
        let epoch: i64 = match result.stdout.trim().parse() {
            Ok(epoch) => epoch,
            Err(_) => return Ok(None),
        };
        Ok(Utc.timestamp_opt(epoch, 0).single())
    }

    // =========================================================================
    // Activity
    // =========================================================================

    /// Record host-scoped activity by touching `activity/<source>`. The
    /// JSON body is advisory; the mtime is normative.
    pub async fn record_activity(&self, source: ActivitySource) -> Result<(), HostError> {
        let path = self.paths.host_activity(source);
        let body = serde_json::json!({ "time": Utc::now().timestamp_millis() });
        self.write_text_file(&path, &format!("{}\n", body)).await
    }

    pub async fn activity_time(
        &self,
        source: ActivitySource,
    ) -> Result<Option<DateTime<Utc>>, HostError> {
        self.file_mtime(&self.paths.host_activity(source)).await
    }

    /// Advisory JSON body of an activity file.
    pub async fn activity_record(
        &self,
        source: ActivitySource,
    ) -> Result<Option<String>, HostError> {
        self.read_text_file_opt(&self.paths.host_activity(source)).await
    }

    /// Host boot time: the mtime of the BOOT activity file.
    pub async fn boot_time(&self) -> Result<Option<DateTime<Utc>>, HostError> {
        self.activity_time(ActivitySource::Boot).await
    }

    pub async fn uptime_seconds(&self) -> Result<Option<f64>, HostError> {
        Ok(self
            .boot_time()
            .await?
            .map(|boot| (Utc::now() - boot).num_milliseconds() as f64 / 1000.0))
    }

    // =========================================================================
    // Certified data
    // =========================================================================

    pub async fn certified_data(&self) -> Result<Option<CertifiedHostData>, HostError> {
        let path = self.paths.certified_data();
        let Some(content) = self.read_text_file_opt(&path).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&content) {
            Ok(data) => Ok(Some(data)),
            Err(e) => Err(HostError::MalformedState {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    pub async fn set_certified_data(&self, mut data: CertifiedHostData) -> Result<(), HostError> {
        data.touch();
        let content = serde_json::to_string_pretty(&data)?;
        self.write_text_file(&self.paths.certified_data(), &content).await?;
        if let Some(observer) = &self.observer {
            observer.certified_data_updated(&self.id, &data).await;
        }
        Ok(())
    }

    /// Mutate certified data read-modify-write. Creates a fresh record when
    /// none exists yet.
    pub async fn update_certified_data<F>(&self, mutate: F) -> Result<CertifiedHostData, HostError>
    where
        F: FnOnce(&mut CertifiedHostData),
    {
        let mut data = match self.certified_data().await? {
            Some(data) => data,
            None => CertifiedHostData::new(
                self.id.clone(),
                self.name.clone(),
                self.session_prefix.clone(),
            ),
        };
        mutate(&mut data);
        self.set_certified_data(data.clone()).await?;
        Ok(data)
    }

    pub async fn add_generated_work_dir(&self, work_dir: &Path) -> Result<(), HostError> {
        let dir = work_dir.to_path_buf();
        self.update_certified_data(|data| {
            data.generated_work_dirs.insert(dir);
        })
        .await?;
        Ok(())
    }

    pub async fn remove_generated_work_dir(&self, work_dir: &Path) -> Result<(), HostError> {
        self.update_certified_data(|data| {
            data.generated_work_dirs.remove(work_dir);
        })
        .await?;
        Ok(())
    }

    pub async fn is_generated_work_dir(&self, work_dir: &Path) -> Result<bool, HostError> {
        Ok(self
            .certified_data()
            .await?
            .map(|data| data.generated_work_dirs.contains(work_dir))
            .unwrap_or(false))
    }

    pub async fn set_plugin_data(
        &self,
        plugin_name: &str,
        data: serde_json::Value,
    ) -> Result<(), HostError> {
        let name = plugin_name.to_string();
        self.update_certified_data(|certified| {
            certified.plugin.insert(name, data);
        })
        .await?;
        Ok(())
    }

    // =========================================================================
    // Host env vars
    // =========================================================================

    pub async fn env_vars(&self) -> Result<IndexMap<String, String>, HostError> {
        let content = self
            .read_text_file_opt(&self.paths.host_env())
            .await?
            .unwrap_or_default();
        Ok(parse_env_file(&content))
    }

    pub async fn set_env_vars(&self, env: &IndexMap<String, String>) -> Result<(), HostError> {
        self.write_text_file(&self.paths.host_env(), &format_env_file(env)).await
    }

    pub async fn set_env_var(&self, key: &str, value: &str) -> Result<(), HostError> {
        let mut env = self.env_vars().await?;
        env.insert(key.to_string(), value.to_string());
        self.set_env_vars(&env).await
    }

    pub async fn env_var(&self, key: &str) -> Result<Option<String>, HostError> {
        Ok(self.env_vars().await?.get(key).cloned())
    }

    // =========================================================================
    // Agents
    // =========================================================================

    /// Agent ids present in the state directory. The filesystem is
    /// authoritative: a directory with a data.json is an agent.
    pub async fn agent_ids(&self) -> Result<Vec<AgentId>, HostError> {
        let names = self.list_directory(&self.paths.agents_dir()).await?;
        let mut ids: Vec<AgentId> = names
            .iter()
            .filter_map(|name| AgentId::parse(name).ok())
            .collect();
        ids.sort();
        Ok(ids)
    }

    pub fn agent(self: &Arc<Self>, id: AgentId) -> Agent {
        Agent::new(Arc::clone(self), id)
    }

    /// All agents on this host, skipping directories without a readable
    /// record.
    pub async fn agents(self: &Arc<Self>) -> Result<Vec<Agent>, HostError> {
        let mut agents = Vec::new();
        for id in self.agent_ids().await? {
            let agent = self.agent(id);
            if agent.record().await.is_ok() {
                agents.push(agent);
            }
        }
        Ok(agents)
    }

    pub async fn find_agent_by_name(
        self: &Arc<Self>,
        name: &str,
    ) -> Result<Option<Agent>, HostError> {
        for agent in self.agents().await? {
            let record = agent.record().await?;
            if record.name == name {
                return Ok(Some(agent));
            }
        }
        Ok(None)
    }

    /// Cheap liveness probe.
    pub async fn ping(&self) -> bool {
        matches!(
            self.execute_command_with("echo ok", ExecOptions::with_timeout(PROBE_TIMEOUT))
                .await,
            Ok(result) if result.success
        )
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
