// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host store backed by a shared Docker named volume.
//!
//! A singleton "state container" keeps the volume mounted so multiple
//! control-plane invocations share it. Layout under the mount:
//! `hosts/<host_id>/record.json`, `hosts/<host_id>/agents/<agent_id>.json`,
//! `volumes/<vol_id>/...`. Writes go to a temp name then rename, so a
//! crash never leaves a partial document.

use super::cli::{DockerCli, DOCKER_TIMEOUT};
use crate::ProviderError;
use async_trait::async_trait;
use roost_core::{AgentId, AgentRecord, HostId, HostRecord};
use roost_storage::{HostStore, StoreError};

/// Mount point of the state volume inside the state container.
pub const STATE_MOUNT: &str = "/var/lib/roost-state";

/// Store over `docker exec` into the state container.
#[derive(Debug, Clone)]
pub struct VolumeHostStore {
    cli: DockerCli,
    container_name: String,
}

impl VolumeHostStore {
    pub fn new(cli: DockerCli, container_name: impl Into<String>) -> Self {
        Self {
            cli,
            container_name: container_name.into(),
        }
    }

    fn record_path(host_id: &HostId) -> String {
        format!("{}/hosts/{}/record.json", STATE_MOUNT, host_id)
    }

    fn host_dir(host_id: &HostId) -> String {
        format!("{}/hosts/{}", STATE_MOUNT, host_id)
    }

    fn agents_dir(host_id: &HostId) -> String {
        format!("{}/hosts/{}/agents", STATE_MOUNT, host_id)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Option<T> {
        let output = self
            .cli
            .run(&["exec", &self.container_name, "cat", path])
            .await
            .ok()?;
        if !output.success {
            return None;
        }
        match serde_json::from_str(&output.stdout) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(path, error = %e, "malformed state document");
                None
            }
        }
    }

    /// Atomic write: stream to `<path>.tmp` then rename.
    async fn write_json(&self, path: &str, data: &[u8]) -> Result<(), StoreError> {
        let dir = path.rsplit_once('/').map(|(d, _)| d).unwrap_or("/");
        let script = format!(
            "mkdir -p {dir} && cat > {path}.tmp && mv {path}.tmp {path}",
            dir = dir,
            path = path
        );
        let output = self
            .cli
            .run_with_stdin(
                &["exec", "-i", &self.container_name, "sh", "-c", &script],
                data,
                DOCKER_TIMEOUT,
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if !output.success {
            return Err(StoreError::Backend(format!(
                "state write failed: {}",
                output.stderr.trim()
            )));
        }
        Ok(())
    }

    async fn exec(&self, script: &str) -> Result<String, StoreError> {
        let output = self
            .cli
            .run(&["exec", &self.container_name, "sh", "-c", script])
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if !output.success {
            return Err(StoreError::Backend(format!(
                "state command failed: {}",
                output.stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl HostStore for VolumeHostStore {
    async fn read(
        &self,
        host_id: &HostId,
        _use_cache: bool,
    ) -> Result<Option<HostRecord>, StoreError> {
        Ok(self.read_json(&Self::record_path(host_id)).await)
    }

    async fn write(&self, record: &HostRecord) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(record)?;
        self.write_json(&Self::record_path(record.host_id()), &data).await
    }

    async fn delete(&self, host_id: &HostId) -> Result<(), StoreError> {
        self.exec(&format!("rm -rf {}", Self::host_dir(host_id))).await?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<HostRecord>, StoreError> {
        let listing = self
            .exec(&format!("ls -1 {}/hosts 2>/dev/null || true", STATE_MOUNT))
            .await?;
        let mut records = Vec::new();
        for name in listing.lines().filter(|l| !l.is_empty()) {
            let Ok(host_id) = HostId::parse(name) else {
                continue;
            };
            if let Some(record) = self.read_json(&Self::record_path(&host_id)).await {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn clear_cache(&self) {
        // No in-process cache at this layer; see CachedHostStore.
    }

    async fn persist_agent_data(
        &self,
        host_id: &HostId,
        record: &AgentRecord,
    ) -> Result<(), StoreError> {
        let path = format!("{}/{}.json", Self::agents_dir(host_id), record.id);
        let data = serde_json::to_vec_pretty(record)?;
        self.write_json(&path, &data).await
    }

    async fn remove_agent_data(
        &self,
        host_id: &HostId,
        agent_id: &AgentId,
    ) -> Result<(), StoreError> {
        let path = format!("{}/{}.json", Self::agents_dir(host_id), agent_id);
        self.exec(&format!("rm -f {}", path)).await?;
        Ok(())
    }

    async fn list_agent_data(&self, host_id: &HostId) -> Result<Vec<AgentRecord>, StoreError> {
        let listing = self
            .exec(&format!(
                "ls -1 {} 2>/dev/null || true",
                Self::agents_dir(host_id)
            ))
            .await?;
        let mut records = Vec::new();
        for name in listing.lines().filter(|l| l.ends_with(".json")) {
            let path = format!("{}/{}", Self::agents_dir(host_id), name);
            if let Some(record) = self.read_json(&path).await {
                records.push(record);
            }
        }
        Ok(records)
    }
}

/// Ensure the named state volume exists and the singleton state container
/// is running with it mounted.
pub async fn ensure_state_container(
    cli: &DockerCli,
    volume_name: &str,
    container_name: &str,
) -> Result<(), ProviderError> {
    cli.run_ok(&["volume", "create", volume_name]).await?;

    let running = cli
        .run(&[
            "inspect",
            "-f",
            "{{.State.Running}}",
            container_name,
        ])
        .await?;
    if running.success && running.trimmed_stdout() == "true" {
        return Ok(());
    }

    // A stopped leftover blocks the name; clear it first.
    let _ = cli.run(&["rm", "-f", container_name]).await;

    let mount = format!("{}:{}", volume_name, STATE_MOUNT);
    cli.run_ok(&[
        "run",
        "-d",
        "--name",
        container_name,
        "-v",
        &mount,
        "--label",
        "roost.state=1",
        "debian:bookworm-slim",
        "sh",
        "-c",
        super::bootstrap::CONTAINER_ENTRYPOINT,
    ])
    .await?;
    Ok(())
}
