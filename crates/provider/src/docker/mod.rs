// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Docker provider: containers as hosts.
//!
//! Containers are discovered by label, SSH is bootstrapped inside each
//! fresh container, snapshots are `docker commit` images, and durable
//! state lives on a shared named volume kept mounted by a singleton state
//! container.

mod bootstrap;
mod cli;
mod labels;
mod state;

pub use bootstrap::{default_dockerfile, CONTAINER_ENTRYPOINT, REQUIRED_PACKAGES};
pub use cli::{parse_port_mapping, DockerCli};
pub use labels::{
    build_container_labels, parse_container_labels, ParsedLabels, LABEL_HOST_ID, LABEL_HOST_NAME,
    LABEL_PROVIDER, LABEL_TAGS,
};
pub use state::{VolumeHostStore, STATE_MOUNT};

use crate::{
    derive_host_state, HostListing, HostReference, HostResources, Provider, ProviderError,
    SshKeys, VolumeInfo,
};
use async_trait::async_trait;
use chrono::Utc;
use cli::{DOCKER_BUILD_TIMEOUT, DOCKER_STOP_TIMEOUT};
use indexmap::IndexMap;
use parking_lot::Mutex;
use roost_connector::{SshConnector, SshTarget};
use roost_core::{
    ActivitySource, AgentId, AgentRecord, CertifiedHostData, ContainerConfig, HostId, HostName,
    HostRecord, HostState, NewHostOptions, SnapshotId, SnapshotRecord, VolumeId,
};
use roost_host::agent::AgentTypeRegistry;
use roost_host::{CertifiedDataObserver, Host};
use roost_storage::{CachedHostStore, HostStore};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for one Docker provider instance.
#[derive(Debug, Clone)]
pub struct DockerProviderConfig {
    pub provider_name: String,
    pub session_prefix: String,
    /// Client-side directory holding the provider's SSH key material.
    pub keys_dir: PathBuf,
    /// Host dir inside every container.
    pub host_dir: PathBuf,
    pub state_volume: String,
    pub state_container: String,
    /// SSH-reachable address of the Docker daemon's published ports.
    pub ssh_host: String,
    pub ssh_ready_timeout: Duration,
    pub default_idle_timeout_seconds: Option<u64>,
    pub default_activity_sources: std::collections::BTreeSet<ActivitySource>,
}

impl Default for DockerProviderConfig {
    fn default() -> Self {
        Self {
            provider_name: "docker".to_string(),
            session_prefix: roost_core::DEFAULT_SESSION_PREFIX.to_string(),
            keys_dir: PathBuf::from(".roost/keys"),
            host_dir: PathBuf::from("/root/.roost/host"),
            state_volume: "roost-state".to_string(),
            state_container: "roost-state".to_string(),
            ssh_host: "127.0.0.1".to_string(),
            ssh_ready_timeout: Duration::from_secs(60),
            default_idle_timeout_seconds: None,
            default_activity_sources: [ActivitySource::Boot, ActivitySource::Process].into(),
        }
    }
}

/// Writes certified-data updates through to the host record.
struct StoreObserver {
    store: Arc<dyn HostStore>,
}

#[async_trait]
impl CertifiedDataObserver for StoreObserver {
    async fn certified_data_updated(&self, host_id: &HostId, data: &CertifiedHostData) {
        let record = match self.store.read(host_id, false).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!(host_id = %host_id, "certified update for unknown host record");
                return;
            }
            Err(e) => {
                tracing::warn!(host_id = %host_id, error = %e, "certified update read failed");
                return;
            }
        };
        let mut updated = record;
        updated.certified = data.clone();
        if let Err(e) = self.store.write(&updated).await {
            tracing::warn!(host_id = %host_id, error = %e, "certified update write failed");
        }
    }
}

pub struct DockerProvider {
    config: DockerProviderConfig,
    cli: DockerCli,
    keys: SshKeys,
    store: Arc<dyn HostStore>,
    registry: Arc<AgentTypeRegistry>,
    host_cache: Mutex<HashMap<HostId, Arc<Host>>>,
    container_cache: Mutex<HashMap<HostId, String>>,
    state_ready: tokio::sync::OnceCell<()>,
}

impl DockerProvider {
    pub fn new(config: DockerProviderConfig, registry: Arc<AgentTypeRegistry>) -> Self {
        let cli = DockerCli::new();
        let store: Arc<dyn HostStore> = Arc::new(CachedHostStore::new(VolumeHostStore::new(
            cli.clone(),
            config.state_container.clone(),
        )));
        let keys = SshKeys::new(config.keys_dir.clone());
        Self {
            config,
            cli,
            keys,
            store,
            registry,
            host_cache: Mutex::new(HashMap::new()),
            container_cache: Mutex::new(HashMap::new()),
            state_ready: tokio::sync::OnceCell::new(),
        }
    }

    /// Swap in a different backing store (used by tests and by embedders
    /// that keep records outside Docker).
    pub fn with_store(mut self, store: Arc<dyn HostStore>) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &Arc<dyn HostStore> {
        &self.store
    }

    async fn ensure_ready(&self) -> Result<(), ProviderError> {
        self.state_ready
            .get_or_try_init(|| async {
                state::ensure_state_container(
                    &self.cli,
                    &self.config.state_volume,
                    &self.config.state_container,
                )
                .await?;
                self.keys.ensure().await?;
                Ok::<(), ProviderError>(())
            })
            .await?;
        Ok(())
    }

    fn provider_filter(&self) -> String {
        format!("label={}={}", LABEL_PROVIDER, self.config.provider_name)
    }

    async fn find_container_by_host_id(
        &self,
        host_id: &HostId,
    ) -> Result<Option<String>, ProviderError> {
        if let Some(id) = self.container_cache.lock().get(host_id) {
            return Ok(Some(id.clone()));
        }
        let filter = format!("label={}={}", LABEL_HOST_ID, host_id);
        let output = self
            .cli
            .run_ok(&[
                "ps",
                "-a",
                "--filter",
                &filter,
                "--filter",
                &self.provider_filter(),
                "--format",
                "{{.ID}}",
            ])
            .await?;
        let container = output.stdout.lines().next().map(|l| l.trim().to_string());
        match container.filter(|c| !c.is_empty()) {
            Some(container) => {
                self.container_cache
                    .lock()
                    .insert(host_id.clone(), container.clone());
                Ok(Some(container))
            }
            None => Ok(None),
        }
    }

    async fn container_labels(
        &self,
        container: &str,
    ) -> Result<IndexMap<String, String>, ProviderError> {
        let output = self
            .cli
            .run_ok(&["inspect", "-f", "{{json .Config.Labels}}", container])
            .await?;
        Ok(serde_json::from_str(output.trimmed_stdout().as_str()).unwrap_or_default())
    }

    async fn is_container_running(&self, container: &str) -> Result<bool, ProviderError> {
        let output = self
            .cli
            .run(&["inspect", "-f", "{{.State.Running}}", container])
            .await?;
        Ok(output.success && output.trimmed_stdout() == "true")
    }

    async fn container_ssh_port(&self, container: &str) -> Result<u16, ProviderError> {
        let output = self.cli.run_ok(&["port", container, "22/tcp"]).await?;
        parse_port_mapping(&output.stdout).ok_or_else(|| {
            ProviderError::Operation(format!("container {} has no SSH port mapping", container))
        })
    }

    async fn exec_in_container(
        &self,
        container: &str,
        script: &str,
        detach: bool,
    ) -> Result<String, ProviderError> {
        let mut args = vec!["exec"];
        if detach {
            args.push("-d");
        }
        args.extend([container, "sh", "-c", script]);
        let output = self
            .cli
            .run_with_timeout(&args, DOCKER_BUILD_TIMEOUT)
            .await?;
        if !output.success {
            return Err(ProviderError::Operation(format!(
                "docker exec failed: {}",
                output.stderr.trim()
            )));
        }
        Ok(output.stdout)
    }

    async fn build_or_pull_image(&self, options: &NewHostOptions) -> Result<String, ProviderError> {
        if !options.build_args.is_empty() {
            let mut args: Vec<&str> = vec!["build", "-q"];
            args.extend(options.build_args.iter().map(String::as_str));
            let output = self
                .cli
                .run_with_timeout(&args, DOCKER_BUILD_TIMEOUT)
                .await?;
            if !output.success {
                return Err(ProviderError::Operation(format!(
                    "docker build failed: {}",
                    output.stderr.trim()
                )));
            }
            return Ok(output.trimmed_stdout());
        }

        if let Some(image) = &options.image {
            let output = self
                .cli
                .run_with_timeout(&["pull", image], DOCKER_BUILD_TIMEOUT)
                .await?;
            if !output.success {
                return Err(ProviderError::Operation(format!(
                    "docker pull {} failed: {}. Check the image name or supply build args.",
                    image,
                    output.stderr.trim()
                )));
            }
            return Ok(image.clone());
        }

        tracing::warn!(
            "no image or build args supplied; building the default image. \
             Provide your own image to control the toolchain."
        );
        let dockerfile = default_dockerfile();
        let output = self
            .cli
            .run_with_stdin(
                &["build", "-q", "-"],
                dockerfile.as_bytes(),
                DOCKER_BUILD_TIMEOUT,
            )
            .await?;
        if !output.success {
            return Err(ProviderError::Operation(format!(
                "docker build of default image failed: {}",
                output.stderr.trim()
            )));
        }
        Ok(output.trimmed_stdout())
    }

    fn connector_for(&self, record: &HostRecord) -> Result<Arc<SshConnector>, ProviderError> {
        let endpoint = record.ssh_endpoint().ok_or_else(|| ProviderError::HostFailed {
            host_id: record.host_id().clone(),
            reason: record
                .certified
                .failure_reason
                .clone()
                .unwrap_or_else(|| "host has no SSH endpoint".to_string()),
        })?;
        Ok(Arc::new(SshConnector::new(SshTarget {
            user: "root".to_string(),
            host: endpoint.host,
            port: endpoint.port,
            private_key_path: self.keys.client_key_path(),
            known_hosts_path: self.keys.known_hosts_path(),
        })))
    }

    fn build_host(&self, record: &HostRecord) -> Result<Arc<Host>, ProviderError> {
        let connector = self.connector_for(record)?;
        let host = Arc::new(
            Host::new(
                record.host_id().clone(),
                record.certified.host_name.clone(),
                self.config.provider_name.clone(),
                record.certified.tmux_session_prefix.clone(),
                self.config.host_dir.clone(),
                connector,
                Arc::clone(&self.registry),
            )
            .with_observer(Arc::new(StoreObserver {
                store: Arc::clone(&self.store),
            })),
        );
        self.host_cache
            .lock()
            .insert(record.host_id().clone(), Arc::clone(&host));
        Ok(host)
    }

    async fn read_record_or_missing(&self, host_id: &HostId) -> Result<HostRecord, ProviderError> {
        self.store
            .read(host_id, false)
            .await?
            .ok_or_else(|| ProviderError::HostNotFound(host_id.to_string()))
    }

    async fn save_failed_host_record(
        &self,
        host_id: HostId,
        host_name: HostName,
        tags: &IndexMap<String, String>,
        failure_reason: String,
        build_log: Option<String>,
    ) {
        let mut certified = CertifiedHostData::new(
            host_id.clone(),
            host_name,
            self.config.session_prefix.clone(),
        );
        certified.user_tags = tags.clone();
        certified.failure_reason = Some(failure_reason);
        certified.build_log = build_log;
        // Failed hosts have no SSH endpoint at all: listable, never
        // connectable.
        let record = HostRecord::new(certified);
        if let Err(e) = self.store.write(&record).await {
            tracing::warn!(host_id = %host_id, error = %e, "failed to save failed-host record");
        }
    }

    /// Bootstrap SSH in a running container, persist the record, and
    /// return the connected host.
    async fn setup_container_ssh(
        &self,
        container: &str,
        mut record: HostRecord,
        known_hosts: &[String],
    ) -> Result<Arc<Host>, ProviderError> {
        let (client_pub, host_pub) = self.keys.ensure().await?;
        let host_private = self.keys.host_private_key().await?;

        let package_output = self
            .exec_in_container(container, &bootstrap::check_and_install_packages_script(), false)
            .await?;
        for line in package_output.lines().filter(|l| l.starts_with("MISSING:")) {
            tracing::warn!("{} was missing in the container image", line.trim_start_matches("MISSING:").trim());
        }

        self.exec_in_container(
            container,
            &bootstrap::configure_ssh_script(&client_pub, &host_private, &host_pub),
            false,
        )
        .await?;

        if let Some(script) = bootstrap::add_known_hosts_script(known_hosts) {
            self.exec_in_container(container, &script, false).await?;
        }

        self.exec_in_container(container, "/usr/sbin/sshd -D", true).await?;

        let ssh_port = self.container_ssh_port(container).await?;
        let ssh_host = self.config.ssh_host.clone();
        self.keys.add_known_host(&ssh_host, ssh_port, &host_pub).await?;

        bootstrap::wait_for_ssh_banner(&ssh_host, ssh_port, self.config.ssh_ready_timeout).await?;

        record.set_ssh_endpoint(ssh_host, ssh_port, host_pub);
        record.container_id = Some(container.to_string());
        self.store.write(&record).await?;

        let host = self.build_host(&record)?;
        host.record_activity(ActivitySource::Boot).await?;
        host.set_certified_data(record.certified.clone()).await?;

        // Provider-specific shutdown: kill PID 1, the entrypoint exits.
        let host_dir = self.config.host_dir.display().to_string();
        host.write_text_file_with_mode(
            &host.paths().shutdown_script(),
            &bootstrap::shutdown_script(&host_dir),
            "755",
        )
        .await?;

        if let Some(timeout) = record.certified.idle_timeout_seconds {
            let watcher = bootstrap::idle_watcher_script(&host_dir, timeout);
            let cmd = format!(
                "nohup bash -c {} </dev/null >/dev/null 2>&1 &",
                roost_connector::sh_quote(&watcher)
            );
            if let Err(e) = host.execute_command(&cmd).await {
                tracing::warn!(error = %e, "failed to start idle watcher");
            }
        }

        Ok(host)
    }

    async fn start_from_snapshot(
        &self,
        host_id: &HostId,
        snapshot_id: &SnapshotId,
        record: HostRecord,
    ) -> Result<Arc<Host>, ProviderError> {
        let snapshot = record
            .certified
            .snapshots
            .iter()
            .find(|s| &s.id == snapshot_id)
            .cloned()
            .ok_or_else(|| ProviderError::SnapshotNotFound(snapshot_id.clone()))?;

        if let Some(old) = self.find_container_by_host_id(host_id).await? {
            let _ = self.cli.run(&["rm", "-f", &old]).await;
        }
        self.container_cache.lock().remove(host_id);
        self.host_cache.lock().remove(host_id);

        tracing::info!(host_id = %host_id, snapshot_id = %snapshot_id, "restoring container from snapshot");
        let container = self
            .run_container(
                host_id,
                &record.certified.host_name,
                &record.certified.user_tags,
                snapshot.id.as_str(),
                record.config.as_ref(),
            )
            .await?;
        self.setup_container_ssh(&container, record, &[]).await
    }

    /// `docker run` with the entrypoint trap, published SSH port, core
    /// labels, passthrough start args, and the state volume mount.
    async fn run_container(
        &self,
        host_id: &HostId,
        name: &HostName,
        tags: &IndexMap<String, String>,
        image: &str,
        config: Option<&ContainerConfig>,
    ) -> Result<String, ProviderError> {
        let container_name = format!("{}{}", self.config.session_prefix, name);
        let labels = build_container_labels(host_id, name, &self.config.provider_name, tags);

        let mut args: Vec<String> = vec![
            "run".into(),
            "-d".into(),
            "--name".into(),
            container_name,
            "-p".into(),
            "22".into(),
        ];
        for (key, value) in &labels {
            args.push("--label".into());
            args.push(format!("{}={}", key, value));
        }
        args.push("-v".into());
        args.push(format!("{}:{}", self.config.state_volume, STATE_MOUNT));
        if let Some(config) = config {
            args.extend(config.start_args.iter().cloned());
        }
        args.push(image.to_string());
        args.push("sh".into());
        args.push("-c".into());
        args.push(bootstrap::CONTAINER_ENTRYPOINT.to_string());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.cli.run_ok(&arg_refs).await?;
        let container = output.trimmed_stdout();
        self.container_cache
            .lock()
            .insert(host_id.clone(), container.clone());
        Ok(container)
    }
}

#[async_trait]
impl Provider for DockerProvider {
    fn name(&self) -> &str {
        &self.config.provider_name
    }

    fn supports_snapshots(&self) -> bool {
        true
    }

    fn supports_shutdown_hosts(&self) -> bool {
        true
    }

    fn supports_volumes(&self) -> bool {
        true
    }

    /// Docker container labels are create-time-only.
    fn supports_mutable_tags(&self) -> bool {
        false
    }

    async fn create_host(&self, options: &NewHostOptions) -> Result<Arc<Host>, ProviderError> {
        self.ensure_ready().await?;
        let host_id = HostId::generate();
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| HostName::new(format!("host-{}", &host_id.hex_suffix()[..8])));
        tracing::info!(host_id = %host_id, name = %name, "creating Docker host");

        let (idle_timeout, activity_sources) = options.lifecycle.resolve(
            self.config.default_idle_timeout_seconds,
            &self.config.default_activity_sources,
        );

        let mut certified =
            CertifiedHostData::new(host_id.clone(), name.clone(), self.config.session_prefix.clone());
        certified.user_tags = options.tags.clone();
        certified.idle_timeout_seconds = idle_timeout;
        certified.activity_sources = activity_sources;

        let container_config = ContainerConfig {
            start_args: options.start_args.clone(),
            image: options.image.clone(),
        };

        let result: Result<Arc<Host>, ProviderError> = async {
            let image = self.build_or_pull_image(options).await?;
            let container = self
                .run_container(&host_id, &name, &options.tags, &image, Some(&container_config))
                .await?;
            let mut record = HostRecord::new(certified.clone());
            record.config = Some(container_config.clone());
            self.setup_container_ssh(&container, record, &options.known_hosts).await
        }
        .await;

        match result {
            Ok(host) => Ok(host),
            Err(e) => {
                tracing::error!(host_id = %host_id, error = %e, "host creation failed");
                self.save_failed_host_record(
                    host_id,
                    name,
                    &options.tags,
                    e.to_string(),
                    None,
                )
                .await;
                Err(e)
            }
        }
    }

    async fn stop_host(
        &self,
        host_id: &HostId,
        create_snapshot: bool,
        timeout: Duration,
    ) -> Result<(), ProviderError> {
        self.ensure_ready().await?;
        tracing::info!(host_id = %host_id, "stopping Docker host");

        let removed_host = self.host_cache.lock().remove(host_id);
        if let Some(host) = removed_host {
            host.disconnect().await;
        }

        if let Some(container) = self.find_container_by_host_id(host_id).await? {
            if create_snapshot && self.is_container_running(&container).await? {
                if let Err(e) = self.create_snapshot(host_id, Some("stop")).await {
                    tracing::warn!(error = %e, "failed to create snapshot before stop");
                }
            }
            let time_arg = timeout.as_secs().to_string();
            let output = self
                .cli
                .run_with_timeout(
                    &["stop", "-t", &time_arg, &container],
                    DOCKER_STOP_TIMEOUT + timeout,
                )
                .await?;
            if !output.success {
                tracing::warn!(stderr = %output.stderr, "error stopping container");
            }
        } else {
            tracing::debug!(host_id = %host_id, "container not found (already stopped?)");
        }

        if let Some(mut record) = self.store.read(host_id, false).await? {
            record.certified.stop_reason = Some(HostState::Stopped.to_string());
            record.certified.touch();
            self.store.write(&record).await?;
        }

        self.container_cache.lock().remove(host_id);
        Ok(())
    }

    async fn start_host(
        &self,
        host_id: &HostId,
        snapshot_id: Option<&SnapshotId>,
    ) -> Result<Arc<Host>, ProviderError> {
        self.ensure_ready().await?;
        let container = self.find_container_by_host_id(host_id).await?;

        // Already running: reuse.
        if let Some(container) = &container {
            if self.is_container_running(container).await? {
                if snapshot_id.is_some() {
                    tracing::warn!(
                        host_id = %host_id,
                        "container already running; ignoring snapshot. Stop the host first to restore."
                    );
                }
                let record = self.read_record_or_missing(host_id).await?;
                return self.build_host(&record);
            }
        }

        let record = self.read_record_or_missing(host_id).await?;
        if let Some(reason) = &record.certified.failure_reason {
            return Err(ProviderError::HostFailed {
                host_id: host_id.clone(),
                reason: reason.clone(),
            });
        }

        if let Some(snapshot_id) = snapshot_id {
            return self.start_from_snapshot(host_id, snapshot_id, record).await;
        }

        // Native restart keeps the work dirs and state volume contents.
        if let Some(container) = container {
            tracing::info!(host_id = %host_id, "starting stopped container");
            self.cli.run_ok(&["start", &container]).await?;
            self.host_cache.lock().remove(host_id);
            return self
                .setup_container_ssh(&container, record, &[])
                .await;
        }

        // No container left: newest snapshot.
        let latest = record
            .certified
            .latest_snapshot()
            .map(|s| s.id.clone())
            .ok_or_else(|| {
                ProviderError::Operation(format!(
                    "container for {} is gone and it has no snapshots; create a new host instead",
                    host_id
                ))
            })?;
        self.start_from_snapshot(host_id, &latest, record).await
    }

    async fn destroy_host(
        &self,
        host_id: &HostId,
        delete_snapshots: bool,
    ) -> Result<(), ProviderError> {
        self.stop_host(host_id, false, Duration::from_secs(10)).await?;

        if let Some(container) = self.find_container_by_host_id(host_id).await? {
            let output = self.cli.run(&["rm", "-f", &container]).await?;
            if !output.success {
                tracing::warn!(stderr = %output.stderr, "error removing container");
            }
        }

        if delete_snapshots {
            if let Some(record) = self.store.read(host_id, false).await? {
                for snapshot in &record.certified.snapshots {
                    let output = self.cli.run(&["rmi", snapshot.id.as_str()]).await?;
                    if !output.success {
                        tracing::warn!(
                            snapshot = %snapshot.id,
                            stderr = %output.stderr,
                            "error removing snapshot image"
                        );
                    }
                }
            }
            // Removes record.json and the per-host agents subtree together.
            self.store.delete(host_id).await?;
        }

        self.container_cache.lock().remove(host_id);
        self.host_cache.lock().remove(host_id);
        Ok(())
    }

    async fn get_host(&self, reference: &HostReference) -> Result<Arc<Host>, ProviderError> {
        self.ensure_ready().await?;
        let record = match reference {
            HostReference::Id(host_id) => self.read_record_or_missing(host_id).await?,
            HostReference::Name(name) => self
                .store
                .list_all()
                .await?
                .into_iter()
                .find(|r| &r.certified.host_name == name)
                .ok_or_else(|| ProviderError::HostNotFound(name.to_string()))?,
        };

        if let Some(cached) = self.host_cache.lock().get(record.host_id()) {
            return Ok(Arc::clone(cached));
        }
        self.build_host(&record)
    }

    async fn list_hosts(
        &self,
        include_destroyed: bool,
    ) -> Result<Vec<HostListing>, ProviderError> {
        self.ensure_ready().await?;

        // Discovery by labels: one ps across this provider's containers.
        let output = self
            .cli
            .run_ok(&[
                "ps",
                "-a",
                "--filter",
                &self.provider_filter(),
                "--format",
                "{{.ID}}",
            ])
            .await?;
        let mut containers: HashMap<HostId, (String, bool)> = HashMap::new();
        for container in output.stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let labels = self.container_labels(container).await?;
            if let Some(parsed) = parse_container_labels(&labels) {
                let running = self.is_container_running(container).await?;
                containers.insert(parsed.host_id.clone(), (container.to_string(), running));
            }
        }

        let mut listings = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for record in self.store.list_all().await? {
            let host_id = record.host_id().clone();
            seen.insert(host_id.clone());
            let (exists, running) = containers
                .get(&host_id)
                .map(|(_, running)| (true, *running))
                .unwrap_or((false, false));
            let state = derive_host_state(Some(&record), running, exists);
            if state == HostState::Destroyed && !include_destroyed {
                continue;
            }
            listings.push(HostListing {
                host_id,
                host_name: record.certified.host_name.clone(),
                state,
                record: Some(record),
            });
        }

        // Containers with labels but no record (e.g. record deleted by
        // hand) still surface.
        for (host_id, (container, running)) in containers {
            if seen.contains(&host_id) {
                continue;
            }
            let labels = self.container_labels(&container).await?;
            let Some(parsed) = parse_container_labels(&labels) else {
                continue;
            };
            listings.push(HostListing {
                host_id,
                host_name: parsed.host_name,
                state: if running {
                    HostState::Running
                } else {
                    HostState::Stopped
                },
                record: None,
            });
        }

        Ok(listings)
    }

    async fn get_host_resources(
        &self,
        host_id: &HostId,
    ) -> Result<HostResources, ProviderError> {
        let container = self
            .find_container_by_host_id(host_id)
            .await?
            .ok_or_else(|| ProviderError::HostNotFound(host_id.to_string()))?;
        let output = self
            .cli
            .run_ok(&[
                "inspect",
                "-f",
                "{{.HostConfig.NanoCpus}} {{.HostConfig.Memory}}",
                &container,
            ])
            .await?;
        let stdout = output.trimmed_stdout();
        let mut fields = stdout.split_whitespace();
        let nano_cpus: i64 = fields.next().and_then(|f| f.parse().ok()).unwrap_or(0);
        let memory: i64 = fields.next().and_then(|f| f.parse().ok()).unwrap_or(0);

        Ok(HostResources {
            cpu_count: (nano_cpus > 0).then(|| nano_cpus as f64 / 1e9),
            cpu_freq_ghz: None,
            memory_gb: (memory > 0).then(|| memory as f64 / (1024.0 * 1024.0 * 1024.0)),
            disk_gb: None,
            gpu: None,
        })
    }

    async fn create_snapshot(
        &self,
        host_id: &HostId,
        name: Option<&str>,
    ) -> Result<SnapshotId, ProviderError> {
        let container = self
            .find_container_by_host_id(host_id)
            .await?
            .ok_or_else(|| ProviderError::HostNotFound(host_id.to_string()))?;
        if !self.is_container_running(&container).await? {
            return Err(ProviderError::Operation(
                "snapshots require a running host".to_string(),
            ));
        }

        let mut record = self.read_record_or_missing(host_id).await?;
        if record
            .config
            .as_ref()
            .map(|c| c.start_args.iter().any(|a| a == "-v" || a == "--volume"))
            .unwrap_or(false)
        {
            tracing::warn!("volume mounts are not captured by snapshots");
        }

        let output = self.cli.run_ok(&["commit", &container]).await?;
        let image_id = output.trimmed_stdout();
        let snapshot_id = SnapshotId::from_provider_handle(image_id);
        record.certified.snapshots.push(SnapshotRecord {
            id: snapshot_id.clone(),
            name: name.unwrap_or("snapshot").to_string(),
            created_at: Utc::now(),
        });
        record.certified.touch();
        self.store.write(&record).await?;
        Ok(snapshot_id)
    }

    async fn list_snapshots(
        &self,
        host_id: &HostId,
    ) -> Result<Vec<SnapshotRecord>, ProviderError> {
        Ok(self.read_record_or_missing(host_id).await?.certified.snapshots)
    }

    async fn delete_snapshot(
        &self,
        host_id: &HostId,
        snapshot_id: &SnapshotId,
    ) -> Result<(), ProviderError> {
        let mut record = self.read_record_or_missing(host_id).await?;
        let removed = record
            .certified
            .remove_snapshot(snapshot_id)
            .ok_or_else(|| ProviderError::SnapshotNotFound(snapshot_id.clone()))?;
        let output = self.cli.run(&["rmi", removed.id.as_str()]).await?;
        if !output.success {
            tracing::warn!(stderr = %output.stderr, "error removing snapshot image");
        }
        record.certified.touch();
        self.store.write(&record).await?;
        Ok(())
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeInfo>, ProviderError> {
        let output = self
            .cli
            .run_ok(&["volume", "ls", "--format", "{{.Name}}"])
            .await?;
        Ok(output
            .stdout
            .lines()
            .filter_map(|name| {
                let id = VolumeId::parse(name.trim()).ok()?;
                Some(VolumeInfo {
                    id,
                    name: name.trim().to_string(),
                })
            })
            .collect())
    }

    async fn delete_volume(&self, volume_id: &VolumeId) -> Result<(), ProviderError> {
        self.cli.run_ok(&["volume", "rm", volume_id.as_str()]).await?;
        Ok(())
    }

    async fn get_volume_for_host(
        &self,
        host_id: &HostId,
    ) -> Result<Option<VolumeInfo>, ProviderError> {
        let volume_id = host_id.to_volume_id();
        let output = self
            .cli
            .run(&["volume", "inspect", volume_id.as_str()])
            .await?;
        Ok(output.success.then(|| VolumeInfo {
            name: volume_id.to_string(),
            id: volume_id,
        }))
    }

    async fn host_tags(
        &self,
        host_id: &HostId,
    ) -> Result<IndexMap<String, String>, ProviderError> {
        Ok(self.read_record_or_missing(host_id).await?.certified.user_tags)
    }

    async fn set_host_tags(
        &self,
        _host_id: &HostId,
        _tags: IndexMap<String, String>,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported("mutable tags"))
    }

    async fn add_host_tags(
        &self,
        _host_id: &HostId,
        _tags: IndexMap<String, String>,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported("mutable tags"))
    }

    async fn remove_host_tags(
        &self,
        _host_id: &HostId,
        _keys: &[String],
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported("mutable tags"))
    }

    async fn rename_host(
        &self,
        host_id: &HostId,
        new_name: &HostName,
    ) -> Result<(), ProviderError> {
        let mut record = self.read_record_or_missing(host_id).await?;
        if let Some(container) = self.find_container_by_host_id(host_id).await? {
            let new_container_name = format!("{}{}", self.config.session_prefix, new_name);
            self.cli
                .run_ok(&["rename", &container, &new_container_name])
                .await?;
        }
        // Container labels are create-time-only; the record is
        // authoritative for the name from here on.
        record.certified.host_name = new_name.clone();
        record.certified.touch();
        self.store.write(&record).await?;
        self.host_cache.lock().remove(host_id);
        Ok(())
    }

    async fn persist_agent_data(
        &self,
        host_id: &HostId,
        record: &AgentRecord,
    ) -> Result<(), ProviderError> {
        Ok(self.store.persist_agent_data(host_id, record).await?)
    }

    async fn remove_persisted_agent_data(
        &self,
        host_id: &HostId,
        agent_id: &AgentId,
    ) -> Result<(), ProviderError> {
        Ok(self.store.remove_agent_data(host_id, agent_id).await?)
    }

    async fn list_persisted_agent_data(
        &self,
        host_id: &HostId,
    ) -> Result<Vec<AgentRecord>, ProviderError> {
        Ok(self.store.list_agent_data(host_id).await?)
    }

    async fn on_connection_error(&self, host_id: &HostId) {
        tracing::debug!(host_id = %host_id, "clearing caches after connection error");
        self.container_cache.lock().remove(host_id);
        self.host_cache.lock().remove(host_id);
        self.store.clear_cache();
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
