// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The create pipeline: one function, many cases.
//!
//! Ordering is strict: source-resolve, work-dir, state-file, provision,
//! start, await-ready, message, await-stopped. Partial failures are not
//! rolled back; half-built agents stay enumerable and destroyable.

use crate::{CreateError, Engine};
use roost_core::{
    AgentId, AgentLifecycleState, CreateAgentOptions, NewHostOptions, WorkDirCopyMode,
};
use roost_host::agent::Agent;
use roost_host::Host;
use roost_provider::{HostReference, Provider};
use roost_sync::GitContext;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const STOPPED_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Where the agent's code comes from.
#[derive(Debug, Clone, Default)]
pub struct SourceSpec {
    /// Source tree path; defaults to the current directory.
    pub path: Option<PathBuf>,
    /// Host carrying the source, when it is not the local machine.
    pub host: Option<String>,
}

/// Where the agent runs.
#[derive(Debug, Clone)]
pub enum TargetHost {
    Local,
    /// An existing host, by id or name, searched across providers.
    Existing(String),
    /// A new host created now by the named provider.
    New {
        provider: String,
        options: NewHostOptions,
    },
}

/// Validated input to the create pipeline; the CLI produces this.
#[derive(Clone)]
pub struct CreateOptions {
    pub source: SourceSpec,
    pub target: TargetHost,
    pub agent: CreateAgentOptions,
    /// Adopt an existing agent with the same name instead of failing.
    pub reuse: bool,
    /// Abort when the source tree has uncommitted changes (waived when a
    /// base branch is pinned).
    pub ensure_clean: bool,
    /// Block until the agent type reports readiness.
    pub await_ready: bool,
    /// Block until the agent reaches DONE or STOPPED.
    pub await_stopped: bool,
}

impl CreateOptions {
    pub fn new(agent: CreateAgentOptions) -> Self {
        Self {
            source: SourceSpec::default(),
            target: TargetHost::Local,
            agent,
            reuse: false,
            ensure_clean: true,
            await_ready: true,
            await_stopped: false,
        }
    }
}

/// What the pipeline produced.
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub host_id: roost_core::HostId,
    pub work_dir: PathBuf,
    pub reused: bool,
}

pub(crate) struct ResolvedTarget {
    pub(crate) host: Arc<Host>,
    pub(crate) provider: Option<Arc<dyn Provider>>,
}

impl Engine {
    /// Run the whole create pipeline.
    pub async fn create_agent(&self, options: &CreateOptions) -> Result<CreateOutcome, CreateError> {
        let mut options = options.clone();

        // Source resolution: a path on the local machine unless a source
        // host is named.
        let source_host = match &options.source.host {
            None => Arc::clone(&self.local_host),
            Some(reference) => self.resolve_host(reference).await?.host,
        };
        let source_path = options
            .source
            .path
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .ok_or_else(|| CreateError::UserInput("no source path".into()))?;

        // Target resolution; a new host may be created right here.
        let target = self.resolve_target(&options.target).await?;

        let source_is_git = GitContext::new(source_host.connector().clone(), &source_path)
            .is_git_repository()
            .await?;
        self.apply_copy_mode_default(&mut options, &target, source_is_git);

        // Reuse: same name on the target host adopts the existing agent.
        if let Some(name) = &options.agent.name {
            if let Some(existing) = target.host.find_agent_by_name(name.as_str()).await? {
                if options.reuse {
                    return self.reuse_agent(existing, &options).await;
                }
                return Err(CreateError::AgentExists(name.clone()));
            }
        }

        // Dirty-source guard, waived when a base branch pins the start
        // point.
        let base_branch_pinned = options
            .agent
            .git
            .as_ref()
            .and_then(|g| g.base_branch.as_ref())
            .is_some();
        if options.ensure_clean && source_is_git && !base_branch_pinned {
            let source_ctx = GitContext::new(source_host.connector().clone(), &source_path);
            if source_ctx.is_dirty().await? {
                return Err(CreateError::UserInput(
                    "source working tree has uncommitted changes; commit, stash, or pin a base branch"
                        .into(),
                ));
            }
        }

        let agent_id = AgentId::generate();

        // Work dir first, state second: the record stores the real path.
        let work_dir = if options.agent.is_copy_immediate {
            target
                .host
                .create_agent_work_dir(&source_host, &source_path, &options.agent, &agent_id)
                .await?
        } else {
            options
                .agent
                .target_path
                .clone()
                .unwrap_or_else(|| source_path.clone())
        };

        let agent = target
            .host
            .create_agent_state(&work_dir, &options.agent, agent_id.clone())
            .await?;
        if let Some(provider) = &target.provider {
            provider
                .persist_agent_data(target.host.id(), &agent.record().await?)
                .await?;
        }

        target.host.provision_agent(&agent, &options.agent).await?;
        target.host.start_agents(std::slice::from_ref(&agent_id)).await?;

        self.post_create(&agent, &options).await?;

        let record = agent.record().await?;
        Ok(CreateOutcome {
            agent_id,
            agent_name: record.name.to_string(),
            host_id: target.host.id().clone(),
            work_dir,
            reused: false,
        })
    }

    /// Run the pipeline detached; the caller owns the handle.
    pub fn create_agent_background(
        &self,
        options: CreateOptions,
    ) -> tokio::task::JoinHandle<Result<CreateOutcome, CreateError>> {
        let engine = self.clone();
        tokio::spawn(async move { engine.create_agent(&options).await })
    }

    async fn reuse_agent(
        &self,
        agent: Agent,
        options: &CreateOptions,
    ) -> Result<CreateOutcome, CreateError> {
        let host = Arc::clone(agent.host());
        let record = agent.record().await?;
        tracing::debug!(agent = %record.name, "reusing existing agent");

        let state = agent.lifecycle_state().await?;
        if state == AgentLifecycleState::Stopped {
            host.start_agents(std::slice::from_ref(agent.id())).await?;
        }

        self.post_create(&agent, options).await?;

        Ok(CreateOutcome {
            agent_id: agent.id().clone(),
            agent_name: record.name.to_string(),
            host_id: host.id().clone(),
            work_dir: record.work_dir,
            reused: true,
        })
    }

    /// Post-create actions: await readiness, inject the initial message,
    /// await stop.
    async fn post_create(&self, agent: &Agent, options: &CreateOptions) -> Result<(), CreateError> {
        let agent_type = agent.agent_type().await?;

        if options.await_ready {
            let timeout = Duration::from_secs_f64(options.agent.ready_timeout_seconds.max(0.0));
            agent_type.wait_for_ready_signal(agent, timeout).await?;
        }

        if let Some(message) = &options.agent.initial_message {
            if options.agent.message_delay_seconds > 0.0 {
                tokio::time::sleep(Duration::from_secs_f64(options.agent.message_delay_seconds))
                    .await;
            }
            agent.send_message(message).await?;
        }

        if options.await_stopped {
            loop {
                let state = agent.lifecycle_state().await?;
                if matches!(
                    state,
                    AgentLifecycleState::Done | AgentLifecycleState::Stopped
                ) {
                    break;
                }
                tokio::time::sleep(STOPPED_POLL_INTERVAL).await;
            }
        }

        Ok(())
    }

    /// Default copy mode: WORKTREE when source and target share the local
    /// machine and the source is in git; COPY otherwise. Remote targets
    /// always COPY.
    fn apply_copy_mode_default(
        &self,
        options: &mut CreateOptions,
        target: &ResolvedTarget,
        source_is_git: bool,
    ) {
        let Some(git) = options.agent.git.as_mut() else {
            return; // in-place requested explicitly
        };
        if git.copy_mode.is_some() {
            return;
        }
        let target_is_local = target.host.is_local();
        git.copy_mode = Some(if target_is_local && source_is_git {
            WorkDirCopyMode::Worktree
        } else {
            WorkDirCopyMode::Copy
        });
    }

    async fn resolve_target(&self, target: &TargetHost) -> Result<ResolvedTarget, CreateError> {
        match target {
            TargetHost::Local => Ok(ResolvedTarget {
                host: Arc::clone(&self.local_host),
                provider: None,
            }),
            TargetHost::Existing(reference) => self.resolve_host(reference).await,
            TargetHost::New { provider, options } => {
                let provider = self
                    .provider(provider)
                    .ok_or_else(|| CreateError::UnknownProvider(provider.clone()))?;
                let host = provider.create_host(options).await?;
                Ok(ResolvedTarget {
                    host,
                    provider: Some(Arc::clone(provider)),
                })
            }
        }
    }

    /// Find a host by id or name across all providers; the first provider
    /// that knows it wins. The host is started if it was stopped.
    async fn resolve_host(&self, reference: &str) -> Result<ResolvedTarget, CreateError> {
        let found = self.find_host(reference).await?;
        if let Some(provider) = &found.provider {
            // start_host is a no-op for a host that is already up.
            let host = provider.start_host(found.host.id(), None).await?;
            return Ok(ResolvedTarget {
                host,
                provider: Some(Arc::clone(provider)),
            });
        }
        Ok(found)
    }

    /// Find a host by id or name across all providers, without starting it.
    pub(crate) async fn find_host(&self, reference: &str) -> Result<ResolvedTarget, CreateError> {
        let parsed = HostReference::parse(reference);
        let mut last_error: Option<roost_provider::ProviderError> = None;
        for provider in self.providers() {
            match provider.get_host(&parsed).await {
                Ok(host) => {
                    return Ok(ResolvedTarget {
                        host,
                        provider: Some(Arc::clone(provider)),
                    });
                }
                Err(roost_provider::ProviderError::HostNotFound(_)) => continue,
                Err(e) => last_error = Some(e),
            }
        }
        match last_error {
            Some(e) => Err(e.into()),
            None => Err(CreateError::Provider(
                roost_provider::ProviderError::HostNotFound(reference.to_string()),
            )),
        }
    }
}

#[cfg(test)]
#[path = "create_tests.rs"]
mod tests;
