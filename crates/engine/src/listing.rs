// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming parallel host/agent enumeration with per-provider error
//! capture, plus the predicate filter.

use crate::Engine;
use chrono::{DateTime, Utc};
use roost_core::{AgentLifecycleState, FieldSource, FilterExpr, HostState};
use roost_host::Host;
use roost_provider::Provider;
use std::sync::Arc;
use tokio::task::JoinSet;

/// One agent as seen by a listing.
#[derive(Debug, Clone)]
pub struct AgentInfo {
    pub agent_id: String,
    pub agent_name: String,
    pub agent_type: String,
    pub host_id: String,
    pub host_name: String,
    pub provider: String,
    pub state: AgentLifecycleState,
    pub work_dir: String,
    pub create_time: DateTime<Utc>,
}

impl FieldSource for AgentInfo {
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" => Some(self.agent_id.clone()),
            "name" => Some(self.agent_name.clone()),
            "type" => Some(self.agent_type.clone()),
            "host" | "host_name" => Some(self.host_name.clone()),
            "host_id" => Some(self.host_id.clone()),
            "provider" => Some(self.provider.clone()),
            "state" => Some(self.state.to_string()),
            "work_dir" => Some(self.work_dir.clone()),
            _ => None,
        }
    }
}

/// A provider failure captured during enumeration; listing continues.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub provider: String,
    pub message: String,
}

/// Options for a batch listing.
#[derive(Debug, Clone)]
pub struct ListOptions {
    pub filter: FilterExpr,
    pub sort_field: Option<String>,
    pub reverse: bool,
    pub limit: Option<usize>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            filter: FilterExpr::True,
            sort_field: None,
            reverse: false,
            limit: None,
        }
    }
}

/// Result of a batch listing. The exit status is nonzero whenever errors
/// occurred, even with partial results.
#[derive(Debug, Clone, Default)]
pub struct ListOutput {
    pub agents: Vec<AgentInfo>,
    pub errors: Vec<ErrorInfo>,
}

impl Engine {
    /// Stream agents as providers finish, in completion order. Per-provider
    /// failures become [`ErrorInfo`] entries; the filter drops non-matching
    /// agents before emission. Streaming is incompatible with sorting.
    pub async fn list_agents_streaming<F>(
        &self,
        filter: &FilterExpr,
        mut emit: F,
    ) -> Vec<ErrorInfo>
    where
        F: FnMut(AgentInfo),
    {
        let mut errors = Vec::new();

        // The local host is its own enumeration source.
        match collect_host_agents(Arc::clone(&self.local_host), "local".to_string()).await {
            Ok(agents) => {
                for agent in agents {
                    if filter.matches(&agent) {
                        emit(agent);
                    }
                }
            }
            Err(message) => errors.push(ErrorInfo {
                provider: "local".to_string(),
                message,
            }),
        }

        let mut tasks: JoinSet<(String, Result<Vec<AgentInfo>, String>)> = JoinSet::new();
        for provider in self.providers() {
            let provider = Arc::clone(provider);
            let name = provider.name().to_string();
            tasks.spawn(async move {
                let result = collect_provider_agents(provider).await;
                (name, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(agents))) => {
                    for agent in agents {
                        if filter.matches(&agent) {
                            emit(agent);
                        }
                    }
                }
                Ok((name, Err(message))) => errors.push(ErrorInfo {
                    provider: name,
                    message,
                }),
                Err(join_error) => errors.push(ErrorInfo {
                    provider: "unknown".to_string(),
                    message: join_error.to_string(),
                }),
            }
        }
        errors
    }

    /// Collect, filter, sort, and limit.
    pub async fn list_agents(&self, options: &ListOptions) -> ListOutput {
        let mut agents = Vec::new();
        let errors = self
            .list_agents_streaming(&options.filter, |agent| agents.push(agent))
            .await;

        if let Some(field) = &options.sort_field {
            agents.sort_by(|a, b| {
                let left = a.field(field).unwrap_or_default();
                let right = b.field(field).unwrap_or_default();
                left.cmp(&right)
            });
        }
        if options.reverse {
            agents.reverse();
        }
        if let Some(limit) = options.limit {
            agents.truncate(limit);
        }

        ListOutput { agents, errors }
    }
}

/// All agents on one host, as listing rows.
async fn collect_host_agents(
    host: Arc<Host>,
    provider_name: String,
) -> Result<Vec<AgentInfo>, String> {
    let mut infos = Vec::new();
    let agents = host.agents().await.map_err(|e| e.to_string())?;
    for agent in agents {
        let record = agent.record().await.map_err(|e| e.to_string())?;
        let state = agent
            .lifecycle_state()
            .await
            .unwrap_or(AgentLifecycleState::Stopped);
        infos.push(AgentInfo {
            agent_id: record.id.to_string(),
            agent_name: record.name.to_string(),
            agent_type: record.agent_type,
            host_id: host.id().to_string(),
            host_name: host.name().to_string(),
            provider: provider_name.clone(),
            state,
            work_dir: record.work_dir.display().to_string(),
            create_time: record.create_time,
        });
    }
    Ok(infos)
}

async fn collect_provider_agents(provider: Arc<dyn Provider>) -> Result<Vec<AgentInfo>, String> {
    let provider_name = provider.name().to_string();
    let listings = provider
        .list_hosts(false)
        .await
        .map_err(|e| e.to_string())?;

    let mut infos = Vec::new();
    for listing in listings {
        // Only running hosts can be asked about their agents; stopped and
        // failed hosts contribute their persisted agent data.
        if listing.state == HostState::Running {
            let host = provider
                .get_host(&roost_provider::HostReference::Id(listing.host_id.clone()))
                .await
                .map_err(|e| e.to_string())?;
            infos.extend(collect_host_agents(host, provider_name.clone()).await?);
        } else {
            let persisted = provider
                .list_persisted_agent_data(&listing.host_id)
                .await
                .map_err(|e| e.to_string())?;
            for record in persisted {
                infos.push(AgentInfo {
                    agent_id: record.id.to_string(),
                    agent_name: record.name.to_string(),
                    agent_type: record.agent_type,
                    host_id: listing.host_id.to_string(),
                    host_name: listing.host_name.to_string(),
                    provider: provider_name.clone(),
                    state: AgentLifecycleState::Stopped,
                    work_dir: record.work_dir.display().to_string(),
                    create_time: record.create_time,
                });
            }
        }
    }
    Ok(infos)
}

#[cfg(test)]
#[path = "listing_tests.rs"]
mod tests;
