// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent destruction across the host and provider layers.

use crate::{CreateError, Engine};
use roost_core::AgentId;
use std::sync::Arc;

impl Engine {
    /// Destroy an agent: tear down its tmux session and process tree,
    /// remove its state directory and any generated work dir on the host,
    /// then remove its persisted out-of-band data from the provider store.
    ///
    /// `host` is an id or name resolved across providers; `None` targets
    /// the local host, which keeps no out-of-band data.
    pub async fn destroy_agent(
        &self,
        host: Option<&str>,
        agent_id: &AgentId,
    ) -> Result<(), CreateError> {
        let target = match host {
            None => crate::create::ResolvedTarget {
                host: Arc::clone(&self.local_host),
                provider: None,
            },
            Some(reference) => self.find_host(reference).await?,
        };

        target.host.destroy_agent(agent_id).await?;

        if let Some(provider) = &target.provider {
            provider
                .remove_persisted_agent_data(target.host.id(), agent_id)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "destroy_tests.rs"]
mod tests;
