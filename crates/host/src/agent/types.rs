// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in agent types.
//!
//! Vendor-specific provisioning (trust dialogs, credential merging,
//! settings mirroring) is not core scope; concrete vendor types implement
//! [`AgentType`] on top of these.

use super::{command_basename, Agent, AgentType};
use crate::AgentError;
use async_trait::async_trait;
use std::time::Duration;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Plain subprocess agent: line-buffered, no TUI, simple message sends.
#[derive(Debug, Clone)]
pub struct GenericAgentType {
    type_name: String,
}

impl Default for GenericAgentType {
    fn default() -> Self {
        Self {
            type_name: "generic".to_string(),
        }
    }
}

#[async_trait]
impl AgentType for GenericAgentType {
    fn name(&self) -> &str {
        &self.type_name
    }

    fn assemble_command(&self, agent_args: &[String]) -> String {
        if agent_args.is_empty() {
            "bash".to_string()
        } else {
            agent_args.join(" ")
        }
    }
}

/// Interactive TUI agent: echoes input, distinguishes newline from submit.
///
/// Uses marker-based message injection and waits for the startup hook's
/// `session_started` sentinel before the first message.
#[derive(Debug, Clone)]
pub struct TuiAgentType {
    type_name: String,
    process_name: Option<String>,
    ready_indicator: Option<String>,
    enter_delay: Duration,
}

impl TuiAgentType {
    pub fn named(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            process_name: None,
            ready_indicator: None,
            enter_delay: Duration::from_millis(500),
        }
    }

    /// Hardcode the expected process name, for commands wrapped in shell
    /// constructs.
    pub fn with_process_name(mut self, name: impl Into<String>) -> Self {
        self.process_name = Some(name.into());
        self
    }

    /// Pane text that signals the TUI is ready for input.
    pub fn with_ready_indicator(mut self, indicator: impl Into<String>) -> Self {
        self.ready_indicator = Some(indicator.into());
        self
    }

    pub fn with_enter_delay(mut self, delay: Duration) -> Self {
        self.enter_delay = delay;
        self
    }
}

#[async_trait]
impl AgentType for TuiAgentType {
    fn name(&self) -> &str {
        &self.type_name
    }

    fn assemble_command(&self, agent_args: &[String]) -> String {
        if agent_args.is_empty() {
            self.type_name.clone()
        } else {
            agent_args.join(" ")
        }
    }

    fn expected_process_name(&self, command: &str) -> String {
        self.process_name
            .clone()
            .unwrap_or_else(|| command_basename(command))
    }

    fn uses_marker_injection(&self) -> bool {
        true
    }

    fn tui_ready_indicator(&self) -> Option<String> {
        self.ready_indicator.clone()
    }

    fn enter_delay(&self) -> Duration {
        self.enter_delay
    }

    /// Poll for the `session_started` sentinel the startup hook writes.
    async fn wait_for_ready_signal(
        &self,
        agent: &Agent,
        timeout: Duration,
    ) -> Result<(), AgentError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if agent.has_session_started_sentinel().await? {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                let name = agent
                    .name()
                    .await
                    .unwrap_or_else(|_| roost_core::AgentName::new(agent.id().as_str()));
                return Err(AgentError::ReadyTimeout { name, timeout });
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
