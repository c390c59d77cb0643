// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-host file layout.
//!
//! ```text
//! <host_dir>/
//!   data.json                  certified host data
//!   activity/<source>          host-scoped activity files (boot)
//!   host_lock                  advisory lock target
//!   env                        host env vars, k=v lines
//!   tmux.conf                  multiplexer config
//!   commands/shutdown.sh       provider-specific shutdown
//!   worktrees/<agent_id>/      WORKTREE work dirs
//!   agents/<agent_id>/
//!     data.json                agent record
//!     environment              agent env overrides
//!     activity/<source>
//!     status/{url,start_time,status.md}
//!     plugin/<plugin_name>/<file>
//!     waiting                  sentinel written by agent hooks
//!     session_started          sentinel written by startup hook
//! ```

use roost_core::{ActivitySource, AgentId};
use std::path::{Path, PathBuf};

/// Path helpers rooted at one host's state directory.
#[derive(Debug, Clone)]
pub struct HostPaths {
    host_dir: PathBuf,
}

impl HostPaths {
    pub fn new(host_dir: impl Into<PathBuf>) -> Self {
        Self {
            host_dir: host_dir.into(),
        }
    }

    /// The default host dir for a given home directory.
    pub fn default_under_home(home: &Path) -> Self {
        Self::new(home.join(".roost").join("host"))
    }

    pub fn host_dir(&self) -> &Path {
        &self.host_dir
    }

    pub fn certified_data(&self) -> PathBuf {
        self.host_dir.join("data.json")
    }

    pub fn host_activity(&self, source: ActivitySource) -> PathBuf {
        self.host_dir.join("activity").join(source.file_name())
    }

    pub fn lock_file(&self) -> PathBuf {
        self.host_dir.join("host_lock")
    }

    pub fn host_env(&self) -> PathBuf {
        self.host_dir.join("env")
    }

    pub fn tmux_config(&self) -> PathBuf {
        self.host_dir.join("tmux.conf")
    }

    pub fn shutdown_script(&self) -> PathBuf {
        self.host_dir.join("commands").join("shutdown.sh")
    }

    pub fn worktrees_dir(&self) -> PathBuf {
        self.host_dir.join("worktrees")
    }

    pub fn worktree(&self, agent_id: &AgentId) -> PathBuf {
        self.worktrees_dir().join(agent_id.as_str())
    }

    pub fn agents_dir(&self) -> PathBuf {
        self.host_dir.join("agents")
    }

    pub fn agent_state_dir(&self, agent_id: &AgentId) -> PathBuf {
        self.agents_dir().join(agent_id.as_str())
    }

    pub fn agent_data(&self, agent_id: &AgentId) -> PathBuf {
        self.agent_state_dir(agent_id).join("data.json")
    }

    pub fn agent_env(&self, agent_id: &AgentId) -> PathBuf {
        self.agent_state_dir(agent_id).join("environment")
    }

    pub fn agent_activity(&self, agent_id: &AgentId, source: ActivitySource) -> PathBuf {
        self.agent_state_dir(agent_id)
            .join("activity")
            .join(source.file_name())
    }

    pub fn agent_status(&self, agent_id: &AgentId, file: &str) -> PathBuf {
        self.agent_state_dir(agent_id).join("status").join(file)
    }

    pub fn agent_plugin_file(&self, agent_id: &AgentId, plugin: &str, file: &str) -> PathBuf {
        self.agent_state_dir(agent_id)
            .join("plugin")
            .join(plugin)
            .join(file)
    }

    /// Sentinel: the agent is awaiting input.
    pub fn agent_waiting(&self, agent_id: &AgentId) -> PathBuf {
        self.agent_state_dir(agent_id).join("waiting")
    }

    /// Sentinel: the agent's startup hook ran.
    pub fn agent_session_started(&self, agent_id: &AgentId) -> PathBuf {
        self.agent_state_dir(agent_id).join("session_started")
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
