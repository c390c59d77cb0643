// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable option structs consumed by the create pipeline.
//!
//! The CLI (an external collaborator) validates user input and hands the
//! core one of these. Nothing here is persisted directly; persisted forms
//! live in [`crate::records`].

use crate::id::{AgentName, HostName, SnapshotId};
use crate::state::{ActivitySource, IdleMode, WorkDirCopyMode};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// A command with an optional tmux window name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedCommand {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_name: Option<String>,
}

impl NamedCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            window_name: None,
        }
    }

    pub fn with_window_name(command: impl Into<String>, window_name: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            window_name: Some(window_name.into()),
        }
    }
}

/// A single KEY=VALUE pair; later entries shadow earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Git-related work-dir options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentGitOptions {
    /// `None` means in-place: target = source, no transfer.
    pub copy_mode: Option<WorkDirCopyMode>,
    pub base_branch: Option<String>,
    pub is_new_branch: bool,
    pub new_branch_name: Option<String>,
    pub new_branch_prefix: String,
    pub depth: Option<u32>,
    pub shallow_since: Option<String>,
    pub is_git_synced: bool,
    pub is_include_unclean: bool,
    pub is_include_gitignored: bool,
}

impl Default for AgentGitOptions {
    fn default() -> Self {
        Self {
            copy_mode: Some(WorkDirCopyMode::Copy),
            base_branch: None,
            is_new_branch: true,
            new_branch_name: None,
            new_branch_prefix: crate::DEFAULT_BRANCH_PREFIX.to_string(),
            depth: None,
            shallow_since: None,
            is_git_synced: true,
            is_include_unclean: true,
            is_include_gitignored: false,
        }
    }
}

/// Non-git data transfer options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentDataOptions {
    pub is_rsync_enabled: bool,
    pub rsync_args: Option<String>,
}

/// Environment composition for agent commands.
///
/// Layering order: core-injected vars, programmatic defaults, each env_file
/// in order, explicit env_vars last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentEnvironmentOptions {
    pub env_vars: Vec<EnvVar>,
    pub env_files: Vec<PathBuf>,
    pub known_hosts: Vec<String>,
}

/// A file uploaded from the client during provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSpec {
    pub local_path: PathBuf,
    pub remote_path: PathBuf,
}

/// Text appended or prepended to a remote file during provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEditSpec {
    pub remote_path: PathBuf,
    pub text: String,
}

/// A file transfer declared by an agent type during provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransferSpec {
    pub local_path: PathBuf,
    /// Relative paths resolve against the agent's work dir.
    pub agent_path: PathBuf,
    pub is_required: bool,
}

/// User-supplied provisioning steps, applied in the documented order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisioningOptions {
    pub user_commands: Vec<String>,
    pub sudo_commands: Vec<String>,
    pub upload_files: Vec<UploadSpec>,
    pub append_to_files: Vec<TextEditSpec>,
    pub prepend_to_files: Vec<TextEditSpec>,
    pub create_directories: Vec<PathBuf>,
}

/// Everything the create pipeline needs to build one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateAgentOptions {
    pub agent_type: String,
    pub name: Option<AgentName>,
    /// Overrides the agent type's assembled command.
    pub command: Option<String>,
    pub additional_commands: Vec<NamedCommand>,
    pub agent_args: Vec<String>,
    pub user: Option<String>,
    pub target_path: Option<PathBuf>,
    pub is_copy_immediate: bool,
    pub initial_message: Option<String>,
    pub resume_message: Option<String>,
    pub message_delay_seconds: f64,
    pub ready_timeout_seconds: f64,
    pub data_options: AgentDataOptions,
    pub git: Option<AgentGitOptions>,
    pub environment: AgentEnvironmentOptions,
    pub is_start_on_boot: bool,
    pub permissions: Vec<String>,
    pub label_options: IndexMap<String, String>,
    pub provisioning: ProvisioningOptions,
}

impl CreateAgentOptions {
    pub fn new(agent_type: impl Into<String>) -> Self {
        Self {
            agent_type: agent_type.into(),
            name: None,
            command: None,
            additional_commands: Vec::new(),
            agent_args: Vec::new(),
            user: None,
            target_path: None,
            is_copy_immediate: true,
            initial_message: None,
            resume_message: None,
            message_delay_seconds: 0.0,
            ready_timeout_seconds: 10.0,
            data_options: AgentDataOptions::default(),
            git: Some(AgentGitOptions::default()),
            environment: AgentEnvironmentOptions::default(),
            is_start_on_boot: false,
            permissions: Vec::new(),
            label_options: IndexMap::new(),
            provisioning: ProvisioningOptions::default(),
        }
    }

    /// The effective copy mode; `None` means in-place.
    pub fn copy_mode(&self) -> Option<WorkDirCopyMode> {
        self.git.as_ref().and_then(|g| g.copy_mode)
    }
}

/// Idle behavior requested for a new host; resolved against provider
/// defaults at host-create time, then frozen in `CertifiedHostData`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostLifecycleOptions {
    pub idle_timeout_seconds: Option<u64>,
    pub idle_mode: IdleMode,
    pub activity_sources: Option<BTreeSet<ActivitySource>>,
}

impl HostLifecycleOptions {
    /// Fill unset fields from provider defaults.
    pub fn resolve(
        &self,
        default_idle_timeout_seconds: Option<u64>,
        default_sources: &BTreeSet<ActivitySource>,
    ) -> (Option<u64>, BTreeSet<ActivitySource>) {
        let timeout = match self.idle_mode {
            IdleMode::Disabled => None,
            _ => self.idle_timeout_seconds.or(default_idle_timeout_seconds),
        };
        let sources = self
            .activity_sources
            .clone()
            .unwrap_or_else(|| default_sources.clone());
        (timeout, sources)
    }
}

/// Options for creating a brand-new host as part of agent creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewHostOptions {
    pub name: Option<HostName>,
    pub image: Option<String>,
    pub build_args: Vec<String>,
    pub start_args: Vec<String>,
    pub tags: IndexMap<String, String>,
    pub lifecycle: HostLifecycleOptions,
    pub known_hosts: Vec<String>,
    pub snapshot: Option<SnapshotId>,
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
