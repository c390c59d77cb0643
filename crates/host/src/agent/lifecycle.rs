// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle classification from tmux pane state.
//!
//! Classification is a pure function of (session-exists, pane_dead,
//! current_command, descendant process names, waiting sentinel); the async
//! wrapper only gathers those inputs.

use super::Agent;
use crate::{AgentError, PROBE_TIMEOUT, TMUX_TIMEOUT};
use roost_connector::{sh_quote, ExecOptions};
use roost_core::AgentLifecycleState;
use std::collections::HashMap;

/// Parsed `#{pane_dead}|#{pane_current_command}|#{pane_pid}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneStatus {
    pub dead: bool,
    pub current_command: String,
    pub pane_pid: String,
}

/// Parse the tmux format line; malformed output is `None` (treated as no
/// session).
pub fn parse_pane_line(line: &str) -> Option<PaneStatus> {
    let parts: Vec<&str> = line.trim().split('|').collect();
    if parts.len() != 3 {
        return None;
    }
    Some(PaneStatus {
        dead: parts[0] == "1",
        current_command: parts[1].to_string(),
        pane_pid: parts[2].to_string(),
    })
}

/// Names of all descendants of `root_pid` from `ps -e -o pid=,ppid=,comm=`
/// output.
pub fn descendant_process_names(root_pid: &str, ps_output: &str) -> Vec<String> {
    let mut children_by_ppid: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut comm_by_pid: HashMap<&str, &str> = HashMap::new();

    for line in ps_output.lines() {
        let mut parts = line.split_whitespace();
        if let (Some(pid), Some(ppid), Some(comm)) = (parts.next(), parts.next(), parts.next()) {
            comm_by_pid.insert(pid, comm);
            children_by_ppid.entry(ppid).or_default().push(pid);
        }
    }

    let mut names = Vec::new();
    let mut queue: Vec<&str> = children_by_ppid.get(root_pid).cloned().unwrap_or_default();
    while let Some(pid) = queue.pop() {
        if let Some(comm) = comm_by_pid.get(pid) {
            names.push((*comm).to_string());
        }
        if let Some(children) = children_by_ppid.get(pid) {
            queue.extend(children.iter().copied());
        }
    }
    names
}

pub fn is_shell_command(command: &str) -> bool {
    matches!(
        command,
        "bash" | "sh" | "zsh" | "fish" | "dash" | "ksh" | "tcsh" | "csh"
    )
}

/// The pure classification rules.
///
/// `descendants` is consulted only when the foreground command does not
/// match; pass what `ps` reported at the time of the pane query.
pub fn classify(
    pane: Option<&PaneStatus>,
    expected_name: &str,
    has_waiting_sentinel: bool,
    descendants: &[String],
) -> AgentLifecycleState {
    let Some(pane) = pane else {
        return AgentLifecycleState::Stopped;
    };
    if pane.dead {
        return AgentLifecycleState::Done;
    }

    let running_state = if has_waiting_sentinel {
        AgentLifecycleState::Waiting
    } else {
        AgentLifecycleState::Running
    };

    if pane.current_command == expected_name {
        return running_state;
    }

    // Complex constructs (shell wrappers, `a || b`) put the real process
    // below the pane's shell.
    if descendants.iter().any(|name| name == expected_name) {
        return running_state;
    }
    if descendants.iter().any(|name| !is_shell_command(name)) {
        return AgentLifecycleState::Replaced;
    }

    if is_shell_command(&pane.current_command) {
        AgentLifecycleState::Done
    } else {
        AgentLifecycleState::Replaced
    }
}

impl Agent {
    /// Compute the lifecycle state from one tmux query, the process table,
    /// and the waiting sentinel.
    pub async fn lifecycle_state(&self) -> Result<AgentLifecycleState, AgentError> {
        let record = self.record().await?;
        let session_name = self.host().session_name_for(&record.name);

        let result = self
            .host()
            .execute_command_with(
                &format!(
                    "tmux list-panes -t {} -F '#{{pane_dead}}|#{{pane_current_command}}|#{{pane_pid}}' 2>/dev/null | head -n 1",
                    sh_quote(&session_name)
                ),
                ExecOptions::with_timeout(TMUX_TIMEOUT),
            )
            .await?;

        let pane = if result.success {
            parse_pane_line(&result.stdout)
        } else {
            None
        };
        let Some(pane) = pane else {
            tracing::trace!(agent = %record.name, "lifecycle: STOPPED (no tmux session)");
            return Ok(AgentLifecycleState::Stopped);
        };
        if pane.dead {
            tracing::trace!(agent = %record.name, "lifecycle: DONE (pane process died)");
            return Ok(AgentLifecycleState::Done);
        }

        let agent_type = self.agent_type().await?;
        let expected = agent_type.expected_process_name(&record.command);
        let waiting = self.has_waiting_sentinel().await?;

        // The process table is only needed when the foreground command does
        // not match the expected name.
        let descendants = if pane.current_command == expected {
            Vec::new()
        } else {
            let ps = self
                .host()
                .execute_command_with(
                    "ps -e -o pid=,ppid=,comm= 2>/dev/null",
                    ExecOptions::with_timeout(PROBE_TIMEOUT),
                )
                .await?;
            if ps.success {
                descendant_process_names(&pane.pane_pid, &ps.stdout)
            } else {
                Vec::new()
            }
        };

        let state = classify(Some(&pane), &expected, waiting, &descendants);
        tracing::trace!(agent = %record.name, state = %state, "lifecycle classified");
        Ok(state)
    }

    /// Expected foreground process basename for this agent.
    pub async fn expected_process_name(&self) -> Result<String, AgentError> {
        let record = self.record().await?;
        let agent_type = self.agent_type().await?;
        Ok(agent_type.expected_process_name(&record.command))
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
