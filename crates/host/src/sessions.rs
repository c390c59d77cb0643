// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tmux session supervisor.
//!
//! One detachable session per agent, named `<prefix><agent-name>`. The
//! initial window runs a shell that sources the host env file, then the
//! agent env file, then execs an interactive shell; the primary command is
//! injected via send-keys so it lands in the shell's history and the user
//! can Ctrl-C and press Up to re-run it.

use crate::host::Host;
use crate::{HostError, STOP_GRACE, TMUX_TIMEOUT};
use roost_connector::{sh_quote, sh_quote_path, ExecOptions};
use roost_core::{ActivitySource, AgentId, AgentName, AgentRecord, NamedCommand};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

impl Host {
    pub fn session_name_for(&self, agent_name: &AgentName) -> String {
        format!("{}{}", self.session_prefix(), agent_name)
    }

    pub async fn session_exists(&self, session_name: &str) -> Result<bool, HostError> {
        let result = self
            .execute_command_with(
                &format!("tmux has-session -t {} 2>/dev/null", sh_quote(session_name)),
                ExecOptions::with_timeout(TMUX_TIMEOUT),
            )
            .await?;
        Ok(result.success)
    }

    /// Write the host-level tmux config shared by all agents.
    ///
    /// Key bindings are server-wide in tmux; per-agent configs would
    /// overwrite each other's bindings, so one host-level file resolves the
    /// session name at runtime instead.
    pub async fn create_host_tmux_config(&self) -> Result<std::path::PathBuf, HostError> {
        let config_path = self.paths().tmux_config();
        let lines = [
            "# roost host tmux config",
            "# Auto-generated - do not edit",
            "",
            "# Source user's default tmux config if it exists",
            "if-shell 'test -f ~/.tmux.conf' 'source-file ~/.tmux.conf'",
            "",
            "# Ctrl-q: detach and destroy the agent whose session this is",
            r##"bind -n C-q run-shell 'SESSION=$(tmux display-message -p "#{session_name}"); tmux detach-client -E "roost destroy --session $SESSION -f"'"##,
            "",
            "# Ctrl-t: detach and stop the agent whose session this is",
            r##"bind -n C-t run-shell 'SESSION=$(tmux display-message -p "#{session_name}"); tmux detach-client -E "roost stop --session $SESSION"'"##,
            "",
        ];
        self.write_text_file(&config_path, &lines.join("\n")).await?;
        Ok(config_path)
    }

    /// A shell command that sources host then agent env files and execs an
    /// interactive shell. Used as the session/window default command.
    pub fn env_shell_command(&self, agent_id: &AgentId) -> String {
        let host_env = self.paths().host_env();
        let agent_env = self.paths().agent_env(agent_id);
        let body = [
            "set -a".to_string(),
            format!(
                "[ -f {q} ] && . {q} || true",
                q = sh_quote_path(&host_env)
            ),
            format!(
                "[ -f {q} ] && . {q} || true",
                q = sh_quote_path(&agent_env)
            ),
            "set +a".to_string(),
            "exec bash".to_string(),
        ]
        .join("; ");
        format!("bash -c {}", sh_quote(&body))
    }

    /// Record agent-scoped activity; the file's mtime is normative.
    pub async fn record_agent_activity(
        &self,
        agent_id: &AgentId,
        source: ActivitySource,
    ) -> Result<(), HostError> {
        let path = self.paths().agent_activity(agent_id, source);
        let body = serde_json::json!({
            "time": chrono::Utc::now().timestamp_millis(),
            "agent_id": agent_id.as_str(),
        });
        self.write_text_file(&path, &format!("{}\n", body)).await
    }

    async fn tmux(&self, cmd: String, agent_name: &AgentName, what: &str) -> Result<(), HostError> {
        let result = self
            .execute_command_with(&cmd, ExecOptions::with_timeout(TMUX_TIMEOUT))
            .await?;
        if !result.success {
            return Err(HostError::AgentStart {
                name: agent_name.clone(),
                message: format!("{} failed: {}", what, result.output_for_error().trim()),
            });
        }
        Ok(())
    }

    /// Start agents by creating their tmux sessions.
    pub async fn start_agents(&self, agent_ids: &[AgentId]) -> Result<(), HostError> {
        tracing::debug!(count = agent_ids.len(), "starting agents");
        let tmux_config = self.create_host_tmux_config().await?;

        for agent_id in agent_ids {
            let record = self.read_agent_record(agent_id).await?;
            let session_name = self.session_name_for(&record.name);
            let env_shell = self.env_shell_command(agent_id);
            tracing::debug!(agent = %record.name, session = %session_name, "starting agent session");

            self.tmux(
                format!(
                    "tmux -f {} new-session -d -s {} -c {} {}",
                    sh_quote_path(&tmux_config),
                    sh_quote(&session_name),
                    sh_quote_path(&record.work_dir),
                    sh_quote(&env_shell),
                ),
                &record.name,
                "tmux new-session",
            )
            .await?;

            // New windows the user opens later get the same env sourcing.
            self.tmux(
                format!(
                    "tmux set-option -t {} default-command {}",
                    sh_quote(&session_name),
                    sh_quote(&env_shell),
                ),
                &record.name,
                "tmux set-option",
            )
            .await?;

            // Literal keys then Enter: the command becomes the first history
            // entry of the session's shell.
            self.tmux(
                format!(
                    "tmux send-keys -t {} -l {}",
                    sh_quote(&session_name),
                    sh_quote(&record.command),
                ),
                &record.name,
                "tmux send-keys",
            )
            .await?;
            self.tmux(
                format!("tmux send-keys -t {} Enter", sh_quote(&session_name)),
                &record.name,
                "tmux send-keys Enter",
            )
            .await?;

            for (idx, named) in record.additional_commands.iter().enumerate() {
                self.start_additional_window(&record, &session_name, &env_shell, idx, named)
                    .await?;
            }

            if !record.additional_commands.is_empty() {
                self.tmux(
                    format!("tmux select-window -t {}", sh_quote(&format!("{}:0", session_name))),
                    &record.name,
                    "tmux select-window",
                )
                .await?;
            }

            self.record_agent_activity(agent_id, ActivitySource::Start).await?;
            self.start_process_activity_monitor(agent_id, &session_name).await;
        }
        Ok(())
    }

    async fn start_additional_window(
        &self,
        record: &AgentRecord,
        session_name: &str,
        env_shell: &str,
        idx: usize,
        named: &NamedCommand,
    ) -> Result<(), HostError> {
        let window_name = named
            .window_name
            .clone()
            .unwrap_or_else(|| format!("cmd-{}", idx + 1));
        let target = format!("{}:{}", session_name, window_name);

        self.tmux(
            format!(
                "tmux new-window -t {} -n {} -c {} {}",
                sh_quote(session_name),
                sh_quote(&window_name),
                sh_quote_path(&record.work_dir),
                sh_quote(env_shell),
            ),
            &record.name,
            "tmux new-window",
        )
        .await?;
        self.tmux(
            format!(
                "tmux send-keys -t {} -l {}",
                sh_quote(&target),
                sh_quote(&named.command),
            ),
            &record.name,
            "tmux send-keys",
        )
        .await?;
        self.tmux(
            format!("tmux send-keys -t {} Enter", sh_quote(&target)),
            &record.name,
            "tmux send-keys Enter",
        )
        .await
    }

    /// Launch the detached background loop that writes `activity/process`
    /// every 5 seconds while the session's pane PID is alive.
    async fn start_process_activity_monitor(&self, agent_id: &AgentId, session_name: &str) {
        let activity_path = self
            .paths()
            .agent_activity(agent_id, ActivitySource::Process);

        let script = format!(
            r#"PANE_PID=$(tmux list-panes -t {session} -F '#{{pane_pid}}' 2>/dev/null | head -n 1)
if [ -z "$PANE_PID" ]; then
    exit 0
fi
ACTIVITY_PATH={activity}
mkdir -p "$(dirname "$ACTIVITY_PATH")"
while kill -0 "$PANE_PID" 2>/dev/null; do
    TIME_MS=$(($(date +%s) * 1000))
    printf '{{"time": %d, "pane_pid": %s, "agent_id": "%s"}}\n' "$TIME_MS" "$PANE_PID" {agent} > "$ACTIVITY_PATH"
    sleep 5
done
"#,
            session = sh_quote(session_name),
            activity = sh_quote_path(&activity_path),
            agent = sh_quote(agent_id.as_str()),
        );

        let cmd = format!(
            "nohup bash -c {} </dev/null >/dev/null 2>&1 &",
            sh_quote(&script)
        );
        match self.execute_command(&cmd).await {
            Ok(result) if !result.success => {
                tracing::warn!(
                    agent_id = %agent_id,
                    stderr = %result.stderr,
                    "failed to start process activity monitor"
                );
            }
            Err(e) => {
                tracing::warn!(agent_id = %agent_id, error = %e, "failed to start process activity monitor");
            }
            _ => {}
        }
    }

    /// All pane PIDs across all windows of a session, plus their
    /// descendants.
    pub async fn collect_session_pids(&self, session_name: &str) -> Result<Vec<String>, HostError> {
        let result = self
            .execute_command_with(
                &format!(
                    "tmux list-panes -s -t {} -F '#{{pane_pid}}' 2>/dev/null || true",
                    sh_quote(session_name)
                ),
                ExecOptions::with_timeout(TMUX_TIMEOUT),
            )
            .await?;

        let pane_pids: Vec<String> = result
            .stdout
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if pane_pids.is_empty() {
            return Ok(Vec::new());
        }

        let ps = self
            .execute_command("ps -e -o pid=,ppid= 2>/dev/null || true")
            .await?;
        let mut all = Vec::new();
        for pane_pid in &pane_pids {
            all.push(pane_pid.clone());
            all.extend(descendant_pids(pane_pid, &ps.stdout));
        }
        all.sort();
        all.dedup();
        Ok(all)
    }

    /// Stop agents by killing every process in their tmux sessions.
    ///
    /// SIGTERM goes to all PIDs in parallel inside one shell line; a serial
    /// loop would let one unresponsive process consume the whole timeout
    /// budget. Survivors get SIGKILL after `min(1s, timeout)`, and only then
    /// are the sessions themselves killed.
    pub async fn stop_agents(
        &self,
        agent_ids: &[AgentId],
        timeout: Duration,
    ) -> Result<(), HostError> {
        tracing::debug!(count = agent_ids.len(), timeout_s = timeout.as_secs_f64(), "stopping agents");

        let mut session_names = Vec::new();
        let mut all_pids: Vec<String> = Vec::new();
        for agent_id in agent_ids {
            let Ok(record) = self.read_agent_record(agent_id).await else {
                continue;
            };
            let session_name = self.session_name_for(&record.name);
            all_pids.extend(self.collect_session_pids(&session_name).await?);
            session_names.push(session_name);
        }

        if !all_pids.is_empty() {
            let pid_list = all_pids.join(" ");
            let grace = STOP_GRACE.min(timeout).as_secs_f64();
            self.execute_command(&format!(
                "for p in {pids}; do kill -TERM $p 2>/dev/null; done; \
                 sleep {grace}; \
                 for p in {pids}; do kill -KILL $p 2>/dev/null; done; true",
                pids = pid_list,
                grace = grace,
            ))
            .await?;
        }

        for session_name in &session_names {
            self.execute_command(&format!(
                "tmux kill-session -t {} 2>/dev/null || true",
                sh_quote(session_name)
            ))
            .await?;
        }
        Ok(())
    }

    /// Read and parse an agent's data.json.
    pub async fn read_agent_record(&self, agent_id: &AgentId) -> Result<AgentRecord, HostError> {
        let path = self.paths().agent_data(agent_id);
        let Some(content) = self.read_text_file_opt(&path).await? else {
            return Err(HostError::AgentNotFound(agent_id.clone(), self.id().clone()));
        };
        serde_json::from_str(&content).map_err(|e| HostError::MalformedState {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub async fn write_agent_record(&self, record: &AgentRecord) -> Result<(), HostError> {
        let path = self.paths().agent_data(&record.id);
        let content = serde_json::to_string_pretty(record)?;
        self.write_text_file(&path, &content).await
    }

    /// Resolve an agent error for a missing work dir during destroy.
    pub(crate) async fn remove_work_dir_if_generated(
        &self,
        work_dir: &Path,
    ) -> Result<(), HostError> {
        if self.is_generated_work_dir(work_dir).await? {
            tracing::debug!(work_dir = %work_dir.display(), "removing generated work dir");
            self.remove_directory(work_dir).await?;
            self.remove_generated_work_dir(work_dir).await?;
        }
        Ok(())
    }
}

/// All descendant PIDs of `root` from `ps -e -o pid=,ppid=` output.
pub(crate) fn descendant_pids(root: &str, ps_output: &str) -> Vec<String> {
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for line in ps_output.lines() {
        let mut parts = line.split_whitespace();
        if let (Some(pid), Some(ppid)) = (parts.next(), parts.next()) {
            children.entry(ppid).or_default().push(pid);
        }
    }

    let mut result = Vec::new();
    let mut queue: Vec<&str> = children.get(root).cloned().unwrap_or_default();
    while let Some(pid) = queue.pop() {
        result.push(pid.to_string());
        if let Some(grandchildren) = children.get(pid) {
            queue.extend(grandchildren.iter().copied());
        }
    }
    result.sort();
    result
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
