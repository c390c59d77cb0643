// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH connector over the OpenSSH client.
//!
//! One exec channel per command via a shared control-master connection.
//! Host keys are checked strictly against a provider-owned known_hosts file;
//! there is no interactive prompting (`BatchMode=yes`).

use crate::quote::{sh_quote, sh_quote_path};
use crate::subprocess::{run_with_stdin_timeout, run_with_timeout};
use crate::{is_connection_lost_message, CommandResult, Connector, ConnectorError, ExecOptions};
use async_trait::async_trait;
use base64::Engine as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything needed to reach one remote host over SSH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub user: String,
    pub host: String,
    pub port: u16,
    pub private_key_path: PathBuf,
    pub known_hosts_path: PathBuf,
}

impl SshTarget {
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// The `-e` transport string handed to rsync and `GIT_SSH_COMMAND`.
    pub fn transport_command(&self) -> String {
        format!(
            "ssh -i {} -p {} -o UserKnownHostsFile={} -o StrictHostKeyChecking=yes -o BatchMode=yes",
            sh_quote_path(&self.private_key_path),
            self.port,
            sh_quote_path(&self.known_hosts_path),
        )
    }
}

/// Connector for a remote host.
#[derive(Debug, Clone)]
pub struct SshConnector {
    target: SshTarget,
    control_path: PathBuf,
}

impl SshConnector {
    pub fn new(target: SshTarget) -> Self {
        let control_path = std::env::temp_dir().join(format!(
            "roost-ssh-{}-{}.sock",
            target.host, target.port
        ));
        Self {
            target,
            control_path,
        }
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-i")
            .arg(&self.target.private_key_path)
            .arg("-p")
            .arg(self.target.port.to_string())
            .arg("-o")
            .arg(format!(
                "UserKnownHostsFile={}",
                self.target.known_hosts_path.display()
            ))
            .arg("-o")
            .arg("StrictHostKeyChecking=yes")
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg("ControlMaster=auto")
            .arg("-o")
            .arg(format!("ControlPath={}", self.control_path.display()))
            .arg("-o")
            .arg("ControlPersist=60")
            .arg(self.target.destination());
        cmd
    }

    /// Compose the remote command line from cwd, env, and privilege options.
    fn compose_remote_command(cmd: &str, opts: &ExecOptions) -> String {
        let mut prefix = String::new();
        for (key, value) in &opts.env {
            prefix.push_str(&format!("export {}={} && ", sh_quote(key), sh_quote(value)));
        }
        if let Some(cwd) = &opts.cwd {
            prefix.push_str(&format!("cd {} && ", sh_quote_path(cwd)));
        }
        let body = format!("{}{}", prefix, cmd);
        if let Some(user) = &opts.user {
            format!("sudo -n -u {} sh -c {}", sh_quote(user), sh_quote(&body))
        } else if opts.as_root {
            format!("sudo -n sh -c {}", sh_quote(&body))
        } else {
            body
        }
    }

    fn classify(
        &self,
        output: std::process::Output,
        description: &str,
    ) -> Result<CommandResult, ConnectorError> {
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        // ssh reserves 255 for its own failures; the remote command's exit
        // code is anything else.
        if output.status.code() == Some(255) || is_connection_lost_message(&stderr) {
            tracing::debug!(%description, stderr = %stderr, "ssh transport failure");
            return Err(ConnectorError::ConnectionLost(stderr.trim().to_string()));
        }

        Ok(CommandResult {
            success: output.status.success(),
            stdout,
            stderr,
            exit_code: output.status.code(),
        })
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn run_shell_command(
        &self,
        cmd: &str,
        opts: ExecOptions,
    ) -> Result<CommandResult, ConnectorError> {
        let remote = Self::compose_remote_command(cmd, &opts);
        let mut command = self.base_command();
        command.arg("--").arg(&remote);

        tracing::trace!(host = %self.target.host, cmd = %remote, "running remote command");
        let output = run_with_timeout(command, opts.timeout, "remote command").await?;
        self.classify(output, "remote command")
    }

    async fn get_file(&self, path: &Path) -> Result<Vec<u8>, ConnectorError> {
        let remote = format!("base64 < {}", sh_quote_path(path));
        let mut command = self.base_command();
        command.arg("--").arg(&remote);

        let output = run_with_timeout(command, crate::DEFAULT_COMMAND_TIMEOUT, "remote read").await?;
        let result = self.classify(output, "remote read")?;
        if !result.success {
            if result.stderr.contains("No such file") {
                return Err(ConnectorError::FileNotFound(path.to_path_buf()));
            }
            return Err(ConnectorError::Process {
                description: "remote read".to_string(),
                message: result.output_for_error().to_string(),
            });
        }

        let encoded: String = result.stdout.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| ConnectorError::Process {
                description: "remote read".to_string(),
                message: format!("base64 decode: {}", e),
            })
    }

    async fn put_file(&self, content: &[u8], path: &Path) -> Result<(), ConnectorError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(content);

        let write_cmd = format!("base64 -d > {}", sh_quote_path(path));
        let mut command = self.base_command();
        command.arg("--").arg(&write_cmd);
        let output = run_with_stdin_timeout(
            command,
            encoded.as_bytes(),
            crate::DEFAULT_COMMAND_TIMEOUT,
            "remote write",
        )
        .await?;
        let result = self.classify(output, "remote write")?;
        if result.success {
            return Ok(());
        }

        if !result.stderr.contains("No such file") {
            return Err(ConnectorError::Process {
                description: "remote write".to_string(),
                message: result.output_for_error().to_string(),
            });
        }

        // Lazy parent creation, then one retry.
        let parent = path.parent().unwrap_or_else(|| Path::new("/"));
        let retry_cmd = format!(
            "mkdir -p {} && base64 -d > {}",
            sh_quote_path(parent),
            sh_quote_path(path)
        );
        let mut command = self.base_command();
        command.arg("--").arg(&retry_cmd);
        let output = run_with_stdin_timeout(
            command,
            encoded.as_bytes(),
            crate::DEFAULT_COMMAND_TIMEOUT,
            "remote write",
        )
        .await?;
        let result = self.classify(output, "remote write")?;
        if !result.success {
            return Err(ConnectorError::Process {
                description: "remote write".to_string(),
                message: result.output_for_error().to_string(),
            });
        }
        Ok(())
    }

    async fn disconnect(&self) {
        let mut command = Command::new("ssh");
        command
            .arg("-o")
            .arg(format!("ControlPath={}", self.control_path.display()))
            .arg("-O")
            .arg("exit")
            .arg("-p")
            .arg(self.target.port.to_string())
            .arg(self.target.destination());
        if let Err(e) = run_with_timeout(command, DISCONNECT_TIMEOUT, "ssh control exit").await {
            tracing::debug!(error = %e, "control master teardown failed (already gone?)");
        }
    }

    fn is_local(&self) -> bool {
        false
    }

    fn ssh_target(&self) -> Option<&SshTarget> {
        Some(&self.target)
    }
}

#[cfg(test)]
#[path = "ssh_tests.rs"]
mod tests;
