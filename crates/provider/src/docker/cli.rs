// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin wrapper over the `docker` CLI.

use crate::ProviderError;
use roost_connector::subprocess::{run_with_stdin_timeout, run_with_timeout};
use std::time::Duration;
use tokio::process::Command;

/// Default timeout for docker commands.
pub const DOCKER_TIMEOUT: Duration = Duration::from_secs(60);
/// Image builds and pulls move real data.
pub const DOCKER_BUILD_TIMEOUT: Duration = Duration::from_secs(1800);
/// Stopping a container honors its own grace period on top.
pub const DOCKER_STOP_TIMEOUT: Duration = Duration::from_secs(120);

/// Output of one docker invocation.
#[derive(Debug, Clone)]
pub struct DockerOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl DockerOutput {
    pub fn trimmed_stdout(&self) -> String {
        self.stdout.trim().to_string()
    }
}

/// Runs docker subcommands as subprocesses.
#[derive(Debug, Clone, Default)]
pub struct DockerCli;

impl DockerCli {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self, args: &[&str]) -> Result<DockerOutput, ProviderError> {
        self.run_with_timeout(args, DOCKER_TIMEOUT).await
    }

    pub async fn run_with_timeout(
        &self,
        args: &[&str],
        timeout: Duration,
    ) -> Result<DockerOutput, ProviderError> {
        let mut cmd = Command::new("docker");
        cmd.args(args);
        tracing::trace!(args = ?args, "docker");
        let output = run_with_timeout(cmd, timeout, "docker").await?;
        Ok(DockerOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Run with bytes on stdin (builds from an inline Dockerfile, state
    /// writes through `docker exec -i`).
    pub async fn run_with_stdin(
        &self,
        args: &[&str],
        stdin: &[u8],
        timeout: Duration,
    ) -> Result<DockerOutput, ProviderError> {
        let mut cmd = Command::new("docker");
        cmd.args(args);
        tracing::trace!(args = ?args, stdin_len = stdin.len(), "docker (stdin)");
        let output = run_with_stdin_timeout(cmd, stdin, timeout, "docker").await?;
        Ok(DockerOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Run and fail on non-zero exit.
    pub async fn run_ok(&self, args: &[&str]) -> Result<DockerOutput, ProviderError> {
        let output = self.run(args).await?;
        if !output.success {
            return Err(ProviderError::Operation(format!(
                "docker {} failed: {}",
                args.first().copied().unwrap_or(""),
                output.stderr.trim()
            )));
        }
        Ok(output)
    }
}

/// Parse the host port from `docker port <id> 22/tcp` output
/// (`0.0.0.0:49153`, possibly multiple lines for v4+v6).
pub fn parse_port_mapping(output: &str) -> Option<u16> {
    for line in output.lines() {
        if let Some(port) = line.trim().rsplit(':').next() {
            if let Ok(port) = port.parse::<u16>() {
                return Some(port);
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
