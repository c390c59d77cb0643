// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local connector: fork/exec plus direct filesystem access.

use crate::quote::sh_quote;
use crate::subprocess::run_with_timeout;
use crate::{CommandResult, Connector, ConnectorError, ExecOptions};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Connector for the local machine.
///
/// Commands run through `sh -c`; file operations bypass the shell entirely
/// (the local fast path).
#[derive(Debug, Clone, Default)]
pub struct LocalConnector;

impl LocalConnector {
    pub fn new() -> Self {
        Self
    }
}

/// Wrap a command for a different user or root.
///
/// `sudo -n` so a missing sudoers entry fails fast instead of prompting.
fn wrap_privilege(cmd: &str, opts: &ExecOptions) -> String {
    if let Some(user) = &opts.user {
        format!("sudo -n -u {} sh -c {}", sh_quote(user), sh_quote(cmd))
    } else if opts.as_root {
        format!("sudo -n sh -c {}", sh_quote(cmd))
    } else {
        cmd.to_string()
    }
}

#[async_trait]
impl Connector for LocalConnector {
    async fn run_shell_command(
        &self,
        cmd: &str,
        opts: ExecOptions,
    ) -> Result<CommandResult, ConnectorError> {
        let wrapped = wrap_privilege(cmd, &opts);

        let mut command = Command::new("sh");
        command.arg("-c").arg(&wrapped);
        if let Some(cwd) = &opts.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &opts.env {
            command.env(key, value);
        }

        tracing::trace!(cmd = %wrapped, "running local command");
        let output = run_with_timeout(command, opts.timeout, "local command").await?;

        Ok(CommandResult {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
        })
    }

    async fn get_file(&self, path: &Path) -> Result<Vec<u8>, ConnectorError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ConnectorError::FileNotFound(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put_file(&self, content: &[u8], path: &Path) -> Result<(), ConnectorError> {
        match tokio::fs::write(path, content).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Lazy parent creation on first not-found failure.
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                Ok(tokio::fs::write(path, content).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn disconnect(&self) {}

    fn is_local(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
