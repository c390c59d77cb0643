// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers.

use crate::ConnectorError;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Run a subprocess command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`, converting timeout
/// expiration into a typed error. The child is killed automatically when the
/// timeout elapses (tokio `Child` drop behavior).
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, ConnectorError> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(ConnectorError::Process {
            description: description.to_string(),
            message: io_err.to_string(),
        }),
        Err(_elapsed) => Err(ConnectorError::Timeout {
            description: description.to_string(),
            timeout,
        }),
    }
}

/// Run a subprocess with bytes fed to stdin and a timeout.
pub async fn run_with_stdin_timeout(
    mut cmd: Command,
    stdin_bytes: &[u8],
    timeout: Duration,
    description: &str,
) -> Result<Output, ConnectorError> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let run = async {
        let mut child = cmd.spawn().map_err(|e| ConnectorError::Process {
            description: description.to_string(),
            message: e.to_string(),
        })?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(stdin_bytes)
                .await
                .map_err(|e| ConnectorError::Process {
                    description: description.to_string(),
                    message: format!("writing stdin: {}", e),
                })?;
            drop(stdin);
        }
        child
            .wait_with_output()
            .await
            .map_err(|e| ConnectorError::Process {
                description: description.to_string(),
                message: e.to_string(),
            })
    };

    match tokio::time::timeout(timeout, run).await {
        Ok(result) => result,
        Err(_elapsed) => Err(ConnectorError::Timeout {
            description: description.to_string(),
            timeout,
        }),
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
