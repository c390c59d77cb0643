// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! roost-connector: the four-primitive abstraction every host needs.
//!
//! A [`Connector`] runs shell commands and moves files on one host, local or
//! remote. Local hosts fork subprocesses and touch the filesystem directly;
//! remote hosts go through the OpenSSH client with strict host-key checking.
//! Transport failures normalize to [`ConnectorError::ConnectionLost`] so
//! callers can evict caches and rediscover the endpoint.

mod local;
mod quote;
mod ssh;
pub mod subprocess;

pub use local::LocalConnector;
pub use quote::{sh_quote, sh_quote_path};
pub use ssh::{SshConnector, SshTarget};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ConnectorCall, FakeConnector, FakeReply};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default timeout for remote commands. Never unbounded.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors from connector operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Transport dropped mid-operation. Recoverable by retry after the
    /// provider clears its caches.
    #[error("connection to host lost: {0}")]
    ConnectionLost(String),
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("{description} timed out after {}s", .timeout.as_secs())]
    Timeout {
        description: String,
        timeout: Duration,
    },
    #[error("{description} failed: {message}")]
    Process {
        description: String,
        message: String,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of one shell command.
#[derive(Debug, Clone, Default)]
pub struct CommandResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CommandResult {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    pub fn failed(stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
        }
    }

    /// stderr if nonempty, else stdout. For error messages.
    pub fn output_for_error(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// Execution options for one shell command.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    pub timeout: Duration,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    /// Run as this user (via sudo) instead of the connection user.
    pub user: Option<String>,
    pub as_root: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_COMMAND_TIMEOUT,
            env: Vec::new(),
            cwd: None,
            user: None,
            as_root: false,
        }
    }
}

impl ExecOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    pub fn in_dir(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
            ..Self::default()
        }
    }
}

/// The four primitives every host needs.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Run a shell command. Non-zero exit is a normal result, not an error;
    /// errors are transport or timeout failures.
    async fn run_shell_command(
        &self,
        cmd: &str,
        opts: ExecOptions,
    ) -> Result<CommandResult, ConnectorError>;

    /// Read a file. Missing files are [`ConnectorError::FileNotFound`].
    async fn get_file(&self, path: &Path) -> Result<Vec<u8>, ConnectorError>;

    /// Write a file. Parent-directory creation is attempted lazily if the
    /// first put fails with a not-found.
    async fn put_file(&self, content: &[u8], path: &Path) -> Result<(), ConnectorError>;

    /// Tear down any persistent transport state.
    async fn disconnect(&self);

    /// Local connectors let callers bypass the abstraction for reads.
    fn is_local(&self) -> bool;

    /// SSH details for commands that need their own transport (rsync, git).
    fn ssh_target(&self) -> Option<&SshTarget> {
        None
    }
}

/// Classify stderr/stdout text from a transport as a lost connection.
///
/// OpenSSH and the remote shell report dropped transports in a handful of
/// well-known phrasings.
pub(crate) fn is_connection_lost_message(text: &str) -> bool {
    const MARKERS: [&str; 7] = [
        "Connection closed",
        "Connection reset",
        "Connection timed out",
        "Broken pipe",
        "ssh_exchange_identification",
        "kex_exchange_identification",
        "Socket closed",
    ];
    MARKERS.iter().any(|m| text.contains(m))
}
