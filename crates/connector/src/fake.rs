// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake connector for testing.

use crate::{CommandResult, Connector, ConnectorError, ExecOptions};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded connector call.
#[derive(Debug, Clone)]
pub enum ConnectorCall {
    RunShell { cmd: String, cwd: Option<PathBuf> },
    GetFile { path: PathBuf },
    PutFile { path: PathBuf, len: usize },
    Disconnect,
}

/// A scripted reply for a matching command.
#[derive(Debug, Clone)]
pub enum FakeReply {
    Result(CommandResult),
    ConnectionLost(String),
}

struct FakeConnectorState {
    files: HashMap<PathBuf, Vec<u8>>,
    calls: Vec<ConnectorCall>,
    /// (substring matcher, reply); first match wins, one-shot entries drain.
    scripted: Vec<(String, FakeReply, bool)>,
}

/// In-memory connector: scripted command replies, map-backed files.
#[derive(Clone)]
pub struct FakeConnector {
    inner: Arc<Mutex<FakeConnectorState>>,
    is_local: bool,
}

impl Default for FakeConnector {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeConnectorState {
                files: HashMap::new(),
                calls: Vec::new(),
                scripted: Vec::new(),
            })),
            is_local: true,
        }
    }
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remote() -> Self {
        Self {
            is_local: false,
            ..Self::default()
        }
    }

    /// Every command containing `matcher` returns `result`.
    pub fn respond(&self, matcher: impl Into<String>, result: CommandResult) {
        self.inner
            .lock()
            .scripted
            .push((matcher.into(), FakeReply::Result(result), false));
    }

    /// The next command containing `matcher` returns `result`, once.
    pub fn respond_once(&self, matcher: impl Into<String>, result: CommandResult) {
        self.inner
            .lock()
            .scripted
            .push((matcher.into(), FakeReply::Result(result), true));
    }

    /// Every command containing `matcher` fails the transport.
    pub fn drop_connection_on(&self, matcher: impl Into<String>) {
        self.inner.lock().scripted.push((
            matcher.into(),
            FakeReply::ConnectionLost("Connection closed".into()),
            false,
        ));
    }

    pub fn put_file_sync(&self, path: impl Into<PathBuf>, content: &[u8]) {
        self.inner.lock().files.insert(path.into(), content.to_vec());
    }

    pub fn file(&self, path: &Path) -> Option<Vec<u8>> {
        self.inner.lock().files.get(path).cloned()
    }

    pub fn calls(&self) -> Vec<ConnectorCall> {
        self.inner.lock().calls.clone()
    }

    /// All commands run so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ConnectorCall::RunShell { cmd, .. } => Some(cmd.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn run_shell_command(
        &self,
        cmd: &str,
        opts: ExecOptions,
    ) -> Result<CommandResult, ConnectorError> {
        let mut state = self.inner.lock();
        state.calls.push(ConnectorCall::RunShell {
            cmd: cmd.to_string(),
            cwd: opts.cwd.clone(),
        });

        let found = state
            .scripted
            .iter()
            .position(|(matcher, _, _)| cmd.contains(matcher.as_str()));
        if let Some(idx) = found {
            let (_, reply, once) = state.scripted[idx].clone();
            if once {
                state.scripted.remove(idx);
            }
            return match reply {
                FakeReply::Result(result) => Ok(result),
                FakeReply::ConnectionLost(msg) => Err(ConnectorError::ConnectionLost(msg)),
            };
        }

        Ok(CommandResult::ok(""))
    }

    async fn get_file(&self, path: &Path) -> Result<Vec<u8>, ConnectorError> {
        let mut state = self.inner.lock();
        state.calls.push(ConnectorCall::GetFile {
            path: path.to_path_buf(),
        });
        state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| ConnectorError::FileNotFound(path.to_path_buf()))
    }

    async fn put_file(&self, content: &[u8], path: &Path) -> Result<(), ConnectorError> {
        let mut state = self.inner.lock();
        state.calls.push(ConnectorCall::PutFile {
            path: path.to_path_buf(),
            len: content.len(),
        });
        state.files.insert(path.to_path_buf(), content.to_vec());
        Ok(())
    }

    async fn disconnect(&self) {
        self.inner.lock().calls.push(ConnectorCall::Disconnect);
    }

    fn is_local(&self) -> bool {
        self.is_local
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
