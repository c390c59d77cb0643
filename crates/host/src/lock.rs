// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative host locking.
//!
//! The lock serializes host-wide operations (idle shutdown) against
//! create/destroy. Local hosts take the lock with an exclusive file
//! creation; remote hosts use the shell's noclobber redirect for the same
//! effect. Both are advisory, and the remote variant is best-effort.

use crate::host::Host;
use crate::HostError;
use chrono::{DateTime, Utc};
use roost_connector::sh_quote_path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(250);

/// A held cooperative lock. Call [`HostLock::release`]; dropping without
/// releasing only logs, it cannot remove the remote marker.
pub struct HostLock {
    host: Arc<Host>,
    path: PathBuf,
    released: bool,
}

impl std::fmt::Debug for HostLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostLock")
            .field("host_id", self.host.id())
            .field("path", &self.path)
            .field("released", &self.released)
            .finish()
    }
}

impl HostLock {
    pub async fn release(mut self) -> Result<(), HostError> {
        self.released = true;
        if self.host.is_local() {
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(roost_connector::ConnectorError::from(e).into()),
            }
        } else {
            self.host
                .execute_command(&format!("rm -f {}", sh_quote_path(&self.path)))
                .await?;
            Ok(())
        }
    }
}

impl Drop for HostLock {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!(path = %self.path.display(), "host lock dropped without release");
        }
    }
}

impl Host {
    /// Acquire the advisory host lock, retrying until `timeout`.
    ///
    /// Lock holders are protected from auto-shutdown; the idle watcher skips
    /// hosts whose lock file exists.
    pub async fn lock_cooperatively(
        self: &Arc<Self>,
        timeout: Duration,
    ) -> Result<HostLock, HostError> {
        let path = self.paths().lock_file();
        let deadline = Instant::now() + timeout;

        if let Some(parent) = path.parent() {
            self.mkdir(parent).await?;
        }

        loop {
            if self.try_acquire_lock(&path).await? {
                tracing::debug!(host_id = %self.id(), "acquired host lock");
                return Ok(HostLock {
                    host: Arc::clone(self),
                    path,
                    released: false,
                });
            }
            if Instant::now() >= deadline {
                return Err(HostError::LockTimeout(timeout));
            }
            tokio::time::sleep(LOCK_RETRY_INTERVAL).await;
        }
    }

    async fn try_acquire_lock(&self, path: &std::path::Path) -> Result<bool, HostError> {
        let stamp = Utc::now().to_rfc3339();
        if self.is_local() {
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .await
            {
                Ok(_file) => {
                    self.write_text_file(path, &stamp).await?;
                    Ok(true)
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
                Err(e) => Err(roost_connector::ConnectorError::from(e).into()),
            }
        } else {
            // Noclobber redirect: fails when the file already exists.
            let result = self
                .execute_command(&format!(
                    "set -C; {{ echo {} > {}; }} 2>/dev/null",
                    roost_connector::sh_quote(&stamp),
                    sh_quote_path(path)
                ))
                .await?;
            Ok(result.success)
        }
    }

    /// When the lock file was last written, or `None` if unlocked.
    pub async fn reported_lock_time(&self) -> Result<Option<DateTime<Utc>>, HostError> {
        self.file_mtime(&self.paths().lock_file()).await
    }

    /// Age of the current lock in seconds, for staleness checks.
    pub async fn lock_age_seconds(&self) -> Result<Option<f64>, HostError> {
        Ok(self
            .reported_lock_time()
            .await?
            .map(|t| ((Utc::now() - t).num_milliseconds() as f64 / 1000.0).max(0.0)))
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
