// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider SSH key material.
//!
//! Each provider instance owns a client keypair (authorized on every host
//! it creates), a host keypair (installed as each host's server identity),
//! and a known_hosts file holding that host key for every endpoint. Strict
//! host-key checking is mandatory; the known_hosts file is the trust root.

use crate::ProviderError;
use roost_connector::subprocess::run_with_timeout;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

const KEYGEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Key material for one provider instance, stored under a keys dir.
#[derive(Debug, Clone)]
pub struct SshKeys {
    keys_dir: PathBuf,
}

impl SshKeys {
    pub fn new(keys_dir: impl Into<PathBuf>) -> Self {
        Self {
            keys_dir: keys_dir.into(),
        }
    }

    pub fn client_key_path(&self) -> PathBuf {
        self.keys_dir.join("id_ed25519")
    }

    pub fn host_key_path(&self) -> PathBuf {
        self.keys_dir.join("ssh_host_ed25519_key")
    }

    pub fn known_hosts_path(&self) -> PathBuf {
        self.keys_dir.join("known_hosts")
    }

    /// Generate both keypairs if missing; returns the public keys
    /// (client, host).
    pub async fn ensure(&self) -> Result<(String, String), ProviderError> {
        tokio::fs::create_dir_all(&self.keys_dir)
            .await
            .map_err(roost_connector::ConnectorError::from)?;
        let client_pub = ensure_keypair(&self.client_key_path()).await?;
        let host_pub = ensure_keypair(&self.host_key_path()).await?;
        Ok((client_pub, host_pub))
    }

    pub async fn client_public_key(&self) -> Result<String, ProviderError> {
        read_public_key(&self.client_key_path()).await
    }

    pub async fn host_public_key(&self) -> Result<String, ProviderError> {
        read_public_key(&self.host_key_path()).await
    }

    pub async fn host_private_key(&self) -> Result<String, ProviderError> {
        Ok(tokio::fs::read_to_string(self.host_key_path())
            .await
            .map_err(roost_connector::ConnectorError::from)?)
    }

    /// Record a host's public key for an endpoint. Existing entries for
    /// the same endpoint are replaced.
    pub async fn add_known_host(
        &self,
        host: &str,
        port: u16,
        public_key: &str,
    ) -> Result<(), ProviderError> {
        let path = self.known_hosts_path();
        let existing = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(roost_connector::ConnectorError::from(e).into()),
        };

        let prefix = endpoint_prefix(host, port);
        let mut lines: Vec<&str> = existing
            .lines()
            .filter(|line| !line.starts_with(&prefix))
            .collect();
        let new_line = known_hosts_line(host, port, public_key);
        lines.push(new_line.as_str());
        let mut content = lines.join("\n");
        content.push('\n');
        tokio::fs::write(&path, content)
            .await
            .map_err(roost_connector::ConnectorError::from)?;
        Ok(())
    }
}

fn endpoint_prefix(host: &str, port: u16) -> String {
    format!("[{}]:{} ", host, port)
}

/// One known_hosts entry in the bracketed-port form OpenSSH expects for
/// non-standard ports.
pub fn known_hosts_line(host: &str, port: u16, public_key: &str) -> String {
    format!("[{}]:{} {}", host, port, public_key.trim())
}

async fn ensure_keypair(path: &Path) -> Result<String, ProviderError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        tracing::debug!(path = %path.display(), "generating ssh keypair");
        let mut cmd = Command::new("ssh-keygen");
        cmd.args(["-t", "ed25519", "-N", "", "-q", "-f"]).arg(path);
        let output = run_with_timeout(cmd, KEYGEN_TIMEOUT, "ssh-keygen").await?;
        if !output.status.success() {
            return Err(ProviderError::Operation(format!(
                "ssh-keygen failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
    }
    read_public_key(path).await
}

async fn read_public_key(private_key_path: &Path) -> Result<String, ProviderError> {
    let pub_path = private_key_path.with_extension("pub");
    let content = tokio::fs::read_to_string(&pub_path)
        .await
        .map_err(roost_connector::ConnectorError::from)?;
    Ok(content.trim().to_string())
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
