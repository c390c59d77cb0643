// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File sync via rsync.
//!
//! Rsync always runs on the client side; remote endpoints ride the SSH
//! transport of the host's connector. A trailing slash on the source copies
//! contents rather than the directory itself.

use crate::SyncError;
use roost_connector::subprocess::run_with_timeout;
use roost_connector::SshTarget;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Rsync can move a lot of data; give it a wide but bounded window.
pub const RSYNC_TIMEOUT: Duration = Duration::from_secs(600);

/// One side of a file sync.
#[derive(Debug, Clone)]
pub enum RsyncEndpoint {
    Local(PathBuf),
    Remote { target: SshTarget, path: PathBuf },
}

impl RsyncEndpoint {
    /// The rsync location argument, with a trailing slash.
    fn location(&self) -> String {
        match self {
            RsyncEndpoint::Local(path) => with_trailing_slash(&path.to_string_lossy()),
            RsyncEndpoint::Remote { target, path } => format!(
                "{}:{}",
                target.destination(),
                with_trailing_slash(&path.to_string_lossy())
            ),
        }
    }

    fn ssh_target(&self) -> Option<&SshTarget> {
        match self {
            RsyncEndpoint::Local(_) => None,
            RsyncEndpoint::Remote { target, .. } => Some(target),
        }
    }
}

fn with_trailing_slash(path: &str) -> String {
    format!("{}/", path.trim_end_matches('/'))
}

/// Options for one rsync invocation.
#[derive(Debug, Clone, Default)]
pub struct RsyncOptions {
    pub dry_run: bool,
    pub delete: bool,
    pub exclude_git: bool,
    /// Path of a `--files-from` list, already on the client.
    pub files_from: Option<PathBuf>,
    pub extra_args: Vec<String>,
}

/// Statistics parsed from `rsync --stats` output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub files_transferred: u64,
    pub bytes_transferred: u64,
}

/// Assemble the full rsync argument vector.
pub fn build_rsync_args(
    source: &RsyncEndpoint,
    dest: &RsyncEndpoint,
    opts: &RsyncOptions,
) -> Result<Vec<String>, SyncError> {
    let mut args = vec!["-avz".to_string(), "--stats".to_string()];
    if opts.exclude_git {
        args.push("--exclude=.git".to_string());
    }
    if opts.dry_run {
        args.push("--dry-run".to_string());
    }
    if opts.delete {
        args.push("--delete".to_string());
    }
    if let Some(files_from) = &opts.files_from {
        args.push(format!("--files-from={}", files_from.display()));
    }
    args.extend(opts.extra_args.iter().cloned());

    let remote = match (source.ssh_target(), dest.ssh_target()) {
        (Some(_), Some(_)) => {
            return Err(SyncError::Rsync(
                "rsync between two remote hosts is not supported".to_string(),
            ));
        }
        (one, two) => one.or(two),
    };
    if let Some(target) = remote {
        args.push("-e".to_string());
        args.push(target.transport_command());
    }

    args.push(source.location());
    args.push(dest.location());
    Ok(args)
}

/// Run rsync from `source` to `dest` and parse the transfer statistics.
pub async fn sync_files(
    source: &RsyncEndpoint,
    dest: &RsyncEndpoint,
    opts: &RsyncOptions,
) -> Result<SyncStats, SyncError> {
    let args = build_rsync_args(source, dest, opts)?;
    tracing::debug!(args = ?args, "running rsync");

    let mut cmd = Command::new("rsync");
    cmd.args(&args);
    let output = run_with_timeout(cmd, RSYNC_TIMEOUT, "rsync").await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SyncError::Rsync(stderr.trim().to_string()));
    }

    Ok(parse_rsync_stats(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse `--stats` output. Unrecognized output yields zeros.
pub fn parse_rsync_stats(output: &str) -> SyncStats {
    let mut stats = SyncStats::default();
    for line in output.lines() {
        let line = line.trim();
        if let Some(value) = line
            .strip_prefix("Number of regular files transferred:")
            .or_else(|| line.strip_prefix("Number of files transferred:"))
        {
            stats.files_transferred = parse_count(value);
        } else if let Some(value) = line.strip_prefix("Total transferred file size:") {
            stats.bytes_transferred = parse_count(value);
        }
    }
    stats
}

fn parse_count(value: &str) -> u64 {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

#[cfg(test)]
#[path = "rsync_tests.rs"]
mod tests;
