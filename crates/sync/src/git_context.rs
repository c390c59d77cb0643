// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git command execution over a connector.

use crate::SyncError;
use roost_connector::{sh_quote, CommandResult, Connector, ExecOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default timeout for git operations.
pub const GIT_TIMEOUT: Duration = Duration::from_secs(120);

/// A git repository on some host, local or remote.
#[derive(Clone)]
pub struct GitContext {
    connector: Arc<dyn Connector>,
    repo_path: PathBuf,
    /// Extra environment for every git command (e.g. GIT_SSH_COMMAND).
    env: Vec<(String, String)>,
}

impl GitContext {
    pub fn new(connector: Arc<dyn Connector>, repo_path: impl Into<PathBuf>) -> Self {
        Self {
            connector,
            repo_path: repo_path.into(),
            env: Vec::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn connector(&self) -> &Arc<dyn Connector> {
        &self.connector
    }

    /// Run `git -C <repo> <args...>`, quoting each argument.
    pub async fn run(&self, args: &[&str]) -> Result<CommandResult, SyncError> {
        let mut cmd = format!("git -C {}", sh_quote(&self.repo_path.to_string_lossy()));
        for arg in args {
            cmd.push(' ');
            cmd.push_str(&sh_quote(arg));
        }
        let opts = ExecOptions {
            timeout: GIT_TIMEOUT,
            env: self.env.clone(),
            ..ExecOptions::default()
        };
        Ok(self.connector.run_shell_command(&cmd, opts).await?)
    }

    /// Run and fail on non-zero exit.
    pub async fn run_checked(&self, args: &[&str]) -> Result<CommandResult, SyncError> {
        let result = self.run(args).await?;
        if !result.success {
            let operation = args.first().copied().unwrap_or("git");
            return Err(SyncError::git(operation, result.output_for_error().trim()));
        }
        Ok(result)
    }

    pub async fn is_git_repository(&self) -> Result<bool, SyncError> {
        let result = self.run(&["rev-parse", "--git-dir"]).await?;
        Ok(result.success)
    }

    /// The current branch name, or `None` for a detached HEAD.
    pub async fn current_branch(&self) -> Result<Option<String>, SyncError> {
        let result = self.run(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        if !result.success {
            return Ok(None);
        }
        let branch = result.stdout.trim().to_string();
        if branch.is_empty() || branch == "HEAD" {
            Ok(None)
        } else {
            Ok(Some(branch))
        }
    }

    pub async fn head_commit(&self) -> Result<String, SyncError> {
        let result = self.run_checked(&["rev-parse", "HEAD"]).await?;
        Ok(result.stdout.trim().to_string())
    }

    /// `git status --porcelain` output, empty for a clean tree.
    pub async fn status_porcelain(&self) -> Result<String, SyncError> {
        let result = self.run_checked(&["status", "--porcelain"]).await?;
        Ok(result.stdout)
    }

    pub async fn is_dirty(&self) -> Result<bool, SyncError> {
        Ok(!self.status_porcelain().await?.trim().is_empty())
    }

    /// Paths of unclean files from porcelain output. Renames keep the new
    /// name (`a -> b` keeps `b`).
    pub fn parse_porcelain_paths(porcelain: &str) -> Vec<String> {
        let mut paths = Vec::new();
        for line in porcelain.lines() {
            if line.len() < 4 {
                continue;
            }
            let mut path = &line[3..];
            if let Some((_, renamed)) = path.split_once(" -> ") {
                path = renamed;
            }
            paths.push(path.to_string());
        }
        paths.sort();
        paths.dedup();
        paths
    }

    /// Gitignored files (`ls-files --others --ignored --exclude-standard`).
    pub async fn gitignored_paths(&self) -> Result<Vec<String>, SyncError> {
        let result = self
            .run_checked(&["ls-files", "--others", "--ignored", "--exclude-standard"])
            .await?;
        Ok(result
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect())
    }

    /// Number of stash entries.
    pub async fn stash_len(&self) -> Result<usize, SyncError> {
        let result = self.run_checked(&["stash", "list"]).await?;
        Ok(result.stdout.lines().filter(|l| !l.trim().is_empty()).count())
    }

    /// Stash tracked and untracked changes. Returns false when there was
    /// nothing to stash.
    pub async fn stash_push(&self) -> Result<bool, SyncError> {
        let result = self
            .run_checked(&["stash", "push", "--include-untracked"])
            .await?;
        Ok(!result.stdout.contains("No local changes to save"))
    }

    pub async fn stash_pop(&self) -> Result<(), SyncError> {
        self.run_checked(&["stash", "pop"]).await?;
        Ok(())
    }

    pub async fn checkout(&self, branch: &str) -> Result<(), SyncError> {
        self.run_checked(&["checkout", branch]).await?;
        Ok(())
    }

    /// Does a MERGE_HEAD exist, i.e. is a merge in progress?
    pub async fn merge_in_progress(&self) -> Result<bool, SyncError> {
        let result = self
            .run(&["rev-parse", "--verify", "--quiet", "MERGE_HEAD"])
            .await?;
        Ok(result.success)
    }

    pub async fn merge_abort(&self) -> Result<(), SyncError> {
        self.run_checked(&["merge", "--abort"]).await?;
        Ok(())
    }

    /// `git reset --hard HEAD && git clean -fd`.
    pub async fn clobber(&self) -> Result<(), SyncError> {
        self.run_checked(&["reset", "--hard", "HEAD"]).await?;
        self.run_checked(&["clean", "-fd"]).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "git_context_tests.rs"]
mod tests;
