// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Work-dir materialization: copy, clone, worktree, or in-place.

use crate::host::Host;
use crate::HostError;
use roost_connector::{sh_quote, sh_quote_path};
use roost_core::{AgentId, AgentName, CreateAgentOptions, WorkDirCopyMode};
use roost_sync::{sync_files, GitContext, RsyncEndpoint, RsyncOptions};
use std::path::{Path, PathBuf};

impl Host {
    /// Create the work dir for a new agent on this host, transferring code
    /// from `source_path` on `source_host`.
    ///
    /// Copy-mode `None` is in-place: the target is the source and nothing
    /// transfers. Every materialized directory is recorded in
    /// `generated_work_dirs` so destroy can reclaim it.
    pub async fn create_agent_work_dir(
        &self,
        source_host: &Host,
        source_path: &Path,
        options: &CreateAgentOptions,
        agent_id: &AgentId,
    ) -> Result<PathBuf, HostError> {
        let copy_mode = options.copy_mode();
        tracing::debug!(copy_mode = ?copy_mode, source = %source_path.display(), "creating agent work dir");
        match copy_mode {
            Some(WorkDirCopyMode::Worktree) => {
                self.create_work_dir_as_worktree(source_host, source_path, options, agent_id)
                    .await
            }
            Some(WorkDirCopyMode::Copy) | Some(WorkDirCopyMode::Clone) => {
                self.create_work_dir_as_copy(source_host, source_path, options)
                    .await
            }
            None => Ok(source_path.to_path_buf()),
        }
    }

    async fn create_work_dir_as_copy(
        &self,
        source_host: &Host,
        source_path: &Path,
        options: &CreateAgentOptions,
    ) -> Result<PathBuf, HostError> {
        let same_host = source_host.id() == self.id();

        // With no target path the source path is reused verbatim: on the
        // same host that is in-place, on a different host it is the same
        // path on the new machine.
        let target_path = options
            .target_path
            .clone()
            .unwrap_or_else(|| source_path.to_path_buf());
        let is_generated = !(same_host && source_path == target_path);

        self.mkdir(&target_path).await?;
        if is_generated {
            self.add_generated_work_dir(&target_path).await?;
        }

        if same_host && source_path == target_path {
            tracing::debug!("source and target are the same path, no transfer needed");
            return Ok(target_path);
        }

        let source_ctx = GitContext::new(source_host.connector().clone(), source_path);
        let source_has_git = source_ctx.is_git_repository().await?;

        let is_git_synced = options.git.as_ref().map(|g| g.is_git_synced).unwrap_or(false);
        // The user making any git choice means rsync passes leave .git alone.
        let has_git_options = options.git.is_some();

        if is_git_synced {
            if !source_has_git {
                tracing::warn!("source path is not a git repository, falling back to file copy");
                self.rsync_from(
                    source_host,
                    source_path,
                    &target_path,
                    &RsyncOptions {
                        delete: true,
                        exclude_git: true,
                        ..RsyncOptions::default()
                    },
                )
                .await?;
            } else {
                self.transfer_git_repo(source_host, source_path, &target_path, options)
                    .await?;
                self.transfer_extra_files(source_host, source_path, &target_path, options)
                    .await?;
            }
        }

        // The final rsync pass layers in files not in git. It never uses
        // --delete unless the user asks, so it augments rather than
        // replaces.
        if options.data_options.is_rsync_enabled {
            let extra_args = options
                .data_options
                .rsync_args
                .as_deref()
                .map(split_args)
                .unwrap_or_default();
            self.rsync_from(
                source_host,
                source_path,
                &target_path,
                &RsyncOptions {
                    exclude_git: has_git_options,
                    extra_args,
                    ..RsyncOptions::default()
                },
            )
            .await?;
        }

        Ok(target_path)
    }

    async fn transfer_git_repo(
        &self,
        source_host: &Host,
        source_path: &Path,
        target_path: &Path,
        options: &CreateAgentOptions,
    ) -> Result<(), HostError> {
        let new_branch = self.determine_branch_name(options);
        let source_ctx = GitContext::new(source_host.connector().clone(), source_path);

        let base_branch = match options.git.as_ref().and_then(|g| g.base_branch.clone()) {
            Some(base) => base,
            None => source_ctx
                .current_branch()
                .await?
                .unwrap_or_else(|| "main".to_string()),
        };

        tracing::debug!(
            source = %source_path.display(),
            target = %target_path.display(),
            base_branch = %base_branch,
            new_branch = %new_branch,
            "transferring git repository"
        );

        let git_dir = target_path.join(".git");
        if !self.is_directory(&git_dir).await? {
            tracing::debug!("initializing bare git repo on target");
            let result = self
                .execute_command(&format!(
                    "git init --bare {} && git config --global --add safe.directory {}",
                    sh_quote_path(&git_dir),
                    sh_quote_path(target_path),
                ))
                .await?;
            if !result.success {
                return Err(HostError::Command(format!(
                    "failed to initialize git repo on target: {}",
                    result.output_for_error().trim()
                )));
            }
        }

        self.git_push_to_target(source_host, source_path, target_path).await?;

        let result = self
            .execute_command_in(
                &format!(
                    "git config --bool core.bare false && git checkout -B {} {}",
                    sh_quote(&new_branch),
                    sh_quote(&base_branch),
                ),
                target_path,
            )
            .await?;
        if !result.success {
            return Err(HostError::Command(format!(
                "failed to configure git repo on target: {}",
                result.output_for_error().trim()
            )));
        }
        Ok(())
    }

    /// Mirror-push the repository from the source to the target's bare
    /// `.git`, skipping LFS objects.
    async fn git_push_to_target(
        &self,
        source_host: &Host,
        source_path: &Path,
        target_path: &Path,
    ) -> Result<(), HostError> {
        let source_ctx = GitContext::new(source_host.connector().clone(), source_path)
            .with_env("GIT_LFS_SKIP_PUSH", "1");

        let git_dir = target_path.join(".git");
        match self.connector().ssh_target() {
            None => {
                if source_host.is_local() {
                    // Same machine: plain filesystem URL.
                    source_ctx
                        .run_checked(&[
                            "push",
                            "--no-verify",
                            "--mirror",
                            &git_dir.to_string_lossy(),
                        ])
                        .await?;
                } else {
                    // Remote source, local target: mirror-clone from the
                    // source's SSH URL instead.
                    let source_target = source_host.connector().ssh_target().ok_or_else(|| {
                        HostError::Command(
                            "cannot determine SSH connection info for remote source host".into(),
                        )
                    })?;
                    let remote_url = format!(
                        "ssh://{}:{}{}/.git",
                        source_target.destination(),
                        source_target.port,
                        source_path.display()
                    );
                    let local_ctx = GitContext::new(self.connector().clone(), "/")
                        .with_env("GIT_SSH_COMMAND", source_target.transport_command());
                    local_ctx
                        .run_checked(&[
                            "clone",
                            "--mirror",
                            &remote_url,
                            &git_dir.to_string_lossy(),
                        ])
                        .await?;
                }
            }
            Some(target) => {
                let git_url = format!(
                    "ssh://{}:{}{}/.git",
                    target.destination(),
                    target.port,
                    target_path.display()
                );
                tracing::debug!(url = %git_url, "pushing git repo to target");
                source_ctx
                    .with_env("GIT_SSH_COMMAND", target.transport_command())
                    .run_checked(&["push", "--no-verify", "--mirror", &git_url])
                    .await?;
            }
        }
        Ok(())
    }

    /// Transfer files that are not in git: unclean (tracked-modified and
    /// untracked) and, when enabled, gitignored.
    async fn transfer_extra_files(
        &self,
        source_host: &Host,
        source_path: &Path,
        target_path: &Path,
        options: &CreateAgentOptions,
    ) -> Result<(), HostError> {
        let source_ctx = GitContext::new(source_host.connector().clone(), source_path);
        let mut files: Vec<String> = Vec::new();

        let include_unclean = options
            .git
            .as_ref()
            .map(|g| g.is_include_unclean)
            .unwrap_or(true);
        if include_unclean {
            let porcelain = source_ctx.status_porcelain().await?;
            files.extend(GitContext::parse_porcelain_paths(&porcelain));
        }

        let include_gitignored = options
            .git
            .as_ref()
            .map(|g| g.is_include_gitignored)
            .unwrap_or(false);
        if include_gitignored {
            files.extend(source_ctx.gitignored_paths().await?);
        }

        files.sort();
        files.dedup();
        if files.is_empty() {
            tracing::debug!("no extra files to transfer");
            return Ok(());
        }
        tracing::debug!(count = files.len(), "transferring extra files");

        // --files-from via a client-side temp file, to dodge command-line
        // length limits.
        let list_path = std::env::temp_dir().join(format!(
            "roost-files-from-{}.txt",
            uuid::Uuid::new_v4().simple()
        ));
        let body = files.join("\n") + "\n";
        tokio::fs::write(&list_path, body)
            .await
            .map_err(roost_connector::ConnectorError::from)?;

        let result = self
            .rsync_from(
                source_host,
                source_path,
                target_path,
                &RsyncOptions {
                    exclude_git: true,
                    files_from: Some(list_path.clone()),
                    ..RsyncOptions::default()
                },
            )
            .await;
        let _ = tokio::fs::remove_file(&list_path).await;
        result
    }

    /// Rsync from a path on `source_host` into a path on this host. Rsync
    /// runs on the client; at most one endpoint may be remote.
    async fn rsync_from(
        &self,
        source_host: &Host,
        source_path: &Path,
        target_path: &Path,
        opts: &RsyncOptions,
    ) -> Result<(), HostError> {
        let source = endpoint(source_host, source_path)?;
        let dest = endpoint(self, target_path)?;
        sync_files(&source, &dest, opts).await?;
        Ok(())
    }

    async fn create_work_dir_as_worktree(
        &self,
        source_host: &Host,
        source_path: &Path,
        options: &CreateAgentOptions,
        agent_id: &AgentId,
    ) -> Result<PathBuf, HostError> {
        if source_host.id() != self.id() {
            return Err(HostError::UserInput(
                "worktree mode only works when source is on the same host".into(),
            ));
        }
        if let Some(git) = &options.git {
            if !git.is_new_branch {
                return Err(HostError::UserInput(
                    "worktree mode requires a new branch".into(),
                ));
            }
        }

        let work_dir = options
            .target_path
            .clone()
            .unwrap_or_else(|| self.paths().worktree(agent_id));
        if let Some(parent) = work_dir.parent() {
            self.mkdir(parent).await?;
        }

        let branch = self.determine_branch_name(options);
        tracing::debug!(path = %work_dir.display(), branch = %branch, "creating git worktree");

        let mut cmd = format!(
            "git -C {} worktree add {} -b {}",
            sh_quote_path(source_path),
            sh_quote_path(&work_dir),
            sh_quote(&branch),
        );
        if let Some(base) = options.git.as_ref().and_then(|g| g.base_branch.as_deref()) {
            cmd.push(' ');
            cmd.push_str(&sh_quote(base));
        }

        let result = self.execute_command(&cmd).await?;
        if !result.success {
            return Err(HostError::Command(format!(
                "failed to create git worktree: {}",
                result.output_for_error().trim()
            )));
        }

        self.add_generated_work_dir(&work_dir).await?;
        Ok(work_dir)
    }

    /// Branch name for a new work dir: explicit name wins, else
    /// `<prefix><agent_name>-<provider_name>`.
    pub fn determine_branch_name(&self, options: &CreateAgentOptions) -> String {
        if let Some(name) = options.git.as_ref().and_then(|g| g.new_branch_name.clone()) {
            return name;
        }
        let agent_name = options
            .name
            .clone()
            .unwrap_or_else(|| AgentName::new("agent"));
        let prefix = options
            .git
            .as_ref()
            .map(|g| g.new_branch_prefix.clone())
            .unwrap_or_else(|| roost_core::DEFAULT_BRANCH_PREFIX.to_string());
        format!("{}{}-{}", prefix, agent_name, self.provider_name())
    }
}

fn endpoint(host: &Host, path: &Path) -> Result<RsyncEndpoint, HostError> {
    if host.is_local() {
        Ok(RsyncEndpoint::Local(path.to_path_buf()))
    } else {
        let target = host.connector().ssh_target().ok_or_else(|| {
            HostError::Command(format!("host {} has no SSH endpoint", host.id()))
        })?;
        Ok(RsyncEndpoint::Remote {
            target: target.clone(),
            path: path.to_path_buf(),
        })
    }
}

fn split_args(args: &str) -> Vec<String> {
    args.split_whitespace().map(|s| s.to_string()).collect()
}

#[cfg(test)]
#[path = "workdir_tests.rs"]
mod tests;
