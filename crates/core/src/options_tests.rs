// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::BTreeSet;

#[test]
fn create_agent_options_defaults() {
    let opts = CreateAgentOptions::new("generic");
    assert_eq!(opts.copy_mode(), Some(WorkDirCopyMode::Copy));
    assert!(opts.is_copy_immediate);
    assert_eq!(opts.ready_timeout_seconds, 10.0);
    assert!(opts.provisioning.user_commands.is_empty());
}

#[test]
fn copy_mode_none_means_in_place() {
    let mut opts = CreateAgentOptions::new("generic");
    opts.git = Some(AgentGitOptions {
        copy_mode: None,
        ..AgentGitOptions::default()
    });
    assert_eq!(opts.copy_mode(), None);

    opts.git = None;
    assert_eq!(opts.copy_mode(), None);
}

#[test]
fn git_options_default_branch_prefix() {
    let git = AgentGitOptions::default();
    assert_eq!(git.new_branch_prefix, "roost/");
    assert!(git.is_new_branch);
    assert!(git.is_include_unclean);
    assert!(!git.is_include_gitignored);
}

#[test]
fn lifecycle_resolve_uses_provider_defaults() {
    let defaults: BTreeSet<ActivitySource> =
        [ActivitySource::Boot, ActivitySource::Process].into();
    let opts = HostLifecycleOptions::default();
    let (timeout, sources) = opts.resolve(Some(600), &defaults);
    assert_eq!(timeout, Some(600));
    assert_eq!(sources, defaults);
}

#[test]
fn lifecycle_resolve_explicit_values_win() {
    let defaults: BTreeSet<ActivitySource> = [ActivitySource::Boot].into();
    let opts = HostLifecycleOptions {
        idle_timeout_seconds: Some(30),
        idle_mode: IdleMode::Io,
        activity_sources: Some([ActivitySource::User].into()),
    };
    let (timeout, sources) = opts.resolve(Some(600), &defaults);
    assert_eq!(timeout, Some(30));
    assert_eq!(sources, [ActivitySource::User].into());
}

#[test]
fn lifecycle_resolve_disabled_clears_timeout() {
    let opts = HostLifecycleOptions {
        idle_timeout_seconds: Some(30),
        idle_mode: IdleMode::Disabled,
        activity_sources: None,
    };
    let (timeout, _) = opts.resolve(Some(600), &BTreeSet::new());
    assert_eq!(timeout, None);
}
