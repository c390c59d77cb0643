//! Test helpers for behavioral specifications.

#![allow(dead_code)]

use roost_connector::LocalConnector;
use roost_core::{HostId, HostName};
use roost_host::agent::AgentTypeRegistry;
use roost_host::Host;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

/// Random prefix for this test run to avoid conflicts with parallel runs.
static TEST_PREFIX: LazyLock<String> = LazyLock::new(|| {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    format!("rt{:04x}-", nanos & 0xFFFF)
});

static NAME_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A unique agent name for one test.
pub fn unique_name(suffix: &str) -> String {
    let id = NAME_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}{}-{}", *TEST_PREFIX, suffix, id)
}

/// A local host whose state dir lives in the given directory.
pub fn local_host(host_dir: &Path) -> Arc<Host> {
    Arc::new(Host::new(
        HostId::generate(),
        HostName::new("spec-local"),
        "local",
        // Session names from different test runs must not collide on the
        // shared tmux server.
        TEST_PREFIX.as_str(),
        host_dir,
        Arc::new(LocalConnector::new()),
        Arc::new(AgentTypeRegistry::with_builtins()),
    ))
}

pub fn tmux_available() -> bool {
    std::process::Command::new("tmux")
        .arg("-V")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

pub fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run a git command in a directory, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .env("GIT_AUTHOR_NAME", "spec")
        .env("GIT_AUTHOR_EMAIL", "spec@example.com")
        .env("GIT_COMMITTER_NAME", "spec")
        .env("GIT_COMMITTER_EMAIL", "spec@example.com")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}
