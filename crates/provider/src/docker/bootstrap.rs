// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container bootstrap: entrypoint, default image, SSH setup, shutdown
//! script.

use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

/// Entrypoint script for every container, run via `sh -c`: trap SIGTERM
/// and idle, so `kill -TERM 1` stops the container cleanly.
pub const CONTAINER_ENTRYPOINT: &str = r#"trap "exit 0" TERM; tail -f /dev/null & wait"#;

/// Packages the runtime needs inside a host container.
pub const REQUIRED_PACKAGES: [&str; 7] = [
    "openssh-server",
    "tmux",
    "git",
    "rsync",
    "curl",
    "ca-certificates",
    "procps",
];

/// The fallback image built when the user supplies neither an image nor
/// build args. Callers warn that a purpose-built image will be faster.
pub fn default_dockerfile() -> String {
    format!(
        "FROM debian:bookworm-slim\n\
         RUN apt-get update && apt-get install -y --no-install-recommends \\\n    {} \\\n    && rm -rf /var/lib/apt/lists/*\n\
         RUN mkdir -p /run/sshd\n",
        REQUIRED_PACKAGES.join(" \\\n    ")
    )
}

/// Check for required packages and install any that are missing. Emits
/// `MISSING: <pkg>` lines so the caller can surface warnings.
pub fn check_and_install_packages_script() -> String {
    let checks = [
        ("sshd", "/usr/sbin/sshd", "openssh-server"),
        ("tmux", "tmux", "tmux"),
        ("git", "git", "git"),
        ("rsync", "rsync", "rsync"),
        ("ps", "ps", "procps"),
    ];
    let mut lines = vec!["MISSING=\"\"".to_string()];
    for (name, binary, package) in checks {
        lines.push(format!(
            "command -v {bin} >/dev/null 2>&1 || {{ echo \"MISSING: {name}\"; MISSING=\"$MISSING {pkg}\"; }}",
            bin = binary,
            name = name,
            pkg = package,
        ));
    }
    lines.push(
        "if [ -n \"$MISSING\" ]; then apt-get update && apt-get install -y --no-install-recommends $MISSING; fi"
            .to_string(),
    );
    lines.push("mkdir -p /run/sshd".to_string());
    lines.join("\n")
}

/// Configure sshd: install the provider's host keypair, authorize the
/// client key for root.
pub fn configure_ssh_script(
    client_public_key: &str,
    host_private_key: &str,
    host_public_key: &str,
) -> String {
    format!(
        "mkdir -p /etc/ssh /root/.ssh\n\
         cat > /etc/ssh/ssh_host_ed25519_key <<'ROOST_EOF'\n{private}\nROOST_EOF\n\
         chmod 600 /etc/ssh/ssh_host_ed25519_key\n\
         echo '{public}' > /etc/ssh/ssh_host_ed25519_key.pub\n\
         echo 'HostKey /etc/ssh/ssh_host_ed25519_key' > /etc/ssh/sshd_config.d/roost.conf 2>/dev/null \
         || echo 'HostKey /etc/ssh/ssh_host_ed25519_key' >> /etc/ssh/sshd_config\n\
         echo '{client}' >> /root/.ssh/authorized_keys\n\
         chmod 700 /root/.ssh && chmod 600 /root/.ssh/authorized_keys\n",
        private = host_private_key.trim_end(),
        public = host_public_key.trim(),
        client = client_public_key.trim(),
    )
}

/// Seed known_hosts for outbound SSH from inside the container.
pub fn add_known_hosts_script(entries: &[String]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }
    let mut script = String::from("mkdir -p /root/.ssh\n");
    for entry in entries {
        script.push_str(&format!(
            "echo '{}' >> /root/.ssh/known_hosts\n",
            entry.replace('\'', "'\\''")
        ));
    }
    script.push_str("chmod 600 /root/.ssh/known_hosts\n");
    Some(script)
}

/// The host's shutdown.sh. For Docker, stopping means killing PID 1; the
/// entrypoint traps SIGTERM and exits cleanly.
pub fn shutdown_script(host_dir: &str) -> String {
    format!(
        "#!/bin/bash\n\
         # Auto-generated shutdown script for a roost Docker host\n\
         LOG_FILE=\"{host_dir}/logs/shutdown.log\"\n\
         mkdir -p \"$(dirname \"$LOG_FILE\")\"\n\
         echo \"$(date '+%Y-%m-%d %H:%M:%S') shutdown requested: ${{1:-PAUSED}}\" >> \"$LOG_FILE\"\n\
         kill -TERM 1\n",
        host_dir = host_dir,
    )
}

/// The detached idle watcher installed when shutdown is supported: checks
/// the activity clock and invokes shutdown.sh after the timeout.
pub fn idle_watcher_script(host_dir: &str, idle_timeout_seconds: u64) -> String {
    format!(
        "while true; do\n\
         sleep 60\n\
         NEWEST=$(find {host_dir}/activity {host_dir}/agents/*/activity -type f -printf '%T@\\n' 2>/dev/null | sort -rn | head -n 1)\n\
         [ -z \"$NEWEST\" ] && continue\n\
         [ -f {host_dir}/host_lock ] && continue\n\
         NOW=$(date +%s)\n\
         IDLE=$((NOW - ${{NEWEST%%.*}}))\n\
         if [ \"$IDLE\" -ge {timeout} ]; then\n\
         bash {host_dir}/commands/shutdown.sh IDLE\n\
         exit 0\n\
         fi\n\
         done",
        host_dir = host_dir,
        timeout = idle_timeout_seconds,
    )
}

/// Wait for an SSH banner (`SSH-` prefix) on the endpoint, bounded.
pub async fn wait_for_ssh_banner(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<(), crate::ProviderError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match try_read_banner(host, port).await {
            Ok(true) => return Ok(()),
            Ok(false) | Err(_) => {}
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(crate::ProviderError::Operation(format!(
                "SSH server not ready after {}s at {}:{}",
                timeout.as_secs(),
                host,
                port
            )));
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

async fn try_read_banner(host: &str, port: u16) -> std::io::Result<bool> {
    let connect = TcpStream::connect((host, port));
    let mut stream = tokio::time::timeout(Duration::from_secs(2), connect).await??;
    let mut buf = [0u8; 256];
    let read = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf)).await??;
    Ok(buf[..read].starts_with(b"SSH-"))
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
