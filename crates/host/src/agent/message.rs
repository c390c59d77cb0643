// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message injection into a running agent's tmux session.
//!
//! Two protocols. *Simple* types the text, waits, and sends Enter; enough
//! for line-buffered programs. *Marker-based* synchronizes with a TUI's
//! input handler: append a random marker, wait until it echoes, remove it
//! with backspaces, settle the input handler with no-op cursor keys, verify
//! the display, then submit with the Enter-with-retry subprotocol.

use super::Agent;
use crate::{AgentError, TMUX_TIMEOUT};
use roost_connector::{sh_quote, ExecOptions};
use std::time::Duration;

/// Poll cadence while watching the pane.
const SEND_MESSAGE_POLL_INTERVAL: Duration = Duration::from_millis(200);
/// Ceiling on marker/display polling.
const SEND_MESSAGE_TIMEOUT: Duration = Duration::from_secs(30);
/// Ceiling on waiting for the TUI ready indicator.
const TUI_READY_TIMEOUT: Duration = Duration::from_secs(30);
/// Settle delay after the initial marker-removal backspaces.
const INITIAL_BACKSPACE_SETTLE: Duration = Duration::from_secs(1);
/// Settle delay after the single cleanup backspace between Enter retries.
const RETRY_BACKSPACE_SETTLE: Duration = Duration::from_millis(500);
/// Delay between a correct-looking display and sending Enter.
const PRE_ENTER_DELAY: Duration = Duration::from_millis(300);
/// How long each Enter attempt waits for the submit-hook signal.
const ENTER_SIGNAL_TIMEOUT: Duration = Duration::from_secs(2);
/// Enter attempts before giving up.
const MAX_ENTER_RETRIES: usize = 10;
/// Tail of the message that must stay visible after marker removal.
const ENDING_CHECK_LEN: usize = 20;

impl Agent {
    /// Send a message to the running agent, using the protocol its type
    /// selects.
    pub async fn send_message(&self, message: &str) -> Result<(), AgentError> {
        let record = self.record().await?;
        let session_name = self.host().session_name_for(&record.name);
        let agent_type = self.agent_type().await?;
        tracing::debug!(agent = %record.name, len = message.len(), "sending message");

        let enter_delay = record
            .enter_delay_seconds
            .map(Duration::from_secs_f64)
            .unwrap_or_else(|| agent_type.enter_delay());

        if agent_type.uses_marker_injection() {
            self.send_message_with_marker(
                &session_name,
                message,
                agent_type.tui_ready_indicator(),
            )
            .await
        } else {
            self.send_message_simple(&session_name, message, enter_delay).await
        }
    }

    async fn send_err(&self, message: impl Into<String>) -> AgentError {
        let name = self
            .name()
            .await
            .unwrap_or_else(|_| roost_core::AgentName::new(self.id().as_str()));
        AgentError::SendMessage {
            name,
            message: message.into(),
        }
    }

    async fn tmux_send(&self, cmd: String, what: &str) -> Result<(), AgentError> {
        let result = self
            .host()
            .execute_command_with(&cmd, ExecOptions::with_timeout(TMUX_TIMEOUT))
            .await?;
        if !result.success {
            return Err(self
                .send_err(format!("{} failed: {}", what, result.output_for_error().trim()))
                .await);
        }
        Ok(())
    }

    async fn send_message_simple(
        &self,
        session_name: &str,
        message: &str,
        enter_delay: Duration,
    ) -> Result<(), AgentError> {
        self.tmux_send(
            format!(
                "tmux send-keys -t {} -l {}",
                sh_quote(session_name),
                sh_quote(message)
            ),
            "tmux send-keys",
        )
        .await?;

        // The input handler needs a beat; Enter sent immediately can land
        // as a literal newline.
        tokio::time::sleep(enter_delay).await;

        self.tmux_send(
            format!("tmux send-keys -t {} Enter", sh_quote(session_name)),
            "tmux send-keys Enter",
        )
        .await
    }

    async fn send_message_with_marker(
        &self,
        session_name: &str,
        message: &str,
        ready_indicator: Option<String>,
    ) -> Result<(), AgentError> {
        if let Some(indicator) = ready_indicator {
            self.wait_for_pane_text(session_name, &indicator, TUI_READY_TIMEOUT, "TUI ready")
                .await?;
        }

        // A bare 32-hex marker: no newlines, so it deletes cleanly with
        // backspaces in any input area.
        let marker = uuid::Uuid::new_v4().simple().to_string();
        let message_with_marker = format!("{}{}", message, marker);

        self.tmux_send(
            format!(
                "tmux send-keys -t {} -l {}",
                sh_quote(session_name),
                sh_quote(&message_with_marker)
            ),
            "tmux send-keys",
        )
        .await?;

        // Marker visible => the input handler consumed the whole message.
        self.wait_for_pane_text(session_name, &marker, SEND_MESSAGE_TIMEOUT, "marker visible")
            .await?;

        self.send_backspaces_with_noop(session_name, marker.len(), INITIAL_BACKSPACE_SETTLE)
            .await?;

        // The display must show the message end and no marker before Enter
        // is worth attempting.
        let expected_ending: String = message
            .chars()
            .rev()
            .take(ENDING_CHECK_LEN)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        self.wait_for_marker_removed(session_name, &marker, &expected_ending).await?;

        tokio::time::sleep(PRE_ENTER_DELAY).await;

        self.send_enter_with_retry(session_name).await
    }

    /// Backspaces followed by a Right-Left no-op pair.
    ///
    /// The no-op keys force the input handler out of the state where Enter
    /// is treated as a literal newline.
    async fn send_backspaces_with_noop(
        &self,
        session_name: &str,
        count: usize,
        settle: Duration,
    ) -> Result<(), AgentError> {
        if count > 0 {
            let backspaces = vec!["BSpace"; count].join(" ");
            self.tmux_send(
                format!("tmux send-keys -t {} {}", sh_quote(session_name), backspaces),
                "tmux send-keys BSpace",
            )
            .await?;
        }

        tokio::time::sleep(settle).await;

        let noop = format!("tmux send-keys -t {} Right Left", sh_quote(session_name));
        let result = self
            .host()
            .execute_command_with(&noop, ExecOptions::with_timeout(TMUX_TIMEOUT))
            .await?;
        if !result.success {
            tracing::warn!(stderr = %result.stderr, "failed to send noop keys");
        }
        Ok(())
    }

    async fn capture_pane(&self, session_name: &str) -> Result<Option<String>, AgentError> {
        let result = self
            .host()
            .execute_command_with(
                &format!("tmux capture-pane -t {} -p", sh_quote(session_name)),
                ExecOptions::with_timeout(TMUX_TIMEOUT),
            )
            .await?;
        if result.success {
            Ok(Some(result.stdout.trim_end().to_string()))
        } else {
            Ok(None)
        }
    }

    /// Poll until `text` appears anywhere in the pane. The check is
    /// containment, not suffix: TUIs paint status lines below the input
    /// area.
    async fn wait_for_pane_text(
        &self,
        session_name: &str,
        text: &str,
        timeout: Duration,
        what: &str,
    ) -> Result<(), AgentError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(content) = self.capture_pane(session_name).await? {
                if content.contains(text) {
                    tracing::trace!(%what, "pane text found");
                    return Ok(());
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(self
                    .send_err(format!(
                        "timeout waiting for {} (waited {:.1}s)",
                        what,
                        timeout.as_secs_f64()
                    ))
                    .await);
            }
            tokio::time::sleep(SEND_MESSAGE_POLL_INTERVAL).await;
        }
    }

    /// Poll until the marker is gone and the message tail is visible.
    async fn wait_for_marker_removed(
        &self,
        session_name: &str,
        marker: &str,
        expected_ending: &str,
    ) -> Result<(), AgentError> {
        let deadline = tokio::time::Instant::now() + SEND_MESSAGE_TIMEOUT;
        loop {
            if let Some(content) = self.capture_pane(session_name).await? {
                if !content.contains(marker) && content.contains(expected_ending) {
                    tracing::trace!("marker removed and message tail visible");
                    return Ok(());
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(self
                    .send_err(format!(
                        "timeout waiting for message to be ready for submission (waited {:.1}s)",
                        SEND_MESSAGE_TIMEOUT.as_secs_f64()
                    ))
                    .await);
            }
            tokio::time::sleep(SEND_MESSAGE_POLL_INTERVAL).await;
        }
    }

    /// Submit with retry against Enter-as-literal-newline.
    ///
    /// Each attempt runs one shell invocation on the host that starts a
    /// `tmux wait-for` listener in the background *before* sending Enter —
    /// that ordering removes the race where the agent-side submit hook
    /// fires before anyone is listening. If the listener is still alive
    /// after the budget, the Enter landed as a newline: clean it up with
    /// one backspace plus the no-op settle and try again.
    async fn send_enter_with_retry(&self, session_name: &str) -> Result<(), AgentError> {
        let wait_channel = format!("roost-submit-{}", session_name);

        for attempt in 1..=MAX_ENTER_RETRIES {
            if self
                .send_enter_and_wait_for_signal(session_name, &wait_channel)
                .await?
            {
                tracing::debug!(attempt, "message submitted");
                return Ok(());
            }

            tracing::debug!(attempt, "Enter likely became a literal newline, retrying");
            self.send_backspaces_with_noop(session_name, 1, RETRY_BACKSPACE_SETTLE)
                .await?;
        }

        Err(self
            .send_err(format!(
                "failed to submit message after {} attempts - Enter keeps being interpreted as newline",
                MAX_ENTER_RETRIES
            ))
            .await)
    }

    /// One attempt: listener first, then Enter, then poll the listener.
    async fn send_enter_and_wait_for_signal(
        &self,
        session_name: &str,
        wait_channel: &str,
    ) -> Result<bool, AgentError> {
        let iterations = (ENTER_SIGNAL_TIMEOUT.as_secs_f64() * 100.0) as u32;
        let script = format!(
            "tmux wait-for \"$0\" & W=$!; \
             tmux send-keys -t \"$1\" Enter; \
             for i in $(seq 1 {}); do \
             kill -0 $W 2>/dev/null || exit 0; \
             sleep 0.01; \
             done; \
             kill $W 2>/dev/null; exit 1",
            iterations
        );
        let cmd = format!(
            "bash -c {} {} {}",
            sh_quote(&script),
            sh_quote(wait_channel),
            sh_quote(session_name)
        );

        let result = self
            .host()
            .execute_command_with(
                &cmd,
                ExecOptions::with_timeout(ENTER_SIGNAL_TIMEOUT + Duration::from_secs(1)),
            )
            .await?;
        if result.success {
            tracing::debug!(channel = %wait_channel, "received submission signal");
        } else {
            tracing::debug!(channel = %wait_channel, "timeout waiting for submission signal");
        }
        Ok(result.success)
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
