// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mtime-based activity clock and host idle aggregation.

use crate::host::Host;
use crate::HostError;
use chrono::{DateTime, Utc};
use roost_core::ActivitySource;

impl Host {
    /// Seconds since the most recent activity from any source, across the
    /// host's own activity files and every agent's. `None` means no
    /// activity has ever been recorded (idle forever).
    pub async fn idle_seconds(&self) -> Result<Option<f64>, HostError> {
        let mut latest: Option<DateTime<Utc>> = None;

        for source in ActivitySource::ALL {
            let time = self.activity_time(source).await?;
            latest = max_time(latest, time);
        }

        for agent_id in self.agent_ids().await? {
            for source in ActivitySource::ALL {
                let path = self.paths().agent_activity(&agent_id, source);
                let time = self.file_mtime(&path).await?;
                latest = max_time(latest, time);
            }
        }

        Ok(latest.map(|t| ((Utc::now() - t).num_milliseconds() as f64 / 1000.0).max(0.0)))
    }

    /// Seconds since the host was stopped, from the stop_reason timestamp
    /// on the certified data's update time.
    pub async fn seconds_since_stopped(&self) -> Result<Option<f64>, HostError> {
        let Some(data) = self.certified_data().await? else {
            return Ok(None);
        };
        if data.stop_reason.is_none() {
            return Ok(None);
        }
        Ok(Some(
            ((Utc::now() - data.updated_at).num_milliseconds() as f64 / 1000.0).max(0.0),
        ))
    }
}

fn max_time(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

#[cfg(test)]
#[path = "idle_tests.rs"]
mod tests;
