// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container labels used for discovery and metadata.
//!
//! Discovery filters on the provider label so multiple provider instances
//! coexist on one daemon.

use indexmap::IndexMap;
use roost_core::{HostId, HostName};

pub const LABEL_HOST_ID: &str = "roost.host-id";
pub const LABEL_HOST_NAME: &str = "roost.host-name";
pub const LABEL_PROVIDER: &str = "roost.provider";
pub const LABEL_TAGS: &str = "roost.tags";

/// Labels attached to every container at create time.
pub fn build_container_labels(
    host_id: &HostId,
    name: &HostName,
    provider_name: &str,
    user_tags: &IndexMap<String, String>,
) -> Vec<(String, String)> {
    vec![
        (LABEL_HOST_ID.to_string(), host_id.to_string()),
        (LABEL_HOST_NAME.to_string(), name.to_string()),
        (LABEL_PROVIDER.to_string(), provider_name.to_string()),
        (
            LABEL_TAGS.to_string(),
            serde_json::to_string(user_tags).unwrap_or_else(|_| "{}".to_string()),
        ),
    ]
}

/// Parsed labels from a discovered container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLabels {
    pub host_id: HostId,
    pub host_name: HostName,
    pub provider_name: String,
    pub user_tags: IndexMap<String, String>,
}

/// Parse a label map; `None` when the container is not roost-managed.
pub fn parse_container_labels(labels: &IndexMap<String, String>) -> Option<ParsedLabels> {
    let host_id = HostId::parse(labels.get(LABEL_HOST_ID)?).ok()?;
    let host_name = HostName::new(labels.get(LABEL_HOST_NAME)?.clone());
    let provider_name = labels.get(LABEL_PROVIDER)?.clone();

    let user_tags = labels
        .get(LABEL_TAGS)
        .and_then(|raw| match serde_json::from_str(raw) {
            Ok(tags) => Some(tags),
            Err(e) => {
                tracing::warn!(raw = %raw, error = %e, "invalid JSON in container tags label");
                None
            }
        })
        .unwrap_or_default();

    Some(ParsedLabels {
        host_id,
        host_name,
        provider_name,
        user_tags,
    })
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod tests;
