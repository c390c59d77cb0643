// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! roost-engine: the create pipeline and listing.
//!
//! The CLI validates user input into a [`CreateOptions`] and hands it
//! here. The engine resolves the source and target, materializes the work
//! dir, writes the agent state, provisions, starts, and optionally waits
//! for readiness and injects the initial message. Listing fans out across
//! providers in parallel and captures per-provider failures instead of
//! aborting.

mod create;
mod destroy;
mod listing;

#[cfg(test)]
pub(crate) mod test_support;

pub use create::{CreateOptions, CreateOutcome, SourceSpec, TargetHost};
pub use listing::{AgentInfo, ErrorInfo, ListOptions, ListOutput};

use indexmap::IndexMap;
use roost_core::AgentName;
use roost_host::{Host, HostError};
use roost_provider::{Provider, ProviderError};
use std::sync::Arc;
use thiserror::Error;

/// Errors from the engine.
#[derive(Debug, Error)]
pub enum CreateError {
    #[error("invalid input: {0}")]
    UserInput(String),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Agent(#[from] roost_host::AgentError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Sync(#[from] roost_sync::SyncError),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("agent {0} already exists (pass reuse to adopt it)")]
    AgentExists(AgentName),
}

/// The control plane: one local host plus any number of providers.
#[derive(Clone)]
pub struct Engine {
    local_host: Arc<Host>,
    providers: IndexMap<String, Arc<dyn Provider>>,
}

impl Engine {
    pub fn new(local_host: Arc<Host>) -> Self {
        Self {
            local_host,
            providers: IndexMap::new(),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers
            .insert(provider.name().to_string(), provider);
        self
    }

    pub fn local_host(&self) -> &Arc<Host> {
        &self.local_host
    }

    pub fn provider(&self, name: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.get(name)
    }

    pub fn providers(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.values()
    }
}
