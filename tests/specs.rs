//! Behavioral specifications for the roost control plane.
//!
//! These tests drive the public crate APIs end to end: real filesystem,
//! real git, and - when available - a real tmux server. Tests needing an
//! external tool skip themselves when it is absent.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/state_store.rs"]
mod state_store;

#[path = "specs/local_agent.rs"]
mod local_agent;

#[path = "specs/git_sync.rs"]
mod git_sync;
