// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    running = { HostState::Running, "RUNNING" },
    stopped = { HostState::Stopped, "STOPPED" },
    destroyed = { HostState::Destroyed, "DESTROYED" },
    failed = { HostState::Failed, "FAILED" },
    building = { HostState::Building, "BUILDING" },
)]
fn host_state_string_forms(state: HostState, expected: &str) {
    assert_eq!(serde_json::to_value(state).unwrap(), expected);
    assert_eq!(state.to_string(), expected);
}

#[yare::parameterized(
    running = { AgentLifecycleState::Running, "RUNNING" },
    waiting = { AgentLifecycleState::Waiting, "WAITING" },
    done = { AgentLifecycleState::Done, "DONE" },
    replaced = { AgentLifecycleState::Replaced, "REPLACED" },
    stopped = { AgentLifecycleState::Stopped, "STOPPED" },
)]
fn agent_state_string_forms(state: AgentLifecycleState, expected: &str) {
    assert_eq!(serde_json::to_value(state).unwrap(), expected);
}

#[test]
fn activity_source_file_names_are_lowercase() {
    for source in ActivitySource::ALL {
        let name = source.file_name();
        assert_eq!(name, name.to_lowercase());
    }
}

#[test]
fn activity_source_persisted_form_is_uppercase() {
    assert_eq!(
        serde_json::to_value(ActivitySource::Process).unwrap(),
        "PROCESS"
    );
    let back: ActivitySource = serde_json::from_value("BOOT".into()).unwrap();
    assert_eq!(back, ActivitySource::Boot);
}

#[test]
fn removed_enum_values_fail_deserialization() {
    // Closed enums: unknown persisted strings are an error, not a default.
    assert!(serde_json::from_value::<IdleMode>("TURBO".into()).is_err());
}

#[test]
fn defaults() {
    assert_eq!(IdleMode::default(), IdleMode::Process);
    assert_eq!(GitPushMode::default(), GitPushMode::Branch);
    assert_eq!(UncommittedChangesMode::default(), UncommittedChangesMode::Fail);
}
