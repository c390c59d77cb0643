// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use roost_core::CertifiedHostData;

fn record(failed: bool, snapshots: usize) -> HostRecord {
    let mut certified =
        CertifiedHostData::new(HostId::generate(), HostName::new("h"), "roost-");
    if failed {
        certified.failure_reason = Some("boom".into());
    }
    for i in 0..snapshots {
        certified.snapshots.push(SnapshotRecord {
            id: SnapshotId::generate(),
            name: format!("snap-{}", i),
            created_at: Utc::now(),
        });
    }
    HostRecord::new(certified)
}

#[test]
fn running_container_wins() {
    let r = record(false, 0);
    assert_eq!(derive_host_state(Some(&r), true, true), HostState::Running);
}

#[test]
fn failure_reason_is_failed() {
    let r = record(true, 2);
    assert_eq!(derive_host_state(Some(&r), false, false), HostState::Failed);
}

#[test]
fn record_with_snapshots_is_stopped() {
    let r = record(false, 1);
    assert_eq!(derive_host_state(Some(&r), false, false), HostState::Stopped);
}

#[test]
fn stopped_container_without_snapshots_is_stopped() {
    let r = record(false, 0);
    assert_eq!(derive_host_state(Some(&r), false, true), HostState::Stopped);
}

#[test]
fn no_record_is_destroyed() {
    assert_eq!(derive_host_state(None, false, false), HostState::Destroyed);
}

#[test]
fn record_without_container_or_snapshots_is_destroyed() {
    let r = record(false, 0);
    assert_eq!(derive_host_state(Some(&r), false, false), HostState::Destroyed);
}

#[test]
fn host_reference_parsing() {
    let id = HostId::generate();
    assert_eq!(HostReference::parse(id.as_str()), HostReference::Id(id));
    assert_eq!(
        HostReference::parse("my-worker"),
        HostReference::Name(HostName::new("my-worker"))
    );
}
