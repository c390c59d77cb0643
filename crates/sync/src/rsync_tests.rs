// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn target() -> SshTarget {
    SshTarget {
        user: "root".into(),
        host: "10.0.0.5".into(),
        port: 2201,
        private_key_path: "/keys/id".into(),
        known_hosts_path: "/keys/kh".into(),
    }
}

#[test]
fn local_to_local_args() {
    let args = build_rsync_args(
        &RsyncEndpoint::Local("/src".into()),
        &RsyncEndpoint::Local("/dst".into()),
        &RsyncOptions::default(),
    )
    .unwrap();
    assert_eq!(args, vec!["-avz", "--stats", "/src/", "/dst/"]);
}

#[test]
fn flags_in_stable_order() {
    let opts = RsyncOptions {
        dry_run: true,
        delete: true,
        exclude_git: true,
        files_from: Some("/tmp/list".into()),
        extra_args: vec!["--compress-level=3".into()],
    };
    let args = build_rsync_args(
        &RsyncEndpoint::Local("/src".into()),
        &RsyncEndpoint::Local("/dst".into()),
        &opts,
    )
    .unwrap();
    assert_eq!(
        args,
        vec![
            "-avz",
            "--stats",
            "--exclude=.git",
            "--dry-run",
            "--delete",
            "--files-from=/tmp/list",
            "--compress-level=3",
            "/src/",
            "/dst/",
        ]
    );
}

#[test]
fn remote_dest_uses_ssh_transport() {
    let args = build_rsync_args(
        &RsyncEndpoint::Local("/src".into()),
        &RsyncEndpoint::Remote {
            target: target(),
            path: "/work/agent".into(),
        },
        &RsyncOptions::default(),
    )
    .unwrap();
    let e_pos = args.iter().position(|a| a == "-e").unwrap();
    assert!(args[e_pos + 1].contains("StrictHostKeyChecking=yes"));
    assert_eq!(args.last().unwrap(), "root@10.0.0.5:/work/agent/");
}

#[test]
fn two_remote_endpoints_are_rejected() {
    let remote = RsyncEndpoint::Remote {
        target: target(),
        path: "/a".into(),
    };
    let err = build_rsync_args(&remote, &remote.clone(), &RsyncOptions::default()).unwrap_err();
    assert!(matches!(err, SyncError::Rsync(_)));
}

#[test]
fn trailing_slash_is_normalized() {
    let args = build_rsync_args(
        &RsyncEndpoint::Local("/src/".into()),
        &RsyncEndpoint::Local("/dst".into()),
        &RsyncOptions::default(),
    )
    .unwrap();
    assert_eq!(args[args.len() - 2], "/src/");
}

#[test]
fn stats_parsing() {
    let output = "\
Number of files: 120 (reg: 100, dir: 20)
Number of created files: 3
Number of regular files transferred: 42
Total file size: 9,999,999 bytes
Total transferred file size: 1,234,567 bytes
";
    let stats = parse_rsync_stats(output);
    assert_eq!(stats.files_transferred, 42);
    assert_eq!(stats.bytes_transferred, 1_234_567);
}

#[test]
fn stats_parse_older_rsync_label() {
    let stats = parse_rsync_stats("Number of files transferred: 7\n");
    assert_eq!(stats.files_transferred, 7);
}

#[test]
fn stats_unrecognized_output_is_zero() {
    assert_eq!(parse_rsync_stats("nothing useful"), SyncStats::default());
}
