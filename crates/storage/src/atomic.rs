// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic file replacement.
//!
//! Write path: serialize to `<path>.tmp`, fsync, rename over the target.
//! A crash at any point leaves either the prior file or the new one, never
//! a partial document.

use std::io;
use std::path::Path;

/// Atomically replace `path` with `data`.
pub async fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let tmp_path = path.with_extension("tmp");

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::fs::write(&tmp_path, data).await?;

    // fsync before rename: the rename must not land before the contents.
    let file = tokio::fs::File::open(&tmp_path).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
