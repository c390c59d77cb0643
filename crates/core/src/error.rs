// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error kinds.

use thiserror::Error;

/// An identifier string did not match the canonical `<prefix>-<32 hex>` form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {prefix} id: {input:?}")]
pub struct IdParseError {
    pub prefix: &'static str,
    pub input: String,
}

impl IdParseError {
    pub fn new(prefix: &'static str, input: &str) -> Self {
        Self {
            prefix,
            input: input.to_string(),
        }
    }
}
