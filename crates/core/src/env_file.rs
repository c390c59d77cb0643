// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Env-file codec: key=value newline-delimited.
//!
//! Values containing whitespace, quotes, or newlines are double-quoted with
//! backslash-escaped inner quotes; newlines are escaped as `\n` so every
//! entry stays on one line.

use indexmap::IndexMap;

/// Format an ordered map as an environment file.
pub fn format_env_file(env: &IndexMap<String, String>) -> String {
    let mut lines = Vec::with_capacity(env.len());
    for (key, value) in env {
        if value.contains(' ')
            || value.contains('\t')
            || value.contains('"')
            || value.contains('\'')
            || value.contains('\n')
        {
            let escaped = value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n");
            lines.push(format!("{}=\"{}\"", key, escaped));
        } else {
            lines.push(format!("{}={}", key, value));
        }
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Parse an environment file, preserving entry order.
///
/// Blank lines and `#` comments are skipped; lines without `=` are ignored.
/// A later entry for the same key shadows an earlier one.
pub fn parse_env_file(content: &str) -> IndexMap<String, String> {
    let mut env = IndexMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, raw_value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = unquote(raw_value.trim());
        env.insert(key.to_string(), value);
    }
    env
}

fn unquote(raw: &str) -> String {
    let inner = if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        &raw[1..raw.len() - 1]
    } else {
        return raw.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
#[path = "env_file_tests.rs"]
mod tests;
