// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    plain = { "hello", "hello" },
    path = { "/usr/local/bin", "/usr/local/bin" },
    kv = { "KEY=value", "KEY=value" },
    space = { "hello world", "'hello world'" },
    dollar = { "$HOME", "'$HOME'" },
    backtick = { "`id`", "'`id`'" },
    semicolon = { "a;b", "'a;b'" },
    empty = { "", "''" },
)]
fn quoting(input: &str, expected: &str) {
    assert_eq!(sh_quote(input), expected);
}

#[test]
fn single_quotes_are_escaped() {
    assert_eq!(sh_quote("it's"), "'it'\\''s'");
}

#[test]
fn quoted_path() {
    let path = std::path::Path::new("/tmp/my dir/file");
    assert_eq!(sh_quote_path(path), "'/tmp/my dir/file'");
}
