// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Line tokenization: each input line is `cmd name [arg]`, where the
//! meaning of the trailing argument (a size, a new name) depends on
//! `cmd`.

use crate::result::{Error, Result};

#[derive(Clone, Debug)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

/// Tokenizes one input line. Blank lines and lines starting with `#`
/// produce `None`; anything else must start with a command name.
pub fn read_line(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let mut tokens = line.split_ascii_whitespace();
    let name = tokens.next()?.to_string();
    let args = tokens.map(str::to_string).collect();
    Some(Command { name, args })
}

/// Parses a plain unsigned integer, accepting `0x`/`0o`/`0b` prefixes
/// the way numeric literals are commonly written at a debugger-style
/// prompt.
pub fn parse_num(tok: &str) -> Result<u64> {
    let tok = tok.replace('_', "");
    let (radix, digits) = match tok.as_str() {
        s if s.starts_with("0x") || s.starts_with("0X") => (16, &s[2..]),
        s if s.starts_with("0o") || s.starts_with("0O") => (8, &s[2..]),
        s if s.starts_with("0b") || s.starts_with("0B") => (2, &s[2..]),
        s => (10, s),
    };
    u64::from_str_radix(digits, radix).map_err(|_| Error::BadArgs)
}

/// Parses a byte count, accepting a trailing `k`/`m`/`g` (case
/// insensitive) power-of-two multiplier suffix.
pub fn parse_len(mut tok: &str) -> Result<u64> {
    let mut multiplier: u64 = 1;
    if let Some(rest) = tok.strip_suffix(['k', 'K']) {
        multiplier = 1024;
        tok = rest;
    } else if let Some(rest) = tok.strip_suffix(['m', 'M']) {
        multiplier = 1024 * 1024;
        tok = rest;
    } else if let Some(rest) = tok.strip_suffix(['g', 'G']) {
        multiplier = 1024 * 1024 * 1024;
        tok = rest;
    }
    let num = parse_num(tok)?;
    num.checked_mul(multiplier).ok_or(Error::BadArgs)
}
