// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::warn;

use crate::repl::reader::parse_len;
use crate::repl::Session;
use crate::result::{Error, Result};

/// `szfil <name> <size>`: resizes a file in place. Shrinking a file
/// discards its trailing bytes; a warning is logged when that happens
/// so the loss isn't silent.
pub fn run(session: &mut Session, args: &[String]) -> Result<()> {
    let name = args.first().ok_or(Error::BadArgs)?;
    let new_size = parse_len(args.get(1).ok_or(Error::BadArgs)?)?;
    let id = session
        .partition
        .find_child(session.cwd, name)?
        .ok_or_else(|| Error::NotFound(name.clone()))?;
    let node = session.partition.read_node(id)?;
    if node.is_directory {
        return Err(Error::NotAFile(name.clone()));
    }
    if new_size < node.size {
        warn!("szfil: shrinking '{name}' from {} to {new_size} bytes discards trailing data", node.size);
    }
    session.partition.resize_file(id, new_size)
}
