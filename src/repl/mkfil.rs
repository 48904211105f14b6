// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::repl::reader::parse_len;
use crate::repl::Session;
use crate::result::{Error, Result};

/// `mkfil <name> <size>`: creates a zero-filled file of `<size>`
/// bytes in the current directory.
pub fn run(session: &mut Session, args: &[String]) -> Result<()> {
    let name = args.first().ok_or(Error::BadArgs)?;
    let size = parse_len(args.get(1).ok_or(Error::BadArgs)?)?;
    session.partition.create_file(session.cwd, name, size)?;
    Ok(())
}
