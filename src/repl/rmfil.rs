// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::repl::Session;
use crate::result::{Error, Result};

/// `rmfil <name>`: removes a file from the current directory.
pub fn run(session: &mut Session, args: &[String]) -> Result<()> {
    let name = args.first().ok_or(Error::BadArgs)?;
    let id = session
        .partition
        .find_child(session.cwd, name)?
        .ok_or_else(|| Error::NotFound(name.clone()))?;
    session.partition.remove_file(id)
}
