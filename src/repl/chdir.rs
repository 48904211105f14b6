// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::repl::Session;
use crate::result::{Error, Result};

/// `chdir <name>`: moves into the named subdirectory, or up to the
/// parent when `<name>` is `..`.
pub fn run(session: &mut Session, args: &[String]) -> Result<()> {
    let name = args.first().ok_or(Error::BadArgs)?;
    session.cwd = session.partition.chdir(session.cwd, name)?;
    Ok(())
}
