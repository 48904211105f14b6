// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::repl::Session;
use crate::result::Result;

/// `root`: establishes the root directory if the partition doesn't
/// have one yet, and moves the current directory there.
pub fn run(session: &mut Session, _args: &[String]) -> Result<()> {
    let root = match session.partition.root() {
        Some(root) => root,
        None => session.partition.init_root()?,
    };
    session.cwd = root;
    Ok(())
}
