// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::repl::Session;
use crate::result::Result;

/// `print`: shows the partition-wide allocation report, then
/// recursively lists the current directory's contents.
pub fn run(session: &mut Session, _args: &[String]) -> Result<()> {
    println!("{}", session.partition.report()?);
    for line in session.partition.print_tree(session.cwd)? {
        println!("{line}");
    }
    Ok(())
}
