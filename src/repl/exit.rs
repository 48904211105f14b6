// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::repl::Session;
use crate::result::{Error, Result};

/// `exit`: stops the interpreter loop immediately, the way `pr4.c`'s
/// `do_exit` calls `exit(0)`. Signaled as an error variant purely so
/// it can be returned from a `Handler`; `repl::run` special-cases
/// [`Error::Exit`] to stop without reporting a failure.
pub fn run(_session: &mut Session, _args: &[String]) -> Result<()> {
    Err(Error::Exit)
}
