// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A single-file block storage partition: a first-fit allocator over
//! an intrusive free list, with a small hierarchical filesystem
//! overlay and a line-oriented command interpreter built on top.

pub mod fs;
pub mod io;
pub mod partition;
pub mod repl;
pub mod result;
