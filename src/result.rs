// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::partition::BlockId;

/// Errors produced by the partition allocator and the filesystem
/// overlay built on top of it.
///
/// Variants fall into three classes, matching §7 of the design: I/O
/// failure and allocator exhaustion/corruption are FATAL
/// ([`Error::is_fatal`]); everything else is user-recoverable and the
/// REPL reports it without terminating.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a blkvol partition (bad descriptor magic)")]
    BadMagic,

    #[error("partition is full: no free block large enough for {0} bytes")]
    OutOfSpace(u64),

    #[error("block {0:?} is not allocated")]
    NotAllocated(BlockId),

    #[error(
        "free list is corrupt: encountered allocated block {0:?} on the free list"
    )]
    CorruptFreeList(BlockId),

    #[error("corrupt partition: physical walk could not locate block {0:?}")]
    CorruptLayout(BlockId),

    #[error("no root directory has been saved yet")]
    NoRoot,

    #[error("name must not be empty")]
    EmptyName,

    #[error("name exceeds the maximum of {max} characters")]
    NameTooLong { max: usize },

    #[error("'{0}' is not a valid name")]
    ReservedName(String),

    #[error("'{0}' not found")]
    NotFound(String),

    #[error("'{0}' already exists")]
    AlreadyExists(String),

    #[error("'{0}' is not a directory")]
    NotADirectory(String),

    #[error("'{0}' is not a file")]
    NotAFile(String),

    #[error("already at the root directory")]
    AlreadyAtRoot,

    #[error("directory structure is corrupt: {0}")]
    CorruptTree(String),

    #[error("unknown command: {0}")]
    NoCommand(String),

    #[error("bad command arguments")]
    BadArgs,

    /// Not a failure: the `exit` command's way of asking the REPL loop
    /// to stop (spec.md §6, "Exit code is 0 on EOF or `exit`").
    #[error("exit")]
    Exit,
}

/// Which exit code class a FATAL error belongs to: I/O failure gets a
/// distinguishing code from allocator exhaustion/corruption, per
/// spec.md §7.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitClass {
    Io,
    Corruption,
}

impl Error {
    /// Whether this error is FATAL (allocator corruption/exhaustion or
    /// I/O failure) rather than user-recoverable.
    pub fn is_fatal(&self) -> bool {
        self.exit_class().is_some()
    }

    pub fn exit_class(&self) -> Option<ExitClass> {
        match self {
            Error::Io(_) => Some(ExitClass::Io),
            Error::OutOfSpace(_)
            | Error::NotAllocated(_)
            | Error::CorruptFreeList(_)
            | Error::CorruptLayout(_) => Some(ExitClass::Corruption),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
