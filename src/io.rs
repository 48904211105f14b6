// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The backing store: byte-offset reads and writes against a single
//! host file. Every allocator operation ultimately lands here.
//!
//! There is no in-memory block cache beyond the descriptor held by
//! [`crate::partition::Partition`]; a short read or write, or a seek
//! failure, is FATAL (spec.md §4.1, §7) and is surfaced as
//! [`crate::result::Error::Io`].

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::result::Result;

/// A fixed-length file treated as a flat address space of bytes.
#[derive(Debug)]
pub struct FileStore {
    file: File,
}

impl FileStore {
    /// Opens an existing backing file for read/write.
    pub fn open(path: impl AsRef<Path>) -> Result<FileStore> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(FileStore { file })
    }

    /// Creates a new backing file of exactly `len` bytes, zero-filled.
    pub fn create(path: impl AsRef<Path>, len: u64) -> Result<FileStore> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        file.set_len(len)?;
        Ok(FileStore { file })
    }

    /// Reads exactly `dst.len()` bytes starting at `offset`.
    pub fn read(&mut self, offset: u64, dst: &mut [u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(dst)?;
        Ok(())
    }

    /// Writes exactly `src` starting at `offset`.
    pub fn write(&mut self, offset: u64, src: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(src)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}
