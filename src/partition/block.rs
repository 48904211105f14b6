// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Block ids and the fixed block header every block (free or
//! allocated) begins with.

use static_assertions::const_assert_eq;

use crate::partition::Partition;
use crate::result::{Error, Result};

/// A byte offset into the backing file. `0` is reserved as the null
/// id: the partition descriptor lives at offset 0, so no valid block
/// ever starts there.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BlockId(u64);

impl BlockId {
    pub const NULL: BlockId = BlockId(0);

    pub(crate) fn new(offset: u64) -> BlockId {
        BlockId(offset)
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn offset(self) -> u64 {
        self.0
    }
}

impl std::fmt::Debug for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:#x}", self.0)
    }
}

/// Sentinel values distinguishing a FREE block header from an
/// ALLOCATED one. Values are arbitrary but fixed; this is the coarse
/// magic tag the design allows in place of a real checksum.
const MAGIC_FREE: u64 = 0xEEF4_EEF4_0000_0001;
const MAGIC_ALLOCATED: u64 = 0xEDA7_0C11_0A00_0002;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Magic {
    Free,
    Allocated,
}

impl Magic {
    fn to_raw(self) -> u64 {
        match self {
            Magic::Free => MAGIC_FREE,
            Magic::Allocated => MAGIC_ALLOCATED,
        }
    }

    fn from_raw(raw: u64) -> Option<Magic> {
        match raw {
            MAGIC_FREE => Some(Magic::Free),
            MAGIC_ALLOCATED => Some(Magic::Allocated),
            _ => None,
        }
    }
}

/// The header every block begins with. `size` follows the
/// per-magic convention fixed in spec.md §3: for a FREE block it
/// includes this header; for an ALLOCATED block it is payload-only.
#[derive(Clone, Copy, Debug)]
pub struct BlockHeader {
    pub magic: Magic,
    pub size: u64,
    pub prev: BlockId,
    pub next: BlockId,
}

pub const HEADER_SIZE: u64 = 32;
const_assert_eq!(HEADER_SIZE, 4 * 8);

impl BlockHeader {
    pub fn free(size: u64, prev: BlockId, next: BlockId) -> BlockHeader {
        BlockHeader { magic: Magic::Free, size, prev, next }
    }

    pub fn allocated(size: u64, prev: BlockId, next: BlockId) -> BlockHeader {
        BlockHeader { magic: Magic::Allocated, size, prev, next }
    }

    pub fn is_free(&self) -> bool {
        self.magic == Magic::Free
    }

    /// The size of the physical block on disk (header + occupied
    /// bytes), regardless of the per-magic `size` convention.
    pub fn physical_size(&self) -> u64 {
        match self.magic {
            Magic::Free => self.size,
            Magic::Allocated => HEADER_SIZE + self.size,
        }
    }

    fn encode(&self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];
        buf[0..8].copy_from_slice(&self.magic.to_raw().to_le_bytes());
        buf[8..16].copy_from_slice(&self.size.to_le_bytes());
        buf[16..24].copy_from_slice(&self.prev.offset().to_le_bytes());
        buf[24..32].copy_from_slice(&self.next.offset().to_le_bytes());
        buf
    }

    fn decode(buf: &[u8; HEADER_SIZE as usize]) -> Result<BlockHeader> {
        let magic = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let magic = Magic::from_raw(magic).ok_or(Error::BadMagic)?;
        let size = u64::from_le_bytes(buf[8..16].try_into().unwrap());
        let prev = BlockId::new(u64::from_le_bytes(buf[16..24].try_into().unwrap()));
        let next = BlockId::new(u64::from_le_bytes(buf[24..32].try_into().unwrap()));
        Ok(BlockHeader { magic, size, prev, next })
    }
}

impl Partition {
    /// Reads the header at `id`.
    pub(crate) fn read_header(&mut self, id: BlockId) -> Result<BlockHeader> {
        let mut buf = [0u8; HEADER_SIZE as usize];
        self.store.read(id.offset(), &mut buf)?;
        BlockHeader::decode(&buf)
    }

    /// Writes `header` at `id`.
    pub(crate) fn write_header(
        &mut self,
        id: BlockId,
        header: &BlockHeader,
    ) -> Result<()> {
        self.store.write(id.offset(), &header.encode())
    }
}
