// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The partition descriptor: a fixed-size record at offset 0.

use static_assertions::const_assert_eq;

use crate::partition::{BlockId, Partition};
use crate::result::{Error, Result};

/// Coarse magic tag identifying a file as a `blkvol` partition. Not a
/// checksum; spec.md's Non-goals explicitly exclude those.
const DESCRIPTOR_MAGIC: u64 = 0x626C_6B76_6F6C_0001; // "blkvol" + version

pub const DESCRIPTOR_SIZE: u64 = 40;
const_assert_eq!(DESCRIPTOR_SIZE, 5 * 8);

#[derive(Clone, Copy, Debug)]
pub struct PartitionDescriptor {
    pub partition_size: u64,
    pub free_head: BlockId,
    pub alloc_head: BlockId,
    pub root_dir: BlockId,
}

impl PartitionDescriptor {
    fn encode(&self) -> [u8; DESCRIPTOR_SIZE as usize] {
        let mut buf = [0u8; DESCRIPTOR_SIZE as usize];
        buf[0..8].copy_from_slice(&DESCRIPTOR_MAGIC.to_le_bytes());
        buf[8..16].copy_from_slice(&self.partition_size.to_le_bytes());
        buf[16..24].copy_from_slice(&self.free_head.offset().to_le_bytes());
        buf[24..32].copy_from_slice(&self.alloc_head.offset().to_le_bytes());
        buf[32..40].copy_from_slice(&self.root_dir.offset().to_le_bytes());
        buf
    }

    fn decode(buf: &[u8; DESCRIPTOR_SIZE as usize]) -> Result<PartitionDescriptor> {
        let magic = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        if magic != DESCRIPTOR_MAGIC {
            return Err(Error::BadMagic);
        }
        let partition_size = u64::from_le_bytes(buf[8..16].try_into().unwrap());
        let free_head = BlockId::new(u64::from_le_bytes(buf[16..24].try_into().unwrap()));
        let alloc_head = BlockId::new(u64::from_le_bytes(buf[24..32].try_into().unwrap()));
        let root_dir = BlockId::new(u64::from_le_bytes(buf[32..40].try_into().unwrap()));
        Ok(PartitionDescriptor { partition_size, free_head, alloc_head, root_dir })
    }
}

impl Partition {
    pub(crate) fn read_descriptor(&mut self) -> Result<PartitionDescriptor> {
        let mut buf = [0u8; DESCRIPTOR_SIZE as usize];
        self.store.read(0, &mut buf)?;
        PartitionDescriptor::decode(&buf)
    }

    pub(crate) fn write_descriptor(&mut self) -> Result<()> {
        self.store.write(0, &self.descriptor.encode())
    }
}
