// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The block allocator: a single host file treated as a partition of
//! fixed-size storage, carved into FREE and ALLOCATED blocks threaded
//! through an intrusive doubly-linked free list.

mod alloc;
mod block;
mod descriptor;
pub mod report;

pub use block::{BlockHeader, BlockId, Magic, HEADER_SIZE};
pub use descriptor::PartitionDescriptor;
pub use report::Report;

use std::path::Path;

use log::info;

use crate::io::FileStore;
use crate::result::{Error, Result};

/// Blocks smaller than this (after a split) are left absorbed into the
/// allocation rather than split off as a new free block (spec.md §4.4).
pub const DEFAULT_SPLIT_THRESHOLD: u64 = 512;

/// An open partition: the backing store plus the cached descriptor
/// that names its free list, allocated list, and root directory.
///
/// This is an explicit, owned handle rather than global state: nothing
/// about the allocator's operation depends on process-wide mutable
/// statics, so more than one partition can be open at a time.
pub struct Partition {
    store: FileStore,
    descriptor: PartitionDescriptor,
    split_threshold: u64,
}

impl Partition {
    /// Creates a new partition whose usable data area is exactly
    /// `data_area_size` bytes (spec.md §3: `partition_size` excludes
    /// the descriptor), consisting of a single FREE block spanning
    /// that whole area. The backing file is extended to
    /// `DESCRIPTOR_SIZE + data_area_size` bytes.
    pub fn create(
        path: impl AsRef<Path>,
        data_area_size: u64,
        split_threshold: u64,
    ) -> Result<Partition> {
        let descriptor_size = descriptor::DESCRIPTOR_SIZE;
        if data_area_size <= HEADER_SIZE {
            return Err(Error::OutOfSpace(data_area_size));
        }
        let store = FileStore::create(path.as_ref(), descriptor_size + data_area_size)?;
        let first_block = BlockId::new(descriptor_size);

        let descriptor = PartitionDescriptor {
            partition_size: data_area_size,
            free_head: first_block,
            alloc_head: BlockId::NULL,
            root_dir: BlockId::NULL,
        };

        let mut partition = Partition { store, descriptor, split_threshold };
        partition.write_descriptor()?;
        let header = BlockHeader::free(data_area_size, BlockId::NULL, BlockId::NULL);
        partition.write_header(first_block, &header)?;
        partition.store.flush()?;
        info!("created partition of {data_area_size} data-area bytes at {:?}", path.as_ref());
        Ok(partition)
    }

    /// Opens an existing partition, reading its descriptor from the
    /// start of the backing file.
    pub fn open(path: impl AsRef<Path>, split_threshold: u64) -> Result<Partition> {
        let store = FileStore::open(path.as_ref())?;
        let mut partition = Partition {
            store,
            descriptor: PartitionDescriptor {
                partition_size: 0,
                free_head: BlockId::NULL,
                alloc_head: BlockId::NULL,
                root_dir: BlockId::NULL,
            },
            split_threshold,
        };
        partition.descriptor = partition.read_descriptor()?;
        info!("opened partition at {:?}", path.as_ref());
        Ok(partition)
    }

    pub fn size(&self) -> u64 {
        self.descriptor.partition_size
    }

    /// The absolute offset one past the end of the data area — the
    /// bound every physical walk stops at. `partition_size` itself
    /// excludes the descriptor (spec.md §3), so this is
    /// `DESCRIPTOR_SIZE + partition_size`, not `partition_size` alone.
    pub(crate) fn data_end(&self) -> u64 {
        descriptor::DESCRIPTOR_SIZE + self.descriptor.partition_size
    }

    pub fn split_threshold(&self) -> u64 {
        self.split_threshold
    }

    /// The block holding the root directory, if one has been
    /// established yet.
    pub fn root(&self) -> Option<BlockId> {
        if self.descriptor.root_dir.is_null() {
            None
        } else {
            Some(self.descriptor.root_dir)
        }
    }

    pub fn get_root(&self) -> Result<BlockId> {
        self.root().ok_or(Error::NoRoot)
    }

    pub fn save_root(&mut self, id: BlockId) -> Result<()> {
        self.descriptor.root_dir = id;
        self.write_descriptor()
    }

    /// Reads `len` bytes of payload starting just after the header at
    /// `id`.
    pub(crate) fn load_block(&mut self, id: BlockId, len: u64) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len as usize];
        self.store.read(id.offset() + HEADER_SIZE, &mut buf)?;
        Ok(buf)
    }

    /// Writes `data` as the payload starting just after the header at
    /// `id`.
    pub(crate) fn save_block(&mut self, id: BlockId, data: &[u8]) -> Result<()> {
        self.store.write(id.offset() + HEADER_SIZE, data)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.store.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// S1: creating a partition yields a single free block spanning
    /// the whole usable area, with an empty allocated list and no
    /// root directory.
    #[test]
    fn create_yields_one_free_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.img");
        let mut p = Partition::create(&path, 4096, DEFAULT_SPLIT_THRESHOLD).unwrap();

        assert!(p.root().is_none());
        assert_eq!(p.descriptor.alloc_head, BlockId::NULL);

        let head = p.descriptor.free_head;
        let header = p.read_header(head).unwrap();
        assert!(header.is_free());
        assert_eq!(header.size, 4096);
        assert_eq!(header.prev, BlockId::NULL);
        assert_eq!(header.next, BlockId::NULL);
    }

    #[test]
    fn open_round_trips_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.img");
        {
            let mut p = Partition::create(&path, 8192, DEFAULT_SPLIT_THRESHOLD).unwrap();
            p.save_root(BlockId::new(64)).unwrap();
        }
        let p = Partition::open(&path, DEFAULT_SPLIT_THRESHOLD).unwrap();
        assert_eq!(p.size(), 8192);
        assert_eq!(p.root(), Some(BlockId::new(64)));
    }

    #[test]
    fn create_rejects_too_small_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.img");
        assert!(Partition::create(&path, 8, DEFAULT_SPLIT_THRESHOLD).is_err());
    }
}
