// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! First-fit allocation, eager coalescing on free, and always-move
//! resize, all built on the intrusive free/allocated lists threaded
//! through [`BlockHeader`].

use log::debug;

use crate::partition::block::{BlockHeader, BlockId, HEADER_SIZE};
use crate::partition::{descriptor, Partition};
use crate::result::{Error, Result};

impl Partition {
    fn first_block_offset(&self) -> u64 {
        descriptor::DESCRIPTOR_SIZE
    }

    /// The block immediately following `id` in physical address
    /// space, whatever list (if any) it belongs to. `None` at the end
    /// of the partition.
    fn look_right(&mut self, id: BlockId, header: &BlockHeader) -> Result<Option<(BlockId, BlockHeader)>> {
        let next_offset = id.offset() + header.physical_size();
        if next_offset >= self.data_end() {
            return Ok(None);
        }
        let next_id = BlockId::new(next_offset);
        let next_header = self.read_header(next_id)?;
        Ok(Some((next_id, next_header)))
    }

    /// The block immediately preceding `id` in physical address
    /// space. There is no backward physical pointer, so this walks
    /// the partition from its first block; spec.md accepts this cost
    /// in exchange for not maintaining boundary tags.
    fn look_left(&mut self, id: BlockId) -> Result<Option<(BlockId, BlockHeader)>> {
        let mut cur = BlockId::new(self.first_block_offset());
        if cur.offset() == id.offset() {
            return Ok(None);
        }
        let data_end = self.data_end();
        loop {
            let header = self.read_header(cur)?;
            let end = cur.offset() + header.physical_size();
            if end == id.offset() {
                return Ok(Some((cur, header)));
            }
            if end > id.offset() || end >= data_end {
                return Err(Error::CorruptLayout(id));
            }
            cur = BlockId::new(end);
        }
    }

    fn unlink_free(&mut self, id: BlockId, header: &BlockHeader) -> Result<()> {
        if header.prev.is_null() {
            self.descriptor.free_head = header.next;
        } else {
            let mut prev = self.read_header(header.prev)?;
            prev.next = header.next;
            self.write_header(header.prev, &prev)?;
        }
        if !header.next.is_null() {
            let mut next = self.read_header(header.next)?;
            next.prev = header.prev;
            self.write_header(header.next, &next)?;
        }
        let _ = id;
        Ok(())
    }

    /// Points `prev`'s `next` (or `free_head`, if `prev` is null) at
    /// `target`, and `next`'s `prev` (if `next` is non-null) at
    /// `target`. Used to splice a free node into an arbitrary list
    /// position without disturbing the offset ordering invariant.
    fn relink_free_neighbors(&mut self, prev: BlockId, next: BlockId, target: BlockId) -> Result<()> {
        if prev.is_null() {
            self.descriptor.free_head = target;
        } else {
            let mut prev_header = self.read_header(prev)?;
            prev_header.next = target;
            self.write_header(prev, &prev_header)?;
        }
        if !next.is_null() {
            let mut next_header = self.read_header(next)?;
            next_header.prev = target;
            self.write_header(next, &next_header)?;
        }
        Ok(())
    }

    /// Writes a FREE header at `new_id` taking over the free-list slot
    /// vacated by `old_id` (same `prev`/`next`), preserving the
    /// offset-ordering invariant since `new_id` is carved from
    /// `old_id`'s own extent and so sorts between the same neighbors.
    fn replace_free_node(
        &mut self,
        old_header: &BlockHeader,
        new_id: BlockId,
        new_size: u64,
    ) -> Result<()> {
        let header = BlockHeader::free(new_size, old_header.prev, old_header.next);
        self.write_header(new_id, &header)?;
        self.relink_free_neighbors(old_header.prev, old_header.next, new_id)
    }

    /// Walks the free list from `free_head` to find the unique
    /// position keeping it ordered by offset once `id` is inserted:
    /// returns `(prev, next)` such that `prev.offset < id.offset <
    /// next.offset` (nulls at either end).
    fn free_insert_position(&mut self, id: BlockId) -> Result<(BlockId, BlockId)> {
        let mut prev = BlockId::NULL;
        let mut cur = self.descriptor.free_head;
        while !cur.is_null() && cur.offset() < id.offset() {
            let header = self.read_header(cur)?;
            prev = cur;
            cur = header.next;
        }
        Ok((prev, cur))
    }

    fn unlink_alloc(&mut self, header: &BlockHeader) -> Result<()> {
        if header.prev.is_null() {
            self.descriptor.alloc_head = header.next;
        } else {
            let mut prev = self.read_header(header.prev)?;
            prev.next = header.next;
            self.write_header(header.prev, &prev)?;
        }
        if !header.next.is_null() {
            let mut next = self.read_header(header.next)?;
            next.prev = header.prev;
            self.write_header(header.next, &next)?;
        }
        Ok(())
    }

    fn insert_alloc_head(&mut self, id: BlockId, size: u64) -> Result<()> {
        let old_head = self.descriptor.alloc_head;
        let header = BlockHeader::allocated(size, BlockId::NULL, old_head);
        self.write_header(id, &header)?;
        if !old_head.is_null() {
            let mut head = self.read_header(old_head)?;
            head.prev = id;
            self.write_header(old_head, &head)?;
        }
        self.descriptor.alloc_head = id;
        Ok(())
    }

    /// Finds the first free block able to hold `payload_size` bytes,
    /// splits off the remainder when it would be at least
    /// [`Partition::split_threshold`] bytes, and returns the newly
    /// allocated block. FATAL ([`Error::OutOfSpace`]) when no free
    /// block is big enough.
    pub fn allocate_block(&mut self, payload_size: u64) -> Result<BlockId> {
        let needed = HEADER_SIZE + payload_size;

        let mut cur = self.descriptor.free_head;
        while !cur.is_null() {
            let header = self.read_header(cur)?;
            if !header.is_free() {
                return Err(Error::CorruptFreeList(cur));
            }
            if header.size >= needed {
                let remainder = header.size - needed;

                if remainder >= self.split_threshold {
                    // The remainder occupies the tail of this same
                    // free block, so it sorts between the same
                    // neighbors `cur` did; hand it that list slot
                    // directly instead of unlinking and re-walking.
                    let remainder_id = BlockId::new(cur.offset() + needed);
                    self.replace_free_node(&header, remainder_id, remainder)?;
                    self.insert_alloc_head(cur, payload_size)?;
                } else {
                    // Absorb the slack into the allocation rather
                    // than split off a sliver nothing could use.
                    self.unlink_free(cur, &header)?;
                    let absorbed = payload_size + remainder;
                    self.insert_alloc_head(cur, absorbed)?;
                }

                self.write_descriptor()?;
                debug!("allocated {payload_size} bytes at {cur:?}");
                return Ok(cur);
            }
            cur = header.next;
        }

        Err(Error::OutOfSpace(payload_size))
    }

    /// Returns `id` to the free list, eagerly coalescing with any
    /// physically adjacent free neighbor on either side while
    /// preserving the free list's offset ordering (spec.md §4.5,
    /// invariant 3).
    pub fn free_block(&mut self, id: BlockId) -> Result<()> {
        let alloc_header = self.read_header(id)?;
        if alloc_header.is_free() {
            return Err(Error::NotAllocated(id));
        }
        self.unlink_alloc(&alloc_header)?;

        let freed_size = alloc_header.physical_size();
        let left = self.look_left(id)?.filter(|(_, h)| h.is_free());
        let right = self.look_right(id, &alloc_header)?.filter(|(_, h)| h.is_free());

        // L and R, when free, are necessarily adjacent to each other
        // in the free list too: nothing but `id` sits between them
        // physically, and the list is offset-ordered. So coalescing
        // never needs more than each side's own prev/next.
        let (base, size) = match (left, right) {
            (Some((left_id, left_header)), Some((_, right_header))) => {
                let size = left_header.size + freed_size + right_header.size;
                let header = BlockHeader::free(size, left_header.prev, right_header.next);
                self.write_header(left_id, &header)?;
                if !right_header.next.is_null() {
                    let mut next = self.read_header(right_header.next)?;
                    next.prev = left_id;
                    self.write_header(right_header.next, &next)?;
                }
                (left_id, size)
            }
            (Some((left_id, left_header)), None) => {
                let size = left_header.size + freed_size;
                let header = BlockHeader::free(size, left_header.prev, left_header.next);
                self.write_header(left_id, &header)?;
                (left_id, size)
            }
            (None, Some((_, right_header))) => {
                // Take over R's list slot; the combined block starts
                // at `id`, not at R's old offset.
                let size = freed_size + right_header.size;
                let header = BlockHeader::free(size, right_header.prev, right_header.next);
                self.write_header(id, &header)?;
                self.relink_free_neighbors(right_header.prev, right_header.next, id)?;
                (id, size)
            }
            (None, None) => {
                let (prev, next) = self.free_insert_position(id)?;
                let header = BlockHeader::free(freed_size, prev, next);
                self.write_header(id, &header)?;
                self.relink_free_neighbors(prev, next, id)?;
                (id, freed_size)
            }
        };

        self.write_descriptor()?;
        debug!("freed block at {id:?}, coalesced region at {base:?} ({size} bytes)");
        Ok(())
    }

    /// Resizes the allocation at `id` to `new_payload_size`, always by
    /// moving: a new block is allocated, the lesser of the old and
    /// new payload sizes is copied over, and the old block is freed.
    /// `id == BlockId::NULL` behaves as a plain `allocate_block`
    /// (spec.md §4.6) — there is nothing to copy from or free.
    pub fn resize_block(&mut self, id: BlockId, new_payload_size: u64) -> Result<BlockId> {
        if id.is_null() {
            return self.allocate_block(new_payload_size);
        }
        let header = self.read_header(id)?;
        if header.is_free() {
            return Err(Error::NotAllocated(id));
        }
        let old_payload_size = header.size;
        let data = self.load_block(id, old_payload_size)?;

        let new_id = self.allocate_block(new_payload_size)?;
        let copy_len = old_payload_size.min(new_payload_size) as usize;
        self.save_block(new_id, &data[..copy_len])?;
        self.free_block(id)?;
        Ok(new_id)
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Partition, DEFAULT_SPLIT_THRESHOLD};
    use super::BlockId;

    fn scratch(size: u64, split_threshold: u64) -> Partition {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.img");
        Partition::create(&path, size, split_threshold).unwrap()
    }

    /// S2: an allocation on a fresh partition splits the single free
    /// block, leaving a smaller free remainder and one allocated
    /// block at the start of the usable area.
    #[test]
    fn allocate_splits_the_initial_free_block() {
        let mut p = scratch(65536, DEFAULT_SPLIT_THRESHOLD);
        let id = p.allocate_block(256).unwrap();

        let header = p.read_header(id).unwrap();
        assert!(!header.is_free());
        assert_eq!(header.size, 256);
        assert_eq!(p.descriptor.alloc_head, id);
        assert!(!p.descriptor.free_head.is_null());
        assert_ne!(p.descriptor.free_head, id);
    }

    /// S3: freeing the only allocation on a partition restores a
    /// single free block spanning the whole usable area again.
    #[test]
    fn free_after_single_allocate_restores_one_free_block() {
        let mut p = scratch(65536, DEFAULT_SPLIT_THRESHOLD);
        let original_head = p.descriptor.free_head;
        let id = p.allocate_block(256).unwrap();
        p.free_block(id).unwrap();

        assert!(p.descriptor.alloc_head.is_null());
        let head = p.descriptor.free_head;
        let header = p.read_header(head).unwrap();
        assert!(header.is_free());
        assert_eq!(header.size, 65536);
        let _ = original_head;
    }

    /// S4: a remainder smaller than the split threshold is absorbed
    /// rather than left behind as an unusable sliver.
    #[test]
    fn small_remainder_is_absorbed_not_split() {
        let mut p = scratch(1024, 512);
        let free_size = p.read_header(p.descriptor.free_head).unwrap().size;
        // Ask for everything except a remainder too small to split.
        let payload = free_size - super::HEADER_SIZE - 100;
        let id = p.allocate_block(payload).unwrap();

        assert!(p.descriptor.free_head.is_null());
        let header = p.read_header(id).unwrap();
        assert_eq!(header.size, payload + 100);
    }

    /// S5: freeing two adjacent allocations coalesces them into one
    /// free block rather than leaving two fragments.
    #[test]
    fn freeing_adjacent_allocations_coalesces() {
        let mut p = scratch(65536, DEFAULT_SPLIT_THRESHOLD);
        let a = p.allocate_block(1000).unwrap();
        let b = p.allocate_block(2000).unwrap();

        p.free_block(a).unwrap();
        p.free_block(b).unwrap();

        // Only one free block should remain, spanning the entire
        // usable area again.
        let head = p.descriptor.free_head;
        let header = p.read_header(head).unwrap();
        assert_eq!(header.next, BlockId::NULL);
        assert_eq!(header.size, 65536);
    }

    /// S6: resizing always moves; the old block is freed and its
    /// contents survive in the new one.
    #[test]
    fn resize_moves_and_preserves_contents() {
        let mut p = scratch(65536, DEFAULT_SPLIT_THRESHOLD);
        let id = p.allocate_block(64).unwrap();
        p.save_block(id, &[7u8; 64]).unwrap();

        let new_id = p.resize_block(id, 256).unwrap();
        assert_ne!(new_id, id);

        let data = p.load_block(new_id, 256).unwrap();
        assert_eq!(&data[..64], &[7u8; 64]);

        // Old block must now read as free (or have become part of a
        // coalesced free block) rather than allocated.
        assert!(p.read_header(id).is_err() || p.read_header(id).unwrap().is_free());
    }

    /// Resizing the null block id is equivalent to a fresh allocation
    /// (spec.md §4.6).
    #[test]
    fn resize_of_null_id_allocates() {
        let mut p = scratch(65536, DEFAULT_SPLIT_THRESHOLD);
        let id = p.resize_block(BlockId::NULL, 100).unwrap();
        assert!(!p.read_header(id).unwrap().is_free());
    }

    /// No two adjacent blocks are ever both free (spec.md §8).
    #[test]
    fn no_adjacent_free_blocks_after_churn() {
        let mut p = scratch(65536, DEFAULT_SPLIT_THRESHOLD);
        let a = p.allocate_block(500).unwrap();
        let b = p.allocate_block(500).unwrap();
        let c = p.allocate_block(500).unwrap();
        p.free_block(b).unwrap();
        p.free_block(a).unwrap();
        p.free_block(c).unwrap();

        let data_end = p.data_end();
        let mut cur = BlockId::new(super::descriptor::DESCRIPTOR_SIZE);
        let mut prev_was_free = false;
        while cur.offset() < data_end {
            let header = p.read_header(cur).unwrap();
            assert!(!(prev_was_free && header.is_free()), "adjacent free blocks at {cur:?}");
            prev_was_free = header.is_free();
            cur = BlockId::new(cur.offset() + header.physical_size());
        }
    }

    /// Allocating then freeing a block restores the previous free
    /// list head (spec.md §8).
    #[test]
    fn allocate_then_free_restores_free_head() {
        let mut p = scratch(65536, DEFAULT_SPLIT_THRESHOLD);
        let head_before = p.descriptor.free_head;
        let id = p.allocate_block(123).unwrap();
        p.free_block(id).unwrap();
        assert_eq!(p.descriptor.free_head, head_before);
    }

    /// Free-list offsets strictly increase along the list, even after
    /// a split leaves a remainder and a free in the middle is
    /// released (spec.md §8, testable property 3).
    #[test]
    fn free_list_stays_ordered_by_offset() {
        let mut p = scratch(1 << 16, DEFAULT_SPLIT_THRESHOLD);
        let _a = p.allocate_block(2000).unwrap();
        let b = p.allocate_block(2000).unwrap();
        let _c = p.allocate_block(2000).unwrap();
        let d = p.allocate_block(2000).unwrap();
        let _e = p.allocate_block(2000).unwrap();

        // b has no free neighbor yet (a, c both allocated), so it
        // becomes the sole non-tail free entry.
        p.free_block(b).unwrap();
        // d also has no free neighbor (c, e both allocated) and sits
        // strictly between b and the tail free block by offset; a
        // head-only insertion would wrongly place it before b.
        p.free_block(d).unwrap();

        let mut cur = p.descriptor.free_head;
        let mut prev_offset = None;
        while !cur.is_null() {
            if let Some(prev) = prev_offset {
                assert!(cur.offset() > prev, "free list offsets must strictly increase");
            }
            prev_offset = Some(cur.offset());
            cur = p.read_header(cur).unwrap().next;
        }
        assert_eq!(p.descriptor.free_head, b);
    }

    #[test]
    fn exhausting_the_partition_reports_out_of_space() {
        let mut p = scratch(4096, DEFAULT_SPLIT_THRESHOLD);
        let free_size = p.read_header(p.descriptor.free_head).unwrap().size;
        assert!(p.allocate_block(free_size - super::HEADER_SIZE + 1).is_err());
    }
}
