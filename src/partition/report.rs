// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The diagnostic report printed by the `info` command: a physical
//! walk of every block, free or allocated, tallying totals.

use crate::partition::{descriptor, BlockId, Partition};
use crate::result::Result;

/// A summary produced by walking the partition's blocks in physical
/// order once.
#[derive(Clone, Copy, Debug, Default)]
pub struct Report {
    pub partition_size: u64,
    pub free_blocks: u64,
    pub free_bytes: u64,
    pub allocated_blocks: u64,
    pub allocated_bytes: u64,
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "partition size:   {} bytes", self.partition_size)?;
        writeln!(
            f,
            "free blocks:      {} ({} bytes)",
            self.free_blocks, self.free_bytes
        )?;
        write!(
            f,
            "allocated blocks: {} ({} bytes)",
            self.allocated_blocks, self.allocated_bytes
        )
    }
}

impl Partition {
    /// Walks every block in physical order exactly once, tallying
    /// free and allocated counts and byte totals. A corrupt layout
    /// (a block claiming a size that overshoots the partition) is
    /// reported as [`crate::result::Error::CorruptLayout`].
    pub fn report(&mut self) -> Result<Report> {
        let mut report = Report { partition_size: self.descriptor.partition_size, ..Default::default() };

        let data_end = self.data_end();
        let mut cur = BlockId::new(descriptor::DESCRIPTOR_SIZE);
        while cur.offset() < data_end {
            let header = self.read_header(cur)?;
            if header.is_free() {
                report.free_blocks += 1;
                report.free_bytes += header.size;
            } else {
                report.allocated_blocks += 1;
                report.allocated_bytes += header.size;
            }

            let next = cur.offset() + header.physical_size();
            if next <= cur.offset() || next > data_end {
                return Err(crate::result::Error::CorruptLayout(cur));
            }
            cur = BlockId::new(next);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use crate::partition::{Partition, DEFAULT_SPLIT_THRESHOLD};

    #[test]
    fn report_on_fresh_partition_is_all_free() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.img");
        let mut p = Partition::create(&path, 65536, DEFAULT_SPLIT_THRESHOLD).unwrap();
        let report = p.report().unwrap();

        assert_eq!(report.free_blocks, 1);
        assert_eq!(report.allocated_blocks, 0);
        assert_eq!(report.partition_size, 65536);
    }

    #[test]
    fn report_reflects_one_allocation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.img");
        let mut p = Partition::create(&path, 65536, DEFAULT_SPLIT_THRESHOLD).unwrap();
        p.allocate_block(1000).unwrap();

        let report = p.report().unwrap();
        assert_eq!(report.free_blocks, 1);
        assert_eq!(report.allocated_blocks, 1);
        assert_eq!(report.allocated_bytes, 1000);
    }
}
