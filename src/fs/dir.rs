// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Directory slot tables, and the file/directory operations built on
//! top of them: create, remove, rename, resize, navigate, print.

use crate::fs::{validate_name, Node, NODE_HEADER_SIZE};
use crate::partition::{BlockId, Partition};
use crate::result::{Error, Result};

/// A directory starts with this many child slots; it doubles via
/// [`Partition::resize_block`] whenever a new child finds no empty
/// slot (spec.md §4.12).
pub const INITIAL_DIR_SLOTS: u64 = 128;

const SLOT_SIZE: u64 = 8;

impl Partition {
    fn read_slots(&mut self, node: &Node) -> Result<Vec<BlockId>> {
        let bytes = self.load_block(node.contents, node.size * SLOT_SIZE)?;
        Ok(bytes
            .chunks_exact(SLOT_SIZE as usize)
            .map(|c| BlockId::new(u64::from_le_bytes(c.try_into().unwrap())))
            .collect())
    }

    fn write_slots(&mut self, node: &Node, slots: &[BlockId]) -> Result<()> {
        let mut bytes = Vec::with_capacity(slots.len() * SLOT_SIZE as usize);
        for slot in slots {
            bytes.extend_from_slice(&slot.offset().to_le_bytes());
        }
        self.save_block(node.contents, &bytes)
    }

    fn create_node(
        &mut self,
        parent: BlockId,
        name: &str,
        is_directory: bool,
        contents: BlockId,
        size: u64,
    ) -> Result<BlockId> {
        let self_id = self.allocate_block(NODE_HEADER_SIZE)?;
        let node = Node {
            is_directory,
            parent,
            self_id,
            contents,
            size,
            name: name.to_string(),
        };
        self.write_node(&node)?;
        Ok(self_id)
    }

    pub(crate) fn create_root_node(&mut self) -> Result<BlockId> {
        let slots = self.allocate_block(INITIAL_DIR_SLOTS * SLOT_SIZE)?;
        self.save_block(slots, &vec![0u8; (INITIAL_DIR_SLOTS * SLOT_SIZE) as usize])?;
        self.create_node(BlockId::NULL, "", true, slots, INITIAL_DIR_SLOTS)
    }

    fn find_free_slot(&mut self, node: &Node, slots: &mut Vec<BlockId>) -> Result<usize> {
        if let Some(index) = slots.iter().position(|s| s.is_null()) {
            return Ok(index);
        }
        let old_capacity = node.size;
        let new_capacity = old_capacity * 2;
        let new_contents = self.resize_block(node.contents, new_capacity * SLOT_SIZE)?;

        let grown = Node { contents: new_contents, size: new_capacity, ..node.clone() };
        let mut new_slots = self.read_slots(&grown)?;
        for slot in new_slots.iter_mut().skip(old_capacity as usize) {
            *slot = BlockId::NULL;
        }
        self.write_slots(&grown, &new_slots)?;
        self.write_node(&grown)?;
        *slots = new_slots;
        Ok(old_capacity as usize)
    }

    fn dir_add_child(&mut self, dir: BlockId, child: BlockId) -> Result<()> {
        let node = self.read_node(dir)?;
        let mut slots = self.read_slots(&node)?;
        let index = self.find_free_slot(&node, &mut slots)?;

        let node = self.read_node(dir)?;
        slots[index] = child;
        self.write_slots(&node, &slots)
    }

    fn dir_remove_child(&mut self, dir: BlockId, child: BlockId) -> Result<()> {
        let node = self.read_node(dir)?;
        let mut slots = self.read_slots(&node)?;
        if let Some(index) = slots.iter().position(|&s| s == child) {
            slots[index] = BlockId::NULL;
            self.write_slots(&node, &slots)?;
        }
        Ok(())
    }

    /// Looks up `name` among `dir`'s children.
    pub fn find_child(&mut self, dir: BlockId, name: &str) -> Result<Option<BlockId>> {
        let node = self.read_node(dir)?;
        let slots = self.read_slots(&node)?;
        for slot in slots {
            if slot.is_null() {
                continue;
            }
            let child = self.read_node(slot)?;
            if child.name == name {
                return Ok(Some(slot));
            }
        }
        Ok(None)
    }

    /// Lists the non-empty children of `dir` as `(id, node)` pairs, in
    /// slot order.
    pub fn list_children(&mut self, dir: BlockId) -> Result<Vec<(BlockId, Node)>> {
        let node = self.read_node(dir)?;
        let slots = self.read_slots(&node)?;
        let mut out = Vec::new();
        for slot in slots {
            if slot.is_null() {
                continue;
            }
            out.push((slot, self.read_node(slot)?));
        }
        Ok(out)
    }

    /// Creates a new subdirectory named `name` under `parent`.
    pub fn create_directory(&mut self, parent: BlockId, name: &str) -> Result<BlockId> {
        validate_name(name)?;
        let parent_node = self.read_node(parent)?;
        if !parent_node.is_directory {
            return Err(Error::NotADirectory(parent_node.name));
        }
        if self.find_child(parent, name)?.is_some() {
            return Err(Error::AlreadyExists(name.to_string()));
        }

        let slots = self.allocate_block(INITIAL_DIR_SLOTS * SLOT_SIZE)?;
        self.save_block(slots, &vec![0u8; (INITIAL_DIR_SLOTS * SLOT_SIZE) as usize])?;
        let id = self.create_node(parent, name, true, slots, INITIAL_DIR_SLOTS)?;
        self.dir_add_child(parent, id)?;
        Ok(id)
    }

    /// Creates a new file named `name` under `parent`, with an
    /// initial size of `size` zero-filled bytes.
    pub fn create_file(&mut self, parent: BlockId, name: &str, size: u64) -> Result<BlockId> {
        validate_name(name)?;
        let parent_node = self.read_node(parent)?;
        if !parent_node.is_directory {
            return Err(Error::NotADirectory(parent_node.name));
        }
        if self.find_child(parent, name)?.is_some() {
            return Err(Error::AlreadyExists(name.to_string()));
        }

        let payload = self.allocate_block(size)?;
        self.save_block(payload, &vec![0u8; size as usize])?;
        let id = self.create_node(parent, name, false, payload, size)?;
        self.dir_add_child(parent, id)?;
        Ok(id)
    }

    /// Removes the file `id` from its parent and frees its blocks.
    pub fn remove_file(&mut self, id: BlockId) -> Result<()> {
        let node = self.read_node(id)?;
        if node.is_directory {
            return Err(Error::NotAFile(node.name));
        }
        self.dir_remove_child(node.parent, id)?;
        self.free_block(node.contents)?;
        self.free_block(id)
    }

    /// Removes the directory `id` and everything beneath it.
    pub fn remove_directory(&mut self, id: BlockId) -> Result<()> {
        let node = self.read_node(id)?;
        if !node.is_directory {
            return Err(Error::NotADirectory(node.name));
        }
        for (child_id, child) in self.list_children(id)? {
            if child.is_directory {
                self.remove_directory(child_id)?;
            } else {
                self.remove_file(child_id)?;
            }
        }
        if !node.parent.is_null() {
            self.dir_remove_child(node.parent, id)?;
        }
        self.free_block(node.contents)?;
        self.free_block(id)
    }

    /// Renames node `id` in place, within its current parent.
    pub fn rename(&mut self, id: BlockId, new_name: &str) -> Result<()> {
        validate_name(new_name)?;
        let mut node = self.read_node(id)?;
        if let Some(existing) = self.find_child(node.parent, new_name)? {
            if existing != id {
                return Err(Error::AlreadyExists(new_name.to_string()));
            }
        }
        node.name = new_name.to_string();
        self.write_node(&node)
    }

    /// Resizes a file's payload to exactly `new_size` bytes, zero
    /// filling any newly grown region. Shrinking discards trailing
    /// data.
    pub fn resize_file(&mut self, id: BlockId, new_size: u64) -> Result<()> {
        let mut node = self.read_node(id)?;
        if node.is_directory {
            return Err(Error::NotAFile(node.name));
        }
        let old_size = node.size;
        let new_contents = self.resize_block(node.contents, new_size)?;
        if new_size > old_size {
            let mut data = self.load_block(new_contents, new_size)?;
            for byte in &mut data[old_size as usize..] {
                *byte = 0;
            }
            self.save_block(new_contents, &data)?;
        }
        node.contents = new_contents;
        node.size = new_size;
        self.write_node(&node)
    }

    /// Moves from `cwd` to the child directory named `name`, or to
    /// the parent when `name` is `".."`.
    pub fn chdir(&mut self, cwd: BlockId, name: &str) -> Result<BlockId> {
        if name == ".." {
            let node = self.read_node(cwd)?;
            if node.parent.is_null() {
                return Err(Error::AlreadyAtRoot);
            }
            return Ok(node.parent);
        }
        let child = self
            .find_child(cwd, name)?
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        let node = self.read_node(child)?;
        if !node.is_directory {
            return Err(Error::NotADirectory(name.to_string()));
        }
        Ok(child)
    }

    /// Renders `dir` and everything beneath it the way `pr4.c`'s
    /// `printAll` does: the accumulated relative path, that
    /// directory's immediate files (or `<no files>`), then a blank
    /// line, and only after that the subdirectories, depth-first.
    pub fn print_tree(&mut self, dir: BlockId) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        let mut path = self.read_node(dir)?.name;
        self.print_tree_at(dir, &mut path, &mut lines)?;
        Ok(lines)
    }

    fn print_tree_at(&mut self, dir: BlockId, path: &mut String, lines: &mut Vec<String>) -> Result<()> {
        lines.push(format!("{path}:"));

        let children = self.list_children(dir)?;
        let mut has_file = false;
        for (_, child) in &children {
            if !child.is_directory {
                lines.push(format!("  {}, {} bytes", child.name, child.size));
                has_file = true;
            }
        }
        if !has_file {
            lines.push("  <no files>".to_string());
        }
        lines.push(String::new());

        for (child_id, child) in &children {
            if child.is_directory {
                let mark = path.len();
                if !path.is_empty() {
                    path.push('/');
                }
                path.push_str(&child.name);
                self.print_tree_at(*child_id, path, lines)?;
                path.truncate(mark);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::DEFAULT_SPLIT_THRESHOLD;

    fn fresh() -> (Partition, BlockId) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.img");
        let mut p = Partition::create(&path, 1 << 20, DEFAULT_SPLIT_THRESHOLD).unwrap();
        let root = p.init_root().unwrap();
        (p, root)
    }

    #[test]
    fn mkdir_and_find_child_round_trip() {
        let (mut p, root) = fresh();
        let etc = p.create_directory(root, "etc").unwrap();
        let found = p.find_child(root, "etc").unwrap();
        assert_eq!(found, Some(etc));
    }

    #[test]
    fn mkfil_then_rmfil_removes_from_parent() {
        let (mut p, root) = fresh();
        let f = p.create_file(root, "a.txt", 64).unwrap();
        assert!(p.find_child(root, "a.txt").unwrap().is_some());
        p.remove_file(f).unwrap();
        assert!(p.find_child(root, "a.txt").unwrap().is_none());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let (mut p, root) = fresh();
        p.create_directory(root, "dup").unwrap();
        assert!(matches!(p.create_directory(root, "dup"), Err(Error::AlreadyExists(_))));
        assert!(matches!(p.create_file(root, "dup", 4), Err(Error::AlreadyExists(_))));
    }

    #[test]
    fn rmdir_is_recursive() {
        let (mut p, root) = fresh();
        let sub = p.create_directory(root, "sub").unwrap();
        p.create_file(sub, "leaf", 16).unwrap();
        p.create_directory(sub, "nested").unwrap();

        p.remove_directory(sub).unwrap();
        assert!(p.find_child(root, "sub").unwrap().is_none());
    }

    #[test]
    fn directory_grows_past_initial_slot_count() {
        let (mut p, root) = fresh();
        for i in 0..(INITIAL_DIR_SLOTS + 10) {
            p.create_file(root, &format!("f{i}"), 1).unwrap();
        }
        let children = p.list_children(root).unwrap();
        assert_eq!(children.len(), (INITIAL_DIR_SLOTS + 10) as usize);
    }

    #[test]
    fn chdir_dotdot_goes_to_parent() {
        let (mut p, root) = fresh();
        let sub = p.create_directory(root, "sub").unwrap();
        let back = p.chdir(sub, "..").unwrap();
        assert_eq!(back, root);
        assert!(matches!(p.chdir(root, ".."), Err(Error::AlreadyAtRoot)));
    }

    #[test]
    fn rename_conflicts_with_existing_sibling() {
        let (mut p, root) = fresh();
        p.create_directory(root, "a").unwrap();
        let b = p.create_directory(root, "b").unwrap();
        assert!(matches!(p.rename(b, "a"), Err(Error::AlreadyExists(_))));
        p.rename(b, "c").unwrap();
        assert!(p.find_child(root, "c").unwrap().is_some());
    }

    #[test]
    fn print_tree_lists_files_before_subdirs_with_no_files_marker() {
        let (mut p, root) = fresh();
        p.create_file(root, "a.txt", 4).unwrap();
        let sub = p.create_directory(root, "sub").unwrap();
        p.create_file(sub, "leaf", 8).unwrap();
        p.create_directory(sub, "nested").unwrap();

        let lines = p.print_tree(root).unwrap();
        assert_eq!(lines[0], ":");
        assert_eq!(lines[1], "  a.txt, 4 bytes");
        assert_eq!(lines[2], "");

        let sub_header = lines.iter().position(|l| l == "sub:").unwrap();
        assert_eq!(lines[sub_header + 1], "  leaf, 8 bytes");
        assert_eq!(lines[sub_header + 2], "");

        let nested_header = lines.iter().position(|l| l == "sub/nested:").unwrap();
        assert_eq!(lines[nested_header + 1], "  <no files>");
    }

    #[test]
    fn resize_file_grows_and_zero_fills() {
        let (mut p, root) = fresh();
        let f = p.create_file(root, "grow.bin", 4).unwrap();
        let node = p.read_node(f).unwrap();
        p.save_block(node.contents, &[1, 2, 3, 4]).unwrap();

        p.resize_file(f, 8).unwrap();
        let node = p.read_node(f).unwrap();
        let data = p.load_block(node.contents, 8).unwrap();
        assert_eq!(&data, &[1, 2, 3, 4, 0, 0, 0, 0]);
    }
}
