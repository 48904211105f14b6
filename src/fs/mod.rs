// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The filesystem overlay: a hierarchy of directories and files built
//! entirely out of allocated blocks. Every node, file or directory, is
//! a [`Node`] record; directories additionally own a block holding a
//! flat table of child [`BlockId`]s.

mod dir;

pub use dir::INITIAL_DIR_SLOTS;

use static_assertions::const_assert_eq;

use crate::partition::{BlockId, Partition};
use crate::result::{Error, Result};

/// Names longer than this are rejected outright (spec.md §4.12).
pub const MAX_NAME_LEN: usize = 127;
const NAME_FIELD_LEN: usize = 128;

pub const NODE_HEADER_SIZE: u64 = 8 + 8 + 8 + 8 + 8 + NAME_FIELD_LEN as u64;
const_assert_eq!(NODE_HEADER_SIZE, 168);

/// A directory or file node. `contents` points at the child slot
/// table for a directory, or the payload block for a file; `size` is
/// the slot table's capacity for a directory, or the file's length in
/// bytes in use.
#[derive(Clone, Debug)]
pub struct Node {
    pub is_directory: bool,
    pub parent: BlockId,
    pub self_id: BlockId,
    pub contents: BlockId,
    pub size: u64,
    pub name: String,
}

impl Node {
    fn encode(&self) -> Result<[u8; NODE_HEADER_SIZE as usize]> {
        let mut buf = [0u8; NODE_HEADER_SIZE as usize];
        buf[0..8].copy_from_slice(&(self.is_directory as u64).to_le_bytes());
        buf[8..16].copy_from_slice(&self.parent.offset().to_le_bytes());
        buf[16..24].copy_from_slice(&self.self_id.offset().to_le_bytes());
        buf[24..32].copy_from_slice(&self.contents.offset().to_le_bytes());
        buf[32..40].copy_from_slice(&self.size.to_le_bytes());

        let name_bytes = self.name.as_bytes();
        if name_bytes.len() > MAX_NAME_LEN {
            return Err(Error::NameTooLong { max: MAX_NAME_LEN });
        }
        buf[40..40 + name_bytes.len()].copy_from_slice(name_bytes);
        Ok(buf)
    }

    fn decode(buf: &[u8; NODE_HEADER_SIZE as usize]) -> Result<Node> {
        let is_directory = u64::from_le_bytes(buf[0..8].try_into().unwrap()) != 0;
        let parent = BlockId::new(u64::from_le_bytes(buf[8..16].try_into().unwrap()));
        let self_id = BlockId::new(u64::from_le_bytes(buf[16..24].try_into().unwrap()));
        let contents = BlockId::new(u64::from_le_bytes(buf[24..32].try_into().unwrap()));
        let size = u64::from_le_bytes(buf[32..40].try_into().unwrap());

        let name_field = &buf[40..40 + NAME_FIELD_LEN];
        let end = name_field.iter().position(|&b| b == 0).unwrap_or(NAME_FIELD_LEN);
        let name = std::str::from_utf8(&name_field[..end])
            .map_err(|_| Error::CorruptTree("node name is not valid utf-8".into()))?
            .to_string();

        Ok(Node { is_directory, parent, self_id, contents, size, name })
    }
}

/// Validates a child name: non-empty, within the length cap, and not
/// one of the reserved navigation names `.`/`..`, nor containing the
/// path separator `/`.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::EmptyName);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::NameTooLong { max: MAX_NAME_LEN });
    }
    if name == "." || name == ".." || name.contains('/') {
        return Err(Error::ReservedName(name.to_string()));
    }
    Ok(())
}

impl Partition {
    pub(crate) fn read_node(&mut self, id: BlockId) -> Result<Node> {
        let header = self.read_header(id)?;
        if header.is_free() {
            return Err(Error::CorruptTree(format!("{id:?} is not allocated")));
        }
        let buf = self.load_block(id, NODE_HEADER_SIZE)?;
        let buf: [u8; NODE_HEADER_SIZE as usize] =
            buf.try_into().map_err(|_| Error::CorruptTree(format!("short node record at {id:?}")))?;
        Node::decode(&buf)
    }

    pub(crate) fn write_node(&mut self, node: &Node) -> Result<()> {
        self.save_block(node.self_id, &node.encode()?)
    }

    /// Creates the root directory. Must only be called once, on a
    /// partition with no root yet established.
    pub fn init_root(&mut self) -> Result<BlockId> {
        if self.root().is_some() {
            return Err(Error::AlreadyExists("/".to_string()));
        }
        let root = self.create_root_node()?;
        self.save_root(root)?;
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_round_trips_through_encode_decode() {
        let node = Node {
            is_directory: true,
            parent: BlockId::new(40),
            self_id: BlockId::new(200),
            contents: BlockId::new(300),
            size: 128,
            name: "etc".to_string(),
        };
        let encoded = node.encode().unwrap();
        let decoded = Node::decode(&encoded).unwrap();
        assert_eq!(decoded.name, "etc");
        assert_eq!(decoded.parent, BlockId::new(40));
        assert!(decoded.is_directory);
    }

    #[test]
    fn validate_name_rejects_dot_and_dotdot() {
        assert!(validate_name(".").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("").is_err());
        assert!(validate_name("ok").is_ok());
    }

    #[test]
    fn validate_name_rejects_names_over_the_cap() {
        let long = "a".repeat(MAX_NAME_LEN + 1);
        assert!(validate_name(&long).is_err());
        let ok = "a".repeat(MAX_NAME_LEN);
        assert!(validate_name(&ok).is_ok());
    }
}
