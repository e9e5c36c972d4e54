/*
 * Copyright 2026 NanoFS contributors
 *
 * This file is part of NanoFS.
 *
 * NanoFS is free software: you can redistribute it and/or modify it under the
 * terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or (at your option) any later
 * version.
 *
 * NanoFS is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
 * A PARTICULAR PURPOSE. See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * NanoFS. If not, see <https://www.gnu.org/licenses/>.
 */

//! Shared value types used across the engine.
//!
//! Handles are pure data: a block number plus a cached copy of the record
//! that lives there. They carry no lifetime relationship to the device
//! handle beyond the caller's discipline — nothing here borrows from
//! [`crate::device::Device`].

use std::fmt;

/// A block number. `0` is reserved (superblock / "no next" / "empty").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockNo(pub u32);

impl BlockNo {
    /// The superblock's fixed location.
    pub const SUPERBLOCK: BlockNo = BlockNo(0);
    /// The null pointer value used throughout the on-disk format.
    pub const NULL: BlockNo = BlockNo(0);

    /// Whether this is the null block number (`0`).
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// `self + n`, as a new block number.
    pub fn offset(self, n: u32) -> BlockNo {
        BlockNo(self.0 + n)
    }
}

impl fmt::Display for BlockNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for BlockNo {
    fn from(v: u32) -> Self {
        BlockNo(v)
    }
}

impl From<BlockNo> for u32 {
    fn from(b: BlockNo) -> Self {
        b.0
    }
}

/// The on-disk superblock record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    pub magic: u16,
    pub block_size: u8,
    pub revision: u8,
    pub root_ptr: BlockNo,
    pub free_ptr: BlockNo,
    pub fs_size: u32,
    pub extra_size: u16,
}

/// The magic number every valid NanoFS image starts with.
pub const MAGIC: u16 = 0x4E61;
/// The only `block_size` encoding the engine writes or mounts.
pub const BLOCK_SIZE_512: u8 = 1;
/// The only format revision this engine understands.
pub const REVISION: u8 = 0;

/// A directory node: represents either a directory or a regular file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirNode {
    pub flags: DirFlags,
    pub next_ptr: BlockNo,
    pub data_ptr: BlockNo,
    pub meta_ptr: BlockNo,
    pub name: Vec<u8>,
}

/// `flags` bit 0 of a directory node: set for a directory, clear for a
/// regular file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirFlags(pub u8);

impl DirFlags {
    pub const DIRECTORY_BIT: u8 = 0x01;

    pub fn directory() -> Self {
        DirFlags(Self::DIRECTORY_BIT)
    }

    pub fn regular() -> Self {
        DirFlags(0)
    }

    pub fn is_directory(self) -> bool {
        self.0 & Self::DIRECTORY_BIT != 0
    }
}

impl DirNode {
    pub fn is_directory(&self) -> bool {
        self.flags.is_directory()
    }
}

/// A data node header: either a free-list element or a file extent. The
/// payload itself is not part of this struct; it lives immediately after
/// the header on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataNode {
    pub next_ptr: BlockNo,
    pub len: u32,
}

/// An in-memory handle to a directory or file: a block number plus the
/// node record loaded from it. Both directories and files use the same
/// handle type, since both are represented by a [`DirNode`] on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    pub block: BlockNo,
    pub node: DirNode,
}

impl Handle {
    pub fn is_directory(&self) -> bool {
        self.node.is_directory()
    }
}
