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

//! The directory engine.
//!
//! A directory's children form a singly-linked list of directory nodes
//! rooted at the directory's `data_ptr`, chained by `next_ptr`. Both
//! subdirectories and regular files are represented by the same
//! [`DirNode`] shape, distinguished only by the directory bit in `flags`.

use log::trace;

use crate::alloc;
use crate::codec::{self, MAX_NAME_LEN};
use crate::device::Device;
use crate::error::{Error, Result};
use crate::file;
use crate::types::{BlockNo, DirFlags, DirNode, Handle};

fn load(dev: &Device, block: BlockNo) -> Result<DirNode> {
    let mut buf = vec![0u8; dev.block_size()];
    dev.read_block(block, &mut buf)?;
    codec::decode_dir_node(&buf)
}

fn persist(dev: &Device, block: BlockNo, node: &DirNode) -> Result<()> {
    let mut buf = vec![0u8; dev.block_size()];
    codec::encode_dir_node(&mut buf, node)?;
    dev.write_block(block, &buf)
}

/// Persists a directory node's current contents. Used by [`crate::file`]
/// when a write or truncate changes `data_ptr`.
pub(crate) fn persist_node(dev: &Device, block: BlockNo, node: &DirNode) -> Result<()> {
    persist(dev, block, node)
}

/// Loads the root directory handle.
pub fn root(dev: &Device) -> Result<Handle> {
    let block = dev.superblock().root_ptr;
    let node = load(dev, block)?;
    Ok(Handle { block, node })
}

/// Loads a handle directly from a known block number, bypassing path
/// resolution. Used by the FUSE bridge, which addresses nodes by inode
/// (mapped 1:1 to block numbers) rather than by path.
pub fn load_handle(dev: &Device, block: BlockNo) -> Result<Handle> {
    let node = load(dev, block)?;
    Ok(Handle { block, node })
}

/// Looks up `name` among the direct children of `dir`, byte-for-byte
/// (no case folding). Returns [`Error::NotFound`] if no sibling matches.
pub fn lookup_child(dev: &Device, dir: &Handle, name: &[u8]) -> Result<Handle> {
    let mut ptr = dir.node.data_ptr;
    while !ptr.is_null() {
        let node = load(dev, ptr)?;
        if node.name == name {
            return Ok(Handle { block: ptr, node });
        }
        ptr = node.next_ptr;
    }
    Err(Error::NotFound)
}

/// Resolves an absolute path to a handle. `path` must start with `/`;
/// the path `"/"` resolves to the root. A trailing `/` is tolerated.
/// Non-final tokens must resolve to a directory. Tokens longer than 255
/// bytes fail with [`Error::NotFound`].
pub fn resolve(dev: &Device, path: &str) -> Result<Handle> {
    if !path.starts_with('/') {
        return Err(Error::Invalid);
    }
    let mut current = root(dev)?;
    let tokens: Vec<&str> = path.split('/').filter(|t| !t.is_empty()).collect();
    let n = tokens.len();
    for (i, token) in tokens.into_iter().enumerate() {
        if token.as_bytes().len() > MAX_NAME_LEN {
            return Err(Error::NotFound);
        }
        current = lookup_child(dev, &current, token.as_bytes())?;
        if i + 1 < n && !current.is_directory() {
            return Err(Error::NotFound);
        }
    }
    Ok(current)
}

/// Splits `path` into (parent path, base name). The base name is
/// truncated to 255 bytes if longer.
pub fn split_path(path: &str) -> Result<(String, Vec<u8>)> {
    if !path.starts_with('/') {
        return Err(Error::Invalid);
    }
    let trimmed = path.trim_end_matches('/');
    let (parent, base) = match trimmed.rfind('/') {
        Some(idx) => {
            let parent = if idx == 0 { "/" } else { &trimmed[..idx] };
            (parent.to_string(), &trimmed[idx + 1..])
        }
        None => return Err(Error::Invalid),
    };
    if base.is_empty() {
        return Err(Error::Invalid);
    }
    let mut name = base.as_bytes().to_vec();
    name.truncate(MAX_NAME_LEN);
    Ok((parent, name))
}

fn append_to_tail(dev: &Device, parent: &Handle, child_block: BlockNo) -> Result<()> {
    if parent.node.data_ptr.is_null() {
        let mut parent_node = parent.node.clone();
        parent_node.data_ptr = child_block;
        persist(dev, parent.block, &parent_node)?;
        return Ok(());
    }
    let mut ptr = parent.node.data_ptr;
    loop {
        let mut node = load(dev, ptr)?;
        if node.next_ptr.is_null() {
            node.next_ptr = child_block;
            persist(dev, ptr, &node)?;
            return Ok(());
        }
        ptr = node.next_ptr;
    }
}

/// Creates a new directory node (either a subdirectory or an empty
/// regular file) as a child of `parent`. Fails with
/// [`Error::AlreadyExists`] if `name` is already taken. `name` is
/// truncated to 255 bytes by the caller ([`split_path`]).
pub fn create_in(dev: &mut Device, parent: &Handle, name: Vec<u8>, flags: DirFlags) -> Result<Handle> {
    if lookup_child(dev, parent, &name).is_ok() {
        return Err(Error::AlreadyExists);
    }
    let new_node = DirNode {
        flags,
        next_ptr: BlockNo::NULL,
        data_ptr: BlockNo::NULL,
        meta_ptr: BlockNo::NULL,
        name,
    };
    let new_block = alloc::alloc_dir_block(dev)?;
    persist(dev, new_block, &new_node)?;
    append_to_tail(dev, parent, new_block)?;
    trace!("create: new node at {new_block} under parent at {}", parent.block);
    Ok(Handle {
        block: new_block,
        node: new_node,
    })
}

/// Creates a new directory node at `path`. Fails with
/// [`Error::NotFound`] if the parent path doesn't resolve to a
/// directory.
pub fn create(dev: &mut Device, path: &str, flags: DirFlags) -> Result<Handle> {
    let (parent_path, name) = split_path(path)?;
    let parent = resolve(dev, &parent_path)?;
    if !parent.is_directory() {
        return Err(Error::NotFound);
    }
    create_in(dev, &parent, name, flags)
}

/// Removes `target` (a direct child of `parent`) from the sibling chain
/// and frees its block. A regular file is truncated to zero first to
/// release its extents. Does **not** check whether a directory being
/// removed is empty.
pub fn remove_in(dev: &mut Device, parent: &Handle, mut target: Handle) -> Result<()> {
    if !target.is_directory() {
        file::truncate(dev, &mut target, 0)?;
    }

    if parent.node.data_ptr == target.block {
        let mut parent_node = parent.node.clone();
        parent_node.data_ptr = target.node.next_ptr;
        persist(dev, parent.block, &parent_node)?;
    } else {
        let mut ptr = parent.node.data_ptr;
        let mut found = false;
        while !ptr.is_null() {
            let mut node = load(dev, ptr)?;
            if node.next_ptr == target.block {
                node.next_ptr = target.node.next_ptr;
                persist(dev, ptr, &node)?;
                found = true;
                break;
            }
            ptr = node.next_ptr;
        }
        if !found {
            return Err(Error::Corrupt);
        }
    }

    alloc::free(
        dev,
        target.block,
        dev.block_size() as u32 - crate::codec::DATA_NODE_HEADER_SIZE as u32,
    )?;
    trace!("remove: freed node at {}", target.block);
    Ok(())
}

/// Removes the entry at `path` from its parent's sibling chain.
pub fn remove(dev: &mut Device, path: &str) -> Result<()> {
    let (parent_path, name) = split_path(path)?;
    let parent = resolve(dev, &parent_path)?;
    let target = lookup_child(dev, &parent, &name)?;
    remove_in(dev, &parent, target)
}

/// Lists up to `cap` direct children of `dir`, in sibling-chain
/// (creation) order.
pub fn list(dev: &Device, dir: &Handle, cap: usize) -> Result<Vec<Handle>> {
    let mut out = Vec::new();
    let mut ptr = dir.node.data_ptr;
    while !ptr.is_null() && out.len() < cap {
        let node = load(dev, ptr)?;
        let next = node.next_ptr;
        out.push(Handle { block: ptr, node });
        ptr = next;
    }
    Ok(out)
}
