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

//! The file I/O engine.
//!
//! A file's contents are a singly-linked chain of data-node extents
//! rooted at the file's directory node's `data_ptr`. Extent `k`
//! contributes `extent_k.len` bytes at logical offsets
//! `[sum_{i<k} len_i, sum_{i<=k} len_i)`. The chain is not stored with a
//! tail pointer, so appending always walks from `data_ptr`.

use log::trace;

use crate::alloc;
use crate::codec::{self, DATA_NODE_HEADER_SIZE};
use crate::device::{block_offset, Device};
use crate::dir;
use crate::error::{Error, Result};
use crate::types::{BlockNo, DataNode, Handle};

fn load_extent(dev: &Device, block: BlockNo) -> Result<DataNode> {
    let mut buf = vec![0u8; DATA_NODE_HEADER_SIZE];
    dev.read_at(block_offset(block), &mut buf)?;
    codec::decode_data_node(&buf)
}

fn persist_extent_header(dev: &Device, block: BlockNo, node: &DataNode) -> Result<()> {
    let mut buf = [0u8; DATA_NODE_HEADER_SIZE];
    codec::encode_data_node(&mut buf, node)?;
    dev.write_at(block_offset(block), &buf)
}

/// The number of blocks an extent with `len` payload bytes physically
/// occupies.
fn footprint(len: u32, block_size: u32) -> u32 {
    alloc::blocks_for_payload(len, block_size)
}

/// Sums `len` across a file's extent chain. A directory handle always
/// reports `0`.
pub fn file_size(dev: &Device, handle: &Handle) -> Result<u64> {
    if handle.is_directory() {
        return Ok(0);
    }
    let mut total = 0u64;
    let mut ptr = handle.node.data_ptr;
    while !ptr.is_null() {
        let extent = load_extent(dev, ptr)?;
        total += extent.len as u64;
        ptr = extent.next_ptr;
    }
    Ok(total)
}

/// Reads up to `buf.len()` bytes starting at `offset`. Returns the
/// number of bytes actually read; reading past end of file returns
/// fewer bytes without zero-filling.
pub fn read(dev: &Device, handle: &Handle, buf: &mut [u8], offset: u64) -> Result<usize> {
    let size = buf.len();
    let mut remaining = size;
    let mut written = 0usize;
    let mut file_pos: u64 = 0;
    let mut ptr = handle.node.data_ptr;

    while !ptr.is_null() && remaining > 0 {
        let extent = load_extent(dev, ptr)?;
        let extent_end = file_pos + extent.len as u64;
        if extent_end <= offset {
            file_pos = extent_end;
            ptr = extent.next_ptr;
            continue;
        }
        let internal_offset = if file_pos >= offset {
            0
        } else {
            offset - file_pos
        };
        let available = extent.len as u64 - internal_offset;
        let take = available.min(remaining as u64) as usize;
        if take > 0 {
            let at = block_offset(ptr) + DATA_NODE_HEADER_SIZE as u64 + internal_offset;
            dev.read_at(at, &mut buf[written..written + take])?;
            written += take;
            remaining -= take;
        }
        file_pos = extent_end;
        ptr = extent.next_ptr;
    }

    Ok(written)
}

/// Writes `buf` at `offset`. Two phases: phase A overwrites within an
/// existing extent (trimming its `len` to `internal_offset +
/// bytes_written`, which truncates and orphans any following extents if
/// the write lands strictly inside the file — this is a quirk of the
/// format, not a bug introduced here); phase B appends new extents for
/// any bytes remaining after the chain ends.
pub fn write(dev: &mut Device, handle: &mut Handle, buf: &[u8], offset: u64) -> Result<usize> {
    if handle.node.data_ptr.is_null() {
        if offset != 0 {
            return Err(Error::Invalid);
        }
        return write_phase_b(dev, handle, buf);
    }

    let mut file_pos: u64 = 0;
    let mut ptr = handle.node.data_ptr;
    let mut target: Option<(BlockNo, DataNode, u64)> = None;
    while !ptr.is_null() {
        let extent = load_extent(dev, ptr)?;
        let extent_end = file_pos + extent.len as u64;
        if extent_end > offset {
            target = Some((ptr, extent, offset - file_pos));
            break;
        }
        file_pos = extent_end;
        ptr = extent.next_ptr;
    }

    let mut written = 0usize;
    if let Some((block, extent, internal_offset)) = target {
        let block_size = dev.block_size() as u32;
        let cap = footprint(extent.len, block_size) * block_size - 8 - internal_offset as u32;
        let take = (buf.len() as u32).min(cap) as usize;
        if take > 0 {
            let at = block_offset(block) + DATA_NODE_HEADER_SIZE as u64 + internal_offset;
            dev.write_at(at, &buf[..take])?;
            let new_extent = DataNode {
                next_ptr: extent.next_ptr,
                len: internal_offset as u32 + take as u32,
            };
            persist_extent_header(dev, block, &new_extent)?;
            written += take;
            trace!("write: phase A overwrote {take} bytes at extent {block}");
        }
    }

    if written < buf.len() {
        written += write_phase_b(dev, handle, &buf[written..])?;
    }

    Ok(written)
}

fn write_phase_b(dev: &mut Device, handle: &mut Handle, buf: &[u8]) -> Result<usize> {
    let mut written = 0usize;
    while written < buf.len() {
        let remaining = &buf[written..];
        let (block, capacity) = alloc::alloc_data_node(dev, remaining.len() as u32)?;
        let take = (remaining.len() as u32).min(capacity) as usize;
        let at = block_offset(block) + DATA_NODE_HEADER_SIZE as u64;
        dev.write_at(at, &remaining[..take])?;
        let node = DataNode {
            next_ptr: BlockNo::NULL,
            len: take as u32,
        };
        persist_extent_header(dev, block, &node)?;

        if handle.node.data_ptr.is_null() {
            handle.node.data_ptr = block;
            dir::persist_node(dev, handle.block, &handle.node)?;
        } else {
            let mut ptr = handle.node.data_ptr;
            loop {
                let mut extent = load_extent(dev, ptr)?;
                if extent.next_ptr.is_null() {
                    extent.next_ptr = block;
                    persist_extent_header(dev, ptr, &extent)?;
                    break;
                }
                ptr = extent.next_ptr;
            }
        }
        trace!("write: phase B appended extent {block} ({take} bytes)");
        written += take;
    }
    Ok(written)
}

/// Truncates a file. Only `size == 0` is supported: every extent in the
/// chain is prepended to the free list, reclaiming its full block
/// footprint, and `data_ptr` is reset to `0`.
pub fn truncate(dev: &mut Device, handle: &mut Handle, size: u64) -> Result<()> {
    if size != 0 {
        return Err(Error::Unsupported);
    }
    let block_size = dev.block_size() as u32;
    let mut ptr = handle.node.data_ptr;
    while !ptr.is_null() {
        let extent = load_extent(dev, ptr)?;
        let capacity = footprint(extent.len, block_size) * block_size - 8;
        let next = extent.next_ptr;
        alloc::free(dev, ptr, capacity)?;
        ptr = next;
    }
    handle.node.data_ptr = BlockNo::NULL;
    dir::persist_node(dev, handle.block, &handle.node)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::footprint;

    #[test]
    fn footprint_matches_spec_examples() {
        assert_eq!(footprint(0, 512), 1);
        assert_eq!(footprint(504, 512), 1);
        assert_eq!(footprint(505, 512), 2);
    }
}
