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

//! The free-space allocator.
//!
//! The superblock's `free_ptr` is the head of a singly-linked list of
//! free data nodes. Only the head is ever inspected — this is a
//! deliberate first-fit-from-the-head allocator with splitting and no
//! coalescing, so fragmentation accumulates with allocation history. Every
//! mutation here updates the in-memory superblock and persists it in the
//! same call, since the superblock is the single source of truth for
//! `free_ptr` and callers do not synchronise access to it themselves.

use log::trace;

use crate::codec::{self, DATA_NODE_HEADER_SIZE};
use crate::device::{block_offset, Device};
use crate::error::{Error, Result};
use crate::types::{BlockNo, DataNode};

/// Number of blocks a data node with `len` payload bytes occupies:
/// `ceil((8 + len) / block_size)`.
pub fn blocks_for_payload(len: u32, block_size: u32) -> u32 {
    let total = 8u64 + len as u64;
    let block_size = block_size as u64;
    total.div_ceil(block_size) as u32
}

fn read_head(dev: &Device) -> Result<(BlockNo, DataNode)> {
    let head_ptr = dev.superblock().free_ptr;
    if head_ptr.is_null() {
        return Err(Error::NoSpace);
    }
    let mut buf = vec![0u8; dev.block_size()];
    dev.read_block(head_ptr, &mut buf)?;
    let head = codec::decode_data_node(&buf)?;
    Ok((head_ptr, head))
}

/// Writes only the 8-byte data-node header at `at`; payload bytes of
/// whatever block previously held data are left untouched (see
/// DESIGN.md for why the header alone is re-seated, not the block).
fn write_header_at(dev: &Device, at: BlockNo, node: &DataNode) -> Result<()> {
    let mut hdr = [0u8; DATA_NODE_HEADER_SIZE];
    codec::encode_data_node(&mut hdr, node)?;
    dev.write_at(block_offset(at), &hdr)
}

/// Allocates a single block for a directory node.
pub fn alloc_dir_block(dev: &mut Device) -> Result<BlockNo> {
    let (head_ptr, head) = read_head(dev)?;
    let block_size = dev.block_size() as u32;
    if head.len + 8 < block_size {
        // Unreachable under I5 when block_size == 512: a free element
        // always occupies at least one whole block.
        return Err(Error::NoSpace);
    }
    let mut sb = *dev.superblock();
    if head.len + 8 == block_size {
        sb.free_ptr = head.next_ptr;
        dev.write_superblock(sb)?;
        trace!("alloc_dir_block: consumed whole free node at {head_ptr}");
    } else {
        let new_head_ptr = head_ptr.offset(1);
        let shrunk = DataNode {
            next_ptr: head.next_ptr,
            len: head.len - block_size,
        };
        write_header_at(dev, new_head_ptr, &shrunk)?;
        sb.free_ptr = new_head_ptr;
        dev.write_superblock(sb)?;
        trace!("alloc_dir_block: split free node, new head at {new_head_ptr}");
    }
    Ok(head_ptr)
}

/// Allocates enough contiguous blocks for a data node able to hold
/// `requested_len` payload bytes. Returns the block the new extent
/// starts at and the payload capacity actually reserved for it (which
/// may exceed `requested_len` — the allocator never allocates a partial
/// block). The caller is responsible for writing the extent's own header
/// (with the correct `next_ptr` for its position in a file's chain) and
/// payload; this function only performs free-list bookkeeping.
pub fn alloc_data_node(dev: &mut Device, requested_len: u32) -> Result<(BlockNo, u32)> {
    let block_size = dev.block_size() as u32;
    let n = blocks_for_payload(requested_len, block_size);
    let (head_ptr, head) = read_head(dev)?;
    let h = blocks_for_payload(head.len, block_size);
    let mut sb = *dev.superblock();
    if h <= n {
        let payload = h * block_size - 8;
        sb.free_ptr = head.next_ptr;
        dev.write_superblock(sb)?;
        trace!("alloc_data_node: consumed whole free node at {head_ptr} ({payload} bytes)");
        Ok((head_ptr, payload))
    } else {
        let payload = n * block_size - 8;
        let new_head_ptr = head_ptr.offset(n);
        let shrunk = DataNode {
            next_ptr: head.next_ptr,
            len: head.len - n * block_size,
        };
        write_header_at(dev, new_head_ptr, &shrunk)?;
        sb.free_ptr = new_head_ptr;
        dev.write_superblock(sb)?;
        trace!("alloc_data_node: split free node, allocated {n} blocks at {head_ptr}, new head at {new_head_ptr}");
        Ok((head_ptr, payload))
    }
}

/// Prepends a freed block or extent to the free list. `capacity` is the
/// payload capacity to record for it: `block_size - 8` for a single freed
/// directory-node block, or the footprint-rounded capacity for a freed
/// file extent.
pub fn free(dev: &mut Device, block: BlockNo, capacity: u32) -> Result<()> {
    let sb = *dev.superblock();
    let node = DataNode {
        next_ptr: sb.free_ptr,
        len: capacity,
    };
    write_header_at(dev, block, &node)?;
    let mut new_sb = sb;
    new_sb.free_ptr = block;
    dev.write_superblock(new_sb)?;
    trace!("free: prepended block {block} ({capacity} bytes) to free list");
    Ok(())
}

/// Walks the free list starting at `free_ptr`, returning each node's
/// block number and header. Bounded to `fs_size` steps, since a
/// well-formed chain can never be longer than the device has blocks;
/// exceeding that is reported as [`Error::Corrupt`].
pub fn free_list_nodes(dev: &Device) -> Result<Vec<(BlockNo, DataNode)>> {
    let sb = dev.superblock();
    let mut out = Vec::new();
    let mut ptr = sb.free_ptr;
    let mut steps = 0u32;
    let mut buf = vec![0u8; dev.block_size()];
    while !ptr.is_null() {
        steps += 1;
        if steps > sb.fs_size {
            return Err(Error::Corrupt);
        }
        dev.read_block(ptr, &mut buf)?;
        let node = codec::decode_data_node(&buf)?;
        let next = node.next_ptr;
        out.push((ptr, node));
        ptr = next;
    }
    Ok(out)
}

/// Sums `len` across the free list.
pub fn free_bytes(dev: &Device) -> Result<u64> {
    Ok(free_list_nodes(dev)?.iter().map(|(_, n)| n.len as u64).sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_for_payload_matches_spec_examples() {
        assert_eq!(blocks_for_payload(0, 512), 1);
        assert_eq!(blocks_for_payload(504, 512), 1);
        assert_eq!(blocks_for_payload(505, 512), 2);
        assert_eq!(blocks_for_payload(1_047_544, 512), 2047);
    }
}
