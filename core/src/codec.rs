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

//! Binary codec for the three on-disk record kinds.
//!
//! The layout is packed little-endian and does not match natural struct
//! alignment, so every field is read and written at an explicit byte
//! position via `byteorder`, never through a `#[repr(C)]` transmute of a
//! Rust struct over the buffer.
//!
//! Each function operates on an in-memory buffer holding (at least) one
//! block, already positioned at the right device offset by the caller
//! (`nanofs_core::device`). Offsets within the buffer are always `0`;
//! absolute device offsets are computed as `block_no << block_shift` by
//! the device handle, never here.

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};
use crate::types::{BlockNo, DataNode, DirFlags, DirNode, Superblock};

/// Size in bytes of the superblock's live fields.
pub const SUPERBLOCK_SIZE: usize = 18;
/// Size in bytes of a directory node's header, before the filename tail.
pub const DIR_NODE_HEADER_SIZE: usize = 14;
/// Size in bytes of a data node's header, before the payload.
pub const DATA_NODE_HEADER_SIZE: usize = 8;
/// Maximum length of a filename, in bytes.
pub const MAX_NAME_LEN: usize = 255;

fn short_read() -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        "short read decoding NanoFS record",
    ))
}

/// Decodes a superblock from the first [`SUPERBLOCK_SIZE`] bytes of `buf`.
pub fn decode_superblock(buf: &[u8]) -> Result<Superblock> {
    if buf.len() < SUPERBLOCK_SIZE {
        return Err(short_read());
    }
    let mut c = Cursor::new(buf);
    let magic = c.read_u16::<LittleEndian>().map_err(|_| short_read())?;
    let block_size = c.read_u8().map_err(|_| short_read())?;
    let revision = c.read_u8().map_err(|_| short_read())?;
    let root_ptr = c.read_u32::<LittleEndian>().map_err(|_| short_read())?;
    let free_ptr = c.read_u32::<LittleEndian>().map_err(|_| short_read())?;
    let fs_size = c.read_u32::<LittleEndian>().map_err(|_| short_read())?;
    let extra_size = c.read_u16::<LittleEndian>().map_err(|_| short_read())?;
    Ok(Superblock {
        magic,
        block_size,
        revision,
        root_ptr: BlockNo(root_ptr),
        free_ptr: BlockNo(free_ptr),
        fs_size,
        extra_size,
    })
}

/// Encodes a superblock into the first [`SUPERBLOCK_SIZE`] bytes of `buf`.
///
/// `buf` must be at least [`SUPERBLOCK_SIZE`] bytes; any remaining bytes
/// (up to the block size) are left untouched by this function — callers
/// that format a fresh image are responsible for zeroing the rest of the
/// block beforehand.
pub fn encode_superblock(buf: &mut [u8], sb: &Superblock) -> Result<()> {
    if buf.len() < SUPERBLOCK_SIZE {
        return Err(short_read());
    }
    let mut c = Cursor::new(&mut buf[..SUPERBLOCK_SIZE]);
    c.write_u16::<LittleEndian>(sb.magic)?;
    c.write_u8(sb.block_size)?;
    c.write_u8(sb.revision)?;
    c.write_u32::<LittleEndian>(sb.root_ptr.0)?;
    c.write_u32::<LittleEndian>(sb.free_ptr.0)?;
    c.write_u32::<LittleEndian>(sb.fs_size)?;
    c.write_u16::<LittleEndian>(sb.extra_size)?;
    Ok(())
}

/// Decodes a directory node from `buf`. `buf` must hold the full header
/// plus however many filename bytes it declares (i.e. a whole block, in
/// practice — a directory node never exceeds [`DIR_NODE_HEADER_SIZE`] +
/// [`MAX_NAME_LEN`] = 269 bytes, well under the 512-byte block size).
pub fn decode_dir_node(buf: &[u8]) -> Result<DirNode> {
    if buf.len() < DIR_NODE_HEADER_SIZE {
        return Err(short_read());
    }
    let mut c = Cursor::new(buf);
    let flags = c.read_u8().map_err(|_| short_read())?;
    let next_ptr = c.read_u32::<LittleEndian>().map_err(|_| short_read())?;
    let data_ptr = c.read_u32::<LittleEndian>().map_err(|_| short_read())?;
    let meta_ptr = c.read_u32::<LittleEndian>().map_err(|_| short_read())?;
    let fname_len = c.read_u8().map_err(|_| short_read())? as usize;
    let mut name = vec![0u8; fname_len];
    c.read_exact(&mut name).map_err(|_| short_read())?;
    Ok(DirNode {
        flags: DirFlags(flags),
        next_ptr: BlockNo(next_ptr),
        data_ptr: BlockNo(data_ptr),
        meta_ptr: BlockNo(meta_ptr),
        name,
    })
}

/// Encodes a directory node into `buf`, returning the number of bytes
/// written (header + name, no terminator).
///
/// Fails with [`Error::Invalid`] if the name exceeds [`MAX_NAME_LEN`]
/// bytes; callers are expected to have already truncated or rejected
/// over-length names.
pub fn encode_dir_node(buf: &mut [u8], dn: &DirNode) -> Result<usize> {
    if dn.name.len() > MAX_NAME_LEN {
        return Err(Error::Invalid);
    }
    let total = DIR_NODE_HEADER_SIZE + dn.name.len();
    if buf.len() < total {
        return Err(short_read());
    }
    let mut c = Cursor::new(&mut buf[..total]);
    c.write_u8(dn.flags.0)?;
    c.write_u32::<LittleEndian>(dn.next_ptr.0)?;
    c.write_u32::<LittleEndian>(dn.data_ptr.0)?;
    c.write_u32::<LittleEndian>(dn.meta_ptr.0)?;
    c.write_u8(dn.name.len() as u8)?;
    c.write_all(&dn.name)?;
    Ok(total)
}

/// Decodes a data node header from the first [`DATA_NODE_HEADER_SIZE`]
/// bytes of `buf`. Payload bytes are not part of the codec; the file I/O
/// engine reads/writes them directly at `offset + 8`.
pub fn decode_data_node(buf: &[u8]) -> Result<DataNode> {
    if buf.len() < DATA_NODE_HEADER_SIZE {
        return Err(short_read());
    }
    let mut c = Cursor::new(buf);
    let next_ptr = c.read_u32::<LittleEndian>().map_err(|_| short_read())?;
    let len = c.read_u32::<LittleEndian>().map_err(|_| short_read())?;
    Ok(DataNode {
        next_ptr: BlockNo(next_ptr),
        len,
    })
}

/// Encodes a data node header into the first [`DATA_NODE_HEADER_SIZE`]
/// bytes of `buf`.
pub fn encode_data_node(buf: &mut [u8], dn: &DataNode) -> Result<()> {
    if buf.len() < DATA_NODE_HEADER_SIZE {
        return Err(short_read());
    }
    let mut c = Cursor::new(&mut buf[..DATA_NODE_HEADER_SIZE]);
    c.write_u32::<LittleEndian>(dn.next_ptr.0)?;
    c.write_u32::<LittleEndian>(dn.len)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superblock_round_trip() {
        let sb = Superblock {
            magic: crate::types::MAGIC,
            block_size: crate::types::BLOCK_SIZE_512,
            revision: 0,
            root_ptr: BlockNo(1),
            free_ptr: BlockNo(2),
            fs_size: 2048,
            extra_size: 0,
        };
        let mut buf = [0u8; 512];
        encode_superblock(&mut buf, &sb).unwrap();
        let decoded = decode_superblock(&buf).unwrap();
        assert_eq!(sb, decoded);
    }

    #[test]
    fn dir_node_round_trip_various_name_lengths() {
        for len in [0usize, 1, 254, 255] {
            let dn = DirNode {
                flags: DirFlags::directory(),
                next_ptr: BlockNo(7),
                data_ptr: BlockNo(0),
                meta_ptr: BlockNo(0),
                name: vec![b'x'; len],
            };
            let mut buf = [0u8; 512];
            let written = encode_dir_node(&mut buf, &dn).unwrap();
            assert_eq!(written, DIR_NODE_HEADER_SIZE + len);
            let decoded = decode_dir_node(&buf).unwrap();
            assert_eq!(dn, decoded);
        }
    }

    #[test]
    fn dir_node_rejects_oversize_name() {
        let dn = DirNode {
            flags: DirFlags::regular(),
            next_ptr: BlockNo(0),
            data_ptr: BlockNo(0),
            meta_ptr: BlockNo(0),
            name: vec![b'y'; 256],
        };
        let mut buf = [0u8; 512];
        assert!(matches!(encode_dir_node(&mut buf, &dn), Err(Error::Invalid)));
    }

    #[test]
    fn data_node_round_trip() {
        let dn = DataNode {
            next_ptr: BlockNo(42),
            len: 1_047_544,
        };
        let mut buf = [0u8; 512];
        encode_data_node(&mut buf, &dn).unwrap();
        let decoded = decode_data_node(&buf).unwrap();
        assert_eq!(dn, decoded);
    }
}
