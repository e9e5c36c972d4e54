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

//! The device handle: opens the backing file, validates the superblock on
//! open, caches the block shift, and mediates all subsequent I/O.
//!
//! All I/O is absolute positioning — never a `Seek` followed by a
//! relative read/write — via [`std::os::unix::fs::FileExt`]. This is the
//! one place the engine reaches for the standard library directly rather
//! than a crate: it's the actual boundary to the OS file, not an ambient
//! concern like logging, errors, or codecs.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;

use log::{debug, trace};

use crate::codec;
use crate::error::{Error, Result};
use crate::types::{BlockNo, BLOCK_SIZE_512, MAGIC, REVISION};

/// The only block size this revision supports.
pub const BLOCK_SIZE: usize = 512;
/// `log2(BLOCK_SIZE)`.
pub const BLOCK_SHIFT: u32 = 9;

/// Converts a block number to an absolute byte offset: `block_no << shift`.
pub fn block_offset(block: BlockNo) -> u64 {
    (block.0 as u64) << BLOCK_SHIFT
}

/// Reads one block into `buf` (`buf.len()` must be `<= BLOCK_SIZE`; a short
/// device read is reported as [`Error::Io`]).
pub fn read_block_raw(file: &File, block: BlockNo, buf: &mut [u8]) -> Result<()> {
    file.read_exact_at(buf, block_offset(block))?;
    Ok(())
}

/// Writes one block from `buf`.
pub fn write_block_raw(file: &File, block: BlockNo, buf: &[u8]) -> Result<()> {
    file.write_all_at(buf, block_offset(block))?;
    Ok(())
}

/// An open NanoFS image.
#[derive(Debug)]
pub struct Device {
    file: File,
    read_only: bool,
    block_shift: u32,
    superblock: crate::types::Superblock,
}

impl Device {
    /// Opens `path`, reading and validating the superblock.
    ///
    /// Fails with [`Error::BadMagic`] if the magic number doesn't match,
    /// [`Error::UnsupportedBlockSize`] if the `block_size` byte isn't the
    /// one encoding 512 bytes, or [`Error::UnsupportedRevision`] if
    /// `revision` isn't `0`.
    pub fn open(path: impl AsRef<Path>, read_only: bool) -> Result<Self> {
        let path = path.as_ref();
        debug!("opening NanoFS image {} (read_only={})", path.display(), read_only);
        let file = OpenOptions::new()
            .read(true)
            .write(!read_only)
            .open(path)?;
        let mut buf = [0u8; BLOCK_SIZE];
        read_block_raw(&file, BlockNo::SUPERBLOCK, &mut buf)?;
        let superblock = codec::decode_superblock(&buf)?;
        if superblock.magic != MAGIC {
            return Err(Error::BadMagic);
        }
        if superblock.block_size != BLOCK_SIZE_512 {
            return Err(Error::UnsupportedBlockSize);
        }
        if superblock.revision != REVISION {
            return Err(Error::UnsupportedRevision);
        }
        trace!(
            "superblock: root_ptr={} free_ptr={} fs_size={}",
            superblock.root_ptr, superblock.free_ptr, superblock.fs_size
        );
        Ok(Device {
            file,
            read_only,
            block_shift: BLOCK_SHIFT,
            superblock,
        })
    }

    /// Closes the device. Equivalent to dropping the handle; provided so
    /// callers can make the release point explicit.
    pub fn close(self) {}

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn block_shift(&self) -> u32 {
        self.block_shift
    }

    pub fn block_size(&self) -> usize {
        1usize << self.block_shift
    }

    pub fn superblock(&self) -> &crate::types::Superblock {
        &self.superblock
    }

    /// Persists a new superblock value, both to disk and to the cached copy.
    pub fn write_superblock(&mut self, sb: crate::types::Superblock) -> Result<()> {
        let mut buf = [0u8; BLOCK_SIZE];
        // Preserve whatever trailing bytes of block 0 were already on
        // disk beyond the live fields, rather than zeroing them.
        read_block_raw(&self.file, BlockNo::SUPERBLOCK, &mut buf)?;
        codec::encode_superblock(&mut buf, &sb)?;
        write_block_raw(&self.file, BlockNo::SUPERBLOCK, &buf)?;
        self.superblock = sb;
        Ok(())
    }

    /// Reads a full block.
    pub fn read_block(&self, block: BlockNo, buf: &mut [u8]) -> Result<()> {
        read_block_raw(&self.file, block, buf)
    }

    /// Writes a full block.
    pub fn write_block(&self, block: BlockNo, buf: &[u8]) -> Result<()> {
        write_block_raw(&self.file, block, buf)
    }

    /// Reads `buf.len()` bytes at an arbitrary absolute byte offset (used
    /// by the file I/O engine to read payload bytes that don't start on a
    /// block boundary).
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.file.read_exact_at(buf, offset)?;
        Ok(())
    }

    /// Writes `buf` at an arbitrary absolute byte offset.
    pub fn write_at(&self, offset: u64, buf: &[u8]) -> Result<()> {
        self.file.write_all_at(buf, offset)?;
        Ok(())
    }

    pub(crate) fn file(&self) -> &File {
        &self.file
    }
}
