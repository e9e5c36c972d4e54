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

//! The public adapter surface.
//!
//! This is the only module the three binaries (`nanofs-mkfs`,
//! `nanofs-dump`, `nanofs-mount`) depend on for mounted-filesystem
//! operations. It owns path splitting and caller-buffer allocation; the
//! lower engines never allocate a result buffer on the caller's behalf.
//!
//! The adapter is **not** internally synchronised: callers must
//! serialise all calls against a given [`Adapter`] themselves.

use std::path::Path;

use crate::alloc;
use crate::device::Device;
use crate::dir;
use crate::error::Result;
use crate::file;
use crate::types::{BlockNo, DataNode, DirFlags, Handle, Superblock};

/// An open NanoFS filesystem, ready for path-based operations.
pub struct Adapter {
    device: Device,
}

impl Adapter {
    /// Opens the image at `path`.
    pub fn open(path: impl AsRef<Path>, read_only: bool) -> Result<Self> {
        Ok(Adapter {
            device: Device::open(path, read_only)?,
        })
    }

    /// Closes the device.
    pub fn close(self) {
        self.device.close();
    }

    pub fn is_read_only(&self) -> bool {
        self.device.is_read_only()
    }

    /// Sum of `len` across the free list.
    pub fn free_bytes(&self) -> Result<u64> {
        alloc::free_bytes(&self.device)
    }

    /// Every node of the free list, in chain order. Used by the inspector
    /// to print per-node diagnostics.
    pub fn free_list_nodes(&self) -> Result<Vec<(BlockNo, DataNode)>> {
        alloc::free_list_nodes(&self.device)
    }

    /// The current superblock, as cached by the device handle.
    pub fn superblock(&self) -> &Superblock {
        self.device.superblock()
    }

    /// Resolves an absolute path to a handle.
    pub fn lookup(&self, path: &str) -> Result<Handle> {
        dir::resolve(&self.device, path)
    }

    /// Loads a handle directly from a known block number. Used by the
    /// FUSE bridge, which addresses nodes by inode rather than by path.
    pub fn handle_at(&self, block: BlockNo) -> Result<Handle> {
        dir::load_handle(&self.device, block)
    }

    /// Looks up `name` among the direct children of `dir`.
    pub fn lookup_child(&self, dir: &Handle, name: &[u8]) -> Result<Handle> {
        dir::lookup_child(&self.device, dir, name)
    }

    /// Lists up to `cap` direct children of `dir`, in creation order.
    pub fn list(&self, dir: &Handle, cap: usize) -> Result<Vec<Handle>> {
        dir::list(&self.device, dir, cap)
    }

    /// Creates a directory at `path`.
    pub fn mkdir(&mut self, path: &str) -> Result<Handle> {
        dir::create(&mut self.device, path, DirFlags::directory())
    }

    /// Creates an empty regular file at `path`.
    pub fn create_file(&mut self, path: &str) -> Result<Handle> {
        dir::create(&mut self.device, path, DirFlags::regular())
    }

    /// Removes a directory at `path` without checking emptiness — a
    /// non-empty subtree is orphaned, not rejected.
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        dir::remove(&mut self.device, path)
    }

    /// Truncates and removes a regular file at `path`.
    pub fn unlink(&mut self, path: &str) -> Result<()> {
        dir::remove(&mut self.device, path)
    }

    /// Creates a child of `parent` directly, without path resolution.
    /// Used by the FUSE bridge, which already holds the parent handle by
    /// inode.
    pub fn create_in(&mut self, parent: &Handle, name: Vec<u8>, flags: DirFlags) -> Result<Handle> {
        dir::create_in(&mut self.device, parent, name, flags)
    }

    /// Removes `target` (a direct child of `parent`) directly, without
    /// path resolution.
    pub fn remove_in(&mut self, parent: &Handle, target: Handle) -> Result<()> {
        dir::remove_in(&mut self.device, parent, target)
    }

    /// Reads into `buf` at `offset`.
    pub fn read(&self, handle: &Handle, buf: &mut [u8], offset: u64) -> Result<usize> {
        file::read(&self.device, handle, buf, offset)
    }

    /// Writes `buf` at `offset`, updating `handle` in place if the write
    /// allocates the file's first extent.
    pub fn write(&mut self, handle: &mut Handle, buf: &[u8], offset: u64) -> Result<usize> {
        file::write(&mut self.device, handle, buf, offset)
    }

    /// Truncates a file to `size` bytes; only `0` is supported.
    pub fn truncate(&mut self, handle: &mut Handle, size: u64) -> Result<()> {
        file::truncate(&mut self.device, handle, size)
    }

    /// Sum of extent lengths for a file handle; `0` for a directory.
    pub fn file_size(&self, handle: &Handle) -> Result<u64> {
        file::file_size(&self.device, handle)
    }
}
