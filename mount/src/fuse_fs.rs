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

//! The FUSE bridge.
//!
//! `NanoFuse` wraps one [`Adapter`] behind a [`Mutex`], serialising every
//! callback since the engine underneath has no internal concurrency of
//! its own. Inode numbers are NanoFS block numbers plus one (FUSE
//! reserves inode `1` for the root); the mapping is kept in an explicit
//! table rather than assumed, even though it lines up by construction on
//! a freshly formatted image. File handles (`fh`) are NanoFS block
//! numbers cast to `u64` directly — no extra per-open heap state.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow,
};
use log::debug;

use nanofs_core::codec::MAX_NAME_LEN;
use nanofs_core::types::{BlockNo, DirFlags, Handle};
use nanofs_core::{Adapter, Error};

const TTL: Duration = Duration::from_secs(1);

fn errno(err: &Error) -> i32 {
    match err {
        Error::NotFound => libc::ENOENT,
        Error::AlreadyExists => libc::EEXIST,
        Error::NoSpace => libc::ENOSPC,
        Error::Invalid => libc::EINVAL,
        Error::Unsupported => libc::ENOSYS,
        Error::Corrupt => libc::EIO,
        Error::Io(_) | Error::BadMagic | Error::UnsupportedBlockSize | Error::UnsupportedRevision => {
            libc::EIO
        }
    }
}

struct State {
    adapter: Adapter,
    ino_to_block: HashMap<u64, BlockNo>,
    block_to_ino: HashMap<BlockNo, u64>,
    next_ino: u64,
}

impl State {
    fn ino_for(&mut self, block: BlockNo) -> u64 {
        if let Some(ino) = self.block_to_ino.get(&block) {
            return *ino;
        }
        let ino = self.next_ino;
        self.next_ino += 1;
        self.ino_to_block.insert(ino, block);
        self.block_to_ino.insert(block, ino);
        ino
    }

    fn block_for(&self, ino: u64) -> Option<BlockNo> {
        self.ino_to_block.get(&ino).copied()
    }
}

/// A mounted NanoFS filesystem.
pub struct NanoFuse {
    state: Mutex<State>,
}

impl NanoFuse {
    pub fn new(adapter: Adapter) -> Self {
        let root_block = adapter.superblock().root_ptr;
        let mut ino_to_block = HashMap::new();
        let mut block_to_ino = HashMap::new();
        ino_to_block.insert(1, root_block);
        block_to_ino.insert(root_block, 1);
        NanoFuse {
            state: Mutex::new(State {
                adapter,
                ino_to_block,
                block_to_ino,
                next_ino: 2,
            }),
        }
    }
}

fn attr_for(ino: u64, handle: &Handle, size: u64) -> FileAttr {
    let kind = if handle.is_directory() {
        FileType::Directory
    } else {
        FileType::RegularFile
    };
    let perm = if handle.is_directory() { 0o755 } else { 0o644 };
    let epoch = SystemTime::UNIX_EPOCH;
    FileAttr {
        ino,
        size,
        blocks: size.div_ceil(512),
        atime: epoch,
        mtime: epoch,
        ctime: epoch,
        crtime: epoch,
        kind,
        perm,
        nlink: 1,
        uid: 0,
        gid: 0,
        rdev: 0,
        blksize: 512,
        flags: 0,
    }
}

impl Filesystem for NanoFuse {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let mut state = self.state.lock().unwrap();
        let Some(parent_block) = state.block_for(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let parent_handle = match state.adapter.handle_at(parent_block) {
            Ok(h) => h,
            Err(e) => {
                reply.error(errno(&e));
                return;
            }
        };
        let name_bytes = name.to_string_lossy().into_owned().into_bytes();
        match state.adapter.lookup_child(&parent_handle, &name_bytes) {
            Ok(child) => {
                let size = state.adapter.file_size(&child).unwrap_or(0);
                let ino = state.ino_for(child.block);
                reply.entry(&TTL, &attr_for(ino, &child, size), 0);
            }
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let mut state = self.state.lock().unwrap();
        let Some(block) = state.block_for(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match state.adapter.handle_at(block) {
            Ok(handle) => {
                let size = state.adapter.file_size(&handle).unwrap_or(0);
                reply.attr(&TTL, &attr_for(ino, &handle, size));
            }
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let mut state = self.state.lock().unwrap();
        let Some(block) = state.block_for(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        if let Some(requested) = size {
            if state.adapter.is_read_only() {
                reply.error(libc::EROFS);
                return;
            }
            if requested != 0 {
                reply.error(libc::ENOSYS);
                return;
            }
            let mut handle = match state.adapter.handle_at(block) {
                Ok(h) => h,
                Err(e) => {
                    reply.error(errno(&e));
                    return;
                }
            };
            if let Err(e) = state.adapter.truncate(&mut handle, 0) {
                reply.error(errno(&e));
                return;
            }
        }
        // uid/gid/mode/time writes are silently accepted no-ops — NanoFS
        // stores none of them.
        match state.adapter.handle_at(block) {
            Ok(handle) => {
                let file_size = state.adapter.file_size(&handle).unwrap_or(0);
                reply.attr(&TTL, &attr_for(ino, &handle, file_size));
            }
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let mut state = self.state.lock().unwrap();
        if state.adapter.is_read_only() {
            reply.error(libc::EROFS);
            return;
        }
        let Some(parent_block) = state.block_for(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let parent_handle = match state.adapter.handle_at(parent_block) {
            Ok(h) => h,
            Err(e) => {
                reply.error(errno(&e));
                return;
            }
        };
        let mut name_bytes = name.to_string_lossy().into_owned().into_bytes();
        name_bytes.truncate(MAX_NAME_LEN);
        match state.adapter.create_in(&parent_handle, name_bytes, DirFlags::directory()) {
            Ok(child) => {
                let ino = state.ino_for(child.block);
                reply.entry(&TTL, &attr_for(ino, &child, 0), 0);
            }
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        let mut state = self.state.lock().unwrap();
        if state.adapter.is_read_only() {
            reply.error(libc::EROFS);
            return;
        }
        let Some(parent_block) = state.block_for(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let parent_handle = match state.adapter.handle_at(parent_block) {
            Ok(h) => h,
            Err(e) => {
                reply.error(errno(&e));
                return;
            }
        };
        let mut name_bytes = name.to_string_lossy().into_owned().into_bytes();
        name_bytes.truncate(MAX_NAME_LEN);
        match state.adapter.create_in(&parent_handle, name_bytes, DirFlags::regular()) {
            Ok(child) => {
                let ino = state.ino_for(child.block);
                let fh = child.block.0 as u64;
                reply.created(&TTL, &attr_for(ino, &child, 0), 0, fh, flags as u32);
            }
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let mut state = self.state.lock().unwrap();
        if state.adapter.is_read_only() {
            reply.error(libc::EROFS);
            return;
        }
        let Some(parent_block) = state.block_for(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let parent_handle = match state.adapter.handle_at(parent_block) {
            Ok(h) => h,
            Err(e) => {
                reply.error(errno(&e));
                return;
            }
        };
        let name_bytes = name.to_string_lossy().into_owned().into_bytes();
        let target = match state.adapter.lookup_child(&parent_handle, &name_bytes) {
            Ok(h) => h,
            Err(e) => {
                reply.error(errno(&e));
                return;
            }
        };
        match state.adapter.remove_in(&parent_handle, target) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(errno(&e)),
        }
    }

    /// Does not check emptiness before removing — removing a non-empty
    /// directory through this mount orphans its subtree exactly as it
    /// would through the adapter directly.
    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let mut state = self.state.lock().unwrap();
        if state.adapter.is_read_only() {
            reply.error(libc::EROFS);
            return;
        }
        let Some(parent_block) = state.block_for(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let parent_handle = match state.adapter.handle_at(parent_block) {
            Ok(h) => h,
            Err(e) => {
                reply.error(errno(&e));
                return;
            }
        };
        let name_bytes = name.to_string_lossy().into_owned().into_bytes();
        let target = match state.adapter.lookup_child(&parent_handle, &name_bytes) {
            Ok(h) => h,
            Err(e) => {
                reply.error(errno(&e));
                return;
            }
        };
        match state.adapter.remove_in(&parent_handle, target) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let state = self.state.lock().unwrap();
        match state.block_for(ino) {
            Some(block) => reply.opened(block.0 as u64, 0),
            None => reply.error(libc::ENOENT),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let state = self.state.lock().unwrap();
        let block = BlockNo(fh as u32);
        let handle = match state.adapter.handle_at(block) {
            Ok(h) => h,
            Err(e) => {
                reply.error(errno(&e));
                return;
            }
        };
        let mut buf = vec![0u8; size as usize];
        match state.adapter.read(&handle, &mut buf, offset as u64) {
            Ok(n) => reply.data(&buf[..n]),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let mut state = self.state.lock().unwrap();
        if state.adapter.is_read_only() {
            reply.error(libc::EROFS);
            return;
        }
        let block = BlockNo(fh as u32);
        let mut handle = match state.adapter.handle_at(block) {
            Ok(h) => h,
            Err(e) => {
                reply.error(errno(&e));
                return;
            }
        };
        match state.adapter.write(&mut handle, data, offset as u64) {
            Ok(n) => reply.written(n as u32),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let mut state = self.state.lock().unwrap();
        let Some(block) = state.block_for(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let handle = match state.adapter.handle_at(block) {
            Ok(h) => h,
            Err(e) => {
                reply.error(errno(&e));
                return;
            }
        };
        let children = match state.adapter.list(&handle, usize::MAX) {
            Ok(c) => c,
            Err(e) => {
                reply.error(errno(&e));
                return;
            }
        };

        let mut entries: Vec<(u64, FileType, String)> = vec![
            (ino, FileType::Directory, ".".to_string()),
            (ino, FileType::Directory, "..".to_string()),
        ];
        for child in &children {
            let child_ino = state.ino_for(child.block);
            let kind = if child.is_directory() {
                FileType::Directory
            } else {
                FileType::RegularFile
            };
            let name = String::from_utf8_lossy(&child.node.name).into_owned();
            entries.push((child_ino, kind, name));
        }

        for (i, (entry_ino, kind, name)) in entries.into_iter().enumerate().skip(offset as usize) {
            if reply.add(entry_ino, (i + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn destroy(&mut self) {
        debug!("unmounting");
    }
}
