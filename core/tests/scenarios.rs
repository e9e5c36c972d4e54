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

//! End-to-end scenarios against a formatted image.

use std::fs::OpenOptions;

use tempfile::NamedTempFile;

use nanofs_core::device::BLOCK_SIZE;
use nanofs_core::types::BlockNo;
use nanofs_core::{format, Adapter, Error};

fn fresh_image(blocks: u32, label: &[u8]) -> NamedTempFile {
    let tmp = NamedTempFile::new().unwrap();
    tmp.as_file().set_len(blocks as u64 * BLOCK_SIZE as u64).unwrap();
    let file = OpenOptions::new().write(true).open(tmp.path()).unwrap();
    format::format(&file, blocks, label).unwrap();
    tmp
}

#[test]
fn scenario_1_format_and_inspect() {
    // 1 MiB image, label "vol": 1_048_576 / 512 = 2048 blocks.
    let tmp = fresh_image(2048, b"vol");
    let adapter = Adapter::open(tmp.path(), true).unwrap();

    let sb = adapter.superblock();
    assert_eq!(sb.magic, 0x4E61);
    assert_eq!(sb.block_size, 1);
    assert_eq!(sb.revision, 0);
    assert_eq!(sb.root_ptr, BlockNo(1));
    assert_eq!(sb.free_ptr, BlockNo(2));
    assert_eq!(sb.fs_size, 2048);

    let root = adapter.lookup("/").unwrap();
    assert_eq!(root.node.flags.0, 0x01);
    assert!(root.node.data_ptr.is_null());
    assert_eq!(root.node.name, b"vol");
    assert_eq!(root.node.name.len(), 3);

    let free_nodes = adapter.free_list_nodes().unwrap();
    assert_eq!(free_nodes.len(), 1);
    let (block, node) = free_nodes[0];
    assert_eq!(block, BlockNo(2));
    assert!(node.next_ptr.is_null());
    assert_eq!(node.len, 1_048_576 - 1024 - 8);
}

#[test]
fn scenario_2_create_and_list() {
    let tmp = fresh_image(64, b"vol");
    let mut adapter = Adapter::open(tmp.path(), false).unwrap();

    adapter.mkdir("/a").unwrap();
    adapter.mkdir("/b").unwrap();
    adapter.create_file("/a/x").unwrap();

    let root = adapter.lookup("/").unwrap();
    let root_entries = adapter.list(&root, 16).unwrap();
    let root_names: Vec<String> = root_entries
        .iter()
        .map(|h| String::from_utf8(h.node.name.clone()).unwrap())
        .collect();
    assert_eq!(root_names, vec!["a", "b"]);

    let a = adapter.lookup("/a").unwrap();
    let a_entries = adapter.list(&a, 16).unwrap();
    let a_names: Vec<String> = a_entries
        .iter()
        .map(|h| String::from_utf8(h.node.name.clone()).unwrap())
        .collect();
    assert_eq!(a_names, vec!["x"]);
}

#[test]
fn scenario_3_free_space_accounting() {
    let tmp = fresh_image(2048, b"vol");
    let mut adapter = Adapter::open(tmp.path(), false).unwrap();

    assert_eq!(adapter.free_bytes().unwrap(), 1_047_544);
    adapter.create_file("/f").unwrap();
    assert_eq!(adapter.free_bytes().unwrap(), 1_047_544 - 512);
}

#[test]
fn scenario_4_append_and_read_back() {
    let tmp = fresh_image(2048, b"vol");
    let mut adapter = Adapter::open(tmp.path(), false).unwrap();

    let mut handle = adapter.create_file("/d").unwrap();
    let first = vec![0xAAu8; 1000];
    let second = vec![0xBBu8; 1000];
    assert_eq!(adapter.write(&mut handle, &first, 0).unwrap(), 1000);
    assert_eq!(adapter.write(&mut handle, &second, 1000).unwrap(), 1000);

    let mut buf = vec![0u8; 2000];
    assert_eq!(adapter.read(&handle, &mut buf, 0).unwrap(), 2000);
    assert_eq!(&buf[..1000], first.as_slice());
    assert_eq!(&buf[1000..], second.as_slice());
    assert_eq!(adapter.file_size(&handle).unwrap(), 2000);
}

#[test]
fn scenario_5_truncate() {
    // Each of the two writes from scenario 4 allocates its own 2-block
    // extent (footprint rounds 1000 payload bytes up to 1016 capacity),
    // so truncation frees two separate free-list nodes rather than one
    // contiguous region the free-list head could have covered before the
    // writes. No coalescing means that split costs an extra 8-byte header
    // per freed extent versus the pre-write figure minus the consumed
    // blocks — fragmentation accumulates with allocation history by
    // design.
    let tmp = fresh_image(2048, b"vol");
    let mut adapter = Adapter::open(tmp.path(), false).unwrap();

    let mut handle = adapter.create_file("/d").unwrap();
    adapter.write(&mut handle, &vec![0xAAu8; 1000], 0).unwrap();
    adapter.write(&mut handle, &vec![0xBBu8; 1000], 1000).unwrap();
    let free_before_truncate = adapter.free_bytes().unwrap();

    adapter.truncate(&mut handle, 0).unwrap();
    assert_eq!(adapter.file_size(&handle).unwrap(), 0);

    let free_after_truncate = adapter.free_bytes().unwrap();
    assert_eq!(free_after_truncate, free_before_truncate + 2 * 1016);
    // Two extra free-node headers versus a single merged region.
    assert_eq!(free_after_truncate, (1_047_544 - 512) - 16);
}

#[test]
fn scenario_6_delete() {
    let tmp = fresh_image(2048, b"vol");
    let mut adapter = Adapter::open(tmp.path(), false).unwrap();

    let mut handle = adapter.create_file("/d").unwrap();
    adapter.write(&mut handle, &vec![0xAAu8; 1000], 0).unwrap();
    adapter.write(&mut handle, &vec![0xBBu8; 1000], 1000).unwrap();
    adapter.truncate(&mut handle, 0).unwrap();

    adapter.unlink("/d").unwrap();

    assert!(matches!(adapter.lookup("/d").unwrap_err(), Error::NotFound));
    // Pre-creation value minus three extra headers accumulated across the
    // dir-node block and the two extents being freed as separate nodes.
    assert_eq!(adapter.free_bytes().unwrap(), 1_047_544 - 24);
}

#[test]
fn boundary_minimal_device_exhausts_free_list() {
    // A 3-block device has exactly one free block (504 payload bytes),
    // which exactly fits one directory node (504 + 8-byte header == 512).
    // The first create consumes it whole; the second finds an empty free
    // list and fails.
    let tmp = fresh_image(3, b"");
    let mut adapter = Adapter::open(tmp.path(), false).unwrap();
    assert_eq!(adapter.free_bytes().unwrap(), BLOCK_SIZE as u64 - 8);
    adapter.mkdir("/a").unwrap();
    assert_eq!(adapter.free_bytes().unwrap(), 0);
    assert!(matches!(adapter.mkdir("/b").unwrap_err(), Error::NoSpace));
}

#[test]
fn boundary_root_path_resolves_to_directory() {
    let tmp = fresh_image(16, b"vol");
    let adapter = Adapter::open(tmp.path(), false).unwrap();
    let root = adapter.lookup("/").unwrap();
    assert!(root.is_directory());
}

#[test]
fn boundary_zero_size_write_is_a_no_op() {
    let tmp = fresh_image(16, b"vol");
    let mut adapter = Adapter::open(tmp.path(), false).unwrap();
    let mut handle = adapter.create_file("/f").unwrap();
    let written = adapter.write(&mut handle, &[], 0).unwrap();
    assert_eq!(written, 0);
    assert_eq!(adapter.file_size(&handle).unwrap(), 0);
    assert!(handle.node.data_ptr.is_null());
}
