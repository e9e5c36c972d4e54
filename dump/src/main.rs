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

//! Inspects a NanoFS image.
//!
//! Strictly read-only: opens the device with `read_only = true` and
//! never calls into `nanofs_core::dir`/`file`'s mutating entry points.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use nanofs_core::types::Handle;
use nanofs_core::Adapter;

/// Prints superblock, free-list, and directory-tree diagnostics for a
/// NanoFS image.
#[derive(Parser, Debug)]
#[command(name = "nanofs-dump", version)]
struct Args {
    /// Print the free list (node count, total free bytes, per-node detail).
    #[arg(long)]
    free: bool,

    /// Print a recursive directory tree walk.
    #[arg(long)]
    tree: bool,

    /// Path to the image file.
    path: PathBuf,
}

fn print_superblock(adapter: &Adapter) {
    let sb = adapter.superblock();
    println!("superblock:");
    println!("  magic       = {:#06x}", sb.magic);
    println!("  block_size  = {}", sb.block_size);
    println!("  revision    = {}", sb.revision);
    println!("  root_ptr    = {}", sb.root_ptr);
    println!("  free_ptr    = {}", sb.free_ptr);
    println!("  fs_size     = {} blocks", sb.fs_size);
    println!("  extra_size  = {}", sb.extra_size);
}

fn print_free_list(adapter: &Adapter) -> Result<()> {
    let nodes = adapter.free_list_nodes()?;
    let total: u64 = nodes.iter().map(|(_, n)| n.len as u64).sum();
    println!("free list: {} node(s), {} bytes total", nodes.len(), total);
    for (block, node) in &nodes {
        println!("  block {block}: len = {}, next = {}", node.len, node.next_ptr);
    }
    Ok(())
}

fn print_tree(adapter: &Adapter, handle: &Handle, depth: usize) -> Result<()> {
    let indent = "  ".repeat(depth);
    let name = if handle.node.name.is_empty() {
        "/".to_string()
    } else {
        String::from_utf8_lossy(&handle.node.name).into_owned()
    };
    if handle.is_directory() {
        println!("{indent}{name}/ (block {})", handle.block);
        for child in adapter.list(handle, usize::MAX)? {
            print_tree(adapter, &child, depth + 1)?;
        }
    } else {
        let size = adapter.file_size(handle)?;
        println!("{indent}{name} (block {}, {size} bytes)", handle.block);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let adapter = Adapter::open(&args.path, true)?;
    print_superblock(&adapter);

    if args.free {
        println!();
        print_free_list(&adapter)?;
    }

    if args.tree {
        println!();
        println!("tree:");
        let root = adapter.lookup("/")?;
        print_tree(&adapter, &root, 0)?;
    }

    Ok(())
}
