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

//! Formats a fresh NanoFS image.
//!
//! Writes a zeroed image of the requested size, a superblock, a root
//! directory node carrying the volume label as its name, and a single
//! free-list node spanning the remainder of the device. Does not go
//! through `nanofs_core::adapter` — there is no valid filesystem to open
//! until this has run.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use nanofs_core::device::BLOCK_SIZE;
use nanofs_core::format;

/// Formats a NanoFS image.
#[derive(Parser, Debug)]
#[command(name = "nanofs-mkfs", version)]
struct Args {
    /// Image size in bytes. Accepts a `K`/`M`/`G` suffix (base 1024).
    #[arg(short, long)]
    size: String,

    /// Volume label, stored as the root directory's name. Truncated to
    /// 255 bytes if longer.
    #[arg(short, long, default_value = "")]
    label: String,

    /// Path to the image file to create (or overwrite).
    path: PathBuf,
}

fn parse_size(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    let (digits, multiplier) = match trimmed.chars().last() {
        Some('K') | Some('k') => (&trimmed[..trimmed.len() - 1], 1024u64),
        Some('M') | Some('m') => (&trimmed[..trimmed.len() - 1], 1024 * 1024),
        Some('G') | Some('g') => (&trimmed[..trimmed.len() - 1], 1024 * 1024 * 1024),
        _ => (trimmed, 1),
    };
    let value: u64 = digits.parse().context("invalid --size value")?;
    Ok(value * multiplier)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let size_bytes = parse_size(&args.size)?;
    let blocks = (size_bytes / BLOCK_SIZE as u64) as u32;
    if blocks < 3 {
        bail!("image too small: need at least 3 blocks of {} bytes", BLOCK_SIZE);
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&args.path)
        .with_context(|| format!("opening {}", args.path.display()))?;
    file.set_len(blocks as u64 * BLOCK_SIZE as u64)?;

    format::format(&file, blocks, args.label.as_bytes())?;

    info!(
        "formatted {} ({} blocks, label {:?})",
        args.path.display(),
        blocks,
        args.label
    );
    Ok(())
}
