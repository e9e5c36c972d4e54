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

//! Mounts a NanoFS image as a FUSE filesystem.
//!
//! Registered with `fuser::mount2` in single-threaded mode — `nanofs-mount`
//! never opts into `fuser`'s multi-threaded session, since the engine
//! below is not safe for concurrent calls.

mod fuse_fs;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fuser::MountOption;

use nanofs_core::Adapter;

use crate::fuse_fs::NanoFuse;

/// Mounts a NanoFS image at a directory via FUSE.
#[derive(Parser, Debug)]
#[command(name = "nanofs-mount", version)]
struct Args {
    /// Path to the NanoFS image file.
    image: PathBuf,

    /// Directory to mount the filesystem at.
    mountpoint: PathBuf,

    /// Run in the foreground instead of daemonizing.
    #[arg(long)]
    foreground: bool,

    /// Open the device read-only and reject mutating calls.
    #[arg(long)]
    read_only: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let adapter = Adapter::open(&args.image, args.read_only)
        .with_context(|| format!("opening {}", args.image.display()))?;

    if !args.foreground {
        log::info!("nanofs-mount always runs in the foreground; --foreground has no effect");
    }

    let mut options = vec![MountOption::FSName("nanofs".to_string())];
    options.push(if args.read_only { MountOption::RO } else { MountOption::RW });

    let fs = NanoFuse::new(adapter);
    fuser::mount2(fs, &args.mountpoint, &options)
        .with_context(|| format!("mounting at {}", args.mountpoint.display()))?;
    Ok(())
}
