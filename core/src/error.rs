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

//! Error kinds surfaced by the engine.
//!
//! Every public operation in [`crate::adapter`] returns [`Result`]. None of
//! the error kinds here carry enough context to repair the filesystem —
//! per the design, NanoFS is not crash-safe and an operation that fails
//! partway may leave the image structurally inconsistent.

/// The engine's error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A device read or write returned short or failed outright.
    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The superblock's `magic` field did not match `0x4E61`.
    #[error("not a NanoFS image (bad magic)")]
    BadMagic,
    /// The superblock's `block_size` byte does not map to a supported shift.
    #[error("unsupported block size encoding")]
    UnsupportedBlockSize,
    /// The superblock's `revision` byte is not `0`.
    #[error("unsupported filesystem revision")]
    UnsupportedRevision,
    /// A path component, name, or handle does not resolve to anything.
    #[error("not found")]
    NotFound,
    /// A path is not absolute, a name is malformed, or an argument is out of range.
    #[error("invalid argument")]
    Invalid,
    /// A create operation collided with an existing directory entry.
    #[error("already exists")]
    AlreadyExists,
    /// The free list cannot satisfy the requested allocation.
    #[error("no space left on device")]
    NoSpace,
    /// The operation is defined but not implemented for the given parameters.
    #[error("operation not supported")]
    Unsupported,
    /// A chain invariant was violated at runtime.
    #[error("filesystem structure is corrupt")]
    Corrupt,
}

/// Shorthand for `core::result::Result<T, Error>`.
pub type Result<T> = core::result::Result<T, Error>;
