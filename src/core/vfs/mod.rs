//! SQLite VFS (Virtual File System) backed by in-memory devices
//!
//! Registering the VFS lets SQLite open registry devices as ordinary database
//! files:
//!
//! - Database, journal, and temp files all live in a [`Registry`](crate::Registry)
//! - A leading `/` is stripped, so `file:/demo.db?vfs=memvfs` opens `demo.db`
//! - Nameless temp files get a private device that vanishes on close
//! - Locking follows SQLite's SHARED/RESERVED/PENDING/EXCLUSIVE protocol
//!
//! The io-methods carry no shared-memory support, so WAL databases require
//! `PRAGMA locking_mode=EXCLUSIVE`.

mod file;
mod vfs;


pub use file::MemFile;
pub use vfs::{connect, register_vfs, unregister_vfs, MemVfs, VFS_NAME};

/// Registry key for a SQLite file name
pub fn device_key(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}
