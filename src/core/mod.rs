//! Core implementation: page store, devices, snapshots, registry, and VFS

pub mod config;
pub mod device;
pub mod error;
pub mod lock;
pub mod page;
pub mod registry;
pub mod snapshot;
pub mod vfs;
