//! # memdb - In-Memory Page Storage for Embedded Databases
//!
//! `memdb-rs` provides an in-memory storage device that a database's
//! virtual-filesystem layer can mount in place of an on-disk file:
//!
//! - **Page-structured storage** with random-access read/write/truncate
//! - **Point-in-time dumps** as independent `Read + Seek` streams
//! - **Named registry** so files can be found by name
//! - **SQLite VFS** for running SQLite databases entirely in memory
//!
//! ## Quick Start
//!
//! ```rust
//! use memdb_rs::{Device, Whence};
//! use std::io::Read;
//!
//! # fn main() -> memdb_rs::Result<()> {
//! let device = Device::new("demo.db", b"hello world");
//! device.write_at(b"HELLO", 0)?;
//!
//! // Snapshot is independent of later writes
//! let mut dump = device.dump();
//! device.write_at(b"xxxxx", 0)?;
//!
//! dump.seek_to(6, Whence::Start)?;
//! let mut rest = String::new();
//! dump.read_to_string(&mut rest)?;
//! assert_eq!(rest, "world");
//! # Ok(())
//! # }
//! ```
//!
//! ## SQLite
//!
//! ```rust,no_run
//! use memdb_rs::{global_registry, register_vfs, VFS_NAME};
//! use std::sync::Arc;
//!
//! # fn main() -> memdb_rs::Result<()> {
//! register_vfs(VFS_NAME, Arc::clone(global_registry()))?;
//!
//! let conn = memdb_rs::connect(VFS_NAME, "demo.db")?;
//! conn.execute("CREATE TABLE t (x INTEGER)", [])?;
//! drop(conn);
//!
//! let image = memdb_rs::lookup("demo.db").unwrap().dump().into_inner();
//! std::fs::write("demo.db", image)?;
//! # Ok(())
//! # }
//! ```

// Core implementation
pub mod core;

// Re-export core modules internally so crate:: paths in core still work
#[allow(unused_imports)]
pub(crate) use crate::core::{config, device, error, lock, page, registry, snapshot, vfs};

// Re-export core types that users need
pub use crate::core::{
    config::{DEFAULT_PAGE_SIZE, SECTOR_SIZE},
    device::{Device, DeviceStats},
    error::{MemDbError, Result},
    lock::LockLevel,
    page::PageStore,
    registry::{create, delete, global as global_registry, lookup, Registry},
    snapshot::{SnapshotStream, Whence},
    vfs::{connect, register_vfs, unregister_vfs, VFS_NAME},
};

use std::sync::Arc;
use tracing::info;

/// Builder for customizing Device creation
///
/// # Examples
///
/// ```rust
/// use memdb_rs::DeviceBuilder;
///
/// # fn main() -> memdb_rs::Result<()> {
/// let device = DeviceBuilder::new()
///     .name("cache.db")
///     .page_size(4096)
///     .data(vec![0u8; 10_000])
///     .build()?;
///
/// assert_eq!(device.stats().page_count, 3);
/// # Ok(())
/// # }
/// ```
pub struct DeviceBuilder {
    name: Option<String>,
    page_size: usize,
    data: Vec<u8>,
}

impl DeviceBuilder {
    /// Create a new DeviceBuilder with default settings
    pub fn new() -> Self {
        DeviceBuilder {
            name: None,
            page_size: DEFAULT_PAGE_SIZE,
            data: Vec::new(),
        }
    }

    /// Set the device name
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the page size (must be non-zero)
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the initial contents
    pub fn data<D: Into<Vec<u8>>>(mut self, data: D) -> Self {
        self.data = data.into();
        self
    }

    /// Build a standalone Device
    pub fn build(self) -> Result<Device> {
        let name = self
            .name
            .ok_or_else(|| MemDbError::InvalidName("name must be set".to_string()))?;

        info!(
            "Building device '{}' with page size {}",
            name, self.page_size
        );
        Device::with_page_size(name, &self.data, self.page_size)
    }

    /// Build the Device and register it in `registry`
    pub fn register(self, registry: &Registry) -> Result<Arc<Device>> {
        let device = self.build()?;
        registry.insert(device)
    }
}

impl Default for DeviceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
