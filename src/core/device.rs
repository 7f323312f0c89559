//! In-memory devices
//!
//! A [`Device`] is the single point of coordinated access to one named
//! in-memory file. Every read, write, truncate, and dump takes the same plain
//! mutex for its whole duration, so all store operations on a device are
//! totally ordered and nobody ever observes a torn write.

use crate::config::DEFAULT_PAGE_SIZE;
use crate::error::Result;
use crate::lock::{self, LockLevel, LockState};
use crate::page::PageStore;
use crate::snapshot::SnapshotStream;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

/// Point-in-time figures for a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStats {
    pub name: String,
    /// Logical size in bytes
    pub size: u64,
    pub page_count: usize,
    pub page_size: usize,
}

impl DeviceStats {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Named in-memory file backed by a page store
#[derive(Debug)]
pub struct Device {
    name: String,
    page_size: usize,
    store: Mutex<PageStore>,
    locks: Mutex<LockState>,
}

impl Device {
    /// Create a device seeded with `initial`, using the default page size
    pub fn new(name: impl Into<String>, initial: &[u8]) -> Self {
        Self::from_store(name.into(), PageStore::seeded(initial, DEFAULT_PAGE_SIZE))
    }

    /// Create a device with an explicit page size
    pub fn with_page_size(name: impl Into<String>, initial: &[u8], page_size: usize) -> Result<Self> {
        let store = PageStore::from_bytes(initial, page_size)?;
        Ok(Self::from_store(name.into(), store))
    }

    fn from_store(name: String, store: PageStore) -> Self {
        info!(
            "Creating device '{}' with {} bytes in {} pages",
            name,
            store.size(),
            store.page_count()
        );

        Device {
            name,
            page_size: store.page_size(),
            store: Mutex::new(store),
            locks: Mutex::new(LockState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current logical size in bytes
    pub fn size(&self) -> u64 {
        self.store.lock().size()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Copy bytes at `offset` into `buf`.
    ///
    /// Returns the number of bytes copied, which is short when the range runs
    /// past the end and 0 when `offset` is at or past it.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let store = self.store.lock();
        let size = store.size();
        if offset >= size {
            trace!("Read of {} at {} past end of '{}'", buf.len(), offset, self.name);
            return Ok(0);
        }

        let n = ((size - offset) as usize).min(buf.len());
        store.read(offset, &mut buf[..n])?;
        trace!("Read {} bytes at {} from '{}'", n, offset, self.name);

        Ok(n)
    }

    /// Write all of `data` at `offset`, growing the device as needed
    pub fn write_at(&self, data: &[u8], offset: u64) -> Result<usize> {
        let mut store = self.store.lock();
        store.write(offset, data)?;
        trace!("Wrote {} bytes at {} to '{}'", data.len(), offset, self.name);

        Ok(data.len())
    }

    /// Resize the device to exactly `size` bytes
    pub fn truncate(&self, size: u64) -> Result<()> {
        let mut store = self.store.lock();
        debug!("Truncating '{}' from {} to {} bytes", self.name, store.size(), size);
        store.truncate(size)
    }

    /// Copy the current content into an independent [`SnapshotStream`].
    ///
    /// The whole copy happens under the device lock, so the snapshot reflects
    /// either all or none of any concurrent write. Large devices block other
    /// callers for the duration of the copy.
    pub fn dump(&self) -> SnapshotStream {
        let store = self.store.lock();
        let buffer = store.to_vec();
        drop(store);

        debug!("Dumped {} bytes from '{}'", buffer.len(), self.name);
        SnapshotStream::new(buffer)
    }

    pub fn stats(&self) -> DeviceStats {
        let store = self.store.lock();
        DeviceStats {
            name: self.name.clone(),
            size: store.size(),
            page_count: store.page_count(),
            page_size: self.page_size,
        }
    }

    /// Raise a handle's file lock from `held` to `want`.
    ///
    /// Fails with `Busy` on conflict; `held` reflects whatever level was
    /// actually reached.
    pub fn lock(&self, held: &mut LockLevel, want: LockLevel) -> Result<()> {
        let guard = self.locks.lock();
        lock::acquire(guard, held, want, |mut guard| {
            MutexGuard::unlocked(&mut guard, std::thread::yield_now);
            guard
        })
    }

    /// Lower a handle's file lock from `held` to `want`
    pub fn unlock(&self, held: &mut LockLevel, want: LockLevel) {
        let mut state = self.locks.lock();
        lock::release(&mut state, held, want);
    }

    /// Whether any handle holds RESERVED or stronger
    pub fn check_reserved_lock(&self, held: LockLevel) -> bool {
        if held >= LockLevel::Reserved {
            return true;
        }
        self.locks.lock().reserved()
    }

    /// Number of handles currently holding at least SHARED
    pub fn shared_holders(&self) -> usize {
        self.locks.lock().shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MemDbError;

    #[test]
    fn test_new_device() {
        let device = Device::new("d1", &[1, 2, 3]);
        assert_eq!(device.name(), "d1");
        assert_eq!(device.size(), 3);
        assert_eq!(device.page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_invalid_page_size() {
        assert!(matches!(
            Device::with_page_size("bad", &[], 0),
            Err(MemDbError::InvalidPageSize(0))
        ));
    }

    #[test]
    fn test_read_at_short_and_past_end() {
        let device = Device::with_page_size("d", &[1, 2, 3, 4, 5], 2).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(device.read_at(&mut buf, 3).unwrap(), 2);
        assert_eq!(&buf[..2], &[4, 5]);

        assert_eq!(device.read_at(&mut buf, 5).unwrap(), 0);
        assert_eq!(device.read_at(&mut buf, 500).unwrap(), 0);
    }

    #[test]
    fn test_write_then_read() {
        let device = Device::with_page_size("d", &[], 4).unwrap();
        assert_eq!(device.write_at(b"hello world", 0).unwrap(), 11);

        let mut buf = [0u8; 5];
        device.read_at(&mut buf, 6).unwrap();
        assert_eq!(&buf, b"world");
        assert_eq!(device.stats().page_count, 3);
    }

    #[test]
    fn test_truncate() {
        let device = Device::new("d", &[9; 100]);
        device.truncate(10).unwrap();
        assert_eq!(device.size(), 10);
        assert_eq!(device.dump().into_inner(), vec![9; 10]);
    }

    #[test]
    fn test_oversized_write_and_truncate_rejected() {
        let device = Device::with_page_size("huge", b"keep", 16).unwrap();

        assert!(matches!(
            device.write_at(b"x", u64::MAX - 1),
            Err(MemDbError::OffsetOverflow)
        ));
        assert!(matches!(
            device.truncate(u64::MAX),
            Err(MemDbError::OffsetOverflow)
        ));
        assert_eq!(device.size(), 4);
        assert_eq!(device.stats().page_count, 1);
        assert_eq!(device.page_size(), 16);
    }

    #[test]
    fn test_dump_is_exact_size() {
        let device = Device::with_page_size("d", &[7; 5], 4).unwrap();
        let snapshot = device.dump();
        assert_eq!(snapshot.len(), 5);
        assert_eq!(snapshot.as_bytes(), &[7; 5]);
    }

    #[test]
    fn test_stats_json() {
        let device = Device::with_page_size("stats", &[0; 10], 4).unwrap();
        let stats = device.stats();
        assert_eq!(
            stats,
            DeviceStats {
                name: "stats".to_string(),
                size: 10,
                page_count: 3,
                page_size: 4,
            }
        );

        let json = stats.to_json().unwrap();
        let parsed: DeviceStats = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, stats);
    }

    #[test]
    fn test_lock_protocol_between_handles() {
        let device = Device::new("locks", &[]);
        let mut a = LockLevel::None;
        let mut b = LockLevel::None;

        device.lock(&mut a, LockLevel::Shared).unwrap();
        device.lock(&mut b, LockLevel::Shared).unwrap();
        assert_eq!(device.shared_holders(), 2);

        device.lock(&mut a, LockLevel::Reserved).unwrap();
        assert!(device.check_reserved_lock(b));
        assert!(matches!(
            device.lock(&mut b, LockLevel::Reserved),
            Err(MemDbError::Busy)
        ));

        device.unlock(&mut b, LockLevel::None);
        device.lock(&mut a, LockLevel::Exclusive).unwrap();
        assert_eq!(a, LockLevel::Exclusive);

        device.unlock(&mut a, LockLevel::None);
        assert!(!device.check_reserved_lock(b));
        assert_eq!(device.shared_holders(), 0);
    }
}
