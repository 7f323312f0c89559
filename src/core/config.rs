//! Sizing constants shared by the page store and the VFS

/// Default page size for device storage (64KB).
///
/// Large pages keep the page table short for typical database images; SQLite
/// page-aligned I/O never straddles more than one of them.
pub const DEFAULT_PAGE_SIZE: usize = 64 * 1024;

/// Largest size a device may grow to (1 TiB).
///
/// Writes or truncates that would end past it fail with `OffsetOverflow`.
pub const MAX_DEVICE_SIZE: u64 = 1 << 40;

/// Sector size reported to SQLite through `xSectorSize`
pub const SECTOR_SIZE: i32 = 4096;

/// Longest pathname the VFS accepts
pub const MAX_PATHNAME: i32 = 1024;

/// Byte offsets of the read/write format versions in a SQLite database header.
///
/// A value of 2 in both means WAL mode, 1 means rollback journal.
pub const SQLITE_WRITE_VERSION_OFFSET: usize = 18;
pub const SQLITE_READ_VERSION_OFFSET: usize = 19;

/// Rewrite a SQLite header from WAL mode to rollback-journal mode in place.
///
/// The VFS has no shared-memory support, so a seeded WAL image would refuse to
/// open. Returns true when the header was changed.
pub fn convert_wal_header(data: &mut [u8]) -> bool {
    if data.len() > SQLITE_READ_VERSION_OFFSET
        && data[SQLITE_WRITE_VERSION_OFFSET] == 2
        && data[SQLITE_READ_VERSION_OFFSET] == 2
    {
        data[SQLITE_WRITE_VERSION_OFFSET] = 1;
        data[SQLITE_READ_VERSION_OFFSET] = 1;
        return true;
    }
    false
}
