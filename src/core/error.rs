//! Error types for memdb operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemDbError {
    /// Seek reference point is not one of start/current/end
    #[error("invalid whence: {0}")]
    InvalidWhence(i32),

    /// Seek landed outside the stream, or a read found nothing left.
    ///
    /// Out-of-bounds seeks deliberately report this instead of a range error.
    #[error("end of stream")]
    EndOfStream,

    #[error("range {offset}+{len} outside device of {size} bytes")]
    OutOfRange { offset: u64, len: usize, size: u64 },

    #[error("offset overflow")]
    OffsetOverflow,

    #[error("invalid page size: {0} (must be non-zero)")]
    InvalidPageSize(usize),

    #[error("device already exists: {0}")]
    DeviceExists(String),

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// A conflicting file lock is held by another connection
    #[error("device is busy")]
    Busy,

    #[error("device handle is read-only")]
    ReadOnly,

    #[error("VFS registration failed: {0}")]
    VfsRegistrationFailed(i32),

    #[error("VFS already registered: {0}")]
    VfsAlreadyRegistered(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MemDbError>;
