//! Snapshot streams: point-in-time copies of a device
//!
//! A [`SnapshotStream`] owns its bytes outright. Nothing holds a reference back
//! to the device it came from, so reading it never contends with the device
//! lock and never observes later writes.
//!
//! Out-of-bounds seeks report [`MemDbError::EndOfStream`] and leave the cursor
//! where it was, rather than clamping or moving it.

use crate::error::{MemDbError, Result};
use std::io;

/// Seek reference point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Whence {
    /// Relative to the start of the buffer
    Start = 0,
    /// Relative to the current cursor
    Current = 1,
    /// Relative to the end of the buffer
    End = 2,
}

impl TryFrom<i32> for Whence {
    type Error = MemDbError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Whence::Start),
            1 => Ok(Whence::Current),
            2 => Ok(Whence::End),
            _ => Err(MemDbError::InvalidWhence(value)),
        }
    }
}

/// Immutable byte buffer with its own read cursor
#[derive(Debug, Clone, Default)]
pub struct SnapshotStream {
    buffer: Vec<u8>,
    cursor: usize,
}

impl SnapshotStream {
    /// Wrap an owned buffer, cursor at 0
    pub fn new(buffer: Vec<u8>) -> Self {
        SnapshotStream { buffer, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Current cursor offset
    pub fn position(&self) -> u64 {
        self.cursor as u64
    }

    /// The full captured buffer, independent of the cursor
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    /// Move the cursor and return the new absolute offset.
    ///
    /// A target outside `[0, len]` fails with `EndOfStream` and the cursor
    /// stays put.
    pub fn seek_to(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let base = match whence {
            Whence::Start => 0i64,
            Whence::Current => self.cursor as i64,
            Whence::End => self.buffer.len() as i64,
        };

        let target = base.checked_add(offset).ok_or(MemDbError::EndOfStream)?;
        if target < 0 || target as u64 > self.buffer.len() as u64 {
            return Err(MemDbError::EndOfStream);
        }

        self.cursor = target as usize;
        Ok(self.cursor as u64)
    }

    /// Seek with a numeric whence code: 0 start, 1 current, 2 end.
    ///
    /// Any other code fails with `InvalidWhence` and the cursor stays put.
    pub fn seek_raw(&mut self, offset: i64, whence: i32) -> Result<u64> {
        let whence = Whence::try_from(whence)?;
        self.seek_to(offset, whence)
    }

    /// Copy bytes from the cursor into `buf` and advance past them.
    ///
    /// Returns `EndOfStream` once the cursor reaches the end of the buffer.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.cursor >= self.buffer.len() {
            return Err(MemDbError::EndOfStream);
        }

        let remaining = &self.buffer[self.cursor..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.cursor += n;

        Ok(n)
    }

    /// Release the buffer. Always succeeds and may be called repeatedly;
    /// afterwards the stream reads as empty.
    pub fn close(&mut self) {
        self.buffer = Vec::new();
        self.cursor = 0;
    }
}

impl io::Read for SnapshotStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read_into(buf) {
            Ok(n) => Ok(n),
            Err(MemDbError::EndOfStream) => Ok(0),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    }
}

impl io::Seek for SnapshotStream {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            io::SeekFrom::Start(n) => {
                let n = i64::try_from(n)
                    .map_err(|_| io::Error::new(io::ErrorKind::UnexpectedEof, "end of stream"))?;
                (n, Whence::Start)
            }
            io::SeekFrom::Current(n) => (n, Whence::Current),
            io::SeekFrom::End(n) => (n, Whence::End),
        };

        self.seek_to(offset, whence).map_err(|e| match e {
            MemDbError::EndOfStream => io::Error::new(io::ErrorKind::UnexpectedEof, e),
            other => io::Error::new(io::ErrorKind::InvalidInput, other),
        })
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position())
    }
}
