//! Page store: a device's bytes held as a table of fixed-size pages
//!
//! The store has no locking of its own. The owning [`Device`](crate::Device)
//! serializes every call.

use crate::config::MAX_DEVICE_SIZE;
use crate::error::{MemDbError, Result};

/// Page-indexed byte storage with a logical size.
///
/// Invariant: `pages.len() == ceil(size / page_size)`, so the last page may be
/// partially used but no page lies wholly beyond `size`. Bytes of the last page
/// past `size` are always zero.
#[derive(Debug, Clone)]
pub struct PageStore {
    pages: Vec<Box<[u8]>>,
    size: u64,
    page_size: usize,
}

impl PageStore {
    /// Create an empty store
    pub fn new(page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(MemDbError::InvalidPageSize(page_size));
        }

        Ok(PageStore {
            pages: Vec::new(),
            size: 0,
            page_size,
        })
    }

    /// Create a store seeded with `data`, chunked into pages immediately
    pub fn from_bytes(data: &[u8], page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(MemDbError::InvalidPageSize(page_size));
        }
        Ok(Self::seeded(data, page_size))
    }

    /// `page_size` must already be known non-zero
    pub(crate) fn seeded(data: &[u8], page_size: usize) -> Self {
        debug_assert!(page_size > 0);

        let pages = data
            .chunks(page_size)
            .map(|chunk| {
                let mut page = vec![0u8; page_size].into_boxed_slice();
                page[..chunk.len()].copy_from_slice(chunk);
                page
            })
            .collect();

        PageStore {
            pages,
            size: data.len() as u64,
            page_size,
        }
    }

    /// Logical size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fill `buf` from `[offset, offset + buf.len())`.
    ///
    /// The whole range must lie within `[0, size)`; nothing is copied otherwise.
    pub fn read(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or(MemDbError::OffsetOverflow)?;
        if end > self.size {
            return Err(MemDbError::OutOfRange {
                offset,
                len: buf.len(),
                size: self.size,
            });
        }

        let mut copied = 0;
        while copied < buf.len() {
            let (page_no, page_off) = self.locate(offset + copied as u64);
            let page = &self.pages[page_no];
            let n = (self.page_size - page_off).min(buf.len() - copied);
            buf[copied..copied + n].copy_from_slice(&page[page_off..page_off + n]);
            copied += n;
        }

        Ok(())
    }

    /// Write `data` at `offset`, growing the store by whole pages as needed.
    ///
    /// A gap between the old size and `offset` reads back as zeros. Fails with
    /// `OffsetOverflow` if the write would end past [`MAX_DEVICE_SIZE`].
    pub fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(MemDbError::OffsetOverflow)?;
        if data.is_empty() {
            return Ok(());
        }
        if end > MAX_DEVICE_SIZE {
            return Err(MemDbError::OffsetOverflow);
        }

        self.ensure_pages(end);

        let mut written = 0;
        while written < data.len() {
            let (page_no, page_off) = self.locate(offset + written as u64);
            let page = &mut self.pages[page_no];
            let n = (self.page_size - page_off).min(data.len() - written);
            page[page_off..page_off + n].copy_from_slice(&data[written..written + n]);
            written += n;
        }

        if end > self.size {
            self.size = end;
        }

        Ok(())
    }

    /// Resize to exactly `size` bytes.
    ///
    /// Shrinking releases pages past the new end and zeroes the tail of the
    /// last page, so a later grow exposes zeros rather than stale bytes.
    /// Growing past [`MAX_DEVICE_SIZE`] fails with `OffsetOverflow`.
    pub fn truncate(&mut self, size: u64) -> Result<()> {
        if size == self.size {
            return Ok(());
        }

        if size > self.size {
            if size > MAX_DEVICE_SIZE {
                return Err(MemDbError::OffsetOverflow);
            }
            self.ensure_pages(size);
            self.size = size;
            return Ok(());
        }

        let keep = self.pages_for(size);
        self.pages.truncate(keep);

        let tail = (size % self.page_size as u64) as usize;
        if tail != 0 {
            if let Some(last) = self.pages.last_mut() {
                last[tail..].fill(0);
            }
        }

        self.size = size;
        Ok(())
    }

    /// Contiguous copy of exactly `size` bytes
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size as usize);
        let mut remaining = self.size as usize;

        for page in &self.pages {
            let n = remaining.min(self.page_size);
            out.extend_from_slice(&page[..n]);
            remaining -= n;
        }

        out
    }

    fn locate(&self, offset: u64) -> (usize, usize) {
        let page_size = self.page_size as u64;
        ((offset / page_size) as usize, (offset % page_size) as usize)
    }

    fn pages_for(&self, size: u64) -> usize {
        size.div_ceil(self.page_size as u64) as usize
    }

    fn ensure_pages(&mut self, end: u64) {
        let needed = self.pages_for(end);
        while self.pages.len() < needed {
            self.pages.push(vec![0u8; self.page_size].into_boxed_slice());
        }
    }
}
