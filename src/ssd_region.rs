//! The SSD region: a page file opened with direct I/O, plus an ascending
//! page-id allocator with LIFO reuse of freed ids.

use crate::common::{PageId, PAGE_SIZE};
use crate::error::{BufferPoolError, Result};
use crate::frame::Page;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;

pub struct SsdRegion {
    file: File,
    page_count: u64,
    // Stack of free page ids, seeded in descending order so the first
    // `page_count` allocations hand out ids 0, 1, 2, ... in order; ids
    // freed later are pushed on top and win LIFO.
    free_page_ids: Vec<PageId>,
}

impl SsdRegion {
    /// Open (or create) the page file at `path` with direct I/O.
    pub fn new(path: impl AsRef<Path>, page_count: u64) -> Result<Self> {
        Self::with_direct_io(path, page_count, true)
    }

    /// Open the page file, optionally skipping `O_DIRECT`. Some
    /// filesystems (tmpfs, overlayfs) reject direct I/O outright; tests
    /// that don't care about bypassing the page cache pass `false` here.
    pub fn with_direct_io(path: impl AsRef<Path>, page_count: u64, direct_io: bool) -> Result<Self> {
        let file = Self::open_file(path.as_ref(), direct_io)?;
        file.set_len(page_count * PAGE_SIZE as u64)
            .map_err(BufferPoolError::PlainIo)?;

        let free_page_ids = (0..page_count).rev().collect();

        Ok(Self {
            file,
            page_count,
            free_page_ids,
        })
    }

    fn open_file(path: &Path, direct_io: bool) -> Result<File> {
        #[cfg(target_os = "linux")]
        if direct_io {
            use std::os::unix::fs::OpenOptionsExt;
            let mut options = OpenOptions::new();
            options
                .create(true)
                .read(true)
                .write(true)
                .truncate(true)
                .custom_flags(libc::O_DIRECT);
            match options.open(path) {
                Ok(file) => return Ok(file),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        path = %path.display(),
                        "O_DIRECT unavailable for page file, falling back to buffered I/O"
                    );
                }
            }
        }
        #[cfg(not(target_os = "linux"))]
        let _ = direct_io;

        let mut options = OpenOptions::new();
        options.create(true).read(true).write(true).truncate(true);
        options.open(path).map_err(BufferPoolError::PlainIo)
    }

    #[inline]
    pub fn page_count(&self) -> u64 {
        self.page_count
    }

    #[inline]
    pub fn free_page_count(&self) -> usize {
        self.free_page_ids.len()
    }

    /// Allocate a page id. Freed ids are reused most-recently-freed first;
    /// otherwise ids are handed out in ascending order starting from 0.
    pub fn allocate_page_id(&mut self) -> Result<PageId> {
        self.free_page_ids
            .pop()
            .ok_or(BufferPoolError::PageIdsExhausted)
    }

    pub fn free_page_id(&mut self, page_id: PageId) {
        self.free_page_ids.push(page_id);
    }

    /// Read `PAGE_SIZE` bytes for `page_id` into `dst`.
    pub fn read_page(&self, dst: &mut Page, page_id: PageId) -> Result<()> {
        let offset = page_id * PAGE_SIZE as u64;
        self.file
            .read_exact_at(dst.as_bytes_mut(), offset)
            .map_err(|e| BufferPoolError::io(page_id, e))
    }

    /// Write `src` to `page_id` and force a durable flush before returning.
    pub fn write_page(&self, src: &Page, page_id: PageId) -> Result<()> {
        let offset = page_id * PAGE_SIZE as u64;
        self.file
            .write_all_at(src.as_bytes(), offset)
            .map_err(|e| BufferPoolError::io(page_id, e))?;
        self.file.sync_data().map_err(|e| BufferPoolError::io(page_id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn region(page_count: u64) -> (SsdRegion, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let region = SsdRegion::with_direct_io(dir.path().join("pages.db"), page_count, false).unwrap();
        (region, dir)
    }

    #[test]
    fn allocates_ascending_ids() {
        let (mut region, _dir) = region(512);
        assert_eq!(region.allocate_page_id().unwrap(), 0);
        assert_eq!(region.allocate_page_id().unwrap(), 1);
        assert_eq!(region.allocate_page_id().unwrap(), 2);
    }

    #[test]
    fn freed_ids_are_reused_lifo() {
        let (mut region, _dir) = region(512);
        let a = region.allocate_page_id().unwrap();
        let _b = region.allocate_page_id().unwrap();
        region.free_page_id(a);
        assert_eq!(region.allocate_page_id().unwrap(), a);
    }

    #[test]
    fn exhausting_ids_is_a_capacity_error() {
        let (mut region, _dir) = region(1);
        assert_eq!(region.allocate_page_id().unwrap(), 0);
        assert!(matches!(
            region.allocate_page_id(),
            Err(BufferPoolError::PageIdsExhausted)
        ));
    }

    #[test]
    fn write_then_read_roundtrips() {
        let (region, _dir) = region(4);
        let mut page = Page::zeroed();
        page.as_bytes_mut()[..4].copy_from_slice(&0xDEADu32.to_le_bytes());
        region.write_page(&page, 2).unwrap();

        let mut dst = Page::zeroed();
        region.read_page(&mut dst, 2).unwrap();
        assert_eq!(dst.as_bytes()[..4], 0xDEADu32.to_le_bytes());
    }
}
