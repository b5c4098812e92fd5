//! Disk Manager - low-level file I/O for database pages.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing pages
//! - Allocating and releasing pages
//! - Managing the database file

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, trace};

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageHeader, PageType};

/// Manages disk I/O for a single database file.
///
/// # File Layout
/// The database is stored as a single file with pages laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Page N is located at file offset `N × PAGE_SIZE`.
///
/// # Thread Safety
/// `DiskManager` is **single-threaded**. The `BufferPoolManager` is responsible
/// for serializing access to the disk manager.
///
/// # Free Pages
/// Pages released with [`deallocate_page`](Self::deallocate_page) are tagged
/// `PageType::Free` on disk and handed out again by the next allocation.
/// The free list itself lives in memory; after a reopen, released pages
/// are only reclaimed if the file is scanned with
/// [`recover_free_pages`](Self::recover_free_pages).
///
/// # Durability
/// Page writes are followed by `fsync()`.
pub struct DiskManager {
    file: File,
    /// Number of pages in the file.
    page_count: u32,
    /// Released pages, reused LIFO.
    free_pages: Vec<PageId>,
}

impl DiskManager {
    /// Create a new database file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            page_count: 0,
            free_pages: Vec::new(),
        })
    }

    /// Open an existing database file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        // Calculate page count from file size
        let metadata = file.metadata()?;
        let file_size = metadata.len();
        let page_count = (file_size / PAGE_SIZE as u64) as u32;

        debug!(page_count, "opened database file");
        Ok(Self {
            file,
            page_count,
            free_pages: Vec::new(),
        })
    }

    /// Open an existing database file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Read a page from disk.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page doesn't exist.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        self.check_page_id(page_id)?;

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;

        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;

        Ok(page)
    }

    /// Write a page to disk.
    ///
    /// The page must have been previously allocated with `allocate_page()`.
    ///
    /// # Durability
    /// This method calls `fsync()` after writing to ensure the data is
    /// persisted to disk.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page hasn't been allocated.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        self.check_page_id(page_id)?;

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(page.as_slice())?;
        self.file.sync_all()?; // fsync for durability

        Ok(())
    }

    fn check_page_id(&self, page_id: PageId) -> Result<()> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id.0));
        }
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id.0));
        }
        Ok(())
    }

    /// Allocate a page on disk.
    ///
    /// Reuses a released page if one is available, otherwise extends the
    /// file. Either way the page reads back as zeros.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        let zeros = [0u8; PAGE_SIZE];

        if let Some(page_id) = self.free_pages.pop() {
            let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
            self.file.seek(SeekFrom::Start(offset))?;
            self.file.write_all(&zeros)?;
            trace!(page_id = page_id.0, "reused free page");
            return Ok(page_id);
        }

        let page_id = PageId::new(self.page_count);
        if !page_id.is_valid() {
            return Err(Error::OutOfMemory);
        }

        // Extend file with a zeroed page
        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&zeros)?;

        self.page_count += 1;
        trace!(page_id = page_id.0, "extended file");
        Ok(page_id)
    }

    /// Release a page for reuse.
    ///
    /// The page is tagged `Free` on disk so stale readers see it as such.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page was never allocated.
    pub fn deallocate_page(&mut self, page_id: PageId) -> Result<()> {
        self.check_page_id(page_id)?;
        if self.free_pages.contains(&page_id) {
            return Ok(());
        }

        let mut page = Page::new();
        page.set_header(&PageHeader::new(PageType::Free));
        page.update_checksum();
        self.write_page(page_id, &page)?;

        self.free_pages.push(page_id);
        trace!(page_id = page_id.0, "released page");
        Ok(())
    }

    /// Rebuild the free list from pages tagged `Free` on disk.
    ///
    /// Returns the number of pages found.
    pub fn recover_free_pages(&mut self) -> Result<usize> {
        self.free_pages.clear();
        for id in 0..self.page_count {
            let page_id = PageId::new(id);
            if self.read_page(page_id)?.page_type() == PageType::Free {
                self.free_pages.push(page_id);
            }
        }
        debug!(free = self.free_pages.len(), "recovered free list");
        Ok(self.free_pages.len())
    }

    /// Flush file contents and metadata to stable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Number of released pages waiting for reuse.
    #[inline]
    pub fn free_page_count(&self) -> usize {
        self.free_pages.len()
    }

    /// Get the number of pages in the database.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Get the total size of the database file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.page_count as u64) * (PAGE_SIZE as u64)
    }
}
