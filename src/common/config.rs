//! Configuration constants for pagetree.

use crate::common::{Error, PageId, Result};
use crate::index::IndexKey;
use crate::storage::page::{InternalPage, LeafPage};

/// Size of a page in bytes (4KB).
///
/// This value is chosen to match:
/// - OS page size on most systems (4096 bytes)
/// - Common database page sizes (PostgreSQL uses 8KB, but 4KB is also standard)
/// - BusTub's page size
///
/// # Memory Layout
/// With 4KB pages and 32-bit PageIds:
/// - Max pages: 2^32 = 4,294,967,296 pages
/// - Max database size: 4,294,967,296 × 4KB = 16TB
///
/// # Alignment
/// Pages are aligned to 4096 bytes for efficient Direct I/O (O_DIRECT).
pub const PAGE_SIZE: usize = 4096;

/// Maximum number of pages with u32 PageId.
pub const MAX_PAGES: u64 = (u32::MAX as u64) + 1;

/// Maximum theoretical database size in bytes.
pub const MAX_DB_SIZE_BYTES: u64 = MAX_PAGES * PAGE_SIZE as u64;

/// Page holding the root directory (index name -> root page id).
///
/// It is the first page allocated in a fresh database file.
pub const HEADER_PAGE_ID: PageId = PageId(0);

/// Frame count used when a caller has no better estimate.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Node capacities for a [`BPlusTree`](crate::index::BPlusTree).
///
/// A node splits once an insert pushes it past its max size, so the page
/// layout must hold `max_size + 1` entries. Non-root nodes keep at least
/// `ceil(max_size / 2)` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BPlusTreeConfig {
    /// Maximum number of key/value pairs in a leaf page.
    pub leaf_max_size: u32,
    /// Maximum number of children of an internal page.
    pub internal_max_size: u32,
}

impl BPlusTreeConfig {
    /// Create a config with explicit capacities.
    pub fn new(leaf_max_size: u32, internal_max_size: u32) -> Self {
        Self {
            leaf_max_size,
            internal_max_size,
        }
    }

    /// Largest capacities a page can hold for key type `K`.
    pub fn for_key<K: IndexKey>() -> Self {
        Self {
            leaf_max_size: LeafPage::<K, &[u8]>::capacity() - 1,
            internal_max_size: InternalPage::<K, &[u8]>::capacity() - 1,
        }
    }

    /// Check the capacities against the page layout for key type `K`.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if a node could not hold its overflow
    /// entry or would be too small to rebalance.
    pub fn validate<K: IndexKey>(&self) -> Result<()> {
        let leaf_capacity = LeafPage::<K, &[u8]>::capacity();
        let internal_capacity = InternalPage::<K, &[u8]>::capacity();

        if self.leaf_max_size < 2 {
            return Err(Error::InvalidConfig(format!(
                "leaf_max_size must be >= 2, got {}",
                self.leaf_max_size
            )));
        }
        if self.internal_max_size < 3 {
            return Err(Error::InvalidConfig(format!(
                "internal_max_size must be >= 3, got {}",
                self.internal_max_size
            )));
        }
        if self.leaf_max_size >= leaf_capacity {
            return Err(Error::InvalidConfig(format!(
                "leaf_max_size {} does not fit a page (capacity {})",
                self.leaf_max_size, leaf_capacity
            )));
        }
        if self.internal_max_size >= internal_capacity {
            return Err(Error::InvalidConfig(format!(
                "internal_max_size {} does not fit a page (capacity {})",
                self.internal_max_size, internal_capacity
            )));
        }
        Ok(())
    }
}
