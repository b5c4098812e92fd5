//! Page identifier type.

use std::fmt;

/// Identifies a page on disk.
///
/// Using `u32` allows for 4 billion pages:
/// - 4,294,967,296 pages × 4KB = 16TB maximum database size
///
/// This matches BusTub's `page_id_t` type. Tree pages refer to their parent,
/// children and right sibling by `PageId`; those links are resolved through
/// the buffer pool, never held as pointers.
///
/// # Example
/// ```
/// use pagetree::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.0, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Invalid/sentinel page ID.
    ///
    /// Marks an empty tree's root, the root's parent and the last leaf's
    /// sibling.
    pub const INVALID: PageId = PageId(u32::MAX);

    /// Encoded width inside a page.
    pub const SIZE: usize = 4;

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Read a little-endian page id from the start of `data`.
    #[inline]
    pub fn read_from(data: &[u8]) -> Self {
        PageId(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
    }

    /// Write this page id little-endian at the start of `data`.
    #[inline]
    pub fn write_to(&self, data: &mut [u8]) {
        data[..Self::SIZE].copy_from_slice(&self.0.to_le_bytes());
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}
