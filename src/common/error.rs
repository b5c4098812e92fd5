//! Error types for pagetree.

use thiserror::Error;

use crate::storage::page::PageType;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
/// This is a common Rust pattern (see `std::io::Result`).
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in pagetree.
///
/// Expected index outcomes are not errors: a duplicate insert returns
/// `Ok(false)`, a missing key returns `Ok(None)` and removing an absent key
/// is a no-op. Everything here aborts the operation that produced it.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist on disk.
    #[error("Page {0} not found")]
    PageNotFound(u32),

    /// Buffer pool has no free frames and cannot evict any pages.
    ///
    /// This happens when all frames are pinned.
    #[error("No free frames available in buffer pool")]
    NoFreeFrames,

    /// The index could not obtain a new page for a split or a new root.
    ///
    /// No structural change is left behind when this is returned.
    #[error("Out of memory: buffer pool cannot provide a new page")]
    OutOfMemory,

    /// The provided page ID is invalid (e.g., the sentinel).
    #[error("Invalid page ID: {0}")]
    InvalidPageId(u32),

    /// Attempted to delete a page that is still pinned.
    #[error("Page {0} is still pinned")]
    PagePinned(u32),

    /// The stored checksum does not match the page contents.
    #[error("Checksum mismatch on page {0}")]
    ChecksumMismatch(u32),

    /// A page carried a type tag other than the one the caller expected.
    #[error("Page {page_id} has unexpected type {found:?}")]
    InvalidPageType { page_id: u32, found: PageType },

    /// The header page has no room for another index record.
    #[error("Header page is full")]
    HeaderPageFull,

    /// Index names are stored in a fixed-width header page slot.
    #[error("Index name too long: {0:?}")]
    IndexNameTooLong(String),

    /// Tree configuration cannot be honored by the page layout.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed input handed to a bulk-load helper.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal consistency failure. Indicates a bug in the index.
    #[error("B+ tree invariant violated: {0}")]
    InvariantViolation(String),
}

impl Error {
    /// Build an [`Error::InvariantViolation`], asserting in debug builds.
    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        debug_assert!(false, "B+ tree invariant violated: {msg}");
        Error::InvariantViolation(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageNotFound(42);
        assert_eq!(format!("{}", err), "Page 42 not found");

        let err = Error::NoFreeFrames;
        assert_eq!(format!("{}", err), "No free frames available in buffer pool");

        let err = Error::InvalidPageType {
            page_id: 7,
            found: PageType::Data,
        };
        assert_eq!(format!("{}", err), "Page 7 has unexpected type Data");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error as _;

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = Error::from(io_err);
        assert!(err.source().is_some());
        assert!(Error::OutOfMemory.source().is_none());
    }

    #[test]
    fn test_result_type_alias() {
        fn might_fail() -> Result<u32> {
            Ok(42)
        }

        assert_eq!(might_fail().unwrap(), 42);
    }
}
