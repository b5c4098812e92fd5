//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] owns one page buffer for the lifetime of the pool. Which
//! page it holds, how many guards pin it and whether it needs writing back
//! are tracked with atomics, so the pool only takes the page lock when a
//! guard actually touches the bytes.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::PageId;
use crate::storage::page::Page;

/// Index of a frame in the buffer pool's frame array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub usize);

impl FrameId {
    #[inline]
    pub fn new(id: usize) -> Self {
        FrameId(id)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

/// A frame in the buffer pool.
///
/// Lifecycle: an empty frame is [`install`](Self::install)ed with a page
/// (pinned once for the caller's guard), pinned and unpinned by further
/// guards, and [`vacate`](Self::vacate)d when its page is evicted or
/// deleted. The resident page id is stored as a raw `u32` with
/// `PageId::INVALID` meaning empty.
pub struct Frame {
    page: RwLock<Page>,
    page_id: AtomicU32,
    pin_count: AtomicU32,
    dirty: AtomicBool,
}

impl Frame {
    /// Create an empty frame.
    pub fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
            page_id: AtomicU32::new(PageId::INVALID.0),
            pin_count: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
        }
    }

    /// Shared lock on the page bytes.
    #[inline]
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Exclusive lock on the page bytes.
    #[inline]
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    /// Page currently held, if any.
    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        Some(PageId::new(self.page_id.load(Ordering::Acquire))).filter(PageId::is_valid)
    }

    /// Take ownership of `page_id` with a single pin for the caller.
    ///
    /// The frame must be empty and unpinned.
    pub(crate) fn install(&self, page_id: PageId) {
        debug_assert!(self.page_id().is_none(), "frame already holds a page");
        debug_assert_eq!(self.pin_count(), 0);
        self.page_id.store(page_id.0, Ordering::Release);
        self.pin_count.store(1, Ordering::Relaxed);
    }

    /// Forget the resident page and any pending write-back. Returns the
    /// page that was held.
    pub(crate) fn vacate(&self) -> Option<PageId> {
        self.dirty.store(false, Ordering::Relaxed);
        let old = self.page_id.swap(PageId::INVALID.0, Ordering::AcqRel);
        Some(PageId::new(old)).filter(PageId::is_valid)
    }

    /// Add a pin. Returns the new count.
    #[inline]
    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Drop a pin, recording a modification first if `dirty`. Returns the
    /// new count.
    ///
    /// # Panics
    /// If the frame is not pinned.
    pub(crate) fn unpin(&self, dirty: bool) -> u32 {
        if dirty {
            self.mark_dirty();
        }
        let old = self.pin_count.fetch_sub(1, Ordering::Relaxed);
        assert!(old > 0, "pin count underflow");
        old - 1
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    #[inline]
    pub(crate) fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    /// Clear the dirty flag and report whether it was set. A failed
    /// write-back must call [`mark_dirty`](Self::mark_dirty) again.
    #[inline]
    pub(crate) fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}
