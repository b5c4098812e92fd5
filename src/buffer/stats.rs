//! Buffer pool counters.
//!
//! Tests use these to check how many page fetches an index operation costs
//! and whether a workload forced evictions.

use std::sync::atomic::{AtomicU64, Ordering};

/// Something the pool counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PoolEvent {
    /// A fetch found the page resident.
    Hit,
    /// A fetch had to read the page from disk.
    Miss,
    /// A frame was taken from another page.
    Eviction,
    /// A dirty page was written back.
    WriteBack,
    /// A page read from disk failed checksum verification.
    ChecksumFailure,
}

/// Monotonic event counters, updated with relaxed atomics.
///
/// Each `fetch_page_read` / `fetch_page_write` of a valid page id counts
/// once as a hit or a miss, so [`fetches`](Self::fetches) is the number of
/// such calls. `new_page` is not a fetch.
///
/// # Example
/// ```no_run
/// use pagetree::{BufferPoolManager, DiskManager, PageId};
///
/// let bpm = BufferPoolManager::new(8, DiskManager::create("stats.db")?);
/// drop(bpm.new_page()?);
///
/// let before = bpm.stats().fetches();
/// drop(bpm.fetch_page_read(PageId::new(0))?);
/// assert_eq!(bpm.stats().fetches() - before, 1);
/// assert_eq!(bpm.stats().misses(), 0);
/// # Ok::<(), pagetree::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct BufferPoolStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    writes: AtomicU64,
    checksum_failures: AtomicU64,
}

impl BufferPoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, event: PoolEvent) {
        let counter = match event {
            PoolEvent::Hit => &self.hits,
            PoolEvent::Miss => &self.misses,
            PoolEvent::Eviction => &self.evictions,
            PoolEvent::WriteBack => &self.writes,
            PoolEvent::ChecksumFailure => &self.checksum_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Fetch calls so far, resident or not.
    pub fn fetches(&self) -> u64 {
        self.hits() + self.misses()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Fetches that went to disk.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Pages written back, by eviction or flush.
    pub fn pages_written(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn checksum_failures(&self) -> u64 {
        self.checksum_failures.load(Ordering::Relaxed)
    }
}
