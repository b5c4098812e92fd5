//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache layer between the index and
//! disk. It manages a fixed pool of frames, each holding one page. Every
//! tree page access goes through a guard that pins the page for exactly as
//! long as the guard lives.
//!
//! # Components
//! - [`BufferPoolManager`] - The main page cache
//! - [`Frame`] - A slot in the buffer pool holding a page + metadata
//! - [`PageReadGuard`] / [`PageWriteGuard`] - RAII guards for page access
//! - [`BufferPoolStats`] - Fetch, eviction and write-back counters
//! - [`replacer`] - Eviction policy implementations

mod buffer_pool_manager;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::{Frame, FrameId};
pub(crate) use page_guard::PageGuard;
pub use page_guard::{PageReadGuard, PageWriteGuard};
pub use stats::BufferPoolStats;
