//! pagetree - a disk-backed B+ tree index over a pinning buffer pool.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            pagetree                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                 Index Layer (index/)                    │   │
//! │  │   BPlusTree: lookup, insert/split, remove/merge, scan   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Buffer Pool (buffer/)                    │   │
//! │  │   BufferPoolManager + Frame + FIFO replacer + guards    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Storage Layer (storage/)                 │   │
//! │  │   DiskManager + Page + header/leaf/internal page views  │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, RecordId, Error, config)
//! - [`buffer`] - Buffer pool management and eviction
//! - [`storage`] - Disk I/O and page formats
//! - [`index`] - The B+ tree and its key types
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use pagetree::index::OrdComparator;
//! use pagetree::{BPlusTree, BPlusTreeConfig, BufferPoolManager, DiskManager, RecordId};
//!
//! let dm = DiskManager::create("my_index.db")?;
//! let bpm = Arc::new(BufferPoolManager::new(pagetree::common::config::DEFAULT_POOL_SIZE, dm));
//! let mut tree = BPlusTree::<i64, _>::new(
//!     "users_pk",
//!     Arc::clone(&bpm),
//!     OrdComparator,
//!     BPlusTreeConfig::for_key::<i64>(),
//! )?;
//!
//! for id in 1..=1000 {
//!     tree.insert(&id, RecordId::from_integer(id))?;
//! }
//! let keys: Vec<i64> = tree.iter_from(&990)?.map(|r| r.map(|(k, _)| k)).collect::<Result<_, _>>()?;
//! assert_eq!(keys.len(), 11);
//! bpm.flush_all_pages()?;
//! # Ok::<(), pagetree::Error>(())
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{BPlusTreeConfig, Error, PageId, RecordId, Result};

pub use buffer::{
    BufferPoolManager, BufferPoolStats, Frame, FrameId, PageReadGuard, PageWriteGuard,
};
pub use index::{BPlusTree, TreeIter, TreeStats};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::DiskManager;
