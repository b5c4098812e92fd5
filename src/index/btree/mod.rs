//! Disk-resident B+ tree.
//!
//! The tree lives entirely in buffer pool pages. Nodes refer to each other
//! by [`PageId`](crate::PageId) and every access goes through a page guard,
//! so nothing is pinned once an operation returns.
//!
//! - [`BPlusTree`] - lookup, insert and remove with split/merge rebalancing
//! - [`TreeIter`] - forward scan along the leaf chain
//! - [`TreeStats`] - shape summary returned by [`BPlusTree::verify`]

mod bulk;
mod debug;
mod iterator;
mod tree;

pub use debug::TreeStats;
pub use iterator::TreeIter;
pub use tree::BPlusTree;
