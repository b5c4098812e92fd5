//! Index structures.
//!
//! - [`BPlusTree`] - a paged B+ tree mapping unique fixed-width keys to
//!   [`RecordId`](crate::RecordId)s
//! - [`IndexKey`] / [`KeyComparator`] - key encoding and ordering

pub mod btree;
mod key;

pub use btree::{BPlusTree, TreeIter, TreeStats};
pub use key::{
    GenericComparator, GenericKey, IndexKey, IntegerKey, KeyComparator, OrdComparator,
};
