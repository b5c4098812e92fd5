//! B+ tree internal page.
//!
//! # Layout
//! ```text
//! Offset  Size             Field
//! ------  ----             -----
//! 0       29               tree page header (see TreePage)
//! 29      n * entry_size   (key, child PageId) entries
//! ```
//!
//! An internal page with `size` entries has `size` children and
//! `size - 1` separator keys. The key in slot 0 is not a separator: child 0
//! covers every key below `key_at(1)`. Slot 0's key bytes are still written
//! during moves so a caller can read the key that has to go up to the parent.

use std::marker::PhantomData;
use std::ops::Range;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::index::{IndexKey, KeyComparator};

use super::b_plus_tree_page::{init_tree_header, TreePage, TreePageMut, TREE_HEADER_SIZE};
use super::page_header::PageType;

/// Typed view over an internal page's bytes.
pub struct InternalPage<K, B> {
    data: B,
    _key: PhantomData<K>,
}

impl<K: IndexKey, B: AsRef<[u8]>> InternalPage<K, B> {
    #[inline]
    pub fn new(data: B) -> Self {
        Self {
            data,
            _key: PhantomData,
        }
    }

    /// Wrap page bytes, rejecting anything but an internal node.
    pub fn try_new(data: B) -> Result<Self> {
        let page = Self::new(data);
        if page.page_type() != PageType::BTreeInternal {
            return Err(Error::InvalidPageType {
                page_id: page.page_id().0,
                found: page.page_type(),
            });
        }
        Ok(page)
    }

    #[inline]
    fn entry_size() -> usize {
        K::ENCODED_LEN + PageId::SIZE
    }

    #[inline]
    fn offset(index: usize) -> usize {
        TREE_HEADER_SIZE + index * Self::entry_size()
    }

    /// Number of entries that physically fit in a page.
    pub fn capacity() -> u32 {
        ((PAGE_SIZE - TREE_HEADER_SIZE) / Self::entry_size()) as u32
    }

    #[inline]
    pub fn key_at(&self, index: usize) -> K {
        K::decode_from(&self.data()[Self::offset(index)..])
    }

    /// Child page id in slot `index`.
    #[inline]
    pub fn value_at(&self, index: usize) -> PageId {
        PageId::read_from(&self.data()[Self::offset(index) + K::ENCODED_LEN..])
    }

    /// Slot holding child `child`, if it is a child of this page.
    pub fn value_index(&self, child: PageId) -> Option<usize> {
        (0..self.size()).find(|&i| self.value_at(i) == child)
    }

    /// All child page ids in slot order.
    pub fn children(&self) -> Vec<PageId> {
        (0..self.size()).map(|i| self.value_at(i)).collect()
    }

    /// Child whose subtree may contain `key`.
    ///
    /// Picks the last slot `i` with `key_at(i) <= key`, treating slot 0 as
    /// negative infinity.
    pub fn lookup<C: KeyComparator<K>>(&self, key: &K, comparator: &C) -> PageId {
        let mut lo = 1;
        let mut hi = self.size();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if comparator.compare(&self.key_at(mid), key).is_gt() {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        self.value_at(lo - 1)
    }
}

impl<K: IndexKey, B: AsRef<[u8]> + AsMut<[u8]>> InternalPage<K, B> {
    /// Format `data` as an empty internal page.
    pub fn init(data: B, page_id: PageId, parent: PageId, max_size: usize) -> Self {
        let mut page = Self::new(data);
        init_tree_header(page.data_mut(), PageType::BTreeInternal, page_id, parent, max_size);
        page
    }

    #[inline]
    pub fn set_key_at(&mut self, index: usize, key: &K) {
        let offset = Self::offset(index);
        key.encode_into(&mut self.data_mut()[offset..]);
    }

    #[inline]
    pub fn set_value_at(&mut self, index: usize, child: PageId) {
        let offset = Self::offset(index) + K::ENCODED_LEN;
        child.write_to(&mut self.data_mut()[offset..]);
    }

    fn shift(&mut self, from: usize, delta: isize) {
        let size = self.size();
        if from >= size {
            return;
        }
        let start = Self::offset(from);
        let end = Self::offset(size);
        let dest = (start as isize + delta * Self::entry_size() as isize) as usize;
        self.data_mut().copy_within(start..end, dest);
    }

    fn copy_range_to<R>(&self, range: Range<usize>, recipient: &mut InternalPage<K, R>, at: usize)
    where
        R: AsRef<[u8]> + AsMut<[u8]>,
    {
        let src = &self.data()[Self::offset(range.start)..Self::offset(range.end)];
        let dst = Self::offset(at);
        recipient.data_mut()[dst..dst + src.len()].copy_from_slice(src);
    }

    /// Fill a fresh root with two children split by `key`.
    pub fn populate_new_root(&mut self, left: PageId, key: &K, right: PageId) {
        self.set_value_at(0, left);
        self.set_key_at(1, key);
        self.set_value_at(1, right);
        self.set_size(2);
    }

    /// Insert `(key, new_child)` right after the slot holding `old_child`.
    ///
    /// Returns the new size, or `None` if `old_child` is not a child here.
    pub fn insert_node_after(&mut self, old_child: PageId, key: &K, new_child: PageId) -> Option<usize> {
        let index = self.value_index(old_child)? + 1;
        let size = self.size();
        debug_assert!(size < Self::capacity() as usize, "internal page overflow");

        self.shift(index, 1);
        self.set_key_at(index, key);
        self.set_value_at(index, new_child);
        self.set_size(size + 1);
        Some(size + 1)
    }

    /// Drop the entry in slot `index`.
    pub fn remove(&mut self, index: usize) {
        let size = self.size();
        self.shift(index + 1, -1);
        self.set_size(size - 1);
    }

    /// Empty a single-child root and hand back that child.
    pub fn remove_and_return_only_child(&mut self) -> PageId {
        let child = self.value_at(0);
        self.set_size(0);
        child
    }

    /// Move the upper half of this (overfull) page into the empty
    /// `recipient`. Returns the moved children, whose parent pointers the
    /// caller must update.
    ///
    /// Afterwards `recipient.key_at(0)` is the key to push up.
    pub fn move_half_to<R>(&mut self, recipient: &mut InternalPage<K, R>) -> Vec<PageId>
    where
        R: AsRef<[u8]> + AsMut<[u8]>,
    {
        let size = self.size();
        let keep = size / 2;
        self.copy_range_to(keep..size, recipient, 0);
        recipient.set_size(size - keep);
        self.set_size(keep);
        recipient.children()
    }

    /// Append every entry to `recipient`, the left sibling. `middle_key` is
    /// the parent separator between the two, pulled down in front of this
    /// page's first child.
    pub fn move_all_to<R>(&mut self, recipient: &mut InternalPage<K, R>, middle_key: &K) -> Vec<PageId>
    where
        R: AsRef<[u8]> + AsMut<[u8]>,
    {
        let moved = self.children();
        let size = self.size();
        let at = recipient.size();
        self.set_key_at(0, middle_key);
        self.copy_range_to(0..size, recipient, at);
        recipient.set_size(at + size);
        self.set_size(0);
        moved
    }

    /// Rotate this page's first child to the end of `recipient`, its left
    /// sibling. Returns the moved child.
    ///
    /// Afterwards `self.key_at(0)` is the new parent separator.
    pub fn move_first_to_end_of<R>(&mut self, recipient: &mut InternalPage<K, R>, middle_key: &K) -> PageId
    where
        R: AsRef<[u8]> + AsMut<[u8]>,
    {
        let child = self.value_at(0);
        let at = recipient.size();
        recipient.set_key_at(at, middle_key);
        recipient.set_value_at(at, child);
        recipient.set_size(at + 1);

        let size = self.size();
        self.shift(1, -1);
        self.set_size(size - 1);
        child
    }

    /// Rotate this page's last child to the front of `recipient`, its right
    /// sibling. Returns the moved child.
    ///
    /// Afterwards `recipient.key_at(0)` is the new parent separator.
    pub fn move_last_to_front_of<R>(&mut self, recipient: &mut InternalPage<K, R>, middle_key: &K) -> PageId
    where
        R: AsRef<[u8]> + AsMut<[u8]>,
    {
        let size = self.size();
        let child = self.value_at(size - 1);
        let recipient_size = recipient.size();

        recipient.shift(0, 1);
        recipient.set_key_at(1, middle_key);
        self.copy_range_to(size - 1..size, recipient, 0);
        recipient.set_size(recipient_size + 1);
        self.set_size(size - 1);
        child
    }
}

impl<K, B: AsRef<[u8]>> TreePage for InternalPage<K, B> {
    #[inline]
    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }
}

impl<K, B: AsRef<[u8]> + AsMut<[u8]>> TreePageMut for InternalPage<K, B> {
    #[inline]
    fn data_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }
}
