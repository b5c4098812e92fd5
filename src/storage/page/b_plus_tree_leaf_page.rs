//! B+ tree leaf page.
//!
//! # Layout
//! ```text
//! Offset  Size             Field
//! ------  ----             -----
//! 0       29               tree page header (see TreePage)
//! 29      4                next leaf page id
//! 33      n * entry_size   (key, RecordId) entries, sorted by key
//! ```
//!
//! Leaves are chained left to right through `next_page_id`; the last leaf
//! holds `PageId::INVALID`.

use std::marker::PhantomData;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, RecordId, Result};
use crate::index::{IndexKey, KeyComparator};

use super::b_plus_tree_page::{init_tree_header, TreePage, TreePageMut, TREE_HEADER_SIZE};
use super::page_header::PageType;

const OFFSET_NEXT_PAGE_ID: usize = TREE_HEADER_SIZE;
const LEAF_HEADER_SIZE: usize = OFFSET_NEXT_PAGE_ID + PageId::SIZE;

/// Typed view over a leaf page's bytes.
///
/// `B` is `&[u8]` for a read view and `&mut [u8]` for a write view.
pub struct LeafPage<K, B> {
    data: B,
    _key: PhantomData<K>,
}

impl<K: IndexKey, B: AsRef<[u8]>> LeafPage<K, B> {
    /// Wrap page bytes without checking the tag.
    #[inline]
    pub fn new(data: B) -> Self {
        Self {
            data,
            _key: PhantomData,
        }
    }

    /// Wrap page bytes, rejecting anything but a leaf.
    pub fn try_new(data: B) -> Result<Self> {
        let page = Self::new(data);
        if !page.is_leaf() {
            return Err(Error::InvalidPageType {
                page_id: page.page_id().0,
                found: page.page_type(),
            });
        }
        Ok(page)
    }

    #[inline]
    fn entry_size() -> usize {
        K::ENCODED_LEN + RecordId::SIZE
    }

    #[inline]
    fn offset(index: usize) -> usize {
        LEAF_HEADER_SIZE + index * Self::entry_size()
    }

    /// Number of entries that physically fit in a page.
    pub fn capacity() -> u32 {
        ((PAGE_SIZE - LEAF_HEADER_SIZE) / Self::entry_size()) as u32
    }

    #[inline]
    pub fn next_page_id(&self) -> PageId {
        PageId::read_from(&self.data()[OFFSET_NEXT_PAGE_ID..])
    }

    #[inline]
    pub fn key_at(&self, index: usize) -> K {
        K::decode_from(&self.data()[Self::offset(index)..])
    }

    #[inline]
    pub fn value_at(&self, index: usize) -> RecordId {
        RecordId::read_from(&self.data()[Self::offset(index) + K::ENCODED_LEN..])
    }

    #[inline]
    pub fn item(&self, index: usize) -> (K, RecordId) {
        (self.key_at(index), self.value_at(index))
    }

    /// First index whose key is not less than `key`. Equals `size()` when
    /// every key is smaller.
    pub fn key_index<C: KeyComparator<K>>(&self, key: &K, comparator: &C) -> usize {
        let mut lo = 0;
        let mut hi = self.size();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if comparator.compare(&self.key_at(mid), key).is_lt() {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Value stored under `key`, if any.
    pub fn lookup<C: KeyComparator<K>>(&self, key: &K, comparator: &C) -> Option<RecordId> {
        let index = self.key_index(key, comparator);
        if index < self.size() && comparator.compare(&self.key_at(index), key).is_eq() {
            Some(self.value_at(index))
        } else {
            None
        }
    }
}

impl<K: IndexKey, B: AsRef<[u8]> + AsMut<[u8]>> LeafPage<K, B> {
    /// Format `data` as an empty leaf.
    pub fn init(data: B, page_id: PageId, parent: PageId, max_size: usize) -> Self {
        let mut page = Self::new(data);
        init_tree_header(page.data_mut(), PageType::BTreeLeaf, page_id, parent, max_size);
        page.set_next_page_id(PageId::INVALID);
        page
    }

    #[inline]
    pub fn set_next_page_id(&mut self, next: PageId) {
        next.write_to(&mut self.data_mut()[OFFSET_NEXT_PAGE_ID..]);
    }

    fn write_entry(&mut self, index: usize, key: &K, value: RecordId) {
        let offset = Self::offset(index);
        let data = self.data_mut();
        key.encode_into(&mut data[offset..]);
        value.write_to(&mut data[offset + K::ENCODED_LEN..]);
    }

    /// Shift entries `[from, size)` by `delta` slots (positive is right).
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

    /// Insert in key order. Returns `false` and leaves the page untouched if
    /// `key` is already present.
    ///
    /// The page may temporarily hold `max_size + 1` entries; the caller
    /// splits it afterwards.
    pub fn insert<C: KeyComparator<K>>(&mut self, key: &K, value: RecordId, comparator: &C) -> bool {
        let size = self.size();
        let index = self.key_index(key, comparator);
        if index < size && comparator.compare(&self.key_at(index), key).is_eq() {
            return false;
        }
        debug_assert!(size < Self::capacity() as usize, "leaf page overflow");

        self.shift(index, 1);
        self.write_entry(index, key, value);
        self.set_size(size + 1);
        true
    }

    /// Remove `key`. Returns `false` if it was absent.
    pub fn remove<C: KeyComparator<K>>(&mut self, key: &K, comparator: &C) -> bool {
        let size = self.size();
        let index = self.key_index(key, comparator);
        if index >= size || !comparator.compare(&self.key_at(index), key).is_eq() {
            return false;
        }
        self.shift(index + 1, -1);
        self.set_size(size - 1);
        true
    }

    fn copy_range_to<R>(&self, range: std::ops::Range<usize>, recipient: &mut LeafPage<K, R>, at: usize)
    where
        R: AsRef<[u8]> + AsMut<[u8]>,
    {
        let src = &self.data()[Self::offset(range.start)..Self::offset(range.end)];
        let dst = Self::offset(at);
        recipient.data_mut()[dst..dst + src.len()].copy_from_slice(src);
    }

    /// Move the upper half of this (overfull) leaf into the empty
    /// `recipient` and splice `recipient` into the leaf chain after `self`.
    ///
    /// The recipient ends up with `ceil(size / 2)` entries.
    pub fn move_half_to<R>(&mut self, recipient: &mut LeafPage<K, R>)
    where
        R: AsRef<[u8]> + AsMut<[u8]>,
    {
        let size = self.size();
        let keep = size / 2;
        self.copy_range_to(keep..size, recipient, 0);
        recipient.set_size(size - keep);
        self.set_size(keep);

        recipient.set_next_page_id(self.next_page_id());
        self.set_next_page_id(recipient.page_id());
    }

    /// Append every entry to `recipient`, the left sibling, which takes
    /// over this leaf's place in the chain.
    pub fn move_all_to<R>(&mut self, recipient: &mut LeafPage<K, R>)
    where
        R: AsRef<[u8]> + AsMut<[u8]>,
    {
        let size = self.size();
        let at = recipient.size();
        self.copy_range_to(0..size, recipient, at);
        recipient.set_size(at + size);
        recipient.set_next_page_id(self.next_page_id());
        self.set_size(0);
    }

    /// Move this leaf's first entry to the end of `recipient`, its left
    /// sibling.
    pub fn move_first_to_end_of<R>(&mut self, recipient: &mut LeafPage<K, R>)
    where
        R: AsRef<[u8]> + AsMut<[u8]>,
    {
        let size = self.size();
        let at = recipient.size();
        self.copy_range_to(0..1, recipient, at);
        recipient.set_size(at + 1);

        self.shift(1, -1);
        self.set_size(size - 1);
    }

    /// Move this leaf's last entry to the front of `recipient`, its right
    /// sibling.
    pub fn move_last_to_front_of<R>(&mut self, recipient: &mut LeafPage<K, R>)
    where
        R: AsRef<[u8]> + AsMut<[u8]>,
    {
        let size = self.size();
        let recipient_size = recipient.size();
        recipient.shift(0, 1);
        self.copy_range_to(size - 1..size, recipient, 0);
        recipient.set_size(recipient_size + 1);
        self.set_size(size - 1);
    }
}

impl<K, B: AsRef<[u8]>> TreePage for LeafPage<K, B> {
    #[inline]
    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }
}

impl<K, B: AsRef<[u8]> + AsMut<[u8]>> TreePageMut for LeafPage<K, B> {
    #[inline]
    fn data_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::OrdComparator;

    fn rid(v: i64) -> RecordId {
        RecordId::from_integer(v)
    }

    fn keys<B: AsRef<[u8]>>(page: &LeafPage<i64, B>) -> Vec<i64> {
        (0..page.size()).map(|i| page.key_at(i)).collect()
    }

    fn filled(buf: &mut [u8], id: u32, max: usize, values: &[i64]) {
        let mut page = LeafPage::<i64, _>::init(buf, PageId::new(id), PageId::INVALID, max);
        for v in values {
            assert!(page.insert(v, rid(*v), &OrdComparator));
        }
    }

    #[test]
    fn test_capacity() {
        // (4096 - 33) / (8 + 8)
        assert_eq!(LeafPage::<i64, &[u8]>::capacity(), 253);
        assert_eq!(LeafPage::<u32, &[u8]>::capacity(), 338);
    }

    #[test]
    fn test_insert_keeps_order_and_rejects_duplicates() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page = LeafPage::<i64, _>::init(buf.as_mut_slice(), PageId::new(1), PageId::INVALID, 8);

        for v in [5, 1, 9, 3, 7] {
            assert!(page.insert(&v, rid(v), &OrdComparator));
        }
        assert!(!page.insert(&3, rid(99), &OrdComparator));

        assert_eq!(keys(&page), vec![1, 3, 5, 7, 9]);
        assert_eq!(page.lookup(&3, &OrdComparator), Some(rid(3)));
        assert_eq!(page.lookup(&4, &OrdComparator), None);
        assert_eq!(page.next_page_id(), PageId::INVALID);
    }

    #[test]
    fn test_key_index_is_lower_bound() {
        let mut buf = vec![0u8; PAGE_SIZE];
        filled(&mut buf, 1, 8, &[10, 20, 30]);
        let page = LeafPage::<i64, _>::new(buf.as_slice());

        assert_eq!(page.key_index(&5, &OrdComparator), 0);
        assert_eq!(page.key_index(&20, &OrdComparator), 1);
        assert_eq!(page.key_index(&25, &OrdComparator), 2);
        assert_eq!(page.key_index(&31, &OrdComparator), 3);
    }

    #[test]
    fn test_remove() {
        let mut buf = vec![0u8; PAGE_SIZE];
        filled(&mut buf, 1, 8, &[1, 2, 3, 4]);
        let mut page = LeafPage::<i64, _>::new(buf.as_mut_slice());

        assert!(page.remove(&2, &OrdComparator));
        assert!(!page.remove(&2, &OrdComparator));
        assert!(page.remove(&4, &OrdComparator));
        assert_eq!(keys(&page), vec![1, 3]);
        assert_eq!(page.value_at(1), rid(3));
    }

    #[test]
    fn test_move_half_relinks_chain() {
        let mut left_buf = vec![0u8; PAGE_SIZE];
        let mut right_buf = vec![0u8; PAGE_SIZE];
        filled(&mut left_buf, 1, 4, &[1, 2, 3, 4, 5]);

        let mut left = LeafPage::<i64, _>::new(left_buf.as_mut_slice());
        left.set_next_page_id(PageId::new(7));
        let mut right =
            LeafPage::<i64, _>::init(right_buf.as_mut_slice(), PageId::new(2), PageId::INVALID, 4);

        left.move_half_to(&mut right);

        assert_eq!(keys(&left), vec![1, 2]);
        assert_eq!(keys(&right), vec![3, 4, 5]);
        assert_eq!(left.next_page_id(), PageId::new(2));
        assert_eq!(right.next_page_id(), PageId::new(7));
    }

    #[test]
    fn test_move_all_takes_over_next_link() {
        let mut left_buf = vec![0u8; PAGE_SIZE];
        let mut right_buf = vec![0u8; PAGE_SIZE];
        filled(&mut left_buf, 1, 4, &[1, 2]);
        filled(&mut right_buf, 2, 4, &[5, 6]);

        let mut left = LeafPage::<i64, _>::new(left_buf.as_mut_slice());
        let mut right = LeafPage::<i64, _>::new(right_buf.as_mut_slice());
        left.set_next_page_id(PageId::new(2));
        right.set_next_page_id(PageId::new(9));

        right.move_all_to(&mut left);

        assert_eq!(keys(&left), vec![1, 2, 5, 6]);
        assert_eq!(right.size(), 0);
        assert_eq!(left.next_page_id(), PageId::new(9));
    }

    #[test]
    fn test_borrow_between_siblings() {
        let mut left_buf = vec![0u8; PAGE_SIZE];
        let mut right_buf = vec![0u8; PAGE_SIZE];
        filled(&mut left_buf, 1, 4, &[1, 2, 3]);
        filled(&mut right_buf, 2, 4, &[7, 8]);

        let mut left = LeafPage::<i64, _>::new(left_buf.as_mut_slice());
        let mut right = LeafPage::<i64, _>::new(right_buf.as_mut_slice());

        left.move_last_to_front_of(&mut right);
        assert_eq!(keys(&left), vec![1, 2]);
        assert_eq!(keys(&right), vec![3, 7, 8]);
        assert_eq!(right.value_at(0), rid(3));

        right.move_first_to_end_of(&mut left);
        assert_eq!(keys(&left), vec![1, 2, 3]);
        assert_eq!(keys(&right), vec![7, 8]);
    }

    #[test]
    fn test_try_new_rejects_internal() {
        let mut buf = vec![0u8; PAGE_SIZE];
        init_tree_header(&mut buf, PageType::BTreeInternal, PageId::new(4), PageId::INVALID, 4);
        assert!(matches!(
            LeafPage::<i64, _>::try_new(buf.as_slice()),
            Err(Error::InvalidPageType { page_id: 4, .. })
        ));
    }
}
