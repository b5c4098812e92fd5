//! Forward scan over the leaf chain.

use std::iter::FusedIterator;

use crate::buffer::{BufferPoolManager, PageReadGuard};
use crate::common::{PageId, RecordId, Result};
use crate::index::{IndexKey, KeyComparator};
use crate::storage::page::{LeafPage, TreePage};

use super::tree::{BPlusTree, Descend};

/// Iterator over `(key, value)` pairs in key order.
///
/// Holds a read guard on the current leaf only, and none once exhausted.
/// Moving to the next leaf fetches a page, which can fail, so items are
/// `Result`s. After an error the iterator is finished.
pub struct TreeIter<'a, K> {
    bpm: &'a BufferPoolManager,
    leaf: Option<PageReadGuard<'a>>,
    index: usize,
    _key: std::marker::PhantomData<K>,
}

impl<'a, K: IndexKey> TreeIter<'a, K> {
    fn empty(bpm: &'a BufferPoolManager) -> Self {
        Self {
            bpm,
            leaf: None,
            index: 0,
            _key: std::marker::PhantomData,
        }
    }

    /// Start at slot `index` of the leaf `guard` pins.
    fn at(bpm: &'a BufferPoolManager, guard: PageReadGuard<'a>, index: usize) -> Self {
        Self {
            bpm,
            leaf: Some(guard),
            index,
            _key: std::marker::PhantomData,
        }
    }

    /// Whether the scan has no items left. Does not advance.
    pub fn is_end(&self) -> bool {
        match &self.leaf {
            None => true,
            Some(guard) => {
                let leaf = LeafPage::<K, _>::new(guard.as_slice());
                self.index >= leaf.size() && !leaf.next_page_id().is_valid()
            }
        }
    }

    /// Page id of the leaf the iterator is positioned on.
    pub fn current_page_id(&self) -> Option<PageId> {
        self.leaf.as_ref().map(|guard| guard.page_id())
    }
}

impl<K: IndexKey> Iterator for TreeIter<'_, K> {
    type Item = Result<(K, RecordId)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let guard = self.leaf.as_ref()?;
            let leaf = LeafPage::<K, _>::new(guard.as_slice());
            if self.index < leaf.size() {
                let item = leaf.item(self.index);
                self.index += 1;
                return Some(Ok(item));
            }

            let next = leaf.next_page_id();
            // Unpin before fetching the successor
            self.leaf = None;
            if !next.is_valid() {
                return None;
            }

            match self.bpm.fetch_page_read(next) {
                Ok(guard) => {
                    if let Err(e) = LeafPage::<K, _>::try_new(guard.as_slice()) {
                        return Some(Err(e));
                    }
                    self.leaf = Some(guard);
                    self.index = 0;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl<K: IndexKey> FusedIterator for TreeIter<'_, K> {}

impl<K: IndexKey, C: KeyComparator<K>> BPlusTree<K, C> {
    /// Iterate over every entry from the smallest key.
    ///
    /// # Errors
    /// Storage errors while positioning on the first leaf.
    pub fn iter(&self) -> Result<TreeIter<'_, K>> {
        if self.is_empty() {
            return Ok(TreeIter::empty(&self.bpm));
        }
        let guard: PageReadGuard<'_> = self.find_leaf(&self.bpm, Descend::Leftmost)?;
        Ok(TreeIter::at(&self.bpm, guard, 0))
    }

    /// Iterate from the first entry whose key is not less than `key`.
    pub fn iter_from(&self, key: &K) -> Result<TreeIter<'_, K>> {
        if self.is_empty() {
            return Ok(TreeIter::empty(&self.bpm));
        }
        let guard: PageReadGuard<'_> = self.find_leaf(&self.bpm, Descend::Key(key))?;
        let index = LeafPage::<K, _>::try_new(guard.as_slice())?.key_index(key, &self.comparator);
        Ok(TreeIter::at(&self.bpm, guard, index))
    }

    /// Collect every entry in key order.
    pub fn to_vec(&self) -> Result<Vec<(K, RecordId)>> {
        self.iter()?.collect()
    }
}
