//! B+ tree orchestration: descent, insert with split, remove with
//! redistribute/merge, and root maintenance.
//!
//! # Structure
//! ```text
//!                 [ · | 20 | 40 ]            internal root
//!                 /      |      \
//!       [ · | 10 ]   [ · | 30 ]   [ · | 50 ]  internals
//!        /     \       /    \       /    \
//!      (..)  (..) -> (..) -> (..) -> (..) -> (..)   leaves, chained
//! ```
//!
//! Child `i` of an internal node holds the keys in
//! `[key_at(i), key_at(i + 1))`; slot 0 has no lower bound. A leaf split
//! copies the first key of the new right leaf into the parent. An internal
//! split moves its middle key up and leaves it in slot 0 of the new right
//! node, where it no longer acts as a separator.
//!
//! # Pinning
//! A descent pins one page at a time and hands the target leaf back still
//! pinned, under a read or a write guard as the operation needs, so point
//! operations touch each level once. Other guards are short-lived.
//! Structural changes propagate upward in a loop that releases a level's
//! pages before touching its parent, and children are re-parented only
//! after the pages that moved them are released. No operation holds more
//! than three pages at once.
//!
//! # Allocation failure
//! Before an insert changes anything it counts the pages the resulting
//! split chain will need and allocates all of them. If the pool cannot
//! supply them the insert returns `Error::OutOfMemory` and the tree is
//! unchanged.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::buffer::{BufferPoolManager, PageGuard, PageReadGuard, PageWriteGuard};
use crate::common::config::HEADER_PAGE_ID;
use crate::common::{BPlusTreeConfig, Error, PageId, RecordId, Result};
use crate::index::{IndexKey, KeyComparator};
use crate::storage::page::{
    HeaderPage, InternalPage, LeafPage, TreePage, TreePageHeader, TreePageMut, MAX_INDEX_NAME_LEN,
};

/// Fewest frames the tree needs to run a rebalance step.
const MIN_POOL_FRAMES: usize = 3;

/// Where a descent should end up.
pub(super) enum Descend<'k, K> {
    /// The leftmost leaf.
    Leftmost,
    /// The leaf whose range contains the key.
    Key(&'k K),
}

/// A paged B+ tree index over unique keys.
///
/// `K` is the fixed-width key type and `C` the comparator that orders it.
/// Values are [`RecordId`]s. Lookups and scans take `&self`; mutations take
/// `&mut self`, so a live [`TreeIter`](super::TreeIter) rules out
/// concurrent modification at compile time.
///
/// The current root page id is kept in the header page (page 0) under
/// the index name, so [`BPlusTree::open`] can find the tree again.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use pagetree::{BPlusTree, BPlusTreeConfig, BufferPoolManager, DiskManager, PageId, RecordId};
/// use pagetree::index::OrdComparator;
///
/// let dm = DiskManager::create("orders.db")?;
/// let bpm = Arc::new(BufferPoolManager::new(64, dm));
/// let mut tree = BPlusTree::<i64, _>::new(
///     "orders_pk",
///     Arc::clone(&bpm),
///     OrdComparator,
///     BPlusTreeConfig::for_key::<i64>(),
/// )?;
///
/// tree.insert(&42, RecordId::new(PageId::new(7), 3))?;
/// assert_eq!(tree.get_value(&42)?, Some(RecordId::new(PageId::new(7), 3)));
/// # Ok::<(), pagetree::Error>(())
/// ```
pub struct BPlusTree<K, C> {
    pub(super) index_name: String,
    pub(super) bpm: Arc<BufferPoolManager>,
    pub(super) comparator: C,
    pub(super) leaf_max_size: usize,
    pub(super) internal_max_size: usize,
    pub(super) root_page_id: PageId,
    _key: PhantomData<K>,
}

impl<K: IndexKey, C: KeyComparator<K>> BPlusTree<K, C> {
    /// Create an empty tree named `index_name`.
    ///
    /// Nothing is written until the first insert, which records the root
    /// in the header page (replacing any earlier record under that name).
    /// Formats the header page if the database file is new.
    ///
    /// # Errors
    /// - `Error::InvalidConfig` if `config` does not fit the page layout for
    ///   `K` or the pool is too small
    /// - `Error::IndexNameTooLong` if the name cannot be stored
    pub fn new(
        index_name: &str,
        bpm: Arc<BufferPoolManager>,
        comparator: C,
        config: BPlusTreeConfig,
    ) -> Result<Self> {
        Self::check_setup(index_name, &bpm, &config)?;
        ensure_header_page(&bpm)?;

        Ok(Self {
            index_name: index_name.to_string(),
            bpm,
            comparator,
            leaf_max_size: config.leaf_max_size as usize,
            internal_max_size: config.internal_max_size as usize,
            root_page_id: PageId::INVALID,
            _key: PhantomData,
        })
    }

    /// Open the tree recorded under `index_name` in the header page.
    ///
    /// A name with no record opens as an empty tree.
    ///
    /// # Errors
    /// Same as [`new`](Self::new), plus `Error::InvalidPageType` if the
    /// recorded root is not a tree page.
    pub fn open(
        index_name: &str,
        bpm: Arc<BufferPoolManager>,
        comparator: C,
        config: BPlusTreeConfig,
    ) -> Result<Self> {
        let mut tree = Self::new(index_name, bpm, comparator, config)?;

        let root = {
            let guard = tree.bpm.fetch_page_read(HEADER_PAGE_ID)?;
            HeaderPage::new(guard.as_slice()).get_root_id(index_name)
        };

        if let Some(root) = root.filter(PageId::is_valid) {
            let guard = tree.bpm.fetch_page_read(root)?;
            TreePageHeader::try_new(guard.as_slice())?;
            tree.root_page_id = root;
        }

        debug!(index = index_name, root = tree.root_page_id.0, "btree.open");
        Ok(tree)
    }

    fn check_setup(index_name: &str, bpm: &BufferPoolManager, config: &BPlusTreeConfig) -> Result<()> {
        config.validate::<K>()?;
        if bpm.pool_size() < MIN_POOL_FRAMES {
            return Err(Error::InvalidConfig(format!(
                "buffer pool needs at least {} frames, got {}",
                MIN_POOL_FRAMES,
                bpm.pool_size()
            )));
        }
        if index_name.len() > MAX_INDEX_NAME_LEN || index_name.contains('\0') {
            return Err(Error::IndexNameTooLong(index_name.to_string()));
        }
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Whether the tree holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.root_page_id.is_valid()
    }

    /// Current root page, or `PageId::INVALID` for an empty tree.
    #[inline]
    pub fn root_page_id(&self) -> PageId {
        self.root_page_id
    }

    #[inline]
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// The buffer pool this tree lives in.
    #[inline]
    pub fn buffer_pool(&self) -> &Arc<BufferPoolManager> {
        &self.bpm
    }

    #[inline]
    pub fn config(&self) -> BPlusTreeConfig {
        BPlusTreeConfig::new(self.leaf_max_size as u32, self.internal_max_size as u32)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Descend from the root and hand back the target leaf, still pinned.
    ///
    /// Every page on the way is fetched with the guard kind `G`, and each
    /// is released before its child is fetched, so the walk holds one pin
    /// at a time. Internal pages are only read, which leaves them clean
    /// even under a write guard. The caller must check for an empty tree
    /// first.
    pub(super) fn find_leaf<'a, G: PageGuard<'a>>(
        &self,
        bpm: &'a BufferPoolManager,
        target: Descend<'_, K>,
    ) -> Result<G> {
        let mut guard = G::fetch(bpm, self.root_page_id)?;
        loop {
            if TreePageHeader::try_new(guard.as_slice())?.is_leaf() {
                return Ok(guard);
            }

            let child = {
                let node = InternalPage::<K, _>::new(guard.as_slice());
                match &target {
                    Descend::Leftmost => node.value_at(0),
                    Descend::Key(key) => node.lookup(key, &self.comparator),
                }
            };
            trace!(page_id = guard.page_id().0, child = child.0, "btree.descend");
            drop(guard);
            guard = G::fetch(bpm, child)?;
        }
    }

    /// Value stored under `key`.
    ///
    /// # Errors
    /// Only storage errors; a missing key is `Ok(None)`.
    pub fn get_value(&self, key: &K) -> Result<Option<RecordId>> {
        if self.is_empty() {
            return Ok(None);
        }

        let guard: PageReadGuard<'_> = self.find_leaf(&self.bpm, Descend::Key(key))?;
        let leaf = LeafPage::<K, _>::try_new(guard.as_slice())?;
        Ok(leaf.lookup(key, &self.comparator))
    }

    // ========================================================================
    // Insert
    // ========================================================================

    /// Insert `key -> value`.
    ///
    /// Returns `Ok(false)` without changing anything if `key` is present.
    ///
    /// # Errors
    /// `Error::OutOfMemory` if the buffer pool cannot supply the pages a
    /// split needs. The tree is unchanged in that case.
    pub fn insert(&mut self, key: &K, value: RecordId) -> Result<bool> {
        if self.is_empty() {
            self.start_new_tree(key, value)?;
            return Ok(true);
        }
        self.insert_into_leaf(key, value)
    }

    fn start_new_tree(&mut self, key: &K, value: RecordId) -> Result<()> {
        let bpm = Arc::clone(&self.bpm);

        let root_id = {
            let mut guard = bpm.new_page().map_err(out_of_memory)?;
            let root_id = guard.page_id();
            let mut leaf = LeafPage::<K, _>::init(
                guard.as_mut_slice(),
                root_id,
                PageId::INVALID,
                self.leaf_max_size,
            );
            leaf.insert(key, value, &self.comparator);
            root_id
        };

        self.root_page_id = root_id;
        if let Err(e) = self.update_root_page_id(true) {
            self.root_page_id = PageId::INVALID;
            release_pages(&bpm, &[root_id]);
            return Err(e);
        }

        debug!(index = %self.index_name, root = root_id.0, "btree.start_new_tree");
        Ok(())
    }

    /// Insert through the write-pinned leaf the descent returns. The leaf
    /// stays pinned while split pages are reserved, so a failed
    /// reservation leaves it untouched.
    fn insert_into_leaf(&mut self, key: &K, value: RecordId) -> Result<bool> {
        let bpm = Arc::clone(&self.bpm);
        let mut guard: PageWriteGuard<'_> = self.find_leaf(&bpm, Descend::Key(key))?;
        let leaf_id = guard.page_id();

        let (parent_id, overflows) = {
            let leaf = LeafPage::<K, _>::try_new(guard.as_slice())?;
            if leaf.lookup(key, &self.comparator).is_some() {
                return Ok(false);
            }
            (leaf.parent_page_id(), leaf.size() >= leaf.max_size())
        };

        if !overflows {
            LeafPage::<K, _>::new(guard.as_mut_slice()).insert(key, value, &self.comparator);
            return Ok(true);
        }

        let needed = self.pages_needed_for_split(parent_id)?;
        let mut reserved = reserve_pages(&bpm, needed)?;

        let (separator, sibling_id) = {
            let sibling_id = take_reserved(&mut reserved)?;
            let mut sibling_guard = bpm.fetch_page_write(sibling_id)?;

            let mut leaf = LeafPage::<K, _>::new(guard.as_mut_slice());
            leaf.insert(key, value, &self.comparator);
            let mut sibling = LeafPage::<K, _>::init(
                sibling_guard.as_mut_slice(),
                sibling_id,
                parent_id,
                self.leaf_max_size,
            );
            leaf.move_half_to(&mut sibling);

            debug!(
                page_id = leaf_id.0,
                sibling = sibling_id.0,
                left = leaf.size(),
                right = sibling.size(),
                "btree.split_leaf"
            );
            (sibling.key_at(0), sibling_id)
        };
        drop(guard);

        self.insert_into_parent(leaf_id, separator, sibling_id, parent_id, &mut reserved)?;

        if !reserved.is_empty() {
            release_pages(&bpm, &reserved);
            return Err(Error::invariant(format!(
                "{} reserved pages left after split",
                reserved.len()
            )));
        }
        Ok(true)
    }

    /// Pages a split starting at a leaf under `parent_id` will allocate:
    /// one sibling per full level plus a new root if every ancestor is full.
    fn pages_needed_for_split(&self, mut parent_id: PageId) -> Result<usize> {
        let mut needed = 1;
        while parent_id.is_valid() {
            let guard = self.bpm.fetch_page_read(parent_id)?;
            let parent = TreePageHeader::try_new(guard.as_slice())?;
            if parent.size() < parent.max_size() {
                return Ok(needed);
            }
            needed += 1;
            parent_id = parent.parent_page_id();
        }
        Ok(needed + 1)
    }

    /// Hook `new_id` into the tree to the right of `old_id`, splitting
    /// ancestors as needed.
    fn insert_into_parent(
        &mut self,
        mut old_id: PageId,
        mut key: K,
        mut new_id: PageId,
        mut parent_id: PageId,
        reserved: &mut Vec<PageId>,
    ) -> Result<()> {
        let bpm = Arc::clone(&self.bpm);

        loop {
            if !parent_id.is_valid() {
                let root_id = take_reserved(reserved)?;
                {
                    let mut guard = bpm.fetch_page_write(root_id)?;
                    let mut root = InternalPage::<K, _>::init(
                        guard.as_mut_slice(),
                        root_id,
                        PageId::INVALID,
                        self.internal_max_size,
                    );
                    root.populate_new_root(old_id, &key, new_id);
                }
                self.set_parent(old_id, root_id)?;
                self.set_parent(new_id, root_id)?;

                self.root_page_id = root_id;
                self.update_root_page_id(false)?;
                debug!(root = root_id.0, left = old_id.0, right = new_id.0, "btree.new_root");
                return Ok(());
            }

            let mut parent_guard = bpm.fetch_page_write(parent_id)?;
            let mut parent = InternalPage::<K, _>::try_new(parent_guard.as_mut_slice())?;
            let size = parent.insert_node_after(old_id, &key, new_id).ok_or_else(|| {
                Error::invariant(format!("page {} is not a child of {}", old_id, parent_id))
            })?;
            if size <= parent.max_size() {
                return Ok(());
            }

            let grandparent_id = parent.parent_page_id();
            let sibling_id = take_reserved(reserved)?;
            let (moved, promoted) = {
                let mut sibling_guard = bpm.fetch_page_write(sibling_id)?;
                let mut sibling = InternalPage::<K, _>::init(
                    sibling_guard.as_mut_slice(),
                    sibling_id,
                    grandparent_id,
                    self.internal_max_size,
                );
                let moved = parent.move_half_to(&mut sibling);
                (moved, sibling.key_at(0))
            };
            debug!(
                page_id = parent_id.0,
                sibling = sibling_id.0,
                moved = moved.len(),
                "btree.split_internal"
            );
            drop(parent_guard);

            for child in moved {
                self.set_parent(child, sibling_id)?;
            }

            old_id = parent_id;
            key = promoted;
            new_id = sibling_id;
            parent_id = grandparent_id;
        }
    }

    // ========================================================================
    // Remove
    // ========================================================================

    /// Remove `key`. Removing an absent key is a no-op.
    pub fn remove(&mut self, key: &K) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        let bpm = Arc::clone(&self.bpm);
        let (leaf_id, is_root, size, underflow) = {
            let mut guard: PageWriteGuard<'_> = self.find_leaf(&bpm, Descend::Key(key))?;
            if LeafPage::<K, _>::try_new(guard.as_slice())?
                .lookup(key, &self.comparator)
                .is_none()
            {
                return Ok(());
            }
            let leaf_id = guard.page_id();
            let mut leaf = LeafPage::<K, _>::new(guard.as_mut_slice());
            leaf.remove(key, &self.comparator);
            (leaf_id, leaf.is_root(), leaf.size(), leaf.size() < leaf.min_size())
        };

        if is_root {
            if size == 0 {
                self.adjust_root()?;
            }
        } else if underflow {
            let merged = self.coalesce_or_redistribute(leaf_id)?;
            debug_assert!(!merged || !bpm.contains_page(leaf_id), "merged leaf still resident");
            trace!(page_id = leaf_id.0, merged, "btree.remove.rebalanced");
        }
        Ok(())
    }

    /// Restore the size bound of `node_id` and of every ancestor a merge
    /// leaves short.
    ///
    /// Returns `true` if `node_id` itself was merged away.
    fn coalesce_or_redistribute(&mut self, node_id: PageId) -> Result<bool> {
        let bpm = Arc::clone(&self.bpm);
        let mut current = node_id;
        let mut input_deleted = false;

        loop {
            let (parent_id, size, min_size) = {
                let guard = bpm.fetch_page_read(current)?;
                let node = TreePageHeader::try_new(guard.as_slice())?;
                (node.parent_page_id(), node.size(), node.min_size())
            };

            if !parent_id.is_valid() {
                self.adjust_root()?;
                return Ok(input_deleted);
            }
            if size >= min_size {
                return Ok(input_deleted);
            }

            let (index, left_id, right_id) = {
                let guard = bpm.fetch_page_read(parent_id)?;
                let parent = InternalPage::<K, _>::try_new(guard.as_slice())?;
                let index = parent.value_index(current).ok_or_else(|| {
                    Error::invariant(format!("page {} is not a child of {}", current, parent_id))
                })?;
                let left = (index > 0).then(|| parent.value_at(index - 1));
                let right = (index + 1 < parent.size()).then(|| parent.value_at(index + 1));
                (index, left, right)
            };

            if let Some(left_id) = left_id {
                if self.can_lend(left_id)? {
                    self.redistribute(left_id, current, parent_id, index)?;
                    return Ok(input_deleted);
                }
            }
            if let Some(right_id) = right_id {
                if self.can_lend(right_id)? {
                    self.redistribute(right_id, current, parent_id, index + 1)?;
                    return Ok(input_deleted);
                }
            }

            match (left_id, right_id) {
                (Some(left_id), _) => {
                    self.coalesce(left_id, current, parent_id, index)?;
                    if current == node_id {
                        input_deleted = true;
                    }
                }
                (None, Some(right_id)) => {
                    self.coalesce(current, right_id, parent_id, index + 1)?;
                }
                (None, None) => {
                    return Err(Error::invariant(format!(
                        "non-root page {} has no siblings",
                        current
                    )));
                }
            }

            current = parent_id;
        }
    }

    fn can_lend(&self, page_id: PageId) -> Result<bool> {
        let guard = self.bpm.fetch_page_read(page_id)?;
        let node = TreePageHeader::try_new(guard.as_slice())?;
        Ok(node.size() > node.min_size())
    }

    /// Move one entry from `donor_id` to its neighbour `receiver_id`.
    ///
    /// `separator_index` is the parent slot of whichever of the two is on
    /// the right; that slot's key is updated.
    fn redistribute(
        &self,
        donor_id: PageId,
        receiver_id: PageId,
        parent_id: PageId,
        separator_index: usize,
    ) -> Result<()> {
        let mut parent_guard = self.bpm.fetch_page_write(parent_id)?;
        let mut donor_guard = self.bpm.fetch_page_write(donor_id)?;
        let mut receiver_guard = self.bpm.fetch_page_write(receiver_id)?;

        let mut parent = InternalPage::<K, _>::try_new(parent_guard.as_mut_slice())?;
        let donor_is_right = parent.value_at(separator_index) == donor_id;
        let is_leaf = TreePageHeader::try_new(donor_guard.as_slice())?.is_leaf();

        let moved_child = if is_leaf {
            let mut donor = LeafPage::<K, _>::new(donor_guard.as_mut_slice());
            let mut receiver = LeafPage::<K, _>::new(receiver_guard.as_mut_slice());
            if donor_is_right {
                donor.move_first_to_end_of(&mut receiver);
                parent.set_key_at(separator_index, &donor.key_at(0));
            } else {
                donor.move_last_to_front_of(&mut receiver);
                parent.set_key_at(separator_index, &receiver.key_at(0));
            }
            None
        } else {
            let middle_key = parent.key_at(separator_index);
            let mut donor = InternalPage::<K, _>::new(donor_guard.as_mut_slice());
            let mut receiver = InternalPage::<K, _>::new(receiver_guard.as_mut_slice());
            let moved = if donor_is_right {
                let moved = donor.move_first_to_end_of(&mut receiver, &middle_key);
                parent.set_key_at(separator_index, &donor.key_at(0));
                moved
            } else {
                let moved = donor.move_last_to_front_of(&mut receiver, &middle_key);
                parent.set_key_at(separator_index, &receiver.key_at(0));
                moved
            };
            Some(moved)
        };

        debug!(
            donor = donor_id.0,
            receiver = receiver_id.0,
            leaf = is_leaf,
            "btree.redistribute"
        );

        drop(receiver_guard);
        drop(donor_guard);
        drop(parent_guard);

        if let Some(child) = moved_child {
            self.set_parent(child, receiver_id)?;
        }
        Ok(())
    }

    /// Merge `right_id` into its left neighbour `left_id`, drop its parent
    /// entry at `right_index` and delete the emptied page.
    fn coalesce(&self, left_id: PageId, right_id: PageId, parent_id: PageId, right_index: usize) -> Result<()> {
        let moved = {
            let mut parent_guard = self.bpm.fetch_page_write(parent_id)?;
            let mut left_guard = self.bpm.fetch_page_write(left_id)?;
            let mut right_guard = self.bpm.fetch_page_write(right_id)?;

            let mut parent = InternalPage::<K, _>::try_new(parent_guard.as_mut_slice())?;
            let moved = if TreePageHeader::try_new(right_guard.as_slice())?.is_leaf() {
                let mut right = LeafPage::<K, _>::new(right_guard.as_mut_slice());
                right.move_all_to(&mut LeafPage::<K, _>::new(left_guard.as_mut_slice()));
                Vec::new()
            } else {
                let middle_key = parent.key_at(right_index);
                let mut right = InternalPage::<K, _>::new(right_guard.as_mut_slice());
                right.move_all_to(&mut InternalPage::<K, _>::new(left_guard.as_mut_slice()), &middle_key)
            };
            parent.remove(right_index);
            moved
        };

        for child in moved {
            self.set_parent(child, left_id)?;
        }
        self.bpm.delete_page(right_id)?;

        debug!(left = left_id.0, deleted = right_id.0, "btree.coalesce");
        Ok(())
    }

    /// Shrink the tree at the root: promote a lone child, or empty the tree
    /// when the root leaf has no entries left.
    fn adjust_root(&mut self) -> Result<()> {
        let old_root = self.root_page_id;

        let new_root = {
            let mut guard = self.bpm.fetch_page_write(old_root)?;
            let (is_leaf, size) = {
                let node = TreePageHeader::try_new(guard.as_slice())?;
                (node.is_leaf(), node.size())
            };
            match (is_leaf, size) {
                (true, 0) => PageId::INVALID,
                (false, 1) => InternalPage::<K, _>::new(guard.as_mut_slice()).remove_and_return_only_child(),
                _ => return Ok(()),
            }
        };

        if new_root.is_valid() {
            self.set_parent(new_root, PageId::INVALID)?;
        }
        self.root_page_id = new_root;
        self.update_root_page_id(false)?;
        self.bpm.delete_page(old_root)?;

        debug!(old_root = old_root.0, new_root = new_root.0, "btree.adjust_root");
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn set_parent(&self, child: PageId, parent: PageId) -> Result<()> {
        let mut guard = self.bpm.fetch_page_write(child)?;
        TreePageHeader::try_new(guard.as_mut_slice())?.set_parent_page_id(parent);
        Ok(())
    }

    /// Persist the current root id in the header page.
    ///
    /// `insert_record` says whether a new record is expected; either way
    /// the record ends up pointing at the current root.
    fn update_root_page_id(&self, insert_record: bool) -> Result<()> {
        let mut guard = self.bpm.fetch_page_write(HEADER_PAGE_ID)?;
        let mut header = HeaderPage::new(guard.as_mut_slice());
        let name = self.index_name.as_str();

        if insert_record {
            if !header.insert_record(name, self.root_page_id)? {
                header.update_record(name, self.root_page_id);
            }
        } else if !header.update_record(name, self.root_page_id) {
            header.insert_record(name, self.root_page_id)?;
        }
        trace!(index = name, root = self.root_page_id.0, "btree.update_root");
        Ok(())
    }
}

/// Make sure page 0 is a formatted header page.
fn ensure_header_page(bpm: &BufferPoolManager) -> Result<()> {
    if bpm.disk_page_count() == 0 {
        let mut guard = bpm.new_page()?;
        if guard.page_id() != HEADER_PAGE_ID {
            return Err(Error::invariant(format!(
                "header page allocated as {}",
                guard.page_id()
            )));
        }
        HeaderPage::init(guard.as_mut_slice());
        debug!("btree.header_page.init");
        return Ok(());
    }

    let mut guard = bpm.fetch_page_write(HEADER_PAGE_ID)?;
    if !HeaderPage::new(guard.as_slice()).is_initialized() {
        HeaderPage::init(guard.as_mut_slice());
        debug!("btree.header_page.init");
    }
    Ok(())
}

fn out_of_memory(err: Error) -> Error {
    match err {
        Error::NoFreeFrames => Error::OutOfMemory,
        other => other,
    }
}

/// Allocate `count` pages up front, or none at all.
fn reserve_pages(bpm: &BufferPoolManager, count: usize) -> Result<Vec<PageId>> {
    let mut reserved = Vec::with_capacity(count);
    for _ in 0..count {
        match bpm.new_page() {
            Ok(guard) => reserved.push(guard.page_id()),
            Err(e) => {
                warn!(needed = count, got = reserved.len(), error = %e, "btree.reserve_pages.failed");
                release_pages(bpm, &reserved);
                return Err(out_of_memory(e));
            }
        }
    }
    Ok(reserved)
}

fn take_reserved(reserved: &mut Vec<PageId>) -> Result<PageId> {
    reserved
        .pop()
        .ok_or_else(|| Error::invariant("split needs more pages than were reserved"))
}

fn release_pages(bpm: &BufferPoolManager, pages: &[PageId]) {
    for &page_id in pages {
        if let Err(e) = bpm.delete_page(page_id) {
            warn!(page_id = page_id.0, error = %e, "btree.release_page.failed");
        }
    }
}
