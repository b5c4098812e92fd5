//! Structural dump and consistency checking.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt::{self, Write as _};

use crate::common::{Error, PageId, Result};
use crate::index::{IndexKey, KeyComparator};
use crate::storage::page::{InternalPage, LeafPage, TreePage, TreePageHeader};

use super::tree::BPlusTree;

/// Shape of a tree as measured by [`BPlusTree::verify`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    /// Levels from root to leaves; 0 for an empty tree.
    pub height: usize,
    pub leaf_count: usize,
    pub internal_count: usize,
    /// Total key/value pairs across all leaves.
    pub entry_count: usize,
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "height={} leaves={} internals={} entries={}",
            self.height, self.leaf_count, self.internal_count, self.entry_count
        )
    }
}

/// Owned copy of one node, so nothing stays pinned while the walk
/// continues below it.
struct NodeSnapshot<K> {
    page_id: PageId,
    parent: PageId,
    is_leaf: bool,
    size: usize,
    max_size: usize,
    min_size: usize,
    /// Leaf keys, or the separators at slots `1..size` of an internal node.
    keys: Vec<K>,
    children: Vec<PageId>,
    next: PageId,
}

fn violation(msg: String) -> Error {
    Error::InvariantViolation(msg)
}

fn fmt_page_id(id: PageId) -> String {
    if id.is_valid() {
        id.0.to_string()
    } else {
        "-".to_string()
    }
}

impl<K: IndexKey, C: KeyComparator<K>> BPlusTree<K, C> {
    fn snapshot(&self, page_id: PageId) -> Result<NodeSnapshot<K>> {
        let guard = self.bpm.fetch_page_read(page_id)?;
        let data = guard.as_slice();
        let header = TreePageHeader::try_new(data)?;

        let mut node = NodeSnapshot {
            page_id: header.page_id(),
            parent: header.parent_page_id(),
            is_leaf: header.is_leaf(),
            size: header.size(),
            max_size: header.max_size(),
            min_size: header.min_size(),
            keys: Vec::new(),
            children: Vec::new(),
            next: PageId::INVALID,
        };

        if node.is_leaf {
            let leaf = LeafPage::<K, _>::new(data);
            node.keys = (0..node.size).map(|i| leaf.key_at(i)).collect();
            node.next = leaf.next_page_id();
        } else {
            let internal = InternalPage::<K, _>::new(data);
            node.keys = (1..node.size).map(|i| internal.key_at(i)).collect();
            node.children = internal.children();
        }
        Ok(node)
    }

    /// Render the tree one level per line, root first.
    ///
    /// Internal nodes print as `[k1,k2]` (their separators) and leaves as
    /// `(k1,k2)`. With `verbose`, each node is prefixed by its page id,
    /// parent id and, for leaves, the next leaf id.
    ///
    /// ```text
    /// [3]
    /// [2] [4,5]
    /// (1) (2) (3) (4) (5,6)
    /// ```
    pub fn to_level_string(&self, verbose: bool) -> Result<String>
    where
        K: fmt::Display,
    {
        if self.is_empty() {
            return Ok("Empty tree".to_string());
        }

        let mut out = String::new();
        let mut level = vec![self.root_page_id];
        while !level.is_empty() {
            let mut next_level = Vec::new();
            let mut line = Vec::with_capacity(level.len());

            for page_id in level {
                let node = self.snapshot(page_id)?;
                let keys = node
                    .keys
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");

                let prefix = match (verbose, node.is_leaf) {
                    (false, _) => String::new(),
                    (true, false) => {
                        format!("{} p:{} | ", page_id.0, fmt_page_id(node.parent))
                    }
                    (true, true) => format!(
                        "{} p:{} n:{} | ",
                        page_id.0,
                        fmt_page_id(node.parent),
                        fmt_page_id(node.next)
                    ),
                };

                if node.is_leaf {
                    line.push(format!("({prefix}{keys})"));
                } else {
                    line.push(format!("[{prefix}{keys}]"));
                    next_level.extend(node.children);
                }
            }

            // Writing to a String cannot fail
            let _ = writeln!(out, "{}", line.join(" "));
            level = next_level;
        }
        Ok(out)
    }

    /// Walk the whole tree and check its structure.
    ///
    /// Checks page tags and self ids, parent pointers, key order within
    /// every node, that each subtree's keys fall inside the range its
    /// parent's separators give it, size bounds, equal leaf depth and the
    /// leaf chain. Pages are released before their children are visited.
    ///
    /// # Errors
    /// `Error::InvariantViolation` naming the first problem found, or a
    /// storage error if a page cannot be read.
    pub fn verify(&self) -> Result<TreeStats> {
        let mut stats = TreeStats::default();
        if self.is_empty() {
            return Ok(stats);
        }

        // (page, expected parent, depth, lower bound, upper bound)
        let mut pending: VecDeque<(PageId, PageId, usize, Option<K>, Option<K>)> = VecDeque::new();
        pending.push_back((self.root_page_id, PageId::INVALID, 1, None, None));
        let mut leaves: Vec<(PageId, PageId)> = Vec::new();
        let mut leaf_depth = None;

        while let Some((page_id, parent, depth, lower, upper)) = pending.pop_front() {
            let node = self.snapshot(page_id)?;

            if node.page_id != page_id {
                return Err(violation(format!(
                    "page {} records its id as {}",
                    page_id, node.page_id
                )));
            }
            if node.parent != parent {
                return Err(violation(format!(
                    "page {} has parent {}, expected {}",
                    page_id, node.parent, parent
                )));
            }
            self.check_size(&node)?;
            self.check_keys(&node, lower.as_ref(), upper.as_ref())?;

            if node.is_leaf {
                match leaf_depth {
                    None => leaf_depth = Some(depth),
                    Some(d) if d != depth => {
                        return Err(violation(format!(
                            "leaf {} at depth {}, other leaves at depth {}",
                            page_id, depth, d
                        )));
                    }
                    Some(_) => {}
                }
                stats.leaf_count += 1;
                stats.entry_count += node.size;
                leaves.push((page_id, node.next));
                continue;
            }

            stats.internal_count += 1;
            for (i, &child) in node.children.iter().enumerate() {
                let child_lower = if i == 0 { lower } else { Some(node.keys[i - 1]) };
                let child_upper = node.keys.get(i).copied().or(upper);
                pending.push_back((child, page_id, depth + 1, child_lower, child_upper));
            }
        }

        // Breadth-first order visits leaves left to right
        for pair in leaves.windows(2) {
            let ((left, next), (right, _)) = (pair[0], pair[1]);
            if next != right {
                return Err(violation(format!(
                    "leaf {} links to {}, expected {}",
                    left, next, right
                )));
            }
        }
        if let Some(&(last, next)) = leaves.last() {
            if next.is_valid() {
                return Err(violation(format!("last leaf {} links to {}", last, next)));
            }
        }

        stats.height = leaf_depth.unwrap_or(0);
        Ok(stats)
    }

    fn check_size(&self, node: &NodeSnapshot<K>) -> Result<()> {
        let expected_max = if node.is_leaf {
            self.leaf_max_size
        } else {
            self.internal_max_size
        };
        if node.max_size != expected_max {
            return Err(violation(format!(
                "page {} has max_size {}, tree uses {}",
                node.page_id, node.max_size, expected_max
            )));
        }

        let min = match (node.parent.is_valid(), node.is_leaf) {
            (true, _) => node.min_size,
            (false, true) => 1,
            (false, false) => 2,
        };
        if node.size < min || node.size > node.max_size {
            return Err(violation(format!(
                "page {} holds {} entries, allowed {}..={}",
                node.page_id, node.size, min, node.max_size
            )));
        }
        Ok(())
    }

    fn check_keys(&self, node: &NodeSnapshot<K>, lower: Option<&K>, upper: Option<&K>) -> Result<()> {
        for pair in node.keys.windows(2) {
            if self.comparator.compare(&pair[0], &pair[1]) != Ordering::Less {
                return Err(violation(format!(
                    "page {} keys out of order: {:?} then {:?}",
                    node.page_id, pair[0], pair[1]
                )));
            }
        }

        let (Some(first), Some(last)) = (node.keys.first(), node.keys.last()) else {
            return Ok(());
        };
        if let Some(lower) = lower {
            if self.comparator.compare(first, lower) == Ordering::Less {
                return Err(violation(format!(
                    "page {} key {:?} is below its lower bound {:?}",
                    node.page_id, first, lower
                )));
            }
        }
        if let Some(upper) = upper {
            if self.comparator.compare(last, upper) != Ordering::Less {
                return Err(violation(format!(
                    "page {} key {:?} is not below its upper bound {:?}",
                    node.page_id, last, upper
                )));
            }
        }
        Ok(())
    }
}
