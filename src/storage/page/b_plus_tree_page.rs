//! Header shared by B+ tree leaf and internal pages.
//!
//! # Layout
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       13    PageHeader (type tag, checksum, LSN)
//! 13      4     size (number of entries)
//! 17      4     max_size
//! 21      4     parent page id
//! 25      4     page id
//! ```
//!
//! Leaf pages append a next-page-id field; see [`LeafPage`](super::LeafPage).

use crate::common::{Error, PageId, Result};

use super::page_header::{PageHeader, PageType};

pub(crate) const OFFSET_SIZE: usize = PageHeader::SIZE;
pub(crate) const OFFSET_MAX_SIZE: usize = OFFSET_SIZE + 4;
pub(crate) const OFFSET_PARENT: usize = OFFSET_MAX_SIZE + 4;
pub(crate) const OFFSET_PAGE_ID: usize = OFFSET_PARENT + 4;

/// Size of the common tree page header.
pub(crate) const TREE_HEADER_SIZE: usize = OFFSET_PAGE_ID + 4;

#[inline]
pub(crate) fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[inline]
pub(crate) fn write_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Read access to the fields every tree node carries.
pub trait TreePage {
    /// The raw page bytes.
    fn data(&self) -> &[u8];

    #[inline]
    fn page_type(&self) -> PageType {
        PageHeader::read_type(self.data())
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.page_type() == PageType::BTreeLeaf
    }

    /// Number of entries. For internal pages this is the child count.
    #[inline]
    fn size(&self) -> usize {
        read_u32(self.data(), OFFSET_SIZE) as usize
    }

    #[inline]
    fn max_size(&self) -> usize {
        read_u32(self.data(), OFFSET_MAX_SIZE) as usize
    }

    /// Fewest entries a non-root node may hold between operations.
    #[inline]
    fn min_size(&self) -> usize {
        self.max_size().div_ceil(2)
    }

    #[inline]
    fn parent_page_id(&self) -> PageId {
        PageId::read_from(&self.data()[OFFSET_PARENT..])
    }

    #[inline]
    fn page_id(&self) -> PageId {
        PageId::read_from(&self.data()[OFFSET_PAGE_ID..])
    }

    #[inline]
    fn is_root(&self) -> bool {
        !self.parent_page_id().is_valid()
    }
}

/// Write access to the common header fields.
pub trait TreePageMut: TreePage {
    fn data_mut(&mut self) -> &mut [u8];

    #[inline]
    fn set_size(&mut self, size: usize) {
        write_u32(self.data_mut(), OFFSET_SIZE, size as u32);
    }

    #[inline]
    fn set_max_size(&mut self, max_size: usize) {
        write_u32(self.data_mut(), OFFSET_MAX_SIZE, max_size as u32);
    }

    #[inline]
    fn set_parent_page_id(&mut self, parent: PageId) {
        parent.write_to(&mut self.data_mut()[OFFSET_PARENT..]);
    }

    #[inline]
    fn set_page_id(&mut self, page_id: PageId) {
        page_id.write_to(&mut self.data_mut()[OFFSET_PAGE_ID..]);
    }
}

/// Stamp a fresh tree header. The checksum and LSN start at zero.
pub(crate) fn init_tree_header(
    data: &mut [u8],
    page_type: PageType,
    page_id: PageId,
    parent: PageId,
    max_size: usize,
) {
    PageHeader::new(page_type).write_to(data);
    write_u32(data, OFFSET_SIZE, 0);
    write_u32(data, OFFSET_MAX_SIZE, max_size as u32);
    parent.write_to(&mut data[OFFSET_PARENT..]);
    page_id.write_to(&mut data[OFFSET_PAGE_ID..]);
}

/// Kind-agnostic view of a tree node.
///
/// Used where only the header matters: re-parenting a child, or checking
/// the tag before choosing a [`LeafPage`](super::LeafPage) or
/// [`InternalPage`](super::InternalPage) view.
pub struct TreePageHeader<B> {
    data: B,
}

impl<B: AsRef<[u8]>> TreePageHeader<B> {
    /// Wrap page bytes without checking the tag.
    #[inline]
    pub fn new(data: B) -> Self {
        Self { data }
    }

    /// Wrap page bytes, rejecting pages that are not tree nodes.
    ///
    /// # Errors
    /// Returns `Error::InvalidPageType` for any other page type.
    pub fn try_new(data: B) -> Result<Self> {
        let view = Self { data };
        if !view.page_type().is_tree_node() {
            return Err(Error::InvalidPageType {
                page_id: view.page_id().0,
                found: view.page_type(),
            });
        }
        Ok(view)
    }
}

impl<B: AsRef<[u8]>> TreePage for TreePageHeader<B> {
    #[inline]
    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> TreePageMut for TreePageHeader<B> {
    #[inline]
    fn data_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }
}
