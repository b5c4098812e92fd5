//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - The raw 4KB data container
//! - [`PageHeader`] - Metadata at the start of every page
//! - [`PageType`] - Discriminator for different page formats
//! - [`HeaderPage`] - The root directory stored in page 0
//! - [`TreePage`] / [`LeafPage`] / [`InternalPage`] - B+ tree node views
//!
//! The typed views borrow a page's bytes (`&[u8]` for reads, `&mut [u8]` for
//! writes) and never own them, so a view cannot outlive the guard that pins
//! the page.

mod b_plus_tree_internal_page;
mod b_plus_tree_leaf_page;
mod b_plus_tree_page;
mod header_page;
#[allow(clippy::module_inception)]
mod page;
mod page_header;

pub use b_plus_tree_internal_page::InternalPage;
pub use b_plus_tree_leaf_page::LeafPage;
pub use b_plus_tree_page::{TreePage, TreePageHeader, TreePageMut};
pub use header_page::{HeaderPage, MAX_INDEX_NAME_LEN};
pub use page::Page;
pub use page_header::{PageHeader, PageType};
