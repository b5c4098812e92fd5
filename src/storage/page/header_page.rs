//! Header page: the database's root directory.
//!
//! Page 0 of every database file maps index names to the page id of each
//! index's current root, so a tree can be found again after a restart.
//!
//! # Layout
//! ```text
//! Offset  Size   Field
//! ------  ----   -----
//! 0       13     PageHeader (type = Header)
//! 13      4      record count
//! 17      36*n   records: name (32 bytes, zero padded) + root page id (4)
//! ```

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};

use super::b_plus_tree_page::{read_u32, write_u32};
use super::page_header::{PageHeader, PageType};

const OFFSET_COUNT: usize = PageHeader::SIZE;
const OFFSET_RECORDS: usize = OFFSET_COUNT + 4;

/// Longest index name a record can hold, in bytes.
pub const MAX_INDEX_NAME_LEN: usize = 32;
const RECORD_SIZE: usize = MAX_INDEX_NAME_LEN + PageId::SIZE;

/// View over the root directory page.
pub struct HeaderPage<B> {
    data: B,
}

impl<B: AsRef<[u8]>> HeaderPage<B> {
    /// Number of records that fit in one page.
    pub const MAX_RECORDS: usize = (PAGE_SIZE - OFFSET_RECORDS) / RECORD_SIZE;

    #[inline]
    pub fn new(data: B) -> Self {
        Self { data }
    }

    #[inline]
    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Whether the page has been formatted as a header page.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        PageHeader::read_type(self.data()) == PageType::Header
    }

    #[inline]
    pub fn record_count(&self) -> usize {
        read_u32(self.data(), OFFSET_COUNT) as usize
    }

    fn name_at(&self, index: usize) -> &[u8] {
        let start = OFFSET_RECORDS + index * RECORD_SIZE;
        let raw = &self.data()[start..start + MAX_INDEX_NAME_LEN];
        let len = raw.iter().position(|&b| b == 0).unwrap_or(MAX_INDEX_NAME_LEN);
        &raw[..len]
    }

    fn root_at(&self, index: usize) -> PageId {
        PageId::read_from(&self.data()[OFFSET_RECORDS + index * RECORD_SIZE + MAX_INDEX_NAME_LEN..])
    }

    fn find(&self, name: &str) -> Option<usize> {
        (0..self.record_count()).find(|&i| self.name_at(i) == name.as_bytes())
    }

    /// Root page id recorded for `name`.
    pub fn get_root_id(&self, name: &str) -> Option<PageId> {
        self.find(name).map(|i| self.root_at(i))
    }

    /// All `(name, root)` records, in insertion order.
    pub fn records(&self) -> Vec<(String, PageId)> {
        (0..self.record_count())
            .map(|i| {
                (
                    String::from_utf8_lossy(self.name_at(i)).into_owned(),
                    self.root_at(i),
                )
            })
            .collect()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> HeaderPage<B> {
    /// Format `data` as an empty header page.
    pub fn init(data: B) -> Self {
        let mut page = Self::new(data);
        PageHeader::new(PageType::Header).write_to(page.data.as_mut());
        page.set_record_count(0);
        page
    }

    fn set_record_count(&mut self, count: usize) {
        write_u32(self.data.as_mut(), OFFSET_COUNT, count as u32);
    }

    fn write_record(&mut self, index: usize, name: &str, root: PageId) {
        let start = OFFSET_RECORDS + index * RECORD_SIZE;
        let data = self.data.as_mut();
        let slot = &mut data[start..start + MAX_INDEX_NAME_LEN];
        slot.fill(0);
        slot[..name.len()].copy_from_slice(name.as_bytes());
        root.write_to(&mut data[start + MAX_INDEX_NAME_LEN..]);
    }

    /// Add a record. Returns `Ok(false)` if `name` already has one.
    ///
    /// # Errors
    /// - `Error::IndexNameTooLong` if `name` exceeds [`MAX_INDEX_NAME_LEN`] bytes
    ///   or contains a NUL byte
    /// - `Error::HeaderPageFull` if no record slot is left
    pub fn insert_record(&mut self, name: &str, root: PageId) -> Result<bool> {
        if name.len() > MAX_INDEX_NAME_LEN || name.as_bytes().contains(&0) {
            return Err(Error::IndexNameTooLong(name.to_string()));
        }
        if self.find(name).is_some() {
            return Ok(false);
        }
        let count = self.record_count();
        if count >= Self::MAX_RECORDS {
            return Err(Error::HeaderPageFull);
        }
        self.write_record(count, name, root);
        self.set_record_count(count + 1);
        Ok(true)
    }

    /// Point an existing record at a new root. Returns `false` if `name`
    /// has no record.
    pub fn update_record(&mut self, name: &str, root: PageId) -> bool {
        match self.find(name) {
            Some(index) => {
                self.write_record(index, name, root);
                true
            }
            None => false,
        }
    }

    /// Remove a record, moving the last record into its slot.
    pub fn delete_record(&mut self, name: &str) -> bool {
        let Some(index) = self.find(name) else {
            return false;
        };
        let last = self.record_count() - 1;
        if index != last {
            let src = OFFSET_RECORDS + last * RECORD_SIZE;
            let dst = OFFSET_RECORDS + index * RECORD_SIZE;
            self.data.as_mut().copy_within(src..src + RECORD_SIZE, dst);
        }
        self.set_record_count(last);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut header = HeaderPage::init(buf.as_mut_slice());

        assert!(header.is_initialized());
        assert!(header.insert_record("orders_pk", PageId::new(3)).unwrap());
        assert!(header.insert_record("users_email", PageId::new(8)).unwrap());
        assert!(!header.insert_record("orders_pk", PageId::new(4)).unwrap());

        assert_eq!(header.record_count(), 2);
        assert_eq!(header.get_root_id("orders_pk"), Some(PageId::new(3)));
        assert_eq!(header.get_root_id("users_email"), Some(PageId::new(8)));
        assert_eq!(header.get_root_id("orders"), None);
    }

    #[test]
    fn test_update_and_delete() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut header = HeaderPage::init(buf.as_mut_slice());
        header.insert_record("a", PageId::new(1)).unwrap();
        header.insert_record("b", PageId::new(2)).unwrap();
        header.insert_record("c", PageId::new(3)).unwrap();

        assert!(header.update_record("b", PageId::INVALID));
        assert!(!header.update_record("zzz", PageId::new(9)));
        assert_eq!(header.get_root_id("b"), Some(PageId::INVALID));

        assert!(header.delete_record("a"));
        assert!(!header.delete_record("a"));
        assert_eq!(
            header.records(),
            vec![
                ("c".to_string(), PageId::new(3)),
                ("b".to_string(), PageId::INVALID)
            ]
        );
    }

    #[test]
    fn test_name_limits() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut header = HeaderPage::init(buf.as_mut_slice());

        let longest = "x".repeat(MAX_INDEX_NAME_LEN);
        assert!(header.insert_record(&longest, PageId::new(1)).unwrap());
        assert_eq!(header.get_root_id(&longest), Some(PageId::new(1)));

        let too_long = "x".repeat(MAX_INDEX_NAME_LEN + 1);
        assert!(matches!(
            header.insert_record(&too_long, PageId::new(2)),
            Err(Error::IndexNameTooLong(_))
        ));
    }

    #[test]
    fn test_full_page() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut header = HeaderPage::init(buf.as_mut_slice());
        let max = HeaderPage::<&[u8]>::MAX_RECORDS;

        for i in 0..max {
            assert!(header.insert_record(&format!("idx{i}"), PageId::new(i as u32)).unwrap());
        }
        assert!(matches!(
            header.insert_record("one_more", PageId::new(0)),
            Err(Error::HeaderPageFull)
        ));
    }
}
