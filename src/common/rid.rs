//! Record identifier type.

use std::fmt;

use super::PageId;

/// Locates a row in a table heap: the page it lives on and its slot.
///
/// This is the value type stored in B+ tree leaves. The index never
/// compares or interprets it.
///
/// # Example
/// ```
/// use pagetree::{PageId, RecordId};
///
/// let rid = RecordId::new(PageId::new(3), 7);
/// assert_eq!(rid.page_id(), PageId::new(3));
/// assert_eq!(rid.slot(), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    page_id: PageId,
    slot: u32,
}

impl RecordId {
    /// Encoded width inside a leaf page.
    pub const SIZE: usize = 8;

    /// Create a new RecordId.
    #[inline]
    pub fn new(page_id: PageId, slot: u32) -> Self {
        Self { page_id, slot }
    }

    /// Build a record id from a 64-bit integer.
    ///
    /// The high 32 bits become the page id, the low 32 bits the slot. Used by
    /// the bulk-load helpers, where the key doubles as its own payload.
    #[inline]
    pub fn from_integer(value: i64) -> Self {
        let bits = value as u64;
        Self {
            page_id: PageId((bits >> 32) as u32),
            slot: bits as u32,
        }
    }

    /// Page holding the record.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Slot within the page.
    #[inline]
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Read a record id from the start of `data`.
    pub fn read_from(data: &[u8]) -> Self {
        Self {
            page_id: PageId::read_from(&data[0..4]),
            slot: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
        }
    }

    /// Write this record id at the start of `data`.
    pub fn write_to(&self, data: &mut [u8]) {
        self.page_id.write_to(&mut data[0..4]);
        data[4..8].copy_from_slice(&self.slot.to_le_bytes());
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.page_id.0, self.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_integer_splits_bits() {
        let rid = RecordId::from_integer(42);
        assert_eq!(rid.page_id(), PageId::new(0));
        assert_eq!(rid.slot(), 42);

        let rid = RecordId::from_integer((5_i64 << 32) | 9);
        assert_eq!(rid.page_id(), PageId::new(5));
        assert_eq!(rid.slot(), 9);
    }

    #[test]
    fn test_byte_layout() {
        let rid = RecordId::new(PageId::new(0x0102_0304), 0x0A0B_0C0D);
        let mut buf = [0u8; RecordId::SIZE];
        rid.write_to(&mut buf);

        assert_eq!(buf, [0x04, 0x03, 0x02, 0x01, 0x0D, 0x0C, 0x0B, 0x0A]);
        assert_eq!(RecordId::read_from(&buf), rid);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", RecordId::new(PageId::new(2), 11)), "2:11");
    }
}
