//! Fixed-width index keys and comparators.
//!
//! A B+ tree page stores keys as raw bytes of a fixed width. [`IndexKey`]
//! describes that encoding; [`KeyComparator`] supplies the ordering, which
//! is injected rather than taken from `Ord` so the same key bytes can be
//! ordered differently per index.

use std::cmp::Ordering;
use std::fmt;

/// A fixed-width key that can be stored in a B+ tree page.
pub trait IndexKey: Copy + fmt::Debug {
    /// Number of bytes the key occupies in a page slot.
    const ENCODED_LEN: usize;

    /// Write the key into `buf[..ENCODED_LEN]`.
    fn encode_into(&self, buf: &mut [u8]);

    /// Read a key from `buf[..ENCODED_LEN]`.
    fn decode_from(buf: &[u8]) -> Self;
}

/// Keys that can be built from an integer, used by the bulk-load helpers.
pub trait IntegerKey: IndexKey {
    fn from_integer(value: i64) -> Self;
}

/// Total order over keys of type `K`.
///
/// Key equality inside the tree is `compare(..) == Ordering::Equal`.
/// Closures of the right shape are comparators too:
/// ```
/// use std::cmp::Ordering;
/// use pagetree::index::KeyComparator;
///
/// let reverse = |a: &i64, b: &i64| b.cmp(a);
/// assert_eq!(reverse.compare(&1, &2), Ordering::Greater);
/// ```
pub trait KeyComparator<K> {
    fn compare(&self, lhs: &K, rhs: &K) -> Ordering;
}

impl<K, F> KeyComparator<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, lhs: &K, rhs: &K) -> Ordering {
        self(lhs, rhs)
    }
}

/// Comparator that defers to the key's `Ord` implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrdComparator;

impl<K: Ord> KeyComparator<K> for OrdComparator {
    #[inline]
    fn compare(&self, lhs: &K, rhs: &K) -> Ordering {
        lhs.cmp(rhs)
    }
}

/// An `N`-byte opaque key.
///
/// Integers are stored big-endian with the sign bit flipped, so byte-wise
/// comparison matches integer order. Keys of 8 bytes or more hold the full
/// `i64`; 4-byte keys hold it truncated to `i32`.
///
/// # Example
/// ```
/// use pagetree::index::{GenericKey, IntegerKey};
///
/// let a = GenericKey::<8>::from_integer(-5);
/// let b = GenericKey::<8>::from_integer(3);
/// assert!(a < b);
/// assert_eq!(a.to_integer(), -5);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenericKey<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> GenericKey<N> {
    /// A key of all zero bytes.
    pub fn zeroed() -> Self {
        Self { data: [0u8; N] }
    }

    /// Wrap raw key bytes.
    pub fn from_bytes(data: [u8; N]) -> Self {
        Self { data }
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.data
    }

    /// Decode the integer written by [`IntegerKey::from_integer`].
    pub fn to_integer(&self) -> i64 {
        if N >= 8 {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&self.data[..8]);
            (u64::from_be_bytes(raw) ^ (1 << 63)) as i64
        } else {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&self.data[..4]);
            i64::from((u32::from_be_bytes(raw) ^ (1 << 31)) as i32)
        }
    }
}

impl<const N: usize> IntegerKey for GenericKey<N> {
    fn from_integer(value: i64) -> Self {
        assert!(N >= 4, "GenericKey<{}> is too narrow for integers", N);
        let mut key = Self::zeroed();
        if N >= 8 {
            let encoded = (value as u64) ^ (1 << 63);
            key.data[..8].copy_from_slice(&encoded.to_be_bytes());
        } else {
            let encoded = (value as i32 as u32) ^ (1 << 31);
            key.data[..4].copy_from_slice(&encoded.to_be_bytes());
        }
        key
    }
}

impl<const N: usize> IndexKey for GenericKey<N> {
    const ENCODED_LEN: usize = N;

    #[inline]
    fn encode_into(&self, buf: &mut [u8]) {
        buf[..N].copy_from_slice(&self.data);
    }

    #[inline]
    fn decode_from(buf: &[u8]) -> Self {
        let mut data = [0u8; N];
        data.copy_from_slice(&buf[..N]);
        Self { data }
    }
}

impl<const N: usize> fmt::Debug for GenericKey<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if N >= 4 {
            write!(f, "GenericKey<{}>({})", N, self.to_integer())
        } else {
            write!(f, "GenericKey<{}>({:?})", N, self.data)
        }
    }
}

impl<const N: usize> fmt::Display for GenericKey<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if N >= 4 {
            write!(f, "{}", self.to_integer())
        } else {
            for byte in &self.data {
                write!(f, "{byte:02x}")?;
            }
            Ok(())
        }
    }
}

/// Byte-wise comparator for [`GenericKey`].
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericComparator<const N: usize>;

impl<const N: usize> KeyComparator<GenericKey<N>> for GenericComparator<N> {
    #[inline]
    fn compare(&self, lhs: &GenericKey<N>, rhs: &GenericKey<N>) -> Ordering {
        lhs.data.cmp(&rhs.data)
    }
}

impl IndexKey for i64 {
    const ENCODED_LEN: usize = 8;

    #[inline]
    fn encode_into(&self, buf: &mut [u8]) {
        buf[..8].copy_from_slice(&self.to_le_bytes());
    }

    #[inline]
    fn decode_from(buf: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&buf[..8]);
        i64::from_le_bytes(raw)
    }
}

impl IntegerKey for i64 {
    #[inline]
    fn from_integer(value: i64) -> Self {
        value
    }
}

impl IndexKey for u32 {
    const ENCODED_LEN: usize = 4;

    #[inline]
    fn encode_into(&self, buf: &mut [u8]) {
        buf[..4].copy_from_slice(&self.to_le_bytes());
    }

    #[inline]
    fn decode_from(buf: &[u8]) -> Self {
        u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_key_integer_order() {
        let values = [i64::MIN, -1000, -1, 0, 1, 7, 1000, i64::MAX];
        let cmp = GenericComparator::<8>;

        for pair in values.windows(2) {
            let lo = GenericKey::<8>::from_integer(pair[0]);
            let hi = GenericKey::<8>::from_integer(pair[1]);
            assert_eq!(cmp.compare(&lo, &hi), Ordering::Less);
        }
        for v in values {
            assert_eq!(GenericKey::<8>::from_integer(v).to_integer(), v);
        }
    }

    #[test]
    fn test_narrow_generic_key() {
        let cmp = GenericComparator::<4>;
        let a = GenericKey::<4>::from_integer(-3);
        let b = GenericKey::<4>::from_integer(12);

        assert_eq!(cmp.compare(&a, &b), Ordering::Less);
        assert_eq!(a.to_integer(), -3);
        assert_eq!(b.to_integer(), 12);
    }

    #[test]
    fn test_wide_generic_key_encoding() {
        let key = GenericKey::<32>::from_integer(99);
        let mut buf = [0xFFu8; 40];
        key.encode_into(&mut buf);

        assert_eq!(&buf[8..32], &[0u8; 24]);
        assert_eq!(buf[32], 0xFF);
        assert_eq!(GenericKey::<32>::decode_from(&buf), key);
        assert_eq!(format!("{:?}", key), "GenericKey<32>(99)");
        assert_eq!(key.to_string(), "99");
        assert_eq!(GenericKey::<2>::from_bytes([0xab, 0x01]).to_string(), "ab01");
    }

    #[test]
    fn test_primitive_keys() {
        let mut buf = [0u8; 8];
        (-42i64).encode_into(&mut buf);
        assert_eq!(i64::decode_from(&buf), -42);

        77u32.encode_into(&mut buf);
        assert_eq!(u32::decode_from(&buf), 77);
    }

    #[test]
    fn test_closure_and_ord_comparators() {
        let reverse = |a: &i64, b: &i64| b.cmp(a);
        assert_eq!(reverse.compare(&1, &2), Ordering::Greater);
        assert_eq!(OrdComparator.compare(&1i64, &2i64), Ordering::Less);
        assert_eq!(OrdComparator.compare(&2u32, &2u32), Ordering::Equal);
    }
}
