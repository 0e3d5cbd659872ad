//! Fixed-width entry names
//!
//! Catalog and resource entries carry a 16-byte name field. Producers write
//! a NUL-terminated ASCII name and pad the remainder; the padding bytes are
//! not guaranteed to be zero, so the buffer is kept verbatim and only the
//! bytes before the first NUL take part in comparisons.

use binrw::{BinRead, BinWrite};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{OrbError, OrbResult};

/// Capacity of the on-disk name field in bytes
pub const NAME_SIZE: usize = 16;

/// Verbatim 16-byte name field
#[derive(Clone, Copy, PartialEq, Eq, Hash, BinRead, BinWrite)]
pub struct FixedName([u8; NAME_SIZE]);

impl FixedName {
    /// Wrap a raw name buffer as read from disk
    pub const fn from_raw(raw: [u8; NAME_SIZE]) -> Self {
        Self(raw)
    }

    /// Encode a name, NUL-padding it to the field width
    ///
    /// One byte is reserved for the terminator, so names may be at most
    /// 15 bytes long.
    pub fn new(name: &str) -> OrbResult<Self> {
        let bytes = name.as_bytes();
        if bytes.len() >= NAME_SIZE || bytes.contains(&0) {
            return Err(OrbError::NameTooLong {
                name: name.to_string(),
                len: bytes.len(),
                max: NAME_SIZE - 1,
            });
        }
        let mut raw = [0u8; NAME_SIZE];
        raw[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(raw))
    }

    /// Raw field contents including padding
    pub const fn raw(&self) -> &[u8; NAME_SIZE] {
        &self.0
    }

    /// Name bytes up to the first NUL
    pub fn as_bytes(&self) -> &[u8] {
        trim_nul(&self.0)
    }

    /// Name as text, replacing non-UTF-8 bytes
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }

    /// Case-insensitive ordering against a query name
    pub fn cmp_name(&self, name: &[u8]) -> Ordering {
        compare_ignore_case(self.as_bytes(), trim_nul(name))
    }

    /// Case-insensitive equality against a query name
    pub fn matches(&self, name: &str) -> bool {
        self.cmp_name(name.as_bytes()) == Ordering::Equal
    }
}

impl fmt::Debug for FixedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedName({:?})", self.to_string_lossy())
    }
}

impl fmt::Display for FixedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

fn trim_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

/// ASCII case-insensitive byte ordering
///
/// Letters are folded to lower case before comparing, and a name that is a
/// prefix of another sorts first. This is the order archive producers use
/// for the catalog and resource tables.
pub fn compare_ignore_case(a: &[u8], b: &[u8]) -> Ordering {
    a.iter()
        .map(u8::to_ascii_lowercase)
        .cmp(b.iter().map(u8::to_ascii_lowercase))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pads_with_nul() {
        let name = FixedName::new("MAIN").unwrap();
        assert_eq!(&name.raw()[..4], b"MAIN");
        assert!(name.raw()[4..].iter().all(|&b| b == 0));
        assert_eq!(name.as_bytes(), b"MAIN");
    }

    #[test]
    fn test_new_rejects_long_names() {
        assert!(FixedName::new("ExactlyFifteen!").is_ok());
        let err = FixedName::new("SixteenCharsLong").unwrap_err();
        assert!(matches!(err, OrbError::NameTooLong { len: 16, .. }));
    }

    #[test]
    fn test_padding_garbage_ignored() {
        let mut raw = [0xAAu8; NAME_SIZE];
        raw[..5].copy_from_slice(b"Actor");
        raw[5] = 0;
        let name = FixedName::from_raw(raw);
        assert!(name.matches("ACTOR"));
        assert_eq!(name.raw()[6], 0xAA);
    }

    #[test]
    fn test_unterminated_full_width_name() {
        let name = FixedName::from_raw(*b"ABCDEFGHIJKLMNOP");
        assert_eq!(name.as_bytes().len(), NAME_SIZE);
        assert!(name.matches("abcdefghijklmnop"));
    }

    #[test]
    fn test_case_insensitive_order() {
        assert_eq!(compare_ignore_case(b"main", b"MAIN"), Ordering::Equal);
        assert_eq!(compare_ignore_case(b"Alpha", b"beta"), Ordering::Less);
        assert_eq!(compare_ignore_case(b"Page", b"page2"), Ordering::Less);
        // '_' sits between upper and lower case letters in ASCII
        assert_eq!(compare_ignore_case(b"A_B", b"AAB"), Ordering::Less);
    }
}
