//! Error types for Orb/Bro archive operations

use thiserror::Error;

/// Orb operation result type
pub type OrbResult<T> = Result<T, OrbError>;

/// Broad failure class of an [`OrbError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The underlying file could not be opened or read
    Open,
    /// Wrong magic tag or unsupported version
    Format,
    /// Zero timestamp or primary/sidecar timestamp mismatch
    Integrity,
    /// A name was looked up that the archive does not contain
    Lookup,
    /// Object stream could not be decoded
    Decode,
    /// Archive could not be produced
    Build,
}

/// Error types for Orb and Bro archives
#[derive(Debug, Error)]
pub enum OrbError {
    /// Magic tag did not match the container type
    #[error("Invalid {container} magic: expected {expected:#010x}, got {actual:#010x}")]
    InvalidMagic {
        /// Container being opened ("Orb" or "Bro")
        container: &'static str,
        /// Expected big-endian tag
        expected: u32,
        /// Tag found in the file
        actual: u32,
    },

    /// Container version differs from the supported pair
    #[error("Unsupported {container} version {major}.{minor} (supported: {supported})")]
    UnsupportedVersion {
        /// Container being opened ("Orb" or "Bro")
        container: &'static str,
        /// Major version found
        major: u16,
        /// Minor version found
        minor: u16,
        /// Supported version
        supported: crate::FormatVersion,
    },

    /// Primary archive carries a zero timestamp
    #[error("Orb timestamp is zero")]
    ZeroTimestamp,

    /// Sidecar timestamp does not match the primary archive
    #[error("Bro timestamp mismatch: expected {expected:#010x}, got {actual:#010x}")]
    TimestampMismatch {
        /// Timestamp of the primary archive
        expected: u32,
        /// Timestamp stored in the sidecar
        actual: u32,
    },

    /// Catalog is not sorted by case-insensitive name
    #[error("Catalog not sorted at entry {index}")]
    UnsortedCatalog {
        /// First entry that sorts before its predecessor
        index: usize,
    },

    /// Object name absent from the catalog
    #[error("Object not found in catalog: {0}")]
    ObjectNotFound(String),

    /// Resource name absent from a resource table
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Resource lives in the sidecar but no sidecar is open
    #[error("Resource {0} is stored in the Bro sidecar, which is not open")]
    SidecarMissing(String),

    /// Object stream names a class with no registered factory
    #[error("Unknown class in object stream: {0}")]
    UnknownClass(String),

    /// Object stream tag points outside the object map
    #[error("Invalid object reference {tag:#06x} (map holds {mapped} slots)")]
    InvalidObjectReference {
        /// Raw tag read from the stream
        tag: u16,
        /// Number of slots currently mapped
        mapped: usize,
    },

    /// Object stream refers back to the root object
    #[error("Object stream references the root object")]
    RootReference,

    /// Object read did not have the requested concrete type
    #[error("Object has unexpected type, wanted {0}")]
    UnexpectedType(&'static str),

    /// Name does not fit the fixed-width name field
    #[error("Name {name:?} is {len} bytes, limit is {max}")]
    NameTooLong {
        /// Offending name
        name: String,
        /// Its length in bytes
        len: usize,
        /// Field capacity
        max: usize,
    },

    /// Two entries share the same case-insensitive name
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// Value does not fit the on-disk field
    #[error("{field} overflows u32: {value}")]
    Overflow {
        /// Field name
        field: &'static str,
        /// Value that did not fit
        value: u64,
    },

    /// Configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Binary read/write error
    #[error("Binary format error: {0}")]
    BinRead(#[from] binrw::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrbError {
    /// Failure class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Open,
            Self::InvalidMagic { .. } | Self::UnsupportedVersion { .. } => ErrorKind::Format,
            Self::ZeroTimestamp | Self::TimestampMismatch { .. } | Self::UnsortedCatalog { .. } => {
                ErrorKind::Integrity
            }
            Self::ObjectNotFound(_) | Self::ResourceNotFound(_) | Self::SidecarMissing(_) => {
                ErrorKind::Lookup
            }
            Self::UnknownClass(_)
            | Self::InvalidObjectReference { .. }
            | Self::RootReference
            | Self::UnexpectedType(_)
            | Self::BinRead(_) => ErrorKind::Decode,
            Self::NameTooLong { .. }
            | Self::DuplicateName(_)
            | Self::Overflow { .. }
            | Self::InvalidConfig(_) => ErrorKind::Build,
        }
    }

    /// Check if the container is not an archive this reader understands
    pub fn is_format_mismatch(&self) -> bool {
        self.kind() == ErrorKind::Format
    }

    /// Check if this is a timestamp consistency failure
    pub fn is_integrity_failure(&self) -> bool {
        self.kind() == ErrorKind::Integrity
    }

    /// Check if this is a lookup of a name the archive does not hold
    ///
    /// Production call sites only look up names the archive is known to
    /// contain, so this indicates a caller bug rather than bad data.
    pub fn is_contract_violation(&self) -> bool {
        self.kind() == ErrorKind::Lookup
    }

    /// Check if the reader hit end of file before a structure was complete
    pub fn is_truncated(&self) -> bool {
        match self {
            Self::Io(e) => e.kind() == std::io::ErrorKind::UnexpectedEof,
            Self::BinRead(e) => e.is_eof(),
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let magic = OrbError::InvalidMagic {
            container: "Orb",
            expected: 0x4F52_4200,
            actual: 0,
        };
        assert!(magic.is_format_mismatch());
        assert!(!magic.is_integrity_failure());

        let stamp = OrbError::TimestampMismatch {
            expected: 1,
            actual: 2,
        };
        assert!(stamp.is_integrity_failure());
        assert!(OrbError::ZeroTimestamp.is_integrity_failure());

        let lookup = OrbError::ObjectNotFound("MISSING".to_string());
        assert!(lookup.is_contract_violation());
        assert_eq!(lookup.kind(), ErrorKind::Lookup);
    }

    #[test]
    fn test_truncation_detection() {
        let eof = OrbError::Io(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        assert!(eof.is_truncated());
        assert_eq!(eof.kind(), ErrorKind::Open);
        assert!(!OrbError::RootReference.is_truncated());
    }

    #[test]
    fn test_error_display() {
        let err = OrbError::TimestampMismatch {
            expected: 1,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "Bro timestamp mismatch: expected 0x00000001, got 0x00000002"
        );
    }
}
