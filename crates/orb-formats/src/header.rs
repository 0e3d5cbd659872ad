//! Orb and Bro container headers
//!
//! Both containers start with a 4-byte tag compared as a big-endian word,
//! followed by a little-endian minor/major version pair and a timestamp.
//! The Orb header continues with the catalog location.
//!
//! ```text
//! Orb:                                 Bro:
//! 0x00 u32 BE  magic "ORB\0"           0x00 u32 BE  magic "BRO\0"
//! 0x04 u16 LE  minor version           0x04 u16 LE  minor version
//! 0x06 u16 LE  major version           0x06 u16 LE  major version
//! 0x08 u32 LE  timestamp (non-zero)    0x08 u32 LE  timestamp (= Orb's)
//! 0x0C u32 LE  catalog offset
//! 0x10 u32 LE  catalog entry count
//! ```

use binrw::{BinRead, BinReaderExt, BinWrite, BinWriterExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Seek, Write};
use tracing::{debug, warn};

use crate::error::{OrbError, OrbResult};

/// Orb magic: "ORB\0" read as a big-endian u32
pub const ORB_MAGIC: u32 = u32::from_be_bytes(*b"ORB\0");

/// Bro magic: "BRO\0" read as a big-endian u32
pub const BRO_MAGIC: u32 = u32::from_be_bytes(*b"BRO\0");

/// Orb version this reader understands
pub const ORB_VERSION: FormatVersion = FormatVersion::new(2, 0);

/// Bro version this reader understands
pub const BRO_VERSION: FormatVersion = FormatVersion::new(1, 0);

/// Size of the Orb header in bytes
pub const ORB_HEADER_SIZE: usize = 20;

/// Size of the Bro header in bytes
pub const BRO_HEADER_SIZE: usize = 12;

/// Container format version
///
/// Stored minor first on disk.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, BinRead, BinWrite, Serialize, Deserialize,
)]
#[brw(little)]
pub struct FormatVersion {
    /// Minor version
    pub minor: u16,
    /// Major version
    pub major: u16,
}

impl FormatVersion {
    /// Create a version from its major and minor parts
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { minor, major }
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Parsed Orb header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrbHeader {
    /// Container version
    pub version: FormatVersion,
    /// Build timestamp shared with the matching Bro
    pub timestamp: u32,
    /// Absolute offset of the catalog
    pub catalog_offset: u32,
    /// Number of catalog entries
    pub catalog_count: u32,
}

impl OrbHeader {
    /// Read and validate an Orb header
    ///
    /// Stops at the first field that fails validation: a bad magic is
    /// reported before the version is read, and a bad version before the
    /// timestamp.
    pub fn read<R: Read + Seek>(reader: &mut R, supported: FormatVersion) -> OrbResult<Self> {
        check_magic(reader, "Orb", ORB_MAGIC)?;
        let version = read_version(reader, "Orb", supported)?;

        let timestamp: u32 = reader.read_le()?;
        if timestamp == 0 {
            warn!("Rejecting Orb with zero timestamp");
            return Err(OrbError::ZeroTimestamp);
        }

        let catalog_offset: u32 = reader.read_le()?;
        let catalog_count: u32 = reader.read_le()?;

        Ok(Self {
            version,
            timestamp,
            catalog_offset,
            catalog_count,
        })
    }

    /// Write the header in on-disk layout
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> OrbResult<()> {
        writer.write_be(&ORB_MAGIC)?;
        writer.write_le(&self.version)?;
        writer.write_le(&self.timestamp)?;
        writer.write_le(&self.catalog_offset)?;
        writer.write_le(&self.catalog_count)?;
        Ok(())
    }
}

/// Parsed Bro header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroHeader {
    /// Container version
    pub version: FormatVersion,
    /// Timestamp of the Orb this sidecar belongs to
    pub timestamp: u32,
}

impl BroHeader {
    /// Read a Bro header, validating magic and version
    ///
    /// The timestamp is returned as stored; matching it against the Orb is
    /// left to [`crate::BroFile`].
    pub fn read<R: Read + Seek>(reader: &mut R, supported: FormatVersion) -> OrbResult<Self> {
        check_magic(reader, "Bro", BRO_MAGIC)?;
        let version = read_version(reader, "Bro", supported)?;
        let timestamp: u32 = reader.read_le()?;
        Ok(Self { version, timestamp })
    }

    /// Write the header in on-disk layout
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> OrbResult<()> {
        writer.write_be(&BRO_MAGIC)?;
        writer.write_le(&self.version)?;
        writer.write_le(&self.timestamp)?;
        Ok(())
    }
}

fn check_magic<R: Read + Seek>(
    reader: &mut R,
    container: &'static str,
    expected: u32,
) -> OrbResult<()> {
    let actual: u32 = reader.read_be()?;
    if actual != expected {
        warn!("{} magic mismatch: {:#010x}", container, actual);
        return Err(OrbError::InvalidMagic {
            container,
            expected,
            actual,
        });
    }
    Ok(())
}

fn read_version<R: Read + Seek>(
    reader: &mut R,
    container: &'static str,
    supported: FormatVersion,
) -> OrbResult<FormatVersion> {
    let version: FormatVersion = reader.read_le()?;
    debug!("{} v{} loaded", container, version);

    if version != supported {
        warn!(
            "{} version {} does not match supported {}",
            container, version, supported
        );
        return Err(OrbError::UnsupportedVersion {
            container,
            major: version.major,
            minor: version.minor,
            supported,
        });
    }
    Ok(version)
}
