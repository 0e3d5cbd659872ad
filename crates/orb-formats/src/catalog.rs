//! Object catalog
//!
//! The catalog is an array of fixed-size [`ObjectDescription`] records,
//! sorted by case-insensitive name by the archive producer. It is loaded
//! once when the Orb is opened and searched with a binary search.

use binrw::{BinRead, BinReaderExt, BinWrite, BinWriterExt};
use std::cmp::Ordering;
use std::io::{Read, Seek, Write};

use crate::error::OrbResult;
use crate::name::{FixedName, compare_ignore_case};
use crate::preallocation;

/// Size of a catalog entry on disk
pub const OBJECT_DESCRIPTION_SIZE: usize = 32;

/// Catalog entry locating one named object
///
/// Binary layout (little-endian, 32 bytes):
/// ```text
/// name:             [u8; 16]
/// objects_offset:   u32   start of the object's serialized data
/// objects_count:    u32   owned by the consumer, carried verbatim
/// resources_offset: u32   start of the object's resource table
/// resources_count:  u32   number of resource entries
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct ObjectDescription {
    /// Object name
    pub name: FixedName,
    /// Offset of the object's serialized fields
    pub objects_offset: u32,
    /// Count field whose meaning belongs to the object consumer
    pub objects_count: u32,
    /// Offset of the object's resource table
    pub resources_offset: u32,
    /// Number of entries in the resource table
    pub resources_count: u32,
}

impl ObjectDescription {
    /// Read one entry at the reader's current position
    pub fn load<R: Read + Seek>(reader: &mut R) -> OrbResult<Self> {
        Ok(reader.read_le()?)
    }

    /// Write this entry in on-disk layout
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> OrbResult<()> {
        writer.write_le(self)?;
        Ok(())
    }
}

/// In-memory catalog, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<ObjectDescription>,
}

impl Catalog {
    /// Wrap entries already in catalog order
    pub fn new(entries: Vec<ObjectDescription>) -> Self {
        Self { entries }
    }

    /// Read `count` consecutive entries from the reader's current position
    pub fn load<R: Read + Seek>(reader: &mut R, count: u32) -> OrbResult<Self> {
        let mut entries = Vec::with_capacity(preallocation(count));
        for _ in 0..count {
            entries.push(ObjectDescription::load(reader)?);
        }
        Ok(Self { entries })
    }

    /// Binary search for a name, ignoring ASCII case
    ///
    /// Only meaningful on a sorted catalog; see [`Catalog::is_sorted`].
    pub fn find(&self, name: &str) -> Option<&ObjectDescription> {
        self.entries
            .binary_search_by(|entry| entry.name.cmp_name(name.as_bytes()))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    /// Index of the first entry that sorts before its predecessor
    pub fn first_unsorted(&self) -> Option<usize> {
        self.entries
            .windows(2)
            .position(|pair| {
                compare_ignore_case(pair[0].name.as_bytes(), pair[1].name.as_bytes())
                    == Ordering::Greater
            })
            .map(|idx| idx + 1)
    }

    /// Check the case-insensitive name ordering binary search relies on
    pub fn is_sorted(&self) -> bool {
        self.first_unsorted().is_none()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the catalog has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in file order
    pub fn iter(&self) -> std::slice::Iter<'_, ObjectDescription> {
        self.entries.iter()
    }

    /// Entries as a slice
    pub fn entries(&self) -> &[ObjectDescription] {
        &self.entries
    }

    /// Entry names in file order
    pub fn names(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(|e| e.name.to_string_lossy())
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a ObjectDescription;
    type IntoIter = std::slice::Iter<'a, ObjectDescription>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
