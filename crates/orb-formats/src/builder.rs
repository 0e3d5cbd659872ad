//! Orb/Bro archive builder
//!
//! Produces archives in the layout the reader expects:
//!
//! ```text
//! Orb:
//! ├── Header (20 bytes)
//! ├── Object data, one payload per catalog entry
//! ├── Orb-resident resource blobs
//! ├── Resource tables, one per object
//! └── Catalog, sorted by case-insensitive name
//!
//! Bro (only when some resource is sidecar-resident):
//! ├── Header (12 bytes, same timestamp as the Orb)
//! └── Sidecar resource blobs
//! ```
//!
//! Catalog entries and each resource table are sorted on build, so
//! insertion order does not matter.

use std::io::{Cursor, Seek, SeekFrom, Write};
use tracing::debug;

use crate::catalog::ObjectDescription;
use crate::error::{OrbError, OrbResult};
use crate::header::{
    BRO_VERSION, BroHeader, FormatVersion, ORB_HEADER_SIZE, ORB_VERSION, OrbHeader,
};
use crate::name::{FixedName, compare_ignore_case};
use crate::resource::ResourceDescription;

/// Output of [`OrbBuilder::build`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltArchive {
    /// Orb image
    pub orb: Vec<u8>,
    /// Bro image, present when at least one resource lives in the sidecar
    pub bro: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
struct PendingResource {
    name: FixedName,
    data: Vec<u8>,
    in_bro: bool,
}

#[derive(Debug, Clone)]
struct PendingObject {
    name: FixedName,
    payload: Vec<u8>,
    objects_count: u32,
    resources: Vec<PendingResource>,
}

/// Builder for Orb archives and their Bro sidecars
#[derive(Debug, Clone)]
pub struct OrbBuilder {
    timestamp: u32,
    orb_version: FormatVersion,
    bro_version: FormatVersion,
    objects: Vec<PendingObject>,
}

impl OrbBuilder {
    /// Start an archive stamped with `timestamp`
    ///
    /// The timestamp is written as given; readers reject zero.
    pub fn new(timestamp: u32) -> Self {
        Self {
            timestamp,
            orb_version: ORB_VERSION,
            bro_version: BRO_VERSION,
            objects: Vec::new(),
        }
    }

    /// Override the Orb version written to the header
    #[must_use]
    pub const fn orb_version(mut self, version: FormatVersion) -> Self {
        self.orb_version = version;
        self
    }

    /// Override the Bro version written to the header
    #[must_use]
    pub const fn bro_version(mut self, version: FormatVersion) -> Self {
        self.bro_version = version;
        self
    }

    /// Add an object with its serialized payload
    pub fn add_object(&mut self, name: &str, payload: Vec<u8>) -> OrbResult<&mut Self> {
        self.add_object_with_count(name, payload, 0)
    }

    /// Add an object, setting the consumer-defined count field
    pub fn add_object_with_count(
        &mut self,
        name: &str,
        payload: Vec<u8>,
        objects_count: u32,
    ) -> OrbResult<&mut Self> {
        let name = FixedName::new(name)?;
        if self.objects.iter().any(|o| same_name(&o.name, &name)) {
            return Err(OrbError::DuplicateName(name.to_string_lossy()));
        }
        self.objects.push(PendingObject {
            name,
            payload,
            objects_count,
            resources: Vec::new(),
        });
        Ok(self)
    }

    /// Attach a resource blob to an object added earlier
    pub fn add_resource(
        &mut self,
        object: &str,
        name: &str,
        data: Vec<u8>,
        in_bro: bool,
    ) -> OrbResult<&mut Self> {
        let name = FixedName::new(name)?;
        let owner = self
            .objects
            .iter_mut()
            .find(|o| o.name.matches(object))
            .ok_or_else(|| OrbError::ObjectNotFound(object.to_string()))?;
        if owner.resources.iter().any(|r| same_name(&r.name, &name)) {
            return Err(OrbError::DuplicateName(name.to_string_lossy()));
        }
        owner.resources.push(PendingResource { name, data, in_bro });
        Ok(self)
    }

    /// Number of objects added so far
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Assemble the Orb image and, when needed, the Bro image
    pub fn build(&self) -> OrbResult<BuiltArchive> {
        let mut objects = self.objects.clone();
        objects.sort_by(|a, b| compare_ignore_case(a.name.as_bytes(), b.name.as_bytes()));
        for object in &mut objects {
            object
                .resources
                .sort_by(|a, b| compare_ignore_case(a.name.as_bytes(), b.name.as_bytes()));
        }

        let mut orb = Cursor::new(Vec::new());
        orb.write_all(&[0u8; ORB_HEADER_SIZE])?;

        let mut bro = Cursor::new(Vec::new());
        BroHeader {
            version: self.bro_version,
            timestamp: self.timestamp,
        }
        .write(&mut bro)?;
        let mut uses_bro = false;

        let mut object_offsets = Vec::with_capacity(objects.len());
        for object in &objects {
            object_offsets.push(offset_u32(&mut orb, "object offset")?);
            orb.write_all(&object.payload)?;
        }

        let mut tables = Vec::with_capacity(objects.len());
        for object in &objects {
            let mut table = Vec::with_capacity(object.resources.len());
            for resource in &object.resources {
                let target = if resource.in_bro {
                    uses_bro = true;
                    &mut bro
                } else {
                    &mut orb
                };
                let offset = offset_u32(target, "resource offset")?;
                target.write_all(&resource.data)?;
                table.push(ResourceDescription {
                    name: resource.name,
                    offset,
                    size: len_u32(resource.data.len(), "resource size")?,
                    in_bro: resource.in_bro,
                });
            }
            tables.push(table);
        }

        let mut catalog = Vec::with_capacity(objects.len());
        for ((object, objects_offset), table) in objects.iter().zip(object_offsets).zip(&tables) {
            let resources_offset = offset_u32(&mut orb, "resource table offset")?;
            for entry in table {
                entry.write(&mut orb)?;
            }
            catalog.push(ObjectDescription {
                name: object.name,
                objects_offset,
                objects_count: object.objects_count,
                resources_offset,
                resources_count: len_u32(table.len(), "resource count")?,
            });
        }

        let catalog_offset = offset_u32(&mut orb, "catalog offset")?;
        for entry in &catalog {
            entry.write(&mut orb)?;
        }

        orb.seek(SeekFrom::Start(0))?;
        OrbHeader {
            version: self.orb_version,
            timestamp: self.timestamp,
            catalog_offset,
            catalog_count: len_u32(catalog.len(), "catalog count")?,
        }
        .write(&mut orb)?;

        let orb = orb.into_inner();
        let bro = uses_bro.then(|| bro.into_inner());
        debug!(
            "Built Orb: {} bytes, {} objects, sidecar {} bytes",
            orb.len(),
            catalog.len(),
            bro.as_ref().map_or(0, Vec::len)
        );

        Ok(BuiltArchive { orb, bro })
    }
}

fn same_name(a: &FixedName, b: &FixedName) -> bool {
    compare_ignore_case(a.as_bytes(), b.as_bytes()).is_eq()
}

fn offset_u32<S: Seek>(stream: &mut S, field: &'static str) -> OrbResult<u32> {
    let pos = stream.stream_position()?;
    u32::try_from(pos).map_err(|_| OrbError::Overflow { field, value: pos })
}

fn len_u32(len: usize, field: &'static str) -> OrbResult<u32> {
    u32::try_from(len).map_err(|_| OrbError::Overflow {
        field,
        value: len as u64,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::header::BRO_HEADER_SIZE;

    #[test]
    fn test_catalog_sorted_case_insensitively() {
        let mut builder = OrbBuilder::new(3);
        for name in ["zebra", "Apple", "mango", "BANANA"] {
            builder.add_object(name, vec![1, 2, 3]).unwrap();
        }
        let built = builder.build().unwrap();
        assert!(built.bro.is_none());

        let orb = &built.orb;
        let catalog_offset = u32::from_le_bytes(orb[12..16].try_into().unwrap()) as usize;
        let count = u32::from_le_bytes(orb[16..20].try_into().unwrap());
        assert_eq!(count, 4);

        let mut cursor = Cursor::new(orb.clone());
        cursor.set_position(catalog_offset as u64);
        let catalog = Catalog::load(&mut cursor, count).unwrap();
        assert!(catalog.is_sorted());
        assert_eq!(
            catalog.names().collect::<Vec<_>>(),
            vec!["Apple", "BANANA", "mango", "zebra"]
        );
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut builder = OrbBuilder::new(1);
        builder.add_object("Page", Vec::new()).unwrap();
        assert!(matches!(
            builder.add_object("PAGE", Vec::new()).unwrap_err(),
            OrbError::DuplicateName(_)
        ));

        builder.add_resource("page", "a.bmp", vec![0], false).unwrap();
        assert!(matches!(
            builder.add_resource("Page", "A.BMP", vec![0], true).unwrap_err(),
            OrbError::DuplicateName(_)
        ));
    }

    #[test]
    fn test_resource_requires_object() {
        let mut builder = OrbBuilder::new(1);
        let err = builder.add_resource("ghost", "x", Vec::new(), false).unwrap_err();
        assert!(matches!(err, OrbError::ObjectNotFound(_)));
    }

    #[test]
    fn test_sidecar_image() {
        let mut builder = OrbBuilder::new(0xABCD);
        builder.add_object("Page", Vec::new()).unwrap();
        builder.add_resource("Page", "big.wav", vec![0xEE; 32], true).unwrap();
        let built = builder.build().unwrap();

        let bro = built.bro.unwrap();
        assert_eq!(&bro[..4], b"BRO\0");
        assert_eq!(&bro[8..12], &0xABCDu32.to_le_bytes());
        assert_eq!(bro.len(), BRO_HEADER_SIZE + 32);
    }

    #[test]
    fn test_object_count_field_preserved() {
        let mut builder = OrbBuilder::new(1);
        builder.add_object_with_count("Page", vec![9; 4], 17).unwrap();
        assert_eq!(builder.object_count(), 1);
        let orb = builder.build().unwrap().orb;

        let catalog_offset = u32::from_le_bytes(orb[12..16].try_into().unwrap()) as usize;
        let entry = ObjectDescription::load(&mut Cursor::new(&orb[catalog_offset..])).unwrap();
        assert_eq!(entry.objects_count, 17);
        assert_eq!(entry.objects_offset as usize, ORB_HEADER_SIZE);
        assert_eq!(entry.resources_count, 0);
    }
}
