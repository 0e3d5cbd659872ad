//! Resource table entries

use binrw::{BinRead, BinReaderExt, BinWrite, BinWriterExt};
use std::io::{Read, Seek, Write};

use crate::error::OrbResult;
use crate::name::FixedName;
use crate::preallocation;

/// Size of a resource entry on disk
pub const RESOURCE_DESCRIPTION_SIZE: usize = 26;

/// Resource entry locating one named blob
///
/// Binary layout (little-endian, 26 bytes):
/// ```text
/// name:    [u8; 16]
/// offset:  u32   absolute offset in the hosting container
/// size:    u32   blob size in bytes
/// in_bro:  u16   non-zero when the blob lives in the Bro sidecar
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct ResourceDescription {
    /// Resource name
    pub name: FixedName,
    /// Offset of the blob
    pub offset: u32,
    /// Size of the blob in bytes
    pub size: u32,
    /// Blob is stored in the Bro sidecar rather than the Orb
    #[br(map = |flag: u16| flag != 0)]
    #[bw(map = |in_bro: &bool| u16::from(*in_bro))]
    pub in_bro: bool,
}

impl ResourceDescription {
    /// Read one entry at the reader's current position
    pub fn load<R: Read + Seek>(reader: &mut R) -> OrbResult<Self> {
        Ok(reader.read_le()?)
    }

    /// Write this entry in on-disk layout
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> OrbResult<()> {
        writer.write_le(self)?;
        Ok(())
    }

    /// Read `count` consecutive entries from the reader's current position
    pub fn load_table<R: Read + Seek>(reader: &mut R, count: u32) -> OrbResult<Vec<Self>> {
        let mut table = Vec::with_capacity(preallocation(count));
        for _ in 0..count {
            table.push(Self::load(reader)?);
        }
        Ok(table)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_entry_layout() {
        let desc = ResourceDescription {
            name: FixedName::new("intro.wav").unwrap(),
            offset: 0x1000,
            size: 512,
            in_bro: true,
        };
        let mut cursor = Cursor::new(Vec::new());
        desc.write(&mut cursor).unwrap();
        let data = cursor.into_inner();

        assert_eq!(data.len(), RESOURCE_DESCRIPTION_SIZE);
        assert_eq!(&data[..9], b"intro.wav");
        assert_eq!(&data[16..20], &0x1000u32.to_le_bytes());
        assert_eq!(&data[20..24], &512u32.to_le_bytes());
        assert_eq!(&data[24..26], &[1, 0]);
    }

    #[test]
    fn test_any_nonzero_flag_means_sidecar() {
        let mut data = vec![0u8; RESOURCE_DESCRIPTION_SIZE];
        data[..2].copy_from_slice(b"fx");
        data[24..26].copy_from_slice(&0x0100u16.to_le_bytes());
        let parsed = ResourceDescription::load(&mut Cursor::new(&data)).unwrap();
        assert!(parsed.in_bro);

        data[24..26].copy_from_slice(&0u16.to_le_bytes());
        let parsed = ResourceDescription::load(&mut Cursor::new(&data)).unwrap();
        assert!(!parsed.in_bro);
    }

    #[test]
    fn test_load_table_preserves_file_order() {
        let mut cursor = Cursor::new(Vec::new());
        for (i, name) in ["c", "a", "b"].iter().enumerate() {
            ResourceDescription {
                name: FixedName::new(name).unwrap(),
                offset: i as u32 * 10,
                size: 10,
                in_bro: false,
            }
            .write(&mut cursor)
            .unwrap();
        }
        cursor.set_position(0);

        let table = ResourceDescription::load_table(&mut cursor, 3).unwrap();
        let names: Vec<_> = table.iter().map(|r| r.name.to_string_lossy()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
        assert_eq!(table[2].offset, 20);
    }
}
