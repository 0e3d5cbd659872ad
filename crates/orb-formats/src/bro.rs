//! Bro sidecar archive reader
//!
//! A Bro holds resource blobs that do not live in the Orb. It carries no
//! index of its own: offsets come from the Orb's resource tables, and the
//! only consistency check is that both files share the same timestamp.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, warn};

use crate::config::OrbConfig;
use crate::error::{OrbError, OrbResult};
use crate::header::BroHeader;
use crate::orb::read_blob;
use crate::resource::ResourceDescription;

/// Reader for a Bro sidecar archive
pub struct BroFile<R: Read + Seek = BufReader<File>> {
    reader: R,
    header: BroHeader,
}

impl BroFile<BufReader<File>> {
    /// Open a Bro that must belong to the Orb with `orb_timestamp`
    pub fn open<P: AsRef<Path>>(path: P, orb_timestamp: u32) -> OrbResult<Self> {
        Self::open_with_config(path, orb_timestamp, &OrbConfig::default())
    }

    /// Open a Bro with an explicit configuration
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        orb_timestamp: u32,
        config: &OrbConfig,
    ) -> OrbResult<Self> {
        let path = path.as_ref();
        debug!("Opening Bro {}", path.display());
        let file = File::open(path)?;
        Self::from_reader_with_config(BufReader::new(file), orb_timestamp, config)
    }
}

impl<R: Read + Seek> BroFile<R> {
    /// Parse a Bro from any seekable reader with the default configuration
    pub fn from_reader(reader: R, orb_timestamp: u32) -> OrbResult<Self> {
        Self::from_reader_with_config(reader, orb_timestamp, &OrbConfig::default())
    }

    /// Parse a Bro header and check it against the Orb's timestamp
    pub fn from_reader_with_config(
        mut reader: R,
        orb_timestamp: u32,
        config: &OrbConfig,
    ) -> OrbResult<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let header = BroHeader::read(&mut reader, config.bro_version)?;

        if header.timestamp != orb_timestamp {
            warn!(
                "Bro timestamp {:#010x} does not match Orb {:#010x}",
                header.timestamp, orb_timestamp
            );
            return Err(OrbError::TimestampMismatch {
                expected: orb_timestamp,
                actual: header.timestamp,
            });
        }

        Ok(Self { reader, header })
    }

    /// Parsed header
    pub fn header(&self) -> &BroHeader {
        &self.header
    }

    /// Timestamp shared with the Orb
    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }

    /// Read a resource blob stored in this sidecar
    pub fn read_resource(&mut self, desc: &ResourceDescription) -> OrbResult<Vec<u8>> {
        read_blob(&mut self.reader, desc)
    }

    /// Release the sidecar and return the underlying reader
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Seek> std::fmt::Debug for BroFile<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroFile")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}
