//! Orb primary archive reader

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, warn};

use crate::archive::{Archive, ClassRegistry, Loadable};
use crate::catalog::{Catalog, ObjectDescription};
use crate::config::OrbConfig;
use crate::error::{OrbError, OrbResult};
use crate::header::OrbHeader;
use crate::preallocation;
use crate::resource::ResourceDescription;

/// Reader for an Orb archive
///
/// Owns the underlying reader and the catalog loaded at open time. All
/// operations seek to an absolute offset before reading, so calls may be
/// issued in any order.
pub struct OrbFile<R: Read + Seek = BufReader<File>> {
    reader: R,
    header: OrbHeader,
    catalog: Catalog,
    config: OrbConfig,
    registry: ClassRegistry,
}

impl OrbFile<BufReader<File>> {
    /// Open an Orb file with the default configuration
    pub fn open<P: AsRef<Path>>(path: P) -> OrbResult<Self> {
        Self::open_with_config(path, OrbConfig::default())
    }

    /// Open an Orb file with an explicit configuration
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: OrbConfig) -> OrbResult<Self> {
        let path = path.as_ref();
        debug!("Opening Orb {}", path.display());
        let file = File::open(path)?;
        Self::from_reader_with_config(BufReader::new(file), config)
    }
}

impl<R: Read + Seek> OrbFile<R> {
    /// Parse an Orb from any seekable reader with the default configuration
    pub fn from_reader(reader: R) -> OrbResult<Self> {
        Self::from_reader_with_config(reader, OrbConfig::default())
    }

    /// Parse an Orb from any seekable reader
    ///
    /// Reads the header, then the full catalog. A failure at any point
    /// drops the reader; nothing is returned for inspection.
    pub fn from_reader_with_config(mut reader: R, config: OrbConfig) -> OrbResult<Self> {
        config.validate()?;
        reader.seek(SeekFrom::Start(0))?;
        let header = OrbHeader::read(&mut reader, config.orb_version)?;

        reader.seek(SeekFrom::Start(u64::from(header.catalog_offset)))?;
        let catalog = Catalog::load(&mut reader, header.catalog_count)?;
        debug!(
            "Loaded catalog: {} entries at {:#x}, timestamp {:#010x}",
            catalog.len(),
            header.catalog_offset,
            header.timestamp
        );

        if config.require_sorted_catalog {
            if let Some(index) = catalog.first_unsorted() {
                warn!("Catalog out of order at entry {}", index);
                return Err(OrbError::UnsortedCatalog { index });
            }
        }

        Ok(Self {
            reader,
            header,
            catalog,
            config,
            registry: ClassRegistry::new(),
        })
    }

    /// Install the class registry used when loading objects
    #[must_use]
    pub fn with_registry(mut self, registry: ClassRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Class registry used when loading objects
    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Mutable access to the class registry
    pub fn registry_mut(&mut self) -> &mut ClassRegistry {
        &mut self.registry
    }

    /// Parsed header
    pub fn header(&self) -> &OrbHeader {
        &self.header
    }

    /// Build timestamp, shared with the matching Bro
    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }

    /// Configuration the archive was opened with
    pub fn config(&self) -> &OrbConfig {
        &self.config
    }

    /// Loaded catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Look up an object by case-insensitive name
    ///
    /// Callers are expected to ask only for names the archive contains;
    /// an absent name is reported as [`OrbError::ObjectNotFound`].
    pub fn object_descriptor(&self, name: &str) -> OrbResult<&ObjectDescription> {
        self.catalog
            .find(name)
            .ok_or_else(|| OrbError::ObjectNotFound(name.to_string()))
    }

    /// Seek the reader to the start of a named object's data
    pub fn seek_to_object(&mut self, name: &str) -> OrbResult<()> {
        let offset = self.object_descriptor(name)?.objects_offset;
        self.seek(offset)
    }

    /// Load the root game object
    ///
    /// The root is looked up under the configured reserved name and is
    /// pre-mapped into the object stream before its own fields are read.
    pub fn load_game<G: Loadable>(&mut self, game: &mut G) -> OrbResult<()> {
        let root = self.config.root_object.clone();
        self.seek_to_object(&root)?;
        debug!("Loading game root {}", root);

        let mut archive = Archive::new(&mut self.reader, &self.registry);
        archive.map_object();
        game.load(&mut archive)
    }

    /// Load a named object
    pub fn load_object<T: Loadable + ?Sized>(
        &mut self,
        object: &mut T,
        name: &str,
    ) -> OrbResult<()> {
        self.seek_to_object(name)?;
        let mut archive = Archive::new(&mut self.reader, &self.registry);
        object.load(&mut archive)
    }

    /// Load an object from a descriptor that was already resolved
    pub fn load_object_from<T: Loadable + ?Sized>(
        &mut self,
        object: &mut T,
        desc: &ObjectDescription,
    ) -> OrbResult<()> {
        self.seek(desc.objects_offset)?;
        let mut archive = Archive::new(&mut self.reader, &self.registry);
        object.load(&mut archive)
    }

    /// Read an object's resource table
    ///
    /// The table is read fresh on every call and belongs to the caller.
    pub fn resource_table(
        &mut self,
        desc: &ObjectDescription,
    ) -> OrbResult<Vec<ResourceDescription>> {
        self.seek(desc.resources_offset)?;
        let table = ResourceDescription::load_table(&mut self.reader, desc.resources_count)?;
        debug!("Loaded {} resource entries for {}", table.len(), desc.name);
        Ok(table)
    }

    /// Read a resource blob stored in this Orb
    pub fn read_resource(&mut self, desc: &ResourceDescription) -> OrbResult<Vec<u8>> {
        read_blob(&mut self.reader, desc)
    }

    /// Raw reader positioned wherever the last operation left it
    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Release the archive and return the underlying reader
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn seek(&mut self, offset: u32) -> OrbResult<()> {
        self.reader.seek(SeekFrom::Start(u64::from(offset)))?;
        Ok(())
    }
}

impl<R: Read + Seek> std::fmt::Debug for OrbFile<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrbFile")
            .field("header", &self.header)
            .field("catalog_entries", &self.catalog.len())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Seek to a resource and read exactly its size
///
/// The buffer grows with the bytes actually present, so a damaged size
/// field ends in an EOF error rather than a huge allocation.
pub(crate) fn read_blob<R: Read + Seek>(
    reader: &mut R,
    desc: &ResourceDescription,
) -> OrbResult<Vec<u8>> {
    reader.seek(SeekFrom::Start(u64::from(desc.offset)))?;
    let mut data = Vec::with_capacity(preallocation(desc.size));
    reader.by_ref().take(u64::from(desc.size)).read_to_end(&mut data)?;
    if data.len() != desc.size as usize {
        warn!(
            "Resource {} short read: {} of {} bytes",
            desc.name,
            data.len(),
            desc.size
        );
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
    }
    Ok(data)
}
