//! Per-object resource lookup
//!
//! Each catalog entry owns a table of named resources. A
//! [`ResourceManager`] holds one such table for the object currently in use
//! and resolves resource names to bytes, reading from the Orb or from the
//! Bro sidecar depending on where the entry says the blob lives.

use std::io::{Read, Seek};
use tracing::trace;

use crate::bro::BroFile;
use crate::catalog::ObjectDescription;
use crate::error::{OrbError, OrbResult};
use crate::orb::OrbFile;
use crate::resource::ResourceDescription;

/// Resource table of one object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceManager {
    table: Vec<ResourceDescription>,
}

impl ResourceManager {
    /// Wrap a table already in producer order
    pub fn new(table: Vec<ResourceDescription>) -> Self {
        Self { table }
    }

    /// Load the resource table of a catalog entry
    pub fn load<R: Read + Seek>(
        orb: &mut OrbFile<R>,
        desc: &ObjectDescription,
    ) -> OrbResult<Self> {
        Ok(Self::new(orb.resource_table(desc)?))
    }

    /// Find a resource by case-insensitive name
    pub fn find(&self, name: &str) -> Option<&ResourceDescription> {
        self.table
            .binary_search_by(|entry| entry.name.cmp_name(name.as_bytes()))
            .ok()
            .map(|idx| &self.table[idx])
    }

    /// Size in bytes of a named resource
    pub fn resource_size(&self, name: &str) -> OrbResult<u32> {
        Ok(self.descriptor(name)?.size)
    }

    /// Read a named resource from whichever container holds it
    pub fn read<R, B>(
        &self,
        name: &str,
        orb: &mut OrbFile<R>,
        bro: Option<&mut BroFile<B>>,
    ) -> OrbResult<Vec<u8>>
    where
        R: Read + Seek,
        B: Read + Seek,
    {
        let desc = self.descriptor(name)?;
        trace!(
            "Reading resource {} ({} bytes at {:#x}, in_bro={})",
            desc.name, desc.size, desc.offset, desc.in_bro
        );

        if desc.in_bro {
            let bro = bro.ok_or_else(|| OrbError::SidecarMissing(name.to_string()))?;
            bro.read_resource(desc)
        } else {
            orb.read_resource(desc)
        }
    }

    /// Number of resources in the table
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True if the object has no resources
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Entries in producer order
    pub fn iter(&self) -> std::slice::Iter<'_, ResourceDescription> {
        self.table.iter()
    }

    /// Give the table back to the caller
    pub fn into_table(self) -> Vec<ResourceDescription> {
        self.table
    }

    fn descriptor(&self, name: &str) -> OrbResult<&ResourceDescription> {
        self.find(name)
            .ok_or_else(|| OrbError::ResourceNotFound(name.to_string()))
    }
}
