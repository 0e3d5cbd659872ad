//! Reader for Orb resource archives and their Bro sidecars
//!
//! An Orb is a timestamped, versioned container holding a catalog of named
//! objects. Each catalog entry points at the object's serialized fields and
//! at a table of named resource blobs. Blobs either live in the Orb itself or
//! in the matching Bro sidecar, which is tied to the Orb by sharing its
//! timestamp.
//!
//! # Reading
//!
//! ```text
//! open Orb ─► header ─► catalog (sorted, loaded once)
//!                          │
//!   name ─► binary search ─┴─► seek ─► Archive ─► T::load(archive)
//!                          │
//!                          └─► resource table ─► Orb or Bro blob
//! ```
//!
//! ```rust
//! use orb_formats::{Archive, BroFile, Loadable, OrbBuilder, OrbFile, OrbResult};
//! use std::io::Cursor;
//!
//! #[derive(Default)]
//! struct Page {
//!     id: u32,
//! }
//!
//! impl Loadable for Page {
//!     fn load(&mut self, archive: &mut Archive<'_>) -> OrbResult<()> {
//!         self.id = archive.read_dword()?;
//!         Ok(())
//!     }
//! }
//!
//! let mut builder = OrbBuilder::new(0x5EED);
//! builder.add_object("Intro", 7u32.to_le_bytes().to_vec())?;
//! builder.add_resource("Intro", "theme.wav", b"RIFF".to_vec(), true)?;
//! let built = builder.build()?;
//!
//! let mut orb = OrbFile::from_reader(Cursor::new(built.orb))?;
//! let bro = BroFile::from_reader(Cursor::new(built.bro.unwrap_or_default()), orb.timestamp())?;
//!
//! let mut page = Page::default();
//! orb.load_object(&mut page, "INTRO")?;
//! assert_eq!(page.id, 7);
//! assert_eq!(bro.timestamp(), 0x5EED);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::doc_markdown)] // Format names don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::similar_names)] // orb/bro naming pairs

pub mod archive;
mod bro;
mod builder;
pub mod catalog;
mod config;
mod error;
pub mod header;
pub mod name;
mod orb;
mod resource;
mod resource_manager;

pub use archive::{
    Archive, ClassFactory, ClassRegistry, Loadable, ObjectRef, ReadSeek, borrow_as, borrow_mut_as,
};
pub use bro::BroFile;
pub use builder::{BuiltArchive, OrbBuilder};
pub use catalog::{Catalog, ObjectDescription};
pub use config::{OrbConfig, ROOT_OBJECT_NAME};
pub use error::{ErrorKind, OrbError, OrbResult};
pub use header::{BRO_VERSION, BroHeader, FormatVersion, ORB_VERSION, OrbHeader};
pub use name::{FixedName, NAME_SIZE, compare_ignore_case};
pub use orb::OrbFile;
pub use resource::{RESOURCE_DESCRIPTION_SIZE, ResourceDescription};
pub use resource_manager::ResourceManager;

/// Most entries reserved up front for a table whose count comes from the file
const MAX_PREALLOC: usize = 1024;

/// Initial capacity for `count` entries read from an untrusted header
pub(crate) fn preallocation(count: u32) -> usize {
    (count as usize).min(MAX_PREALLOC)
}
