//! Configuration for opening Orb/Bro archives

use serde::{Deserialize, Serialize};

use crate::error::{OrbError, OrbResult};
use crate::header::{BRO_VERSION, FormatVersion, ORB_VERSION};
use crate::name::NAME_SIZE;

/// Catalog name of the top-level game object
pub const ROOT_OBJECT_NAME: &str = "PinkGame";

/// Configuration for opening archives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbConfig {
    /// Orb version accepted by `open`
    pub orb_version: FormatVersion,

    /// Bro version accepted by `open`
    pub bro_version: FormatVersion,

    /// Reserved catalog name of the root game object
    pub root_object: String,

    /// Reject catalogs that are not sorted instead of trusting the producer
    pub require_sorted_catalog: bool,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            orb_version: ORB_VERSION,
            bro_version: BRO_VERSION,
            root_object: ROOT_OBJECT_NAME.to_string(),
            require_sorted_catalog: false,
        }
    }
}

impl OrbConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the accepted Orb version
    #[must_use]
    pub const fn with_orb_version(mut self, version: FormatVersion) -> Self {
        self.orb_version = version;
        self
    }

    /// Set the accepted Bro version
    #[must_use]
    pub const fn with_bro_version(mut self, version: FormatVersion) -> Self {
        self.bro_version = version;
        self
    }

    /// Set the root object name
    #[must_use]
    pub fn with_root_object(mut self, name: impl Into<String>) -> Self {
        self.root_object = name.into();
        self
    }

    /// Enable or disable catalog order verification on open
    #[must_use]
    pub const fn with_sorted_catalog_check(mut self, enable: bool) -> Self {
        self.require_sorted_catalog = enable;
        self
    }

    /// Check that the configuration can address a real archive
    pub fn validate(&self) -> OrbResult<()> {
        if self.root_object.is_empty() {
            return Err(OrbError::InvalidConfig(
                "root object name is empty".to_string(),
            ));
        }
        if self.root_object.len() >= NAME_SIZE {
            return Err(OrbError::InvalidConfig(format!(
                "root object name {:?} exceeds {} bytes",
                self.root_object,
                NAME_SIZE - 1
            )));
        }
        Ok(())
    }
}
