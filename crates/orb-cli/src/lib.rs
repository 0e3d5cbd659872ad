//! Command-line inspection of Orb resource archives
//!
//! The binary is a thin layer over [`orb_formats`]. Reports are built by the
//! functions in [`commands`] and printed as text or JSON.

pub mod commands;
pub mod config;

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the header and catalog of an Orb
    Info {
        /// Path to the Orb file
        orb: PathBuf,
    },

    /// List the resources of one object
    Resources {
        /// Path to the Orb file
        orb: PathBuf,

        /// Catalog name of the object (case-insensitive)
        object: String,
    },

    /// Extract one resource blob
    Extract {
        /// Path to the Orb file
        orb: PathBuf,

        /// Catalog name of the object (case-insensitive)
        object: String,

        /// Resource name (case-insensitive)
        resource: String,

        /// Path to the Bro sidecar, defaults to the Orb path with a .bro extension
        #[arg(long)]
        bro: Option<PathBuf>,

        /// Write the blob here instead of printing it as hex
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Check catalog order, resource tables and sidecar pairing
    Verify {
        /// Path to the Orb file
        orb: PathBuf,

        /// Path to the Bro sidecar, defaults to the Orb path with a .bro extension
        #[arg(long)]
        bro: Option<PathBuf>,
    },
}
