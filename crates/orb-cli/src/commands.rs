//! Subcommand handlers
//!
//! Each report builder works on already-opened archives so it can be driven
//! from in-memory images. [`handle`] does the file handling and printing.

use anyhow::{Context, Result};
use orb_formats::{
    BroFile, OrbConfig, OrbFile, OrbResult, ResourceDescription, ResourceManager,
    compare_ignore_case,
};
use serde::Serialize;
use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::{Commands, OutputFormat};

/// One catalog entry as reported by `info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    pub name: String,
    pub objects_offset: u32,
    pub objects_count: u32,
    pub resources_offset: u32,
    pub resources_count: u32,
}

/// Header and catalog overview of an Orb
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveInfo {
    pub version: String,
    pub timestamp: u32,
    pub catalog_offset: u32,
    pub objects: Vec<ObjectSummary>,
}

/// One resource table entry as reported by `resources`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSummary {
    pub name: String,
    pub offset: u32,
    pub size: u32,
    pub container: &'static str,
}

/// Outcome of `verify`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub objects_checked: usize,
    pub resources_checked: usize,
    pub problems: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

pub fn archive_info<R: Read + Seek>(orb: &OrbFile<R>) -> ArchiveInfo {
    let header = orb.header();
    ArchiveInfo {
        version: header.version.to_string(),
        timestamp: header.timestamp,
        catalog_offset: header.catalog_offset,
        objects: orb
            .catalog()
            .iter()
            .map(|desc| ObjectSummary {
                name: desc.name.to_string_lossy(),
                objects_offset: desc.objects_offset,
                objects_count: desc.objects_count,
                resources_offset: desc.resources_offset,
                resources_count: desc.resources_count,
            })
            .collect(),
    }
}

pub fn resource_listing<R: Read + Seek>(
    orb: &mut OrbFile<R>,
    object: &str,
) -> OrbResult<Vec<ResourceSummary>> {
    let desc = *orb.object_descriptor(object)?;
    let resources = ResourceManager::load(orb, &desc)?;
    Ok(resources.iter().map(summarize).collect())
}

pub fn extract_resource<R, B>(
    orb: &mut OrbFile<R>,
    bro: Option<&mut BroFile<B>>,
    object: &str,
    resource: &str,
) -> OrbResult<Vec<u8>>
where
    R: Read + Seek,
    B: Read + Seek,
{
    let desc = *orb.object_descriptor(object)?;
    let resources = ResourceManager::load(orb, &desc)?;
    resources.read(resource, orb, bro)
}

/// Walk every catalog entry and resource blob
///
/// Damage confined to one entry (truncated tables or blobs, missing sidecar,
/// ordering) is collected as a problem. Other failures abort the walk.
pub fn verify_archive<R, B>(
    orb: &mut OrbFile<R>,
    mut bro: Option<&mut BroFile<B>>,
) -> OrbResult<VerifyReport>
where
    R: Read + Seek,
    B: Read + Seek,
{
    let mut report = VerifyReport::default();
    if let Some(index) = orb.catalog().first_unsorted() {
        report
            .problems
            .push(format!("catalog out of order at entry {index}"));
    }

    let orb_len = orb.reader_mut().seek(SeekFrom::End(0))?;
    let entries = orb.catalog().entries().to_vec();

    for desc in &entries {
        report.objects_checked += 1;
        let object = desc.name.to_string_lossy();

        if u64::from(desc.objects_offset) > orb_len {
            report.problems.push(format!(
                "{object}: object data at {:#x} is past end of file",
                desc.objects_offset
            ));
        }

        let resources = match ResourceManager::load(orb, desc) {
            Ok(resources) => resources,
            Err(e) if e.is_truncated() => {
                report
                    .problems
                    .push(format!("{object}: resource table is truncated"));
                continue;
            }
            Err(e) => return Err(e),
        };

        let names: Vec<_> = resources.iter().map(|r| r.name).collect();
        if let Some(pair) = names
            .windows(2)
            .position(|w| compare_ignore_case(w[0].as_bytes(), w[1].as_bytes()).is_gt())
        {
            report.problems.push(format!(
                "{object}: resource table out of order at entry {}",
                pair + 1
            ));
        }

        for entry in resources.iter() {
            report.resources_checked += 1;
            let result = if entry.in_bro {
                match bro.as_deref_mut() {
                    Some(bro) => bro.read_resource(entry).map(drop),
                    None => {
                        report.problems.push(format!(
                            "{object}/{}: stored in a Bro that was not opened",
                            entry.name
                        ));
                        continue;
                    }
                }
            } else {
                orb.read_resource(entry).map(drop)
            };

            match result {
                Ok(()) => {}
                Err(e) if e.is_truncated() => report.problems.push(format!(
                    "{object}/{}: {} bytes at {:#x} run past end of {}",
                    entry.name,
                    entry.size,
                    entry.offset,
                    container_name(entry)
                )),
                Err(e) => return Err(e),
            }
        }
    }

    debug!(
        "Verified {} objects, {} resources, {} problems",
        report.objects_checked,
        report.resources_checked,
        report.problems.len()
    );
    Ok(report)
}

/// Default sidecar location: the Orb path with its extension swapped
pub fn sidecar_path(orb: &Path) -> PathBuf {
    let upper = orb
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.chars().all(|c| !c.is_ascii_lowercase()));
    orb.with_extension(if upper { "BRO" } else { "bro" })
}

pub fn handle(cmd: Commands, format: OutputFormat, config: &OrbConfig) -> Result<()> {
    match cmd {
        Commands::Info { orb } => {
            let orb = open_orb(&orb, config)?;
            print_info(&archive_info(&orb), format)?;
        }
        Commands::Resources { orb, object } => {
            let mut orb = open_orb(&orb, config)?;
            let listing = resource_listing(&mut orb, &object)
                .with_context(|| format!("Failed to list resources of {object}"))?;
            print_resources(&object, &listing, format)?;
        }
        Commands::Extract {
            orb: orb_path,
            object,
            resource,
            bro,
            output,
        } => {
            let mut orb = open_orb(&orb_path, config)?;
            let mut bro = open_sidecar(&orb_path, bro.as_deref(), orb.timestamp(), config)?;
            let data = extract_resource(&mut orb, bro.as_mut(), &object, &resource)
                .with_context(|| format!("Failed to extract {object}/{resource}"))?;

            if let Some(path) = output {
                fs::write(&path, &data)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Wrote {} bytes to {}", data.len(), path.display());
            } else {
                println!("{}", hex::encode(&data));
            }
        }
        Commands::Verify { orb: orb_path, bro } => {
            let mut orb = open_orb(&orb_path, config)?;
            let mut bro = open_sidecar(&orb_path, bro.as_deref(), orb.timestamp(), config)?;
            let report = verify_archive(&mut orb, bro.as_mut())?;
            print_verify(&report, format)?;
            if !report.is_clean() {
                anyhow::bail!("{} problems found", report.problems.len());
            }
        }
    }

    Ok(())
}

fn open_orb(path: &Path, config: &OrbConfig) -> Result<OrbFile> {
    OrbFile::open_with_config(path, config.clone())
        .with_context(|| format!("Failed to open Orb {}", path.display()))
}

/// Open the sidecar, requiring it only when the path was given explicitly
fn open_sidecar(
    orb_path: &Path,
    explicit: Option<&Path>,
    timestamp: u32,
    config: &OrbConfig,
) -> Result<Option<BroFile>> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = sidecar_path(orb_path);
            if !path.exists() {
                debug!("No sidecar at {}", path.display());
                return Ok(None);
            }
            path
        }
    };

    match BroFile::open_with_config(&path, timestamp, config) {
        Ok(bro) => Ok(Some(bro)),
        Err(e) if explicit.is_none() && e.is_integrity_failure() => {
            warn!("Ignoring {}: {}", path.display(), e);
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to open Bro {}", path.display())),
    }
}

fn summarize(entry: &ResourceDescription) -> ResourceSummary {
    ResourceSummary {
        name: entry.name.to_string_lossy(),
        offset: entry.offset,
        size: entry.size,
        container: container_name(entry),
    }
}

fn container_name(entry: &ResourceDescription) -> &'static str {
    if entry.in_bro { "bro" } else { "orb" }
}

fn print_info(info: &ArchiveInfo, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(info)?),
        OutputFormat::Text => {
            println!(
                "Orb v{}  timestamp {:#010x}  catalog at {:#x}",
                info.version, info.timestamp, info.catalog_offset
            );
            println!(
                "{:<16} {:>10} {:>8} {:>10} {:>9}",
                "Object", "Data", "Count", "Table", "Resources"
            );
            for object in &info.objects {
                println!(
                    "{:<16} {:>#10x} {:>8} {:>#10x} {:>9}",
                    object.name,
                    object.objects_offset,
                    object.objects_count,
                    object.resources_offset,
                    object.resources_count
                );
            }
            println!("{} objects", info.objects.len());
        }
    }
    Ok(())
}

fn print_resources(object: &str, listing: &[ResourceSummary], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(listing)?),
        OutputFormat::Text => {
            println!("Resources of {object}:");
            for entry in listing {
                println!(
                    "  {:<16} {:>10} bytes at {:>#10x} in {}",
                    entry.name, entry.size, entry.offset, entry.container
                );
            }
            println!("{} resources", listing.len());
        }
    }
    Ok(())
}

fn print_verify(report: &VerifyReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            println!(
                "Checked {} objects and {} resources",
                report.objects_checked, report.resources_checked
            );
            for problem in &report.problems {
                println!("  {problem}");
            }
            if report.is_clean() {
                println!("No problems found");
            }
        }
    }
    Ok(())
}
