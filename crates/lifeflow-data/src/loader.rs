//! Resolution pipeline: reads profile data files and builds a catalog.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and the
//! deserialization helpers the profile loader is built on. Individual
//! definitions that fail to resolve are skipped and reported rather than
//! aborting the load.

use crate::schema::{ProcessEntry, ProfileData, ResourceEntry, RuleEntry, SupplyEntry};
use lifeflow_core::catalog::{CatalogBuilder, CatalogError, ProfileCatalog};
use lifeflow_core::settings::SimulationSettings;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Whole-file failures. Problems inside a single definition never surface
/// here; they become [`SkippedDefinition`]s.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("profile directory {dir} has no '{file}' file")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("{file} is not a .ron, .toml or .json file")]
    UnsupportedFormat { file: PathBuf },

    /// The same base name exists in two formats.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("cannot parse {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Formats and discovery
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    /// Search order when looking for a base name.
    pub const ALL: [Format; 3] = [Format::Ron, Format::Toml, Format::Json];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }
}

pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    Format::ALL
        .into_iter()
        .find(|f| ext == Some(f.extension()))
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

/// Find `{base_name}.ron`, `.toml` or `.json` in `dir`. At most one of
/// them may exist.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut present = Format::ALL
        .into_iter()
        .map(|f| dir.join(format!("{base_name}.{}", f.extension())))
        .filter(|p| p.is_file());

    let Some(first) = present.next() else {
        return Ok(None);
    };
    match present.next() {
        Some(second) => Err(DataLoadError::ConflictingFormats {
            a: first,
            b: second,
        }),
        None => Ok(Some(first)),
    }
}

pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Deserialize text in the given format. `origin` only labels errors.
pub fn parse_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    origin: &Path,
) -> Result<T, DataLoadError> {
    let parse_error = |detail: String| DataLoadError::Parse {
        file: origin.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
    }
}

pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    parse_str(&std::fs::read_to_string(path)?, format, path)
}

/// A list file is a bare sequence in RON and JSON. TOML has no top-level
/// arrays, so there the list lives under `key` (`[[rules]]` and so on).
pub fn deserialize_list<T: DeserializeOwned>(path: &Path, key: &str) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    if format != Format::Toml {
        return parse_str(&content, format, path);
    }

    let mut table: toml::Table = parse_str(&content, format, path)?;
    match table.remove(key) {
        Some(list) => list.try_into().map_err(|e: toml::de::Error| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        // An empty file declares no entries.
        None if table.is_empty() => Ok(Vec::new()),
        None => Err(DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: format!("no '{key}' array"),
        }),
    }
}

// ===========================================================================
// Catalog resolution
// ===========================================================================

/// A definition that was left out of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedDefinition {
    /// `"resource"`, `"rule"`, `"process"` or `"supply"`.
    pub kind: &'static str,
    pub name: String,
    pub reason: CatalogError,
}

/// The result of loading a profile.
#[derive(Debug)]
pub struct LoadedProfile {
    pub catalog: ProfileCatalog,
    pub settings: SimulationSettings,
    pub skipped: Vec<SkippedDefinition>,
}

/// Build a catalog from parsed entries. Resources are registered first so
/// rules, processes and supplies can refer to any of them regardless of
/// order in the file.
pub fn build_catalog(profile: &ProfileData) -> (ProfileCatalog, Vec<SkippedDefinition>) {
    let mut builder = CatalogBuilder::new();
    let mut skipped = Vec::new();
    let mut note = |kind: &'static str, name: &str, result: Result<(), CatalogError>| {
        if let Err(reason) = result {
            log::warn!("skipping {kind} '{name}': {reason}");
            skipped.push(SkippedDefinition {
                kind,
                name: name.to_string(),
                reason,
            });
        }
    };

    for ResourceEntry { name, density } in &profile.resources {
        note(
            "resource",
            name,
            builder.register_resource(name, *density).map(drop),
        );
    }
    for entry in &profile.rules {
        note("rule", &entry.name, add_rule(&mut builder, entry));
    }
    for entry in &profile.processes {
        note("process", &entry.name, add_process(&mut builder, entry));
    }
    for entry in &profile.supplies {
        note("supply", &entry.resource, add_supply(&mut builder, entry));
    }

    let catalog = builder.build();
    log::debug!(
        "profile catalog: {} resources, {} rules, {} processes, {} supplies, {} skipped",
        catalog.resource_count(),
        catalog.rule_count(),
        catalog.process_count(),
        catalog.supply_count(),
        skipped.len()
    );
    (catalog, skipped)
}

fn add_rule(builder: &mut CatalogBuilder, entry: &RuleEntry) -> Result<(), CatalogError> {
    builder.add_rule(entry.to_spec()).map(drop)
}

fn add_process(builder: &mut CatalogBuilder, entry: &ProcessEntry) -> Result<(), CatalogError> {
    builder.add_process(entry.to_spec()?).map(drop)
}

fn add_supply(builder: &mut CatalogBuilder, entry: &SupplyEntry) -> Result<(), CatalogError> {
    builder.add_supply(entry.to_spec()).map(drop)
}

// ===========================================================================
// Entry points
// ===========================================================================

/// Load a profile from a directory.
///
/// `resources` is required; `rules`, `processes`, `supplies` and `settings`
/// are optional. Each may be RON, TOML, or JSON.
pub fn load_profile(dir: &Path) -> Result<LoadedProfile, DataLoadError> {
    let resources = deserialize_list(&require_data_file(dir, "resources")?, "resources")?;
    let profile = ProfileData {
        resources,
        rules: optional_list(dir, "rules")?,
        processes: optional_list(dir, "processes")?,
        supplies: optional_list(dir, "supplies")?,
    };
    let settings = match find_data_file(dir, "settings")? {
        Some(path) => deserialize_file(&path)?,
        None => SimulationSettings::default(),
    };

    let (catalog, skipped) = build_catalog(&profile);
    Ok(LoadedProfile {
        catalog,
        settings,
        skipped,
    })
}

/// Load a profile whose lists all live in one document, with default
/// settings.
pub fn load_profile_str(content: &str, format: Format) -> Result<LoadedProfile, DataLoadError> {
    let profile: ProfileData = parse_str(content, format, Path::new("<profile>"))?;
    let (catalog, skipped) = build_catalog(&profile);
    Ok(LoadedProfile {
        catalog,
        settings: SimulationSettings::default(),
        skipped,
    })
}

fn optional_list<T: DeserializeOwned>(dir: &Path, base_name: &str) -> Result<Vec<T>, DataLoadError> {
    match find_data_file(dir, base_name)? {
        Some(path) => deserialize_list(&path, base_name),
        None => Ok(Vec::new()),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
