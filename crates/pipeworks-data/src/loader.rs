//! Resolution pipeline: reads data files, resolves cross-references, builds
//! the fluid registry, producer table and settings.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers used by [`load_fluid_data`].

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pipeworks_core::fixed::Fixed64;
use pipeworks_core::id::FluidTypeId;
use pipeworks_core::registry::{FluidRegistry, FluidRegistryBuilder, FluidTag, RegistryError};
use pipeworks_fluid::{ConstantProducer, FluidSettings};

use crate::schema::{FluidTypeData, ProducerData, SettingsData};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// A numeric field is out of range.
    #[error("invalid value in {file}: {detail}")]
    InvalidValue { file: PathBuf, detail: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for `{base_name}.ron`, `.toml` or `.json`.
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. For TOML files, extracts the array at
/// `toml_key` from the top-level table. RON and JSON hold the list directly.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    match detect_format(path)? {
        Format::Toml => {
            let content = std::fs::read_to_string(path)?;
            let table: toml::Table = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table
                .get(toml_key)
                .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
                .clone();
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
        Format::Ron | Format::Json => deserialize_file(path),
    }
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Return a `DuplicateName` error if `name` is already in `map`.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Convert a non-negative, finite data-file number to a fixed-point amount.
fn amount_from_f64(value: f64, file: &Path, field: &str) -> Result<Fixed64, DataLoadError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DataLoadError::InvalidValue {
            file: file.to_path_buf(),
            detail: format!("{field} must be a finite non-negative number, got {value}"),
        });
    }
    Fixed64::checked_from_num(value).ok_or_else(|| DataLoadError::InvalidValue {
        file: file.to_path_buf(),
        detail: format!("{field} {value} is out of range"),
    })
}

// ===========================================================================
// Loading pipeline
// ===========================================================================

/// Everything loaded from a data directory.
#[derive(Debug)]
pub struct FluidData {
    pub registry: FluidRegistry,
    pub settings: FluidSettings,
    /// Producer types by name.
    pub producers: HashMap<String, ConstantProducer>,
}

impl FluidData {
    pub fn fluid_id(&self, name: &str) -> Option<FluidTypeId> {
        self.registry.fluid_id(name)
    }

    /// A fresh producer of the named type.
    pub fn producer(&self, name: &str) -> Option<ConstantProducer> {
        self.producers.get(name).cloned()
    }
}

/// Load `fluids` (required), `producers` and `settings` (optional) from
/// `dir`.
pub fn load_fluid_data(dir: &Path) -> Result<FluidData, DataLoadError> {
    let fluids_path = require_data_file(dir, "fluids")?;
    let fluid_defs: Vec<FluidTypeData> = deserialize_list(&fluids_path, "fluids")?;

    let mut builder = FluidRegistryBuilder::new();
    let mut fluid_ids: HashMap<String, FluidTypeId> = HashMap::new();
    for def in &fluid_defs {
        check_duplicate(&fluid_ids, &def.name, &fluids_path)?;
        let id = builder.register_fluid(&def.name)?;
        if let Some(temperature) = def.temperature {
            builder.add_tag(&def.name, FluidTag::Temperature(temperature.into()))?;
        }
        if def.gaseous {
            builder.add_tag(&def.name, FluidTag::Gaseous)?;
        }
        fluid_ids.insert(def.name.clone(), id);
    }
    let registry = builder.build();

    let mut producers = HashMap::new();
    if let Some(path) = find_data_file(dir, "producers")? {
        let defs: Vec<ProducerData> = deserialize_list(&path, "producers")?;
        for def in defs {
            check_duplicate(&producers, &def.name, &path)?;
            let fluid = *resolve_name(&fluid_ids, &def.fluid, &path, "fluid")?;
            let rate = amount_from_f64(def.rate, &path, "rate")?;
            producers.insert(def.name, ConstantProducer::new(fluid, rate));
        }
    }

    let settings = match find_data_file(dir, "settings")? {
        Some(path) => {
            let data: SettingsData = deserialize_file(&path)?;
            resolve_settings(data, &path)?
        }
        None => FluidSettings::default(),
    };

    log::debug!(
        "loaded {} fluids and {} producer types from {}",
        registry.len(),
        producers.len(),
        dir.display()
    );

    Ok(FluidData {
        registry,
        settings,
        producers,
    })
}

fn resolve_settings(data: SettingsData, file: &Path) -> Result<FluidSettings, DataLoadError> {
    let mut settings = FluidSettings::default();
    if let Some(interval) = data.tick_interval {
        settings.tick_interval = interval;
    }
    if let Some(interval) = data.reference_interval {
        if interval == 0 {
            return Err(DataLoadError::InvalidValue {
                file: file.to_path_buf(),
                detail: "reference_interval must be at least 1".to_string(),
            });
        }
        settings.reference_interval = interval;
    }
    if let Some(rate) = data.max_edge_rate {
        settings.max_edge_rate = Some(amount_from_f64(rate, file, "max_edge_rate")?);
    }
    if let Some(rate) = data.max_component_rate {
        settings.max_component_rate = Some(amount_from_f64(rate, file, "max_component_rate")?);
    }
    if let Some(tie_break) = data.tie_break {
        settings.tie_break = tie_break.into();
    }
    if let Some(epsilon) = data.supply_epsilon {
        settings.supply_epsilon = amount_from_f64(epsilon, file, "supply_epsilon")?;
    }
    Ok(settings)
}

// ===========================================================================
// Tests
// ===========================================================================
