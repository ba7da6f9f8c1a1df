//! Configuration parsing and management.
//!
//! The configuration file (`bibworm.yml`) holds the output path, the schema
//! that decides which fields of each entry type end up in the bibliography,
//! and the synonym table used to backfill required fields.
//!
//! ```yaml
//! bib_file: references.bib
//! synonyms:
//!   year: [pub_year]
//! entries:
//!   article:
//!     author: required
//!     title: required
//!     doi: optional
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::utils::{resolve_path, write_atomic};
use crate::{BibwormError, Result};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "bibworm.yml";

/// Default database location, relative to the configuration file.
pub const DEFAULT_DB_FILE: &str = ".bibworm/db.yml";

/// Template written by `worm init`.
pub const TEMPLATE: &str = include_str!("../templates/bibworm.yml");

/// Whether a schema field must be present in an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    #[serde(alias = "r")]
    Required,
    #[serde(alias = "o")]
    Optional,
}

/// Entry type to ordered field requirements.
///
/// Field order is the order fields are written to the bibliography. Names
/// are lowercased, like those of parsed records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Schema(IndexMap<String, IndexMap<String, Requirement>>);

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let declared = IndexMap::<String, IndexMap<String, Requirement>>::deserialize(deserializer)?;
        let mut schema = Schema::default();
        for (entry_type, fields) in declared {
            schema.0.entry(entry_type.to_lowercase()).or_default();
            for (field, requirement) in fields {
                schema.declare(&entry_type, &field, requirement);
            }
        }
        Ok(schema)
    }
}

impl Schema {
    /// Declares `field` of `entry_type`, replacing any earlier requirement.
    pub fn declare(&mut self, entry_type: &str, field: &str, requirement: Requirement) -> &mut Self {
        self.0
            .entry(entry_type.to_lowercase())
            .or_default()
            .insert(field.to_lowercase(), requirement);
        self
    }

    /// Field requirements for `entry_type`, `None` for unknown types.
    pub fn fields_for(&self, entry_type: &str) -> Option<&IndexMap<String, Requirement>> {
        self.0.get(entry_type)
    }

    pub fn entry_types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Canonical field name to the alternate names that may stand in for it.
///
/// Lookup is one level deep: an alternate is never resolved further.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SynonymTable(IndexMap<String, Vec<String>>);

impl<'de> Deserialize<'de> for SynonymTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let declared = IndexMap::<String, Vec<String>>::deserialize(deserializer)?;
        let mut table = SynonymTable::empty();
        for (field, alternates) in declared {
            table.insert(&field, alternates);
        }
        Ok(table)
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.insert("year", vec!["pub_year".to_string()]);
        table
    }
}

impl SynonymTable {
    /// A table without any synonym.
    #[must_use]
    pub fn empty() -> Self {
        Self(IndexMap::new())
    }

    pub fn insert(&mut self, field: &str, alternates: Vec<String>) -> &mut Self {
        let alternates = alternates.iter().map(|name| name.to_lowercase()).collect();
        self.0.insert(field.to_lowercase(), alternates);
        self
    }

    /// Alternates for `field` in priority order.
    pub fn alternates(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Main configuration struct matching the `bibworm.yml` layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Output bibliography path
    pub bib_file: PathBuf,

    #[serde(default = "default_db_file")]
    pub db_file: PathBuf,

    /// Render the condensed DBLP variant of entries that carry one
    #[serde(default, deserialize_with = "yes_or_no")]
    pub dblp_condensed: bool,

    #[serde(default)]
    pub synonyms: SynonymTable,

    #[serde(default)]
    pub entries: Schema,

    // Directory of the config file, for relative path resolution
    #[serde(skip)]
    config_dir: PathBuf,
}

fn default_db_file() -> PathBuf {
    PathBuf::from(DEFAULT_DB_FILE)
}

/// Accepts YAML booleans as well as the `y`/`n` answers older configs use.
fn yes_or_no<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Text(text) => match text.trim().to_lowercase().as_str() {
            "y" | "yes" | "true" => Ok(true),
            "n" | "no" | "false" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected y/n, found '{other}'"
            ))),
        },
    }
}

impl Config {
    /// Loads the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// `ConfigMissing` if the file does not exist, `Yaml` if it does not
    /// parse.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(BibwormError::ConfigMissing(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&text)?;
        config.config_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    /// Parses a configuration from YAML text; relative paths resolve against
    /// the working directory.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Rebases relative paths onto `dir`.
    #[must_use]
    pub fn with_base_dir(mut self, dir: &Path) -> Self {
        self.config_dir = dir.to_path_buf();
        self
    }

    /// Writes the bundled template to `path`.
    ///
    /// Returns `false` without touching the file if it already exists and
    /// `force` is not set.
    pub fn write_template(path: &Path, force: bool) -> Result<bool> {
        if path.exists() && !force {
            return Ok(false);
        }
        write_atomic(path, TEMPLATE)?;
        Ok(true)
    }

    /// Absolute (or working-directory relative) path of the bibliography.
    pub fn bib_path(&self) -> PathBuf {
        resolve_path(&self.config_dir, &self.bib_file)
    }

    /// Path of the citation database.
    pub fn db_path(&self) -> PathBuf {
        resolve_path(&self.config_dir, &self.db_file)
    }
}
