//! A personal bibliography manager: fetch citations, keep them in a local
//! database, tidy them against a schema, and render one BibTeX file.
//!
//! `bibworm` pulls citation records from online sources (DBLP, Google
//! Scholar), stores them in a YAML database keyed by citation id, and writes
//! a single `.bib` file in which every entry has been filtered and cleaned
//! according to a user-defined schema.
//!
//! # Key Features
//!
//! - **Schema-driven tidying**: every entry type lists its `required` and
//!   `optional` fields; anything else is dropped on render.
//! - **Synonyms**: a required field missing from a record can be backfilled
//!   from an alternate field name (e.g. `pub_year` for `year`).
//! - **Deduplication by key**: a citation id is stored at most once, and a
//!   known DBLP key never triggers a network request.
//! - **Reviewed writes**: every addition is previewed and confirmed before it
//!   reaches the database.
//!
//! # Basic Usage
//!
//! ```rust
//! use bibworm::{BibtexParser, CitationParser};
//! use bibworm::config::{Requirement, Schema, SynonymTable};
//! use bibworm::normalize::normalize;
//!
//! let input = r#"@article{X1,
//!   title = {A   Study},
//!   pub_year = {2020}
//! }"#;
//! let record = BibtexParser::new().parse(input).unwrap().remove(0);
//!
//! let mut schema = Schema::default();
//! schema.declare("article", "title", Requirement::Required);
//! schema.declare("article", "year", Requirement::Required);
//!
//! let normalized = normalize(&record, &schema, &SynonymTable::default()).unwrap();
//! assert_eq!(normalized.fields["title"], "A Study");
//! assert_eq!(normalized.fields["year"], "2020");
//! ```
//!
//! # Error Handling
//!
//! The library uses a custom [`Result`] type that wraps [`BibwormError`].
//! Per-record normalization failures are reported separately as
//! [`normalize::Rejection`] so that batch rendering can skip a record and
//! carry on.

use indexmap::IndexMap;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub mod bibtex;
pub mod config;
pub mod confirm;
pub mod library;
pub mod normalize;
pub mod render;
pub mod source;
pub mod store;
mod regex;
mod utils;

// Reexports
pub use bibtex::BibtexParser;
pub use config::Config;
pub use library::{AddOutcome, Identifier, Library};
pub use store::Store;

/// A specialized Result type for bibliography operations.
pub type Result<T> = std::result::Result<T, BibwormError>;

/// Errors surfaced by bibliography operations.
#[derive(Error, Debug)]
pub enum BibwormError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("No configuration file found at {}", .0.display())]
    ConfigMissing(PathBuf),

    #[error("Entry type not provided in config file: {0}")]
    UnknownEntryType(String),

    #[error("Required field '{field}' not provided by entry {id}")]
    MissingRequiredField { id: String, field: String },

    #[error("Already stored in the database: {0}")]
    DuplicateIdentifier(String),

    #[error("Entry {0} not found")]
    NotFound(String),

    #[error("Failed to download entry: {0}")]
    FetchFailed(String),

    #[error("Nothing found for '{0}'")]
    NoSearchResult(String),

    #[error("Parse error: {0}")]
    InvalidFormat(String),

    #[error("Malformed input: {message} at line {line}")]
    MalformedInput { message: String, line: usize },

    #[error("Corrupt database {}: {message}", path.display())]
    CorruptStore { path: PathBuf, message: String },
}

impl From<normalize::Rejection> for BibwormError {
    fn from(rejection: normalize::Rejection) -> Self {
        match rejection {
            normalize::Rejection::UnknownEntryType(entry_type) => {
                BibwormError::UnknownEntryType(entry_type)
            }
            normalize::Rejection::MissingRequiredField { id, field } => {
                BibwormError::MissingRequiredField { id, field }
            }
        }
    }
}

impl From<source::HttpError> for BibwormError {
    fn from(err: source::HttpError) -> Self {
        BibwormError::FetchFailed(err.to_string())
    }
}

/// A single citation as fetched from its origin and kept in the database.
///
/// In the database file a record is a flat mapping: `ID`, `ENTRYTYPE`, every
/// BibTeX field, and optionally the `condensed` variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationRecord {
    /// Citation key, unique across the database
    #[serde(rename = "ID", deserialize_with = "scalar_text")]
    pub id: String,
    /// Lowercased BibTeX entry type (`article`, `inproceedings`, ...)
    #[serde(rename = "ENTRYTYPE")]
    pub entry_type: String,
    /// Field name to raw value, in source order
    #[serde(flatten, deserialize_with = "scalar_fields")]
    pub fields: IndexMap<String, String>,
    /// Condensed DBLP variant of the same publication, if one was fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condensed: Option<Box<CitationRecord>>,
}

impl CitationRecord {
    pub fn new(id: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entry_type: entry_type.into().to_lowercase(),
            fields: IndexMap::new(),
            condensed: None,
        }
    }

    /// Builder-style field insertion, mostly for fixtures.
    #[must_use]
    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.set_field(name, value);
        self
    }

    pub fn set_field(&mut self, name: &str, value: &str) {
        self.fields.insert(name.to_lowercase(), value.to_string());
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Any YAML scalar read as text, so that hand edits such as `year: 2020`
/// load like their quoted form.
struct ScalarText(String);

impl<'de> Deserialize<'de> for ScalarText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor)
    }
}

struct ScalarVisitor;

impl Visitor<'_> for ScalarVisitor {
    type Value = ScalarText;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string, number or boolean")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<ScalarText, E> {
        Ok(ScalarText(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<ScalarText, E> {
        Ok(ScalarText(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<ScalarText, E> {
        Ok(ScalarText(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<ScalarText, E> {
        Ok(ScalarText(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<ScalarText, E> {
        Ok(ScalarText(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<ScalarText, E> {
        Ok(ScalarText(v.to_string()))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<ScalarText, E> {
        Ok(ScalarText(String::new()))
    }
}

fn scalar_text<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    ScalarText::deserialize(deserializer).map(|ScalarText(text)| text)
}

fn scalar_fields<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<IndexMap<String, String>, D::Error> {
    let fields = IndexMap::<String, ScalarText>::deserialize(deserializer)?;
    Ok(fields
        .into_iter()
        .map(|(name, ScalarText(value))| (name, value))
        .collect())
}

/// Trait for implementing citation parsers.
pub trait CitationParser {
    /// Parse a string containing one or more citations.
    ///
    /// # Errors
    ///
    /// Returns `BibwormError::InvalidFormat` if the input is malformed
    fn parse(&self, input: &str) -> Result<Vec<CitationRecord>>;
}
