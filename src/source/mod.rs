//! Online citation sources.
//!
//! Sources hand back raw BibTeX text; parsing and validation happen in the
//! caller. Two roles exist:
//!
//! - a [`CatalogSource`] resolves catalog keys directly and can search its
//!   index by title (DBLP),
//! - a [`SecondarySource`] answers free-text queries with a single best
//!   record and is only consulted when the catalog has no match (Google
//!   Scholar).

pub mod dblp;
mod http;
pub mod scholar;

pub use dblp::DblpSource;
pub use http::{HttpClient, HttpError, HttpResponse};
pub use scholar::ScholarSource;

use std::fmt;

use crate::Result;

/// Prefix of DBLP catalog keys.
pub const DBLP_PREFIX: &str = "DBLP:";

/// A prefixed catalog key such as `DBLP:conf/nips/VaswaniSPUJGKP17`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogKey(String);

impl CatalogKey {
    /// Recognizes a catalog key, `None` for anything else.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let path = input.strip_prefix(DBLP_PREFIX)?;
        if path.is_empty() || path.chars().any(char::is_whitespace) {
            return None;
        }
        Some(Self(input.to_string()))
    }

    /// Builds a key from the unprefixed record path DBLP search returns.
    pub fn from_dblp_path(path: &str) -> Self {
        Self(format!("{DBLP_PREFIX}{path}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key without its prefix, as used in DBLP record URLs.
    pub fn path(&self) -> &str {
        &self.0[DBLP_PREFIX.len()..]
    }
}

impl fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw BibTeX of one catalog record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Full record
    pub standard: String,
    /// Condensed variant, when the catalog provides one
    pub condensed: Option<String>,
}

/// A publication index addressable by key.
pub trait CatalogSource {
    /// Downloads the record for `key`.
    ///
    /// # Errors
    ///
    /// `FetchFailed` if the service cannot be reached or does not know the key
    fn fetch(&self, key: &CatalogKey) -> Result<CatalogEntry>;

    /// Finds the best-matching key for a free-text title, `None` on zero
    /// hits.
    fn search_title(&self, title: &str) -> Result<Option<CatalogKey>>;
}

/// A fallback source answering free-text queries.
pub trait SecondarySource {
    /// Raw BibTeX of the best match for `query`, `None` if nothing matches.
    fn search(&self, query: &str) -> Result<Option<String>>;
}
