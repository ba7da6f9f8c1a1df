//! BibTeX parser implementation.
//!
//! Fetched citations arrive as BibTeX text; this module turns them into
//! [`CitationRecord`]s and, through [`writer`], back into BibTeX.
//!
//! # Example
//!
//! ```
//! use bibworm::{BibtexParser, CitationParser};
//!
//! let input = r#"@article{X1,
//!   title = {Example Title},
//!   year = 2020
//! }"#;
//!
//! let records = BibtexParser::new().parse(input).unwrap();
//! assert_eq!(records[0].id, "X1");
//! assert_eq!(records[0].field("year"), Some("2020"));
//! ```

mod parse;
mod structure;
pub mod writer;

use tracing::warn;

use crate::{BibwormError, CitationParser, CitationRecord, Result};
use parse::bibtex_parse;

/// Parser for BibTeX formatted citations.
#[derive(Debug, Clone, Default)]
pub struct BibtexParser;

impl BibtexParser {
    /// Creates a new BibTeX parser instance.
    ///
    /// # Examples
    ///
    /// ```
    /// use bibworm::BibtexParser;
    /// let parser = BibtexParser::new();
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parses text expected to describe a single publication.
    ///
    /// Sources sometimes append cross-referenced entries (proceedings
    /// volumes); only the first entry is kept.
    pub fn parse_one(&self, input: &str) -> Result<CitationRecord> {
        let mut records = self.parse(input)?;
        if records.len() > 1 {
            warn!(
                kept = %records[0].id,
                dropped = records.len() - 1,
                "ignoring additional entries in fetched BibTeX"
            );
        }
        Ok(records.swap_remove(0))
    }
}

impl CitationParser for BibtexParser {
    /// Parses a string containing one or more BibTeX entries.
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` if the text is not valid BibTeX and
    /// `InvalidFormat` if it holds no entry at all
    fn parse(&self, input: &str) -> Result<Vec<CitationRecord>> {
        let raw_entries = bibtex_parse(input)?;
        if raw_entries.is_empty() {
            return Err(BibwormError::InvalidFormat(
                "No valid citations found".into(),
            ));
        }

        let mut records = Vec::with_capacity(raw_entries.len());
        for raw in raw_entries {
            records.push(raw.try_into()?);
        }
        Ok(records)
    }
}
