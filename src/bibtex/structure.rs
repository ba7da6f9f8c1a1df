//! BibTeX intermediate data structures.
//!
//! Raw entries hold the fields of one parsed entry as BibTeX value text.
//! The conversion into a [`CitationRecord`] applies a first-wins policy for
//! repeated field names.

use tracing::debug;

use crate::{BibwormError, CitationRecord};

/// One `@type{key, ...}` block as parsed from BibTeX text.
#[derive(Debug, Clone)]
pub(crate) struct RawBibtexEntry {
    /// Lowercased entry type
    pub(crate) entry_type: String,
    /// Citation key, possibly empty for malformed input
    pub(crate) key: String,
    /// Lowercased field name/value pairs
    pub(crate) fields: Vec<(String, String)>,
}

impl RawBibtexEntry {
    pub(crate) fn new(entry_type: String) -> Self {
        Self {
            entry_type,
            key: String::new(),
            fields: Vec::new(),
        }
    }

    pub(crate) fn add_field(&mut self, name: String, value: String) {
        self.fields.push((name, value));
    }

    /// Get the first value for a field, if it exists.
    #[cfg(test)]
    pub(crate) fn get_first(&self, name: &str) -> Option<&String> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

impl TryFrom<RawBibtexEntry> for CitationRecord {
    type Error = BibwormError;

    fn try_from(raw: RawBibtexEntry) -> Result<Self, Self::Error> {
        if raw.key.is_empty() {
            return Err(BibwormError::InvalidFormat(format!(
                "@{} entry without a citation key",
                raw.entry_type
            )));
        }

        let mut record = CitationRecord::new(raw.key, raw.entry_type);
        for (name, value) in raw.fields {
            if record.fields.contains_key(&name) {
                debug!(id = %record.id, field = %name, "ignoring repeated field");
                continue;
            }
            record.fields.insert(name, value);
        }
        Ok(record)
    }
}
