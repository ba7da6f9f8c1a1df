//! Schema-driven tidying of citation records.
//!
//! [`normalize`] keeps only the fields the schema declares for a record's
//! entry type, backfills missing required fields from their synonyms, and
//! cleans every value so that the rendered bibliography never wraps a field
//! over several lines.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::CitationRecord;
use crate::config::{Requirement, Schema, SynonymTable};
use crate::regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Why a record could not be normalized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Entry type not provided in config file: {0}")]
    UnknownEntryType(String),

    #[error("Required field '{field}' not provided by entry {id}")]
    MissingRequiredField { id: String, field: String },
}

/// A record reduced to the schema's fields, ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub id: String,
    pub entry_type: String,
    /// Schema-declared fields in declaration order
    pub fields: IndexMap<String, String>,
}

/// Applies `schema` and `synonyms` to `record`.
///
/// # Errors
///
/// - [`Rejection::UnknownEntryType`] if the schema has no entry for the
///   record's type
/// - [`Rejection::MissingRequiredField`] if a required field is absent and
///   none of its synonyms is present
pub fn normalize(
    record: &CitationRecord,
    schema: &Schema,
    synonyms: &SynonymTable,
) -> Result<NormalizedRecord, Rejection> {
    let declared = schema
        .fields_for(&record.entry_type)
        .ok_or_else(|| Rejection::UnknownEntryType(record.entry_type.clone()))?;

    let mut fields = IndexMap::with_capacity(declared.len());
    for (field, requirement) in declared {
        let value = match requirement {
            Requirement::Required => Some(resolve_required(record, field, synonyms)?),
            Requirement::Optional => record.field(field),
        };
        if let Some(value) = value {
            fields.insert(field.clone(), clean_value(value));
        }
    }

    Ok(NormalizedRecord {
        id: record.id.clone(),
        entry_type: record.entry_type.clone(),
        fields,
    })
}

/// Value of a required field, falling back to the first synonym present.
fn resolve_required<'a>(
    record: &'a CitationRecord,
    field: &str,
    synonyms: &SynonymTable,
) -> Result<&'a str, Rejection> {
    record
        .field(field)
        .or_else(|| {
            synonyms
                .alternates(field)
                .iter()
                .find_map(|alternate| record.field(alternate))
        })
        .ok_or_else(|| Rejection::MissingRequiredField {
            id: record.id.clone(),
            field: field.to_string(),
        })
}

/// Cleans every field of `record` without applying a schema.
///
/// Used to preview records whose type the schema does not know.
pub fn clean_fields(record: &CitationRecord) -> NormalizedRecord {
    NormalizedRecord {
        id: record.id.clone(),
        entry_type: record.entry_type.clone(),
        fields: record
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), clean_value(value)))
            .collect(),
    }
}

/// Trims a value and folds line breaks and whitespace runs into single
/// spaces.
///
/// # Examples
///
/// ```
/// use bibworm::normalize::clean_value;
/// assert_eq!(clean_value("Line one\n\n  Line   two"), "Line one Line two");
/// ```
pub fn clean_value(value: &str) -> String {
    let unwrapped = value.trim().replace('\n', " ");
    WHITESPACE_RUN.replace_all(&unwrapped, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn article_schema() -> Schema {
        let mut schema = Schema::default();
        schema
            .declare("article", "title", Requirement::Required)
            .declare("article", "year", Requirement::Required)
            .declare("article", "doi", Requirement::Optional);
        schema
    }

    #[rstest]
    #[case("Line one\n\n  Line   two", "Line one Line two")]
    #[case("  padded  ", "padded")]
    #[case("single\nbreak", "single break")]
    #[case("tabs\t\tand  spaces", "tabs and spaces")]
    #[case("windows\r\nline", "windows line")]
    #[case("already clean", "already clean")]
    #[case("", "")]
    fn test_clean_value(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(clean_value(input), expected);
    }

    #[test]
    fn test_synonym_backfills_required_field() {
        let record = CitationRecord::new("X1", "article")
            .with_field("title", "A Study")
            .with_field("pub_year", "2020");

        let normalized = normalize(&record, &article_schema(), &SynonymTable::default()).unwrap();

        assert_eq!(normalized.id, "X1");
        assert_eq!(normalized.entry_type, "article");
        let fields: Vec<_> = normalized
            .fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(fields, vec![("title", "A Study"), ("year", "2020")]);
    }

    #[test]
    fn test_canonical_field_wins_over_synonym() {
        let record = CitationRecord::new("X1", "article")
            .with_field("title", "A Study")
            .with_field("pub_year", "1999")
            .with_field("year", "2020");

        let normalized = normalize(&record, &article_schema(), &SynonymTable::default()).unwrap();
        assert_eq!(normalized.fields["year"], "2020");
    }

    #[test]
    fn test_first_present_synonym_is_used() {
        let mut synonyms = SynonymTable::empty();
        synonyms.insert("year", vec!["pub_year".into(), "date".into()]);
        let record = CitationRecord::new("X1", "article")
            .with_field("title", "A Study")
            .with_field("date", "2021")
            .with_field("pub_year", "2020");

        let normalized = normalize(&record, &article_schema(), &synonyms).unwrap();
        assert_eq!(normalized.fields["year"], "2020");
    }

    #[rstest]
    #[case(CitationRecord::new("X2", "article").with_field("title", "No Year"))]
    #[case(CitationRecord::new("X2", "article").with_field("title", "No Year").with_field("date", "2020"))]
    fn test_missing_required_field(#[case] record: CitationRecord) {
        let result = normalize(&record, &article_schema(), &SynonymTable::default());
        assert_eq!(
            result,
            Err(Rejection::MissingRequiredField {
                id: "X2".to_string(),
                field: "year".to_string(),
            })
        );
    }

    #[rstest]
    #[case(CitationRecord::new("B1", "book"))]
    #[case(CitationRecord::new("B1", "book").with_field("title", "T").with_field("year", "2000"))]
    fn test_unknown_entry_type(#[case] record: CitationRecord) {
        let result = normalize(&record, &article_schema(), &SynonymTable::default());
        assert_eq!(result, Err(Rejection::UnknownEntryType("book".to_string())));
    }

    #[test]
    fn test_optional_and_undeclared_fields() {
        let record = CitationRecord::new("X3", "article")
            .with_field("abstract", "Dropped")
            .with_field("doi", " 10.1000/xyz ")
            .with_field("year", "2020")
            .with_field("title", "A\n  Study");

        let normalized = normalize(&record, &article_schema(), &SynonymTable::default()).unwrap();
        let fields: Vec<_> = normalized
            .fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![("title", "A Study"), ("year", "2020"), ("doi", "10.1000/xyz")]
        );
    }

    #[test]
    fn test_optional_fields_ignore_synonyms() {
        let mut schema = Schema::default();
        schema.declare("misc", "year", Requirement::Optional);
        let record = CitationRecord::new("M1", "misc").with_field("pub_year", "2020");

        let normalized = normalize(&record, &schema, &SynonymTable::default()).unwrap();
        assert!(normalized.fields.is_empty());
    }

    #[test]
    fn test_clean_fields_keeps_everything() {
        let record = CitationRecord::new("M1", "unpublished")
            .with_field("title", "  Draft\nnotes ")
            .with_field("note", "x");
        let cleaned = clean_fields(&record);
        assert_eq!(cleaned.fields.len(), 2);
        assert_eq!(cleaned.fields["title"], "Draft notes");
    }
}
