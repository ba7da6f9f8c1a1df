//! Rendering the database into the bibliography file.

use tracing::{info, warn};

use crate::bibtex::writer::format_entries;
use crate::config::{Config, Schema, SynonymTable};
use crate::normalize::{Rejection, normalize};
use crate::store::Store;
use crate::utils::write_atomic;
use crate::{CitationRecord, Result};

/// Outcome of a render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    /// Bibliography text
    pub text: String,
    /// Number of entries written
    pub entries: usize,
    /// Records left out, with the reason
    pub skipped: Vec<Rejection>,
}

/// Normalizes `records` and formats the ones that pass, in iteration
/// order. Rejected records are logged and skipped.
pub fn render_records<'a>(
    records: impl IntoIterator<Item = &'a CitationRecord>,
    schema: &Schema,
    synonyms: &SynonymTable,
) -> Rendered {
    let mut normalized = Vec::new();
    let mut skipped = Vec::new();

    for record in records {
        match normalize(record, schema, synonyms) {
            Ok(entry) => normalized.push(entry),
            Err(rejection) => {
                warn!(id = %record.id, "skipping entry: {rejection}");
                skipped.push(rejection);
            }
        }
    }

    Rendered {
        text: format_entries(&normalized),
        entries: normalized.len(),
        skipped,
    }
}

/// Renders every record of `store` with the configured schema.
///
/// When `dblp_condensed` is set, records carrying a condensed DBLP variant
/// are rendered from that variant.
pub fn render(store: &Store, config: &Config) -> Rendered {
    let records = store.iter().map(|record| match &record.condensed {
        Some(condensed) if config.dblp_condensed => &**condensed,
        _ => record,
    });
    render_records(records, &config.entries, &config.synonyms)
}

/// Renders `store` and replaces the configured bibliography file.
pub fn write_bibliography(store: &Store, config: &Config) -> Result<Rendered> {
    let rendered = render(store, config);
    let path = config.bib_path();
    write_atomic(&path, &rendered.text)?;
    info!(
        path = %path.display(),
        entries = rendered.entries,
        skipped = rendered.skipped.len(),
        "wrote bibliography"
    );
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Requirement;
    use pretty_assertions::assert_eq;

    fn config(dir: &std::path::Path, condensed: bool) -> Config {
        let yaml = format!(
            "bib_file: refs.bib\ndblp_condensed: {condensed}\nentries:\n  article:\n    title: required\n    year: required\n  inproceedings:\n    title: required\n"
        );
        Config::from_yaml(&yaml).unwrap().with_base_dir(dir)
    }

    fn store_with(dir: &std::path::Path, records: Vec<CitationRecord>) -> Store {
        let mut store = Store::load(&dir.join("db.yml")).unwrap();
        for record in records {
            store.insert(record).unwrap();
        }
        store
    }

    #[test]
    fn test_render_skips_rejected_records() {
        let mut schema = Schema::default();
        schema
            .declare("article", "title", Requirement::Required)
            .declare("article", "year", Requirement::Required);
        let records = vec![
            CitationRecord::new("A", "article")
                .with_field("title", "First")
                .with_field("year", "2001"),
            CitationRecord::new("B", "book").with_field("title", "Skipped"),
            CitationRecord::new("C", "article").with_field("title", "No year"),
            CitationRecord::new("D", "article")
                .with_field("title", "Last")
                .with_field("pub_year", "2004"),
        ];

        let rendered = render_records(&records, &schema, &SynonymTable::default());

        assert_eq!(rendered.entries, 2);
        assert_eq!(
            rendered.text,
            "@article{A,\n  title = {First},\n  year = 2001,\n}\n\n@article{D,\n  title = {Last},\n  year = 2004,\n}\n"
        );
        assert_eq!(
            rendered.skipped,
            vec![
                Rejection::UnknownEntryType("book".to_string()),
                Rejection::MissingRequiredField {
                    id: "C".to_string(),
                    field: "year".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_render_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(dir.path(), vec![]);
        let rendered = render(&store, &config(dir.path(), false));
        assert_eq!(rendered, Rendered::default());
    }

    #[test]
    fn test_condensed_variant() {
        let dir = tempfile::tempdir().unwrap();
        let mut record = CitationRecord::new("DBLP:conf/x/A20", "inproceedings")
            .with_field("title", "Full Title");
        record.condensed = Some(Box::new(
            CitationRecord::new("DBLP:conf/x/A20", "inproceedings").with_field("title", "Short"),
        ));
        let store = store_with(dir.path(), vec![record]);

        let full = render(&store, &config(dir.path(), false));
        assert!(full.text.contains("title = {Full Title}"));

        let condensed = render(&store, &config(dir.path(), true));
        assert!(condensed.text.contains("title = {Short}"));
    }

    #[test]
    fn test_write_bibliography_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), false);
        std::fs::write(config.bib_path(), "stale content that must disappear").unwrap();

        let store = store_with(
            dir.path(),
            vec![CitationRecord::new("A", "article")
                .with_field("title", "T")
                .with_field("year", "2020")],
        );
        let rendered = write_bibliography(&store, &config).unwrap();

        assert_eq!(rendered.entries, 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("refs.bib")).unwrap(),
            "@article{A,\n  title = {T},\n  year = 2020,\n}\n"
        );
    }
}
