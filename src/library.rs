//! Command-level operations on a bibliography.
//!
//! A [`Library`] bundles the configuration and the citation database loaded
//! once at the start of a command. Every successful mutation is committed
//! the same way: the database file is replaced and the bibliography is
//! rendered again.

use std::path::Path;
use tracing::{info, warn};

use crate::bibtex::writer::format_entry;
use crate::confirm::Confirm;
use crate::normalize::{clean_fields, normalize};
use crate::render::{Rendered, write_bibliography};
use crate::source::{CatalogKey, CatalogSource, SecondarySource};
use crate::{BibtexParser, BibwormError, CitationRecord, Config, Result, Store};

/// What the user asked to add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// Catalog key, fetched directly
    Key(CatalogKey),
    /// Free-text title, resolved through search
    Title(String),
}

impl Identifier {
    pub fn parse(input: &str) -> Self {
        match CatalogKey::parse(input) {
            Some(key) => Identifier::Key(key),
            None => Identifier::Title(input.trim().to_string()),
        }
    }
}

/// Result of an add that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Stored under this id
    Added(String),
    /// The user declined the preview; nothing changed
    Declined(String),
}

pub struct Library {
    config: Config,
    store: Store,
}

impl Library {
    /// Loads the configuration at `config_path` and the database it names.
    pub fn open(config_path: &Path) -> Result<Self> {
        Self::with_config(Config::load(config_path)?)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let store = Store::load(&config.db_path())?;
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Adds a catalog key or a title, whichever `input` is.
    pub fn add(
        &mut self,
        input: &str,
        catalog: &dyn CatalogSource,
        secondary: &dyn SecondarySource,
        confirm: &mut dyn Confirm,
    ) -> Result<AddOutcome> {
        match Identifier::parse(input) {
            Identifier::Key(key) => self.add_by_key(&key, catalog, confirm),
            Identifier::Title(title) => self.add_by_title(&title, catalog, secondary, confirm),
        }
    }

    /// Fetches `key` from the catalog and adds it.
    ///
    /// A key already in the database fails with `DuplicateIdentifier`
    /// before any network access.
    pub fn add_by_key(
        &mut self,
        key: &CatalogKey,
        catalog: &dyn CatalogSource,
        confirm: &mut dyn Confirm,
    ) -> Result<AddOutcome> {
        if self.store.contains(key.as_str()) {
            return Err(BibwormError::DuplicateIdentifier(key.to_string()));
        }

        let entry = catalog.fetch(key)?;
        let parser = BibtexParser::new();

        let mut record = parser.parse_one(&entry.standard)?;
        if record.id != key.as_str() {
            warn!(%key, fetched = %record.id, "catalog returned a different key, keeping the requested one");
            record.id = key.to_string();
        }

        record.condensed = entry.condensed.and_then(|text| match parser.parse_one(&text) {
            Ok(mut condensed) => {
                condensed.id = key.to_string();
                Some(Box::new(condensed))
            }
            Err(e) => {
                warn!(%key, error = %e, "ignoring unreadable condensed record");
                None
            }
        });

        self.add_record(record, confirm)
    }

    /// Resolves a title to a catalog key.
    ///
    /// # Errors
    ///
    /// `NoSearchResult` if the catalog has no hit.
    pub fn resolve_title(&self, title: &str, catalog: &dyn CatalogSource) -> Result<CatalogKey> {
        catalog
            .search_title(title)?
            .ok_or_else(|| BibwormError::NoSearchResult(title.to_string()))
    }

    /// Adds the catalog's best match for `title`, falling back to the
    /// secondary source when the catalog cannot answer.
    pub fn add_by_title(
        &mut self,
        title: &str,
        catalog: &dyn CatalogSource,
        secondary: &dyn SecondarySource,
        confirm: &mut dyn Confirm,
    ) -> Result<AddOutcome> {
        match self.resolve_title(title, catalog) {
            Ok(key) => {
                info!(%title, %key, "found on DBLP");
                self.add_by_key(&key, catalog, confirm)
            }
            Err(BibwormError::NoSearchResult(_)) => {
                info!("Nothing found on DBLP, searching on Google Scholar...");
                self.add_from_secondary(title, secondary, confirm)
            }
            Err(BibwormError::FetchFailed(reason)) => {
                warn!(%reason, "DBLP search failed, searching on Google Scholar...");
                self.add_from_secondary(title, secondary, confirm)
            }
            Err(e) => Err(e),
        }
    }

    /// Adds the secondary source's best match for `query`.
    pub fn add_from_secondary(
        &mut self,
        query: &str,
        secondary: &dyn SecondarySource,
        confirm: &mut dyn Confirm,
    ) -> Result<AddOutcome> {
        let text = secondary
            .search(query)?
            .ok_or_else(|| BibwormError::NoSearchResult(query.to_string()))?;
        let record = BibtexParser::new().parse_one(&text)?;
        self.add_record(record, confirm)
    }

    /// Previews `record`, asks `confirm`, and on approval stores and commits
    /// it. On decline nothing changes.
    pub fn add_record(
        &mut self,
        record: CitationRecord,
        confirm: &mut dyn Confirm,
    ) -> Result<AddOutcome> {
        if self.store.contains(&record.id) {
            return Err(BibwormError::DuplicateIdentifier(record.id));
        }

        let preview = self.preview(&record);
        if !confirm.confirm(&preview)? {
            info!(id = %record.id, "Entry discarded");
            return Ok(AddOutcome::Declined(record.id));
        }

        let id = record.id.clone();
        self.store.insert(record)?;
        self.commit()?;
        info!(%id, "added entry");
        Ok(AddOutcome::Added(id))
    }

    /// BibTeX of `record` as it will appear in the bibliography.
    ///
    /// Records the schema rejects are shown with all their fields cleaned,
    /// and a warning says they will be left out.
    pub fn preview(&self, record: &CitationRecord) -> String {
        let shown = match &record.condensed {
            Some(condensed) if self.config.dblp_condensed => &**condensed,
            _ => record,
        };
        match normalize(shown, &self.config.entries, &self.config.synonyms) {
            Ok(normalized) => format_entry(&normalized),
            Err(rejection) => {
                warn!("{rejection}; the entry will not appear in the bibliography");
                format_entry(&clean_fields(shown))
            }
        }
    }

    /// Removes `id` and commits.
    ///
    /// # Errors
    ///
    /// `NotFound` if `id` is not stored; files are left untouched.
    pub fn delete(&mut self, id: &str) -> Result<CitationRecord> {
        let removed = self.store.remove(id)?;
        self.commit()?;
        info!(%id, "deleted entry");
        Ok(removed)
    }

    /// Renders the bibliography file from the current database.
    pub fn write(&self) -> Result<Rendered> {
        write_bibliography(&self.store, &self.config)
    }

    fn commit(&self) -> Result<Rendered> {
        self.store.save()?;
        self.write()
    }
}
