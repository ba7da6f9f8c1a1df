//! The citation database.
//!
//! A [`Store`] maps citation ids to [`CitationRecord`]s and lives in a single
//! YAML file that is read in full when a command starts and replaced in full
//! whenever it changes. Iteration follows insertion order, which is also the
//! order entries appear in the rendered bibliography.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::utils::write_atomic;
use crate::{BibwormError, CitationRecord, Result};

#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    records: IndexMap<String, CitationRecord>,
}

impl Store {
    /// Loads the database at `path`.
    ///
    /// A missing file is created empty (along with its directory) so that
    /// the first command establishes the initial state.
    ///
    /// # Errors
    ///
    /// `Yaml` if the file does not parse, `CorruptStore` if a key differs
    /// from the id of the record stored under it.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::File::create(path)?;
            info!(path = %path.display(), "created empty citation database");
            return Ok(Self::empty(path));
        }

        let text = std::fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Ok(Self::empty(path));
        }

        let records: Option<IndexMap<String, CitationRecord>> = serde_yaml::from_str(&text)?;
        let records = records.unwrap_or_default();
        if let Some((key, record)) = records.iter().find(|(key, record)| **key != record.id) {
            return Err(BibwormError::CorruptStore {
                path: path.to_path_buf(),
                message: format!("key '{key}' holds entry '{}'", record.id),
            });
        }

        debug!(path = %path.display(), entries = records.len(), "loaded citation database");
        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            records: IndexMap::new(),
        }
    }

    /// Replaces the backing file with the current content.
    ///
    /// Rendering the bibliography afterwards is the caller's job, see
    /// [`crate::Library`].
    pub fn save(&self) -> Result<()> {
        let text = serde_yaml::to_string(&self.records)?;
        write_atomic(&self.path, &text)?;
        debug!(path = %self.path.display(), entries = self.records.len(), "saved citation database");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&CitationRecord> {
        self.records.get(id)
    }

    /// Adds a record under its own id.
    ///
    /// # Errors
    ///
    /// `DuplicateIdentifier` if the id is already stored; the store is left
    /// unchanged.
    pub fn insert(&mut self, record: CitationRecord) -> Result<()> {
        if self.contains(&record.id) {
            return Err(BibwormError::DuplicateIdentifier(record.id));
        }
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Removes and returns the record stored under `id`.
    ///
    /// # Errors
    ///
    /// `NotFound` if no such record exists.
    pub fn remove(&mut self, id: &str) -> Result<CitationRecord> {
        self.records
            .shift_remove(id)
            .ok_or_else(|| BibwormError::NotFound(id.to_string()))
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &CitationRecord> {
        self.records.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(id: &str) -> CitationRecord {
        CitationRecord::new(id, "article")
            .with_field("title", &format!("Title of {id}"))
            .with_field("year", "2020")
    }

    #[test]
    fn test_load_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".bibworm").join("db.yml");

        let store = Store::load(&path).unwrap();
        assert!(store.is_empty());
        assert!(path.is_file());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        // The empty file reads back as an empty store
        assert!(Store::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_save_and_reload_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.yml");

        let mut store = Store::load(&path).unwrap();
        let mut with_condensed = record("DBLP:conf/x/B20");
        with_condensed.condensed = Some(Box::new(
            CitationRecord::new("DBLP:conf/x/B20", "inproceedings").with_field("title", "B"),
        ));
        store.insert(record("c")).unwrap();
        store.insert(with_condensed.clone()).unwrap();
        store.insert(record("a")).unwrap();
        store.save().unwrap();

        let reloaded = Store::load(&path).unwrap();
        assert_eq!(reloaded.ids().collect::<Vec<_>>(), vec!["c", "DBLP:conf/x/B20", "a"]);
        assert_eq!(reloaded.get("DBLP:conf/x/B20"), Some(&with_condensed));
    }

    #[test]
    fn test_insert_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::load(&dir.path().join("db.yml")).unwrap();
        store.insert(record("X1")).unwrap();

        let result = store.insert(record("X1").with_field("title", "Other"));
        assert!(matches!(result, Err(BibwormError::DuplicateIdentifier(id)) if id == "X1"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("X1").unwrap().field("title"), Some("Title of X1"));
    }

    #[test]
    fn test_remove_twice() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::load(&dir.path().join("db.yml")).unwrap();
        store.insert(record("a")).unwrap();
        store.insert(record("b")).unwrap();
        store.insert(record("c")).unwrap();

        assert_eq!(store.remove("b").unwrap().id, "b");
        assert!(matches!(store.remove("b"), Err(BibwormError::NotFound(id)) if id == "b"));
        assert_eq!(store.ids().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn test_load_rejects_mismatched_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.yml");
        std::fs::write(&path, "X1:\n  ID: X2\n  ENTRYTYPE: article\n  title: T\n").unwrap();

        assert!(matches!(
            Store::load(&path),
            Err(BibwormError::CorruptStore { .. })
        ));
    }

    #[test]
    fn test_load_hand_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.yml");
        std::fs::write(
            &path,
            "X1:\n  ID: X1\n  ENTRYTYPE: article\n  title: \"A Study\"\n  pub_year: '2020'\n",
        )
        .unwrap();

        let store = Store::load(&path).unwrap();
        let stored = store.get("X1").unwrap();
        assert_eq!(stored.entry_type, "article");
        assert_eq!(stored.field("pub_year"), Some("2020"));
    }

    #[test]
    fn test_load_unquoted_scalars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.yml");
        std::fs::write(
            &path,
            "X1:\n  ID: X1\n  ENTRYTYPE: article\n  title: A Study\n  year: 2020\n  volume: 3.5\n  open: true\n  note:\n",
        )
        .unwrap();

        let store = Store::load(&path).unwrap();
        let stored = store.get("X1").unwrap();
        assert_eq!(stored.field("year"), Some("2020"));
        assert_eq!(stored.field("volume"), Some("3.5"));
        assert_eq!(stored.field("open"), Some("true"));
        assert_eq!(stored.field("note"), Some(""));
    }
}
