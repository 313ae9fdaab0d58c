use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use super::{HistoryError, HistoryResult};

/// Flat preferences storage: named sets of strings.
///
/// Implementations only need to be consistent with themselves; the history
/// store serializes every access.
pub trait KeyValueStore: Send {
    /// The set stored under `key`, empty when the key was never written.
    fn string_set(&self, key: &str) -> HistoryResult<BTreeSet<String>>;

    fn put_string_set(&mut self, key: &str, values: BTreeSet<String>) -> HistoryResult<()>;

    fn remove(&mut self, key: &str) -> HistoryResult<()>;
}

/// Preferences kept in memory only, for hosts without persistent storage.
#[derive(Debug, Default, Clone)]
pub struct MemoryPrefs {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl MemoryPrefs {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryPrefs {
    fn string_set(&self, key: &str) -> HistoryResult<BTreeSet<String>> {
        Ok(self.entries.get(key).cloned().unwrap_or_default())
    }

    fn put_string_set(&mut self, key: &str, values: BTreeSet<String>) -> HistoryResult<()> {
        self.entries.insert(key.to_owned(), values);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> HistoryResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Preferences persisted as one JSON object per namespace, `<namespace>.json`.
///
/// The file is read once on open and rewritten in full on every change, via
/// a temporary file and a rename so a crash never leaves half an index.
#[derive(Debug)]
pub struct PrefsFile {
    path: PathBuf,
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl PrefsFile {
    /// Opens the namespace in `dir`. An absent or empty file is an empty
    /// namespace.
    pub fn open(dir: &Path, namespace: &str) -> HistoryResult<Self> {
        let path = dir.join(format!("{namespace}.json"));
        let entries = match fs::read_to_string(&path) {
            Ok(json) if json.trim().is_empty() => BTreeMap::new(),
            Ok(json) => serde_json::from_str(&json)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        log::debug!("Opened preferences {}", path.display());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, BTreeSet<String>>) -> HistoryResult<()> {
        let json = serde_json::to_string_pretty(entries)?;
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let tmp = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

        fs::write(&tmp, json)?;
        if let Err(err) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }

    /// Applies `change` to a copy and only keeps it once it is on disk.
    fn update(
        &mut self,
        change: impl FnOnce(&mut BTreeMap<String, BTreeSet<String>>),
    ) -> HistoryResult<()> {
        let mut entries = self.entries.clone();
        change(&mut entries);
        self.persist(&entries)?;
        self.entries = entries;
        Ok(())
    }
}

impl KeyValueStore for PrefsFile {
    fn string_set(&self, key: &str) -> HistoryResult<BTreeSet<String>> {
        Ok(self.entries.get(key).cloned().unwrap_or_default())
    }

    fn put_string_set(&mut self, key: &str, values: BTreeSet<String>) -> HistoryResult<()> {
        self.update(|entries| {
            entries.insert(key.to_owned(), values);
        })
    }

    fn remove(&mut self, key: &str) -> HistoryResult<()> {
        if !self.entries.contains_key(key) {
            return Ok(());
        }
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_absent_and_empty_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = PrefsFile::open(dir.path(), "prefs").unwrap();
        assert!(prefs.string_set("history").unwrap().is_empty());

        fs::write(dir.path().join("blank.json"), "  \n").unwrap();
        let prefs = PrefsFile::open(dir.path(), "blank").unwrap();
        assert!(prefs.string_set("history").unwrap().is_empty());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = PrefsFile::open(dir.path(), "prefs").unwrap();
        prefs.put_string_set("history", set(&["a", "b"])).unwrap();
        prefs.put_string_set("other", set(&["c"])).unwrap();
        prefs.remove("other").unwrap();

        let reopened = PrefsFile::open(dir.path(), "prefs").unwrap();
        assert_eq!(reopened.string_set("history").unwrap(), set(&["a", "b"]));
        assert!(reopened.string_set("other").unwrap().is_empty());

        // No temporary files are left behind.
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("prefs.json")]);
    }

    #[test]
    fn test_failed_write_keeps_previous_values() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("gone");
        fs::create_dir(&root).unwrap();

        let mut prefs = PrefsFile::open(&root, "prefs").unwrap();
        prefs.put_string_set("history", set(&["a"])).unwrap();
        fs::remove_dir_all(&root).unwrap();

        assert!(matches!(
            prefs.put_string_set("history", set(&["a", "b"])),
            Err(HistoryError::Io(_))
        ));
        assert_eq!(prefs.string_set("history").unwrap(), set(&["a"]));
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("prefs.json"), "{ not json").unwrap();
        assert!(matches!(
            PrefsFile::open(dir.path(), "prefs"),
            Err(HistoryError::Index(_))
        ));
    }
}
