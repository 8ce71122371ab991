use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::{ConfigPaths, StorageOptions};
use crate::journal::{Entry, Journal};

const JOURNAL_EXTENSION: &str = "json";
const JOURNAL_TMP_EXTENSION: &str = "json.tmp";

/// On-disk shape of a journal file. Timestamps are unix seconds.
#[derive(Debug, Serialize, Deserialize)]
struct JournalFile {
    name: String,
    entries: Vec<EntryRecord>,
    #[serde(default)]
    num_entries: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryRecord {
    id: String,
    content: String,
    created_at: i64,
}

impl EntryRecord {
    fn from_entry(entry: &Entry) -> Self {
        Self {
            id: entry.id.clone(),
            content: entry.content.clone(),
            created_at: entry.created_at.unix_timestamp(),
        }
    }

    fn into_entry(self) -> Entry {
        let created_at = OffsetDateTime::from_unix_timestamp(self.created_at)
            .unwrap_or_else(|_| OffsetDateTime::now_utc());
        Entry::from_parts(self.id, self.content, created_at)
    }
}

/// Handle over the directory holding one JSON file per journal.
#[derive(Debug, Clone)]
pub struct JournalStore {
    journal_dir: PathBuf,
    pretty: bool,
}

pub fn init(paths: &ConfigPaths, options: &StorageOptions) -> Result<JournalStore> {
    let journal_dir = if options.journal_dir.as_os_str().is_empty() {
        paths.journal_dir.clone()
    } else {
        options.journal_dir.clone()
    };
    fs::create_dir_all(&journal_dir)
        .with_context(|| format!("creating journal directory {}", journal_dir.display()))?;
    Ok(JournalStore {
        journal_dir,
        pretty: options.pretty,
    })
}

impl JournalStore {
    pub fn journal_dir(&self) -> &Path {
        &self.journal_dir
    }

    pub fn journal_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self
            .journal_dir
            .join(format!("{name}.{JOURNAL_EXTENSION}")))
    }

    /// Read a journal from disk. A journal that has never been saved loads
    /// as an empty journal, not an error.
    pub fn load(&self, name: &str) -> Result<Journal> {
        let path = self.journal_path(name)?;
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(Journal::empty(name));
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("reading journal {}", path.display()));
            }
        };

        let file: JournalFile = serde_json::from_slice(&raw)
            .with_context(|| format!("parsing journal {}", path.display()))?;
        if !file.name.is_empty() && file.name != name {
            tracing::warn!(
                requested = %name,
                stored = %file.name,
                "journal file carries a different name, keeping the requested one"
            );
        }
        let entries = file
            .entries
            .into_iter()
            .map(EntryRecord::into_entry)
            .collect();
        Ok(Journal::from_parts(name, entries, file.num_entries))
    }

    /// Persist a journal, replacing any previous file. The write goes to a
    /// sibling tmp file first and is renamed into place.
    pub fn save(&self, journal: &Journal) -> Result<()> {
        let file = JournalFile {
            name: journal.name().to_string(),
            entries: journal.entries().iter().map(EntryRecord::from_entry).collect(),
            num_entries: journal.num_entries(),
        };
        let json = if self.pretty {
            serde_json::to_vec_pretty(&file).context("serialising journal")?
        } else {
            serde_json::to_vec(&file).context("serialising journal")?
        };

        let final_path = self.journal_path(journal.name())?;
        fs::create_dir_all(&self.journal_dir)
            .with_context(|| format!("ensuring journal dir {}", self.journal_dir.display()))?;
        let tmp_path = final_path.with_extension(JOURNAL_TMP_EXTENSION);
        fs::write(&tmp_path, &json)
            .with_context(|| format!("writing temporary journal {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &final_path).with_context(|| {
            format!("atomically persisting journal {}", final_path.display())
        })?;
        tracing::debug!(
            journal = %journal.name(),
            bytes = json.len(),
            "saved journal to {}",
            final_path.display()
        );
        Ok(())
    }

    /// Names of the journals present in the journal directory, sorted.
    pub fn list_journals(&self) -> Result<Vec<String>> {
        let dir = match fs::read_dir(&self.journal_dir) {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("reading journal directory {}", self.journal_dir.display())
                })
            }
        };

        let mut names = Vec::new();
        for entry in dir {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(?err, "skipping unreadable directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(JOURNAL_EXTENSION) {
                continue;
            }
            match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(stem) => names.push(stem.to_string()),
                None => {
                    tracing::warn!("skipping journal with non-utf8 name {}", path.display());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("journal name cannot be empty");
    }
    if name.contains('/') || name.contains('\\') {
        bail!("journal name '{name}' cannot contain path separators");
    }
    if name.starts_with('.') {
        bail!("journal name '{name}' cannot start with a dot");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store(root: &TempDir) -> JournalStore {
        JournalStore {
            journal_dir: root.path().join("journals"),
            pretty: true,
        }
    }

    fn assert_entries_equivalent(left: &[Entry], right: &[Entry]) {
        assert_eq!(left.len(), right.len());
        for (a, b) in left.iter().zip(right) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.content, b.content);
            // Persistence is second-precision.
            assert_eq!(
                a.created_at.unix_timestamp(),
                b.created_at.unix_timestamp()
            );
        }
    }

    #[test]
    fn missing_journal_loads_empty() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = temp_store(&temp);
        let journal = store.load("default")?;
        assert_eq!(journal.name(), "default");
        assert!(journal.is_empty());
        assert_eq!(journal.num_entries(), 0);
        Ok(())
    }

    #[test]
    fn save_then_load_round_trips_entries() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = temp_store(&temp);

        let mut journal = store.load("daily")?;
        journal.append(Entry::new("first entry\n"));
        journal.append(Entry::new("second entry\nwith a second line\n"));
        store.save(&journal)?;

        let reloaded = store.load("daily")?;
        assert_eq!(reloaded.name(), "daily");
        assert_eq!(reloaded.num_entries(), 2);
        assert_entries_equivalent(journal.entries(), reloaded.entries());
        Ok(())
    }

    #[test]
    fn appending_n_entries_grows_count_by_n() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = temp_store(&temp);

        for n in 1..=5 {
            let mut journal = store.load("counted")?;
            assert_eq!(journal.num_entries(), n - 1);
            journal.append(Entry::new(format!("entry {n}\n")));
            store.save(&journal)?;
        }

        let journal = store.load("counted")?;
        assert_eq!(journal.num_entries(), 5);
        assert_eq!(journal.entries().len(), 5);
        Ok(())
    }

    #[test]
    fn save_leaves_no_tmp_residue() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = temp_store(&temp);

        let mut journal = store.load("tidy")?;
        journal.append(Entry::new("entry\n"));
        store.save(&journal)?;
        store.save(&journal)?;

        let files: Vec<_> = fs::read_dir(store.journal_dir())?
            .map(|e| e.expect("dir entry").file_name())
            .collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0], "tidy.json");
        Ok(())
    }

    #[test]
    fn stale_count_is_reconciled_on_load() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = temp_store(&temp);
        fs::create_dir_all(store.journal_dir())?;
        fs::write(
            store.journal_path("skewed")?,
            r#"{
                "name": "skewed",
                "entries": [
                    {"id": "2024010100000000001", "content": "only entry\n", "created_at": 1704067200}
                ],
                "num_entries": 9
            }"#,
        )?;

        let journal = store.load("skewed")?;
        assert_eq!(journal.num_entries(), 1);
        assert_eq!(journal.entries()[0].content, "only entry\n");
        Ok(())
    }

    #[test]
    fn corrupt_journal_is_an_error() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = temp_store(&temp);
        fs::create_dir_all(store.journal_dir())?;
        fs::write(store.journal_path("broken")?, "not json at all")?;

        let err = store.load("broken").unwrap_err();
        assert!(err.to_string().contains("parsing journal"));
        Ok(())
    }

    #[test]
    fn list_journals_returns_sorted_stems() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = temp_store(&temp);

        for name in ["work", "default", "travel"] {
            let mut journal = store.load(name)?;
            journal.append(Entry::new("entry\n"));
            store.save(&journal)?;
        }
        fs::write(store.journal_dir().join("notes.txt"), "ignored")?;

        let names = store.list_journals()?;
        assert_eq!(names, vec!["default", "travel", "work"]);
        Ok(())
    }

    #[test]
    fn list_journals_tolerates_missing_directory() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = temp_store(&temp);
        assert!(store.list_journals()?.is_empty());
        Ok(())
    }

    #[test]
    fn hostile_journal_names_are_rejected() {
        let temp = TempDir::new().expect("temp dir");
        let store = temp_store(&temp);
        for name in ["", "   ", "../escape", "a/b", "a\\b", ".hidden"] {
            assert!(store.journal_path(name).is_err(), "accepted {name:?}");
        }
    }
}
