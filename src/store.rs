//! Completion persistence.
//!
//! This module provides the `KeyValueStore` seam, a JSON file backed
//! implementation with synchronous write-through, an in-memory implementation,
//! and `CompletionStore`, which keeps per-quest `CompletionRecord`s on top of
//! any of them.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::quest::{QuestId, StepId};

/// Minimal durable key-value interface.
pub trait KeyValueStore<K, V> {
    fn get(&self, key: &K) -> Result<Option<V>>;
    fn set(&mut self, key: K, value: V) -> Result<()>;
}

/// In-memory store, used for tests and dry runs.
#[derive(Debug, Clone)]
pub struct MemoryStore<K, V> {
    entries: BTreeMap<K, V>,
}

impl<K, V> Default for MemoryStore<K, V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord, V: Clone> KeyValueStore<K, V> for MemoryStore<K, V> {
    fn get(&self, key: &K) -> Result<Option<V>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: K, value: V) -> Result<()> {
        self.entries.insert(key, value);
        Ok(())
    }
}

/// Key-value store persisted as a single JSON object on disk.
///
/// The whole map is held in memory; every `set` rewrites the file.
#[derive(Debug)]
pub struct JsonFileStore<K, V> {
    path: PathBuf,
    entries: BTreeMap<K, V>,
}

impl<K, V> JsonFileStore<K, V>
where
    K: Ord + Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    /// Open the store at `path`, starting empty if the file doesn't exist
    /// or cannot be parsed.
    pub fn open(path: &Path) -> Self {
        let entries = if !path.exists() {
            BTreeMap::new()
        } else {
            match fs::read_to_string(path) {
                Ok(buf) => match serde_json::from_str(&buf) {
                    Ok(entries) => entries,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "error parsing progress file, starting fresh");
                        BTreeMap::new()
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "error reading progress file, starting fresh");
                    BTreeMap::new()
                }
            }
        };

        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    /// Write the map using atomic write (temp file + rename).
    fn flush(&self) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(&self.entries)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

impl<K, V> KeyValueStore<K, V> for JsonFileStore<K, V>
where
    K: Ord + Serialize + DeserializeOwned,
    V: Clone + Serialize + DeserializeOwned,
{
    fn get(&self, key: &K) -> Result<Option<V>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: K, value: V) -> Result<()> {
        // In-memory value is kept even if the flush fails.
        self.entries.insert(key, value);
        self.flush()?;
        debug!(path = %self.path.display(), "progress written");
        Ok(())
    }
}

/// Persisted completion state for one quest.
///
/// `total` always equals the number of `true` step entries, except after a
/// quest-level completion with no steps marked, where it is 1.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    #[serde(default)]
    pub steps: BTreeMap<StepId, bool>,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub updated_at_utc: i64,
}

impl CompletionRecord {
    pub fn is_complete(&self) -> bool {
        self.total != 0
    }

    pub fn is_step_done(&self, step: StepId) -> bool {
        self.steps.get(&step).copied().unwrap_or(false)
    }

    /// Number of steps marked done.
    pub fn done_steps(&self) -> u32 {
        self.steps.values().filter(|&&done| done).count() as u32
    }

    fn touch(&mut self) {
        self.updated_at_utc = Utc::now().timestamp();
    }
}

/// Completion state for all quests, backed by an injected key-value store.
pub struct CompletionStore<S> {
    backend: S,
}

impl<S> CompletionStore<S>
where
    S: KeyValueStore<QuestId, CompletionRecord>,
{
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    /// Current record for `quest`, or the empty default if none was written.
    pub fn read(&self, quest: QuestId) -> CompletionRecord {
        match self.backend.get(&quest) {
            Ok(record) => record.unwrap_or_default(),
            Err(e) => {
                warn!(quest, error = %e, "failed to read completion record");
                CompletionRecord::default()
            }
        }
    }

    pub fn is_complete(&self, quest: QuestId) -> bool {
        self.read(quest).is_complete()
    }

    /// Mark the whole quest complete or incomplete.
    ///
    /// Completing keeps step marks and forces `total` to at least 1.
    /// Reopening clears every step mark.
    pub fn set_total(&mut self, quest: QuestId, state: bool) -> Result<CompletionRecord> {
        let mut record = self.read(quest);
        if state {
            record.total = record.done_steps().max(1);
        } else {
            record.steps.values_mut().for_each(|done| *done = false);
            record.total = 0;
        }
        record.touch();
        debug!(quest, state, total = record.total, "set quest completion");
        self.backend.set(quest, record.clone())?;
        Ok(record)
    }

    /// Mark a single step of `quest` and recompute the aggregate.
    pub fn set_step(&mut self, quest: QuestId, step: StepId, done: bool) -> Result<CompletionRecord> {
        let mut record = self.read(quest);
        record.steps.insert(step, done);
        record.total = record.done_steps();
        record.touch();
        debug!(quest, step, done, total = record.total, "set step completion");
        self.backend.set(quest, record.clone())?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn memory() -> CompletionStore<MemoryStore<QuestId, CompletionRecord>> {
        CompletionStore::new(MemoryStore::default())
    }

    #[test]
    fn unknown_quest_reads_as_incomplete() {
        let store = memory();
        for id in [0, 1, 999] {
            let record = store.read(id);
            assert_eq!(record.total, 0);
            assert!(record.steps.is_empty());
            assert!(!store.is_complete(id));
        }
    }

    #[test]
    fn set_total_then_read_matches_state() {
        let mut store = memory();
        for state in [true, false, true] {
            store.set_total(4, state).unwrap();
            assert_eq!(store.read(4).is_complete(), state);
        }
    }

    #[test]
    fn toggle_twice_restores_original_aggregate() {
        let mut store = memory();
        let original = store.read(4).total;
        store.set_total(4, true).unwrap();
        store.set_total(4, false).unwrap();
        assert_eq!(store.read(4).total, original);
    }

    #[test]
    fn step_marks_drive_total() {
        let mut store = memory();
        store.set_step(1, 10, true).unwrap();
        store.set_step(1, 11, true).unwrap();
        let record = store.set_step(1, 10, false).unwrap();
        assert_eq!(record.total, 1);
        assert_eq!(record.total, record.done_steps());
        assert!(record.is_step_done(11));
        assert!(!record.is_step_done(10));
        assert!(!record.is_step_done(12));

        // Other quests are untouched.
        assert_eq!(store.read(2), CompletionRecord::default());
    }

    #[test]
    fn completing_keeps_step_count_and_reopening_clears_it() {
        let mut store = memory();
        store.set_step(1, 1, true).unwrap();
        store.set_step(1, 2, true).unwrap();
        assert_eq!(store.set_total(1, true).unwrap().total, 2);

        let reopened = store.set_total(1, false).unwrap();
        assert_eq!(reopened.total, 0);
        assert_eq!(reopened.done_steps(), 0);
        assert!(!reopened.is_step_done(1));
    }

    #[test]
    fn json_store_persists_across_opens() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("default_progress.json");

        let mut store = CompletionStore::new(JsonFileStore::<QuestId, CompletionRecord>::open(&path));
        store.set_step(3, 1, true).unwrap();
        store.set_total(8, true).unwrap();
        assert!(path.exists());

        let reopened = CompletionStore::new(JsonFileStore::<QuestId, CompletionRecord>::open(&path));
        assert!(reopened.read(3).is_step_done(1));
        assert!(reopened.is_complete(8));
        assert!(!reopened.is_complete(9));
    }

    #[test]
    fn corrupt_progress_file_starts_fresh() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("default_progress.json");
        fs::write(&path, "{ not json").expect("write corrupt file");

        let store = CompletionStore::new(JsonFileStore::<QuestId, CompletionRecord>::open(&path));
        assert!(!store.is_complete(1));
    }

    #[test]
    fn failed_write_is_reported_but_kept_in_memory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("progress.json");

        let mut store = CompletionStore::new(JsonFileStore::<QuestId, CompletionRecord>::open(&path));
        let err = store.set_total(5, true).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(store.is_complete(5));
        assert!(!path.exists());
    }
}
