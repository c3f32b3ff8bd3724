//! Recognition history — an ordered, capped list persisted as one JSON file.
//!
//! The file is read once at startup and rewritten wholesale on every
//! mutation. Persistence failures are logged and swallowed: the in-memory
//! list stays authoritative for the session, it just may not survive a
//! restart.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::song::{HistoryItem, SongMetadata};

/// Most recent entries kept; older ones fall off the end.
pub const HISTORY_LIMIT: usize = 50;

pub struct HistoryStore {
    path: PathBuf,
    limit: usize,
    items: Vec<HistoryItem>,
}

impl HistoryStore {
    /// Load the store from `path` with the default cap. Missing file →
    /// empty store; unreadable/corrupt file → empty store, logged.
    pub fn load(path: PathBuf) -> Self {
        Self::load_with_limit(path, HISTORY_LIMIT)
    }

    pub fn load_with_limit(path: PathBuf, limit: usize) -> Self {
        let items = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<HistoryItem>>(&content) {
                Ok(mut items) => {
                    items.truncate(limit);
                    items
                }
                Err(e) => {
                    warn!("history: failed to parse {}: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self { path, limit, items }
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&HistoryItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Record a successful recognition: assign a unique id, stamp the
    /// current time, prepend, truncate to the cap, persist.
    pub fn add(&mut self, song: SongMetadata) -> HistoryItem {
        let now = Local::now();
        let mut bump = 0u64;
        let mut id = make_id(&now, &song.title, bump);
        while self.items.iter().any(|i| i.id == id) {
            bump += 1;
            id = make_id(&now, &song.title, bump);
        }

        let item = HistoryItem {
            id,
            timestamp: now,
            song,
        };
        self.items.insert(0, item.clone());
        self.items.truncate(self.limit);
        self.persist();
        info!("history: added {} ({} items)", item.id, self.items.len());
        item
    }

    /// Remove one entry by id. Unknown ids leave the store unchanged.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id != id);
        let removed = self.items.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            warn!("history: persist to {} failed: {}", self.path.display(), e);
        }
    }

    fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.items)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Short hex id seeded from the creation instant and title, bumped on the
/// (unlikely) collision within one store.
fn make_id(ts: &DateTime<Local>, seed: &str, bump: u64) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut h = DefaultHasher::new();
    ts.timestamp_nanos_opt().unwrap_or(ts.timestamp()).hash(&mut h);
    seed.hash(&mut h);
    bump.hash(&mut h);
    format!("{:016x}", h.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(n: usize) -> SongMetadata {
        SongMetadata {
            title: format!("Song {}", n),
            artist: format!("Artist {}", n),
            album: None,
            year: None,
            genre: None,
            mood: None,
            lyrics: "La la".into(),
            language: None,
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> HistoryStore {
        HistoryStore::load(dir.path().join("history.json"))
    }

    #[test]
    fn test_add_prepends_and_caps() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        for n in 0..60 {
            store.add(song(n));
        }
        assert_eq!(store.len(), HISTORY_LIMIT);
        assert_eq!(store.items()[0].song.title, "Song 59");
        // Oldest surviving entry is the 10th add.
        assert_eq!(store.items().last().unwrap().song.title, "Song 10");
    }

    #[test]
    fn test_ids_unique() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        for _ in 0..20 {
            store.add(song(1));
        }
        let mut ids: Vec<_> = store.items().iter().map(|i| i.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn test_remove_semantics() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let a = store.add(song(1));
        let _b = store.add(song(2));
        assert!(!store.remove("no-such-id"));
        assert_eq!(store.len(), 2);
        assert!(store.remove(&a.id));
        assert_eq!(store.len(), 1);
        assert!(store.get(&a.id).is_none());
    }

    #[test]
    fn test_clear_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.add(song(1));
        store.add(song(2));
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let mut store = HistoryStore::load(path.clone());
        let added = store.add(song(7));
        drop(store);

        let reloaded = HistoryStore::load(path);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.items()[0], added);
    }

    #[test]
    fn test_corrupt_file_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = HistoryStore::load(path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_persist_failure_keeps_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        // A path whose parent is a regular file: create_dir_all will fail.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let mut store = HistoryStore::load(blocker.join("history.json"));
        store.add(song(1));
        assert_eq!(store.len(), 1);
    }
}
