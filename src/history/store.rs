//! Whole-file JSON store for user records.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;

use crate::channels::UserId;
use crate::error::StoreError;
use crate::history::{DiagnosisEntry, MoodEntry, Timestamp, UserRecord};

pub const MOOD_SCORE_MIN: u8 = 1;
pub const MOOD_SCORE_MAX: u8 = 10;

/// All users, keyed by stringified user id.
pub type Users = BTreeMap<String, UserRecord>;

/// Store backed by a single JSON file.
///
/// Each mutation loads the full document, applies the change and writes the
/// document back through a temp file that is renamed over the original, so a
/// failed write leaves the previous contents intact. The internal lock only
/// serializes writers within this process.
pub struct UserStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl UserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record. A missing file is an empty store.
    pub fn load(&self) -> Result<Users, StoreError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Users::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if data.trim().is_empty() {
            return Ok(Users::new());
        }
        serde_json::from_str(&data).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the whole store with `users`.
    pub fn save(&self, users: &Users) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.write_all(users)
    }

    /// The record for `user`, or an empty one. Never writes, never fails:
    /// an unreadable store is logged and treated as empty.
    pub fn get(&self, user: UserId) -> UserRecord {
        match self.load() {
            Ok(mut users) => users.remove(&user.to_string()).unwrap_or_default(),
            Err(e) => {
                tracing::warn!(user_id = user, error = %e, "Failed to load user store");
                UserRecord::default()
            }
        }
    }

    /// Set the display name. Blank names are rejected without touching disk.
    pub fn set_name(&self, user: UserId, name: &str) -> Result<String, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        let name = name.to_string();
        self.update(user, |record| record.name = Some(name.clone()))?;
        Ok(name)
    }

    /// Append a screening score and return the full updated history.
    pub fn append_diagnosis(
        &self,
        user: UserId,
        score: u32,
    ) -> Result<Vec<DiagnosisEntry>, StoreError> {
        self.update(user, |record| {
            record.history.push(DiagnosisEntry {
                date: Timestamp::now(),
                score,
            });
            record.history.clone()
        })
    }

    /// Append a free-text mood entry.
    pub fn append_mood(&self, user: UserId, text: &str) -> Result<MoodEntry, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::EmptyMood);
        }
        self.push_mood(user, text, None)
    }

    /// Append a mood entry with a 1-10 self rating. The text may be empty.
    pub fn append_mood_scored(
        &self,
        user: UserId,
        text: &str,
        score: i64,
    ) -> Result<MoodEntry, StoreError> {
        let score = u8::try_from(score)
            .ok()
            .filter(|s| (MOOD_SCORE_MIN..=MOOD_SCORE_MAX).contains(s))
            .ok_or(StoreError::MoodScoreOutOfRange {
                score,
                min: MOOD_SCORE_MIN,
                max: MOOD_SCORE_MAX,
            })?;
        self.push_mood(user, text.trim(), Some(score))
    }

    fn push_mood(
        &self,
        user: UserId,
        text: &str,
        score: Option<u8>,
    ) -> Result<MoodEntry, StoreError> {
        let entry = MoodEntry {
            date: Timestamp::now(),
            mood: text.to_string(),
            score,
        };
        self.update(user, |record| record.mood_history.push(entry.clone()))?;
        Ok(entry)
    }

    /// Read-modify-write of a single user's record, creating it if needed.
    pub fn update<T>(
        &self,
        user: UserId,
        f: impl FnOnce(&mut UserRecord) -> T,
    ) -> Result<T, StoreError> {
        let _guard = self.lock();
        let mut users = self.load()?;
        let out = f(users.entry(user.to_string()).or_default());
        self.write_all(&users)?;
        tracing::debug!(user_id = user, path = %self.path.display(), "User store written");
        Ok(out)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_all(&self, users: &Users) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(write_err)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        {
            let formatter = PrettyFormatter::with_indent(b"    ");
            let mut ser = serde_json::Serializer::with_formatter(tmp.as_file_mut(), formatter);
            users.serialize(&mut ser)?;
        }
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    fn test_store() -> (UserStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = UserStore::new(dir.path().join("user_data.json"));
        (store, dir)
    }

    #[test]
    fn get_unknown_user_is_empty_and_does_not_write() {
        let (store, _dir) = test_store();
        let record = store.get(42);
        assert!(record.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn set_name_trims_and_persists() {
        let (store, _dir) = test_store();
        assert_eq!(store.set_name(7, "  Иван  ").unwrap(), "Иван");
        assert_eq!(store.get(7).name.as_deref(), Some("Иван"));
    }

    #[test]
    fn blank_name_is_rejected_without_writing() {
        let (store, _dir) = test_store();
        assert!(matches!(store.set_name(7, "   "), Err(StoreError::EmptyName)));
        assert!(!store.path().exists());
    }

    #[test]
    fn append_diagnosis_returns_full_history() {
        let (store, _dir) = test_store();
        store.append_diagnosis(1, 4).unwrap();
        let history = store.append_diagnosis(1, 12).unwrap();
        let scores: Vec<u32> = history.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![4, 12]);
        assert_eq!(store.get(1).history.len(), 2);
    }

    #[test]
    fn setting_name_keeps_existing_history() {
        let (store, _dir) = test_store();
        store.append_diagnosis(3, 9).unwrap();
        store.append_mood(3, "тревожно").unwrap();
        store.set_name(3, "Оля").unwrap();

        let record = store.get(3);
        assert_eq!(record.history.len(), 1);
        assert_eq!(record.mood_history.len(), 1);
        assert_eq!(record.name.as_deref(), Some("Оля"));
    }

    #[test]
    fn mood_score_range_is_enforced() {
        let (store, _dir) = test_store();
        for bad in [0, 11, -3, 300] {
            assert!(matches!(
                store.append_mood_scored(5, "x", bad),
                Err(StoreError::MoodScoreOutOfRange { .. })
            ));
        }
        assert!(!store.path().exists());

        let entry = store.append_mood_scored(5, "", 10).unwrap();
        assert_eq!(entry.score, Some(10));
        assert!(entry.mood.is_empty());
    }

    #[test]
    fn empty_mood_text_is_rejected() {
        let (store, _dir) = test_store();
        assert!(matches!(store.append_mood(5, " \n"), Err(StoreError::EmptyMood)));
    }

    #[test]
    fn save_then_load_is_identical() {
        let (store, _dir) = test_store();
        store.set_name(1, "Аня").unwrap();
        store.append_diagnosis(1, 6).unwrap();
        store.append_mood_scored(1, "бодро", 8).unwrap();
        store.append_diagnosis(2, 17).unwrap();

        let before = store.load().unwrap();
        store.save(&before).unwrap();
        let after = store.load().unwrap();
        assert_eq!(before, after);
        assert_eq!(after.len(), 2);
    }

    #[test]
    fn file_is_utf8_json_keyed_by_user_id() {
        let (store, _dir) = test_store();
        store.set_name(123, "Женя").unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("Женя"), "non-ASCII must not be escaped: {raw}");
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["123"]["name"], "Женя");
    }

    #[test]
    #[traced_test]
    fn corrupt_file_fails_mutations_but_not_get() {
        let (store, _dir) = test_store();
        std::fs::write(store.path(), "{not json").unwrap();

        assert!(store.get(1).is_empty());
        assert!(logs_contain("Failed to load user store"));
        assert!(matches!(
            store.append_diagnosis(1, 3),
            Err(StoreError::Corrupt { .. })
        ));
        // The broken file is left for the operator to inspect.
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "{not json");
    }

    #[test]
    fn reads_files_written_by_older_versions() {
        let (store, _dir) = test_store();
        std::fs::write(
            store.path(),
            r#"{
                "99": {
                    "history": [{"date": "2024-01-02 03:04", "score": 11}],
                    "mood_history": [{"date": "2024-01-02 05:06", "mood": "устал"}],
                    "name": "Петя"
                }
            }"#,
        )
        .unwrap();

        let record = store.get(99);
        assert_eq!(record.name.as_deref(), Some("Петя"));
        assert_eq!(record.history[0].score, 11);
        assert_eq!(record.mood_history[0].mood, "устал");
        assert_eq!(record.mood_history[0].score, None);
    }
}
