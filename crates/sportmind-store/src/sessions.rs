use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use sportmind_core::session::{self, SessionRecord};
use sportmind_core::parse_session_date;
use tracing::{debug, warn};

use crate::StoreError;

/// Field added to every loaded record naming the file it came from.
pub const KEY_FIELD: &str = "_key";

/// Top-level directory holding one subdirectory per session date.
const DATA_DIR: &str = "data";

/// Session records laid out as `<root>/data/<YYYY-MM-DD>/<name>.json`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Dates with uploaded sessions, newest first.
    pub fn list_dates(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.root.join(DATA_DIR);
        let Some(entries) = read_dir_if_exists(&dir)? else {
            debug!(dir = %dir.display(), "no data directory; no dates");
            return Ok(Vec::new());
        };

        let mut dates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| io_error(&dir, source))?;
            let is_dir = entry
                .file_type()
                .map_err(|source| io_error(&entry.path(), source))?
                .is_dir();
            if is_dir && let Some(name) = entry.file_name().to_str() {
                dates.push(name.to_string());
            }
        }
        dates.sort_unstable_by(|a, b| b.cmp(a));
        Ok(dates)
    }

    /// Every session uploaded on `date`, newest first.
    ///
    /// Files that are not JSON objects are skipped. Each record carries a
    /// `_key` field with its path relative to the store root.
    pub fn sessions_for_date(&self, date: &str) -> Result<Vec<SessionRecord>, StoreError> {
        parse_session_date(date)?;
        let dir = self.root.join(DATA_DIR).join(date);
        let Some(entries) = read_dir_if_exists(&dir)? else {
            return Ok(Vec::new());
        };

        let mut sessions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| io_error(&dir, source))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            match read_record(&path) {
                Ok(mut record) => {
                    record.insert(
                        KEY_FIELD.to_string(),
                        Value::String(format!("{DATA_DIR}/{date}/{name}")),
                    );
                    sessions.push(record);
                }
                Err(reason) => warn!(path = %path.display(), %reason, "skipping unreadable session"),
            }
        }

        sessions.sort_by(|a, b| session::timestamp(b).cmp(session::timestamp(a)));
        debug!(date, count = sessions.len(), "loaded sessions");
        Ok(sessions)
    }
}

fn read_dir_if_exists(dir: &Path) -> Result<Option<fs::ReadDir>, StoreError> {
    match fs::read_dir(dir) {
        Ok(entries) => Ok(Some(entries)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(io_error(dir, source)),
    }
}

fn read_record(path: &Path) -> Result<SessionRecord, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    match serde_json::from_slice(&bytes).map_err(|e| e.to_string())? {
        Value::Object(record) => Ok(record),
        _ => Err("not a JSON object".to_string()),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        for (rel, contents) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        let store = SessionStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn missing_data_dir_has_no_dates() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        assert!(store.list_dates().unwrap().is_empty());
    }

    #[test]
    fn dates_newest_first() {
        let (_dir, store) = store_with(&[
            ("data/2025-10-30/a.json", "{}"),
            ("data/2025-11-03/a.json", "{}"),
            ("data/2025-11-01/a.json", "{}"),
            ("data/README.txt", "not a date dir"),
        ]);
        assert_eq!(
            store.list_dates().unwrap(),
            vec!["2025-11-03", "2025-11-01", "2025-10-30"]
        );
    }

    #[test]
    fn sessions_sorted_and_keyed() {
        let (_dir, store) = store_with(&[
            ("data/2025-11-03/early.json", r#"{"timestamp": "2025-11-03T08:00:00"}"#),
            ("data/2025-11-03/late.json", r#"{"timestamp": "2025-11-03T18:00:00"}"#),
            ("data/2025-11-03/none.json", r#"{"gender": "F"}"#),
        ]);
        let sessions = store.sessions_for_date("2025-11-03").unwrap();
        let keys: Vec<_> = sessions
            .iter()
            .map(|s| s[KEY_FIELD].as_str().unwrap())
            .collect();
        assert_eq!(
            keys,
            vec![
                "data/2025-11-03/late.json",
                "data/2025-11-03/early.json",
                "data/2025-11-03/none.json"
            ]
        );
    }

    #[test]
    fn bad_files_are_skipped() {
        let (_dir, store) = store_with(&[
            ("data/2025-11-03/ok.json", r#"{"timestamp": "t"}"#),
            ("data/2025-11-03/broken.json", "{not json"),
            ("data/2025-11-03/array.json", "[1, 2]"),
            ("data/2025-11-03/notes.txt", "ignored"),
        ]);
        let sessions = store.sessions_for_date("2025-11-03").unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0][KEY_FIELD], "data/2025-11-03/ok.json");
    }

    #[test]
    fn unknown_date_is_empty() {
        let (_dir, store) = store_with(&[("data/2025-11-03/ok.json", "{}")]);
        assert!(store.sessions_for_date("2024-01-01").unwrap().is_empty());
    }

    #[test]
    fn malformed_date_rejected() {
        let (_dir, store) = store_with(&[]);
        assert!(matches!(
            store.sessions_for_date("../secrets"),
            Err(StoreError::InvalidDate(_))
        ));
    }
}
