//! Persistence of per-session state.
//!
//! State is a keyed blob per session id. The session writes one key at a time
//! (`history`, `history_limit`, `variables`) after every mutation, and the store
//! merges it into the blob.

use crate::error::{ConsoleError, ConsoleResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;

pub const HISTORY_KEY: &str = "history";
pub const HISTORY_LIMIT_KEY: &str = "history_limit";
pub const VARIABLES_KEY: &str = "variables";

/// The fields of a session blob the console reads back. Unknown fields are ignored.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default)]
    pub history_limit: Option<usize>,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

/// Keyed blob store the session persists into.
pub trait Storage {
    /// Load the blob of session `id`; a missing blob is an empty state.
    fn load(&self, id: &str) -> ConsoleResult<PersistedState>;

    /// Merge `value` under `key` into the blob of session `id`.
    fn save(&mut self, id: &str, key: &str, value: Value) -> ConsoleResult<()>;
}

fn state_from_blob(blob: Map<String, Value>) -> ConsoleResult<PersistedState> {
    Ok(serde_json::from_value(Value::Object(blob))?)
}

/// Blobs kept in memory for the lifetime of the store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    blobs: HashMap<String, Map<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn load(&self, id: &str) -> ConsoleResult<PersistedState> {
        match self.blobs.get(id) {
            Some(blob) => state_from_blob(blob.clone()),
            None => Ok(PersistedState::default()),
        }
    }

    fn save(&mut self, id: &str, key: &str, value: Value) -> ConsoleResult<()> {
        self.blobs
            .entry(id.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }
}

/// One JSON object per session, stored as `<dir>/<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: &str) -> ConsoleResult<PathBuf> {
        if id.is_empty() || id.contains(|c: char| !(c.is_alphanumeric() || "-_.".contains(c))) {
            return Err(ConsoleError::Storage(format!("invalid session id: {id:?}")));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    fn read_blob(&self, id: &str) -> ConsoleResult<Map<String, Value>> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Ok(Map::new());
        }
        let text = fs::read_to_string(&path)?;
        match serde_json::from_str(&text)? {
            Value::Object(blob) => Ok(blob),
            _ => Err(ConsoleError::Storage(format!(
                "{} does not hold a JSON object",
                path.display()
            ))),
        }
    }
}

impl Storage for JsonFileStorage {
    fn load(&self, id: &str) -> ConsoleResult<PersistedState> {
        state_from_blob(self.read_blob(id)?)
    }

    fn save(&mut self, id: &str, key: &str, value: Value) -> ConsoleResult<()> {
        let mut blob = self.read_blob(id)?;
        blob.insert(key.to_string(), value);
        fs::create_dir_all(&self.dir)?;
        let text = serde_json::to_string_pretty(&Value::Object(blob))?;
        fs::write(self.path_for(id)?, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::env as stdenv;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_unique_temp_dir() -> PathBuf {
        let mut p = stdenv::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("webconsole_store_{}_{}", std::process::id(), nanos));
        p
    }

    #[test]
    fn test_memory_storage_missing_blob_is_empty() {
        let store = MemoryStorage::new();
        assert_eq!(store.load("nope").unwrap(), PersistedState::default());
    }

    #[test]
    fn test_memory_storage_merges_keys() {
        let mut store = MemoryStorage::new();
        store.save("s", HISTORY_KEY, json!(["ls", "pwd"])).unwrap();
        store.save("s", VARIABLES_KEY, json!({"x": "5"})).unwrap();
        store.save("s", HISTORY_KEY, json!(["ls"])).unwrap();

        let state = store.load("s").unwrap();
        assert_eq!(state.history, vec!["ls"]);
        assert_eq!(state.variables.get("x").map(String::as_str), Some("5"));
        assert_eq!(state.history_limit, None);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let mut store = MemoryStorage::new();
        store.save("s", "theme", json!("dark")).unwrap();
        store.save("s", HISTORY_LIMIT_KEY, json!(10)).unwrap();
        let state = store.load("s").unwrap();
        assert_eq!(state.history_limit, Some(10));
    }

    #[test]
    fn test_json_file_storage_round_trips_through_disk() {
        let dir = make_unique_temp_dir();
        let mut store = JsonFileStorage::new(&dir);
        assert_eq!(store.load("main").unwrap(), PersistedState::default());

        store.save("main", HISTORY_KEY, json!(["help"])).unwrap();
        store.save("main", VARIABLES_KEY, json!({"who": "world"})).unwrap();

        let reopened = JsonFileStorage::new(&dir);
        let state = reopened.load("main").unwrap();
        assert_eq!(state.history, vec!["help"]);
        assert_eq!(state.variables.get("who").map(String::as_str), Some("world"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_json_file_storage_rejects_path_like_ids() {
        let dir = make_unique_temp_dir();
        let mut store = JsonFileStorage::new(&dir);
        assert!(store.save("../evil", HISTORY_KEY, json!([])).is_err());
        assert!(!dir.exists());
    }
}
