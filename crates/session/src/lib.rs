use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub fn app_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| std::env::temp_dir());
    base.join("autocut")
}

pub fn default_db_path() -> PathBuf {
    app_data_dir().join("sessions.db")
}

/// Key-value state scoped to one editing session. Last write wins; there are
/// no transactions across keys.
pub trait SessionStore: Send {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn set(&mut self, key: &str, value: &Value) -> Result<(), StoreError>;

    /// Drops every key of this session.
    fn clear(&mut self) -> Result<(), StoreError>;

    fn get_or(&self, key: &str, default: Value) -> Result<Value, StoreError> {
        Ok(self.get(key)?.unwrap_or(default))
    }
}

pub fn load<T: DeserializeOwned>(
    store: &dyn SessionStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key)? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

pub fn save<T: Serialize>(
    store: &mut dyn SessionStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    store.set(key, &serde_json::to_value(value)?)
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.values.clear();
        Ok(())
    }
}

pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
    session_id: String,
}

impl SqliteStore {
    pub fn open_or_create(path: &Path, session_id: &str) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", &"WAL")?;
        conn.pragma_update(None, "synchronous", &"NORMAL")?;
        apply_migrations(&conn)?;
        debug!("session store {:?} opened for '{}'", path, session_id);
        Ok(Self {
            conn,
            path: path.to_path_buf(),
            session_id: session_id.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM session_kv WHERE session_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![self.session_id], |row| row.get(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}

impl SessionStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value_json FROM session_kv WHERE session_id = ?1 AND key = ?2",
                params![self.session_id, key],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp();
        self.conn.execute(
            "INSERT OR REPLACE INTO session_kv(session_id, key, value_json, updated_at) VALUES(?1, ?2, ?3, ?4)",
            params![self.session_id, key, value.to_string(), now],
        )?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM session_kv WHERE session_id = ?1",
            params![self.session_id],
        )?;
        debug!("cleared {} keys of session '{}'", removed, self.session_id);
        Ok(())
    }
}

fn apply_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(include_str!("../migrations/V0001__session_kv.sql"))?;
    conn.execute(
        "INSERT OR IGNORE INTO migrations(name, applied_at) VALUES(?1, strftime('%s','now'))",
        params!["V0001__session_kv"],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_store_round() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("missing").unwrap(), None);
        assert_eq!(store.get_or("missing", json!(0)).unwrap(), json!(0));
        store.set("timeline_map", &json!([5.0, 5.0])).unwrap();
        store.set("timeline_map", &json!([4.5, 4.5])).unwrap();
        assert_eq!(store.get("timeline_map").unwrap(), Some(json!([4.5, 4.5])));
        store.clear().unwrap();
        assert_eq!(store.get("timeline_map").unwrap(), None);
    }

    #[test]
    fn test_typed_helpers() {
        let mut store = MemoryStore::new();
        save(&mut store, "raw", &vec![5.0f64, 3.0]).unwrap();
        let raw: Option<Vec<f64>> = load(&store, "raw").unwrap();
        assert_eq!(raw, Some(vec![5.0, 3.0]));
        assert!(load::<Vec<f64>>(&store, "other").unwrap().is_none());
    }

    #[test]
    fn test_sqlite_store_persists_and_scopes_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sessions.db");

        {
            let mut a = SqliteStore::open_or_create(&path, "a").unwrap();
            let mut b = SqliteStore::open_or_create(&path, "b").unwrap();
            a.set("px_per_sec", &json!(100.0)).unwrap();
            b.set("px_per_sec", &json!(42.0)).unwrap();
            a.set("timeline_map", &json!([5.0])).unwrap();
        }

        let mut a = SqliteStore::open_or_create(&path, "a").unwrap();
        assert_eq!(a.get("px_per_sec").unwrap(), Some(json!(100.0)));
        assert_eq!(a.keys().unwrap(), vec!["px_per_sec", "timeline_map"]);

        a.clear().unwrap();
        assert!(a.keys().unwrap().is_empty());

        let b = SqliteStore::open_or_create(&path, "b").unwrap();
        assert_eq!(b.get("px_per_sec").unwrap(), Some(json!(42.0)));
    }
}
