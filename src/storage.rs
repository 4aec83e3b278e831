use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

/// Flat string key/value persistence for UI preferences.
///
/// Reads and writes are synchronous and never report failure to the caller;
/// a backend that cannot read answers `None`, one that cannot write drops the
/// value.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

#[derive(Debug, Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preference {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone)]
pub struct Options {
    pub path: Option<PathBuf>,
}

impl Store {
    pub fn open(opts: Options) -> Result<Self> {
        let path = if let Some(path) = opts.path {
            path
        } else {
            default_path().context("storage: resolve default path")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("storage: create directory {}", parent.display()))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("storage: open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("storage: set WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .context("storage: set busy timeout")?;
        migrate(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("storage: open in-memory database")?;
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn close(self) -> Result<()> {
        let conn = Arc::try_unwrap(self.conn)
            .map_err(|_| anyhow!("storage: connection still in use"))?
            .into_inner();
        conn.close()
            .map_err(|(_, err)| err)
            .context("storage: close connection")
    }

    pub fn get_preference(&self, key: &str) -> Result<Option<Preference>> {
        let conn = self.conn.lock();
        conn.query_row(
            r#"
SELECT key, value, updated_at
FROM preferences
WHERE key = ?1
"#,
            params![key],
            |row| {
                let updated: i64 = row.get(2)?;
                Ok(Preference {
                    key: row.get(0)?,
                    value: row.get(1)?,
                    updated_at: Utc
                        .timestamp_opt(updated, 0)
                        .single()
                        .unwrap_or_else(Utc::now),
                })
            },
        )
        .optional()
        .context("storage: query preference")
    }

    pub fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            bail!("storage: preference key required");
        }
        let conn = self.conn.lock();
        conn.execute(
            r#"
INSERT INTO preferences (key, value, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(key) DO UPDATE SET
  value = excluded.value,
  updated_at = excluded.updated_at
"#,
            params![key, value, Utc::now().timestamp()],
        )
        .with_context(|| format!("storage: write preference {key}"))?;
        Ok(())
    }

    pub fn list_preferences(&self) -> Result<Vec<Preference>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
SELECT key, value, updated_at
FROM preferences
ORDER BY key ASC
"#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                let updated: i64 = row.get(2)?;
                Ok(Preference {
                    key: row.get(0)?,
                    value: row.get(1)?,
                    updated_at: Utc
                        .timestamp_opt(updated, 0)
                        .single()
                        .unwrap_or_else(Utc::now),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl PreferenceStore for Store {
    fn get(&self, key: &str) -> Option<String> {
        match self.get_preference(key) {
            Ok(pref) => pref.map(|p| p.value),
            Err(err) => {
                tracing::warn!(key, error = %format!("{err:#}"), "preference read failed");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(err) = self.set_preference(key, value) {
            tracing::warn!(key, value, error = %format!("{err:#}"), "preference write failed");
        }
    }
}

/// Process-local preferences, used when the database cannot be opened.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at INTEGER NOT NULL
)
"#,
        [],
    )?;

    let current: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    for (idx, sql) in migrations().iter().enumerate() {
        let version = (idx + 1) as i64;
        if version <= current {
            continue;
        }
        conn.execute_batch(sql)
            .with_context(|| format!("storage: apply migration {version}"))?;
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![
                version,
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or(Duration::from_secs(0))
                    .as_secs() as i64,
            ],
        )?;
    }
    Ok(())
}

fn migrations() -> Vec<&'static str> {
    vec![r#"
CREATE TABLE IF NOT EXISTS preferences (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at INTEGER NOT NULL
);
"#]
}

pub fn default_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("interview-os").join("preferences.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.db");
        let store = Store::open(Options {
            path: Some(path.clone()),
        })
        .unwrap();
        assert!(path.exists());
        store.close().unwrap();
    }

    #[test]
    fn last_write_wins() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(PreferenceStore::get(&store, "theme"), None);
        PreferenceStore::set(&store, "theme", "light");
        PreferenceStore::set(&store, "theme", "dark");
        assert_eq!(PreferenceStore::get(&store, "theme").as_deref(), Some("dark"));
        assert_eq!(store.list_preferences().unwrap().len(), 1);
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preferences.db");
        let opts = Options {
            path: Some(path.clone()),
        };
        let store = Store::open(opts.clone()).unwrap();
        store.set_preference("sidebar-width", "33").unwrap();
        store.close().unwrap();

        let reopened = Store::open(opts).unwrap();
        let pref = reopened.get_preference("sidebar-width").unwrap().unwrap();
        assert_eq!(pref.value, "33");
    }

    #[test]
    fn empty_key_is_rejected_without_panicking() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.set_preference("", "x").is_err());
        PreferenceStore::set(&store, "", "x");
        assert!(store.list_preferences().unwrap().is_empty());
    }

    #[test]
    fn memory_preferences_round_trip() {
        let prefs = MemoryPreferences::new();
        prefs.set("sidebar-collapsed", "true");
        assert_eq!(prefs.get("sidebar-collapsed").as_deref(), Some("true"));
        assert_eq!(prefs.get("theme"), None);
    }
}
