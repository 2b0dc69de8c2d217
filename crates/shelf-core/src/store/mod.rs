//! Durable key/value store backing offline edits.
//!
//! Values are opaque strings; the engine decides what goes in them. A handful
//! of reserved keys hold non-catalog data (the stored credential) and are
//! skipped by every catalog scan.

mod migrations;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use libsql::{Builder, Connection, Database};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::Credential;

/// Key under which the signed-in credential is kept.
pub const CREDENTIAL_KEY: &str = "token";

/// Keys that never hold catalog records.
pub const RESERVED_KEYS: &[&str] = &[CREDENTIAL_KEY];

/// Whether `key` belongs to something other than the catalog.
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

struct StoreConnection {
    _db: Database,
    conn: Connection,
}

/// Thread-safe handle to the on-device key/value store.
#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<Mutex<StoreConnection>>,
    path: Option<PathBuf>,
}

impl LocalStore {
    /// Open (or create) a store file at the given path.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let path_str = path.to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        let conn = db.connect()?;
        configure(&conn).await?;
        migrations::run(&conn).await?;

        tracing::debug!("Opened local store at {}", path.display());
        Ok(Self {
            inner: Arc::new(Mutex::new(StoreConnection { _db: db, conn })),
            path: Some(path),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        let conn = db.connect()?;
        migrations::run(&conn).await?;
        Ok(Self {
            inner: Arc::new(Mutex::new(StoreConnection { _db: db, conn })),
            path: None,
        })
    }

    /// Backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert or overwrite a value.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let key = normalize_key(key)?;
        let store = self.inner.lock().await;
        store
            .conn
            .execute(
                "INSERT INTO kv (key, value, written_seq)
                 VALUES (?1, ?2, (SELECT COALESCE(MAX(written_seq), 0) + 1 FROM kv))
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    written_seq = excluded.written_seq",
                [key, value],
            )
            .await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let store = self.inner.lock().await;
        let mut rows = store
            .conn
            .query("SELECT value FROM kv WHERE key = ?1", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<String>(0)?)),
            None => Ok(None),
        }
    }

    /// Remove a key; returns whether it was present.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let store = self.inner.lock().await;
        let affected = store
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", [key])
            .await?;
        Ok(affected > 0)
    }

    /// All keys, most recently written first.
    pub async fn keys(&self) -> Result<Vec<String>> {
        let store = self.inner.lock().await;
        let mut rows = store
            .conn
            .query("SELECT key FROM kv ORDER BY written_seq DESC", ())
            .await?;

        let mut keys = Vec::new();
        while let Some(row) = rows.next().await? {
            keys.push(row.get::<String>(0)?);
        }
        Ok(keys)
    }

    /// All key/value pairs, most recently written first.
    pub async fn entries(&self) -> Result<Vec<(String, String)>> {
        let store = self.inner.lock().await;
        let mut rows = store
            .conn
            .query("SELECT key, value FROM kv ORDER BY written_seq DESC", ())
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push((row.get::<String>(0)?, row.get::<String>(1)?));
        }
        Ok(entries)
    }

    pub async fn save_credential(&self, credential: &Credential) -> Result<()> {
        self.set(CREDENTIAL_KEY, credential.expose()).await
    }

    /// Stored credential, ignoring a blank value.
    pub async fn load_credential(&self) -> Result<Option<Credential>> {
        Ok(self
            .get(CREDENTIAL_KEY)
            .await?
            .and_then(|raw| Credential::new(raw).ok()))
    }

    pub async fn clear_credential(&self) -> Result<bool> {
        self.remove(CREDENTIAL_KEY).await
    }
}

fn normalize_key(key: &str) -> Result<&str> {
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::InvalidInput(
            "local store key must not be empty".to_string(),
        ));
    }
    Ok(key)
}

async fn configure(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA journal_mode = WAL;", ()).await.ok();
    conn.execute("PRAGMA synchronous = NORMAL;", ()).await.ok();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test(flavor = "multi_thread")]
    async fn set_get_remove_roundtrip() {
        let store = LocalStore::open_in_memory().await.unwrap();

        store.set("a", "1").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));

        store.set("a", "2").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));

        assert!(store.remove("a").await.unwrap());
        assert!(!store.remove("a").await.unwrap());
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn keys_are_ordered_by_last_write() {
        let store = LocalStore::open_in_memory().await.unwrap();
        store.set("first", "1").await.unwrap();
        store.set("second", "2").await.unwrap();
        store.set("third", "3").await.unwrap();
        store.set("first", "1b").await.unwrap();

        assert_eq!(
            store.keys().await.unwrap(),
            vec!["first".to_string(), "third".to_string(), "second".to_string()]
        );
        let entries = store.entries().await.unwrap();
        assert_eq!(entries[0], ("first".to_string(), "1b".to_string()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_key_is_rejected() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let error = store.set("  ", "value").await.unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn credential_lives_under_reserved_key() {
        let store = LocalStore::open_in_memory().await.unwrap();
        assert_eq!(store.load_credential().await.unwrap(), None);

        let credential = Credential::new("tok-123").unwrap();
        store.save_credential(&credential).await.unwrap();
        assert!(is_reserved_key(CREDENTIAL_KEY));
        assert_eq!(store.keys().await.unwrap(), vec![CREDENTIAL_KEY.to_string()]);
        assert_eq!(store.load_credential().await.unwrap(), Some(credential));

        assert!(store.clear_credential().await.unwrap());
        assert_eq!(store.load_credential().await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("shelf.db");

        {
            let store = LocalStore::open(&path).await.unwrap();
            store.set("p1", r#"{"name":"Pepsi"}"#).await.unwrap();
        }

        let reopened = LocalStore::open(&path).await.unwrap();
        assert_eq!(reopened.path(), Some(path.as_path()));
        assert_eq!(
            reopened.get("p1").await.unwrap().as_deref(),
            Some(r#"{"name":"Pepsi"}"#)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn newer_schema_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelf.db");

        {
            let store = LocalStore::open(&path).await.unwrap();
            let guard = store.inner.lock().await;
            guard
                .conn
                .execute("INSERT INTO schema_version (version) VALUES (99)", ())
                .await
                .unwrap();
        }

        let error = LocalStore::open(&path).await.err().unwrap();
        assert!(matches!(error, Error::Database(_)));
    }
}
