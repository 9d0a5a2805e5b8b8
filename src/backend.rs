// Key-value storage backends for the durable task mirror

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// String key-value storage, scoped to one user/profile
pub trait StorageBackend {
    /// Read the value stored under `key`, or None if nothing is stored
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove_item(&mut self, key: &str) -> Result<()>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }
}

/// Which backend to open for on-disk storage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    File,
    Sqlite,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::File => write!(f, "file"),
            BackendKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Open a backend of the given kind rooted at `dir`
pub fn open_backend(kind: BackendKind, dir: &Path) -> Result<Box<dyn StorageBackend>> {
    debug!(%kind, dir = ?dir, "Opening storage backend");
    Ok(match kind {
        BackendKind::File => Box::new(FileBackend::open(dir)?),
        BackendKind::Sqlite => Box::new(SqliteBackend::open(dir)?),
    })
}

/// Validate a storage key
///
/// Keys become file names for `FileBackend`, so they are restricted to a
/// portable character set.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Storage key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Storage key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid storage key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}

// ============================================================================
// In-memory
// ============================================================================

/// Non-durable backend, used in tests and for throwaway stores
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    items: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.items.remove(key);
        Ok(())
    }
}

// ============================================================================
// File per key
// ============================================================================

/// Stores each key as `{key}.json` inside a directory
pub struct FileBackend {
    base_path: PathBuf,
}

impl FileBackend {
    /// Open or create a file backend in `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create storage directory")?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn item_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }

    /// Take the directory-wide write lock. Released when the returned file is dropped.
    fn lock(&self) -> Result<File> {
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.base_path.join(".lock"))
            .context("Failed to open lock file")?;
        lock_file.lock_exclusive().context("Failed to acquire file lock")?;
        Ok(lock_file)
    }
}

impl StorageBackend for FileBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let path = self.item_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(raw))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let _lock = self.lock()?;

        let path = self.item_path(key);
        let tmp_path = self.base_path.join(format!("{}.json.tmp", key));

        let mut file = File::create(&tmp_path).context("Failed to create temporary state file")?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?; // Ensure data is flushed to disk before the rename

        fs::rename(&tmp_path, &path).with_context(|| format!("Failed to replace {}", path.display()))?;
        debug!(key, bytes = value.len(), "Wrote item");
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        let _lock = self.lock()?;

        let path = self.item_path(key);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

// ============================================================================
// SQLite
// ============================================================================

/// Stores keys in a single SQLite table
pub struct SqliteBackend {
    db: Connection,
}

impl SqliteBackend {
    /// Open or create `todostore.db` inside `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        fs::create_dir_all(path.as_ref()).context("Failed to create storage directory")?;
        let db_path = path.as_ref().join("todostore.db");
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;
        Self::with_connection(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        Self::with_connection(db)
    }

    fn with_connection(db: Connection) -> Result<Self> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(Self { db })
    }
}

impl StorageBackend for SqliteBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let value = self
            .db
            .query_row("SELECT value FROM storage WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.db.execute(
            "INSERT OR REPLACE INTO storage (key, value, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, chrono::Utc::now().timestamp_millis()],
        )?;
        debug!(key, bytes = value.len(), "Wrote item");
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.db.execute("DELETE FROM storage WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(backend: &mut dyn StorageBackend) {
        assert_eq!(backend.get_item("todo-storage").unwrap(), None);

        backend.set_item("todo-storage", "first").unwrap();
        assert_eq!(backend.get_item("todo-storage").unwrap().as_deref(), Some("first"));

        backend.set_item("todo-storage", "second").unwrap();
        assert_eq!(backend.get_item("todo-storage").unwrap().as_deref(), Some("second"));

        backend.remove_item("todo-storage").unwrap();
        assert_eq!(backend.get_item("todo-storage").unwrap(), None);

        // Removing twice is fine
        backend.remove_item("todo-storage").unwrap();
    }

    #[test]
    fn test_memory_backend() {
        exercise(&mut MemoryBackend::new());
    }

    #[test]
    fn test_file_backend() {
        let temp = TempDir::new().unwrap();
        let mut backend = FileBackend::open(temp.path().join("data")).unwrap();
        exercise(&mut backend);
        assert!(backend.base_path().exists());
    }

    #[test]
    fn test_file_backend_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let mut backend = FileBackend::open(temp.path()).unwrap();
        backend.set_item("todo-storage", "{}").unwrap();

        assert!(temp.path().join("todo-storage.json").exists());
        assert!(!temp.path().join("todo-storage.json.tmp").exists());
    }

    #[test]
    fn test_file_backend_persists_across_instances() {
        let temp = TempDir::new().unwrap();
        {
            let mut backend = FileBackend::open(temp.path()).unwrap();
            backend.set_item("todo-storage", "kept").unwrap();
        }
        let backend = FileBackend::open(temp.path()).unwrap();
        assert_eq!(backend.get_item("todo-storage").unwrap().as_deref(), Some("kept"));
    }

    #[test]
    fn test_sqlite_backend_in_memory() {
        exercise(&mut SqliteBackend::open_in_memory().unwrap());
    }

    #[test]
    fn test_sqlite_backend_on_disk() {
        let temp = TempDir::new().unwrap();
        {
            let mut backend = SqliteBackend::open(temp.path()).unwrap();
            backend.set_item("todo-storage", "kept").unwrap();
        }
        assert!(temp.path().join("todostore.db").exists());
        let backend = SqliteBackend::open(temp.path()).unwrap();
        assert_eq!(backend.get_item("todo-storage").unwrap().as_deref(), Some("kept"));
    }

    #[test]
    fn test_open_backend_boxed() {
        let temp = TempDir::new().unwrap();
        for kind in [BackendKind::File, BackendKind::Sqlite] {
            let mut backend = open_backend(kind, temp.path()).unwrap();
            backend.set_item("todo-storage", "boxed").unwrap();
            assert_eq!(backend.get_item("todo-storage").unwrap().as_deref(), Some("boxed"));
        }
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("todo-storage").is_ok());
        assert!(validate_key("todo_storage2").is_ok());

        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("has space").is_err());
        assert!(validate_key(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_invalid_key_rejected_by_backends() {
        let mut backend = MemoryBackend::new();
        assert!(backend.set_item("bad/key", "x").is_err());
        assert!(backend.get_item("bad/key").is_err());
    }
}
