//! Durable persistence for sections and notes on local disk.
//!
//! A [`Storage`] wraps one `rusqlite::Connection` configured for a
//! single-writer desktop workload: WAL journaling, `synchronous = NORMAL`,
//! a bounded page cache and enforced foreign keys. The schema is applied
//! with `CREATE ... IF NOT EXISTS`, so opening an existing store is a no-op.

use crate::{Result, TypewriterError};
use log::{debug, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Name of the per-user data directory under the home directory.
pub const DATA_DIR_NAME: &str = "TypeWriter";

/// File name of the notes database inside the data directory.
pub const DB_FILE_NAME: &str = "notes.db";

const PRAGMAS: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA cache_size = 1000;
    PRAGMA foreign_keys = ON;
";

/// An open handle to the on-disk note store.
///
/// Construction *is* initialization: a `Storage` only exists once the file
/// has been opened, configured and its schema ensured, so no operation can
/// observe a half-initialized handle. Dropping the value closes the
/// connection.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Opens (or creates) the store at the platform-conventional location,
    /// `<home>/TypeWriter/notes.db`, creating the directory if absent.
    ///
    /// # Errors
    ///
    /// Returns [`TypewriterError::Init`] if the directory cannot be created
    /// or the store cannot be opened.
    pub fn open_default(key: Option<&str>) -> Result<Self> {
        Self::open(default_db_path(), key)
    }

    /// Opens (or creates) the store at `path` and ensures the schema exists.
    ///
    /// `key` is an optional passthrough to the `key` pragma. Plain SQLite
    /// ignores it; it is applied via [`Connection::pragma_update`], which
    /// escapes the value rather than splicing it into the statement text.
    ///
    /// # Errors
    ///
    /// Returns [`TypewriterError::Init`] if the parent directory cannot be
    /// created, the file cannot be opened, or the schema cannot be applied
    /// (e.g. permissions or a corrupt file). On failure no handle exists.
    pub fn open<P: AsRef<Path>>(path: P, key: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                TypewriterError::Init(format!(
                    "cannot create data directory {}: {e}",
                    dir.display()
                ))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            TypewriterError::Init(format!("cannot open {}: {e}", path.display()))
        })?;

        if let Some(key) = key {
            conn.pragma_update(None, "key", key).map_err(|e| {
                TypewriterError::Init(format!("cannot apply store key: {e}"))
            })?;
        }

        conn.execute_batch(PRAGMAS)
            .and_then(|()| conn.execute_batch(include_str!("schema.sql")))
            .map_err(|e| {
                TypewriterError::Init(format!("cannot prepare {}: {e}", path.display()))
            })?;

        info!("opened note store at {}", path.display());
        Ok(Self { conn })
    }

    /// Returns the underlying SQLite connection.
    ///
    /// Callers must bind all caller-controlled values as statement
    /// parameters; no value is ever interpolated into statement text.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Closes the handle, reporting any error SQLite raises on close.
    ///
    /// Dropping a `Storage` also closes the connection; this method only
    /// exists for callers that want the error.
    pub fn close(self) -> Result<()> {
        debug!("closing note store");
        self.conn
            .close()
            .map_err(|(_, e)| TypewriterError::Database(e))
    }
}

/// Returns `<home>/TypeWriter`, the per-user data directory.
///
/// Home resolution follows platform convention; if no home directory can be
/// determined the current directory is used, matching first-run behavior of
/// portable installs.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    let home = if cfg!(windows) {
        std::env::var("USERPROFILE")
    } else {
        std::env::var("HOME")
    };
    let home = home.unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(DATA_DIR_NAME)
}

/// Returns the full path of the notes database, `<home>/TypeWriter/notes.db`.
#[must_use]
pub fn default_db_path() -> PathBuf {
    default_data_dir().join(DB_FILE_NAME)
}
