use crate::{Error, Result};
use rusqlite::Connection as SqliteConnection;
use std::path::{Path, PathBuf};

pub type Connection = SqliteConnection;

/// Version of `schema.sql` written into the `metadata` table.
pub const SETTINGS_SCHEMA_VERSION: i32 = 1;

/// SQLite database holding the key-value settings store
pub struct Database {
    db_path: PathBuf,
}

impl Database {
    /// Create a new database manager
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Get a connection to an existing database
    pub fn connect(&self) -> Result<Connection> {
        let conn = SqliteConnection::open(&self.db_path)?;
        self.check_version(&conn)?;
        Ok(conn)
    }

    /// Create a new database and initialize it with the schema
    pub fn create(&self) -> Result<Connection> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = SqliteConnection::open(&self.db_path)?;
        self.initialize_schema(&conn)?;
        Ok(conn)
    }

    /// An in-memory database, used by tests and dry runs
    pub fn in_memory() -> Result<Connection> {
        let conn = SqliteConnection::open_in_memory()?;
        conn.execute_batch(include_str!("../../schema.sql"))?;
        Ok(conn)
    }

    fn initialize_schema(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!("../../schema.sql"))?;
        Ok(())
    }

    fn check_version(&self, conn: &Connection) -> Result<()> {
        let version = self.get_schema_version(conn)?;
        if version > SETTINGS_SCHEMA_VERSION {
            return Err(Error::Schema(format!(
                "settings database {} has version {version}, newest supported is {SETTINGS_SCHEMA_VERSION}",
                self.db_path.display()
            )));
        }
        Ok(())
    }

    /// Check if the database exists
    pub fn exists(&self) -> bool {
        self.db_path.exists()
    }

    /// Get or create a database connection
    pub fn get_or_create(&self) -> Result<Connection> {
        if self.exists() {
            self.connect()
        } else {
            self.create()
        }
    }

    /// Get the database path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Get the current schema version
    pub fn get_schema_version(&self, conn: &Connection) -> Result<i32> {
        let version: String = conn.query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )?;

        version
            .parse::<i32>()
            .map_err(|_| Error::Schema(format!("invalid settings schema version: {version}")))
    }

    /// Backup the database
    pub fn backup<P: AsRef<Path>>(&self, backup_path: P) -> Result<()> {
        std::fs::copy(&self.db_path, backup_path)?;
        Ok(())
    }
}
