use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::schema::{self, SaveFile, Versioned};
use crate::demo;
use crate::models::{CurrentView, Timestamp};
use crate::Result;

/// The JSON save file holding one outline.
pub struct SaveFileStore {
    path: PathBuf,
}

impl SaveFileStore {
    /// Create a new store for the file at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the file, or write the demo outline first when it doesn't exist.
    pub fn read_or_create(&self, now: Timestamp) -> Result<SaveFile> {
        if self.exists() {
            return self.load();
        }
        let graph = demo::demo_graph(now)?;
        let root = graph.root()?;
        let file = SaveFile::from_graph(&graph, Some(CurrentView::Node { node_id: root }), false);
        self.save(&file)?;
        info!(path = %self.path.display(), "created save file with demo content");
        Ok(file)
    }

    /// Load and migrate to the current version.
    pub fn load(&self) -> Result<SaveFile> {
        Ok(self.load_versioned()?.into_current())
    }

    /// Load without migrating, to see which version is on disk.
    pub fn load_versioned(&self) -> Result<Versioned> {
        let json = fs::read_to_string(&self.path)?;
        Versioned::parse(&json)
    }

    /// Rewrite an older file in the current format. Returns the version it had.
    pub fn migrate(&self) -> Result<u32> {
        let versioned = self.load_versioned()?;
        let from = versioned.version();
        if from != schema::CURRENT_VERSION {
            self.save(&versioned.into_current())?;
            info!(path = %self.path.display(), from, to = schema::CURRENT_VERSION, "migrated save file");
        }
        Ok(from)
    }

    /// Write through a temporary file so a crash never leaves half a file.
    pub fn save(&self, file: &SaveFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(file)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), docs = file.nodes.len(), "saved");
        Ok(())
    }

    /// Copy the file as it is on disk
    pub fn backup<P: AsRef<Path>>(&self, backup_path: P) -> Result<()> {
        fs::copy(&self.path, backup_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use tempfile::tempdir;

    #[test]
    fn test_read_or_create_writes_demo() {
        let dir = tempdir().unwrap();
        let store = SaveFileStore::new(dir.path().join("outline.json"));
        assert!(!store.exists());

        let created = store.read_or_create(1_000).unwrap();
        assert!(store.exists());
        assert!(created.to_graph().unwrap().len() > 5);

        let loaded = store.read_or_create(2_000).unwrap();
        assert_eq!(loaded, created);
    }

    #[test]
    fn test_migrate_rewrites_old_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("old.json");
        fs::write(
            &path,
            r#"{"v": 2, "openedNode": "r", "nodes": [
                {"type": "node", "id": "r", "title": "Home", "ownerId": null, "checkbox": true,
                 "history": {"createdTime": 0, "lastModifiedTime": 0}}
            ]}"#,
        )
        .unwrap();

        let store = SaveFileStore::new(&path);
        assert_eq!(store.migrate().unwrap(), 2);
        assert_eq!(store.load_versioned().unwrap().version(), schema::CURRENT_VERSION);
        assert_eq!(store.migrate().unwrap(), schema::CURRENT_VERSION);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_unreadable_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"v\": 4}").unwrap();
        assert!(matches!(SaveFileStore::new(&path).load(), Err(Error::Schema(_))));
    }

    #[test]
    fn test_backup() {
        let dir = tempdir().unwrap();
        let store = SaveFileStore::new(dir.path().join("outline.json"));
        store.read_or_create(1).unwrap();
        let backup = dir.path().join("outline.bak.json");
        store.backup(&backup).unwrap();
        assert!(backup.exists());
    }
}
