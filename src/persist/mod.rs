//! Durable table snapshots.
//!
//! Each table is stored as one CSV file that is fully rewritten after every
//! mutation. There is no log: the last successful save wins.

pub mod reader;
pub mod writer;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::table::Table;

pub const SNAPSHOT_EXT: &str = "csv";

/// Where table snapshots live.
///
/// Implementations must make `save` a full replacement of the previous
/// snapshot: a later `load` sees exactly the last saved state.
pub trait SnapshotStore: Send + Sync {
    /// Durably write the current state of `table`.
    fn save(&self, table: &Table) -> Result<()>;

    /// Reconstruct a table. `Error::NotFound` if it was never saved.
    fn load(&self, name: &str) -> Result<Table>;

    /// Delete a table's snapshot. Missing snapshots are not an error.
    fn remove(&self, name: &str) -> Result<()>;

    /// Names of all stored tables, sorted.
    fn list(&self) -> Result<Vec<String>>;
}

/// One `<table>.csv` per table inside a database directory.
#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    /// Open (creating if needed) the snapshot directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(CsvStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{SNAPSHOT_EXT}"))
    }
}

impl SnapshotStore for CsvStore {
    fn save(&self, table: &Table) -> Result<()> {
        let path = self.path_for(table.name());
        writer::write_snapshot(&path, table)?;
        debug!(table = table.name(), path = %path.display(), rows = table.len(), "saved snapshot");
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Table> {
        reader::read_snapshot(name, &self.path_for(name))
    }

    fn remove(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path_for(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Store for non-persistent databases: nothing is written, nothing is found.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryStore;

impl SnapshotStore for MemoryStore {
    fn save(&self, _table: &Table) -> Result<()> {
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Table> {
        Err(Error::NotFound(format!("snapshot for table \"{name}\"")))
    }

    fn remove(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
