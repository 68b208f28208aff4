//! The database engine: a registry of named tables behind a permission gate.
//!
//! Every mutation runs under the table's write lock and is saved before the
//! call returns (write-through), so the lock also serializes snapshot writes
//! for that table. Reads share the lock.

pub mod options;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::params::{self, Assignments, Conditions, Operation, QueryIntent};
use crate::persist::{CsvStore, MemoryStore, SnapshotStore};
use crate::table::Table;
use crate::types::{Record, normalize_name};

pub use options::{Options, PermissionMode};

type SharedTable = Arc<RwLock<Table>>;

/// Result of a request-level [`DB::execute`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// find, upsert.
    Rows(Vec<Record>),
    /// find_one (`None` when nothing matched), insert.
    Row(Option<Record>),
    /// delete.
    Count(usize),
    /// drop: whether the table existed.
    Dropped(bool),
}

/// Point-in-time counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub tables: usize,
    pub rows: usize,
    pub reads: u64,
    /// Mutating calls that completed against an existing table, including
    /// ones that matched nothing.
    pub writes: u64,
    pub saves: u64,
    pub save_failures: u64,
}

#[derive(Default)]
struct Counters {
    reads: AtomicU64,
    writes: AtomicU64,
    saves: AtomicU64,
    save_failures: AtomicU64,
}

/// One database instance.
pub struct DB {
    name: String,
    options: Options,
    store: Box<dyn SnapshotStore>,
    tables: RwLock<HashMap<String, SharedTable>>,
    counters: Counters,
}

impl DB {
    /// Open a database, loading existing snapshots when `auto_load` is set.
    ///
    /// Persistent databases live in `<root_dir>/<name>/`.
    pub fn open(name: &str, options: Options) -> Result<Self> {
        let name = normalize_name(name)?;
        let store: Box<dyn SnapshotStore> = if options.persistent {
            Box::new(CsvStore::open(options.root_dir.join(&name))?)
        } else {
            Box::new(MemoryStore)
        };
        Self::with_store(&name, options, store)
    }

    /// Open a database over a caller-provided snapshot store.
    pub fn with_store(
        name: &str,
        mut options: Options,
        store: Box<dyn SnapshotStore>,
    ) -> Result<Self> {
        let name = normalize_name(name)?;
        options.table_permissions = options
            .table_permissions
            .into_iter()
            .map(|(table, mode)| (table.to_ascii_lowercase(), mode))
            .collect();

        let db = DB {
            name,
            options,
            store,
            tables: RwLock::new(HashMap::new()),
            counters: Counters::default(),
        };

        if db.options.auto_load {
            let names = db.store.list()?;
            let mut tables = db.tables.write();
            for table_name in names {
                let key = match normalize_name(&table_name) {
                    Ok(key) if key == table_name => key,
                    _ => {
                        warn!(db = %db.name, file = %table_name, "skipping snapshot with invalid table name");
                        continue;
                    }
                };
                let table = db.store.load(&key)?;
                info!(db = %db.name, table = %key, rows = table.len(), "loaded table");
                tables.insert(key, Arc::new(RwLock::new(table)));
            }
        }

        info!(
            db = %db.name,
            permissions = %db.options.permissions,
            persistent = db.options.persistent,
            "database open"
        );
        Ok(db)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Existing table names, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Column names of a table, identifier first.
    pub fn schema(&self, table: &str) -> Result<Vec<String>> {
        let key = normalize_name(table)?;
        let table = self
            .get_table(&key)
            .ok_or_else(|| Error::NotFound(format!("table \"{key}\"")))?;
        let guard = table.read();
        let mut columns = Vec::with_capacity(guard.schema().len() + 1);
        columns.push(crate::types::ID_COLUMN.to_string());
        columns.extend(guard.schema().columns().iter().cloned());
        Ok(columns)
    }

    /// Effective permission for a table.
    pub fn permission_for(&self, table: &str) -> PermissionMode {
        self.options.permission_for(&table.to_ascii_lowercase())
    }

    pub fn find(
        &self,
        table: &str,
        equals: &Conditions,
        not_equals: &Conditions,
    ) -> Result<Vec<Record>> {
        let key = normalize_name(table)?;
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        let Some(shared) = self.get_table(&key) else {
            return Ok(Vec::new());
        };
        let found = shared.read().find(equals, not_equals);
        Ok(found)
    }

    pub fn find_one(
        &self,
        table: &str,
        equals: &Conditions,
        not_equals: &Conditions,
    ) -> Result<Option<Record>> {
        let key = normalize_name(table)?;
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        let Some(shared) = self.get_table(&key) else {
            return Ok(None);
        };
        let found = shared.read().find_one(equals, not_equals);
        Ok(found)
    }

    /// Insert a row, creating the table on first use.
    pub fn insert(&self, table: &str, assignments: &Assignments) -> Result<Record> {
        let key = self.check_write(table, Operation::Insert)?;
        loop {
            let shared = self.get_or_create(&key);
            let mut guard = shared.write();
            if !self.is_registered(&key, &shared) {
                // Dropped while we waited for the lock.
                continue;
            }
            let record = guard.insert(assignments)?;
            self.persist(&guard)?;
            self.counters.writes.fetch_add(1, Ordering::Relaxed);
            return Ok(record);
        }
    }

    /// Update rows matching the conditions. Nothing matched means nothing
    /// is written, not even the table.
    pub fn upsert(
        &self,
        table: &str,
        assignments: &Assignments,
        equals: &Conditions,
        not_equals: &Conditions,
    ) -> Result<Vec<Record>> {
        let key = self.check_write(table, Operation::Upsert)?;
        loop {
            let Some(shared) = self.get_table(&key) else {
                return Ok(Vec::new());
            };
            let mut guard = shared.write();
            if !self.is_registered(&key, &shared) {
                continue;
            }
            let updated = guard.upsert(assignments, equals, not_equals)?;
            if !updated.is_empty() {
                self.persist(&guard)?;
            }
            self.counters.writes.fetch_add(1, Ordering::Relaxed);
            return Ok(updated);
        }
    }

    /// Remove matching rows and return the count.
    pub fn delete(
        &self,
        table: &str,
        equals: &Conditions,
        not_equals: &Conditions,
    ) -> Result<usize> {
        let key = self.check_write(table, Operation::Delete)?;
        loop {
            let Some(shared) = self.get_table(&key) else {
                return Ok(0);
            };
            let mut guard = shared.write();
            if !self.is_registered(&key, &shared) {
                continue;
            }
            let removed = guard.delete(equals, not_equals);
            if removed > 0 {
                self.persist(&guard)?;
            }
            self.counters.writes.fetch_add(1, Ordering::Relaxed);
            return Ok(removed);
        }
    }

    /// Drop a table and its snapshot. Returns whether it existed.
    ///
    /// The snapshot is removed before the table leaves the registry, both
    /// under the table's write lock. A writer that was waiting on that lock
    /// finds the table gone and starts over on a fresh one, so it never
    /// saves a dropped table or shares a snapshot file with its successor.
    pub fn drop_table(&self, table: &str) -> Result<bool> {
        let key = self.check_write(table, Operation::Drop)?;
        loop {
            let Some(shared) = self.get_table(&key) else {
                return Ok(false);
            };
            let _guard = shared.write();
            if !self.is_registered(&key, &shared) {
                continue;
            }
            self.store.remove(&key)?;
            self.tables.write().remove(&key);
            self.counters.writes.fetch_add(1, Ordering::Relaxed);
            info!(db = %self.name, table = %key, "dropped table");
            return Ok(true);
        }
    }

    /// Classify raw request parameters and run the operation.
    pub fn execute<I, K, V>(&self, op: Operation, table: &str, params: I) -> Result<Outcome>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let QueryIntent {
            assignments,
            equals,
            not_equals,
            columns,
        } = params::classify(op, params)?;
        debug!(db = %self.name, table, op = %op, "execute");

        Ok(match op {
            Operation::Find => Outcome::Rows(
                self.find(table, &equals, &not_equals)?
                    .into_iter()
                    .map(|r| r.project(&columns))
                    .collect(),
            ),
            Operation::FindOne => Outcome::Row(
                self.find_one(table, &equals, &not_equals)?
                    .map(|r| r.project(&columns)),
            ),
            Operation::Insert => Outcome::Row(Some(self.insert(table, &assignments)?)),
            Operation::Upsert => {
                Outcome::Rows(self.upsert(table, &assignments, &equals, &not_equals)?)
            }
            Operation::Delete => Outcome::Count(self.delete(table, &equals, &not_equals)?),
            Operation::Drop => Outcome::Dropped(self.drop_table(table)?),
        })
    }

    pub fn stats(&self) -> Stats {
        // Table locks are taken after the registry lock is released.
        let tables: Vec<SharedTable> = self.tables.read().values().cloned().collect();
        Stats {
            tables: tables.len(),
            rows: tables.iter().map(|t| t.read().len()).sum(),
            reads: self.counters.reads.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            saves: self.counters.saves.load(Ordering::Relaxed),
            save_failures: self.counters.save_failures.load(Ordering::Relaxed),
        }
    }

    /// Normalize the table name and enforce write permission.
    fn check_write(&self, table: &str, op: Operation) -> Result<String> {
        let key = normalize_name(table)?;
        if !self.options.permission_for(&key).allows_writes() {
            warn!(db = %self.name, table = %key, op = %op, "write rejected: read-only");
            return Err(Error::PermissionDenied {
                table: key,
                operation: op.name(),
            });
        }
        Ok(key)
    }

    fn get_table(&self, key: &str) -> Option<SharedTable> {
        self.tables.read().get(key).cloned()
    }

    /// Whether `shared` is still the table registered under `key`. Callers
    /// hold its lock; lock order is always table, then registry.
    fn is_registered(&self, key: &str, shared: &SharedTable) -> bool {
        self.tables
            .read()
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, shared))
    }

    fn get_or_create(&self, key: &str) -> SharedTable {
        if let Some(table) = self.get_table(key) {
            return table;
        }
        let mut tables = self.tables.write();
        tables
            .entry(key.to_string())
            .or_insert_with(|| {
                info!(db = %self.name, table = %key, "creating table");
                Arc::new(RwLock::new(Table::new(key)))
            })
            .clone()
    }

    /// Save while the caller still holds the table's write lock.
    fn persist(&self, table: &Table) -> Result<()> {
        match self.store.save(table) {
            Ok(()) => {
                self.counters.saves.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.counters.save_failures.fetch_add(1, Ordering::Relaxed);
                warn!(db = %self.name, table = table.name(), error = %e, "snapshot save failed");
                Err(e)
            }
        }
    }
}
