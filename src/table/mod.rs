pub mod predicate;
pub mod schema;

use std::collections::HashSet;

use tracing::debug;

use crate::error::{Error, Result};
use crate::params::{Assignments, Conditions};
use crate::types::{Record, RowId, Value};
use predicate::Predicate;
use schema::Schema;

/// Stored row. `values[i]` belongs to `schema.columns()[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Row {
    pub(crate) id: RowId,
    pub(crate) values: Vec<Value>,
}

/// One named table with a dynamic, growing-only schema.
///
/// Every row is exactly as wide as the schema. Adding a column pads all
/// existing rows with `Null` in the same call, so no caller holding the
/// table can observe a partial-width row.
///
/// Row identifiers come from a per-table counter and are never reused or
/// renumbered; deleting rows only compacts the row order.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    schema: Schema,
    rows: Vec<Row>,
    next_id: RowId,
}

impl Table {
    /// Create an empty table. The name is expected to be normalized already.
    pub fn new(name: impl Into<String>) -> Self {
        Table {
            name: name.into(),
            schema: Schema::new(),
            rows: Vec::new(),
            next_id: 1,
        }
    }

    /// Rebuild a table from decoded snapshot parts. Each row must match the
    /// schema width and identifiers must be unique.
    pub fn from_parts(
        name: impl Into<String>,
        schema: Schema,
        rows: Vec<(RowId, Vec<Value>)>,
    ) -> Result<Self> {
        let name = name.into();
        let mut table = Table::new(name);
        let mut seen = HashSet::with_capacity(rows.len());
        table.rows.reserve(rows.len());
        for (id, values) in rows {
            if values.len() != schema.len() {
                return Err(Error::Corruption(format!(
                    "row {id} has {} values, schema has {} columns",
                    values.len(),
                    schema.len()
                )));
            }
            if !seen.insert(id) {
                return Err(Error::Corruption(format!("duplicate row id {id}")));
            }
            let after = id.checked_add(1).ok_or_else(|| {
                Error::Corruption(format!("row id {id} leaves no room for new rows"))
            })?;
            table.next_id = table.next_id.max(after);
            table.rows.push(Row { id, values });
        }
        table.schema = schema;
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Identifier the next insert will receive.
    pub fn next_id(&self) -> RowId {
        self.next_id
    }

    /// Every row in current order, as `(id, values)` aligned with the schema.
    pub fn rows(&self) -> impl Iterator<Item = (RowId, &[Value])> {
        self.rows.iter().map(|r| (r.id, r.values.as_slice()))
    }

    /// Rows matching every equals condition and every not-equals condition.
    /// Empty conditions match everything.
    pub fn find(&self, equals: &Conditions, not_equals: &Conditions) -> Vec<Record> {
        let predicate = Predicate::compile(&self.name, &self.schema, equals, not_equals);
        let found: Vec<Record> = self
            .rows
            .iter()
            .filter(|row| predicate.matches(row))
            .map(|row| self.record(row))
            .collect();
        debug!(table = %self.name, matched = found.len(), "find");
        found
    }

    /// First row `find` would return.
    pub fn find_one(&self, equals: &Conditions, not_equals: &Conditions) -> Option<Record> {
        let predicate = Predicate::compile(&self.name, &self.schema, equals, not_equals);
        self.rows
            .iter()
            .find(|row| predicate.matches(row))
            .map(|row| self.record(row))
    }

    /// Append a row with a fresh identifier. Unseen columns extend the
    /// schema; schema columns not assigned are `Null`.
    pub fn insert(&mut self, assignments: &Assignments) -> Result<Record> {
        let positions = self.extend_schema(assignments)?;

        let mut values = vec![Value::Null; self.schema.len()];
        for (pos, (_, value)) in positions.into_iter().zip(assignments.iter()) {
            values[pos] = value.clone();
        }

        let id = self.next_id;
        self.next_id += 1;
        self.rows.push(Row { id, values });
        debug!(table = %self.name, id, "inserted row");

        Ok(self.record(&self.rows[self.rows.len() - 1]))
    }

    /// Update matching rows in place and return them. Zero matches is not
    /// an error and inserts nothing; the schema is only extended when at
    /// least one row is updated.
    pub fn upsert(
        &mut self,
        assignments: &Assignments,
        equals: &Conditions,
        not_equals: &Conditions,
    ) -> Result<Vec<Record>> {
        for column in assignments.columns() {
            Schema::check_user_column(column)?;
        }

        let matched: Vec<usize> = {
            let predicate = Predicate::compile(&self.name, &self.schema, equals, not_equals);
            self.rows
                .iter()
                .enumerate()
                .filter(|(_, row)| predicate.matches(row))
                .map(|(idx, _)| idx)
                .collect()
        };
        if matched.is_empty() {
            debug!(table = %self.name, "upsert matched no rows");
            return Ok(Vec::new());
        }

        let positions = self.extend_schema(assignments)?;
        for &idx in &matched {
            let row = &mut self.rows[idx];
            for (&pos, (_, value)) in positions.iter().zip(assignments.iter()) {
                row.values[pos] = value.clone();
            }
        }
        debug!(table = %self.name, updated = matched.len(), "upsert");

        Ok(matched.iter().map(|&idx| self.record(&self.rows[idx])).collect())
    }

    /// Remove matching rows and return how many went away.
    pub fn delete(&mut self, equals: &Conditions, not_equals: &Conditions) -> usize {
        let before = self.rows.len();
        // Disjoint field borrows: the predicate reads name/schema, retain
        // mutates rows.
        let predicate = Predicate::compile(&self.name, &self.schema, equals, not_equals);
        self.rows.retain(|row| !predicate.matches(row));

        let removed = before - self.rows.len();
        debug!(table = %self.name, removed, "delete");
        removed
    }

    /// Validate every assigned column, then append the unseen ones and pad
    /// existing rows. Returns the schema position of each assignment, in
    /// assignment order.
    fn extend_schema(&mut self, assignments: &Assignments) -> Result<Vec<usize>> {
        for column in assignments.columns() {
            Schema::check_user_column(column)?;
        }

        let mut positions = Vec::with_capacity(assignments.len());
        for column in assignments.columns() {
            let before = self.schema.len();
            let pos = self.schema.ensure(column);
            if self.schema.len() > before {
                debug!(table = %self.name, column, "adding column");
            }
            positions.push(pos);
        }

        let width = self.schema.len();
        for row in &mut self.rows {
            row.values.resize(width, Value::Null);
        }
        Ok(positions)
    }

    fn record(&self, row: &Row) -> Record {
        let fields = self
            .schema
            .columns()
            .iter()
            .cloned()
            .zip(row.values.iter().cloned())
            .collect();
        Record::new(row.id, fields)
    }
}
