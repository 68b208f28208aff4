use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{Error, Result};

/// Name of the identifier column. Always the first column of every table,
/// assigned by the engine and never writable through assignments.
pub const ID_COLUMN: &str = "__id__";

/// Request token that stands for a null value.
pub const NULL_TOKEN: &str = "__null__";

/// Monotonic per-table row identifier.
pub type RowId = u64;

/// A single cell.
///
/// Everything is text at rest. An empty string is the same as `Null` because
/// the snapshot format cannot tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Value {
    #[default]
    Null,
    Text(String),
}

impl Value {
    /// Build a value from request text: `""` and `"__null__"` become `Null`.
    pub fn parse(raw: &str) -> Self {
        if raw == NULL_TOKEN {
            Value::Null
        } else {
            Value::from(raw)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Null => None,
            Value::Text(s) => Some(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Value::Null
        } else {
            Value::Text(s.to_string())
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        if s.is_empty() { Value::Null } else { Value::Text(s) }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Text(n.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// One row as handed back to callers: the identifier plus every schema
/// column in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: RowId,
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(id: RowId, fields: Vec<(String, Value)>) -> Self {
        Record { id, fields }
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    /// Look up a field by column name. `__id__` is not a field; use `id()`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    /// Column names in table order, identifier excluded.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Keep only the named columns, in table order. Unknown names are ignored.
    pub fn project(self, columns: &[String]) -> Self {
        if columns.is_empty() {
            return self;
        }
        let fields = self
            .fields
            .into_iter()
            .filter(|(name, _)| columns.iter().any(|c| c == name))
            .collect();
        Record { id: self.id, fields }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(ID_COLUMN, &self.id.to_string())?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Column names: `[A-Za-z0-9_]+`.
pub fn validate_column_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::MalformedRequest("empty column name".into()));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::MalformedRequest(format!(
            "invalid column name \"{name}\": only letters, digits and '_' are allowed"
        )));
    }
    Ok(())
}

/// Table and database names are case-insensitive: lowercased, then
/// checked against `[a-z0-9_]+`.
pub fn normalize_name(name: &str) -> Result<String> {
    let lowered = name.to_ascii_lowercase();
    if lowered.is_empty()
        || !lowered.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(Error::MalformedRequest(format!("invalid name \"{name}\"")));
    }
    Ok(lowered)
}
