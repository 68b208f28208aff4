use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Error, Result};
use crate::table::Table;
use crate::table::schema::Schema;
use crate::types::{ID_COLUMN, RowId, Value};

/// Rebuild a table from CSV bytes produced by [`super::writer::encode`].
///
/// Strict: the header must start with the identifier column, column names
/// must be valid and unique, identifiers numeric and unique, and every record
/// as wide as the header. Anything else is `Corruption`; a snapshot that only
/// half parses is never loaded.
pub fn decode(name: &str, data: &[u8]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let mut columns = headers.iter();
    match columns.next() {
        Some(first) if first == ID_COLUMN => {}
        Some(other) => {
            return Err(Error::Corruption(format!(
                "table \"{name}\": first column is \"{other}\", expected \"{ID_COLUMN}\""
            )));
        }
        None => {
            return Err(Error::Corruption(format!("table \"{name}\": missing header")));
        }
    }
    let schema = Schema::from_columns(columns).map_err(|e| match e {
        Error::MalformedRequest(msg) => Error::Corruption(format!("table \"{name}\": {msg}")),
        other => other,
    })?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut fields = record.iter();
        let raw_id = fields.next().unwrap_or("");
        let id: RowId = raw_id.parse().map_err(|_| {
            Error::Corruption(format!("table \"{name}\": invalid row id \"{raw_id}\""))
        })?;
        let values: Vec<Value> = fields.map(Value::from).collect();
        rows.push((id, values));
    }

    Table::from_parts(name, schema, rows)
}

/// Read and decode the snapshot at `path`. A missing file is `NotFound`.
pub fn read_snapshot(name: &str, path: &Path) -> Result<Table> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::NotFound(format!("snapshot for table \"{name}\"")));
        }
        Err(e) => return Err(e.into()),
    };
    decode(name, &data)
}
