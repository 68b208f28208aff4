use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::table::Table;
use crate::types::{ID_COLUMN, Value};

/// Serialize a table to CSV bytes.
///
/// ```text
/// __id__,Name,Color
/// 1,John,Blue
/// 2,"Doe, Jane",
/// ```
///
/// The identifier column comes first, then schema columns in order. `Null`
/// is an empty field; fields containing the delimiter, quotes or newlines
/// are quoted.
pub fn encode(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = Vec::with_capacity(table.schema().len() + 1);
    header.push(ID_COLUMN);
    header.extend(table.schema().columns().iter().map(String::as_str));
    writer.write_record(&header)?;

    for (id, values) in table.rows() {
        let id = id.to_string();
        let fields = std::iter::once(id.as_str())
            .chain(values.iter().map(|v| v.as_str().unwrap_or("")));
        writer.write_record(fields)?;
    }

    writer
        .into_inner()
        .map_err(|e| Error::Corruption(format!("failed to finish snapshot encoding: {e}")))
}

/// Replace `path` with a fresh snapshot of `table`.
///
/// The bytes go to `<path>.tmp` first, are flushed and fsync'd, then renamed
/// over `path`. A crash leaves either the old snapshot or the new one, never
/// a partial file.
pub fn write_snapshot(path: &Path, table: &Table) -> Result<()> {
    let data = encode(table)?;
    let tmp = tmp_path(path);

    if let Err(source) = write_then_rename(&tmp, path, &data) {
        let _ = fs::remove_file(&tmp);
        return Err(Error::Persistence {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

fn write_then_rename(tmp: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
    let file = File::create(tmp)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(data)?;

    // BufWriter.flush() → OS page cache, sync_all() → disk
    writer.flush()?;
    writer.get_ref().sync_all()?;
    fs::rename(tmp, path)
}

/// Temporary sibling used during an atomic replace.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Assignments;

    #[test]
    fn encode_quotes_delimiters_and_blanks_nulls() {
        let mut table = Table::new("t");
        table
            .insert(&Assignments::new().with("Name", "Doe, Jane"))
            .unwrap();
        table.insert(&Assignments::new().with("Color", "Red")).unwrap();

        let text = String::from_utf8(encode(&table).unwrap()).unwrap();
        assert_eq!(text, "__id__,Name,Color\n1,\"Doe, Jane\",\n2,,Red\n");
    }

    #[test]
    fn empty_table_encodes_header_only() {
        let table = Table::new("t");
        let text = String::from_utf8(encode(&table).unwrap()).unwrap();
        assert_eq!(text, "__id__\n");
    }
}
