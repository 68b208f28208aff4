use crate::error::{Error, Result};
use crate::types::{ID_COLUMN, validate_column_name};

/// Ordered, growing-only column list of a table.
///
/// Holds user columns only; the identifier column is implicit and always
/// sits in front of them. Position `i` here is position `i` in every
/// row's value vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an existing column list (snapshot load). Rejects invalid,
    /// duplicate, or reserved names.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Schema::new();
        for column in columns {
            let column = column.into();
            Self::check_user_column(&column)?;
            if schema.position(&column).is_some() {
                return Err(Error::Corruption(format!("duplicate column \"{column}\"")));
            }
            schema.columns.push(column);
        }
        Ok(schema)
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Append a column if absent and return its position. The caller is
    /// responsible for widening existing rows when this grows the schema.
    pub(crate) fn ensure(&mut self, column: &str) -> usize {
        match self.position(column) {
            Some(pos) => pos,
            None => {
                self.columns.push(column.to_string());
                self.columns.len() - 1
            }
        }
    }

    /// A name that can be written as a user column.
    pub fn check_user_column(column: &str) -> Result<()> {
        validate_column_name(column)?;
        if column == ID_COLUMN {
            return Err(Error::MalformedRequest(format!(
                "column \"{ID_COLUMN}\" is reserved for row identifiers"
            )));
        }
        Ok(())
    }
}
