//! Request parameter classification.
//!
//! Turns a flat list of `(name, value)` pairs into a [`QueryIntent`]:
//!
//! ```text
//! record__<col>=v     → assignments[col] = v
//! where__<col>=v      → equals[col] ∋ v
//! where_not__<col>=v  → not_equals[col] ∋ v
//! <col>=v             → default bucket of the operation
//! ```
//!
//! The default bucket is `equals` for find/delete and `assignments` for
//! insert. Upsert has none: both readings are plausible, so an unprefixed
//! name there is rejected.

pub mod intent;

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::{ID_COLUMN, Value, validate_column_name};

pub use intent::{Assignments, Conditions, QueryIntent};

pub const RECORD_PREFIX: &str = "record__";
pub const WHERE_PREFIX: &str = "where__";
pub const WHERE_NOT_PREFIX: &str = "where_not__";

/// Projection control parameter (`columns=a,b`).
pub const COLUMNS_PARAM: &str = "columns";

/// Parameters dropped before classification. `_` is the cache-busting
/// token browsers append to GET requests.
pub const RESERVED_PARAMS: &[&str] = &["_"];

/// Operations reachable through the request protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Find,
    FindOne,
    Insert,
    Upsert,
    Delete,
    Drop,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Find => "find",
            Operation::FindOne => "find_one",
            Operation::Insert => "insert",
            Operation::Upsert => "upsert",
            Operation::Delete => "delete",
            Operation::Drop => "drop",
        }
    }

    /// Whether the operation needs write permission.
    pub fn is_mutating(self) -> bool {
        !matches!(self, Operation::Find | Operation::FindOne)
    }

    fn default_bucket(self) -> Option<Bucket> {
        match self {
            Operation::Find | Operation::FindOne | Operation::Delete => Some(Bucket::Equals),
            Operation::Insert => Some(Bucket::Assignments),
            Operation::Upsert | Operation::Drop => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "find" => Ok(Operation::Find),
            "find_one" => Ok(Operation::FindOne),
            "insert" => Ok(Operation::Insert),
            "upsert" => Ok(Operation::Upsert),
            "delete" => Ok(Operation::Delete),
            "drop" => Ok(Operation::Drop),
            other => Err(Error::NotFound(format!("operation \"{other}\""))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Assignments,
    Equals,
    NotEquals,
}

/// Split a parameter name into its bucket and column. `None` as bucket
/// means the name carried no recognized prefix.
fn split_prefix(name: &str) -> (Option<Bucket>, &str) {
    if let Some(col) = name.strip_prefix(RECORD_PREFIX) {
        (Some(Bucket::Assignments), col)
    } else if let Some(col) = name.strip_prefix(WHERE_NOT_PREFIX) {
        (Some(Bucket::NotEquals), col)
    } else if let Some(col) = name.strip_prefix(WHERE_PREFIX) {
        (Some(Bucket::Equals), col)
    } else {
        (None, name)
    }
}

/// Classify request parameters for `op`.
///
/// Parameter order is preserved within each bucket, so insert creates new
/// columns in the order the caller listed them.
pub fn classify<I, K, V>(op: Operation, params: I) -> Result<QueryIntent>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut intent = QueryIntent::default();

    for (name, raw) in params {
        let name = name.as_ref();
        let raw = raw.as_ref();

        if RESERVED_PARAMS.contains(&name) {
            continue;
        }
        if name == COLUMNS_PARAM {
            intent.columns.extend(
                raw.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from),
            );
            continue;
        }

        let (prefix, column) = split_prefix(name);
        let bucket = match (prefix, op.default_bucket()) {
            (Some(bucket), _) => bucket,
            (None, Some(bucket)) => bucket,
            (None, None) if op == Operation::Upsert => {
                return Err(Error::AmbiguousParameter(format!(
                    "\"{name}\" has no prefix; upsert needs record__, where__ or where_not__"
                )));
            }
            (None, None) => {
                return Err(Error::MalformedRequest(format!(
                    "{op} does not accept parameter \"{name}\""
                )));
            }
        };
        validate_column_name(column)?;

        let value = Value::parse(raw);
        match bucket {
            Bucket::Assignments => {
                if column == ID_COLUMN {
                    return Err(Error::MalformedRequest(format!(
                        "column \"{ID_COLUMN}\" is assigned by the engine"
                    )));
                }
                intent.assignments.set(column, value);
            }
            Bucket::Equals => intent.equals.add(column, value),
            Bucket::NotEquals => intent.not_equals.add(column, value),
        }
    }

    check_shape(op, &intent)?;
    Ok(intent)
}

/// Reject intents whose buckets don't fit the operation.
fn check_shape(op: Operation, intent: &QueryIntent) -> Result<()> {
    if let Some((column, _)) = intent
        .equals
        .iter()
        .find(|(column, _)| intent.not_equals.contains(column))
    {
        return Err(Error::AmbiguousParameter(format!(
            "column \"{column}\" appears in both where__ and where_not__"
        )));
    }

    let malformed = |msg: &str| Err(Error::MalformedRequest(format!("{op}: {msg}")));

    if !intent.columns.is_empty() && !matches!(op, Operation::Find | Operation::FindOne) {
        return malformed("column projection is only supported on find");
    }

    match op {
        Operation::Find | Operation::FindOne | Operation::Delete => {
            if !intent.assignments.is_empty() {
                return malformed("record__ parameters are not accepted");
            }
        }
        Operation::Insert => {
            if intent.has_conditions() {
                return malformed("where__/where_not__ parameters are not accepted");
            }
            if intent.assignments.is_empty() {
                return malformed("at least one value is required");
            }
        }
        Operation::Upsert => {
            if intent.assignments.is_empty() {
                return malformed("at least one record__ parameter is required");
            }
            if !intent.has_conditions() {
                return malformed("at least one where__ or where_not__ parameter is required");
            }
        }
        Operation::Drop => {
            if !intent.assignments.is_empty() || intent.has_conditions() {
                return malformed("no parameters are accepted");
            }
        }
    }
    Ok(())
}
