//! # pddb
//!
//! A tabular store with a dynamic schema, driven by request parameters.
//!
//! ## Core idea
//! Clients never declare tables or columns. Parameter names carry the
//! intent: `record__<col>` writes a value, `where__<col>` and
//! `where_not__<col>` filter rows. Inserting a row with an unseen column
//! widens the table; every mutation rewrites the table's CSV snapshot
//! before it is acknowledged.

pub mod db;
pub mod error;
pub mod params;
pub mod persist;
pub mod server;
pub mod table;
pub mod types;

// Public re-exports for the top-level API
pub use db::{DB, Options, Outcome, PermissionMode, Stats};
pub use error::{Error, Result};
pub use params::{Assignments, Conditions, Operation, QueryIntent, classify};
pub use table::Table;
pub use types::{ID_COLUMN, Record, Value};
