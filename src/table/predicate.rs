use tracing::warn;

use crate::params::Conditions;
use crate::table::schema::Schema;
use crate::table::Row;
use crate::types::{ID_COLUMN, Value};

/// Where a condition column lives in a row.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Id,
    Field(usize),
}

/// Conditions resolved against a schema once, then evaluated per row.
///
/// Semantics per cell:
///   - equals: the cell equals one of the probes (a `Null` probe matches
///     a `Null` cell)
///   - not-equals: the cell is non-null and differs from every probe
///   - a column missing from the schema matches no row, in either branch
pub(crate) struct Predicate<'a> {
    equals: Vec<(Slot, &'a [Value])>,
    not_equals: Vec<(Slot, &'a [Value])>,
    unsatisfiable: bool,
}

impl<'a> Predicate<'a> {
    pub(crate) fn compile(
        table: &str,
        schema: &Schema,
        equals: &'a Conditions,
        not_equals: &'a Conditions,
    ) -> Self {
        let mut unsatisfiable = false;
        let mut resolve = |conds: &'a Conditions| -> Vec<(Slot, &'a [Value])> {
            let mut out = Vec::with_capacity(conds.len());
            for (column, probes) in conds.iter() {
                let slot = if column == ID_COLUMN {
                    Slot::Id
                } else if let Some(pos) = schema.position(column) {
                    Slot::Field(pos)
                } else {
                    warn!(table, column, "condition on unknown column matches nothing");
                    unsatisfiable = true;
                    continue;
                };
                out.push((slot, probes));
            }
            out
        };
        let equals = resolve(equals);
        let not_equals = resolve(not_equals);

        Predicate {
            equals,
            not_equals,
            unsatisfiable,
        }
    }

    pub(crate) fn matches(&self, row: &Row) -> bool {
        if self.unsatisfiable {
            return false;
        }
        self.equals
            .iter()
            .all(|(slot, probes)| probes.iter().any(|p| cell_equals(row, *slot, p)))
            && self.not_equals.iter().all(|(slot, probes)| {
                !cell_is_null(row, *slot) && probes.iter().all(|p| !cell_equals(row, *slot, p))
            })
    }
}

fn cell_is_null(row: &Row, slot: Slot) -> bool {
    match slot {
        Slot::Id => false,
        Slot::Field(pos) => row.values[pos].is_null(),
    }
}

fn cell_equals(row: &Row, slot: Slot, probe: &Value) -> bool {
    match slot {
        Slot::Id => probe
            .as_str()
            .and_then(|s| s.parse::<u64>().ok())
            .is_some_and(|id| id == row.id),
        Slot::Field(pos) => row.values[pos] == *probe,
    }
}
