// Table store tests
// Dynamic schema, filtering, in-place updates and deletion on a single table.

use pddb::{Assignments, Conditions, Record, Table, Value};

fn people() -> Table {
    let mut t = Table::new("people");
    t.insert(&Assignments::new().with("Name", "John").with("Color", "Blue"))
        .unwrap();
    t.insert(&Assignments::new().with("Name", "Jane").with("Color", "Red"))
        .unwrap();
    t.insert(&Assignments::new().with("Name", "Bob").with("Color", "Blue"))
        .unwrap();
    t
}

fn names(rows: &[Record]) -> Vec<String> {
    rows.iter()
        .map(|r| r.get("Name").map(|v| v.to_string()).unwrap_or_default())
        .collect()
}

fn none() -> Conditions {
    Conditions::new()
}

// =============================================================================
// Test 1: New column backfills every prior row with Null
// =============================================================================
#[test]
fn new_column_backfills_existing_rows() {
    let mut t = people();
    let n = t.len();

    t.insert(&Assignments::new().with("Name", "Eve").with("Age", "41"))
        .unwrap();

    assert_eq!(t.schema().columns(), ["Name", "Color", "Age"]);
    let rows = t.find(&none(), &none());
    assert_eq!(rows.len(), n + 1);
    for row in &rows {
        let cols: Vec<&str> = row.columns().collect();
        assert_eq!(cols, vec!["Name", "Color", "Age"]);
    }
    for row in &rows[..n] {
        assert_eq!(row.get("Age"), Some(&Value::Null));
    }
    assert_eq!(rows[n].get("Age"), Some(&Value::from("41")));
    // Eve never set Color.
    assert_eq!(rows[n].get("Color"), Some(&Value::Null));
}

// =============================================================================
// Test 2: Empty conditions return every row in insertion order
// =============================================================================
#[test]
fn empty_conditions_return_all_in_order() {
    let t = people();
    let rows = t.find(&none(), &none());
    assert_eq!(names(&rows), vec!["John", "Jane", "Bob"]);
    let ids: Vec<u64> = rows.iter().map(Record::id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

// =============================================================================
// Test 3: Equals is an exact filter
// =============================================================================
#[test]
fn equals_filters_exactly() {
    let t = people();
    let rows = t.find(&Conditions::new().with("Name", "John"), &none());
    assert_eq!(names(&rows), vec!["John"]);

    let rows = t.find(&Conditions::new().with("Color", "Blue"), &none());
    assert_eq!(names(&rows), vec!["John", "Bob"]);

    // Conjunction.
    let eq = Conditions::new().with("Color", "Blue").with("Name", "Bob");
    assert_eq!(names(&t.find(&eq, &none())), vec!["Bob"]);
}

// =============================================================================
// Test 4: Not-equals returns the complement among rows with a value
// =============================================================================
#[test]
fn not_equals_is_complement() {
    let t = people();
    let rows = t.find(&none(), &Conditions::new().with("Name", "John"));
    assert_eq!(names(&rows), vec!["Jane", "Bob"]);
}

// =============================================================================
// Test 5: A row without the column is excluded from both branches
// =============================================================================
#[test]
fn row_missing_column_matches_neither_branch() {
    let mut t = people();
    t.insert(&Assignments::new().with("Color", "Green")).unwrap();

    let eq = t.find(&Conditions::new().with("Name", "John"), &none());
    let ne = t.find(&none(), &Conditions::new().with("Name", "John"));

    assert_eq!(names(&eq), vec!["John"]);
    assert_eq!(names(&ne), vec!["Jane", "Bob"]);
    assert!(ne.iter().all(|r| r.get("Color") != Some(&Value::from("Green"))));

    // It is reachable by asking for Null explicitly.
    let nulls = t.find(&Conditions::new().with("Name", Value::Null), &none());
    assert_eq!(nulls.len(), 1);
    assert_eq!(nulls[0].get("Color"), Some(&Value::from("Green")));
}

// =============================================================================
// Test 6: Unknown condition columns match nothing
// =============================================================================
#[test]
fn unknown_condition_column_matches_nothing() {
    let t = people();
    assert!(t.find(&Conditions::new().with("Height", "180"), &none()).is_empty());
    assert!(t.find(&none(), &Conditions::new().with("Height", "180")).is_empty());
}

// =============================================================================
// Test 7: One-of conditions
// =============================================================================
#[test]
fn repeated_probe_values_mean_one_of() {
    let t = people();
    let eq = Conditions::new().with("Name", "John").with("Name", "Bob");
    assert_eq!(names(&t.find(&eq, &none())), vec!["John", "Bob"]);

    let ne = Conditions::new().with("Name", "John").with("Name", "Bob");
    assert_eq!(names(&t.find(&none(), &ne)), vec!["Jane"]);
}

// =============================================================================
// Test 8: Upsert touches only matching rows and assigned columns
// =============================================================================
#[test]
fn upsert_updates_only_matches() {
    let mut t = people();
    let updated = t
        .upsert(
            &Assignments::new().with("Color", "Yellow"),
            &Conditions::new().with("Name", "John"),
            &none(),
        )
        .unwrap();

    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].id(), 1);
    assert_eq!(updated[0].get("Color"), Some(&Value::from("Yellow")));
    assert_eq!(updated[0].get("Name"), Some(&Value::from("John")));

    let rows = t.find(&none(), &none());
    let colors: Vec<String> = rows
        .iter()
        .map(|r| r.get("Color").unwrap().to_string())
        .collect();
    assert_eq!(colors, vec!["Yellow", "Red", "Blue"]);
}

// =============================================================================
// Test 9: Upsert with no match is a no-op
// =============================================================================
#[test]
fn upsert_without_match_inserts_nothing() {
    let mut t = people();
    let updated = t
        .upsert(
            &Assignments::new().with("Shoe", "42"),
            &Conditions::new().with("Name", "Nobody"),
            &none(),
        )
        .unwrap();
    assert!(updated.is_empty());
    assert_eq!(t.len(), 3);
    assert!(!t.schema().contains("Shoe"));
}

// =============================================================================
// Test 10: Upsert can add a column to the matched rows
// =============================================================================
#[test]
fn upsert_extends_schema() {
    let mut t = people();
    t.upsert(
        &Assignments::new().with("Shoe", "42"),
        &none(),
        &Conditions::new().with("Color", "Red"),
    )
    .unwrap();

    let rows = t.find(&none(), &none());
    let shoes: Vec<Value> = rows.iter().map(|r| r.get("Shoe").cloned().unwrap()).collect();
    assert_eq!(shoes, vec![Value::from("42"), Value::Null, Value::from("42")]);
}

// =============================================================================
// Test 11: Delete with no match leaves the table unchanged
// =============================================================================
#[test]
fn delete_without_match_is_zero() {
    let mut t = people();
    let before = t.find(&none(), &none());
    assert_eq!(t.delete(&Conditions::new().with("Name", "Nobody"), &none()), 0);
    assert_eq!(t.find(&none(), &none()), before);
}

// =============================================================================
// Test 12: Delete keeps surviving identifiers and never reuses them
// =============================================================================
#[test]
fn delete_keeps_ids_stable() {
    let mut t = people();
    assert_eq!(t.delete(&Conditions::new().with("Name", "Jane"), &none()), 1);

    let ids: Vec<u64> = t.find(&none(), &none()).iter().map(Record::id).collect();
    assert_eq!(ids, vec![1, 3]);

    let rec = t.insert(&Assignments::new().with("Name", "Zed")).unwrap();
    assert_eq!(rec.id(), 4);
}

// =============================================================================
// Test 13: Columns survive deleting every row
// =============================================================================
#[test]
fn schema_is_monotonic() {
    let mut t = people();
    assert_eq!(t.delete(&none(), &none()), 3);
    assert!(t.is_empty());
    assert_eq!(t.schema().columns(), ["Name", "Color"]);
}

// =============================================================================
// Test 14: Conditions on the identifier column
// =============================================================================
#[test]
fn identifier_is_queryable() {
    let mut t = people();
    let rows = t.find(&Conditions::new().with("__id__", "2"), &none());
    assert_eq!(names(&rows), vec!["Jane"]);

    assert_eq!(t.delete(&Conditions::new().with("__id__", "3"), &none()), 1);
    assert_eq!(names(&t.find(&none(), &none())), vec!["John", "Jane"]);
}

// =============================================================================
// Test 15: find_one returns the first match
// =============================================================================
#[test]
fn find_one_returns_first() {
    let t = people();
    let rec = t.find_one(&Conditions::new().with("Color", "Blue"), &none()).unwrap();
    assert_eq!(rec.get("Name"), Some(&Value::from("John")));
    assert!(t.find_one(&Conditions::new().with("Color", "Pink"), &none()).is_none());
}

// =============================================================================
// Test 16: Identifier column cannot be assigned
// =============================================================================
#[test]
fn identifier_is_not_writable() {
    let mut t = people();
    assert!(t.insert(&Assignments::new().with("__id__", "99")).is_err());
    let err = t.upsert(
        &Assignments::new().with("__id__", "99"),
        &Conditions::new().with("Name", "John"),
        &none(),
    );
    assert!(err.is_err());
    assert_eq!(t.find_one(&Conditions::new().with("Name", "John"), &none()).unwrap().id(), 1);
}
