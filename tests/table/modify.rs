use std::{fs, path::PathBuf};

use tempdir::TempDir;

use tally::{AggregateOp, DBError, DataType, FieldValue, RecordStore, Row, Schema, Table};


fn sales_schema() -> Schema {
    Schema::new("ventas")
        .column("id", DataType::Integer)
        .column("sucursal", DataType::Integer)
        .column("monto", DataType::Float)
        .column("cliente", DataType::String)
        .key("id", true)
}


fn record(sucursal: i64, monto: f64, cliente: &str) -> Row {
    Row::from([
        ("sucursal".to_string(), FieldValue::Integer(sucursal)),
        ("monto".to_string(), FieldValue::Float(monto)),
        ("cliente".to_string(), FieldValue::from(cliente)),
    ])
}


/// a store with three rows in a fresh temp dir
fn seeded_store(dir: &TempDir) -> (RecordStore, PathBuf) {
    let path = dir.path().join("ventas.csv");
    let mut store = RecordStore::create(&path, sales_schema()).expect("unable to create the store");
    store.insert(record(1, 100.0, "Ana")).unwrap();
    store.insert(record(1, 50.0, "Luis")).unwrap();
    store.insert(record(2, 30.0, "Zoë, S.A.")).unwrap();
    (store, path)
}


#[test]
fn test_create_writes_header_only_file() {
    let dir = TempDir::new("test_create").expect("Unable to create temporary directory");
    let path = dir.path().join("ventas.csv");

    let store = RecordStore::create(&path, sales_schema()).unwrap();
    assert!(store.list().is_empty());
    assert_eq!(fs::read_to_string(&path).unwrap(), "id,sucursal,monto,cliente\n");
}


#[test]
fn test_open_missing_file_is_not_found() {
    let dir = TempDir::new("test_open_missing").expect("Unable to create temporary directory");
    let result = RecordStore::open(dir.path().join("nope.csv"), sales_schema());
    assert!(matches!(result, Err(DBError::FileNotFound(_))));
}


#[test]
fn test_csv_round_trip() {
    let dir = TempDir::new("test_round_trip").expect("Unable to create temporary directory");
    let (store, path) = seeded_store(&dir);

    let reopened = RecordStore::open(&path, sales_schema()).unwrap();
    assert_eq!(reopened.list(), store.list());
    assert_eq!(reopened.list().to_csv().unwrap(), fs::read(&path).unwrap());
}


#[test]
fn test_json_export_is_idempotent() {
    let dir = TempDir::new("test_json").expect("Unable to create temporary directory");
    let (store, _) = seeded_store(&dir);

    let first = store.export(tally::ExportFormat::Json).unwrap();
    let second = store.export(tally::ExportFormat::Json).unwrap();
    assert_eq!(first, second);
    assert!(String::from_utf8(first).unwrap().contains("\"cliente\": \"Zoë, S.A.\""));
}


#[test]
fn test_insert_keys_are_monotonic() {
    let dir = TempDir::new("test_insert").expect("Unable to create temporary directory");
    let (mut store, path) = seeded_store(&dir);

    assert_eq!(store.delete(&FieldValue::Integer(3)).unwrap(), 1);
    let key = store.insert(record(3, 1.0, "Eva")).unwrap();
    // max + 1 after the delete, not the row count
    assert_eq!(key, FieldValue::Integer(3));

    let empty_dir = TempDir::new("test_insert_empty").expect("Unable to create temporary directory");
    let mut empty = RecordStore::create(empty_dir.path().join("ventas.csv"), sales_schema()).unwrap();
    assert_eq!(empty.insert(record(1, 1.0, "Eva")).unwrap(), FieldValue::Integer(1));

    let reopened = RecordStore::open(&path, sales_schema()).unwrap();
    assert_eq!(reopened.list().row_count(), 3);
}


#[test]
fn test_update_changes_only_named_columns_of_matching_rows() {
    let dir = TempDir::new("test_update").expect("Unable to create temporary directory");
    let (mut store, path) = seeded_store(&dir);
    let before = store.list().clone();

    let changed = store.update(&FieldValue::Integer(2), Row::from([
        ("monto".to_string(), FieldValue::Float(75.5)),
    ])).unwrap();
    assert_eq!(changed, 1);

    let after = RecordStore::open(&path, sales_schema()).unwrap();
    for idx in 0..3 {
        for col in ["id", "sucursal", "cliente"] {
            assert_eq!(after.list().value(idx, col), before.value(idx, col));
        }
    }
    assert_eq!(after.list().value(1, "monto"), Some(&FieldValue::Float(75.5)));
    assert_eq!(after.list().value(0, "monto"), Some(&FieldValue::Float(100.0)));
}


#[test]
fn test_update_where_applies_to_all_matches() {
    let dir = TempDir::new("test_update_where").expect("Unable to create temporary directory");
    let (mut store, _) = seeded_store(&dir);

    let changed = store.update_where("sucursal", &FieldValue::Integer(1), Row::from([
        ("sucursal".to_string(), FieldValue::Integer(9)),
    ])).unwrap();

    assert_eq!(changed, 2);
    assert_eq!(store.list().find("sucursal", &FieldValue::Integer(9)).unwrap().len(), 2);
}


#[test]
fn test_update_missing_key_leaves_file_identical() {
    let dir = TempDir::new("test_update_missing").expect("Unable to create temporary directory");
    let (mut store, path) = seeded_store(&dir);
    let before = fs::read(&path).unwrap();

    let result = store.update(&FieldValue::Integer(99), Row::from([
        ("monto".to_string(), FieldValue::Float(1.0)),
    ]));

    assert!(matches!(result, Err(DBError::KeyNotFound { .. })));
    assert_eq!(fs::read(&path).unwrap(), before);
}


#[test]
fn test_delete_then_query() {
    let dir = TempDir::new("test_delete").expect("Unable to create temporary directory");
    let (mut store, path) = seeded_store(&dir);

    assert_eq!(store.delete_where("sucursal", &FieldValue::Integer(1)).unwrap(), 2);
    assert!(matches!(store.delete(&FieldValue::Integer(1)), Err(DBError::KeyNotFound { .. })));

    let reopened = RecordStore::open(&path, sales_schema()).unwrap();
    assert_eq!(reopened.list().row_count(), 1);
    assert!(reopened.list().find("sucursal", &FieldValue::Integer(1)).unwrap().is_empty());
}


#[test]
fn test_invalid_record_is_rejected_before_writing() {
    let dir = TempDir::new("test_invalid").expect("Unable to create temporary directory");
    let (mut store, path) = seeded_store(&dir);
    let before = fs::read(&path).unwrap();

    let result = store.insert(Row::from([("sucursal".to_string(), FieldValue::from("norte"))]));
    assert!(matches!(result, Err(DBError::Validation(_))));
    assert_eq!(store.list().row_count(), 3);
    assert_eq!(fs::read(&path).unwrap(), before);
}


#[test]
fn test_empty_text_matches_the_reopened_file() {
    let dir = TempDir::new("test_empty_text").expect("Unable to create temporary directory");
    let (mut store, path) = seeded_store(&dir);

    store.insert(record(3, 10.0, "")).unwrap();
    store.update(&FieldValue::Integer(1), Row::from([("cliente".to_string(), FieldValue::from(""))])).unwrap();

    let reopened = RecordStore::open(&path, sales_schema()).unwrap();
    assert_eq!(reopened.list(), store.list());
    assert_eq!(store.list().value(0, "cliente"), Some(&FieldValue::Null));
    assert_eq!(store.list().value(3, "cliente"), Some(&FieldValue::Null));
}


#[test]
fn test_largest_key_cannot_auto_increment() {
    let dir = TempDir::new("test_largest_key").expect("Unable to create temporary directory");
    let path = dir.path().join("ventas.csv");
    fs::write(&path, format!("id,sucursal,monto,cliente\n{},1,2.5,Ana\n", i64::MAX)).unwrap();
    let before = fs::read(&path).unwrap();

    let mut store = RecordStore::open(&path, sales_schema()).unwrap();
    let result = store.insert(record(1, 1.0, "Luis"));

    assert!(matches!(result, Err(DBError::Validation(_))));
    assert_eq!(store.list().row_count(), 1);
    assert_eq!(fs::read(&path).unwrap(), before);
}


#[test]
fn test_aggregate_by_branch() {
    let dir = TempDir::new("test_aggregate").expect("Unable to create temporary directory");
    let (store, _) = seeded_store(&dir);

    let grouped: Table = store.list().aggregate(&["sucursal"], "monto", &[AggregateOp::Sum, AggregateOp::Count]).unwrap();

    assert_eq!(grouped.all_column_names(), vec!["sucursal", "sum", "count"]);
    assert_eq!(grouped.row_count(), 2);

    let branch_one = grouped.find("sucursal", &FieldValue::Integer(1)).unwrap();
    assert_eq!(branch_one[0].get("sum"), Some(&FieldValue::Float(150.0)));
    assert_eq!(branch_one[0].get("count"), Some(&FieldValue::Integer(2)));

    let branch_two = grouped.find("sucursal", &FieldValue::Integer(2)).unwrap();
    assert_eq!(branch_two[0].get("sum"), Some(&FieldValue::Float(30.0)));
    assert_eq!(branch_two[0].get("count"), Some(&FieldValue::Integer(1)));
}
