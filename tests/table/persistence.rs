use mockall::{mock, Sequence};

use tally::{DBError, DataType, FieldValue, RecordStore, Row, Schema, Storage};


mock! {
    pub Disk {}

    impl Storage for Disk {
        fn exists(&self) -> bool;
        fn read(&self) -> Result<Vec<u8>, DBError>;
        fn write(&mut self, bytes: &[u8]) -> Result<(), DBError>;
        fn describe(&self) -> String;
    }
}


const STORED: &str = "id,nombre\n1,Ana\n2,Luis\n";


fn schema() -> Schema {
    Schema::new("clientes")
        .column("id", DataType::Integer)
        .column("nombre", DataType::String)
        .key("id", true)
}


fn disk_failure() -> DBError {
    DBError::IOFailure("clientes.csv".to_string(), "disk full".to_string())
}


fn named(nombre: &str) -> Row {
    Row::from([("nombre".to_string(), FieldValue::from(nombre))])
}


#[test]
fn test_successful_insert_writes_whole_table() {
    let mut disk = MockDisk::new();
    disk.expect_describe().return_const("clientes.csv".to_string());
    disk.expect_read().times(1).returning(|| Ok(STORED.as_bytes().to_vec()));
    disk.expect_write()
        .withf(|bytes: &[u8]| bytes == &b"id,nombre\n1,Ana\n2,Luis\n3,Eva\n"[..])
        .times(1)
        .returning(|_| Ok(()));

    let mut store = RecordStore::with_storage(disk, schema()).unwrap();
    assert_eq!(store.insert(named("Eva")).unwrap(), FieldValue::Integer(3));
    assert_eq!(store.list().row_count(), 3);
}


#[test]
fn test_failed_write_reloads_from_storage() {
    let mut disk = MockDisk::new();
    let mut seq = Sequence::new();
    disk.expect_describe().return_const("clientes.csv".to_string());
    disk.expect_read().times(1).in_sequence(&mut seq).returning(|| Ok(STORED.as_bytes().to_vec()));
    disk.expect_write().times(1).in_sequence(&mut seq).returning(|_| Err(disk_failure()));
    disk.expect_read().times(1).in_sequence(&mut seq).returning(|| Ok(STORED.as_bytes().to_vec()));

    let mut store = RecordStore::with_storage(disk, schema()).unwrap();
    let before = store.list().clone();

    let result = store.insert(named("Eva"));
    assert!(matches!(result, Err(DBError::Persistence { ref path, .. }) if path == "clientes.csv"));
    assert_eq!(store.list(), &before);
}


#[test]
fn test_failed_reload_keeps_last_persisted_table() {
    let mut disk = MockDisk::new();
    let mut seq = Sequence::new();
    disk.expect_describe().return_const("clientes.csv".to_string());
    disk.expect_read().times(1).in_sequence(&mut seq).returning(|| Ok(STORED.as_bytes().to_vec()));
    disk.expect_write().times(1).in_sequence(&mut seq).returning(|_| Err(disk_failure()));
    disk.expect_read().times(1).in_sequence(&mut seq).returning(|| Err(disk_failure()));

    let mut store = RecordStore::with_storage(disk, schema()).unwrap();
    let result = store.delete(&FieldValue::Integer(1));

    assert!(matches!(result, Err(DBError::Persistence { .. })));
    assert_eq!(store.list().row_count(), 2);
    assert_eq!(store.list().value(0, "nombre"), Some(&FieldValue::from("Ana")));
}


#[test]
fn test_rejected_changes_never_touch_storage() {
    let mut disk = MockDisk::new();
    disk.expect_describe().return_const("clientes.csv".to_string());
    disk.expect_read().times(1).returning(|| Ok(STORED.as_bytes().to_vec()));
    disk.expect_write().never();

    let mut store = RecordStore::with_storage(disk, schema()).unwrap();

    let missing = store.update(&FieldValue::Integer(7), named("Eva"));
    assert!(matches!(missing, Err(DBError::KeyNotFound { .. })));

    let unknown = store.insert(Row::from([("edad".to_string(), FieldValue::Integer(30))]));
    assert!(matches!(unknown, Err(DBError::Validation(_))));

    let nothing = store.update(&FieldValue::Integer(1), Row::new());
    assert!(matches!(nothing, Err(DBError::Validation(_))));
}


#[test]
fn test_malformed_storage_is_a_parse_error() {
    let mut disk = MockDisk::new();
    disk.expect_describe().return_const("clientes.csv".to_string());
    disk.expect_read().returning(|| Ok(b"id,nombre\n1,Ana,extra\n".to_vec()));

    let result = RecordStore::with_storage(disk, schema());
    assert!(matches!(result, Err(DBError::Parse { line: 2, .. })));
}
