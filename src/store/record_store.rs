use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::structures::{
    column::FieldValue,
    db_err::DBError,
    relation::{export::ExportFormat, io::parse_csv, table::{Row, Table}},
    schema::Schema,
};
use super::storage::{FileStorage, Storage};


/// a table bound to its backing file.
///
/// every successful mutation rewrites the whole file before returning, so after any
/// completed call the in-memory table matches what is stored.
#[derive(Debug)]
pub struct RecordStore<S: Storage = FileStorage> {
    storage: S,
    schema: Schema,
    table: Table,
}


impl RecordStore<FileStorage> {

    /// loads the CSV at `path`. The file must exist.
    pub fn open(path: impl Into<PathBuf>, schema: Schema) -> Result<Self, DBError> {
        RecordStore::with_storage(FileStorage::new(path), schema)
    }


    /// like `open()`, but a missing file is first created with only the header row
    pub fn create(path: impl Into<PathBuf>, schema: Schema) -> Result<Self, DBError> {
        let mut storage = FileStorage::new(path);
        if !storage.exists() {
            let empty = Table::from_schema(&schema)?;
            storage.write(&empty.to_csv()?)?;
            info!(file = %storage.describe(), "created empty table");
        }
        RecordStore::with_storage(storage, schema)
    }
}


impl<S: Storage> RecordStore<S> {

    pub fn with_storage(storage: S, schema: Schema) -> Result<Self, DBError> {
        schema.validate()?;
        let table = read_table(&storage, &schema)?;
        debug!(
            file = %storage.describe(),
            rows = table.row_count(),
            columns = table.column_count(),
            "opened record store"
        );

        Ok(RecordStore { storage, schema, table })
    }


    pub fn list(&self) -> &Table { &self.table }

    pub fn schema(&self) -> &Schema { &self.schema }

    pub fn storage(&self) -> &S { &self.storage }


    /// inserts `record` and persists the table. Returns the key of the new row.
    pub fn insert(&mut self, record: Row) -> Result<FieldValue, DBError> {
        let key = self.mutate(|t| t.insert(record))?;
        info!(table = self.table.name(), key = %key, "inserted record");
        Ok(key)
    }


    /// updates every row whose key column equals `key`
    pub fn update(&mut self, key: &FieldValue, changes: Row) -> Result<usize, DBError> {
        let key_column = self.require_key()?;
        self.update_where(&key_column, key, changes)
    }


    pub fn update_where(&mut self, column: &str, value: &FieldValue, changes: Row) -> Result<usize, DBError> {
        let changed = self.mutate(|t| t.update(column, value, changes))?;
        info!(table = self.table.name(), column, value = %value, changed, "updated records");
        Ok(changed)
    }


    /// deletes every row whose key column equals `key`
    pub fn delete(&mut self, key: &FieldValue) -> Result<usize, DBError> {
        let key_column = self.require_key()?;
        self.delete_where(&key_column, key)
    }


    pub fn delete_where(&mut self, column: &str, value: &FieldValue) -> Result<usize, DBError> {
        let deleted = self.mutate(|t| t.delete(column, value))?;
        info!(table = self.table.name(), column, value = %value, deleted, "deleted records");
        Ok(deleted)
    }


    pub fn export(&self, format: ExportFormat) -> Result<Vec<u8>, DBError> {
        let bytes = self.table.export(format)?;
        debug!(table = self.table.name(), format = format.extension(), bytes = bytes.len(), "exported table");
        Ok(bytes)
    }


    /// replaces the in-memory table with what is stored
    pub fn reload(&mut self) -> Result<(), DBError> {
        self.table = read_table(&self.storage, &self.schema)?;
        Ok(())
    }


    /// runs `change` on a copy of the table and writes the copy out.
    ///
    /// the copy only replaces the table once the write succeeded. On a failed write the
    /// table is reloaded from storage, keeping the previous table if that fails too.
    fn mutate<T, F>(&mut self, change: F) -> Result<T, DBError>
    where
        F: FnOnce(&mut Table) -> Result<T, DBError>
    {
        let mut working = self.table.clone();
        let outcome = change(&mut working)?;
        let bytes = working.to_csv()?;

        match self.storage.write(&bytes) {
            Ok(()) => {
                self.table = working;
                Ok(outcome)
            }
            Err(err) => {
                warn!(file = %self.storage.describe(), error = %err, "write failed, reloading table from storage");
                if let Err(reload_err) = self.reload() {
                    warn!(file = %self.storage.describe(), error = %reload_err, "reload failed, keeping the last persisted table");
                }
                Err(DBError::Persistence { path: self.storage.describe(), message: err.to_string() })
            }
        }
    }


    fn require_key(&self) -> Result<String, DBError> {
        self.schema
            .key_column()
            .map(str::to_string)
            .ok_or_else(|| DBError::validation(format!("'{}' has no key column", self.schema.get_name())))
    }
}


fn read_table<S: Storage>(storage: &S, schema: &Schema) -> Result<Table, DBError> {
    let bytes = storage.read()?;
    parse_csv(&bytes, schema, &storage.describe())
}
