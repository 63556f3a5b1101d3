use std::collections::HashMap;

use crate::structures::{column::{Column, FieldValue}, db_err::DBError, schema::Schema};


/// one record, keyed by column name. Every row of a table carries every column.
pub type Row = HashMap<String, FieldValue>;


#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub(super) name: String,
    pub(super) columns: Vec<Column>,
    pub(super) key_column: Option<String>,
    pub(super) auto_increment: bool,
    pub(super) rows: Vec<Row>,
}


impl Table {

    /// a keyless table, used for derived report tables
    pub fn new(name: &str, columns: Vec<Column>) -> Self {
        let columns = columns
            .into_iter()
            .map(|mut c| { c.change_pk_state(false); c })
            .collect();

        Self { name: name.to_string(), columns, key_column: None, auto_increment: false, rows: Vec::new() }
    }


    /// an empty table shaped like `schema`
    pub fn from_schema(schema: &Schema) -> Result<Self, DBError> {
        schema.validate()?;

        Ok(Self {
            name: schema.get_name().to_string(),
            columns: schema.columns().clone(),
            key_column: schema.key_column().map(str::to_string),
            auto_increment: schema.auto_increment(),
            rows: Vec::new(),
        })
    }


    /// the schema this table was built from, or would be loaded with
    pub fn schema(&self) -> Schema {
        let mut schema = Schema::new(&self.name);
        for c in &self.columns {
            schema = schema.column(c.get_name(), *c.get_data_type());
        }
        match &self.key_column {
            Some(key) => schema.key(key, self.auto_increment),
            None => schema,
        }
    }


    /// appends an already shaped row without validation.
    ///
    /// only used by code in this module that builds rows from known columns
    pub(super) fn push_row(&mut self, row: Row) { self.rows.push(row); }
}
