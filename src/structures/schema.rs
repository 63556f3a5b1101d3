use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{column::{Column, DataType}, db_err::DBError};


/// names, types and key of a logical table. One schema per backing file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    name: String,
    columns: Vec<Column>,
    key_column: Option<String>,
    auto_increment: bool,
}


impl Schema {
    pub fn new(name: &str) -> Self {
        Schema { name: name.to_string(), columns: Vec::new(), key_column: None, auto_increment: false }
    }

    /// appends a column to the schema
    pub fn column(mut self, name: &str, data_type: DataType) -> Self {
        self.columns.push(Column::new(name, data_type, false));
        self
    }

    /// designates `name` as the key column used for updates and deletes.
    ///
    /// ## Note
    /// `auto_increment` only makes sense on an `Integer` column, `validate()` rejects anything else
    pub fn key(mut self, name: &str, auto_increment: bool) -> Self {
        for c in &mut self.columns {
            c.change_pk_state(c.get_name() == name);
        }
        self.key_column = Some(name.to_string());
        self.auto_increment = auto_increment;
        self
    }

    pub fn get_name(&self)     -> &str            { &self.name }
    pub fn columns(&self)      -> &Vec<Column>    { &self.columns }
    pub fn key_column(&self)   -> Option<&str>    { self.key_column.as_deref() }
    pub fn auto_increment(&self) -> bool          { self.auto_increment }

    pub fn column_names(&self) -> Vec<&str> { self.columns.iter().map(|c| c.get_name()).collect() }


    pub fn validate(&self) -> Result<(), DBError> {
        if self.columns.is_empty() {
            return Err(DBError::validation(format!("the schema '{}' has no columns", self.name)));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for c in &self.columns {
            if !seen.insert(c.get_name()) {
                return Err(DBError::validation(format!("the column '{}' is declared twice", c.get_name())));
            }
        }

        if let Some(key) = &self.key_column {
            let key_col = self.columns
                .iter()
                .find(|c| c.get_name() == key)
                .ok_or_else(|| DBError::InvalidColumn(key.to_string()))?;

            if self.auto_increment && *key_col.get_data_type() != DataType::Integer {
                return Err(DBError::MisMatchDataType(DataType::Integer, *key_col.get_data_type()));
            }
        }

        Ok(())
    }
}
