use crate::structures::{column::{Column, DataType, FieldValue}, db_err::DBError};

use super::table::{Row, Table};


impl Table {

    pub fn name(&self) -> &str { &self.name }

    pub fn rows(&self) -> &Vec<Row> { &self.rows }

    pub fn row_count(&self) -> usize { self.rows.len() }

    pub fn column_count(&self) -> usize { self.columns.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn get_row(&self, row_index: usize) -> Option<&Row> { self.rows.get(row_index) }

    pub fn columns(&self) -> &Vec<Column> { &self.columns }

    pub fn key_column(&self) -> Option<&str> { self.key_column.as_deref() }

    pub fn is_auto_increment(&self) -> bool { self.auto_increment }

    pub fn all_column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.get_name().to_string()).collect()
    }


    /// determines if a column with the given name exists in the table.
    ///
    /// returns a reference to the column if it exists.
    pub fn column(&self, col_name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.get_name() == col_name)
    }

    pub fn is_valid_column(&self, col_name: &str) -> bool { self.column(col_name).is_some() }


    /// like `column()` but fails with `InvalidColumn`
    pub fn require_column(&self, col_name: &str) -> Result<&Column, DBError> {
        self.column(col_name).ok_or_else(|| DBError::InvalidColumn(col_name.to_string()))
    }

    pub fn data_type_of(&self, col_name: &str) -> Result<DataType, DBError> {
        Ok(*self.require_column(col_name)?.get_data_type())
    }


    /// the value at `row_index` in `col_name`, `Null` for a column a row does not carry
    pub fn value(&self, row_index: usize, col_name: &str) -> Option<&FieldValue> {
        self.rows.get(row_index).map(|r| r.get(col_name).unwrap_or(&FieldValue::Null))
    }


    /// every value of a column, in row order
    pub fn column_values(&self, col_name: &str) -> Result<Vec<&FieldValue>, DBError> {
        self.require_column(col_name)?;
        Ok(self.rows.iter().map(|r| r.get(col_name).unwrap_or(&FieldValue::Null)).collect())
    }


    /// the values of a row laid out in column order
    pub fn ordered_values<'a>(&'a self, row: &'a Row) -> Vec<&'a FieldValue> {
        self.columns
            .iter()
            .map(|c| row.get(c.get_name()).unwrap_or(&FieldValue::Null))
            .collect()
    }
}
