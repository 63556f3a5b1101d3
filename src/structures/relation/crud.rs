use crate::structures::{column::FieldValue, db_err::DBError};

use super::table::{Row, Table};


// |===============================|
// |     Modification function     |
// |===============================|

impl Table {

    /// inserts a new row into the table and returns the key of the new row.
    ///
    /// columns missing from `record` are filled with `Null`. On an auto-increment
    /// table a missing (or `Null`) key is assigned `max(existing keys) + 1`, or `1`
    /// when the table has no keys yet.
    ///
    /// ## Note
    /// key uniqueness is not checked, callers are expected to supply unique keys
    pub fn insert(&mut self, record: Row) -> Result<FieldValue, DBError> {
        let mut row = self.validate_record(record)?;
        let mut key_value = FieldValue::Null;

        if let Some(key) = self.key_column.clone() {
            let missing_key = row.get(&key).map_or(true, FieldValue::is_null);

            if missing_key && self.auto_increment {
                row.insert(key.clone(), self.next_key()?);
            } else if missing_key {
                return Err(DBError::validation(format!("a value for the key column '{key}' is required")));
            }
            key_value = row.get(&key).cloned().unwrap_or(FieldValue::Null);
        }

        self.rows.push(row);
        Ok(key_value)
    }


    /// the key an auto-increment insert would receive right now
    ///
    /// ### Errors
    /// `Validation` when the largest key is already `i64::MAX`
    pub fn next_key(&self) -> Result<FieldValue, DBError> {
        let max = self.key_column
            .as_ref()
            .and_then(|key| self.rows.iter().filter_map(|r| r.get(key).and_then(FieldValue::as_i64)).max());

        match max {
            None => Ok(FieldValue::Integer(1)),
            Some(m) => m.checked_add(1)
                .map(FieldValue::Integer)
                .ok_or_else(|| DBError::validation(format!("no key is left after {m} in '{}'", self.name))),
        }
    }


    /// overwrites the columns named in `changes` on every row where `key_column == key_value`.
    ///
    /// returns the number of rows changed. Nothing is modified unless every change is valid
    /// and at least one row matches; zero matches gives `KeyNotFound`.
    ///
    /// ## Note
    /// the key column may be changed but never cleared, a row without a key could not be addressed again
    pub fn update(&mut self, key_column: &str, key_value: &FieldValue, changes: Row) -> Result<usize, DBError> {
        if changes.is_empty() {
            return Err(DBError::validation("no changes were given"));
        }

        let changes = self.validate_changes(changes)?;
        if let Some(key) = &self.key_column {
            if changes.get(key).is_some_and(FieldValue::is_null) {
                return Err(DBError::validation(format!("the key column '{key}' cannot be cleared")));
            }
        }
        let matches = self.matching_rows(key_column, key_value)?;
        if matches.is_empty() {
            return Err(DBError::key_not_found(key_column, key_value));
        }

        for idx in &matches {
            let row = &mut self.rows[*idx];
            for (col_name, value) in &changes {
                row.insert(col_name.clone(), value.clone());
            }
        }

        Ok(matches.len())
    }


    /// removes every row where `key_column == key_value`.
    ///
    /// returns the number of rows deleted, zero matches gives `KeyNotFound`.
    pub fn delete(&mut self, key_column: &str, key_value: &FieldValue) -> Result<usize, DBError> {
        let matches = self.matching_rows(key_column, key_value)?;
        if matches.is_empty() {
            return Err(DBError::key_not_found(key_column, key_value));
        }

        let mut idx = 0;
        self.rows.retain(|_| {
            let keep = matches.binary_search(&idx).is_err();
            idx += 1;
            keep
        });

        Ok(matches.len())
    }


    /// indices of every row whose `column_name` equals `value`, in row order.
    ///
    /// `value` is coerced to the column type first, so an integer finds a float key.
    pub fn matching_rows(&self, column_name: &str, value: &FieldValue) -> Result<Vec<usize>, DBError> {
        let data_type = self.data_type_of(column_name)?;
        let target = value.clone().coerce_to(&data_type)?;

        Ok(self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.get(column_name).unwrap_or(&FieldValue::Null) == &target)
            .map(|(idx, _)| idx)
            .collect())
    }


    /// every row whose `column_name` equals `value`
    pub fn find(&self, column_name: &str, value: &FieldValue) -> Result<Vec<&Row>, DBError> {
        Ok(self.matching_rows(column_name, value)?
            .into_iter()
            .map(|idx| &self.rows[idx])
            .collect())
    }


    /// checks a record against the columns and returns it with every column present
    fn validate_record(&self, record: Row) -> Result<Row, DBError> {
        let mut validated = self.validate_changes(record)?;
        for col in &self.columns {
            validated.entry(col.get_name().to_string()).or_insert(FieldValue::Null);
        }
        Ok(validated)
    }


    fn validate_changes(&self, changes: Row) -> Result<Row, DBError> {
        let mut validated = Row::with_capacity(changes.len());

        for (col_name, value) in changes {
            let col = self.column(&col_name).ok_or_else(|| {
                DBError::validation(format!("the column '{col_name}' does not exist in '{}'", self.name))
            })?;

            let value = value.coerce_to(col.get_data_type()).map_err(|e| {
                DBError::validation(format!("column '{col_name}': {e}"))
            })?;

            validated.insert(col_name, value);
        }

        Ok(validated)
    }
}
