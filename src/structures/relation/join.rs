use std::collections::HashMap;

use crate::structures::{column::{Column, FieldValue}, db_err::DBError};
use super::table::{Row, Table};


/// appended to a right hand column whose name is already taken on the left
pub const RIGHT_SUFFIX: &str = "_right";


impl Table {

    /// left outer join of `self` with `other` on `key_column`, which both tables must have.
    ///
    /// every left row is kept. A left row with no match gets `Null` in each right hand
    /// column, a left row with several matches is repeated once per match.
    /// the key column appears once, taken from the left table.
    pub fn left_join(&self, other: &Table, key_column: &str) -> Result<Table, DBError> {
        let left_type = self.data_type_of(key_column)?;
        let right_type = other.data_type_of(key_column)?;
        if left_type != right_type {
            return Err(DBError::MisMatchDataType(left_type, right_type));
        }

        let mut join_table_columns: Vec<Column> = self.columns().clone();

        // (name in `other`, name in the result)
        let mut right_columns: Vec<(String, String)> = Vec::new();
        for col in other.columns() {
            if col.get_name() == key_column { continue; }

            let mut c = col.clone();
            if self.is_valid_column(col.get_name()) {
                c.new_name(format!("{}{}", col.get_name(), RIGHT_SUFFIX));
            }
            right_columns.push((col.get_name().to_string(), c.get_name().to_string()));
            join_table_columns.push(c);
        }

        let mut join_table = Table::new(
            &format!("{} joined with {} on {}", self.name, other.name, key_column),
            join_table_columns
        );

        // hash the right side once; a Null key never matches anything
        let mut right_index: HashMap<&FieldValue, Vec<&Row>> = HashMap::new();
        for row in other.rows() {
            if let Some(value) = row.get(key_column).filter(|v| !v.is_null()) {
                right_index.entry(value).or_default().push(row);
            }
        }

        for left_row in self.rows() {
            let matches = left_row
                .get(key_column)
                .and_then(|v| right_index.get(v));

            match matches {
                Some(right_rows) => {
                    for right_row in right_rows {
                        join_table.push_row(join_rows(left_row, Some(*right_row), &right_columns));
                    }
                }
                None => join_table.push_row(join_rows(left_row, None, &right_columns)),
            }
        }

        Ok(join_table)
    }
}


fn join_rows(left: &Row, right: Option<&Row>, right_columns: &[(String, String)]) -> Row {
    let mut result = left.clone();
    for (source, target) in right_columns {
        let value = right
            .and_then(|r| r.get(source))
            .cloned()
            .unwrap_or(FieldValue::Null);
        result.insert(target.clone(), value);
    }
    result
}
