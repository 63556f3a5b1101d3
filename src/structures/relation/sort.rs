use std::cmp::Ordering;

use crate::structures::{column::{Column, FieldValue}, db_err::DBError};
use super::table::{Row, Table};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending
}


impl SortOrder {
    pub fn parse_str(str: &str) -> Option<SortOrder> {
        match str.trim().to_lowercase().as_str() {
            "asc" | "ascending"   => Some(SortOrder::Ascending),
            "desc" | "descending" => Some(SortOrder::Descending),
            _ => None
        }
    }
}


impl Table {

    /// stable sort on one column. `Null` values go last in both directions.
    pub fn sort_by(&self, column_name: &str, order: SortOrder) -> Result<Table, DBError> {
        self.require_column(column_name)?;

        let mut sorted = self.clone();
        sorted.rows.sort_by(|a, b| {
            let a = a.get(column_name).unwrap_or(&FieldValue::Null);
            let b = b.get(column_name).unwrap_or(&FieldValue::Null);
            match (a.is_null(), b.is_null()) {
                (true, true)   => Ordering::Equal,
                (true, false)  => Ordering::Greater,
                (false, true)  => Ordering::Less,
                (false, false) => match order {
                    SortOrder::Ascending  => a.sort_cmp(b),
                    SortOrder::Descending => b.sort_cmp(a),
                }
            }
        });

        Ok(sorted)
    }


    /// the first `n` rows
    pub fn head(&self, n: usize) -> Table {
        let mut head = self.clone();
        head.rows.truncate(n);
        head
    }


    /// a copy holding only `column_names`, in that order
    pub fn select_columns(&self, column_names: &[&str]) -> Result<Table, DBError> {
        let mut table_columns: Vec<Column> = Vec::with_capacity(column_names.len());
        for name in column_names {
            table_columns.push(self.require_column(name)?.clone());
        }

        let mut reduced_table = Table::new(&format!("reduced version of '{}'", &self.name), table_columns);

        for current_row in &self.rows {
            let reduced_row: Row = column_names
                .iter()
                .map(|c| (c.to_string(), current_row.get(*c).cloned().unwrap_or(FieldValue::Null)))
                .collect();
            reduced_table.push_row(reduced_row);
        }

        Ok(reduced_table)
    }


    pub fn rename_column(&self, old: &str, new: &str) -> Result<Table, DBError> {
        self.require_column(old)?;
        if old != new && self.is_valid_column(new) {
            return Err(DBError::validation(format!("the column '{new}' already exists")));
        }

        let mut renamed = self.clone();
        for c in &mut renamed.columns {
            if c.get_name() == old { c.new_name(new.to_string()); }
        }
        for row in &mut renamed.rows {
            if let Some(value) = row.remove(old) {
                row.insert(new.to_string(), value);
            }
        }
        if renamed.key_column.as_deref() == Some(old) {
            renamed.key_column = Some(new.to_string());
        }

        Ok(renamed)
    }


    /// renames the table itself, e.g. before exporting a report
    pub fn named(mut self, name: &str) -> Table {
        self.name = name.to_string();
        self
    }
}
