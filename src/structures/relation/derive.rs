use crate::structures::{
    column::{Column, DataType, FieldValue},
    db_err::DBError,
    rounding::round_money,
};
use super::table::{Row, Table};


// Derived columns are computed from columns already in the table.
// Each helper returns a new table and leaves `self` alone.
impl Table {

    /// joins the text of `sources` with `separator`, e.g. a full name from first and last name.
    ///
    /// the result is `Null` when any source value is `Null`
    pub fn with_concat_column(&self, name: &str, sources: &[&str], separator: &str) -> Result<Table, DBError> {
        for s in sources { self.require_column(s)?; }

        self.with_derived_column(name, DataType::String, |row| {
            let mut parts: Vec<String> = Vec::with_capacity(sources.len());
            for s in sources {
                match row.get(*s) {
                    None | Some(FieldValue::Null) => return FieldValue::Null,
                    Some(v) => parts.push(v.to_string()),
                }
            }
            FieldValue::String(parts.join(separator))
        })
    }


    /// `a * b`. Integer times integer stays an integer, anything else is a float rounded to cents.
    ///
    /// ### Errors
    /// `Validation` when an integer product does not fit in an `i64`
    pub fn with_product_column(&self, name: &str, a: &str, b: &str) -> Result<Table, DBError> {
        let a_type = self.numeric_type_of(a)?;
        let b_type = self.numeric_type_of(b)?;
        let integer_result = a_type == DataType::Integer && b_type == DataType::Integer;
        let output_type = if integer_result { DataType::Integer } else { DataType::Float };

        self.try_with_derived_column(name, output_type, |row| {
            let (x, y) = (row.get(a), row.get(b));
            match (x.and_then(FieldValue::as_i64), y.and_then(FieldValue::as_i64)) {
                (Some(x), Some(y)) if integer_result => x
                    .checked_mul(y)
                    .map(FieldValue::Integer)
                    .ok_or_else(|| DBError::validation(format!("{x} * {y} overflows the column '{name}'"))),
                _ => match (x.and_then(FieldValue::as_f64), y.and_then(FieldValue::as_f64)) {
                    (Some(x), Some(y)) => Ok(FieldValue::Float(round_money(x * y))),
                    _ => Ok(FieldValue::Null),
                }
            }
        })
    }


    /// `numerator / denominator` rounded to cents, `Null` when dividing by zero or by `Null`
    pub fn with_ratio_column(&self, name: &str, numerator: &str, denominator: &str) -> Result<Table, DBError> {
        self.numeric_type_of(numerator)?;
        self.numeric_type_of(denominator)?;

        self.with_derived_column(name, DataType::Float, |row| {
            let n = row.get(numerator).and_then(FieldValue::as_f64);
            let d = row.get(denominator).and_then(FieldValue::as_f64);
            match (n, d) {
                (Some(n), Some(d)) if d != 0.0 => FieldValue::Float(round_money(n / d)),
                _ => FieldValue::Null,
            }
        })
    }


    /// the `YYYY-MM` period of a date column
    pub fn with_year_month_column(&self, name: &str, date_column: &str) -> Result<Table, DBError> {
        let data_type = self.data_type_of(date_column)?;
        if data_type != DataType::Date {
            return Err(DBError::MisMatchDataType(DataType::Date, data_type));
        }

        self.with_derived_column(name, DataType::String, |row| {
            match row.get(date_column).and_then(FieldValue::as_date) {
                Some(date) => FieldValue::String(date.format("%Y-%m").to_string()),
                None => FieldValue::Null,
            }
        })
    }


    /// appends a column computed row by row. Replaces a column of the same name.
    pub fn with_derived_column<F>(&self, name: &str, data_type: DataType, compute: F) -> Result<Table, DBError>
    where
        F: Fn(&Row) -> FieldValue
    {
        self.try_with_derived_column(name, data_type, |row| Ok(compute(row)))
    }


    /// like `with_derived_column()`, stopping at the first row `compute` fails on
    pub fn try_with_derived_column<F>(&self, name: &str, data_type: DataType, compute: F) -> Result<Table, DBError>
    where
        F: Fn(&Row) -> Result<FieldValue, DBError>
    {
        let mut derived = self.clone();
        derived.columns.retain(|c| c.get_name() != name);
        derived.columns.push(Column::new(name, data_type, false));

        for row in &mut derived.rows {
            let value = compute(row)?;
            row.insert(name.to_string(), value);
        }

        Ok(derived)
    }


    fn numeric_type_of(&self, col_name: &str) -> Result<DataType, DBError> {
        let data_type = self.data_type_of(col_name)?;
        if !data_type.is_numeric() {
            return Err(DBError::MisMatchDataType(DataType::Float, data_type));
        }
        Ok(data_type)
    }
}
