use std::collections::HashMap;

use crate::structures::{
    column::{Column, DataType, FieldValue},
    db_err::DBError,
    relation::table::{Row, Table},
};


/// value -> numeric code for one categorical column, e.g. `F -> 0, M -> 1`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategoryMapping {
    column: String,
    codes: HashMap<String, i64>,
}


impl CategoryMapping {
    pub fn new(column: &str) -> Self {
        CategoryMapping { column: column.to_string(), codes: HashMap::new() }
    }

    pub fn code(mut self, value: &str, code: i64) -> Self {
        self.codes.insert(value.to_string(), code);
        self
    }

    pub fn get_column(&self) -> &str { &self.column }

    pub fn lookup(&self, value: &str) -> Option<i64> { self.codes.get(value).copied() }
}


/// a purely numeric view of a table, ready for a classifier
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub feature_names: Vec<String>,
    /// one entry per row, values in `feature_names` order
    pub features: Vec<Vec<f64>>,
    pub target: Vec<f64>,
    pub target_column: String,
}


impl FeatureTable {

    pub fn row_count(&self) -> usize { self.target.len() }


    /// the encoded features followed by the target, as a table of floats
    pub fn to_table(&self, name: &str) -> Result<Table, DBError> {
        let columns = self.feature_names
            .iter()
            .chain(std::iter::once(&self.target_column))
            .map(|n| Column::new(n, DataType::Float, false))
            .collect();
        let mut table = Table::new(name, columns);

        for (values, target) in self.features.iter().zip(&self.target) {
            let mut row: Row = self.feature_names
                .iter()
                .zip(values)
                .map(|(n, v)| (n.clone(), FieldValue::Float(*v)))
                .collect();
            row.insert(self.target_column.clone(), FieldValue::Float(*target));
            table.insert(row)?;
        }

        Ok(table)
    }
}


/// encodes every column of `table` as numbers and splits off `target_column` as the label.
///
/// columns with a mapping are translated through it; the remaining columns must be
/// numeric or boolean (`true` is 1).
///
/// ### Errors
/// `Validation` on a `Null` cell, a value missing from its mapping, or an unmapped
/// text or date column. `InvalidColumn` if the target or a mapped column does not exist.
pub fn encode(table: &Table, target_column: &str, mappings: &[CategoryMapping]) -> Result<FeatureTable, DBError> {
    encode_excluding(table, target_column, mappings, &[])
}


/// like `encode()`, leaving out the columns in `excluded` (e.g. a client id)
pub fn encode_excluding(
    table: &Table,
    target_column: &str,
    mappings: &[CategoryMapping],
    excluded: &[&str],
) -> Result<FeatureTable, DBError> {

    table.require_column(target_column)?;
    for m in mappings { table.require_column(m.get_column())?; }
    for e in excluded { table.require_column(e)?; }

    let mapping_of = |col_name: &str| mappings.iter().find(|m| m.get_column() == col_name);

    let feature_columns: Vec<&Column> = table.columns()
        .iter()
        .filter(|c| c.get_name() != target_column && !excluded.contains(&c.get_name()))
        .collect();

    for col in &feature_columns {
        let data_type = col.get_data_type();
        let encodable = data_type.is_numeric() || *data_type == DataType::Boolean;
        if mapping_of(col.get_name()).is_none() && !encodable {
            return Err(DBError::validation(format!(
                "the column '{}' holds {} values and has no category mapping", col.get_name(), data_type
            )));
        }
    }

    let mut features: Vec<Vec<f64>> = Vec::with_capacity(table.row_count());
    let mut target: Vec<f64> = Vec::with_capacity(table.row_count());

    for (idx, row) in table.rows().iter().enumerate() {
        let mut encoded: Vec<f64> = Vec::with_capacity(feature_columns.len());
        for col in &feature_columns {
            encoded.push(encode_value(row, col.get_name(), mapping_of(col.get_name()), idx)?);
        }
        features.push(encoded);
        target.push(encode_value(row, target_column, mapping_of(target_column), idx)?);
    }

    Ok(FeatureTable {
        feature_names: feature_columns.iter().map(|c| c.get_name().to_string()).collect(),
        features,
        target,
        target_column: target_column.to_string(),
    })
}


fn encode_value(row: &Row, col_name: &str, mapping: Option<&CategoryMapping>, row_idx: usize) -> Result<f64, DBError> {
    let value = row.get(col_name).unwrap_or(&FieldValue::Null);
    if value.is_null() {
        return Err(DBError::validation(format!("row {row_idx} has no value for '{col_name}'")));
    }

    if let Some(mapping) = mapping {
        let text = value.to_string();
        return mapping
            .lookup(&text)
            .map(|code| code as f64)
            .ok_or_else(|| DBError::validation(format!("'{text}' in column '{col_name}' has no code")));
    }

    match value {
        FieldValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => other
            .as_f64()
            .ok_or_else(|| DBError::validation(format!("'{other}' in column '{col_name}' is not numeric"))),
    }
}
