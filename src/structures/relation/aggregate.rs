use core::fmt;
use std::collections::{HashMap, HashSet};

use crate::structures::{
    column::{Column, DataType, FieldValue},
    db_err::DBError,
    rounding::round_money,
};
use super::table::{Row, Table};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    Sum,
    Mean,
    Count,
    Min,
    Max
}


impl AggregateOp {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateOp::Sum   => "sum",
            AggregateOp::Mean  => "mean",
            AggregateOp::Count => "count",
            AggregateOp::Min   => "min",
            AggregateOp::Max   => "max",
        }
    }

    pub fn parse_str(str: &str) -> Option<AggregateOp> {
        match str.trim().to_lowercase().as_str() {
            "sum"                    => Some(AggregateOp::Sum),
            "mean" | "avg"           => Some(AggregateOp::Mean),
            "count"                  => Some(AggregateOp::Count),
            "min"                    => Some(AggregateOp::Min),
            "max"                    => Some(AggregateOp::Max),
            _ => None
        }
    }

    /// type of the output column when applied to a column of `input`
    fn output_type(&self, input: &DataType) -> DataType {
        match (self, input) {
            (AggregateOp::Count, _) => DataType::Integer,
            (AggregateOp::Mean, _) => DataType::Float,
            (_, DataType::Integer) => DataType::Integer,
            _ => DataType::Float,
        }
    }
}


impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.name()) }
}


/// one output column of a grouped table: `op` applied to `metric`, written to `output`
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub op: AggregateOp,
    pub metric: String,
    pub output: String,
}

impl Aggregation {
    pub fn new(op: AggregateOp, metric: &str, output: &str) -> Self {
        Aggregation { op, metric: metric.to_string(), output: output.to_string() }
    }
}


impl Table {

    /// groups rows by the distinct values of `group_columns` and applies each operation to `metric_column`.
    ///
    /// the output has the group columns followed by one column per operation, named after it
    /// (`sum`, `mean`, `count`, `min`, `max`).
    ///
    /// ## Note
    /// groups come out in order of first appearance, but callers should not rely on it.
    /// float results are rounded half-up to 2 decimals.
    pub fn aggregate(&self, group_columns: &[&str], metric_column: &str, operations: &[AggregateOp]) -> Result<Table, DBError> {
        let aggregations: Vec<Aggregation> = operations
            .iter()
            .map(|op| Aggregation::new(*op, metric_column, op.name()))
            .collect();

        self.aggregate_named(group_columns, &aggregations)
    }


    /// like `aggregate()`, but every output column is named by the caller and may use a different metric
    pub fn aggregate_named(&self, group_columns: &[&str], aggregations: &[Aggregation]) -> Result<Table, DBError> {

        let mut output_columns: Vec<Column> = Vec::with_capacity(group_columns.len() + aggregations.len());
        for name in group_columns {
            output_columns.push(Column::new(name, self.data_type_of(name)?, false));
        }

        for agg in aggregations {
            let metric_type = self.data_type_of(&agg.metric)?;
            if agg.op != AggregateOp::Count && !metric_type.is_numeric() {
                return Err(DBError::MisMatchDataType(DataType::Float, metric_type));
            }
            output_columns.push(Column::new(&agg.output, agg.op.output_type(&metric_type), false));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        if let Some(dup) = output_columns.iter().find(|c| !seen.insert(c.get_name())) {
            return Err(DBError::validation(format!("the output column '{}' appears twice", dup.get_name())));
        }

        // group key -> rows, remembering the order groups first appear in
        let mut group_index: HashMap<Vec<FieldValue>, usize> = HashMap::new();
        let mut groups: Vec<(Vec<FieldValue>, Vec<&Row>)> = Vec::new();

        for row in self.rows() {
            let key: Vec<FieldValue> = group_columns
                .iter()
                .map(|c| row.get(*c).cloned().unwrap_or(FieldValue::Null))
                .collect();

            match group_index.get(&key) {
                Some(idx) => groups[*idx].1.push(row),
                None => {
                    group_index.insert(key.clone(), groups.len());
                    groups.push((key, vec![row]));
                }
            }
        }

        let mut result = Table::new(&format!("{} grouped by {}", self.name, group_columns.join(", ")), output_columns);

        for (key, rows) in groups {
            let mut out: Row = Row::with_capacity(group_columns.len() + aggregations.len());
            for (name, value) in group_columns.iter().zip(key) {
                out.insert(name.to_string(), value);
            }
            for agg in aggregations {
                let metric_type = self.data_type_of(&agg.metric)?;
                let values: Vec<&FieldValue> = rows
                    .iter()
                    .map(|r| r.get(&agg.metric).unwrap_or(&FieldValue::Null))
                    .filter(|v| !v.is_null())
                    .collect();
                let value = apply(agg.op, &metric_type, &values)
                    .map_err(|e| DBError::validation(format!("{} of '{}': {e}", agg.op.name(), agg.metric)))?;
                out.insert(agg.output.clone(), value);
            }
            result.push_row(out);
        }

        Ok(result)
    }


    // ---------------
    //     SCALARS
    // ---------------

    /// sum of the non-null values of a numeric column, `0` for an empty column
    pub fn column_sum(&self, col_name: &str) -> Result<f64, DBError> {
        Ok(self.numeric_values(col_name)?.iter().fold(0.0, |acc, v| acc + v))
    }

    pub fn column_mean(&self, col_name: &str) -> Result<Option<f64>, DBError> {
        let values = self.numeric_values(col_name)?;
        if values.is_empty() { return Ok(None) }
        Ok(Some(values.iter().sum::<f64>() / values.len() as f64))
    }

    /// smallest non-null value of any column
    pub fn column_min(&self, col_name: &str) -> Result<Option<FieldValue>, DBError> {
        Ok(self.column_values(col_name)?
            .into_iter()
            .filter(|v| !v.is_null())
            .min_by(|a, b| a.sort_cmp(b))
            .cloned())
    }

    pub fn column_max(&self, col_name: &str) -> Result<Option<FieldValue>, DBError> {
        Ok(self.column_values(col_name)?
            .into_iter()
            .filter(|v| !v.is_null())
            .max_by(|a, b| a.sort_cmp(b))
            .cloned())
    }

    /// number of distinct non-null values in a column
    pub fn distinct_count(&self, col_name: &str) -> Result<usize, DBError> {
        Ok(self.column_values(col_name)?
            .into_iter()
            .filter(|v| !v.is_null())
            .collect::<HashSet<_>>()
            .len())
    }


    fn numeric_values(&self, col_name: &str) -> Result<Vec<f64>, DBError> {
        let data_type = self.data_type_of(col_name)?;
        if !data_type.is_numeric() {
            return Err(DBError::MisMatchDataType(DataType::Float, data_type));
        }
        Ok(self.column_values(col_name)?.into_iter().filter_map(FieldValue::as_f64).collect())
    }
}


/// applies `op` to the non-null `values` of a column of type `metric_type`
///
/// ### Errors
/// `Validation` when an integer sum does not fit in an `i64`
fn apply(op: AggregateOp, metric_type: &DataType, values: &[&FieldValue]) -> Result<FieldValue, DBError> {
    let integer_metric = *metric_type == DataType::Integer;

    let value = match op {
        AggregateOp::Count => FieldValue::Integer(values.len() as i64),

        AggregateOp::Sum if integer_metric => {
            let sum = values
                .iter()
                .filter_map(|v| v.as_i64())
                .try_fold(0_i64, |acc, v| acc.checked_add(v))
                .ok_or_else(|| DBError::validation("the integer sum overflows"))?;
            FieldValue::Integer(sum)
        }
        AggregateOp::Sum => {
            FieldValue::Float(round_money(values.iter().filter_map(|v| v.as_f64()).fold(0.0, |acc, v| acc + v)))
        }

        AggregateOp::Mean => {
            if values.is_empty() { return Ok(FieldValue::Null) }
            let sum: f64 = values.iter().filter_map(|v| v.as_f64()).sum();
            FieldValue::Float(round_money(sum / values.len() as f64))
        }

        AggregateOp::Min | AggregateOp::Max => {
            let picked = if op == AggregateOp::Min {
                values.iter().min_by(|a, b| a.sort_cmp(b))
            } else {
                values.iter().max_by(|a, b| a.sort_cmp(b))
            };
            match picked {
                None => FieldValue::Null,
                Some(FieldValue::Float(v)) => FieldValue::Float(round_money(*v)),
                Some(v) => (*v).clone(),
            }
        }
    };

    Ok(value)
}
