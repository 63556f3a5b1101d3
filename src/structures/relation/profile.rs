use std::collections::HashSet;

use serde::Serialize;

use crate::structures::{
    column::{Column, DataType, FieldValue},
    db_err::DBError,
    rounding::round_money,
};
use super::table::{Row, Table};


/// shape of a table, how much is missing and what each column holds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableProfile {
    pub tabla: String,
    pub filas: usize,
    pub columnas: usize,
    /// `Null` cells over the whole table
    pub valores_faltantes: usize,
    pub columnas_info: Vec<ColumnProfile>,
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub columna: String,
    pub tipo: DataType,
    /// distinct non-null values
    pub valores_unicos: usize,
    pub valores_faltantes: usize,
    pub porcentaje_faltantes: f64,
    /// only for numeric columns holding at least one value
    #[serde(flatten)]
    pub estadisticas: Option<NumericStatistics>,
}


/// every figure is rounded to cents
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericStatistics {
    pub min: f64,
    pub max: f64,
    pub media: f64,
    pub mediana: f64,
    /// sample standard deviation, `None` with fewer than two values
    pub desviacion_std: Option<f64>,
}


impl Table {

    /// profiles every column of the table, in column order
    pub fn profile(&self) -> Result<TableProfile, DBError> {
        let mut columns = Vec::with_capacity(self.column_count());
        for col in self.columns() {
            columns.push(self.profile_column(col)?);
        }

        Ok(TableProfile {
            tabla: self.name().to_string(),
            filas: self.row_count(),
            columnas: self.column_count(),
            valores_faltantes: columns.iter().map(|c| c.valores_faltantes).sum(),
            columnas_info: columns,
        })
    }


    fn profile_column(&self, col: &Column) -> Result<ColumnProfile, DBError> {
        let present: Vec<&FieldValue> = self.column_values(col.get_name())?
            .into_iter()
            .filter(|v| !v.is_null())
            .collect();

        let missing = self.row_count() - present.len();
        let missing_pct = if self.is_empty() { 0.0 } else { round_money(missing as f64 * 100.0 / self.row_count() as f64) };

        let statistics = if col.get_data_type().is_numeric() {
            numeric_statistics(present.iter().filter_map(|v| v.as_f64()).collect())
        } else {
            None
        };

        Ok(ColumnProfile {
            columna: col.get_name().to_string(),
            tipo: *col.get_data_type(),
            valores_unicos: present.iter().collect::<HashSet<_>>().len(),
            valores_faltantes: missing,
            porcentaje_faltantes: missing_pct,
            estadisticas: statistics,
        })
    }
}


fn numeric_statistics(mut values: Vec<f64>) -> Option<NumericStatistics> {
    if values.is_empty() { return None }
    values.sort_by(f64::total_cmp);

    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 1 { values[n / 2] } else { (values[n / 2 - 1] + values[n / 2]) / 2.0 };
    let std = (n > 1).then(|| {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        round_money(variance.sqrt())
    });

    Some(NumericStatistics {
        min: round_money(values[0]),
        max: round_money(values[n - 1]),
        media: round_money(mean),
        mediana: round_money(median),
        desviacion_std: std,
    })
}


impl TableProfile {

    /// one row per column of the profiled table, ready for `as_string()` or an export
    pub fn as_table(&self) -> Result<Table, DBError> {
        let figure = |name: &str| Column::new(name, DataType::Float, false);
        let mut table = Table::new(&format!("perfil de {}", self.tabla), vec![
            Column::new("columna", DataType::String, false),
            Column::new("tipo", DataType::String, false),
            Column::new("valores_unicos", DataType::Integer, false),
            Column::new("valores_faltantes", DataType::Integer, false),
            figure("porcentaje_faltantes"),
            figure("min"),
            figure("max"),
            figure("media"),
            figure("mediana"),
            figure("desviacion_std"),
        ]);

        for info in &self.columnas_info {
            let mut row = Row::from([
                ("columna".to_string(), FieldValue::from(info.columna.as_str())),
                ("tipo".to_string(), FieldValue::String(info.tipo.to_string())),
                ("valores_unicos".to_string(), FieldValue::Integer(info.valores_unicos as i64)),
                ("valores_faltantes".to_string(), FieldValue::Integer(info.valores_faltantes as i64)),
                ("porcentaje_faltantes".to_string(), FieldValue::Float(info.porcentaje_faltantes)),
            ]);
            if let Some(stats) = &info.estadisticas {
                row.insert("min".to_string(), FieldValue::Float(stats.min));
                row.insert("max".to_string(), FieldValue::Float(stats.max));
                row.insert("media".to_string(), FieldValue::Float(stats.media));
                row.insert("mediana".to_string(), FieldValue::Float(stats.mediana));
                row.insert("desviacion_std".to_string(), stats.desviacion_std.map_or(FieldValue::Null, FieldValue::Float));
            }
            table.insert(row)?;
        }

        Ok(table)
    }
}
