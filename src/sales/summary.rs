use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::structures::{
    column::{Column, DataType, FieldValue},
    db_err::DBError,
    relation::table::{Row, Table},
    rounding::{format_currency, round_money},
};
use super::dataset::SalesTables;


const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";


/// headline figures of the dataset, exported next to the reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub total_clientes: usize,
    pub total_empleados: usize,
    pub total_facturas: usize,
    pub total_detalles: usize,
    pub ventas_totales: f64,
    pub venta_promedio: Option<f64>,
    pub venta_maxima: Option<f64>,
    pub venta_minima: Option<f64>,
    pub periodo_inicio: Option<String>,
    pub periodo_fin: Option<String>,
    pub sucursales_activas: usize,
    pub productos_vendidos: usize,
    pub fecha_exportacion: String,
}


impl SummaryStatistics {

    /// ## Note
    /// sales figures are rounded to cents. Min, max and the period are `None`
    /// when there are no invoices.
    pub fn compute(tables: &SalesTables, exported_at: NaiveDateTime) -> Result<SummaryStatistics, DBError> {
        let facturas = tables.facturas_enc;
        let money = |v: Option<FieldValue>| v.and_then(|v| v.as_f64()).map(round_money);
        let day = |v: Option<FieldValue>| v.map(|v| v.to_string());

        Ok(SummaryStatistics {
            total_clientes: tables.clientes.row_count(),
            total_empleados: tables.empleados.row_count(),
            total_facturas: facturas.row_count(),
            total_detalles: tables.facturas_det.row_count(),
            ventas_totales: round_money(facturas.column_sum("total")?),
            venta_promedio: facturas.column_mean("total")?.map(round_money),
            venta_maxima: money(facturas.column_max("total")?),
            venta_minima: money(facturas.column_min("total")?),
            periodo_inicio: day(facturas.column_min("fecha")?),
            periodo_fin: day(facturas.column_max("fecha")?),
            sucursales_activas: facturas.distinct_count("id_sucursal")?,
            productos_vendidos: tables.facturas_det.distinct_count("id_producto")?,
            fecha_exportacion: exported_at.format(TIMESTAMP_FORMAT).to_string(),
        })
    }


    /// a two column `Métrica` / `Valor` table for the summary sheet
    pub fn as_table(&self) -> Result<Table, DBError> {
        let mut table = Table::new("Resumen", vec![
            Column::new("Métrica", DataType::String, false),
            Column::new("Valor", DataType::String, false),
        ]);

        let currency = |v: Option<f64>| v.map(format_currency).unwrap_or_default();
        let entries: [(&str, String); 12] = [
            ("Total Clientes", self.total_clientes.to_string()),
            ("Total Empleados", self.total_empleados.to_string()),
            ("Total Facturas", self.total_facturas.to_string()),
            ("Total Detalles", self.total_detalles.to_string()),
            ("Ventas Totales", format_currency(self.ventas_totales)),
            ("Venta Promedio", currency(self.venta_promedio)),
            ("Venta Máxima", currency(self.venta_maxima)),
            ("Venta Mínima", currency(self.venta_minima)),
            ("Período Inicio", self.periodo_inicio.clone().unwrap_or_default()),
            ("Período Fin", self.periodo_fin.clone().unwrap_or_default()),
            ("Sucursales Activas", self.sucursales_activas.to_string()),
            ("Productos Vendidos", self.productos_vendidos.to_string()),
        ];

        for (metric, value) in entries {
            table.insert(Row::from([
                ("Métrica".to_string(), FieldValue::from(metric)),
                ("Valor".to_string(), FieldValue::from(value)),
            ]))?;
        }
        Ok(table)
    }
}
